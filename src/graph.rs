use std::{
    borrow::Borrow,
    collections::HashMap,
    hash::Hash,
    sync::RwLock,
};

use ordered_float::OrderedFloat;
use petgraph::algo::astar;
use petgraph::prelude::*;

use crate::{MathTransform, Result, TransformError, factory};

const DEFAULT_COST: f64 = 1.0;

#[derive(Debug, Clone)]
pub struct Edge {
    transform: MathTransform,
    cost: OrderedFloat<f64>,
}

impl Edge {
    pub fn new_cost(transform: MathTransform, cost: f64) -> Self {
        Self {
            transform,
            cost: OrderedFloat(cost),
        }
    }

    pub fn new(transform: MathTransform) -> Self {
        Self::new_cost(transform, DEFAULT_COST)
    }

    pub fn transform(&self) -> &MathTransform {
        &self.transform
    }

    pub fn cost(&self) -> f64 {
        self.cost.0
    }
}

type PathCache = HashMap<(NodeIndex, NodeIndex), Option<MathTransform>>;

/// Coordinate systems connected by transforms.
///
/// Resolves the cheapest chain of transforms between two coordinate systems
/// into a single concatenated transform.
#[derive(Debug)]
pub struct TransformGraph<C: Hash + Eq + Clone> {
    graph: StableDiGraph<C, Edge>,
    coord_systems: HashMap<C, NodeInfo>,
    path_cache: RwLock<PathCache>,
}

impl<C: Hash + Eq + Clone> Default for TransformGraph<C> {
    fn default() -> Self {
        Self {
            graph: Default::default(),
            coord_systems: Default::default(),
            path_cache: Default::default(),
        }
    }
}

#[derive(Debug, Copy, Clone)]
struct NodeInfo {
    idx: NodeIndex,
    ndim: usize,
}

impl<C: Hash + Eq + Clone> TransformGraph<C> {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_coord_system(&mut self, node: C, ndim: usize) -> Result<NodeIndex> {
        if let Some(n) = self.coord_systems.get(&node) {
            TransformError::check_dim(n.ndim, ndim)?;
            Ok(n.idx)
        } else {
            let idx = self.graph.add_node(node.clone());
            self.coord_systems.insert(node, NodeInfo { idx, ndim });
            Ok(idx)
        }
    }

    /// Dimensionality of a known coordinate system.
    pub fn ndim<Q>(&self, cs: &Q) -> Option<usize>
    where
        C: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.coord_systems.get(cs).map(|n| n.ndim)
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Returns whether the inverse edge was added.
    /// Fails if the new edge's dimensionality is inconsistent with existing edges,
    /// or if the cost is negative or not finite.
    pub fn add_edge(
        &mut self,
        src: impl Into<C>,
        tgt: impl Into<C>,
        transform: MathTransform,
        cost: f64,
        with_inverse: bool,
    ) -> Result<bool> {
        if !(cost.is_finite() && cost >= 0.0) {
            return Err(TransformError::InvalidParameter(format!(
                "edge cost must be finite and non-negative; got {cost}"
            )));
        }
        let src = src.into();
        let tgt = tgt.into();
        for (cs, ndim) in [(&src, transform.source_ndim()), (&tgt, transform.target_ndim())] {
            if let Some(n) = self.coord_systems.get(cs) {
                TransformError::check_dim(n.ndim, ndim)?;
            }
        }
        let u = self.ensure_coord_system(src, transform.source_ndim())?;
        let v = self.ensure_coord_system(tgt, transform.target_ndim())?;
        self.clear_cache();

        let mut added_inverse = false;
        if with_inverse {
            match transform.inverse() {
                Ok(inverse) => {
                    self.graph.add_edge(v, u, Edge::new_cost(inverse, cost));
                    added_inverse = true;
                }
                Err(e) => log::debug!("Not adding inverse edge: {e}"),
            }
        }

        self.graph.add_edge(u, v, Edge::new_cost(transform, cost));
        Ok(added_inverse)
    }

    fn best_edge(&self, src: NodeIndex, tgt: NodeIndex) -> Option<&Edge> {
        self.graph
            .edges_connecting(src, tgt)
            .min_by_key(|e| e.weight().cost)
            .map(|e| e.weight())
    }

    fn cache_get(&self, src: NodeIndex, tgt: NodeIndex) -> Option<Option<MathTransform>> {
        let outer = self.path_cache.read().expect("should not be poisoned");
        outer.get(&(src, tgt)).cloned()
    }

    fn cache_insert(&self, src: NodeIndex, tgt: NodeIndex, t: Option<MathTransform>) {
        self.path_cache
            .write()
            .expect("should not be poisoned")
            .insert((src, tgt), t);
    }

    fn clear_cache(&mut self) {
        self.path_cache
            .get_mut()
            .expect("should not be poisoned")
            .clear();
    }

    /// Cheapest transform from one coordinate system to another.
    ///
    /// `None` if either system is unknown or they are not connected.
    pub fn find_path<Q>(&self, from: &Q, to: &Q) -> Result<Option<MathTransform>>
    where
        C: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(start) = self.coord_systems.get(from) else {
            return Ok(None);
        };
        let Some(end) = self.coord_systems.get(to) else {
            return Ok(None);
        };
        let (u, v) = (start.idx, end.idx);

        if u == v {
            return Ok(Some(factory::identity(start.ndim)));
        }

        if let Some(maybe) = self.cache_get(u, v) {
            return Ok(maybe);
        }

        let zero = OrderedFloat(0.0);
        let Some((cost, path)) = astar(&self.graph, u, |n| n == v, |e| e.weight().cost, |_| zero)
        else {
            self.cache_insert(u, v, None);
            return Ok(None);
        };

        let steps: Vec<MathTransform> = path
            .windows(2)
            .filter_map(|ab| self.best_edge(ab[0], ab[1]))
            .map(|e| e.transform.clone())
            .collect();
        let t = factory::concatenate_all(&steps)?;
        log::debug!("Resolved path of {} steps with cost {}", steps.len(), cost);

        self.cache_insert(u, v, Some(t.clone()));
        Ok(Some(t))
    }
}
