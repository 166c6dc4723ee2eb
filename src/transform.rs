use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::{Arc, OnceLock, Weak},
};

use smallvec::smallvec;

use crate::{
    Matrix, Result, ShortVec, TransformError, Transformation, factory,
    geocentric::GeocentricTransform,
    iteration,
    molodensky::MolodenskyTransform,
    pool,
    projection::ProjectionTransform,
    transforms::{
        Affine2D, Concatenated, Constant, Exponential1D, Identity, Linear, Linear1D,
        Logarithmic1D, PassThrough,
    },
};

/// Every kind of transform the factory can build.
///
/// Each variant holds only the data it needs;
/// sub-transforms are held as shared [MathTransform] handles.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TransformKind {
    Identity(Identity),
    Constant(Constant),
    Linear1D(Linear1D),
    Affine2D(Affine2D),
    Linear(Linear),
    Exponential1D(Exponential1D),
    Logarithmic1D(Logarithmic1D),
    Concatenated(Concatenated),
    PassThrough(PassThrough),
    Projection(ProjectionTransform),
    Geocentric(GeocentricTransform),
    Molodensky(MolodenskyTransform),
}

macro_rules! dispatch {
    ($kind:expr, $t:ident => $body:expr) => {
        match $kind {
            TransformKind::Identity($t) => $body,
            TransformKind::Constant($t) => $body,
            TransformKind::Linear1D($t) => $body,
            TransformKind::Affine2D($t) => $body,
            TransformKind::Linear($t) => $body,
            TransformKind::Exponential1D($t) => $body,
            TransformKind::Logarithmic1D($t) => $body,
            TransformKind::Concatenated($t) => $body,
            TransformKind::PassThrough($t) => $body,
            TransformKind::Projection($t) => $body,
            TransformKind::Geocentric($t) => $body,
            TransformKind::Molodensky($t) => $body,
        }
    };
}

impl TransformKind {
    pub fn as_transformation(&self) -> &dyn Transformation {
        dispatch!(self, t => t)
    }

    /// Augmented matrix, for the kinds which are affine or projective.
    pub fn matrix(&self) -> Option<Matrix> {
        match self {
            TransformKind::Identity(t) => Some(t.matrix()),
            TransformKind::Constant(t) => Some(t.matrix()),
            TransformKind::Linear1D(t) => Some(t.matrix()),
            TransformKind::Affine2D(t) => Some(t.matrix()),
            TransformKind::Linear(t) => Some(t.matrix().clone()),
            _ => None,
        }
    }
}

/// Link from a transform to its inverse.
///
/// The inverse of a transform owns a weak back-reference,
/// so that a pair of mutually-inverse transforms never forms a strong cycle.
///
/// A cell is written once. After the owning side of a pair is dropped, the survivor keeps a
/// dead `Back` link: each later `inverse()` call builds a fresh inverse and cannot cache it,
/// so the inverse is only computed once while both ends are alive.
#[derive(Debug)]
pub(crate) enum InverseLink {
    Itself,
    Owned(MathTransform),
    Back(Weak<Node>),
}

#[derive(Debug)]
pub(crate) struct Node {
    kind: TransformKind,
    hash: u64,
    inverse: OnceLock<InverseLink>,
}

impl Node {
    pub(crate) fn new(kind: TransformKind, hash: u64) -> Self {
        Self {
            kind,
            hash,
            inverse: OnceLock::new(),
        }
    }

    pub(crate) fn kind(&self) -> &TransformKind {
        &self.kind
    }

    pub(crate) fn inverse_link(&self) -> &OnceLock<InverseLink> {
        &self.inverse
    }
}

/// Shared, immutable handle to a transform.
///
/// Handles are only created by the factory functions,
/// which intern them: two structurally equal transforms which are alive at the same time
/// are the same allocation, so equality usually short-circuits on the pointer.
#[derive(Clone)]
pub struct MathTransform(pub(crate) Arc<Node>);

impl PartialEq for MathTransform {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other) || (self.0.hash == other.0.hash && self.0.kind == other.0.kind)
    }
}

impl Eq for MathTransform {}

impl Hash for MathTransform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        state.write_u64(self.0.hash);
    }
}

impl fmt::Debug for MathTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("MathTransform").field(&self.0.kind).finish()
    }
}

impl MathTransform {
    pub fn kind(&self) -> &TransformKind {
        &self.0.kind
    }

    pub fn ptr_eq(&self, other: &MathTransform) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub fn source_ndim(&self) -> usize {
        dispatch!(self.kind(), t => t.source_ndim())
    }

    pub fn target_ndim(&self) -> usize {
        dispatch!(self.kind(), t => t.target_ndim())
    }

    pub fn is_identity(&self) -> bool {
        dispatch!(self.kind(), t => t.is_identity())
    }

    /// Augmented matrix, if this transform is affine or projective.
    pub fn matrix(&self) -> Option<Matrix> {
        self.kind().matrix()
    }

    /// Unchecked point evaluation.
    #[inline]
    pub(crate) fn eval(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        dispatch!(self.kind(), t => t.transform_into(pt, buf))
    }

    /// Evaluate a 1-D transform on a scalar, avoiding slice buffers where possible.
    pub(crate) fn eval_1d(&self, x: f64) -> Result<f64> {
        match self.kind() {
            TransformKind::Identity(_) => Ok(x),
            TransformKind::Constant(t) => Ok(t.value()),
            TransformKind::Linear1D(t) => Ok(t.transform(x)),
            TransformKind::Exponential1D(t) => Ok(t.transform(x)),
            TransformKind::Logarithmic1D(t) => Ok(t.transform(x)),
            _ => {
                let mut out = [f64::NAN];
                self.eval(&[x], &mut out)?;
                Ok(out[0])
            }
        }
    }

    /// Evaluate a 2-D transform on a coordinate pair, avoiding slice buffers where possible.
    pub(crate) fn eval_2d(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self.kind() {
            TransformKind::Identity(_) => Ok((x, y)),
            TransformKind::Affine2D(t) => Ok(t.transform(x, y)),
            TransformKind::Projection(t) => t.apply(x, y),
            _ => {
                let mut out = [f64::NAN; 2];
                self.eval(&[x, y], &mut out)?;
                Ok((out[0], out[1]))
            }
        }
    }

    /// Transform a single point, writing into a pre-allocated buffer.
    pub fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        TransformError::check_dim(self.source_ndim(), pt.len())?;
        TransformError::check_dim(self.target_ndim(), buf.len())?;
        self.eval(pt, buf)
    }

    /// Transform a single point into a newly-allocated buffer.
    pub fn transform_point(&self, pt: &[f64]) -> Result<ShortVec<f64>> {
        let mut out = smallvec![f64::NAN; self.target_ndim()];
        self.transform_into(pt, &mut out)?;
        Ok(out)
    }

    /// Transform `count` packed points from `src` into `dst`.
    ///
    /// Points are processed independently. A point which fails is written as `NaN`
    /// and processing continues; the first failure is returned once the whole batch is done.
    pub fn transform_points(
        &self,
        src: &[f64],
        src_offset: usize,
        dst: &mut [f64],
        dst_offset: usize,
        count: usize,
    ) -> Result<()> {
        iteration::transform_between(self, src, src_offset, dst, dst_offset, count)
    }

    /// Single-precision counterpart of [MathTransform::transform_points];
    /// the computation is carried out in double precision.
    pub fn transform_points_f32(
        &self,
        src: &[f32],
        src_offset: usize,
        dst: &mut [f32],
        dst_offset: usize,
        count: usize,
    ) -> Result<()> {
        iteration::transform_between(self, src, src_offset, dst, dst_offset, count)
    }

    /// Transform `count` packed points within one buffer.
    ///
    /// Source and destination ranges may overlap in either direction;
    /// the iteration order is chosen so that no point is overwritten before it is read.
    pub fn transform_points_in_place(
        &self,
        buf: &mut [f64],
        src_offset: usize,
        dst_offset: usize,
        count: usize,
    ) -> Result<()> {
        iteration::transform_within(self, buf, src_offset, dst_offset, count)
    }

    pub fn transform_points_in_place_f32(
        &self,
        buf: &mut [f32],
        src_offset: usize,
        dst_offset: usize,
        count: usize,
    ) -> Result<()> {
        iteration::transform_within(self, buf, src_offset, dst_offset, count)
    }

    /// Jacobian at `pt`, as a `target_ndim × source_ndim` matrix.
    ///
    /// `pt` may be omitted for transforms whose derivative is the same everywhere,
    /// e.g. affine transforms; otherwise omitting it is an error.
    pub fn derivative(&self, pt: Option<&[f64]>) -> Result<Matrix> {
        if let Some(p) = pt {
            TransformError::check_dim(self.source_ndim(), p.len())?;
        }
        dispatch!(self.kind(), t => t.derivative(pt))
    }

    pub(crate) fn cached_inverse(&self) -> Option<MathTransform> {
        match self.0.inverse.get()? {
            InverseLink::Itself => Some(self.clone()),
            InverseLink::Owned(t) => Some(t.clone()),
            InverseLink::Back(weak) => weak.upgrade().map(MathTransform),
        }
    }

    /// Whether `other` is known to be the inverse of this transform.
    pub fn is_inverse_of(&self, other: &MathTransform) -> bool {
        self.cached_inverse().is_some_and(|inv| inv.ptr_eq(other))
            || other.cached_inverse().is_some_and(|inv| inv.ptr_eq(self))
    }

    /// The inverse transform.
    ///
    /// Computed at most once per transform and then cached,
    /// so that `t.inverse()?.inverse()?` is `t` itself.
    pub fn inverse(&self) -> Result<MathTransform> {
        if let Some(inv) = self.cached_inverse() {
            return Ok(inv);
        }
        let inv = factory::create_inverse(self)?;
        Ok(pool::link_inverse(self, inv))
    }
}
