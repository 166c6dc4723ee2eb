//! Composable coordinate transforms.
//!
//! Transforms are built through [factory], which canonicalises, optimises and interns them,
//! and are used through the shared [MathTransform] handle.
use smallvec::SmallVec;

mod matrix;
pub use matrix::{Matrix, MatrixBuilder};
mod error;
pub use error::{Result, TransformError};
mod traits;
pub use traits::Transformation;
pub mod derivative;
mod transform;
pub use transform::{MathTransform, TransformKind};
mod iteration;
pub use iteration::{IterationStrategy, Ordinate};
mod pool;
pub mod transforms;
pub mod factory;
mod ellipsoid;
pub use ellipsoid::Ellipsoid;
pub mod projection;
pub use projection::{
    Direction, LambertConformalParams, MapProjection, MercatorParams, ProjectionParams,
    ProjectionTransform, TransverseMercatorParams,
};
mod geocentric;
pub use geocentric::GeocentricTransform;
mod molodensky;
pub use molodensky::{MolodenskyParams, MolodenskyTransform};
mod filter;
pub use filter::{Separated, filter_input_dims, filter_output_dims, separate_input};
mod wkt;
mod shape;
pub use shape::{PathSegment, transform_path};
mod graph;
pub use graph::{Edge, TransformGraph};

/// Points with at most this many dimensions are transformed without heap allocation.
pub const COORD_SIZE: usize = 6;

/// A short vector type alias for convenience.
pub type ShortVec<T> = SmallVec<[T; COORD_SIZE]>;
