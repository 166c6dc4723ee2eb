use crate::{Matrix, Result, derivative};

/// Point-wise evaluation contract shared by every transform variant.
///
/// Implementations may not perform any bounds checks on the input,
/// as these transformations generally happen in performance-critical hot loops.
/// Therefore, they may panic if coordinates or output buffers of incorrect length are given;
/// [crate::MathTransform] checks lengths before dispatching here.
pub trait Transformation: std::fmt::Debug + Send + Sync {
    /// Transform a single point from the source space to the target space.
    /// Writes to a pre-allocated output buffer.
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()>;

    /// Jacobian of the transform at `pt`, as a `target_ndim × source_ndim` matrix.
    ///
    /// The point may only be omitted when the derivative does not depend on it.
    /// By default this falls back to [derivative::approximate],
    /// which only handles one- and two-dimensional transforms.
    fn derivative(&self, pt: Option<&[f64]>) -> Result<Matrix> {
        derivative::approximate(self, pt)
    }

    /// Whether this transformation represents the identity,
    /// i.e. input and output are the same number of dimensions
    /// and the coordinate values (and positions) are not changed.
    ///
    /// `true` means it definitely is an identity;
    /// `false` is not definitive.
    fn is_identity(&self) -> bool {
        false
    }

    fn source_ndim(&self) -> usize;

    fn target_ndim(&self) -> usize;
}
