mod identity;
pub use identity::Identity;
mod linear_1d;
pub use linear_1d::{Constant, Linear1D};
mod affine_2d;
pub use affine_2d::Affine2D;
mod linear;
pub use linear::Linear;
mod exponential;
pub use exponential::Exponential1D;
mod logarithmic;
pub use logarithmic::Logarithmic1D;
mod concatenated;
pub use concatenated::{ConcatShape, Concatenated};
mod pass_through;
pub use pass_through::PassThrough;
