use ordered_float::OrderedFloat;

use crate::{Matrix, Result, Transformation};

/// `y = offset + scale·x`, with a non-zero scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Linear1D {
    scale: OrderedFloat<f64>,
    offset: OrderedFloat<f64>,
}

impl Linear1D {
    pub(crate) fn new(scale: f64, offset: f64) -> Self {
        Self {
            scale: OrderedFloat(scale),
            offset: OrderedFloat(offset),
        }
    }

    pub fn scale(&self) -> f64 {
        self.scale.0
    }

    pub fn offset(&self) -> f64 {
        self.offset.0
    }

    #[inline]
    pub fn transform(&self, x: f64) -> f64 {
        self.scale.0 * x + self.offset.0
    }

    pub fn matrix(&self) -> Matrix {
        let mut m = Matrix::identity(2, 2);
        m[(0, 0)] = self.scale.0;
        m[(0, 1)] = self.offset.0;
        m
    }
}

impl Transformation for Linear1D {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        buf[0] = self.transform(pt[0]);
        Ok(())
    }

    fn derivative(&self, _pt: Option<&[f64]>) -> Result<Matrix> {
        let mut m = Matrix::zeros(1, 1);
        m[(0, 0)] = self.scale.0;
        Ok(m)
    }

    fn source_ndim(&self) -> usize {
        1
    }

    fn target_ndim(&self) -> usize {
        1
    }
}

/// One-dimensional transform which ignores its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Constant(OrderedFloat<f64>);

impl Constant {
    pub(crate) fn new(value: f64) -> Self {
        Self(OrderedFloat(value))
    }

    pub fn value(&self) -> f64 {
        self.0.0
    }

    pub fn matrix(&self) -> Matrix {
        let mut m = Matrix::identity(2, 2);
        m[(0, 0)] = 0.0;
        m[(0, 1)] = self.0.0;
        m
    }
}

impl Transformation for Constant {
    fn transform_into(&self, _pt: &[f64], buf: &mut [f64]) -> Result<()> {
        buf[0] = self.0.0;
        Ok(())
    }

    fn derivative(&self, _pt: Option<&[f64]>) -> Result<Matrix> {
        Ok(Matrix::zeros(1, 1))
    }

    fn source_ndim(&self) -> usize {
        1
    }

    fn target_ndim(&self) -> usize {
        1
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_ulps_eq;

    use crate::tests::{check_inverse_roundtrip, check_transform_bulk, make_coords};
    use crate::{TransformError, TransformKind, factory};

    #[test]
    fn test_bulk() {
        check_transform_bulk(&factory::linear_1d(2.5, -3.0));
    }

    #[test]
    fn test_inverse() {
        let t = factory::linear_1d(2.5, -3.0);
        check_inverse_roundtrip(&t, &make_coords(100, 1, 100.0), 1e-12);
        let TransformKind::Linear1D(inv) = t.inverse().unwrap().kind().clone() else {
            panic!("inverse of a 1-D linear transform should be 1-D linear");
        };
        assert_ulps_eq!(inv.scale(), 0.4);
        assert_ulps_eq!(inv.offset(), 1.2);
    }

    #[test]
    fn test_zero_scale_is_constant() {
        let t = factory::linear_1d(0.0, 7.0);
        assert!(matches!(t.kind(), TransformKind::Constant(_)));
        assert_eq!(t.transform_point(&[f64::NAN]).unwrap()[0], 7.0);
        assert!(matches!(t.inverse(), Err(TransformError::NonInvertible(_))));
    }

    #[test]
    fn test_unit_scale_is_identity() {
        assert!(factory::linear_1d(1.0, 0.0).is_identity());
    }
}
