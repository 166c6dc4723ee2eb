use ordered_float::OrderedFloat;

use crate::{Matrix, Result, Transformation, derivative::required_point};

/// `y = factor · base^x`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Exponential1D {
    base: OrderedFloat<f64>,
    factor: OrderedFloat<f64>,
}

impl Exponential1D {
    pub(crate) fn new(base: f64, factor: f64) -> Self {
        Self {
            base: OrderedFloat(base),
            factor: OrderedFloat(factor),
        }
    }

    pub fn base(&self) -> f64 {
        self.base.0
    }

    pub fn factor(&self) -> f64 {
        self.factor.0
    }

    #[inline]
    pub fn transform(&self, x: f64) -> f64 {
        self.factor.0 * self.base.0.powf(x)
    }
}

impl Transformation for Exponential1D {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        buf[0] = self.transform(pt[0]);
        Ok(())
    }

    fn derivative(&self, pt: Option<&[f64]>) -> Result<Matrix> {
        let x = required_point(pt)?[0];
        let mut m = Matrix::zeros(1, 1);
        m[(0, 0)] = self.transform(x) * self.base.0.ln();
        Ok(m)
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
    use approx::assert_relative_eq;

    use crate::tests::{check_inverse_roundtrip, check_transform_bulk, make_coords};
    use crate::{TransformError, TransformKind, factory};

    #[test]
    fn test_values() {
        let t = factory::exponential_1d(10.0, 2.0).unwrap();
        assert_relative_eq!(t.transform_point(&[3.0]).unwrap()[0], 2000.0, max_relative = 1e-12);
        check_transform_bulk(&t);
    }

    #[test]
    fn test_inverse_is_logarithmic() {
        let t = factory::exponential_1d(2.0, 8.0).unwrap();
        let inv = t.inverse().unwrap();
        assert!(matches!(inv.kind(), TransformKind::Logarithmic1D(_)));
        check_inverse_roundtrip(&t, &make_coords(100, 1, 10.0), 1e-9);
    }

    #[test]
    fn test_negative_factor_not_invertible() {
        let t = factory::exponential_1d(2.0, -1.0).unwrap();
        assert!(matches!(t.inverse(), Err(TransformError::NonInvertible(_))));
    }

    #[test]
    fn test_derivative() {
        let t = factory::exponential_1d(std::f64::consts::E, 3.0).unwrap();
        let d = t.derivative(Some(&[0.5])).unwrap();
        assert_relative_eq!(d[(0, 0)], 3.0 * 0.5_f64.exp(), max_relative = 1e-12);
        assert!(matches!(
            t.derivative(None),
            Err(TransformError::NoDerivative(_))
        ));
    }

    #[test]
    fn test_invalid_base() {
        assert!(matches!(
            factory::exponential_1d(1.0, 1.0),
            Err(TransformError::InvalidParameter(_))
        ));
        assert!(factory::exponential_1d(-2.0, 1.0).is_err());
    }
}
