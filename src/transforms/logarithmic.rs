use ordered_float::OrderedFloat;

use crate::{Matrix, Result, Transformation, derivative::required_point};

/// `y = log_base(x) + offset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Logarithmic1D {
    base: OrderedFloat<f64>,
    offset: OrderedFloat<f64>,
}

impl Logarithmic1D {
    pub(crate) fn new(base: f64, offset: f64) -> Self {
        Self {
            base: OrderedFloat(base),
            offset: OrderedFloat(offset),
        }
    }

    pub fn base(&self) -> f64 {
        self.base.0
    }

    pub fn offset(&self) -> f64 {
        self.offset.0
    }

    #[inline]
    pub fn transform(&self, x: f64) -> f64 {
        let log = if self.base.0 == 10.0 {
            x.log10()
        } else {
            x.ln() / self.base.0.ln()
        };
        log + self.offset.0
    }
}

impl Transformation for Logarithmic1D {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        buf[0] = self.transform(pt[0]);
        Ok(())
    }

    fn derivative(&self, pt: Option<&[f64]>) -> Result<Matrix> {
        let x = required_point(pt)?[0];
        let mut m = Matrix::zeros(1, 1);
        m[(0, 0)] = 1.0 / (x * self.base.0.ln());
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

    use crate::{TransformKind, factory};

    #[test]
    fn test_values() {
        let t = factory::logarithmic_1d(10.0, 1.0).unwrap();
        assert_relative_eq!(t.transform_point(&[1000.0]).unwrap()[0], 4.0, max_relative = 1e-12);
        let t = factory::logarithmic_1d(2.0, 0.0).unwrap();
        assert_relative_eq!(t.transform_point(&[32.0]).unwrap()[0], 5.0, max_relative = 1e-12);
    }

    #[test]
    fn test_inverse_is_exponential() {
        let t = factory::logarithmic_1d(10.0, 2.0).unwrap();
        let inv = t.inverse().unwrap();
        let TransformKind::Exponential1D(e) = inv.kind() else {
            panic!("expected exponential inverse, got {inv:?}");
        };
        assert_relative_eq!(e.factor(), 0.01, max_relative = 1e-12);
        assert_relative_eq!(inv.transform_point(&[4.0]).unwrap()[0], 100.0, max_relative = 1e-12);
    }

    #[test]
    fn test_derivative() {
        let t = factory::logarithmic_1d(std::f64::consts::E, 0.0).unwrap();
        let d = t.derivative(Some(&[4.0])).unwrap();
        assert_relative_eq!(d[(0, 0)], 0.25, max_relative = 1e-12);
    }
}
