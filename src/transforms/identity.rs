use crate::{Matrix, Result, Transformation};

/// A no-op transform which returns the input point as the output point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Identity(usize);

impl Identity {
    pub(crate) fn new(ndim: usize) -> Self {
        Self(ndim)
    }

    pub fn ndim(&self) -> usize {
        self.0
    }

    pub fn matrix(&self) -> Matrix {
        Matrix::identity(self.0 + 1, self.0 + 1)
    }
}

impl Transformation for Identity {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        buf.copy_from_slice(pt);
        Ok(())
    }

    fn derivative(&self, _pt: Option<&[f64]>) -> Result<Matrix> {
        Ok(Matrix::identity(self.0, self.0))
    }

    fn is_identity(&self) -> bool {
        true
    }

    fn source_ndim(&self) -> usize {
        self.0
    }

    fn target_ndim(&self) -> usize {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use crate::factory;
    use crate::tests::{check_inverse_roundtrip, check_transform_bulk, make_coords};

    #[test]
    fn test_bulk() {
        check_transform_bulk(&factory::identity(3));
    }

    #[test]
    fn test_inverse() {
        check_inverse_roundtrip(&factory::identity(3), &make_coords(100, 3, 100.0), 0.0);
    }

    #[test]
    fn test_derivative_without_point() {
        let d = factory::identity(3).derivative(None).unwrap();
        assert!(d.is_identity());
        assert_eq!(d.nrows(), 3);
    }

    #[test]
    fn test_cached_by_dimension() {
        assert!(factory::identity(2).ptr_eq(&factory::identity(2)));
        assert!(factory::identity(40).ptr_eq(&factory::identity(40)));
        assert!(!factory::identity(2).ptr_eq(&factory::identity(3)));
    }
}
