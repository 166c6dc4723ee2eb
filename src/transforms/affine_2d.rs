use ordered_float::OrderedFloat;

use crate::{Matrix, Result, Transformation};

/// Two-dimensional affine transform, stored as the top two rows of its augmented matrix.
///
/// Evaluates in the same operation order as the general matrix path,
/// so both give bit-identical results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Affine2D([OrderedFloat<f64>; 6]);

impl Affine2D {
    /// The matrix must be a 3×3 affine matrix.
    pub(crate) fn new(matrix: &Matrix) -> Self {
        let m = |r, c| OrderedFloat(matrix[(r, c)]);
        Self([m(0, 0), m(0, 1), m(0, 2), m(1, 0), m(1, 1), m(1, 2)])
    }

    #[inline]
    pub fn transform(&self, x: f64, y: f64) -> (f64, f64) {
        let [m00, m01, m02, m10, m11, m12] = self.0.map(|v| v.0);
        (m00 * x + m01 * y + m02, m10 * x + m11 * y + m12)
    }

    pub fn matrix(&self) -> Matrix {
        let mut m = Matrix::identity(3, 3);
        for (idx, v) in self.0.iter().enumerate() {
            m[(idx / 3, idx % 3)] = v.0;
        }
        m
    }
}

impl Transformation for Affine2D {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        (buf[0], buf[1]) = self.transform(pt[0], pt[1]);
        Ok(())
    }

    fn derivative(&self, _pt: Option<&[f64]>) -> Result<Matrix> {
        let mut m = Matrix::zeros(2, 2);
        m[(0, 0)] = self.0[0].0;
        m[(0, 1)] = self.0[1].0;
        m[(1, 0)] = self.0[3].0;
        m[(1, 1)] = self.0[4].0;
        Ok(m)
    }

    fn source_ndim(&self) -> usize {
        2
    }

    fn target_ndim(&self) -> usize {
        2
    }
}

#[cfg(test)]
mod tests {
    use super::Affine2D;
    use crate::tests::{check_inverse_roundtrip, check_transform_bulk, make_coords};
    use crate::transforms::Linear;
    use crate::{Matrix, TransformKind, Transformation, factory};

    fn make_matrix() -> Matrix {
        #[rustfmt::skip]
        let m = Matrix::try_new(vec![
            0.7, -1.3, 250.5,
            0.2, 1.9, -13.25,
            0.0, 0.0, 1.0,
        ], 3).unwrap();
        m
    }

    #[test]
    fn test_factory_specialises() {
        let t = factory::linear(make_matrix()).unwrap();
        assert!(matches!(t.kind(), TransformKind::Affine2D(_)));
        assert_eq!(t.matrix().unwrap(), make_matrix());
    }

    #[test]
    fn test_bit_identical_to_general_path() {
        let fast = Affine2D::new(&make_matrix());
        let general = Linear::new(make_matrix());
        let mut a = [0.0; 2];
        let mut b = [0.0; 2];
        for pt in make_coords(500, 2, 1e4).chunks_exact(2) {
            fast.transform_into(pt, &mut a).unwrap();
            general.transform_into(pt, &mut b).unwrap();
            assert_eq!(a.map(f64::to_bits), b.map(f64::to_bits));
        }
    }

    #[test]
    fn test_bulk() {
        check_transform_bulk(&factory::linear(make_matrix()).unwrap());
    }

    #[test]
    fn test_inverse() {
        let t = factory::linear(make_matrix()).unwrap();
        check_inverse_roundtrip(&t, &make_coords(100, 2, 100.0), 1e-9);
    }
}
