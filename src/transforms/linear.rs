use crate::{
    Matrix, Result, Transformation, derivative::required_point, matrix::augmented_dot,
};

/// General matrix transform applied in homogeneous coordinates.
///
/// A point is augmented with a trailing `1` and multiplied by the matrix.
/// Unless the matrix is affine, every result ordinate is then divided by the last one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Linear {
    matrix: Matrix,
    affine: bool,
}

impl Linear {
    pub(crate) fn new(matrix: Matrix) -> Self {
        let affine = matrix.is_affine();
        Self { matrix, affine }
    }

    pub fn matrix(&self) -> &Matrix {
        &self.matrix
    }

    pub fn is_affine(&self) -> bool {
        self.affine
    }
}

impl Transformation for Linear {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        let n = self.matrix.nrows() - 1;
        if self.affine {
            for (r, b) in buf.iter_mut().enumerate().take(n) {
                *b = augmented_dot(self.matrix.row(r), pt);
            }
        } else {
            let w = augmented_dot(self.matrix.row(n), pt);
            for (r, b) in buf.iter_mut().enumerate().take(n) {
                *b = augmented_dot(self.matrix.row(r), pt) / w;
            }
        }
        Ok(())
    }

    fn derivative(&self, pt: Option<&[f64]>) -> Result<Matrix> {
        let tgt = self.target_ndim();
        let src = self.source_ndim();
        let rows: Vec<_> = (0..tgt).collect();
        let cols: Vec<_> = (0..src).collect();
        let linear_part = self.matrix.select_rows(&rows).select_cols(&cols);
        if self.affine {
            return Ok(linear_part);
        }

        // quotient rule on y_r / w
        let pt = required_point(pt)?;
        let w_row = self.matrix.row(tgt);
        let w = augmented_dot(w_row, pt);
        let mut out = Matrix::zeros(tgt, src);
        for r in 0..tgt {
            let y = augmented_dot(self.matrix.row(r), pt);
            for c in 0..src {
                out[(r, c)] = (linear_part[(r, c)] * w - y * w_row[c]) / (w * w);
            }
        }
        Ok(out)
    }

    fn is_identity(&self) -> bool {
        self.matrix.is_identity()
    }

    fn source_ndim(&self) -> usize {
        self.matrix.ncols() - 1
    }

    fn target_ndim(&self) -> usize {
        self.matrix.nrows() - 1
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_relative_eq, assert_ulps_eq};

    use crate::tests::{check_inverse_roundtrip, check_transform_bulk, make_coords};
    use crate::{Matrix, TransformError, TransformKind, derivative, factory};

    fn make_affine() -> Matrix {
        #[rustfmt::skip]
        let m = Matrix::try_new(vec![
            1.0, 0.5, 0.0, 10.0,
            0.0, 2.0, 0.1, -6.0,
            0.3, 0.0, 3.0, 0.5,
            0.0, 0.0, 0.0, 1.0,
        ], 4).unwrap();
        m
    }

    fn make_projective() -> Matrix {
        #[rustfmt::skip]
        let m = Matrix::try_new(vec![
            2.0, 0.1, 5.0,
            -0.3, 1.5, 1.0,
            0.001, 0.002, 1.0,
        ], 3).unwrap();
        m
    }

    #[test]
    fn test_bulk() {
        check_transform_bulk(&factory::linear(make_affine()).unwrap());
    }

    #[test]
    fn test_inverse() {
        let t = factory::linear(make_affine()).unwrap();
        check_inverse_roundtrip(&t, &make_coords(100, 3, 100.0), 1e-9);
    }

    #[test]
    fn test_projective_division() {
        let t = factory::linear(make_projective()).unwrap();
        assert!(matches!(t.kind(), TransformKind::Linear(_)));
        let out = t.transform_point(&[10.0, 20.0]).unwrap();
        let w = 0.001 * 10.0 + 0.002 * 20.0 + 1.0;
        assert_ulps_eq!(out[0], (2.0 * 10.0 + 0.1 * 20.0 + 5.0) / w);
        assert_ulps_eq!(out[1], (-0.3 * 10.0 + 1.5 * 20.0 + 1.0) / w);
        check_inverse_roundtrip(&t, &make_coords(100, 2, 100.0), 1e-9);
    }

    #[test]
    fn test_affine_derivative_is_point_independent() {
        let t = factory::linear(make_affine()).unwrap();
        let d = t.derivative(None).unwrap();
        assert_eq!(d.row(1), &[0.0, 2.0, 0.1]);
    }

    #[test]
    fn test_projective_derivative_matches_differences() {
        let t = factory::linear(make_projective()).unwrap();
        assert!(matches!(
            t.derivative(None),
            Err(TransformError::NoDerivative(_))
        ));
        let pt = [12.0, -7.0];
        let exact = t.derivative(Some(&pt)).unwrap();
        let TransformKind::Linear(inner) = t.kind() else {
            unreachable!()
        };
        let approx = derivative::approximate(inner, Some(&pt)).unwrap();
        for r in 0..2 {
            for c in 0..2 {
                assert_relative_eq!(exact[(r, c)], approx[(r, c)], max_relative = 1e-6);
            }
        }
    }

    #[test]
    fn test_dimension_changing() {
        #[rustfmt::skip]
        let m = Matrix::try_new(vec![
            1.0, 1.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ], 4).unwrap();
        let t = factory::linear(m).unwrap();
        assert_eq!((t.source_ndim(), t.target_ndim()), (3, 1));
        assert_eq!(t.transform_point(&[1.0, 2.0, 3.0]).unwrap()[0], 6.0);
        assert!(matches!(t.inverse(), Err(TransformError::NonInvertible(_))));
    }
}
