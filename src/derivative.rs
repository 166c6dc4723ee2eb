//! Fallback derivative for transforms without an analytic Jacobian.

use smallvec::smallvec;

use crate::{Matrix, Result, ShortVec, TransformError, Transformation};

/// Relative step of the central differences.
const RELATIVE_STEP: f64 = 1e-7;

/// Approximate the Jacobian at `pt` with central differences.
///
/// Only one-dimensional and two-dimensional transforms
/// (same source and target dimension) are handled;
/// anything else reports [TransformError::NoDerivative].
pub fn approximate<T: Transformation + ?Sized>(t: &T, pt: Option<&[f64]>) -> Result<Matrix> {
    let src = t.source_ndim();
    let tgt = t.target_ndim();
    if src != tgt || !(src == 1 || src == 2) {
        return Err(TransformError::NoDerivative(format!(
            "no derivative for a {src}D → {tgt}D transform"
        )));
    }
    let pt = required_point(pt)?;
    TransformError::check_dim(src, pt.len())?;

    let mut out = Matrix::zeros(tgt, src);
    let mut probe: ShortVec<f64> = pt.iter().copied().collect();
    let mut plus: ShortVec<f64> = smallvec![f64::NAN; tgt];
    let mut minus: ShortVec<f64> = smallvec![f64::NAN; tgt];
    for col in 0..src {
        let h = RELATIVE_STEP * pt[col].abs().max(1.0);
        probe[col] = pt[col] + h;
        t.transform_into(&probe, &mut plus)?;
        probe[col] = pt[col] - h;
        t.transform_into(&probe, &mut minus)?;
        probe[col] = pt[col];
        for row in 0..tgt {
            out[(row, col)] = (plus[row] - minus[row]) / (2.0 * h);
        }
    }
    Ok(out)
}

pub(crate) fn required_point(pt: Option<&[f64]>) -> Result<&[f64]> {
    pt.ok_or_else(|| {
        TransformError::NoDerivative("derivative depends on the point, which was not given".into())
    })
}
