//! Restriction of a transform to a subset of its input or output ordinates.
//!
//! This is how a transform between compound coordinate systems is split into its parts,
//! e.g. the horizontal and the vertical part of a (longitude, latitude, height) chain.

use crate::{MathTransform, Matrix, Result, TransformError, TransformKind, factory};

/// A transform restricted to some of its inputs,
/// with the output ordinates of the original transform it still produces.
#[derive(Debug, Clone)]
pub struct Separated {
    pub transform: MathTransform,
    /// Indices into the outputs of the original transform, ascending.
    pub target_dims: Vec<usize>,
}

fn normalize_dims(dims: &[usize], ndim: usize) -> Result<Vec<usize>> {
    let mut out = dims.to_vec();
    out.sort_unstable();
    out.dedup();
    if out.is_empty() {
        return Err(TransformError::InvalidParameter(
            "at least one dimension must be selected".into(),
        ));
    }
    if let Some(d) = out.iter().find(|d| **d >= ndim) {
        return Err(TransformError::InvalidParameter(format!(
            "dimension {d} is out of range for {ndim} dimensions"
        )));
    }
    Ok(out)
}

/// Augmented matrix picking the ordinates `rows` out of an `ndim`-dimensional point.
fn selection_matrix(ndim: usize, rows: &[usize]) -> Matrix {
    let mut m = Matrix::zeros(rows.len() + 1, ndim + 1);
    for (r, c) in rows.iter().enumerate() {
        m[(r, *c)] = 1.0;
    }
    m[(rows.len(), ndim)] = 1.0;
    m
}

/// Transform taking only the input ordinates `dims`,
/// or [TransformError::NotSeparable] if an output depends on both selected and dropped inputs.
pub fn filter_input_dims(t: &MathTransform, dims: &[usize]) -> Result<MathTransform> {
    separate_input(t, dims).map(|s| s.transform)
}

/// As [filter_input_dims], also reporting which outputs the restricted transform produces.
pub fn separate_input(t: &MathTransform, dims: &[usize]) -> Result<Separated> {
    let dims = normalize_dims(dims, t.source_ndim())?;
    let out = separate_input_sorted(t, &dims)?;
    log::debug!(
        "Separated inputs {dims:?} of a {}D → {}D transform; outputs {:?}",
        t.source_ndim(),
        t.target_ndim(),
        out.target_dims
    );
    Ok(out)
}

fn separate_input_sorted(t: &MathTransform, dims: &[usize]) -> Result<Separated> {
    if dims.len() == t.source_ndim() {
        return Ok(Separated {
            transform: t.clone(),
            target_dims: (0..t.target_ndim()).collect(),
        });
    }

    if let Some(m) = t.matrix() {
        return separate_matrix_input(&m, dims);
    }

    match t.kind() {
        TransformKind::Concatenated(c) => {
            let first = separate_input_sorted(c.first(), dims)?;
            if first.target_dims.is_empty() {
                return Err(TransformError::NotSeparable(
                    "selected ordinates do not reach the output".into(),
                ));
            }
            let second = separate_input_sorted(c.second(), &first.target_dims)?;
            Ok(Separated {
                transform: factory::concatenate(&first.transform, &second.transform)?,
                target_dims: second.target_dims,
            })
        }
        TransformKind::PassThrough(p) => {
            let inner_src = p.inner().source_ndim();
            let inner_tgt = p.inner().target_ndim();
            let inner_start = p.first();
            let inner_end = inner_start + inner_src;

            let leading: Vec<usize> = dims.iter().copied().filter(|d| *d < inner_start).collect();
            let inner: Vec<usize> = dims
                .iter()
                .filter(|d| (inner_start..inner_end).contains(*d))
                .map(|d| d - inner_start)
                .collect();
            let trailing: Vec<usize> = dims
                .iter()
                .filter(|d| **d >= inner_end)
                .map(|d| d - inner_src + inner_tgt)
                .collect();

            let mut target_dims = leading.clone();
            let transform = if inner.is_empty() {
                factory::identity(leading.len() + trailing.len())
            } else {
                let sub = separate_input_sorted(p.inner(), &inner)?;
                target_dims.extend(sub.target_dims.iter().map(|d| d + inner_start));
                factory::pass_through(leading.len(), &sub.transform, trailing.len())?
            };
            target_dims.extend(trailing);
            Ok(Separated {
                transform,
                target_dims,
            })
        }
        _ => Err(TransformError::NotSeparable(format!(
            "cannot restrict {t:?} to inputs {dims:?}"
        ))),
    }
}

fn separate_matrix_input(m: &Matrix, dims: &[usize]) -> Result<Separated> {
    let src = m.ncols() - 1;
    let tgt = m.nrows() - 1;
    let mut keep_cols = dims.to_vec();
    keep_cols.push(src);

    let mut keep_rows = Vec::with_capacity(tgt + 1);
    for r in 0..=tgt {
        let row = m.row(r);
        let on_selected = dims.iter().any(|c| row[*c] != 0.0);
        let on_dropped = (0..src).any(|c| row[c] != 0.0 && dims.binary_search(&c).is_err());
        if on_dropped {
            if on_selected || r == tgt {
                return Err(TransformError::NotSeparable(format!(
                    "output {r} depends on both selected and dropped inputs"
                )));
            }
            continue;
        }
        keep_rows.push(r);
    }

    let reduced = m.select_rows(&keep_rows).select_cols(&keep_cols);
    keep_rows.pop();
    Ok(Separated {
        transform: factory::linear(reduced)?,
        target_dims: keep_rows,
    })
}

/// Transform producing only the output ordinates `dims`, from the same inputs.
///
/// Unlike input filtering this never needs to prove independence,
/// so it only fails on invalid `dims`.
pub fn filter_output_dims(t: &MathTransform, dims: &[usize]) -> Result<MathTransform> {
    let dims = normalize_dims(dims, t.target_ndim())?;
    log::debug!(
        "Selecting outputs {dims:?} of a {}D → {}D transform",
        t.source_ndim(),
        t.target_ndim()
    );
    filter_output_sorted(t, &dims)
}

fn filter_output_sorted(t: &MathTransform, dims: &[usize]) -> Result<MathTransform> {
    if dims.len() == t.target_ndim() {
        return Ok(t.clone());
    }

    if let Some(m) = t.matrix() {
        let mut rows = dims.to_vec();
        rows.push(m.nrows() - 1);
        return factory::linear(m.select_rows(&rows));
    }

    match t.kind() {
        TransformKind::Concatenated(c) => {
            factory::concatenate(c.first(), &filter_output_sorted(c.second(), dims)?)
        }
        TransformKind::PassThrough(p) => {
            let inner_src = p.inner().source_ndim();
            let inner_tgt = p.inner().target_ndim();
            let inner_start = p.first();
            let inner_end = inner_start + inner_tgt;

            let inner: Vec<usize> = dims
                .iter()
                .filter(|d| (inner_start..inner_end).contains(*d))
                .map(|d| d - inner_start)
                .collect();
            if inner.is_empty() {
                // only pass-through ordinates, which are copies of inputs
                let sources: Vec<usize> = dims
                    .iter()
                    .map(|d| if *d < inner_start { *d } else { d - inner_tgt + inner_src })
                    .collect();
                return factory::linear(selection_matrix(t.source_ndim(), &sources));
            }

            let sub = filter_output_sorted(p.inner(), &inner)?;
            let reduced = factory::pass_through(inner_start, &sub, p.trailing())?;
            let mut rows: Vec<usize> = dims
                .iter()
                .filter(|d| !(inner_start..inner_end).contains(*d))
                .map(|d| if *d < inner_start { *d } else { d - inner_tgt + inner.len() })
                .chain(inner_start..inner_start + inner.len())
                .collect();
            rows.sort_unstable();
            if rows.len() == reduced.target_ndim() {
                return Ok(reduced);
            }
            factory::concatenate(
                &reduced,
                &factory::linear(selection_matrix(reduced.target_ndim(), &rows))?,
            )
        }
        _ => factory::concatenate(
            t,
            &factory::linear(selection_matrix(t.target_ndim(), dims))?,
        ),
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;
    use crate::tests::init_logger;
    use crate::{Ellipsoid, MercatorParams};

    #[test]
    fn test_identity_like_matrix() {
        init_logger();
        let m = Matrix::identity(4, 4);
        let lin = factory::linear(m).unwrap();
        for d in 0..3 {
            let s = separate_input(&lin, &[d]).unwrap();
            assert!(s.transform.ptr_eq(&factory::identity(1)));
            assert_eq!(s.target_dims, vec![d]);
        }
    }

    #[test]
    fn test_matrix_dependencies() {
        #[rustfmt::skip]
        let m = Matrix::try_new(vec![
            2.0, 0.0, 0.0, 1.0,
            0.0, 1.0, 1.0, 0.0,
            0.0, 0.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ], 4).unwrap();
        let t = factory::linear(m).unwrap();

        let x = filter_input_dims(&t, &[0]).unwrap();
        assert_eq!(x.transform_point(&[3.0]).unwrap().as_slice(), &[7.0]);

        assert!(matches!(
            filter_input_dims(&t, &[1]),
            Err(TransformError::NotSeparable(_))
        ));

        let s = separate_input(&t, &[2, 1]).unwrap();
        assert_eq!(s.target_dims, vec![1, 2]);
        assert_eq!(
            s.transform.transform_point(&[1.0, 2.0]).unwrap().as_slice(),
            &[3.0, 2.0]
        );
    }

    #[test]
    fn test_concatenation_with_pass_through() {
        let merc = factory::projection(MercatorParams::default()).unwrap();
        let horizontal = factory::pass_through(0, &merc, 1).unwrap();
        let scale =
            factory::linear(Matrix::scale_translate(&[1.0, 1.0, 2.0], &[0.0, 0.0, 5.0]).unwrap())
                .unwrap();
        let chain = factory::concatenate(&horizontal, &scale).unwrap();
        assert!(matches!(chain.kind(), TransformKind::Concatenated(_)));

        let s = separate_input(&chain, &[2]).unwrap();
        assert_eq!(s.target_dims, vec![2]);
        assert_eq!(s.transform.transform_point(&[10.0]).unwrap().as_slice(), &[25.0]);

        let s = separate_input(&chain, &[0, 1]).unwrap();
        assert_eq!(s.target_dims, vec![0, 1]);
        assert!(s.transform.ptr_eq(&merc));

        assert!(matches!(
            filter_input_dims(&chain, &[0]),
            Err(TransformError::NotSeparable(_))
        ));
    }

    #[test]
    fn test_pass_through_partial_inner() {
        let m = Matrix::scale_translate(&[2.0, 3.0], &[1.0, 1.0]).unwrap();
        let exp = factory::exponential_1d(2.0, 1.0).unwrap();
        let inner = factory::concatenate(
            &factory::pass_through(0, &exp, 1).unwrap(),
            &factory::linear(m).unwrap(),
        )
        .unwrap();
        let t = factory::pass_through(1, &inner, 1).unwrap();
        let s = separate_input(&t, &[0, 2, 3]).unwrap();
        assert_eq!(s.target_dims, vec![0, 2, 3]);
        let out = s.transform.transform_point(&[5.0, 4.0, 6.0]).unwrap();
        assert_eq!(out.as_slice(), &[5.0, 13.0, 6.0]);
    }

    #[test]
    fn test_non_linear_is_not_separable() {
        let merc = factory::projection(MercatorParams::default()).unwrap();
        assert!(matches!(
            filter_input_dims(&merc, &[1]),
            Err(TransformError::NotSeparable(_))
        ));
        assert!(filter_input_dims(&merc, &[0, 1]).unwrap().ptr_eq(&merc));
    }

    #[test]
    fn test_output_filter() {
        let geo = factory::geocentric(Ellipsoid::WGS84, false).unwrap();
        let z = filter_output_dims(&geo, &[2]).unwrap();
        assert_eq!((z.source_ndim(), z.target_ndim()), (2, 1));
        let full = geo.transform_point(&[10.0, 45.0]).unwrap();
        assert_relative_eq!(z.transform_point(&[10.0, 45.0]).unwrap()[0], full[2]);

        let m = Matrix::scale_translate(&[2.0, 3.0, 4.0], &[1.0, 2.0, 3.0]).unwrap();
        let lin = factory::linear(m).unwrap();
        let t = filter_output_dims(&lin, &[0, 2]).unwrap();
        assert_eq!(
            t.transform_point(&[1.0, 1.0, 1.0]).unwrap().as_slice(),
            &[3.0, 7.0]
        );
    }

    #[test]
    fn test_output_filter_pass_through() {
        let exp = factory::exponential_1d(2.0, 1.0).unwrap();
        let t = factory::pass_through(1, &exp, 1).unwrap();

        let outer = filter_output_dims(&t, &[0, 2]).unwrap();
        assert!(outer.matrix().is_some());
        assert_eq!(
            outer.transform_point(&[7.0, 3.0, 9.0]).unwrap().as_slice(),
            &[7.0, 9.0]
        );

        let middle = filter_output_dims(&t, &[1, 2]).unwrap();
        assert_eq!((middle.source_ndim(), middle.target_ndim()), (3, 2));
        assert_eq!(
            middle.transform_point(&[7.0, 3.0, 9.0]).unwrap().as_slice(),
            &[8.0, 9.0]
        );
    }

    #[test]
    fn test_invalid_dims() {
        let t = factory::identity(2);
        assert!(matches!(
            filter_input_dims(&t, &[2]),
            Err(TransformError::InvalidParameter(_))
        ));
        assert!(matches!(
            filter_output_dims(&t, &[]),
            Err(TransformError::InvalidParameter(_))
        ));
    }
}
