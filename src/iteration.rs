//! Batch evaluation over packed coordinate arrays.
//!
//! Points are stored contiguously, `ndim` ordinates per point.
//! When source and destination are the same buffer the ranges may overlap,
//! so the iteration order has to be chosen such that no source point is overwritten before it is read.

use smallvec::smallvec;

use crate::{MathTransform, Result, ShortVec, TransformError};

/// Floating point types which can be read into and written from the double precision computation.
pub trait Ordinate: Copy + Send + Sync {
    fn to_f64(self) -> f64;
    fn from_f64(v: f64) -> Self;
}

impl Ordinate for f64 {
    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

impl Ordinate for f32 {
    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationStrategy {
    /// Front to back.
    Ascending,
    /// Back to front.
    Descending,
    /// Copy the source range before transforming, when neither direction is safe.
    BufferSource,
}

impl IterationStrategy {
    /// Choose the iteration order for transforming `count` points in place.
    pub fn suggest(
        src_offset: usize,
        src_ndim: usize,
        dst_offset: usize,
        dst_ndim: usize,
        count: usize,
    ) -> Self {
        if count <= 1 {
            return IterationStrategy::Ascending;
        }
        let (s, sd) = (src_offset as i128, src_ndim as i128);
        let (d, dd) = (dst_offset as i128, dst_ndim as i128);
        let n = count as i128;

        // disjoint ranges
        if d + n * dd <= s || s + n * sd <= d {
            return IterationStrategy::Ascending;
        }

        // Ascending is safe when writing point k-1 never reaches the start of point k,
        // i.e. `d + k·dd <= s + k·sd` for every k in 1..count.
        // Descending is safe when the mirror inequality holds.
        // Both sides are linear in k, so checking the ends of the range is enough.
        let gap = |k: i128| (d + k * dd) - (s + k * sd);
        let (first, last) = (gap(1), gap(n - 1));
        if first <= 0 && last <= 0 {
            IterationStrategy::Ascending
        } else if first >= 0 && last >= 0 {
            IterationStrategy::Descending
        } else {
            IterationStrategy::BufferSource
        }
    }
}

fn check_range(len: usize, offset: usize, ndim: usize, count: usize) -> Result<()> {
    let needed = offset + ndim * count;
    if needed > len {
        return Err(TransformError::DimensionMismatch {
            expected: needed,
            actual: len,
        });
    }
    Ok(())
}

/// Transform one point, writing `NaN` and remembering the error if it fails.
#[inline]
fn transform_one<S: Ordinate, D: Ordinate>(
    t: &MathTransform,
    src: &[S],
    pt: &mut [f64],
    out: &mut [f64],
    dst: &mut [D],
    first_error: &mut Option<TransformError>,
) {
    for (p, s) in pt.iter_mut().zip(src.iter()) {
        *p = s.to_f64();
    }
    if let Err(e) = t.eval(pt, out) {
        out.fill(f64::NAN);
        if first_error.is_none() {
            log::debug!("Point {pt:?} failed: {e}");
            *first_error = Some(e);
        }
    }
    for (d, o) in dst.iter_mut().zip(out.iter()) {
        *d = D::from_f64(*o);
    }
}

fn finish(first_error: Option<TransformError>) -> Result<()> {
    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

pub(crate) fn transform_between<S: Ordinate, D: Ordinate>(
    t: &MathTransform,
    src: &[S],
    src_offset: usize,
    dst: &mut [D],
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    let src_ndim = t.source_ndim();
    let dst_ndim = t.target_ndim();
    check_range(src.len(), src_offset, src_ndim, count)?;
    check_range(dst.len(), dst_offset, dst_ndim, count)?;

    let mut pt: ShortVec<f64> = smallvec![f64::NAN; src_ndim];
    let mut out: ShortVec<f64> = smallvec![f64::NAN; dst_ndim];
    let mut first_error = None;

    if src_ndim == 0 || dst_ndim == 0 {
        // zero-width points cannot be chunked
        for idx in 0..count {
            let s = &src[src_offset + idx * src_ndim..src_offset + (idx + 1) * src_ndim];
            let d = &mut dst[dst_offset + idx * dst_ndim..dst_offset + (idx + 1) * dst_ndim];
            transform_one(t, s, &mut pt, &mut out, d, &mut first_error);
        }
        return finish(first_error);
    }

    let src_pts = src[src_offset..src_offset + src_ndim * count].chunks_exact(src_ndim);
    let dst_pts = dst[dst_offset..dst_offset + dst_ndim * count].chunks_exact_mut(dst_ndim);
    for (s, d) in src_pts.zip(dst_pts) {
        transform_one(t, s, &mut pt, &mut out, d, &mut first_error);
    }
    finish(first_error)
}

pub(crate) fn transform_within<T: Ordinate>(
    t: &MathTransform,
    buf: &mut [T],
    src_offset: usize,
    dst_offset: usize,
    count: usize,
) -> Result<()> {
    let src_ndim = t.source_ndim();
    let dst_ndim = t.target_ndim();
    check_range(buf.len(), src_offset, src_ndim, count)?;
    check_range(buf.len(), dst_offset, dst_ndim, count)?;

    let strategy = IterationStrategy::suggest(src_offset, src_ndim, dst_offset, dst_ndim, count);
    log::trace!("Transforming {count} points in place, {strategy:?}");

    let mut pt: ShortVec<f64> = smallvec![f64::NAN; src_ndim];
    let mut out: ShortVec<f64> = smallvec![f64::NAN; dst_ndim];
    let mut first_error = None;

    let mut step = |idx: usize, buf: &mut [T], first_error: &mut Option<TransformError>| {
        let s_start = src_offset + idx * src_ndim;
        for (p, s) in pt.iter_mut().zip(buf[s_start..s_start + src_ndim].iter()) {
            *p = s.to_f64();
        }
        if let Err(e) = t.eval(&pt, &mut out) {
            out.fill(f64::NAN);
            if first_error.is_none() {
                *first_error = Some(e);
            }
        }
        let d_start = dst_offset + idx * dst_ndim;
        for (d, o) in buf[d_start..d_start + dst_ndim].iter_mut().zip(out.iter()) {
            *d = T::from_f64(*o);
        }
    };

    match strategy {
        IterationStrategy::Ascending => {
            for idx in 0..count {
                step(idx, buf, &mut first_error);
            }
        }
        IterationStrategy::Descending => {
            for idx in (0..count).rev() {
                step(idx, buf, &mut first_error);
            }
        }
        IterationStrategy::BufferSource => {
            let copy = buf[src_offset..src_offset + src_ndim * count].to_vec();
            return transform_between(t, &copy, 0, buf, dst_offset, count);
        }
    }
    finish(first_error)
}

#[cfg(test)]
mod tests {
    use super::IterationStrategy;
    use crate::tests::{check_in_place_overlap, init_logger, make_coords};
    use crate::{Matrix, TransformError, factory};

    #[test]
    fn test_suggest() {
        assert_eq!(
            IterationStrategy::suggest(0, 2, 0, 2, 10),
            IterationStrategy::Ascending
        );
        assert_eq!(
            IterationStrategy::suggest(0, 2, 4, 2, 10),
            IterationStrategy::Descending
        );
        assert_eq!(
            IterationStrategy::suggest(4, 2, 0, 2, 10),
            IterationStrategy::Ascending
        );
        // expanding 2 -> 3 ordinates while starting behind the source
        assert_eq!(
            IterationStrategy::suggest(6, 2, 0, 3, 10),
            IterationStrategy::BufferSource
        );
        assert_eq!(
            IterationStrategy::suggest(0, 2, 100, 2, 10),
            IterationStrategy::Ascending
        );
    }

    #[test]
    fn test_in_place_overlap_linear() {
        init_logger();
        let m = Matrix::scale_translate(&[2.0, -1.0, 0.5], &[10.0, 0.0, -4.0]).unwrap();
        let t = factory::linear(m).unwrap();
        check_in_place_overlap(&t, &make_coords(50, 3, 100.0));
    }

    #[test]
    fn test_in_place_overlap_changing_dimension() {
        init_logger();
        #[rustfmt::skip]
        let m = Matrix::try_new(vec![
            1.0, 0.0, 5.0,
            0.0, 1.0, 6.0,
            1.0, 1.0, 0.0,
            0.0, 0.0, 1.0,
        ], 3).unwrap();
        let t = factory::linear(m).unwrap();
        check_in_place_overlap(&t, &make_coords(50, 2, 100.0));

        #[rustfmt::skip]
        let m = Matrix::try_new(vec![
            1.0, 0.0, 0.0, 5.0,
            0.0, 1.0, 1.0, 0.0,
            0.0, 0.0, 0.0, 1.0,
        ], 4).unwrap();
        let t = factory::linear(m).unwrap();
        check_in_place_overlap(&t, &make_coords(50, 3, 100.0));
    }

    #[test]
    fn test_batch_continues_after_failure() {
        init_logger();
        let proj = factory::projection(crate::MercatorParams::default()).unwrap();
        let src = [0.0, 0.0, 10.0, 95.0, 10.0, 45.0];
        let mut dst = [0.0; 6];
        let err = proj.transform_points(&src, 0, &mut dst, 0, 3).unwrap_err();
        assert!(matches!(err, TransformError::OutOfDomain(_)));
        assert!(dst[2].is_nan() && dst[3].is_nan());
        assert!(dst[4].is_finite() && dst[5].is_finite());
    }

    #[test]
    fn test_range_checked() {
        let t = factory::identity(2);
        let src = [0.0; 5];
        let mut dst = [0.0; 6];
        assert!(matches!(
            t.transform_points(&src, 0, &mut dst, 0, 3),
            Err(TransformError::DimensionMismatch { expected: 6, actual: 5 })
        ));
    }

    #[test]
    fn test_single_precision_matches_double() {
        let t = factory::linear(Matrix::scale_translate(&[2.0, 3.0], &[1.0, -1.0]).unwrap()).unwrap();
        let src = [1.5_f32, 2.5, -4.0, 8.0];
        let mut dst = [0.0_f32; 4];
        t.transform_points_f32(&src, 0, &mut dst, 0, 2).unwrap();
        assert_eq!(dst, [4.0, 6.5, -7.0, 23.0]);

        let mut buf = [1.5_f32, 2.5, -4.0, 8.0, 0.0, 0.0];
        t.transform_points_in_place_f32(&mut buf, 0, 2, 2).unwrap();
        assert_eq!(&buf[2..], &[4.0, 6.5, -7.0, 23.0]);
    }
}
