//! Construction entry points.
//!
//! Every transform is built here. Results are canonicalised
//! (e.g. a 1-D matrix becomes [Linear1D], an identity matrix becomes [Identity])
//! and interned, so structurally equal transforms share one allocation.
//! Concatenations are optimised as they are built:
//! identities are absorbed, inverse pairs cancel, adjacent matrices are multiplied out
//! and some non-linear 1-D pairs collapse to a closed form.

use std::sync::{Arc, OnceLock};

use crate::{
    Ellipsoid, MathTransform, Matrix, Result, TransformError, TransformKind,
    geocentric::GeocentricTransform,
    molodensky::{MolodenskyParams, MolodenskyTransform},
    pool,
    projection::{MapProjection, ProjectionParams, ProjectionTransform},
    transforms::{
        Affine2D, Concatenated, Constant, Exponential1D, Identity, Linear, Linear1D,
        Logarithmic1D, PassThrough,
    },
};

const IDENTITY_CACHE_SIZE: usize = 8;

static IDENTITIES: [OnceLock<MathTransform>; IDENTITY_CACHE_SIZE] =
    [const { OnceLock::new() }; IDENTITY_CACHE_SIZE];

/// Identity transform in `ndim` dimensions.
pub fn identity(ndim: usize) -> MathTransform {
    let make = || pool::intern(TransformKind::Identity(Identity::new(ndim)));
    match IDENTITIES.get(ndim) {
        Some(cell) => cell.get_or_init(make).clone(),
        None => make(),
    }
}

/// Transform described by an augmented matrix.
///
/// An `(M+1)×(N+1)` matrix maps N dimensions to M.
/// Affine matrices are specialised where possible.
pub fn linear(matrix: Matrix) -> Result<MathTransform> {
    if matrix.nrows() == 0 || matrix.ncols() == 0 {
        return Err(TransformError::InvalidParameter(
            "matrix must have at least one row and column".into(),
        ));
    }
    if matrix.is_affine() {
        if matrix.is_identity() {
            return Ok(identity(matrix.ncols() - 1));
        }
        match (matrix.nrows(), matrix.ncols()) {
            (2, 2) => return Ok(linear_1d(matrix[(0, 0)], matrix[(0, 1)])),
            (3, 3) => {
                return Ok(pool::intern(TransformKind::Affine2D(Affine2D::new(
                    &matrix,
                ))));
            }
            _ => (),
        }
    }
    Ok(pool::intern(TransformKind::Linear(Linear::new(matrix))))
}

/// `y = scale·x + offset`; a zero scale gives a constant.
pub fn linear_1d(scale: f64, offset: f64) -> MathTransform {
    if scale == 0.0 {
        return pool::intern(TransformKind::Constant(Constant::new(offset)));
    }
    if scale == 1.0 && offset == 0.0 {
        return identity(1);
    }
    pool::intern(TransformKind::Linear1D(Linear1D::new(scale, offset)))
}

fn check_base(base: f64) -> Result<()> {
    if !(base.is_finite() && base > 0.0 && base != 1.0) {
        return Err(TransformError::InvalidParameter(format!(
            "logarithm base must be positive, finite and not 1; got {base}"
        )));
    }
    Ok(())
}

/// `y = factor · base^x`
pub fn exponential_1d(base: f64, factor: f64) -> Result<MathTransform> {
    check_base(base)?;
    if !factor.is_finite() || factor == 0.0 {
        return Err(TransformError::InvalidParameter(format!(
            "exponential factor must be finite and non-zero; got {factor}"
        )));
    }
    Ok(pool::intern(TransformKind::Exponential1D(
        Exponential1D::new(base, factor),
    )))
}

/// `y = log_base(x) + offset`
pub fn logarithmic_1d(base: f64, offset: f64) -> Result<MathTransform> {
    check_base(base)?;
    if !offset.is_finite() {
        return Err(TransformError::InvalidParameter(format!(
            "logarithm offset must be finite; got {offset}"
        )));
    }
    Ok(pool::intern(TransformKind::Logarithmic1D(
        Logarithmic1D::new(base, offset),
    )))
}

/// Transform which applies `first`, then `second`.
///
/// The result is simplified as far as possible;
/// a generic two-step node is only built when nothing else applies.
pub fn concatenate(first: &MathTransform, second: &MathTransform) -> Result<MathTransform> {
    TransformError::check_dim(first.target_ndim(), second.source_ndim())?;

    if let Some(t) = fuse(first, second)? {
        return Ok(t);
    }

    // re-associate to give adjacent steps a chance to fuse
    if let TransformKind::Concatenated(c) = first.kind() {
        if let Some(fused) = fuse(c.second(), second)? {
            log::debug!("Re-associated concatenation with its right neighbour");
            return concatenate(c.first(), &fused);
        }
    }
    if let TransformKind::Concatenated(c) = second.kind() {
        if let Some(fused) = fuse(first, c.first())? {
            log::debug!("Re-associated concatenation with its left neighbour");
            return concatenate(&fused, c.second());
        }
    }

    Ok(pool::intern(TransformKind::Concatenated(Concatenated::new(
        first.clone(),
        second.clone(),
    ))))
}

/// Concatenate any number of transforms, in application order.
pub fn concatenate_all(transforms: &[MathTransform]) -> Result<MathTransform> {
    let (head, tail) = transforms.split_first().ok_or_else(|| {
        TransformError::InvalidParameter("cannot concatenate zero transforms".into())
    })?;
    tail.iter()
        .try_fold(head.clone(), |acc, t| concatenate(&acc, t))
}

/// A single transform equivalent to `first` then `second`, if one is known.
fn fuse(first: &MathTransform, second: &MathTransform) -> Result<Option<MathTransform>> {
    if first.is_identity() {
        return Ok(Some(second.clone()));
    }
    if second.is_identity() {
        return Ok(Some(first.clone()));
    }
    // a dimension-reducing step followed by its inverse loses information
    if first.source_ndim() <= first.target_ndim() && first.is_inverse_of(second) {
        log::debug!("Cancelled a transform against its inverse");
        return Ok(Some(identity(first.source_ndim())));
    }
    if let (Some(m1), Some(m2)) = (first.matrix(), second.matrix()) {
        log::debug!(
            "Fusing {}×{} and {}×{} matrices",
            m1.nrows(),
            m1.ncols(),
            m2.nrows(),
            m2.ncols()
        );
        return linear(m2.multiply(&m1)?).map(Some);
    }
    if let Some(t) = fuse_1d(first, second) {
        log::debug!("Collapsed a one-dimensional pair into {t:?}");
        return Ok(Some(t));
    }
    if let (TransformKind::PassThrough(p1), TransformKind::PassThrough(p2)) =
        (first.kind(), second.kind())
    {
        if p1.first() == p2.first() && p1.trailing() == p2.trailing() {
            let inner = concatenate(p1.inner(), p2.inner())?;
            return pass_through(p1.first(), &inner, p1.trailing()).map(Some);
        }
    }
    Ok(None)
}

/// Closed forms for pairs of exponential, logarithmic and 1-D linear transforms.
fn fuse_1d(first: &MathTransform, second: &MathTransform) -> Option<MathTransform> {
    use TransformKind as K;

    match (first.kind(), second.kind()) {
        (K::Constant(c), _) if second.source_ndim() == 1 && second.target_ndim() == 1 => {
            second.eval_1d(c.value()).ok().map(|v| linear_1d(0.0, v))
        }
        (_, K::Constant(_)) if first.source_ndim() == 1 => Some(second.clone()),
        // f·b^(s·x + o) = (f·b^o)·(b^s)^x
        (K::Linear1D(l), K::Exponential1D(e)) => exponential_1d(
            e.base().powf(l.scale()),
            e.factor() * e.base().powf(l.offset()),
        )
        .ok(),
        (K::Exponential1D(e), K::Linear1D(l)) if l.offset() == 0.0 => {
            exponential_1d(e.base(), e.factor() * l.scale()).ok()
        }
        // log_c(f·b^x) + o = x·ln(b)/ln(c) + ln(f)/ln(c) + o
        (K::Exponential1D(e), K::Logarithmic1D(g)) if e.factor() > 0.0 => {
            let ln_c = g.base().ln();
            Some(linear_1d(
                e.base().ln() / ln_c,
                e.factor().ln() / ln_c + g.offset(),
            ))
        }
        // log_c(s·x) + o = log_c(x) + log_c(s) + o
        (K::Linear1D(l), K::Logarithmic1D(g)) if l.offset() == 0.0 && l.scale() > 0.0 => {
            logarithmic_1d(g.base(), g.offset() + l.scale().ln() / g.base().ln()).ok()
        }
        // s·(log_c(x) + off) + o = log_(c^(1/s))(x) + s·off + o
        (K::Logarithmic1D(g), K::Linear1D(l)) => logarithmic_1d(
            g.base().powf(1.0 / l.scale()),
            l.scale() * g.offset() + l.offset(),
        )
        .ok(),
        _ => None,
    }
}

/// Apply `inner` to a slice of the ordinates, passing `first` leading
/// and `trailing` trailing ordinates through unchanged.
pub fn pass_through(
    first: usize,
    inner: &MathTransform,
    trailing: usize,
) -> Result<MathTransform> {
    if first == 0 && trailing == 0 {
        return Ok(inner.clone());
    }
    if inner.is_identity() {
        return Ok(identity(first + inner.source_ndim() + trailing));
    }
    if let TransformKind::PassThrough(p) = inner.kind() {
        return pass_through(first + p.first(), p.inner(), trailing + p.trailing());
    }
    if let Some(m) = inner.matrix().filter(|m| m.is_affine()) {
        return linear(expand_matrix(&m, first, trailing));
    }
    Ok(pool::intern(TransformKind::PassThrough(PassThrough::new(
        first,
        inner.clone(),
        trailing,
    ))))
}

/// Embed an affine matrix into a larger one with identity rows and columns around it.
fn expand_matrix(m: &Matrix, first: usize, trailing: usize) -> Matrix {
    let inner_src = m.ncols() - 1;
    let inner_tgt = m.nrows() - 1;
    let src = first + inner_src + trailing;
    let tgt = first + inner_tgt + trailing;

    let mut out = Matrix::zeros(tgt + 1, src + 1);
    for i in 0..first {
        out[(i, i)] = 1.0;
    }
    out.copy_block(m, 0, 0, first, first, inner_tgt, inner_src);
    for r in 0..inner_tgt {
        out[(first + r, src)] = m[(r, inner_src)];
    }
    for i in 0..trailing {
        out[(first + inner_tgt + i, first + inner_src + i)] = 1.0;
    }
    out[(tgt, src)] = 1.0;
    out
}

/// Forward map projection, from (longitude, latitude) in degrees to metres.
pub fn projection(params: impl Into<ProjectionParams>) -> Result<MathTransform> {
    let projection = MapProjection::new(params.into())?;
    Ok(pool::intern(TransformKind::Projection(
        ProjectionTransform::forward(Arc::new(projection)),
    )))
}

/// Geodetic to geocentric conversion on the given ellipsoid.
///
/// The source is (longitude, latitude) in degrees, followed by the ellipsoidal height in metres
/// if `has_height`; the target is geocentric (X, Y, Z) in metres.
pub fn geocentric(ellipsoid: Ellipsoid, has_height: bool) -> Result<MathTransform> {
    ellipsoid.validate()?;
    Ok(pool::intern(TransformKind::Geocentric(
        GeocentricTransform::forward(ellipsoid, has_height),
    )))
}

/// Molodensky datum shift between two ellipsoids.
pub fn molodensky(params: MolodenskyParams) -> Result<MathTransform> {
    params.validate()?;
    Ok(pool::intern(TransformKind::Molodensky(
        MolodenskyTransform::new(params),
    )))
}

/// Build the inverse of `t`, without consulting or updating its cached inverse.
pub(crate) fn create_inverse(t: &MathTransform) -> Result<MathTransform> {
    log::trace!("Computing inverse of {t:?}");
    match t.kind() {
        TransformKind::Identity(_) => Ok(t.clone()),
        TransformKind::Constant(c) => Err(TransformError::NonInvertible(format!(
            "constant {} discards its input",
            c.value()
        ))),
        TransformKind::Linear1D(l) => Ok(linear_1d(1.0 / l.scale(), -l.offset() / l.scale())),
        TransformKind::Affine2D(a) => linear(a.matrix().inverse()?),
        TransformKind::Linear(l) => linear(l.matrix().inverse()?),
        TransformKind::Exponential1D(e) => {
            if e.factor() <= 0.0 {
                return Err(TransformError::NonInvertible(format!(
                    "exponential with factor {} is not positive",
                    e.factor()
                )));
            }
            logarithmic_1d(e.base(), -e.factor().ln() / e.base().ln())
        }
        TransformKind::Logarithmic1D(g) => {
            exponential_1d(g.base(), g.base().powf(-g.offset()))
        }
        TransformKind::Concatenated(c) => {
            concatenate(&c.second().inverse()?, &c.first().inverse()?)
        }
        TransformKind::PassThrough(p) => {
            pass_through(p.first(), &p.inner().inverse()?, p.trailing())
        }
        TransformKind::Projection(p) => Ok(pool::intern(TransformKind::Projection(p.inverted()))),
        TransformKind::Geocentric(g) => Ok(pool::intern(TransformKind::Geocentric(g.inverted()))),
        TransformKind::Molodensky(m) => molodensky(m.params().inverted()),
    }
}

#[cfg(test)]
mod tests {
    use approx::{assert_relative_eq, assert_ulps_eq};
    use faer::rand::Rng;

    use super::*;
    use crate::tests::{check_inverse_roundtrip, init_logger, make_coords, new_rng};
    use crate::{Ellipsoid, MercatorParams};

    fn random_affine(rng: &mut impl Rng, tgt: usize, src: usize) -> Matrix {
        let mut m = Matrix::zeros(tgt + 1, src + 1);
        for r in 0..tgt {
            for c in 0..=src {
                m[(r, c)] = rng.random::<f64>() * 4.0 - 2.0;
            }
        }
        m[(tgt, src)] = 1.0;
        m
    }

    #[test]
    fn test_matrix_fusion_is_product() {
        init_logger();
        let mut rng = new_rng();
        for (a, b, c) in [(3, 3, 3), (2, 3, 4), (4, 2, 1), (1, 1, 1), (2, 2, 2)] {
            let m1 = random_affine(&mut rng, b, a);
            let m2 = random_affine(&mut rng, c, b);
            let t = concatenate(&linear(m1.clone()).unwrap(), &linear(m2.clone()).unwrap())
                .unwrap();
            let expected = m2.multiply(&m1).unwrap();
            let actual = t.matrix().expect("fused transform is linear");
            assert_eq!(actual, expected, "shape {a}→{b}→{c}");
            assert!(t.ptr_eq(&linear(expected).unwrap()));
        }
    }

    #[test]
    fn test_projective_fusion() {
        #[rustfmt::skip]
        let m = Matrix::try_new(vec![
            1.0, 0.0, 0.0,
            0.0, 1.0, 0.0,
            0.1, 0.0, 1.0,
        ], 3).unwrap();
        let p = linear(m.clone()).unwrap();
        let t = concatenate(&p, &p).unwrap();
        assert_eq!(t.matrix().unwrap(), m.multiply(&m).unwrap());
    }

    #[test]
    fn test_identity_absorbed() {
        let merc = projection(MercatorParams::default()).unwrap();
        assert!(concatenate(&identity(2), &merc).unwrap().ptr_eq(&merc));
        assert!(concatenate(&merc, &identity(2)).unwrap().ptr_eq(&merc));
        assert!(matches!(
            concatenate(&merc, &identity(3)),
            Err(TransformError::DimensionMismatch { expected: 2, actual: 3 })
        ));
    }

    #[test]
    fn test_inverse_cancels() {
        let mut rng = new_rng();
        let lin = linear(random_affine(&mut rng, 3, 3)).unwrap();
        let t = concatenate(&lin, &lin.inverse().unwrap()).unwrap();
        assert!(t.ptr_eq(&identity(3)));

        let merc = projection(MercatorParams::default()).unwrap();
        let t = concatenate(&merc, &merc.inverse().unwrap()).unwrap();
        assert!(t.ptr_eq(&identity(2)));

        let exp = exponential_1d(3.0, 2.0).unwrap();
        let pt = pass_through(2, &exp, 1).unwrap();
        let t = concatenate(&pt, &pt.inverse().unwrap()).unwrap();
        assert!(t.ptr_eq(&identity(4)));
    }

    #[test]
    fn test_height_dropping_pair_does_not_cancel() {
        let geo = geocentric(Ellipsoid::WGS84, false).unwrap();
        let inv = geo.inverse().unwrap();
        assert!(concatenate(&geo, &inv).unwrap().ptr_eq(&identity(2)));
        let t = concatenate(&inv, &geo).unwrap();
        assert!(!t.is_identity());
        assert_eq!(t.source_ndim(), 3);
    }

    #[test]
    fn test_reassociation_fuses_neighbours() {
        let merc = projection(MercatorParams::default()).unwrap();
        let a = linear(Matrix::scale_translate(&[2.0, 2.0], &[1.0, 1.0]).unwrap()).unwrap();
        let b = linear(Matrix::scale_translate(&[0.5, 0.25], &[0.0, -3.0]).unwrap()).unwrap();
        let chain = concatenate(&merc, &a).unwrap();
        let t = concatenate(&chain, &b).unwrap();
        let TransformKind::Concatenated(c) = t.kind() else {
            panic!("expected a concatenation, got {t:?}");
        };
        assert!(c.first().ptr_eq(&merc));
        let fused = c.second().matrix().unwrap();
        assert_eq!(fused, b.matrix().unwrap().multiply(&a.matrix().unwrap()).unwrap());

        let chain = concatenate(&a, &merc).unwrap();
        let t = concatenate(&b, &chain).unwrap();
        let TransformKind::Concatenated(c) = t.kind() else {
            panic!("expected a concatenation, got {t:?}");
        };
        assert!(c.second().ptr_eq(&merc));
        assert!(c.first().matrix().is_some());
    }

    #[test]
    fn test_concatenate_all() {
        let steps = [
            linear_1d(2.0, 1.0),
            linear_1d(3.0, 0.0),
            linear_1d(1.0, -3.0),
        ];
        let t = concatenate_all(&steps).unwrap();
        let TransformKind::Linear1D(l) = t.kind() else {
            panic!("expected a 1-D linear transform, got {t:?}");
        };
        assert_eq!((l.scale(), l.offset()), (6.0, 0.0));
        assert!(concatenate_all(&[]).is_err());
    }

    #[test]
    fn test_one_dimensional_fusions() {
        let exp = exponential_1d(10.0, 2.0).unwrap();
        let log = logarithmic_1d(10.0, 0.0).unwrap();
        let lin = linear_1d(3.0, 0.0);
        let shifted = linear_1d(3.0, 1.0);

        let x = 0.7;
        let check = |a: &MathTransform, b: &MathTransform| {
            let t = concatenate(a, b).unwrap();
            assert!(
                !matches!(t.kind(), TransformKind::Concatenated(_)),
                "{a:?} then {b:?} did not collapse"
            );
            let expected = b.transform_point(&a.transform_point(&[x]).unwrap()).unwrap()[0];
            assert_relative_eq!(
                t.transform_point(&[x]).unwrap()[0],
                expected,
                max_relative = 1e-12
            );
        };

        check(&shifted, &exp);
        check(&exp, &lin);
        check(&exp, &log);
        check(&lin, &log);
        check(&log, &shifted);

        let t = concatenate(&exp, &log).unwrap();
        assert!(matches!(t.kind(), TransformKind::Linear1D(_)));
    }

    #[test]
    fn test_constant_propagates() {
        let c = linear_1d(0.0, 2.0);
        let exp = exponential_1d(3.0, 1.0).unwrap();
        let t = concatenate(&c, &exp).unwrap();
        let TransformKind::Constant(k) = t.kind() else {
            panic!("expected a constant, got {t:?}");
        };
        assert_ulps_eq!(k.value(), 9.0);
        assert!(concatenate(&exp, &c).unwrap().ptr_eq(&c));
    }

    #[test]
    fn test_pass_through_of_nothing_is_inner() {
        let merc = projection(MercatorParams::default()).unwrap();
        assert!(pass_through(0, &merc, 0).unwrap().ptr_eq(&merc));
        assert!(pass_through(2, &identity(3), 1).unwrap().ptr_eq(&identity(6)));
    }

    #[test]
    fn test_pass_through_concatenation_merges() {
        let exp = exponential_1d(2.0, 1.0).unwrap();
        let log = logarithmic_1d(3.0, 0.0).unwrap();
        let a = pass_through(1, &exp, 1).unwrap();
        let b = pass_through(1, &log, 1).unwrap();
        let t = concatenate(&a, &b).unwrap();
        // exp then log collapses to a 1-D scale, which becomes one matrix
        assert!(t.matrix().is_some());
        check_inverse_roundtrip(&t, &make_coords(100, 3, 10.0), 1e-9);
    }

    #[test]
    fn test_expand_matrix() {
        #[rustfmt::skip]
        let inner = Matrix::try_new(vec![
            1.0, 2.0, 3.0,
            4.0, 5.0, 6.0,
            7.0, 8.0, 9.0,
            0.0, 0.0, 1.0,
        ], 3).unwrap();
        let t = pass_through(1, &linear(inner).unwrap(), 1).unwrap();
        assert_eq!((t.source_ndim(), t.target_ndim()), (4, 5));
        let out = t.transform_point(&[-1.0, 1.0, 1.0, 42.0]).unwrap();
        assert_eq!(out.as_slice(), &[-1.0, 6.0, 15.0, 24.0, 42.0]);
    }

    #[test]
    fn test_invalid_linear() {
        assert!(matches!(
            linear(Matrix::zeros(0, 0)),
            Err(TransformError::InvalidParameter(_))
        ));
    }
}
