//! Map projections between geographic (longitude, latitude) in degrees and planar metres.
//!
//! Each concrete projection only implements the normalised kernel ([Projection]):
//! radians in, coordinates on an ellipsoid with unit semi-major axis out,
//! relative to its central meridian.
//! [MapProjection] wraps a kernel with everything the projections have in common:
//! domain validation, degree and metre conversions, false origin,
//! and a round-trip self-check in debug builds.

use std::{
    f64::consts::{PI, TAU},
    fmt::Debug,
    hash::{Hash, Hasher},
    sync::Arc,
};

use ordered_float::OrderedFloat;

use crate::{Ellipsoid, Result, TransformError, Transformation};

mod common;
mod lambert_conformal;
pub use lambert_conformal::LambertConformalParams;
mod mercator;
pub use mercator::MercatorParams;
mod transverse_mercator;
pub use transverse_mercator::TransverseMercatorParams;

use lambert_conformal::LambertConformal;
use mercator::Mercator;
use transverse_mercator::TransverseMercator;

/// Round-trip tolerance of the debug self-check, in metres.
#[cfg(debug_assertions)]
const SELF_CHECK_TOLERANCE: f64 = 1.0;

/// Projection kernel on an ellipsoid with unit semi-major axis.
///
/// `lambda` is the longitude relative to the central meridian,
/// already rolled into `[-π, π]`; `phi` is the latitude. Both in radians.
pub(crate) trait Projection: Debug + Send + Sync {
    fn forward(&self, lambda: f64, phi: f64) -> Result<(f64, f64)>;

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)>;

    /// Whether the kernel is accurate enough at `lambda` for the debug round-trip check.
    fn self_check_applies(&self, _lambda: f64) -> bool {
        true
    }
}

/// Parameters of every supported projection.
#[derive(Debug, Clone, Copy)]
pub enum ProjectionParams {
    Mercator(MercatorParams),
    TransverseMercator(TransverseMercatorParams),
    LambertConformal(LambertConformalParams),
}

impl From<MercatorParams> for ProjectionParams {
    fn from(value: MercatorParams) -> Self {
        Self::Mercator(value)
    }
}

impl From<TransverseMercatorParams> for ProjectionParams {
    fn from(value: TransverseMercatorParams) -> Self {
        Self::TransverseMercator(value)
    }
}

impl From<LambertConformalParams> for ProjectionParams {
    fn from(value: LambertConformalParams) -> Self {
        Self::LambertConformal(value)
    }
}

impl ProjectionParams {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Mercator(p) if p.is_2sp() => "Mercator_2SP",
            Self::Mercator(_) => "Mercator_1SP",
            Self::TransverseMercator(_) => "Transverse_Mercator",
            Self::LambertConformal(p) if p.is_tangent() => "Lambert_Conformal_Conic_1SP",
            Self::LambertConformal(_) => "Lambert_Conformal_Conic_2SP",
        }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        match self {
            Self::Mercator(p) => &p.ellipsoid,
            Self::TransverseMercator(p) => &p.ellipsoid,
            Self::LambertConformal(p) => &p.ellipsoid,
        }
    }

    /// Named numeric parameters, in a stable order.
    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        let e = self.ellipsoid();
        let mut out = vec![
            ("semi_major", e.semi_major()),
            ("semi_minor", e.semi_minor()),
        ];
        match self {
            Self::Mercator(p) => {
                out.push(("central_meridian", p.central_meridian));
                if p.is_2sp() {
                    out.push(("standard_parallel_1", p.standard_parallel));
                } else {
                    out.push(("scale_factor", p.scale_factor));
                }
                out.push(("false_easting", p.false_easting));
                out.push(("false_northing", p.false_northing));
            }
            Self::TransverseMercator(p) => out.extend([
                ("central_meridian", p.central_meridian),
                ("latitude_of_origin", p.latitude_of_origin),
                ("scale_factor", p.scale_factor),
                ("false_easting", p.false_easting),
                ("false_northing", p.false_northing),
            ]),
            Self::LambertConformal(p) => {
                out.extend([
                    ("central_meridian", p.central_meridian),
                    ("latitude_of_origin", p.latitude_of_origin),
                    ("standard_parallel_1", p.standard_parallel_1),
                ]);
                if !p.is_tangent() {
                    out.push(("standard_parallel_2", p.standard_parallel_2));
                }
                out.push(("false_easting", p.false_easting));
                out.push(("false_northing", p.false_northing));
            }
        }
        out
    }

    fn central_meridian(&self) -> f64 {
        match self {
            Self::Mercator(p) => p.central_meridian,
            Self::TransverseMercator(p) => p.central_meridian,
            Self::LambertConformal(p) => p.central_meridian,
        }
    }

    fn false_origin(&self) -> (f64, f64) {
        match self {
            Self::Mercator(p) => (p.false_easting, p.false_northing),
            Self::TransverseMercator(p) => (p.false_easting, p.false_northing),
            Self::LambertConformal(p) => (p.false_easting, p.false_northing),
        }
    }
}

impl PartialEq for ProjectionParams {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
            && self
                .parameters()
                .iter()
                .zip(other.parameters().iter())
                .all(|((_, a), (_, b))| OrderedFloat(*a) == OrderedFloat(*b))
    }
}

impl Eq for ProjectionParams {}

impl Hash for ProjectionParams {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state);
        for (_, v) in self.parameters() {
            OrderedFloat(v).hash(state);
        }
    }
}

/// Roll an angle in radians into `[-π, π]`; angles already in range are returned unchanged.
pub(crate) fn roll(angle: f64) -> f64 {
    if angle.abs() <= PI {
        angle
    } else {
        angle - TAU * ((angle + PI) / TAU).floor()
    }
}

/// A projection kernel with its ellipsoid scale, central meridian and false origin.
#[derive(Debug)]
pub struct MapProjection {
    params: ProjectionParams,
    kernel: Box<dyn Projection>,
    /// Radians.
    central_meridian: f64,
    #[cfg_attr(not(debug_assertions), allow(dead_code))]
    semi_major: f64,
    /// Semi-major axis times the scale factor at the natural origin.
    scale: f64,
    false_easting: f64,
    false_northing: f64,
}

impl MapProjection {
    pub fn new(params: ProjectionParams) -> Result<Self> {
        let ellipsoid = *params.ellipsoid();
        ellipsoid.validate()?;
        let central_meridian = params.central_meridian();
        if !(-180.0..=180.0).contains(&central_meridian) {
            return Err(TransformError::InvalidParameter(format!(
                "central meridian {central_meridian}° is outside [-180°, 180°]"
            )));
        }
        let (false_easting, false_northing) = params.false_origin();
        if !(false_easting.is_finite() && false_northing.is_finite()) {
            return Err(TransformError::InvalidParameter(format!(
                "false origin ({false_easting}, {false_northing}) must be finite"
            )));
        }

        let a = ellipsoid.semi_major();
        let (kernel, scale): (Box<dyn Projection>, f64) = match &params {
            ProjectionParams::Mercator(p) => {
                (Box::new(Mercator::new(&ellipsoid)), a * p.equator_scale()?)
            }
            ProjectionParams::TransverseMercator(p) => {
                (Box::new(TransverseMercator::new(p)?), a * p.scale_factor)
            }
            ProjectionParams::LambertConformal(p) => (Box::new(LambertConformal::new(p)?), a),
        };
        log::debug!("Created {} projection", params.name());

        Ok(Self {
            params,
            kernel,
            central_meridian: central_meridian.to_radians(),
            semi_major: a,
            scale,
            false_easting,
            false_northing,
        })
    }

    pub fn params(&self) -> &ProjectionParams {
        &self.params
    }

    /// Project (longitude, latitude) in degrees to (easting, northing) in metres.
    pub fn forward(&self, lon: f64, lat: f64) -> Result<(f64, f64)> {
        if !(-180.0..=180.0).contains(&lon) {
            return Err(TransformError::OutOfDomain(format!(
                "longitude {lon}° is outside [-180°, 180°]"
            )));
        }
        if !(-90.0..=90.0).contains(&lat) {
            return Err(TransformError::OutOfDomain(format!(
                "latitude {lat}° is outside [-90°, 90°]"
            )));
        }
        let lambda = roll(lon.to_radians() - self.central_meridian);
        let phi = lat.to_radians();
        let (x, y) = self.kernel.forward(lambda, phi)?;
        let out = (
            x * self.scale + self.false_easting,
            y * self.scale + self.false_northing,
        );

        #[cfg(debug_assertions)]
        if self.kernel.self_check_applies(lambda) {
            if let Ok(back) = self.inverse_unchecked(out.0, out.1) {
                let dlat = (back.1 - lat).to_radians();
                let dlon = roll((back.0 - lon).to_radians()) * phi.cos();
                let distance = self.semi_major * dlat.hypot(dlon);
                debug_assert!(
                    distance <= SELF_CHECK_TOLERANCE,
                    "{} round trip of ({lon}, {lat}) is off by {distance} m",
                    self.params.name()
                );
            }
        }

        Ok(out)
    }

    /// Unproject (easting, northing) in metres to (longitude, latitude) in degrees.
    pub fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (lambda, phi) = self.inverse_kernel(x, y)?;

        #[cfg(debug_assertions)]
        if phi.abs() < 89f64.to_radians() && self.kernel.self_check_applies(lambda) {
            if let Ok((fx, fy)) = self.kernel.forward(lambda, phi) {
                let fx = fx * self.scale + self.false_easting;
                let fy = fy * self.scale + self.false_northing;
                let distance = (fx - x).hypot(fy - y);
                debug_assert!(
                    distance <= SELF_CHECK_TOLERANCE,
                    "{} round trip of ({x}, {y}) is off by {distance} m",
                    self.params.name()
                );
            }
        }

        Ok(self.to_degrees(lambda, phi))
    }

    fn inverse_kernel(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        self.kernel.inverse(
            (x - self.false_easting) / self.scale,
            (y - self.false_northing) / self.scale,
        )
    }

    #[cfg(debug_assertions)]
    fn inverse_unchecked(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (lambda, phi) = self.inverse_kernel(x, y)?;
        Ok(self.to_degrees(lambda, phi))
    }

    fn to_degrees(&self, lambda: f64, phi: f64) -> (f64, f64) {
        (
            roll(lambda + self.central_meridian).to_degrees(),
            phi.to_degrees(),
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Forward,
    Inverse,
}

/// A [MapProjection] applied in one direction.
///
/// Both directions share the same projection.
#[derive(Debug, Clone)]
pub struct ProjectionTransform {
    projection: Arc<MapProjection>,
    direction: Direction,
}

impl ProjectionTransform {
    pub(crate) fn forward(projection: Arc<MapProjection>) -> Self {
        Self {
            projection,
            direction: Direction::Forward,
        }
    }

    pub(crate) fn inverted(&self) -> Self {
        Self {
            projection: self.projection.clone(),
            direction: match self.direction {
                Direction::Forward => Direction::Inverse,
                Direction::Inverse => Direction::Forward,
            },
        }
    }

    pub fn projection(&self) -> &MapProjection {
        &self.projection
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    #[inline]
    pub(crate) fn apply(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        match self.direction {
            Direction::Forward => self.projection.forward(x, y),
            Direction::Inverse => self.projection.inverse(x, y),
        }
    }
}

impl PartialEq for ProjectionTransform {
    fn eq(&self, other: &Self) -> bool {
        self.direction == other.direction
            && (Arc::ptr_eq(&self.projection, &other.projection)
                || self.projection.params == other.projection.params)
    }
}

impl Eq for ProjectionTransform {}

impl Hash for ProjectionTransform {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.projection.params.hash(state);
        self.direction.hash(state);
    }
}

impl Transformation for ProjectionTransform {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        (buf[0], buf[1]) = self.apply(pt[0], pt[1])?;
        Ok(())
    }

    fn source_ndim(&self) -> usize {
        2
    }

    fn target_ndim(&self) -> usize {
        2
    }
}
