//! Conversion between geodetic (longitude, latitude, height) and geocentric (X, Y, Z) coordinates.
//!
//! The inverse uses Toms' non-iterative method:
//! a first latitude estimate from a scaled `Z`, one correction step,
//! and a height formula chosen by the magnitude of the latitude cosine
//! to avoid dividing by a small number near the poles or the equator.

use crate::{Ellipsoid, Matrix, Result, TransformError, Transformation, projection::Direction};

/// Toms' empirical factor for the initial latitude estimate.
const AD_C: f64 = 1.0026;

/// cos(67.5°)
const COS_67P5: f64 = 0.382_683_432_365_089_77;

/// Round-trip tolerance of the debug self-check, in metres.
#[cfg(debug_assertions)]
const SELF_CHECK_TOLERANCE: f64 = 0.01;

/// Toms' method is only accurate to the check tolerance up to this height.
#[cfg(debug_assertions)]
const SELF_CHECK_MAX_HEIGHT: f64 = 1e4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GeocentricTransform {
    ellipsoid: Ellipsoid,
    has_height: bool,
    direction: Direction,
}

impl GeocentricTransform {
    pub(crate) fn forward(ellipsoid: Ellipsoid, has_height: bool) -> Self {
        Self {
            ellipsoid,
            has_height,
            direction: Direction::Forward,
        }
    }

    pub(crate) fn inverted(&self) -> Self {
        Self {
            direction: match self.direction {
                Direction::Forward => Direction::Inverse,
                Direction::Inverse => Direction::Forward,
            },
            ..*self
        }
    }

    pub fn ellipsoid(&self) -> &Ellipsoid {
        &self.ellipsoid
    }

    /// Whether the geodetic side carries an ellipsoidal height.
    pub fn has_height(&self) -> bool {
        self.has_height
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    fn geodetic_ndim(&self) -> usize {
        if self.has_height { 3 } else { 2 }
    }

    /// (lon°, lat°, h) to (X, Y, Z).
    fn to_geocentric(&self, lon: f64, lat: f64, h: f64) -> Result<[f64; 3]> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(TransformError::OutOfDomain(format!(
                "latitude {lat}° is outside [-90°, 90°]"
            )));
        }
        let out = self.to_geocentric_unchecked(lon, lat, h);

        #[cfg(debug_assertions)]
        if h.abs() <= SELF_CHECK_MAX_HEIGHT {
            let [lon2, lat2, h2] = self.to_geodetic(out[0], out[1], out[2]);
            let a = self.ellipsoid.semi_major();
            let dlat = (lat2 - lat).to_radians() * a;
            let dlon =
                crate::projection::roll((lon2 - lon).to_radians()) * lat.to_radians().cos() * a;
            let distance = (dlat.hypot(dlon)).hypot(h2 - h);
            debug_assert!(
                distance <= SELF_CHECK_TOLERANCE,
                "geocentric round trip of ({lon}, {lat}, {h}) is off by {distance} m"
            );
        }

        Ok(out)
    }

    fn to_geocentric_unchecked(&self, lon: f64, lat: f64, h: f64) -> [f64; 3] {
        let e2 = self.ellipsoid.e2();
        let (sinlon, coslon) = lon.to_radians().sin_cos();
        let (sinlat, coslat) = lat.to_radians().sin_cos();
        let rn = self.ellipsoid.semi_major() / (1.0 - e2 * sinlat * sinlat).sqrt();
        [
            (rn + h) * coslat * coslon,
            (rn + h) * coslat * sinlon,
            (rn * (1.0 - e2) + h) * sinlat,
        ]
    }

    /// (X, Y, Z) to (lon°, lat°, h).
    fn to_geodetic(&self, x: f64, y: f64, z: f64) -> [f64; 3] {
        let a = self.ellipsoid.semi_major();
        let b = self.ellipsoid.semi_minor();
        let e2 = self.ellipsoid.e2();
        let ep2 = self.ellipsoid.ep2();

        let w2 = x * x + y * y;
        let w = w2.sqrt();
        if w == 0.0 && z == 0.0 {
            // centre of the ellipsoid
            return [0.0, 90.0, -b];
        }
        let lon = if w == 0.0 { 0.0 } else { y.atan2(x) };

        let t0 = z * AD_C;
        let s0 = t0.hypot(w);
        let sin_b0 = t0 / s0;
        let cos_b0 = w / s0;
        let t1 = z + b * ep2 * sin_b0 * sin_b0 * sin_b0;
        let sum = w - a * e2 * cos_b0 * cos_b0 * cos_b0;
        let s1 = t1.hypot(sum);
        let sin_p1 = t1 / s1;
        let cos_p1 = sum / s1;
        let rn = a / (1.0 - e2 * sin_p1 * sin_p1).sqrt();

        let h = if cos_p1 >= COS_67P5 {
            w / cos_p1 - rn
        } else if cos_p1 <= -COS_67P5 {
            w / -cos_p1 - rn
        } else {
            z / sin_p1 + rn * (e2 - 1.0)
        };
        let lat = (sin_p1 / cos_p1).atan();
        [lon.to_degrees(), lat.to_degrees(), h]
    }

    /// Jacobian of the forward conversion with respect to (lon°, lat°, h).
    fn forward_jacobian(&self, lon: f64, lat: f64, h: f64) -> Matrix {
        let e2 = self.ellipsoid.e2();
        let k = 1f64.to_radians();
        let (sinlon, coslon) = lon.to_radians().sin_cos();
        let (sinlat, coslat) = lat.to_radians().sin_cos();
        let w = 1.0 - e2 * sinlat * sinlat;
        let rn = self.ellipsoid.semi_major() / w.sqrt();
        // meridian radius of curvature
        let rm = rn * (1.0 - e2) / w;

        let mut out = Matrix::zeros(3, 3);
        out[(0, 0)] = -(rn + h) * coslat * sinlon * k;
        out[(1, 0)] = (rn + h) * coslat * coslon * k;
        out[(0, 1)] = -(rm + h) * sinlat * coslon * k;
        out[(1, 1)] = -(rm + h) * sinlat * sinlon * k;
        out[(2, 1)] = (rm + h) * coslat * k;
        out[(0, 2)] = coslat * coslon;
        out[(1, 2)] = coslat * sinlon;
        out[(2, 2)] = sinlat;
        out
    }
}

impl Transformation for GeocentricTransform {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        match self.direction {
            Direction::Forward => {
                let h = if self.has_height { pt[2] } else { 0.0 };
                buf.copy_from_slice(&self.to_geocentric(pt[0], pt[1], h)?);
            }
            Direction::Inverse => {
                let out = self.to_geodetic(pt[0], pt[1], pt[2]);
                buf.copy_from_slice(&out[..self.geodetic_ndim()]);
            }
        }
        Ok(())
    }

    fn derivative(&self, pt: Option<&[f64]>) -> Result<Matrix> {
        let pt = crate::derivative::required_point(pt)?;
        let geodetic_cols: Vec<usize> = (0..self.geodetic_ndim()).collect();
        match self.direction {
            Direction::Forward => {
                let h = if self.has_height { pt[2] } else { 0.0 };
                Ok(self
                    .forward_jacobian(pt[0], pt[1], h)
                    .select_cols(&geodetic_cols))
            }
            Direction::Inverse => {
                let [lon, lat, h] = self.to_geodetic(pt[0], pt[1], pt[2]);
                let inv = self.forward_jacobian(lon, lat, h).inverse()?;
                Ok(inv.select_rows(&geodetic_cols))
            }
        }
    }

    fn source_ndim(&self) -> usize {
        match self.direction {
            Direction::Forward => self.geodetic_ndim(),
            Direction::Inverse => 3,
        }
    }

    fn target_ndim(&self) -> usize {
        match self.direction {
            Direction::Forward => 3,
            Direction::Inverse => self.geodetic_ndim(),
        }
    }
}
