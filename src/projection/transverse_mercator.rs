//! Transverse Mercator projection.
//!
//! Ellipsoidal form is the classic truncated power series in `λ·cos φ`
//! around the central meridian, with the meridian arc shared between directions.
//! The inverse recovers the footpoint latitude from the arc length by Newton iteration.
//! Accuracy degrades quickly beyond a few degrees from the central meridian.

use std::{f64::consts::FRAC_PI_2, sync::Once};

use super::{Projection, common::MeridianArc};
use crate::{Ellipsoid, Result, TransformError};

const FC1: f64 = 1.0;
const FC2: f64 = 0.5;
const FC3: f64 = 1.0 / 6.0;
const FC4: f64 = 1.0 / 12.0;
const FC5: f64 = 0.05;
const FC6: f64 = 1.0 / 30.0;
const FC7: f64 = 1.0 / 42.0;
const FC8: f64 = 1.0 / 56.0;

const EPSILON: f64 = 1e-10;

/// Beyond this distance from the central meridian the series are not accurate
/// enough for the development round-trip check.
const ACCURATE_LONGITUDE: f64 = 10.0 * std::f64::consts::PI / 180.0;

static FAR_FROM_MERIDIAN: Once = Once::new();

#[derive(Debug, Clone, Copy)]
pub struct TransverseMercatorParams {
    pub ellipsoid: Ellipsoid,
    /// Degrees.
    pub central_meridian: f64,
    /// Degrees.
    pub latitude_of_origin: f64,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Default for TransverseMercatorParams {
    fn default() -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            central_meridian: 0.0,
            latitude_of_origin: 0.0,
            scale_factor: 1.0,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }
}

impl TransverseMercatorParams {
    /// Universal Transverse Mercator zone on WGS84.
    pub fn utm(zone: u8, north: bool) -> Result<Self> {
        if !(1..=60).contains(&zone) {
            return Err(TransformError::InvalidParameter(format!(
                "UTM zone must be within 1..=60; got {zone}"
            )));
        }
        Ok(Self {
            ellipsoid: Ellipsoid::WGS84,
            central_meridian: (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0,
            latitude_of_origin: 0.0,
            scale_factor: 0.9996,
            false_easting: 500_000.0,
            false_northing: if north { 0.0 } else { 10_000_000.0 },
        })
    }
}

#[derive(Debug)]
pub(crate) struct TransverseMercator {
    e2: f64,
    /// Second eccentricity squared.
    ep2: f64,
    phi0: f64,
    /// Meridian arc at the latitude of origin.
    ml0: f64,
    arc: MeridianArc,
    spherical: bool,
}

impl TransverseMercator {
    pub fn new(params: &TransverseMercatorParams) -> Result<Self> {
        if !(params.scale_factor > 0.0 && params.scale_factor.is_finite()) {
            return Err(TransformError::InvalidParameter(format!(
                "scale factor must be positive; got {}",
                params.scale_factor
            )));
        }
        let e2 = params.ellipsoid.e2();
        let phi0 = params.latitude_of_origin.to_radians();
        let arc = MeridianArc::new(e2);
        Ok(Self {
            e2,
            ep2: params.ellipsoid.ep2(),
            phi0,
            ml0: arc.length(phi0, phi0.sin(), phi0.cos()),
            arc,
            spherical: params.ellipsoid.is_sphere(),
        })
    }

    fn forward_sphere(&self, lambda: f64, phi: f64) -> Result<(f64, f64)> {
        let cosphi = phi.cos();
        let b = cosphi * lambda.sin();
        if (b.abs() - 1.0).abs() <= EPSILON {
            return Err(TransformError::OutOfDomain(
                "point is 90° from the central meridian".into(),
            ));
        }
        let x = 0.5 * ((1.0 + b) / (1.0 - b)).ln();
        let mut y = cosphi * lambda.cos() / (1.0 - b * b).sqrt();
        y = if y.abs() >= 1.0 { 0.0 } else { y.acos() };
        if phi < 0.0 {
            y = -y;
        }
        Ok((x, y - self.phi0))
    }

    fn inverse_sphere(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let h = x.exp();
        let g = 0.5 * (h - 1.0 / h);
        let d = self.phi0 + y;
        let h = d.cos();
        let mut phi = ((1.0 - h * h) / (1.0 + g * g)).sqrt().asin();
        if d < 0.0 {
            phi = -phi;
        }
        let lambda = if g != 0.0 || h != 0.0 { g.atan2(h) } else { 0.0 };
        Ok((lambda, phi))
    }
}

impl Projection for TransverseMercator {
    fn forward(&self, lambda: f64, phi: f64) -> Result<(f64, f64)> {
        if !(-FRAC_PI_2..=FRAC_PI_2).contains(&lambda) {
            return Err(TransformError::OutOfDomain(format!(
                "Transverse Mercator is limited to 90° from the central meridian; got {}°",
                lambda.to_degrees()
            )));
        }
        if self.spherical {
            return self.forward_sphere(lambda, phi);
        }

        let sinphi = phi.sin();
        let cosphi = phi.cos();
        let mut t = if cosphi.abs() > EPSILON {
            sinphi / cosphi
        } else {
            0.0
        };
        t *= t;
        let mut al = cosphi * lambda;
        let als = al * al;
        al /= (1.0 - self.e2 * sinphi * sinphi).sqrt();
        let n = self.ep2 * cosphi * cosphi;

        let x = al
            * (FC1
                + FC3
                    * als
                    * (1.0 - t
                        + n
                        + FC5
                            * als
                            * (5.0 + t * (t - 18.0) + n * (14.0 - 58.0 * t)
                                + FC7 * als * (61.0 + t * (t * (179.0 - t) - 479.0)))));
        let y = self.arc.length(phi, sinphi, cosphi) - self.ml0
            + sinphi
                * al
                * lambda
                * FC2
                * (1.0
                    + FC4
                        * als
                        * (5.0 - t
                            + n * (9.0 + 4.0 * n)
                            + FC6
                                * als
                                * (61.0 + t * (t - 58.0) + n * (270.0 - 330.0 * t)
                                    + FC8 * als * (1385.0 + t * (t * (543.0 - t) - 3111.0)))));
        Ok((x, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        if self.spherical {
            return self.inverse_sphere(x, y);
        }

        let phi1 = self.arc.inverse(self.ml0 + y)?;
        if phi1.abs() >= FRAC_PI_2 {
            let phi = if y < 0.0 { -FRAC_PI_2 } else { FRAC_PI_2 };
            return Ok((0.0, phi));
        }

        let sinphi = phi1.sin();
        let cosphi = phi1.cos();
        let mut t = if cosphi.abs() > EPSILON {
            sinphi / cosphi
        } else {
            0.0
        };
        let n = self.ep2 * cosphi * cosphi;
        let mut con = 1.0 - self.e2 * sinphi * sinphi;
        let d = x * con.sqrt();
        con *= t;
        t *= t;
        let ds = d * d;

        let phi = phi1
            - (con * ds / (1.0 - self.e2))
                * FC2
                * (1.0
                    - ds * FC4
                        * (5.0 + t * (3.0 - 9.0 * n) + n * (1.0 - 4.0 * n)
                            - ds * FC6
                                * (61.0 + t * (90.0 - 252.0 * n + 45.0 * t) + 46.0 * n
                                    - ds * FC8
                                        * (1385.0 + t * (3633.0 + t * (4095.0 + 1574.0 * t))))));
        let lambda = d
            * (FC1
                - ds * FC3
                    * (1.0 + 2.0 * t + n
                        - ds * FC5
                            * (5.0 + t * (28.0 + 24.0 * t + 8.0 * n) + 6.0 * n
                                - ds * FC7 * (61.0 + t * (662.0 + t * (1320.0 + 720.0 * t))))))
            / cosphi;
        Ok((lambda, phi))
    }

    fn self_check_applies(&self, lambda: f64) -> bool {
        if lambda.abs() <= ACCURATE_LONGITUDE {
            return true;
        }
        FAR_FROM_MERIDIAN.call_once(|| {
            log::warn!(
                "Transverse Mercator used {:.1}° from its central meridian; results are approximate",
                lambda.to_degrees()
            )
        });
        false
    }
}
