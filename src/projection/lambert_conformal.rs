//! Lambert Conformal Conic projection.
//!
//! The cone constant `n`, the scale `F` (`c` here) and the radius `ρ₀` of the latitude of origin
//! are derived once at construction. Equal standard parallels give a tangent cone.

use std::f64::consts::{FRAC_PI_2, FRAC_PI_4};

use super::{
    Projection,
    common::{msfn, phi_from_ts, tsfn},
};
use crate::{Ellipsoid, Result, TransformError};

const EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
pub struct LambertConformalParams {
    pub ellipsoid: Ellipsoid,
    /// Degrees.
    pub central_meridian: f64,
    /// Degrees.
    pub latitude_of_origin: f64,
    /// Degrees.
    pub standard_parallel_1: f64,
    /// Degrees; equal to the first for a tangent cone.
    pub standard_parallel_2: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl LambertConformalParams {
    /// Tangent cone touching the ellipsoid along the latitude of origin.
    pub fn tangent(ellipsoid: Ellipsoid, central_meridian: f64, latitude_of_origin: f64) -> Self {
        Self {
            ellipsoid,
            central_meridian,
            latitude_of_origin,
            standard_parallel_1: latitude_of_origin,
            standard_parallel_2: latitude_of_origin,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }

    pub fn is_tangent(&self) -> bool {
        self.standard_parallel_1 == self.standard_parallel_2
    }
}

#[derive(Debug)]
pub(crate) struct LambertConformal {
    e: f64,
    spherical: bool,
    n: f64,
    c: f64,
    rho0: f64,
}

impl LambertConformal {
    pub fn new(params: &LambertConformalParams) -> Result<Self> {
        let phi0 = params.latitude_of_origin.to_radians();
        let phi1 = params.standard_parallel_1.to_radians();
        let phi2 = params.standard_parallel_2.to_radians();
        if (phi1 + phi2).abs() < EPSILON {
            return Err(TransformError::OutOfDomain(format!(
                "standard parallels {}° and {}° are opposite about the equator",
                params.standard_parallel_1, params.standard_parallel_2
            )));
        }
        for deg in [
            params.latitude_of_origin,
            params.standard_parallel_1,
            params.standard_parallel_2,
        ] {
            if !(-90.0..=90.0).contains(&deg) {
                return Err(TransformError::InvalidParameter(format!(
                    "latitude {deg}° is outside [-90°, 90°]"
                )));
            }
        }
        for deg in [params.standard_parallel_1, params.standard_parallel_2] {
            if (deg.abs() - 90.0).abs() < EPSILON.to_degrees() {
                return Err(TransformError::InvalidParameter(format!(
                    "standard parallel {deg}° is at a pole"
                )));
            }
        }

        let e = params.ellipsoid.e();
        let e2 = params.ellipsoid.e2();
        let spherical = params.ellipsoid.is_sphere();
        let secant = (phi1 - phi2).abs() >= EPSILON;
        let at_pole = (phi0.abs() - FRAC_PI_2).abs() < EPSILON;

        let (sinphi1, cosphi1) = phi1.sin_cos();
        let mut n = sinphi1;
        let (c, rho0);
        if spherical {
            if secant {
                n = (cosphi1 / phi2.cos()).ln()
                    / ((FRAC_PI_4 + 0.5 * phi2).tan() / (FRAC_PI_4 + 0.5 * phi1).tan()).ln();
            }
            c = cosphi1 * (FRAC_PI_4 + 0.5 * phi1).tan().powf(n) / n;
            rho0 = if at_pole {
                0.0
            } else {
                c * (FRAC_PI_4 + 0.5 * phi0).tan().powf(-n)
            };
        } else {
            let m1 = msfn(sinphi1, cosphi1, e2);
            let t1 = tsfn(phi1, sinphi1, e);
            if secant {
                let (sinphi2, cosphi2) = phi2.sin_cos();
                n = (m1 / msfn(sinphi2, cosphi2, e2)).ln() / (t1 / tsfn(phi2, sinphi2, e)).ln();
            }
            c = m1 * t1.powf(-n) / n;
            rho0 = if at_pole {
                0.0
            } else {
                c * tsfn(phi0, phi0.sin(), e).powf(n)
            };
        }
        if !(n.is_finite() && n != 0.0 && c.is_finite() && rho0.is_finite()) {
            return Err(TransformError::OutOfDomain(format!(
                "degenerate cone for standard parallels {}° and {}° (n = {n})",
                params.standard_parallel_1, params.standard_parallel_2
            )));
        }
        log::debug!("Lambert conformal cone constant {n}, tangent: {}", !secant);

        Ok(Self {
            e,
            spherical,
            n,
            c,
            rho0,
        })
    }
}

impl Projection for LambertConformal {
    fn forward(&self, lambda: f64, phi: f64) -> Result<(f64, f64)> {
        let rho = if (phi.abs() - FRAC_PI_2).abs() < EPSILON {
            if phi * self.n <= 0.0 {
                return Err(TransformError::OutOfDomain(format!(
                    "the {} pole is at infinity on this cone",
                    if phi < 0.0 { "south" } else { "north" }
                )));
            }
            0.0
        } else if self.spherical {
            self.c * (FRAC_PI_4 + 0.5 * phi).tan().powf(-self.n)
        } else {
            self.c * tsfn(phi, phi.sin(), self.e).powf(self.n)
        };
        let theta = lambda * self.n;
        Ok((rho * theta.sin(), self.rho0 - rho * theta.cos()))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let (mut x, mut y) = (x, self.rho0 - y);
        let mut rho = x.hypot(y);
        if rho == 0.0 {
            let phi = if self.n > 0.0 { FRAC_PI_2 } else { -FRAC_PI_2 };
            return Ok((0.0, phi));
        }
        if self.n < 0.0 {
            rho = -rho;
            x = -x;
            y = -y;
        }
        let phi = if self.spherical {
            2.0 * (self.c / rho).powf(1.0 / self.n).atan() - FRAC_PI_2
        } else {
            phi_from_ts((rho / self.c).powf(1.0 / self.n), self.e)?
        };
        Ok((x.atan2(y) / self.n, phi))
    }
}
