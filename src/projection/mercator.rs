//! Mercator projection, spherical and ellipsoidal.
//!
//!   forward: x = λ, y = asinh(tan φ) - e·atanh(e·sin φ)  (sphere: y = asinh(tan φ))
//!   inverse: λ = x, φ = phi_from_ts(exp(-y), e)          (sphere: φ = π/2 - 2·atan(exp(-y)))
//!
//! Scaled by `a·k₀`, where `k₀` is either given directly (1SP)
//! or derived from the standard parallel (2SP).

use std::f64::consts::FRAC_PI_2;

use super::{
    Projection,
    common::{msfn, phi_from_ts},
};
use crate::{Ellipsoid, Result, TransformError};

const POLE_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone, Copy)]
pub struct MercatorParams {
    pub ellipsoid: Ellipsoid,
    /// Degrees.
    pub central_meridian: f64,
    /// Degrees; non-zero selects the two-standard-parallel form.
    pub standard_parallel: f64,
    pub scale_factor: f64,
    pub false_easting: f64,
    pub false_northing: f64,
}

impl Default for MercatorParams {
    fn default() -> Self {
        Self {
            ellipsoid: Ellipsoid::WGS84,
            central_meridian: 0.0,
            standard_parallel: 0.0,
            scale_factor: 1.0,
            false_easting: 0.0,
            false_northing: 0.0,
        }
    }
}

impl MercatorParams {
    pub fn is_2sp(&self) -> bool {
        self.standard_parallel != 0.0
    }

    /// Overall scale `k₀` at the equator.
    pub(crate) fn equator_scale(&self) -> Result<f64> {
        if self.is_2sp() {
            if self.scale_factor != 1.0 {
                return Err(TransformError::InvalidParameter(
                    "Mercator takes either a standard parallel or a scale factor, not both".into(),
                ));
            }
            if self.standard_parallel.abs() >= 90.0 {
                return Err(TransformError::InvalidParameter(format!(
                    "standard parallel {}° must be strictly between the poles",
                    self.standard_parallel
                )));
            }
            let phi = self.standard_parallel.to_radians();
            Ok(msfn(phi.sin(), phi.cos(), self.ellipsoid.e2()))
        } else {
            if !(self.scale_factor > 0.0 && self.scale_factor.is_finite()) {
                return Err(TransformError::InvalidParameter(format!(
                    "scale factor must be positive; got {}",
                    self.scale_factor
                )));
            }
            Ok(self.scale_factor)
        }
    }
}

#[derive(Debug)]
pub(crate) struct Mercator {
    e: f64,
    spherical: bool,
}

impl Mercator {
    pub fn new(ellipsoid: &Ellipsoid) -> Self {
        Self {
            e: ellipsoid.e(),
            spherical: ellipsoid.is_sphere(),
        }
    }
}

impl Projection for Mercator {
    fn forward(&self, lambda: f64, phi: f64) -> Result<(f64, f64)> {
        if (phi.abs() - FRAC_PI_2).abs() <= POLE_EPSILON {
            return Err(TransformError::OutOfDomain(format!(
                "Mercator is undefined at the pole (latitude {}°)",
                phi.to_degrees()
            )));
        }
        // isometric latitude, exactly zero on the equator
        let y = if self.spherical {
            phi.tan().asinh()
        } else {
            phi.tan().asinh() - self.e * (self.e * phi.sin()).atanh()
        };
        Ok((lambda, y))
    }

    fn inverse(&self, x: f64, y: f64) -> Result<(f64, f64)> {
        let phi = if self.spherical {
            FRAC_PI_2 - 2.0 * (-y).exp().atan()
        } else {
            phi_from_ts((-y).exp(), self.e)?
        };
        Ok((x, phi))
    }
}
