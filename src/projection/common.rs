//! Helpers shared by the ellipsoidal projections (isometric latitude, meridian arc).

use std::f64::consts::FRAC_PI_2;

use crate::{Result, TransformError};

const PHI_MAX_ITER: usize = 15;
const PHI_TOLERANCE: f64 = 1e-10;

/// Tolerance of the meridian arc inversion, in radians.
const ARC_TOLERANCE: f64 = 1e-11;
const ARC_MAX_ITER: usize = 10;

/// Conformal latitude function `t`, as used by Mercator and Lambert.
pub fn tsfn(phi: f64, sinphi: f64, e: f64) -> f64 {
    let con = e * sinphi;
    (0.5 * (FRAC_PI_2 - phi)).tan() / ((1.0 - con) / (1.0 + con)).powf(0.5 * e)
}

/// `cos φ / sqrt(1 - e² sin² φ)`, the radius of the parallel on a unit ellipsoid.
pub fn msfn(sinphi: f64, cosphi: f64, e2: f64) -> f64 {
    cosphi / (1.0 - e2 * sinphi * sinphi).sqrt()
}

/// Latitude from the conformal function `t`, by fixed-point iteration.
pub fn phi_from_ts(ts: f64, e: f64) -> Result<f64> {
    let half_e = 0.5 * e;
    let mut phi = FRAC_PI_2 - 2.0 * ts.atan();
    for _ in 0..PHI_MAX_ITER {
        let con = e * phi.sin();
        let dphi = FRAC_PI_2 - 2.0 * (ts * ((1.0 - con) / (1.0 + con)).powf(half_e)).atan() - phi;
        phi += dphi;
        if dphi.abs() <= PHI_TOLERANCE {
            return Ok(phi);
        }
    }
    Err(TransformError::NonConvergent {
        iterations: PHI_MAX_ITER,
    })
}

const C00: f64 = 1.0;
const C02: f64 = 0.25;
const C04: f64 = 0.046875;
const C06: f64 = 0.01953125;
const C08: f64 = 0.01068115234375;
const C22: f64 = 0.75;
const C44: f64 = 0.46875;
const C46: f64 = 0.01302083333333333333;
const C48: f64 = 0.00712076822916666666;
const C66: f64 = 0.36458333333333333333;
const C68: f64 = 0.00569661458333333333;
const C88: f64 = 0.3076171875;

/// Meridian arc length on an ellipsoid with unit semi-major axis,
/// as a truncated series in the eccentricity.
#[derive(Debug, Clone, Copy)]
pub struct MeridianArc {
    en: [f64; 5],
    e2: f64,
}

impl MeridianArc {
    pub fn new(e2: f64) -> Self {
        let mut t = e2 * e2;
        let en0 = C00 - e2 * (C02 + e2 * (C04 + e2 * (C06 + e2 * C08)));
        let en1 = e2 * (C22 - e2 * (C04 + e2 * (C06 + e2 * C08)));
        let en2 = t * (C44 - e2 * (C46 + e2 * C48));
        t *= e2;
        let en3 = t * (C66 - e2 * C68);
        let en4 = t * e2 * C88;
        Self {
            en: [en0, en1, en2, en3, en4],
            e2,
        }
    }

    /// Arc length from the equator to `phi`.
    pub fn length(&self, phi: f64, sinphi: f64, cosphi: f64) -> f64 {
        let [en0, en1, en2, en3, en4] = self.en;
        let cs = cosphi * sinphi;
        let s2 = sinphi * sinphi;
        en0 * phi - cs * (en1 + s2 * (en2 + s2 * (en3 + s2 * en4)))
    }

    /// Latitude at which the arc length is `arg`, by Newton iteration.
    pub fn inverse(&self, arg: f64) -> Result<f64> {
        let k = 1.0 / (1.0 - self.e2);
        let mut phi = arg;
        for _ in 0..ARC_MAX_ITER {
            let s = phi.sin();
            let t = 1.0 - self.e2 * s * s;
            let step = (self.length(phi, s, phi.cos()) - arg) * (t * t.sqrt()) * k;
            phi -= step;
            if step.abs() < ARC_TOLERANCE {
                return Ok(phi);
            }
        }
        Err(TransformError::NonConvergent {
            iterations: ARC_MAX_ITER,
        })
    }
}
