//! Molodensky datum shift between two ellipsoids.
//!
//! Approximates "to geocentric, translate, back to geodetic" with a closed form
//! in the ellipsoid differences `Δa` and `Δf`.
//! The abridged form drops the height and the smaller ellipsoid terms.

use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;

use crate::{Ellipsoid, Result, TransformError, Transformation, projection::roll};

/// Latitudes closer to a pole are clamped before dividing by `cos φ`.
const MAX_LATITUDE: f64 = 89.999_999;

#[derive(Debug, Clone, Copy)]
pub struct MolodenskyParams {
    /// Geocentric translation in metres.
    pub dx: f64,
    pub dy: f64,
    pub dz: f64,
    pub source: Ellipsoid,
    pub target: Ellipsoid,
    /// Whether the source points carry an ellipsoidal height; if not, it is taken as zero.
    pub source_3d: bool,
    /// Whether the target points keep the ellipsoidal height.
    pub target_3d: bool,
    pub abridged: bool,
}

impl MolodenskyParams {
    /// Abridged three-dimensional shift.
    pub fn new(source: Ellipsoid, target: Ellipsoid, [dx, dy, dz]: [f64; 3]) -> Self {
        Self {
            dx,
            dy,
            dz,
            source,
            target,
            source_3d: true,
            target_3d: true,
            abridged: true,
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        self.source.validate()?;
        self.target.validate()?;
        if !(self.dx.is_finite() && self.dy.is_finite() && self.dz.is_finite()) {
            return Err(TransformError::InvalidParameter(format!(
                "datum shift ({}, {}, {}) must be finite",
                self.dx, self.dy, self.dz
            )));
        }
        Ok(())
    }

    /// The shift back: negated translation, swapped ellipsoids and dimensions.
    pub fn inverted(&self) -> Self {
        Self {
            dx: -self.dx,
            dy: -self.dy,
            dz: -self.dz,
            source: self.target,
            target: self.source,
            source_3d: self.target_3d,
            target_3d: self.source_3d,
            abridged: self.abridged,
        }
    }

    pub fn name(&self) -> &'static str {
        if self.abridged {
            "Abridged_Molodensky"
        } else {
            "Molodensky"
        }
    }

    pub fn parameters(&self) -> Vec<(&'static str, f64)> {
        vec![
            ("dim", if self.source_3d { 3.0 } else { 2.0 }),
            ("dx", self.dx),
            ("dy", self.dy),
            ("dz", self.dz),
            ("src_semi_major", self.source.semi_major()),
            ("src_semi_minor", self.source.semi_minor()),
            ("tgt_semi_major", self.target.semi_major()),
            ("tgt_semi_minor", self.target.semi_minor()),
        ]
    }

    fn key(&self) -> ([OrderedFloat<f64>; 3], Ellipsoid, Ellipsoid, [bool; 3]) {
        (
            [self.dx, self.dy, self.dz].map(OrderedFloat),
            self.source,
            self.target,
            [self.source_3d, self.target_3d, self.abridged],
        )
    }
}

impl PartialEq for MolodenskyParams {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for MolodenskyParams {}

impl Hash for MolodenskyParams {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MolodenskyTransform {
    params: MolodenskyParams,
}

impl MolodenskyTransform {
    pub(crate) fn new(params: MolodenskyParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &MolodenskyParams {
        &self.params
    }

    /// Shift (lon°, lat°, h); returns the shifted point in the same units.
    fn shift(&self, lon: f64, lat: f64, h: f64) -> Result<[f64; 3]> {
        if !(-90.0..=90.0).contains(&lat) {
            return Err(TransformError::OutOfDomain(format!(
                "latitude {lat}° is outside [-90°, 90°]"
            )));
        }
        let p = &self.params;
        let a = p.source.semi_major();
        let b = p.source.semi_minor();
        let f = p.source.flattening();
        let e2 = p.source.e2();
        let da = p.target.semi_major() - a;
        let df = p.target.flattening() - f;

        let lambda = lon.to_radians();
        let phi = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let (sinlon, coslon) = lambda.sin_cos();
        let (sinlat, coslat) = phi.sin_cos();
        let w = 1.0 - e2 * sinlat * sinlat;
        let rn = a / w.sqrt();
        let rm = a * (1.0 - e2) / (w * w.sqrt());

        let horizontal = -p.dx * sinlat * coslon - p.dy * sinlat * sinlon + p.dz * coslat;
        let vertical = p.dx * coslat * coslon + p.dy * coslat * sinlon + p.dz * sinlat;
        let (dlat, dlon, dh) = if p.abridged {
            let adf = a * df + f * da;
            (
                (horizontal + adf * 2.0 * sinlat * coslat) / rm,
                (-p.dx * sinlon + p.dy * coslon) / (rn * coslat),
                vertical + adf * sinlat * sinlat - da,
            )
        } else {
            (
                (horizontal
                    + da * rn * e2 * sinlat * coslat / a
                    + df * (rm * a / b + rn * b / a) * sinlat * coslat)
                    / (rm + h),
                (-p.dx * sinlon + p.dy * coslon) / ((rn + h) * coslat),
                vertical - da * a / rn + df * (b / a) * rn * sinlat * sinlat,
            )
        };

        Ok([
            roll(lambda + dlon).to_degrees(),
            lat + dlat.to_degrees(),
            h + dh,
        ])
    }
}

impl Transformation for MolodenskyTransform {
    fn transform_into(&self, pt: &[f64], buf: &mut [f64]) -> Result<()> {
        let h = if self.params.source_3d { pt[2] } else { 0.0 };
        let out = self.shift(pt[0], pt[1], h)?;
        buf.copy_from_slice(&out[..self.target_ndim()]);
        Ok(())
    }

    fn source_ndim(&self) -> usize {
        if self.params.source_3d { 3 } else { 2 }
    }

    fn target_ndim(&self) -> usize {
        if self.params.target_3d { 3 } else { 2 }
    }
}
