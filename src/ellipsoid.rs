use std::hash::{Hash, Hasher};

use ordered_float::OrderedFloat;

use crate::{Result, TransformError};

/// Reference ellipsoid of revolution, in metres.
#[derive(Debug, Clone, Copy)]
pub struct Ellipsoid {
    semi_major: f64,
    semi_minor: f64,
}

impl Ellipsoid {
    pub const WGS84: Ellipsoid = Ellipsoid::from_inverse_flattening(6_378_137.0, 298.257_223_563);
    pub const GRS80: Ellipsoid = Ellipsoid::from_inverse_flattening(6_378_137.0, 298.257_222_101);
    pub const CLARKE_1866: Ellipsoid = Ellipsoid::from_axes(6_378_206.4, 6_356_583.8);
    pub const INTERNATIONAL_1924: Ellipsoid = Ellipsoid::from_inverse_flattening(6_378_388.0, 297.0);

    pub const fn from_axes(semi_major: f64, semi_minor: f64) -> Self {
        Self {
            semi_major,
            semi_minor,
        }
    }

    /// An infinite inverse flattening gives a sphere.
    pub const fn from_inverse_flattening(semi_major: f64, inverse_flattening: f64) -> Self {
        let semi_minor = if inverse_flattening.is_infinite() {
            semi_major
        } else {
            semi_major * (1.0 - 1.0 / inverse_flattening)
        };
        Self {
            semi_major,
            semi_minor,
        }
    }

    pub const fn sphere(radius: f64) -> Self {
        Self::from_axes(radius, radius)
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.semi_major.is_finite()
            && self.semi_minor.is_finite()
            && self.semi_minor > 0.0
            && self.semi_minor <= self.semi_major)
        {
            return Err(TransformError::InvalidParameter(format!(
                "invalid ellipsoid axes {} and {}",
                self.semi_major, self.semi_minor
            )));
        }
        Ok(())
    }

    pub fn semi_major(&self) -> f64 {
        self.semi_major
    }

    pub fn semi_minor(&self) -> f64 {
        self.semi_minor
    }

    pub fn flattening(&self) -> f64 {
        (self.semi_major - self.semi_minor) / self.semi_major
    }

    /// First eccentricity squared.
    pub fn e2(&self) -> f64 {
        let a2 = self.semi_major * self.semi_major;
        (a2 - self.semi_minor * self.semi_minor) / a2
    }

    /// First eccentricity.
    pub fn e(&self) -> f64 {
        self.e2().sqrt()
    }

    /// Second eccentricity squared.
    pub fn ep2(&self) -> f64 {
        let b2 = self.semi_minor * self.semi_minor;
        (self.semi_major * self.semi_major - b2) / b2
    }

    pub fn is_sphere(&self) -> bool {
        self.semi_major == self.semi_minor
    }
}

impl PartialEq for Ellipsoid {
    fn eq(&self, other: &Self) -> bool {
        OrderedFloat(self.semi_major) == OrderedFloat(other.semi_major)
            && OrderedFloat(self.semi_minor) == OrderedFloat(other.semi_minor)
    }
}

impl Eq for Ellipsoid {}

impl Hash for Ellipsoid {
    fn hash<H: Hasher>(&self, state: &mut H) {
        OrderedFloat(self.semi_major).hash(state);
        OrderedFloat(self.semi_minor).hash(state);
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::Ellipsoid;

    #[test]
    fn test_wgs84() {
        let e = Ellipsoid::WGS84;
        assert_relative_eq!(e.semi_minor(), 6_356_752.314_245, epsilon = 1e-5);
        assert_relative_eq!(e.e2(), 0.006_694_379_990_14, epsilon = 1e-12);
        assert_relative_eq!(1.0 / e.flattening(), 298.257_223_563, max_relative = 1e-9);
        assert!(!e.is_sphere());
    }

    #[test]
    fn test_sphere() {
        let s = Ellipsoid::from_inverse_flattening(6_371_000.0, f64::INFINITY);
        assert!(s.is_sphere());
        assert_eq!(s, Ellipsoid::sphere(6_371_000.0));
        assert_eq!(s.e2(), 0.0);
    }

    #[test]
    fn test_validate() {
        assert!(Ellipsoid::from_axes(1.0, 2.0).validate().is_err());
        assert!(Ellipsoid::GRS80.validate().is_ok());
    }
}
