//! Geographic primitives shared by every pipeline stage.

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// Where the dashboard centres itself when the device location is unavailable.
pub const DEFAULT_LOCATION: Coordinate = Coordinate {
    latitude: 16.4971,
    longitude: 80.4992,
};

/// A validated WGS84 latitude/longitude pair.
///
/// Both components are finite, latitude lies in `[-90, 90]` and longitude in
/// `[-180, 180]`. Deserialization goes through the same check.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawCoordinate")]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct RawCoordinate {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<RawCoordinate> for Coordinate {
    type Error = CoreError;

    fn try_from(raw: RawCoordinate) -> Result<Self, Self::Error> {
        Self::new(raw.latitude, raw.longitude)
    }
}

impl Coordinate {
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidCoordinate`] when either component is
    /// non-finite or outside its range.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoreError> {
        let lat_ok = latitude.is_finite() && (-90.0..=90.0).contains(&latitude);
        let lng_ok = longitude.is_finite() && (-180.0..=180.0).contains(&longitude);
        if lat_ok && lng_ok {
            Ok(Self {
                latitude,
                longitude,
            })
        } else {
            Err(CoreError::InvalidCoordinate {
                latitude,
                longitude,
            })
        }
    }

    #[must_use]
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl std::fmt::Display for Coordinate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Search radius in whole kilometres, bounded to `5..=50`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u32")]
pub struct SearchRadius(u32);

impl SearchRadius {
    pub const MIN_KM: u32 = 5;
    pub const MAX_KM: u32 = 50;
    pub const DEFAULT_KM: u32 = 25;

    /// # Errors
    ///
    /// Returns [`CoreError::InvalidRadius`] when `km` is outside `5..=50`.
    pub fn new(km: i64) -> Result<Self, CoreError> {
        match u32::try_from(km) {
            Ok(v) if (Self::MIN_KM..=Self::MAX_KM).contains(&v) => Ok(Self(v)),
            _ => Err(CoreError::InvalidRadius(km)),
        }
    }

    #[must_use]
    pub fn km(self) -> u32 {
        self.0
    }
}

impl Default for SearchRadius {
    fn default() -> Self {
        Self(Self::DEFAULT_KM)
    }
}

impl TryFrom<i64> for SearchRadius {
    type Error = CoreError;

    fn try_from(km: i64) -> Result<Self, Self::Error> {
        Self::new(km)
    }
}

impl From<SearchRadius> for u32 {
    fn from(radius: SearchRadius) -> Self {
        radius.0
    }
}

impl std::fmt::Display for SearchRadius {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} km", self.0)
    }
}
