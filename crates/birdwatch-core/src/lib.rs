pub mod app_config;
pub mod config;
pub mod coordinate;
pub mod observations;

use thiserror::Error;

pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use coordinate::{Coordinate, SearchRadius, DEFAULT_LOCATION};
pub use observations::{Hotspot, ObservationBundle, Observations, PlaceCandidate, Sighting};

/// Validation failures for the core data model.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("invalid coordinate ({latitude}, {longitude}): latitude must be within [-90, 90] and longitude within [-180, 180]")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    #[error("invalid search radius {0} km: must be between 5 and 50")]
    InvalidRadius(i64),
}

/// Errors raised while loading [`AppConfig`] from the environment.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
