//! Device geolocation capability and its fallback.
//!
//! The platform answers a one-shot "current position" query with either a
//! fix or a refusal. [`resolve_device_or_default`] never leaves the caller
//! waiting: refusals, bad fixes and timeouts all fall back to
//! [`DEFAULT_LOCATION`].

use std::time::Duration;

use birdwatch_core::{Coordinate, CoreError, DEFAULT_LOCATION};
use futures::future::{self, BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A raw position as reported by the platform, not yet validated.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviceFix {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum LocationUnavailable {
    #[error("location permission denied")]
    PermissionDenied,

    #[error("device location is not supported")]
    Unsupported,

    #[error("device did not report a position within {0:?}")]
    TimedOut(Duration),

    #[error("device reported an invalid position: {0}")]
    InvalidFix(CoreError),
}

/// Platform capability answering "where am I right now?".
pub trait DeviceLocator: Send + Sync {
    fn current_position(&self) -> BoxFuture<'_, Result<DeviceFix, LocationUnavailable>>;
}

/// A position reported by someone else: a browser posting its
/// `navigator.geolocation` result, or coordinates passed on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReportedPosition {
    Fix { latitude: f64, longitude: f64 },
    Denied,
    Unsupported,
}

impl DeviceLocator for ReportedPosition {
    fn current_position(&self) -> BoxFuture<'_, Result<DeviceFix, LocationUnavailable>> {
        let result = match *self {
            ReportedPosition::Fix {
                latitude,
                longitude,
            } => Ok(DeviceFix {
                latitude,
                longitude,
            }),
            ReportedPosition::Denied => Err(LocationUnavailable::PermissionDenied),
            ReportedPosition::Unsupported => Err(LocationUnavailable::Unsupported),
        };
        future::ready(result).boxed()
    }
}

/// Asks `locator` for a position and validates it.
///
/// # Errors
///
/// Returns [`LocationUnavailable`] when the capability refuses, does not
/// answer within `timeout`, or reports an out-of-range fix.
pub async fn resolve_by_device(
    locator: &dyn DeviceLocator,
    timeout: Duration,
) -> Result<Coordinate, LocationUnavailable> {
    let fix = tokio::time::timeout(timeout, locator.current_position())
        .await
        .map_err(|_| LocationUnavailable::TimedOut(timeout))??;
    Coordinate::new(fix.latitude, fix.longitude).map_err(LocationUnavailable::InvalidFix)
}

/// Outcome of [`resolve_device_or_default`].
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceResolution {
    pub coordinate: Coordinate,
    /// Why the device position was not used, if it was not.
    pub fallback: Option<LocationUnavailable>,
}

/// Like [`resolve_by_device`], but substitutes [`DEFAULT_LOCATION`] on any
/// failure.
pub async fn resolve_device_or_default(
    locator: &dyn DeviceLocator,
    timeout: Duration,
) -> DeviceResolution {
    match resolve_by_device(locator, timeout).await {
        Ok(coordinate) => DeviceResolution {
            coordinate,
            fallback: None,
        },
        Err(reason) => {
            tracing::warn!(
                reason = %reason,
                fallback = %DEFAULT_LOCATION,
                "device location unavailable, using default location"
            );
            DeviceResolution {
                coordinate: DEFAULT_LOCATION,
                fallback: Some(reason),
            }
        }
    }
}
