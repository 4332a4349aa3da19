//! Location resolution: free-text and reverse geocoding against Nominatim,
//! plus the device-location capability with its fallback.

pub mod client;
pub mod device;
pub mod error;
pub mod resolver;
mod types;

pub use client::NominatimClient;
pub use device::{
    resolve_by_device, resolve_device_or_default, DeviceFix, DeviceLocator, DeviceResolution,
    LocationUnavailable, ReportedPosition,
};
pub use error::GeocodeError;
pub use resolver::LocationResolver;
