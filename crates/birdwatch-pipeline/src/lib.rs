//! The resolve → fetch → decode controller.
//!
//! A single [`Controller`] owns the dashboard state and publishes it through
//! a `tokio::sync::watch` channel. Every cycle carries a generation number;
//! results from superseded generations are dropped.

pub mod controller;
pub mod error;
pub mod sources;
pub mod state;

pub use controller::Controller;
pub use error::PipelineError;
pub use sources::{ObservationSource, PlaceLookup};
pub use state::{LocationSource, PipelinePhase, PipelineSnapshot, SearchState};
