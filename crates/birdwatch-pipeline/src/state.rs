//! The observable dashboard state.

use birdwatch_core::{Coordinate, Observations, PlaceCandidate, SearchRadius};
use serde::Serialize;

/// Where the pipeline currently is in a resolve → fetch → decode cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelinePhase {
    Idle,
    Resolving,
    Fetching,
    Decoding,
    Ready,
    Failed { reason: String },
}

impl PipelinePhase {
    /// `Ready` or `Failed`.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready | Self::Failed { .. })
    }

    /// `Resolving`, `Fetching` or `Decoding`.
    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Resolving | Self::Fetching | Self::Decoding)
    }
}

/// How the current location was chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationSource {
    Device,
    /// The device could not report a position; the default location is used.
    Fallback,
    Search,
    Manual,
}

/// Candidate dropdown state. Independent of [`PipelinePhase`].
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SearchState {
    pub query: String,
    pub loading: bool,
    pub candidates: Vec<PlaceCandidate>,
    pub error: Option<String>,
    /// Bumped per search so an older response cannot overwrite a newer one.
    #[serde(skip)]
    pub(crate) request: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSnapshot {
    pub generation: u64,
    pub phase: PipelinePhase,
    pub location: Option<Coordinate>,
    pub location_source: Option<LocationSource>,
    pub location_name: Option<String>,
    pub radius: SearchRadius,
    pub observations: Option<Observations>,
    pub search: SearchState,
}

impl PipelineSnapshot {
    #[must_use]
    pub fn new(radius: SearchRadius) -> Self {
        Self {
            generation: 0,
            phase: PipelinePhase::Idle,
            location: None,
            location_source: None,
            location_name: None,
            radius,
            observations: None,
            search: SearchState::default(),
        }
    }
}
