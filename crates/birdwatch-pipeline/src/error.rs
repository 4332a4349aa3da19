use birdwatch_ebird::EbirdError;
use birdwatch_geo::GeocodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to load observations: {0}")]
    FetchFailed(#[from] EbirdError),

    #[error("location search failed: {0}")]
    GeocodeFailed(#[from] GeocodeError),

    #[error("no place matched '{query}'")]
    NoPlaceMatch { query: String },

    #[error("no search result at index {index} ({available} available)")]
    CandidateOutOfRange { index: usize, available: usize },

    #[error("no location has been chosen yet")]
    NoLocation,
}
