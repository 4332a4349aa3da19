//! The location-resolver contract on top of [`NominatimClient`].

use birdwatch_core::{Coordinate, PlaceCandidate};

use crate::client::NominatimClient;
use crate::error::GeocodeError;

pub struct LocationResolver {
    client: NominatimClient,
}

impl LocationResolver {
    #[must_use]
    pub fn new(client: NominatimClient) -> Self {
        Self { client }
    }

    /// Resolves a free-text query to candidate places.
    ///
    /// A blank query yields an empty list without touching the network.
    ///
    /// # Errors
    ///
    /// Propagates [`GeocodeError`] from the provider; callers treat it as
    /// "no results".
    pub async fn resolve_by_text(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        let query = query.trim();
        if query.is_empty() {
            return Ok(Vec::new());
        }
        let candidates = self.client.search(query).await?;
        tracing::debug!(query, count = candidates.len(), "text search resolved");
        Ok(candidates)
    }

    /// Best-effort place name for `coordinate`. Every failure is absorbed.
    pub async fn name_for(&self, coordinate: Coordinate) -> Option<String> {
        match self.client.reverse(coordinate).await {
            Ok(name) => name,
            Err(e) => {
                tracing::warn!(%coordinate, error = %e, "reverse geocoding failed");
                None
            }
        }
    }
}
