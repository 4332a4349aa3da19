//! Seams between the controller and the outside world.

use birdwatch_core::{Coordinate, ObservationBundle, PlaceCandidate, SearchRadius};
use birdwatch_ebird::{EbirdClient, EbirdError};
use birdwatch_geo::{GeocodeError, LocationResolver};
use futures::future::{BoxFuture, FutureExt};

/// Something that can produce an [`ObservationBundle`] for an area.
pub trait ObservationSource: Send + Sync {
    fn fetch(
        &self,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> BoxFuture<'_, Result<ObservationBundle, EbirdError>>;
}

/// Forward and reverse geocoding.
pub trait PlaceLookup: Send + Sync {
    fn resolve_by_text<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Vec<PlaceCandidate>, GeocodeError>>;

    /// Best-effort; `None` on any failure.
    fn name_for(&self, coordinate: Coordinate) -> BoxFuture<'_, Option<String>>;
}

impl ObservationSource for EbirdClient {
    fn fetch(
        &self,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> BoxFuture<'_, Result<ObservationBundle, EbirdError>> {
        EbirdClient::fetch(self, coordinate, radius).boxed()
    }
}

impl PlaceLookup for LocationResolver {
    fn resolve_by_text<'a>(
        &'a self,
        query: &'a str,
    ) -> BoxFuture<'a, Result<Vec<PlaceCandidate>, GeocodeError>> {
        LocationResolver::resolve_by_text(self, query).boxed()
    }

    fn name_for(&self, coordinate: Coordinate) -> BoxFuture<'_, Option<String>> {
        LocationResolver::name_for(self, coordinate).boxed()
    }
}
