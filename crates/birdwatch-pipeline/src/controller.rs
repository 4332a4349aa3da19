//! The pipeline state machine.
//!
//! Each operation that starts a cycle allocates the next generation while
//! holding the watch channel's lock and tags every later update with it.
//! `Shared::apply` refuses updates whose generation is no longer the
//! snapshot's, so overlapping cycles resolve to "latest wins" no matter in
//! which order their network calls complete.
//!
//! Cycles run on their own tasks. A command awaits its cycle, but dropping
//! the command (a disconnected HTTP client, a caller-side timeout) does not
//! abandon it: the phase still ends in `Ready` or `Failed`.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use birdwatch_core::{Coordinate, Observations, PlaceCandidate, SearchRadius};
use birdwatch_ebird::decode;
use birdwatch_geo::{resolve_device_or_default, DeviceLocator};
use tokio::sync::watch;

use crate::error::PipelineError;
use crate::sources::{ObservationSource, PlaceLookup};
use crate::state::{LocationSource, PipelinePhase, PipelineSnapshot, SearchState};

pub const DEFAULT_DEVICE_TIMEOUT: Duration = Duration::from_secs(10);

/// Owns the dashboard state and drives resolve → fetch → decode cycles.
pub struct Controller {
    shared: Arc<Shared>,
    device_timeout: Duration,
}

/// State and collaborators that outlive any single command.
struct Shared {
    source: Arc<dyn ObservationSource>,
    places: Arc<dyn PlaceLookup>,
    state: watch::Sender<PipelineSnapshot>,
}

impl Controller {
    #[must_use]
    pub fn new(
        source: Arc<dyn ObservationSource>,
        places: Arc<dyn PlaceLookup>,
        radius: SearchRadius,
    ) -> Self {
        let (state, _) = watch::channel(PipelineSnapshot::new(radius));
        Self {
            shared: Arc::new(Shared {
                source,
                places,
                state,
            }),
            device_timeout: DEFAULT_DEVICE_TIMEOUT,
        }
    }

    /// How long [`Controller::locate_me`] waits for the device.
    #[must_use]
    pub fn with_device_timeout(mut self, timeout: Duration) -> Self {
        self.device_timeout = timeout;
        self
    }

    /// A copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> PipelineSnapshot {
        self.shared.snapshot()
    }

    /// A receiver that observes every published state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<PipelineSnapshot> {
        self.shared.state.subscribe()
    }

    /// Runs a candidate search for the location dropdown.
    ///
    /// A blank query clears the candidates without a network call. Geocoding
    /// failures end up in [`SearchState::error`] and never touch the
    /// pipeline phase.
    pub async fn search(&self, query: &str) -> SearchState {
        let query = query.trim().to_owned();
        if query.is_empty() {
            self.shared.state.send_modify(|s| {
                s.search = SearchState {
                    request: s.search.request + 1,
                    ..SearchState::default()
                };
            });
            return self.snapshot().search;
        }

        let mut request = 0;
        self.shared.state.send_modify(|s| {
            request = s.search.request + 1;
            s.search = SearchState {
                query: query.clone(),
                loading: true,
                candidates: Vec::new(),
                error: None,
                request,
            };
        });

        let shared = Arc::clone(&self.shared);
        self.settle(async move { shared.finish_search(&query, request).await })
            .await
            .search
    }

    /// Adopts the candidate at `index` from the last search and fetches
    /// observations around it.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::CandidateOutOfRange`] if there is no
    /// candidate at `index`. The state is left untouched in that case.
    pub async fn select_candidate(&self, index: usize) -> Result<PipelineSnapshot, PipelineError> {
        let mut selected: Option<PlaceCandidate> = None;
        let mut available = 0;
        self.shared.state.send_if_modified(|s| {
            available = s.search.candidates.len();
            let Some(candidate) = s.search.candidates.get(index).cloned() else {
                return false;
            };
            s.search = SearchState {
                request: s.search.request + 1,
                ..SearchState::default()
            };
            selected = Some(candidate);
            true
        });
        let candidate = selected.ok_or(PipelineError::CandidateOutOfRange { index, available })?;

        let coordinate = candidate.coordinate;
        let (generation, radius) = self.shared.begin_cycle(PipelinePhase::Fetching, |s| {
            s.location = Some(coordinate);
            s.location_source = Some(LocationSource::Search);
            s.location_name = Some(candidate.display_name);
        });
        Ok(self.fetch(generation, coordinate, radius).await)
    }

    /// Geocodes `query`, adopts the first match and fetches observations
    /// around it.
    ///
    /// No match, or a geocoder error, ends the cycle in `Failed` but keeps
    /// whatever observations were already on display.
    pub async fn locate_by_text(&self, query: &str) -> PipelineSnapshot {
        let query = query.trim().to_owned();
        let (generation, _) = self.shared.begin_cycle(PipelinePhase::Resolving, |_| {});

        let shared = Arc::clone(&self.shared);
        self.settle(async move {
            let first = if query.is_empty() {
                Ok(None)
            } else {
                shared
                    .places
                    .resolve_by_text(&query)
                    .await
                    .map(|candidates| candidates.into_iter().next())
            };

            let candidate = match first {
                Ok(Some(candidate)) => candidate,
                Ok(None) => {
                    shared.fail(generation, &PipelineError::NoPlaceMatch { query });
                    return;
                }
                Err(e) => {
                    shared.fail(generation, &PipelineError::GeocodeFailed(e));
                    return;
                }
            };

            let coordinate = candidate.coordinate;
            let mut radius = SearchRadius::default();
            let adopted = shared.apply(generation, |s| {
                s.phase = PipelinePhase::Fetching;
                s.location = Some(coordinate);
                s.location_source = Some(LocationSource::Search);
                s.location_name = Some(candidate.display_name);
                radius = s.radius;
            });
            if adopted {
                shared.run_fetch(generation, coordinate, radius).await;
            }
        })
        .await
    }

    /// Resolves the device position, falling back to the default location
    /// when it is unavailable, then fetches. The place name is looked up
    /// alongside and arrives through the watch channel when it does.
    pub async fn locate_me<L>(&self, locator: L) -> PipelineSnapshot
    where
        L: DeviceLocator + 'static,
    {
        let (generation, _) = self.shared.begin_cycle(PipelinePhase::Resolving, |_| {});
        let device_timeout = self.device_timeout;

        let shared = Arc::clone(&self.shared);
        self.settle(async move {
            let resolution = resolve_device_or_default(&locator, device_timeout).await;
            let source = if resolution.fallback.is_some() {
                LocationSource::Fallback
            } else {
                LocationSource::Device
            };
            let coordinate = resolution.coordinate;

            let mut radius = SearchRadius::default();
            let adopted = shared.apply(generation, |s| {
                s.phase = PipelinePhase::Fetching;
                s.location = Some(coordinate);
                s.location_source = Some(source);
                s.location_name = None;
                radius = s.radius;
            });
            if adopted {
                shared.spawn_name_lookup(generation, coordinate);
                shared.run_fetch(generation, coordinate, radius).await;
            }
        })
        .await
    }

    /// Uses `coordinate` as given and fetches observations around it.
    pub async fn set_location(&self, coordinate: Coordinate) -> PipelineSnapshot {
        let (generation, radius) = self.shared.begin_cycle(PipelinePhase::Fetching, |s| {
            s.location = Some(coordinate);
            s.location_source = Some(LocationSource::Manual);
            s.location_name = None;
        });
        self.shared.spawn_name_lookup(generation, coordinate);
        self.fetch(generation, coordinate, radius).await
    }

    /// Stores `radius`. When it differs from the current one and a location
    /// is settled, runs exactly one fetch cycle. While a location is still
    /// resolving, the pending cycle picks the new radius up instead.
    pub async fn set_radius(&self, radius: SearchRadius) -> PipelineSnapshot {
        let mut started = None;
        self.shared.state.send_if_modified(|s| {
            if s.radius == radius {
                return false;
            }
            s.radius = radius;
            if let Some(location) = s.location {
                if s.phase != PipelinePhase::Resolving {
                    s.generation += 1;
                    s.phase = PipelinePhase::Fetching;
                    started = Some((s.generation, location));
                }
            }
            true
        });

        match started {
            Some((generation, location)) => {
                tracing::info!(generation, radius_km = radius.km(), "radius changed");
                self.fetch(generation, location, radius).await
            }
            None => self.snapshot(),
        }
    }

    /// Re-runs the fetch for the current location and radius.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::NoLocation`] before any location is known.
    pub async fn refresh(&self) -> Result<PipelineSnapshot, PipelineError> {
        let mut started = None;
        self.shared.state.send_if_modified(|s| {
            let Some(location) = s.location else {
                return false;
            };
            s.generation += 1;
            s.phase = PipelinePhase::Fetching;
            started = Some((s.generation, location, s.radius));
            true
        });

        let (generation, location, radius) = started.ok_or(PipelineError::NoLocation)?;
        Ok(self.fetch(generation, location, radius).await)
    }

    async fn fetch(
        &self,
        generation: u64,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> PipelineSnapshot {
        let shared = Arc::clone(&self.shared);
        self.settle(async move { shared.run_fetch(generation, coordinate, radius).await })
            .await
    }

    /// Runs `work` on its own task and waits for it.
    async fn settle<F>(&self, work: F) -> PipelineSnapshot
    where
        F: Future<Output = ()> + Send + 'static,
    {
        if let Err(e) = tokio::spawn(work).await {
            tracing::error!(error = %e, "pipeline task did not complete");
        }
        self.snapshot()
    }
}

impl Shared {
    fn snapshot(&self) -> PipelineSnapshot {
        self.state.borrow().clone()
    }

    async fn finish_search(&self, query: &str, request: u64) {
        let result = self.places.resolve_by_text(query).await;

        let applied = self.state.send_if_modified(|s| {
            if s.search.request != request {
                return false;
            }
            s.search.loading = false;
            match result {
                Ok(candidates) => s.search.candidates = candidates,
                Err(e) => {
                    tracing::warn!(query, error = %e, "candidate search failed");
                    s.search.error = Some(PipelineError::GeocodeFailed(e).to_string());
                }
            }
            true
        });
        if !applied {
            tracing::debug!(query, request, "discarding superseded search response");
        }
    }

    /// Starts a new generation in `phase`, applying `update` under the same
    /// lock. Returns the generation and the radius in effect.
    fn begin_cycle(
        &self,
        phase: PipelinePhase,
        update: impl FnOnce(&mut PipelineSnapshot),
    ) -> (u64, SearchRadius) {
        let mut started = (0, SearchRadius::default());
        self.state.send_modify(|s| {
            s.generation += 1;
            s.phase = phase;
            update(s);
            started = (s.generation, s.radius);
        });
        tracing::info!(generation = started.0, "pipeline cycle started");
        started
    }

    /// Applies `update` only if `generation` is still current.
    fn apply(&self, generation: u64, update: impl FnOnce(&mut PipelineSnapshot)) -> bool {
        let applied = self.state.send_if_modified(|s| {
            if s.generation != generation {
                return false;
            }
            update(s);
            true
        });
        if !applied {
            tracing::debug!(generation, "discarding result from superseded cycle");
        }
        applied
    }

    /// Only a failed fetch takes the displayed observations down. A location
    /// lookup that finds nothing leaves them in place.
    fn fail(&self, generation: u64, error: &PipelineError) {
        let clear = matches!(error, PipelineError::FetchFailed(_));
        let applied = self.apply(generation, |s| {
            s.phase = PipelinePhase::Failed {
                reason: error.to_string(),
            };
            if clear {
                s.observations = None;
            }
        });
        if applied {
            tracing::warn!(generation, error = %error, "pipeline cycle failed");
        }
    }

    /// Best-effort reverse lookup, detached from the fetch.
    fn spawn_name_lookup(self: &Arc<Self>, generation: u64, coordinate: Coordinate) {
        let shared = Arc::clone(self);
        tokio::spawn(async move {
            if let Some(name) = shared.places.name_for(coordinate).await {
                shared.apply(generation, |s| s.location_name = Some(name));
            }
        });
    }

    /// `Fetching → Decoding → Ready`, or `Failed` when the fetch fails.
    async fn run_fetch(&self, generation: u64, coordinate: Coordinate, radius: SearchRadius) {
        let bundle = match self.source.fetch(coordinate, radius).await {
            Ok(bundle) => bundle,
            Err(e) => return self.fail(generation, &PipelineError::FetchFailed(e)),
        };

        if !self.apply(generation, |s| s.phase = PipelinePhase::Decoding) {
            return;
        }

        let hotspots = decode(&bundle.raw_hotspot_text);
        let observations = Observations {
            sightings: bundle.sightings,
            hotspots,
            fetched_at: chrono::Utc::now(),
        };
        let sightings = observations.sightings.len();
        let hotspots = observations.hotspots.len();

        if self.apply(generation, |s| {
            s.phase = PipelinePhase::Ready;
            s.observations = Some(observations);
        }) {
            tracing::info!(
                generation,
                %coordinate,
                radius_km = radius.km(),
                sightings,
                hotspots,
                "observations ready"
            );
        }
    }
}

#[cfg(test)]
#[path = "controller_test.rs"]
mod tests;
