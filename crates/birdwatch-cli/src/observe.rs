//! `observe`: one full resolve → fetch → decode cycle.

use std::sync::Arc;
use std::time::Duration;

use birdwatch_core::{AppConfig, Coordinate, Hotspot, SearchRadius, Sighting};
use birdwatch_ebird::EbirdClient;
use birdwatch_geo::{LocationResolver, ReportedPosition};
use birdwatch_pipeline::{Controller, PipelinePhase, PipelineSnapshot};

use crate::lookup::build_geocoder;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Target {
    Coordinate { lat: f64, lng: f64 },
    Place(String),
    /// No device to ask, so this resolves to the default location.
    Default,
}

/// Runs the cycle and prints the result. A failed cycle is an error so the
/// process exits non-zero.
pub(crate) async fn run_observe(
    config: &AppConfig,
    target: Target,
    radius: Option<SearchRadius>,
    json: bool,
) -> anyhow::Result<()> {
    let api_key = config
        .ebird_api_key
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("EBIRD_API_KEY is not set; cannot fetch observations"))?;

    let ebird = EbirdClient::with_base_url(
        api_key,
        config.request_timeout_secs,
        &config.user_agent,
        &config.ebird_base_url,
    )
    .map_err(|e| anyhow::anyhow!("failed to build eBird client: {e}"))?;
    let resolver = LocationResolver::new(build_geocoder(config)?);

    let controller = Controller::new(
        Arc::new(ebird),
        Arc::new(resolver),
        radius.unwrap_or(config.default_radius),
    );

    let mut snapshot = match target {
        Target::Coordinate { lat, lng } => {
            controller.set_location(Coordinate::new(lat, lng)?).await
        }
        Target::Place(query) => controller.locate_by_text(&query).await,
        Target::Default => controller.locate_me(ReportedPosition::Unsupported).await,
    };

    // The reverse lookup runs on its own and may still be in flight.
    if snapshot.location_name.is_none() && snapshot.phase == PipelinePhase::Ready {
        let mut rx = controller.subscribe();
        let wait = Duration::from_secs(config.request_timeout_secs);
        if let Ok(Ok(named)) =
            tokio::time::timeout(wait, rx.wait_for(|s| s.location_name.is_some())).await
        {
            snapshot = named.clone();
        };
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print_snapshot(&snapshot);
    }

    if let PipelinePhase::Failed { reason } = &snapshot.phase {
        anyhow::bail!("{reason}");
    }
    Ok(())
}

fn print_snapshot(snapshot: &PipelineSnapshot) {
    if let Some(location) = snapshot.location {
        let name = snapshot.location_name.as_deref().unwrap_or("unnamed place");
        println!("{name} {location}, within {}", snapshot.radius);
    }

    let Some(observations) = &snapshot.observations else {
        return;
    };

    println!();
    println!("Recent sightings ({})", observations.sightings.len());
    for sighting in &observations.sightings {
        println!("  {}", format_sighting(sighting));
    }

    println!();
    println!("Hotspots ({})", observations.hotspots.len());
    for hotspot in &observations.hotspots {
        println!("  {}", format_hotspot(hotspot));
    }
}

pub(crate) fn format_sighting(sighting: &Sighting) -> String {
    // eBird reports presence-only sightings without a count.
    let count = sighting
        .count
        .map_or_else(|| "X".to_string(), |n| n.to_string());
    format!(
        "{}  {count:>3}  {} ({}) at {}",
        sighting.observation_date,
        sighting.species_common_name,
        sighting.species_scientific_name,
        sighting.location_name
    )
}

pub(crate) fn format_hotspot(hotspot: &Hotspot) -> String {
    format!(
        "{:>4} species  {}  {} (last {})",
        hotspot.species_count, hotspot.location_name, hotspot.coordinate, hotspot.date
    )
}
