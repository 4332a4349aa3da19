//! `search` and `name`: direct geocoding lookups.

use birdwatch_core::{AppConfig, Coordinate};
use birdwatch_geo::{LocationResolver, NominatimClient};

pub(crate) fn build_geocoder(config: &AppConfig) -> anyhow::Result<NominatimClient> {
    NominatimClient::with_base_url(
        config.request_timeout_secs,
        &config.user_agent,
        &config.geocoder_base_url,
    )
    .map_err(|e| anyhow::anyhow!("failed to build geocoding client: {e}"))
}

/// Prints every candidate for `query`, numbered in provider order.
pub(crate) async fn run_search(config: &AppConfig, query: &str) -> anyhow::Result<()> {
    let resolver = LocationResolver::new(build_geocoder(config)?);
    let candidates = resolver.resolve_by_text(query).await?;

    if candidates.is_empty() {
        println!("no places matched '{}'", query.trim());
        return Ok(());
    }
    for (index, candidate) in candidates.iter().enumerate() {
        println!(
            "{index:>3}  {}  {}",
            candidate.coordinate, candidate.display_name
        );
    }
    Ok(())
}

/// Prints the place name for a coordinate. Unlike the dashboard, provider
/// errors are reported instead of swallowed.
pub(crate) async fn run_name(config: &AppConfig, lat: f64, lng: f64) -> anyhow::Result<()> {
    let coordinate = Coordinate::new(lat, lng)?;
    match build_geocoder(config)?.reverse(coordinate).await? {
        Some(name) => println!("{name}"),
        None => println!("no place name known for {coordinate}"),
    }
    Ok(())
}
