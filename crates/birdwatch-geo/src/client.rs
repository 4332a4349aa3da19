//! HTTP client for the Nominatim (OpenStreetMap) geocoding API.
//!
//! Wraps `reqwest` with Nominatim's query conventions and typed response
//! handling. Forward search returns candidates in provider order; reverse
//! lookup returns the display name when the provider has one.

use std::time::Duration;

use birdwatch_core::{Coordinate, PlaceCandidate};
use reqwest::{Client, Url};

use crate::error::GeocodeError;
use crate::types::{ReverseRecord, SearchRecord};

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org/";

/// Client for the Nominatim search and reverse endpoints.
///
/// Use [`NominatimClient::new`] for production or
/// [`NominatimClient::with_base_url`] to point at a mock server in tests.
pub struct NominatimClient {
    client: Client,
    base_url: Url,
}

impl NominatimClient {
    /// Creates a client pointed at the public Nominatim instance.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(timeout_secs: u64, user_agent: &str) -> Result<Self, GeocodeError> {
        Self::with_base_url(timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL.
    ///
    /// # Errors
    ///
    /// Returns [`GeocodeError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`GeocodeError::InvalidBaseUrl`] if
    /// `base_url` does not parse.
    pub fn with_base_url(
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, GeocodeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        // Exactly one trailing slash so `Url::join` appends the endpoint
        // instead of replacing the last path segment.
        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| GeocodeError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self { client, base_url })
    }

    /// Forward-geocodes `query`.
    ///
    /// Records whose coordinate cannot be parsed are skipped; order is
    /// otherwise the provider's.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GeocodeError::Deserialize`] if the body is not a JSON array of
    ///   places.
    pub async fn search(&self, query: &str) -> Result<Vec<PlaceCandidate>, GeocodeError> {
        let url = self.build_url("search", &[("q", query), ("format", "json")])?;
        let body = self.request_text(&url).await?;

        let records: Vec<SearchRecord> =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context: format!("search(q={query})"),
                source: e,
            })?;

        let total = records.len();
        let candidates: Vec<PlaceCandidate> = records
            .into_iter()
            .filter_map(SearchRecord::into_candidate)
            .collect();

        if candidates.len() != total {
            tracing::debug!(
                query,
                total,
                kept = candidates.len(),
                "skipped geocoding results with unusable coordinates"
            );
        }

        Ok(candidates)
    }

    /// Reverse-geocodes `coordinate` to a display name.
    ///
    /// Returns `Ok(None)` when the provider answers but has no name for the
    /// point.
    ///
    /// # Errors
    ///
    /// - [`GeocodeError::Http`] on network failure or non-2xx HTTP status.
    /// - [`GeocodeError::Deserialize`] if the body is not a JSON object.
    pub async fn reverse(&self, coordinate: Coordinate) -> Result<Option<String>, GeocodeError> {
        let lat = coordinate.latitude().to_string();
        let lon = coordinate.longitude().to_string();
        let url = self.build_url(
            "reverse",
            &[("lat", lat.as_str()), ("lon", lon.as_str()), ("format", "json")],
        )?;
        let body = self.request_text(&url).await?;

        let record: ReverseRecord =
            serde_json::from_str(&body).map_err(|e| GeocodeError::Deserialize {
                context: format!("reverse(lat={lat}, lon={lon})"),
                source: e,
            })?;

        if let Some(error) = record.error {
            tracing::debug!(%coordinate, error = %error, "reverse geocoder returned no place");
            return Ok(None);
        }

        Ok(record.display_name.filter(|name| !name.trim().is_empty()))
    }

    /// Joins `endpoint` onto the base URL and appends percent-encoded query
    /// parameters.
    fn build_url(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<Url, GeocodeError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| GeocodeError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        {
            let mut pairs = url.query_pairs_mut();
            for (k, v) in params {
                pairs.append_pair(k, v);
            }
        }
        Ok(url)
    }

    /// Sends a GET request, asserts a 2xx status, and returns the body.
    async fn request_text(&self, url: &Url) -> Result<String, GeocodeError> {
        let response = self.client.get(url.clone()).send().await?;
        let response = response.error_for_status()?;
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_client(base_url: &str) -> NominatimClient {
        NominatimClient::with_base_url(30, "birdwatch-test/0.1", base_url)
            .expect("client construction should not fail")
    }

    #[test]
    fn build_url_constructs_search_query() {
        let client = test_client("https://nominatim.example.org");
        let url = client
            .build_url("search", &[("q", "Park Lake"), ("format", "json")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://nominatim.example.org/search?q=Park+Lake&format=json"
        );
    }

    #[test]
    fn build_url_keeps_base_path() {
        let client = test_client("https://geo.example.org/nominatim/");
        let url = client.build_url("reverse", &[("lat", "1")]).unwrap();
        assert_eq!(
            url.as_str(),
            "https://geo.example.org/nominatim/reverse?lat=1"
        );
    }

    #[test]
    fn build_url_encodes_special_characters() {
        let client = test_client("https://nominatim.example.org");
        let url = client.build_url("search", &[("q", "lake & marsh")]).unwrap();
        assert!(
            url.as_str().contains("lake+%26+marsh"),
            "query param should be percent-encoded: {url}"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let result = NominatimClient::with_base_url(30, "ua", "not a url");
        assert!(matches!(result, Err(GeocodeError::InvalidBaseUrl { .. })));
    }
}
