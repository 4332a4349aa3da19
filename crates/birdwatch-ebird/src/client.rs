//! HTTP client for the eBird API 2.0.
//!
//! Two read-only endpoints are used, both keyed on the same coordinate and
//! radius: recent observations (JSON) and nearby hotspots (CSV). The API
//! token travels in the `X-eBirdApiToken` header.

use std::time::Duration;

use birdwatch_core::{Coordinate, ObservationBundle, SearchRadius, Sighting};
use reqwest::{Client, Url};

use crate::error::EbirdError;

pub const DEFAULT_BASE_URL: &str = "https://api.ebird.org/v2/";

const API_TOKEN_HEADER: &str = "X-eBirdApiToken";
const RECENT_OBSERVATIONS: &str = "data/obs/geo/recent";
const NEARBY_HOTSPOTS: &str = "ref/hotspot/geo";

/// Client for the eBird observation and hotspot endpoints.
pub struct EbirdClient {
    client: Client,
    api_key: String,
    base_url: Url,
}

impl EbirdClient {
    /// Creates a client pointed at the production eBird API.
    ///
    /// # Errors
    ///
    /// Returns [`EbirdError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed.
    pub fn new(api_key: &str, timeout_secs: u64, user_agent: &str) -> Result<Self, EbirdError> {
        Self::with_base_url(api_key, timeout_secs, user_agent, DEFAULT_BASE_URL)
    }

    /// Creates a client with a custom base URL (for testing with wiremock).
    ///
    /// # Errors
    ///
    /// Returns [`EbirdError::Http`] if the underlying `reqwest::Client`
    /// cannot be constructed, or [`EbirdError::InvalidBaseUrl`] if
    /// `base_url` is not a valid URL.
    pub fn with_base_url(
        api_key: &str,
        timeout_secs: u64,
        user_agent: &str,
        base_url: &str,
    ) -> Result<Self, EbirdError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent(user_agent)
            .build()?;

        let normalised = format!("{}/", base_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| EbirdError::InvalidBaseUrl {
            base_url: base_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            api_key: api_key.to_owned(),
            base_url,
        })
    }

    /// Fetches recent sightings and nearby hotspots concurrently.
    ///
    /// All-or-nothing: the first failure from either request is returned and
    /// no partial bundle is produced.
    ///
    /// # Errors
    ///
    /// See [`EbirdClient::recent_observations`] and
    /// [`EbirdClient::nearby_hotspots`].
    pub async fn fetch(
        &self,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> Result<ObservationBundle, EbirdError> {
        let (sightings, raw_hotspot_text) = tokio::try_join!(
            self.recent_observations(coordinate, radius),
            self.nearby_hotspots(coordinate, radius),
        )?;

        tracing::debug!(
            %coordinate,
            radius_km = radius.km(),
            sightings = sightings.len(),
            hotspot_bytes = raw_hotspot_text.len(),
            "eBird fetch complete"
        );

        Ok(ObservationBundle {
            sightings,
            raw_hotspot_text,
        })
    }

    /// Recent observations within `radius` of `coordinate`.
    ///
    /// # Errors
    ///
    /// - [`EbirdError::Http`] on network failure or timeout.
    /// - [`EbirdError::UnexpectedStatus`] on any non-2xx status.
    /// - [`EbirdError::Deserialize`] if the body is not a JSON array of
    ///   observations.
    pub async fn recent_observations(
        &self,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> Result<Vec<Sighting>, EbirdError> {
        let body = self.get_text(RECENT_OBSERVATIONS, coordinate, radius).await?;
        serde_json::from_str(&body).map_err(|e| EbirdError::Deserialize {
            context: format!(
                "{RECENT_OBSERVATIONS}(lat={}, lng={})",
                coordinate.latitude(),
                coordinate.longitude()
            ),
            source: e,
        })
    }

    /// Raw hotspot CSV within `radius` of `coordinate`; decode it with
    /// [`crate::decode`].
    ///
    /// # Errors
    ///
    /// - [`EbirdError::Http`] on network failure or timeout.
    /// - [`EbirdError::UnexpectedStatus`] on any non-2xx status.
    pub async fn nearby_hotspots(
        &self,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> Result<String, EbirdError> {
        self.get_text(NEARBY_HOTSPOTS, coordinate, radius).await
    }

    /// Builds `{base}{endpoint}?lat=..&lng=..&dist=..`.
    fn build_url(
        &self,
        endpoint: &str,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> Result<Url, EbirdError> {
        let mut url = self
            .base_url
            .join(endpoint)
            .map_err(|e| EbirdError::InvalidBaseUrl {
                base_url: self.base_url.to_string(),
                reason: e.to_string(),
            })?;
        url.query_pairs_mut()
            .append_pair("lat", &coordinate.latitude().to_string())
            .append_pair("lng", &coordinate.longitude().to_string())
            .append_pair("dist", &radius.km().to_string());
        Ok(url)
    }

    async fn get_text(
        &self,
        endpoint: &str,
        coordinate: Coordinate,
        radius: SearchRadius,
    ) -> Result<String, EbirdError> {
        let url = self.build_url(endpoint, coordinate, radius)?;
        let response = self
            .client
            .get(url)
            .header(API_TOKEN_HEADER, &self.api_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(EbirdError::UnexpectedStatus {
                status: status.as_u16(),
                endpoint: endpoint.to_owned(),
            });
        }

        Ok(response.text().await?)
    }
}
