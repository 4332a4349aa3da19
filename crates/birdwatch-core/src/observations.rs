//! Records produced by the resolve → fetch → decode pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Coordinate;

/// One geocoding match for a free-text location query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceCandidate {
    pub display_name: String,
    pub coordinate: Coordinate,
    /// Provider-assigned identifier, stringified.
    pub place_id: String,
}

/// A single reported observation of a bird species, kept exactly as the
/// observation provider sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sighting {
    #[serde(rename = "comName")]
    pub species_common_name: String,
    #[serde(rename = "sciName")]
    pub species_scientific_name: String,
    #[serde(rename = "obsDt")]
    pub observation_date: String,
    /// Absent when the observer reported presence without a count ("X").
    #[serde(rename = "howMany", default)]
    pub count: Option<u32>,
    #[serde(rename = "locName")]
    pub location_name: String,
    #[serde(rename = "subId")]
    pub submission_id: String,
    #[serde(rename = "speciesCode", default, skip_serializing_if = "Option::is_none")]
    pub species_code: Option<String>,
    #[serde(rename = "locId", default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<String>,
    #[serde(rename = "lat", default, skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(rename = "lng", default, skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
}

/// A named birding location with its all-time species tally.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hotspot {
    pub location_id: String,
    pub location_name: String,
    pub coordinate: Coordinate,
    /// Date of the latest observation, as the provider formats it.
    pub date: String,
    pub species_count: u32,
}

/// Raw output of one observation fetch: parsed sightings plus the hotspot
/// text that still needs decoding.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationBundle {
    pub sightings: Vec<Sighting>,
    pub raw_hotspot_text: String,
}

/// Decoded observations handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Observations {
    pub sightings: Vec<Sighting>,
    pub hotspots: Vec<Hotspot>,
    pub fetched_at: DateTime<Utc>,
}
