//! Wire shapes of the Nominatim JSON responses.

use birdwatch_core::{Coordinate, PlaceCandidate};
use serde::Deserialize;
use serde_json::Value;

/// One element of the `/search` array. Nominatim sends `lat`/`lon` as
/// strings and `place_id` as a number; both are accepted either way.
#[derive(Debug, Deserialize)]
pub(crate) struct SearchRecord {
    pub place_id: Value,
    pub lat: Value,
    pub lon: Value,
    pub display_name: String,
}

/// The `/reverse` body. An unresolvable point comes back as
/// `{"error": "Unable to geocode"}` with a 200 status.
#[derive(Debug, Deserialize)]
pub(crate) struct ReverseRecord {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl SearchRecord {
    /// Converts to a [`PlaceCandidate`], or `None` when the coordinate is
    /// unusable.
    pub(crate) fn into_candidate(self) -> Option<PlaceCandidate> {
        let latitude = value_as_f64(&self.lat)?;
        let longitude = value_as_f64(&self.lon)?;
        let coordinate = Coordinate::new(latitude, longitude).ok()?;
        let place_id = match self.place_id {
            Value::String(s) => s,
            other => other.to_string(),
        };
        Some(PlaceCandidate {
            display_name: self.display_name,
            coordinate,
            place_id,
        })
    }
}

fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(lat: Value, lon: Value) -> SearchRecord {
        SearchRecord {
            place_id: Value::from(283_471_u64),
            lat,
            lon,
            display_name: "Amaravati, Guntur, Andhra Pradesh, India".to_string(),
        }
    }

    #[test]
    fn string_coordinates_are_parsed() {
        let c = record(Value::from("16.5730"), Value::from("80.3575"))
            .into_candidate()
            .expect("valid record");
        assert!((c.coordinate.latitude() - 16.573).abs() < 1e-9);
        assert_eq!(c.place_id, "283471");
    }

    #[test]
    fn numeric_coordinates_are_parsed() {
        assert!(record(Value::from(16.5), Value::from(80.3))
            .into_candidate()
            .is_some());
    }

    #[test]
    fn unparseable_coordinate_is_skipped() {
        assert!(record(Value::from("north"), Value::from("80.3"))
            .into_candidate()
            .is_none());
    }

    #[test]
    fn out_of_range_coordinate_is_skipped() {
        assert!(record(Value::from("123.0"), Value::from("80.3"))
            .into_candidate()
            .is_none());
    }
}
