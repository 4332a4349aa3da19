//! Hotspot CSV decoding.
//!
//! The hotspot endpoint answers with header-less CSV, one hotspot per row:
//!
//! | idx | field                |
//! |-----|----------------------|
//! | 0   | location id          |
//! | 1-3 | country / region codes (unused) |
//! | 4   | latitude             |
//! | 5   | longitude            |
//! | 6   | location name        |
//! | 7   | latest observation date |
//! | 8   | all-time species count |
//!
//! Hotspots nobody has reported from yet stop after column 6. Every row is
//! validated on its own; a bad row never stops the rest from decoding.

use birdwatch_core::{Coordinate, CoreError, Hotspot};

const COL_ID: usize = 0;
const COL_LAT: usize = 4;
const COL_LNG: usize = 5;
const COL_NAME: usize = 6;
const COL_DATE: usize = 7;
const COL_COUNT: usize = 8;

/// Why a row was dropped.
#[derive(Debug, Clone, PartialEq)]
pub enum RowRejection {
    /// The column is absent or blank.
    MissingField(&'static str),
    /// The column is present but not a finite number of the right kind.
    InvalidNumber { field: &'static str, value: String },
    /// Both numbers parsed but do not form a valid coordinate.
    OutOfRange(CoreError),
    /// The CSV reader could not split the row.
    Malformed(String),
}

impl std::fmt::Display for RowRejection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RowRejection::MissingField(field) => write!(f, "missing {field}"),
            RowRejection::InvalidNumber { field, value } => {
                write!(f, "{field} is not a valid number: '{value}'")
            }
            RowRejection::OutOfRange(e) => write!(f, "{e}"),
            RowRejection::Malformed(reason) => write!(f, "malformed row: {reason}"),
        }
    }
}

/// Result of decoding one row.
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome {
    Valid(Hotspot),
    /// `row` is the zero-based record index in the input.
    Invalid { row: usize, reason: RowRejection },
}

/// Decodes every row, keeping the reason for each rejected one.
#[must_use]
pub fn decode_rows(raw: &str) -> Vec<RowOutcome> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(raw.as_bytes());

    reader
        .records()
        .enumerate()
        .map(|(row, record)| {
            let outcome = record
                .map_err(|e| RowRejection::Malformed(e.to_string()))
                .and_then(|record| decode_record(&record));
            match outcome {
                Ok(hotspot) => RowOutcome::Valid(hotspot),
                Err(reason) => RowOutcome::Invalid { row, reason },
            }
        })
        .collect()
}

/// Decodes hotspot CSV, silently dropping invalid rows. Input order is kept
/// and duplicate location ids are not merged.
#[must_use]
pub fn decode(raw: &str) -> Vec<Hotspot> {
    let outcomes = decode_rows(raw);
    let total = outcomes.len();

    let hotspots: Vec<Hotspot> = outcomes
        .into_iter()
        .filter_map(|outcome| match outcome {
            RowOutcome::Valid(hotspot) => Some(hotspot),
            RowOutcome::Invalid { row, reason } => {
                tracing::trace!(row, %reason, "dropping hotspot row");
                None
            }
        })
        .collect();

    if hotspots.len() != total {
        tracing::debug!(
            total,
            kept = hotspots.len(),
            "dropped invalid hotspot rows"
        );
    }

    hotspots
}

fn decode_record(record: &csv::StringRecord) -> Result<Hotspot, RowRejection> {
    let location_id = required(record, COL_ID, "location id")?;
    let latitude = finite(record, COL_LAT, "latitude")?;
    let longitude = finite(record, COL_LNG, "longitude")?;
    let location_name = required(record, COL_NAME, "location name")?;
    let date = required(record, COL_DATE, "date")?;
    let count_raw = required(record, COL_COUNT, "species count")?;

    let species_count = count_raw
        .parse::<u32>()
        .map_err(|_| RowRejection::InvalidNumber {
            field: "species count",
            value: count_raw.to_owned(),
        })?;

    let coordinate = Coordinate::new(latitude, longitude).map_err(RowRejection::OutOfRange)?;

    Ok(Hotspot {
        location_id: location_id.to_owned(),
        location_name: location_name.to_owned(),
        coordinate,
        date: date.to_owned(),
        species_count,
    })
}

fn required<'r>(
    record: &'r csv::StringRecord,
    index: usize,
    field: &'static str,
) -> Result<&'r str, RowRejection> {
    record
        .get(index)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or(RowRejection::MissingField(field))
}

fn finite(
    record: &csv::StringRecord,
    index: usize,
    field: &'static str,
) -> Result<f64, RowRejection> {
    let raw = required(record, index, field)?;
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| RowRejection::InvalidNumber {
            field,
            value: raw.to_owned(),
        })
}
