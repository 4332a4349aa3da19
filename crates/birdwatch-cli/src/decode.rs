//! `decode`: offline hotspot CSV inspection.

use std::path::Path;

use anyhow::Context;
use birdwatch_core::Hotspot;
use birdwatch_ebird::{decode_rows, RowOutcome, RowRejection};

use crate::observe::format_hotspot;

#[derive(Debug, Default)]
pub(crate) struct DecodeReport {
    pub hotspots: Vec<Hotspot>,
    pub rejected: Vec<(usize, RowRejection)>,
}

impl DecodeReport {
    pub(crate) fn from_outcomes(outcomes: Vec<RowOutcome>) -> Self {
        let mut report = Self::default();
        for outcome in outcomes {
            match outcome {
                RowOutcome::Valid(hotspot) => report.hotspots.push(hotspot),
                RowOutcome::Invalid { row, reason } => report.rejected.push((row, reason)),
            }
        }
        report
    }
}

pub(crate) fn run_decode(file: &Path, json: bool) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let report = DecodeReport::from_outcomes(decode_rows(&raw));

    if json {
        println!("{}", serde_json::to_string_pretty(&report.hotspots)?);
    } else {
        for hotspot in &report.hotspots {
            println!("{}", format_hotspot(hotspot));
        }
    }

    eprintln!(
        "{} hotspots decoded, {} rows rejected",
        report.hotspots.len(),
        report.rejected.len()
    );
    for (row, reason) in &report.rejected {
        eprintln!("  row {}: {reason}", row + 1);
    }
    Ok(())
}
