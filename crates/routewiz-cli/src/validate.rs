//! The `validate` command: upload, validate, apply corrections, finalize.
//!
//! Corrections and pins are given up front on the command line and applied in
//! a single correction round after the initial validation. Addresses still
//! invalid after that round are accepted as low confidence.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;
use routewiz_client::AddressReconciliationEngine;
use routewiz_core::{problem_type_counts, AddressBatchState};

use crate::print_progress;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Spreadsheet to upload (.xlsx or .xls)
    pub file: PathBuf,
    /// Email or username (defaults to ROUTEWIZ_IDENTITY)
    #[arg(long)]
    pub identity: Option<String>,
    /// Replacement text for an invalid address, as INDEX=TEXT (repeatable)
    #[arg(long = "correct", value_parser = parse_correction)]
    pub corrections: Vec<Correction>,
    /// Manual pin for an address, as INDEX=LAT,LNG (repeatable)
    #[arg(long = "pin", value_parser = parse_pin)]
    pub pins: Vec<Pin>,
    /// Driver email to check problem-type coverage for (repeatable)
    #[arg(long = "driver")]
    pub drivers: Vec<String>,
    /// Write the finalized addresses to this file instead of stdout
    #[arg(long, short)]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Correction {
    pub index: usize,
    pub text: String,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pin {
    pub index: usize,
    pub lat: f64,
    pub lng: f64,
}

pub(crate) fn parse_correction(raw: &str) -> Result<Correction, String> {
    let (index, text) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=TEXT, got '{raw}'"))?;
    let index = parse_index(index)?;
    Ok(Correction {
        index,
        text: text.to_owned(),
    })
}

pub(crate) fn parse_pin(raw: &str) -> Result<Pin, String> {
    let (index, coords) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected INDEX=LAT,LNG, got '{raw}'"))?;
    let (lat, lng) = coords
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got '{coords}'"))?;
    Ok(Pin {
        index: parse_index(index)?,
        lat: lat
            .trim()
            .parse()
            .map_err(|e| format!("invalid latitude '{lat}': {e}"))?,
        lng: lng
            .trim()
            .parse()
            .map_err(|e| format!("invalid longitude '{lng}': {e}"))?,
    })
}

fn parse_index(raw: &str) -> Result<usize, String> {
    raw.trim()
        .parse()
        .map_err(|e| format!("invalid address index '{raw}': {e}"))
}

/// Runs one upload through validation, an optional correction round, and
/// finalization.
///
/// # Errors
///
/// Returns an error if the upload, validation or correction round fails, a
/// pin is out of range, or the output cannot be written. A correction round
/// with nothing to send is reported and skipped.
pub(crate) async fn run_validate(
    engine: &AddressReconciliationEngine,
    identity: &str,
    args: ValidateArgs,
) -> anyhow::Result<()> {
    let records = engine.upload(&args.file).await?;
    eprintln!("uploaded {} addresses", records.len());
    for (problem_type, count) in problem_type_counts(&records) {
        eprintln!("  {problem_type:<24}{count}");
    }

    let mut state = engine
        .validate_batch(records, identity, print_progress)
        .await?;
    print_invalid(&state);

    for pin in &args.pins {
        state.apply_manual_coordinate(pin.index, pin.lat, pin.lng)?;
    }

    if !state.is_resolved() && !(args.corrections.is_empty() && args.pins.is_empty()) {
        let corrections: BTreeMap<usize, String> = args
            .corrections
            .into_iter()
            .map(|c| (c.index, c.text))
            .collect();
        match engine
            .run_correction_round(&corrections, &mut state, identity, print_progress)
            .await
        {
            Ok(()) => print_invalid(&state),
            Err(e) if e.is_informational() => eprintln!("{e}"),
            Err(e) => return Err(e.into()),
        }
    }

    eprintln!("{}", state.summary());
    let finalized = state.finalize();

    if !args.drivers.is_empty() {
        if let Some(report) = engine.check_coverage(&args.drivers, &finalized).await {
            if report.fully_covered {
                eprintln!("selected drivers cover every problem type");
            } else {
                eprintln!(
                    "warning: no selected driver handles: {}",
                    report.uncovered().join(", ")
                );
            }
        }
    }

    let json = serde_json::to_string_pretty(&finalized)?;
    match args.output {
        Some(path) => {
            tokio::fs::write(&path, json).await?;
            tracing::info!(path = %path.display(), addresses = finalized.len(), "finalized addresses written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_invalid(state: &AddressBatchState) {
    if state.is_resolved() {
        eprintln!("all {} addresses validated", state.len());
        return;
    }
    eprintln!(
        "{} of {} addresses need attention:",
        state.invalid_addresses().len(),
        state.len()
    );
    for record in state.invalid_addresses() {
        eprintln!(
            "  #{:<4}{:<18}{}",
            record.original_index,
            record.confidence.to_string(),
            record.address
        );
    }
}
