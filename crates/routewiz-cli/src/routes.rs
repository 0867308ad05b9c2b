//! The `create-routes` command.

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use routewiz_client::AddressReconciliationEngine;
use routewiz_core::{AddressRecord, RouteDriver, RouteSchedule};

use crate::print_progress;

#[derive(Debug, Args)]
pub struct CreateRoutesArgs {
    /// Finalized addresses JSON, as written by `validate`
    pub addresses: PathBuf,
    /// Email or username (defaults to ROUTEWIZ_IDENTITY)
    #[arg(long)]
    pub identity: Option<String>,
    /// Driver and starting point, as EMAIL=hq or EMAIL=home (repeatable)
    #[arg(long = "driver", value_parser = parse_driver)]
    pub drivers: Vec<RouteDriver>,
    /// Route date (YYYY-MM-DD)
    #[arg(long)]
    pub date: String,
    /// Start time (HH:MM, 24-hour)
    #[arg(long)]
    pub time: String,
}

pub(crate) fn parse_driver(raw: &str) -> Result<RouteDriver, String> {
    let (email, location) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected EMAIL=hq|home, got '{raw}'"))?;
    let email = email.trim();
    if email.is_empty() {
        return Err(format!("missing driver email in '{raw}'"));
    }
    Ok(RouteDriver {
        email: email.to_owned(),
        starting_location: location.parse().map_err(|e: routewiz_core::CoreError| e.to_string())?,
    })
}

/// Creates routes and waits for the backend to finish building them.
///
/// # Errors
///
/// Returns an error if the address file cannot be read, the schedule is
/// malformed or not in the future, no drivers are given, or the route job
/// fails. Per-driver failures inside a completed job are printed, not
/// returned.
pub(crate) async fn run_create_routes(
    engine: &AddressReconciliationEngine,
    identity: &str,
    args: CreateRoutesArgs,
) -> anyhow::Result<()> {
    let raw = tokio::fs::read_to_string(&args.addresses)
        .await
        .with_context(|| format!("failed to read {}", args.addresses.display()))?;
    let addresses: Vec<AddressRecord> = serde_json::from_str(&raw)
        .with_context(|| format!("{} is not a finalized address list", args.addresses.display()))?;

    let schedule = RouteSchedule::parse(&args.date, &args.time, chrono::Local::now().naive_local())?;

    let job = engine
        .create_routes(identity, &args.drivers, &addresses, schedule)
        .await?;
    let result = engine.wait_for_routes(&job, print_progress).await?;

    println!("created {} route(s)", result.total_routes);
    for route in &result.created_routes {
        if route.is_success() {
            println!(
                "  {:<32}{:<6}{} stops",
                route.driver,
                route.starting_location.as_deref().unwrap_or("-"),
                route.addresses_count.unwrap_or_default()
            );
        } else {
            println!(
                "  {:<32}failed: {}",
                route.driver,
                route.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}
