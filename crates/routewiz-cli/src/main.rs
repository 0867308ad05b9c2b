mod routes;
mod validate;

use clap::{Parser, Subcommand};
use routewiz_client::AddressReconciliationEngine;
use routewiz_core::AppConfig;
use tracing_subscriber::EnvFilter;

use crate::routes::CreateRoutesArgs;
use crate::validate::ValidateArgs;

#[derive(Debug, Parser)]
#[command(name = "routewiz")]
#[command(about = "Route-planning wizard command line interface")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Look up an account and the drivers it dispatches for
    ValidateUser {
        /// Email or username (defaults to ROUTEWIZ_IDENTITY)
        #[arg(long)]
        identity: Option<String>,
    },
    /// Upload a spreadsheet, validate and correct its addresses, and print
    /// the finalized list as JSON
    Validate(ValidateArgs),
    /// Create routes for a finalized address list
    CreateRoutes(CreateRoutesArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = routewiz_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let engine = AddressReconciliationEngine::from_config(&config)?;

    match cli.command {
        Commands::ValidateUser { identity } => {
            let identity = resolve_identity(identity, &config)?;
            run_validate_user(&engine, &identity).await
        }
        Commands::Validate(args) => {
            let identity = resolve_identity(args.identity.clone(), &config)?;
            validate::run_validate(&engine, &identity, args).await
        }
        Commands::CreateRoutes(args) => {
            let identity = resolve_identity(args.identity.clone(), &config)?;
            routes::run_create_routes(&engine, &identity, args).await
        }
    }
}

/// Picks the `--identity` flag over the configured default.
fn resolve_identity(flag: Option<String>, config: &AppConfig) -> anyhow::Result<String> {
    flag.or_else(|| config.default_identity.clone())
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
        .ok_or_else(|| anyhow::anyhow!("no identity given; pass --identity or set ROUTEWIZ_IDENTITY"))
}

async fn run_validate_user(
    engine: &AddressReconciliationEngine,
    identity: &str,
) -> anyhow::Result<()> {
    let response = engine.validate_user(identity).await?;

    match response.user {
        Some(user) => println!("{} <{}>", user.display_name(), user.member_email),
        None => println!("{identity}"),
    }
    if response.sub_drivers.is_empty() {
        println!("no drivers found for this account");
        return Ok(());
    }
    println!("{} driver(s):", response.sub_drivers.len());
    for driver in &response.sub_drivers {
        println!("  {:<32}{}", driver.member_email, driver.display_name());
    }
    Ok(())
}

/// Progress line on stderr so stdout stays machine-readable.
fn print_progress(percent: u8, message: &str) {
    eprintln!("[{percent:>3}%] {message}");
}
