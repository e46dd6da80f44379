//! Chronicle operator CLI entry point.

use std::process::ExitCode;

use chronicle_cli::commands;
use chronicle_cli::config::ChronicleConfig;
use chronicle_cli::error::CliError;
use chronicle_cli::telemetry;
use chronicle_core::store::VersionRange;
use chronicle_event_store::PgEventStore;
use clap::{Parser, Subcommand};
use uuid::Uuid;

/// Chronicle - event store operator tool
#[derive(Debug, Parser)]
#[command(name = "chronicle", version, about, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Create the events table and indexes if missing
    Migrate,

    /// Print the events of one aggregate as JSON lines
    Inspect {
        /// Aggregate identifier
        aggregate_id: Uuid,
        /// Lowest version to print
        #[arg(long)]
        from: Option<i64>,
        /// Highest version to print
        #[arg(long)]
        to: Option<i64>,
    },

    /// Check that a stream starts at version 1 and has no gaps
    Verify {
        /// Aggregate identifier
        aggregate_id: Uuid,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match ChronicleConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("chronicle: {e}");
            return ExitCode::FAILURE;
        }
    };
    telemetry::init(config.log_format);
    tracing::info!(
        max_connections = config.store.max_connections,
        connect_timeout_secs = config.store.connect_timeout.as_secs(),
        "configuration loaded"
    );

    match run(cli.command, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("chronicle: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(command: Commands, config: &ChronicleConfig) -> Result<(), CliError> {
    let store = PgEventStore::connect(&config.store).await?;

    match command {
        Commands::Migrate => commands::migrate(&store).await,
        Commands::Inspect {
            aggregate_id,
            from,
            to,
        } => {
            let range = VersionRange { min: from, max: to };
            let mut out = std::io::stdout().lock();
            let written = commands::inspect(&store, aggregate_id, range, &mut out).await?;
            tracing::info!(%aggregate_id, records = written, "stream inspected");
            Ok(())
        }
        Commands::Verify { aggregate_id } => {
            let summary = commands::verify(&store, aggregate_id).await?;
            println!(
                "stream {} is valid: {} events, last version {}",
                summary.aggregate_id, summary.events, summary.last_version
            );
            Ok(())
        }
    }
}
