//! dnac - Bring a controller's sites, tags and tag memberships to a declared state
//!
//! Controller access comes from `DNAC_*` environment variables, optionally
//! loaded from a `.env` file.

use clap::{Parser, Subcommand};

use dnac_cli::commands;
use dnac_cli::error::CliResult;
use dnac_cli::logging::init_logging;

/// dnac - Controller inventory reconciliation
#[derive(Parser)]
#[command(name = "dnac")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Increase log verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, env = "DNAC_LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Reconcile the controller with a desired-state file
    Apply(commands::apply::ApplyArgs),

    /// Query and update tag membership
    TagMembers(commands::tag_members::TagMembersArgs),

    /// Query device insights
    Devices(commands::devices::DevicesArgs),

    /// Diagnose configuration and connectivity
    Doctor(commands::doctor::DoctorArgs),
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    match run(cli).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            e.print();
            std::process::exit(e.exit_code());
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    match cli.command {
        Commands::Apply(args) => commands::apply::execute(args).await,
        Commands::TagMembers(args) => commands::tag_members::execute(args).await,
        Commands::Devices(args) => commands::devices::execute(args).await,
        Commands::Doctor(args) => commands::doctor::execute(args).await,
    }
}
