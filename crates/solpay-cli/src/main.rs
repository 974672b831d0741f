//! # solpay CLI entry point
//!
//! Parses command-line arguments, resolves settings, and dispatches to
//! subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use solpay_cli::config::Settings;
use solpay_cli::escrow::{run_escrow, EscrowArgs};
use solpay_cli::keygen::{run_keygen, KeygenArgs};
use solpay_cli::ledger::{run_ledger, LedgerArgs};

/// Two-party token escrow over a local ledger.
#[derive(Parser, Debug)]
#[command(name = "solpay", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to a YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the ledger and escrow state.
    #[arg(long, global = true)]
    state_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate an Ed25519 key pair.
    Keygen(KeygenArgs),

    /// Mints, airdrops, token accounts, and balances.
    Ledger(LedgerArgs),

    /// Derive, open, complete, cancel, and inspect escrows.
    Escrow(EscrowArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // RUST_LOG applies only when no -v flag is given.
    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "solpay CLI starting");

    let result = match cli.command {
        Commands::Keygen(args) => run_keygen(&args),
        Commands::Ledger(args) => {
            Settings::resolve(cli.config.as_deref(), cli.state_dir.as_deref())
                .and_then(|settings| run_ledger(&args, &settings))
        }
        Commands::Escrow(args) => {
            Settings::resolve(cli.config.as_deref(), cli.state_dir.as_deref())
                .and_then(|settings| run_escrow(&args, &settings))
        }
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
