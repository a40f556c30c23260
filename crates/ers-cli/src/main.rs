//! # ers CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use ers_cli::demo::{run_demo, DemoArgs};
use ers_cli::keys::{run_keys, KeysArgs};
use ers_cli::merkle::{run_merkle, MerkleArgs};
use ers_cli::predict::{run_predict, PredictArgs};
use ers_cli::sign::{run_sign, SignArgs};

/// ERS chip registry toolchain.
///
/// Off-ledger companion to the registry: keys, the signatures and merkle
/// trees the registries verify, registrar address prediction and an
/// end-to-end demo deployment.
#[derive(Parser, Debug)]
#[command(name = "ers", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines.
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ed25519 key generation and address display.
    Keys(KeysArgs),

    /// Custody, ownership, certificate and service-change signatures.
    Sign(SignArgs),

    /// Manufacturer and project claim trees.
    Merkle(MerkleArgs),

    /// Deterministic registrar addresses.
    Predict(PredictArgs),

    /// Run a full lifecycle against a fresh deployment.
    Demo(DemoArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    // Logs go to stderr; stdout carries command output.
    if cli.log_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    tracing::debug!(version = env!("CARGO_PKG_VERSION"), "ers CLI starting");

    let result = match cli.command {
        Commands::Keys(args) => run_keys(&args),
        Commands::Sign(args) => run_sign(&args),
        Commands::Merkle(args) => run_merkle(&args),
        Commands::Predict(args) => run_predict(&args),
        Commands::Demo(args) => run_demo(&args),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(1)
        }
    }
}
