mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use commands::margin::SimmArgs;
use commands::params::ParamsArgs;
use commands::risk::VarArgs;
use commands::EngineArgs;

/// Counterparty exposure, VaR and initial margin calculations
#[derive(Parser)]
#[command(
    name = "ccrm",
    version,
    about = "Counterparty exposure, VaR and initial margin calculations",
    long_about = "A CLI for regulatory counterparty-risk and margin calculations with \
                  decimal precision. Supports SA-CCR exposure at default, add-on PFE, \
                  historical / parametric / Monte Carlo VaR, schedule initial margin \
                  and ISDA SIMM delta margin. Inputs are JSON documents read from \
                  --input or stdin."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Log engine progress to stderr (RUST_LOG takes precedence when set)
    #[arg(long, short, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Exposure at default under the Basel SA-CCR
    SaCcr(EngineArgs),
    /// Potential future exposure from add-on factors with net-to-gross netting
    Pfe(EngineArgs),
    /// Value-at-Risk and expected shortfall from price histories
    Var(VarArgs),
    /// Standardised schedule initial margin
    GridIm(EngineArgs),
    /// ISDA SIMM delta initial margin
    Simm(SimmArgs),
    /// Print a built-in parameter table
    Params(ParamsArgs),
    /// Print version information
    Version,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Csv,
    Minimal,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::SaCcr(args) => commands::exposure::run_sa_ccr(args),
        Commands::Pfe(args) => commands::exposure::run_pfe(args),
        Commands::Var(args) => commands::risk::run_var(args),
        Commands::GridIm(args) => commands::margin::run_grid_im(args),
        Commands::Simm(args) => commands::margin::run_simm(args),
        Commands::Params(args) if args.yaml => {
            match commands::params::run_params(&args).and_then(|v| commands::params::to_yaml(&v)) {
                Ok(yaml) => {
                    print!("{}", yaml);
                    return;
                }
                Err(e) => Err(e),
            }
        }
        Commands::Params(args) => commands::params::run_params(&args),
        Commands::Version => {
            println!("ccrm {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
