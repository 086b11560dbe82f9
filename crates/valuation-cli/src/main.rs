mod commands;
mod input;
mod output;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

use commands::valuation::{DatasetArgs, RowOrder};

/// Enterprise value and DCF intrinsic valuation
#[derive(Parser)]
#[command(
    name = "eqv",
    version,
    about = "Enterprise value decomposition and DCF intrinsic valuation",
    long_about = "Reads a chronologically ordered set of annual financial statements \
                  (JSON or YAML) and reports the enterprise value bridge per year and a \
                  5-year free cash flow DCF valuation of the latest year."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Market cap, net debt and enterprise value for every year
    EvHistory(DatasetArgs),
    /// DCF intrinsic value per share of the latest year
    Dcf(DatasetArgs),
    /// EV history, DCF, debt financing, verdict and KPIs in one report
    Report(DatasetArgs),
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

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("valuation_core={default_level},eqv={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    // Tables list the most recent year first; machine formats keep input order.
    let order = match cli.output {
        OutputFormat::Table => RowOrder::LatestFirst,
        _ => RowOrder::Chronological,
    };

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::EvHistory(args) => commands::valuation::run_ev_history(args, order),
        Commands::Dcf(args) => commands::valuation::run_dcf(args),
        Commands::Report(args) => commands::valuation::run_report(args, order),
        Commands::Version => {
            println!("eqv {}", env!("CARGO_PKG_VERSION"));
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
