mod commands;
mod input;
mod output;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::process;

use commands::loan::AmortizeArgs;
use commands::projection::ProjectArgs;
use commands::returns::{IrrArgs, MetricsArgs, NpvArgs};
use commands::scoring::ScoreArgs;
use commands::sensitivity::SensitivityArgs;
use output::OutputFormat;

/// Loan amortisation, value projections and return metrics
#[derive(Parser)]
#[command(
    name = "finproj",
    version,
    about = "Loan amortisation, value projections and return metrics",
    long_about = "A CLI for amortising loans, projecting values under growth, churn and \
                  fees, and computing NPV, IRR, payback, DSCR, sensitivities and \
                  threshold scores with decimal precision. Inputs come from --input, \
                  piped JSON on stdin, or per-command flags."
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Output format
    #[arg(long, default_value = "json", global = true)]
    output: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a fixed-payment amortisation schedule
    Amortize(AmortizeArgs),
    /// Project a value under growth, churn, fees and contributions
    Project(ProjectArgs),
    /// Net present value of a cash-flow series
    Npv(NpvArgs),
    /// Internal rate of return of a cash-flow series
    Irr(IrrArgs),
    /// NPV, IRR, equity multiple, payback and DSCR in one pass
    Metrics(MetricsArgs),
    /// Elasticity of a projection output to each assumption
    Sensitivity(SensitivityArgs),
    /// Weighted threshold score and grade for a metric bundle
    Score(ScoreArgs),
    /// Print version information
    Version,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    let result: Result<serde_json::Value, Box<dyn std::error::Error>> = match cli.command {
        Commands::Amortize(args) => commands::loan::run_amortize(args),
        Commands::Project(args) => commands::projection::run_project(args),
        Commands::Npv(args) => commands::returns::run_npv(args),
        Commands::Irr(args) => commands::returns::run_irr(args),
        Commands::Metrics(args) => commands::returns::run_metrics(args),
        Commands::Sensitivity(args) => commands::sensitivity::run_sensitivity(args),
        Commands::Score(args) => commands::scoring::run_score(args),
        Commands::Version => {
            println!("finproj {}", env!("CARGO_PKG_VERSION"));
            return;
        }
    };

    match result {
        Ok(value) => {
            output::format_output(&cli.output, &value);
            process::exit(0);
        }
        Err(e) => {
            log::debug!("command failed: {e:?}");
            eprintln!("{}: {}", "error".red().bold(), e);
            process::exit(1);
        }
    }
}
