//! CLI for mcmcdiag: compare autocorrelation ensembles across folders of MCMC runs.

mod commands;
mod error;
mod render;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::builder::BoolishValueParser;
use clap::{ArgAction, Parser, Subcommand};

use crate::error::CliError;

#[derive(Parser)]
#[command(name = "mcmcdiag")]
#[command(about = "mcmcdiag: average and compare MCMC autocorrelation diagnostics")]
#[command(version = mcmcdiag_core::VERSION)]
struct Cli {
    /// More log output (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare the average autocorrelation of two sets of diagnostic files.
    /// Output format follows the file extension (.svg or .json).
    Compare {
        /// Path pattern for the first set, e.g. "fits/A/*/diag.json"
        pattern1: String,
        /// Legend label for the first set
        label1: String,
        /// Path pattern for the second set
        pattern2: String,
        /// Legend label for the second set
        label2: String,
        /// Output file (.svg or .json)
        output: PathBuf,

        /// Draw the min/max envelope [default: true]
        #[arg(value_parser = BoolishValueParser::new())]
        draw_min_max: Option<bool>,

        /// Draw every individual histogram [default: false]
        #[arg(value_parser = BoolishValueParser::new())]
        draw_all: Option<bool>,

        /// Draw the error band around each average [default: true]
        #[arg(value_parser = BoolishValueParser::new())]
        draw_errors: Option<bool>,

        #[command(flatten)]
        args: commands::RunArgs,
    },

    /// Average one set of diagnostic files and print a summary.
    Average {
        /// Path pattern, e.g. "fits/A/*/diag.json"
        pattern: String,
        /// Label for the set
        label: String,
        /// Also render to this file (.svg or .json)
        output: Option<PathBuf>,

        /// Keep every individual histogram in the output
        #[arg(long)]
        all_members: bool,

        /// Skip the min/max envelope
        #[arg(long)]
        no_min_max: bool,

        /// Skip the error band
        #[arg(long)]
        no_errors: bool,

        #[command(flatten)]
        args: commands::RunArgs,
    },

    /// Show which histograms in one file pass the degeneracy filter.
    Inspect {
        /// Diagnostic file
        file: PathBuf,

        #[command(flatten)]
        args: commands::LoadArgs,
    },

    /// List the files a path pattern matches.
    Resolve {
        /// Path pattern
        pattern: String,
    },
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default))
        .format_timestamp_millis()
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Compare {
            pattern1,
            label1,
            pattern2,
            label2,
            output,
            draw_min_max,
            draw_all,
            draw_errors,
            args,
        } => commands::compare::run(commands::compare::CompareCommandConfig {
            pattern1: &pattern1,
            label1: &label1,
            pattern2: &pattern2,
            label2: &label2,
            output: &output,
            draw_min_max,
            draw_all,
            draw_errors,
            args: &args,
        }),
        Commands::Average {
            pattern,
            label,
            output,
            all_members,
            no_min_max,
            no_errors,
            args,
        } => commands::average::run(commands::average::AverageCommandConfig {
            pattern: &pattern,
            label: &label,
            output: output.as_deref(),
            all_members,
            no_min_max,
            no_errors,
            args: &args,
        }),
        Commands::Inspect { file, args } => commands::inspect::run(&file, &args),
        Commands::Resolve { pattern } => commands::resolve::run(&pattern),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
