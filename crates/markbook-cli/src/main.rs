//! markbook CLI: import, analyse and validate exam mark books.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;
mod config;

#[derive(Parser)]
#[command(name = "markbook", version, about = "Exam mark book analytics and legacy import")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import an exported exam document and convert it to the current format
    Import {
        /// Exported exam JSON (any historical version)
        #[arg(long)]
        input: PathBuf,

        /// Write the canonical (version 2) export here
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Analyse exam results
    Analyze {
        /// Exam JSON with results
        #[arg(long)]
        input: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long)]
        format: Option<String>,

        /// Only include students in this class
        #[arg(long)]
        class: Option<String>,

        /// Save the report JSON to this path
        #[arg(long)]
        output: Option<PathBuf>,

        /// Save the report JSON to the configured output directory
        #[arg(long)]
        save: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Compare one student against the rest of the cohort
    Compare {
        /// Exam JSON with results
        #[arg(long)]
        input: PathBuf,

        /// Student id or full name
        #[arg(long)]
        student: String,

        /// Strength/weakness threshold in percentage points
        #[arg(long)]
        threshold: Option<f64>,

        /// Output format: text, json, markdown
        #[arg(long)]
        format: Option<String>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Check exam documents for structural problems
    Validate {
        /// Exam JSON file or directory of them
        #[arg(long)]
        input: PathBuf,
    },

    /// Create a starter config and sample exam
    Init,
}

fn main() {
    // Logs go to stderr so `--format json` output stays parseable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("markbook=info")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Import { input, output } => commands::import::execute(input, output),
        Commands::Analyze {
            input,
            format,
            class,
            output,
            save,
            config,
        } => commands::analyze::execute(input, format, class, output, save, config),
        Commands::Compare {
            input,
            student,
            threshold,
            format,
            config,
        } => commands::compare::execute(input, student, threshold, format, config),
        Commands::Validate { input } => commands::validate::execute(input),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
