// partcheck CLI - master-data reconciliation and completeness checks

mod commands;
mod exit_codes;
mod http_lookup;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use partcheck_io::IoError;
use partcheck_recon::CheckError;

use exit_codes::{EXIT_CONFIG, EXIT_ERROR, EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "partcheck")]
#[command(about = "Reconcile master-data spreadsheets against a product lookup")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace). RUST_LOG wins.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Insert reference companion columns and paint every compared field
    #[command(after_help = "\
Examples:
  partcheck compare stammdaten.xlsx --reference refs.json -o abgleich.xlsx
  partcheck compare stammdaten.xlsx --lookup-url 'https://host/api/products/{id}' -o abgleich.xlsx --strict")]
    Compare {
        /// Master-data workbook (.xlsx)
        input: PathBuf,

        /// Where to write the reconciled workbook
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// JSON object mapping identifier to reference record
        #[arg(long, conflicts_with = "lookup_url")]
        reference: Option<PathBuf>,

        /// Lookup URL template containing {id}
        #[arg(long, env = "PARTCHECK_LOOKUP_URL")]
        lookup_url: Option<String>,

        /// Per-request timeout for --lookup-url, in seconds
        #[arg(long, default_value_t = 30)]
        timeout: u64,

        /// TOML configuration file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Lookups in flight (overrides lookup.concurrency)
        #[arg(long)]
        concurrency: Option<usize>,

        /// Print report and statistics as JSON to stdout
        #[arg(long)]
        json: bool,

        /// Exit 5 when any row has a deviation
        #[arg(long)]
        strict: bool,
    },

    /// Write a quality report flagging missing and implausible cells
    Completeness {
        /// Master-data workbook (.xlsx)
        input: PathBuf,

        /// Where to write the report workbook
        #[arg(long, short = 'o')]
        output: PathBuf,

        /// TOML configuration file
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,

        /// Print report and statistics as JSON to stdout
        #[arg(long)]
        json: bool,
    },

    /// Recompute statistics from a workbook written by compare or completeness
    Stats {
        /// Reconciled workbook or quality report (.xlsx)
        file: PathBuf,

        /// Which engine wrote the file
        #[arg(long, value_enum)]
        kind: StatsKind,

        /// TOML configuration file (labels and data rows)
        #[arg(long, short = 'c')]
        config: Option<PathBuf>,
    },

    /// Print the default configuration as TOML
    Config,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum StatsKind {
    Recon,
    Completeness,
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp(None)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compare {
            input,
            output,
            reference,
            lookup_url,
            timeout,
            config,
            concurrency,
            json,
            strict,
        } => commands::cmd_compare(commands::CompareArgs {
            input,
            output,
            reference,
            lookup_url,
            timeout,
            config,
            concurrency,
            json,
            strict,
        }),
        Commands::Completeness { input, output, config, json } => {
            commands::cmd_completeness(input, output, config, json)
        }
        Commands::Stats { file, kind, config } => commands::cmd_stats(file, kind, config),
        Commands::Config => commands::cmd_config(),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn usage(msg: impl Into<String>) -> Self {
        Self { code: EXIT_USAGE, message: msg.into(), hint: None }
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self { code: EXIT_IO, message: msg.into(), hint: None }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self { code: EXIT_CONFIG, message: msg.into(), hint: None }
    }

    pub fn general(msg: impl Into<String>) -> Self {
        Self { code: EXIT_ERROR, message: msg.into(), hint: None }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<CheckError> for CliError {
    fn from(err: CheckError) -> Self {
        match err {
            CheckError::Io(_) => Self::io(err.to_string()),
            CheckError::ConfigParse(_) | CheckError::ConfigValidation(_) => {
                Self::config(err.to_string()).with_hint("run `partcheck config` for a valid starting point")
            }
            CheckError::NoWorksheet => Self::general(err.to_string()),
        }
    }
}

impl From<IoError> for CliError {
    fn from(err: IoError) -> Self {
        match err {
            IoError::Open(_) => Self::io(err.to_string()).with_hint("input must be an .xlsx workbook"),
            IoError::Write(_) => Self::io(err.to_string()),
            IoError::NoSheets | IoError::Sheet { .. } => Self::general(err.to_string()),
        }
    }
}
