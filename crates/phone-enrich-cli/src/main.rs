//! Phone Enrich CLI
//!
//! - `enrich`: fill Phone1..Phone4 of a CSV window from the people-search
//!   service, through the lookup cache, resumably
//! - `score`: rank the candidates of a saved result page against one record
//!   (offline)
//! - `cache stats`: summarize a cache file

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand, ValueEnum};
use phone_enrich_engine::config::DEFAULT_CACHE_PATH;
use phone_enrich_match::NameOrder;
use tracing_subscriber::EnvFilter;

mod cache_stats;
mod enrich;
mod score;

#[derive(Parser)]
#[command(name = "phone-enrich")]
#[command(author, version, about = "Enrich borrower records with phone numbers")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    /// Only warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Enrich a window of CSV rows with up to four phone numbers each.
    ///
    /// Progress is written after every row; rerunning the same command after
    /// an interruption continues where it stopped.
    Enrich(EnrichArgs),

    /// Score a saved result page against one record (no network).
    Score(ScoreArgs),

    /// Lookup cache commands.
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Entry counts per outcome and fetch-time range.
    Stats {
        #[arg(long, env = "PHONE_ENRICH_CACHE_PATH", default_value = DEFAULT_CACHE_PATH)]
        cache_path: PathBuf,
    },
}

#[derive(Args, Debug)]
pub struct EnrichArgs {
    /// Input CSV (normalized rows with name and address columns)
    pub input: PathBuf,
    /// Output CSV (input columns plus Phone1..Phone4)
    pub output: PathBuf,
    /// JSON config file; flags override its values
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long, env = "PHONE_ENRICH_CACHE_PATH")]
    pub cache_path: Option<PathBuf>,
    /// Delay before each live fetch, in seconds
    #[arg(long, env = "PHONE_ENRICH_SLEEP_SEC")]
    pub sleep_sec: Option<f64>,
    /// Random extra delay added to --sleep-sec
    #[arg(long)]
    pub jitter_sec: Option<f64>,
    /// Re-fetch every identity once, ignoring cached entries
    #[arg(long)]
    pub refresh: bool,
    /// Re-fetch identities whose cached lookup failed in an earlier run
    #[arg(long)]
    pub retry_errors: bool,
    /// Treat cached entries older than this as missing
    #[arg(long)]
    pub max_age_days: Option<u32>,

    /// First row to process (1-based, inclusive)
    #[arg(long)]
    pub from_row: Option<usize>,
    /// Last row to process (1-based, inclusive)
    #[arg(long)]
    pub to_row: Option<usize>,
    /// Process the first N rows
    #[arg(long)]
    pub limit: Option<usize>,
    /// Process the last N rows
    #[arg(long)]
    pub last: Option<usize>,
    /// Ignore any checkpoint and process the whole window
    #[arg(long)]
    pub restart: bool,

    #[arg(long)]
    pub name_column: Option<String>,
    #[arg(long)]
    pub address_column: Option<String>,
    #[arg(long)]
    pub city_column: Option<String>,
    #[arg(long)]
    pub state_column: Option<String>,
    #[arg(long)]
    pub unit_column: Option<String>,
    /// Token order of the name column
    #[arg(long, value_enum)]
    pub name_order: Option<NameOrderArg>,

    /// Print the run report as JSON instead of the summary
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// Saved result page
    #[arg(long)]
    pub html: PathBuf,
    /// Record name, e.g. "SMITH JOHN A"
    #[arg(long)]
    pub name: String,
    /// Street line (may include city/state/zip)
    #[arg(long, default_value = "")]
    pub address: String,
    #[arg(long, default_value = "Miami")]
    pub city: String,
    #[arg(long, default_value = "FL")]
    pub state: String,
    #[arg(long, value_enum)]
    pub name_order: Option<NameOrderArg>,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum NameOrderArg {
    Auto,
    LastFirst,
    FirstLast,
}

impl From<NameOrderArg> for NameOrder {
    fn from(arg: NameOrderArg) -> Self {
        match arg {
            NameOrderArg::Auto => NameOrder::Auto,
            NameOrderArg::LastFirst => NameOrder::LastFirst,
            NameOrderArg::FirstLast => NameOrder::FirstLast,
        }
    }
}

fn init_logging(verbose: u8, quiet: bool) {
    let default = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match cli.command {
        Commands::Enrich(args) => enrich::cmd_enrich(&args),
        Commands::Score(args) => score::cmd_score(&args),
        Commands::Cache { command } => match command {
            CacheCommands::Stats { cache_path } => cache_stats::cmd_cache_stats(&cache_path),
        },
    }
}
