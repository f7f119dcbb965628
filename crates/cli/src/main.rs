// kessler CLI - satellite registry operations

mod config;
mod exit_codes;
mod import;
mod promote;
mod query;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use kessler_registry::RegistryError;
use kessler_store::{EnvelopeStore, StoreError};

use config::Config;
use exit_codes::{EXIT_ERROR, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "kessler")]
#[command(about = "Multi-source satellite registry with a reconciled canonical view")]
#[command(version)]
struct Cli {
    /// Database file (default: config, then the platform data dir)
    #[arg(long, global = true, env = "KESSLER_DB")]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Copy a field value to another path across matching envelopes
    #[command(after_help = "\
Examples:
  kessler promote kaggle_1.orbital_band canonical.orbital_band
  kessler promote kaggle_1.congestion_risk canonical.congestion_risk --dry-run
  kessler promote unoosa.country_of_origin canonical.country --filter 'unoosa.status=Operational'
  kessler promote kaggle_1.orbital_band canonical.orbital_band --all --yes")]
    Promote {
        /// Path to read (bare source prefixes allowed, e.g. kaggle_1.x)
        source_field: String,

        /// Path to write (e.g. canonical.orbital_band)
        target_field: String,

        /// Show what would change without writing
        #[arg(long)]
        dry_run: bool,

        /// Restrict candidates: 'field=value' or 'f1=v1,f2=v2'
        #[arg(long, value_name = "EXPR")]
        filter: Option<String>,

        /// Process every candidate instead of the first 10
        #[arg(long)]
        all: bool,

        /// Skip the confirmation prompt for large batches
        #[arg(long, short = 'y')]
        yes: bool,

        /// Recorded in each envelope's transformation log
        #[arg(long)]
        reason: Option<String>,

        /// Print each written envelope
        #[arg(long, short = 'v')]
        verbose: bool,
    },

    /// Import an external feed
    Import {
        #[command(subcommand)]
        source: import::ImportSource,
    },

    /// Fold standalone Kaggle envelopes into name-matching registry envelopes
    MergeKaggle,

    /// Look up a single envelope
    #[command(after_help = "\
Examples:
  kessler find 1998-067A
  kessler find 'ISS (ZARYA)' --by name
  kessler find ST/SG/SER.E/345 --by registration")]
    Find {
        term: String,

        /// Key to match: designator, registration, or name
        /// (default: try each in that order)
        #[arg(long)]
        by: Option<query::FindKey>,
    },

    /// Search envelopes, JSON output
    #[command(after_help = "\
Examples:
  kessler search -q starlink
  kessler search --country usa --status operational
  kessler search --band LEO --risk high --limit 20 --skip 40")]
    Search {
        /// Text query across name, object name, designator, registration
        #[arg(long, short = 'q')]
        query: Option<String>,

        #[arg(long)]
        country: Option<String>,

        #[arg(long)]
        status: Option<String>,

        /// Orbital band filter (e.g. LEO, GEO)
        #[arg(long)]
        band: Option<String>,

        /// Congestion risk filter
        #[arg(long)]
        risk: Option<String>,

        #[arg(long, default_value_t = kessler_store::DEFAULT_SEARCH_LIMIT)]
        limit: u32,

        #[arg(long, default_value_t = 0)]
        skip: u32,
    },

    /// List the distinct values of a facet field
    Facets {
        /// country, status, orbital_band, or congestion_risk
        field: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = run(cli);

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

fn run(cli: Cli) -> Result<(), CliError> {
    let config = Config::load()?;
    let store = open_store(&config, cli.db)?;

    match cli.command {
        Commands::Promote {
            source_field,
            target_field,
            dry_run,
            filter,
            all,
            yes,
            reason,
            verbose,
        } => promote::cmd_promote(
            &store,
            promote::PromoteArgs {
                source_field,
                target_field,
                dry_run,
                filter,
                all,
                yes,
                reason,
                verbose,
            },
        ),
        Commands::Import { source } => import::cmd_import(&store, source),
        Commands::MergeKaggle => import::cmd_merge_kaggle(&store),
        Commands::Find { term, by } => query::cmd_find(&store, &term, by),
        Commands::Search {
            query,
            country,
            status,
            band,
            risk,
            limit,
            skip,
        } => query::cmd_search(
            &store,
            kessler_store::SearchQuery {
                text: query,
                country,
                status,
                orbital_band: band,
                congestion_risk: risk,
                limit,
                skip,
            },
        ),
        Commands::Facets { field } => query::cmd_facets(&store, &field),
    }
}

fn open_store(config: &Config, db_flag: Option<PathBuf>) -> Result<EnvelopeStore, CliError> {
    let path = config.database_path(db_flag)?;
    let mut store = EnvelopeStore::open(&path)
        .map_err(|e| CliError::error(e.to_string()).with_hint(format!("db: {}", path.display())))?;
    if let Some(priority) = &config.source_priority {
        store.set_source_priority(priority.clone());
    }
    Ok(store)
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_ERROR,
            message: msg.into(),
            hint: None,
        }
    }

    pub fn usage(msg: impl Into<String>) -> Self {
        Self {
            code: EXIT_USAGE,
            message: msg.into(),
            hint: None,
        }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

impl From<StoreError> for CliError {
    fn from(err: StoreError) -> Self {
        CliError::error(err.to_string())
    }
}

impl From<RegistryError> for CliError {
    fn from(err: RegistryError) -> Self {
        CliError::error(err.to_string())
    }
}

impl From<kessler_ingest::ImportError> for CliError {
    fn from(err: kessler_ingest::ImportError) -> Self {
        CliError::error(err.to_string())
    }
}
