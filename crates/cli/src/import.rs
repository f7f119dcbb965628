//! `kessler import` and `kessler merge-kaggle`.

use std::path::PathBuf;

use clap::Subcommand;

use kessler_ingest::spacetrack::Credentials;
use kessler_ingest::{celestrak, kaggle, spacetrack, unoosa};
use kessler_store::EnvelopeStore;

use crate::CliError;

#[derive(Subcommand)]
pub enum ImportSource {
    /// UNOOSA registry CSV, optionally enriched from a satcat export
    Unoosa {
        /// Path to the registry CSV
        registry: PathBuf,

        /// Satcat CSV keyed by OBJECT_ID, merged into matching rows
        #[arg(long)]
        satcat: Option<PathBuf>,
    },

    /// CelesTrak element-set feeds (all curated categories)
    Celestrak,

    /// Latest GP element sets from Space-Track for every cataloged object
    Spacetrack {
        #[arg(long, env = "SPACE_TRACK_USER")]
        user: String,

        #[arg(long, env = "SPACE_TRACK_PASS", hide_env_values = true)]
        password: String,
    },

    /// Kaggle catalog snapshot CSV
    Kaggle {
        /// Path to the catalog CSV
        catalog: PathBuf,
    },
}

pub fn cmd_import(store: &EnvelopeStore, source: ImportSource) -> Result<(), CliError> {
    match source {
        ImportSource::Unoosa { registry, satcat } => {
            let summary = unoosa::import(store, &registry, satcat.as_deref())?;
            println!(
                "unoosa: {} imported, {} satcat-enriched, {} skipped",
                summary.imported, summary.satcat_matched, summary.skipped
            );
        }
        ImportSource::Celestrak => {
            let mut importer = celestrak::CelestrakImporter::new()?;
            let summary = importer.run(store)?;
            println!(
                "celestrak: {} fetched, {} matched, {} created",
                summary.fetched, summary.matched, summary.created
            );
            for category in &summary.failed_categories {
                eprintln!("warning: category {} skipped (fetch failed)", category);
            }
            for err in &summary.errors {
                eprintln!("warning: {}", err);
            }
            if !summary.errors.is_empty() {
                return Err(CliError::error(format!(
                    "{} record(s) failed to import",
                    summary.errors.len()
                )));
            }
        }
        ImportSource::Spacetrack { user, password } => {
            let importer = spacetrack::SpaceTrackImporter::new(Credentials {
                username: user,
                password,
            });
            let summary = importer.run(store)?;
            println!(
                "spacetrack: {} targets, {} updated, {} failed",
                summary.total, summary.updated, summary.failed
            );
        }
        ImportSource::Kaggle { catalog } => {
            let summary = kaggle::import(store, &catalog)?;
            println!(
                "kaggle: {} imported ({} matched, {} created), {} skipped",
                summary.imported, summary.matched, summary.created, summary.skipped
            );
        }
    }
    Ok(())
}

pub fn cmd_merge_kaggle(store: &EnvelopeStore) -> Result<(), CliError> {
    let summary = kaggle::merge_by_name(store)?;
    println!(
        "merge-kaggle: {} merged, {} left standalone",
        summary.merged, summary.unmatched
    );
    Ok(())
}
