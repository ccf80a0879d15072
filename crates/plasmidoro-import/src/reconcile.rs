//! Decides what a candidate sequence file does to the plasmid of the same name.

use std::fmt;

use plasmidoro_core::SequenceRecord;
use plasmidoro_formats::detect_format_from_extension;
use plasmidoro_store::models::Plasmid;
use plasmidoro_store::plasmids::{
    create_plasmid, delete_features, get_plasmid_by_name, purge_orphan_proteins,
    replace_sequence, set_source_file,
};
use rusqlite::Connection;
use serde::Serialize;
use tracing::info;

use crate::features::store_features;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Created,
    /// Sequence, footprint and source file replaced; features regenerated.
    FullyReplaced,
    /// Same content under a new path: source file recorded, features
    /// re-derived, stored sequence kept.
    FeaturesRefreshed,
    Unchanged,
    SkippedNotOverwritable,
    /// An annotated file backs the plasmid and the candidate is not annotated.
    SkippedFormatNotPreferred,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Created => "created",
            Outcome::FullyReplaced => "replaced",
            Outcome::FeaturesRefreshed => "features refreshed",
            Outcome::Unchanged => "unchanged",
            Outcome::SkippedNotOverwritable => "skipped (overwrite not allowed)",
            Outcome::SkippedFormatNotPreferred => "skipped (format not preferred)",
        }
    }

    pub fn is_write(&self) -> bool {
        matches!(
            self,
            Outcome::Created | Outcome::FullyReplaced | Outcome::FeaturesRefreshed
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn is_annotated(path: &str) -> bool {
    detect_format_from_extension(path).is_some_and(|f| f.is_annotated())
}

/// Outcome for an existing plasmid; rules are checked in order.
pub fn decide(existing: &Plasmid, source_file: &str, checksum: &str, overwrite: bool) -> Outcome {
    let same_content = existing.footprint == checksum;
    let same_file = existing.sequence_file == source_file;

    if !overwrite {
        Outcome::SkippedNotOverwritable
    } else if same_content && same_file {
        Outcome::Unchanged
    } else if same_content {
        Outcome::FeaturesRefreshed
    } else if same_file || existing.sequence_file.is_empty() {
        Outcome::FullyReplaced
    } else if is_annotated(&existing.sequence_file) && !is_annotated(source_file) {
        Outcome::SkippedFormatNotPreferred
    } else {
        Outcome::FullyReplaced
    }
}

/// Reconcile one parsed file against the plasmid `name`, in one transaction.
pub fn reconcile(
    conn: &Connection,
    name: &str,
    candidate: &SequenceRecord,
    source_file: &str,
    checksum: &str,
    overwrite: bool,
) -> Result<Outcome> {
    let tx = conn.unchecked_transaction()?;

    let outcome = match get_plasmid_by_name(&tx, name)? {
        None => {
            let id = create_plasmid(&tx, name)?;
            replace_sequence(&tx, id, &candidate.sequence, checksum, source_file)?;
            let counts = store_features(&tx, id, name, &candidate.sequence, &candidate.features)?;
            info!("{} created from {} ({} features)", name, source_file, counts.features);
            Outcome::Created
        }
        Some(existing) => {
            let outcome = decide(&existing, source_file, checksum, overwrite);
            match outcome {
                Outcome::FullyReplaced => {
                    delete_features(&tx, existing.id)?;
                    purge_orphan_proteins(&tx)?;
                    replace_sequence(&tx, existing.id, &candidate.sequence, checksum, source_file)?;
                    let counts = store_features(
                        &tx,
                        existing.id,
                        name,
                        &candidate.sequence,
                        &candidate.features,
                    )?;
                    info!(
                        "{} replaced from {} ({} features)",
                        name, source_file, counts.features
                    );
                }
                Outcome::FeaturesRefreshed => {
                    set_source_file(&tx, existing.id, &existing.footprint, source_file)?;
                    let counts = store_features(
                        &tx,
                        existing.id,
                        name,
                        &existing.sequence,
                        &candidate.features,
                    )?;
                    info!(
                        "{} moved from {} to {} ({} new features)",
                        name, existing.sequence_file, source_file, counts.features
                    );
                }
                skipped => info!("{} {}: {}", name, skipped, source_file),
            }
            outcome
        }
    };

    tx.commit()?;
    Ok(outcome)
}
