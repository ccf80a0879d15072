//! Rows whose backing file or sheet row did not show up in an import run.

use std::collections::HashSet;

use plasmidoro_store::inventory::{delete_by_key, list_keys};
use plasmidoro_store::EntityKind;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

/// Stored keys missing from `seen`, in stored order.
pub fn find_orphans(stored: &[String], seen: &[String]) -> Vec<String> {
    let seen: HashSet<&str> = seen.iter().map(String::as_str).collect();
    stored
        .iter()
        .filter(|key| !seen.contains(key.as_str()))
        .cloned()
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrphanReport {
    pub kind: String,
    pub orphans: Vec<String>,
    pub deleted: bool,
}

/// Report (and with `delete`, remove) stored rows of `kind` not in `seen`.
pub fn reap(
    conn: &Connection,
    kind: EntityKind,
    seen: &[String],
    delete: bool,
) -> crate::Result<OrphanReport> {
    let orphans = find_orphans(&list_keys(conn, kind)?, seen);

    if delete && !orphans.is_empty() {
        let tx = conn.unchecked_transaction()?;
        for key in &orphans {
            delete_by_key(&tx, kind, key)?;
            info!("deleted orphan {} {}", kind, key);
        }
        tx.commit()?;
    } else {
        for key in &orphans {
            warn!("orphan {} {}: not seen in this run", kind, key);
        }
    }

    Ok(OrphanReport {
        kind: kind.to_string(),
        orphans,
        deleted: delete,
    })
}
