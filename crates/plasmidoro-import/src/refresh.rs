//! The "refresh all data" run: sync the data directory, import everything,
//! reap orphans and rebuild the BLAST databases.

use std::path::Path;
use std::process::Command;

use chrono::{DateTime, Utc};
use plasmidoro_store::EntityKind;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, info_span};
use uuid::Uuid;

use crate::blastdb::{self, BlastReport};
use crate::config::SyncConfig;
use crate::magic_pool::{import_design, import_pools, DesignReport, PoolReport};
use crate::orphans::{reap, OrphanReport};
use crate::table::{import_table, TableReport, OLIGOS, STRAINS};
use crate::tree::{import_tree, TreeReport};
use crate::workbook::Workbook;
use crate::{Config, ImportError, Result};

/// Spreadsheets a refresh reads, opened before anything is written.
#[derive(Debug, Clone, Default)]
pub struct Inputs {
    pub design: Workbook,
    pub pools: Workbook,
    pub oligos: Workbook,
    pub strains: Workbook,
}

fn open_required(path: &Path) -> Result<Workbook> {
    if !path.is_file() {
        return Err(ImportError::MissingFile(path.to_path_buf()));
    }
    Workbook::open(path)
}

impl Inputs {
    pub fn load(config: &Config) -> Result<Self> {
        Ok(Self {
            design: open_required(&config.magic_pool_design_path())?,
            pools: open_required(&config.magic_pool_summary_path())?,
            oligos: open_required(&config.oligos_path())?,
            strains: open_required(&config.strains_path())?,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshReport {
    pub run: Uuid,
    pub started: DateTime<Utc>,
    pub finished: Option<DateTime<Utc>>,
    pub design: DesignReport,
    pub plasmids: TreeReport,
    pub pools: PoolReport,
    pub oligos: TableReport,
    pub strains: TableReport,
    pub orphans: Vec<OrphanReport>,
    pub blast: Option<BlastReport>,
}

impl RefreshReport {
    fn new(run: Uuid) -> Self {
        Self {
            run,
            started: Utc::now(),
            finished: None,
            design: DesignReport::default(),
            plasmids: TreeReport::default(),
            pools: PoolReport::default(),
            oligos: TableReport::default(),
            strains: TableReport::default(),
            orphans: Vec::new(),
            blast: None,
        }
    }

    /// Plain-text summary, one line per stage.
    pub fn lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Refresh {} started {}",
            self.run,
            self.started.format("%Y-%m-%d %H:%M:%S UTC")
        )];
        lines.push(format!(
            "Magic pool design: {} part types created, {} skipped, {} vector types created",
            self.design.part_types_created,
            self.design.part_types_skipped,
            self.design.vector_types_created
        ));
        let p = &self.plasmids;
        lines.push(format!(
            "Plasmids: {} created, {} replaced, {} refreshed, {} unchanged, {} skipped, {} failed",
            p.created, p.replaced, p.refreshed, p.unchanged, p.skipped, p.failed
        ));
        lines.push(format!(
            "Magic pools: {} created, {} updated, {} plasmids linked, {} plasmids missing",
            self.pools.created,
            self.pools.updated,
            self.pools.plasmids_linked,
            self.pools.plasmids_missing
        ));
        for (label, table) in [("Oligos", &self.oligos), ("Strains", &self.strains)] {
            lines.push(format!(
                "{}: {} created, {} updated, {} unchanged",
                label, table.created, table.updated, table.unchanged
            ));
        }
        for orphans in self.orphans.iter().filter(|o| !o.orphans.is_empty()) {
            lines.push(format!(
                "Orphan {} ({}): {}",
                orphans.kind,
                if orphans.deleted { "deleted" } else { "kept" },
                orphans.orphans.join(", ")
            ));
        }
        if let Some(blast) = &self.blast {
            lines.push(format!(
                "BLAST databases: {} plasmids, {} oligos, {} proteins",
                blast.plasmids, blast.oligos, blast.proteins
            ));
        }
        if let Some(finished) = self.finished {
            lines.push(format!("Finished {}", finished.format("%Y-%m-%d %H:%M:%S UTC")));
        }
        lines
    }
}

/// Run the configured sync command. Its config file must exist first.
pub fn run_sync(sync: &SyncConfig) -> Result<()> {
    if !sync.config_file.is_file() {
        return Err(ImportError::MissingFile(sync.config_file.clone()));
    }
    info!("syncing data: {} {}", sync.command, sync.args.join(" "));
    let output = Command::new(&sync.command)
        .args(&sync.args)
        .output()
        .map_err(|e| ImportError::Command {
            program: sync.command.clone(),
            message: e.to_string(),
        })?;
    if !output.status.success() {
        return Err(ImportError::Command {
            program: sync.command.clone(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

/// Import every data source in dependency order and reap orphans after each.
/// `replace` lets changed map files overwrite stored plasmids; spreadsheet
/// rows always update.
pub fn import_all(
    conn: &Connection,
    config: &Config,
    inputs: &Inputs,
    replace: bool,
    run: Uuid,
) -> Result<RefreshReport> {
    let mut report = RefreshReport::new(run);

    report.design = import_design(conn, &inputs.design)?;

    report.plasmids = import_tree(
        conn,
        &config.plasmid_maps_dir(),
        replace,
        &config.archive_dirs,
    )?;
    report.orphans.push(reap(
        conn,
        EntityKind::Plasmid,
        &report.plasmids.names,
        config.delete_orphans,
    )?);

    report.pools = import_pools(conn, &inputs.pools)?;
    report.orphans.push(reap(
        conn,
        EntityKind::MagicPool,
        &report.pools.keys,
        config.delete_orphans,
    )?);

    report.oligos = import_table(conn, &inputs.oligos, &OLIGOS, true)?;
    report.orphans.push(reap(
        conn,
        EntityKind::Oligo,
        &report.oligos.keys,
        config.delete_orphans,
    )?);

    report.strains = import_table(conn, &inputs.strains, &STRAINS, true)?;
    report.orphans.push(reap(
        conn,
        EntityKind::Strain,
        &report.strains.keys,
        config.delete_orphans,
    )?);

    Ok(report)
}

/// Full refresh: sync, import, reap, rebuild BLAST databases.
pub fn refresh(conn: &Connection, config: &Config, replace: bool) -> Result<RefreshReport> {
    let run = Uuid::new_v4();
    let span = info_span!("refresh", run = %run);
    let _guard = span.enter();

    if let Some(sync) = &config.sync {
        run_sync(sync)?;
    }
    let inputs = Inputs::load(config)?;

    let mut report = import_all(conn, config, &inputs, replace, run)?;
    report.blast = Some(blastdb::rebuild(conn, &config.blast)?);
    report.finished = Some(Utc::now());

    for line in report.lines() {
        info!("{}", line);
    }
    Ok(report)
}
