use std::path::PathBuf;

use anyhow::Context as _;
use clap::Args;
use plasmidoro_import::magic_pool::{import_design_file, import_pools_file};
use plasmidoro_import::table::{import_table_file, TableSpec};
use plasmidoro_import::tree::import_tree;
use plasmidoro_import::{blastdb, refresh as refresh_all};
use plasmidoro_store::EntityKind;

use super::Context;

#[derive(Args)]
pub struct TreeArgs {
    /// Directory of plasmid maps (defaults to <data_dir>/plasmid_maps)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Update existing plasmids when their map file has changed
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args)]
pub struct TableArgs {
    /// xlsx file (defaults to the configured location)
    #[arg(short, long)]
    pub input: Option<PathBuf>,

    /// Update existing records
    #[arg(long)]
    pub overwrite: bool,
}

#[derive(Args)]
pub struct WorkbookArgs {
    /// xlsx file (defaults to the configured location)
    #[arg(short, long)]
    pub input: Option<PathBuf>,
}

#[derive(Args)]
pub struct RefreshArgs {
    /// Update existing plasmids when their map file has changed
    #[arg(long)]
    pub replace: bool,
}

pub fn plasmids(ctx: &Context, args: TreeArgs) -> anyhow::Result<()> {
    let root = args.input.unwrap_or_else(|| ctx.config.plasmid_maps_dir());
    let conn = ctx.open_db()?;
    let report = import_tree(&conn, &root, args.overwrite, &ctx.config.archive_dirs)
        .with_context(|| format!("Failed to import plasmid maps from {}", root.display()))?;

    ctx.emit(
        &report,
        vec![
            format!("{} plasmids seen", report.names.len()),
            format!(
                "{} created, {} replaced, {} refreshed, {} unchanged, {} skipped, {} failed",
                report.created,
                report.replaced,
                report.refreshed,
                report.unchanged,
                report.skipped,
                report.failed
            ),
        ],
    )
}

pub fn table(ctx: &Context, args: TableArgs, spec: &TableSpec) -> anyhow::Result<()> {
    let path = match args.input {
        Some(path) => path,
        None => match spec.kind {
            EntityKind::Strain => ctx.config.strains_path(),
            EntityKind::Oligo => ctx.config.oligos_path(),
            _ => ctx.config.plasmids_table_path(),
        },
    };
    let conn = ctx.open_db()?;
    let report = import_table_file(&conn, &path, spec, args.overwrite)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    ctx.emit(
        &report,
        vec![format!(
            "{} {} records: {} created, {} updated, {} unchanged, {} skipped",
            report.keys.len(),
            spec.kind,
            report.created,
            report.updated,
            report.unchanged,
            report.skipped
        )],
    )
}

pub fn magic_pool_types(ctx: &Context, args: WorkbookArgs) -> anyhow::Result<()> {
    let path = args
        .input
        .unwrap_or_else(|| ctx.config.magic_pool_design_path());
    let conn = ctx.open_db()?;
    let report = import_design_file(&conn, &path)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    ctx.emit(
        &report,
        vec![format!(
            "{} part types created, {} skipped, {} vector types created",
            report.part_types_created, report.part_types_skipped, report.vector_types_created
        )],
    )
}

pub fn magic_pools(ctx: &Context, args: WorkbookArgs) -> anyhow::Result<()> {
    let path = args
        .input
        .unwrap_or_else(|| ctx.config.magic_pool_summary_path());
    let conn = ctx.open_db()?;
    let report = import_pools_file(&conn, &path)
        .with_context(|| format!("Failed to import {}", path.display()))?;

    ctx.emit(
        &report,
        vec![format!(
            "{} magic pools: {} created, {} updated, {} plasmids linked, {} plasmids missing",
            report.keys.len(),
            report.created,
            report.updated,
            report.plasmids_linked,
            report.plasmids_missing
        )],
    )
}

pub fn blast_databases(ctx: &Context) -> anyhow::Result<()> {
    let conn = ctx.open_db()?;
    let report =
        blastdb::rebuild(&conn, &ctx.config.blast).context("Failed to rebuild BLAST databases")?;

    ctx.emit(
        &report,
        vec![format!(
            "BLAST databases rebuilt: {} plasmids, {} oligos, {} proteins",
            report.plasmids, report.oligos, report.proteins
        )],
    )
}

pub fn refresh(ctx: &Context, args: RefreshArgs) -> anyhow::Result<()> {
    let conn = ctx.open_db()?;
    let report = refresh_all::refresh(&conn, &ctx.config, args.replace).context("Refresh failed")?;
    ctx.emit(&report, report.lines())
}
