//! Magic pool design workbooks: part types with their overhangs, vector
//! types as ordered part lists, and the magic pool summary sheet.

use std::path::Path;

use plasmidoro_store::dictionary::get_or_create_overhang;
use plasmidoro_store::info::{set_info, InfoTable};
use plasmidoro_store::inventory::{
    add_vector_part, create, create_part_type, create_vector_type, find_id, get_part_type,
    get_part_type_by_name, get_strain_by_amd, get_text, get_vector_type_by_name,
    link_pool_plasmid, set_magic_pool_links, set_text,
};
use plasmidoro_store::plasmids::get_plasmid_by_name;
use plasmidoro_store::EntityKind;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, warn};

use crate::workbook::{Cell, Sheet, Workbook};
use crate::{ImportError, Result};

pub const PART_TYPES_SHEET: &str = "part_names_overlaps";
pub const VECTOR_TYPES_SHEET: &str = "overview";
const DEFAULT_OVERHANG_COLOR: &str = "#FFFFFF";

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct DesignReport {
    pub part_types_created: usize,
    pub part_types_skipped: usize,
    pub vector_types_created: usize,
}

struct OverhangCell {
    name: String,
    color: String,
}

impl OverhangCell {
    fn from_cell(cell: &Cell, name: &str) -> Self {
        Self {
            name: name.to_string(),
            color: cell
                .fill
                .clone()
                .unwrap_or_else(|| DEFAULT_OVERHANG_COLOR.to_string()),
        }
    }
}

/// Create part types not yet stored. Columns end at the first blank header.
pub fn import_part_types(
    conn: &Connection,
    sheet: &Sheet,
    report: &mut DesignReport,
) -> Result<()> {
    let header = sheet.header();
    let width = header
        .iter()
        .skip(1)
        .position(String::is_empty)
        .map_or(header.len(), |blank| blank + 1);

    for row in sheet.data_rows() {
        let Some(name) = row.first().and_then(Cell::text) else {
            continue;
        };
        if get_part_type_by_name(conn, name)?.is_some() {
            continue;
        }

        let mut description = String::new();
        let mut upstream = None;
        let mut downstream = None;
        let mut extra = Vec::new();

        for (label, cell) in header.iter().zip(row).take(width).skip(1) {
            let Some(value) = cell.text() else {
                continue;
            };
            match label.as_str() {
                "Contains" => description = value.to_string(),
                "4bp overhang upstream" => upstream = Some(OverhangCell::from_cell(cell, value)),
                "4bp overhang downstream" => {
                    downstream = Some(OverhangCell::from_cell(cell, value))
                }
                _ => extra.push((label.as_str(), value)),
            }
        }

        let (Some(upstream), Some(downstream)) = (upstream, downstream) else {
            warn!("{}: upstream or downstream overhang not found, skipped", name);
            report.part_types_skipped += 1;
            continue;
        };

        let up = get_or_create_overhang(conn, &upstream.name, &upstream.name, &upstream.color)?;
        let down =
            get_or_create_overhang(conn, &downstream.name, &downstream.name, &downstream.color)?;
        let id = create_part_type(conn, name, &description, up, down)?;
        for (label, value) in extra {
            set_info(conn, InfoTable::PartType, id, label, value)?;
        }
        info!("magic pool part type {} created", name);
        report.part_types_created += 1;
    }

    Ok(())
}

fn create_vector(
    conn: &Connection,
    name: &str,
    description: &str,
    parts: &[String],
    report: &mut DesignReport,
) -> Result<()> {
    if get_vector_type_by_name(conn, name)?.is_some() {
        return Ok(());
    }
    let id = create_vector_type(conn, name, description)?;
    for (position, part) in parts.iter().enumerate() {
        match get_part_type_by_name(conn, part)? {
            Some(part_type) => add_vector_part(conn, id, part_type.id, position)?,
            None => warn!("vector type {}: part type {:?} not found", name, part),
        }
    }
    info!("vector type {} created with {} parts", name, parts.len());
    report.vector_types_created += 1;
    Ok(())
}

/// Create vector types not yet stored.
///
/// A row with a name in column A starts a vector type (B is its description,
/// C its first part type); rows with only column C add further part types.
pub fn import_vector_types(
    conn: &Connection,
    sheet: &Sheet,
    report: &mut DesignReport,
) -> Result<()> {
    let mut current: Option<(String, String)> = None;
    let mut parts: Vec<String> = Vec::new();

    for row in 1..sheet.rows.len() {
        if let Some(name) = sheet.text(row, 0) {
            if let Some((prev, description)) = current.take() {
                create_vector(conn, &prev, &description, &parts, report)?;
            }
            parts.clear();
            current = Some((
                name.to_string(),
                sheet.text(row, 1).unwrap_or_default().to_string(),
            ));
        }
        if let Some(part) = sheet.text(row, 2) {
            parts.push(part.to_string());
        }
    }

    if let Some((name, description)) = current {
        create_vector(conn, &name, &description, &parts, report)?;
    }
    Ok(())
}

/// Import part types, then vector types, in one transaction.
pub fn import_design(conn: &Connection, workbook: &Workbook) -> Result<DesignReport> {
    let tx = conn.unchecked_transaction()?;
    let mut report = DesignReport::default();
    import_part_types(&tx, workbook.sheet(PART_TYPES_SHEET)?, &mut report)?;
    import_vector_types(&tx, workbook.sheet(VECTOR_TYPES_SHEET)?, &mut report)?;
    tx.commit()?;
    Ok(report)
}

pub fn import_design_file(conn: &Connection, path: &Path) -> Result<DesignReport> {
    info!("importing magic pool design from {}", path.display());
    import_design(conn, &Workbook::open(path)?)
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct PoolReport {
    /// Magic pool names seen, in sheet order.
    pub keys: Vec<String>,
    pub created: usize,
    pub updated: usize,
    pub plasmids_linked: usize,
    pub plasmids_missing: usize,
}

struct Columns {
    pool: usize,
    description: Option<usize>,
    vector_type: Option<usize>,
    resistance: Option<usize>,
    strain: Option<usize>,
    plasmid: Option<usize>,
    designation: Option<usize>,
    part_type: Option<usize>,
}

impl Columns {
    fn from_header(header: &[String]) -> Self {
        let find = |label: &str| header.iter().position(|h| h == label);
        Self {
            pool: find("Magic pool").unwrap_or(0),
            description: find("Description"),
            vector_type: find("Vector type"),
            resistance: find("Antibiotic resistance"),
            strain: find("Strain"),
            plasmid: find("Plasmid"),
            designation: find("Designation"),
            part_type: find("Part type"),
        }
    }
}

fn text_at(sheet: &Sheet, row: usize, col: Option<usize>) -> Option<&str> {
    col.and_then(|c| sheet.text(row, c))
}

fn set_if_changed(conn: &Connection, id: i64, column: &str, value: &str) -> Result<bool> {
    if get_text(conn, EntityKind::MagicPool, id, column)?.as_deref() == Some(value) {
        return Ok(false);
    }
    set_text(conn, EntityKind::MagicPool, id, column, value)?;
    Ok(true)
}

/// Upsert one pool from the row that names it. Returns its id.
fn upsert_pool(
    conn: &Connection,
    sheet: &Sheet,
    cols: &Columns,
    row: usize,
    name: &str,
    report: &mut PoolReport,
) -> Result<i64> {
    let (id, created) = match find_id(conn, EntityKind::MagicPool, name)? {
        Some(id) => (id, false),
        None => (create(conn, EntityKind::MagicPool, name)?, true),
    };

    let mut changed = false;
    if let Some(description) = text_at(sheet, row, cols.description) {
        changed |= set_if_changed(conn, id, "description", description)?;
    }
    if let Some(resistance) = text_at(sheet, row, cols.resistance) {
        changed |= set_if_changed(conn, id, "antibiotic_resistance", resistance)?;
    }

    let vector_type = match text_at(sheet, row, cols.vector_type) {
        Some(v) => {
            let found = get_vector_type_by_name(conn, v)?;
            if found.is_none() {
                warn!("magic pool {}: vector type {:?} not found", name, v);
            }
            found.map(|v| v.id)
        }
        None => None,
    };
    let strain = match text_at(sheet, row, cols.strain) {
        Some(amd) => {
            let found = get_strain_by_amd(conn, amd)?;
            if found.is_none() {
                warn!("magic pool {}: strain {:?} not found", name, amd);
            }
            found.map(|s| s.id)
        }
        None => None,
    };
    set_magic_pool_links(conn, id, vector_type, strain)?;

    if created {
        info!("magic pool {} created", name);
        report.created += 1;
    } else if changed {
        info!("magic pool {} updated", name);
        report.updated += 1;
    }
    report.keys.push(name.to_string());
    Ok(id)
}

/// Link a row's plasmid to `pool`, refusing plasmids whose stored magic pool
/// designation or part type disagrees with the sheet.
fn link_plasmid(
    conn: &Connection,
    sheet: &Sheet,
    cols: &Columns,
    row: usize,
    pool: (i64, &str),
    report: &mut PoolReport,
) -> Result<()> {
    let Some(plasmid_name) = text_at(sheet, row, cols.plasmid) else {
        return Ok(());
    };
    let Some(plasmid) = get_plasmid_by_name(conn, plasmid_name)? else {
        warn!("magic pool {}: plasmid {} not found", pool.1, plasmid_name);
        report.plasmids_missing += 1;
        return Ok(());
    };

    let inconsistent = |field: &'static str, stored: &str, sheet: &str| ImportError::Inconsistent {
        pool: pool.1.to_string(),
        plasmid: plasmid.name.clone(),
        field,
        stored: stored.to_string(),
        sheet: sheet.to_string(),
    };

    if let Some(designation) = text_at(sheet, row, cols.designation) {
        let stored = plasmid.magic_pool_designation.as_str();
        if !stored.is_empty() && stored != designation {
            return Err(inconsistent("magic pool designation", stored, designation));
        }
    }
    if let (Some(part_type), Some(part_id)) =
        (text_at(sheet, row, cols.part_type), plasmid.magic_pool_part_id)
    {
        let stored = get_part_type(conn, part_id)?
            .map(|p| p.name)
            .unwrap_or_default();
        if stored != part_type {
            return Err(inconsistent("magic pool part type", &stored, part_type));
        }
    }

    if link_pool_plasmid(conn, pool.0, plasmid.id)? {
        report.plasmids_linked += 1;
    }
    Ok(())
}

/// Import the magic pool summary sheet in one transaction. A consistency
/// error rolls the whole import back.
pub fn import_pools(conn: &Connection, workbook: &Workbook) -> Result<PoolReport> {
    let sheet = workbook.first()?;
    let cols = Columns::from_header(&sheet.header());
    let tx = conn.unchecked_transaction()?;
    let mut report = PoolReport::default();
    let mut current: Option<(i64, String)> = None;

    for row in 1..sheet.rows.len() {
        if let Some(name) = sheet.text(row, cols.pool) {
            let id = upsert_pool(&tx, sheet, &cols, row, name, &mut report)?;
            current = Some((id, name.to_string()));
        }
        if let Some((id, name)) = &current {
            link_plasmid(&tx, sheet, &cols, row, (*id, name), &mut report)?;
        }
    }

    tx.commit()?;
    info!(
        "magic pools: {} created, {} updated, {} plasmids linked, {} plasmids missing",
        report.created, report.updated, report.plasmids_linked, report.plasmids_missing
    );
    Ok(report)
}

pub fn import_pools_file(conn: &Connection, path: &Path) -> Result<PoolReport> {
    info!("importing magic pools from {}", path.display());
    import_pools(conn, &Workbook::open(path)?)
}
