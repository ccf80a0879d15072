//! Spreadsheet upserts driven by a per-entity routing table.
//!
//! The first row of a sheet names the columns; every later row is keyed by
//! its first cell. Each other column is routed to a first-class field, a
//! drug marker fan-out, the magic pool part type lookup, or an info record.

use std::path::Path;

use plasmidoro_store::dictionary::{get_or_create, Dictionary};
use plasmidoro_store::info::{set_info, InfoChange, InfoTable};
use plasmidoro_store::inventory::{create, find_id, get_part_type_by_name, get_text, set_text};
use plasmidoro_store::plasmids::{get_plasmid, link_drug_marker, set_magic_pool_part};
use plasmidoro_store::EntityKind;
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::workbook::{Sheet, Workbook};
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// A text column of the entity's own table.
    Field(&'static str),
    /// `"; "`-separated drug marker names, created on first sighting.
    DrugMarkers,
    /// Name of an existing magic pool part type.
    PartType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SheetSelection {
    /// Only the first worksheet.
    First,
    /// Every worksheet whose first header cell is the key label.
    Keyed,
}

#[derive(Debug, Clone, Copy)]
pub struct TableSpec {
    pub kind: EntityKind,
    pub key_label: &'static str,
    pub sheets: SheetSelection,
    pub routes: &'static [(&'static str, Route)],
    /// Where unrouted columns go.
    pub info: InfoTable,
}

impl TableSpec {
    fn route(&self, label: &str) -> Option<Route> {
        self.routes
            .iter()
            .find(|(column, _)| *column == label)
            .map(|(_, route)| *route)
    }
}

pub const PLASMIDS: TableSpec = TableSpec {
    kind: EntityKind::Plasmid,
    key_label: "Name",
    sheets: SheetSelection::First,
    routes: &[
        ("AMD number", Route::Field("amd_number")),
        ("Description", Route::Field("description")),
        ("Drug marker", Route::DrugMarkers),
        ("Magic pool designation", Route::Field("magic_pool_designation")),
        ("Magic pool part type", Route::PartType),
    ],
    info: InfoTable::Plasmid,
};

pub const STRAINS: TableSpec = TableSpec {
    kind: EntityKind::Strain,
    key_label: "AMD number",
    sheets: SheetSelection::Keyed,
    routes: &[
        ("Description", Route::Field("description")),
        ("Plasmid", Route::Field("plasmid")),
        ("Species", Route::Field("species")),
        ("Name", Route::Field("name")),
    ],
    info: InfoTable::Strain,
};

pub const OLIGOS: TableSpec = TableSpec {
    kind: EntityKind::Oligo,
    key_label: "Name",
    sheets: SheetSelection::Keyed,
    routes: &[("Sequence", Route::Field("sequence"))],
    info: InfoTable::Oligo,
};

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct TableReport {
    /// Every natural key seen, in sheet order, without repeats.
    pub keys: Vec<String>,
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Existing rows left alone because overwriting was not allowed.
    pub skipped: usize,
}

impl TableReport {
    fn merge(&mut self, other: TableReport) {
        for key in other.keys {
            if !self.keys.contains(&key) {
                self.keys.push(key);
            }
        }
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
        self.skipped += other.skipped;
    }
}

type Row = (String, Vec<(String, String)>);

/// Collect present values per key; a repeated key merges into the first row.
fn collect_rows(sheet: &Sheet) -> Vec<Row> {
    let header = sheet.header();
    let mut rows: Vec<Row> = Vec::new();

    for cells in sheet.data_rows() {
        let Some(key) = cells.first().and_then(|c| c.text()) else {
            continue;
        };
        let values = cells
            .iter()
            .enumerate()
            .skip(1)
            .filter_map(|(j, cell)| {
                let label = header.get(j).filter(|l| !l.is_empty())?;
                Some((label.clone(), cell.text()?.to_string()))
            });

        match rows.iter_mut().find(|(k, _)| k == key) {
            Some((_, existing)) => {
                for (label, value) in values {
                    match existing.iter_mut().find(|(l, _)| *l == label) {
                        Some(slot) => slot.1 = value,
                        None => existing.push((label, value)),
                    }
                }
            }
            None => rows.push((key.to_string(), values.collect())),
        }
    }

    rows
}

/// Apply one routed value. Returns true if anything was written.
fn apply(
    conn: &Connection,
    spec: &TableSpec,
    id: i64,
    key: &str,
    label: &str,
    value: &str,
) -> Result<bool> {
    match spec.route(label) {
        Some(Route::Field(column)) => {
            if get_text(conn, spec.kind, id, column)?.as_deref() == Some(value) {
                return Ok(false);
            }
            set_text(conn, spec.kind, id, column, value)?;
            Ok(true)
        }
        Some(Route::DrugMarkers) => {
            let mut linked = false;
            for marker in value.split("; ").filter(|m| !m.is_empty()) {
                let marker_id = get_or_create(conn, Dictionary::DrugMarkers, marker)?;
                linked |= link_drug_marker(conn, id, marker_id)?;
            }
            Ok(linked)
        }
        Some(Route::PartType) => {
            let Some(part) = get_part_type_by_name(conn, value)? else {
                warn!("{}: unknown magic pool part type {:?}", key, value);
                return Ok(false);
            };
            let current = get_plasmid(conn, id)?.and_then(|p| p.magic_pool_part_id);
            if current == Some(part.id) {
                return Ok(false);
            }
            set_magic_pool_part(conn, id, Some(part.id))?;
            Ok(true)
        }
        None => Ok(set_info(conn, spec.info, id, label, value)? != InfoChange::Unchanged),
    }
}

/// Upsert every row of one sheet in a single transaction.
pub fn import_sheet(
    conn: &Connection,
    sheet: &Sheet,
    spec: &TableSpec,
    overwrite: bool,
) -> Result<TableReport> {
    import_sheet_where(conn, sheet, spec, &|_| overwrite)
}

/// Like [`import_sheet`], asking `overwrite` per natural key whether an
/// existing record may be updated.
pub fn import_sheet_where(
    conn: &Connection,
    sheet: &Sheet,
    spec: &TableSpec,
    overwrite: &dyn Fn(&str) -> bool,
) -> Result<TableReport> {
    let tx = conn.unchecked_transaction()?;
    let mut report = TableReport::default();

    for (key, values) in collect_rows(sheet) {
        let (id, created) = match find_id(&tx, spec.kind, &key)? {
            Some(_) if !overwrite(key.as_str()) => {
                debug!("{} {} exists, not overwriting", spec.kind, key);
                report.skipped += 1;
                report.keys.push(key);
                continue;
            }
            Some(id) => (id, false),
            None => (create(&tx, spec.kind, &key)?, true),
        };

        let mut changed = false;
        for (label, value) in &values {
            changed |= apply(&tx, spec, id, &key, label, value)?;
        }

        if created {
            info!("{} {} created", spec.kind, key);
            report.created += 1;
        } else if changed {
            info!("{} {} updated", spec.kind, key);
            report.updated += 1;
        } else {
            report.unchanged += 1;
        }
        report.keys.push(key);
    }

    tx.commit()?;
    Ok(report)
}

/// Import the sheets of a workbook selected by `spec`.
pub fn import_table(
    conn: &Connection,
    workbook: &Workbook,
    spec: &TableSpec,
    overwrite: bool,
) -> Result<TableReport> {
    import_table_where(conn, workbook, spec, &|_| overwrite)
}

pub fn import_table_where(
    conn: &Connection,
    workbook: &Workbook,
    spec: &TableSpec,
    overwrite: &dyn Fn(&str) -> bool,
) -> Result<TableReport> {
    let mut report = TableReport::default();

    match spec.sheets {
        SheetSelection::First => {
            report.merge(import_sheet_where(conn, workbook.first()?, spec, overwrite)?)
        }
        SheetSelection::Keyed => {
            for sheet in &workbook.sheets {
                let header = sheet.header();
                if header.first().map(String::as_str) != Some(spec.key_label) {
                    debug!("skipping sheet {:?}: not keyed by {}", sheet.name, spec.key_label);
                    continue;
                }
                report.merge(import_sheet_where(conn, sheet, spec, overwrite)?);
            }
        }
    }

    info!(
        "{} table: {} created, {} updated, {} unchanged, {} skipped",
        spec.kind, report.created, report.updated, report.unchanged, report.skipped
    );
    Ok(report)
}

pub fn import_table_file(
    conn: &Connection,
    path: &Path,
    spec: &TableSpec,
    overwrite: bool,
) -> Result<TableReport> {
    info!("importing {} table from {}", spec.kind, path.display());
    import_table(conn, &Workbook::open(path)?, spec, overwrite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasmidoro_store::dictionary::get_or_create_overhang;
    use plasmidoro_store::info::info_map;
    use plasmidoro_store::inventory::{create_part_type, get_strain_by_amd};
    use plasmidoro_store::open_in_memory;
    use plasmidoro_store::plasmids::{drug_marker_names, get_plasmid_by_name};
    use pretty_assertions::assert_eq;

    fn plasmid_sheet() -> Workbook {
        Workbook::from_sheets(vec![Sheet::from_rows(
            "All plasmids",
            &[
                &["Name", "AMD number", "Drug marker", "Source", "", "Magic pool part type"],
                &["pAMD1", "AMD1", "KanR; AmpR", "lab", "ignored", "promoter"],
                &["pAMD2", "None", "", "addgene", "", ""],
                &["", "AMD9", "", "", "", ""],
            ],
        )])
    }

    #[test]
    fn test_plasmid_table_create() {
        let conn = open_in_memory().unwrap();
        let a = get_or_create_overhang(&conn, "A", "GGAG", "#FFFFFF").unwrap();
        create_part_type(&conn, "promoter", "", a, a).unwrap();

        let report = import_table(&conn, &plasmid_sheet(), &PLASMIDS, false).unwrap();
        assert_eq!(report.keys, vec!["pAMD1", "pAMD2"]);
        assert_eq!(report.created, 2);

        let p1 = get_plasmid_by_name(&conn, "pAMD1").unwrap().unwrap();
        assert_eq!(p1.amd_number, "AMD1");
        assert!(p1.magic_pool_part_id.is_some());
        assert_eq!(drug_marker_names(&conn, p1.id).unwrap(), vec!["AmpR", "KanR"]);
        let info = info_map(&conn, InfoTable::Plasmid, p1.id).unwrap();
        assert_eq!(info.len(), 1);
        assert_eq!(info["Source"], "lab");

        let p2 = get_plasmid_by_name(&conn, "pAMD2").unwrap().unwrap();
        assert_eq!(p2.amd_number, "");
    }

    #[test]
    fn test_existing_rows_need_overwrite() {
        let conn = open_in_memory().unwrap();
        import_table(&conn, &plasmid_sheet(), &PLASMIDS, false).unwrap();

        let changed = Workbook::from_sheets(vec![Sheet::from_rows(
            "All plasmids",
            &[
                &["Name", "AMD number", "Source"],
                &["pAMD1", "AMD1", "addgene"],
                &["pAMD2", "None", "addgene"],
            ],
        )]);

        let report = import_table(&conn, &changed, &PLASMIDS, false).unwrap();
        assert_eq!(report.skipped, 2);
        let p1 = get_plasmid_by_name(&conn, "pAMD1").unwrap().unwrap();
        assert_eq!(info_map(&conn, InfoTable::Plasmid, p1.id).unwrap()["Source"], "lab");

        let report = import_table(&conn, &changed, &PLASMIDS, true).unwrap();
        assert_eq!((report.updated, report.unchanged), (1, 1));
        assert_eq!(info_map(&conn, InfoTable::Plasmid, p1.id).unwrap()["Source"], "addgene");

        let again = import_table(&conn, &changed, &PLASMIDS, true).unwrap();
        assert_eq!((again.updated, again.unchanged), (0, 2));
    }

    #[test]
    fn test_unknown_part_type_not_written() {
        let conn = open_in_memory().unwrap();
        import_table(&conn, &plasmid_sheet(), &PLASMIDS, false).unwrap();
        let p1 = get_plasmid_by_name(&conn, "pAMD1").unwrap().unwrap();
        assert_eq!(p1.magic_pool_part_id, None);
    }

    #[test]
    fn test_keyed_sheets() {
        let conn = open_in_memory().unwrap();
        let workbook = Workbook::from_sheets(vec![
            Sheet::from_rows(
                "E. coli",
                &[
                    &["AMD number", "Species", "Freezer"],
                    &["AMD100", "E. coli", "F1"],
                    &["AMD100", "", "F2"],
                ],
            ),
            Sheet::from_rows("Notes", &[&["Comment"], &["AMD999 is lost"]]),
            Sheet::from_rows(
                "Yeast",
                &[&["AMD number", "Species"], &["AMD200", "S. cerevisiae"]],
            ),
        ]);

        let report = import_table(&conn, &workbook, &STRAINS, false).unwrap();
        assert_eq!(report.keys, vec!["AMD100", "AMD200"]);

        let strain = get_strain_by_amd(&conn, "AMD100").unwrap().unwrap();
        assert_eq!(strain.species, "E. coli");
        assert_eq!(info_map(&conn, InfoTable::Strain, strain.id).unwrap()["Freezer"], "F2");
        assert!(get_strain_by_amd(&conn, "AMD999 is lost").unwrap().is_none());
    }

    #[test]
    fn test_oligos() {
        let conn = open_in_memory().unwrap();
        let workbook = Workbook::from_sheets(vec![Sheet::from_rows(
            "Oligos",
            &[&["Name", "Sequence", "Tm"], &["oAMD1", "ACGTACGT", "60"]],
        )]);
        let report = import_table(&conn, &workbook, &OLIGOS, false).unwrap();
        assert_eq!(report.created, 1);
        let id = find_id(&conn, EntityKind::Oligo, "oAMD1").unwrap().unwrap();
        assert_eq!(
            get_text(&conn, EntityKind::Oligo, id, "sequence").unwrap().as_deref(),
            Some("ACGTACGT")
        );
    }
}
