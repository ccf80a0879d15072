//! Name-keyed lookup tables that grow on first sighting of a name.

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::models::Overhang;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dictionary {
    FeatureTypes,
    DrugMarkers,
    Overhangs,
}

impl Dictionary {
    fn table(&self) -> &'static str {
        match self {
            Dictionary::FeatureTypes => "feature_types",
            Dictionary::DrugMarkers => "drug_markers",
            Dictionary::Overhangs => "overhangs",
        }
    }
}

/// Look up an entry by exact name.
pub fn find(conn: &Connection, dict: Dictionary, name: &str) -> Result<Option<i64>> {
    let sql = format!("SELECT id FROM {} WHERE name = ?1", dict.table());
    Ok(conn
        .query_row(&sql, params![name], |row| row.get(0))
        .optional()?)
}

/// Return the id of `name`, inserting it first if absent.
///
/// Drug markers are created with `drug` equal to their name.
pub fn get_or_create(conn: &Connection, dict: Dictionary, name: &str) -> Result<i64> {
    if let Some(id) = find(conn, dict, name)? {
        return Ok(id);
    }
    match dict {
        Dictionary::DrugMarkers => conn.execute(
            "INSERT INTO drug_markers (name, drug, note) VALUES (?1, ?1, '')",
            params![name],
        )?,
        _ => conn.execute(
            &format!("INSERT INTO {} (name) VALUES (?1)", dict.table()),
            params![name],
        )?,
    };
    debug!("created {} entry {:?}", dict.table(), name);
    Ok(conn.last_insert_rowid())
}

/// All names in a dictionary, sorted.
pub fn names(conn: &Connection, dict: Dictionary) -> Result<Vec<String>> {
    let sql = format!("SELECT name FROM {} ORDER BY name", dict.table());
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

/// Name of a feature type by id.
pub fn feature_type_name(conn: &Connection, id: i64) -> Result<Option<String>> {
    Ok(conn
        .query_row(
            "SELECT name FROM feature_types WHERE id = ?1",
            params![id],
            |row| row.get(0),
        )
        .optional()?)
}

/// Get an overhang by name, creating it with `sequence` and `color` if absent.
/// An existing overhang keeps its stored values.
pub fn get_or_create_overhang(
    conn: &Connection,
    name: &str,
    sequence: &str,
    color: &str,
) -> Result<i64> {
    if let Some(id) = find(conn, Dictionary::Overhangs, name)? {
        return Ok(id);
    }
    conn.execute(
        "INSERT INTO overhangs (name, sequence, color) VALUES (?1, ?2, ?3)",
        params![name, sequence, color],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn get_overhang(conn: &Connection, id: i64) -> Result<Option<Overhang>> {
    Ok(conn
        .query_row(
            "SELECT id, name, sequence, color FROM overhangs WHERE id = ?1",
            params![id],
            |row| {
                Ok(Overhang {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    sequence: row.get(2)?,
                    color: row.get(3)?,
                })
            },
        )
        .optional()?)
}
