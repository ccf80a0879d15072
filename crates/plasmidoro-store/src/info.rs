//! Free-form `(owner, param) -> value` facts for spreadsheet columns with
//! no first-class field. Params are case-sensitive, one value each.

use std::collections::BTreeMap;

use rusqlite::{params, Connection, OptionalExtension};

use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoTable {
    Plasmid,
    Strain,
    Oligo,
    PartType,
    VectorType,
}

impl InfoTable {
    fn table(&self) -> &'static str {
        match self {
            InfoTable::Plasmid => "plasmid_info",
            InfoTable::Strain => "strain_info",
            InfoTable::Oligo => "oligo_info",
            InfoTable::PartType => "part_type_info",
            InfoTable::VectorType => "vector_type_info",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfoChange {
    Created,
    Updated,
    Unchanged,
}

pub fn get_info(
    conn: &Connection,
    table: InfoTable,
    owner_id: i64,
    param: &str,
) -> Result<Option<String>> {
    let sql = format!(
        "SELECT value FROM {} WHERE owner_id = ?1 AND param = ?2",
        table.table()
    );
    Ok(conn
        .query_row(&sql, params![owner_id, param], |row| row.get(0))
        .optional()?)
}

/// Upsert one fact. A stored identical value is left untouched.
pub fn set_info(
    conn: &Connection,
    table: InfoTable,
    owner_id: i64,
    param: &str,
    value: &str,
) -> Result<InfoChange> {
    match get_info(conn, table, owner_id, param)? {
        Some(existing) if existing == value => Ok(InfoChange::Unchanged),
        Some(_) => {
            let sql = format!(
                "UPDATE {} SET value = ?3 WHERE owner_id = ?1 AND param = ?2",
                table.table()
            );
            conn.execute(&sql, params![owner_id, param, value])?;
            Ok(InfoChange::Updated)
        }
        None => {
            let sql = format!(
                "INSERT INTO {} (owner_id, param, value) VALUES (?1, ?2, ?3)",
                table.table()
            );
            conn.execute(&sql, params![owner_id, param, value])?;
            Ok(InfoChange::Created)
        }
    }
}

/// Every fact for one owner, keyed by param.
pub fn info_map(
    conn: &Connection,
    table: InfoTable,
    owner_id: i64,
) -> Result<BTreeMap<String, String>> {
    let sql = format!(
        "SELECT param, value FROM {} WHERE owner_id = ?1",
        table.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![owner_id], |row| Ok((row.get(0)?, row.get(1)?)))?;
    let mut map = BTreeMap::new();
    for row in rows {
        let (param, value) = row?;
        map.insert(param, value);
    }
    Ok(map)
}
