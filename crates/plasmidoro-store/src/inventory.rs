//! Naturally keyed inventory entities: plasmids, strains, oligos and
//! magic pools share the generic key/column operations used by the
//! spreadsheet importers. Part and vector types have their own helpers.

use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};

use crate::models::{MagicPool, Oligo, PartType, Strain, VectorType};
use crate::plasmids::purge_orphan_proteins;
use crate::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    Plasmid,
    Strain,
    Oligo,
    MagicPool,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Plasmid => "plasmid",
            EntityKind::Strain => "strain",
            EntityKind::Oligo => "oligo",
            EntityKind::MagicPool => "magic pool",
        }
    }

    fn table(&self) -> &'static str {
        match self {
            EntityKind::Plasmid => "plasmids",
            EntityKind::Strain => "strains",
            EntityKind::Oligo => "oligos",
            EntityKind::MagicPool => "magic_pools",
        }
    }

    /// Column holding the natural key.
    fn key_column(&self) -> &'static str {
        match self {
            EntityKind::Strain => "amd_number",
            _ => "name",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn find_id(conn: &Connection, kind: EntityKind, key: &str) -> Result<Option<i64>> {
    let sql = format!(
        "SELECT id FROM {} WHERE {} = ?1",
        kind.table(),
        kind.key_column()
    );
    Ok(conn
        .query_row(&sql, params![key], |row| row.get(0))
        .optional()?)
}

/// Insert a row holding only its natural key. Returns the new row ID.
pub fn create(conn: &Connection, kind: EntityKind, key: &str) -> Result<i64> {
    let sql = format!(
        "INSERT INTO {} ({}) VALUES (?1)",
        kind.table(),
        kind.key_column()
    );
    conn.execute(&sql, params![key])?;
    Ok(conn.last_insert_rowid())
}

/// Every stored natural key of a kind, sorted.
pub fn list_keys(conn: &Connection, kind: EntityKind) -> Result<Vec<String>> {
    let sql = format!(
        "SELECT {0} FROM {1} ORDER BY {0}",
        kind.key_column(),
        kind.table()
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| row.get(0))?;
    let mut keys = Vec::new();
    for row in rows {
        keys.push(row?);
    }
    Ok(keys)
}

/// Delete by natural key, cascading to owned rows. Returns true if deleted.
pub fn delete_by_key(conn: &Connection, kind: EntityKind, key: &str) -> Result<bool> {
    let sql = format!(
        "DELETE FROM {} WHERE {} = ?1",
        kind.table(),
        kind.key_column()
    );
    let changed = conn.execute(&sql, params![key])?;
    if kind == EntityKind::Plasmid {
        purge_orphan_proteins(conn)?;
    }
    Ok(changed > 0)
}

/// Read a text column. `column` must be a fixed identifier, never user input.
pub fn get_text(
    conn: &Connection,
    kind: EntityKind,
    id: i64,
    column: &str,
) -> Result<Option<String>> {
    let sql = format!("SELECT {} FROM {} WHERE id = ?1", column, kind.table());
    Ok(conn
        .query_row(&sql, params![id], |row| row.get(0))
        .optional()?)
}

/// Write a text column. `column` must be a fixed identifier, never user input.
pub fn set_text(
    conn: &Connection,
    kind: EntityKind,
    id: i64,
    column: &str,
    value: &str,
) -> Result<()> {
    let sql = format!("UPDATE {} SET {} = ?2 WHERE id = ?1", kind.table(), column);
    conn.execute(&sql, params![id, value])?;
    Ok(())
}

pub fn get_strain_by_amd(conn: &Connection, amd_number: &str) -> Result<Option<Strain>> {
    Ok(conn
        .query_row(
            "SELECT id, amd_number, description, plasmid, species, name
             FROM strains WHERE amd_number = ?1",
            params![amd_number],
            |row| {
                Ok(Strain {
                    id: row.get(0)?,
                    amd_number: row.get(1)?,
                    description: row.get(2)?,
                    plasmid: row.get(3)?,
                    species: row.get(4)?,
                    name: row.get(5)?,
                })
            },
        )
        .optional()?)
}

pub fn get_oligo(conn: &Connection, id: i64) -> Result<Option<Oligo>> {
    Ok(conn
        .query_row(
            "SELECT id, name, sequence FROM oligos WHERE id = ?1",
            params![id],
            row_to_oligo,
        )
        .optional()?)
}

pub fn list_oligos(conn: &Connection) -> Result<Vec<Oligo>> {
    let mut stmt = conn.prepare("SELECT id, name, sequence FROM oligos ORDER BY id")?;
    let rows = stmt.query_map([], row_to_oligo)?;
    let mut oligos = Vec::new();
    for row in rows {
        oligos.push(row?);
    }
    Ok(oligos)
}

fn row_to_oligo(row: &rusqlite::Row) -> SqlResult<Oligo> {
    Ok(Oligo {
        id: row.get(0)?,
        name: row.get(1)?,
        sequence: row.get(2)?,
    })
}

pub fn get_part_type_by_name(conn: &Connection, name: &str) -> Result<Option<PartType>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description, upstream_overhang_id, downstream_overhang_id
             FROM part_types WHERE name = ?1",
            params![name],
            row_to_part_type,
        )
        .optional()?)
}

pub fn get_part_type(conn: &Connection, id: i64) -> Result<Option<PartType>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description, upstream_overhang_id, downstream_overhang_id
             FROM part_types WHERE id = ?1",
            params![id],
            row_to_part_type,
        )
        .optional()?)
}

pub fn create_part_type(
    conn: &Connection,
    name: &str,
    description: &str,
    upstream_overhang_id: i64,
    downstream_overhang_id: i64,
) -> Result<i64> {
    conn.execute(
        "INSERT INTO part_types (name, description, upstream_overhang_id, downstream_overhang_id)
         VALUES (?1, ?2, ?3, ?4)",
        params![name, description, upstream_overhang_id, downstream_overhang_id],
    )?;
    Ok(conn.last_insert_rowid())
}

fn row_to_part_type(row: &rusqlite::Row) -> SqlResult<PartType> {
    Ok(PartType {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        upstream_overhang_id: row.get(3)?,
        downstream_overhang_id: row.get(4)?,
    })
}

pub fn get_vector_type_by_name(conn: &Connection, name: &str) -> Result<Option<VectorType>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description FROM vector_types WHERE name = ?1",
            params![name],
            |row| {
                Ok(VectorType {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                })
            },
        )
        .optional()?)
}

pub fn create_vector_type(conn: &Connection, name: &str, description: &str) -> Result<i64> {
    conn.execute(
        "INSERT INTO vector_types (name, description) VALUES (?1, ?2)",
        params![name, description],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Append a part type at `position` in a vector type's ordered part list.
pub fn add_vector_part(
    conn: &Connection,
    vector_type_id: i64,
    part_type_id: i64,
    position: usize,
) -> Result<()> {
    conn.execute(
        "INSERT INTO vector_type_parts (vector_type_id, part_type_id, position)
         VALUES (?1, ?2, ?3)",
        params![vector_type_id, part_type_id, position],
    )?;
    Ok(())
}

/// Part type names of a vector type, in order.
pub fn vector_parts(conn: &Connection, vector_type_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT p.name FROM vector_type_parts v
         JOIN part_types p ON p.id = v.part_type_id
         WHERE v.vector_type_id = ?1 ORDER BY v.position",
    )?;
    let rows = stmt.query_map(params![vector_type_id], |row| row.get(0))?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

pub fn get_magic_pool_by_name(conn: &Connection, name: &str) -> Result<Option<MagicPool>> {
    Ok(conn
        .query_row(
            "SELECT id, name, description, vector_type_id, antibiotic_resistance, strain_id
             FROM magic_pools WHERE name = ?1",
            params![name],
            |row| {
                Ok(MagicPool {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    vector_type_id: row.get(3)?,
                    antibiotic_resistance: row.get(4)?,
                    strain_id: row.get(5)?,
                })
            },
        )
        .optional()?)
}

pub fn set_magic_pool_links(
    conn: &Connection,
    pool_id: i64,
    vector_type_id: Option<i64>,
    strain_id: Option<i64>,
) -> Result<()> {
    conn.execute(
        "UPDATE magic_pools SET vector_type_id = ?2, strain_id = ?3 WHERE id = ?1",
        params![pool_id, vector_type_id, strain_id],
    )?;
    Ok(())
}

/// Add a plasmid to a magic pool. Returns false if it was already a member.
pub fn link_pool_plasmid(conn: &Connection, pool_id: i64, plasmid_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO magic_pool_plasmids (magic_pool_id, plasmid_id) VALUES (?1, ?2)",
        params![pool_id, plasmid_id],
    )?;
    Ok(changed > 0)
}

pub fn pool_plasmid_names(conn: &Connection, pool_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT p.name FROM plasmids p
         JOIN magic_pool_plasmids m ON m.plasmid_id = p.id
         WHERE m.magic_pool_id = ?1 ORDER BY p.name",
    )?;
    let rows = stmt.query_map(params![pool_id], |row| row.get(0))?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dictionary::get_or_create_overhang;
    use crate::open_in_memory;

    #[test]
    fn test_generic_key_operations() {
        let conn = open_in_memory().unwrap();
        let id = create(&conn, EntityKind::Strain, "AMD100").unwrap();
        assert_eq!(find_id(&conn, EntityKind::Strain, "AMD100").unwrap(), Some(id));
        assert_eq!(find_id(&conn, EntityKind::Strain, "AMD101").unwrap(), None);

        set_text(&conn, EntityKind::Strain, id, "species", "E. coli").unwrap();
        assert_eq!(
            get_text(&conn, EntityKind::Strain, id, "species").unwrap().as_deref(),
            Some("E. coli")
        );
        let strain = get_strain_by_amd(&conn, "AMD100").unwrap().unwrap();
        assert_eq!(strain.species, "E. coli");

        create(&conn, EntityKind::Strain, "AMD050").unwrap();
        assert_eq!(
            list_keys(&conn, EntityKind::Strain).unwrap(),
            vec!["AMD050", "AMD100"]
        );
        assert!(delete_by_key(&conn, EntityKind::Strain, "AMD050").unwrap());
        assert!(!delete_by_key(&conn, EntityKind::Strain, "AMD050").unwrap());
    }

    #[test]
    fn test_vector_parts_keep_order() {
        let conn = open_in_memory().unwrap();
        let a = get_or_create_overhang(&conn, "A", "GGAG", "#FFFFFF").unwrap();
        let b = get_or_create_overhang(&conn, "B", "TACT", "#FFFFFF").unwrap();
        let promoter = create_part_type(&conn, "promoter", "", a, b).unwrap();
        let cds = create_part_type(&conn, "cds", "", b, a).unwrap();

        let vector = create_vector_type(&conn, "MP-A", "two part").unwrap();
        add_vector_part(&conn, vector, cds, 2).unwrap();
        add_vector_part(&conn, vector, promoter, 1).unwrap();
        assert_eq!(vector_parts(&conn, vector).unwrap(), vec!["promoter", "cds"]);
        assert!(add_vector_part(&conn, vector, cds, 1).is_err());
    }

    #[test]
    fn test_magic_pool_membership() {
        let conn = open_in_memory().unwrap();
        let pool = create(&conn, EntityKind::MagicPool, "MP1").unwrap();
        let plasmid = create(&conn, EntityKind::Plasmid, "pAMD1").unwrap();
        assert!(link_pool_plasmid(&conn, pool, plasmid).unwrap());
        assert!(!link_pool_plasmid(&conn, pool, plasmid).unwrap());
        assert_eq!(pool_plasmid_names(&conn, pool).unwrap(), vec!["pAMD1"]);
        assert_eq!(get_magic_pool_by_name(&conn, "MP1").unwrap().unwrap().id, pool);
    }
}
