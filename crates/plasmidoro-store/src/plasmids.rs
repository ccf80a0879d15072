use plasmidoro_core::feature::Strand;
use rusqlite::{params, Connection, OptionalExtension, Result as SqlResult};

use crate::models::{Feature, NewFeature, NewProtein, Plasmid, Protein};
use crate::Result;

const PLASMID_COLUMNS: &str = "id, name, amd_number, description, sequence, footprint,
    sequence_file, magic_pool_designation, magic_pool_part_id";

const FEATURE_COLUMNS: &str = "id, plasmid_id, feature_type_id, name, description, sequence,
    sequence_id, start_pos, end_pos, strand, location_str";

/// Insert an empty plasmid. Returns the new row ID.
pub fn create_plasmid(conn: &Connection, name: &str) -> Result<i64> {
    conn.execute("INSERT INTO plasmids (name) VALUES (?1)", params![name])?;
    Ok(conn.last_insert_rowid())
}

pub fn get_plasmid(conn: &Connection, id: i64) -> Result<Option<Plasmid>> {
    let sql = format!("SELECT {} FROM plasmids WHERE id = ?1", PLASMID_COLUMNS);
    Ok(conn
        .query_row(&sql, params![id], row_to_plasmid)
        .optional()?)
}

pub fn get_plasmid_by_name(conn: &Connection, name: &str) -> Result<Option<Plasmid>> {
    let sql = format!("SELECT {} FROM plasmids WHERE name = ?1", PLASMID_COLUMNS);
    Ok(conn
        .query_row(&sql, params![name], row_to_plasmid)
        .optional()?)
}

pub fn list_plasmids(conn: &Connection) -> Result<Vec<Plasmid>> {
    let sql = format!("SELECT {} FROM plasmids ORDER BY id", PLASMID_COLUMNS);
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map([], row_to_plasmid)?;
    let mut plasmids = Vec::new();
    for row in rows {
        plasmids.push(row?);
    }
    Ok(plasmids)
}

/// Replace the stored sequence together with the file it came from.
pub fn replace_sequence(
    conn: &Connection,
    id: i64,
    sequence: &str,
    footprint: &str,
    sequence_file: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE plasmids
         SET sequence = ?2, footprint = ?3, sequence_file = ?4, updated_at = datetime('now')
         WHERE id = ?1",
        params![id, sequence, footprint, sequence_file],
    )?;
    Ok(())
}

/// Point a plasmid at a different backing file without touching its sequence.
pub fn set_source_file(
    conn: &Connection,
    id: i64,
    footprint: &str,
    sequence_file: &str,
) -> Result<()> {
    conn.execute(
        "UPDATE plasmids
         SET footprint = ?2, sequence_file = ?3, updated_at = datetime('now')
         WHERE id = ?1",
        params![id, footprint, sequence_file],
    )?;
    Ok(())
}

pub fn set_magic_pool_part(conn: &Connection, id: i64, part_type_id: Option<i64>) -> Result<()> {
    conn.execute(
        "UPDATE plasmids SET magic_pool_part_id = ?2 WHERE id = ?1",
        params![id, part_type_id],
    )?;
    Ok(())
}

/// Delete a plasmid with its features, info and now-orphaned proteins.
/// Returns true if a row was deleted.
pub fn delete_plasmid(conn: &Connection, id: i64) -> Result<bool> {
    let changed = conn.execute("DELETE FROM plasmids WHERE id = ?1", params![id])?;
    purge_orphan_proteins(conn)?;
    Ok(changed > 0)
}

/// Insert a feature unless one already occupies its span.
/// Returns the new row ID, or `None` for a duplicate span.
pub fn insert_feature(conn: &Connection, plasmid_id: i64, f: &NewFeature) -> Result<Option<i64>> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO features
            (plasmid_id, feature_type_id, name, description, sequence, sequence_id,
             start_pos, end_pos, strand, location_str)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            plasmid_id,
            f.feature_type_id,
            f.name,
            f.description,
            f.sequence,
            f.sequence_id,
            f.start,
            f.end,
            f.strand.as_i8(),
            f.location_str,
        ],
    )?;
    Ok((changed > 0).then(|| conn.last_insert_rowid()))
}

/// Delete every feature of a plasmid. Returns the number removed.
pub fn delete_features(conn: &Connection, plasmid_id: i64) -> Result<usize> {
    Ok(conn.execute(
        "DELETE FROM features WHERE plasmid_id = ?1",
        params![plasmid_id],
    )?)
}

pub fn features_of(conn: &Connection, plasmid_id: i64) -> Result<Vec<Feature>> {
    let sql = format!(
        "SELECT {} FROM features WHERE plasmid_id = ?1 ORDER BY start_pos, end_pos, strand",
        FEATURE_COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![plasmid_id], row_to_feature)?;
    let mut features = Vec::new();
    for row in rows {
        features.push(row?);
    }
    Ok(features)
}

pub fn insert_protein(conn: &Connection, feature_id: i64, p: &NewProtein) -> Result<i64> {
    conn.execute(
        "INSERT INTO proteins (feature_id, name, sequence, function) VALUES (?1, ?2, ?3, ?4)",
        params![feature_id, p.name, p.sequence, p.function],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Delete proteins whose feature is gone. Returns the number removed.
pub fn purge_orphan_proteins(conn: &Connection) -> Result<usize> {
    Ok(conn.execute("DELETE FROM proteins WHERE feature_id IS NULL", [])?)
}

pub fn proteins_of(conn: &Connection, plasmid_id: i64) -> Result<Vec<Protein>> {
    let mut stmt = conn.prepare(
        "SELECT p.id, p.feature_id, p.name, p.sequence, p.function
         FROM proteins p JOIN features f ON f.id = p.feature_id
         WHERE f.plasmid_id = ?1 ORDER BY p.id",
    )?;
    let rows = stmt.query_map(params![plasmid_id], row_to_protein)?;
    let mut proteins = Vec::new();
    for row in rows {
        proteins.push(row?);
    }
    Ok(proteins)
}

/// Every protein with a sequence, paired with its plasmid's id and name.
pub fn proteins_with_plasmid(conn: &Connection) -> Result<Vec<(i64, String, Protein)>> {
    let mut stmt = conn.prepare(
        "SELECT pl.id, pl.name, p.id, p.feature_id, p.name, p.sequence, p.function
         FROM proteins p
         JOIN features f ON f.id = p.feature_id
         JOIN plasmids pl ON pl.id = f.plasmid_id
         WHERE p.sequence != ''
         ORDER BY p.id",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok((
            row.get(0)?,
            row.get(1)?,
            Protein {
                id: row.get(2)?,
                feature_id: row.get(3)?,
                name: row.get(4)?,
                sequence: row.get(5)?,
                function: row.get(6)?,
            },
        ))
    })?;
    let mut out = Vec::new();
    for row in rows {
        out.push(row?);
    }
    Ok(out)
}

pub fn protein_count(conn: &Connection) -> Result<usize> {
    Ok(conn.query_row("SELECT COUNT(*) FROM proteins", [], |row| row.get(0))?)
}

/// Link a drug marker. Returns false if the link already existed.
pub fn link_drug_marker(conn: &Connection, plasmid_id: i64, marker_id: i64) -> Result<bool> {
    let changed = conn.execute(
        "INSERT OR IGNORE INTO plasmid_drug_markers (plasmid_id, drug_marker_id) VALUES (?1, ?2)",
        params![plasmid_id, marker_id],
    )?;
    Ok(changed > 0)
}

pub fn drug_marker_names(conn: &Connection, plasmid_id: i64) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT d.name FROM drug_markers d
         JOIN plasmid_drug_markers pd ON pd.drug_marker_id = d.id
         WHERE pd.plasmid_id = ?1 ORDER BY d.name",
    )?;
    let rows = stmt.query_map(params![plasmid_id], |row| row.get(0))?;
    let mut names = Vec::new();
    for row in rows {
        names.push(row?);
    }
    Ok(names)
}

fn row_to_plasmid(row: &rusqlite::Row) -> SqlResult<Plasmid> {
    Ok(Plasmid {
        id: row.get(0)?,
        name: row.get(1)?,
        amd_number: row.get(2)?,
        description: row.get(3)?,
        sequence: row.get(4)?,
        footprint: row.get(5)?,
        sequence_file: row.get(6)?,
        magic_pool_designation: row.get(7)?,
        magic_pool_part_id: row.get(8)?,
    })
}

fn row_to_feature(row: &rusqlite::Row) -> SqlResult<Feature> {
    Ok(Feature {
        id: row.get(0)?,
        plasmid_id: row.get(1)?,
        feature_type_id: row.get(2)?,
        name: row.get(3)?,
        description: row.get(4)?,
        sequence: row.get(5)?,
        sequence_id: row.get(6)?,
        start: row.get(7)?,
        end: row.get(8)?,
        strand: Strand::from_i8(row.get(9)?),
        location_str: row.get(10)?,
    })
}

fn row_to_protein(row: &rusqlite::Row) -> SqlResult<Protein> {
    Ok(Protein {
        id: row.get(0)?,
        feature_id: row.get(1)?,
        name: row.get(2)?,
        sequence: row.get(3)?,
        function: row.get(4)?,
    })
}
