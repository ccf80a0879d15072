use rusqlite::{Connection, Result as SqlResult};

/// Create every table if it does not exist.
///
/// Features are unique per `(plasmid, start, end, strand)`. Proteins
/// outlive their feature with a NULL `feature_id` until purged.
pub fn init_db(conn: &Connection) -> SqlResult<()> {
    conn.execute_batch(
        "PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS feature_types (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE
        );

        CREATE TABLE IF NOT EXISTS drug_markers (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            drug        TEXT NOT NULL DEFAULT '',
            note        TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS overhangs (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            sequence    TEXT NOT NULL DEFAULT '',
            color       TEXT NOT NULL DEFAULT '#FFFFFF'
        );

        CREATE TABLE IF NOT EXISTS part_types (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            name                    TEXT NOT NULL UNIQUE,
            description             TEXT NOT NULL DEFAULT '',
            upstream_overhang_id    INTEGER REFERENCES overhangs(id) ON DELETE SET NULL,
            downstream_overhang_id  INTEGER REFERENCES overhangs(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS part_type_info (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id    INTEGER NOT NULL REFERENCES part_types(id) ON DELETE CASCADE,
            param       TEXT NOT NULL,
            value       TEXT NOT NULL,
            UNIQUE(owner_id, param)
        );

        CREATE TABLE IF NOT EXISTS vector_types (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS vector_type_parts (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            vector_type_id  INTEGER NOT NULL REFERENCES vector_types(id) ON DELETE CASCADE,
            part_type_id    INTEGER NOT NULL REFERENCES part_types(id) ON DELETE CASCADE,
            position        INTEGER NOT NULL,
            UNIQUE(vector_type_id, position)
        );

        CREATE TABLE IF NOT EXISTS vector_type_info (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id    INTEGER NOT NULL REFERENCES vector_types(id) ON DELETE CASCADE,
            param       TEXT NOT NULL,
            value       TEXT NOT NULL,
            UNIQUE(owner_id, param)
        );

        CREATE TABLE IF NOT EXISTS strains (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            amd_number  TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            plasmid     TEXT NOT NULL DEFAULT '',
            species     TEXT NOT NULL DEFAULT '',
            name        TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS strain_info (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id    INTEGER NOT NULL REFERENCES strains(id) ON DELETE CASCADE,
            param       TEXT NOT NULL,
            value       TEXT NOT NULL,
            UNIQUE(owner_id, param)
        );

        CREATE TABLE IF NOT EXISTS oligos (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            name        TEXT NOT NULL UNIQUE,
            sequence    TEXT NOT NULL DEFAULT ''
        );

        CREATE TABLE IF NOT EXISTS oligo_info (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id    INTEGER NOT NULL REFERENCES oligos(id) ON DELETE CASCADE,
            param       TEXT NOT NULL,
            value       TEXT NOT NULL,
            UNIQUE(owner_id, param)
        );

        CREATE TABLE IF NOT EXISTS magic_pools (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            name                    TEXT NOT NULL UNIQUE,
            description             TEXT NOT NULL DEFAULT '',
            vector_type_id          INTEGER REFERENCES vector_types(id) ON DELETE SET NULL,
            antibiotic_resistance   TEXT NOT NULL DEFAULT '',
            strain_id               INTEGER REFERENCES strains(id) ON DELETE SET NULL
        );

        CREATE TABLE IF NOT EXISTS plasmids (
            id                      INTEGER PRIMARY KEY AUTOINCREMENT,
            name                    TEXT NOT NULL UNIQUE,
            amd_number              TEXT NOT NULL DEFAULT '',
            description             TEXT NOT NULL DEFAULT '',
            sequence                TEXT NOT NULL DEFAULT '',
            footprint               TEXT NOT NULL DEFAULT '',
            sequence_file           TEXT NOT NULL DEFAULT '',
            magic_pool_designation  TEXT NOT NULL DEFAULT '',
            magic_pool_part_id      INTEGER REFERENCES part_types(id) ON DELETE SET NULL,
            updated_at              TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS plasmid_info (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            owner_id    INTEGER NOT NULL REFERENCES plasmids(id) ON DELETE CASCADE,
            param       TEXT NOT NULL,
            value       TEXT NOT NULL,
            UNIQUE(owner_id, param)
        );

        CREATE TABLE IF NOT EXISTS plasmid_drug_markers (
            plasmid_id      INTEGER NOT NULL REFERENCES plasmids(id) ON DELETE CASCADE,
            drug_marker_id  INTEGER NOT NULL REFERENCES drug_markers(id) ON DELETE CASCADE,
            PRIMARY KEY (plasmid_id, drug_marker_id)
        );

        CREATE TABLE IF NOT EXISTS magic_pool_plasmids (
            magic_pool_id   INTEGER NOT NULL REFERENCES magic_pools(id) ON DELETE CASCADE,
            plasmid_id      INTEGER NOT NULL REFERENCES plasmids(id) ON DELETE CASCADE,
            PRIMARY KEY (magic_pool_id, plasmid_id)
        );

        CREATE TABLE IF NOT EXISTS features (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            plasmid_id      INTEGER NOT NULL REFERENCES plasmids(id) ON DELETE CASCADE,
            feature_type_id INTEGER REFERENCES feature_types(id) ON DELETE SET NULL,
            name            TEXT NOT NULL,
            description     TEXT NOT NULL DEFAULT '',
            sequence        TEXT NOT NULL DEFAULT '',
            sequence_id     TEXT NOT NULL DEFAULT '',
            start_pos       INTEGER NOT NULL,
            end_pos         INTEGER NOT NULL,
            strand          INTEGER NOT NULL,
            location_str    TEXT NOT NULL DEFAULT '',
            UNIQUE(plasmid_id, start_pos, end_pos, strand)
        );
        CREATE INDEX IF NOT EXISTS idx_features_plasmid ON features(plasmid_id);

        CREATE TABLE IF NOT EXISTS proteins (
            id          INTEGER PRIMARY KEY AUTOINCREMENT,
            feature_id  INTEGER REFERENCES features(id) ON DELETE SET NULL,
            name        TEXT NOT NULL,
            sequence    TEXT NOT NULL DEFAULT '',
            function    TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_proteins_feature ON proteins(feature_id);",
    )
}
