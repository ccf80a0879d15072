//! Export of the inventory as BLAST databases.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::Command;

use plasmidoro_core::hits::{TargetId, TargetKind};
use plasmidoro_formats::fasta::write_entry;
use plasmidoro_store::inventory::list_oligos;
use plasmidoro_store::plasmids::{list_plasmids, proteins_with_plasmid};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::config::BlastConfig;
use crate::{ImportError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbType {
    Nucleotide,
    Protein,
}

impl DbType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DbType::Nucleotide => "nucl",
            DbType::Protein => "prot",
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct BlastReport {
    pub plasmids: usize,
    pub oligos: usize,
    pub proteins: usize,
}

/// Write every plasmid and oligo that has a sequence. Returns
/// `(plasmids, oligos)` written.
pub fn export_nucleotide<W: Write>(conn: &Connection, out: &mut W) -> Result<(usize, usize)> {
    let mut plasmids = 0;
    for plasmid in list_plasmids(conn)? {
        if plasmid.sequence.is_empty() {
            continue;
        }
        let header = TargetId::render(
            plasmid.id,
            &plasmid.name,
            TargetKind::Plasmid,
            &plasmid.amd_number,
        );
        write_entry(out, &header, &plasmid.sequence)?;
        plasmids += 1;
    }

    let mut oligos = 0;
    for oligo in list_oligos(conn)? {
        if oligo.sequence.is_empty() {
            continue;
        }
        let header = TargetId::render(oligo.id, &oligo.name, TargetKind::Oligo, "");
        write_entry(out, &header, &oligo.sequence)?;
        oligos += 1;
    }

    Ok((plasmids, oligos))
}

/// Write every protein that has a sequence, identified by its plasmid.
pub fn export_protein<W: Write>(conn: &Connection, out: &mut W) -> Result<usize> {
    let mut count = 0;
    for (plasmid_id, plasmid_name, protein) in proteins_with_plasmid(conn)? {
        let header = TargetId::render(
            plasmid_id,
            &plasmid_name,
            TargetKind::Plasmid,
            &protein.name,
        );
        write_entry(out, &header, &protein.sequence)?;
        count += 1;
    }
    Ok(count)
}

/// Run `makeblastdb`; a non-zero exit is an error carrying its stderr.
pub fn make_blast_db(program: &Path, fasta: &Path, db_type: DbType, db: &Path) -> Result<()> {
    debug!("{} -in {} -dbtype {}", program.display(), fasta.display(), db_type.as_str());
    let output = Command::new(program)
        .arg("-in")
        .arg(fasta)
        .args(["-dbtype", db_type.as_str()])
        .arg("-out")
        .arg(db)
        .output()
        .map_err(|e| ImportError::Command {
            program: program.display().to_string(),
            message: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(ImportError::Command {
            program: program.display().to_string(),
            message: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(())
}

fn fasta_path(db: &Path) -> PathBuf {
    db.with_extension("fasta")
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(BufWriter::new(File::create(path)?))
}

/// Export both FASTA files next to the configured databases and rebuild them.
pub fn rebuild(conn: &Connection, blast: &BlastConfig) -> Result<BlastReport> {
    let makeblastdb = blast.program("makeblastdb");

    let nucl_fasta = fasta_path(&blast.nucleotide_db);
    let mut out = create(&nucl_fasta)?;
    let (plasmids, oligos) = export_nucleotide(conn, &mut out)?;
    out.flush()?;
    drop(out);
    make_blast_db(&makeblastdb, &nucl_fasta, DbType::Nucleotide, &blast.nucleotide_db)?;

    let prot_fasta = fasta_path(&blast.protein_db);
    let mut out = create(&prot_fasta)?;
    let proteins = export_protein(conn, &mut out)?;
    out.flush()?;
    drop(out);
    make_blast_db(&makeblastdb, &prot_fasta, DbType::Protein, &blast.protein_db)?;

    info!(
        "BLAST databases rebuilt: {} plasmids, {} oligos, {} proteins",
        plasmids, oligos, proteins
    );
    Ok(BlastReport {
        plasmids,
        oligos,
        proteins,
    })
}
