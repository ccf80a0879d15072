//! TOML configuration. Every field has a default, so an empty file is valid.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database file.
    pub database: PathBuf,
    /// Root of the synced data files.
    pub data_dir: PathBuf,
    /// Directory names whose subtrees hold superseded files (case-sensitive).
    pub archive_dirs: Vec<String>,
    /// Delete orphans instead of only reporting them.
    pub delete_orphans: bool,
    pub blast: BlastConfig,
    pub sync: Option<SyncConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlastConfig {
    pub nucleotide_db: PathBuf,
    pub protein_db: PathBuf,
    /// Directory holding the BLAST+ executables; `PATH` is searched when unset.
    pub bin_dir: Option<PathBuf>,
}

/// External command that pulls the data files before a refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncConfig {
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    /// Credentials or remote definition the command needs; must exist.
    pub config_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: PathBuf::from("plasmidoro.sqlite3"),
            data_dir: PathBuf::from("data"),
            archive_dirs: ["Archive", "archive", "Old", "old"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            delete_orphans: false,
            blast: BlastConfig::default(),
            sync: None,
        }
    }
}

impl Default for BlastConfig {
    fn default() -> Self {
        Self {
            nucleotide_db: PathBuf::from("blast/nucleotide"),
            protein_db: PathBuf::from("blast/protein"),
            bin_dir: None,
        }
    }
}

impl BlastConfig {
    /// Path of a BLAST+ executable, honouring `bin_dir`.
    pub fn program(&self, name: &str) -> PathBuf {
        match &self.bin_dir {
            Some(dir) => dir.join(name),
            None => PathBuf::from(name),
        }
    }
}

impl Config {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }

    pub fn plasmid_maps_dir(&self) -> PathBuf {
        self.data_dir.join("plasmid_maps")
    }

    pub fn plasmids_table_path(&self) -> PathBuf {
        self.plasmid_maps_dir().join("All_plasmids.xlsx")
    }

    pub fn magic_pool_design_path(&self) -> PathBuf {
        self.plasmid_maps_dir()
            .join("magicpool_vector_designs")
            .join("magic_pool_design.xlsx")
    }

    pub fn magic_pool_summary_path(&self) -> PathBuf {
        self.plasmid_maps_dir()
            .join("Magic_Pools")
            .join("Magic_Pool_Summary_Sheet.xlsx")
    }

    pub fn oligos_path(&self) -> PathBuf {
        self.data_dir.join("oligos.xlsx")
    }

    pub fn strains_path(&self) -> PathBuf {
        self.data_dir.join("strains.xlsx")
    }
}
