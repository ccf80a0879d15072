//! Plasmid inventory importers: sequence-file reconciliation, spreadsheet
//! upserts, orphan detection and BLAST database export.

pub mod blastdb;
pub mod classify;
pub mod config;
pub mod features;
pub mod magic_pool;
pub mod orphans;
pub mod reconcile;
pub mod refresh;
pub mod styles;
pub mod table;
pub mod tree;
pub mod workbook;

use std::path::PathBuf;

use plasmidoro_store::StoreError;
use thiserror::Error;

pub use config::Config;
pub use reconcile::Outcome;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Database error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error(transparent)]
    Parse(#[from] plasmidoro_formats::ParseError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(#[from] calamine::Error),
    #[error("Spreadsheet package error: {0}")]
    Package(#[from] zip::result::ZipError),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
    #[error("Worksheet {0:?} not found")]
    MissingSheet(String),
    #[error("Invalid config: {0}")]
    Config(#[from] toml::de::Error),
    #[error("Required file not found: {}", .0.display())]
    MissingFile(PathBuf),
    #[error("{program} failed: {message}")]
    Command { program: String, message: String },
    #[error(
        "Magic pool {pool}: plasmid {plasmid} has {field} {stored:?} but the summary sheet says \
         {sheet:?}. Fix the plasmid table first."
    )]
    Inconsistent {
        pool: String,
        plasmid: String,
        field: &'static str,
        stored: String,
        sheet: String,
    },
}

pub type Result<T> = std::result::Result<T, ImportError>;
