pub mod checksum;
pub mod detect;
pub mod fasta;
pub mod genbank;
pub mod location;
pub mod snapgene;

use std::io::Read;
use std::path::Path;

use flate2::read::GzDecoder;
use plasmidoro_core::SequenceRecord;
use thiserror::Error;
use tracing::warn;

pub use detect::{detect_format_from_extension, entity_name, SequenceFormat};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Unexpected end of input")]
    UnexpectedEnd,
    #[error("Invalid location: {0}")]
    InvalidLocation(String),
    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),
    #[error("File is not valid UTF-8: {0}")]
    Encoding(#[from] std::string::FromUtf8Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),
    #[error("XML attribute error: {0}")]
    XmlAttr(#[from] quick_xml::events::attributes::AttrError),
}

/// A sequence file read from disk: the first record it holds, its format
/// and the footprint of its raw bytes.
#[derive(Debug, Clone)]
pub struct LoadedFile {
    pub format: SequenceFormat,
    pub footprint: String,
    pub record: SequenceRecord,
}

/// Parse in-memory file contents as `format`, returning every record.
pub fn parse_bytes(
    format: SequenceFormat,
    bytes: &[u8],
) -> Result<Vec<SequenceRecord>, ParseError> {
    match format {
        SequenceFormat::GenBank => genbank::parse_all(&String::from_utf8(bytes.to_vec())?),
        SequenceFormat::GenBankGz => {
            let mut text = String::new();
            GzDecoder::new(bytes).read_to_string(&mut text)?;
            genbank::parse_all(&text)
        }
        SequenceFormat::SnapGene => snapgene::parse(bytes).map(|r| vec![r]),
        SequenceFormat::Fasta => fasta::parse(&String::from_utf8(bytes.to_vec())?),
    }
}

/// Read and parse a sequence file, keeping only its first record.
///
/// Extra records are reported and dropped. A record without an identifier
/// takes the name derived from the file name.
pub fn load(path: &Path) -> Result<LoadedFile, ParseError> {
    let path_str = path.to_string_lossy();
    let format = detect_format_from_extension(&path_str)
        .ok_or_else(|| ParseError::UnsupportedExtension(path_str.to_string()))?;

    let bytes = std::fs::read(path)?;
    let footprint = checksum::footprint(&bytes);
    let mut records = parse_bytes(format, &bytes)?.into_iter();

    let mut record = records.next().ok_or(ParseError::UnexpectedEnd)?;
    let extra = records.count();
    if extra > 0 {
        warn!("{}: using the first record, {} more ignored", path_str, extra);
    }
    if record.identifier.is_empty() {
        record.identifier = entity_name(&path_str).unwrap_or_default();
    }

    Ok(LoadedFile {
        format,
        footprint,
        record,
    })
}
