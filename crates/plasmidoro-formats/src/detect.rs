use serde::{Deserialize, Serialize};

/// Sequence file formats accepted for plasmid import.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SequenceFormat {
    GenBank,
    /// gzip-compressed GenBank; the footprint covers the compressed bytes.
    GenBankGz,
    SnapGene,
    Fasta,
}

impl SequenceFormat {
    /// GenBank and SnapGene files carry curated annotation; FASTA does not.
    pub fn is_annotated(&self) -> bool {
        !matches!(self, SequenceFormat::Fasta)
    }
}

/// Recognized suffixes, longest first so `.gb.gz` wins over `.gz`-less forms.
const SUFFIXES: &[(&str, SequenceFormat)] = &[
    (".gb.gz", SequenceFormat::GenBankGz),
    (".fasta", SequenceFormat::Fasta),
    (".dna", SequenceFormat::SnapGene),
    (".gbk", SequenceFormat::GenBank),
    (".ape", SequenceFormat::GenBank),
    (".fna", SequenceFormat::Fasta),
    (".gb", SequenceFormat::GenBank),
    (".fa", SequenceFormat::Fasta),
];

fn match_suffix(path: &str) -> Option<(usize, SequenceFormat)> {
    let lower = path.to_lowercase();
    SUFFIXES
        .iter()
        .find(|(suffix, _)| lower.ends_with(suffix))
        .map(|(suffix, format)| (suffix.len(), *format))
}

/// Detect format from file extension (case-insensitive).
pub fn detect_format_from_extension(path: &str) -> Option<SequenceFormat> {
    match_suffix(path).map(|(_, format)| format)
}

/// Entity name derived from a file name: the basename without its
/// recognized extension (`pAMD12.gb.gz` -> `pAMD12`).
pub fn entity_name(path: &str) -> Option<String> {
    let file_name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    let (suffix_len, _) = match_suffix(file_name)?;
    let stem = &file_name[..file_name.len() - suffix_len];
    if stem.is_empty() {
        None
    } else {
        Some(stem.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_extension() {
        assert_eq!(detect_format_from_extension("test.gb"), Some(SequenceFormat::GenBank));
        assert_eq!(detect_format_from_extension("test.APE"), Some(SequenceFormat::GenBank));
        assert_eq!(
            detect_format_from_extension("dir/test.gb.gz"),
            Some(SequenceFormat::GenBankGz)
        );
        assert_eq!(detect_format_from_extension("test.Dna"), Some(SequenceFormat::SnapGene));
        assert_eq!(detect_format_from_extension("test.fna"), Some(SequenceFormat::Fasta));
        assert_eq!(detect_format_from_extension("test.xlsx"), None);
        assert_eq!(detect_format_from_extension("test.gz"), None);
    }

    #[test]
    fn test_entity_name() {
        assert_eq!(entity_name("maps/pAMD12.gb.gz").as_deref(), Some("pAMD12"));
        assert_eq!(entity_name("pAMD12.v2.DNA").as_deref(), Some("pAMD12.v2"));
        assert_eq!(entity_name("a\\b\\pX.fa").as_deref(), Some("pX"));
        assert_eq!(entity_name(".gb"), None);
        assert_eq!(entity_name("notes.txt"), None);
    }

    #[test]
    fn test_annotated_formats() {
        assert!(SequenceFormat::GenBank.is_annotated());
        assert!(SequenceFormat::GenBankGz.is_annotated());
        assert!(SequenceFormat::SnapGene.is_annotated());
        assert!(!SequenceFormat::Fasta.is_annotated());
    }
}
