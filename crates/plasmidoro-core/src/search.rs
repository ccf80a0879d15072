//! Validation and sanitization of user-supplied sequence search requests.
//!
//! Nothing here runs a search; the `plasmidoro-search` crate takes a
//! validated [`SearchParams`] and drives the external BLAST binaries.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Accepted e-value thresholds, in their canonical textual form.
pub const EVALUE_CHOICES: [&str; 10] = [
    "1e-20", "1e-10", "1e-08", "1e-06", "0.0001", "0.01", "1.0", "10.0", "100.0", "1000.0",
];

/// Accepted caps on the number of reported hits.
pub const HIT_CAP_CHOICES: [usize; 6] = [10, 20, 50, 100, 500, 1000];

pub const NUCLEOTIDE_ALPHABET: &str = "GATCRYWSMKHBVDN";
pub const PROTEIN_ALPHABET: &str = "ACDEFGHIKLMNPQRSTVWYBXZJUO";

/// Query identifier used when the query has no FASTA header.
pub const DEFAULT_QUERY_ID: &str = "no_sequence_id";

static NON_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("[^a-zA-Z]").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("e-value parameter is missing")]
    MissingEvalue,
    #[error("Unacceptable value '{0}' for e-value parameter.")]
    InvalidEvalue(String),
    #[error("hitstoshow parameter is missing")]
    MissingHitCap,
    #[error("Unacceptable value '{0}' for hitstoshow parameter.")]
    InvalidHitCap(String),
    #[error("Unacceptable value '{0}' for tool parameter.")]
    InvalidTool(String),
    #[error("Wrong {alphabet} sequence format. FASTA header and valid sequence required. Unexpected symbol '{symbol}'.")]
    InvalidSymbol { alphabet: Alphabet, symbol: char },
    #[error("Wrong sequence format. FASTA header and valid sequence required.")]
    EmptySequence,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Alphabet {
    Nucleotide,
    Protein,
}

impl Alphabet {
    pub fn letters(&self) -> &'static str {
        match self {
            Alphabet::Nucleotide => NUCLEOTIDE_ALPHABET,
            Alphabet::Protein => PROTEIN_ALPHABET,
        }
    }

    /// Case-insensitive membership check. Returns the first offending symbol.
    pub fn verify(&self, sequence: &str) -> Result<(), ValidationError> {
        let letters = self.letters();
        match sequence
            .chars()
            .find(|c| !letters.contains(c.to_ascii_uppercase()))
        {
            Some(symbol) => Err(ValidationError::InvalidSymbol {
                alphabet: *self,
                symbol,
            }),
            None => Ok(()),
        }
    }
}

impl std::fmt::Display for Alphabet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Alphabet::Nucleotide => write!(f, "nucleotide"),
            Alphabet::Protein => write!(f, "protein"),
        }
    }
}

/// Which prebuilt BLAST database a tool searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseKind {
    Nucleotide,
    Protein,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchTool {
    Blastn,
    Blastp,
    Tblastn,
}

impl SearchTool {
    pub fn parse(name: &str) -> Result<Self, ValidationError> {
        match name {
            "blastn" => Ok(SearchTool::Blastn),
            "blastp" => Ok(SearchTool::Blastp),
            "tblastn" => Ok(SearchTool::Tblastn),
            other => Err(ValidationError::InvalidTool(other.to_string())),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SearchTool::Blastn => "blastn",
            SearchTool::Blastp => "blastp",
            SearchTool::Tblastn => "tblastn",
        }
    }

    /// Alphabet the query must be written in.
    pub fn query_alphabet(&self) -> Alphabet {
        match self {
            SearchTool::Blastn => Alphabet::Nucleotide,
            SearchTool::Blastp | SearchTool::Tblastn => Alphabet::Protein,
        }
    }

    pub fn database(&self) -> DatabaseKind {
        match self {
            SearchTool::Blastn | SearchTool::Tblastn => DatabaseKind::Nucleotide,
            SearchTool::Blastp => DatabaseKind::Protein,
        }
    }
}

impl std::fmt::Display for SearchTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Search parameters exactly as received from the user, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchRequest {
    pub sequence: String,
    pub evalue: Option<String>,
    pub hitstoshow: Option<String>,
    pub tool: Option<String>,
}

/// Validated search parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchParams {
    pub sequence: String,
    /// Canonical text of the e-value, one of [`EVALUE_CHOICES`].
    pub evalue: String,
    pub hit_cap: usize,
    pub tool: SearchTool,
}

impl SearchParams {
    /// Defaults used when only a bare query is supplied.
    pub fn from_query(sequence: impl Into<String>) -> Self {
        Self {
            sequence: sequence.into(),
            evalue: "0.0001".to_string(),
            hit_cap: 100,
            tool: SearchTool::Blastp,
        }
    }
}

/// Check a raw request against the e-value, hit cap and tool allow-lists.
///
/// E-values are compared numerically so `1e-4` and `0.0001` are the same
/// threshold; hit caps must be plain integers.
pub fn validate_params(request: &SearchRequest) -> Result<SearchParams, ValidationError> {
    let raw_evalue = request
        .evalue
        .as_deref()
        .ok_or(ValidationError::MissingEvalue)?;
    let evalue = canonical_evalue(raw_evalue)
        .ok_or_else(|| ValidationError::InvalidEvalue(raw_evalue.to_string()))?;

    let raw_cap = request
        .hitstoshow
        .as_deref()
        .ok_or(ValidationError::MissingHitCap)?;
    let hit_cap = raw_cap
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|cap| HIT_CAP_CHOICES.contains(cap))
        .ok_or_else(|| ValidationError::InvalidHitCap(raw_cap.to_string()))?;

    let tool = match request.tool.as_deref() {
        Some(name) => SearchTool::parse(name)?,
        None => SearchTool::Blastp,
    };

    Ok(SearchParams {
        sequence: request.sequence.clone(),
        evalue: evalue.to_string(),
        hit_cap,
        tool,
    })
}

fn canonical_evalue(raw: &str) -> Option<&'static str> {
    let value = raw.trim().parse::<f64>().ok()?;
    EVALUE_CHOICES
        .iter()
        .copied()
        .find(|choice| choice.parse::<f64>().map_or(false, |c| c == value))
}

/// Identifier and letters-only sequence extracted from a raw query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SanitizedQuery {
    pub id: String,
    pub sequence: String,
}

/// Split off an optional FASTA header, then drop every non-ASCII
/// character and every character that is not an ASCII letter.
pub fn sanitize_query(query: &str) -> SanitizedQuery {
    let mut lines = query.split('\n');
    let id = if query.starts_with('>') {
        lines
            .next()
            .map(|header| header[1..].trim_end_matches(['\r', '\n']).to_string())
            .unwrap_or_default()
    } else {
        DEFAULT_QUERY_ID.to_string()
    };

    let body: String = lines
        .map(|l| l.trim_end_matches(['\r', '\n']))
        .collect::<String>()
        .chars()
        .filter(|c| c.is_ascii())
        .collect();
    let sequence = NON_LETTER.replace_all(&body, "").into_owned();

    SanitizedQuery { id, sequence }
}

/// Sanitize a query and verify it against the tool's alphabet.
pub fn prepare_query(params: &SearchParams) -> Result<SanitizedQuery, ValidationError> {
    let query = sanitize_query(&params.sequence);
    params.tool.query_alphabet().verify(&query.sequence)?;
    if query.sequence.is_empty() {
        return Err(ValidationError::EmptySequence);
    }
    Ok(query)
}
