use plasmidoro_core::feature::Strand;
use serde::{Deserialize, Serialize};

/// A plasmid row. `footprint` is the checksum of the file named by
/// `sequence_file`; the two are only ever written together.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plasmid {
    pub id: i64,
    pub name: String,
    pub amd_number: String,
    pub description: String,
    pub sequence: String,
    pub footprint: String,
    /// Path of the backing file relative to the import root, "" if none.
    pub sequence_file: String,
    pub magic_pool_designation: String,
    pub magic_pool_part_id: Option<i64>,
}

/// Values for a feature row about to be inserted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeature {
    pub name: String,
    pub feature_type_id: i64,
    pub description: String,
    pub sequence: String,
    pub sequence_id: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    pub location_str: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Feature {
    pub id: i64,
    pub plasmid_id: i64,
    pub feature_type_id: Option<i64>,
    pub name: String,
    pub description: String,
    pub sequence: String,
    pub sequence_id: String,
    pub start: usize,
    pub end: usize,
    pub strand: Strand,
    pub location_str: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProtein {
    pub name: String,
    pub sequence: String,
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Protein {
    pub id: i64,
    pub feature_id: Option<i64>,
    pub name: String,
    pub sequence: String,
    pub function: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Overhang {
    pub id: i64,
    pub name: String,
    pub sequence: String,
    /// `#rrggbb`
    pub color: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartType {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub upstream_overhang_id: Option<i64>,
    pub downstream_overhang_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VectorType {
    pub id: i64,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicPool {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub vector_type_id: Option<i64>,
    pub antibiotic_resistance: String,
    pub strain_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Strain {
    pub id: i64,
    pub amd_number: String,
    pub description: String,
    pub plasmid: String,
    pub species: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Oligo {
    pub id: i64,
    pub name: String,
    pub sequence: String,
}
