use serde::{Deserialize, Serialize};

use crate::feature::FeatureSpan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Topology {
    Linear,
    Circular,
}

impl std::fmt::Display for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topology::Linear => write!(f, "linear"),
            Topology::Circular => write!(f, "circular"),
        }
    }
}

/// Normalized output of every sequence parser. Never persisted as-is;
/// the reconciler turns it into plasmid, feature and protein rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub identifier: String,
    #[serde(default)]
    pub description: String,
    pub topology: Topology,
    pub sequence: String,
    #[serde(default)]
    pub features: Vec<FeatureSpan>,
}

impl SequenceRecord {
    pub fn new(
        identifier: impl Into<String>,
        sequence: impl Into<String>,
        topology: Topology,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            description: String::new(),
            topology,
            sequence: sequence.into().to_uppercase(),
            features: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    pub fn is_circular(&self) -> bool {
        self.topology == Topology::Circular
    }

    /// Slice of the sequence covered by `start..end`, clamped to the record.
    /// Returns an empty string for inverted or out-of-range spans.
    pub fn subsequence(&self, start: usize, end: usize) -> &str {
        let end = end.min(self.sequence.len());
        if start >= end {
            return "";
        }
        self.sequence.get(start..end).unwrap_or("")
    }

    pub fn add_feature(&mut self, feature: FeatureSpan) {
        self.features.push(feature);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_uppercases() {
        let rec = SequenceRecord::new("test", "atcgatcg", Topology::Linear);
        assert_eq!(rec.identifier, "test");
        assert_eq!(rec.sequence, "ATCGATCG");
        assert_eq!(rec.len(), 8);
        assert!(!rec.is_circular());
    }

    #[test]
    fn test_subsequence_clamps() {
        let rec = SequenceRecord::new("s", "AABBCCDD", Topology::Circular);
        assert_eq!(rec.subsequence(2, 6), "BBCC");
        assert_eq!(rec.subsequence(6, 100), "DD");
        assert_eq!(rec.subsequence(6, 2), "");
    }
}
