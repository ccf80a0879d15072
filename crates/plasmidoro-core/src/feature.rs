use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strand {
    Forward,
    Reverse,
    #[default]
    None,
}

impl Strand {
    pub fn as_i8(&self) -> i8 {
        match self {
            Strand::Forward => 1,
            Strand::Reverse => -1,
            Strand::None => 0,
        }
    }

    pub fn from_i8(v: i8) -> Self {
        match v {
            1 => Strand::Forward,
            -1 => Strand::Reverse,
            _ => Strand::None,
        }
    }
}

/// Represents the location of a feature on the sequence.
/// Coordinates are 0-based, end-exclusive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Location {
    /// Simple range: start..end
    Simple { start: usize, end: usize },
    /// Join of multiple ranges: join(1..100, 200..300)
    Join { ranges: Vec<(usize, usize)> },
    /// Complement of a location
    Complement { inner: Box<Location> },
}

impl Location {
    pub fn simple(start: usize, end: usize) -> Self {
        Location::Simple { start, end }
    }

    /// Lowest coordinate covered by the location.
    pub fn start(&self) -> usize {
        match self {
            Location::Simple { start, .. } => *start,
            Location::Join { ranges } => ranges.iter().map(|r| r.0).min().unwrap_or(0),
            Location::Complement { inner } => inner.start(),
        }
    }

    /// Highest coordinate covered by the location (exclusive).
    pub fn end(&self) -> usize {
        match self {
            Location::Simple { end, .. } => *end,
            Location::Join { ranges } => ranges.iter().map(|r| r.1).max().unwrap_or(0),
            Location::Complement { inner } => inner.end(),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Location::Simple { start, end } => end.saturating_sub(*start),
            Location::Join { ranges } => ranges.iter().map(|(s, e)| e.saturating_sub(*s)).sum(),
            Location::Complement { inner } => inner.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Render in GenBank notation (1-based, inclusive).
    pub fn to_genbank(&self, strand: Strand) -> String {
        let loc_str = match self {
            Location::Simple { start, end } => format!("{}..{}", start + 1, end),
            Location::Join { ranges } => {
                let parts: Vec<String> = ranges
                    .iter()
                    .map(|(s, e)| format!("{}..{}", s + 1, e))
                    .collect();
                format!("join({})", parts.join(","))
            }
            Location::Complement { inner } => {
                return format!("complement({})", inner.to_genbank(Strand::Forward));
            }
        };

        match strand {
            Strand::Reverse => format!("complement({})", loc_str),
            _ => loc_str,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Qualifier {
    pub key: String,
    pub value: String,
}

/// An annotated sub-range of a parsed sequence record.
///
/// Qualifiers keep file order and may repeat a key; repeated keys are the
/// multi-valued form (`/note="a"` followed by `/note="b"`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSpan {
    pub type_label: String,
    pub location: Location,
    pub strand: Strand,
    #[serde(default)]
    pub qualifiers: Vec<Qualifier>,
}

impl FeatureSpan {
    pub fn new(type_label: impl Into<String>, start: usize, end: usize, strand: Strand) -> Self {
        Self {
            type_label: type_label.into(),
            location: Location::simple(start, end),
            strand,
            qualifiers: Vec::new(),
        }
    }

    pub fn start(&self) -> usize {
        self.location.start()
    }

    pub fn end(&self) -> usize {
        self.location.end()
    }

    pub fn has_qualifier(&self, key: &str) -> bool {
        self.qualifiers.iter().any(|q| q.key == key)
    }

    /// First value of a qualifier.
    pub fn get_qualifier(&self, key: &str) -> Option<&str> {
        self.qualifiers
            .iter()
            .find(|q| q.key == key)
            .map(|q| q.value.as_str())
    }

    /// All values of a qualifier, in file order.
    pub fn qualifier_values(&self, key: &str) -> Vec<&str> {
        self.qualifiers
            .iter()
            .filter(|q| q.key == key)
            .map(|q| q.value.as_str())
            .collect()
    }

    pub fn add_qualifier(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.qualifiers.push(Qualifier {
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn location_string(&self) -> String {
        self.location.to_genbank(self.strand)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_simple() {
        let loc = Location::simple(100, 500);
        assert_eq!(loc.start(), 100);
        assert_eq!(loc.end(), 500);
        assert_eq!(loc.len(), 400);
    }

    #[test]
    fn test_location_join() {
        let loc = Location::Join {
            ranges: vec![(100, 200), (300, 400)],
        };
        assert_eq!(loc.start(), 100);
        assert_eq!(loc.end(), 400);
        assert_eq!(loc.len(), 200);
    }

    #[test]
    fn test_location_to_genbank() {
        let loc = Location::simple(29, 90);
        assert_eq!(loc.to_genbank(Strand::Forward), "30..90");
        assert_eq!(loc.to_genbank(Strand::Reverse), "complement(30..90)");
    }

    #[test]
    fn test_multi_valued_qualifiers() {
        let mut f = FeatureSpan::new("CDS", 0, 30, Strand::Forward);
        f.add_qualifier("note", "first");
        f.add_qualifier("gene", "bla");
        f.add_qualifier("note", "second");
        assert_eq!(f.get_qualifier("note"), Some("first"));
        assert_eq!(f.qualifier_values("note"), vec!["first", "second"]);
        assert!(f.has_qualifier("gene"));
        assert!(!f.has_qualifier("label"));
    }

    #[test]
    fn test_strand_roundtrip() {
        for s in [Strand::Forward, Strand::Reverse, Strand::None] {
            assert_eq!(Strand::from_i8(s.as_i8()), s);
        }
    }
}
