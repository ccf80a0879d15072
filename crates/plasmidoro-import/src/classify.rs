//! Maps a raw feature type label and name onto the feature type dictionary.

use plasmidoro_store::dictionary::{find, get_or_create, Dictionary};
use rusqlite::Connection;

use crate::Result;

pub const GENE: &str = "gene";
pub const MISC_FEATURE: &str = "misc_feature";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// Category for a `misc_feature` from its name. First matching rule wins.
pub fn misc_feature_category(name: &str) -> &'static str {
    if name.ends_with("romoter") {
        "promoter"
    } else if name.contains("origin of replication") || name.starts_with("Ori") || name == "ColE1"
    {
        "origin"
    } else if name.contains("BsmBI") {
        "restriction site"
    } else if name.contains("inverted repeat") {
        "IR"
    } else if name.contains("transposase enzyme") {
        GENE
    } else {
        MISC_FEATURE
    }
}

/// Resolve the feature type for `(name, type_label)`, growing the
/// dictionary when the category does not exist yet.
///
/// `misc_feature` and `CDS` go through their name rules before the exact
/// dictionary match, otherwise the `misc_feature` entry created by the
/// fallback would capture every later misc feature.
pub fn classify(conn: &Connection, name: &str, type_label: &str) -> Result<Category> {
    let category = match type_label {
        MISC_FEATURE => misc_feature_category(name),
        "CDS" => GENE,
        other => {
            if let Some(id) = find(conn, Dictionary::FeatureTypes, other)? {
                return Ok(Category {
                    id,
                    name: other.to_string(),
                });
            }
            other
        }
    };

    let id = get_or_create(conn, Dictionary::FeatureTypes, category)?;
    Ok(Category {
        id,
        name: category.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasmidoro_store::dictionary::names;
    use plasmidoro_store::open_in_memory;

    #[test]
    fn test_misc_feature_rules() {
        assert_eq!(misc_feature_category("lac promoter"), "promoter");
        assert_eq!(misc_feature_category("T7 Promoter"), "promoter");
        assert_eq!(misc_feature_category("pMB1 origin of replication"), "origin");
        assert_eq!(misc_feature_category("OriT"), "origin");
        assert_eq!(misc_feature_category("ColE1"), "origin");
        assert_eq!(misc_feature_category("ColE1 ori"), "misc_feature");
        assert_eq!(misc_feature_category("BsmBI site 1"), "restriction site");
        assert_eq!(misc_feature_category("Tn7 inverted repeat L"), "IR");
        assert_eq!(misc_feature_category("Tn5 transposase enzyme"), "gene");
        assert_eq!(misc_feature_category("MCS"), "misc_feature");
    }

    #[test]
    fn test_rule_order() {
        // "romoter" is checked before "BsmBI".
        assert_eq!(misc_feature_category("BsmBI-flanked promoter"), "promoter");
    }

    #[test]
    fn test_classify_is_idempotent() {
        let conn = open_in_memory().unwrap();
        let first = classify(&conn, "BsmBI site 1", "misc_feature").unwrap();
        let second = classify(&conn, "BsmBI site 1", "misc_feature").unwrap();
        assert_eq!(first, second);
        assert_eq!(first.name, "restriction site");
        let all = names(&conn, Dictionary::FeatureTypes).unwrap();
        assert_eq!(all.iter().filter(|n| *n == "restriction site").count(), 1);
    }

    #[test]
    fn test_misc_fallback_does_not_shadow_rules() {
        let conn = open_in_memory().unwrap();
        assert_eq!(classify(&conn, "MCS", "misc_feature").unwrap().name, "misc_feature");
        assert_eq!(
            classify(&conn, "lac promoter", "misc_feature").unwrap().name,
            "promoter"
        );
    }

    #[test]
    fn test_cds_and_new_labels() {
        let conn = open_in_memory().unwrap();
        let gene = classify(&conn, "bla", "CDS").unwrap();
        assert_eq!(gene.name, "gene");

        let terminator = classify(&conn, "rrnB T1", "terminator").unwrap();
        assert_eq!(terminator.name, "terminator");
        assert_eq!(classify(&conn, "T0", "terminator").unwrap().id, terminator.id);

        // A label already in the dictionary matches exactly.
        assert_eq!(classify(&conn, "anything", "gene").unwrap().id, gene.id);
    }
}
