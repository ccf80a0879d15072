//! Turns parsed feature spans into stored features and proteins.

use plasmidoro_core::feature::FeatureSpan;
use plasmidoro_store::models::{NewFeature, NewProtein};
use plasmidoro_store::plasmids::{insert_feature, insert_protein};
use rusqlite::Connection;
use serde::Serialize;
use tracing::{debug, info};

use crate::classify::{classify, GENE};
use crate::Result;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct FeatureCounts {
    pub features: usize,
    pub proteins: usize,
    /// Spans already present on the plasmid.
    pub duplicates: usize,
    /// `source` spans and spans without a usable name.
    pub discarded: usize,
}

fn strip_newlines(text: &str) -> String {
    text.chars().filter(|c| *c != '\n' && *c != '\r').collect()
}

/// Feature name: first `locus_tag`, `label` or `name` value.
pub fn feature_name(span: &FeatureSpan) -> Option<String> {
    ["locus_tag", "label", "name"]
        .iter()
        .find_map(|key| {
            span.get_qualifier(key)
                .map(strip_newlines)
                .filter(|name| !name.is_empty())
        })
}

/// `gene`, `label` and `note` values, each group joined by `;`, groups by `"; "`.
pub fn feature_description(span: &FeatureSpan) -> String {
    let groups: Vec<String> = ["gene", "label", "note"]
        .iter()
        .map(|key| span.qualifier_values(key).join(";"))
        .filter(|group| !group.is_empty())
        .collect();
    strip_newlines(&groups.join("; "))
}

/// The protein a feature carries, if its category is `gene` or it has a
/// translation.
pub fn protein_for(span: &FeatureSpan, category: &str) -> Option<NewProtein> {
    let translations = span.qualifier_values("translation");
    if category != GENE && translations.is_empty() {
        return None;
    }

    Some(NewProtein {
        name: first_of(span, &["gene", "label", "locus_tag"], "unknown_protein"),
        function: first_of(span, &["product", "note", "label"], "unidentified function"),
        sequence: translations.concat(),
    })
}

fn first_of(span: &FeatureSpan, keys: &[&str], fallback: &str) -> String {
    keys.iter()
        .find_map(|key| span.get_qualifier(key))
        .unwrap_or(fallback)
        .to_string()
}

/// Store the features of one record on a plasmid.
///
/// A protein is only created alongside a newly inserted feature, so
/// re-running over the same spans adds nothing.
pub fn store_features(
    conn: &Connection,
    plasmid_id: i64,
    plasmid_name: &str,
    sequence: &str,
    spans: &[FeatureSpan],
) -> Result<FeatureCounts> {
    let mut counts = FeatureCounts::default();

    for span in spans {
        if span.type_label == "source" {
            counts.discarded += 1;
            continue;
        }
        let Some(name) = feature_name(span) else {
            info!(
                "{}: {} feature at {} has no name, discarded",
                plasmid_name,
                span.type_label,
                span.location_string()
            );
            counts.discarded += 1;
            continue;
        };

        let category = classify(conn, &name, &span.type_label)?;
        let (start, end) = (span.start(), span.end());
        let row = NewFeature {
            name,
            feature_type_id: category.id,
            description: feature_description(span),
            sequence: slice(sequence, start, end).to_string(),
            sequence_id: plasmid_name.to_string(),
            start,
            end,
            strand: span.strand,
            location_str: span.location_string(),
        };

        let Some(feature_id) = insert_feature(conn, plasmid_id, &row)? else {
            debug!("{}: feature {} already stored", plasmid_name, row.name);
            counts.duplicates += 1;
            continue;
        };
        counts.features += 1;

        if let Some(protein) = protein_for(span, &category.name) {
            insert_protein(conn, feature_id, &protein)?;
            counts.proteins += 1;
        }
    }

    Ok(counts)
}

fn slice(sequence: &str, start: usize, end: usize) -> &str {
    let end = end.min(sequence.len());
    sequence.get(start.min(end)..end).unwrap_or("")
}
