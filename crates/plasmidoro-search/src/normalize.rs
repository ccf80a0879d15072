//! Turns raw tabular rows into hits that name inventory records.

use plasmidoro_core::hits::{parse_tabular, TabularHit, TargetId, TargetKind};
use plasmidoro_core::search::{DatabaseKind, SearchTool};
use plasmidoro_store::inventory::get_oligo;
use plasmidoro_store::plasmids::get_plasmid;
use rusqlite::Connection;
use serde::Serialize;
use tracing::warn;

use crate::Result;

pub const NO_HITS: &str = "No hits found";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DisplayHit {
    pub id: i64,
    pub kind: TargetKind,
    /// `name`, or `name/amd` when the plasmid has an AMD number.
    pub label: String,
    /// Protein name for hits against the protein database.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protein: Option<String>,
    /// Percent identity with one decimal.
    pub identity: String,
    /// Query coverage with one decimal.
    pub coverage: String,
    pub alignment_length: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub target_start: usize,
    pub target_end: usize,
    pub evalue: String,
    pub bitscore: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchOutcome {
    pub tool: SearchTool,
    pub query_id: String,
    pub query_length: usize,
    pub hits: Vec<DisplayHit>,
    /// User-facing message when there is nothing to show.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

fn label_for(name: &str, amd_number: &str) -> String {
    if amd_number.is_empty() {
        name.to_string()
    } else {
        format!("{}/{}", name, amd_number)
    }
}

/// Display label of the record behind a target id, if it still exists.
fn resolve(conn: &Connection, target: &TargetId) -> Result<Option<String>> {
    Ok(match target.kind {
        TargetKind::Plasmid => {
            get_plasmid(conn, target.id)?.map(|p| label_for(&p.name, &p.amd_number))
        }
        TargetKind::Oligo => get_oligo(conn, target.id)?.map(|o| o.name),
    })
}

fn display(
    hit: &TabularHit,
    target: TargetId,
    label: String,
    tool: SearchTool,
    query_length: usize,
) -> DisplayHit {
    let protein = (tool.database() == DatabaseKind::Protein && !target.extra.is_empty())
        .then(|| target.extra.clone());
    DisplayHit {
        id: target.id,
        kind: target.kind,
        label,
        protein,
        identity: format!("{:.1}", hit.percent_identity),
        coverage: format!("{:.1}", hit.coverage(query_length)),
        alignment_length: hit.alignment_length,
        query_start: hit.query_start,
        query_end: hit.query_end,
        target_start: hit.target_start,
        target_end: hit.target_end,
        evalue: hit.evalue.clone(),
        bitscore: hit.bitscore.clone(),
    }
}

/// Keep the rows for `query_id`, resolve their targets against the store and
/// truncate to `cap`. Unresolvable targets are logged and dropped.
pub fn normalize(
    conn: &Connection,
    output: &str,
    tool: SearchTool,
    query_id: &str,
    query_length: usize,
    cap: usize,
) -> Result<SearchOutcome> {
    let mut hits = Vec::new();
    for row in parse_tabular(output, query_id, usize::MAX) {
        if hits.len() == cap {
            break;
        }
        let Some(target) = TargetId::parse(&row.target_id) else {
            warn!("unrecognized target id {:?}", row.target_id);
            continue;
        };
        let Some(label) = resolve(conn, &target)? else {
            warn!("{} {} is no longer in the inventory", target.kind.as_str(), target.id);
            continue;
        };
        hits.push(display(&row, target, label, tool, query_length));
    }

    let status = hits.is_empty().then(|| NO_HITS.to_string());
    Ok(SearchOutcome {
        tool,
        query_id: query_id.to_string(),
        query_length,
        hits,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasmidoro_store::inventory::{create, set_text};
    use plasmidoro_store::plasmids::create_plasmid;
    use plasmidoro_store::{open_in_memory, EntityKind};
    use pretty_assertions::assert_eq;

    fn row(query: &str, target: &str, qstart: usize, qend: usize) -> String {
        format!("{query}\t{target}\t99.26\t90\t1\t0\t{qstart}\t{qend}\t100\t189\t2e-45\t167")
    }

    #[test]
    fn test_label() {
        assert_eq!(label_for("pAMD1", ""), "pAMD1");
        assert_eq!(label_for("pAMD1", "AMD001"), "pAMD1/AMD001");
    }

    #[test]
    fn test_normalize_resolves_and_filters() {
        let conn = open_in_memory().unwrap();
        let plasmid = create_plasmid(&conn, "pAMD1").unwrap();
        set_text(&conn, EntityKind::Plasmid, plasmid, "amd_number", "AMD001").unwrap();
        let oligo = create(&conn, EntityKind::Oligo, "oAMD9").unwrap();

        let output = [
            "# BLASTN 2.15.0+".to_string(),
            row("q1", &format!("{plasmid}|pAMD1|plasmid|AMD001"), 1, 90),
            row("other", &format!("{plasmid}|pAMD1|plasmid|AMD001"), 1, 90),
            row("q1", "999|gone|plasmid|", 1, 90),
            row("q1", "garbage", 1, 90),
            row("q1", &format!("{oligo}|oAMD9|oligo|"), 11, 30),
            "short\trow".to_string(),
        ]
        .join("\n");

        let outcome =
            normalize(&conn, &output, SearchTool::Blastn, "q1 my query", 100, 10).unwrap();
        assert_eq!(outcome.status, None);
        assert_eq!(outcome.hits.len(), 2);
        assert_eq!(outcome.hits[0].label, "pAMD1/AMD001");
        assert_eq!(outcome.hits[0].identity, "99.3");
        assert_eq!(outcome.hits[0].coverage, "90.0");
        assert_eq!(outcome.hits[0].protein, None);
        assert_eq!(outcome.hits[1].label, "oAMD9");
        assert_eq!(outcome.hits[1].kind, TargetKind::Oligo);
        assert_eq!(outcome.hits[1].coverage, "20.0");
    }

    #[test]
    fn test_protein_hits_carry_protein_name() {
        let conn = open_in_memory().unwrap();
        let plasmid = create_plasmid(&conn, "pAMD1").unwrap();
        let output = row("q1", &format!("{plasmid}|pAMD1|plasmid|bla"), 1, 90);

        let outcome = normalize(&conn, &output, SearchTool::Blastp, "q1", 90, 10).unwrap();
        assert_eq!(outcome.hits[0].label, "pAMD1");
        assert_eq!(outcome.hits[0].protein.as_deref(), Some("bla"));
    }

    #[test]
    fn test_cap_and_empty_status() {
        let conn = open_in_memory().unwrap();
        let plasmid = create_plasmid(&conn, "pAMD1").unwrap();
        let target = format!("{plasmid}|pAMD1|plasmid|");
        let output = (0..5)
            .map(|_| row("q1", &target, 1, 90))
            .collect::<Vec<_>>()
            .join("\n");

        let outcome = normalize(&conn, &output, SearchTool::Blastn, "q1", 90, 3).unwrap();
        assert_eq!(outcome.hits.len(), 3);

        let empty = normalize(&conn, "", SearchTool::Blastn, "q1", 90, 3).unwrap();
        assert!(empty.hits.is_empty());
        assert_eq!(empty.status.as_deref(), Some(NO_HITS));
    }
}
