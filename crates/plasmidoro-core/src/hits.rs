//! Parsing of BLAST tabular (`-outfmt 6`) output.

use serde::{Deserialize, Serialize};

/// One alignment row of BLAST tabular output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TabularHit {
    pub query_id: String,
    pub target_id: String,
    pub percent_identity: f64,
    pub alignment_length: usize,
    pub mismatches: usize,
    pub gap_opens: usize,
    pub query_start: usize,
    pub query_end: usize,
    pub target_start: usize,
    pub target_end: usize,
    /// Kept as printed by BLAST (`2e-45`, `0.0`).
    pub evalue: String,
    pub bitscore: String,
}

impl TabularHit {
    /// Parse one line. Comment lines, short rows and rows with
    /// non-numeric coordinates yield `None`.
    pub fn parse_line(line: &str) -> Option<Self> {
        if line.starts_with('#') {
            return None;
        }
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        if fields.len() < 12 {
            return None;
        }
        Some(Self {
            query_id: fields[0].to_string(),
            target_id: fields[1].to_string(),
            percent_identity: fields[2].trim().parse().ok()?,
            alignment_length: fields[3].trim().parse().ok()?,
            mismatches: fields[4].trim().parse().ok()?,
            gap_opens: fields[5].trim().parse().ok()?,
            query_start: fields[6].trim().parse().ok()?,
            query_end: fields[7].trim().parse().ok()?,
            target_start: fields[8].trim().parse().ok()?,
            target_end: fields[9].trim().parse().ok()?,
            evalue: fields[10].trim().to_string(),
            bitscore: fields[11].trim().to_string(),
        })
    }

    pub fn coverage(&self, query_len: usize) -> f64 {
        query_coverage(query_len, self.query_start, self.query_end)
    }

    /// BLAST truncates query ids at the first whitespace, so a row belongs
    /// to the searched query when the searched id starts with it.
    pub fn belongs_to(&self, query_id: &str) -> bool {
        !self.query_id.is_empty() && query_id.starts_with(&self.query_id)
    }
}

/// Percentage of the query covered by an alignment spanning
/// `query_start..=query_end` (1-based).
pub fn query_coverage(query_len: usize, query_start: usize, query_end: usize) -> f64 {
    if query_len == 0 {
        return 0.0;
    }
    let qlen = query_len as f64;
    let unaligned = query_start.saturating_sub(1) as f64 + (qlen - query_end as f64);
    (qlen - unaligned) * 100.0 / qlen
}

/// Keep the rows of `output` that belong to `query_id`, capped at `cap`.
pub fn parse_tabular(output: &str, query_id: &str, cap: usize) -> Vec<TabularHit> {
    output
        .lines()
        .filter_map(TabularHit::parse_line)
        .filter(|hit| hit.belongs_to(query_id))
        .take(cap)
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetKind {
    Plasmid,
    Oligo,
}

impl TargetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetKind::Plasmid => "plasmid",
            TargetKind::Oligo => "oligo",
        }
    }
}

/// Composite database sequence id: `<numericId>|<displayName>|<kind>|<extra>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetId {
    pub id: i64,
    pub name: String,
    pub kind: TargetKind,
    pub extra: String,
}

impl TargetId {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.splitn(4, '|');
        let id = parts.next()?.trim().parse().ok()?;
        let name = parts.next()?.to_string();
        let kind = match parts.next()? {
            "plasmid" => TargetKind::Plasmid,
            "oligo" => TargetKind::Oligo,
            _ => return None,
        };
        let extra = parts.next().unwrap_or_default().to_string();
        Some(Self {
            id,
            name,
            kind,
            extra,
        })
    }

    /// Render the header token used when exporting the BLAST databases.
    /// Whitespace and `|` inside names are replaced by `_`.
    pub fn render(id: i64, name: &str, kind: TargetKind, extra: &str) -> String {
        format!(
            "{}|{}|{}|{}",
            id,
            header_safe(name),
            kind.as_str(),
            header_safe(extra)
        )
    }
}

fn header_safe(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_whitespace() || c == '|' { '_' } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROW: &str = "q1\t7|pAMD1|plasmid|AMD001\t99.123\t90\t1\t0\t1\t90\t100\t189\t2e-45\t167";

    #[test]
    fn test_coverage_formula() {
        assert_eq!(query_coverage(100, 1, 90), 90.0);
        assert_eq!(query_coverage(100, 11, 100), 90.0);
        assert_eq!(query_coverage(100, 1, 100), 100.0);
        assert_eq!(query_coverage(0, 1, 1), 0.0);
    }

    #[test]
    fn test_parse_line() {
        let hit = TabularHit::parse_line(ROW).unwrap();
        assert_eq!(hit.query_id, "q1");
        assert_eq!(hit.query_start, 1);
        assert_eq!(hit.query_end, 90);
        assert_eq!(hit.evalue, "2e-45");
        assert_eq!(hit.bitscore, "167");
        assert_eq!(hit.coverage(100), 90.0);
    }

    #[test]
    fn test_parse_line_rejects_short_and_comments() {
        assert!(TabularHit::parse_line("# BLASTN 2.12.0+").is_none());
        assert!(TabularHit::parse_line("q1\tt1\t99.0").is_none());
        assert!(TabularHit::parse_line("").is_none());
    }

    #[test]
    fn test_parse_tabular_filters_and_caps() {
        let other = ROW.replacen("q1", "other", 1);
        let output = format!("# comment\n{ROW}\n{other}\n{ROW}\n{ROW}\n");
        let hits = parse_tabular(&output, "q1 long description", 2);
        assert_eq!(hits.len(), 2);
        assert!(hits.iter().all(|h| h.query_id == "q1"));
    }

    #[test]
    fn test_target_id() {
        let t = TargetId::parse("7|pAMD1|plasmid|AMD001").unwrap();
        assert_eq!(t.id, 7);
        assert_eq!(t.name, "pAMD1");
        assert_eq!(t.kind, TargetKind::Plasmid);
        assert_eq!(t.extra, "AMD001");

        let o = TargetId::parse("12|oAB3|oligo|").unwrap();
        assert_eq!(o.kind, TargetKind::Oligo);
        assert_eq!(o.extra, "");

        assert!(TargetId::parse("x|pAMD1|plasmid|").is_none());
        assert!(TargetId::parse("7|pAMD1|protein|").is_none());
    }

    #[test]
    fn test_render_target_id() {
        assert_eq!(
            TargetId::render(3, "my plasmid|v2", TargetKind::Plasmid, "AMD 9"),
            "3|my_plasmid_v2|plasmid|AMD_9"
        );
    }
}
