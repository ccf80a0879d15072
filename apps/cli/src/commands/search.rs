use std::io::Read;

use anyhow::Context as _;
use clap::Args;
use plasmidoro_core::search::SearchRequest;
use plasmidoro_search::{search, BlastDatabases, BlastRunner, SearchOutcome};

use super::Context;

#[derive(Args)]
pub struct SearchArgs {
    /// Query sequence, optionally with a FASTA header. Use '-' for stdin
    pub query: String,

    /// blastn, blastp or tblastn
    #[arg(long, default_value = "blastp")]
    pub tool: String,

    /// E-value threshold
    #[arg(long, default_value = "0.0001")]
    pub evalue: String,

    /// Maximum number of hits to show
    #[arg(long, default_value = "100")]
    pub hits: String,
}

fn read_query(query: String) -> anyhow::Result<String> {
    if query != "-" {
        return Ok(query);
    }
    let mut text = String::new();
    std::io::stdin()
        .read_to_string(&mut text)
        .context("Failed to read query from stdin")?;
    Ok(text)
}

fn text_lines(outcome: &SearchOutcome) -> Vec<String> {
    let mut lines = vec![format!(
        "{} query {} ({} letters)",
        outcome.tool, outcome.query_id, outcome.query_length
    )];
    if let Some(status) = &outcome.status {
        lines.push(status.clone());
        return lines;
    }
    lines.push(
        "target\tidentity\tcoverage\tlength\tquery\ttarget range\tevalue\tbitscore".to_string(),
    );
    for hit in &outcome.hits {
        let target = match &hit.protein {
            Some(protein) => format!("{} {}", hit.label, protein),
            None => hit.label.clone(),
        };
        lines.push(format!(
            "{}\t{}\t{}\t{}\t{}-{}\t{}-{}\t{}\t{}",
            target,
            hit.identity,
            hit.coverage,
            hit.alignment_length,
            hit.query_start,
            hit.query_end,
            hit.target_start,
            hit.target_end,
            hit.evalue,
            hit.bitscore
        ));
    }
    lines
}

pub fn run(ctx: &Context, args: SearchArgs) -> anyhow::Result<()> {
    let request = SearchRequest {
        sequence: read_query(args.query)?,
        evalue: Some(args.evalue),
        hitstoshow: Some(args.hits),
        tool: Some(args.tool),
    };
    let blast = &ctx.config.blast;
    let dbs = BlastDatabases {
        nucleotide: blast.nucleotide_db.clone(),
        protein: blast.protein_db.clone(),
        bin_dir: blast.bin_dir.clone(),
    };

    let conn = ctx.open_db()?;
    let outcome = search(&conn, &BlastRunner, &dbs, &request)?;
    ctx.emit(&outcome, text_lines(&outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasmidoro_core::hits::TargetKind;
    use plasmidoro_core::search::SearchTool;
    use plasmidoro_search::{DisplayHit, NO_HITS};

    fn outcome(hits: Vec<DisplayHit>) -> SearchOutcome {
        SearchOutcome {
            tool: SearchTool::Blastp,
            query_id: "q1".to_string(),
            query_length: 90,
            status: hits.is_empty().then(|| NO_HITS.to_string()),
            hits,
        }
    }

    #[test]
    fn test_text_lines() {
        assert_eq!(
            text_lines(&outcome(Vec::new())),
            vec!["blastp query q1 (90 letters)", NO_HITS]
        );

        let hit = DisplayHit {
            id: 7,
            kind: TargetKind::Plasmid,
            label: "pAMD7/AMD007".to_string(),
            protein: Some("bla".to_string()),
            identity: "99.3".to_string(),
            coverage: "90.0".to_string(),
            alignment_length: 90,
            query_start: 1,
            query_end: 90,
            target_start: 100,
            target_end: 189,
            evalue: "2e-45".to_string(),
            bitscore: "167".to_string(),
        };
        let lines = text_lines(&outcome(vec![hit]));
        assert_eq!(lines[2], "pAMD7/AMD007 bla\t99.3\t90.0\t90\t1-90\t100-189\t2e-45\t167");
    }

    #[test]
    fn test_read_query_passes_text_through() {
        assert_eq!(read_query("MKV".to_string()).unwrap(), "MKV");
    }
}
