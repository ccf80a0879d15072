use plasmidoro_core::{
    feature::{FeatureSpan, Qualifier},
    sequence::{SequenceRecord, Topology},
};
use tracing::warn;

use crate::location::parse_location;
use crate::ParseError;

/// Column where feature locations and qualifiers start.
const QUALIFIER_COLUMN: usize = 21;

/// Parse the first record of a GenBank string.
pub fn parse(input: &str) -> Result<SequenceRecord, ParseError> {
    parse_all(input)?
        .into_iter()
        .next()
        .ok_or(ParseError::UnexpectedEnd)
}

/// Parse every `//`-terminated record in a GenBank string.
pub fn parse_all(input: &str) -> Result<Vec<SequenceRecord>, ParseError> {
    let lines: Vec<&str> = input.lines().collect();
    let mut records = Vec::new();
    let mut i = 0;

    while i < lines.len() {
        if lines[i].starts_with("LOCUS") {
            records.push(parse_record(&lines, &mut i)?);
        } else {
            i += 1;
        }
    }

    if records.is_empty() {
        return Err(ParseError::InvalidFormat(
            "no LOCUS line found in GenBank input".to_string(),
        ));
    }
    Ok(records)
}

/// Parse one record starting at a LOCUS line; leaves `i` after its `//`.
fn parse_record(lines: &[&str], i: &mut usize) -> Result<SequenceRecord, ParseError> {
    let mut record = SequenceRecord::new("", "", Topology::Linear);
    parse_locus_line(lines[*i], &mut record);
    *i += 1;

    while *i < lines.len() {
        let line = lines[*i];

        if line.starts_with("//") {
            *i += 1;
            return Ok(record);
        } else if line.starts_with("LOCUS") {
            // Next record without a terminator.
            return Ok(record);
        } else if line.starts_with("DEFINITION") {
            let mut def = column(line, 12).trim().to_string();
            *i += 1;
            while *i < lines.len() && lines[*i].starts_with("            ") {
                def.push(' ');
                def.push_str(lines[*i].trim());
                *i += 1;
            }
            record.description = def.trim_end_matches('.').to_string();
            continue;
        } else if line.starts_with("FEATURES") {
            *i += 1;
            parse_features(lines, i, &mut record.features)?;
            continue;
        } else if line.starts_with("ORIGIN") {
            *i += 1;
            record.sequence = parse_origin(lines, i);
            continue;
        }

        *i += 1;
    }

    Err(ParseError::UnexpectedEnd)
}

fn parse_locus_line(line: &str, record: &mut SequenceRecord) {
    // LOCUS       name    length bp    type    topology    division    date
    let parts: Vec<&str> = line.split_whitespace().collect();

    if parts.len() >= 2 {
        record.identifier = parts[1].to_string();
    }

    if parts.contains(&"circular") {
        record.topology = Topology::Circular;
    }
}

/// Text from byte `col` onwards, or "" for short lines.
fn column(line: &str, col: usize) -> &str {
    line.get(col..).unwrap_or("")
}

fn is_continuation(line: &str) -> bool {
    line.len() > QUALIFIER_COLUMN && line.starts_with("                     ")
}

fn parse_features(
    lines: &[&str],
    i: &mut usize,
    features: &mut Vec<FeatureSpan>,
) -> Result<(), ParseError> {
    while *i < lines.len() {
        let line = lines[*i];

        // End of features section
        if line.starts_with(|c: char| !c.is_whitespace()) {
            return Ok(());
        }

        let key = line.get(5..QUALIFIER_COLUMN).map(str::trim).unwrap_or("");
        if !line.starts_with("     ") || line[5..].starts_with(' ') || key.is_empty() {
            *i += 1;
            continue;
        }

        let key = key.to_string();
        let mut location_text = column(line, QUALIFIER_COLUMN).trim().to_string();
        *i += 1;
        while *i < lines.len()
            && is_continuation(lines[*i])
            && !column(lines[*i], QUALIFIER_COLUMN).trim_start().starts_with('/')
        {
            location_text.push_str(column(lines[*i], QUALIFIER_COLUMN).trim());
            *i += 1;
        }

        let qualifiers = parse_qualifiers(lines, i);

        match parse_location(&location_text) {
            Ok((location, strand)) => features.push(FeatureSpan {
                type_label: key,
                location,
                strand,
                qualifiers,
            }),
            Err(e) => warn!("skipping {} feature: {}", key, e),
        }
    }

    Ok(())
}

fn parse_qualifiers(lines: &[&str], i: &mut usize) -> Vec<Qualifier> {
    let mut qualifiers = Vec::new();

    while *i < lines.len() && is_continuation(lines[*i]) {
        let content = column(lines[*i], QUALIFIER_COLUMN).trim();
        let Some(content) = content.strip_prefix('/') else {
            break;
        };
        *i += 1;

        let Some((key, first)) = content.split_once('=') else {
            // Flag qualifier (no value)
            qualifiers.push(Qualifier {
                key: content.to_string(),
                value: String::new(),
            });
            continue;
        };

        // Translations wrap without spaces; everything else wraps on words.
        let separator = if key == "translation" { "" } else { " " };
        let mut value = first.to_string();
        while *i < lines.len()
            && is_continuation(lines[*i])
            && !column(lines[*i], QUALIFIER_COLUMN).trim_start().starts_with('/')
        {
            value.push_str(separator);
            value.push_str(column(lines[*i], QUALIFIER_COLUMN).trim());
            *i += 1;
        }

        qualifiers.push(Qualifier {
            key: key.to_string(),
            value: unquote(&value),
        });
    }

    qualifiers
}

fn unquote(value: &str) -> String {
    let inner = value
        .strip_prefix('"')
        .map(|v| v.strip_suffix('"').unwrap_or(v))
        .unwrap_or(value);
    inner.replace("\"\"", "\"")
}

fn parse_origin(lines: &[&str], i: &mut usize) -> String {
    let mut seq = String::new();

    while *i < lines.len() && !lines[*i].starts_with("//") {
        // "        1 atcgatcg atcgatcg ..."
        seq.extend(
            lines[*i]
                .chars()
                .filter(|c| c.is_ascii_alphabetic())
                .map(|c| c.to_ascii_uppercase()),
        );
        *i += 1;
    }

    seq
}

#[cfg(test)]
mod tests {
    use super::*;
    use plasmidoro_core::feature::Strand;

    const MINI_GENBANK: &str = r#"LOCUS       pTest           100 bp    DNA     circular SYN 01-JAN-2026
DEFINITION  Test plasmid.
ACCESSION   .
KEYWORDS    .
SOURCE      synthetic construct
  ORGANISM  synthetic construct
FEATURES             Location/Qualifiers
     source          1..100
                     /organism="synthetic construct"
     promoter        1..20
                     /label="test promoter"
     CDS             complement(30..90)
                     /label="GFP"
                     /gene="gfp"
                     /codon_start=1
                     /note="first line
                     second line"
                     /translation="MSKGEELFTG
                     VVPILVELDG"
ORIGIN
        1 atcgatcgat cgatcgatcg atcgatcgat cgatcgatcg atcgatcgat
       51 cgatcgatcg atcgatcgat cgatcgatcg atcgatcgat cgatcgatcg
//
"#;

    #[test]
    fn test_parse_mini_genbank() {
        let seq = parse(MINI_GENBANK).unwrap();
        assert_eq!(seq.identifier, "pTest");
        assert_eq!(seq.description, "Test plasmid");
        assert_eq!(seq.topology, Topology::Circular);
        assert_eq!(seq.len(), 100);
        assert_eq!(seq.features.len(), 3);
        assert!(seq.sequence.starts_with("ATCGATCG"));
    }

    #[test]
    fn test_parse_features() {
        let seq = parse(MINI_GENBANK).unwrap();

        let promoter = &seq.features[1];
        assert_eq!(promoter.type_label, "promoter");
        assert_eq!(promoter.get_qualifier("label"), Some("test promoter"));
        assert_eq!((promoter.start(), promoter.end()), (0, 20));
        assert_eq!(promoter.strand, Strand::Forward);

        let cds = &seq.features[2];
        assert_eq!(cds.type_label, "CDS");
        assert_eq!((cds.start(), cds.end()), (29, 90));
        assert_eq!(cds.strand, Strand::Reverse);
        assert_eq!(cds.get_qualifier("codon_start"), Some("1"));
        assert_eq!(cds.get_qualifier("note"), Some("first line second line"));
        assert_eq!(cds.get_qualifier("translation"), Some("MSKGEELFTGVVPILVELDG"));
    }

    #[test]
    fn test_parse_all_multi_record() {
        let two = format!("{}{}", MINI_GENBANK, MINI_GENBANK.replace("pTest", "pOther"));
        let records = parse_all(&two).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].identifier, "pOther");
    }

    #[test]
    fn test_truncated_record_is_error() {
        let truncated = MINI_GENBANK.replace("//\n", "");
        assert!(matches!(parse(&truncated), Err(ParseError::UnexpectedEnd)));
        assert!(parse("not a genbank file").is_err());
    }

    #[test]
    fn test_bad_location_skips_feature() {
        let bad = MINI_GENBANK.replace("1..20", "J0001.1:1..20");
        let seq = parse(&bad).unwrap();
        assert_eq!(seq.features.len(), 2);
    }
}
