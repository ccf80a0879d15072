use std::io::Write;

use plasmidoro_core::sequence::{SequenceRecord, Topology};

use crate::ParseError;

/// Line width used when writing sequences.
const LINE_WIDTH: usize = 80;

/// Parse FASTA text into records, in file order.
///
/// The header's first whitespace-delimited token is the identifier and the
/// remainder the description. `;` comment lines are ignored. Records with an
/// empty body are kept so callers can decide what an empty plasmid means.
pub fn parse(input: &str) -> Result<Vec<SequenceRecord>, ParseError> {
    let mut records: Vec<SequenceRecord> = Vec::new();
    let mut body = String::new();

    for line in input.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with(';') {
            continue;
        }

        if let Some(header) = trimmed.strip_prefix('>') {
            if let Some(last) = records.last_mut() {
                last.sequence = std::mem::take(&mut body);
            }
            let (identifier, description) = match header.split_once(char::is_whitespace) {
                Some((id, desc)) => (id, desc.trim()),
                None => (header, ""),
            };
            let mut record = SequenceRecord::new(identifier, "", Topology::Linear);
            record.description = description.to_string();
            records.push(record);
        } else if records.is_empty() {
            return Err(ParseError::InvalidFormat(
                "sequence data before the first FASTA header".to_string(),
            ));
        } else {
            body.extend(
                trimmed
                    .chars()
                    .filter(|c| c.is_ascii_alphabetic())
                    .map(|c| c.to_ascii_uppercase()),
            );
        }
    }

    match records.last_mut() {
        Some(last) => last.sequence = body,
        None => {
            return Err(ParseError::InvalidFormat(
                "No sequences found in FASTA input".to_string(),
            ))
        }
    }

    Ok(records)
}

/// Write one FASTA entry with a preformatted header (without the `>`).
pub fn write_entry<W: Write>(out: &mut W, header: &str, sequence: &str) -> std::io::Result<()> {
    writeln!(out, ">{}", header)?;
    for chunk in sequence.as_bytes().chunks(LINE_WIDTH) {
        out.write_all(chunk)?;
        out.write_all(b"\n")?;
    }
    Ok(())
}
