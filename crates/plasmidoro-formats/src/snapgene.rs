//! Reader for the SnapGene `.dna` binary format.
//!
//! The file is a stream of packets, each a one-byte type, a big-endian
//! `u32` payload length and the payload. The cookie packet (0x09) comes
//! first; the DNA packet (0x00) holds a topology flag byte followed by
//! the bases; features (0x0A) and notes (0x06) are XML documents.

use std::sync::LazyLock;

use plasmidoro_core::{
    feature::{FeatureSpan, Location, Qualifier, Strand},
    sequence::{SequenceRecord, Topology},
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;
use tracing::{debug, warn};

use crate::ParseError;

const COOKIE_PACKET: u8 = 0x09;
const DNA_PACKET: u8 = 0x00;
const NOTES_PACKET: u8 = 0x06;
const FEATURES_PACKET: u8 = 0x0A;
const COOKIE: &[u8] = b"SnapGene";

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new("<[^>]+>").expect("static regex"));

struct Packet<'a> {
    kind: u8,
    payload: &'a [u8],
}

fn packets(bytes: &[u8]) -> Result<Vec<Packet<'_>>, ParseError> {
    let mut out = Vec::new();
    let mut offset = 0;
    while offset < bytes.len() {
        let header = bytes
            .get(offset..offset + 5)
            .ok_or_else(|| ParseError::InvalidFormat("truncated SnapGene packet header".into()))?;
        let len = u32::from_be_bytes([header[1], header[2], header[3], header[4]]) as usize;
        let start = offset + 5;
        let payload = bytes
            .get(start..start + len)
            .ok_or_else(|| ParseError::InvalidFormat("truncated SnapGene packet".into()))?;
        out.push(Packet {
            kind: header[0],
            payload,
        });
        offset = start + len;
    }
    Ok(out)
}

/// Parse a SnapGene file. The identifier is left empty; SnapGene files
/// carry no sequence name of their own.
pub fn parse(bytes: &[u8]) -> Result<SequenceRecord, ParseError> {
    let packets = packets(bytes)?;

    match packets.first() {
        Some(p) if p.kind == COOKIE_PACKET && p.payload.starts_with(COOKIE) => {}
        _ => {
            return Err(ParseError::InvalidFormat(
                "missing SnapGene cookie packet".into(),
            ))
        }
    }

    let mut record: Option<SequenceRecord> = None;
    let mut features_xml = None;
    let mut description = String::new();

    for packet in &packets[1..] {
        match packet.kind {
            DNA_PACKET => {
                let (&flags, bases) = packet
                    .payload
                    .split_first()
                    .ok_or_else(|| ParseError::InvalidFormat("empty DNA packet".into()))?;
                let topology = if flags & 0x01 == 1 {
                    Topology::Circular
                } else {
                    Topology::Linear
                };
                let bases = std::str::from_utf8(bases)
                    .map_err(|_| ParseError::InvalidFormat("non-ASCII DNA packet".into()))?;
                record = Some(SequenceRecord::new("", bases, topology));
            }
            FEATURES_PACKET => features_xml = Some(xml_text(packet.payload)),
            NOTES_PACKET => description = parse_description(&xml_text(packet.payload))?,
            other => debug!("skipping SnapGene packet 0x{:02x}", other),
        }
    }

    let mut record =
        record.ok_or_else(|| ParseError::InvalidFormat("no DNA packet in SnapGene file".into()))?;
    if let Some(xml) = features_xml {
        record.features = parse_features_xml(&xml, record.len())?;
    }
    record.description = description;
    Ok(record)
}

fn xml_text(payload: &[u8]) -> String {
    String::from_utf8_lossy(payload).into_owned()
}

/// Strip markup SnapGene embeds in free-text values.
fn clean_text(raw: &str) -> String {
    HTML_TAG.replace_all(raw, "").trim().to_string()
}

fn attribute(e: &BytesStart, name: &[u8]) -> Result<Option<String>, ParseError> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.as_ref() == name {
            let value = match attr.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            return Ok(Some(value));
        }
    }
    Ok(None)
}

#[derive(Default)]
struct PendingFeature {
    name: Option<String>,
    type_label: String,
    strand: Strand,
    ranges: Vec<(usize, usize)>,
    qualifiers: Vec<Qualifier>,
}

impl PendingFeature {
    fn from_element(e: &BytesStart) -> Result<Self, ParseError> {
        let strand = match attribute(e, b"directionality")?.as_deref() {
            Some("1") => Strand::Forward,
            Some("2") => Strand::Reverse,
            _ => Strand::None,
        };
        Ok(Self {
            name: attribute(e, b"name")?,
            type_label: attribute(e, b"type")?.unwrap_or_else(|| "misc_feature".to_string()),
            strand,
            ..Default::default()
        })
    }

    /// Segments whose start lies after their end wrap through the origin
    /// and become two ranges.
    fn add_segment(&mut self, e: &BytesStart, seq_len: usize) -> Result<(), ParseError> {
        let Some(range) = attribute(e, b"range")? else {
            return Ok(());
        };
        let parsed = range.split_once('-').and_then(|(a, b)| {
            let start = a.trim().parse::<usize>().ok()?;
            let end = b.trim().parse::<usize>().ok()?;
            Some((start, end))
        });
        match parsed {
            Some((start, end)) => {
                let start = start.saturating_sub(1);
                if start > end {
                    self.ranges.push((start.min(seq_len), seq_len));
                    self.ranges.push((0, end));
                } else {
                    self.ranges.push((start, end));
                }
            }
            None => warn!("ignoring malformed SnapGene segment range {:?}", range),
        }
        Ok(())
    }

    fn finish(mut self) -> Option<FeatureSpan> {
        let location = match self.ranges.len() {
            0 => return None,
            1 => Location::simple(self.ranges[0].0, self.ranges[0].1),
            _ => Location::Join {
                ranges: std::mem::take(&mut self.ranges),
            },
        };
        if let Some(name) = self.name {
            if !self.qualifiers.iter().any(|q| q.key == "label") {
                self.qualifiers.push(Qualifier {
                    key: "label".to_string(),
                    value: name,
                });
            }
        }
        Some(FeatureSpan {
            type_label: self.type_label,
            location,
            strand: self.strand,
            qualifiers: self.qualifiers,
        })
    }
}

fn parse_features_xml(xml: &str, seq_len: usize) -> Result<Vec<FeatureSpan>, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut features = Vec::new();
    let mut current: Option<PendingFeature> = None;
    let mut qualifier: Option<String> = None;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.name().as_ref() {
                b"Feature" => current = Some(PendingFeature::from_element(&e)?),
                b"Segment" => {
                    if let Some(f) = current.as_mut() {
                        f.add_segment(&e, seq_len)?;
                    }
                }
                b"Q" => qualifier = attribute(&e, b"name")?,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"Segment" => {
                    if let Some(f) = current.as_mut() {
                        f.add_segment(&e, seq_len)?;
                    }
                }
                b"V" => {
                    if let (Some(f), Some(key)) = (current.as_mut(), qualifier.as_ref()) {
                        if let Some(value) = qualifier_value(&e)? {
                            f.qualifiers.push(Qualifier {
                                key: key.clone(),
                                value,
                            });
                        }
                    }
                }
                _ => {}
            },
            Event::End(e) => match e.name().as_ref() {
                b"Feature" => {
                    if let Some(span) = current.take().and_then(PendingFeature::finish) {
                        features.push(span);
                    }
                }
                b"Q" => qualifier = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(features)
}

fn qualifier_value(e: &BytesStart) -> Result<Option<String>, ParseError> {
    if let Some(text) = attribute(e, b"text")? {
        return Ok(Some(clean_text(&text)));
    }
    if let Some(predef) = attribute(e, b"predef")? {
        return Ok(Some(clean_text(&predef)));
    }
    attribute(e, b"int")
}

fn parse_description(xml: &str) -> Result<String, ParseError> {
    let mut reader = Reader::from_str(xml);
    let mut inside = false;
    let mut text = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) if e.name().as_ref() == b"Description" => inside = true,
            Event::End(e) if e.name().as_ref() == b"Description" => inside = false,
            Event::Text(t) if inside => match t.unescape() {
                Ok(s) => text.push_str(&s),
                Err(_) => text.push_str(&String::from_utf8_lossy(&t)),
            },
            Event::CData(t) if inside => text.push_str(&String::from_utf8_lossy(&t)),
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(clean_text(&text))
}
