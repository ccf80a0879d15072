//! Cell fill colours of `.xlsx` workbooks.
//!
//! calamine reads values only, so fills come straight from the package:
//! `xl/styles.xml` maps a cell's style index to a fill, and each worksheet
//! part names the style of every cell.

use std::collections::HashMap;
use std::fs::File;
use std::io::{Read, Seek};
use std::path::Path;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use zip::result::ZipError;
use zip::ZipArchive;

use crate::Result;

/// Zero-based `(row, column)` to a `#RRGGBB` colour.
pub type FillMap = HashMap<(usize, usize), String>;

/// Fill colours of every filled cell, keyed by worksheet name.
pub fn read_fills(path: &Path) -> Result<HashMap<String, FillMap>> {
    let mut archive = ZipArchive::new(File::open(path)?)?;
    let Some(styles) = read_part(&mut archive, "xl/styles.xml")? else {
        return Ok(HashMap::new());
    };
    let style_fills = style_fills(&styles)?;
    if style_fills.iter().all(Option::is_none) {
        return Ok(HashMap::new());
    }

    let workbook = read_part(&mut archive, "xl/workbook.xml")?.unwrap_or_default();
    let rels = read_part(&mut archive, "xl/_rels/workbook.xml.rels")?.unwrap_or_default();
    let targets = relationship_targets(&rels)?;

    let mut out = HashMap::new();
    for (name, rel_id) in sheet_relationships(&workbook)? {
        let Some(target) = targets.get(&rel_id) else {
            continue;
        };
        let Some(xml) = read_part(&mut archive, &part_path(target))? else {
            continue;
        };
        let fills = cell_fills(&xml, &style_fills)?;
        if !fills.is_empty() {
            out.insert(name, fills);
        }
    }
    Ok(out)
}

fn read_part<R: Read + Seek>(archive: &mut ZipArchive<R>, name: &str) -> Result<Option<String>> {
    let mut file = match archive.by_name(name) {
        Ok(file) => file,
        Err(ZipError::FileNotFound) => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let mut text = String::new();
    file.read_to_string(&mut text)?;
    Ok(Some(text))
}

/// Relationship targets are relative to `xl/` unless absolute.
fn part_path(target: &str) -> String {
    match target.strip_prefix('/') {
        Some(absolute) => absolute.to_string(),
        None => format!("xl/{}", target),
    }
}

fn attribute(e: &BytesStart, local_name: &[u8]) -> Result<Option<String>> {
    for attr in e.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == local_name {
            let value = match attr.unescape_value() {
                Ok(v) => v.into_owned(),
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            return Ok(Some(value));
        }
    }
    Ok(None)
}

/// `FFRRGGBB` or `RRGGBB` to `#RRGGBB`.
fn rgb_hex(argb: &str) -> Option<String> {
    let rgb = match argb.len() {
        8 => &argb[2..],
        6 => argb,
        _ => return None,
    };
    rgb.chars()
        .all(|c| c.is_ascii_hexdigit())
        .then(|| format!("#{}", rgb.to_ascii_uppercase()))
}

/// Colour of each cell style (`cellXfs` entry), `None` when unfilled.
/// Theme and indexed colours are not resolved.
fn style_fills(xml: &str) -> Result<Vec<Option<String>>> {
    let mut reader = Reader::from_str(xml);
    let mut fills: Vec<Option<String>> = Vec::new();
    let mut xf_fills: Vec<usize> = Vec::new();
    let mut in_fills = false;
    let mut in_cell_xfs = false;
    let mut patterned = false;

    loop {
        match reader.read_event()? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"fills" => in_fills = true,
                b"cellXfs" => in_cell_xfs = true,
                b"fill" if in_fills => fills.push(None),
                b"patternFill" if in_fills => {
                    patterned = attribute(&e, b"patternType")?
                        .is_some_and(|pattern| pattern != "none");
                }
                b"xf" if in_cell_xfs => xf_fills.push(fill_id(&e)?),
                _ => {}
            },
            Event::Empty(e) => match e.local_name().as_ref() {
                b"fill" if in_fills => fills.push(None),
                b"fgColor" if in_fills && patterned => {
                    let color = attribute(&e, b"rgb")?.and_then(|argb| rgb_hex(&argb));
                    if let Some(fill) = fills.last_mut() {
                        *fill = color;
                    }
                }
                b"xf" if in_cell_xfs => xf_fills.push(fill_id(&e)?),
                _ => {}
            },
            Event::End(e) => match e.local_name().as_ref() {
                b"fills" => in_fills = false,
                b"cellXfs" => in_cell_xfs = false,
                b"patternFill" => patterned = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(xf_fills
        .into_iter()
        .map(|id| fills.get(id).cloned().flatten())
        .collect())
}

fn fill_id(e: &BytesStart) -> Result<usize> {
    Ok(attribute(e, b"fillId")?
        .and_then(|id| id.parse().ok())
        .unwrap_or(0))
}

/// Relationship id to target from `workbook.xml.rels`.
fn relationship_targets(xml: &str) -> Result<HashMap<String, String>> {
    let mut reader = Reader::from_str(xml);
    let mut targets = HashMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"Relationship" => {
                if let (Some(id), Some(target)) = (attribute(&e, b"Id")?, attribute(&e, b"Target")?)
                {
                    targets.insert(id, target);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(targets)
}

/// `(sheet name, relationship id)` in workbook order.
fn sheet_relationships(xml: &str) -> Result<Vec<(String, String)>> {
    let mut reader = Reader::from_str(xml);
    let mut sheets = Vec::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"sheet" => {
                if let (Some(name), Some(id)) = (attribute(&e, b"name")?, attribute(&e, b"id")?) {
                    sheets.push((name, id));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(sheets)
}

/// `B12` to zero-based `(11, 1)`.
fn cell_position(reference: &str) -> Option<(usize, usize)> {
    let split = reference.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = reference.split_at(split);
    if letters.is_empty() {
        return None;
    }
    let mut col = 0usize;
    for c in letters.chars() {
        if !c.is_ascii_uppercase() {
            return None;
        }
        col = col * 26 + (c as usize - 'A' as usize + 1);
    }
    let row = digits.parse::<usize>().ok()?;
    Some((row.checked_sub(1)?, col - 1))
}

fn cell_fills(xml: &str, style_fills: &[Option<String>]) -> Result<FillMap> {
    let mut reader = Reader::from_str(xml);
    let mut fills = FillMap::new();
    loop {
        match reader.read_event()? {
            Event::Start(e) | Event::Empty(e) if e.local_name().as_ref() == b"c" => {
                let color = attribute(&e, b"s")?
                    .and_then(|s| s.parse::<usize>().ok())
                    .and_then(|s| style_fills.get(s).cloned().flatten());
                let position = attribute(&e, b"r")?.and_then(|r| cell_position(&r));
                if let (Some(color), Some(position)) = (color, position) {
                    fills.insert(position, color);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }
    Ok(fills)
}
