//! In-memory worksheets read through calamine.

use std::collections::HashMap;
use std::path::Path;

use calamine::{open_workbook_auto, DataType, Reader};
use tracing::warn;

use crate::styles::{read_fills, FillMap};
use crate::{ImportError, Result};

/// One spreadsheet cell. Blank cells and the literal text `None` have no value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cell {
    pub value: Option<String>,
    /// Fill colour as `#rrggbb`, when the reader knows it.
    pub fill: Option<String>,
}

impl Cell {
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        let value = match raw.as_str() {
            "" | "None" => None,
            _ => Some(raw),
        };
        Self { value, fill: None }
    }

    pub fn with_fill(mut self, fill: impl Into<String>) -> Self {
        self.fill = Some(fill.into());
        self
    }

    pub fn text(&self) -> Option<&str> {
        self.value.as_deref()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Sheet {
    pub name: String,
    pub rows: Vec<Vec<Cell>>,
}

impl Sheet {
    /// Build a sheet from plain strings; handy for tests and generated data.
    pub fn from_rows(name: &str, rows: &[&[&str]]) -> Self {
        Self {
            name: name.to_string(),
            rows: rows
                .iter()
                .map(|row| row.iter().map(|v| Cell::new(*v)).collect())
                .collect(),
        }
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Cell> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    pub fn text(&self, row: usize, col: usize) -> Option<&str> {
        self.cell(row, col).and_then(Cell::text)
    }

    /// Header labels of the first row; blank headers become "".
    pub fn header(&self) -> Vec<String> {
        self.rows
            .first()
            .map(|row| {
                row.iter()
                    .map(|c| c.text().unwrap_or_default().to_string())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Rows after the header.
    pub fn data_rows(&self) -> impl Iterator<Item = &[Cell]> {
        self.rows.iter().skip(1).map(Vec::as_slice)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
}

impl Workbook {
    /// Read every worksheet of an `.xlsx`/`.xls`/`.ods` file.
    ///
    /// Fill colours are only read for `.xlsx`; an unreadable styles part
    /// leaves them `None`.
    pub fn open(path: &Path) -> Result<Self> {
        let mut wb = open_workbook_auto(path)?;
        let mut sheets = Vec::new();

        for name in wb.sheet_names().to_vec() {
            let Some(range) = wb.worksheet_range(&name) else {
                continue;
            };
            let range = range?;

            // Keep A1-relative positions even when the used range starts later.
            let (row_offset, col_offset) = range
                .start()
                .map(|(r, c)| (r as usize, c as usize))
                .unwrap_or((0, 0));
            let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); row_offset];
            for row in range.rows() {
                let mut cells = vec![Cell::default(); col_offset];
                cells.extend(row.iter().map(|c| match c {
                    DataType::Empty => Cell::default(),
                    other => Cell::new(cell_to_string(other)),
                }));
                rows.push(cells);
            }
            sheets.push(Sheet { name, rows });
        }

        let mut workbook = Self { sheets };
        if is_xlsx(path) {
            match read_fills(path) {
                Ok(fills) => workbook.apply_fills(fills),
                Err(e) => warn!("{}: cell colours not read: {}", path.display(), e),
            }
        }
        Ok(workbook)
    }

    fn apply_fills(&mut self, mut fills: HashMap<String, FillMap>) {
        for sheet in &mut self.sheets {
            let Some(sheet_fills) = fills.remove(&sheet.name) else {
                continue;
            };
            for ((row, col), color) in sheet_fills {
                if let Some(cell) = sheet.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
                    cell.fill = Some(color);
                }
            }
        }
    }

    pub fn from_sheets(sheets: Vec<Sheet>) -> Self {
        Self { sheets }
    }

    pub fn sheet(&self, name: &str) -> Result<&Sheet> {
        self.sheets
            .iter()
            .find(|s| s.name == name)
            .ok_or_else(|| ImportError::MissingSheet(name.to_string()))
    }

    /// The first worksheet, which is the active one in files we receive.
    pub fn first(&self) -> Result<&Sheet> {
        self.sheets
            .first()
            .ok_or_else(|| ImportError::MissingSheet("<first>".to_string()))
    }
}

fn is_xlsx(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("xlsx") || e.eq_ignore_ascii_case("xlsm"))
}

fn cell_to_string(cell: &DataType) -> String {
    match cell {
        DataType::String(s) => s.clone(),
        DataType::Empty => String::new(),
        DataType::Bool(b) => b.to_string(),
        DataType::Error(e) => format!("ERR({e:?})"),
        // Whole numbers read back as integers, so "12" and 12.0 compare equal.
        DataType::Float(n) | DataType::Duration(n) | DataType::DateTime(n)
            if n.fract() == 0.0 && n.abs() < 1e15 =>
        {
            format!("{}", *n as i64)
        }
        DataType::Float(n) | DataType::Duration(n) | DataType::DateTime(n) => n.to_string(),
        DataType::Int(i) => i.to_string(),
        DataType::DateTimeIso(s) | DataType::DurationIso(s) => s.clone(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// One worksheet for [`write_xlsx`]: name, rows, and `(row, col, "#RRGGBB")` fills.
    pub(crate) type XlsxSheet<'a> = (&'a str, &'a [&'a [&'a str]], &'a [(usize, usize, &'a str)]);

    pub(crate) const NO_FILLS: &[(usize, usize, &str)] = &[];

    const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
    const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

    fn column_letters(mut col: usize) -> String {
        let mut letters = Vec::new();
        loop {
            letters.push((b'A' + (col % 26) as u8) as char);
            if col < 26 {
                break;
            }
            col = col / 26 - 1;
        }
        letters.iter().rev().collect()
    }

    fn escape(text: &str) -> String {
        text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
    }

    /// Write a minimal `.xlsx` package with shared strings and solid fills.
    pub(crate) fn write_xlsx(path: &Path, sheets: &[XlsxSheet]) {
        let mut strings: Vec<String> = Vec::new();
        let mut colors: Vec<String> = Vec::new();
        let mut worksheets = Vec::new();

        for (_, rows, fills) in sheets {
            for (_, _, color) in fills.iter() {
                if !colors.iter().any(|c| c == color) {
                    colors.push(color.to_string());
                }
            }
            let mut xml = format!(r#"<?xml version="1.0" encoding="UTF-8"?><worksheet xmlns="{MAIN_NS}"><sheetData>"#);
            let height = rows.len().max(fills.iter().map(|f| f.0 + 1).max().unwrap_or(0));
            for r in 0..height {
                xml.push_str(&format!(r#"<row r="{}">"#, r + 1));
                let width = rows.get(r).map_or(0, |row| row.len());
                let filled = fills.iter().filter(|f| f.0 == r).map(|f| f.1 + 1).max();
                let width = width.max(filled.unwrap_or(0));
                for c in 0..width {
                    let reference = format!("{}{}", column_letters(c), r + 1);
                    let style = fills
                        .iter()
                        .find(|f| f.0 == r && f.1 == c)
                        .and_then(|f| colors.iter().position(|color| color == f.2))
                        .map(|i| format!(r#" s="{}""#, i + 1))
                        .unwrap_or_default();
                    let text = rows.get(r).and_then(|row| row.get(c)).copied().unwrap_or("");
                    if text.is_empty() {
                        if !style.is_empty() {
                            xml.push_str(&format!(r#"<c r="{reference}"{style}/>"#));
                        }
                        continue;
                    }
                    let index = match strings.iter().position(|s| s == text) {
                        Some(i) => i,
                        None => {
                            strings.push(text.to_string());
                            strings.len() - 1
                        }
                    };
                    xml.push_str(&format!(r#"<c r="{reference}" t="s"{style}><v>{index}</v></c>"#));
                }
                xml.push_str("</row>");
            }
            xml.push_str("</sheetData></worksheet>");
            worksheets.push(xml);
        }

        let mut content_types = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#,
        );
        let mut workbook = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets>"#
        );
        let mut rels = String::from(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
        );
        for (i, (name, _, _)) in sheets.iter().enumerate() {
            let n = i + 1;
            content_types.push_str(&format!(
                r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
            ));
            workbook.push_str(&format!(r#"<sheet name="{}" sheetId="{n}" r:id="rId{n}"/>"#, escape(name)));
            rels.push_str(&format!(
                r#"<Relationship Id="rId{n}" Type="{REL_NS}/worksheet" Target="worksheets/sheet{n}.xml"/>"#
            ));
        }
        content_types.push_str("</Types>");
        workbook.push_str("</sheets></workbook>");
        let styles_id = sheets.len() + 1;
        rels.push_str(&format!(
            r#"<Relationship Id="rId{styles_id}" Type="{REL_NS}/styles" Target="styles.xml"/><Relationship Id="rId{}" Type="{REL_NS}/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#,
            styles_id + 1
        ));

        let mut styles = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><styleSheet xmlns="{MAIN_NS}"><fills count="{}"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill>"#,
            colors.len() + 2
        );
        for color in &colors {
            styles.push_str(&format!(
                r#"<fill><patternFill patternType="solid"><fgColor rgb="FF{}"/><bgColor indexed="64"/></patternFill></fill>"#,
                color.trim_start_matches('#')
            ));
        }
        styles.push_str(&format!(
            r#"</fills><cellXfs count="{}"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>"#,
            colors.len() + 1
        ));
        for i in 0..colors.len() {
            styles.push_str(&format!(
                r#"<xf numFmtId="0" fontId="0" fillId="{}" borderId="0" xfId="0" applyFill="1"/>"#,
                i + 2
            ));
        }
        styles.push_str("</cellXfs></styleSheet>");

        let mut shared = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><sst xmlns="{MAIN_NS}" count="{0}" uniqueCount="{0}">"#,
            strings.len()
        );
        for text in &strings {
            shared.push_str(&format!("<si><t>{}</t></si>", escape(text)));
        }
        shared.push_str("</sst>");

        let root_rels = format!(
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/officeDocument" Target="xl/workbook.xml"/></Relationships>"#
        );

        let mut parts = vec![
            ("[Content_Types].xml".to_string(), content_types),
            ("_rels/.rels".to_string(), root_rels),
            ("xl/workbook.xml".to_string(), workbook),
            ("xl/_rels/workbook.xml.rels".to_string(), rels),
            ("xl/styles.xml".to_string(), styles),
            ("xl/sharedStrings.xml".to_string(), shared),
        ];
        for (i, xml) in worksheets.into_iter().enumerate() {
            parts.push((format!("xl/worksheets/sheet{}.xml", i + 1), xml));
        }

        let mut zip = zip::ZipWriter::new(std::fs::File::create(path).unwrap());
        let options = zip::write::FileOptions::default();
        for (name, xml) in parts {
            zip.start_file(name, options).unwrap();
            zip.write_all(xml.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn test_open_reads_fill_colours() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("design.xlsx");
        let notes: &[&[&str]] = &[&["Name"], &["x"]];
        let parts: &[&[&str]] = &[
            &["Part", "4bp overhang upstream"],
            &["promoter", "GGAG"],
            &["cds", "TACT"],
        ];
        let fills: &[(usize, usize, &str)] =
            &[(1, 1, "#FFC000"), (2, 0, "#00B050"), (3, 1, "#FF0000")];
        write_xlsx(&path, &[("notes", notes, NO_FILLS), ("part_names_overlaps", parts, fills)]);

        let wb = Workbook::open(&path).unwrap();
        assert_eq!(wb.sheets.len(), 2);
        assert!(wb.sheet("notes").unwrap().rows.iter().flatten().all(|c| c.fill.is_none()));

        let parts = wb.sheet("part_names_overlaps").unwrap();
        assert_eq!(parts.text(1, 1), Some("GGAG"));
        assert_eq!(parts.cell(1, 1).unwrap().fill.as_deref(), Some("#FFC000"));
        assert_eq!(parts.cell(2, 0).unwrap().fill.as_deref(), Some("#00B050"));
        assert_eq!(parts.cell(2, 1).unwrap().fill, None);
        assert_eq!(parts.cell(0, 1).unwrap().fill, None);
    }

    #[test]
    fn test_absent_cells() {
        assert_eq!(Cell::new("").value, None);
        assert_eq!(Cell::new("None").value, None);
        assert_eq!(Cell::new(" ").text(), Some(" "));
        assert_eq!(Cell::new("KanR").text(), Some("KanR"));
    }

    #[test]
    fn test_sheet_access() {
        let sheet = Sheet::from_rows(
            "plasmids",
            &[&["Name", "AMD number", ""], &["pAMD1", "AMD1", "None"]],
        );
        assert_eq!(sheet.header(), vec!["Name", "AMD number", ""]);
        assert_eq!(sheet.text(1, 1), Some("AMD1"));
        assert_eq!(sheet.text(1, 2), None);
        assert_eq!(sheet.text(5, 0), None);
        assert_eq!(sheet.data_rows().count(), 1);
    }

    #[test]
    fn test_whole_floats_render_as_integers() {
        assert_eq!(cell_to_string(&DataType::Float(12.0)), "12");
        assert_eq!(cell_to_string(&DataType::Float(0.5)), "0.5");
        assert_eq!(cell_to_string(&DataType::Int(7)), "7");
    }

    #[test]
    fn test_missing_sheet() {
        let wb = Workbook::from_sheets(vec![Sheet::from_rows("a", &[&["x"]])]);
        assert!(wb.sheet("a").is_ok());
        assert!(matches!(wb.sheet("b"), Err(ImportError::MissingSheet(_))));
        assert!(Workbook::default().first().is_err());
    }

    #[test]
    fn test_open_rejects_non_spreadsheet() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.xlsx");
        std::fs::write(&path, b"not a zip archive").unwrap();
        assert!(Workbook::open(&path).is_err());
    }
}
