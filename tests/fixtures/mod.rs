//! Test fixtures for generating valid XLSX files in memory.
//!
//! # Example
//!
//! ```rust,ignore
//! use fixtures::{SheetBuilder, XlsxBuilder};
//!
//! let xlsx = XlsxBuilder::new()
//!     .sheet(SheetBuilder::new("Sheet1").cell("B3", "First name").date("B4", 33010.0))
//!     .define_name("table_people", "Sheet1!$B$3")
//!     .build();
//!
//! let workbook = xltemplate::parser::parse(&xlsx).unwrap();
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use std::io::{Cursor, Write};
use zip::write::FileOptions;
use zip::ZipWriter;

/// Built-in short date format (`numFmtId` 14).
pub const STYLE_DATE: u32 = 1;
/// A fill-only style: makes an otherwise empty cell occupied.
pub const STYLE_FILL: u32 = 2;
/// Custom `yyyy-mm-dd hh:mm` format.
pub const STYLE_DATETIME: u32 = 3;

// ============================================================================
// Cell values
// ============================================================================

/// Cell value for fixture building.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    String(String),
    Number(f64),
    Boolean(bool),
    /// Formula text (without `=`) and cached numeric result.
    Formula(String, f64),
    Empty,
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::String(s.to_string())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::String(s)
    }
}

impl From<f64> for CellValue {
    fn from(n: f64) -> Self {
        CellValue::Number(n)
    }
}

impl From<i32> for CellValue {
    fn from(n: i32) -> Self {
        CellValue::Number(f64::from(n))
    }
}

impl From<bool> for CellValue {
    fn from(b: bool) -> Self {
        CellValue::Boolean(b)
    }
}

// ============================================================================
// Sheet Builder
// ============================================================================

#[derive(Debug, Clone)]
pub struct CellEntry {
    pub col: u32,
    pub row: u32,
    pub value: CellValue,
    pub style: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct RowProps {
    pub row: u32,
    pub height: Option<f64>,
    pub hidden: bool,
}

#[derive(Debug, Clone)]
pub struct CommentEntry {
    pub cell_ref: String,
    pub author: String,
    pub text: String,
}

/// Builder for a single worksheet.
#[derive(Debug, Clone, Default)]
pub struct SheetBuilder {
    pub name: String,
    pub cells: Vec<CellEntry>,
    pub rows: Vec<RowProps>,
    pub comments: Vec<CommentEntry>,
    pub merges: Vec<String>,
}

fn split_ref(cell_ref: &str) -> (u32, u32) {
    xltemplate::cell_ref::parse_cell_ref(cell_ref).expect("valid cell reference")
}

impl SheetBuilder {
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    fn push(mut self, cell_ref: &str, value: CellValue, style: Option<u32>) -> Self {
        let (col, row) = split_ref(cell_ref);
        self.cells.retain(|c| (c.col, c.row) != (col, row));
        self.cells.push(CellEntry {
            col,
            row,
            value,
            style,
        });
        self
    }

    #[must_use]
    pub fn cell<V: Into<CellValue>>(self, cell_ref: &str, value: V) -> Self {
        self.push(cell_ref, value.into(), None)
    }

    /// Serial date number formatted with the built-in date style.
    #[must_use]
    pub fn date(self, cell_ref: &str, serial: f64) -> Self {
        self.push(cell_ref, CellValue::Number(serial), Some(STYLE_DATE))
    }

    #[must_use]
    pub fn formula(self, cell_ref: &str, formula: &str, cached: f64) -> Self {
        self.push(
            cell_ref,
            CellValue::Formula(formula.to_string(), cached),
            None,
        )
    }

    /// A cell with a style but no value.
    #[must_use]
    pub fn styled_cell(self, cell_ref: &str, style: u32) -> Self {
        self.push(cell_ref, CellValue::Empty, Some(style))
    }

    #[must_use]
    pub fn styled<V: Into<CellValue>>(self, cell_ref: &str, value: V, style: u32) -> Self {
        self.push(cell_ref, value.into(), Some(style))
    }

    /// Lay out `values` from `start` to the right.
    #[must_use]
    pub fn row_values<V: Into<CellValue> + Clone>(mut self, start: &str, values: &[V]) -> Self {
        let (col, row) = split_ref(start);
        for (offset, value) in (0u32..).zip(values) {
            let cell_ref = format!(
                "{}{}",
                xltemplate::cell_ref::col_to_letter(col + offset),
                row
            );
            self = self.cell(&cell_ref, value.clone());
        }
        self
    }

    #[must_use]
    pub fn row_height(mut self, row: u32, height: f64) -> Self {
        self.rows.push(RowProps {
            row,
            height: Some(height),
            hidden: false,
        });
        self
    }

    #[must_use]
    pub fn hide_row(mut self, row: u32) -> Self {
        self.rows.push(RowProps {
            row,
            height: None,
            hidden: true,
        });
        self
    }

    #[must_use]
    pub fn comment(mut self, cell_ref: &str, author: &str, text: &str) -> Self {
        self.comments.push(CommentEntry {
            cell_ref: cell_ref.to_string(),
            author: author.to_string(),
            text: text.to_string(),
        });
        self
    }

    #[must_use]
    pub fn merge(mut self, range: &str) -> Self {
        self.merges.push(range.to_string());
        self
    }
}

// ============================================================================
// XLSX Builder
// ============================================================================

#[derive(Debug, Clone)]
struct NameEntry {
    name: String,
    value: String,
    local_sheet_id: Option<u32>,
}

/// Builder for creating complete XLSX files.
#[derive(Debug, Default)]
pub struct XlsxBuilder {
    sheets: Vec<SheetBuilder>,
    names: Vec<NameEntry>,
    date1904: bool,
}

impl XlsxBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn sheet(mut self, sheet: SheetBuilder) -> Self {
        self.sheets.push(sheet);
        self
    }

    /// Workbook-scoped defined name, e.g. `("table_people", "Sheet1!$B$3")`.
    #[must_use]
    pub fn define_name(mut self, name: &str, value: &str) -> Self {
        self.names.push(NameEntry {
            name: name.to_string(),
            value: value.to_string(),
            local_sheet_id: None,
        });
        self
    }

    /// Defined name scoped to the sheet at `sheet_id` (0-based).
    #[must_use]
    pub fn define_local_name(mut self, name: &str, value: &str, sheet_id: u32) -> Self {
        self.names.push(NameEntry {
            name: name.to_string(),
            value: value.to_string(),
            local_sheet_id: Some(sheet_id),
        });
        self
    }

    #[must_use]
    pub fn date1904(mut self) -> Self {
        self.date1904 = true;
        self
    }

    /// Build the XLSX file as bytes.
    #[must_use]
    pub fn build(self) -> Vec<u8> {
        let cursor = Cursor::new(Vec::new());
        let mut zip = ZipWriter::new(cursor);
        let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);

        let mut shared_strings: Vec<String> = Vec::new();
        for sheet in &self.sheets {
            for cell in &sheet.cells {
                if let CellValue::String(ref s) = cell.value {
                    if !shared_strings.contains(s) {
                        shared_strings.push(s.clone());
                    }
                }
            }
        }

        let mut write = |path: &str, content: String| {
            zip.start_file(path, options).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        };

        write("[Content_Types].xml", generate_content_types(&self.sheets));
        write("_rels/.rels", generate_rels());
        write(
            "xl/_rels/workbook.xml.rels",
            generate_workbook_rels(self.sheets.len()),
        );
        write("xl/workbook.xml", self.generate_workbook());
        write("xl/styles.xml", generate_styles());
        write("xl/sharedStrings.xml", generate_shared_strings(&shared_strings));

        for (i, sheet) in self.sheets.iter().enumerate() {
            let n = i + 1;
            write(
                &format!("xl/worksheets/sheet{n}.xml"),
                generate_sheet_xml(sheet, &shared_strings),
            );
            if !sheet.comments.is_empty() {
                write(
                    &format!("xl/worksheets/_rels/sheet{n}.xml.rels"),
                    generate_sheet_rels(n),
                );
                write(&format!("xl/comments{n}.xml"), generate_comments(sheet));
            }
        }

        zip.finish().expect("Failed to finish ZIP").into_inner()
    }

    fn generate_workbook(&self) -> String {
        let mut xml = String::new();
        xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
        xml.push_str(r#"<workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
        if self.date1904 {
            xml.push_str(r#"<workbookPr date1904="1"/>"#);
        }
        xml.push_str("<sheets>");
        for (i, sheet) in self.sheets.iter().enumerate() {
            xml.push_str(&format!(
                r#"<sheet name="{}" sheetId="{}" r:id="rId{}"/>"#,
                escape_xml(&sheet.name),
                i + 1,
                i + 1
            ));
        }
        xml.push_str("</sheets>");
        if !self.names.is_empty() {
            xml.push_str("<definedNames>");
            for dn in &self.names {
                let scope = dn
                    .local_sheet_id
                    .map(|id| format!(r#" localSheetId="{id}""#))
                    .unwrap_or_default();
                xml.push_str(&format!(
                    r#"<definedName name="{}"{scope}>{}</definedName>"#,
                    escape_xml(&dn.name),
                    escape_xml(&dn.value)
                ));
            }
            xml.push_str("</definedNames>");
        }
        xml.push_str("</workbook>");
        xml
    }
}

// ============================================================================
// Part generators
// ============================================================================

fn generate_content_types(sheets: &[SheetBuilder]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types">"#);
    xml.push_str(r#"<Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/>"#);
    xml.push_str(r#"<Default Extension="xml" ContentType="application/xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/>"#);
    xml.push_str(r#"<Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/>"#);
    for (i, sheet) in sheets.iter().enumerate() {
        let n = i + 1;
        xml.push_str(&format!(
            r#"<Override PartName="/xl/worksheets/sheet{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/>"#
        ));
        if !sheet.comments.is_empty() {
            xml.push_str(&format!(
                r#"<Override PartName="/xl/comments{n}.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.comments+xml"/>"#
            ));
        }
    }
    xml.push_str("</Types>");
    xml
}

fn generate_rels() -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    xml.push_str(r#"<Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/>"#);
    xml.push_str("</Relationships>");
    xml
}

fn generate_workbook_rels(sheet_count: usize) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(
        r#"<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships">"#,
    );
    for i in 1..=sheet_count {
        xml.push_str(&format!(
            r#"<Relationship Id="rId{i}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet{i}.xml"/>"#
        ));
    }
    let rid = sheet_count + 1;
    xml.push_str(&format!(
        r#"<Relationship Id="rId{rid}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/>"#
    ));
    xml.push_str(&format!(
        r#"<Relationship Id="rId{}" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/>"#,
        rid + 1
    ));
    xml.push_str("</Relationships>");
    xml
}

/// Fixed stylesheet: xf 0 default, then `STYLE_DATE`, `STYLE_FILL`,
/// `STYLE_DATETIME`.
fn generate_styles() -> String {
    r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
<numFmts count="1"><numFmt numFmtId="164" formatCode="yyyy\-mm\-dd\ hh:mm"/></numFmts>
<fonts count="1"><font><sz val="11"/><name val="Calibri"/></font></fonts>
<fills count="3"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill><fill><patternFill patternType="solid"><fgColor rgb="FFFFFF00"/></patternFill></fill></fills>
<borders count="1"><border><left/><right/><top/><bottom/><diagonal/></border></borders>
<cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs>
<cellXfs count="4">
<xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/>
<xf numFmtId="14" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
<xf numFmtId="0" fontId="0" fillId="2" borderId="0" xfId="0" applyFill="1"/>
<xf numFmtId="164" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/>
</cellXfs>
</styleSheet>"#
        .to_string()
}

fn generate_shared_strings(strings: &[String]) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(&format!(
        r#"<sst xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" count="{}" uniqueCount="{}">"#,
        strings.len(),
        strings.len()
    ));
    for s in strings {
        xml.push_str(&format!(
            r#"<si><t xml:space="preserve">{}</t></si>"#,
            escape_xml(s)
        ));
    }
    xml.push_str("</sst>");
    xml
}

fn generate_sheet_xml(sheet: &SheetBuilder, shared_strings: &[String]) -> String {
    let mut cells = sheet.cells.clone();
    cells.sort_by_key(|c| (c.row, c.col));

    let mut rows: Vec<u32> = cells.iter().map(|c| c.row).collect();
    rows.extend(sheet.rows.iter().map(|r| r.row));
    rows.sort_unstable();
    rows.dedup();

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#);
    if let (Some(first), Some(last)) = (cells.first(), cells.last()) {
        let max_col = cells.iter().map(|c| c.col).max().unwrap_or(first.col);
        let min_col = cells.iter().map(|c| c.col).min().unwrap_or(first.col);
        xml.push_str(&format!(
            r#"<dimension ref="{}{}:{}{}"/>"#,
            xltemplate::cell_ref::col_to_letter(min_col),
            first.row,
            xltemplate::cell_ref::col_to_letter(max_col),
            last.row
        ));
    }
    xml.push_str(r#"<cols><col min="1" max="1" width="4" customWidth="1"/></cols>"#);
    xml.push_str("<sheetData>");
    for row in rows {
        xml.push_str(&format!(r#"<row r="{row}""#));
        for props in sheet.rows.iter().filter(|r| r.row == row) {
            if let Some(ht) = props.height {
                xml.push_str(&format!(r#" ht="{ht}" customHeight="1""#));
            }
            if props.hidden {
                xml.push_str(r#" hidden="1""#);
            }
        }
        xml.push('>');
        for cell in cells.iter().filter(|c| c.row == row) {
            xml.push_str(&generate_cell(cell, shared_strings));
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    if !sheet.merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, sheet.merges.len()));
        for merge in &sheet.merges {
            xml.push_str(&format!(r#"<mergeCell ref="{merge}"/>"#));
        }
        xml.push_str("</mergeCells>");
    }
    if !sheet.comments.is_empty() {
        xml.push_str(r#"<legacyDrawing r:id="rId2"/>"#);
    }
    xml.push_str("</worksheet>");
    xml
}

fn generate_cell(cell: &CellEntry, shared_strings: &[String]) -> String {
    let cell_ref = format!(
        "{}{}",
        xltemplate::cell_ref::col_to_letter(cell.col),
        cell.row
    );
    let style = cell
        .style
        .map(|s| format!(r#" s="{s}""#))
        .unwrap_or_default();
    match &cell.value {
        CellValue::String(s) => {
            let idx = shared_strings.iter().position(|x| x == s).unwrap();
            format!(r#"<c r="{cell_ref}"{style} t="s"><v>{idx}</v></c>"#)
        }
        CellValue::Number(n) => format!(r#"<c r="{cell_ref}"{style}><v>{n}</v></c>"#),
        CellValue::Boolean(b) => format!(
            r#"<c r="{cell_ref}"{style} t="b"><v>{}</v></c>"#,
            u8::from(*b)
        ),
        CellValue::Formula(f, cached) => format!(
            r#"<c r="{cell_ref}"{style}><f>{}</f><v>{cached}</v></c>"#,
            escape_xml(f)
        ),
        CellValue::Empty => format!(r#"<c r="{cell_ref}"{style}/>"#),
    }
}

fn generate_sheet_rels(n: usize) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/comments" Target="../comments{n}.xml"/></Relationships>"#
    )
}

fn generate_comments(sheet: &SheetBuilder) -> String {
    let mut authors: Vec<&str> = Vec::new();
    for c in &sheet.comments {
        if !authors.contains(&c.author.as_str()) {
            authors.push(&c.author);
        }
    }

    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    xml.push_str(r#"<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors>"#);
    for a in &authors {
        xml.push_str(&format!("<author>{}</author>", escape_xml(a)));
    }
    xml.push_str("</authors><commentList>");
    for c in &sheet.comments {
        let author_id = authors.iter().position(|a| *a == c.author).unwrap();
        xml.push_str(&format!(
            r#"<comment ref="{}" authorId="{author_id}"><text><r><rPr><b/><sz val="9"/></rPr><t>{}:</t></r><r><t xml:space="preserve"> {}</t></r></text></comment>"#,
            c.cell_ref,
            escape_xml(&c.author),
            escape_xml(&c.text)
        ));
    }
    xml.push_str("</commentList></comments>");
    xml
}

/// Escape XML special characters.
pub fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
