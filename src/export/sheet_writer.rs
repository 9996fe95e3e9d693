//! Regenerates the cell data of a modified worksheet part.
//!
//! The original sheet XML is kept and only `<sheetData>` and `<dimension>`
//! are replaced, so columns, views and everything else the model does not
//! know about survive. Strings are written inline (`t="inlineStr"`) to avoid
//! rebuilding the shared string table.

use quick_xml::escape::escape;
use regex::{NoExpand, Regex};
use std::fmt::Write as _;
use std::sync::OnceLock;

use crate::cell_ref::col_to_letter;
use crate::error::Result;
use crate::numfmt::datetime_to_serial;
use crate::types::{Cell, CellValue, Sheet};
use crate::workbook_meta::DateSystem;

fn sheet_data_regex() -> Result<&'static Regex> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = RE.get() {
        return Ok(re);
    }
    let re = Regex::new(r"(?s)<sheetData\b[^>]*/>|<sheetData\b[^>]*>.*?</sheetData>")?;
    Ok(RE.get_or_init(|| re))
}

fn dimension_regex() -> Result<&'static Regex> {
    static RE: OnceLock<Regex> = OnceLock::new();
    if let Some(re) = RE.get() {
        return Ok(re);
    }
    let re = Regex::new(r"<dimension\b[^>]*/>")?;
    Ok(RE.get_or_init(|| re))
}

/// Replace the cell data of `original` sheet XML with the contents of `sheet`.
///
/// A part without `<sheetData>` is replaced by a minimal worksheet.
pub(crate) fn patch_sheet_xml(original: &str, sheet: &Sheet, dates: DateSystem) -> Result<String> {
    let data = sheet_data_xml(sheet, dates);
    let sheet_data = sheet_data_regex()?;
    if !sheet_data.is_match(original) {
        tracing::warn!(sheet = %sheet.name, "sheet part has no sheetData, rewriting it whole");
        return Ok(write_sheet_xml(sheet, dates));
    }

    let patched = sheet_data.replace(original, NoExpand(&data));
    let dimension = dimension_xml(sheet);
    Ok(dimension_regex()?
        .replace(&patched, NoExpand(&dimension))
        .into_owned())
}

/// Write a complete minimal worksheet part.
pub(crate) fn write_sheet_xml(sheet: &Sheet, dates: DateSystem) -> String {
    let mut out = String::with_capacity(4096);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(
        r#"<worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" "#,
    );
    out.push_str(
        r#"xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">"#,
    );
    out.push_str(&dimension_xml(sheet));
    out.push_str(&sheet_data_xml(sheet, dates));
    out.push_str("</worksheet>");
    out
}

fn dimension_xml(sheet: &Sheet) -> String {
    let b = sheet.bounds();
    format!(
        "<dimension ref=\"{}{}:{}{}\"/>",
        col_to_letter(b.min_col),
        b.min_row,
        col_to_letter(b.max_col),
        b.max_row
    )
}

/// `<sheetData>` with one `<row>` per row holding cells or row properties.
fn sheet_data_xml(sheet: &Sheet, dates: DateSystem) -> String {
    let mut rows: Vec<u32> = sheet.cells().map(|((row, _), _)| row).collect();
    rows.extend(sheet.row_heights.iter().map(|rh| rh.row));
    rows.extend(sheet.hidden_rows.iter().copied());
    rows.sort_unstable();
    rows.dedup();

    let mut out = String::from("<sheetData>");
    let mut cells = sheet.cells().peekable();
    for row in rows {
        let _ = write!(out, "<row r=\"{row}\"");
        if let Some(rh) = sheet.row_heights.iter().find(|rh| rh.row == row) {
            let _ = write!(out, " ht=\"{}\" customHeight=\"1\"", rh.height);
        }
        if sheet.hidden_rows.contains(&row) {
            out.push_str(" hidden=\"1\"");
        }
        out.push('>');
        while let Some(((_, col), cell)) = cells.next_if(|((r, _), _)| *r == row) {
            write_cell(&mut out, row, col, cell, dates);
        }
        out.push_str("</row>");
    }
    out.push_str("</sheetData>");
    out
}

/// Write a single `<c>` element. Cells holding only a comment are skipped.
fn write_cell(out: &mut String, row: u32, col: u32, cell: &Cell, dates: DateSystem) {
    if cell.value.is_none() && cell.formula.is_none() && cell.style_idx.is_none() {
        return;
    }

    let _ = write!(out, "<c r=\"{}{row}\"", col_to_letter(col));
    if let Some(s) = cell.style_idx {
        let _ = write!(out, " s=\"{s}\"");
    }

    let formula = cell
        .formula
        .as_deref()
        .map(|f| format!("<f>{}</f>", escape(f)))
        .unwrap_or_default();

    match &cell.value {
        None if formula.is_empty() => out.push_str("/>"),
        None => {
            let _ = write!(out, ">{formula}</c>");
        }
        Some(CellValue::Text(s)) if formula.is_empty() => {
            let _ = write!(
                out,
                " t=\"inlineStr\"><is><t xml:space=\"preserve\">{}</t></is></c>",
                escape(s.as_str())
            );
        }
        Some(CellValue::Text(s)) => {
            let _ = write!(out, " t=\"str\">{formula}<v>{}</v></c>", escape(s.as_str()));
        }
        Some(CellValue::Number(n)) => {
            let _ = write!(out, ">{formula}<v>{n}</v></c>");
        }
        Some(CellValue::DateTime(dt)) => {
            let serial = datetime_to_serial(*dt, dates);
            let _ = write!(out, ">{formula}<v>{serial}</v></c>");
        }
        Some(CellValue::Bool(b)) => {
            let _ = write!(out, " t=\"b\">{formula}<v>{}</v></c>", u8::from(*b));
        }
        Some(CellValue::Error(e)) => {
            let _ = write!(out, " t=\"e\">{formula}<v>{}</v></c>", escape(e.as_str()));
        }
    }
}

/// Write a comments part for the comments of `sheet`.
pub(crate) fn write_comments_xml(sheet: &Sheet) -> String {
    let mut authors: Vec<&str> = Vec::new();
    let mut list = String::new();
    for ((row, col), cell) in sheet.cells() {
        let Some(comment) = &cell.comment else {
            continue;
        };
        let author = comment.author.as_deref().unwrap_or("");
        let author_id = match authors.iter().position(|a| *a == author) {
            Some(id) => id,
            None => {
                authors.push(author);
                authors.len() - 1
            }
        };
        let _ = write!(
            list,
            "<comment ref=\"{}{row}\" authorId=\"{author_id}\"><text><t xml:space=\"preserve\">{}</t></text></comment>",
            col_to_letter(col),
            escape(comment.text.as_str())
        );
    }

    let mut out = String::with_capacity(list.len() + 256);
    out.push_str(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>"#);
    out.push('\n');
    out.push_str(r#"<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><authors>"#);
    for author in authors {
        let _ = write!(out, "<author>{}</author>", escape(author));
    }
    out.push_str("</authors><commentList>");
    out.push_str(&list);
    out.push_str("</commentList></comments>");
    out
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::types::{Comment, RowHeight};
    use chrono::NaiveDate;

    fn sample() -> Sheet {
        let mut sheet = Sheet::new("Sheet1");
        sheet.set_value(2, 2, Some("a<b & c".into()));
        sheet.set_value(2, 3, Some(CellValue::Number(1.5)));
        sheet.set_value(3, 2, Some(CellValue::Bool(true)));
        sheet.set_value(
            3,
            3,
            Some(NaiveDate::from_ymd_opt(1990, 5, 17).unwrap().into()),
        );
        sheet.set_style(4, 2, 3);
        sheet.set_formula(4, 3, "=SUM(C2:C3)");
        sheet.row_heights.push(RowHeight {
            row: 5,
            height: 30.0,
        });
        sheet
    }

    #[test]
    fn test_sheet_data() {
        let xml = sheet_data_xml(&sample(), DateSystem::Date1900);
        assert!(xml.contains(
            r#"<c r="B2" t="inlineStr"><is><t xml:space="preserve">a&lt;b &amp; c</t></is></c>"#
        ));
        assert!(xml.contains(r#"<c r="C2"><v>1.5</v></c>"#));
        assert!(xml.contains(r#"<c r="B3" t="b"><v>1</v></c>"#));
        assert!(xml.contains(r#"<c r="C3"><v>33010</v></c>"#));
        assert!(xml.contains(r#"<c r="B4" s="3"/>"#));
        assert!(xml.contains(r#"<c r="C4"><f>SUM(C2:C3)</f></c>"#));
        assert!(xml.contains(r#"<row r="5" ht="30" customHeight="1"></row>"#));
    }

    #[test]
    fn test_patch_keeps_surrounding_xml() {
        let original = r#"<?xml version="1.0"?><worksheet xmlns="x"><dimension ref="A1:Z99"/><cols><col min="1" max="1" width="20"/></cols><sheetData><row r="1"><c r="A1"><v>9</v></c></row></sheetData><mergeCells count="1"><mergeCell ref="A1:B1"/></mergeCells></worksheet>"#;
        let patched = patch_sheet_xml(original, &sample(), DateSystem::Date1900).unwrap();
        assert!(patched.contains(r#"<dimension ref="B2:C4"/>"#));
        assert!(patched.contains(r#"<cols><col min="1" max="1" width="20"/></cols>"#));
        assert!(patched.contains(r#"<mergeCell ref="A1:B1"/>"#));
        assert!(!patched.contains(r#"<c r="A1">"#));
        assert_eq!(patched.matches("<sheetData>").count(), 1);
    }

    #[test]
    fn test_patch_empty_sheet_data() {
        let original = r#"<worksheet><sheetData/></worksheet>"#;
        let patched = patch_sheet_xml(original, &sample(), DateSystem::Date1900).unwrap();
        assert!(patched.starts_with("<worksheet><sheetData><row r=\"2\">"));
    }

    #[test]
    fn test_comments_xml() {
        let mut sheet = Sheet::new("Sheet1");
        let note = |author: Option<&str>, text: &str| Comment {
            author: author.map(str::to_string),
            text: text.to_string(),
        };
        sheet.set_comment(10, 3, note(Some("Jane"), "keep"));
        sheet.set_comment(12, 4, note(Some("Jane"), "x & y"));
        let xml = write_comments_xml(&sheet);
        assert_eq!(xml.matches("<author>").count(), 1);
        assert!(xml.contains(r#"<comment ref="C10" authorId="0">"#));
        assert!(xml.contains("x &amp; y"));
    }
}
