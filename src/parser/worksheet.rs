//! Worksheet parsing - reads a sheet part's `<sheetData>` into a [`Sheet`].

use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

use crate::cell_ref::parse_cell_ref_bytes;
use crate::error::Result;
use crate::types::{Cell, RowHeight, Sheet};
use crate::workbook_meta::{DateSystem, SheetInfo};
use crate::xml_helpers::{attr_bool, attr_f64, attr_string};

use super::styles::{resolve_cell_value, DateStyles};

/// Cell type tag from the `t` attribute of a `<c>` element.
#[derive(Copy, Clone, Debug)]
pub(super) enum CellTypeTag {
    Shared,
    Inline,
    Str,
    Bool,
    Error,
    Default,
}

pub(super) fn parse_cell_type_tag(value: &[u8]) -> CellTypeTag {
    match value {
        b"s" => CellTypeTag::Shared,
        b"b" => CellTypeTag::Bool,
        b"e" => CellTypeTag::Error,
        b"str" => CellTypeTag::Str,
        b"inlineStr" => CellTypeTag::Inline,
        _ => CellTypeTag::Default,
    }
}

pub(super) fn parse_u32_bytes(value: &[u8]) -> Option<u32> {
    let mut num: u32 = 0;
    let mut seen = false;
    for &b in value {
        if !b.is_ascii_digit() {
            return None;
        }
        seen = true;
        num = num.saturating_mul(10).saturating_add(u32::from(b - b'0'));
    }
    seen.then_some(num)
}

/// Shared inputs for typing cell values.
pub(super) struct ValueContext<'a> {
    pub shared_strings: &'a [String],
    pub date_styles: &'a DateStyles,
    pub date_system: DateSystem,
}

/// Attributes and children of one `<c>` element.
#[derive(Default)]
struct RawCell {
    col: Option<u32>,
    row: Option<u32>,
    style_idx: Option<u32>,
    value: Option<String>,
    formula: Option<String>,
}

/// Parse a single worksheet part.
pub(super) fn parse_sheet<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    info: &SheetInfo,
    ctx: &ValueContext<'_>,
) -> Result<Sheet> {
    let file = archive.by_name(&info.path)?;
    let mut sheet = parse_sheet_xml(BufReader::new(file), ctx)?;
    sheet.name.clone_from(&info.name);
    Ok(sheet)
}

pub(super) fn parse_sheet_xml<B: BufRead>(reader: B, ctx: &ValueContext<'_>) -> Result<Sheet> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut sheet = Sheet::default();
    let mut buf = Vec::new();
    let mut current_row: u32 = 0;
    let mut next_col: u32 = 1;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(ref event @ (Event::Start(_) | Event::Empty(_))) => {
                let (Event::Start(ref e) | Event::Empty(ref e)) = event else {
                    continue;
                };
                let is_start_event = matches!(event, Event::Start(_));

                match e.local_name().as_ref() {
                    b"row" => {
                        current_row = attr_string(e, b"r")
                            .and_then(|r| r.parse().ok())
                            .unwrap_or(current_row.saturating_add(1));
                        next_col = 1;
                        if let Some(ht) = attr_f64(e, b"ht") {
                            sheet.row_heights.push(RowHeight {
                                row: current_row,
                                height: ht,
                            });
                        }
                        if attr_bool(e, b"hidden").unwrap_or(false) {
                            sheet.hidden_rows.push(current_row);
                        }
                    }
                    b"c" => {
                        let mut raw = RawCell::default();
                        let mut cell_type = CellTypeTag::Default;
                        for attr in e.attributes().flatten() {
                            match attr.key.as_ref() {
                                b"r" => {
                                    if let Some((c, r)) = parse_cell_ref_bytes(&attr.value) {
                                        raw.col = Some(c);
                                        raw.row = Some(r);
                                    }
                                }
                                b"t" => cell_type = parse_cell_type_tag(&attr.value),
                                b"s" => raw.style_idx = parse_u32_bytes(&attr.value),
                                _ => {}
                            }
                        }
                        if is_start_event {
                            read_cell_children(&mut xml, &mut raw)?;
                        }

                        let row = raw.row.unwrap_or(current_row).max(1);
                        let col = raw.col.unwrap_or(next_col);
                        next_col = col.saturating_add(1);

                        let value = resolve_cell_value(
                            raw.value.as_deref(),
                            cell_type,
                            ctx.shared_strings,
                            raw.style_idx,
                            ctx.date_styles,
                            ctx.date_system,
                        );
                        sheet.put_cell(
                            row,
                            col,
                            Cell {
                                value,
                                formula: raw.formula,
                                style_idx: raw.style_idx,
                                comment: None,
                            },
                        );
                    }
                    _ => {}
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(sheet)
}

/// Read `<v>`, `<f>` and `<is>` children up to the closing `</c>`.
///
/// Dependents of a shared formula (`<f t="shared" si="0"/>`) carry no text
/// and keep only their cached value.
fn read_cell_children<B: BufRead>(xml: &mut Reader<B>, raw: &mut RawCell) -> Result<()> {
    let mut buf = Vec::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref inner)) => match inner.local_name().as_ref() {
                b"v" => raw.value = Some(read_text(xml, b"v")?),
                b"f" => {
                    let text = read_text(xml, b"f")?;
                    raw.formula = (!text.is_empty()).then_some(text);
                }
                b"is" => raw.value = Some(read_inline_string(xml)?),
                _ => {}
            },
            Ok(Event::End(ref inner)) if inner.local_name().as_ref() == b"c" => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(())
}

/// Text content up to the closing tag `end`.
fn read_text<B: BufRead>(xml: &mut Reader<B>, end: &[u8]) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Text(ref t)) => text.push_str(&t.unescape()?),
            Ok(Event::CData(ref t)) => text.push_str(&String::from_utf8_lossy(t)),
            Ok(Event::End(ref e)) if e.local_name().as_ref() == end => break,
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
}

/// `<is>` content: plain `<t>` or rich-text runs, phonetic runs skipped.
fn read_inline_string<B: BufRead>(xml: &mut Reader<B>) -> Result<String> {
    let mut buf = Vec::new();
    let mut text = String::new();
    let mut in_phonetic = false;
    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"t" if !in_phonetic => text.push_str(&read_text(xml, b"t")?),
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"rPh" => in_phonetic = false,
                b"is" => break,
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }
    Ok(text)
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
    use crate::types::CellValue;

    fn parse(xml: &str) -> Sheet {
        let styles = DateStyles::default();
        let strings = vec!["first_name".to_string(), "Hanson".to_string()];
        let ctx = ValueContext {
            shared_strings: &strings,
            date_styles: &styles,
            date_system: DateSystem::Date1900,
        };
        parse_sheet_xml(xml.as_bytes(), &ctx).unwrap()
    }

    #[test]
    fn test_cell_types() {
        let sheet = parse(
            r#"<worksheet><sheetData>
            <row r="3" ht="21.75" customHeight="1">
              <c r="B3" t="s"><v>0</v></c>
              <c r="C3" t="inlineStr"><is><r><t>Last </t></r><r><t>name</t></r></is></c>
              <c r="D3" t="b"><v>1</v></c>
              <c r="E3"><v>1.85</v></c>
              <c r="F3" t="e"><v>#N/A</v></c>
            </row>
            <row r="4" hidden="1"><c r="B4" t="s"><v>1</v></c></row>
            </sheetData></worksheet>"#,
        );
        assert_eq!(sheet.value(3, 2), Some(&CellValue::Text("first_name".into())));
        assert_eq!(sheet.value(3, 3), Some(&CellValue::Text("Last name".into())));
        assert_eq!(sheet.value(3, 4), Some(&CellValue::Bool(true)));
        assert_eq!(sheet.value(3, 5), Some(&CellValue::Number(1.85)));
        assert_eq!(sheet.value(3, 6), Some(&CellValue::Error("#N/A".into())));
        assert_eq!(sheet.value(4, 2), Some(&CellValue::Text("Hanson".into())));
        assert_eq!(sheet.row_heights.len(), 1);
        assert_eq!(sheet.row_heights[0].row, 3);
        assert_eq!(sheet.hidden_rows, vec![4]);
    }

    #[test]
    fn test_formulas_and_styles() {
        let sheet = parse(
            r#"<worksheet><sheetData><row r="1">
              <c r="A1" s="2"/>
              <c r="B1"><f>SUM(A2:A9)</f><v>12</v></c>
              <c r="C1"><f t="shared" ref="C1:C2" si="0">B1*2</f><v>24</v></c>
              <c r="C2"><f t="shared" si="0"/><v>0</v></c>
            </row></sheetData></worksheet>"#,
        );
        let a1 = sheet.cell(1, 1).unwrap();
        assert_eq!(a1.style_idx, Some(2));
        assert!(a1.value.is_none());
        assert_eq!(sheet.cell(1, 2).unwrap().formula.as_deref(), Some("SUM(A2:A9)"));
        assert_eq!(sheet.cell(1, 3).unwrap().formula.as_deref(), Some("B1*2"));
        let c2 = sheet.cell(2, 3).unwrap();
        assert!(c2.formula.is_none());
        assert_eq!(c2.value, Some(CellValue::Number(0.0)));
    }

    #[test]
    fn test_missing_references() {
        let sheet = parse(
            r#"<worksheet><sheetData>
              <row><c><v>1</v></c><c><v>2</v></c></row>
              <row><c r="C2"><v>3</v></c><c><v>4</v></c></row>
            </sheetData></worksheet>"#,
        );
        assert_eq!(sheet.value(1, 1), Some(&CellValue::Number(1.0)));
        assert_eq!(sheet.value(1, 2), Some(&CellValue::Number(2.0)));
        assert_eq!(sheet.value(2, 4), Some(&CellValue::Number(4.0)));
    }

    #[test]
    fn test_escaped_text() {
        let sheet = parse(
            r#"<worksheet><sheetData><row r="1">
              <c r="A1" t="str"><f>"a"&amp;"b"</f><v>a&amp;b</v></c>
            </row></sheetData></worksheet>"#,
        );
        let a1 = sheet.cell(1, 1).unwrap();
        assert_eq!(a1.value, Some(CellValue::Text("a&b".into())));
        assert_eq!(a1.formula.as_deref(), Some("\"a\"&\"b\""));
    }
}
