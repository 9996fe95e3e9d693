//! Style lookups needed to type cell values.
//!
//! Only number formats matter here: a numeric cell whose `cellXfs` entry
//! points at a date format is read as a date-time.

use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::BufRead;

use crate::error::Result;
use crate::numfmt::{is_builtin_date_format, is_date_format, serial_to_datetime};
use crate::types::CellValue;
use crate::workbook_meta::DateSystem;
use crate::xml_helpers::{attr_string, attr_u32};

use super::worksheet::CellTypeTag;

/// Per-`cellXfs` flag telling whether the style formats dates.
#[derive(Debug, Default, Clone)]
pub(crate) struct DateStyles {
    by_xf: Vec<bool>,
}

impl DateStyles {
    pub(crate) fn is_date(&self, style_idx: Option<u32>) -> bool {
        style_idx
            .and_then(|idx| usize::try_from(idx).ok())
            .and_then(|idx| self.by_xf.get(idx))
            .copied()
            .unwrap_or(false)
    }
}

/// Read `numFmts` and `cellXfs` from `styles.xml`.
pub(crate) fn parse_styles<R: BufRead>(reader: R) -> Result<DateStyles> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(true);

    let mut custom: HashMap<u32, String> = HashMap::new();
    let mut xf_formats: Vec<Option<u32>> = Vec::new();
    let mut in_cell_xfs = false;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e) | Event::Empty(ref e)) => match e.local_name().as_ref() {
                b"numFmt" => {
                    if let (Some(id), Some(code)) =
                        (attr_u32(e, b"numFmtId"), attr_string(e, b"formatCode"))
                    {
                        custom.insert(id, code);
                    }
                }
                b"cellXfs" => in_cell_xfs = true,
                b"xf" if in_cell_xfs => xf_formats.push(attr_u32(e, b"numFmtId")),
                _ => {}
            },
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"cellXfs" => {
                in_cell_xfs = false;
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    let by_xf = xf_formats
        .into_iter()
        .map(|id| match id {
            Some(id) => match custom.get(&id) {
                Some(code) => is_date_format(code),
                None => is_builtin_date_format(id),
            },
            None => false,
        })
        .collect();
    Ok(DateStyles { by_xf })
}

/// Turn a cell's raw `<v>`/`<is>` text into a typed value.
pub(super) fn resolve_cell_value(
    raw_value: Option<&str>,
    cell_type: CellTypeTag,
    shared_strings: &[String],
    style_idx: Option<u32>,
    date_styles: &DateStyles,
    date_system: DateSystem,
) -> Option<CellValue> {
    let raw = raw_value?;
    let value = match cell_type {
        CellTypeTag::Shared => {
            let idx: usize = raw.trim().parse().ok()?;
            CellValue::Text(shared_strings.get(idx)?.clone())
        }
        CellTypeTag::Str | CellTypeTag::Inline => CellValue::Text(raw.to_string()),
        CellTypeTag::Bool => match raw.trim() {
            "1" | "true" => CellValue::Bool(true),
            "0" | "false" => CellValue::Bool(false),
            other => CellValue::Text(other.to_string()),
        },
        CellTypeTag::Error => CellValue::Error(raw.to_string()),
        CellTypeTag::Default => {
            let Ok(num) = raw.trim().parse::<f64>() else {
                return Some(CellValue::Text(raw.to_string()));
            };
            if date_styles.is_date(style_idx) {
                match serial_to_datetime(num, date_system) {
                    Some(dt) => CellValue::DateTime(dt),
                    None => CellValue::Number(num),
                }
            } else {
                CellValue::Number(num)
            }
        }
    };
    Some(value)
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
    use chrono::NaiveDate;

    const STYLES: &str = r##"<?xml version="1.0" encoding="UTF-8"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <numFmts count="2">
    <numFmt numFmtId="164" formatCode="dd/mm/yyyy"/>
    <numFmt numFmtId="165" formatCode="#,##0.00 &quot;EUR&quot;"/>
  </numFmts>
  <cellStyleXfs count="1"><xf numFmtId="14"/></cellStyleXfs>
  <cellXfs count="5">
    <xf numFmtId="0" fontId="0"/>
    <xf numFmtId="14" fontId="0" applyNumberFormat="1"/>
    <xf numFmtId="164" fontId="0" applyNumberFormat="1"/>
    <xf numFmtId="165" fontId="0" applyNumberFormat="1"/>
    <xf fontId="1"><alignment horizontal="center"/></xf>
  </cellXfs>
</styleSheet>"##;

    #[test]
    fn test_date_styles() {
        let styles = parse_styles(STYLES.as_bytes()).unwrap();
        assert!(!styles.is_date(Some(0)));
        assert!(styles.is_date(Some(1)));
        assert!(styles.is_date(Some(2)));
        assert!(!styles.is_date(Some(3)));
        assert!(!styles.is_date(Some(4)));
        assert!(!styles.is_date(Some(99)));
        assert!(!styles.is_date(None));
    }

    #[test]
    fn test_resolve_values() {
        let styles = parse_styles(STYLES.as_bytes()).unwrap();
        let strings = vec!["Hanson".to_string()];
        let resolve = |raw, tag, style| {
            resolve_cell_value(raw, tag, &strings, style, &styles, DateSystem::Date1900)
        };

        assert_eq!(
            resolve(Some("0"), CellTypeTag::Shared, None),
            Some(CellValue::Text("Hanson".into()))
        );
        assert_eq!(resolve(Some("7"), CellTypeTag::Shared, None), None);
        assert_eq!(
            resolve(Some("1"), CellTypeTag::Bool, None),
            Some(CellValue::Bool(true))
        );
        assert_eq!(
            resolve(Some("#DIV/0!"), CellTypeTag::Error, None),
            Some(CellValue::Error("#DIV/0!".into()))
        );
        assert_eq!(
            resolve(Some("1.85"), CellTypeTag::Default, Some(3)),
            Some(CellValue::Number(1.85))
        );
        let date = NaiveDate::from_ymd_opt(1990, 5, 17)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        assert_eq!(
            resolve(Some("33010"), CellTypeTag::Default, Some(2)),
            Some(CellValue::DateTime(date))
        );
        assert_eq!(resolve(None, CellTypeTag::Default, None), None);
    }
}
