//! Workbook-level parts: relationships, `workbook.xml` and the shared string table.

use crate::error::Result;
use crate::types::DefinedName;
use crate::xml_helpers::{attr_string, local_name_string};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::collections::HashMap;
use std::io::{BufReader, Read, Seek};
use zip::ZipArchive;

/// Excel date system - determines how serial dates are interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateSystem {
    /// Serial 1 is 1900-01-01, with the phantom 1900-02-29 kept for compatibility
    #[default]
    Date1900,
    /// Serial 0 is 1904-01-01
    Date1904,
}

/// Paths from `xl/_rels/workbook.xml.rels`, resolved to full archive paths.
#[derive(Default, Debug)]
pub struct WorkbookRelationships {
    /// rId -> path, e.g. "rId1" -> "xl/worksheets/sheet1.xml"
    pub worksheets: HashMap<String, String>,
    pub shared_strings: Option<String>,
    pub styles: Option<String>,
}

/// Sheet entry from workbook.xml
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SheetInfo {
    pub name: String,
    pub path: String,
}

#[derive(Debug)]
pub struct WorkbookMeta {
    pub sheets: Vec<SheetInfo>,
    pub date_system: DateSystem,
    pub defined_names: Vec<DefinedName>,
}

/// Parse workbook relationships (xl/_rels/workbook.xml.rels)
pub fn parse_workbook_relationships<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
) -> WorkbookRelationships {
    let mut rels = WorkbookRelationships::default();

    let Ok(file) = archive.by_name("xl/_rels/workbook.xml.rels") else {
        return rels; // Relationships file is optional
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let id = attr_string(e, b"Id").unwrap_or_default();
                let target = attr_string(e, b"Target").unwrap_or_default();
                let rel_type = attr_string(e, b"Type").unwrap_or_default();
                let full_path = resolve_relationship_path(&target);

                if rel_type.ends_with("/worksheet") && !id.is_empty() && !target.is_empty() {
                    rels.worksheets.insert(id, full_path);
                } else if rel_type.ends_with("/sharedStrings") {
                    rels.shared_strings = Some(full_path);
                } else if rel_type.ends_with("/styles") {
                    rels.styles = Some(full_path);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    rels
}

/// Resolve a relationship target to a full path within the archive
pub(crate) fn resolve_relationship_path(target: &str) -> String {
    if let Some(stripped) = target.strip_prefix('/') {
        stripped.to_string()
    } else if target.starts_with("../") {
        let mut path = target;
        while let Some(stripped) = path.strip_prefix("../") {
            path = stripped;
        }
        path.to_string()
    } else {
        format!("xl/{target}")
    }
}

/// Parse workbook.xml for sheet info, date system, and defined names
///
/// - `<sheets><sheet name="..." r:id="rId1"/></sheets>`
/// - `<workbookPr date1904="1"/>`
/// - `<definedNames><definedName name="table_people">Sheet1!$B$3</definedName></definedNames>`
pub fn parse_workbook_xml<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    relationships: &HashMap<String, String>,
) -> Result<WorkbookMeta> {
    let file = archive.by_name("xl/workbook.xml")?;

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);

    let mut sheets = Vec::new();
    let mut date_system = DateSystem::Date1900;
    let mut defined_names = Vec::new();
    let mut current_name: Option<DefinedName> = None;
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match local_name_string(e).as_str() {
                "definedName" => current_name = Some(parse_defined_name(e)),
                "workbookPr" => date_system = parse_workbook_pr(e),
                _ => {}
            },
            Ok(Event::Empty(ref e)) => match local_name_string(e).as_str() {
                "sheet" => {
                    if let Some(info) = parse_sheet_element(e, relationships, sheets.len()) {
                        sheets.push(info);
                    }
                }
                "workbookPr" => date_system = parse_workbook_pr(e),
                _ => {}
            },
            Ok(Event::Text(ref e)) => {
                if let (Some(dn), Ok(text)) = (current_name.as_mut(), e.unescape()) {
                    dn.value.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) if e.local_name().as_ref() == b"definedName" => {
                if let Some(dn) = current_name.take().filter(|dn| !dn.name.is_empty()) {
                    defined_names.push(dn);
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(WorkbookMeta {
        sheets,
        date_system,
        defined_names,
    })
}

fn parse_defined_name(e: &BytesStart<'_>) -> DefinedName {
    DefinedName {
        name: attr_string(e, b"name").unwrap_or_default(),
        value: String::new(),
        local_sheet_id: attr_string(e, b"localSheetId").and_then(|s| s.parse().ok()),
        hidden: attr_string(e, b"hidden").is_some_and(|h| h == "1" || h == "true"),
        comment: attr_string(e, b"comment").filter(|c| !c.is_empty()),
    }
}

fn parse_sheet_element(
    e: &BytesStart<'_>,
    relationships: &HashMap<String, String>,
    sheet_index: usize,
) -> Option<SheetInfo> {
    let mut name = String::new();
    let mut r_id = String::new();

    for attr in e.attributes().flatten() {
        match attr.key.as_ref() {
            b"name" => {
                if let Ok(v) = attr.unescape_value() {
                    name = v.into_owned();
                }
            }
            // r:id attribute (namespace prefixed)
            key if key.ends_with(b":id") || key == b"id" => {
                r_id = std::str::from_utf8(&attr.value).unwrap_or("").to_string();
            }
            _ => {}
        }
    }

    if name.is_empty() {
        return None;
    }

    // Fall back to the conventional part name when the relationship is missing
    let path = relationships.get(&r_id).cloned().unwrap_or_else(|| {
        let idx = sheet_index + 1;
        format!("xl/worksheets/sheet{idx}.xml")
    });

    Some(SheetInfo { name, path })
}

fn parse_workbook_pr(e: &BytesStart<'_>) -> DateSystem {
    match attr_string(e, b"date1904").as_deref() {
        Some("1" | "true") => DateSystem::Date1904,
        _ => DateSystem::Date1900,
    }
}

/// Parse the shared string table. Rich-text runs are concatenated; phonetic
/// runs (`<rPh>`) are skipped.
pub fn parse_shared_strings<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    path: Option<&str>,
) -> Vec<String> {
    let sst_path = path.unwrap_or("xl/sharedStrings.xml");
    let Ok(file) = archive.by_name(sst_path) else {
        return Vec::new(); // SharedStrings is optional
    };

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(false);

    let mut strings = Vec::new();
    let mut buf = Vec::new();
    let mut current = String::new();
    let mut in_t = false;
    let mut in_phonetic = false;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"si" => current.clear(),
                b"t" => in_t = !in_phonetic,
                b"rPh" => in_phonetic = true,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"si" => {
                strings.push(String::new());
            }
            Ok(Event::Text(ref e)) if in_t => {
                if let Ok(text) = e.unescape() {
                    current.push_str(&text);
                }
            }
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"si" => strings.push(std::mem::take(&mut current)),
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                _ => {}
            },
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    strings
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
    use std::io::{Cursor, Write};
    use zip::write::FileOptions;
    use zip::ZipWriter;

    fn archive(files: &[(&str, &str)]) -> ZipArchive<Cursor<Vec<u8>>> {
        let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
        for (name, content) in files {
            zip.start_file(*name, FileOptions::default()).unwrap();
            zip.write_all(content.as_bytes()).unwrap();
        }
        let cursor = zip.finish().unwrap();
        ZipArchive::new(Cursor::new(cursor.into_inner())).unwrap()
    }

    #[test]
    fn test_resolve_relationship_path() {
        assert_eq!(
            resolve_relationship_path("worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_relationship_path("/xl/worksheets/sheet1.xml"),
            "xl/worksheets/sheet1.xml"
        );
        assert_eq!(
            resolve_relationship_path("../customXml/item1.xml"),
            "customXml/item1.xml"
        );
    }

    #[test]
    fn test_date_system_default() {
        assert_eq!(DateSystem::default(), DateSystem::Date1900);
    }

    #[test]
    fn test_parse_workbook_xml() {
        let mut ar = archive(&[(
            "xl/workbook.xml",
            r#"<workbook xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships">
                <workbookPr date1904="1"/>
                <sheets>
                    <sheet name="Sheet1" sheetId="1" r:id="rId7"/>
                    <sheet name="Q&amp;A" sheetId="2" r:id="rId8"/>
                </sheets>
                <definedNames>
                    <definedName name="table_people">Sheet1!$B$3</definedName>
                    <definedName name="local" localSheetId="1" hidden="1">'Q&amp;A'!$A$1</definedName>
                </definedNames>
            </workbook>"#,
        )]);
        let rels: HashMap<String, String> =
            [("rId7".to_string(), "xl/worksheets/data.xml".to_string())].into();
        let meta = parse_workbook_xml(&mut ar, &rels).unwrap();

        assert_eq!(meta.date_system, DateSystem::Date1904);
        assert_eq!(
            meta.sheets,
            vec![
                SheetInfo {
                    name: "Sheet1".into(),
                    path: "xl/worksheets/data.xml".into()
                },
                SheetInfo {
                    name: "Q&A".into(),
                    path: "xl/worksheets/sheet2.xml".into()
                },
            ]
        );
        assert_eq!(meta.defined_names.len(), 2);
        assert_eq!(meta.defined_names[0].value, "Sheet1!$B$3");
        assert_eq!(meta.defined_names[1].value, "'Q&A'!$A$1");
        assert_eq!(meta.defined_names[1].local_sheet_id, Some(1));
        assert!(meta.defined_names[1].hidden);
    }

    #[test]
    fn test_parse_shared_strings() {
        let mut ar = archive(&[(
            "xl/sharedStrings.xml",
            r#"<sst><si><t>First Name</t></si><si/><si><r><t>Rich </t></r><r><t>text</t></r><rPh><t>ignored</t></rPh></si><si><t xml:space="preserve"> pad </t></si></sst>"#,
        )]);
        let strings = parse_shared_strings(&mut ar, None);
        assert_eq!(strings, vec!["First Name", "", "Rich text", " pad "]);
    }
}
