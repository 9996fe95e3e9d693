//! Cell comments (notes).
//!
//! Each sheet can link a comments part (e.g. `xl/comments1.xml`) through its
//! relationship file (`xl/worksheets/_rels/sheet1.xml.rels`). Comments make a
//! cell occupied for table-space checks even when it holds no value.

use crate::error::Result;
use crate::types::Comment;
use crate::xml_helpers::{attr_string, attr_u32};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::{BufRead, BufReader, Read, Seek};
use zip::ZipArchive;

/// A parsed comment and the cell reference it is anchored to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellComment {
    pub cell_ref: String,
    pub comment: Comment,
}

/// Parse a comments part.
///
/// ```xml
/// <comments>
///   <authors><author>John Doe</author></authors>
///   <commentList>
///     <comment ref="A1" authorId="0">
///       <text><r><t>Comment text</t></r></text>
///     </comment>
///   </commentList>
/// </comments>
/// ```
///
/// Rich-text runs are flattened to plain text.
pub fn parse_comments<B: BufRead>(reader: B) -> Result<Vec<CellComment>> {
    let mut xml = Reader::from_reader(reader);
    xml.trim_text(false);

    let mut comments = Vec::new();
    let mut authors: Vec<String> = Vec::new();
    let mut buf = Vec::new();

    let mut in_author = false;
    let mut in_t = false;
    let mut in_phonetic = false;
    let mut text = String::new();
    let mut current: Option<(String, Option<u32>)> = None;

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => match e.local_name().as_ref() {
                b"author" => {
                    in_author = true;
                    text.clear();
                }
                b"comment" => {
                    text.clear();
                    current = Some((
                        attr_string(e, b"ref").unwrap_or_default(),
                        attr_u32(e, b"authorId"),
                    ));
                }
                b"rPh" => in_phonetic = true,
                b"t" => in_t = current.is_some() && !in_phonetic,
                _ => {}
            },
            Ok(Event::Empty(ref e)) if e.local_name().as_ref() == b"author" => {
                authors.push(String::new());
            }
            Ok(Event::Text(ref e)) if in_author || in_t => text.push_str(&e.unescape()?),
            Ok(Event::End(ref e)) => match e.local_name().as_ref() {
                b"author" => {
                    in_author = false;
                    authors.push(std::mem::take(&mut text));
                }
                b"t" => in_t = false,
                b"rPh" => in_phonetic = false,
                b"comment" => {
                    if let Some((cell_ref, author_id)) = current.take() {
                        let author = author_id
                            .and_then(|id| usize::try_from(id).ok())
                            .and_then(|id| authors.get(id))
                            .filter(|a| !a.is_empty())
                            .cloned();
                        comments.push(CellComment {
                            cell_ref,
                            comment: Comment {
                                author,
                                text: std::mem::take(&mut text),
                            },
                        });
                    }
                }
                _ => {}
            },
            Ok(Event::Eof) => break,
            Err(e) => return Err(e.into()),
            _ => {}
        }
        buf.clear();
    }

    Ok(comments)
}

/// Read the comments linked from `sheet_path`, if any.
pub fn read_sheet_comments<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
) -> Result<Vec<CellComment>> {
    let Some(path) = get_comments_path(archive, sheet_path) else {
        return Ok(Vec::new());
    };
    let Ok(file) = archive.by_name(&path) else {
        tracing::warn!(%path, "comments part listed but missing");
        return Ok(Vec::new());
    };
    parse_comments(BufReader::new(file))
}

/// Path of the relationship file of a part: `a/b.xml` -> `a/_rels/b.xml.rels`.
pub(crate) fn rels_path_for(part: &str) -> String {
    match part.rsplit_once('/') {
        Some((dir, file)) => format!("{dir}/_rels/{file}.rels"),
        None => format!("_rels/{part}.rels"),
    }
}

/// Find the comments part of a sheet through the sheet's relationships.
pub fn get_comments_path<R: Read + Seek>(
    archive: &mut ZipArchive<R>,
    sheet_path: &str,
) -> Option<String> {
    let file = archive.by_name(&rels_path_for(sheet_path)).ok()?;

    let mut xml = Reader::from_reader(BufReader::new(file));
    xml.trim_text(true);
    let mut buf = Vec::new();

    loop {
        match xml.read_event_into(&mut buf) {
            Ok(Event::Empty(ref e) | Event::Start(ref e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let rel_type = attr_string(e, b"Type").unwrap_or_default();
                let target = attr_string(e, b"Target").unwrap_or_default();
                if rel_type.ends_with("/comments") && !target.is_empty() {
                    let sheet_dir = sheet_path.rsplit_once('/').map_or("", |(dir, _)| dir);
                    return Some(resolve_relative_path(sheet_dir, &target));
                }
            }
            Ok(Event::Eof) | Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    None
}

/// Resolve `relative` against `base_dir` (no trailing slash).
fn resolve_relative_path(base_dir: &str, relative: &str) -> String {
    if let Some(stripped) = relative.strip_prefix('/') {
        stripped.to_string()
    } else if let Some(stripped) = relative.strip_prefix("../") {
        let parent = base_dir.rsplit_once('/').map_or("", |(dir, _)| dir);
        resolve_relative_path(parent, stripped)
    } else if base_dir.is_empty() {
        relative.to_string()
    } else {
        format!("{base_dir}/{relative}")
    }
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

    #[test]
    fn test_resolve_relative_path_parent() {
        assert_eq!(
            resolve_relative_path("xl/worksheets", "../comments1.xml"),
            "xl/comments1.xml"
        );
    }

    #[test]
    fn test_resolve_relative_path_same_dir() {
        assert_eq!(
            resolve_relative_path("xl/worksheets", "comments1.xml"),
            "xl/worksheets/comments1.xml"
        );
    }

    #[test]
    fn test_resolve_relative_path_absolute() {
        assert_eq!(
            resolve_relative_path("xl/worksheets", "/xl/comments1.xml"),
            "xl/comments1.xml"
        );
    }

    #[test]
    fn test_resolve_relative_path_double_parent() {
        assert_eq!(
            resolve_relative_path("xl/worksheets/subdir", "../../comments1.xml"),
            "xl/comments1.xml"
        );
    }

    #[test]
    fn test_rels_path() {
        assert_eq!(
            rels_path_for("xl/worksheets/sheet1.xml"),
            "xl/worksheets/_rels/sheet1.xml.rels"
        );
        assert_eq!(rels_path_for("sheet1.xml"), "_rels/sheet1.xml.rels");
    }

    #[test]
    fn test_parse_comments() {
        let xml = r#"<?xml version="1.0"?>
<comments xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main">
  <authors><author>Jane</author><author></author></authors>
  <commentList>
    <comment ref="C10" authorId="0">
      <text><r><rPr><b/></rPr><t>Jane:</t></r><r><t xml:space="preserve"> keep &amp; move</t></r></text>
    </comment>
    <comment ref="D12" authorId="1"><text><t>plain</t></text></comment>
  </commentList>
</comments>"#;
        let comments = parse_comments(xml.as_bytes()).unwrap();
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].cell_ref, "C10");
        assert_eq!(comments[0].comment.author.as_deref(), Some("Jane"));
        assert_eq!(comments[0].comment.text, "Jane: keep & move");
        assert_eq!(comments[1].cell_ref, "D12");
        assert_eq!(comments[1].comment.author, None);
        assert_eq!(comments[1].comment.text, "plain");
    }
}
