//! Patch an XLSX ZIP archive with modified sheet XML.
//!
//! Unmodified entries are copied via `raw_copy_file` (zero recompression cost).
//! Only dirty sheets, and the comments parts they link, get new XML.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use crate::comments::get_comments_path;
use crate::error::Result;
use crate::types::Workbook;
use crate::workbook_meta::DateSystem;

use super::sheet_writer::{patch_sheet_xml, write_comments_xml};

/// Patch the original XLSX bytes, replacing only sheets in `dirty_sheets`.
///
/// Returns the new XLSX file as `Vec<u8>`.
pub(crate) fn patch_zip(
    original_data: &[u8],
    workbook: &Workbook,
    dirty_sheets: &HashSet<usize>,
) -> Result<Vec<u8>> {
    let mut archive = ZipArchive::new(Cursor::new(original_data))?;
    let dates = if workbook.date1904 {
        DateSystem::Date1904
    } else {
        DateSystem::Date1900
    };

    // ZIP path -> regenerated content
    let mut replacements: HashMap<String, String> = HashMap::new();
    for &idx in dirty_sheets {
        let path = workbook.sheet_paths.get(idx).filter(|p| !p.is_empty());
        let (Some(path), Some(sheet)) = (path, workbook.sheets.get(idx)) else {
            tracing::warn!(idx, "dirty sheet has no archive part, skipped");
            continue;
        };

        let mut original = String::new();
        archive.by_name(path)?.read_to_string(&mut original)?;
        replacements.insert(path.clone(), patch_sheet_xml(&original, sheet, dates)?);

        match get_comments_path(&mut archive, path) {
            Some(comments_path) => {
                replacements.insert(comments_path, write_comments_xml(sheet));
            }
            None if sheet.cells().any(|(_, c)| c.has_comment()) => {
                tracing::warn!(
                    sheet = %sheet.name,
                    "sheet has comments but no comments part, not saved"
                );
            }
            None => {}
        }
    }

    let buf: Vec<u8> = Vec::with_capacity(original_data.len());
    let mut writer = ZipWriter::new(Cursor::new(buf));

    for i in 0..archive.len() {
        let entry = archive.by_index_raw(i)?;
        let name = entry.name().to_string();

        if let Some(xml) = replacements.get(&name) {
            tracing::debug!(part = %name, bytes = xml.len(), "rewriting part");
            let options = FileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(name, options)?;
            writer.write_all(xml.as_bytes())?;
            continue;
        }

        // Pass through unmodified entry (raw copy, no re-compression)
        writer.raw_copy_file(entry)?;
    }

    let cursor = writer.finish()?;
    Ok(cursor.into_inner())
}
