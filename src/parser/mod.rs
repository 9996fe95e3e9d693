//! Main XLSX parser
//!
//! Orchestrates the parsing of all components from the ZIP archive into a
//! [`Workbook`].

pub(crate) mod styles;
mod worksheet;

use std::io::{BufReader, Cursor};
use zip::ZipArchive;

use crate::cell_ref::parse_cell_ref;
use crate::comments::read_sheet_comments;
use crate::error::Result;
use crate::types::Workbook;
use crate::workbook_meta::{
    parse_shared_strings, parse_workbook_relationships, parse_workbook_xml, DateSystem,
};

use styles::{parse_styles, DateStyles};
use worksheet::{parse_sheet, ValueContext};

/// Parse an XLSX file from bytes.
pub fn parse(data: &[u8]) -> Result<Workbook> {
    let mut archive = ZipArchive::new(Cursor::new(data))?;

    // Relationships first, to get actual part paths
    let relationships = parse_workbook_relationships(&mut archive);
    let shared_strings =
        parse_shared_strings(&mut archive, relationships.shared_strings.as_deref());

    let styles_path = relationships.styles.as_deref().unwrap_or("xl/styles.xml");
    let date_styles = match archive.by_name(styles_path) {
        Ok(file) => parse_styles(BufReader::new(file))?,
        Err(_) => DateStyles::default(),
    };

    let meta = parse_workbook_xml(&mut archive, &relationships.worksheets)?;
    let ctx = ValueContext {
        shared_strings: &shared_strings,
        date_styles: &date_styles,
        date_system: meta.date_system,
    };

    let mut workbook = Workbook {
        defined_names: meta.defined_names,
        date1904: meta.date_system == DateSystem::Date1904,
        ..Workbook::default()
    };

    for info in &meta.sheets {
        let mut sheet = parse_sheet(&mut archive, info, &ctx)?;

        for comment in read_sheet_comments(&mut archive, &info.path)? {
            match parse_cell_ref(&comment.cell_ref) {
                Some((col, row)) => sheet.set_comment(row, col, comment.comment),
                None => {
                    tracing::warn!(cell_ref = %comment.cell_ref, "comment with invalid reference");
                }
            }
        }

        tracing::debug!(
            sheet = %info.name,
            path = %info.path,
            cells = sheet.cell_count(),
            "parsed worksheet"
        );
        workbook.sheets.push(sheet);
        workbook.sheet_paths.push(info.path.clone());
    }

    Ok(workbook)
}
