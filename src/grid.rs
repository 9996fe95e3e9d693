//! The cell-store seam between the table engine and a concrete workbook.

use crate::direction::Axis;
use crate::types::{CellValue, DefinedName, Sheet, Workbook};

/// Used range of a sheet, 1-based and inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SheetBounds {
    pub min_row: u32,
    pub max_row: u32,
    pub min_col: u32,
    pub max_col: u32,
}

impl SheetBounds {
    pub const fn new(min_row: u32, max_row: u32, min_col: u32, max_col: u32) -> Self {
        Self {
            min_row,
            max_row,
            min_col,
            max_col,
        }
    }

    pub const fn contains(&self, row: u32, col: u32) -> bool {
        row >= self.min_row && row <= self.max_row && col >= self.min_col && col <= self.max_col
    }

    /// First and last line index along `axis` (rows for `Row`, columns for `Column`).
    pub const fn span(&self, axis: Axis) -> (u32, u32) {
        match axis {
            Axis::Row => (self.min_row, self.max_row),
            Axis::Column => (self.min_col, self.max_col),
        }
    }
}

/// Access to a single worksheet, 1-based.
///
/// Implementors decide what "used range" means; the table engine only scans
/// inside it.
pub trait Grid {
    fn sheet_name(&self) -> &str;

    /// Whether the owning workbook has a sheet with this name.
    fn sheet_exists(&self, name: &str) -> bool;

    fn cell_value(&self, row: u32, col: u32) -> Option<CellValue>;

    /// `None` (or empty text) clears the value, keeping style and comment.
    fn set_cell_value(&mut self, row: u32, col: u32, value: Option<CellValue>);

    fn cell_has_comment(&self, row: u32, col: u32) -> bool;

    fn cell_has_style(&self, row: u32, col: u32) -> bool;

    /// Style index of a cell, including the default style 0.
    fn cell_style(&self, row: u32, col: u32) -> Option<u32>;

    fn set_cell_style(&mut self, row: u32, col: u32, style_idx: u32);

    fn sheet_bounds(&self) -> SheetBounds;

    /// Raw value of a defined name visible from this sheet.
    fn defined_name(&self, name: &str) -> Option<String>;

    /// Insert `count` empty lines before `index`. `Axis::Row` inserts rows.
    fn insert_lines(&mut self, axis: Axis, index: u32, count: u32);

    /// Remove `count` lines starting at `index`.
    fn delete_lines(&mut self, axis: Axis, index: u32, count: u32);
}

/// A [`Grid`] over one sheet of a [`Workbook`].
///
/// Borrows the sheet mutably and the workbook-level names immutably, so a
/// table can work on one sheet while the rest of the workbook stays readable.
#[derive(Debug)]
pub struct Worksheet<'a> {
    sheet: &'a mut Sheet,
    sheet_index: usize,
    defined_names: &'a [DefinedName],
    sheet_names: Vec<String>,
}

impl<'a> Worksheet<'a> {
    pub(crate) fn new(
        sheet: &'a mut Sheet,
        sheet_index: usize,
        defined_names: &'a [DefinedName],
        sheet_names: Vec<String>,
    ) -> Self {
        Self {
            sheet,
            sheet_index,
            defined_names,
            sheet_names,
        }
    }

    pub fn sheet(&self) -> &Sheet {
        self.sheet
    }

    pub fn sheet_mut(&mut self) -> &mut Sheet {
        self.sheet
    }
}

impl Grid for Worksheet<'_> {
    fn sheet_name(&self) -> &str {
        &self.sheet.name
    }

    fn sheet_exists(&self, name: &str) -> bool {
        self.sheet_names.iter().any(|n| n == name)
    }

    fn cell_value(&self, row: u32, col: u32) -> Option<CellValue> {
        self.sheet.value(row, col).cloned()
    }

    fn set_cell_value(&mut self, row: u32, col: u32, value: Option<CellValue>) {
        self.sheet.set_value(row, col, value);
    }

    fn cell_has_comment(&self, row: u32, col: u32) -> bool {
        self.sheet.cell(row, col).is_some_and(|c| c.has_comment())
    }

    fn cell_has_style(&self, row: u32, col: u32) -> bool {
        self.sheet.cell(row, col).is_some_and(|c| c.has_style())
    }

    fn cell_style(&self, row: u32, col: u32) -> Option<u32> {
        self.sheet.cell(row, col).and_then(|c| c.style_idx)
    }

    fn set_cell_style(&mut self, row: u32, col: u32, style_idx: u32) {
        self.sheet.set_style(row, col, style_idx);
    }

    fn sheet_bounds(&self) -> SheetBounds {
        self.sheet.bounds()
    }

    fn defined_name(&self, name: &str) -> Option<String> {
        Workbook::lookup_name(self.defined_names, self.sheet_index, name).map(|dn| dn.value.clone())
    }

    fn insert_lines(&mut self, axis: Axis, index: u32, count: u32) {
        self.sheet.insert_lines(axis, index, count);
    }

    fn delete_lines(&mut self, axis: Axis, index: u32, count: u32) {
        self.sheet.delete_lines(axis, index, count);
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
    use crate::types::Comment;

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1");
        sheet.set_value(3, 2, Some("First Name".into()));
        sheet.set_style(5, 5, 2);
        sheet.set_comment(
            6,
            1,
            Comment {
                author: None,
                text: "hi".into(),
            },
        );
        wb.add_sheet("Other");
        wb.define_name("table_people", "Sheet1!$B$3");
        wb.define_name("quoted", "'Other'!$A$1");
        wb
    }

    #[test]
    fn test_worksheet_reads_cells() {
        let mut wb = workbook();
        let ws = wb.worksheet("Sheet1").unwrap();
        assert_eq!(ws.sheet_name(), "Sheet1");
        assert_eq!(ws.cell_value(3, 2), Some("First Name".into()));
        assert!(ws.cell_has_style(5, 5));
        assert_eq!(ws.cell_style(5, 5), Some(2));
        assert_eq!(ws.cell_style(3, 2), None);
        assert!(ws.cell_has_comment(6, 1));
        assert!(!ws.cell_has_comment(3, 2));
        assert_eq!(ws.sheet_bounds(), SheetBounds::new(3, 6, 1, 5));
        assert!(ws.sheet_exists("Other"));
        assert!(!ws.sheet_exists("other"));
    }

    #[test]
    fn test_writes_go_through() {
        let mut wb = workbook();
        {
            let mut ws = wb.worksheet("Other").unwrap();
            ws.set_cell_value(2, 2, Some(CellValue::Number(7.0)));
            ws.insert_lines(Axis::Row, 1, 1);
        }
        assert_eq!(
            wb.sheet("Other").unwrap().value(3, 2),
            Some(&CellValue::Number(7.0))
        );
    }

    #[test]
    fn test_bounds_span() {
        let b = SheetBounds::new(2, 9, 3, 4);
        assert_eq!(b.span(Axis::Row), (2, 9));
        assert_eq!(b.span(Axis::Column), (3, 4));
        assert!(b.contains(9, 4));
        assert!(!b.contains(1, 4));
    }
}
