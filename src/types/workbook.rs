use serde::Serialize;
use std::collections::BTreeMap;

use super::{Cell, CellValue, Comment};
use crate::cell_ref::{MAX_COL, MAX_ROW};
use crate::direction::Axis;
use crate::error::{Result, XlTemplateError};
use crate::formula::translate_formula;
use crate::grid::{SheetBounds, Worksheet};

/// A complete workbook: worksheets plus workbook-level metadata.
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Workbook {
    pub sheets: Vec<Sheet>,
    /// Named ranges and defined names from the workbook
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defined_names: Vec<DefinedName>,
    /// Whether the workbook uses the 1904 date system (Mac default)
    /// If false, uses the 1900 date system (Windows default)
    #[serde(skip_serializing_if = "is_false")]
    pub date1904: bool,
    /// ZIP path of each sheet's XML part, parallel to `sheets` (empty for
    /// workbooks built in memory).
    #[serde(skip)]
    pub(crate) sheet_paths: Vec<String>,
}

/// Helper function for serde skip_serializing_if
pub(crate) fn is_false(b: &bool) -> bool {
    !b
}

/// A defined name (named range) in the workbook
///
/// Named ranges can reference cell ranges, single cells, constants, or formulas.
/// Built-in names use the `_xlnm.` prefix (`_xlnm.Print_Area`, ...).
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DefinedName {
    /// The name (can include special _xlnm. prefix for built-in names)
    pub name: String,
    /// The formula/reference value (e.g., "Sheet1!$A$1:$D$10" or "0.0825")
    pub value: String,
    /// If present, the name is scoped to this sheet (0-indexed)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub local_sheet_id: Option<u32>,
    /// Whether this name is hidden from the Name Manager UI
    pub hidden: bool,
    /// Optional comment/description for this name
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Custom row height in points (1-based row).
#[derive(Debug, Serialize, Clone, Copy, PartialEq)]
pub struct RowHeight {
    pub row: u32,
    pub height: f64,
}

/// A single worksheet with sparse cell storage keyed by 1-based (row, col).
#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Sheet {
    pub name: String,
    #[serde(serialize_with = "serialize_cells")]
    cells: BTreeMap<(u32, u32), Cell>,
    pub row_heights: Vec<RowHeight>,
    pub hidden_rows: Vec<u32>,
    /// Cached used range; `None` while the sheet holds no cells.
    #[serde(skip)]
    bounds: Option<SheetBounds>,
}

fn serialize_cells<S: serde::Serializer>(
    cells: &BTreeMap<(u32, u32), Cell>,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    use serde::ser::SerializeMap;
    let mut map = serializer.serialize_map(Some(cells.len()))?;
    for (&(row, col), cell) in cells {
        let key = format!("{}{}", crate::cell_ref::col_to_letter(col), row);
        map.serialize_entry(&key, cell)?;
    }
    map.end()
}

impl Sheet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn cell(&self, row: u32, col: u32) -> Option<&Cell> {
        self.cells.get(&(row, col))
    }

    pub fn value(&self, row: u32, col: u32) -> Option<&CellValue> {
        self.cell(row, col).and_then(|c| c.value.as_ref())
    }

    /// Iterate occupied cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = ((u32, u32), &Cell)> {
        self.cells.iter().map(|(&k, v)| (k, v))
    }

    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Used range of the sheet. An empty sheet reports `A1:A1`.
    pub fn bounds(&self) -> SheetBounds {
        self.bounds.unwrap_or(SheetBounds {
            min_row: 1,
            max_row: 1,
            min_col: 1,
            max_col: 1,
        })
    }

    /// Replace a cell wholesale (used by the XLSX parser).
    pub(crate) fn put_cell(&mut self, row: u32, col: u32, cell: Cell) {
        if cell.is_vacant() {
            self.remove_cell(row, col);
            return;
        }
        self.cells.insert((row, col), cell);
        self.extend_bounds(row, col);
    }

    fn cell_entry(&mut self, row: u32, col: u32) -> &mut Cell {
        self.extend_bounds(row, col);
        self.cells.entry((row, col)).or_default()
    }

    /// Set or clear a cell value. Empty text clears the value.
    ///
    /// Writing a value drops the cell's formula; style and comment stay.
    pub fn set_value(&mut self, row: u32, col: u32, value: Option<CellValue>) {
        let value = value.filter(|v| !v.is_empty_text());
        match value {
            Some(v) => {
                let cell = self.cell_entry(row, col);
                cell.value = Some(v);
                cell.formula = None;
            }
            None => {
                let vacant = match self.cells.get_mut(&(row, col)) {
                    Some(cell) => {
                        cell.value = None;
                        cell.formula = None;
                        cell.is_vacant()
                    }
                    None => false,
                };
                if vacant {
                    self.remove_cell(row, col);
                }
            }
        }
    }

    pub fn set_formula(&mut self, row: u32, col: u32, formula: impl Into<String>) {
        let formula: String = formula.into();
        let formula = formula.strip_prefix('=').unwrap_or(&formula).to_string();
        self.cell_entry(row, col).formula = Some(formula);
    }

    pub fn set_style(&mut self, row: u32, col: u32, style_idx: u32) {
        self.cell_entry(row, col).style_idx = Some(style_idx);
    }

    pub fn set_comment(&mut self, row: u32, col: u32, comment: Comment) {
        self.cell_entry(row, col).comment = Some(comment);
    }

    fn remove_cell(&mut self, row: u32, col: u32) {
        if self.cells.remove(&(row, col)).is_some() {
            self.recompute_bounds();
        }
    }

    fn extend_bounds(&mut self, row: u32, col: u32) {
        self.bounds = Some(match self.bounds {
            Some(b) => SheetBounds {
                min_row: b.min_row.min(row),
                max_row: b.max_row.max(row),
                min_col: b.min_col.min(col),
                max_col: b.max_col.max(col),
            },
            None => SheetBounds {
                min_row: row,
                max_row: row,
                min_col: col,
                max_col: col,
            },
        });
    }

    fn recompute_bounds(&mut self) {
        self.bounds = None;
        let keys: Vec<(u32, u32)> = self.cells.keys().copied().collect();
        for (row, col) in keys {
            self.extend_bounds(row, col);
        }
    }

    /// Insert `count` empty lines before line `index`.
    ///
    /// Every cell at or beyond `index` on `axis` moves by `count`; formulas of
    /// moved cells have their relative references shifted by the same amount.
    /// Formulas in cells that stay put are left as they are, even when they
    /// point into the moved region.
    pub fn insert_lines(&mut self, axis: Axis, index: u32, count: u32) {
        if count == 0 {
            return;
        }
        let shift = i64::from(count);
        self.move_lines(axis, |line| {
            if line >= index {
                Some(i64::from(line) + shift)
            } else {
                Some(i64::from(line))
            }
        });
        tracing::debug!(sheet = %self.name, ?axis, index, count, "inserted lines");
    }

    /// Delete `count` lines starting at line `index`, pulling later lines back.
    pub fn delete_lines(&mut self, axis: Axis, index: u32, count: u32) {
        if count == 0 {
            return;
        }
        let end = index.saturating_add(count);
        let shift = i64::from(count);
        self.move_lines(axis, |line| {
            if line < index {
                Some(i64::from(line))
            } else if line < end {
                None
            } else {
                Some(i64::from(line) - shift)
            }
        });
        tracing::debug!(sheet = %self.name, ?axis, index, count, "deleted lines");
    }

    /// Remap every line index through `map` (`None` drops the line).
    fn move_lines(&mut self, axis: Axis, map: impl Fn(u32) -> Option<i64>) {
        let limit = match axis {
            Axis::Row => MAX_ROW,
            Axis::Column => MAX_COL,
        };
        let remap = |line: u32| -> Option<u32> {
            map(line)
                .and_then(|l| u32::try_from(l).ok())
                .filter(|&l| (1..=limit).contains(&l))
        };

        let cells = std::mem::take(&mut self.cells);
        for ((row, col), mut cell) in cells {
            let line = match axis {
                Axis::Row => row,
                Axis::Column => col,
            };
            let Some(new_line) = remap(line) else {
                if map(line).is_some() {
                    tracing::warn!(
                        sheet = %self.name,
                        row,
                        col,
                        "cell pushed past the sheet edge, dropped"
                    );
                }
                continue;
            };
            let delta = i64::from(new_line) - i64::from(line);
            if delta != 0 {
                if let Some(formula) = cell.formula.take() {
                    cell.formula = Some(match axis {
                        Axis::Row => translate_formula(&formula, delta, 0),
                        Axis::Column => translate_formula(&formula, 0, delta),
                    });
                }
            }
            let key = match axis {
                Axis::Row => (new_line, col),
                Axis::Column => (row, new_line),
            };
            self.cells.insert(key, cell);
        }

        if axis == Axis::Row {
            self.row_heights = self
                .row_heights
                .iter()
                .filter_map(|rh| {
                    remap(rh.row).map(|row| RowHeight {
                        row,
                        height: rh.height,
                    })
                })
                .collect();
            self.hidden_rows = self.hidden_rows.iter().filter_map(|&r| remap(r)).collect();
        }

        self.recompute_bounds();
    }
}

impl Workbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an empty sheet and return it for population.
    pub fn add_sheet(&mut self, name: impl Into<String>) -> &mut Sheet {
        let idx = self.sheets.len();
        self.sheets.push(Sheet::new(name));
        self.sheet_paths.push(String::new());
        #[allow(clippy::indexing_slicing)] // pushed just above
        &mut self.sheets[idx]
    }

    /// Define (or replace) a workbook-level name.
    pub fn define_name(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        self.defined_names
            .retain(|dn| !(dn.local_sheet_id.is_none() && dn.name.eq_ignore_ascii_case(&name)));
        self.defined_names.push(DefinedName {
            name,
            value,
            local_sheet_id: None,
            hidden: false,
            comment: None,
        });
    }

    pub fn sheet_index(&self, name: &str) -> Option<usize> {
        self.sheets.iter().position(|s| s.name == name)
    }

    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn sheet_mut(&mut self, name: &str) -> Option<&mut Sheet> {
        self.sheets.iter_mut().find(|s| s.name == name)
    }

    pub fn sheet_names(&self) -> Vec<&str> {
        self.sheets.iter().map(|s| s.name.as_str()).collect()
    }

    /// Grid view over one sheet, for markers and tables.
    pub fn worksheet(&mut self, name: &str) -> Result<Worksheet<'_>> {
        let idx = self
            .sheet_index(name)
            .ok_or_else(|| XlTemplateError::Sheet(name.to_string()))?;
        self.worksheet_at(idx)
    }

    pub fn worksheet_at(&mut self, idx: usize) -> Result<Worksheet<'_>> {
        let sheet_names: Vec<String> = self.sheets.iter().map(|s| s.name.clone()).collect();
        let Self {
            sheets,
            defined_names,
            ..
        } = self;
        let sheet = sheets
            .get_mut(idx)
            .ok_or_else(|| XlTemplateError::Sheet(format!("index {idx}")))?;
        Ok(Worksheet::new(sheet, idx, defined_names, sheet_names))
    }

    /// Defined names visible from a sheet: sheet-scoped first, then global.
    pub(crate) fn lookup_name<'a>(
        names: &'a [DefinedName],
        sheet_idx: usize,
        name: &str,
    ) -> Option<&'a DefinedName> {
        let scoped = names.iter().find(|dn| {
            dn.name.eq_ignore_ascii_case(name)
                && dn
                    .local_sheet_id
                    .is_some_and(|id| usize::try_from(id).ok() == Some(sheet_idx))
        });
        scoped.or_else(|| {
            names
                .iter()
                .find(|dn| dn.local_sheet_id.is_none() && dn.name.eq_ignore_ascii_case(name))
        })
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

    fn sheet_with(cells: &[(u32, u32, &str)]) -> Sheet {
        let mut sheet = Sheet::new("S");
        for &(row, col, v) in cells {
            sheet.set_value(row, col, Some(CellValue::from(v)));
        }
        sheet
    }

    #[test]
    fn test_bounds_track_cells() {
        let mut sheet = Sheet::new("S");
        assert_eq!(sheet.bounds(), SheetBounds::new(1, 1, 1, 1));

        sheet.set_value(3, 2, Some("x".into()));
        sheet.set_value(7, 5, Some("y".into()));
        assert_eq!(sheet.bounds(), SheetBounds::new(3, 7, 2, 5));

        sheet.set_value(7, 5, None);
        assert_eq!(sheet.bounds(), SheetBounds::new(3, 3, 2, 2));
    }

    #[test]
    fn test_empty_text_clears() {
        let mut sheet = sheet_with(&[(1, 1, "a")]);
        sheet.set_value(1, 1, Some("".into()));
        assert!(sheet.cell(1, 1).is_none());
        assert_eq!(sheet.cell_count(), 0);
    }

    #[test]
    fn test_clearing_styled_cell_keeps_style() {
        let mut sheet = sheet_with(&[(2, 2, "a")]);
        sheet.set_style(2, 2, 4);
        sheet.set_value(2, 2, None);
        let cell = sheet.cell(2, 2).unwrap();
        assert!(cell.value.is_none());
        assert!(cell.has_style());
    }

    #[test]
    fn test_insert_rows_shifts_cells_and_heights() {
        let mut sheet = sheet_with(&[(1, 1, "top"), (3, 1, "mid"), (5, 2, "low")]);
        sheet.row_heights.push(RowHeight {
            row: 5,
            height: 30.0,
        });
        sheet.hidden_rows.push(3);

        sheet.insert_lines(Axis::Row, 3, 2);

        assert_eq!(sheet.value(1, 1), Some(&"top".into()));
        assert!(sheet.cell(3, 1).is_none());
        assert_eq!(sheet.value(5, 1), Some(&"mid".into()));
        assert_eq!(sheet.value(7, 2), Some(&"low".into()));
        assert_eq!(sheet.row_heights[0].row, 7);
        assert_eq!(sheet.hidden_rows, vec![5]);
        assert_eq!(sheet.bounds(), SheetBounds::new(1, 7, 1, 2));
    }

    #[test]
    fn test_delete_columns_drops_and_pulls_back() {
        let mut sheet = sheet_with(&[(1, 1, "a"), (1, 2, "b"), (1, 3, "c"), (1, 4, "d")]);
        sheet.delete_lines(Axis::Column, 2, 2);

        assert_eq!(sheet.value(1, 1), Some(&"a".into()));
        assert_eq!(sheet.value(1, 2), Some(&"d".into()));
        assert!(sheet.cell(1, 3).is_none());
        assert_eq!(sheet.cell_count(), 2);
    }

    #[test]
    fn test_moved_formula_is_translated() {
        let mut sheet = Sheet::new("S");
        sheet.set_formula(4, 1, "=SUM(A1:A3)+$B$1");
        sheet.set_formula(1, 3, "A4");

        sheet.insert_lines(Axis::Row, 2, 1);

        let moved = sheet.cell(5, 1).unwrap();
        assert_eq!(moved.formula.as_deref(), Some("SUM(A2:A4)+$B$1"));
        // Cells that stay put keep their references.
        assert_eq!(sheet.cell(1, 3).unwrap().formula.as_deref(), Some("A4"));
    }

    #[test]
    fn test_worksheet_lookup() {
        let mut wb = Workbook::new();
        wb.add_sheet("Sheet1");
        wb.add_sheet("Data");
        assert_eq!(wb.sheet_names(), vec!["Sheet1", "Data"]);
        assert!(wb.worksheet("Data").is_ok());
        assert!(matches!(
            wb.worksheet("Nope"),
            Err(XlTemplateError::Sheet(_))
        ));
    }

    #[test]
    fn test_scoped_name_wins() {
        let mut wb = Workbook::new();
        wb.add_sheet("A");
        wb.add_sheet("B");
        wb.define_name("start", "A!$A$1");
        wb.defined_names.push(DefinedName {
            name: "start".into(),
            value: "B!$C$3".into(),
            local_sheet_id: Some(1),
            hidden: false,
            comment: None,
        });

        let from_b = Workbook::lookup_name(&wb.defined_names, 1, "START").unwrap();
        assert_eq!(from_b.value, "B!$C$3");
        let from_a = Workbook::lookup_name(&wb.defined_names, 0, "start").unwrap();
        assert_eq!(from_a.value, "A!$A$1");
    }
}
