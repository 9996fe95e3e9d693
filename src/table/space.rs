//! Resizing the sheet around a table before a write.
//!
//! The table end is followed by some empty lines and then, possibly, other
//! content. Growing inserts lines inside the table's own stretch of the sheet
//! and shrinking deletes lines just before that trailing gap, so the gap and
//! everything past it keep their shape.

use super::{len_i64, Table};
use crate::direction::{Axis, Direction};
use crate::error::{Result, XlTemplateError};
use crate::grid::Grid;
use crate::position::Position;

impl<G: Grid + ?Sized> Table<'_, G> {
    /// Make room for exactly `desired` record lines.
    pub(super) fn adjust_space(&mut self, desired: usize) -> Result<()> {
        let current = self.initial_length();
        let diff = len_i64(desired)? - current;
        if diff == 0 {
            return Ok(());
        }

        let Some(anchor) = self.find_anchor() else {
            tracing::debug!(diff, "nothing after the table, no lines moved");
            if diff < 0 {
                self.clear_lines(len_i64(desired)? + 1, current);
            }
            return Ok(());
        };

        let count = u32::try_from(diff.unsigned_abs())
            .map_err(|_| XlTemplateError::structure(format!("cannot move {diff} lines")))?;
        tracing::debug!(diff, anchor = %anchor, "adjusting table space");
        if diff > 0 {
            self.insert_space(anchor, count)
        } else {
            self.remove_space(anchor, count)
        }
    }

    /// Last empty cell after the table end before other content.
    ///
    /// `None` when the walk leaves the used range without meeting content.
    fn find_anchor(&self) -> Option<Position> {
        let body = self.options.body_direction;
        let mut pos = self.final_position;
        loop {
            if !pos.is_in(&*self.grid) {
                return None;
            }
            let next = pos.checked_shifted(body, 1)?;
            if !next.is_cell_empty(&*self.grid) {
                return Some(pos);
            }
            pos = next;
        }
    }

    fn insert_space(&mut self, anchor: Position, count: u32) -> Result<()> {
        let back = self.options.body_direction.opposite();
        let mut pos = anchor;
        while pos != self.initial {
            let line = self.line_index(&pos);
            if self.is_line_empty(line)? {
                tracing::debug!(line, count, "inserting lines");
                self.grid.insert_lines(self.line_axis(), line, count);
                if !self.options.body_direction.is_forward() {
                    // The table itself sits past the insertion point.
                    self.relocate(back, i64::from(count))?;
                }
                return Ok(());
            }
            pos = pos.shifted_one(back)?;
        }
        Err(XlTemplateError::structure(format!(
            "Could not insert {count} lines: no empty line between the table and the content after it"
        )))
    }

    /// Delete `count` lines ending at the start of the trailing gap.
    ///
    /// Every candidate line is checked before anything is deleted, so a
    /// failure leaves the sheet untouched.
    fn remove_space(&mut self, anchor: Position, count: u32) -> Result<()> {
        let body = self.options.body_direction;
        let back = body.opposite();
        let start = anchor.shifted(back, self.trailing_space(anchor))?;

        let mut lines = Vec::new();
        let mut pos = start;
        for _ in 0..count {
            let line = self.line_index(&pos);
            if pos == self.initial {
                return Err(XlTemplateError::structure(format!(
                    "Could not delete {count} lines: only {} empty lines after the table",
                    lines.len()
                )));
            }
            if !self.is_line_empty(line)? {
                return Err(XlTemplateError::structure(format!(
                    "Could not delete {count} lines: line {line} is not empty"
                )));
            }
            lines.push(line);
            pos = pos.shifted_one(back)?;
        }

        let Some(&first) = lines.iter().min() else {
            return Ok(());
        };
        tracing::debug!(first, count, "deleting lines");
        self.grid.delete_lines(self.line_axis(), first, count);
        if !body.is_forward() {
            // Everything from the table on moved toward the deleted lines.
            self.relocate(body, i64::from(count))?;
        }
        Ok(())
    }

    /// Empty cells between the table end and the next content, taken as the
    /// minimum over the anchor's line and every header column that meets
    /// content.
    fn trailing_space(&self, anchor: Position) -> i64 {
        let body = self.options.body_direction;
        let mut space = self.final_position.dir_distance(&anchor, body);

        for header in &self.headers {
            let start = header.combine(body.axis(), &self.final_position);
            let mut run = 0;
            let mut cursor = start.checked_shifted(body, 1);
            while let Some(pos) = cursor {
                if !pos.is_in(&*self.grid) || !pos.is_cell_empty(&*self.grid) {
                    break;
                }
                run += 1;
                cursor = pos.checked_shifted(body, 1);
            }
            let hit_content = cursor
                .is_some_and(|pos| pos.is_in(&*self.grid) && !pos.is_cell_empty(&*self.grid));
            if hit_content {
                space = space.min(run);
            }
        }
        space
    }

    /// Whether a line holds nothing outside the table's own cells.
    fn is_line_empty(&self, line: u32) -> Result<bool> {
        let table = self.table_range()?;
        let axis = self.line_axis();
        let (first, last) = self.grid.sheet_bounds().span(axis.other());
        for k in first..=last {
            let pos = line_cell(axis, line, k)?;
            if !table.is_inside(&pos) && !pos.is_cell_empty(&*self.grid) {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Clear the values of record lines `from..=to` (1-based line numbers).
    fn clear_lines(&mut self, from: i64, to: i64) {
        let body = self.options.body_direction;
        for line in from..=to {
            for header in &self.headers {
                if let Some(pos) = header.checked_shifted(body, line) {
                    pos.set_value(&mut *self.grid, None);
                }
            }
        }
    }

    /// Move every stored position after lines moved under the table.
    fn relocate(&mut self, direction: Direction, n: i64) -> Result<()> {
        self.initial = self.initial.shifted(direction, n)?;
        self.title_end = self.title_end.shifted(direction, n)?;
        self.final_position = self.final_position.shifted(direction, n)?;
        for header in &mut self.headers {
            *header = header.shifted(direction, n)?;
        }
        Ok(())
    }
}

/// Cell number `k` of line `line`, where lines are rows for `Axis::Row`.
fn line_cell(axis: Axis, line: u32, k: u32) -> Result<Position> {
    match axis {
        Axis::Row => Position::new(k, line),
        Axis::Column => Position::new(line, k),
    }
}
