//! Symbolic markers that resolve to a cell on a sheet.
//!
//! A marker is either a fixed cell, a defined name, or a pattern search that
//! starts from another marker and walks in one direction until a cell's text
//! matches.

use regex::Regex;
use std::fmt;

use crate::direction::Direction;
use crate::error::{Result, XlTemplateError};
use crate::grid::Grid;
use crate::position::Position;

#[derive(Debug, Clone)]
pub enum Marker {
    /// A fixed cell, optionally bound to a sheet name.
    Literal {
        position: Position,
        sheet: Option<String>,
    },
    /// A defined name whose value is an absolute `sheet!$COL$ROW` reference.
    Named(String),
    /// First cell within `max_range` steps of `from` whose text matches.
    Pattern {
        from: Box<Marker>,
        pattern: Regex,
        direction: Direction,
        max_range: u32,
    },
}

impl Marker {
    pub fn literal(position: Position) -> Self {
        Self::Literal {
            position,
            sheet: None,
        }
    }

    /// Literal marker from a coordinate string (`"B4"`).
    pub fn cell(coord: &str) -> Result<Self> {
        Ok(Self::literal(coord.parse()?))
    }

    /// Literal marker bound to a sheet; resolving it on another sheet fails.
    pub fn on_sheet(position: Position, sheet: impl Into<String>) -> Self {
        Self::Literal {
            position,
            sheet: Some(sheet.into()),
        }
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self::Named(name.into())
    }

    /// Pattern search; `pattern` is compiled here so a bad regex fails early.
    pub fn pattern(
        from: Marker,
        pattern: &str,
        direction: Direction,
        max_range: u32,
    ) -> Result<Self> {
        Ok(Self::Pattern {
            from: Box::new(from),
            pattern: Regex::new(pattern)?,
            direction,
            max_range,
        })
    }

    /// Resolve against a grid.
    pub fn resolve<G: Grid + ?Sized>(&self, grid: &G) -> Result<Position> {
        let pos = match self {
            Self::Literal { position, sheet } => {
                if let Some(sheet) = sheet {
                    check_sheet(grid, sheet)?;
                }
                *position
            }
            Self::Named(name) => {
                let value = grid.defined_name(name).ok_or_else(|| {
                    XlTemplateError::position(format!("Defined name {name} not found"))
                })?;
                let (pos, sheet) = Position::from_abs_string(&value)?;
                check_sheet(grid, &sheet)?;
                pos
            }
            Self::Pattern {
                from,
                pattern,
                direction,
                max_range,
            } => {
                let origin = from.resolve(grid)?;
                search(grid, origin, pattern, *direction, *max_range).ok_or_else(|| {
                    XlTemplateError::position(format!(
                        "Cell matching pattern {pattern} max. {max_range} cells {direction} from {origin} not found"
                    ))
                })?
            }
        };
        tracing::debug!(marker = %self, position = %pos, "resolved marker");
        Ok(pos)
    }
}

fn check_sheet<G: Grid + ?Sized>(grid: &G, sheet: &str) -> Result<()> {
    if !grid.sheet_exists(sheet) {
        return Err(XlTemplateError::position(format!(
            "Worksheet {sheet} not found"
        )));
    }
    if grid.sheet_name() != sheet {
        return Err(XlTemplateError::position(format!(
            "Position on sheet {sheet} used on sheet {}",
            grid.sheet_name()
        )));
    }
    Ok(())
}

fn search<G: Grid + ?Sized>(
    grid: &G,
    origin: Position,
    pattern: &Regex,
    direction: Direction,
    max_range: u32,
) -> Option<Position> {
    for d in 0..=i64::from(max_range) {
        let pos = origin.checked_shifted(direction, d)?;
        let text = pos.value(grid).map(|v| v.to_string()).unwrap_or_default();
        tracing::trace!(position = %pos, %text, "pattern scan");
        if pattern.is_match(&text) {
            return Some(pos);
        }
    }
    None
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal {
                position,
                sheet: Some(sheet),
            } => f.write_str(&position.to_abs_string(sheet)),
            Self::Literal { position, .. } => write!(f, "{position}"),
            Self::Named(name) => f.write_str(name),
            Self::Pattern {
                from,
                pattern,
                direction,
                ..
            } => write!(f, "/{pattern}/ {direction} of {from}"),
        }
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
    use crate::types::{CellValue, Workbook};

    fn workbook() -> Workbook {
        let mut wb = Workbook::new();
        let sheet = wb.add_sheet("Sheet1");
        for (col, name) in [(2, "First Name"), (3, "Last Name"), (4, "Email")] {
            sheet.set_value(3, col, Some(name.into()));
        }
        sheet.set_value(4, 2, Some("Hanson".into()));
        sheet.set_value(4, 3, Some(CellValue::Number(12.0)));
        wb.add_sheet("SheetE");
        wb.define_name("table_people", "Sheet1!$B$3");
        wb.define_name("broken", "#REF!");
        wb
    }

    #[test]
    fn test_literal() {
        let mut wb = workbook();
        let ws = wb.worksheet("Sheet1").unwrap();
        let pos = Marker::cell("A3").unwrap().resolve(&ws).unwrap();
        assert_eq!(pos.to_string(), "A3");
    }

    #[test]
    fn test_literal_sheet_checks() {
        let mut wb = workbook();
        let ws = wb.worksheet("Sheet1").unwrap();
        let p: Position = "B4".parse().unwrap();

        assert_eq!(Marker::on_sheet(p, "Sheet1").resolve(&ws).unwrap(), p);

        let err = Marker::on_sheet(p, "Nope").resolve(&ws).unwrap_err();
        assert_eq!(err.to_string(), "Invalid position: Worksheet Nope not found");

        assert!(matches!(
            Marker::on_sheet(p, "SheetE").resolve(&ws),
            Err(XlTemplateError::Position(_))
        ));
    }

    #[test]
    fn test_named() {
        let mut wb = workbook();
        let ws = wb.worksheet("Sheet1").unwrap();
        let pos = Marker::named("table_people").resolve(&ws).unwrap();
        assert_eq!(pos.to_string(), "B3");
    }

    #[test]
    fn test_named_errors() {
        let mut wb = workbook();
        {
            let ws = wb.worksheet("Sheet1").unwrap();
            let err = Marker::named("XYZ").resolve(&ws).unwrap_err();
            assert_eq!(err.to_string(), "Invalid position: Defined name XYZ not found");
            assert!(Marker::named("broken").resolve(&ws).is_err());
        }
        let ws = wb.worksheet("SheetE").unwrap();
        assert!(matches!(
            Marker::named("table_people").resolve(&ws),
            Err(XlTemplateError::Position(_))
        ));
    }

    #[test]
    fn test_pattern() {
        let mut wb = workbook();
        let ws = wb.worksheet("Sheet1").unwrap();
        let marker = Marker::pattern(
            Marker::named("table_people"),
            r"^Email$",
            Direction::Right,
            2,
        )
        .unwrap();
        assert_eq!(marker.resolve(&ws).unwrap().to_string(), "D3");

        // Search, not full match; distance 0 is the origin itself.
        let marker =
            Marker::pattern(Marker::named("table_people"), "Name", Direction::Right, 2).unwrap();
        assert_eq!(marker.resolve(&ws).unwrap().to_string(), "B3");

        // Numbers are matched on their display text.
        let marker =
            Marker::pattern(Marker::cell("B4").unwrap(), "^12$", Direction::Right, 1).unwrap();
        assert_eq!(marker.resolve(&ws).unwrap().to_string(), "C4");
    }

    #[test]
    fn test_pattern_not_found() {
        let mut wb = workbook();
        let ws = wb.worksheet("Sheet1").unwrap();
        let marker =
            Marker::pattern(Marker::named("table_people"), r"^XYZ$", Direction::Right, 2).unwrap();
        let err = marker.resolve(&ws).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid position: Cell matching pattern ^XYZ$ max. 2 cells right from B3 not found"
        );

        // Budget too small to reach the match.
        let marker = Marker::pattern(
            Marker::named("table_people"),
            r"^Email$",
            Direction::Right,
            1,
        )
        .unwrap();
        assert!(marker.resolve(&ws).is_err());
    }

    #[test]
    fn test_pattern_stops_at_sheet_edge() {
        let mut wb = workbook();
        let ws = wb.worksheet("Sheet1").unwrap();
        let marker =
            Marker::pattern(Marker::cell("B3").unwrap(), "^x$", Direction::Up, 100).unwrap();
        assert!(matches!(
            marker.resolve(&ws),
            Err(XlTemplateError::Position(_))
        ));
    }

    #[test]
    fn test_inner_error_propagates() {
        let mut wb = workbook();
        let ws = wb.worksheet("Sheet1").unwrap();
        let marker = Marker::pattern(Marker::named("XYZ"), "x", Direction::Down, 3).unwrap();
        let err = marker.resolve(&ws).unwrap_err();
        assert!(err.to_string().contains("Defined name XYZ not found"));
    }

    #[test]
    fn test_bad_pattern() {
        let err = Marker::pattern(Marker::named("a"), "(", Direction::Down, 1).unwrap_err();
        assert!(matches!(err, XlTemplateError::Pattern(_)));
    }
}
