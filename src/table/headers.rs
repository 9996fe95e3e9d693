//! Fuzzy header discovery.

use regex::Regex;

use super::schema::Schema;
use super::TableOptions;
use crate::error::{Result, XlTemplateError};
use crate::grid::Grid;
use crate::position::Position;

/// Header pattern for a field name: case-insensitive, anchored at the start,
/// with every `_` accepting `_`, `-`, a space or nothing.
///
/// `first_name` matches "First Name", "first-name" and "FirstName:".
pub fn header_regex(name: &str) -> Result<Regex> {
    let body = name
        .split('_')
        .map(regex::escape)
        .collect::<Vec<_>>()
        .join(r"[_\- ]?");
    Ok(Regex::new(&format!("(?i)^{body}"))?)
}

/// Where the headers of a table were found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct HeaderLayout {
    /// One position per schema field, in schema order.
    pub positions: Vec<Position>,
    /// Last header matched during the scan.
    pub last: Position,
}

/// Walk from `initial` along the header direction matching cells to fields.
///
/// Each non-empty cell is tested against the still-unmatched fields in
/// declaration order and claims the first one that matches.
pub(crate) fn locate<G: Grid + ?Sized>(
    grid: &G,
    initial: Position,
    schema: &Schema,
    options: &TableOptions,
) -> Result<HeaderLayout> {
    let mut pending: Vec<(usize, Regex)> = schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| header_regex(&field.name).map(|re| (idx, re)))
        .collect::<Result<_>>()?;
    let mut found: Vec<Option<Position>> = vec![None; schema.len()];

    let mut blanks = 0;
    let mut last = initial;
    let mut cursor = Some(initial);

    while let Some(pos) = cursor {
        if blanks > options.max_blanks || pending.is_empty() || !pos.is_in(grid) {
            break;
        }
        match pos.value(grid) {
            Some(value) => {
                blanks = 0;
                let text = value.to_string();
                if let Some(k) = pending.iter().position(|(_, re)| re.is_match(&text)) {
                    let (idx, _) = pending.remove(k);
                    if let Some(slot) = found.get_mut(idx) {
                        *slot = Some(pos);
                    }
                    last = pos;
                    tracing::debug!(header = %text, position = %pos, "matched table header");
                }
            }
            None => blanks += 1,
        }
        cursor = pos.checked_shifted(options.header_direction, 1);
    }

    if !pending.is_empty() {
        return Err(XlTemplateError::TableParse {
            missing: pending
                .iter()
                .filter_map(|(i, _)| schema.fields().get(*i).map(|f| f.name.clone()))
                .collect(),
        });
    }
    let positions = found.into_iter().flatten().collect();

    Ok(HeaderLayout { positions, last })
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
    use crate::direction::Direction;
    use crate::table::FieldType;
    use crate::types::Workbook;
    use test_case::test_case;

    #[test_case("first_name", "First Name", true)]
    #[test_case("first_name", "first-name", true)]
    #[test_case("first_name", "FIRST_NAME", true)]
    #[test_case("first_name", "FirstName (given)", true ; "prefix match")]
    #[test_case("first_name", "My First Name", false ; "anchored at start")]
    #[test_case("first_name", "First  Name", false ; "one separator at most")]
    #[test_case("sum", "Sum", true)]
    #[test_case("a.b", "axb", false ; "name is escaped")]
    fn test_header_regex(name: &str, header: &str, matches: bool) {
        assert_eq!(header_regex(name).unwrap().is_match(header), matches);
    }

    fn sheet(cells: &[(u32, u32, &str)]) -> Workbook {
        let mut wb = Workbook::new();
        let s = wb.add_sheet("S");
        for &(row, col, v) in cells {
            s.set_value(row, col, Some(v.into()));
        }
        wb
    }

    fn schema(names: &[&str]) -> Schema {
        names
            .iter()
            .fold(Schema::new(), |s, n| s.field(*n, FieldType::Text))
    }

    #[test]
    fn test_locate_in_declaration_order() {
        let mut wb = sheet(&[(1, 1, "B"), (1, 2, "A"), (1, 3, "C")]);
        let ws = wb.worksheet("S").unwrap();
        let layout = locate(
            &ws,
            "A1".parse().unwrap(),
            &schema(&["a", "b", "c"]),
            &TableOptions::default(),
        )
        .unwrap();
        let cells: Vec<String> = layout.positions.iter().map(ToString::to_string).collect();
        assert_eq!(cells, vec!["B1", "A1", "C1"]);
        assert_eq!(layout.last.to_string(), "C1");
    }

    #[test]
    fn test_locate_crosses_allowed_blanks() {
        let mut wb = sheet(&[(1, 1, "a"), (1, 3, "b"), (1, 6, "c")]);
        let ws = wb.worksheet("S").unwrap();
        let options = TableOptions::default();

        let err = locate(&ws, "A1".parse().unwrap(), &schema(&["a", "b", "c"]), &options)
            .unwrap_err();
        assert_eq!(err.to_string(), "Could not find table headers: c");

        let options = TableOptions {
            max_blanks: 2,
            ..TableOptions::default()
        };
        assert!(locate(&ws, "A1".parse().unwrap(), &schema(&["a", "b", "c"]), &options).is_ok());
    }

    #[test]
    fn test_first_match_wins() {
        // "name" claims the first cell even though "name_2" would also match it.
        let mut wb = sheet(&[(1, 1, "Name 2"), (1, 2, "Name")]);
        let ws = wb.worksheet("S").unwrap();
        let err = locate(
            &ws,
            "A1".parse().unwrap(),
            &schema(&["name", "name_2"]),
            &TableOptions::default(),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "Could not find table headers: name_2");
    }

    #[test]
    fn test_locate_down() {
        let mut wb = sheet(&[(2, 2, "x"), (4, 2, "y")]);
        let ws = wb.worksheet("S").unwrap();
        let options = TableOptions {
            header_direction: Direction::Down,
            body_direction: Direction::Right,
            max_blanks: 1,
        };
        let layout = locate(&ws, "B2".parse().unwrap(), &schema(&["y", "x"]), &options).unwrap();
        assert_eq!(layout.positions[0].to_string(), "B4");
        assert_eq!(layout.positions[1].to_string(), "B2");
    }
}
