//! JSON table specifications.
//!
//! A spec names where a table starts, which fields it has and how it is laid
//! out:
//!
//! ```json
//! {
//!   "marker": {"pattern": "^Email$", "from": {"name": "table_people"},
//!              "direction": "right", "max_range": 2},
//!   "fields": [{"name": "email", "type": "text"}],
//!   "body_direction": "down"
//! }
//! ```

use serde::{Deserialize, Serialize};

use crate::direction::Direction;
use crate::error::Result;
use crate::grid::Grid;
use crate::marker::Marker;
use crate::table::{Schema, Table, TableOptions};

/// Serializable form of a [`Marker`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MarkerSpec {
    Pattern {
        pattern: String,
        from: Box<MarkerSpec>,
        direction: Direction,
        max_range: u32,
    },
    Cell {
        cell: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sheet: Option<String>,
    },
    Name {
        name: String,
    },
}

impl MarkerSpec {
    /// Build the marker, compiling patterns and parsing coordinates.
    pub fn to_marker(&self) -> Result<Marker> {
        Ok(match self {
            Self::Pattern {
                pattern,
                from,
                direction,
                max_range,
            } => Marker::pattern(from.to_marker()?, pattern, *direction, *max_range)?,
            Self::Cell { cell, sheet: None } => Marker::cell(cell)?,
            Self::Cell {
                cell,
                sheet: Some(sheet),
            } => Marker::on_sheet(cell.parse()?, sheet.clone()),
            Self::Name { name } => Marker::named(name.clone()),
        })
    }
}

/// A complete table description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub marker: MarkerSpec,
    pub fields: Schema,
    #[serde(flatten)]
    pub options: TableOptions,
}

impl TableSpec {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn marker(&self) -> Result<Marker> {
        self.marker.to_marker()
    }

    pub fn schema(&self) -> &Schema {
        &self.fields
    }

    pub fn options(&self) -> TableOptions {
        self.options
    }

    /// Open the described table on `grid`.
    pub fn open<'g, G: Grid + ?Sized>(&self, grid: &'g mut G) -> Result<Table<'g, G>> {
        Table::new(grid, &self.marker()?, self.fields.clone(), self.options)
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
    use crate::error::XlTemplateError;
    use crate::table::FieldType;

    #[test]
    fn test_defaults() {
        let spec = TableSpec::from_json(
            r#"{"marker": {"name": "table_people"}, "fields": [{"name": "email", "type": "text"}]}"#,
        )
        .unwrap();
        assert_eq!(spec.options(), TableOptions::default());
        assert_eq!(spec.schema(), &Schema::new().field("email", FieldType::Text));
        assert!(matches!(spec.marker().unwrap(), Marker::Named(n) if n == "table_people"));
    }

    #[test]
    fn test_nested_pattern_and_options() {
        let spec = TableSpec::from_json(
            r#"{
                "marker": {"pattern": "^Date$", "from": {"cell": "B20", "sheet": "Sheet1"},
                           "direction": "down", "max_range": 10},
                "fields": [{"name": "date", "type": "datetime"}, {"name": "sum", "type": "float"}],
                "header_direction": "down",
                "body_direction": "right",
                "max_blanks": 0
            }"#,
        )
        .unwrap();
        assert_eq!(spec.options().header_direction, Direction::Down);
        assert_eq!(spec.options().body_direction, Direction::Right);
        assert_eq!(spec.options().max_blanks, 0);

        match spec.marker().unwrap() {
            Marker::Pattern {
                from,
                direction,
                max_range,
                ..
            } => {
                assert_eq!(direction, Direction::Down);
                assert_eq!(max_range, 10);
                assert!(
                    matches!(*from, Marker::Literal { sheet: Some(ref s), .. } if s == "Sheet1")
                );
            }
            other => panic!("unexpected marker {other:?}"),
        }
    }

    #[test]
    fn test_invalid_specs() {
        assert!(matches!(
            TableSpec::from_json(r#"{"marker": {"nope": 1}, "fields": []}"#),
            Err(XlTemplateError::Json(_))
        ));
        let spec = TableSpec::from_json(
            r#"{"marker": {"cell": "b3"}, "fields": []}"#,
        )
        .unwrap();
        assert!(matches!(spec.marker(), Err(XlTemplateError::Position(_))));
    }
}
