//! Tables anchored at a marker: header discovery, typed reads, and writes
//! that grow or shrink the sheet around the table.
//!
//! A table is a title line of headers running along `header_direction`, with
//! one record per line stacked along `body_direction`:
//!
//! ```text
//!   B3: First Name | Last Name | Email      <- headers, scanned Right
//!   B4: Hans       | Hanson    | h@x.org    <- record 1
//!   B5: ...                                 <- body grows Down
//! ```
//!
//! Writing a different number of records than the table currently holds
//! inserts or deletes whole lines so that content after the table keeps its
//! distance.

mod headers;
mod schema;
mod space;

pub use headers::header_regex;
pub use schema::{Field, FieldType, FieldValue, Record, Schema};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::direction::{Axis, Direction};
use crate::error::{Result, XlTemplateError};
use crate::grid::Grid;
use crate::marker::Marker;
use crate::position::Position;
use crate::range::Range;

/// Scan directions and blank tolerance of a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    pub header_direction: Direction,
    pub body_direction: Direction,
    /// Consecutive empty cells (header scan) or lines (read) to step over.
    pub max_blanks: u32,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            header_direction: Direction::Right,
            body_direction: Direction::Down,
            max_blanks: 1,
        }
    }
}

/// A table bound to a grid for its whole lifetime.
#[derive(Debug)]
pub struct Table<'g, G: Grid + ?Sized> {
    grid: &'g mut G,
    schema: Schema,
    options: TableOptions,
    initial: Position,
    /// Header cell of each schema field, in schema order.
    headers: Vec<Position>,
    /// Last header found by the scan; closes the title range.
    title_end: Position,
    records: Vec<Record>,
    /// Line of the last record, or `initial` when there is none.
    final_position: Position,
}

impl<'g, G: Grid + ?Sized> Table<'g, G> {
    /// Resolve `marker` and locate every header of `schema`.
    ///
    /// Fails with [`XlTemplateError::TableParse`] listing the headers that
    /// could not be found.
    pub fn new(
        grid: &'g mut G,
        marker: &Marker,
        schema: Schema,
        options: TableOptions,
    ) -> Result<Self> {
        if options.header_direction.axis() == options.body_direction.axis() {
            return Err(XlTemplateError::structure(format!(
                "header direction {} and body direction {} must be perpendicular",
                options.header_direction, options.body_direction
            )));
        }
        let initial = marker.resolve(&*grid)?;
        let layout = headers::locate(&*grid, initial, &schema, &options)?;
        tracing::debug!(
            %initial,
            fields = schema.len(),
            title_end = %layout.last,
            "located table headers"
        );
        Ok(Self {
            grid,
            schema,
            options,
            initial,
            headers: layout.positions,
            title_end: layout.last,
            records: Vec::new(),
            final_position: initial,
        })
    }

    pub fn grid(&self) -> &G {
        self.grid
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn options(&self) -> &TableOptions {
        &self.options
    }

    pub fn initial_position(&self) -> Position {
        self.initial
    }

    pub fn final_position(&self) -> Position {
        self.final_position
    }

    /// Header positions in schema order.
    pub fn headers(&self) -> &[Position] {
        &self.headers
    }

    pub fn header(&self, field: &str) -> Option<Position> {
        self.schema
            .index_of(field)
            .and_then(|i| self.headers.get(i).copied())
    }

    /// From the marker cell to the last header found.
    pub fn title_range(&self) -> Range {
        Range::from_positions(self.initial, self.title_end)
    }

    /// Number of record lines the sheet currently reserves for the table.
    pub fn initial_length(&self) -> i64 {
        self.initial
            .dir_distance(&self.final_position, self.options.body_direction)
    }

    /// Title range stretched over every record line.
    pub fn table_range(&self) -> Result<Range> {
        self.title_range()
            .extended(self.options.body_direction, self.initial_length())
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn records_mut(&mut self) -> &mut Vec<Record> {
        &mut self.records
    }

    /// Replace the records to be written by the next [`write`](Self::write).
    pub fn set_records(&mut self, records: Vec<Record>) {
        self.records = records;
    }

    /// Read every record line below (or beside) the headers.
    ///
    /// Reading stops after more than `max_blanks` consecutive blank lines or
    /// when the next line leaves the sheet's used range.
    pub fn read(&mut self) -> &[Record] {
        let body = self.options.body_direction;
        self.records.clear();
        self.final_position = self.initial;

        let mut blanks = 0;
        let mut line: i64 = 1;
        while blanks <= self.options.max_blanks {
            let Some(line_pos) = self.initial.checked_shifted(body, line) else {
                break;
            };
            if !line_pos.is_in(&*self.grid) {
                break;
            }

            let raw: Vec<_> = self
                .headers
                .iter()
                .map(|h| h.checked_shifted(body, line).and_then(|p| p.value(&*self.grid)))
                .collect();

            if raw.iter().all(Option::is_none) {
                blanks += 1;
            } else {
                blanks = 0;
                let values = self
                    .schema
                    .fields()
                    .iter()
                    .zip(&raw)
                    .map(|(field, value)| {
                        let decoded = field.kind.decode(value.as_ref());
                        if decoded.is_none() {
                            if let Some(value) = value {
                                tracing::warn!(
                                    field = %field.name,
                                    kind = ?field.kind,
                                    %value,
                                    line,
                                    "cell does not convert, reading as empty"
                                );
                            }
                        }
                        decoded
                    })
                    .collect();
                self.records.push(Record::new(values));
                self.final_position = line_pos;
            }
            line += 1;
        }

        tracing::debug!(records = self.records.len(), end = %self.final_position, "read table");
        &self.records
    }

    /// Write the current records, first resizing the table's space.
    pub fn write(&mut self) -> Result<()> {
        let count = self.records.len();
        self.adjust_space(count)?;

        let body = self.options.body_direction;
        let header_axis = self.options.header_direction.axis();
        // Lines without a style of their own take the first line's.
        let styles: Vec<Option<u32>> = self
            .headers
            .iter()
            .map(|h| {
                h.checked_shifted(body, 1)
                    .and_then(|p| self.grid.cell_style(p.row(), p.col()))
            })
            .collect();

        let mut cursor = self.initial;
        for record in &self.records {
            cursor = cursor.shifted_one(body)?;
            for (idx, (header, style)) in self.headers.iter().zip(&styles).enumerate() {
                let target = cursor.combine(header_axis, header);
                if let Some(style) = *style {
                    if self.grid.cell_style(target.row(), target.col()).is_none() {
                        self.grid.set_cell_style(target.row(), target.col(), style);
                    }
                }
                let value = record.get(idx).cloned().map(FieldValue::into_cell_value);
                target.set_value(&mut *self.grid, value);
            }
        }

        self.final_position = self.initial.shifted(body, len_i64(count)?)?;
        tracing::debug!(records = count, end = %self.final_position, "wrote table");
        Ok(())
    }

    /// Records as typed values, via a JSON object per record keyed by field name.
    pub fn records_as<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        self.records
            .iter()
            .map(|record| {
                let object: Map<String, Value> = self
                    .schema
                    .fields()
                    .iter()
                    .enumerate()
                    .map(|(idx, field)| {
                        let value = record
                            .get(idx)
                            .map(serde_json::to_value)
                            .transpose()?
                            .unwrap_or(Value::Null);
                        Ok((field.name.clone(), value))
                    })
                    .collect::<std::result::Result<_, serde_json::Error>>()?;
                Ok(serde_json::from_value(Value::Object(object))?)
            })
            .collect()
    }

    /// Replace the records from serializable values; each must serialize to a
    /// JSON object. Fields absent from an object are written as empty.
    pub fn set_records_from<T: Serialize>(&mut self, items: &[T]) -> Result<()> {
        let records = items
            .iter()
            .map(|item| match serde_json::to_value(item)? {
                Value::Object(object) => Ok(Record::new(
                    self.schema
                        .fields()
                        .iter()
                        .map(|field| {
                            object
                                .get(&field.name)
                                .and_then(|value| field.kind.from_json(value))
                        })
                        .collect(),
                )),
                other => Err(XlTemplateError::Json(<serde_json::Error as serde::de::Error>::custom(
                    format!("record must serialize to an object, got {other}"),
                ))),
            })
            .collect::<Result<Vec<_>>>()?;
        self.records = records;
        Ok(())
    }

    /// Index of the line a position sits on, for insert/delete.
    fn line_index(&self, pos: &Position) -> u32 {
        pos.coord(self.line_axis())
    }

    /// Lines inserted or deleted to resize the table run along the headers.
    fn line_axis(&self) -> Axis {
        self.options.header_direction.axis()
    }
}

pub(crate) fn len_i64(n: usize) -> Result<i64> {
    i64::try_from(n)
        .map_err(|_| XlTemplateError::structure(format!("{n} records do not fit the sheet")))
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
    use chrono::{NaiveDate, NaiveDateTime};

    fn people() -> Workbook {
        let mut wb = Workbook::new();
        let s = wb.add_sheet("Sheet1");
        for (col, name) in [(2, "Name"), (3, "Age"), (4, "Born")] {
            s.set_value(2, col, Some(name.into()));
        }
        s.set_value(3, 2, Some("Ann".into()));
        s.set_value(3, 3, Some(CellValue::Number(31.0)));
        s.set_value(
            3,
            4,
            Some(NaiveDate::from_ymd_opt(1993, 2, 1).unwrap().into()),
        );
        s.set_value(4, 2, Some("Bob".into()));
        s.set_value(4, 3, Some("unknown".into()));
        wb
    }

    fn schema() -> Schema {
        Schema::new()
            .field("name", FieldType::Text)
            .field("age", FieldType::Integer)
            .field("born", FieldType::DateTime)
    }

    #[test]
    fn test_parallel_directions_rejected() {
        let mut wb = people();
        let mut ws = wb.worksheet("Sheet1").unwrap();
        let options = TableOptions {
            header_direction: Direction::Right,
            body_direction: Direction::Left,
            max_blanks: 1,
        };
        let err = Table::new(&mut ws, &Marker::cell("B2").unwrap(), schema(), options).unwrap_err();
        assert!(matches!(err, XlTemplateError::Structure(_)));
    }

    #[test]
    fn test_read_decodes_leniently() {
        let mut wb = people();
        let mut ws = wb.worksheet("Sheet1").unwrap();
        let mut table = Table::new(
            &mut ws,
            &Marker::cell("B2").unwrap(),
            schema(),
            TableOptions::default(),
        )
        .unwrap();

        let records = table.read().to_vec();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].get(0), Some(&FieldValue::from("Ann")));
        assert_eq!(records[0].get(1), Some(&FieldValue::Integer(31)));
        assert!(matches!(records[0].get(2), Some(FieldValue::DateTime(_))));
        assert_eq!(records[1].get(1), None);
        assert_eq!(records[1].get(2), None);

        assert_eq!(table.final_position().to_string(), "B4");
        assert_eq!(table.initial_length(), 2);
        assert_eq!(table.title_range().to_string(), "B2:D2");
        assert_eq!(table.table_range().unwrap().to_string(), "B2:D4");
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Person {
        name: String,
        age: i64,
        born: Option<NaiveDateTime>,
    }

    #[test]
    fn test_serde_bridge() {
        let mut wb = people();
        let mut ws = wb.worksheet("Sheet1").unwrap();
        let mut table = Table::new(
            &mut ws,
            &Marker::cell("B2").unwrap(),
            schema(),
            TableOptions::default(),
        )
        .unwrap();
        table.read();

        let mut people: Vec<Person> = Vec::new();
        let err = table.records_as::<Person>();
        // Bob's age failed to decode, which a non-optional field rejects.
        assert!(err.is_err());

        table.records_mut().truncate(1);
        people.extend(table.records_as::<Person>().unwrap());
        assert_eq!(people[0].name, "Ann");
        assert_eq!(people[0].age, 31);

        people.push(Person {
            name: "Cid".into(),
            age: 40,
            born: None,
        });
        table.set_records_from(&people).unwrap();
        table.write().unwrap();
        drop(table);

        assert_eq!(ws.sheet().value(4, 2), Some(&CellValue::from("Cid")));
        assert_eq!(ws.sheet().value(4, 3), Some(&CellValue::Number(40.0)));
        assert_eq!(ws.sheet().value(4, 4), None);
    }

    #[test]
    fn test_set_records_from_rejects_scalars() {
        let mut wb = people();
        let mut ws = wb.worksheet("Sheet1").unwrap();
        let mut table = Table::new(
            &mut ws,
            &Marker::cell("B2").unwrap(),
            schema(),
            TableOptions::default(),
        )
        .unwrap();
        assert!(matches!(
            table.set_records_from(&[1, 2]),
            Err(XlTemplateError::Json(_))
        ));
    }
}
