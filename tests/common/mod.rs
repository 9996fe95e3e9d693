//! Common test workbooks and record helpers.
//!
//! `test1` mirrors the reference template used across the integration tests:
//!
//! ```text
//! Sheet1
//!   B3:G3   First name | Last Name | Email | Birthday | Height | Favorite food
//!   B4:G7   four people
//!   B12     "Notes", comment on D12, filled E12
//!   B13:C13 "People" | =SUM(F4:F7)
//!   B24     Date       C24:E24 dates
//!   B25     (blank)
//!   B26:B28 Product A | Product B | Sum, values and formulas in C:E
//! Sheet2    empty
//! ```
#![allow(
    dead_code,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

use chrono::{NaiveDate, NaiveDateTime};
use xltemplate::{
    Direction, FieldType, FieldValue, Record, Schema, TableOptions, Workbook,
};

// Re-export fixtures for convenience
pub use super::fixtures::*;

/// 1990-05-17
pub const HANS_BIRTHDAY: f64 = 33010.0;

/// The reference template as XLSX bytes.
#[must_use]
pub fn test1() -> Vec<u8> {
    XlsxBuilder::new()
        .sheet(sheet1())
        .sheet(SheetBuilder::new("Sheet2"))
        .define_name("table_people", "Sheet1!$B$3")
        .define_name("table_prices", "Sheet1!$B$24")
        .build()
}

fn sheet1() -> SheetBuilder {
    SheetBuilder::new("Sheet1")
        .cell("B1", "People and prices")
        .row_values(
            "B3",
            &[
                "First name",
                "Last Name",
                "Email",
                "Birthday",
                "Height",
                "Favorite food",
            ],
        )
        .row_values("B4", &["Hans", "Hanson", "hans@example.org"])
        .date("E4", HANS_BIRTHDAY)
        .cell("F4", 180)
        .cell("G4", "Pizza")
        .row_values("B5", &["Greta", "Berg", "greta@example.org"])
        .date("E5", 31048.0)
        .cell("F5", 165)
        .cell("G5", "Sushi")
        .row_values("B6", &["Otto", "Lind", "otto@example.org"])
        .date("E6", 29221.0)
        .cell("F6", 190)
        .cell("G6", "Pasta")
        .row_values("B7", &["Ida", "Moe", "ida@example.org"])
        .date("E7", 36526.0)
        .cell("F7", 172)
        .cell("G7", "Tacos")
        .cell("B12", "Notes")
        .comment("D12", "Ann", "Keep this")
        .styled_cell("E12", STYLE_FILL)
        .row_height(12, 30.0)
        .cell("B13", "People")
        .formula("C13", "SUM(F4:F7)", 707.0)
        .cell("B24", "Date")
        .date("C24", 45292.0)
        .date("D24", 45293.0)
        .date("E24", 45294.0)
        .cell("B26", "Product A")
        .row_values("C26", &[10.5, 11.0, 9.75])
        .cell("B27", "Product B")
        .row_values("C27", &[3.0, 3.5, 4.0])
        .cell("B28", "Sum")
        .formula("C28", "C26+C27", 13.5)
        .formula("D28", "D26+D27", 14.5)
        .formula("E28", "E26+E27", 13.75)
}

/// Small sheets, one per layout the write path distinguishes.
///
/// - `Prices`: headers down column B, records to the right, a note at G2.
/// - `Upward`: headers on row 10, records growing up, a title at B5.
/// - `Solo`: a table with nothing after it.
#[must_use]
pub fn layouts() -> Vec<u8> {
    XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("Prices")
                .cell("B2", "Date")
                .cell("B3", "Product A")
                .cell("B4", "Product B")
                .date("C2", 45292.0)
                .date("D2", 45293.0)
                .row_values("C3", &[1.0, 2.0])
                .row_values("C4", &[3.0, 4.0])
                .cell("G2", "Note"),
        )
        .sheet(
            SheetBuilder::new("Upward")
                .cell("B5", "Title")
                .row_values("B8", &["Bob", "2"])
                .row_values("B9", &["Ann", "1"])
                .row_values("B10", &["Name", "Qty"]),
        )
        .sheet(
            SheetBuilder::new("Solo")
                .cell("A1", "Name")
                .cell("A2", "x")
                .cell("A3", "y")
                .cell("A4", "z"),
        )
        .build()
}

/// Parse fixture bytes.
#[must_use]
pub fn load(bytes: &[u8]) -> Workbook {
    xltemplate::parser::parse(bytes).expect("fixture parses")
}

#[must_use]
pub fn people_schema() -> Schema {
    Schema::new()
        .field("first_name", FieldType::Text)
        .field("last_name", FieldType::Text)
        .field("email", FieldType::Text)
        .field("birthday", FieldType::DateTime)
        .field("height", FieldType::Integer)
        .field("favorite_food", FieldType::Text)
}

#[must_use]
pub fn prices_schema() -> Schema {
    Schema::new()
        .field("date", FieldType::DateTime)
        .field("product_a", FieldType::Float)
        .field("product_b", FieldType::Float)
        .field("sum", FieldType::Float)
}

/// Headers down, records to the right.
#[must_use]
pub fn sideways(max_blanks: u32) -> TableOptions {
    TableOptions {
        header_direction: Direction::Down,
        body_direction: Direction::Right,
        max_blanks,
    }
}

#[must_use]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap()
}

#[must_use]
pub fn person(first: &str, last: &str, birthday: NaiveDateTime, height: i64) -> Record {
    Record::new(vec![
        Some(FieldValue::from(first)),
        Some(FieldValue::from(last)),
        Some(FieldValue::from(format!("{}@example.org", first.to_lowercase()))),
        Some(FieldValue::DateTime(birthday)),
        Some(FieldValue::Integer(height)),
        Some(FieldValue::from("Soup")),
    ])
}

/// Text of a cell, `None` when the cell has no value.
#[must_use]
pub fn text_at(workbook: &Workbook, sheet: &str, coord: &str) -> Option<String> {
    let (col, row) = xltemplate::cell_ref::parse_cell_ref(coord).unwrap();
    workbook
        .sheet(sheet)
        .unwrap()
        .value(row, col)
        .map(ToString::to_string)
}
