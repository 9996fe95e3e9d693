//! Writes that resize the space a table occupies.
#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::float_cmp,
    clippy::panic
)]

mod common;
mod fixtures;

use common::*;
use xltemplate::{
    CellValue, Direction, FieldType, FieldValue, Marker, Record, Schema, Table, TableOptions,
    Workbook, XlTemplateError,
};

fn write_people(wb: &mut Workbook, records: Vec<Record>) -> xltemplate::Result<()> {
    let mut ws = wb.worksheet("Sheet1")?;
    let mut table = Table::new(
        &mut ws,
        &Marker::named("table_people"),
        people_schema(),
        TableOptions::default(),
    )?;
    table.read();
    table.set_records(records);
    table.write()?;
    assert_eq!(table.initial_length(), i64::try_from(table.records().len()).unwrap());
    Ok(())
}

fn six_people() -> Vec<Record> {
    ["Ada", "Ben", "Cy", "Dee", "Eve", "Fay"]
        .iter()
        .zip(0..)
        .map(|(name, i)| person(name, "Doe", date(1980 + i, 1, 1), 170 + i64::from(i)))
        .collect()
}

#[test]
fn test_grow_inserts_rows() {
    let mut wb = load(&test1());
    write_people(&mut wb, six_people()).unwrap();

    for (row, name) in (4..=9).zip(["Ada", "Ben", "Cy", "Dee", "Eve", "Fay"]) {
        assert_eq!(text_at(&wb, "Sheet1", &format!("B{row}")).as_deref(), Some(name));
    }
    // Everything after the table moved two rows down, with its gap intact.
    assert_eq!(text_at(&wb, "Sheet1", "B10"), None);
    assert_eq!(text_at(&wb, "Sheet1", "B13"), None);
    assert_eq!(text_at(&wb, "Sheet1", "B14").as_deref(), Some("Notes"));
    assert_eq!(text_at(&wb, "Sheet1", "B26").as_deref(), Some("Date"));
    assert_eq!(text_at(&wb, "Sheet1", "B30").as_deref(), Some("Sum"));

    let sheet = wb.sheet("Sheet1").unwrap();
    assert!(sheet.cell(14, 4).unwrap().has_comment());
    assert!(sheet.cell(14, 5).unwrap().has_style());
    assert_eq!(sheet.cell(15, 3).unwrap().formula.as_deref(), Some("SUM(F6:F9)"));
    assert_eq!(sheet.cell(30, 3).unwrap().formula.as_deref(), Some("C28+C29"));
    assert!(sheet.row_heights.iter().any(|rh| rh.row == 14));
}

#[test]
fn test_grow_copies_first_line_styles() {
    let mut wb = load(&test1());
    write_people(&mut wb, six_people()).unwrap();

    let sheet = wb.sheet("Sheet1").unwrap();
    assert_eq!(sheet.cell(9, 5).unwrap().style_idx, Some(STYLE_DATE));
    assert_eq!(sheet.value(9, 5), Some(&CellValue::DateTime(date(1985, 1, 1))));
    assert_eq!(sheet.cell(9, 2).unwrap().style_idx, None);
}

#[test]
fn test_shrink_deletes_rows() {
    let mut wb = load(&test1());
    let records = six_people().into_iter().take(2).collect();
    write_people(&mut wb, records).unwrap();

    assert_eq!(text_at(&wb, "Sheet1", "B4").as_deref(), Some("Ada"));
    assert_eq!(text_at(&wb, "Sheet1", "B5").as_deref(), Some("Ben"));
    assert_eq!(text_at(&wb, "Sheet1", "B6"), None);
    assert_eq!(text_at(&wb, "Sheet1", "B10").as_deref(), Some("Notes"));
    assert_eq!(text_at(&wb, "Sheet1", "B22").as_deref(), Some("Date"));

    let sheet = wb.sheet("Sheet1").unwrap();
    assert!(sheet.cell(10, 4).unwrap().has_comment());
    assert_eq!(sheet.cell(11, 3).unwrap().formula.as_deref(), Some("SUM(F2:F5)"));
}

#[test]
fn test_same_size_write_moves_nothing() {
    let mut wb = load(&test1());
    let records = six_people().into_iter().take(4).collect();
    write_people(&mut wb, records).unwrap();
    assert_eq!(text_at(&wb, "Sheet1", "B7").as_deref(), Some("Dee"));
    assert_eq!(text_at(&wb, "Sheet1", "B12").as_deref(), Some("Notes"));
}

#[test]
fn test_missing_values_clear_cells() {
    let mut wb = load(&test1());
    let mut records = six_people();
    records.truncate(4);
    records[0] = Record::new(vec![Some(FieldValue::from("Solo")), None, None, None, None, None]);
    write_people(&mut wb, records).unwrap();

    assert_eq!(text_at(&wb, "Sheet1", "B4").as_deref(), Some("Solo"));
    assert_eq!(text_at(&wb, "Sheet1", "C4"), None);
    // The date style survives a cleared value.
    assert_eq!(
        wb.sheet("Sheet1").unwrap().cell(4, 5).unwrap().style_idx,
        Some(STYLE_DATE)
    );
}

#[test]
fn test_blocked_insert_is_a_structure_error() {
    let bytes = XlsxBuilder::new()
        .sheet(sheet_with_prices_note())
        .define_name("table_prices", "Sheet1!$B$24")
        .build();
    let mut wb = load(&bytes);
    let mut ws = wb.worksheet("Sheet1").unwrap();
    let mut table = Table::new(
        &mut ws,
        &Marker::named("table_prices"),
        prices_schema(),
        sideways(1),
    )
    .unwrap();
    table.read();
    let mut records = table.records().to_vec();
    records.push(records[0].clone());
    table.set_records(records);

    // Every column between the table and H24 has people data above it.
    let err = table.write().unwrap_err();
    assert!(matches!(err, XlTemplateError::Structure(_)), "{err}");
}

#[test]
fn test_blocked_shrink_leaves_sheet_untouched() {
    let bytes = XlsxBuilder::new()
        .sheet(
            SheetBuilder::new("S")
                .row_values("B3", &["Name", "Qty"])
                .row_values("B4", &["a", "1"])
                .row_values("B5", &["b", "2"])
                .row_values("B6", &["c", "3"])
                .row_values("B7", &["d", "4"])
                .cell("H6", "side")
                .cell("B10", "after"),
        )
        .build();
    let mut wb = load(&bytes);
    {
        let mut ws = wb.worksheet("S").unwrap();
        let schema = Schema::new()
            .field("name", FieldType::Text)
            .field("qty", FieldType::Text);
        let mut table = Table::new(
            &mut ws,
            &Marker::cell("B3").unwrap(),
            schema,
            TableOptions::default(),
        )
        .unwrap();
        table.read();
        let mut records = table.records().to_vec();
        records.truncate(1);
        table.set_records(records);

        let err = table.write().unwrap_err();
        assert!(matches!(err, XlTemplateError::Structure(_)), "{err}");
        assert!(err.to_string().contains("line 6 is not empty"), "{err}");
        assert_eq!(table.final_position().to_string(), "B7");
    }

    assert_eq!(text_at(&wb, "S", "B7").as_deref(), Some("d"));
    assert_eq!(text_at(&wb, "S", "C7").as_deref(), Some("4"));
    assert_eq!(text_at(&wb, "S", "H6").as_deref(), Some("side"));
    assert_eq!(text_at(&wb, "S", "B10").as_deref(), Some("after"));
    assert_eq!(text_at(&wb, "S", "B9"), None);
}

fn sheet_with_prices_note() -> SheetBuilder {
    SheetBuilder::new("Sheet1")
        .row_values(
            "B3",
            &["First name", "Last Name", "Email", "Birthday", "Height", "Favorite food"],
        )
        .cell("B24", "Date")
        .date("C24", 45292.0)
        .cell("B26", "Product A")
        .cell("C26", 1.0)
        .cell("B27", "Product B")
        .cell("C27", 2.0)
        .cell("B28", "Sum")
        .cell("C28", 3.0)
        .cell("H24", "Note")
}

fn prices_table_write(sheet: &str, count: usize) -> Workbook {
    let mut wb = load(&layouts());
    {
        let mut ws = wb.worksheet(sheet).unwrap();
        let schema = Schema::new()
            .field("date", FieldType::DateTime)
            .field("product_a", FieldType::Float)
            .field("product_b", FieldType::Float);
        let mut table =
            Table::new(&mut ws, &Marker::cell("B2").unwrap(), schema, sideways(1)).unwrap();
        table.read();
        let records = (0..count)
            .map(|i| {
                let n = f64::from(u32::try_from(i).unwrap());
                Record::new(vec![
                    Some(FieldValue::DateTime(
                        date(2025, 1, 1) + chrono::Duration::days(i64::try_from(i).unwrap()),
                    )),
                    Some(FieldValue::Float(n)),
                    Some(FieldValue::Float(n * 2.0)),
                ])
            })
            .collect();
        table.set_records(records);
        table.write().unwrap();
        let last_col = xltemplate::cell_ref::col_to_letter(2 + u32::try_from(count).unwrap());
        assert_eq!(table.final_position().to_string(), format!("{last_col}2"));
    }
    wb
}

#[test]
fn test_sideways_grow_inserts_columns() {
    let wb = prices_table_write("Prices", 4);
    assert_eq!(text_at(&wb, "Prices", "F4").as_deref(), Some("6"));
    assert_eq!(text_at(&wb, "Prices", "G2"), None);
    assert_eq!(text_at(&wb, "Prices", "I2").as_deref(), Some("Note"));
    assert_eq!(
        wb.sheet("Prices").unwrap().value(2, 6),
        Some(&CellValue::DateTime(date(2025, 1, 4)))
    );
}

#[test]
fn test_sideways_shrink_deletes_columns() {
    let wb = prices_table_write("Prices", 1);
    assert_eq!(text_at(&wb, "Prices", "C3").as_deref(), Some("0"));
    assert_eq!(text_at(&wb, "Prices", "D3"), None);
    assert_eq!(text_at(&wb, "Prices", "F2").as_deref(), Some("Note"));
}

#[test]
fn test_shrink_without_content_after_clears() {
    let mut wb = load(&layouts());
    {
        let mut ws = wb.worksheet("Solo").unwrap();
        let schema = Schema::new().field("name", FieldType::Text);
        let mut table = Table::new(
            &mut ws,
            &Marker::cell("A1").unwrap(),
            schema,
            TableOptions::default(),
        )
        .unwrap();
        assert_eq!(table.read().len(), 3);
        table.set_records(vec![Record::new(vec![Some(FieldValue::from("only"))])]);
        table.write().unwrap();
        assert_eq!(table.final_position().to_string(), "A2");
    }
    assert_eq!(text_at(&wb, "Solo", "A2").as_deref(), Some("only"));
    assert_eq!(text_at(&wb, "Solo", "A3"), None);
    assert_eq!(text_at(&wb, "Solo", "A4"), None);
}

#[test]
fn test_grow_without_content_after() {
    let mut wb = load(&layouts());
    {
        let mut ws = wb.worksheet("Solo").unwrap();
        let schema = Schema::new().field("name", FieldType::Text);
        let mut table = Table::new(
            &mut ws,
            &Marker::cell("A1").unwrap(),
            schema,
            TableOptions::default(),
        )
        .unwrap();
        table.read();
        table
            .set_records_from(&[
                serde_json::json!({"name": "a"}),
                serde_json::json!({"name": "b"}),
                serde_json::json!({"name": "c"}),
                serde_json::json!({"name": "d"}),
                serde_json::json!({"name": "e"}),
            ])
            .unwrap();
        table.write().unwrap();
    }
    assert_eq!(text_at(&wb, "Solo", "A6").as_deref(), Some("e"));
}

fn upward_write(count: usize) -> (Workbook, String, String) {
    let mut wb = load(&layouts());
    let (initial, last) = {
        let mut ws = wb.worksheet("Upward").unwrap();
        let schema = Schema::new()
            .field("name", FieldType::Text)
            .field("qty", FieldType::Integer);
        let options = TableOptions {
            body_direction: Direction::Up,
            ..TableOptions::default()
        };
        let mut table =
            Table::new(&mut ws, &Marker::cell("B10").unwrap(), schema, options).unwrap();
        table.read();
        let records = (0..count)
            .map(|i| {
                Record::new(vec![
                    Some(FieldValue::from(format!("n{i}"))),
                    Some(FieldValue::Integer(i64::try_from(i).unwrap())),
                ])
            })
            .collect();
        table.set_records(records);
        table.write().unwrap();
        (
            table.initial_position().to_string(),
            table.final_position().to_string(),
        )
    };
    (wb, initial, last)
}

#[test]
fn test_upward_grow() {
    let (wb, initial, last) = upward_write(4);
    assert_eq!(initial, "B12");
    assert_eq!(last, "B8");
    assert_eq!(text_at(&wb, "Upward", "B12").as_deref(), Some("Name"));
    assert_eq!(text_at(&wb, "Upward", "B11").as_deref(), Some("n0"));
    assert_eq!(text_at(&wb, "Upward", "B8").as_deref(), Some("n3"));
    assert_eq!(text_at(&wb, "Upward", "B7"), None);
    assert_eq!(text_at(&wb, "Upward", "B5").as_deref(), Some("Title"));
}

#[test]
fn test_upward_shrink() {
    let (wb, initial, last) = upward_write(1);
    assert_eq!(initial, "B9");
    assert_eq!(last, "B8");
    assert_eq!(text_at(&wb, "Upward", "B9").as_deref(), Some("Name"));
    assert_eq!(text_at(&wb, "Upward", "C8").as_deref(), Some("0"));
    assert_eq!(text_at(&wb, "Upward", "B7"), None);
    assert_eq!(text_at(&wb, "Upward", "B5").as_deref(), Some("Title"));
}
