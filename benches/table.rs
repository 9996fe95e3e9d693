//! Benchmarks for table reads, resizing writes and XLSX roundtrips.
//!
//! Run with: cargo bench
//!
//! Results are saved to `target/criterion/` with HTML reports.
#![allow(
    clippy::expect_used,
    clippy::expect_fun_call,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss
)]

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::{Cursor, Write};
use xltemplate::{
    CellValue, FieldType, FieldValue, Marker, Record, Schema, Table, TableOptions, Template,
    Workbook,
};
use zip::write::FileOptions;
use zip::ZipWriter;

const COLS: u32 = 8;

fn schema() -> Schema {
    (0..COLS).fold(Schema::new(), |s, c| {
        let kind = if c == 0 { FieldType::Text } else { FieldType::Float };
        s.field(format!("col_{c}"), kind)
    })
}

/// Header on row 1, `rows` records, then a footer two rows after the table.
fn workbook(rows: u32) -> Workbook {
    let mut wb = Workbook::new();
    let sheet = wb.add_sheet("Data");
    for c in 0..COLS {
        sheet.set_value(1, c + 1, Some(format!("Col {c}").into()));
        for r in 0..rows {
            let value = if c == 0 {
                CellValue::Text(format!("row {r}"))
            } else {
                CellValue::Number(f64::from(r * c))
            };
            sheet.set_value(r + 2, c + 1, Some(value));
        }
    }
    sheet.set_value(rows + 4, 1, Some("Footer".into()));
    wb
}

fn records(count: u32) -> Vec<Record> {
    (0..count)
        .map(|r| {
            Record::new(
                (0..COLS)
                    .map(|c| {
                        Some(if c == 0 {
                            FieldValue::Text(format!("new {r}"))
                        } else {
                            FieldValue::Float(f64::from(r + c))
                        })
                    })
                    .collect(),
            )
        })
        .collect()
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_read");
    for rows in [100u32, 1_000, 10_000] {
        let mut wb = workbook(rows);
        group.throughput(Throughput::Elements(u64::from(rows)));
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, _| {
            let mut ws = wb.worksheet("Data").expect("sheet");
            let mut table = Table::new(
                &mut ws,
                &Marker::cell("A1").expect("marker"),
                schema(),
                TableOptions::default(),
            )
            .expect("table");
            b.iter(|| black_box(table.read().len()));
        });
    }
    group.finish();
}

/// Grow a table by half its size, which inserts rows before the footer.
fn bench_write_grow(c: &mut Criterion) {
    let mut group = c.benchmark_group("table_write_grow");
    for rows in [100u32, 1_000] {
        let new_records = records(rows + rows / 2);
        group.bench_with_input(BenchmarkId::from_parameter(rows), &rows, |b, &rows| {
            b.iter_with_setup(
                || workbook(rows),
                |mut wb| {
                    let mut ws = wb.worksheet("Data").expect("sheet");
                    let mut table = Table::new(
                        &mut ws,
                        &Marker::cell("A1").expect("marker"),
                        schema(),
                        TableOptions::default(),
                    )
                    .expect("table");
                    table.read();
                    table.set_records(new_records.clone());
                    table.write().expect("write");
                },
            );
        });
    }
    group.finish();
}

/// Minimal XLSX with one sheet of numbers and a header row.
fn xlsx(rows: u32) -> Vec<u8> {
    let mut sheet = String::from(
        r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><sheetData>"#,
    );
    sheet.push_str(r#"<row r="1">"#);
    for c in 0..COLS {
        let col = xltemplate::cell_ref::col_to_letter(c + 1);
        sheet.push_str(&format!(
            r#"<c r="{col}1" t="inlineStr"><is><t>Col {c}</t></is></c>"#
        ));
    }
    sheet.push_str("</row>");
    for r in 2..rows + 2 {
        sheet.push_str(&format!(r#"<row r="{r}">"#));
        for c in 0..COLS {
            let col = xltemplate::cell_ref::col_to_letter(c + 1);
            sheet.push_str(&format!(r#"<c r="{col}{r}"><v>{}</v></c>"#, r * c));
        }
        sheet.push_str("</row>");
    }
    sheet.push_str("</sheetData></worksheet>");

    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
        ),
        (
            "_rels/.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            r#"<?xml version="1.0" encoding="UTF-8"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/></Relationships>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            r#"<?xml version="1.0" encoding="UTF-8"?><workbook xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main" xmlns:r="http://schemas.openxmlformats.org/officeDocument/2006/relationships"><sheets><sheet name="Data" sheetId="1" r:id="rId1"/></sheets></workbook>"#.to_string(),
        ),
        ("xl/worksheets/sheet1.xml", sheet),
    ];

    let mut zip = ZipWriter::new(Cursor::new(Vec::new()));
    let options = FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, content) in parts {
        zip.start_file(name, options).expect("start file");
        zip.write_all(content.as_bytes()).expect("write part");
    }
    zip.finish().expect("finish zip").into_inner()
}

/// Load, shrink the table to half and save.
fn bench_roundtrip(c: &mut Criterion) {
    let rows = 5_000u32;
    let data = xlsx(rows);
    let half = records(rows / 2);

    let mut group = c.benchmark_group("xlsx_roundtrip");
    group.throughput(Throughput::Bytes(data.len() as u64));
    group.bench_function("load_fill_save_5000", |b| {
        b.iter(|| {
            let mut template = Template::load(black_box(data.clone())).expect("load");
            {
                let mut ws = template.worksheet_mut("Data").expect("sheet");
                let mut table = Table::new(
                    &mut ws,
                    &Marker::cell("A1").expect("marker"),
                    schema(),
                    TableOptions::default(),
                )
                .expect("table");
                table.read();
                table.set_records(half.clone());
                table.write().expect("write");
            }
            black_box(template.save().expect("save"))
        });
    });
    group.finish();
}

criterion_group!(benches, bench_read, bench_write_grow, bench_roundtrip);
criterion_main!(benches);
