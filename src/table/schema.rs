//! Record schemas and the lenient cell ↔ field conversions.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::CellValue;

/// Declared type of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Integer,
    Float,
    Bool,
    DateTime,
}

/// A named, typed field. The name doubles as the header to look for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
}

impl Field {
    pub fn new(name: impl Into<String>, kind: FieldType) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Ordered list of fields; records are aligned to it by index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field append.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, kind: FieldType) -> Self {
        self.fields.push(Field::new(name, kind));
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name == name)
    }
}

impl FromIterator<Field> for Schema {
    fn from_iter<I: IntoIterator<Item = Field>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// A decoded field value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl FieldValue {
    #[allow(clippy::cast_precision_loss)]
    pub fn into_cell_value(self) -> CellValue {
        match self {
            Self::Text(s) => CellValue::Text(s),
            Self::Integer(i) => CellValue::Number(i as f64),
            Self::Float(f) => CellValue::Number(f),
            Self::Bool(b) => CellValue::Bool(b),
            Self::DateTime(dt) => CellValue::DateTime(dt),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for FieldValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<f64> for FieldValue {
    fn from(f: f64) -> Self {
        Self::Float(f)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(dt: NaiveDateTime) -> Self {
        Self::DateTime(dt)
    }
}

/// One table line, aligned to the schema: `None` is a missing value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    values: Vec<Option<FieldValue>>,
}

impl Record {
    pub fn new(values: Vec<Option<FieldValue>>) -> Self {
        Self { values }
    }

    pub fn get(&self, idx: usize) -> Option<&FieldValue> {
        self.values.get(idx).and_then(Option::as_ref)
    }

    pub fn values(&self) -> &[Option<FieldValue>] {
        &self.values
    }
}

impl From<Vec<Option<FieldValue>>> for Record {
    fn from(values: Vec<Option<FieldValue>>) -> Self {
        Self::new(values)
    }
}

/// Largest magnitude accepted when truncating floats to integers.
const I64_LIMIT: f64 = 9.0e18;

#[allow(clippy::cast_possible_truncation)]
fn float_to_i64(n: f64) -> Option<i64> {
    let t = n.trunc();
    (t.is_finite() && t.abs() < I64_LIMIT).then_some(t as i64)
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

impl FieldType {
    /// Decode a raw cell value.
    ///
    /// Missing cells become `""` for text and `0` for integers and stay
    /// missing otherwise. Date-times only pass through values that are
    /// already temporal. Anything that does not convert decodes to `None`.
    pub fn decode(self, raw: Option<&CellValue>) -> Option<FieldValue> {
        let Some(raw) = raw else {
            return match self {
                Self::Text => Some(FieldValue::Text(String::new())),
                Self::Integer => Some(FieldValue::Integer(0)),
                _ => None,
            };
        };
        match (self, raw) {
            (Self::Text, v) => Some(FieldValue::Text(v.to_string())),

            (Self::Integer, CellValue::Number(n)) => float_to_i64(*n).map(FieldValue::Integer),
            (Self::Integer, CellValue::Text(s)) => s.trim().parse().ok().map(FieldValue::Integer),
            (Self::Integer, CellValue::Bool(b)) => Some(FieldValue::Integer(i64::from(*b))),

            (Self::Float, CellValue::Number(n)) => Some(FieldValue::Float(*n)),
            (Self::Float, CellValue::Text(s)) => s.trim().parse().ok().map(FieldValue::Float),
            (Self::Float, CellValue::Bool(b)) => Some(FieldValue::Float(f64::from(u8::from(*b)))),

            (Self::Bool, CellValue::Bool(b)) => Some(FieldValue::Bool(*b)),
            (Self::Bool, CellValue::Number(n)) => Some(FieldValue::Bool(*n != 0.0)),
            (Self::Bool, CellValue::Text(s)) => parse_bool(s).map(FieldValue::Bool),

            (Self::DateTime, CellValue::DateTime(dt)) => Some(FieldValue::DateTime(*dt)),

            _ => None,
        }
    }

    /// Convert a JSON value from a serialized record into this field type.
    pub fn from_json(self, value: &Value) -> Option<FieldValue> {
        match (self, value) {
            (_, Value::Null) => None,

            (Self::Text, Value::String(s)) => Some(FieldValue::Text(s.clone())),
            (Self::Text, v) => Some(FieldValue::Text(v.to_string())),

            (Self::Integer, Value::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().and_then(float_to_i64))
                .map(FieldValue::Integer),
            (Self::Integer, Value::String(s)) => s.trim().parse().ok().map(FieldValue::Integer),

            (Self::Float, Value::Number(n)) => n.as_f64().map(FieldValue::Float),
            (Self::Float, Value::String(s)) => s.trim().parse().ok().map(FieldValue::Float),

            (Self::Bool, Value::Bool(b)) => Some(FieldValue::Bool(*b)),
            (Self::Bool, Value::String(s)) => parse_bool(s).map(FieldValue::Bool),

            (Self::DateTime, Value::String(s)) => s
                .parse::<NaiveDateTime>()
                .ok()
                .or_else(|| s.parse::<NaiveDate>().ok().map(|d| d.and_time(chrono::NaiveTime::MIN)))
                .map(FieldValue::DateTime),

            _ => None,
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
    use serde_json::json;
    use test_case::test_case;

    fn date() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(1990, 5, 17)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_missing_values() {
        assert_eq!(FieldType::Text.decode(None), Some(FieldValue::Text(String::new())));
        assert_eq!(FieldType::Integer.decode(None), Some(FieldValue::Integer(0)));
        assert_eq!(FieldType::Float.decode(None), None);
        assert_eq!(FieldType::Bool.decode(None), None);
        assert_eq!(FieldType::DateTime.decode(None), None);
    }

    #[test_case(FieldType::Text, CellValue::Number(42.0), Some(FieldValue::Text("42".into())) ; "number as text")]
    #[test_case(FieldType::Integer, CellValue::Number(180.7), Some(FieldValue::Integer(180)) ; "float truncates")]
    #[test_case(FieldType::Integer, CellValue::Text(" 12 ".into()), Some(FieldValue::Integer(12)) ; "integer text")]
    #[test_case(FieldType::Integer, CellValue::Text("tall".into()), None ; "integer garbage")]
    #[test_case(FieldType::Float, CellValue::Text("1.5".into()), Some(FieldValue::Float(1.5)) ; "float text")]
    #[test_case(FieldType::Float, CellValue::Bool(true), Some(FieldValue::Float(1.0)) ; "float bool")]
    #[test_case(FieldType::Bool, CellValue::Number(0.0), Some(FieldValue::Bool(false)) ; "bool zero")]
    #[test_case(FieldType::Bool, CellValue::Text("TRUE".into()), Some(FieldValue::Bool(true)) ; "bool text")]
    #[test_case(FieldType::DateTime, CellValue::Text("1990-05-17".into()), None ; "date strings are not parsed")]
    #[test_case(FieldType::Float, CellValue::Error("#DIV/0!".into()), None ; "error value")]
    fn test_decode(kind: FieldType, raw: CellValue, expected: Option<FieldValue>) {
        assert_eq!(kind.decode(Some(&raw)), expected);
    }

    #[test]
    fn test_decode_datetime_passthrough() {
        let raw = CellValue::DateTime(date());
        assert_eq!(
            FieldType::DateTime.decode(Some(&raw)),
            Some(FieldValue::DateTime(date()))
        );
    }

    #[test]
    fn test_from_json() {
        assert_eq!(FieldType::Integer.from_json(&json!(3)), Some(FieldValue::Integer(3)));
        assert_eq!(FieldType::Integer.from_json(&json!(3.9)), Some(FieldValue::Integer(3)));
        assert_eq!(FieldType::Float.from_json(&json!(2)), Some(FieldValue::Float(2.0)));
        assert_eq!(FieldType::Text.from_json(&json!(7)), Some(FieldValue::Text("7".into())));
        assert_eq!(FieldType::Bool.from_json(&json!(null)), None);
        assert_eq!(
            FieldType::DateTime.from_json(&json!("1990-05-17T00:00:00")),
            Some(FieldValue::DateTime(date()))
        );
        assert_eq!(
            FieldType::DateTime.from_json(&json!("1990-05-17")),
            Some(FieldValue::DateTime(date()))
        );
    }

    #[test]
    fn test_schema_serde() {
        let schema: Schema = serde_json::from_value(json!([
            {"name": "first_name", "type": "text"},
            {"name": "birthday", "type": "datetime"}
        ]))
        .unwrap();
        assert_eq!(
            schema,
            Schema::new()
                .field("first_name", FieldType::Text)
                .field("birthday", FieldType::DateTime)
        );
        assert_eq!(schema.index_of("birthday"), Some(1));
    }

    #[test]
    fn test_into_cell_value() {
        assert_eq!(FieldValue::Integer(5).into_cell_value(), CellValue::Number(5.0));
        assert_eq!(FieldValue::from("x").into_cell_value(), CellValue::from("x"));
    }
}
