//! Turns driver values into generic JSON rows.
//!
//! Drivers disagree on how text, JSON and NULL come back. A [`DecodingPolicy`]
//! maps backend-native type names onto one of three treatments:
//!
//! | Treatment    | Input                     | Output                      |
//! |--------------|---------------------------|-----------------------------|
//! | `Document`   | JSON payload (bytes/text) | parsed structure            |
//! | `Text`       | byte buffer               | UTF-8 string                |
//! | `Native`     | anything                  | unchanged (bytes → base64)  |
//!
//! NULL always becomes an explicit `null` regardless of column type.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};

use crate::sources::{ColumnInfo, RawValue};
use crate::types::{Error, Result};

/// One decoded result row, keyed by column name in result order.
pub type Row = Map<String, Value>;

/// Treatment applied to a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnDecoding {
    /// Embedded structured document; parse the payload.
    Document,
    /// Text the driver hands over as a byte buffer.
    Text,
    /// Store the driver's value unchanged.
    Native,
}

/// Native type names needing special treatment for one driver family.
#[derive(Debug, Clone, Copy)]
pub struct DecodingPolicy {
    pub document_types: &'static [&'static str],
    pub text_types: &'static [&'static str],
}

/// MySQL-wire drivers (SingleStore, MySQL) return `[]byte` for these.
pub const MYSQL_WIRE_POLICY: DecodingPolicy = DecodingPolicy {
    document_types: &["JSON"],
    text_types: &["TEXT", "VARCHAR", "NVARCHAR"],
};

impl DecodingPolicy {
    pub fn classify(&self, database_type_name: &str) -> ColumnDecoding {
        let matches = |names: &[&str]| names.iter().any(|n| n.eq_ignore_ascii_case(database_type_name));
        if matches(self.document_types) {
            ColumnDecoding::Document
        } else if matches(self.text_types) {
            ColumnDecoding::Text
        } else {
            ColumnDecoding::Native
        }
    }

    /// Per-column treatments for a result, computed once per invocation.
    pub fn plan(&self, columns: &[ColumnInfo]) -> Vec<ColumnDecoding> {
        columns
            .iter()
            .map(|c| self.classify(&c.database_type_name))
            .collect()
    }

    /// Decode one scanned row.
    pub fn decode_row(&self, columns: &[ColumnInfo], plan: &[ColumnDecoding], raw: Vec<RawValue>) -> Result<Row> {
        if raw.len() != columns.len() {
            return Err(Error::row_scan(format!(
                "expected {} values, got {}",
                columns.len(),
                raw.len()
            )));
        }

        let mut row = Row::with_capacity(columns.len());
        for ((column, decoding), value) in columns.iter().zip(plan).zip(raw) {
            let decoded = decode_value(*decoding, value)?;
            row.insert(column.name.clone(), decoded);
        }
        Ok(row)
    }
}

fn decode_value(decoding: ColumnDecoding, value: RawValue) -> Result<Value> {
    match (decoding, value) {
        (_, RawValue::Null) => Ok(Value::Null),
        (ColumnDecoding::Document, RawValue::Bytes(bytes)) => serde_json::from_slice(&bytes).map_err(|_| {
            Error::row_scan(format!(
                "unable to unmarshal json data {}",
                String::from_utf8_lossy(&bytes)
            ))
        }),
        (ColumnDecoding::Document, RawValue::Value(Value::String(text))) => serde_json::from_str(&text)
            .map_err(|_| Error::row_scan(format!("unable to unmarshal json data {}", text))),
        (ColumnDecoding::Text, RawValue::Bytes(bytes)) => Ok(Value::String(
            String::from_utf8(bytes).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned()),
        )),
        (ColumnDecoding::Native, RawValue::Bytes(bytes)) => Ok(Value::String(STANDARD.encode(bytes))),
        (_, RawValue::Value(value)) => Ok(value),
    }
}
