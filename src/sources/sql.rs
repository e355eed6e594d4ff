//! SQL connection-handle contract driven by the invocation engine.
//!
//! Mirrors the shape of a row-oriented driver: a statement yields a cursor
//! that reports column metadata, then alternates `advance` and `scan` until
//! exhausted. Dropping the cursor releases it.

use async_trait::async_trait;
use serde_json::Value;
use std::fmt::Debug;

use crate::types::Result;

/// Column metadata reported by the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    /// Backend-native type name, e.g. `JSON`, `VARCHAR`, `BIGINT`.
    pub database_type_name: String,
}

impl ColumnInfo {
    pub fn new(name: impl Into<String>, database_type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            database_type_name: database_type_name.into(),
        }
    }
}

/// A single scanned value as the driver hands it over.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    /// SQL NULL.
    Null,
    /// Undecoded byte buffer (text, JSON and blob columns on MySQL-wire drivers).
    Bytes(Vec<u8>),
    /// Value the driver already decoded.
    Value(Value),
}

impl From<Value> for RawValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => RawValue::Null,
            other => RawValue::Value(other),
        }
    }
}

impl From<&str> for RawValue {
    fn from(s: &str) -> Self {
        RawValue::Bytes(s.as_bytes().to_vec())
    }
}

/// An open connection pool able to run parameterized statements.
///
/// Implementations own their concurrency discipline; the engine calls
/// `query` concurrently from many invocations.
#[async_trait]
pub trait SqlPool: Send + Sync + Debug {
    /// Execute `statement` with positional bind `args`.
    async fn query(&self, statement: &str, args: &[Value]) -> Result<Box<dyn RowCursor>>;
}

/// Result cursor over one executed statement.
#[async_trait]
pub trait RowCursor: Send {
    /// Column names and native type names, in result order.
    fn columns(&self) -> Result<Vec<ColumnInfo>>;

    /// Move to the next row. `Ok(false)` once the result is exhausted.
    async fn advance(&mut self) -> Result<bool>;

    /// Read the current row, one value per column.
    fn scan(&mut self) -> Result<Vec<RawValue>>;
}
