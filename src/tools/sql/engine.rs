//! Statement execution and result-set decoding.

use serde_json::Value;

use crate::sources::SqlPool;
use crate::tools::decode::{DecodingPolicy, Row};
use crate::types::{Error, Result};

/// Where a driver error surfaced; decides its category.
#[derive(Debug, Clone, Copy)]
enum Stage {
    Execute,
    Iterate,
    Scan,
}

impl Stage {
    fn wrap(self, err: Error) -> Error {
        match (self, err) {
            (Stage::Execute, e @ Error::QueryExecution(_))
            | (Stage::Iterate, e @ Error::RowIteration(_))
            | (Stage::Scan, e @ Error::RowScan(_)) => e,
            (Stage::Execute, e) => Error::query_execution(e.to_string()),
            (Stage::Iterate, e) => Error::row_iteration(e.to_string()),
            (Stage::Scan, e) => Error::row_scan(e.to_string()),
        }
    }
}

/// Execute `statement` with positional `args` and decode every row.
///
/// All-or-nothing: a failure on any row discards the rows read so far. The
/// cursor is dropped on every return path.
pub async fn query_rows(
    pool: &dyn SqlPool,
    statement: &str,
    args: &[Value],
    policy: &DecodingPolicy,
) -> Result<Vec<Row>> {
    let mut cursor = pool
        .query(statement, args)
        .await
        .map_err(|e| Stage::Execute.wrap(e))?;

    let columns = cursor
        .columns()
        .map_err(|e| Stage::Execute.wrap(e).context("unable to retrieve column metadata"))?;
    let plan = policy.plan(&columns);
    tracing::trace!(columns = columns.len(), "statement executed");

    let mut rows = Vec::new();
    while cursor.advance().await.map_err(|e| Stage::Iterate.wrap(e))? {
        let raw = cursor.scan().map_err(|e| Stage::Scan.wrap(e))?;
        rows.push(policy.decode_row(&columns, &plan, raw)?);
    }
    Ok(rows)
}
