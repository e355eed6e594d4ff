//! In-memory source for dry runs, tests and benchmarks.
//!
//! A [`MemoryPool`] replays one programmed [`MemoryResult`] for every
//! statement it receives and records what was executed. Failure points can be
//! injected at query, scan and iteration time.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

use super::sql::{ColumnInfo, RawValue, RowCursor, SqlPool};
use super::{MySqlPool, SingleStorePool, Source};
use crate::types::{Error, Result};

/// Programmed result set and failure points.
#[derive(Debug, Clone, Default)]
pub struct MemoryResult {
    pub columns: Vec<ColumnInfo>,
    pub rows: Vec<Vec<RawValue>>,
    /// Fail `query` with this message.
    pub query_error: Option<String>,
    /// Fail `scan` on the row with this index.
    pub scan_error_at: Option<usize>,
    /// Fail `advance` after this many rows were produced.
    pub iteration_error_after: Option<usize>,
    /// Sleep before producing each row.
    pub row_delay: Option<Duration>,
}

impl MemoryResult {
    pub fn new(columns: Vec<ColumnInfo>, rows: Vec<Vec<RawValue>>) -> Self {
        Self {
            columns,
            rows,
            ..Default::default()
        }
    }
}

/// Statement and bind arguments received by a [`MemoryPool`].
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutedStatement {
    pub statement: String,
    pub args: Vec<Value>,
}

/// Connection pool that replays a programmed result.
#[derive(Debug, Default)]
pub struct MemoryPool {
    result: MemoryResult,
    executed: Mutex<Vec<ExecutedStatement>>,
    open_cursors: Arc<AtomicUsize>,
}

impl MemoryPool {
    pub fn new(result: MemoryResult) -> Self {
        Self {
            result,
            executed: Mutex::new(Vec::new()),
            open_cursors: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Statements executed so far, oldest first.
    pub async fn executed(&self) -> Vec<ExecutedStatement> {
        self.executed.lock().await.clone()
    }

    /// Cursors handed out and not yet dropped.
    pub fn open_cursors(&self) -> usize {
        self.open_cursors.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SqlPool for MemoryPool {
    async fn query(&self, statement: &str, args: &[Value]) -> Result<Box<dyn RowCursor>> {
        self.executed.lock().await.push(ExecutedStatement {
            statement: statement.to_string(),
            args: args.to_vec(),
        });

        if let Some(msg) = &self.result.query_error {
            return Err(Error::query_execution(msg.clone()));
        }

        self.open_cursors.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MemoryCursor {
            result: self.result.clone(),
            position: None,
            open_cursors: Arc::clone(&self.open_cursors),
        }))
    }
}

struct MemoryCursor {
    result: MemoryResult,
    /// Index of the current row; `None` before the first `advance`.
    position: Option<usize>,
    open_cursors: Arc<AtomicUsize>,
}

#[async_trait]
impl RowCursor for MemoryCursor {
    fn columns(&self) -> Result<Vec<ColumnInfo>> {
        Ok(self.result.columns.clone())
    }

    async fn advance(&mut self) -> Result<bool> {
        let next = self.position.map_or(0, |p| p + 1);

        if let Some(limit) = self.result.iteration_error_after {
            if next >= limit {
                return Err(Error::row_iteration(format!(
                    "connection lost after {} rows",
                    limit
                )));
            }
        }
        if let Some(delay) = self.result.row_delay {
            tokio::time::sleep(delay).await;
        }

        self.position = Some(next);
        Ok(next < self.result.rows.len())
    }

    fn scan(&mut self) -> Result<Vec<RawValue>> {
        let position = self
            .position
            .ok_or_else(|| Error::row_scan("scan called before advance"))?;
        if self.result.scan_error_at == Some(position) {
            return Err(Error::row_scan(format!("bad value in row {}", position)));
        }
        self.result
            .rows
            .get(position)
            .cloned()
            .ok_or_else(|| Error::row_scan(format!("no row at position {}", position)))
    }
}

impl Drop for MemoryCursor {
    fn drop(&mut self) {
        self.open_cursors.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Backend families a [`MemorySource`] answers for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Capabilities {
    pub singlestore: bool,
    pub mysql: bool,
}

/// Source backed by a [`MemoryPool`].
#[derive(Debug)]
pub struct MemorySource {
    kind: String,
    pool: Arc<MemoryPool>,
    capabilities: Capabilities,
}

impl MemorySource {
    pub fn new(kind: impl Into<String>, pool: Arc<MemoryPool>, capabilities: Capabilities) -> Self {
        Self {
            kind: kind.into(),
            pool,
            capabilities,
        }
    }

    /// A `singlestore` source.
    pub fn singlestore(pool: Arc<MemoryPool>) -> Self {
        Self::new(
            super::SINGLESTORE_SOURCE_KIND,
            pool,
            Capabilities {
                singlestore: true,
                mysql: false,
            },
        )
    }

    /// A MySQL-protocol source of the given kind.
    pub fn mysql(kind: impl Into<String>, pool: Arc<MemoryPool>) -> Self {
        Self::new(
            kind,
            pool,
            Capabilities {
                singlestore: false,
                mysql: true,
            },
        )
    }
}

impl Source for MemorySource {
    fn source_kind(&self) -> &str {
        &self.kind
    }

    fn as_singlestore(&self) -> Option<&dyn SingleStorePool> {
        if self.capabilities.singlestore {
            Some(self)
        } else {
            None
        }
    }

    fn as_mysql(&self) -> Option<&dyn MySqlPool> {
        if self.capabilities.mysql {
            Some(self)
        } else {
            None
        }
    }
}

impl SingleStorePool for MemorySource {
    fn singlestore_pool(&self) -> Arc<dyn SqlPool> {
        self.pool.clone()
    }
}

impl MySqlPool for MemorySource {
    fn mysql_pool(&self) -> Arc<dyn SqlPool> {
        self.pool.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn two_rows() -> MemoryResult {
        MemoryResult::new(
            vec![ColumnInfo::new("id", "BIGINT")],
            vec![vec![json!(1).into()], vec![json!(2).into()]],
        )
    }

    #[tokio::test]
    async fn test_replays_rows_and_records_statement() {
        let pool = MemoryPool::new(two_rows());
        let mut cursor = pool.query("SELECT id FROM t WHERE a = ?", &[json!("x")]).await.unwrap();

        assert_eq!(pool.open_cursors(), 1);
        assert!(cursor.advance().await.unwrap());
        assert_eq!(cursor.scan().unwrap(), vec![RawValue::Value(json!(1))]);
        assert!(cursor.advance().await.unwrap());
        assert!(!cursor.advance().await.unwrap());
        drop(cursor);

        assert_eq!(pool.open_cursors(), 0);
        let executed = pool.executed().await;
        assert_eq!(executed.len(), 1);
        assert_eq!(executed[0].args, vec![json!("x")]);
    }

    #[tokio::test]
    async fn test_iteration_error_after_limit() {
        let mut result = two_rows();
        result.iteration_error_after = Some(1);
        let pool = MemoryPool::new(result);
        let mut cursor = pool.query("SELECT 1", &[]).await.unwrap();

        assert!(cursor.advance().await.unwrap());
        assert!(matches!(cursor.advance().await, Err(Error::RowIteration(_))));
    }

    #[test]
    fn test_capabilities() {
        let pool = Arc::new(MemoryPool::default());
        let ss = MemorySource::singlestore(pool.clone());
        assert!(ss.as_singlestore().is_some());
        assert!(ss.as_mysql().is_none());

        let my = MemorySource::mysql("mysql", pool);
        assert_eq!(my.source_kind(), "mysql");
        assert!(my.as_mysql().is_some());
        assert!(my.as_singlestore().is_none());
    }
}
