//! Configured backend connection providers.
//!
//! Pool management and connection setup belong to the connection layer. This
//! module only fixes the contract tools rely on: a source reports its kind and
//! exposes the connection handle of zero or more backend families through
//! explicit capability traits.

pub mod memory;
pub mod sql;

use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::Arc;

pub use memory::{MemoryPool, MemoryResult, MemorySource};
pub use sql::{ColumnInfo, RawValue, RowCursor, SqlPool};

/// Source kind of a SingleStore deployment.
pub const SINGLESTORE_SOURCE_KIND: &str = "singlestore";
/// Source kind of a self-managed MySQL server.
pub const MYSQL_SOURCE_KIND: &str = "mysql";
/// Source kind of a Cloud SQL for MySQL instance.
pub const CLOUD_SQL_MYSQL_SOURCE_KIND: &str = "cloud-sql-mysql";

/// Source name → source, as handed to `ToolConfig::initialize`.
pub type SourceMap = HashMap<String, Arc<dyn Source>>;

/// A configured backend connection provider.
///
/// Capability accessors default to `None`; a source overrides the ones for
/// the backend families it can serve.
pub trait Source: Send + Sync + Debug {
    /// Backend-kind identifier, e.g. `singlestore`.
    fn source_kind(&self) -> &str;

    fn as_singlestore(&self) -> Option<&dyn SingleStorePool> {
        None
    }

    fn as_mysql(&self) -> Option<&dyn MySqlPool> {
        None
    }
}

/// Capability: the source holds an open SingleStore connection pool.
pub trait SingleStorePool: Send + Sync {
    fn singlestore_pool(&self) -> Arc<dyn SqlPool>;
}

/// Capability: the source holds an open MySQL-protocol connection pool.
pub trait MySqlPool: Send + Sync {
    fn mysql_pool(&self) -> Arc<dyn SqlPool>;
}
