//! `mysql-sql`: parameterized SQL against self-managed or Cloud SQL MySQL.

use std::sync::Arc;

use super::decode::MYSQL_WIRE_POLICY;
use super::sql::{decode_config, SqlFamily};
use super::ToolConfig;
use crate::sources::{Source, SqlPool, CLOUD_SQL_MYSQL_SOURCE_KIND, MYSQL_SOURCE_KIND};
use crate::types::Result;

pub const KIND: &str = "mysql-sql";

pub const COMPATIBLE_SOURCES: &[&str] = &[MYSQL_SOURCE_KIND, CLOUD_SQL_MYSQL_SOURCE_KIND];

fn pool(source: &dyn Source) -> Option<Arc<dyn SqlPool>> {
    source.as_mysql().map(|s| s.mysql_pool())
}

pub static FAMILY: SqlFamily = SqlFamily {
    kind: KIND,
    compatible_sources: COMPATIBLE_SOURCES,
    pool,
    decoding: MYSQL_WIRE_POLICY,
    requires_client_authorization: false,
};

pub fn new_config(name: &str, doc: serde_yaml::Value) -> Result<Box<dyn ToolConfig>> {
    decode_config(&FAMILY, name, doc)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{MemoryPool, MemorySource};

    #[test]
    fn test_family_accepts_both_mysql_kinds() {
        let pool = Arc::new(MemoryPool::default());
        for kind in COMPATIBLE_SOURCES {
            assert!(FAMILY.compatible_pool(&MemorySource::mysql(*kind, pool.clone())).is_ok());
        }
        assert!(FAMILY.compatible_pool(&MemorySource::mysql("postgres", pool.clone())).is_err());
        assert!(FAMILY.compatible_pool(&MemorySource::singlestore(pool)).is_err());
    }
}
