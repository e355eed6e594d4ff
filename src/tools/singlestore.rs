//! `singlestore-sql`: parameterized SQL against a SingleStore source.

use std::sync::Arc;

use super::decode::MYSQL_WIRE_POLICY;
use super::sql::{decode_config, SqlFamily};
use super::ToolConfig;
use crate::sources::{Source, SqlPool, SINGLESTORE_SOURCE_KIND};
use crate::types::Result;

pub const KIND: &str = "singlestore-sql";

pub const COMPATIBLE_SOURCES: &[&str] = &[SINGLESTORE_SOURCE_KIND];

fn pool(source: &dyn Source) -> Option<Arc<dyn SqlPool>> {
    source.as_singlestore().map(|s| s.singlestore_pool())
}

pub static FAMILY: SqlFamily = SqlFamily {
    kind: KIND,
    compatible_sources: COMPATIBLE_SOURCES,
    pool,
    decoding: MYSQL_WIRE_POLICY,
    requires_client_authorization: false,
};

/// Registered constructor for [`KIND`].
pub fn new_config(name: &str, doc: serde_yaml::Value) -> Result<Box<dyn ToolConfig>> {
    decode_config(&FAMILY, name, doc)
}
