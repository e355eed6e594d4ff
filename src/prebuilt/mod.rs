//! Default tool configurations per backend kind.
//!
//! Documents under `prebuilt/` are embedded by the build script and loaded
//! once on first access. Iteration follows [`PREBUILT_SOURCES`], not file
//! order.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::types::{Error, Result};

mod bundle {
    include!(concat!(env!("OUT_DIR"), "/prebuilt_bundle.rs"));
}

/// Backend kinds with a prebuilt configuration, in presentation order.
pub const PREBUILT_SOURCES: &[&str] = &[
    "alloydb-postgres-admin",
    "alloydb-postgres",
    "bigquery",
    "clickhouse",
    "cloud-sql-mssql",
    "cloud-sql-mysql",
    "cloud-sql-postgres",
    "dataplex",
    "firestore",
    "looker",
    "mssql",
    "mysql",
    "oceanbase",
    "postgres",
    "singlestore",
    "spanner-postgres",
    "spanner",
];

#[derive(Debug)]
struct Catalog {
    documents: HashMap<String, &'static [u8]>,
    keys: Vec<String>,
}

// Load failures are cached as text; `Error` is not `Clone`.
static CATALOG: OnceLock<std::result::Result<Catalog, String>> = OnceLock::new();

fn catalog() -> Result<&'static Catalog> {
    CATALOG
        .get_or_init(|| load(bundle::BUNDLE, PREBUILT_SOURCES).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|msg| Error::catalog_load(msg.clone()))
}

fn load(entries: &[(&str, &'static [u8])], order: &[&str]) -> Result<Catalog> {
    let mut documents = HashMap::with_capacity(entries.len());
    for (kind, bytes) in entries {
        if !order.contains(kind) {
            return Err(Error::catalog_load(format!(
                "bundled document {:?} has no place in the catalog order",
                kind
            )));
        }
        validate_document(kind, bytes)?;
        documents.insert(kind.to_string(), *bytes);
    }

    if let Some(missing) = order.iter().find(|k| !documents.contains_key(**k)) {
        return Err(Error::catalog_load(format!("no bundled document for {:?}", missing)));
    }

    let keys: Vec<String> = order.iter().map(|k| k.to_string()).collect();
    tracing::debug!(documents = keys.len(), version = bundle::BUNDLE_VERSION, "prebuilt catalog loaded");
    Ok(Catalog { documents, keys })
}

fn validate_document(kind: &str, bytes: &[u8]) -> Result<()> {
    let doc: serde_yaml::Value = serde_yaml::from_slice(bytes)
        .map_err(|e| Error::catalog_load(format!("document {:?} is not valid YAML: {}", kind, e)))?;
    match doc.get("tools") {
        Some(serde_yaml::Value::Mapping(tools)) if !tools.is_empty() => Ok(()),
        _ => Err(Error::catalog_load(format!(
            "document {:?} has no \"tools\" mapping",
            kind
        ))),
    }
}

/// Kind → document bytes, plus the ordered kind list.
pub fn load_prebuilt_tool_yamls() -> Result<(HashMap<String, &'static [u8]>, Vec<String>)> {
    let catalog = catalog()?;
    Ok((catalog.documents.clone(), catalog.keys.clone()))
}

/// Kinds with a prebuilt configuration, in catalog order.
pub fn get_prebuilt_sources() -> Result<Vec<String>> {
    Ok(catalog()?.keys.clone())
}

/// Document bytes for `kind`.
pub fn get(kind: &str) -> Result<&'static [u8]> {
    catalog()?
        .documents
        .get(kind)
        .copied()
        .ok_or_else(|| Error::catalog_not_found(kind))
}

/// Version stamped on the bundle at build time.
pub fn bundle_version() -> &'static str {
    bundle::BUNDLE_VERSION
}
