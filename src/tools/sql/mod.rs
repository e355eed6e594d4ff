//! Parameterized SQL tools shared by the SQL backend families.
//!
//! A family fixes the tool kind, the capability accessor used to obtain the
//! connection handle, the source-kind allow-list and the row decoding policy.
//! Configuration, initialization and invocation are identical across families.

pub mod engine;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

use super::decode::{DecodingPolicy, Row};
use super::manifest::{is_authorized, Manifest, ProtocolManifest};
use super::parameters::{
    get_params, parse_params, process_parameters, resolve_template_params, Claims, ParamValues, Parameters,
};
use super::{AccessToken, InvocationContext, Tool, ToolConfig};
use crate::sources::{Source, SourceMap, SqlPool};
use crate::types::{Error, Result, ResultExt};

// =============================================================================
// Backend family
// =============================================================================

/// Static description of one SQL tool kind.
pub struct SqlFamily {
    pub kind: &'static str,
    /// Source kinds this tool kind accepts.
    pub compatible_sources: &'static [&'static str],
    /// Capability accessor for the family's connection handle.
    pub pool: fn(&dyn Source) -> Option<Arc<dyn SqlPool>>,
    pub decoding: DecodingPolicy,
    pub requires_client_authorization: bool,
}

impl std::fmt::Debug for SqlFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqlFamily")
            .field("kind", &self.kind)
            .field("compatible_sources", &self.compatible_sources)
            .field("decoding", &self.decoding)
            .finish_non_exhaustive()
    }
}

impl SqlFamily {
    /// Connection handle of `source`, if it has the capability AND its kind is
    /// on the allow-list.
    pub fn compatible_pool(&self, source: &dyn Source) -> Result<Arc<dyn SqlPool>> {
        let kind = source.source_kind();
        let allowed = self.compatible_sources.iter().any(|k| *k == kind);
        match (self.pool)(source) {
            Some(pool) if allowed => Ok(pool),
            _ => Err(Error::incompatible_source(self.kind, self.compatible_sources)),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Configuration document of a SQL tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SqlToolConfig {
    /// Taken from the key the tool is declared under.
    #[serde(default)]
    pub name: String,
    pub kind: String,
    pub source: String,
    pub description: String,
    pub statement: String,
    #[serde(default)]
    pub auth_required: Vec<String>,
    #[serde(default)]
    pub parameters: Parameters,
    #[serde(default)]
    pub template_parameters: Parameters,
}

impl SqlToolConfig {
    fn validate(&self) -> Result<()> {
        let mandatory = [
            ("name", &self.name),
            ("kind", &self.kind),
            ("source", &self.source),
            ("description", &self.description),
            ("statement", &self.statement),
        ];
        for (field, value) in mandatory {
            if value.trim().is_empty() {
                return Err(Error::config_decode(format!(
                    "tool {:?}: field {:?} is required",
                    self.name, field
                )));
            }
        }
        Ok(())
    }
}

/// Decoded configuration bound to its family.
#[derive(Debug, Clone)]
pub struct SqlConfig {
    family: &'static SqlFamily,
    config: SqlToolConfig,
}

impl SqlConfig {
    pub fn new(family: &'static SqlFamily, mut config: SqlToolConfig, name: &str) -> Result<Self> {
        config.name = name.to_string();
        config.validate()?;
        if config.kind != family.kind {
            return Err(Error::config_decode(format!(
                "tool {:?}: kind {:?} decoded as {:?}",
                name, config.kind, family.kind
            )));
        }
        Ok(Self { family, config })
    }
}

/// Factory body shared by every SQL family.
pub fn decode_config(family: &'static SqlFamily, name: &str, doc: serde_yaml::Value) -> Result<Box<dyn ToolConfig>> {
    let config: SqlToolConfig = serde_yaml::from_value(doc)
        .map_err(|e| Error::config_decode(format!("unable to parse tool {:?} as kind {:?}: {}", name, family.kind, e)))?;
    Ok(Box::new(SqlConfig::new(family, config, name)?))
}

impl ToolConfig for SqlConfig {
    fn tool_config_kind(&self) -> &'static str {
        self.family.kind
    }

    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>> {
        let cfg = &self.config;
        let source = sources
            .get(&cfg.source)
            .ok_or_else(|| Error::source_not_found(&cfg.source))?;
        let pool = self.family.compatible_pool(source.as_ref())?;

        let processed = process_parameters(&cfg.template_parameters, &cfg.parameters)?;

        let manifest = Manifest {
            description: cfg.description.clone(),
            parameters: processed.manifest,
            auth_required: cfg.auth_required.clone(),
        };
        let protocol_manifest = ProtocolManifest {
            name: cfg.name.clone(),
            description: cfg.description.clone(),
            input_schema: processed.input_schema,
        };

        tracing::debug!(tool = %cfg.name, kind = self.family.kind, source = %cfg.source, "tool initialized");

        Ok(Arc::new(SqlTool {
            name: cfg.name.clone(),
            family: self.family,
            parameters: cfg.parameters.clone(),
            template_parameters: cfg.template_parameters.clone(),
            all_params: processed.all,
            statement: cfg.statement.clone(),
            auth_required: cfg.auth_required.clone(),
            pool,
            manifest,
            protocol_manifest,
        }))
    }
}

// =============================================================================
// Tool
// =============================================================================

/// Initialized SQL tool. Immutable; shared across concurrent invocations.
#[derive(Debug)]
pub struct SqlTool {
    name: String,
    family: &'static SqlFamily,
    parameters: Parameters,
    template_parameters: Parameters,
    all_params: Parameters,
    statement: String,
    auth_required: Vec<String>,
    pool: Arc<dyn SqlPool>,
    manifest: Manifest,
    protocol_manifest: ProtocolManifest,
}

#[async_trait]
impl Tool for SqlTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &'static str {
        self.family.kind
    }

    async fn invoke(
        &self,
        ctx: &InvocationContext,
        params: &ParamValues,
        _access_token: &AccessToken,
    ) -> Result<Vec<Row>> {
        let invocation_id = Uuid::new_v4();
        let span = tracing::debug_span!("invoke", tool = %self.name, kind = self.family.kind, %invocation_id);

        async move {
            let params_map = params.as_map();
            let statement = resolve_template_params(&self.template_parameters, &self.statement, &params_map)
                .context("unable to extract template params")?;
            let binds = get_params(&self.parameters, &params_map)
                .context("unable to extract standard params")?
                .as_slice();

            let result = ctx
                .run(engine::query_rows(self.pool.as_ref(), &statement, &binds, &self.family.decoding))
                .await;
            match &result {
                Ok(rows) => tracing::debug!(rows = rows.len(), "invocation complete"),
                Err(err) => tracing::warn!(error = %err, "invocation failed"),
            }
            result
        }
        .instrument(span)
        .await
    }

    fn parse_params(&self, data: &Map<String, Value>, claims: &Claims) -> Result<ParamValues> {
        parse_params(&self.all_params, data, claims)
    }

    fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    fn protocol_manifest(&self) -> &ProtocolManifest {
        &self.protocol_manifest
    }

    fn authorized(&self, verified_auth_services: &[String]) -> bool {
        is_authorized(&self.auth_required, verified_auth_services)
    }

    fn requires_client_authorization(&self) -> bool {
        self.family.requires_client_authorization
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::{ColumnInfo, MemoryPool, MemoryResult, MemorySource, RawValue};
    use crate::tools::parameters::{ParamType, Parameter};
    use crate::tools::singlestore;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use tracing_test::traced_test;

    fn config_yaml() -> serde_yaml::Value {
        serde_yaml::from_str(
            r#"
kind: singlestore-sql
source: my-singlestore
description: Look up orders for a customer in a chosen table.
statement: SELECT * FROM {{.tableName}} WHERE customer_id = ? AND status = ?
authRequired:
  - my-google-auth
parameters:
  - name: customer_id
    type: integer
    description: Customer id
  - name: status
    type: string
    description: Order status
    default: open
templateParameters:
  - name: tableName
    type: string
    description: Orders table
"#,
        )
        .unwrap()
    }

    fn orders_result() -> MemoryResult {
        MemoryResult::new(
            vec![
                ColumnInfo::new("id", "BIGINT"),
                ColumnInfo::new("details", "JSON"),
                ColumnInfo::new("note", "TEXT"),
            ],
            vec![
                vec![RawValue::Value(json!(1)), RawValue::from(r#"{"sku":"a-1"}"#), RawValue::from("rush")],
                vec![RawValue::Value(json!(2)), RawValue::Null, RawValue::Null],
            ],
        )
    }

    fn sources_with(pool: Arc<MemoryPool>) -> SourceMap {
        let mut sources = SourceMap::new();
        sources.insert("my-singlestore".to_string(), Arc::new(MemorySource::singlestore(pool)));
        sources
    }

    fn build_tool(pool: Arc<MemoryPool>) -> Arc<dyn Tool> {
        singlestore::new_config("orders", config_yaml())
            .unwrap()
            .initialize(&sources_with(pool))
            .unwrap()
    }

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_decode_requires_mandatory_fields() {
        let mut doc = config_yaml();
        doc.as_mapping_mut().unwrap().remove("statement");
        let err = singlestore::new_config("orders", doc).unwrap_err();
        assert!(matches!(err, Error::ConfigDecode(msg) if msg.contains("statement")));

        let mut doc = config_yaml();
        doc.as_mapping_mut()
            .unwrap()
            .insert("description".into(), "  ".into());
        assert!(matches!(singlestore::new_config("orders", doc), Err(Error::ConfigDecode(_))));
    }

    #[test]
    fn test_decode_rejects_wrong_kind() {
        let mut doc = config_yaml();
        doc.as_mapping_mut().unwrap().insert("kind".into(), "mysql-sql".into());
        assert!(matches!(singlestore::new_config("orders", doc), Err(Error::ConfigDecode(_))));
    }

    #[test]
    fn test_initialize_source_not_found() {
        let config = singlestore::new_config("orders", config_yaml()).unwrap();
        let err = config.initialize(&SourceMap::new()).unwrap_err();
        assert!(matches!(err, Error::SourceNotFound(name) if name == "my-singlestore"));
    }

    #[test]
    fn test_initialize_requires_capability_and_allow_list() {
        let config = singlestore::new_config("orders", config_yaml()).unwrap();
        let pool = Arc::new(MemoryPool::default());

        // Right kind name, no SingleStore capability.
        let mut sources = SourceMap::new();
        sources.insert(
            "my-singlestore".to_string(),
            Arc::new(MemorySource::mysql("singlestore", pool.clone())),
        );
        let err = config.initialize(&sources).unwrap_err();
        assert!(matches!(&err, Error::IncompatibleSource { allowed, .. } if allowed == &vec!["singlestore".to_string()]));

        // Capability present, kind not on the allow-list.
        let mut sources = SourceMap::new();
        sources.insert(
            "my-singlestore".to_string(),
            Arc::new(MemorySource::new(
                "mysql",
                pool,
                crate::sources::memory::Capabilities {
                    singlestore: true,
                    mysql: true,
                },
            )),
        );
        let err = config.initialize(&sources).unwrap_err();
        assert!(matches!(err, Error::IncompatibleSource { .. }));
        assert!(err.to_string().contains("singlestore"));
    }

    #[test]
    fn test_initialize_builds_manifests() {
        let tool = build_tool(Arc::new(MemoryPool::default()));
        assert_eq!(tool.name(), "orders");
        assert_eq!(tool.kind(), "singlestore-sql");
        assert!(!tool.requires_client_authorization());

        let manifest = tool.manifest();
        let names: Vec<&str> = manifest.parameters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["customer_id", "status", "tableName"]);
        assert_eq!(manifest.auth_required, vec!["my-google-auth".to_string()]);

        let protocol = tool.protocol_manifest();
        assert_eq!(protocol.name, "orders");
        assert_eq!(protocol.input_schema.required, vec!["customer_id", "tableName"]);
    }

    #[test]
    fn test_authorized() {
        let tool = build_tool(Arc::new(MemoryPool::default()));
        assert!(tool.authorized(&["my-google-auth".to_string(), "other".to_string()]));
        assert!(!tool.authorized(&[]));
    }

    #[tokio::test]
    async fn test_invoke_end_to_end() {
        let pool = Arc::new(MemoryPool::new(orders_result()));
        let tool = build_tool(pool.clone());

        let params = tool
            .parse_params(&input(json!({"tableName": "orders_2024", "customer_id": 42})), &Claims::new())
            .unwrap();
        let rows = tool
            .invoke(&InvocationContext::new(), &params, &AccessToken::default())
            .await
            .unwrap();

        assert_eq!(
            rows.into_iter().map(Value::Object).collect::<Vec<_>>(),
            vec![
                json!({"id": 1, "details": {"sku": "a-1"}, "note": "rush"}),
                json!({"id": 2, "details": null, "note": null}),
            ]
        );

        let executed = pool.executed().await;
        assert_eq!(
            executed[0].statement,
            "SELECT * FROM orders_2024 WHERE customer_id = ? AND status = ?"
        );
        assert_eq!(executed[0].args, vec![json!(42), json!("open")]);
        assert_eq!(pool.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_invoke_template_failure_never_reaches_backend() {
        let pool = Arc::new(MemoryPool::new(orders_result()));
        let tool = build_tool(pool.clone());

        let params = ParamValues::new(vec![]);
        let err = tool
            .invoke(&InvocationContext::new(), &params, &AccessToken::default())
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("unable to extract template params"));
        assert!(matches!(err.root(), Error::UnresolvedTemplateParameter(_)));
        assert!(pool.executed().await.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_iteration_failure_returns_no_rows() {
        let mut result = orders_result();
        result.iteration_error_after = Some(1);
        let pool = Arc::new(MemoryPool::new(result));
        let tool = build_tool(pool.clone());

        let params = tool
            .parse_params(&input(json!({"tableName": "orders", "customer_id": 1})), &Claims::new())
            .unwrap();
        let err = tool
            .invoke(&InvocationContext::new(), &params, &AccessToken::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::RowIteration(_)));
        assert_eq!(pool.open_cursors(), 0);

        // The tool stays usable after a failed call.
        assert_eq!(tool.name(), "orders");
    }

    #[tokio::test]
    async fn test_invoke_honors_deadline_and_releases_cursor() {
        let mut result = orders_result();
        result.row_delay = Some(Duration::from_secs(5));
        let pool = Arc::new(MemoryPool::new(result));
        let tool = build_tool(pool.clone());

        let params = tool
            .parse_params(&input(json!({"tableName": "orders", "customer_id": 1})), &Claims::new())
            .unwrap();
        let ctx = InvocationContext::new().with_timeout(Duration::from_millis(20));
        let err = tool.invoke(&ctx, &params, &AccessToken::default()).await.unwrap_err();

        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(pool.open_cursors(), 0);
    }

    #[tokio::test]
    async fn test_invoke_honors_cancellation() {
        let mut result = orders_result();
        result.row_delay = Some(Duration::from_secs(5));
        let pool = Arc::new(MemoryPool::new(result));
        let tool = build_tool(pool.clone());

        let params = tool
            .parse_params(&input(json!({"tableName": "orders", "customer_id": 1})), &Claims::new())
            .unwrap();
        let token = CancellationToken::new();
        let ctx = InvocationContext::new().with_cancellation(token.clone());
        let canceller = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            token.cancel();
        });

        let err = tool.invoke(&ctx, &params, &AccessToken::default()).await.unwrap_err();
        canceller.await.unwrap();
        assert!(matches!(err, Error::Cancelled(_)));
        assert_eq!(pool.open_cursors(), 0);
    }

    #[tokio::test]
    #[traced_test]
    async fn test_invoke_failure_is_logged() {
        let mut result = orders_result();
        result.query_error = Some("syntax error near FROM".to_string());
        let tool = build_tool(Arc::new(MemoryPool::new(result)));

        let params = tool
            .parse_params(&input(json!({"tableName": "orders", "customer_id": 1})), &Claims::new())
            .unwrap();
        let err = tool
            .invoke(&InvocationContext::new(), &params, &AccessToken::default())
            .await
            .unwrap_err();

        assert!(matches!(err, Error::QueryExecution(_)));
        assert!(logs_contain("invocation failed"));
        assert!(logs_contain("syntax error near FROM"));
    }

    #[tokio::test]
    async fn test_concurrent_invocations_share_one_tool() {
        let pool = Arc::new(MemoryPool::new(orders_result()));
        let tool = build_tool(pool.clone());

        let mut handles = Vec::new();
        for customer in 0..8 {
            let tool = Arc::clone(&tool);
            handles.push(tokio::spawn(async move {
                let params = tool
                    .parse_params(&input(json!({"tableName": "orders", "customer_id": customer})), &Claims::new())
                    .unwrap();
                tool.invoke(&InvocationContext::new(), &params, &AccessToken::default())
                    .await
                    .unwrap()
                    .len()
            }));
        }
        for handle in handles {
            assert_eq!(handle.await.unwrap(), 2);
        }
        assert_eq!(pool.executed().await.len(), 8);
    }

    #[test]
    fn test_param_type_round_trip_through_config() {
        let config = SqlToolConfig {
            name: "t".to_string(),
            kind: singlestore::KIND.to_string(),
            source: "s".to_string(),
            description: "d".to_string(),
            statement: "SELECT ?".to_string(),
            auth_required: vec![],
            parameters: vec![Parameter::new("x", ParamType::Boolean, "flag")],
            template_parameters: vec![],
        };
        let doc = serde_yaml::to_value(&config).unwrap();
        let decoded: SqlToolConfig = serde_yaml::from_value(doc).unwrap();
        assert_eq!(decoded, config);
    }
}
