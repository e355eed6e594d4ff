//! Tool infrastructure — plugin contract, parameters, manifests, registry.
//!
//! Every tool kind implements the same capability set: a [`ToolConfig`]
//! decoded from a configuration document, initialized against the configured
//! sources into an immutable [`Tool`] that is then invoked concurrently.

pub mod decode;
pub mod file;
pub mod manifest;
pub mod mysql;
pub mod parameters;
pub mod registry;
pub mod singlestore;
pub mod sql;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::sources::SourceMap;
use crate::types::{Error, InvocationConfig, Result};

pub use decode::{ColumnDecoding, DecodingPolicy, Row};
pub use file::{parse_tools_file, parse_tools_file_with, ToolMap, ToolsFile, UnknownKinds};
pub use manifest::{is_authorized, Manifest, ParameterManifest, ProtocolInputSchema, ProtocolManifest};
pub use parameters::{
    get_params, parse_params, process_parameters, resolve_template_params, Claims, ParamType, ParamValue,
    ParamValues, Parameter, Parameters,
};
pub use registry::{ConfigFactory, KindRegistry};

// =============================================================================
// Tool contract
// =============================================================================

/// A decoded, not yet initialized tool configuration.
pub trait ToolConfig: Send + Sync + fmt::Debug {
    /// Kind this configuration was decoded for.
    fn tool_config_kind(&self) -> &'static str;

    /// Validate against the available sources and build the tool.
    ///
    /// Pure wiring: no statement is executed.
    fn initialize(&self, sources: &SourceMap) -> Result<Arc<dyn Tool>>;
}

/// An initialized, immutable tool.
#[async_trait]
pub trait Tool: Send + Sync + fmt::Debug {
    fn name(&self) -> &str;

    fn kind(&self) -> &'static str;

    /// Run the tool once. Independent of every other invocation.
    async fn invoke(&self, ctx: &InvocationContext, params: &ParamValues, access_token: &AccessToken)
        -> Result<Vec<Row>>;

    /// Bind caller input and verified claims against the tool's parameters.
    fn parse_params(&self, data: &Map<String, Value>, claims: &Claims) -> Result<ParamValues>;

    fn manifest(&self) -> &Manifest;

    fn protocol_manifest(&self) -> &ProtocolManifest;

    /// Whether the verified auth services cover the tool's requirements.
    fn authorized(&self, verified_auth_services: &[String]) -> bool;

    /// Whether invocation needs a caller-supplied bearer credential.
    fn requires_client_authorization(&self) -> bool;
}

// =============================================================================
// Invocation context
// =============================================================================

/// Caller-supplied bearer credential, forwarded to tools that need one.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("AccessToken(<none>)")
        } else {
            f.write_str("AccessToken(<redacted>)")
        }
    }
}

/// Cancellation and deadline carried by one invocation.
#[derive(Debug, Clone, Default)]
pub struct InvocationContext {
    cancel: CancellationToken,
    deadline: Option<Instant>,
}

impl InvocationContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context whose deadline is the configured query timeout from now.
    pub fn from_config(config: &InvocationConfig) -> Self {
        Self::new().with_timeout(config.query_timeout)
    }

    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancel
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Drive `fut` until it completes, the token is cancelled or the deadline
    /// passes. On cancellation or timeout `fut` is dropped mid-flight.
    pub async fn run<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        let bounded = async {
            match self.deadline {
                Some(deadline) => match tokio::time::timeout_at(deadline, fut).await {
                    Ok(result) => result,
                    Err(_) => Err(Error::timeout("invocation deadline exceeded")),
                },
                None => fut.await,
            }
        };

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(Error::cancelled("invocation cancelled by caller")),
            result = bounded => result,
        }
    }
}
