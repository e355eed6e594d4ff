//! Application error types.
//!
//! All errors use `thiserror` for automatic Error trait derivation and provide
//! clear error messages with context. Nothing in this crate retries; every
//! error is handed back to the immediate caller.

use thiserror::Error;

/// Application result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Main error enum for the toolbox core.
#[derive(Error, Debug)]
pub enum Error {
    /// A tool configuration document could not be decoded or is missing a
    /// mandatory field.
    #[error("config decode error: {0}")]
    ConfigDecode(String),

    /// Two constructors claimed the same tool kind.
    #[error("tool kind {0:?} already registered")]
    DuplicateKindRegistration(String),

    /// The configured source name is not present in the source map.
    #[error("no source named {0:?} configured")]
    SourceNotFound(String),

    /// The named source exists but cannot back this tool kind.
    #[error("invalid source for {tool_kind:?} tool: source kind must be one of {allowed:?}")]
    IncompatibleSource {
        tool_kind: String,
        allowed: Vec<String>,
    },

    /// Parameter declarations are inconsistent (duplicate names, bad types).
    #[error("parameter config error: {0}")]
    ParameterConfig(String),

    /// A required parameter was not supplied.
    #[error("parameter {0:?} is required")]
    MissingParameter(String),

    /// A parameter value could not be coerced to its declared type.
    #[error("parameter {name:?}: expected {expected}, got {got}")]
    TypeMismatch {
        name: String,
        expected: String,
        got: String,
    },

    /// A template placeholder has no usable value.
    #[error("unresolved template parameter: {0}")]
    UnresolvedTemplateParameter(String),

    /// The backend rejected or failed the statement.
    #[error("unable to execute query: {0}")]
    QueryExecution(String),

    /// A single row could not be read into values.
    #[error("unable to parse row: {0}")]
    RowScan(String),

    /// The cursor failed while advancing across rows.
    #[error("errors encountered during row iteration: {0}")]
    RowIteration(String),

    /// No prebuilt configuration exists for the requested kind.
    #[error("prebuilt tool configuration for source {0:?} not found")]
    CatalogNotFound(String),

    /// The prebuilt bundle is inconsistent.
    #[error("failed to load prebuilt tool configurations: {0}")]
    CatalogLoad(String),

    /// Invocation cancelled by the caller.
    #[error("operation cancelled: {0}")]
    Cancelled(String),

    /// Invocation exceeded its deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// Serialization/deserialization errors.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML decoding errors.
    #[error("yaml error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// I/O errors.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// An error annotated with the operation that produced it.
    #[error("{context}: {source}")]
    Context {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

// Convenience constructors
impl Error {
    pub fn config_decode(msg: impl Into<String>) -> Self {
        Self::ConfigDecode(msg.into())
    }

    pub fn source_not_found(name: impl Into<String>) -> Self {
        Self::SourceNotFound(name.into())
    }

    pub fn incompatible_source(tool_kind: impl Into<String>, allowed: &[&str]) -> Self {
        Self::IncompatibleSource {
            tool_kind: tool_kind.into(),
            allowed: allowed.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn parameter_config(msg: impl Into<String>) -> Self {
        Self::ParameterConfig(msg.into())
    }

    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    pub fn type_mismatch(
        name: impl Into<String>,
        expected: impl Into<String>,
        got: impl Into<String>,
    ) -> Self {
        Self::TypeMismatch {
            name: name.into(),
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub fn unresolved_template(msg: impl Into<String>) -> Self {
        Self::UnresolvedTemplateParameter(msg.into())
    }

    pub fn query_execution(msg: impl Into<String>) -> Self {
        Self::QueryExecution(msg.into())
    }

    pub fn row_scan(msg: impl Into<String>) -> Self {
        Self::RowScan(msg.into())
    }

    pub fn row_iteration(msg: impl Into<String>) -> Self {
        Self::RowIteration(msg.into())
    }

    pub fn catalog_not_found(kind: impl Into<String>) -> Self {
        Self::CatalogNotFound(kind.into())
    }

    pub fn catalog_load(msg: impl Into<String>) -> Self {
        Self::CatalogLoad(msg.into())
    }

    pub fn cancelled(msg: impl Into<String>) -> Self {
        Self::Cancelled(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        Self::Timeout(msg.into())
    }

    /// Wrap this error with a description of the failing operation.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Innermost error, skipping any context layers.
    pub fn root(&self) -> &Error {
        let mut current = self;
        while let Error::Context { source, .. } = current {
            current = source;
        }
        current
    }
}

/// Attach context to the error arm of a [`Result`].
pub trait ResultExt<T> {
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(context))
    }
}
