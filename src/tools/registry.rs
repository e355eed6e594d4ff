//! Maps each tool kind to its configuration constructor.
//!
//! Built explicitly at startup and passed to whatever decodes tool
//! configurations. Registration is write-once per kind.

use std::collections::HashMap;
use std::fmt;

use super::{mysql, singlestore, ToolConfig};
use crate::types::{Error, Result};

/// Decodes the configuration document of one named tool.
pub type ConfigFactory = fn(name: &str, doc: serde_yaml::Value) -> Result<Box<dyn ToolConfig>>;

/// Tool kind → constructor map.
#[derive(Default)]
pub struct KindRegistry {
    factories: HashMap<String, ConfigFactory>,
}

impl fmt::Debug for KindRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KindRegistry")
            .field("kinds", &self.kinds())
            .finish()
    }
}

impl KindRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry holding every tool kind this crate ships.
    pub fn with_builtin_kinds() -> Result<Self> {
        let mut registry = Self::new();
        registry.register_or_err(singlestore::KIND, singlestore::new_config)?;
        registry.register_or_err(mysql::KIND, mysql::new_config)?;
        Ok(registry)
    }

    /// Register `factory` under `kind` if the kind is unseen.
    ///
    /// Returns `false`, leaving the existing entry in place, when `kind` is
    /// already registered.
    pub fn register(&mut self, kind: &str, factory: ConfigFactory) -> bool {
        if self.factories.contains_key(kind) {
            tracing::warn!(kind, "tool kind already registered; keeping the first registration");
            return false;
        }
        self.factories.insert(kind.to_string(), factory);
        true
    }

    /// Like [`register`](Self::register), reporting a duplicate as an error.
    pub fn register_or_err(&mut self, kind: &str, factory: ConfigFactory) -> Result<()> {
        if self.register(kind, factory) {
            Ok(())
        } else {
            Err(Error::DuplicateKindRegistration(kind.to_string()))
        }
    }

    pub fn lookup(&self, kind: &str) -> Option<ConfigFactory> {
        self.factories.get(kind).copied()
    }

    /// Registered kinds, sorted.
    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.factories.keys().cloned().collect();
        kinds.sort();
        kinds
    }

    pub fn len(&self) -> usize {
        self.factories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::sources::SourceMap;
    use crate::tools::Tool;

    #[derive(Debug)]
    struct FirstConfig;

    impl ToolConfig for FirstConfig {
        fn tool_config_kind(&self) -> &'static str {
            "first"
        }

        fn initialize(&self, _sources: &SourceMap) -> Result<Arc<dyn Tool>> {
            Err(Error::config_decode("not initializable"))
        }
    }

    #[derive(Debug)]
    struct SecondConfig;

    impl ToolConfig for SecondConfig {
        fn tool_config_kind(&self) -> &'static str {
            "second"
        }

        fn initialize(&self, _sources: &SourceMap) -> Result<Arc<dyn Tool>> {
            Err(Error::config_decode("not initializable"))
        }
    }

    fn first(_name: &str, _doc: serde_yaml::Value) -> Result<Box<dyn ToolConfig>> {
        Ok(Box::new(FirstConfig))
    }

    fn second(_name: &str, _doc: serde_yaml::Value) -> Result<Box<dyn ToolConfig>> {
        Ok(Box::new(SecondConfig))
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = KindRegistry::new();
        assert!(registry.register("test-kind", first));
        assert_eq!(registry.len(), 1);

        let factory = registry.lookup("test-kind").unwrap();
        let config = factory("t", serde_yaml::Value::Null).unwrap();
        assert_eq!(config.tool_config_kind(), "first");
        assert!(registry.lookup("missing").is_none());
    }

    #[test]
    fn test_duplicate_registration_keeps_first() {
        let mut registry = KindRegistry::new();
        assert!(registry.register("test-kind", first));
        assert!(!registry.register("test-kind", second));

        let factory = registry.lookup("test-kind").unwrap();
        let config = factory("t", serde_yaml::Value::Null).unwrap();
        assert_eq!(config.tool_config_kind(), "first");

        let err = registry.register_or_err("test-kind", second).unwrap_err();
        assert!(matches!(err, Error::DuplicateKindRegistration(kind) if kind == "test-kind"));
    }

    #[test]
    fn test_builtin_kinds() {
        let registry = KindRegistry::with_builtin_kinds().unwrap();
        assert_eq!(registry.kinds(), vec!["mysql-sql", "singlestore-sql"]);
    }
}
