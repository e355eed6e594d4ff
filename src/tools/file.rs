//! Tools documents: named tool configurations plus toolsets.

use serde_yaml::{Mapping, Value as YamlValue};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use super::registry::KindRegistry;
use super::{Tool, ToolConfig};
use crate::sources::SourceMap;
use crate::types::{Error, Result, ResultExt};

/// Tool name → initialized tool.
pub type ToolMap = BTreeMap<String, Arc<dyn Tool>>;

/// What to do with a tool whose kind is not in the registry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum UnknownKinds {
    /// Fail decoding with a config error.
    #[default]
    Reject,
    /// Record the tool in [`ToolsFile::skipped`] and keep going.
    Skip,
}

/// A decoded tools document.
#[derive(Debug, Default)]
pub struct ToolsFile {
    /// Tool configurations in document order.
    pub tools: Vec<(String, Box<dyn ToolConfig>)>,
    /// Toolset name → member tool names.
    pub toolsets: BTreeMap<String, Vec<String>>,
    /// `(tool name, kind)` of tools left undecoded under [`UnknownKinds::Skip`].
    pub skipped: Vec<(String, String)>,
}

impl ToolsFile {
    pub fn tool_names(&self) -> impl Iterator<Item = &str> {
        self.tools.iter().map(|(name, _)| name.as_str())
    }

    /// Initialize every configuration against `sources`.
    pub fn initialize(&self, sources: &SourceMap) -> Result<ToolMap> {
        let mut tools = ToolMap::new();
        for (name, config) in &self.tools {
            let tool = config
                .initialize(sources)
                .context(format!("unable to initialize tool {:?}", name))?;
            tools.insert(name.clone(), tool);
        }
        tracing::info!(tools = tools.len(), toolsets = self.toolsets.len(), "tools initialized");
        Ok(tools)
    }
}

fn section<'a>(doc: &'a Mapping, key: &str) -> Result<Option<&'a Mapping>> {
    match doc.get(key) {
        None | Some(YamlValue::Null) => Ok(None),
        Some(YamlValue::Mapping(m)) => Ok(Some(m)),
        Some(_) => Err(Error::config_decode(format!("{:?} must be a mapping", key))),
    }
}

fn key_str(key: &YamlValue, section: &str) -> Result<String> {
    key.as_str()
        .map(str::to_string)
        .ok_or_else(|| Error::config_decode(format!("{} names must be strings, got {:?}", section, key)))
}

/// Decode a tools document, resolving each tool's kind through `registry`.
///
/// The `sources` section belongs to the connection layer and is skipped.
pub fn parse_tools_file(bytes: &[u8], registry: &KindRegistry) -> Result<ToolsFile> {
    parse_tools_file_with(bytes, registry, UnknownKinds::Reject)
}

/// [`parse_tools_file`] with an explicit policy for unregistered kinds.
///
/// Skipped tools still count as declared for toolset membership.
pub fn parse_tools_file_with(bytes: &[u8], registry: &KindRegistry, unknown: UnknownKinds) -> Result<ToolsFile> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(ToolsFile::default());
    }
    let doc: YamlValue = serde_yaml::from_slice(bytes)?;
    let doc = match doc {
        YamlValue::Null => return Ok(ToolsFile::default()),
        YamlValue::Mapping(m) => m,
        _ => return Err(Error::config_decode("tools document must be a mapping")),
    };

    let mut file = ToolsFile::default();
    let mut declared = HashSet::new();

    if let Some(tools) = section(&doc, "tools")? {
        for (key, body) in tools {
            let name = key_str(key, "tool")?;
            let kind = body
                .get("kind")
                .and_then(YamlValue::as_str)
                .ok_or_else(|| Error::config_decode(format!("tool {:?}: missing \"kind\"", name)))?;
            declared.insert(name.clone());
            match (registry.lookup(kind), unknown) {
                (Some(factory), _) => {
                    let config = factory(&name, body.clone())?;
                    file.tools.push((name, config));
                }
                (None, UnknownKinds::Skip) => {
                    tracing::debug!(tool = %name, kind, "skipping tool of unregistered kind");
                    file.skipped.push((name, kind.to_string()));
                }
                (None, UnknownKinds::Reject) => {
                    return Err(Error::config_decode(format!(
                        "tool {:?}: unknown tool kind {:?}",
                        name, kind
                    )));
                }
            }
        }
    }

    if let Some(toolsets) = section(&doc, "toolsets")? {
        for (key, members) in toolsets {
            let name = key_str(key, "toolset")?;
            let members: Vec<String> = serde_yaml::from_value(members.clone())
                .map_err(|e| Error::config_decode(format!("toolset {:?}: {}", name, e)))?;
            if let Some(missing) = members.iter().find(|m| !declared.contains(*m)) {
                return Err(Error::config_decode(format!(
                    "toolset {:?} references undeclared tool {:?}",
                    name, missing
                )));
            }
            file.toolsets.insert(name, members);
        }
    }

    tracing::debug!(tools = file.tools.len(), toolsets = file.toolsets.len(), "tools file decoded");
    Ok(file)
}
