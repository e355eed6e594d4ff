//! Tool manifests — internal listing and tool-calling protocol schema.
//!
//! Both projections are computed once when a tool is initialized and handed
//! out by reference afterwards.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::parameters::Parameter;

/// Parameter entry of the internal manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterManifest {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: String,
    pub required: bool,
    pub description: String,
    pub auth_sources: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ParameterManifest>>,
}

/// Internal introspection manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub description: String,
    pub parameters: Vec<ParameterManifest>,
    pub auth_required: Vec<String>,
}

/// One property of the protocol input schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolProperty {
    #[serde(rename = "type")]
    pub schema_type: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<ProtocolProperty>>,
}

/// JSON-Schema object describing a tool's caller-supplied input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProtocolInputSchema {
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property name → [`ProtocolProperty`], in declaration order.
    pub properties: Map<String, Value>,
    pub required: Vec<String>,
}

impl ProtocolInputSchema {
    /// Build the schema from declarations. Auth-bound parameters are left out:
    /// their values come from verified claims, never from the caller.
    pub fn from_parameters(params: &[Parameter]) -> Self {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for param in params.iter().filter(|p| !p.is_auth_bound()) {
            let property = param.protocol_property();
            // ProtocolProperty holds only strings and nested properties.
            let value = serde_json::to_value(&property).unwrap_or(Value::Null);
            properties.insert(param.name.clone(), value);
            if param.is_required() {
                required.push(param.name.clone());
            }
        }
        Self {
            schema_type: "object".to_string(),
            properties,
            required,
        }
    }
}

/// Tool description shaped for the external tool-calling protocol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProtocolManifest {
    pub name: String,
    pub description: String,
    pub input_schema: ProtocolInputSchema,
}

/// True iff every required auth service is among the verified ones.
pub fn is_authorized(auth_required: &[String], verified_auth_services: &[String]) -> bool {
    auth_required
        .iter()
        .all(|required| verified_auth_services.contains(required))
}
