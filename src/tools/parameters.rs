//! Parameter model — declarations, coercion, template resolution.
//!
//! A tool declares two ordered parameter lists:
//! - **standard** parameters, passed to the backend as positional bind values;
//! - **template** parameters, spliced into the statement text before execution.
//!
//! Template values are rendered through a restricted grammar so a caller can
//! choose *which* identifier goes into the statement but can never change the
//! statement's structure.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use std::collections::{HashMap, HashSet};

use super::manifest::{ParameterManifest, ProtocolInputSchema, ProtocolProperty};
use crate::types::{Error, Result};

/// Verified auth claims: auth service name → claim set.
pub type Claims = HashMap<String, Map<String, Value>>;

/// Ordered parameter declarations.
pub type Parameters = Vec<Parameter>;

// =============================================================================
// Parameter types
// =============================================================================

/// Declared semantic type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Float,
    Boolean,
    Array,
}

impl ParamType {
    /// Type name as written in tool configuration documents.
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Float => "float",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
        }
    }

    /// Type name in JSON Schema vocabulary.
    pub fn json_schema_type(self) -> &'static str {
        match self {
            ParamType::Float => "number",
            other => other.as_str(),
        }
    }
}

fn value_type_name(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn is_identifier(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// =============================================================================
// Parameter declaration
// =============================================================================

/// Binds a parameter to a claim of a verified auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ParamAuthService {
    /// Auth service name.
    pub name: String,
    /// Claim field read from that service's verified token.
    pub field: String,
}

/// A single parameter declaration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Parameter {
    pub name: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_required")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Element declaration, mandatory for arrays.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Parameter>>,
    #[serde(default, alias = "authSources", skip_serializing_if = "Vec::is_empty")]
    pub auth_services: Vec<ParamAuthService>,
}

fn default_required() -> bool {
    true
}

impl Parameter {
    pub fn new(name: impl Into<String>, param_type: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            param_type,
            description: description.into(),
            required: true,
            default: None,
            items: None,
            auth_services: Vec::new(),
        }
    }

    /// Array declaration with the given element declaration.
    pub fn array(name: impl Into<String>, description: impl Into<String>, items: Parameter) -> Self {
        let mut param = Self::new(name, ParamType::Array, description);
        param.items = Some(Box::new(items));
        param
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    pub fn with_default(mut self, default: Value) -> Self {
        self.default = Some(default);
        self
    }

    pub fn with_auth_service(mut self, name: impl Into<String>, field: impl Into<String>) -> Self {
        self.auth_services.push(ParamAuthService {
            name: name.into(),
            field: field.into(),
        });
        self
    }

    /// Whether a caller must supply a value.
    pub fn is_required(&self) -> bool {
        self.required && self.default.is_none()
    }

    /// Whether the value comes from verified auth claims instead of caller input.
    pub fn is_auth_bound(&self) -> bool {
        !self.auth_services.is_empty()
    }

    fn validate(&self, template: bool) -> Result<()> {
        if !is_identifier(&self.name) {
            return Err(Error::parameter_config(format!(
                "invalid parameter name {:?}: only letters, digits and '_' are allowed",
                self.name
            )));
        }
        if template && self.is_auth_bound() {
            return Err(Error::parameter_config(format!(
                "template parameter {:?} cannot be bound to an auth service",
                self.name
            )));
        }
        for svc in &self.auth_services {
            if svc.name.is_empty() || svc.field.is_empty() {
                return Err(Error::parameter_config(format!(
                    "parameter {:?}: auth service entries need both name and field",
                    self.name
                )));
            }
        }
        self.validate_shape()?;
        if let Some(default) = &self.default {
            self.coerce(&self.name, default).map_err(|e| {
                Error::parameter_config(format!("invalid default for {:?}: {}", self.name, e))
            })?;
        }
        Ok(())
    }

    fn validate_shape(&self) -> Result<()> {
        match (self.param_type, &self.items) {
            (ParamType::Array, None) => Err(Error::parameter_config(format!(
                "array parameter {:?} must declare items",
                self.name
            ))),
            (ParamType::Array, Some(items)) => items.validate_shape(),
            (other, Some(_)) => Err(Error::parameter_config(format!(
                "{} parameter {:?} cannot declare items",
                other.as_str(),
                self.name
            ))),
            (_, None) => Ok(()),
        }
    }

    /// Coerce `value` to the declared type. `label` names the value in errors.
    pub fn coerce(&self, label: &str, value: &Value) -> Result<Value> {
        let mismatch = || Error::type_mismatch(label, self.param_type.as_str(), value_type_name(value));
        match self.param_type {
            ParamType::String => value.is_string().then(|| value.clone()).ok_or_else(mismatch),
            ParamType::Integer => {
                if value.is_i64() || value.is_u64() {
                    return Ok(value.clone());
                }
                match value.as_f64() {
                    Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 => {
                        Ok(Value::from(f as i64))
                    }
                    Some(_) => Err(Error::type_mismatch(label, "integer", "fractional number")),
                    None => Err(mismatch()),
                }
            }
            ParamType::Float => value
                .as_f64()
                .and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(mismatch),
            ParamType::Boolean => value.is_boolean().then(|| value.clone()).ok_or_else(mismatch),
            ParamType::Array => {
                let arr = value.as_array().ok_or_else(mismatch)?;
                let items = self.items.as_deref().ok_or_else(|| {
                    Error::parameter_config(format!("array parameter {:?} must declare items", label))
                })?;
                arr.iter()
                    .enumerate()
                    .map(|(i, item)| items.coerce(&format!("{}[{}]", label, i), item))
                    .collect::<Result<Vec<_>>>()
                    .map(Value::Array)
            }
        }
    }

    /// Internal manifest entry.
    pub fn manifest(&self) -> ParameterManifest {
        ParameterManifest {
            name: self.name.clone(),
            param_type: self.param_type.as_str().to_string(),
            required: self.is_required(),
            description: self.description.clone(),
            auth_sources: self.auth_services.iter().map(|s| s.name.clone()).collect(),
            items: self.items.as_ref().map(|i| Box::new(i.manifest())),
        }
    }

    /// Property entry of the protocol input schema.
    pub fn protocol_property(&self) -> ProtocolProperty {
        ProtocolProperty {
            schema_type: self.param_type.json_schema_type().to_string(),
            description: self.description.clone(),
            items: self.items.as_ref().map(|i| Box::new(i.protocol_property())),
        }
    }
}

// =============================================================================
// Declaration processing
// =============================================================================

/// Output of [`process_parameters`].
#[derive(Debug, Clone)]
pub struct ProcessedParameters {
    /// Standard parameters followed by template parameters, each in declaration order.
    pub all: Parameters,
    pub manifest: Vec<ParameterManifest>,
    pub input_schema: ProtocolInputSchema,
}

/// Validate both declaration lists and derive the merged set and manifests.
pub fn process_parameters(template_params: &[Parameter], params: &[Parameter]) -> Result<ProcessedParameters> {
    let mut seen = HashSet::new();
    for (param, template) in params
        .iter()
        .map(|p| (p, false))
        .chain(template_params.iter().map(|p| (p, true)))
    {
        param.validate(template)?;
        if !seen.insert(param.name.as_str()) {
            return Err(Error::parameter_config(format!(
                "parameter name {:?} must be unique across parameters and templateParameters",
                param.name
            )));
        }
    }

    let all: Parameters = params.iter().chain(template_params).cloned().collect();
    let manifest = all.iter().map(Parameter::manifest).collect();
    let input_schema = ProtocolInputSchema::from_parameters(&all);

    Ok(ProcessedParameters {
        all,
        manifest,
        input_schema,
    })
}

// =============================================================================
// Parameter values
// =============================================================================

/// A coerced parameter value.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamValue {
    pub name: String,
    pub value: Value,
}

/// Coerced values, ordered by declaration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParamValues(Vec<ParamValue>);

impl ParamValues {
    pub fn new(values: Vec<ParamValue>) -> Self {
        Self(values)
    }

    /// Name → value, for template resolution.
    pub fn as_map(&self) -> Map<String, Value> {
        self.0
            .iter()
            .map(|p| (p.name.clone(), p.value.clone()))
            .collect()
    }

    /// Values in declaration order, for positional binding.
    pub fn as_slice(&self) -> Vec<Value> {
        self.0.iter().map(|p| p.value.clone()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParamValue> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Bind caller input and verified claims against declarations.
///
/// Auth-bound parameters are read from `claims` only; whatever the caller
/// sent under that name is ignored. Keys with no declaration are ignored.
pub fn parse_params(params: &[Parameter], data: &Map<String, Value>, claims: &Claims) -> Result<ParamValues> {
    let mut values = Vec::with_capacity(params.len());
    for param in params {
        let raw = if param.is_auth_bound() {
            let claimed = param
                .auth_services
                .iter()
                .find_map(|svc| claims.get(&svc.name).and_then(|c| c.get(&svc.field)));
            match claimed {
                Some(v) => Some(v),
                None => {
                    return Err(Error::missing_parameter(&param.name)
                        .context("missing or invalid authentication claims"))
                }
            }
        } else {
            data.get(&param.name).filter(|v| !v.is_null())
        };

        let value = match (raw, &param.default) {
            (Some(v), _) => param.coerce(&param.name, v)?,
            (None, Some(default)) => param.coerce(&param.name, default)?,
            (None, None) if param.required => return Err(Error::missing_parameter(&param.name)),
            (None, None) => Value::Null,
        };
        values.push(ParamValue {
            name: param.name.clone(),
            value,
        });
    }
    Ok(ParamValues(values))
}

/// Extract the values of `params` from an already-coerced map, in declaration order.
pub fn get_params(params: &[Parameter], values: &Map<String, Value>) -> Result<ParamValues> {
    params
        .iter()
        .map(|p| {
            values
                .get(&p.name)
                .map(|v| ParamValue {
                    name: p.name.clone(),
                    value: v.clone(),
                })
                .ok_or_else(|| Error::missing_parameter(&p.name))
        })
        .collect::<Result<Vec<_>>>()
        .map(ParamValues)
}

// =============================================================================
// Template resolution
// =============================================================================

fn is_template_safe(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '$')
}

/// Render a template value. Strings are limited to identifier characters.
fn render_template_value(name: &str, value: &Value) -> Result<String> {
    match value {
        Value::String(s) if !s.is_empty() && s.chars().all(is_template_safe) => Ok(s.clone()),
        Value::String(s) => Err(Error::type_mismatch(
            name,
            "identifier (letters, digits, '_', '.', '$')",
            format!("{:?}", s),
        )),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Array(items) if !items.is_empty() => items
            .iter()
            .enumerate()
            .map(|(i, item)| match item {
                Value::Array(_) => Err(Error::type_mismatch(format!("{}[{}]", name, i), "scalar", "array")),
                other => render_template_value(&format!("{}[{}]", name, i), other),
            })
            .collect::<Result<Vec<_>>>()
            .map(|parts| parts.join(", ")),
        Value::Array(_) => Err(Error::type_mismatch(name, "non-empty array", "empty array")),
        other => Err(Error::type_mismatch(name, "template value", value_type_name(other))),
    }
}

/// Substitute `{{.name}}` placeholders with template parameter values.
///
/// Single pass over `statement`: substituted text is never re-scanned.
pub fn resolve_template_params(
    template_params: &[Parameter],
    statement: &str,
    values: &Map<String, Value>,
) -> Result<String> {
    for param in template_params {
        if values.get(&param.name).map_or(true, Value::is_null) {
            return Err(Error::unresolved_template(format!(
                "no value supplied for template parameter {:?}",
                param.name
            )));
        }
    }

    let mut out = String::with_capacity(statement.len());
    let mut rest = statement;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after.find("}}").ok_or_else(|| {
            Error::unresolved_template(format!("unterminated placeholder at {:?}", &rest[start..]))
        })?;
        let inner = after[..end].trim();
        let name = inner
            .strip_prefix('.')
            .filter(|n| is_identifier(n))
            .ok_or_else(|| Error::unresolved_template(format!("malformed placeholder \"{{{{{}}}}}\"", inner)))?;

        if !template_params.iter().any(|p| p.name == name) {
            return Err(Error::unresolved_template(format!(
                "placeholder {:?} does not name a declared template parameter",
                name
            )));
        }
        let value = values.get(name).ok_or_else(|| {
            Error::unresolved_template(format!("no value supplied for template parameter {:?}", name))
        })?;
        out.push_str(&render_template_value(name, value)?);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

// =============================================================================
// Tests
// =============================================================================
