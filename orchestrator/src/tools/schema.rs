//! Declared tool parameters.
//!
//! A [`ParameterSchema`] is an ordered list of typed parameters. It renders to
//! the JSON Schema object that provider adapters embed in tool definitions and
//! is checked once, when the tool is registered.

use std::collections::HashSet;
use std::fmt;

use jsonschema::validator_for;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// JSON type tag of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamType {
    String,
    Integer,
    Number,
    Boolean,
    Array,
    Object,
}

impl ParamType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParamType::String => "string",
            ParamType::Integer => "integer",
            ParamType::Number => "number",
            ParamType::Boolean => "boolean",
            ParamType::Array => "array",
            ParamType::Object => "object",
        }
    }

    /// True if `value` is an instance of this type.
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            ParamType::String => value.is_string(),
            ParamType::Integer => value.is_i64() || value.is_u64(),
            ParamType::Number => value.is_number(),
            ParamType::Boolean => value.is_boolean(),
            ParamType::Array => value.is_array(),
            ParamType::Object => value.is_object(),
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One declared parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ParamType,
    pub description: String,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, rename = "enum", skip_serializing_if = "Option::is_none")]
    pub allowed: Option<Vec<Value>>,
}

impl ParameterSpec {
    pub fn required(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            description: description.into(),
            required: true,
            default: None,
            allowed: None,
        }
    }

    pub fn optional(name: impl Into<String>, kind: ParamType, description: impl Into<String>) -> Self {
        Self {
            required: false,
            ..Self::required(name, kind, description)
        }
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn one_of(mut self, values: Vec<Value>) -> Self {
        self.allowed = Some(values);
        self
    }

    fn to_property(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".to_string(), json!(self.kind.as_str()));
        property.insert("description".to_string(), json!(self.description));
        if let Some(default) = &self.default {
            property.insert("default".to_string(), default.clone());
        }
        if let Some(allowed) = &self.allowed {
            property.insert("enum".to_string(), Value::Array(allowed.clone()));
        }
        Value::Object(property)
    }
}

/// Ordered parameter declarations of a tool.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSchema {
    params: Vec<ParameterSpec>,
}

impl ParameterSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, spec: ParameterSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn params(&self) -> &[ParameterSpec] {
        &self.params
    }

    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.params.iter().find(|spec| spec.name == name)
    }

    /// Render as a JSON Schema object (`type`, `properties`, `required`).
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        for spec in &self.params {
            properties.insert(spec.name.clone(), spec.to_property());
        }
        let required: Vec<&str> = self
            .params
            .iter()
            .filter(|spec| spec.required)
            .map(|spec| spec.name.as_str())
            .collect();
        json!({
            "type": "object",
            "properties": properties,
            "required": required,
        })
    }

    /// Check names, defaults and enum values, then compile the rendered schema.
    pub fn validate(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for spec in &self.params {
            if spec.name.trim().is_empty() {
                return Err("parameter name must be non-empty".to_string());
            }
            if !seen.insert(spec.name.as_str()) {
                return Err(format!("duplicate parameter '{}'", spec.name));
            }
            if let Some(allowed) = &spec.allowed {
                if allowed.is_empty() {
                    return Err(format!("parameter '{}' has an empty enum", spec.name));
                }
                if let Some(bad) = allowed.iter().find(|value| !spec.kind.accepts(value)) {
                    return Err(format!(
                        "enum value {} of parameter '{}' is not a {}",
                        bad, spec.name, spec.kind
                    ));
                }
            }
            if let Some(default) = &spec.default {
                if !spec.kind.accepts(default) {
                    return Err(format!(
                        "default {} of parameter '{}' is not a {}",
                        default, spec.name, spec.kind
                    ));
                }
                if let Some(allowed) = &spec.allowed
                    && !allowed.contains(default)
                {
                    return Err(format!(
                        "default {} of parameter '{}' is not one of its enum values",
                        default, spec.name
                    ));
                }
            }
        }

        validator_for(&self.to_json_schema())
            .map(|_| ())
            .map_err(|err| format!("rendered schema does not compile: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> ParameterSchema {
        ParameterSchema::new()
            .param(ParameterSpec::required(
                "file_path",
                ParamType::String,
                "Path to the file",
            ))
            .param(
                ParameterSpec::optional("count", ParamType::Integer, "Replacements")
                    .default_value(json!(-1)),
            )
    }

    #[test]
    fn renders_json_schema_object() {
        let schema = sample().to_json_schema();
        assert_eq!(schema["type"], "object");
        assert_eq!(schema["properties"]["file_path"]["type"], "string");
        assert_eq!(schema["properties"]["count"]["default"], -1);
        assert_eq!(schema["required"], json!(["file_path"]));
    }

    #[test]
    fn valid_schema_passes() {
        assert!(sample().validate().is_ok());
        assert!(ParameterSchema::new().validate().is_ok());
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let schema = sample().param(ParameterSpec::optional(
            "count",
            ParamType::String,
            "again",
        ));
        let err = schema.validate().expect_err("duplicate");
        assert!(err.contains("duplicate parameter 'count'"));
    }

    #[test]
    fn default_must_match_type_and_enum() {
        let wrong_type = ParameterSchema::new().param(
            ParameterSpec::optional("flag", ParamType::Boolean, "A flag").default_value(json!("yes")),
        );
        assert!(wrong_type.validate().is_err());

        let outside_enum = ParameterSchema::new().param(
            ParameterSpec::optional("mode", ParamType::String, "Mode")
                .one_of(vec![json!("fast"), json!("slow")])
                .default_value(json!("medium")),
        );
        assert!(outside_enum.validate().is_err());
    }

    #[test]
    fn integer_accepts_only_whole_numbers() {
        assert!(ParamType::Integer.accepts(&json!(3)));
        assert!(!ParamType::Integer.accepts(&json!(3.5)));
        assert!(ParamType::Number.accepts(&json!(3.5)));
    }
}
