/// Parameter schemas
///
/// Turns stored parameter lists and MCP `inputSchema` objects into an
/// [`InvocationSchema`], which both validates incoming arguments and renders
/// itself back to JSON Schema for tool-calling models.
use crate::control_plane::StoreFunctionParameter;
use serde_json::{Map, Value};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamKind {
    String,
    Number,
    Integer,
    Boolean,
}

impl ParamKind {
    /// Unknown or absent types fall back to string
    pub fn from_type_name(name: Option<&str>) -> Self {
        match name {
            Some("number") => ParamKind::Number,
            Some("integer") => ParamKind::Integer,
            Some("boolean") => ParamKind::Boolean,
            _ => ParamKind::String,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParamKind::String => "string",
            ParamKind::Number => "number",
            ParamKind::Integer => "integer",
            ParamKind::Boolean => "boolean",
        }
    }

    fn accepts(&self, value: &Value) -> bool {
        match self {
            ParamKind::String => value.is_string(),
            ParamKind::Number => value.is_number(),
            ParamKind::Integer => match value {
                Value::Number(n) => {
                    n.is_i64()
                        || n.is_u64()
                        || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
                }
                _ => false,
            },
            ParamKind::Boolean => value.is_boolean(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub kind: ParamKind,
    pub description: Option<String>,
    pub default: Option<Value>,
    pub required: bool,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Expected an object of arguments, got {0}")]
    NotAnObject(&'static str),

    #[error("Missing required field `{0}`")]
    MissingField(String),

    #[error("Field `{field}` expected {expected}, got {actual}")]
    WrongType {
        field: String,
        expected: &'static str,
        actual: &'static str,
    },
}

/// Ordered set of named, typed fields
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvocationSchema {
    fields: Vec<FieldSchema>,
}

impl InvocationSchema {
    pub fn new(fields: Vec<FieldSchema>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[FieldSchema] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check `args` and return the normalized argument object.
    ///
    /// Defaults are applied before the required check, so a required field
    /// with a default never fails. Keys the schema doesn't know are dropped.
    pub fn validate(&self, args: &Value) -> Result<Value, ValidationError> {
        let input = match args {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => return Err(ValidationError::NotAnObject(json_type(other))),
        };

        let mut out = Map::new();
        for field in &self.fields {
            let value = input
                .get(&field.name)
                .filter(|v| !v.is_null())
                .cloned()
                .or_else(|| field.default.clone());

            match value {
                Some(v) => {
                    if !field.kind.accepts(&v) {
                        return Err(ValidationError::WrongType {
                            field: field.name.clone(),
                            expected: field.kind.as_str(),
                            actual: json_type(&v),
                        });
                    }
                    out.insert(field.name.clone(), v);
                }
                None if field.required => {
                    return Err(ValidationError::MissingField(field.name.clone()))
                }
                None => {}
            }
        }
        Ok(Value::Object(out))
    }

    /// Standard JSON Schema rendering (top-level `required` array)
    pub fn to_json_schema(&self) -> Value {
        let mut properties = Map::new();
        let mut required = Vec::new();
        for field in &self.fields {
            let mut prop = Map::new();
            prop.insert("type".into(), Value::String(field.kind.as_str().into()));
            if let Some(desc) = &field.description {
                prop.insert("description".into(), Value::String(desc.clone()));
            }
            if let Some(default) = &field.default {
                prop.insert("default".into(), default.clone());
            }
            properties.insert(field.name.clone(), Value::Object(prop));
            // A default makes the field optional for the caller
            if field.required && field.default.is_none() {
                required.push(Value::String(field.name.clone()));
            }
        }

        let mut schema = Map::new();
        schema.insert("type".into(), Value::String("object".into()));
        schema.insert("properties".into(), Value::Object(properties));
        schema.insert("required".into(), Value::Array(required));
        Value::Object(schema)
    }
}

/// Schema from a stored parameter list. Entries without a name are skipped.
pub fn build_schema(parameters: &[StoreFunctionParameter]) -> InvocationSchema {
    let fields = parameters
        .iter()
        .filter_map(|p| {
            let name = p.name.clone()?;
            Some(FieldSchema {
                name,
                kind: ParamKind::from_type_name(p.kind.as_deref()),
                description: p.description.clone(),
                default: p.default.clone(),
                required: p.required == Some(true),
            })
        })
        .collect();
    InvocationSchema::new(fields)
}

/// Schema from an MCP `inputSchema`.
///
/// Only `{"type": "object", "properties": {...}}` is understood; anything
/// else yields an empty schema. Requiredness is read from a boolean
/// `required` on each property. A top-level `required` array is ignored.
pub fn from_input_schema(input: &Value) -> InvocationSchema {
    let is_object = input.get("type").and_then(Value::as_str) == Some("object");
    let properties = match input.get("properties").and_then(Value::as_object) {
        Some(p) if is_object => p,
        _ => return InvocationSchema::default(),
    };

    let fields = properties
        .iter()
        .map(|(name, prop)| FieldSchema {
            name: name.clone(),
            kind: ParamKind::from_type_name(prop.get("type").and_then(Value::as_str)),
            description: prop
                .get("description")
                .and_then(Value::as_str)
                .map(str::to_string),
            default: prop.get("default").cloned(),
            required: prop.get("required").and_then(Value::as_bool) == Some(true),
        })
        .collect();
    InvocationSchema::new(fields)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> InvocationSchema {
        build_schema(&[
            StoreFunctionParameter::new("a", "number").required(true),
            StoreFunctionParameter::new("b", "string").required(false),
        ])
    }

    #[test]
    fn required_and_optional_fields() {
        let schema = sample();
        assert!(schema.validate(&json!({"a": 1})).is_ok());
        assert!(schema.validate(&json!({"a": 1, "b": "x"})).is_ok());
        assert_eq!(
            schema.validate(&json!({"b": "x"})),
            Err(ValidationError::MissingField("a".into()))
        );
    }

    #[test]
    fn nameless_parameters_are_skipped() {
        let schema = build_schema(&[
            StoreFunctionParameter {
                kind: Some("string".into()),
                ..Default::default()
            },
            StoreFunctionParameter::new("q", "string"),
        ]);
        assert_eq!(schema.fields().len(), 1);
        assert_eq!(schema.fields()[0].name, "q");
    }

    #[test]
    fn unknown_type_defaults_to_string() {
        let schema = build_schema(&[StoreFunctionParameter {
            name: Some("x".into()),
            kind: Some("date".into()),
            ..Default::default()
        }]);
        assert_eq!(schema.field("x").map(|f| f.kind), Some(ParamKind::String));
    }

    #[test]
    fn default_applies_before_required_check() {
        let schema = build_schema(&[StoreFunctionParameter::new("limit", "integer")
            .required(true)
            .default_value(json!(10))]);
        assert_eq!(schema.validate(&json!({})).unwrap(), json!({"limit": 10}));
    }

    #[test]
    fn type_mismatch_is_rejected() {
        let err = sample().validate(&json!({"a": "one"})).unwrap_err();
        assert!(matches!(err, ValidationError::WrongType { ref field, .. } if field == "a"));
    }

    #[test]
    fn integer_accepts_whole_numbers_only() {
        let schema = build_schema(&[StoreFunctionParameter::new("n", "integer")]);
        assert!(schema.validate(&json!({"n": 3})).is_ok());
        assert!(schema.validate(&json!({"n": 3.0})).is_ok());
        assert!(schema.validate(&json!({"n": 3.5})).is_err());
    }

    #[test]
    fn unknown_fields_are_dropped() {
        let out = sample().validate(&json!({"a": 1, "extra": true})).unwrap();
        assert_eq!(out, json!({"a": 1}));
    }

    #[test]
    fn null_arguments_mean_empty_object() {
        let schema = build_schema(&[StoreFunctionParameter::new("b", "string")]);
        assert_eq!(schema.validate(&Value::Null).unwrap(), json!({}));
        assert!(schema.validate(&json!([1])).is_err());
    }

    #[test]
    fn mcp_required_is_per_property() {
        let schema = from_input_schema(&json!({
            "type": "object",
            "properties": {
                "msg": {"type": "string", "required": true, "description": "Message"},
                "loud": {"type": "boolean"}
            },
            "required": ["loud"]
        }));
        assert!(schema.field("msg").unwrap().required);
        assert!(!schema.field("loud").unwrap().required);
        assert!(schema.validate(&json!({})).is_err());
        assert!(schema.validate(&json!({"msg": "hi"})).is_ok());
    }

    #[test]
    fn non_object_input_schema_is_empty() {
        assert!(from_input_schema(&json!({"type": "string"})).fields().is_empty());
        assert!(from_input_schema(&json!({})).fields().is_empty());
    }

    #[test]
    fn json_schema_rendering() {
        let rendered = sample().to_json_schema();
        assert_eq!(rendered["type"], "object");
        assert_eq!(rendered["properties"]["a"]["type"], "number");
        assert_eq!(rendered["required"], json!(["a"]));

        let with_default = build_schema(&[
            StoreFunctionParameter::new("q", "string").required(true),
            StoreFunctionParameter::new("limit", "integer")
                .required(true)
                .default_value(json!(10)),
        ])
        .to_json_schema();
        assert_eq!(with_default["properties"]["limit"]["default"], 10);
        assert_eq!(with_default["required"], json!(["q"]));

        let mcp = from_input_schema(&json!({
            "type": "object",
            "properties": {"n": {"type": "integer", "required": true, "default": 1}}
        }))
        .to_json_schema();
        assert_eq!(mcp["required"], json!([]));
    }
}
