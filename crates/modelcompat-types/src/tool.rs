//! Callable tool descriptors for function-calling prompts.

use std::sync::Arc;

use modelcompat_core::{
    capability, Capability, ClassCache, CompatError, FieldSpec, FieldType, ModelBuilder,
    ModelClass, Result, ValidatedModel,
};
use serde_json::{json, Map, Value};

use crate::frozen_config;

static CLASS: ClassCache = ClassCache::new();

pub fn tool_class(capability: Capability) -> Result<Arc<ModelClass>> {
    CLASS.get_or_build(capability, |cap| {
        ModelBuilder::new("Tool")
            .field(FieldSpec::new("name", FieldType::String))
            .field(FieldSpec::new("desc", FieldType::String).not_required())
            .field(
                FieldSpec::new("parameters", FieldType::map(FieldType::Object))
                    .default(json!({}))
                    .description("JSON schema per argument"),
            )
            .field(FieldSpec::new("return_type", FieldType::String).not_required())
            .config(frozen_config())
            .after_validator(|model| match model.get_str("name") {
                Some(name) if is_identifier(name) => Ok(()),
                Some(name) => Err(format!("tool name is not an identifier: {name:?}")),
                None => Err("tool name is missing".to_string()),
            })
            .build_with(cap)
    })
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_alphabetic() || c == '_')
        && chars.all(|c| c.is_alphanumeric() || c == '_')
}

/// A validated tool descriptor.
#[derive(Debug, Clone, PartialEq)]
pub struct Tool {
    model: ValidatedModel,
}

impl Tool {
    pub fn new(name: impl Into<String>, desc: Option<&str>) -> Result<Self> {
        Self::new_with(capability::current()?, name, desc)
    }

    pub fn new_with(capability: Capability, name: impl Into<String>, desc: Option<&str>) -> Result<Self> {
        Self::from_value(capability, &json!({ "name": name.into(), "desc": desc }))
    }

    pub fn from_value(capability: Capability, raw: &Value) -> Result<Self> {
        let model = tool_class(capability)?.validate(raw)?;
        Ok(Self { model })
    }

    /// Describe a tool whose arguments are the fields of `args`.
    ///
    /// Argument schemas come from the model's JSON schema, so nested model
    /// references are resolved inline.
    pub fn from_model(
        capability: Capability,
        name: impl Into<String>,
        desc: Option<&str>,
        args: &ModelClass,
    ) -> Result<Self> {
        let schema = args.to_json_schema();
        let defs = schema.get("$defs").cloned().unwrap_or(Value::Null);
        let properties = match schema.get("properties") {
            Some(Value::Object(properties)) => properties.clone(),
            _ => {
                return Err(CompatError::Definition {
                    model: args.name().to_string(),
                    reason: "schema has no properties".to_string(),
                })
            }
        };
        let parameters: Map<String, Value> = properties
            .into_iter()
            .map(|(key, value)| (key, inline_refs(value, &defs)))
            .collect();

        Self::from_value(
            capability,
            &json!({
                "name": name.into(),
                "desc": desc,
                "parameters": parameters,
                "return_type": Value::Null,
            }),
        )
    }

    pub fn name(&self) -> &str {
        self.model.get_str("name").unwrap_or_default()
    }

    pub fn desc(&self) -> Option<&str> {
        self.model.get_str("desc")
    }

    pub fn return_type(&self) -> Option<&str> {
        self.model.get_str("return_type")
    }

    pub fn parameters(&self) -> Map<String, Value> {
        match self.model.field("parameters").map(|value| value.to_value()) {
            Some(Value::Object(parameters)) => parameters,
            _ => Map::new(),
        }
    }

    /// Parameters without a declared `default`.
    pub fn required_parameters(&self) -> Vec<String> {
        self.parameters()
            .into_iter()
            .filter(|(_, schema)| schema.get("default").is_none())
            .map(|(name, _)| name)
            .collect()
    }

    /// The function-calling payload chat APIs expect.
    pub fn format_as_function_call(&self) -> Value {
        let mut function = Map::new();
        function.insert("name".to_string(), json!(self.name()));
        if let Some(desc) = self.desc() {
            function.insert("description".to_string(), json!(desc));
        }
        function.insert(
            "parameters".to_string(),
            json!({
                "type": "object",
                "properties": self.parameters(),
                "required": self.required_parameters(),
            }),
        );
        json!({ "type": "function", "function": function })
    }

    pub fn model(&self) -> &ValidatedModel {
        &self.model
    }

    pub fn dump(&self) -> Map<String, Value> {
        self.model.dump()
    }
}

fn inline_refs(value: Value, defs: &Value) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(Value::String(reference)) = map.get("$ref") {
                if let Some(target) = reference
                    .strip_prefix("#/$defs/")
                    .and_then(|name| defs.get(name))
                {
                    return inline_refs(target.clone(), defs);
                }
            }
            Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, inline_refs(value, defs)))
                    .collect(),
            )
        }
        Value::Array(items) => {
            Value::Array(items.into_iter().map(|item| inline_refs(item, defs)).collect())
        }
        other => other,
    }
}
