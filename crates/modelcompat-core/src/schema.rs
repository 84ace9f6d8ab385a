//! JSON Schema rendering from the declared field specs.
//!
//! Output depends only on the declarations, never on the native artifacts, so
//! it is byte-identical under both generations.

use std::sync::Arc;

use serde_json::{json, Map, Value};

use crate::config::Extra;
use crate::field::{FieldSpec, FieldType};
use crate::model::ModelClass;

pub(crate) fn model_schema(class: &ModelClass) -> Value {
    let mut renderer = Renderer::new(Mode::Document, "$defs");
    let root = renderer.object(
        Some(class.title()),
        class.fields(),
        class.native().policy().extra,
    );
    renderer.finish(root)
}

/// Schema of a bare type, with `$defs` for any nested models.
pub(crate) fn standalone_type_schema(ty: &FieldType) -> Value {
    let mut renderer = Renderer::new(Mode::Document, "$defs");
    let root = renderer.type_schema(ty);
    renderer.finish(root)
}

/// Structural schema of a model for the native validator: no annotations,
/// nested models under `defs_key`.
pub(crate) fn validation_schema(
    specs: &[FieldSpec],
    extra: Extra,
    defs_key: &'static str,
) -> Value {
    let mut renderer = Renderer::new(Mode::Validation, defs_key);
    let root = renderer.object(None, specs, extra);
    renderer.finish(root)
}

/// Structural schema of a bare type for the native validator.
pub(crate) fn type_validation_schema(ty: &FieldType, defs_key: &'static str) -> Value {
    let mut renderer = Renderer::new(Mode::Validation, defs_key);
    let root = renderer.type_schema(ty);
    renderer.finish(root)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Titles, descriptions, defaults and extra metadata included.
    Document,
    Validation,
}

struct Renderer {
    mode: Mode,
    defs_key: &'static str,
    defs: Map<String, Value>,
    /// Definition key per nested model, by identity.
    seen: Vec<(Arc<ModelClass>, String)>,
}

impl Renderer {
    fn new(mode: Mode, defs_key: &'static str) -> Self {
        Self {
            mode,
            defs_key,
            defs: Map::new(),
            seen: Vec::new(),
        }
    }

    fn finish(self, mut root: Map<String, Value>) -> Value {
        if !self.defs.is_empty() {
            root.insert(self.defs_key.to_string(), Value::Object(self.defs));
        }
        Value::Object(root)
    }

    fn object(
        &mut self,
        title: Option<&str>,
        specs: &[FieldSpec],
        extra: Extra,
    ) -> Map<String, Value> {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for spec in specs {
            let property = self.property(spec);
            properties.insert(spec.name().to_string(), Value::Object(property));
            if spec.is_required() {
                required.push(Value::String(spec.name().to_string()));
            }
        }

        let mut schema = Map::new();
        if let (Mode::Document, Some(title)) = (self.mode, title) {
            schema.insert("title".to_string(), json!(title));
        }
        schema.insert("type".to_string(), json!("object"));
        schema.insert("properties".to_string(), Value::Object(properties));
        schema.insert("required".to_string(), Value::Array(required));
        if extra == Extra::Forbid {
            schema.insert("additionalProperties".to_string(), Value::Bool(false));
        }
        schema
    }

    fn property(&mut self, spec: &FieldSpec) -> Map<String, Value> {
        if self.mode == Mode::Validation {
            return self.type_schema(spec.ty());
        }

        let mut schema = Map::new();
        let title = spec
            .title_text()
            .map(str::to_string)
            .unwrap_or_else(|| title_case(spec.name()));
        schema.insert("title".to_string(), Value::String(title));

        for (key, value) in self.type_schema(spec.ty()) {
            schema.insert(key, value);
        }
        if let Some(description) = spec.description_text() {
            schema.insert("description".to_string(), json!(description));
        }
        if !spec.is_required() {
            if let Some(default) = spec.default_value() {
                schema.insert("default".to_string(), default.clone());
            }
        }
        for (key, value) in spec.extra() {
            schema.insert(key.clone(), value.clone());
        }
        schema
    }

    fn type_schema(&mut self, ty: &FieldType) -> Map<String, Value> {
        let value = match ty {
            FieldType::String => json!({ "type": "string" }),
            FieldType::Integer => json!({ "type": "integer" }),
            FieldType::Number => json!({ "type": "number" }),
            FieldType::Boolean => json!({ "type": "boolean" }),
            FieldType::Any => json!({}),
            FieldType::Object => json!({ "type": "object" }),
            FieldType::Array(item) => json!({
                "type": "array",
                "items": Value::Object(self.type_schema(item)),
            }),
            FieldType::Map(inner) => json!({
                "type": "object",
                "additionalProperties": Value::Object(self.type_schema(inner)),
            }),
            FieldType::Optional(inner) => json!({
                "anyOf": [Value::Object(self.type_schema(inner)), { "type": "null" }],
            }),
            FieldType::Literal(values) => {
                let mut schema = Map::new();
                schema.insert("enum".to_string(), Value::Array(values.clone()));
                if let Some(kind) = common_json_type(values) {
                    schema.insert("type".to_string(), json!(kind));
                }
                Value::Object(schema)
            }
            FieldType::Model(class) => {
                let key = self.definition(class);
                json!({ "$ref": format!("#/{}/{key}", self.defs_key) })
            }
        };

        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn definition(&mut self, class: &Arc<ModelClass>) -> String {
        if let Some((_, key)) = self.seen.iter().find(|(seen, _)| Arc::ptr_eq(seen, class)) {
            return key.clone();
        }

        // Distinct models sharing a name get numbered keys.
        let name = class.name();
        let key = std::iter::once(name.to_string())
            .chain((2..).map(|n| format!("{name}{n}")))
            .find(|key| !self.defs.contains_key(key))
            .unwrap_or_else(|| name.to_string());
        self.seen.push((Arc::clone(class), key.clone()));

        // Reserve the slot first so the nested model keeps its DFS position.
        self.defs.insert(key.clone(), Value::Null);
        let nested = self.object(
            Some(class.title()),
            class.fields(),
            class.native().policy().extra,
        );
        self.defs.insert(key.clone(), Value::Object(nested));
        key
    }
}

fn common_json_type(values: &[Value]) -> Option<&'static str> {
    let kind = |value: &Value| match value {
        Value::String(_) => Some("string"),
        Value::Bool(_) => Some("boolean"),
        Value::Number(n) if n.is_i64() || n.is_u64() => Some("integer"),
        Value::Number(_) => Some("number"),
        _ => None,
    };
    let first = kind(values.first()?)?;
    values
        .iter()
        .all(|value| kind(value) == Some(first))
        .then_some(first)
}

/// `image_url` -> `Image Url`.
pub(crate) fn title_case(name: &str) -> String {
    name.split('_')
        .filter(|part| !part.is_empty())
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
