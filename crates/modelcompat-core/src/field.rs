use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::model::ModelClass;

/// Declared type of a model field.
#[derive(Debug, Clone)]
pub enum FieldType {
    String,
    Integer,
    Number,
    Boolean,
    /// Any JSON value, including null.
    Any,
    /// A free-form mapping with string keys.
    Object,
    Array(Box<FieldType>),
    /// A mapping from string keys to values of one type.
    Map(Box<FieldType>),
    /// The inner type or null.
    Optional(Box<FieldType>),
    /// One of a fixed set of JSON values.
    Literal(Vec<Value>),
    /// A nested model.
    Model(Arc<ModelClass>),
}

impl FieldType {
    pub fn array(item: FieldType) -> Self {
        FieldType::Array(Box::new(item))
    }

    pub fn map(value: FieldType) -> Self {
        FieldType::Map(Box::new(value))
    }

    pub fn optional(inner: FieldType) -> Self {
        match inner {
            FieldType::Optional(_) => inner,
            other => FieldType::Optional(Box::new(other)),
        }
    }

    pub fn literal<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        FieldType::Literal(values.into_iter().map(Into::into).collect())
    }

    pub fn model(class: &Arc<ModelClass>) -> Self {
        FieldType::Model(Arc::clone(class))
    }

    /// Whether null is an accepted value.
    pub fn is_nullable(&self) -> bool {
        matches!(self, FieldType::Optional(_) | FieldType::Any)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => f.write_str("string"),
            FieldType::Integer => f.write_str("integer"),
            FieldType::Number => f.write_str("number"),
            FieldType::Boolean => f.write_str("boolean"),
            FieldType::Any => f.write_str("any"),
            FieldType::Object => f.write_str("object"),
            FieldType::Array(item) => write!(f, "array<{item}>"),
            FieldType::Map(value) => write!(f, "map<string, {value}>"),
            FieldType::Optional(inner) => write!(f, "optional<{inner}>"),
            FieldType::Literal(values) => {
                let rendered: Vec<String> = values.iter().map(Value::to_string).collect();
                write!(f, "literal[{}]", rendered.join(", "))
            }
            FieldType::Model(class) => f.write_str(class.name()),
        }
    }
}

/// Declaration of one model field.
///
/// Immutable once handed to a [`ModelBuilder`](crate::ModelBuilder); the
/// builder methods consume and return the spec.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    name: String,
    ty: FieldType,
    default: Option<Value>,
    description: Option<String>,
    title: Option<String>,
    required: Option<bool>,
    json_schema_extra: Map<String, Value>,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, ty: FieldType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            description: None,
            title: None,
            required: None,
            json_schema_extra: Map::new(),
        }
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn title(mut self, text: impl Into<String>) -> Self {
        self.title = Some(text.into());
        self
    }

    /// Mark the field required even if a default is declared.
    pub fn required(mut self) -> Self {
        self.required = Some(true);
        self
    }

    /// Mark the field optional; without a default it falls back to null.
    pub fn not_required(mut self) -> Self {
        self.required = Some(false);
        self
    }

    /// Attach free metadata rendered into the field's schema property.
    pub fn json_schema_extra(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.json_schema_extra.insert(key.into(), value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ty(&self) -> &FieldType {
        &self.ty
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn description_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn title_text(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn extra(&self) -> &Map<String, Value> {
        &self.json_schema_extra
    }

    /// The explicit marker when present, otherwise "no default declared".
    pub fn is_required(&self) -> bool {
        self.required.unwrap_or(self.default.is_none())
    }

    /// Apply the implicit null default of not-required fields.
    pub(crate) fn resolved(mut self) -> Self {
        if !self.is_required() && self.default.is_none() {
            self.default = Some(Value::Null);
            if !self.ty.is_nullable() {
                self.ty = FieldType::optional(self.ty);
            }
        }
        self.required = Some(self.is_required());
        self
    }
}
