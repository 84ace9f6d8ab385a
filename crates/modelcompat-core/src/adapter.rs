use serde_json::Value;

use crate::capability::{self, Capability, Generation};
use crate::config::ModelConfig;
use crate::error::{FieldPath, Result};
use crate::facade;
use crate::field::FieldType;
use crate::model::FieldValue;
use crate::native::Checker;
use crate::normalize::{self, TypeNode};

/// Validation, dumping and schema output for a bare field type.
#[derive(Debug)]
pub struct TypeAdapter {
    ty: FieldType,
    node: TypeNode,
    checker: Checker,
    generation: Generation,
    label: String,
}

impl TypeAdapter {
    /// Adapt `ty` under the process-wide capability.
    pub fn new(ty: FieldType) -> Result<Self> {
        Self::with_capability(ty, capability::current()?)
    }

    pub fn with_capability(ty: FieldType, capability: Capability) -> Result<Self> {
        let label = ty.to_string();
        let generation = capability.generation();
        let node = normalize::compile_type(generation, &ty, &label)?;
        let checker = normalize::compile_validator(generation, &ty, &label)?;
        Ok(Self {
            ty,
            node,
            checker,
            generation,
            label,
        })
    }

    pub fn field_type(&self) -> &FieldType {
        &self.ty
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Validate `value` in lax mode; failures are rooted at the value itself.
    pub fn validate_python(&self, value: &Value) -> Result<FieldValue> {
        self.validate_with(value, &ModelConfig::new())
    }

    /// Validate with model-style options such as `strict` or `str_strip_whitespace`.
    pub fn validate_with(&self, value: &Value, config: &ModelConfig) -> Result<FieldValue> {
        let resolved = config.resolve(&self.label)?;
        let policy = normalize::Policy {
            extra: resolved.extra,
            strict: resolved.strict,
            strip_whitespace: resolved.str_strip_whitespace,
            frozen: resolved.frozen,
            validate_assignment: resolved.validate_assignment,
        };

        let validated = facade::validate_field(
            &self.label,
            &self.node,
            &self.checker,
            value.clone(),
            &FieldPath::root(),
            &policy,
        )?;
        Ok(validated)
    }

    pub fn dump_python(&self, value: &FieldValue) -> Value {
        value.to_value()
    }

    pub fn json_schema(&self) -> Value {
        crate::schema::standalone_type_schema(&self.ty)
    }
}
