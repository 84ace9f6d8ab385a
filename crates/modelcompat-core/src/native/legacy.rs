//! Generation A: the `jsonschema` 0.17 API line.

use jsonschema_legacy::error::ValidationErrorKind;
use jsonschema_legacy::{Draft, JSONSchema};
use serde_json::Value;

use super::{split_pointer, NativeError};

pub(super) struct Compiled(JSONSchema);

pub(super) fn compile(schema: &Value) -> Result<Compiled, String> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(schema)
        .map(Compiled)
        .map_err(|err| err.to_string())
}

impl Compiled {
    pub(super) fn errors(&self, instance: &Value) -> Vec<NativeError> {
        let Err(errors) = self.0.validate(instance) else {
            return Vec::new();
        };
        errors
            .map(|err| {
                let properties = match &err.kind {
                    ValidationErrorKind::Required { property } => {
                        vec![property.as_str().unwrap_or_default().to_string()]
                    }
                    ValidationErrorKind::AdditionalProperties { unexpected } => unexpected.clone(),
                    _ => Vec::new(),
                };
                NativeError {
                    instance_path: split_pointer(&err.instance_path.to_string()),
                    properties,
                    reason: err.to_string(),
                }
            })
            .collect()
    }
}
