//! Generation B: the `jsonschema` 0.41 API line.

use jsonschema::error::ValidationErrorKind;
use jsonschema::Validator;
use serde_json::Value;

use super::{split_pointer, NativeError};

pub(super) struct Compiled(Validator);

pub(super) fn compile(schema: &Value) -> Result<Compiled, String> {
    jsonschema::validator_for(schema)
        .map(Compiled)
        .map_err(|err| err.to_string())
}

impl Compiled {
    pub(super) fn errors(&self, instance: &Value) -> Vec<NativeError> {
        self.0
            .iter_errors(instance)
            .map(|err| {
                let properties = match err.kind() {
                    ValidationErrorKind::Required { property } => {
                        vec![property.as_str().unwrap_or_default().to_string()]
                    }
                    ValidationErrorKind::AdditionalProperties { unexpected } => unexpected.clone(),
                    _ => Vec::new(),
                };
                NativeError {
                    instance_path: split_pointer(err.instance_path().as_str()),
                    properties,
                    reason: err.to_string(),
                }
            })
            .collect()
    }
}
