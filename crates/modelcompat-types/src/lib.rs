//! Reusable models declared through `modelcompat-core`.
//!
//! Every type here is built only from field specs, model configuration and
//! the validation facade, so it behaves the same under either generation.
//! Classes are finalized once per generation and cached.

pub mod audio;
pub mod history;
pub mod image;
pub mod tool;

use std::sync::Arc;

use modelcompat_core::{Capability, Extra, ModelClass, ModelConfig, Result};

pub use audio::{audio_class, Audio};
pub use history::{history_class, message_class, History, Message};
pub use image::{image_class, Image};
pub use tool::{tool_class, Tool};

/// Names accepted by [`builtin_class`].
pub const BUILTIN_MODELS: [&str; 5] = ["image", "audio", "message", "history", "tool"];

/// Look up a built-in model class by its lowercase name.
pub fn builtin_class(name: &str, capability: Capability) -> Option<Result<Arc<ModelClass>>> {
    let class = match name.to_ascii_lowercase().as_str() {
        "image" => image_class(capability),
        "audio" => audio_class(capability),
        "message" => message_class(capability),
        "history" => history_class(capability),
        "tool" => tool_class(capability),
        _ => return None,
    };
    Some(class)
}

/// Immutable, whitespace-trimmed, closed to unknown keys.
pub(crate) fn frozen_config() -> ModelConfig {
    ModelConfig::new()
        .frozen(true)
        .str_strip_whitespace(true)
        .validate_assignment(true)
        .extra(Extra::Forbid)
}

/// Split `data:<media>;base64,<payload>` into media type and payload.
pub(crate) fn split_data_uri(uri: &str) -> Option<(&str, &str)> {
    uri.strip_prefix("data:")?.split_once(";base64,")
}

#[cfg(test)]
pub(crate) fn test_caps() -> Vec<Capability> {
    modelcompat_core::capability::linked_generations()
        .into_iter()
        .map(|generation| Capability::forced(generation).expect("linked generation"))
        .collect()
}

#[cfg(test)]
mod tests {
    use modelcompat_core::{CallArgs, CompatError, ConstructionArgumentError};

    use super::*;

    #[test]
    fn data_uri_is_split() {
        assert_eq!(
            split_data_uri("data:image/png;base64,AAAA"),
            Some(("image/png", "AAAA"))
        );
        assert_eq!(split_data_uri("https://x/y.png"), None);
    }

    #[test]
    fn every_builtin_resolves() {
        for cap in test_caps() {
            for name in BUILTIN_MODELS {
                let class = builtin_class(name, cap).unwrap().unwrap();
                assert_eq!(class.generation(), cap.generation());
            }
            assert!(builtin_class("signature", cap).is_none());
        }
    }

    #[test]
    fn every_builtin_rejects_positional_construction() {
        for cap in test_caps() {
            for name in BUILTIN_MODELS {
                let class = builtin_class(name, cap).unwrap().unwrap();
                let err = class
                    .construct(CallArgs::new().arg("value"))
                    .unwrap_err();
                assert!(matches!(
                    err,
                    CompatError::Construction(ConstructionArgumentError::Positional { count: 1, .. })
                ));
            }
        }
    }
}
