//! Define data models once, validate them under either `jsonschema` API line.
//!
//! # Crate Structure
//!
//! - [`compat`]: version probe, declaration surface and validation facade
//! - [`types`]: image, audio, history and tool models (behind `types` feature)

/// Re-export core types.
pub mod compat {
    pub use modelcompat_core::*;
}

/// Re-export the built-in models (requires `types` feature).
#[cfg(feature = "types")]
pub mod types {
    pub use modelcompat_types::*;
}

pub use modelcompat_core::{
    Capability, CompatError, Extra, FieldSpec, FieldType, Generation, ModelBuilder, ModelClass,
    ModelConfig, Result, ValidatedModel,
};

#[cfg(test)]
mod tests {
    use super::compat::capability::linked_generations;
    use super::Generation;

    #[test]
    fn generation_features_select_linked_lines() {
        let linked = linked_generations();
        assert_eq!(linked.contains(&Generation::Legacy), cfg!(feature = "legacy"));
        assert_eq!(linked.contains(&Generation::Modern), cfg!(feature = "modern"));
    }
}
