//! Entry points into the linked `jsonschema` API lines.
//!
//! This is the only module that names the validation library. Everything
//! above it works with [`Checker`] and plain `serde_json` values.

#[cfg(feature = "legacy")]
mod legacy;
#[cfg(feature = "modern")]
mod modern;

use serde_json::{json, Value};

use crate::capability::Generation;

/// A schema compiled by one native line.
pub(crate) struct Checker(Compiled);

/// One native validation error, reduced to what the facade reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NativeError {
    /// Unescaped JSON pointer segments of the failing instance.
    pub instance_path: Vec<String>,
    /// Property names carried by `required` and `additionalProperties` errors.
    pub properties: Vec<String>,
    pub reason: String,
}

enum Compiled {
    #[cfg(feature = "legacy")]
    Legacy(legacy::Compiled),
    #[cfg(feature = "modern")]
    Modern(modern::Compiled),
}

impl Checker {
    /// Every way `instance` violates the compiled schema, in native order.
    pub(crate) fn errors(&self, instance: &Value) -> Vec<NativeError> {
        match self.0 {
            #[cfg(feature = "legacy")]
            Compiled::Legacy(ref compiled) => compiled.errors(instance),
            #[cfg(feature = "modern")]
            Compiled::Modern(ref compiled) => compiled.errors(instance),
        }
    }
}

impl std::fmt::Debug for Checker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Checker")
    }
}

/// Generations whose native entry point is present in this build.
pub(crate) fn linked() -> Vec<Generation> {
    let mut lines = Vec::new();
    if cfg!(feature = "legacy") {
        lines.push(Generation::Legacy);
    }
    if cfg!(feature = "modern") {
        lines.push(Generation::Modern);
    }
    lines
}

/// Compile a schema through the native entry point of `generation`.
pub(crate) fn compile(generation: Generation, schema: &Value) -> Result<Checker, String> {
    match generation {
        #[cfg(feature = "legacy")]
        Generation::Legacy => legacy::compile(schema).map(|c| Checker(Compiled::Legacy(c))),
        #[cfg(feature = "modern")]
        Generation::Modern => modern::compile(schema).map(|c| Checker(Compiled::Modern(c))),
        #[allow(unreachable_patterns)]
        other => {
            let _ = schema;
            Err(format!("{other} validation line is not linked"))
        }
    }
}

pub(super) fn split_pointer(pointer: &str) -> Vec<String> {
    pointer
        .split('/')
        .skip(1)
        .map(|segment| segment.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Exercise the native entry point of `generation` on a fixed schema.
///
/// The line passes when it compiles the schema, accepts a conforming value and
/// rejects a non-conforming one.
pub(crate) fn shape_check(generation: Generation) -> Result<(), String> {
    let schema = json!({
        "type": "object",
        "properties": { "name": { "type": "string" } },
        "required": ["name"]
    });
    let checker = compile(generation, &schema)?;

    if !checker.errors(&json!({ "name": "ok" })).is_empty() {
        return Err(format!("{generation} line rejected a conforming value"));
    }
    if checker.errors(&json!({ "name": 1 })).is_empty() {
        return Err(format!("{generation} line accepted a non-conforming value"));
    }
    Ok(())
}
