use std::fmt;

use serde_json::{Map, Value};

use crate::error::{CompatError, Result};

/// Option names understood by [`ModelConfig`].
pub const KNOWN_OPTIONS: [&str; 7] = [
    "title",
    "extra",
    "strict",
    "arbitrary_types_allowed",
    "str_strip_whitespace",
    "frozen",
    "validate_assignment",
];

/// Policy for input keys that match no declared field.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Extra {
    /// Keep extra keys and include them in dumps.
    Allow,
    /// Drop extra keys silently.
    #[default]
    Ignore,
    /// Report each extra key as a validation failure.
    Forbid,
}

impl Extra {
    pub fn as_str(self) -> &'static str {
        match self {
            Extra::Allow => "allow",
            Extra::Ignore => "ignore",
            Extra::Forbid => "forbid",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "allow" => Some(Extra::Allow),
            "ignore" => Some(Extra::Ignore),
            "forbid" => Some(Extra::Forbid),
            _ => None,
        }
    }
}

impl fmt::Display for Extra {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Model-level options, keyed by canonical option name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModelConfig {
    options: Map<String, Value>,
}

impl ModelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a raw option. Unknown names are rejected when the model is finalized.
    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    pub fn title(self, title: impl Into<String>) -> Self {
        self.set("title", title.into())
    }

    pub fn extra(self, extra: Extra) -> Self {
        self.set("extra", extra.as_str())
    }

    pub fn strict(self, on: bool) -> Self {
        self.set("strict", on)
    }

    pub fn frozen(self, on: bool) -> Self {
        self.set("frozen", on)
    }

    pub fn str_strip_whitespace(self, on: bool) -> Self {
        self.set("str_strip_whitespace", on)
    }

    pub fn validate_assignment(self, on: bool) -> Self {
        self.set("validate_assignment", on)
    }

    pub fn arbitrary_types_allowed(self, on: bool) -> Self {
        self.set("arbitrary_types_allowed", on)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.options.get(key)
    }

    pub fn options(&self) -> &Map<String, Value> {
        &self.options
    }

    /// `self` with every option of `child` layered on top.
    pub fn merged(&self, child: &ModelConfig) -> ModelConfig {
        let mut options = self.options.clone();
        for (key, value) in &child.options {
            options.insert(key.clone(), value.clone());
        }
        ModelConfig { options }
    }

    pub(crate) fn resolve(&self, model: &str) -> Result<ResolvedConfig> {
        let mut resolved = ResolvedConfig::default();

        for (key, value) in &self.options {
            match key.as_str() {
                "title" => {
                    let title = value
                        .as_str()
                        .ok_or_else(|| bad_option(model, key, "a string", value))?;
                    resolved.title = Some(title.to_string());
                }
                "extra" => {
                    resolved.extra = value
                        .as_str()
                        .and_then(Extra::parse)
                        .ok_or_else(|| bad_option(model, key, "allow, ignore or forbid", value))?;
                }
                "strict" => resolved.strict = flag(model, key, value)?,
                "arbitrary_types_allowed" => {
                    resolved.arbitrary_types_allowed = flag(model, key, value)?
                }
                "str_strip_whitespace" => resolved.str_strip_whitespace = flag(model, key, value)?,
                "frozen" => resolved.frozen = flag(model, key, value)?,
                "validate_assignment" => resolved.validate_assignment = flag(model, key, value)?,
                other => {
                    return Err(CompatError::definition(
                        model,
                        format!("unknown config option {other:?}"),
                    ))
                }
            }
        }

        Ok(resolved)
    }
}

fn flag(model: &str, key: &str, value: &Value) -> Result<bool> {
    value
        .as_bool()
        .ok_or_else(|| bad_option(model, key, "a boolean", value))
}

fn bad_option(model: &str, key: &str, expected: &str, value: &Value) -> CompatError {
    CompatError::definition(
        model,
        format!("config option {key:?} must be {expected}, got {value}"),
    )
}

/// Typed view of a validated [`ModelConfig`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct ResolvedConfig {
    pub title: Option<String>,
    pub extra: Extra,
    pub strict: bool,
    pub arbitrary_types_allowed: bool,
    pub str_strip_whitespace: bool,
    pub frozen: bool,
    pub validate_assignment: bool,
}

impl ResolvedConfig {
    /// Canonical mapping with every recognized option spelled out.
    pub fn to_config(&self) -> ModelConfig {
        let mut config = ModelConfig::new();
        if let Some(title) = &self.title {
            config = config.title(title.clone());
        }
        config
            .extra(self.extra)
            .strict(self.strict)
            .arbitrary_types_allowed(self.arbitrary_types_allowed)
            .str_strip_whitespace(self.str_strip_whitespace)
            .frozen(self.frozen)
            .validate_assignment(self.validate_assignment)
    }
}
