use std::fmt;

/// One segment of a field path inside a validated value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PathSegment {
    Key(String),
    Index(usize),
}

/// Location of a failure, from the model root down to the offending value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The model root. Model-level hook failures are reported here.
    pub fn root() -> Self {
        Self(Vec::new())
    }

    pub fn key(&self, key: impl Into<String>) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Key(key.into()));
        Self(segments)
    }

    pub fn index(&self, index: usize) -> Self {
        let mut segments = self.0.clone();
        segments.push(PathSegment::Index(index));
        Self(segments)
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return f.write_str("__root__");
        }
        for (i, segment) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(".")?;
            }
            match segment {
                PathSegment::Key(key) => f.write_str(key)?,
                PathSegment::Index(index) => write!(f, "{index}")?,
            }
        }
        Ok(())
    }
}

/// A single (field path, reason) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldFailure {
    pub path: FieldPath,
    pub reason: String,
}

impl FieldFailure {
    pub fn new(path: FieldPath, reason: impl Into<String>) -> Self {
        Self {
            path,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for FieldFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

/// Every field failure collected while validating one input against one model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}", render_failures(.model, .failures))]
pub struct ValidationError {
    model: String,
    failures: Vec<FieldFailure>,
}

impl ValidationError {
    pub fn new(model: impl Into<String>, failures: Vec<FieldFailure>) -> Self {
        Self {
            model: model.into(),
            failures,
        }
    }

    /// Name of the model (or adapted type) that rejected the input.
    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn failures(&self) -> &[FieldFailure] {
        &self.failures
    }

    /// Failures whose path renders exactly as `path` (e.g. `messages.0.role`).
    pub fn failures_at(&self, path: &str) -> Vec<&FieldFailure> {
        self.failures
            .iter()
            .filter(|failure| failure.path.to_string() == path)
            .collect()
    }
}

fn render_failures(model: &str, failures: &[FieldFailure]) -> String {
    let count = failures.len();
    let noun = if count == 1 { "error" } else { "errors" };
    let mut text = format!("{count} validation {noun} for {model}");
    for failure in failures {
        text.push_str(&format!("\n  {failure}"));
    }
    text
}

/// Call-site contract violations when instantiating a model.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstructionArgumentError {
    /// Models only accept keyword arguments.
    #[error("{model}() takes 0 positional arguments but {count} were given; use keyword arguments")]
    Positional { model: String, count: usize },

    /// Keywords that match no declared field on a model without extra-field permission.
    #[error("{model}() got unexpected keyword arguments: {}", names.join(", "))]
    UnknownKeyword { model: String, names: Vec<String> },
}

/// Errors surfaced by the compatibility layer.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompatError {
    /// No supported validation line was found, or a forced one is not linked.
    #[error("unsupported validation library version: {0}")]
    UnsupportedLibraryVersion(String),

    /// The generation override toggle holds a value that names no generation.
    #[error("invalid generation override {value:?} in {var}")]
    InvalidOverride { var: String, value: String },

    /// The model declaration is inconsistent.
    #[error("invalid model definition for {model}: {reason}")]
    Definition { model: String, reason: String },

    /// Input data did not satisfy the model.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The model was called with positional or unknown keyword arguments.
    #[error(transparent)]
    Construction(#[from] ConstructionArgumentError),

    /// Input text is not valid JSON.
    #[error("input is not valid JSON: {0}")]
    InvalidJson(String),

    /// Assignment to a field of a frozen model.
    #[error("{model} is frozen; field {field:?} cannot be reassigned")]
    FrozenInstance { model: String, field: String },
}

impl CompatError {
    pub(crate) fn definition(model: &str, reason: impl Into<String>) -> Self {
        Self::Definition {
            model: model.to_string(),
            reason: reason.into(),
        }
    }

    /// The validation failure carried by this error, if any.
    pub fn as_validation(&self) -> Option<&ValidationError> {
        match self {
            Self::Validation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CompatError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidJson(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CompatError>;
