use std::fmt;
use std::sync::Arc;

use modelcompat_core::{
    capability, CallArgs, Capability, ClassCache, FieldSpec, FieldType, ModelBuilder, ModelClass,
    Result, ValidatedModel,
};
use serde_json::{json, Map, Value};

use crate::{frozen_config, split_data_uri};

const ACCEPTED_PREFIXES: [&str; 5] = ["http://", "https://", "gs://", "s3://", "data:"];

static CLASS: ClassCache = ClassCache::new();

/// The `Image` model class: one required `url` field.
///
/// A bare string input is taken as the url.
pub fn image_class(capability: Capability) -> Result<Arc<ModelClass>> {
    CLASS.get_or_build(capability, |cap| {
        ModelBuilder::new("Image")
            .field(FieldSpec::new("url", FieldType::String).description("Image URL or data URI"))
            .config(frozen_config())
            .before_validator(|raw| match raw {
                Value::String(url) => Ok(json!({ "url": url })),
                other => Ok(other),
            })
            .after_validator(|model| check_url(model.get_str("url").unwrap_or_default()))
            .build_with(cap)
    })
}

fn check_url(url: &str) -> std::result::Result<(), String> {
    if url.is_empty() {
        return Err("url must not be empty".to_string());
    }
    if ACCEPTED_PREFIXES.iter().any(|prefix| url.starts_with(prefix)) {
        Ok(())
    } else {
        Err(format!("unsupported image url: {url}"))
    }
}

/// A validated image reference.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    model: ValidatedModel,
}

impl Image {
    pub fn new(url: impl Into<String>) -> Result<Self> {
        Self::new_with(capability::current()?, url)
    }

    pub fn new_with(capability: Capability, url: impl Into<String>) -> Result<Self> {
        let model = image_class(capability)?.construct(CallArgs::new().kwarg("url", url.into()))?;
        Ok(Self { model })
    }

    pub fn from_value(capability: Capability, raw: &Value) -> Result<Self> {
        let model = image_class(capability)?.validate(raw)?;
        Ok(Self { model })
    }

    pub fn url(&self) -> &str {
        self.model.get_str("url").unwrap_or_default()
    }

    /// Chat-content part referencing this image.
    pub fn format(&self) -> Value {
        json!([{ "type": "image_url", "image_url": { "url": self.url() } }])
    }

    pub fn model(&self) -> &ValidatedModel {
        &self.model
    }

    pub fn dump(&self) -> Map<String, Value> {
        self.model.dump()
    }
}

impl fmt::Display for Image {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match split_data_uri(self.url()) {
            Some((media, payload)) => write!(
                f,
                "Image(url=data:{media};base64,<IMAGE_BASE_64_ENCODED({})>)",
                payload.len()
            ),
            None => write!(f, "Image(url='{}')", self.url()),
        }
    }
}
