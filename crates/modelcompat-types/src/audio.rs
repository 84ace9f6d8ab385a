use std::fmt;
use std::sync::Arc;

use modelcompat_core::{
    capability, CallArgs, Capability, ClassCache, FieldSpec, FieldType, ModelBuilder, ModelClass,
    Result, ValidatedModel,
};
use serde_json::{json, Map, Value};

use crate::{frozen_config, split_data_uri};

static CLASS: ClassCache = ClassCache::new();

/// The `Audio` model class: base64 `data` plus its `audio_format`.
///
/// A `data:audio/<format>;base64,<payload>` string is split into both fields.
pub fn audio_class(capability: Capability) -> Result<Arc<ModelClass>> {
    CLASS.get_or_build(capability, |cap| {
        ModelBuilder::new("Audio")
            .field(FieldSpec::new("data", FieldType::String).description("Base64-encoded audio"))
            .field(
                FieldSpec::new("audio_format", FieldType::String)
                    .description("Container format, e.g. wav or mp3"),
            )
            .config(frozen_config())
            .before_validator(|raw| match raw {
                Value::String(uri) => from_data_uri(&uri),
                other => Ok(other),
            })
            .after_validator(|model| match model.get_str("audio_format") {
                Some(format) if !format.is_empty() => Ok(()),
                _ => Err("audio_format must not be empty".to_string()),
            })
            .build_with(cap)
    })
}

fn from_data_uri(uri: &str) -> std::result::Result<Value, String> {
    let (media, payload) =
        split_data_uri(uri).ok_or_else(|| format!("expected a base64 audio data URI: {uri}"))?;
    let format = media
        .strip_prefix("audio/")
        .ok_or_else(|| format!("not an audio media type: {media}"))?;
    Ok(json!({ "data": payload, "audio_format": format }))
}

/// A validated inline audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Audio {
    model: ValidatedModel,
}

impl Audio {
    pub fn new(data: impl Into<String>, audio_format: impl Into<String>) -> Result<Self> {
        Self::new_with(capability::current()?, data, audio_format)
    }

    pub fn new_with(
        capability: Capability,
        data: impl Into<String>,
        audio_format: impl Into<String>,
    ) -> Result<Self> {
        let args = CallArgs::new()
            .kwarg("data", data.into())
            .kwarg("audio_format", audio_format.into());
        let model = audio_class(capability)?.construct(args)?;
        Ok(Self { model })
    }

    pub fn from_value(capability: Capability, raw: &Value) -> Result<Self> {
        let model = audio_class(capability)?.validate(raw)?;
        Ok(Self { model })
    }

    pub fn data(&self) -> &str {
        self.model.get_str("data").unwrap_or_default()
    }

    pub fn audio_format(&self) -> &str {
        self.model.get_str("audio_format").unwrap_or_default()
    }

    pub fn format(&self) -> Value {
        json!([{
            "type": "input_audio",
            "input_audio": { "data": self.data(), "format": self.audio_format() },
        }])
    }

    pub fn model(&self) -> &ValidatedModel {
        &self.model
    }

    pub fn dump(&self) -> Map<String, Value> {
        self.model.dump()
    }
}

impl fmt::Display for Audio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Audio(data=<AUDIO_BASE_64_ENCODED({})>, audio_format='{}')",
            self.data().len(),
            self.audio_format()
        )
    }
}
