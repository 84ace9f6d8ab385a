//! Conversation history: an ordered, immutable list of role/content messages.

use std::sync::Arc;

use modelcompat_core::{
    capability, Capability, ClassCache, FieldSpec, FieldType, FieldValue, ModelBuilder,
    ModelClass, ModelConfig, Result, ValidatedModel,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::frozen_config;

static MESSAGE: ClassCache = ClassCache::new();
static HISTORY: ClassCache = ClassCache::new();

pub fn message_class(capability: Capability) -> Result<Arc<ModelClass>> {
    MESSAGE.get_or_build(capability, |cap| {
        ModelBuilder::new("Message")
            .field(FieldSpec::new("role", FieldType::String))
            .field(FieldSpec::new("content", FieldType::String))
            .config(ModelConfig::new().frozen(true))
            .build_with(cap)
    })
}

pub fn history_class(capability: Capability) -> Result<Arc<ModelClass>> {
    HISTORY.get_or_build(capability, |cap| {
        let message = message_class(cap)?;
        ModelBuilder::new("History")
            .field(
                FieldSpec::new("messages", FieldType::array(FieldType::model(&message)))
                    .description("Prior turns, oldest first"),
            )
            .config(frozen_config())
            .build_with(cap)
    })
}

/// One conversation turn.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new("user", content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new("assistant", content)
    }

    fn from_model(model: &ValidatedModel) -> Self {
        Self::new(
            model.get_str("role").unwrap_or_default(),
            model.get_str("content").unwrap_or_default(),
        )
    }
}

/// A validated history. Appending returns a new history.
#[derive(Debug, Clone, PartialEq)]
pub struct History {
    model: ValidatedModel,
}

impl History {
    pub fn new(messages: impl IntoIterator<Item = Message>) -> Result<Self> {
        Self::new_with(capability::current()?, messages)
    }

    pub fn new_with(
        capability: Capability,
        messages: impl IntoIterator<Item = Message>,
    ) -> Result<Self> {
        let messages: Vec<Message> = messages.into_iter().collect();
        let raw = json!({ "messages": serde_json::to_value(&messages)? });
        Self::from_value(capability, &raw)
    }

    pub fn from_value(capability: Capability, raw: &Value) -> Result<Self> {
        let model = history_class(capability)?.validate(raw)?;
        Ok(Self { model })
    }

    pub fn messages(&self) -> Vec<Message> {
        self.model
            .field("messages")
            .and_then(FieldValue::as_list)
            .unwrap_or_default()
            .iter()
            .filter_map(FieldValue::as_model)
            .map(Message::from_model)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.model
            .field("messages")
            .and_then(FieldValue::as_list)
            .map_or(0, <[FieldValue]>::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// A new history with `message` appended, validated by the same class.
    pub fn with_message(&self, message: Message) -> Result<Self> {
        let mut messages = self.messages();
        messages.push(message);
        let raw = json!({ "messages": serde_json::to_value(&messages)? });
        let model = self.model.class().validate(&raw)?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &ValidatedModel {
        &self.model
    }

    pub fn dump(&self) -> Map<String, Value> {
        self.model.dump()
    }
}

#[cfg(test)]
mod tests {
    use modelcompat_core::CompatError;

    use super::*;
    use crate::test_caps;

    #[test]
    fn messages_roundtrip_in_order() {
        for cap in test_caps() {
            let history = History::new_with(
                cap,
                [Message::user("hi"), Message::assistant("hello")],
            )
            .unwrap();
            assert_eq!(history.len(), 2);
            assert_eq!(history.messages()[1], Message::assistant("hello"));
            assert_eq!(
                Value::Object(history.dump()),
                json!({ "messages": [
                    { "role": "user", "content": "hi" },
                    { "role": "assistant", "content": "hello" },
                ]})
            );
        }
    }

    #[test]
    fn nested_failures_carry_element_paths() {
        for cap in test_caps() {
            let raw = json!({ "messages": [
                { "role": "user", "content": "hi" },
                { "content": 5 },
            ]});
            let err = History::from_value(cap, &raw).unwrap_err();
            let validation = err.as_validation().unwrap();
            assert_eq!(validation.failures_at("messages.1.role").len(), 1);
            assert_eq!(validation.failures_at("messages.1.content").len(), 1);
        }
    }

    #[test]
    fn with_message_leaves_original_untouched() {
        for cap in test_caps() {
            let history = History::new_with(cap, [Message::user("hi")]).unwrap();
            let longer = history.with_message(Message::assistant("yo")).unwrap();
            assert_eq!(history.len(), 1);
            assert_eq!(longer.len(), 2);
            assert_eq!(longer.model().class().generation(), cap.generation());
            assert!(Arc::ptr_eq(longer.model().class(), history.model().class()));
            assert_eq!(longer.messages()[1], Message::assistant("yo"));
        }
    }

    #[test]
    fn history_is_frozen_and_closed() {
        for cap in test_caps() {
            let mut model = History::new_with(cap, []).unwrap().model().clone();
            assert!(matches!(
                model.set("messages", json!([])),
                Err(CompatError::FrozenInstance { .. })
            ));
            assert!(History::from_value(cap, &json!({ "messages": [], "turns": 1 })).is_err());
        }
    }

    #[test]
    fn schema_references_message() {
        for cap in test_caps() {
            let class = history_class(cap).unwrap();
            class
                .validate(&json!({ "messages": [{ "role": "user", "content": "Hello" }] }))
                .unwrap();

            let schema = class.to_json_schema();
            assert_eq!(schema["properties"]["messages"]["type"], json!("array"));
            assert_eq!(schema["required"], json!(["messages"]));
            assert_eq!(
                schema["properties"]["messages"]["items"],
                json!({ "$ref": "#/$defs/Message" })
            );
            assert_eq!(schema["$defs"]["Message"]["required"], json!(["role", "content"]));
        }
    }
}
