use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::capability::{self, Capability, Generation};
use crate::config::ModelConfig;
use crate::error::{CompatError, FieldFailure, FieldPath, Result, ValidationError};
use crate::facade;
use crate::field::FieldSpec;
use crate::normalize::{self, FieldInfo, NativeModel};

/// Runs on the raw input before field validation and may reshape it.
pub type BeforeHook = Arc<dyn Fn(Value) -> std::result::Result<Value, String> + Send + Sync>;
/// Runs on a fully validated instance; an error rejects the instance.
pub type AfterHook = Arc<dyn Fn(&ValidatedModel) -> std::result::Result<(), String> + Send + Sync>;
/// Replaces the default field-by-field dump.
pub type SerializerHook = Arc<dyn Fn(&ValidatedModel) -> Map<String, Value> + Send + Sync>;

/// Model-level hooks as declared, before translation.
#[derive(Clone, Default)]
pub(crate) struct Hooks {
    pub before: Vec<BeforeHook>,
    pub after: Vec<AfterHook>,
    pub serializer: Option<SerializerHook>,
}

/// Declares a model: fields, configuration and hooks, then finalizes it
/// against one generation in [`build_with`](Self::build_with).
pub struct ModelBuilder {
    name: String,
    parent: Option<Arc<ModelClass>>,
    fields: Vec<FieldSpec>,
    config: ModelConfig,
    hooks: Hooks,
}

impl ModelBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
            fields: Vec::new(),
            config: ModelConfig::new(),
            hooks: Hooks::default(),
        }
    }

    /// Inherit fields, configuration and hooks from `parent`.
    pub fn extends(mut self, parent: &Arc<ModelClass>) -> Self {
        self.parent = Some(Arc::clone(parent));
        self
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn config(mut self, config: ModelConfig) -> Self {
        self.config = self.config.merged(&config);
        self
    }

    pub fn before_validator<F>(mut self, hook: F) -> Self
    where
        F: Fn(Value) -> std::result::Result<Value, String> + Send + Sync + 'static,
    {
        self.hooks.before.push(Arc::new(hook));
        self
    }

    pub fn after_validator<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ValidatedModel) -> std::result::Result<(), String> + Send + Sync + 'static,
    {
        self.hooks.after.push(Arc::new(hook));
        self
    }

    pub fn serializer<F>(mut self, hook: F) -> Self
    where
        F: Fn(&ValidatedModel) -> Map<String, Value> + Send + Sync + 'static,
    {
        self.hooks.serializer = Some(Arc::new(hook));
        self
    }

    /// Finalize against the process-wide capability.
    pub fn build(self) -> Result<Arc<ModelClass>> {
        let capability = capability::current()?;
        self.build_with(capability)
    }

    /// Finalize against an explicit capability.
    ///
    /// Inherited fields keep their position; a redeclared field replaces the
    /// parent's in place and new fields are appended.
    pub fn build_with(self, capability: Capability) -> Result<Arc<ModelClass>> {
        let ModelBuilder {
            name,
            parent,
            fields,
            config,
            hooks,
        } = self;

        if name.trim().is_empty() {
            return Err(CompatError::definition("<unnamed>", "model name must not be empty"));
        }
        let generation = capability.generation();

        let (mut specs, parent_config, mut merged_hooks) = match &parent {
            Some(parent) => {
                if parent.generation != generation {
                    return Err(CompatError::definition(
                        &name,
                        format!(
                            "parent {} was finalized under {} but this model targets {generation}",
                            parent.name, parent.generation
                        ),
                    ));
                }
                (parent.specs.clone(), parent.declared.clone(), parent.hooks.clone())
            }
            None => (Vec::new(), ModelConfig::new(), Hooks::default()),
        };

        let mut own: Vec<String> = Vec::with_capacity(fields.len());
        for spec in fields {
            if spec.name().is_empty() {
                return Err(CompatError::definition(&name, "field name must not be empty"));
            }
            if own.iter().any(|seen| seen == spec.name()) {
                return Err(CompatError::definition(
                    &name,
                    format!("field {:?} declared twice", spec.name()),
                ));
            }
            own.push(spec.name().to_string());

            let spec = spec.resolved();
            match specs.iter().position(|existing| existing.name() == spec.name()) {
                Some(index) => specs[index] = spec,
                None => specs.push(spec),
            }
        }

        let declared = parent_config.merged(&config);
        let resolved = declared.resolve(&name)?;

        merged_hooks.before.extend(hooks.before);
        merged_hooks.after.extend(hooks.after);
        if hooks.serializer.is_some() {
            merged_hooks.serializer = hooks.serializer;
        }

        let native = normalize::translate(generation, &name, &specs, &resolved, &merged_hooks)?;
        debug!(
            model = %name,
            generation = %generation,
            fields = specs.len(),
            inherited = parent.is_some(),
            "model finalized"
        );

        Ok(Arc::new(ModelClass {
            name,
            generation,
            title: resolved.title,
            specs,
            declared,
            hooks: merged_hooks,
            native,
        }))
    }
}

/// A finalized model definition bound to one generation.
pub struct ModelClass {
    name: String,
    generation: Generation,
    title: Option<String>,
    specs: Vec<FieldSpec>,
    declared: ModelConfig,
    hooks: Hooks,
    native: NativeModel,
}

impl ModelClass {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Schema title: the configured title or the model name.
    pub fn title(&self) -> &str {
        self.title.as_deref().unwrap_or(&self.name)
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Declared fields in order, inherited fields included.
    pub fn fields(&self) -> &[FieldSpec] {
        &self.specs
    }

    pub fn field_names(&self) -> Vec<&str> {
        self.specs.iter().map(FieldSpec::name).collect()
    }

    /// Metadata of one field, read back from the native declaration.
    pub fn field_info(&self, name: &str) -> Option<FieldInfo> {
        self.native.field_info(name)
    }

    /// Effective configuration with every recognized option spelled out.
    pub fn config(&self) -> ModelConfig {
        self.native.config()
    }

    pub(crate) fn native(&self) -> &NativeModel {
        &self.native
    }

    /// Validate a raw mapping into an instance, reporting every failing field.
    pub fn validate(self: &Arc<Self>, raw: &Value) -> Result<ValidatedModel> {
        facade::validate_model(self, raw.clone()).map_err(CompatError::from)
    }

    /// Parse `text` as JSON, then [`validate`](Self::validate) it.
    pub fn validate_json(self: &Arc<Self>, text: &str) -> Result<ValidatedModel> {
        let raw: Value = serde_json::from_str(text)?;
        self.validate(&raw)
    }

    /// Keyword-only instantiation.
    pub fn construct(self: &Arc<Self>, args: CallArgs) -> Result<ValidatedModel> {
        facade::construct(self, args)
    }

    /// JSON Schema of the declared fields, identical under every generation.
    pub fn to_json_schema(&self) -> Value {
        crate::schema::model_schema(self)
    }
}

impl fmt::Debug for ModelClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass")
            .field("name", &self.name)
            .field("generation", &self.generation)
            .field("fields", &self.field_names())
            .finish()
    }
}

/// Arguments to [`ModelClass::construct`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArgs {
    pub(crate) positional: Vec<Value>,
    pub(crate) keywords: Map<String, Value>,
}

impl CallArgs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_keywords(keywords: Map<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            keywords,
        }
    }

    /// Add a positional argument. Models reject these.
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn kwarg(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.keywords.insert(name.into(), value.into());
        self
    }
}

/// A validated field value. Nested models stay typed until dumped.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Plain(Value),
    Model(ValidatedModel),
    List(Vec<FieldValue>),
    Dict(Vec<(String, FieldValue)>),
}

impl FieldValue {
    /// Plain JSON, recursively dumping nested models.
    pub fn to_value(&self) -> Value {
        match self {
            FieldValue::Plain(value) => value.clone(),
            FieldValue::Model(model) => Value::Object(model.dump()),
            FieldValue::List(items) => Value::Array(items.iter().map(FieldValue::to_value).collect()),
            FieldValue::Dict(entries) => Value::Object(
                entries
                    .iter()
                    .map(|(key, value)| (key.clone(), value.to_value()))
                    .collect(),
            ),
        }
    }

    pub fn as_model(&self) -> Option<&ValidatedModel> {
        match self {
            FieldValue::Model(model) => Some(model),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[FieldValue]> {
        match self {
            FieldValue::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Plain(Value::String(text)) => Some(text),
            _ => None,
        }
    }
}

/// Filters applied by [`ValidatedModel::dump_with`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DumpOptions {
    /// Drop keys whose value is null, at every nesting level.
    pub exclude_none: bool,
    /// Top-level keys to leave out.
    pub exclude: Vec<String>,
}

/// An instance that passed validation. Owns its field values.
#[derive(Clone)]
pub struct ValidatedModel {
    pub(crate) class: Arc<ModelClass>,
    pub(crate) values: Vec<(String, FieldValue)>,
    pub(crate) extras: Vec<(String, Value)>,
}

impl ValidatedModel {
    pub fn class(&self) -> &Arc<ModelClass> {
        &self.class
    }

    /// A declared field, or an extra key kept under `extra = "allow"`.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        if let Some((_, value)) = self.values.iter().find(|(key, _)| key == name) {
            return Some(value.clone());
        }
        self.extras
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| FieldValue::Plain(value.clone()))
    }

    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.values
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(FieldValue::as_str)
    }

    /// Extra keys kept under `extra = "allow"`, in input order.
    pub fn extras(&self) -> &[(String, Value)] {
        &self.extras
    }

    /// Field name to plain value, through the model serializer when one is set.
    pub fn dump(&self) -> Map<String, Value> {
        match self.class.native().serializer() {
            Some(serializer) => serializer(self),
            None => self.dump_fields(),
        }
    }

    /// Field-by-field dump that ignores any model serializer.
    pub fn dump_fields(&self) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, value) in &self.values {
            out.insert(name.clone(), value.to_value());
        }
        for (name, value) in &self.extras {
            out.insert(name.clone(), value.clone());
        }
        out
    }

    pub fn dump_with(&self, options: &DumpOptions) -> Map<String, Value> {
        let mut out = self.dump();
        for key in &options.exclude {
            out.remove(key);
        }
        if options.exclude_none {
            out = strip_nulls(out);
        }
        out
    }

    pub fn dump_json(&self) -> String {
        Value::Object(self.dump()).to_string()
    }

    /// Reassign one field, honoring `frozen` and `validate_assignment`.
    pub fn set(&mut self, name: &str, value: impl Into<Value>) -> Result<()> {
        let value = value.into();
        let policy = self.class.native().policy();
        if policy.frozen {
            return Err(CompatError::FrozenInstance {
                model: self.class.name.clone(),
                field: name.to_string(),
            });
        }

        let assigned = match self.class.native().field(name) {
            Some(slot) if policy.validate_assignment => {
                let path = FieldPath::root().key(name);
                let label = self.class.name.as_str();
                facade::validate_field(
                    label,
                    slot.node,
                    slot.validator,
                    value,
                    &path,
                    &policy,
                )?
            }
            Some(_) => FieldValue::Plain(value),
            None if policy.extra == crate::config::Extra::Allow => {
                match self.extras.iter_mut().find(|(key, _)| key == name) {
                    Some(entry) => entry.1 = value,
                    None => self.extras.push((name.to_string(), value)),
                }
                return Ok(());
            }
            None => {
                return Err(ValidationError::new(
                    self.class.name.clone(),
                    vec![FieldFailure::new(
                        FieldPath::root().key(name),
                        format!("object has no field {name:?}"),
                    )],
                )
                .into())
            }
        };

        if let Some(entry) = self.values.iter_mut().find(|(key, _)| key == name) {
            entry.1 = assigned;
        }
        Ok(())
    }
}

fn strip_nulls(map: Map<String, Value>) -> Map<String, Value> {
    map.into_iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (key, strip_nested_nulls(value)))
        .collect()
}

fn strip_nested_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(strip_nulls(map)),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nested_nulls).collect()),
        other => other,
    }
}

impl PartialEq for ValidatedModel {
    fn eq(&self, other: &Self) -> bool {
        self.class.name == other.class.name
            && self.class.generation == other.class.generation
            && self.values == other.values
            && self.extras == other.extras
    }
}

impl fmt::Debug for ValidatedModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.class.name, Value::Object(self.dump_fields()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use serde_json::json;

    use super::*;
    use crate::capability::linked_generations;
    use crate::config::Extra;
    use crate::error::ConstructionArgumentError;
    use crate::field::FieldType;

    fn caps() -> Vec<Capability> {
        linked_generations()
            .into_iter()
            .map(|generation| Capability::forced(generation).unwrap())
            .collect()
    }

    fn media(cap: Capability, extra: Extra) -> Arc<ModelClass> {
        ModelBuilder::new("Media")
            .field(FieldSpec::new("url", FieldType::String).description("media location"))
            .field(FieldSpec::new("width", FieldType::Integer).default(0))
            .config(ModelConfig::new().extra(extra))
            .build_with(cap)
            .unwrap()
    }

    fn history(cap: Capability) -> Arc<ModelClass> {
        let message = ModelBuilder::new("Message")
            .field(FieldSpec::new("role", FieldType::String))
            .field(FieldSpec::new("content", FieldType::String))
            .build_with(cap)
            .unwrap();
        ModelBuilder::new("History")
            .field(FieldSpec::new(
                "messages",
                FieldType::array(FieldType::model(&message)),
            ))
            .build_with(cap)
            .unwrap()
    }

    fn validation_error(err: CompatError) -> ValidationError {
        match err {
            CompatError::Validation(err) => err,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    fn paths(err: &ValidationError) -> Vec<String> {
        err.failures().iter().map(|f| f.path.to_string()).collect()
    }

    #[test]
    fn media_url_roundtrip() {
        for cap in caps() {
            let class = media(cap, Extra::Ignore);
            let model = class.validate(&json!({ "url": "https://x/y.png" })).unwrap();
            assert_eq!(
                Value::Object(model.dump()),
                json!({ "url": "https://x/y.png", "width": 0 })
            );
        }
    }

    #[test]
    fn missing_required_field_reports_exactly_one_failure() {
        for cap in caps() {
            let err = validation_error(media(cap, Extra::Ignore).validate(&json!({})).unwrap_err());
            assert_eq!(paths(&err), vec!["url".to_string()]);
        }
    }

    #[test]
    fn every_offending_field_is_reported() {
        for cap in caps() {
            let err = validation_error(
                media(cap, Extra::Forbid)
                    .validate(&json!({ "width": "wide", "bogus": 1 }))
                    .unwrap_err(),
            );
            let paths = paths(&err);
            assert!(paths.contains(&"url".to_string()));
            assert!(paths.contains(&"width".to_string()));
            assert!(paths.contains(&"bogus".to_string()));
        }
    }

    #[test]
    fn non_object_input_is_rejected() {
        for cap in caps() {
            let err = validation_error(media(cap, Extra::Ignore).validate(&json!([1])).unwrap_err());
            assert_eq!(paths(&err), vec!["__root__".to_string()]);
        }
    }

    #[test]
    fn extra_policy_is_uniform() {
        for cap in caps() {
            let raw = json!({ "url": "u", "tag": "x" });

            assert!(media(cap, Extra::Forbid).validate(&raw).is_err());

            let ignored = media(cap, Extra::Ignore).validate(&raw).unwrap();
            assert!(!ignored.dump().contains_key("tag"));

            let allowed = media(cap, Extra::Allow).validate(&raw).unwrap();
            let dumped = allowed.dump();
            assert_eq!(dumped.get("tag"), Some(&json!("x")));
            let keys: Vec<&str> = dumped.keys().map(String::as_str).collect();
            assert_eq!(keys, vec!["url", "width", "tag"]);
        }
    }

    #[test]
    fn dump_of_validate_is_idempotent() {
        for cap in caps() {
            let class = media(cap, Extra::Allow);
            let once = class
                .validate(&json!({ "width": "12", "url": "a", "note": null }))
                .unwrap()
                .dump();
            let twice = class.validate(&Value::Object(once.clone())).unwrap().dump();
            assert_eq!(once, twice);
            assert_eq!(once.get("width"), Some(&json!(12)));
        }
    }

    #[test]
    fn nested_failures_carry_full_paths() {
        for cap in caps() {
            let class = history(cap);
            let ok = class
                .validate(&json!({ "messages": [{ "role": "user", "content": "Hello" }] }))
                .unwrap();
            assert_eq!(
                Value::Object(ok.dump()),
                json!({ "messages": [{ "role": "user", "content": "Hello" }] })
            );

            let err = validation_error(
                class
                    .validate(&json!({ "messages": [{ "role": "user" }, { "role": 3, "content": "x" }] }))
                    .unwrap_err(),
            );
            let mut paths = paths(&err);
            paths.sort();
            assert_eq!(
                paths,
                vec!["messages.0.content".to_string(), "messages.1.role".to_string()]
            );
        }
    }

    #[test]
    fn schema_is_identical_across_generations() {
        let schemas: Vec<String> = caps()
            .into_iter()
            .map(|cap| history(cap).to_json_schema().to_string())
            .collect();
        for schema in &schemas {
            assert_eq!(schema, &schemas[0]);
        }
    }

    #[test]
    fn history_schema_lists_messages_as_required_array() {
        for cap in caps() {
            let schema = history(cap).to_json_schema();
            assert_eq!(schema["type"], json!("object"));
            assert_eq!(schema["required"], json!(["messages"]));
            assert_eq!(schema["properties"]["messages"]["type"], json!("array"));
            assert_eq!(
                schema["properties"]["messages"]["items"],
                json!({ "$ref": "#/$defs/Message" })
            );
            assert_eq!(schema["$defs"]["Message"]["required"], json!(["role", "content"]));
        }
    }

    #[test]
    fn schema_property_order_follows_declaration() {
        for cap in caps() {
            let schema = media(cap, Extra::Forbid).to_json_schema();
            let keys: Vec<&str> = schema["properties"]
                .as_object()
                .unwrap()
                .keys()
                .map(String::as_str)
                .collect();
            assert_eq!(keys, vec!["url", "width"]);
            assert_eq!(schema["additionalProperties"], json!(false));
            assert_eq!(schema["properties"]["width"]["default"], json!(0));
            assert_eq!(schema["properties"]["url"]["title"], json!("Url"));
        }
    }

    #[test]
    fn positional_construction_is_rejected() {
        for cap in caps() {
            let err = media(cap, Extra::Allow)
                .construct(CallArgs::new().arg("https://x/y.png"))
                .unwrap_err();
            assert!(matches!(
                err,
                CompatError::Construction(ConstructionArgumentError::Positional { count: 1, .. })
            ));
        }
    }

    #[test]
    fn unknown_keywords_need_extra_permission() {
        for cap in caps() {
            let args = CallArgs::new().kwarg("url", "u").kwarg("colour", "red");
            assert!(matches!(
                media(cap, Extra::Ignore).construct(args.clone()),
                Err(CompatError::Construction(ConstructionArgumentError::UnknownKeyword { .. }))
            ));
            let model = media(cap, Extra::Allow).construct(args).unwrap();
            assert_eq!(model.dump().get("colour"), Some(&json!("red")));
        }
    }

    #[test]
    fn keyword_construction_still_validates() {
        for cap in caps() {
            let err = media(cap, Extra::Ignore)
                .construct(CallArgs::new().kwarg("width", 3))
                .unwrap_err();
            assert!(matches!(err, CompatError::Validation(_)));
        }
    }

    #[test]
    fn child_fields_override_parent_in_place() {
        for cap in caps() {
            let parent = media(cap, Extra::Forbid);
            let child = ModelBuilder::new("Thumbnail")
                .extends(&parent)
                .field(FieldSpec::new("caption", FieldType::String).default(""))
                .field(FieldSpec::new("width", FieldType::Integer).default(128))
                .build_with(cap)
                .unwrap();

            assert_eq!(child.field_names(), vec!["url", "width", "caption"]);
            let model = child.validate(&json!({ "url": "u" })).unwrap();
            assert_eq!(model.dump().get("width"), Some(&json!(128)));
            assert_eq!(child.config().get("extra"), Some(&json!("forbid")));
        }
    }

    #[test]
    fn duplicate_field_is_a_definition_error() {
        for cap in caps() {
            let err = ModelBuilder::new("Dup")
                .field(FieldSpec::new("a", FieldType::String))
                .field(FieldSpec::new("a", FieldType::Integer))
                .build_with(cap)
                .unwrap_err();
            assert!(matches!(err, CompatError::Definition { .. }));
        }
    }

    #[cfg(all(feature = "legacy", feature = "modern"))]
    #[test]
    fn mixing_generations_is_a_definition_error() {
        let legacy = Capability::forced(Generation::Legacy).unwrap();
        let modern = Capability::forced(Generation::Modern).unwrap();
        let parent = media(legacy, Extra::Ignore);

        assert!(ModelBuilder::new("Child").extends(&parent).build_with(modern).is_err());
        assert!(ModelBuilder::new("Holder")
            .field(FieldSpec::new("media", FieldType::model(&parent)))
            .build_with(modern)
            .is_err());
    }

    #[test]
    fn strict_mode_is_honored_under_every_generation() {
        for cap in caps() {
            let class = ModelBuilder::new("Counter")
                .field(FieldSpec::new("n", FieldType::Integer))
                .config(ModelConfig::new().strict(true))
                .build_with(cap)
                .unwrap();
            assert!(class.validate(&json!({ "n": "1" })).is_err());
            assert!(class.validate(&json!({ "n": 1 })).is_ok());
        }
    }

    #[test]
    fn hooks_run_in_order_and_report_at_root() {
        for cap in caps() {
            let calls = Arc::new(AtomicUsize::new(0));
            let seen = Arc::clone(&calls);
            let class = ModelBuilder::new("Pair")
                .field(FieldSpec::new("low", FieldType::Integer))
                .field(FieldSpec::new("high", FieldType::Integer))
                .before_validator(|raw| match raw {
                    Value::Array(items) if items.len() == 2 => {
                        Ok(json!({ "low": items[0], "high": items[1] }))
                    }
                    other => Ok(other),
                })
                .after_validator(move |model| {
                    seen.fetch_add(1, Ordering::SeqCst);
                    let low = model.get("low").map(|v| v.to_value());
                    let high = model.get("high").map(|v| v.to_value());
                    match (low.and_then(|v| v.as_i64()), high.and_then(|v| v.as_i64())) {
                        (Some(low), Some(high)) if low <= high => Ok(()),
                        _ => Err("low must not exceed high".to_string()),
                    }
                })
                .build_with(cap)
                .unwrap();

            assert!(class.validate(&json!([1, 2])).is_ok());
            let err = validation_error(class.validate(&json!({ "low": 5, "high": 2 })).unwrap_err());
            assert_eq!(paths(&err), vec!["__root__".to_string()]);
            assert_eq!(calls.load(Ordering::SeqCst), 2);
        }
    }

    #[test]
    fn serializer_applies_under_every_generation() {
        for cap in caps() {
            let class = ModelBuilder::new("Secret")
                .field(FieldSpec::new("token", FieldType::String))
                .serializer(|model| {
                    let mut out = model.dump_fields();
                    out.insert("token".to_string(), json!("***"));
                    out
                })
                .build_with(cap)
                .unwrap();
            let model = class.validate(&json!({ "token": "abc" })).unwrap();
            assert_eq!(model.dump().get("token"), Some(&json!("***")));
            assert_eq!(model.get_str("token"), Some("abc"));
        }
    }

    #[test]
    fn frozen_and_assignment_rules() {
        for cap in caps() {
            let frozen = ModelBuilder::new("Frozen")
                .field(FieldSpec::new("x", FieldType::Integer))
                .config(ModelConfig::new().frozen(true))
                .build_with(cap)
                .unwrap();
            let mut model = frozen.validate(&json!({ "x": 1 })).unwrap();
            assert!(matches!(
                model.set("x", 2),
                Err(CompatError::FrozenInstance { .. })
            ));

            let checked = ModelBuilder::new("Checked")
                .field(FieldSpec::new("x", FieldType::Integer))
                .config(ModelConfig::new().validate_assignment(true))
                .build_with(cap)
                .unwrap();
            let mut model = checked.validate(&json!({ "x": 1 })).unwrap();
            assert!(model.set("x", "nope").is_err());
            model.set("x", "7").unwrap();
            assert_eq!(model.dump().get("x"), Some(&json!(7)));
        }
    }

    #[test]
    fn dump_options_filter_output() {
        for cap in caps() {
            let class = ModelBuilder::new("Sparse")
                .field(FieldSpec::new("a", FieldType::String).not_required())
                .field(FieldSpec::new("b", FieldType::Object).default(json!({ "c": null, "d": 1 })))
                .build_with(cap)
                .unwrap();
            let model = class.validate(&json!({})).unwrap();
            let dumped = model.dump_with(&DumpOptions {
                exclude_none: true,
                exclude: Vec::new(),
            });
            assert_eq!(Value::Object(dumped), json!({ "b": { "d": 1 } }));

            let dumped = model.dump_with(&DumpOptions {
                exclude_none: false,
                exclude: vec!["b".to_string()],
            });
            assert_eq!(Value::Object(dumped), json!({ "a": null }));
        }
    }

    #[test]
    fn equal_values_dump_equal_and_compare_equal() {
        for cap in caps() {
            let class = media(cap, Extra::Ignore);
            let a = class.validate(&json!({ "url": "u", "width": 2 })).unwrap();
            let b = class.validate(&json!({ "width": "2", "url": "u" })).unwrap();
            assert_eq!(a, b);
            assert_eq!(a.dump(), b.dump());
        }
    }

    #[test]
    fn field_info_and_config_read_back() {
        for cap in caps() {
            let class = ModelBuilder::new("Tagged")
                .field(
                    FieldSpec::new("question", FieldType::String)
                        .description("what to ask")
                        .json_schema_extra("__field_kind", "input"),
                )
                .config(ModelConfig::new().title("Tagged Input"))
                .build_with(cap)
                .unwrap();
            let info = class.field_info("question").unwrap();
            assert_eq!(info.annotation, "string");
            assert_eq!(info.description.as_deref(), Some("what to ask"));
            assert_eq!(info.json_schema_extra.get("__field_kind"), Some(&json!("input")));
            assert!(class.field_info("missing").is_none());
            assert_eq!(class.config().get("title"), Some(&json!("Tagged Input")));
            assert_eq!(class.to_json_schema()["title"], json!("Tagged Input"));
            assert_eq!(
                class.to_json_schema()["properties"]["question"]["__field_kind"],
                json!("input")
            );
        }
    }

    #[test]
    fn validate_json_reports_parse_errors() {
        for cap in caps() {
            assert!(matches!(
                media(cap, Extra::Ignore).validate_json("{not json"),
                Err(CompatError::InvalidJson(_))
            ));
        }
    }

    #[test]
    fn concurrent_validation_shares_one_class() {
        for cap in caps() {
            let class = history(cap);
            let handles: Vec<_> = (0..4)
                .map(|i| {
                    let class = Arc::clone(&class);
                    std::thread::spawn(move || {
                        class
                            .validate(&json!({ "messages": [{ "role": "user", "content": i.to_string() }] }))
                            .map(|model| model.dump_json())
                    })
                })
                .collect();
            for handle in handles {
                assert!(handle.join().unwrap().is_ok());
            }
        }
    }
}
