//! Translation of generation-independent declarations into the artifacts each
//! generation expects.
//!
//! The legacy line declares fields as descriptor objects and configuration as
//! a nested config struct; the modern line keys field records by name and
//! keeps configuration as a class-level mapping. The facade only reads these
//! artifacts back through [`NativeModel`].

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::capability::Generation;
use crate::config::{Extra, ModelConfig, ResolvedConfig};
use crate::error::{CompatError, Result};
use crate::field::{FieldSpec, FieldType};
use crate::model::{AfterHook, BeforeHook, Hooks, ModelClass, SerializerHook};
use crate::native::{self, Checker};
use crate::schema;

/// Scalar kinds that the facade may coerce before native checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum LeafKind {
    String,
    Integer,
    Number,
    Boolean,
    Object,
    Literal,
}

/// Where a field type needs coercion, hooks or assembly into a
/// [`FieldValue`](crate::model::FieldValue).
#[derive(Debug)]
pub(crate) enum TypeNode {
    Any,
    Leaf(LeafKind),
    Array(Box<TypeNode>),
    Map(Box<TypeNode>),
    Optional(Box<TypeNode>),
    Model(Arc<ModelClass>),
}

pub(crate) fn compile_type(generation: Generation, ty: &FieldType, model: &str) -> Result<TypeNode> {
    let node = match ty {
        FieldType::Any => TypeNode::Any,
        FieldType::Optional(inner) => {
            TypeNode::Optional(Box::new(compile_type(generation, inner, model)?))
        }
        FieldType::Array(item) => TypeNode::Array(Box::new(compile_type(generation, item, model)?)),
        FieldType::Map(value) => TypeNode::Map(Box::new(compile_type(generation, value, model)?)),
        FieldType::Model(class) => {
            if class.generation() != generation {
                return Err(CompatError::definition(
                    model,
                    format!(
                        "nested model {} was finalized under {} but this model targets {generation}",
                        class.name(),
                        class.generation()
                    ),
                ));
            }
            TypeNode::Model(Arc::clone(class))
        }
        FieldType::String => TypeNode::Leaf(LeafKind::String),
        FieldType::Integer => TypeNode::Leaf(LeafKind::Integer),
        FieldType::Number => TypeNode::Leaf(LeafKind::Number),
        FieldType::Boolean => TypeNode::Leaf(LeafKind::Boolean),
        FieldType::Object => TypeNode::Leaf(LeafKind::Object),
        FieldType::Literal(_) => TypeNode::Leaf(LeafKind::Literal),
    };
    Ok(node)
}

/// Keyword the native line resolves nested model definitions under.
fn defs_key(generation: Generation) -> &'static str {
    match generation {
        Generation::Legacy => "definitions",
        Generation::Modern => "$defs",
    }
}

/// Compile the structural schema of a bare type against one native line.
pub(crate) fn compile_validator(
    generation: Generation,
    ty: &FieldType,
    model: &str,
) -> Result<Checker> {
    let schema = schema::type_validation_schema(ty, defs_key(generation));
    native::compile(generation, &schema).map_err(|reason| CompatError::definition(model, reason))
}

/// Validation behavior read back from a native declaration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Policy {
    pub extra: Extra,
    pub strict: bool,
    pub strip_whitespace: bool,
    pub frozen: bool,
    pub validate_assignment: bool,
}

/// One declared field as the facade sees it.
pub(crate) struct FieldSlot<'a> {
    pub name: &'a str,
    pub node: &'a TypeNode,
    /// The field type alone, for assignment checks.
    pub validator: &'a Checker,
    pub default: Option<&'a Value>,
    pub required: bool,
}

/// Generation-independent view of a field's metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldInfo {
    pub name: String,
    pub annotation: String,
    pub default: Option<Value>,
    pub required: bool,
    pub description: Option<String>,
    pub title: Option<String>,
    pub json_schema_extra: Map<String, Value>,
}

/// Nested configuration object of the legacy line.
#[derive(Debug, Clone)]
struct LegacyConfig {
    title: Option<String>,
    extra: Extra,
    arbitrary_types_allowed: bool,
    anystr_strip_whitespace: bool,
    allow_mutation: bool,
    validate_assignment: bool,
}

#[derive(Debug, Clone)]
struct LegacyFieldInfo {
    description: Option<String>,
    title: Option<String>,
    /// Free metadata, nested under a `json_schema_extra` key.
    extra: Map<String, Value>,
}

#[derive(Debug)]
struct LegacyField {
    name: String,
    outer_type: TypeNode,
    validator: Checker,
    annotation: String,
    default: Option<Value>,
    required: bool,
    field_info: LegacyFieldInfo,
}

struct LegacyDecl {
    fields: Vec<LegacyField>,
    config: LegacyConfig,
    pre_root_validators: Vec<BeforeHook>,
    post_root_validators: Vec<AfterHook>,
    // No native equivalent in this line; enforced by the facade.
    emulated_strict: bool,
    emulated_serializer: Option<SerializerHook>,
}

#[derive(Debug)]
struct ModernFieldInfo {
    annotation: TypeNode,
    validator: Checker,
    annotation_name: String,
    default: Option<Value>,
    required: bool,
    description: Option<String>,
    title: Option<String>,
    json_schema_extra: Map<String, Value>,
}

enum ModelValidator {
    Before(BeforeHook),
    After(AfterHook),
}

struct ModernDecl {
    model_fields: Vec<(String, ModernFieldInfo)>,
    model_config: Map<String, Value>,
    model_validators: Vec<ModelValidator>,
    model_serializer: Option<SerializerHook>,
}

enum Decl {
    Legacy(LegacyDecl),
    Modern(ModernDecl),
}

/// The generation-specific declaration of one finalized model.
pub(crate) struct NativeModel {
    /// Whole-model structural schema compiled by the native line.
    schema: Checker,
    decl: Decl,
}

impl std::fmt::Debug for NativeModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let generation = match self.decl {
            Decl::Legacy(_) => Generation::Legacy,
            Decl::Modern(_) => Generation::Modern,
        };
        f.debug_struct("NativeModel")
            .field("generation", &generation)
            .finish_non_exhaustive()
    }
}

/// Translate resolved declarations into the native artifact of `generation`.
pub(crate) fn translate(
    generation: Generation,
    model: &str,
    specs: &[FieldSpec],
    config: &ResolvedConfig,
    hooks: &Hooks,
) -> Result<NativeModel> {
    let decl = match generation {
        Generation::Legacy => {
            let mut fields = Vec::with_capacity(specs.len());
            for spec in specs {
                let mut extra = Map::new();
                if !spec.extra().is_empty() {
                    extra.insert(
                        "json_schema_extra".to_string(),
                        Value::Object(spec.extra().clone()),
                    );
                }
                fields.push(LegacyField {
                    name: spec.name().to_string(),
                    outer_type: compile_type(generation, spec.ty(), model)?,
                    validator: compile_validator(generation, spec.ty(), model)?,
                    annotation: spec.ty().to_string(),
                    default: spec.default_value().cloned(),
                    required: spec.is_required(),
                    field_info: LegacyFieldInfo {
                        description: spec.description_text().map(str::to_string),
                        title: spec.title_text().map(str::to_string),
                        extra,
                    },
                });
            }

            Decl::Legacy(LegacyDecl {
                fields,
                config: LegacyConfig {
                    title: config.title.clone(),
                    extra: config.extra,
                    arbitrary_types_allowed: config.arbitrary_types_allowed,
                    anystr_strip_whitespace: config.str_strip_whitespace,
                    allow_mutation: !config.frozen,
                    validate_assignment: config.validate_assignment,
                },
                pre_root_validators: hooks.before.clone(),
                post_root_validators: hooks.after.clone(),
                emulated_strict: config.strict,
                emulated_serializer: hooks.serializer.clone(),
            })
        }
        Generation::Modern => {
            let mut model_fields = Vec::with_capacity(specs.len());
            for spec in specs {
                model_fields.push((
                    spec.name().to_string(),
                    ModernFieldInfo {
                        annotation: compile_type(generation, spec.ty(), model)?,
                        validator: compile_validator(generation, spec.ty(), model)?,
                        annotation_name: spec.ty().to_string(),
                        default: spec.default_value().cloned(),
                        required: spec.is_required(),
                        description: spec.description_text().map(str::to_string),
                        title: spec.title_text().map(str::to_string),
                        json_schema_extra: spec.extra().clone(),
                    },
                ));
            }

            let mut model_validators: Vec<ModelValidator> = hooks
                .before
                .iter()
                .cloned()
                .map(ModelValidator::Before)
                .collect();
            model_validators.extend(hooks.after.iter().cloned().map(ModelValidator::After));

            Decl::Modern(ModernDecl {
                model_fields,
                model_config: config.to_config().options().clone(),
                model_validators,
                model_serializer: hooks.serializer.clone(),
            })
        }
    };

    let schema = schema::validation_schema(specs, config.extra, defs_key(generation));
    let schema = native::compile(generation, &schema)
        .map_err(|reason| CompatError::definition(model, reason))?;

    Ok(NativeModel { schema, decl })
}

impl NativeModel {
    pub(crate) fn schema(&self) -> &Checker {
        &self.schema
    }

    pub(crate) fn fields(&self) -> Vec<FieldSlot<'_>> {
        match &self.decl {
            Decl::Legacy(decl) => decl
                .fields
                .iter()
                .map(|field| FieldSlot {
                    name: &field.name,
                    node: &field.outer_type,
                    validator: &field.validator,
                    default: field.default.as_ref(),
                    required: field.required,
                })
                .collect(),
            Decl::Modern(decl) => decl
                .model_fields
                .iter()
                .map(|(name, info)| FieldSlot {
                    name,
                    node: &info.annotation,
                    validator: &info.validator,
                    default: info.default.as_ref(),
                    required: info.required,
                })
                .collect(),
        }
    }

    pub(crate) fn field(&self, name: &str) -> Option<FieldSlot<'_>> {
        self.fields().into_iter().find(|slot| slot.name == name)
    }

    pub(crate) fn policy(&self) -> Policy {
        match &self.decl {
            Decl::Legacy(decl) => Policy {
                extra: decl.config.extra,
                strict: decl.emulated_strict,
                strip_whitespace: decl.config.anystr_strip_whitespace,
                frozen: !decl.config.allow_mutation,
                validate_assignment: decl.config.validate_assignment,
            },
            Decl::Modern(decl) => {
                let flag = |key: &str| {
                    decl.model_config
                        .get(key)
                        .and_then(Value::as_bool)
                        .unwrap_or(false)
                };
                let extra = match decl.model_config.get("extra").and_then(Value::as_str) {
                    Some("allow") => Extra::Allow,
                    Some("forbid") => Extra::Forbid,
                    _ => Extra::Ignore,
                };
                Policy {
                    extra,
                    strict: flag("strict"),
                    strip_whitespace: flag("str_strip_whitespace"),
                    frozen: flag("frozen"),
                    validate_assignment: flag("validate_assignment"),
                }
            }
        }
    }

    pub(crate) fn before_hooks(&self) -> Vec<&BeforeHook> {
        match &self.decl {
            Decl::Legacy(decl) => decl.pre_root_validators.iter().collect(),
            Decl::Modern(decl) => decl
                .model_validators
                .iter()
                .filter_map(|validator| match validator {
                    ModelValidator::Before(hook) => Some(hook),
                    ModelValidator::After(_) => None,
                })
                .collect(),
        }
    }

    pub(crate) fn after_hooks(&self) -> Vec<&AfterHook> {
        match &self.decl {
            Decl::Legacy(decl) => decl.post_root_validators.iter().collect(),
            Decl::Modern(decl) => decl
                .model_validators
                .iter()
                .filter_map(|validator| match validator {
                    ModelValidator::After(hook) => Some(hook),
                    ModelValidator::Before(_) => None,
                })
                .collect(),
        }
    }

    pub(crate) fn serializer(&self) -> Option<&SerializerHook> {
        match &self.decl {
            Decl::Legacy(decl) => decl.emulated_serializer.as_ref(),
            Decl::Modern(decl) => decl.model_serializer.as_ref(),
        }
    }

    /// The configuration mapping, read back from the native artifact.
    pub(crate) fn config(&self) -> ModelConfig {
        match &self.decl {
            Decl::Legacy(decl) => ResolvedConfig {
                title: decl.config.title.clone(),
                extra: decl.config.extra,
                strict: decl.emulated_strict,
                arbitrary_types_allowed: decl.config.arbitrary_types_allowed,
                str_strip_whitespace: decl.config.anystr_strip_whitespace,
                frozen: !decl.config.allow_mutation,
                validate_assignment: decl.config.validate_assignment,
            }
            .to_config(),
            Decl::Modern(decl) => decl
                .model_config
                .iter()
                .fold(ModelConfig::new(), |config, (key, value)| {
                    config.set(key.clone(), value.clone())
                }),
        }
    }

    pub(crate) fn field_info(&self, name: &str) -> Option<FieldInfo> {
        match &self.decl {
            Decl::Legacy(decl) => decl.fields.iter().find(|f| f.name == name).map(|field| {
                let json_schema_extra = match field.field_info.extra.get("json_schema_extra") {
                    Some(Value::Object(nested)) => nested.clone(),
                    _ => Map::new(),
                };
                FieldInfo {
                    name: field.name.clone(),
                    annotation: field.annotation.clone(),
                    default: field.default.clone(),
                    required: field.required,
                    description: field.field_info.description.clone(),
                    title: field.field_info.title.clone(),
                    json_schema_extra,
                }
            }),
            Decl::Modern(decl) => decl
                .model_fields
                .iter()
                .find(|(field_name, _)| field_name == name)
                .map(|(field_name, info)| FieldInfo {
                    name: field_name.clone(),
                    annotation: info.annotation_name.clone(),
                    default: info.default.clone(),
                    required: info.required,
                    description: info.description.clone(),
                    title: info.title.clone(),
                    json_schema_extra: info.json_schema_extra.clone(),
                }),
        }
    }
}
