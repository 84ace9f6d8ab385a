//! Uniform validation over the native declarations.
//!
//! Each input goes through three passes. Preparation runs before hooks and
//! applies whitespace stripping and lax coercion; the native line then checks
//! the prepared instance against the compiled model schema; assembly fills
//! defaults, applies the extra-key policy and runs after hooks, nested models
//! first. Native reason text is passed through unchanged.

use std::sync::Arc;

use serde_json::{Number, Value};
use tracing::trace;

use crate::config::Extra;
use crate::error::{
    CompatError, ConstructionArgumentError, FieldFailure, FieldPath, Result, ValidationError,
};
use crate::model::{CallArgs, FieldValue, ModelClass, ValidatedModel};
use crate::native::Checker;
use crate::normalize::{LeafKind, Policy, TypeNode};

pub(crate) fn validate_model(
    class: &Arc<ModelClass>,
    raw: Value,
) -> std::result::Result<ValidatedModel, ValidationError> {
    let root = FieldPath::root();
    let mut failures = Vec::new();
    let validated = prepare_model(class, raw, &root, &mut failures)
        .filter(|input| check(class.native().schema(), input, &root, &mut failures))
        .and_then(|input| assemble_model(class, input, &root, &mut failures));
    finish(class.name(), validated, failures)
}

/// Validate a value of one field type, with failures rooted at `path`.
pub(crate) fn validate_field(
    label: &str,
    node: &TypeNode,
    checker: &Checker,
    value: Value,
    path: &FieldPath,
    policy: &Policy,
) -> std::result::Result<FieldValue, ValidationError> {
    let mut failures = Vec::new();
    let validated = prepare_value(node, value, path, policy, &mut failures)
        .filter(|input| check(checker, input, path, &mut failures))
        .and_then(|input| assemble_value(node, input, path, &mut failures));
    finish(label, validated, failures)
}

pub(crate) fn construct(class: &Arc<ModelClass>, args: CallArgs) -> Result<ValidatedModel> {
    let CallArgs {
        positional,
        keywords,
    } = args;

    if !positional.is_empty() {
        return Err(ConstructionArgumentError::Positional {
            model: class.name().to_string(),
            count: positional.len(),
        }
        .into());
    }

    if class.native().policy().extra != Extra::Allow {
        let declared = class.field_names();
        let unknown: Vec<String> = keywords
            .keys()
            .filter(|key| !declared.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unknown.is_empty() {
            return Err(ConstructionArgumentError::UnknownKeyword {
                model: class.name().to_string(),
                names: unknown,
            }
            .into());
        }
    }

    validate_model(class, Value::Object(keywords)).map_err(CompatError::from)
}

fn finish<T>(
    label: &str,
    validated: Option<T>,
    failures: Vec<FieldFailure>,
) -> std::result::Result<T, ValidationError> {
    match validated {
        Some(value) if failures.is_empty() => Ok(value),
        _ => {
            trace!(model = %label, failures = failures.len(), "validation failed");
            Err(ValidationError::new(label, failures))
        }
    }
}

fn prepare_model(
    class: &Arc<ModelClass>,
    raw: Value,
    path: &FieldPath,
    failures: &mut Vec<FieldFailure>,
) -> Option<Value> {
    let native = class.native();

    let mut input = raw;
    for hook in native.before_hooks() {
        match hook(input) {
            Ok(reshaped) => input = reshaped,
            Err(reason) => {
                failures.push(FieldFailure::new(path.clone(), reason));
                return None;
            }
        }
    }

    // Non-objects are left for the native type check.
    let Value::Object(mut map) = input else {
        return Some(input);
    };

    let policy = native.policy();
    let mut ok = true;
    for slot in native.fields() {
        if let Some(value) = map.get_mut(slot.name) {
            match prepare_value(slot.node, value.take(), &path.key(slot.name), &policy, failures) {
                Some(prepared) => *value = prepared,
                None => ok = false,
            }
        }
    }
    ok.then_some(Value::Object(map))
}

fn prepare_value(
    node: &TypeNode,
    value: Value,
    path: &FieldPath,
    policy: &Policy,
    failures: &mut Vec<FieldFailure>,
) -> Option<Value> {
    match (node, value) {
        (TypeNode::Leaf(kind), value) => Some(coerce(*kind, value, policy)),
        (TypeNode::Optional(_), Value::Null) => Some(Value::Null),
        (TypeNode::Optional(inner), value) => prepare_value(inner, value, path, policy, failures),
        (TypeNode::Array(item), Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            let mut ok = true;
            for (index, element) in items.into_iter().enumerate() {
                match prepare_value(item, element, &path.index(index), policy, failures) {
                    Some(prepared) => out.push(prepared),
                    None => ok = false,
                }
            }
            ok.then_some(Value::Array(out))
        }
        (TypeNode::Map(inner), Value::Object(entries)) => {
            let mut out = serde_json::Map::new();
            let mut ok = true;
            for (key, element) in entries {
                let element_path = path.key(key.clone());
                match prepare_value(inner, element, &element_path, policy, failures) {
                    Some(prepared) => {
                        out.insert(key, prepared);
                    }
                    None => ok = false,
                }
            }
            ok.then_some(Value::Object(out))
        }
        (TypeNode::Model(class), value) => prepare_model(class, value, path, failures),
        (_, value) => Some(value),
    }
}

/// Run the native check and map each error to a field failure.
fn check(
    checker: &Checker,
    instance: &Value,
    path: &FieldPath,
    failures: &mut Vec<FieldFailure>,
) -> bool {
    let errors = checker.errors(instance);
    if errors.is_empty() {
        return true;
    }

    for error in errors {
        let at = locate(instance, path, &error.instance_path);
        if error.properties.is_empty() {
            failures.push(FieldFailure::new(at, error.reason));
            continue;
        }
        for property in error.properties {
            failures.push(FieldFailure::new(at.key(property), error.reason.clone()));
        }
    }
    false
}

/// Rebuild a native instance path under `base`, telling array indexes from
/// object keys by walking the instance.
fn locate(instance: &Value, base: &FieldPath, segments: &[String]) -> FieldPath {
    let mut path = base.clone();
    let mut current = Some(instance);
    for segment in segments {
        match (current, segment.parse::<usize>()) {
            (Some(Value::Array(items)), Ok(index)) => {
                path = path.index(index);
                current = items.get(index);
            }
            (node, _) => {
                path = path.key(segment.clone());
                current = node.and_then(|node| node.get(segment.as_str()));
            }
        }
    }
    path
}

fn assemble_model(
    class: &Arc<ModelClass>,
    input: Value,
    path: &FieldPath,
    failures: &mut Vec<FieldFailure>,
) -> Option<ValidatedModel> {
    let native = class.native();
    let Value::Object(map) = input else {
        failures.push(FieldFailure::new(path.clone(), "input should be an object"));
        return None;
    };

    let mut present: Vec<(String, Value)> = map.into_iter().collect();
    let slots = native.fields();
    let mut values = Vec::with_capacity(slots.len());
    let mut ok = true;

    for slot in &slots {
        let found = present.iter().position(|(key, _)| key == slot.name);
        match found.map(|index| present.remove(index).1) {
            Some(value) => match assemble_value(slot.node, value, &path.key(slot.name), failures) {
                Some(assembled) => values.push((slot.name.to_string(), assembled)),
                None => ok = false,
            },
            None => {
                if let Some(default) = slot.default {
                    values.push((slot.name.to_string(), FieldValue::Plain(default.clone())));
                }
            }
        }
    }
    if !ok {
        return None;
    }

    // Forbidden keys were rejected by the native check.
    let extras = match native.policy().extra {
        Extra::Allow => present,
        Extra::Ignore | Extra::Forbid => Vec::new(),
    };

    let model = ValidatedModel {
        class: Arc::clone(class),
        values,
        extras,
    };

    for hook in native.after_hooks() {
        if let Err(reason) = hook(&model) {
            failures.push(FieldFailure::new(path.clone(), reason));
            return None;
        }
    }

    Some(model)
}

fn assemble_value(
    node: &TypeNode,
    value: Value,
    path: &FieldPath,
    failures: &mut Vec<FieldFailure>,
) -> Option<FieldValue> {
    match (node, value) {
        (TypeNode::Optional(_), Value::Null) => Some(FieldValue::Plain(Value::Null)),
        (TypeNode::Optional(inner), value) => assemble_value(inner, value, path, failures),
        (TypeNode::Array(item), Value::Array(items)) => {
            let mut out = Vec::with_capacity(items.len());
            let mut ok = true;
            for (index, element) in items.into_iter().enumerate() {
                match assemble_value(item, element, &path.index(index), failures) {
                    Some(assembled) => out.push(assembled),
                    None => ok = false,
                }
            }
            ok.then_some(FieldValue::List(out))
        }
        (TypeNode::Map(inner), Value::Object(entries)) => {
            let mut out = Vec::with_capacity(entries.len());
            let mut ok = true;
            for (key, element) in entries {
                let element_path = path.key(key.clone());
                match assemble_value(inner, element, &element_path, failures) {
                    Some(assembled) => out.push((key, assembled)),
                    None => ok = false,
                }
            }
            ok.then_some(FieldValue::Dict(out))
        }
        (TypeNode::Model(class), value) => {
            assemble_model(class, value, path, failures).map(FieldValue::Model)
        }
        (_, value) => Some(FieldValue::Plain(value)),
    }
}

/// Whitespace stripping and lax-mode coercion, applied identically under
/// every generation. Strict mode leaves values untouched apart from stripping.
fn coerce(kind: LeafKind, value: Value, policy: &Policy) -> Value {
    let value = match value {
        Value::String(text) if policy.strip_whitespace => Value::String(text.trim().to_string()),
        other => other,
    };
    if policy.strict {
        return value;
    }

    match (kind, value) {
        (LeafKind::Integer, Value::String(text)) => match text.trim().parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::String(text),
        },
        (LeafKind::Integer, Value::Number(n)) => match n.as_f64() {
            Some(f) if n.is_f64() && f.fract() == 0.0 && f.abs() < 9.0e15 => Value::from(f as i64),
            _ => Value::Number(n),
        },
        (LeafKind::Number, Value::String(text)) => {
            let trimmed = text.trim();
            if let Ok(n) = trimmed.parse::<i64>() {
                Value::from(n)
            } else {
                match trimmed.parse::<f64>().ok().and_then(Number::from_f64) {
                    Some(n) => Value::Number(n),
                    None => Value::String(text),
                }
            }
        }
        (LeafKind::Boolean, Value::String(text)) => {
            match text.trim().to_ascii_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Value::Bool(true),
                "false" | "no" | "off" | "0" => Value::Bool(false),
                _ => Value::String(text),
            }
        }
        (LeafKind::Boolean, Value::Number(n)) => match n.as_i64() {
            Some(0) => Value::Bool(false),
            Some(1) => Value::Bool(true),
            _ => Value::Number(n),
        },
        (_, other) => other,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn lax() -> Policy {
        Policy::default()
    }

    fn strict() -> Policy {
        Policy {
            strict: true,
            ..Policy::default()
        }
    }

    #[test]
    fn lax_mode_coerces_scalars() {
        assert_eq!(coerce(LeafKind::Integer, json!("42"), &lax()), json!(42));
        assert_eq!(coerce(LeafKind::Integer, json!(3.0), &lax()), json!(3));
        assert_eq!(coerce(LeafKind::Number, json!("2.5"), &lax()), json!(2.5));
        assert_eq!(coerce(LeafKind::Boolean, json!("yes"), &lax()), json!(true));
        assert_eq!(coerce(LeafKind::Boolean, json!(0), &lax()), json!(false));
    }

    #[test]
    fn numbers_never_become_strings() {
        assert_eq!(coerce(LeafKind::String, json!(7), &lax()), json!(7));
    }

    #[test]
    fn strict_mode_leaves_values_alone() {
        assert_eq!(coerce(LeafKind::Integer, json!("42"), &strict()), json!("42"));
        assert_eq!(coerce(LeafKind::Boolean, json!(1), &strict()), json!(1));
    }

    #[test]
    fn native_paths_map_to_field_paths() {
        let instance = json!({ "rows": [{ "0": 1 }], "tags": { "7": "x" } });
        let base = FieldPath::root().key("outer");
        let row = locate(&instance, &base, &["rows".into(), "0".into(), "0".into()]);
        assert_eq!(row.to_string(), "outer.rows.0.0");
        assert_eq!(
            row,
            FieldPath::root().key("outer").key("rows").index(0).key("0")
        );
        let tag = locate(&instance, &base, &["tags".into(), "7".into()]);
        assert_eq!(tag, FieldPath::root().key("outer").key("tags").key("7"));
    }

    #[test]
    fn strip_whitespace_applies_in_both_modes() {
        let policy = Policy {
            strip_whitespace: true,
            strict: true,
            ..Policy::default()
        };
        assert_eq!(coerce(LeafKind::String, json!("  hi "), &policy), json!("hi"));
    }
}
