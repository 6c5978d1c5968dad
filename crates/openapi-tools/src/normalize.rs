//! Schema normalizer.
//!
//! Repairs documents that are structurally fine but that a 3.0 loader would reject. The
//! document is handled as a plain `serde_json::Value` tree so unknown or vendor keys survive
//! untouched.

use crate::error::{OpenApiToolsError, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Vendor fields some generators leave on schemas.
const DENY_LISTED_FIELDS: [&str; 2] = ["error_messages", "hide_error_details"];

/// Normalize raw document bytes.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::MalformedInput`] if `raw` is not valid JSON.
pub fn normalize(raw: &[u8]) -> Result<Vec<u8>> {
    let mut tree: Value = serde_json::from_slice(raw)
        .map_err(|source| OpenApiToolsError::MalformedInput { source })?;
    normalize_tree(&mut tree);
    serde_json::to_vec(&tree).map_err(|source| OpenApiToolsError::MalformedInput { source })
}

/// Apply every fixup to an already-decoded document tree, in place.
pub fn normalize_tree(tree: &mut Value) {
    let Some(root) = tree.as_object_mut() else {
        return;
    };

    if let Some(Value::String(version)) = root.get_mut("openapi")
        && version.starts_with("3.1")
    {
        info!(from = %version, "downgrading OpenAPI 3.1 document marker to 3.0.0");
        *version = "3.0.0".to_string();
    }

    if let Some(schemas) = root
        .get_mut("components")
        .and_then(|c| c.get_mut("schemas"))
        .and_then(Value::as_object_mut)
    {
        for (name, schema) in schemas.iter_mut() {
            let Some(schema) = schema.as_object_mut() else {
                continue;
            };
            fix_null_unions(schema, name);
            strip_deny_listed(schema, name);
        }
    }

    if let Some(paths) = root.get_mut("paths").and_then(Value::as_object_mut) {
        for (route, item) in paths.iter_mut() {
            let Some(item) = item.as_object_mut() else {
                continue;
            };
            fix_parameter_list(item.get_mut("parameters"), route);
            for operation in item.values_mut() {
                if let Some(operation) = operation.as_object_mut() {
                    fix_parameter_list(operation.get_mut("parameters"), route);
                }
            }
        }
    }
}

/// Null-union fixup on each parameter's `schema`, and nothing else.
fn fix_parameter_list(params: Option<&mut Value>, route: &str) {
    let Some(Value::Array(params)) = params else {
        return;
    };
    for param in params {
        if let Some(schema) = param.get_mut("schema").and_then(Value::as_object_mut) {
            fix_any_of_null(schema, route);
        }
    }
}

/// Null-union fixup on `schema` and, recursively, its `properties.*` and `items`.
fn fix_null_unions(schema: &mut Map<String, Value>, at: &str) {
    fix_any_of_null(schema, at);

    if let Some(Value::Object(properties)) = schema.get_mut("properties") {
        for (name, prop) in properties.iter_mut() {
            if let Some(prop) = prop.as_object_mut() {
                fix_null_unions(prop, name);
            }
        }
    }
    if let Some(Value::Object(items)) = schema.get_mut("items") {
        fix_null_unions(items, at);
    }
}

/// Rewrite `anyOf: [{type: T, ...}, {type: "null"}]` (either order) into `T`'s fields plus
/// `nullable: true`. Any other shape is left alone.
fn fix_any_of_null(schema: &mut Map<String, Value>, at: &str) {
    let Some(Value::Array(alternatives)) = schema.get("anyOf") else {
        return;
    };
    if alternatives.len() != 2 {
        return;
    }

    let mut has_null = false;
    let mut main: Option<&Map<String, Value>> = None;
    for alt in alternatives {
        let Some(obj) = alt.as_object() else {
            continue;
        };
        match obj.get("type") {
            Some(Value::String(t)) if t == "null" => has_null = true,
            Some(Value::String(_)) => main = Some(obj),
            _ => {}
        }
    }

    let Some(main) = main.filter(|_| has_null).cloned() else {
        return;
    };

    schema.remove("anyOf");
    for (k, v) in main {
        schema.insert(k, v);
    }
    schema.insert("nullable".to_string(), Value::Bool(true));
    debug!(schema = %at, "converted anyOf with null to nullable type");
}

fn strip_deny_listed(schema: &mut Map<String, Value>, at: &str) {
    for field in DENY_LISTED_FIELDS {
        if schema.remove(field).is_some() {
            debug!(schema = %at, field, "removed non-standard schema field");
        }
    }

    if let Some(Value::Object(properties)) = schema.get_mut("properties") {
        for (name, prop) in properties.iter_mut() {
            if let Some(prop) = prop.as_object_mut() {
                strip_deny_listed(prop, name);
            }
        }
    }
    if let Some(Value::Object(items)) = schema.get_mut("items") {
        strip_deny_listed(items, at);
    }
}
