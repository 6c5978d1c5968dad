//! Strict document loading.

use crate::error::{OpenApiToolsError, Result};
use crate::normalize::normalize;
use mcprox_http_tools::request::HttpMethod;
use openapiv3::OpenAPI;
use serde_json::Value;
use std::collections::HashMap;
use tracing::info;

/// A loaded document plus the order operations are declared in within each path item, which the
/// typed model does not keep.
#[derive(Debug, Clone)]
pub struct LoadedDocument {
    pub api: OpenAPI,
    method_order: HashMap<String, Vec<HttpMethod>>,
}

impl LoadedDocument {
    /// Methods of path item `path` in declaration order; `None` if the path is unknown.
    #[must_use]
    pub fn declared_methods(&self, path: &str) -> Option<&[HttpMethod]> {
        self.method_order.get(path).map(Vec::as_slice)
    }
}

fn declared_method_order(
    paths: &serde_json::Map<String, Value>,
) -> HashMap<String, Vec<HttpMethod>> {
    paths
        .iter()
        .filter_map(|(path, item)| {
            let item = item.as_object()?;
            let methods = item
                .keys()
                .filter_map(|k| {
                    HttpMethod::ALL
                        .into_iter()
                        .find(|m| m.as_str().to_ascii_lowercase() == *k)
                })
                .collect();
            Some((path.clone(), methods))
        })
        .collect()
}

/// Load normalized bytes into the typed `OpenAPI` model.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::Validation`] if the bytes do not deserialize into a 3.0 document,
/// or if a path key does not start with `/`.
pub fn load_document(normalized: &[u8]) -> Result<LoadedDocument> {
    let tree: Value = serde_json::from_slice(normalized)
        .map_err(|e| OpenApiToolsError::Validation(format!("invalid OpenAPI document: {e}")))?;

    // The typed loader silently drops path keys it does not recognize, so check the raw tree.
    if let Some(paths) = tree.get("paths").and_then(Value::as_object)
        && let Some(bad) = paths
            .keys()
            .find(|p| !p.starts_with('/') && !p.starts_with("x-"))
    {
        return Err(OpenApiToolsError::Validation(format!(
            "path '{bad}' must start with '/'"
        )));
    }

    let method_order = tree
        .get("paths")
        .and_then(Value::as_object)
        .map(declared_method_order)
        .unwrap_or_default();

    let doc: OpenAPI = serde_json::from_value(tree)
        .map_err(|e| OpenApiToolsError::Validation(format!("invalid OpenAPI document: {e}")))?;

    if !doc.openapi.starts_with("3.0") {
        return Err(OpenApiToolsError::Validation(format!(
            "unsupported OpenAPI version '{}' (expected 3.0.x)",
            doc.openapi
        )));
    }

    info!(
        title = %doc.info.title,
        paths = doc.paths.paths.len(),
        schemas = doc.components.as_ref().map_or(0, |c| c.schemas.len()),
        "loaded OpenAPI document"
    );
    Ok(LoadedDocument {
        api: doc,
        method_order,
    })
}

/// Normalize then load.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::MalformedInput`] for undecodable input and
/// [`OpenApiToolsError::Validation`] if the normalized document is rejected.
pub fn parse_document(raw: &[u8]) -> Result<LoadedDocument> {
    let normalized = normalize(raw)?;
    load_document(&normalized)
}
