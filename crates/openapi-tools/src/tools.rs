//! Tool model builder.
//!
//! Walks a loaded document and derives one [`ToolDefinition`] per (path, method). The output is
//! the single source both the planner and catalog export read from.

use crate::document::LoadedDocument;
use crate::resolver::LocalResolver;
use mcprox_http_tools::request::HttpMethod;
use openapiv3::{
    Operation, Parameter, ParameterData, ParameterSchemaOrContent, PathItem, ReferenceOr,
    Schema, SchemaKind, Type,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParamLocation {
    Path,
    Query,
    Header,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimitiveType {
    String,
    Integer,
    Number,
    Boolean,
}

impl PrimitiveType {
    /// JSON Schema type name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            PrimitiveType::String => "string",
            PrimitiveType::Integer => "integer",
            PrimitiveType::Number => "number",
            PrimitiveType::Boolean => "boolean",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterSpec {
    /// Name as declared in the document; arguments are keyed by it.
    pub name: String,
    /// Identifier-safe form of `name`. Not guaranteed unique within a tool.
    pub sanitized_name: String,
    pub location: ParamLocation,
    pub required: bool,
    pub primitive_type: PrimitiveType,
    /// String enum members in declaration order (string parameters only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BodySpec {
    pub required: bool,
    /// First declared media type that carries a schema.
    pub media_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    pub id: String,
    pub description: String,
    /// Required parameters first, declaration order kept within each group.
    pub parameters: Vec<ParameterSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<BodySpec>,
    pub path: String,
    pub method: HttpMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
}

impl ToolDefinition {
    #[must_use]
    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    #[must_use]
    pub fn body_required(&self) -> bool {
        self.body.as_ref().is_some_and(|b| b.required)
    }

    /// Parameters carried in `location`, in definition order.
    pub fn parameters_in(&self, location: ParamLocation) -> impl Iterator<Item = &ParameterSpec> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }
}

/// Derive one tool per operation, paths and the methods within each path item in declaration
/// order.
#[must_use]
pub fn build_tools(doc: &LoadedDocument) -> Vec<ToolDefinition> {
    let resolver = LocalResolver::new(&doc.api);
    let mut tools = Vec::new();

    for (path, item) in &doc.api.paths.paths {
        let ReferenceOr::Item(item) = item else {
            warn!(path = %path, "skipping path item given as $ref");
            continue;
        };

        let order = doc.declared_methods(path).unwrap_or(&HttpMethod::ALL[..]);
        for (method, operation) in operations(item, order) {
            let tool = build_tool(&resolver, path, method, item, operation);
            debug!(
                id = %tool.id,
                method = %method,
                path = %path,
                params = tool.parameters.len(),
                has_body = tool.has_body(),
                "added tool"
            );
            tools.push(tool);
        }
    }

    info!(count = tools.len(), "built tool definitions");
    tools
}

fn operations<'a>(
    item: &'a PathItem,
    order: &'a [HttpMethod],
) -> impl Iterator<Item = (HttpMethod, &'a Operation)> {
    order.iter().filter_map(move |&method| {
        let op = match method {
            HttpMethod::Get => item.get.as_ref(),
            HttpMethod::Put => item.put.as_ref(),
            HttpMethod::Post => item.post.as_ref(),
            HttpMethod::Delete => item.delete.as_ref(),
            HttpMethod::Options => item.options.as_ref(),
            HttpMethod::Head => item.head.as_ref(),
            HttpMethod::Patch => item.patch.as_ref(),
            HttpMethod::Trace => item.trace.as_ref(),
        };
        op.map(|op| (method, op))
    })
}

fn build_tool(
    resolver: &LocalResolver<'_>,
    path: &str,
    method: HttpMethod,
    item: &PathItem,
    operation: &Operation,
) -> ToolDefinition {
    let specs: Vec<ParameterSpec> = merge_parameters(resolver, &item.parameters, &operation.parameters)
        .into_iter()
        .filter_map(|p| classify_parameter(resolver, p))
        .collect();
    let (mut parameters, optional): (Vec<_>, Vec<_>) =
        specs.into_iter().partition(|p| p.required);
    parameters.extend(optional);

    ToolDefinition {
        id: derive_tool_id(method, path),
        description: tool_description(method, path, operation),
        parameters,
        body: body_spec(resolver, operation),
        path: path.to_string(),
        method,
        operation_id: operation.operation_id.clone(),
    }
}

fn tool_description(method: HttpMethod, path: &str, operation: &Operation) -> String {
    [&operation.summary, &operation.description]
        .into_iter()
        .flatten()
        .find(|s| !s.is_empty())
        .map_or_else(|| format!("{method} {path}"), Clone::clone)
}

/// Path-item parameters overlaid with operation parameters; the operation wins on equal
/// `(in, name)`. Unresolvable refs are dropped.
fn merge_parameters<'a>(
    resolver: &LocalResolver<'a>,
    path_item_params: &'a [ReferenceOr<Parameter>],
    operation_params: &'a [ReferenceOr<Parameter>],
) -> Vec<&'a Parameter> {
    fn key_for(p: &Parameter) -> (&'static str, &str) {
        match p {
            Parameter::Path { parameter_data, .. } => ("path", &parameter_data.name),
            Parameter::Query { parameter_data, .. } => ("query", &parameter_data.name),
            Parameter::Header { parameter_data, .. } => ("header", &parameter_data.name),
            Parameter::Cookie { parameter_data, .. } => ("cookie", &parameter_data.name),
        }
    }

    let mut merged: Vec<&'a Parameter> = Vec::new();
    let mut index: HashMap<(&'static str, &'a str), usize> = HashMap::new();

    for r in path_item_params.iter().chain(operation_params) {
        let Some(p) = resolver.parameter(r) else {
            warn!("skipping unresolved parameter $ref");
            continue;
        };
        let key = key_for(p);
        if let Some(&i) = index.get(&key) {
            merged[i] = p;
        } else {
            index.insert(key, merged.len());
            merged.push(p);
        }
    }

    merged
}

fn classify_parameter(resolver: &LocalResolver<'_>, param: &Parameter) -> Option<ParameterSpec> {
    let (data, location): (&ParameterData, ParamLocation) = match param {
        Parameter::Path { parameter_data, .. } => (parameter_data, ParamLocation::Path),
        Parameter::Query { parameter_data, .. } => (parameter_data, ParamLocation::Query),
        Parameter::Header { parameter_data, .. } => (parameter_data, ParamLocation::Header),
        Parameter::Cookie { parameter_data, .. } => {
            debug!(name = %parameter_data.name, "skipping cookie parameter");
            return None;
        }
    };

    let schema = match &data.format {
        ParameterSchemaOrContent::Schema(s) => resolver.schema(s),
        ParameterSchemaOrContent::Content(_) => None,
    };
    let (primitive_type, enum_values) = schema.map_or((PrimitiveType::String, None), primitive_of);

    Some(ParameterSpec {
        name: data.name.clone(),
        sanitized_name: sanitize_param_name(&data.name),
        location,
        required: data.required,
        primitive_type,
        enum_values,
        description: data.description.clone(),
    })
}

/// Map a schema to a primitive type; everything that is not one of the four primitives
/// (arrays, objects, compositions, untyped) is treated as a string.
fn primitive_of(schema: &Schema) -> (PrimitiveType, Option<Vec<String>>) {
    match &schema.schema_kind {
        SchemaKind::Type(Type::String(s)) => (
            PrimitiveType::String,
            non_empty(s.enumeration.iter().flatten().cloned().collect()),
        ),
        SchemaKind::Type(Type::Integer { .. }) => (PrimitiveType::Integer, None),
        SchemaKind::Type(Type::Number { .. }) => (PrimitiveType::Number, None),
        SchemaKind::Type(Type::Boolean { .. }) => (PrimitiveType::Boolean, None),
        // A string schema whose enum mixes in non-strings lands here.
        SchemaKind::Any(any) => match any.typ.as_deref() {
            Some("string") => (
                PrimitiveType::String,
                non_empty(
                    any.enumeration
                        .iter()
                        .filter_map(|v| v.as_str().map(str::to_string))
                        .collect(),
                ),
            ),
            Some("integer") => (PrimitiveType::Integer, None),
            Some("number") => (PrimitiveType::Number, None),
            Some("boolean") => (PrimitiveType::Boolean, None),
            _ => (PrimitiveType::String, None),
        },
        _ => (PrimitiveType::String, None),
    }
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    (!values.is_empty()).then_some(values)
}

fn body_spec(resolver: &LocalResolver<'_>, operation: &Operation) -> Option<BodySpec> {
    let body = resolver.request_body(operation.request_body.as_ref()?)?;
    let (media_type, _) = body.content.iter().find(|(_, m)| m.schema.is_some())?;
    Some(BodySpec {
        required: body.required,
        media_type: media_type.clone(),
        description: body.description.clone(),
    })
}

/// Tool id for `method` + `path`: braces dropped, `/` and `-` turned into `_`, one leading `_`
/// trimmed, the rest title-cased, prefixed with the lower-case method.
///
/// `GET /users/{id}` gives `getUsers_id`. Distinct paths can collide (`/a-b` and `/a_b`); see
/// [`crate::collisions`].
#[must_use]
pub fn derive_tool_id(method: HttpMethod, path: &str) -> String {
    let flattened: String = path
        .chars()
        .filter(|c| !matches!(c, '{' | '}'))
        .map(|c| if matches!(c, '/' | '-') { '_' } else { c })
        .collect();
    let trimmed = flattened.strip_prefix('_').unwrap_or(&flattened);
    format!(
        "{}{}",
        method.as_str().to_ascii_lowercase(),
        title_case(trimmed)
    )
}

/// Upper-case every letter that starts a word. Words are separated by anything that is not a
/// letter, digit or `_`, so `users_id` stays one word.
fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev = ' ';
    for c in s.chars() {
        if is_word_separator(prev) {
            out.extend(c.to_uppercase());
        } else {
            out.push(c);
        }
        prev = c;
    }
    out
}

fn is_word_separator(c: char) -> bool {
    if c.is_ascii() {
        return !(c.is_ascii_alphanumeric() || c == '_');
    }
    if c.is_alphanumeric() {
        return false;
    }
    c.is_whitespace()
}

/// Identifier-safe parameter name: `-` and every other character that is not a letter, digit or
/// `_` become `_`.
#[must_use]
pub fn sanitize_param_name(name: &str) -> String {
    name.chars()
        .map(|c| if is_identifier_char(c) { c } else { '_' })
        .collect()
}

/// Letters of any script, ASCII digits and `_`; other numerics (`²`, `½`, `ⅻ`) are replaced.
fn is_identifier_char(c: char) -> bool {
    c.is_alphabetic() || c.is_ascii_digit() || c == '_'
}
