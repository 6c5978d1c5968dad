//! MCP projection of tool definitions.

use crate::planner::BODY_ARGUMENT;
use crate::tools::{ParameterSpec, ToolDefinition};
use mcprox_http_tools::semantics::annotations_for_method;
use rmcp::model::{JsonObject, Tool};
use serde_json::{Value, json};
use std::sync::Arc;

/// Build the MCP `Tool` for a definition.
#[must_use]
pub fn to_mcp_tool(tool: &ToolDefinition) -> Tool {
    let mut out = Tool::new(
        tool.id.clone(),
        tool.description.clone(),
        Arc::new(input_schema(tool)),
    );
    out.annotations = Some(annotations_for_method(tool.method));
    out
}

/// JSON Schema for the call arguments: one property per parameter (original name) plus a string
/// `body` when the operation takes a request body.
#[must_use]
pub fn input_schema(tool: &ToolDefinition) -> JsonObject {
    let mut properties = JsonObject::new();
    let mut required: Vec<Value> = Vec::new();

    for param in &tool.parameters {
        properties.insert(param.name.clone(), property_schema(param));
        if param.required {
            required.push(Value::String(param.name.clone()));
        }
    }

    if let Some(body) = &tool.body {
        let description = body.description.as_deref().unwrap_or("Request body");
        properties.insert(
            BODY_ARGUMENT.to_string(),
            json!({"type": "string", "description": description}),
        );
        if body.required {
            required.push(Value::String(BODY_ARGUMENT.to_string()));
        }
    }

    let mut schema = JsonObject::new();
    schema.insert("type".to_string(), json!("object"));
    schema.insert("properties".to_string(), Value::Object(properties));
    if !required.is_empty() {
        schema.insert("required".to_string(), Value::Array(required));
    }
    schema
}

fn property_schema(param: &ParameterSpec) -> Value {
    let mut prop = json!({"type": param.primitive_type.as_str()});
    if let Some(values) = &param.enum_values {
        prop["enum"] = json!(values);
    }
    if let Some(description) = &param.description {
        prop["description"] = json!(description);
    }
    prop
}
