//! Compiled tool catalog.
//!
//! [`ToolCatalog`] runs the whole pipeline once per document and then serves tool listings,
//! request plans and calls. It is cheap to clone and shares the definitions read-only.

use crate::collisions::{CollisionReport, find_collisions};
use crate::config::{CollisionPolicy, CompilerOptions, ServiceTarget};
use crate::document::{LoadedDocument, parse_document};
use crate::error::{OpenApiToolsError, Result};
use crate::mcp::to_mcp_tool;
use crate::planner::plan;
use crate::tools::{ToolDefinition, build_tools};
use mcprox_http_tools::request::PlannedRequest;
use mcprox_http_tools::runtime::HttpInvoker;
use rmcp::model::{CallToolResult, Content, Tool};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ToolCatalog {
    tools: Arc<[ToolDefinition]>,
    /// Tool id to index into `tools`; duplicate ids point at the last definition.
    by_id: Arc<HashMap<String, usize>>,
    collisions: Arc<CollisionReport>,
}

impl ToolCatalog {
    /// Normalize, load and compile raw document bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes are malformed, the document fails validation, or collisions
    /// are found under [`CollisionPolicy::Fail`].
    pub fn from_document_bytes(raw: &[u8], options: &CompilerOptions) -> Result<Self> {
        let doc = parse_document(raw)?;
        Self::from_document(&doc, options)
    }

    /// Compile an already-loaded document.
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::Collision`] if collisions are found under
    /// [`CollisionPolicy::Fail`].
    pub fn from_document(doc: &LoadedDocument, options: &CompilerOptions) -> Result<Self> {
        Self::from_tools(build_tools(doc), options)
    }

    /// Wrap definitions built elsewhere (for example, read back from an export).
    ///
    /// # Errors
    ///
    /// Returns [`OpenApiToolsError::Collision`] if collisions are found under
    /// [`CollisionPolicy::Fail`].
    pub fn from_tools(tools: Vec<ToolDefinition>, options: &CompilerOptions) -> Result<Self> {
        let collisions = find_collisions(&tools);
        if !collisions.is_empty() {
            match options.collision_policy {
                CollisionPolicy::Fail => {
                    return Err(OpenApiToolsError::Collision(collisions.to_string()));
                }
                CollisionPolicy::Warn => {
                    for c in &collisions.ids {
                        warn!(
                            id = %c.id,
                            count = c.count,
                            operations = ?c.operations,
                            "duplicate tool id; the last definition wins"
                        );
                    }
                    for c in &collisions.parameter_names {
                        warn!(
                            tool = %c.tool_id,
                            sanitized = %c.sanitized_name,
                            names = ?c.names,
                            "parameters share a sanitized name"
                        );
                    }
                }
            }
        }

        let by_id: HashMap<String, usize> = tools
            .iter()
            .enumerate()
            .map(|(i, t)| (t.id.clone(), i))
            .collect();

        info!(
            tools = tools.len(),
            unique_ids = by_id.len(),
            "tool catalog ready"
        );

        Ok(Self {
            tools: tools.into(),
            by_id: Arc::new(by_id),
            collisions: Arc::new(collisions),
        })
    }

    /// All definitions, in document order (duplicates included).
    #[must_use]
    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<&ToolDefinition> {
        self.by_id.get(id).map(|&i| &self.tools[i])
    }

    #[must_use]
    pub fn collisions(&self) -> &CollisionReport {
        &self.collisions
    }

    /// MCP tools, one per reachable id, in document order.
    #[must_use]
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .enumerate()
            .filter(|(i, t)| self.by_id.get(&t.id) == Some(i))
            .map(|(_, t)| to_mcp_tool(t))
            .collect()
    }

    /// Plan the request for a call of tool `id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown, `arguments` is neither an object nor `null`, or
    /// the body cannot be encoded.
    pub fn plan(&self, id: &str, arguments: &Value, target: &ServiceTarget) -> Result<PlannedRequest> {
        let tool = self.require(id)?;
        plan(tool, &argument_map(arguments)?, target)
    }

    /// Execute a tool call.
    ///
    /// Without a base URL in `target` nothing is sent and a mock text result describing the call
    /// is returned instead.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool is unknown, the arguments are invalid, or the outbound HTTP
    /// request fails (transport or 4xx/5xx).
    pub async fn call_tool(
        &self,
        id: &str,
        arguments: &Value,
        target: &ServiceTarget,
        invoker: &HttpInvoker,
    ) -> Result<CallToolResult> {
        let tool = self.require(id)?;
        let args = argument_map(arguments)?;

        if target.base_url().is_none() {
            debug!(tool = %id, "no service URL configured; returning mock response");
            return Ok(CallToolResult::success(vec![Content::text(mock_response(
                tool, &args,
            ))]));
        }

        let request = plan(tool, &args, target)?;
        let response = invoker.invoke(&request).await?;
        debug!(
            tool = %id,
            status = response.status,
            bytes = response.body.len(),
            json = response.is_json(),
            "tool call finished"
        );
        Ok(CallToolResult::success(vec![Content::text(response.text())]))
    }

    fn require(&self, id: &str) -> Result<&ToolDefinition> {
        self.get(id)
            .ok_or_else(|| OpenApiToolsError::ToolNotFound(id.to_string()))
    }
}

fn argument_map(arguments: &Value) -> Result<Map<String, Value>> {
    match arguments {
        Value::Object(map) => Ok(map.clone()),
        Value::Null => Ok(Map::new()),
        other => Err(OpenApiToolsError::InvalidArguments(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn mock_response(tool: &ToolDefinition, args: &Map<String, Value>) -> String {
    let params = serde_json::to_string(args).unwrap_or_else(|_| "{}".to_string());
    format!(
        "Mock response for {} {}\nParams: {params}",
        tool.method, tool.path
    )
}
