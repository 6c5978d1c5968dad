//! `OpenAPI` to MCP tool compiler.
//!
//! The pipeline runs in four steps:
//! - [`normalize`] repairs raw document bytes (3.1 marker, null unions, vendor fields)
//! - [`document`] loads the result into the strict `openapiv3` model
//! - [`tools`] derives one [`tools::ToolDefinition`] per operation
//! - [`planner`] turns a definition plus call arguments into a concrete HTTP request
//!
//! [`catalog::ToolCatalog`] ties these together for callers that want MCP `Tool`s and tool calls.

pub mod catalog;
pub mod collisions;
pub mod config;
pub mod document;
pub mod error;
pub mod mcp;
pub mod normalize;
pub mod planner;
pub mod resolver;
pub mod tools;
