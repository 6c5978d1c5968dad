//! HTTP method semantics.
//!
//! Used to derive MCP `ToolAnnotations` for HTTP-backed tools from RFC 9110 method properties.

use crate::request::HttpMethod;
use rmcp::model::ToolAnnotations;

/// MCP tool annotations for a method.
///
/// `openWorldHint` is always `true`: every tool talks to an external API. `PATCH` leaves
/// idempotence unset since it may go either way.
#[must_use]
pub fn annotations_for_method(method: HttpMethod) -> ToolAnnotations {
    let (read_only, destructive, idempotent) = match method {
        HttpMethod::Get | HttpMethod::Head | HttpMethod::Options | HttpMethod::Trace => {
            (Some(true), Some(false), Some(true))
        }
        HttpMethod::Post => (Some(false), Some(false), Some(false)),
        HttpMethod::Put | HttpMethod::Delete => (Some(false), Some(true), Some(true)),
        HttpMethod::Patch => (Some(false), Some(true), None),
    };

    ToolAnnotations {
        title: None,
        read_only_hint: read_only,
        destructive_hint: destructive,
        idempotent_hint: idempotent,
        open_world_hint: Some(true),
    }
}
