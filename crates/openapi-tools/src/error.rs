//! Error types for `mcprox-openapi-tools`.

use mcprox_http_tools::runtime::HttpToolsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OpenApiToolsError {
    /// Input bytes are not a decodable JSON document.
    #[error("Malformed input: {source}")]
    MalformedInput {
        #[source]
        source: serde_json::Error,
    },

    /// The normalized document was rejected by the strict loader or a structural check.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A structured body argument could not be JSON-encoded.
    #[error("Body encoding error: {source}")]
    BodyEncoding {
        #[source]
        source: serde_json::Error,
    },

    /// Duplicate tool ids or parameter names under the `fail` collision policy.
    #[error("Collision: {0}")]
    Collision(String),

    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error(transparent)]
    Http(#[from] HttpToolsError),
}

pub type Result<T> = std::result::Result<T, OpenApiToolsError>;
