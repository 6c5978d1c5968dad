use serde::{Deserialize, Serialize};

/// What to do when two tools derive the same id, or two parameters of one tool sanitize to the
/// same name.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    /// Log each collision; id-keyed lookups keep the last definition.
    #[default]
    Warn,
    /// Refuse to build the catalog.
    Fail,
}

/// Options for compiling a document into a tool catalog.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompilerOptions {
    #[serde(default)]
    pub collision_policy: CollisionPolicy,
}

/// Where planned requests go.
///
/// Passed into every planning call; nothing in this crate reads process-wide configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServiceTarget {
    /// Base URL the route template is joined onto.
    #[serde(default, alias = "url")]
    pub base_url: Option<String>,

    /// Value for the `Authorization` header.
    #[serde(default)]
    pub authorization: Option<String>,
}

impl ServiceTarget {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: Some(base_url.into()),
            authorization: None,
        }
    }

    #[must_use]
    pub fn with_authorization(mut self, authorization: impl Into<String>) -> Self {
        self.authorization = Some(authorization.into());
        self
    }

    /// The base URL, if one is configured and non-blank.
    #[must_use]
    pub fn base_url(&self) -> Option<&str> {
        self.base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}
