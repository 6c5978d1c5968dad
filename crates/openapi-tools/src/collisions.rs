//! Duplicate id / sanitized-name detection.
//!
//! Tool ids and sanitized parameter names are derived without disambiguation. This pass only
//! reports the overlaps; what to do about them is up to the [`crate::config::CollisionPolicy`].

use crate::tools::ToolDefinition;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdCollision {
    pub id: String,
    /// Number of definitions sharing `id` (always at least 2).
    pub count: usize,
    /// `"<METHOD> <path>"` of each definition, in build order.
    pub operations: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NameCollision {
    pub tool_id: String,
    pub sanitized_name: String,
    /// Original names that sanitize to `sanitized_name`.
    pub names: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollisionReport {
    pub ids: Vec<IdCollision>,
    pub parameter_names: Vec<NameCollision>,
}

impl CollisionReport {
    /// Number of colliding tool ids.
    #[must_use]
    pub fn count(&self) -> usize {
        self.ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.parameter_names.is_empty()
    }
}

impl fmt::Display for CollisionReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts: Vec<String> = Vec::new();
        for c in &self.ids {
            parts.push(format!(
                "tool id '{}' derived by {} operations ({})",
                c.id,
                c.count,
                c.operations.join(", ")
            ));
        }
        for c in &self.parameter_names {
            parts.push(format!(
                "tool '{}' parameters {} all sanitize to '{}'",
                c.tool_id,
                c.names.join(", "),
                c.sanitized_name
            ));
        }
        f.write_str(&parts.join("; "))
    }
}

#[must_use]
pub fn find_collisions(tools: &[ToolDefinition]) -> CollisionReport {
    let mut report = CollisionReport::default();

    let mut by_id: Vec<(&str, Vec<&ToolDefinition>)> = Vec::new();
    let mut id_index: HashMap<&str, usize> = HashMap::new();
    for tool in tools {
        let i = *id_index.entry(tool.id.as_str()).or_insert_with(|| {
            by_id.push((tool.id.as_str(), Vec::new()));
            by_id.len() - 1
        });
        by_id[i].1.push(tool);
    }
    for (id, group) in by_id.into_iter().filter(|(_, g)| g.len() > 1) {
        report.ids.push(IdCollision {
            id: id.to_string(),
            count: group.len(),
            operations: group
                .iter()
                .map(|t| format!("{} {}", t.method, t.path))
                .collect(),
        });
    }

    for tool in tools {
        let mut by_name: Vec<(&str, Vec<&str>)> = Vec::new();
        for p in &tool.parameters {
            match by_name.iter_mut().find(|(s, _)| *s == p.sanitized_name) {
                Some((_, names)) => names.push(p.name.as_str()),
                None => by_name.push((p.sanitized_name.as_str(), vec![p.name.as_str()])),
            }
        }
        for (sanitized, names) in by_name.into_iter().filter(|(_, n)| n.len() > 1) {
            report.parameter_names.push(NameCollision {
                tool_id: tool.id.clone(),
                sanitized_name: sanitized.to_string(),
                names: names.into_iter().map(str::to_string).collect(),
            });
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{
        ParamLocation, ParameterSpec, PrimitiveType, derive_tool_id, sanitize_param_name,
    };
    use mcprox_http_tools::request::HttpMethod;

    fn tool(method: HttpMethod, path: &str, params: &[&str]) -> ToolDefinition {
        ToolDefinition {
            id: derive_tool_id(method, path),
            description: format!("{method} {path}"),
            parameters: params
                .iter()
                .map(|n| ParameterSpec {
                    name: (*n).to_string(),
                    sanitized_name: sanitize_param_name(n),
                    location: ParamLocation::Query,
                    required: false,
                    primitive_type: PrimitiveType::String,
                    enum_values: None,
                    description: None,
                })
                .collect(),
            body: None,
            path: path.to_string(),
            method,
            operation_id: None,
        }
    }

    #[test]
    fn reports_duplicate_ids() {
        let tools = vec![
            tool(HttpMethod::Get, "/a-b", &[]),
            tool(HttpMethod::Get, "/a_b", &[]),
            tool(HttpMethod::Get, "/c", &[]),
            tool(HttpMethod::Get, "/a/b", &[]),
        ];
        let report = find_collisions(&tools);
        assert_eq!(report.count(), 1);
        assert_eq!(report.ids[0].id, "getA_b");
        assert_eq!(report.ids[0].count, 3);
        assert_eq!(
            report.ids[0].operations,
            ["GET /a-b", "GET /a_b", "GET /a/b"]
        );
    }

    #[test]
    fn reports_duplicate_sanitized_names() {
        let tools = vec![tool(HttpMethod::Get, "/s", &["user-id", "user.id", "user_id", "q"])];
        let report = find_collisions(&tools);
        assert_eq!(report.count(), 0);
        assert_eq!(report.parameter_names.len(), 1);
        assert_eq!(report.parameter_names[0].sanitized_name, "user_id");
        assert_eq!(report.parameter_names[0].names, ["user-id", "user.id", "user_id"]);
        assert!(report.to_string().contains("user_id"));
    }

    #[test]
    fn distinct_tools_are_clean() {
        let tools = vec![
            tool(HttpMethod::Get, "/users", &["limit"]),
            tool(HttpMethod::Post, "/users", &["limit"]),
        ];
        assert!(find_collisions(&tools).is_empty());
    }
}
