//! Request planner.
//!
//! Pure functions from a [`ToolDefinition`] plus call arguments to a [`PlannedRequest`]. The live
//! invocation path and catalog export both go through [`plan`].

use crate::config::ServiceTarget;
use crate::error::{OpenApiToolsError, Result};
use crate::tools::{ParamLocation, ToolDefinition};
use mcprox_http_tools::request::PlannedRequest;
use serde_json::{Map, Number, Value};
use std::collections::HashSet;

/// Argument that carries an explicit request body.
pub const BODY_ARGUMENT: &str = "body";

const JSON_MEDIA_TYPE: &str = "application/json";

/// Plan the HTTP request for one call of `tool`.
///
/// `args` is keyed by original parameter names. A `null` argument counts as absent.
///
/// # Errors
///
/// Returns [`OpenApiToolsError::BodyEncoding`] if the body cannot be JSON-encoded.
pub fn plan(
    tool: &ToolDefinition,
    args: &Map<String, Value>,
    target: &ServiceTarget,
) -> Result<PlannedRequest> {
    let path = substitute_path(tool, args);
    let mut url = join_base_url(target.base_url().unwrap_or_default(), &path);

    let query = query_string(tool, args);
    if !query.is_empty() {
        url.push(if url.contains('?') { '&' } else { '?' });
        url.push_str(&query);
    }

    let headers: Vec<(String, String)> = tool
        .parameters_in(ParamLocation::Header)
        .filter_map(|p| present(args, &p.name).map(|v| (p.name.clone(), value_to_string(v))))
        .collect();

    let body = if tool.has_body() {
        request_body(tool, args)?
    } else {
        None
    };

    let mut request = PlannedRequest {
        url,
        method: tool.method,
        headers: Vec::new(),
        body,
    };
    for (name, value) in headers {
        request.set_header(&name, value);
    }
    for name in ["Content-Type", "Accept"] {
        if !request.has_header(name) {
            request.set_header(name, JSON_MEDIA_TYPE);
        }
    }
    if let Some(auth) = target.authorization.as_deref().filter(|a| !a.is_empty()) {
        request.set_header("Authorization", auth);
    }

    Ok(request)
}

fn present<'a>(args: &'a Map<String, Value>, name: &str) -> Option<&'a Value> {
    args.get(name).filter(|v| !v.is_null())
}

/// Replace `{name}` for every path parameter that has an argument. Other placeholders stay.
#[must_use]
pub fn substitute_path(tool: &ToolDefinition, args: &Map<String, Value>) -> String {
    let mut path = tool.path.clone();
    for p in tool.parameters_in(ParamLocation::Path) {
        if let Some(v) = present(args, &p.name) {
            path = path.replace(&format!("{{{}}}", p.name), &value_to_string(v));
        }
    }
    path
}

/// Join with exactly one `/` between `base` and `path`; an empty side still gets the separator.
#[must_use]
pub fn join_base_url(base: &str, path: &str) -> String {
    match (base.ends_with('/'), path.starts_with('/')) {
        (true, true) => format!("{base}{}", &path[1..]),
        (false, false) => format!("{base}/{path}"),
        _ => format!("{base}{path}"),
    }
}

fn query_string(tool: &ToolDefinition, args: &Map<String, Value>) -> String {
    tool.parameters_in(ParamLocation::Query)
        .filter_map(|p| {
            present(args, &p.name).map(|v| {
                format!(
                    "{}={}",
                    encode_query_component(&p.name),
                    encode_query_component(&value_to_string(v))
                )
            })
        })
        .collect::<Vec<_>>()
        .join("&")
}

/// Explicit string body as-is, explicit structured body JSON-encoded, otherwise a JSON object
/// of every argument no path or query parameter claims. An empty object means no body.
fn request_body(tool: &ToolDefinition, args: &Map<String, Value>) -> Result<Option<Vec<u8>>> {
    match present(args, BODY_ARGUMENT) {
        Some(Value::String(raw)) => Ok(Some(raw.as_bytes().to_vec())),
        Some(structured) => serde_json::to_vec(structured)
            .map(Some)
            .map_err(|source| OpenApiToolsError::BodyEncoding { source }),
        None => {
            let claimed: HashSet<&str> = tool
                .parameters
                .iter()
                .filter(|p| matches!(p.location, ParamLocation::Path | ParamLocation::Query))
                .map(|p| p.name.as_str())
                .collect();
            let fields: Map<String, Value> = args
                .iter()
                .filter(|(k, _)| !claimed.contains(k.as_str()) && k.as_str() != BODY_ARGUMENT)
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            if fields.is_empty() {
                return Ok(None);
            }
            serde_json::to_vec(&fields)
                .map(Some)
                .map_err(|source| OpenApiToolsError::BodyEncoding { source })
        }
    }
}

/// Stringify an argument for a path, query or header slot.
#[must_use]
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => number_to_string(n),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Integers verbatim; floats in shortest form without a trailing `.0`.
fn number_to_string(n: &Number) -> String {
    match n.as_f64() {
        Some(f) if n.is_f64() => f.to_string(),
        _ => n.to_string(),
    }
}

/// Percent-encode everything outside the RFC 3986 unreserved set.
fn encode_query_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::{BodySpec, ParameterSpec, PrimitiveType, sanitize_param_name};
    use mcprox_http_tools::request::HttpMethod;
    use serde_json::json;

    fn param(name: &str, location: ParamLocation) -> ParameterSpec {
        ParameterSpec {
            name: name.to_string(),
            sanitized_name: sanitize_param_name(name),
            location,
            required: location == ParamLocation::Path,
            primitive_type: PrimitiveType::String,
            enum_values: None,
            description: None,
        }
    }

    fn tool(method: HttpMethod, path: &str, params: Vec<ParameterSpec>, body: bool) -> ToolDefinition {
        ToolDefinition {
            id: "t".to_string(),
            description: "t".to_string(),
            parameters: params,
            body: body.then(|| BodySpec {
                required: false,
                media_type: "application/json".to_string(),
                description: None,
            }),
            path: path.to_string(),
            method,
            operation_id: None,
        }
    }

    fn args(v: Value) -> Map<String, Value> {
        v.as_object().cloned().unwrap()
    }

    fn target() -> ServiceTarget {
        ServiceTarget::new("https://api.example.com")
    }

    #[test]
    fn substitutes_path_parameters() {
        let t = tool(
            HttpMethod::Get,
            "/users/{id}/posts",
            vec![param("id", ParamLocation::Path)],
            false,
        );
        let req = plan(&t, &args(json!({"id": 42})), &target()).unwrap();
        assert_eq!(req.url, "https://api.example.com/users/42/posts");
        assert_eq!(req.method, HttpMethod::Get);
        assert!(req.body.is_none());
    }

    #[test]
    fn unresolved_placeholders_stay() {
        let t = tool(
            HttpMethod::Get,
            "/users/{id}/posts/{post}",
            vec![param("id", ParamLocation::Path), param("post", ParamLocation::Path)],
            false,
        );
        let req = plan(&t, &args(json!({"id": "a", "post": null})), &target()).unwrap();
        assert_eq!(req.url, "https://api.example.com/users/a/posts/{post}");
    }

    #[test]
    fn base_url_join() {
        assert_eq!(join_base_url("https://x/", "/a"), "https://x/a");
        assert_eq!(join_base_url("https://x", "a"), "https://x/a");
        assert_eq!(join_base_url("https://x/", "a"), "https://x/a");
        assert_eq!(join_base_url("https://x", "/a"), "https://x/a");
        assert_eq!(join_base_url("https://x/api/", "/a"), "https://x/api/a");
        assert_eq!(join_base_url("", "/a"), "/a");
        assert_eq!(join_base_url("", "a"), "/a");
        assert_eq!(join_base_url("https://x/v1", ""), "https://x/v1/");
        assert_eq!(join_base_url("https://x/v1/", ""), "https://x/v1/");
    }

    #[test]
    fn stringifies_scalars() {
        assert_eq!(value_to_string(&json!(42)), "42");
        assert_eq!(value_to_string(&json!(-7)), "-7");
        assert_eq!(value_to_string(&json!(2.0)), "2");
        assert_eq!(value_to_string(&json!(2.5)), "2.5");
        assert_eq!(value_to_string(&json!(0.1)), "0.1");
        assert_eq!(value_to_string(&json!(true)), "true");
        assert_eq!(value_to_string(&json!(null)), "");
        assert_eq!(value_to_string(&json!(["a", 1])), r#"["a",1]"#);
    }

    #[test]
    fn query_parameters_in_declaration_order_and_encoded() {
        let t = tool(
            HttpMethod::Get,
            "/search",
            vec![
                param("q", ParamLocation::Query),
                param("page size", ParamLocation::Query),
                param("absent", ParamLocation::Query),
                param("tag", ParamLocation::Query),
            ],
            false,
        );
        let req = plan(
            &t,
            &args(json!({"tag": "a&b=c", "q": "hello world/ü", "page size": 1.5})),
            &target(),
        )
        .unwrap();
        assert_eq!(
            req.url,
            "https://api.example.com/search?q=hello%20world%2F%C3%BC&page%20size=1.5&tag=a%26b%3Dc"
        );
    }

    #[test]
    fn query_appends_to_existing_base_query() {
        let t = tool(HttpMethod::Get, "", vec![param("q", ParamLocation::Query)], false);
        let req = plan(
            &t,
            &args(json!({"q": "x"})),
            &ServiceTarget::new("https://api.example.com/v1?key=k"),
        )
        .unwrap();
        assert_eq!(req.url, "https://api.example.com/v1?key=k&q=x");
    }

    #[test]
    fn headers_default_to_json_without_overriding_explicit_ones() {
        let t = tool(
            HttpMethod::Get,
            "/h",
            vec![
                param("accept", ParamLocation::Header),
                param("X-Request-Id", ParamLocation::Header),
            ],
            false,
        );
        let req = plan(
            &t,
            &args(json!({"accept": "text/csv", "X-Request-Id": 7})),
            &target(),
        )
        .unwrap();
        assert_eq!(req.header("Accept"), Some("text/csv"));
        assert_eq!(req.header("X-Request-Id"), Some("7"));
        assert_eq!(req.header("content-type"), Some("application/json"));
        assert!(!req.has_header("Authorization"));
        assert_eq!(req.headers.iter().filter(|(k, _)| k.eq_ignore_ascii_case("accept")).count(), 1);
    }

    #[test]
    fn authorization_is_passed_through() {
        let t = tool(HttpMethod::Get, "/h", Vec::new(), false);
        let req = plan(
            &t,
            &Map::new(),
            &target().with_authorization("Bearer secret"),
        )
        .unwrap();
        assert_eq!(req.header("authorization"), Some("Bearer secret"));
    }

    #[test]
    fn body_collects_unclaimed_arguments() {
        let t = tool(HttpMethod::Post, "/people", Vec::new(), true);
        let req = plan(&t, &args(json!({"name": "x", "age": 3})), &target()).unwrap();
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"age": 3, "name": "x"}));
    }

    #[test]
    fn body_excludes_path_and_query_but_keeps_header_arguments() {
        let t = tool(
            HttpMethod::Put,
            "/people/{id}",
            vec![
                param("id", ParamLocation::Path),
                param("dry_run", ParamLocation::Query),
                param("X-Trace", ParamLocation::Header),
            ],
            true,
        );
        let req = plan(
            &t,
            &args(json!({"id": 1, "dry_run": true, "X-Trace": "t", "name": "x"})),
            &target(),
        )
        .unwrap();
        assert_eq!(req.url, "https://api.example.com/people/1?dry_run=true");
        let body: Value = serde_json::from_slice(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"X-Trace": "t", "name": "x"}));
    }

    #[test]
    fn explicit_string_body_is_used_verbatim() {
        let t = tool(HttpMethod::Post, "/raw", Vec::new(), true);
        let req = plan(&t, &args(json!({"body": "{\"raw\":true}"})), &target()).unwrap();
        assert_eq!(req.body.as_deref(), Some(br#"{"raw":true}"#.as_slice()));
        assert_eq!(req.body_text(), Some("{\"raw\":true}"));
    }

    #[test]
    fn explicit_structured_body_is_encoded_alone() {
        let t = tool(HttpMethod::Post, "/raw", Vec::new(), true);
        let req = plan(
            &t,
            &args(json!({"body": {"a": [1, 2]}, "ignored": 1})),
            &target(),
        )
        .unwrap();
        assert_eq!(req.body_text(), Some(r#"{"a":[1,2]}"#));
    }

    #[test]
    fn no_body_without_request_body_or_fields() {
        let with_body = tool(HttpMethod::Post, "/x", vec![param("q", ParamLocation::Query)], true);
        let req = plan(&with_body, &args(json!({"q": "a", "body": null})), &target()).unwrap();
        assert!(req.body.is_none());

        let without_body = tool(HttpMethod::Get, "/x", Vec::new(), false);
        let req = plan(&without_body, &args(json!({"name": "x"})), &target()).unwrap();
        assert!(req.body.is_none());
    }
}
