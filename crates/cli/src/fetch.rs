//! Document fetching.
//!
//! Reads a document from a URL or a file and hands back JSON bytes; YAML input is converted.

use anyhow::{Context as _, bail};
use reqwest::StatusCode;
use serde_json::{Map, Number, Value};
use std::time::Duration;
use tracing::{debug, info};

/// Load the document at `location` (http(s) URL, `file://` URL or path) as JSON bytes.
pub async fn load_document_bytes(location: &str, timeout: Duration) -> anyhow::Result<Vec<u8>> {
    let raw = if location.starts_with("http://") || location.starts_with("https://") {
        fetch_url(location, timeout).await?
    } else {
        let path = location.strip_prefix("file://").unwrap_or(location);
        std::fs::read(path).with_context(|| format!("read document {path}"))?
    };
    info!(location, bytes = raw.len(), "loaded OpenAPI document");
    to_json_bytes(&raw).with_context(|| format!("decode document {location}"))
}

async fn fetch_url(url: &str, timeout: Duration) -> anyhow::Result<Vec<u8>> {
    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .context("build HTTP client")?;
    let resp = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("fetch {url}"))?;
    let status = resp.status();
    if status != StatusCode::OK {
        bail!("fetch {url}: unexpected status {status}");
    }
    let bytes = resp
        .bytes()
        .await
        .with_context(|| format!("read body of {url}"))?;
    Ok(bytes.to_vec())
}

/// JSON passes through untouched; anything else is parsed as YAML and re-encoded.
pub fn to_json_bytes(raw: &[u8]) -> anyhow::Result<Vec<u8>> {
    if serde_json::from_slice::<serde::de::IgnoredAny>(raw).is_ok() {
        return Ok(raw.to_vec());
    }
    debug!("document is not JSON; converting from YAML");
    let yaml: serde_yaml::Value = serde_yaml::from_slice(raw).context("parse YAML")?;
    let json = yaml_to_json(yaml)?;
    serde_json::to_vec(&json).context("encode JSON")
}

/// YAML allows non-string keys (`200:` under `responses`); JSON does not, so keys are stringified.
fn yaml_to_json(value: serde_yaml::Value) -> anyhow::Result<Value> {
    use serde_yaml::Value as Y;

    Ok(match value {
        Y::Null => Value::Null,
        Y::Bool(b) => Value::Bool(b),
        Y::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Number(i.into())
            } else if let Some(u) = n.as_u64() {
                Value::Number(u.into())
            } else {
                n.as_f64()
                    .and_then(Number::from_f64)
                    .map_or(Value::Null, Value::Number)
            }
        }
        Y::String(s) => Value::String(s),
        Y::Sequence(items) => Value::Array(
            items
                .into_iter()
                .map(yaml_to_json)
                .collect::<anyhow::Result<_>>()?,
        ),
        Y::Mapping(mapping) => {
            let mut out = Map::new();
            for (k, v) in mapping {
                out.insert(yaml_key(k)?, yaml_to_json(v)?);
            }
            Value::Object(out)
        }
        Y::Tagged(tagged) => yaml_to_json(tagged.value)?,
    })
}

fn yaml_key(key: serde_yaml::Value) -> anyhow::Result<String> {
    use serde_yaml::Value as Y;

    match key {
        Y::String(s) => Ok(s),
        Y::Number(n) => Ok(n.to_string()),
        Y::Bool(b) => Ok(b.to_string()),
        Y::Null => Ok("null".to_string()),
        other => bail!("unsupported YAML mapping key: {other:?}"),
    }
}
