//! CLI configuration: optional YAML file layered under flags and environment.

use anyhow::{Context as _, bail};
use mcprox_openapi_tools::config::{CollisionPolicy, CompilerOptions, ServiceTarget};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Contents of `~/.mcprox.yaml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileConfig {
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub collision_policy: Option<CollisionPolicy>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfig {
    /// `30`, `"30s"`, `"1500ms"` or `"2m"`.
    #[serde(default)]
    pub timeout: Option<TimeoutSetting>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum TimeoutSetting {
    Seconds(u64),
    Text(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub authorization: Option<String>,
}

/// Values that came from flags or the environment; `None` defers to the file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub debug: bool,
    pub timeout: Option<Duration>,
    pub service_url: Option<String>,
    pub service_authorization: Option<String>,
    pub collision_policy: Option<CollisionPolicy>,
}

/// Effective settings after layering.
#[derive(Debug, Clone)]
pub struct Settings {
    pub debug: bool,
    pub timeout: Duration,
    pub target: ServiceTarget,
    pub compiler: CompilerOptions,
}

impl Settings {
    /// Flags and environment win over the file; the file wins over defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the file's timeout cannot be parsed.
    pub fn resolve(overrides: Overrides, file: FileConfig) -> anyhow::Result<Self> {
        let timeout = match (overrides.timeout, file.client.timeout) {
            (Some(t), _) => t,
            (None, Some(TimeoutSetting::Seconds(s))) => Duration::from_secs(s),
            (None, Some(TimeoutSetting::Text(s))) => {
                parse_duration(&s).with_context(|| format!("client.timeout '{s}'"))?
            }
            (None, None) => DEFAULT_TIMEOUT,
        };

        Ok(Self {
            debug: overrides.debug || file.debug,
            timeout,
            target: ServiceTarget {
                base_url: non_blank(overrides.service_url).or(non_blank(file.service.url)),
                authorization: non_blank(overrides.service_authorization)
                    .or(non_blank(file.service.authorization)),
            },
            compiler: CompilerOptions {
                collision_policy: overrides
                    .collision_policy
                    .or(file.collision_policy)
                    .unwrap_or_default(),
            },
        })
    }
}

fn non_blank(v: Option<String>) -> Option<String> {
    v.filter(|s| !s.trim().is_empty())
}

pub fn default_config_path() -> anyhow::Result<PathBuf> {
    let home = std::env::var("HOME").context("HOME is not set")?;
    Ok(PathBuf::from(home).join(".mcprox.yaml"))
}

/// Load the config file; a missing file yields defaults.
pub fn load_config(path: &Path) -> anyhow::Result<FileConfig> {
    let bytes = match std::fs::read(path) {
        Ok(b) => b,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(FileConfig::default()),
        Err(e) => return Err(e).with_context(|| format!("read config {}", path.display())),
    };
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(FileConfig::default());
    }
    let cfg: FileConfig =
        serde_yaml::from_slice(&bytes).with_context(|| format!("parse {}", path.display()))?;
    Ok(cfg)
}

/// Parse `"30"`, `"30s"`, `"1500ms"`, `"2m"` or `"1h"`.
pub fn parse_duration(s: &str) -> anyhow::Result<Duration> {
    let s = s.trim();
    let split = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    let (digits, unit) = s.split_at(split);
    if digits.is_empty() {
        bail!("expected a number, optionally followed by ms, s, m or h");
    }
    let n: u64 = digits.parse().context("duration out of range")?;
    let d = match unit.trim() {
        "" | "s" => Duration::from_secs(n),
        "ms" => Duration::from_millis(n),
        "m" => Duration::from_secs(n.saturating_mul(60)),
        "h" => Duration::from_secs(n.saturating_mul(3600)),
        other => bail!("unknown duration unit '{other}'"),
    };
    Ok(d)
}
