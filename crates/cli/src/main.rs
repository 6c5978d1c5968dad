//! `mcprox`: compile an `OpenAPI` document into MCP tools, then plan or call them.

mod config;
mod fetch;

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand, ValueEnum};
use config::{Overrides, Settings, default_config_path, load_config, parse_duration};
use mcprox_http_tools::runtime::HttpInvoker;
use mcprox_http_tools::safety::OutboundPolicy;
use mcprox_openapi_tools::catalog::ToolCatalog;
use mcprox_openapi_tools::config::CollisionPolicy;
use serde_json::{Map, Value, json};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mcprox", version)]
#[command(about = "Turn OpenAPI documents into MCP tools", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.mcprox.yaml)
    #[arg(long, global = true, env = "MCPROX_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Debug logging
    #[arg(long, global = true)]
    debug: bool,

    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    /// Base URL of the API the tools call
    #[arg(long, global = true, env = "MCPROX_SERVICE_URL")]
    service_url: Option<String>,

    /// Value sent as the Authorization header
    #[arg(long, global = true, env = "MCPROX_SERVICE_AUTH", hide_env_values = true)]
    service_auth: Option<String>,

    /// Per-request timeout (e.g. 30s, 1500ms)
    #[arg(long, global = true, env = "MCPROX_CLIENT_TIMEOUT", value_parser = parse_timeout)]
    timeout: Option<Duration>,

    #[arg(long, global = true, value_enum)]
    collision_policy: Option<CollisionPolicyArg>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the compiled tool catalog
    Tools {
        /// Document URL or path (JSON or YAML)
        document: String,
        #[arg(long, value_enum, default_value_t = ToolsFormat::Definitions)]
        format: ToolsFormat,
    },
    /// Print the HTTP request a tool call would send
    Plan {
        document: String,
        tool: String,
        /// Call arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,
    },
    /// Call a tool against the configured service
    Call {
        document: String,
        tool: String,
        #[arg(long, default_value = "{}")]
        args: String,
        /// Block private networks, cap response size and disable redirects
        #[arg(long)]
        restrict_outbound: bool,
        /// Only allow these hosts (repeatable)
        #[arg(long = "allow-host")]
        allow_hosts: Vec<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum ToolsFormat {
    /// Tool definitions as exported for code emitters
    Definitions,
    /// MCP `tools/list` entries
    Mcp,
    /// Duplicate ids and parameter names
    Collisions,
}

#[derive(Clone, Copy, ValueEnum)]
enum CollisionPolicyArg {
    Warn,
    Fail,
}

impl From<CollisionPolicyArg> for CollisionPolicy {
    fn from(value: CollisionPolicyArg) -> Self {
        match value {
            CollisionPolicyArg::Warn => CollisionPolicy::Warn,
            CollisionPolicyArg::Fail => CollisionPolicy::Fail,
        }
    }
}

fn parse_timeout(s: &str) -> Result<Duration, String> {
    parse_duration(s).map_err(|e| e.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = match &cli.config {
        Some(p) => p.clone(),
        None => default_config_path()?,
    };
    let file = load_config(&config_path)?;
    let settings = Settings::resolve(
        Overrides {
            debug: cli.debug,
            timeout: cli.timeout,
            service_url: cli.service_url.clone(),
            service_authorization: cli.service_auth.clone(),
            collision_policy: cli.collision_policy.map(Into::into),
        },
        file,
    )?;

    init_logging(&cli.log_level, settings.debug, cli.log_format);
    tracing::debug!(config = %config_path.display(), "configuration loaded");

    match cli.command {
        Command::Tools { document, format } => {
            let catalog = compile(&document, &settings).await?;
            let out = match format {
                ToolsFormat::Definitions => serde_json::to_string_pretty(catalog.tools())?,
                ToolsFormat::Mcp => serde_json::to_string_pretty(&catalog.list_tools())?,
                ToolsFormat::Collisions => serde_json::to_string_pretty(catalog.collisions())?,
            };
            println!("{out}");
        }
        Command::Plan {
            document,
            tool,
            args,
        } => {
            let catalog = compile(&document, &settings).await?;
            let args = parse_args(&args)?;
            let request = catalog.plan(&tool, &args, &settings.target)?;
            let headers: Map<String, Value> = request
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect();
            let out = json!({
                "method": request.method,
                "url": request.url,
                "headers": headers,
                "body": request.body_text(),
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
        Command::Call {
            document,
            tool,
            args,
            restrict_outbound,
            allow_hosts,
        } => {
            let catalog = compile(&document, &settings).await?;
            let args = parse_args(&args)?;
            let policy = if restrict_outbound {
                OutboundPolicy::restricted()
            } else {
                OutboundPolicy::permissive()
            }
            .with_allowed_hosts(allow_hosts);
            let invoker = HttpInvoker::new_with_policy(settings.timeout, policy)?;
            let result = catalog
                .call_tool(&tool, &args, &settings.target, &invoker)
                .await?;
            for content in &result.content {
                if let Some(text) = content.as_text() {
                    println!("{}", text.text);
                }
            }
        }
    }

    Ok(())
}

async fn compile(document: &str, settings: &Settings) -> Result<ToolCatalog> {
    let bytes = fetch::load_document_bytes(document, settings.timeout).await?;
    ToolCatalog::from_document_bytes(&bytes, &settings.compiler)
        .with_context(|| format!("compile {document}"))
}

fn parse_args(raw: &str) -> Result<Value> {
    serde_json::from_str(raw).context("--args must be a JSON object")
}

/// Logs go to stderr so stdout only carries command output.
fn init_logging(level: &str, debug: bool, format: LogFormat) {
    let default = if debug { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}
