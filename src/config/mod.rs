//! Configuration layer: typed settings with layered precedence (file → env → CLI).

mod cli;

use std::{net::SocketAddr, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::DebugJitter;

pub use cli::{CliArgs, Command, CommonOverrides, RenderArgs, ServeArgs, ServeOverrides};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "pagepipe";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_RUNTIME_SCRIPT_URL: &str = "/static/bigpipe.js";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub pipeline: PipelineSettings,
    pub page: PageSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSettings {
    pub enabled: bool,
    pub debug: bool,
    pub instrumentation: bool,
    pub pretty_debug_json: bool,
    pub debug_jitter: DebugJitter,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageSettings {
    pub runtime_script_url: String,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("PAGEPIPE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Render(args)) => raw.apply_common_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    pipeline: RawPipelineSettings,
    page: RawPageSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }

        self.apply_common_overrides(&overrides.common);
    }

    fn apply_common_overrides(&mut self, overrides: &CommonOverrides) {
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(enabled) = overrides.pipeline_enabled {
            self.pipeline.enabled = Some(enabled);
        }
        if let Some(debug) = overrides.pipeline_debug {
            self.pipeline.debug = Some(debug);
        }
        if let Some(instrumentation) = overrides.instrumentation {
            self.pipeline.instrumentation = Some(instrumentation);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            pipeline,
            page,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let pipeline = build_pipeline_settings(pipeline)?;
        let page = build_page_settings(page)?;

        Ok(Self {
            server,
            logging,
            pipeline,
            page,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    Ok(ServerSettings { addr })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_pipeline_settings(pipeline: RawPipelineSettings) -> Result<PipelineSettings, LoadError> {
    let debug = pipeline.debug.unwrap_or(false);

    let min_ms = pipeline
        .debug_delay_min_ms
        .unwrap_or(DebugJitter::DEFAULT_MIN_MS);
    let max_ms = pipeline
        .debug_delay_max_ms
        .unwrap_or(DebugJitter::DEFAULT_MAX_MS);
    let debug_jitter = DebugJitter::new(min_ms, max_ms).ok_or_else(|| {
        LoadError::invalid(
            "pipeline.debug_delay_min_ms",
            format!("minimum {min_ms} exceeds maximum {max_ms}"),
        )
    })?;

    Ok(PipelineSettings {
        enabled: pipeline.enabled.unwrap_or(true),
        debug,
        instrumentation: pipeline.instrumentation.unwrap_or(debug),
        pretty_debug_json: pipeline.pretty_debug_json.unwrap_or(true),
        debug_jitter,
    })
}

fn build_page_settings(page: RawPageSettings) -> Result<PageSettings, LoadError> {
    let runtime_script_url = page
        .runtime_script_url
        .map(|value| value.trim().to_string())
        .unwrap_or_else(|| DEFAULT_RUNTIME_SCRIPT_URL.to_string());
    if runtime_script_url.is_empty() {
        return Err(LoadError::invalid(
            "page.runtime_script_url",
            "url must not be empty",
        ));
    }

    Ok(PageSettings { runtime_script_url })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPipelineSettings {
    enabled: Option<bool>,
    debug: Option<bool>,
    instrumentation: Option<bool>,
    pretty_debug_json: Option<bool>,
    debug_delay_min_ms: Option<u64>,
    debug_delay_max_ms: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawPageSettings {
    runtime_script_url: Option<String>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                addr: SocketAddr::from(([127, 0, 0, 1], DEFAULT_PORT)),
            },
            logging: LoggingSettings {
                level: LevelFilter::INFO,
                format: LogFormat::Compact,
            },
            pipeline: PipelineSettings {
                enabled: true,
                debug: false,
                instrumentation: false,
                pretty_debug_json: true,
                debug_jitter: DebugJitter::default(),
            },
            page: PageSettings {
                runtime_script_url: DEFAULT_RUNTIME_SCRIPT_URL.to_string(),
            },
        }
    }
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
