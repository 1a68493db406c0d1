use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the pagepipe binary.
#[derive(Debug, Parser)]
#[command(
    name = "pagepipe",
    version,
    about = "Progressive pagelet delivery server"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "PAGEPIPE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Serve the demo page over HTTP.
    Serve(Box<ServeArgs>),
    /// Render the demo page once to standard output.
    Render(RenderArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub overrides: CommonOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    #[command(flatten)]
    pub common: CommonOverrides,

    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,
}

/// Flags shared by every subcommand.
#[derive(Debug, Args, Default, Clone)]
pub struct CommonOverrides {
    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Toggle pipelined delivery; when off, pagelets are inlined in place.
    #[arg(
        long = "pipeline-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub pipeline_enabled: Option<bool>,

    /// Toggle debug mode (phase diagnostics and simulated jitter).
    #[arg(
        long = "pipeline-debug",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub pipeline_debug: Option<bool>,

    /// Toggle construction-time instrumentation; defaults to the debug flag.
    #[arg(
        long = "instrumentation",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub instrumentation: Option<bool>,
}
