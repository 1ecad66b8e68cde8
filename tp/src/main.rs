//! ToolPipe - MCP tool server
//!
//! CLI entry point: serve MCP over stdio, list tools, or invoke one tool.

use std::fs;
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use serde_json::{Map, Value};
use tracing::{debug, info};

use toolpipe::cli::{Cli, Command, OutputFormat, get_log_path};
use toolpipe::config::Config;
use toolpipe::pipeline::{Pipeline, ToolInvocationRequest};
use toolpipe::server::McpServer;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Logs go to a file: stdout carries the protocol when serving
    let log_path = get_log_path();
    if let Some(log_dir) = log_path.parent() {
        fs::create_dir_all(log_dir).context("Failed to create log directory")?;
    }

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(&log_path).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    let pipeline = Arc::new(Pipeline::from_config(&config));
    info!(tools = pipeline.registry().len(), "toolpipe loaded config");

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        None | Some(Command::Serve) => cmd_serve(&config, pipeline).await,
        Some(Command::Tools { format }) => cmd_tools(&pipeline, format),
        Some(Command::Call { name, args }) => cmd_call(&pipeline, name, args.as_deref()).await,
    }
}

async fn cmd_serve(config: &Config, pipeline: Arc<Pipeline>) -> Result<()> {
    debug!(name = %config.server.name, "cmd_serve: called");
    McpServer::new(pipeline, config.server.name.clone()).serve_stdio().await
}

fn cmd_tools(pipeline: &Pipeline, format: OutputFormat) -> Result<()> {
    debug!(%format, "cmd_tools: called");
    let definitions = pipeline.definitions();

    match format {
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&definitions).context("Failed to serialize tool list")?;
            println!("{}", json);
        }
        OutputFormat::Text => {
            println!("{}", "Available tools:".bold());
            println!();
            for def in &definitions {
                let marker = if def.cacheable { " (cached)".dimmed().to_string() } else { String::new() };
                println!("  {}{}", def.name.cyan(), marker);
                println!("    {}", def.description);
            }
        }
    }
    Ok(())
}

async fn cmd_call(pipeline: &Pipeline, name: String, args: Option<&str>) -> Result<()> {
    debug!(%name, ?args, "cmd_call: called");
    let arguments = match args {
        Some(raw) => match serde_json::from_str::<Value>(raw).context("--args is not valid JSON")? {
            Value::Object(map) => map,
            _ => return Err(eyre::eyre!("--args must be a JSON object")),
        },
        None => Map::new(),
    };

    match pipeline.invoke(ToolInvocationRequest::new(name, arguments)).await {
        Ok(output) => {
            println!("{}", output.text);
            Ok(())
        }
        Err(e) => {
            eprintln!("{} {}", format!("{}:", e.kind()).red(), e);
            Err(eyre::eyre!("tool call failed with code {}", e.code()))
        }
    }
}
