//! MCP line client - scripted JSON-RPC over stdio against MCP tool servers.

use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use mcp_line_client::config::{ConfigLoader, Credential, DriverConfig};
use mcp_line_client::display;
use mcp_line_client::rpc::Request;
use mcp_line_client::scenario::{self, Scenario, ScenarioRunner, StepEvent, BUILTIN_NAMES};
use mcp_line_client::session::{ServerCommand, ServerSession};
use mcp_line_client::tools;
use mcp_line_client::DriverError;

#[derive(Parser)]
#[command(
    name = "mcp-line",
    about = "Drive an MCP server over stdio with scripted JSON-RPC requests",
    version
)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to .mcp-line.toml, then the user config dir).
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a built-in scenario or a scenario TOML file.
    Run {
        /// Built-in name or path to a scenario file.
        scenario: String,
        /// Scenario variable, e.g. --var owner=octocat (repeatable).
        #[arg(long = "var", value_parser = parse_var)]
        vars: Vec<(String, String)>,
    },
    /// List the tools the server exposes.
    Tools,
    /// List the server's toolsets.
    Toolsets,
    /// Call one tool and print its decoded result.
    Call {
        /// Tool name.
        tool: String,
        /// Tool arguments as a JSON object.
        #[arg(long, default_value = "{}")]
        args: String,
        /// Response bound in milliseconds (defaults to the configured one).
        #[arg(long)]
        timeout_ms: Option<u64>,
    },
    /// List built-in scenarios.
    Scenarios,
}

fn parse_var(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{s}'")),
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            display::print_error(&e.to_string());
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool, DriverError> {
    let loader = cli.config.map_or_else(ConfigLoader::new, ConfigLoader::with_path);
    let config = loader.load()?;

    match cli.command {
        Commands::Scenarios => {
            for name in BUILTIN_NAMES {
                if let Some(s) = scenario::builtin(name) {
                    println!("{name:<18} {}", s.description);
                }
            }
            Ok(true)
        }
        Commands::Run { scenario, vars } => {
            // Resolve everything before the server starts.
            let scenario = prepare_scenario(&config, &scenario, vars)?;
            let mut session = start_session(&config).await?;
            let passed = run_scenario(&mut session, &scenario, config.timeouts.request()).await;
            finish_session(&mut session, &config).await;
            Ok(passed)
        }
        Commands::Tools => {
            let mut session = start_session(&config).await?;
            let result = list_tools(&mut session, config.timeouts.request()).await;
            finish_session(&mut session, &config).await;
            result
        }
        Commands::Toolsets => {
            let mut session = start_session(&config).await?;
            let result = list_toolsets(&mut session, config.timeouts.request()).await;
            finish_session(&mut session, &config).await;
            result
        }
        Commands::Call {
            tool,
            args,
            timeout_ms,
        } => {
            let arguments: Map<String, Value> = serde_json::from_str(&args)
                .map_err(|e| DriverError::InvalidArguments(e.to_string()))?;
            let timeout = timeout_ms.map_or(config.timeouts.request(), Duration::from_millis);
            let mut session = start_session(&config).await?;
            let result = call_tool(&mut session, &tool, arguments, timeout).await;
            finish_session(&mut session, &config).await;
            result
        }
    }
}

fn prepare_scenario(
    config: &DriverConfig,
    name: &str,
    cli_vars: Vec<(String, String)>,
) -> Result<Scenario, DriverError> {
    let scenario = scenario::resolve(name)?;

    let mut vars: HashMap<String, String> = scenario::default_vars();
    vars.extend(config.resolve_vars(|env| std::env::var(env).ok()));
    vars.extend(cli_vars);

    Ok(scenario::substitute(&scenario, &vars)?)
}

async fn start_session(config: &DriverConfig) -> Result<ServerSession, DriverError> {
    let credential = Credential::from_env(&config.server.credential_env)?;
    let command = ServerCommand::from_config(&config.server, credential);

    tracing::info!(program = %config.server.program, "Starting MCP server");
    let mut session = ServerSession::spawn(&command)?;
    session.wait_ready(config.server.startup_grace()).await?;
    Ok(session)
}

async fn finish_session(session: &mut ServerSession, config: &DriverConfig) {
    if let Err(e) = session.shutdown(config.server.shutdown_timeout()).await {
        tracing::warn!(error = %e, "Server shutdown failed");
    }
    display::print_session_stats(&session.stats());
}

async fn run_scenario(session: &mut ServerSession, scenario: &Scenario, timeout: Duration) -> bool {
    display::print_scenario_start(&scenario.name, &scenario.description, scenario.steps.len());

    let report = ScenarioRunner::new(timeout)
        .run_with(session, scenario, |event| match event {
            StepEvent::Started { index, step } => display::print_step_start(index, step),
            StepEvent::Finished(report) => display::print_step_result(report),
        })
        .await;

    display::print_scenario_summary(&report);
    report.is_success()
}

async fn list_tools(session: &mut ServerSession, timeout: Duration) -> Result<bool, DriverError> {
    let request = Request::tools_list(session.allocate_id());
    let result = session.send_request(&request, timeout).await?.into_result()?;
    display::print_tools(&tools::parse_tool_list(&result)?);
    Ok(true)
}

async fn list_toolsets(session: &mut ServerSession, timeout: Duration) -> Result<bool, DriverError> {
    let listings = tools::list_toolsets(session, timeout).await?;
    display::print_toolsets(&listings);
    Ok(listings.iter().all(|listing| listing.tools.is_ok()))
}

async fn call_tool(
    session: &mut ServerSession,
    tool: &str,
    arguments: Map<String, Value>,
    timeout: Duration,
) -> Result<bool, DriverError> {
    let request = Request::tools_call(session.allocate_id(), tool, arguments);
    let result = session.send_request(&request, timeout).await?.into_result()?;

    match tools::decode_tool_payload(&result) {
        Ok(payload) => display::print_payload(&payload),
        Err(tools::PayloadError::NotJson(_)) => {
            display::print_payload(&Value::String(tools::content_text(&result)?.to_string()));
        }
        Err(e) => return Err(e.into()),
    }
    Ok(true)
}
