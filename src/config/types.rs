//! Configuration types.

use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::rpc::DEFAULT_REQUEST_TIMEOUT;
use crate::session::DEFAULT_SHUTDOWN_TIMEOUT;

/// How to launch the server process.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Program to execute.
    #[serde(default = "default_program")]
    pub program: String,
    /// Arguments passed to the program.
    #[serde(default = "default_args")]
    pub args: Vec<String>,
    /// Environment variable holding the access credential.
    #[serde(default = "default_credential_env")]
    pub credential_env: String,
    /// Extra environment variables for the server.
    #[serde(default)]
    pub env: HashMap<String, String>,
    /// Directory the server runs in; inherited when unset.
    #[serde(default)]
    pub working_dir: Option<PathBuf>,
    /// Time the server gets to come up before the first request.
    #[serde(default = "default_startup_grace_ms")]
    pub startup_grace_ms: u64,
    /// Bound on waiting for the server to exit after termination is requested.
    #[serde(default = "default_shutdown_timeout_ms")]
    pub shutdown_timeout_ms: u64,
}

fn default_program() -> String {
    "docker".to_string()
}

fn default_args() -> Vec<String> {
    [
        "run",
        "--rm",
        "-i",
        "-e",
        "GITHUB_PERSONAL_ACCESS_TOKEN",
        "-w",
        "/server",
        "ghcr.io/github/github-mcp-server:latest",
        "./github-mcp-server",
        "stdio",
        "--enable-command-logging",
        "--dynamic-toolsets",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_credential_env() -> String {
    "GITHUB_PERSONAL_ACCESS_TOKEN".to_string()
}

fn default_startup_grace_ms() -> u64 {
    1000
}

fn default_shutdown_timeout_ms() -> u64 {
    u64::try_from(DEFAULT_SHUTDOWN_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}

impl ServerConfig {
    /// Startup grace period as a [`Duration`].
    #[must_use]
    pub fn startup_grace(&self) -> Duration {
        Duration::from_millis(self.startup_grace_ms)
    }

    /// Shutdown bound as a [`Duration`].
    #[must_use]
    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            program: default_program(),
            args: default_args(),
            credential_env: default_credential_env(),
            env: HashMap::new(),
            working_dir: None,
            startup_grace_ms: default_startup_grace_ms(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
        }
    }
}

/// Wait bounds for requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Default bound on waiting for a response line.
    #[serde(default = "default_request_ms")]
    pub request_ms: u64,
}

fn default_request_ms() -> u64 {
    u64::try_from(DEFAULT_REQUEST_TIMEOUT.as_millis()).unwrap_or(u64::MAX)
}

impl TimeoutConfig {
    /// Default request bound as a [`Duration`].
    #[must_use]
    pub fn request(&self) -> Duration {
        Duration::from_millis(self.request_ms)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: default_request_ms(),
        }
    }
}

/// Top-level driver configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriverConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub timeouts: TimeoutConfig,
    /// Literal scenario variables.
    #[serde(default)]
    pub vars: HashMap<String, String>,
    /// Scenario variables read from environment variables (variable -> env name).
    #[serde(default = "default_var_env")]
    pub var_env: HashMap<String, String>,
}

fn default_var_env() -> HashMap<String, String> {
    HashMap::from([("owner".to_string(), "GITHUB_USERNAME".to_string())])
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            timeouts: TimeoutConfig::default(),
            vars: HashMap::new(),
            var_env: default_var_env(),
        }
    }
}

impl DriverConfig {
    /// Resolve scenario variables.
    ///
    /// Environment-backed variables are read through `lookup`; literal
    /// `vars` take precedence over them.
    pub fn resolve_vars<F>(&self, lookup: F) -> HashMap<String, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut vars: HashMap<String, String> = self
            .var_env
            .iter()
            .filter_map(|(name, env)| lookup(env).map(|value| (name.clone(), value)))
            .collect();
        vars.extend(self.vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        vars
    }
}
