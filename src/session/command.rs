//! Server launch configuration.

use std::path::PathBuf;

use crate::config::{Credential, ServerConfig};

/// Builder for the command that starts the server process.
#[derive(Debug, Clone)]
pub struct ServerCommand {
    program: String,
    args: Vec<String>,
    env: Vec<(String, String)>,
    credential: Option<Credential>,
    working_dir: Option<PathBuf>,
}

impl ServerCommand {
    /// Create a command for `program` with no arguments.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: Vec::new(),
            credential: None,
            working_dir: None,
        }
    }

    /// Build the command described by `config`, passing `credential` to the server.
    #[must_use]
    pub fn from_config(config: &ServerConfig, credential: Credential) -> Self {
        let mut env: Vec<(String, String)> = config
            .env
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        env.sort();

        Self {
            program: config.program.clone(),
            args: config.args.clone(),
            env,
            credential: Some(credential),
            working_dir: config.working_dir.clone(),
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set an environment variable for the server.
    #[must_use]
    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }

    /// Pass an access credential to the server through its environment.
    #[must_use]
    pub fn credential(mut self, credential: Credential) -> Self {
        self.credential = Some(credential);
        self
    }

    /// Set the working directory for the server process.
    #[must_use]
    pub fn working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Get the program.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    /// Get the arguments.
    #[must_use]
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get the working directory, if set.
    #[must_use]
    pub fn get_working_dir(&self) -> Option<&PathBuf> {
        self.working_dir.as_ref()
    }

    /// Environment to apply, credential last so it cannot be overridden.
    #[must_use]
    pub fn build_env(&self) -> Vec<(String, String)> {
        let mut env = self.env.clone();
        if let Some(cred) = &self.credential {
            env.push((cred.env_name().to_string(), cred.expose().to_string()));
        }
        env
    }
}
