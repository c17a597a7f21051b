//! Access credential handed to the server process.

use super::ConfigError;

/// Secret passed to the server through its environment.
///
/// The value never appears in `Debug` output or logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    env_name: String,
    value: String,
}

impl Credential {
    /// Create a credential for environment variable `env_name`.
    #[must_use]
    pub fn new(env_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            env_name: env_name.into(),
            value: value.into(),
        }
    }

    /// Read the credential from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if the variable is unset or empty.
    pub fn from_env(env_name: &str) -> Result<Self, ConfigError> {
        Self::from_lookup(env_name, |name| std::env::var(name).ok())
    }

    /// Read the credential through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] if `lookup` yields nothing
    /// or an empty string.
    pub fn from_lookup<F>(env_name: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: FnOnce(&str) -> Option<String>,
    {
        match lookup(env_name) {
            Some(value) if !value.trim().is_empty() => Ok(Self::new(env_name, value)),
            _ => Err(ConfigError::MissingCredential {
                var: env_name.to_string(),
            }),
        }
    }

    /// Name of the environment variable carrying the credential.
    #[must_use]
    pub fn env_name(&self) -> &str {
        &self.env_name
    }

    /// The secret value.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("env_name", &self.env_name)
            .field("value", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_lookup_present() {
        let cred = Credential::from_lookup("TOKEN", |_| Some("ghp_abc".to_string())).unwrap();
        assert_eq!(cred.env_name(), "TOKEN");
        assert_eq!(cred.expose(), "ghp_abc");
    }

    #[test]
    fn test_from_lookup_missing() {
        let err = Credential::from_lookup("TOKEN", |_| None).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { ref var } if var == "TOKEN"));
        assert_eq!(err.to_string(), "Credential variable TOKEN is not set");
    }

    #[test]
    fn test_from_lookup_empty_is_missing() {
        let err = Credential::from_lookup("TOKEN", |_| Some("  ".to_string())).unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
    }

    #[test]
    fn test_debug_redacts_value() {
        let cred = Credential::new("TOKEN", "ghp_secret");
        let debug = format!("{cred:?}");
        assert!(debug.contains("TOKEN"));
        assert!(!debug.contains("ghp_secret"));
    }
}
