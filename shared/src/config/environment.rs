//! Deployment environment and the log output it implies

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Where the token managers are deployed
///
/// Only affects logging defaults; cache and lease behaviour are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    /// Read `ENVIRONMENT`, then `RUST_ENV`; unknown or missing means development
    pub fn from_env() -> Self {
        ["ENVIRONMENT", "RUST_ENV"]
            .iter()
            .find_map(|name| std::env::var(name).ok())
            .and_then(|value| value.parse().ok())
            .unwrap_or_default()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            other => Err(format!("unknown environment '{}'", other)),
        }
    }
}

/// Settings for the `tracing` subscriber installed by `tk_infra::init_tracing`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `tk_core=debug,tk_infra=warn`
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: LogFormat,

    /// ANSI colours for the pretty and compact formats
    #[serde(default = "default_colored")]
    pub colored: bool,

    /// Emit file and line of each event
    #[serde(default)]
    pub source_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_environment(Environment::Development)
    }
}

impl LoggingConfig {
    /// Defaults per environment
    ///
    /// Development logs every lease and cache decision in readable form.
    /// Deployed environments log JSON; production keeps only warnings, which
    /// still covers shared-tier failover and lease timeouts.
    pub fn for_environment(env: Environment) -> Self {
        let (level, format) = match env {
            Environment::Development => ("debug", LogFormat::Pretty),
            Environment::Staging => ("info", LogFormat::Json),
            Environment::Production => ("warn", LogFormat::Json),
        };
        let local = env == Environment::Development;
        Self {
            level: level.to_string(),
            format,
            colored: local,
            source_location: local,
        }
    }

    /// Environment defaults, with `LOG_LEVEL` / `LOG_FORMAT` overrides
    pub fn from_env(env: Environment) -> Self {
        let mut config = Self::for_environment(env);
        if let Ok(level) = std::env::var("LOG_LEVEL") {
            config.level = level;
        }
        if let Some(format) = std::env::var("LOG_FORMAT")
            .ok()
            .and_then(|f| f.parse().ok())
        {
            config.format = format;
        }
        config
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            other => Err(format!("unknown log format '{}'", other)),
        }
    }
}

fn default_log_format() -> LogFormat {
    LogFormat::Pretty
}

fn default_colored() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_aliases() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Development);
        assert_eq!(" Stage ".parse::<Environment>().unwrap(), Environment::Staging);
        assert_eq!("prod".parse::<Environment>().unwrap(), Environment::Production);
        assert!("qa".parse::<Environment>().is_err());
        assert_eq!(Environment::Production.to_string(), "production");
    }

    #[test]
    fn test_deployed_environments_log_json() {
        let dev = LoggingConfig::for_environment(Environment::Development);
        assert_eq!(dev.level, "debug");
        assert_eq!(dev.format, LogFormat::Pretty);
        assert!(dev.colored && dev.source_location);

        for env in [Environment::Staging, Environment::Production] {
            let config = LoggingConfig::for_environment(env);
            assert_eq!(config.format, LogFormat::Json);
            assert!(!config.colored);
        }
        assert_eq!(LoggingConfig::for_environment(Environment::Production).level, "warn");
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
