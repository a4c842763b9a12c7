//! Configuration file parsing and structures.
//!
//! fppbridge uses a single TOML file. Each integration owns the shape of its
//! own section under `[integrations]`.

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;
use tracing_subscriber::filter::LevelFilter;

use super::diagnostics::ValidationError;
use super::diagnostics::format_parse_error;
use super::diagnostics::format_validation_errors;

/// Top-level configuration structure
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub integrations: IntegrationsConfig,
}

#[derive(
    Debug,
    Default,
    Deserialize,
    Serialize,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => LevelFilter::TRACE,
            LogLevel::Debug => LevelFilter::DEBUG,
            LogLevel::Info => LevelFilter::INFO,
            LogLevel::Warn => LevelFilter::WARN,
            LogLevel::Error => LevelFilter::ERROR,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default)]
    pub level: LogLevel,

    /// Per-target levels, e.g. `"fppbridge::integrations::fpp" = "debug"`
    #[serde(default)]
    pub overrides: HashMap<String, LogLevel>,
}

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8565
}

fn default_true() -> bool {
    true
}

/// HTTP API configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Address to listen on (default: 127.0.0.1)
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Port to listen on (default: 8565)
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            listen: default_listen(),
            port: default_port(),
        }
    }
}

/// Integration configuration container
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IntegrationsConfig {
    /// Falcon Pi Player integration
    #[cfg(feature = "integration_fpp")]
    #[serde(default)]
    pub fpp: Option<crate::integrations::fpp::FppConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {}", .0.display(), .1)]
    Io(PathBuf, #[source] std::io::Error),

    #[error("Failed to parse TOML in {}: {}", path.display(), error.message())]
    Parse {
        path: PathBuf,
        content: String,
        #[source]
        error: toml::de::Error,
    },

    #[error(
        "Invalid configuration in {}: {}",
        path.display(),
        errors.iter().map(|e| e.to_string()).collect::<Vec<_>>().join("; ")
    )]
    Validation {
        path: PathBuf,
        content: String,
        errors: Vec<ValidationError>,
    },
}

impl ConfigError {
    /// Render the error for a terminal, with source annotations where available
    pub fn report(&self) -> String {
        match self {
            ConfigError::Io(..) => format!("{}\n", self),
            ConfigError::Parse {
                path,
                content,
                error,
            } => format_parse_error(path, content, error),
            ConfigError::Validation {
                path,
                content,
                errors,
            } => format_validation_errors(path, content, errors),
        }
    }
}

impl Config {
    /// Load and validate configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;

        Self::parse(path, contents)
    }

    /// Parse and validate configuration text. `path` is only used for reporting.
    pub fn parse(path: impl AsRef<Path>, contents: String) -> Result<Self, ConfigError> {
        let path = path.as_ref().to_path_buf();

        let config: Config = match toml::from_str(&contents) {
            Ok(c) => c,
            Err(error) => {
                return Err(ConfigError::Parse {
                    path,
                    content: contents,
                    error,
                });
            }
        };

        let errors = config.validate();
        if errors.is_empty() {
            Ok(config)
        } else {
            Err(ConfigError::Validation {
                path,
                content: contents,
                errors,
            })
        }
    }

    /// Validate cross-field constraints, collecting every error
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        if self.api.enabled && self.api.port == 0 {
            errors.push(ValidationError::new(
                "api.port",
                "port must be greater than zero",
            ));
        }

        #[cfg(feature = "integration_fpp")]
        if let Some(fpp) = &self.integrations.fpp {
            fpp.validate("integrations.fpp", &mut errors);
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_parse_empty_config_uses_defaults() {
        let config = Config::parse("fppbridge.toml", String::new()).unwrap();
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.logging.overrides.is_empty());
        assert!(config.api.enabled);
        assert_eq!(config.api.listen, "127.0.0.1");
        assert_eq!(config.api.port, 8565);
    }

    #[test]
    fn test_parse_logging_overrides() {
        let toml = r#"
            [logging]
            level = "warn"

            [logging.overrides]
            "fppbridge::integrations::fpp" = "debug"
        "#;

        let config = Config::parse("fppbridge.toml", toml.to_string()).unwrap();
        assert_eq!(config.logging.level, LogLevel::Warn);
        assert_eq!(
            config.logging.overrides.get("fppbridge::integrations::fpp"),
            Some(&LogLevel::Debug)
        );
    }

    #[test]
    #[cfg(feature = "integration_fpp")]
    fn test_parse_fpp_players() {
        let toml = r#"
            [integrations.fpp]
            scan_interval_secs = 5

            [integrations.fpp.players.garage]
            host = "192.168.1.50"
            name = "Garage Show"
            repeat_topic = "fpp/falcon/player/FPP/playlist/repeat/set"

            [integrations.fpp.players.porch]
            host = "porch.local:8080"
        "#;

        let config = Config::parse("fppbridge.toml", toml.to_string()).unwrap();
        let fpp = config.integrations.fpp.as_ref().unwrap();
        assert_eq!(fpp.scan_interval_secs, 5);
        assert_eq!(fpp.players.len(), 2);

        let garage = fpp.players.get("garage").unwrap();
        assert_eq!(garage.host.get_ref(), "192.168.1.50");
        assert_eq!(garage.name, "Garage Show");
        assert!(garage.repeat_topic.is_some());

        let porch = fpp.players.get("porch").unwrap();
        assert_eq!(porch.name, "Falcon Pi Player");
        assert_eq!(porch.repeat_topic, None);
    }

    #[test]
    fn test_unknown_field_rejected() {
        let toml = r#"
            [api]
            bind = "0.0.0.0"
        "#;

        let err = Config::parse("fppbridge.toml", toml.to_string()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.report().contains("Failed to parse 'fppbridge.toml'"));
    }

    #[test]
    #[cfg(feature = "integration_fpp")]
    fn test_validation_collects_all_errors() {
        let toml = r#"
            [api]
            port = 0

            [integrations.fpp]
            scan_interval_secs = 0

            [integrations.fpp.players.garage]
            host = ""
        "#;

        let err = Config::parse("fppbridge.toml", toml.to_string()).unwrap_err();
        let ConfigError::Validation { errors, .. } = &err else {
            panic!("expected validation error, got {:?}", err);
        };
        let paths: Vec<&str> = errors.iter().map(|e| e.field_path.as_str()).collect();
        assert!(paths.contains(&"api.port"));
        assert!(paths.contains(&"integrations.fpp.scan_interval_secs"));
        assert!(paths.contains(&"integrations.fpp.players.garage.host"));

        let report = err.report();
        assert!(report.contains("host must not be empty"));
    }

    #[test]
    #[cfg(feature = "integration_fpp")]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[integrations.fpp.players.garage]
host = "fpp.local"
"#
        )
        .unwrap();

        let config = Config::from_file(file.path()).unwrap();
        let fpp = config.integrations.fpp.unwrap();
        assert_eq!(fpp.scan_interval_secs, 10);
        assert_eq!(fpp.players["garage"].host.get_ref(), "fpp.local");
    }

    #[test]
    fn test_missing_file_error() {
        let result = Config::from_file("/nonexistent/fppbridge.toml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::Io(..)));

        let msg = err.to_string();
        assert!(msg.contains("Failed to read"));
        assert!(msg.contains("/nonexistent/fppbridge.toml"));
    }
}
