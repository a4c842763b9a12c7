use std::collections::BTreeMap;

use serde::Deserialize;

use crate::config::ValidationError;

/// Display name used when a player does not set one
pub const DEFAULT_NAME: &str = "Falcon Pi Player";

fn default_name() -> String {
    DEFAULT_NAME.to_string()
}

fn default_scan_interval_secs() -> u64 {
    10
}

fn default_probe_timeout_ms() -> u64 {
    2000
}

/// Configuration for the Falcon Pi Player integration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Seconds between status polls (default: 10)
    #[serde(default = "default_scan_interval_secs")]
    pub scan_interval_secs: u64,

    /// Players keyed by id. Each becomes entity `media_player.<id>`.
    #[serde(default)]
    pub players: BTreeMap<String, PlayerConfig>,
}

/// A single FPP instance
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlayerConfig {
    /// Hostname or IP address, optionally with `:port`
    pub host: toml::Spanned<String>,

    /// Display name (default: "Falcon Pi Player")
    #[serde(default = "default_name")]
    pub name: String,

    /// MQTT topic FPP republishes to toggle playlist repeat.
    /// Repeat control is only offered when this is set.
    #[serde(default)]
    pub repeat_topic: Option<String>,

    /// Timeout for the reachability probe (default: 2000)
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,

    /// Timeout for HTTP requests. Unset means requests never time out.
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

impl Config {
    /// Check values serde cannot, appending to `errors`
    pub fn validate(&self, prefix: &str, errors: &mut Vec<ValidationError>) {
        if self.scan_interval_secs == 0 {
            errors.push(ValidationError::new(
                format!("{}.scan_interval_secs", prefix),
                "must be greater than zero",
            ));
        }

        for (id, player) in &self.players {
            player.validate(&format!("{}.players.{}", prefix, id), errors);
        }
    }
}

impl PlayerConfig {
    fn validate(&self, prefix: &str, errors: &mut Vec<ValidationError>) {
        let host = self.host.get_ref().trim();
        let host_error = if host.is_empty() {
            Some("host must not be empty")
        } else if host.contains("://") {
            Some("host must not include a scheme; use e.g. \"192.168.1.50\"")
        } else if host.contains('/') {
            Some("host must be a hostname or host:port, without a path")
        } else if host.matches(':').count() > 1 && !host.starts_with('[') {
            Some("IPv6 addresses must be bracketed, e.g. \"[fe80::1]\" or \"[fe80::1]:8080\"")
        } else {
            None
        };

        if let Some(message) = host_error {
            errors.push(
                ValidationError::new(format!("{}.host", prefix), message)
                    .with_span(self.host.span()),
            );
        }

        if self.probe_timeout_ms == 0 {
            errors.push(ValidationError::new(
                format!("{}.probe_timeout_ms", prefix),
                "must be greater than zero",
            ));
        }

        if self.request_timeout_secs == Some(0) {
            errors.push(ValidationError::new(
                format!("{}.request_timeout_secs", prefix),
                "must be greater than zero; omit it to disable the timeout",
            ));
        }

        if self.repeat_topic.as_deref().is_some_and(|t| t.trim().is_empty()) {
            errors.push(ValidationError::new(
                format!("{}.repeat_topic", prefix),
                "must not be empty; omit it to disable repeat control",
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(toml: &str) -> Config {
        toml::from_str(toml).unwrap()
    }

    fn validate(config: &Config) -> Vec<ValidationError> {
        let mut errors = Vec::new();
        config.validate("integrations.fpp", &mut errors);
        errors
    }

    #[test]
    fn test_defaults() {
        let config = parse(
            r#"
            [players.garage]
            host = "192.168.1.50"
            "#,
        );

        assert_eq!(config.scan_interval_secs, 10);
        let garage = &config.players["garage"];
        assert_eq!(garage.name, DEFAULT_NAME);
        assert_eq!(garage.probe_timeout_ms, 2000);
        assert_eq!(garage.request_timeout_secs, None);
        assert_eq!(garage.repeat_topic, None);
        assert!(validate(&config).is_empty());
    }

    #[test]
    fn test_host_is_required() {
        let result = toml::from_str::<Config>(
            r#"
            [players.garage]
            name = "Garage"
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_host_with_scheme_rejected_with_span() {
        let toml = r#"
            [players.garage]
            host = "http://192.168.1.50"
            "#;
        let config = parse(toml);
        let errors = validate(&config);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field_path, "integrations.fpp.players.garage.host");
        assert!(errors[0].message.contains("scheme"));

        let span = errors[0].span.clone().unwrap();
        assert!(toml[span].contains("http://192.168.1.50"));
    }

    #[test]
    fn test_unbracketed_ipv6_rejected() {
        let config = parse(
            r#"
            [players.garage]
            host = "fe80::1"

            [players.porch]
            host = "[fe80::2]:8080"
            "#,
        );
        let errors = validate(&config);

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field_path, "integrations.fpp.players.garage.host");
        assert!(errors[0].message.contains("bracketed"));
        assert!(errors[0].span.is_some());
    }

    #[test]
    fn test_zero_timeouts_and_empty_topic_rejected() {
        let config = parse(
            r#"
            [players.garage]
            host = "fpp.local"
            probe_timeout_ms = 0
            request_timeout_secs = 0
            repeat_topic = " "
            "#,
        );

        let paths: Vec<String> = validate(&config)
            .into_iter()
            .map(|e| e.field_path)
            .collect();
        assert_eq!(
            paths,
            vec![
                "integrations.fpp.players.garage.probe_timeout_ms".to_string(),
                "integrations.fpp.players.garage.request_timeout_secs".to_string(),
                "integrations.fpp.players.garage.repeat_topic".to_string(),
            ]
        );
    }
}
