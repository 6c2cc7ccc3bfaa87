//! Service configuration, read once from the environment at startup.
//!
//! | Variable          | Default               |
//! |-------------------|-----------------------|
//! | `LISTEN_PORT`     | 3000                  |
//! | `PROMETHEUS_PORT` | 30000                 |
//! | `LANG_FILE`       | `data/cld_codes.json` |
//! | `STRIP_PREFIXES`  | `@,http`              |
//! | `LOG_FORMAT`      | `json`                |
//!
//! `LOG_FORMAT` is read on its own by [`log_format_from_env`], before the
//! subscriber exists, so the rest of config loading can log.

use std::path::PathBuf;

use tracing::warn;

use crate::normalize::DEFAULT_STRIP_PREFIXES;

/// Requests are truncated to this many bytes before parsing.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;
/// Processed objects per throughput log line.
pub const OBJECTS_PER_LOG: u64 = 1000;

pub const DEFAULT_LISTEN_PORT: u16 = 3000;
pub const DEFAULT_PROMETHEUS_PORT: u16 = 30000;
pub const DEFAULT_LANG_FILE: &str = "data/cld_codes.json";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown LOG_FORMAT {0:?}, expected \"json\" or \"pretty\"")]
    LogFormat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub listen_port: u16,
    pub prometheus_port: u16,
    pub lang_file: PathBuf,
    pub strip_prefixes: Vec<String>,
    pub body_limit_bytes: usize,
    pub objects_per_log: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_port: DEFAULT_LISTEN_PORT,
            prometheus_port: DEFAULT_PROMETHEUS_PORT,
            lang_file: PathBuf::from(DEFAULT_LANG_FILE),
            strip_prefixes: DEFAULT_STRIP_PREFIXES.iter().map(|p| p.to_string()).collect(),
            body_limit_bytes: BODY_LIMIT_BYTES,
            objects_per_log: OBJECTS_PER_LOG,
        }
    }
}

impl ServiceConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    /// Invalid ports are logged and replaced by their defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("LISTEN_PORT") {
            config.listen_port = parse_port("LISTEN_PORT", &raw, DEFAULT_LISTEN_PORT);
        }
        if let Some(raw) = lookup("PROMETHEUS_PORT") {
            config.prometheus_port = parse_port("PROMETHEUS_PORT", &raw, DEFAULT_PROMETHEUS_PORT);
        }
        if let Some(path) = lookup("LANG_FILE").filter(|p| !p.trim().is_empty()) {
            config.lang_file = PathBuf::from(path);
        }
        if let Some(raw) = lookup("STRIP_PREFIXES") {
            config.strip_prefixes = raw
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect();
        }
        config
    }
}

pub fn log_format_from_env() -> Result<LogFormat, ConfigError> {
    parse_log_format(&std::env::var("LOG_FORMAT").unwrap_or_default())
}

pub fn parse_log_format(raw: &str) -> Result<LogFormat, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" | "json" => Ok(LogFormat::Json),
        "pretty" | "text" => Ok(LogFormat::Pretty),
        _ => Err(ConfigError::LogFormat(raw.to_string())),
    }
}

fn parse_port(var: &str, raw: &str, default: u16) -> u16 {
    match raw.trim().parse::<u16>() {
        Ok(port) if port > 0 => port,
        _ => {
            warn!(
                provided = %raw,
                default,
                "Invalid {var} provided, continuing with default"
            );
            default
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_without_env() {
        let config = ServiceConfig::from_lookup(lookup(&[]));
        assert_eq!(config, ServiceConfig::default());
        assert_eq!(config.listen_port, 3000);
        assert_eq!(config.prometheus_port, 30000);
        assert_eq!(config.body_limit_bytes, 1_048_576);
        assert_eq!(config.strip_prefixes, vec!["@", "http"]);
    }

    #[test]
    fn overrides_apply() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("LISTEN_PORT", "8080"),
            ("PROMETHEUS_PORT", " 9100 "),
            ("LANG_FILE", "/etc/codes.json"),
            ("STRIP_PREFIXES", "@, #,,www."),
            ("LOG_FORMAT", "xml"),
        ]));
        assert_eq!(config.listen_port, 8080);
        assert_eq!(config.prometheus_port, 9100);
        assert_eq!(config.lang_file, PathBuf::from("/etc/codes.json"));
        assert_eq!(config.strip_prefixes, vec!["@", "#", "www."]);
    }

    #[test]
    fn invalid_ports_fall_back() {
        let config = ServiceConfig::from_lookup(lookup(&[
            ("LISTEN_PORT", "abc"),
            ("PROMETHEUS_PORT", "0"),
        ]));
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
        assert_eq!(config.prometheus_port, DEFAULT_PROMETHEUS_PORT);

        let config = ServiceConfig::from_lookup(lookup(&[("LISTEN_PORT", "70000")]));
        assert_eq!(config.listen_port, DEFAULT_LISTEN_PORT);
    }

    #[test]
    fn log_format_parsing() {
        assert_eq!(parse_log_format("").unwrap(), LogFormat::Json);
        assert_eq!(parse_log_format(" JSON ").unwrap(), LogFormat::Json);
        assert_eq!(parse_log_format("Pretty").unwrap(), LogFormat::Pretty);
        let err = parse_log_format("xml").unwrap_err();
        assert!(matches!(err, ConfigError::LogFormat(ref f) if f == "xml"));
    }
}
