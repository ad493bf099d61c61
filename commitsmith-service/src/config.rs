//! Settings read from `COMMITSMITH_` environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::options::DEFAULT_LOAD_TIMEOUT;

pub const LOG_LEVEL_VAR: &str = "COMMITSMITH_LOG_LEVEL";
pub const OPTIONS_TIMEOUT_VAR: &str = "COMMITSMITH_OPTIONS_TIMEOUT_MS";
pub const REDUCE_EMPTY_LINES_VAR: &str = "COMMITSMITH_REDUCE_EMPTY_LINES";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("unknown log level '{0}', expected one of: trace, debug, info, warn, error")]
    LogLevel(String),
    #[error("invalid {var} value '{value}', expected {expected}")]
    InvalidValue {
        var: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Log level matching the `tracing` levels. Defaults to `Warn`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    #[default]
    Warn,
    Error,
}

impl FromStr for LogLevel {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Ok(Self::Trace),
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "warn" | "warning" => Ok(Self::Warn),
            "error" => Ok(Self::Error),
            _ => Err(SettingsError::LogLevel(s.to_string())),
        }
    }
}

impl LogLevel {
    /// Filter directive for `tracing-subscriber`
    #[must_use]
    pub fn as_filter_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Runtime settings.
///
/// # Environment Variables
///
/// - `COMMITSMITH_LOG_LEVEL`: trace, debug, info, warn or error
/// - `COMMITSMITH_OPTIONS_TIMEOUT_MS`: time a dynamic options provider gets
/// - `COMMITSMITH_REDUCE_EMPTY_LINES`: overrides the form's own setting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub log_level: LogLevel,
    pub options_timeout: Duration,
    /// `None` leaves the form's `reduceEmptyLines` in charge
    pub reduce_empty_lines: Option<bool>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: LogLevel::default(),
            options_timeout: DEFAULT_LOAD_TIMEOUT,
            reduce_empty_lines: None,
        }
    }
}

impl Settings {
    /// Load settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, SettingsError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Load settings through `lookup`, falling back to defaults for unset
    /// or blank variables.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` if a variable holds an invalid value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SettingsError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |var: &str| lookup(var).filter(|value| !value.trim().is_empty());
        let mut settings = Self::default();

        if let Some(value) = read(LOG_LEVEL_VAR) {
            settings.log_level = value.parse()?;
        }

        if let Some(value) = read(OPTIONS_TIMEOUT_VAR) {
            let ms: u64 = value
                .trim()
                .parse()
                .map_err(|_| SettingsError::InvalidValue {
                    var: OPTIONS_TIMEOUT_VAR,
                    value: value.clone(),
                    expected: "a number of milliseconds",
                })?;
            settings.options_timeout = Duration::from_millis(ms);
        }

        if let Some(value) = read(REDUCE_EMPTY_LINES_VAR) {
            settings.reduce_empty_lines = Some(parse_bool(&value).ok_or_else(|| {
                SettingsError::InvalidValue {
                    var: REDUCE_EMPTY_LINES_VAR,
                    value: value.clone(),
                    expected: "true or false",
                }
            })?);
        }

        Ok(settings)
    }

    /// Apply CLI overrides on top of environment settings
    #[must_use]
    pub fn apply_overrides(
        mut self,
        log_level: Option<LogLevel>,
        reduce_empty_lines: Option<bool>,
    ) -> Self {
        if let Some(level) = log_level {
            self.log_level = level;
        }
        if reduce_empty_lines.is_some() {
            self.reduce_empty_lines = reduce_empty_lines;
        }
        self
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
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
        move |var| map.get(var).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[])).unwrap();

        assert_eq!(settings, Settings::default());
        assert_eq!(settings.log_level, LogLevel::Warn);
        assert_eq!(settings.options_timeout, Duration::from_millis(30_000));
        assert_eq!(settings.reduce_empty_lines, None);
    }

    #[test]
    fn test_reads_every_variable() {
        let settings = Settings::from_lookup(lookup(&[
            (LOG_LEVEL_VAR, "DEBUG"),
            (OPTIONS_TIMEOUT_VAR, "1500"),
            (REDUCE_EMPTY_LINES_VAR, "false"),
        ]))
        .unwrap();

        assert_eq!(settings.log_level, LogLevel::Debug);
        assert_eq!(settings.options_timeout, Duration::from_millis(1500));
        assert_eq!(settings.reduce_empty_lines, Some(false));
    }

    #[test]
    fn test_blank_values_use_defaults() {
        let settings = Settings::from_lookup(lookup(&[(LOG_LEVEL_VAR, "  ")])).unwrap();
        assert_eq!(settings.log_level, LogLevel::Warn);
    }

    #[test]
    fn test_invalid_values() {
        assert_eq!(
            Settings::from_lookup(lookup(&[(LOG_LEVEL_VAR, "loud")])),
            Err(SettingsError::LogLevel("loud".to_string()))
        );

        let err = Settings::from_lookup(lookup(&[(OPTIONS_TIMEOUT_VAR, "soon")])).unwrap_err();
        assert!(err.to_string().contains(OPTIONS_TIMEOUT_VAR));

        let err = Settings::from_lookup(lookup(&[(REDUCE_EMPTY_LINES_VAR, "maybe")])).unwrap_err();
        assert!(err.to_string().contains("true or false"));
    }

    #[test]
    fn test_overrides_take_precedence() {
        let settings = Settings::default().apply_overrides(Some(LogLevel::Trace), Some(true));
        assert_eq!(settings.log_level, LogLevel::Trace);
        assert_eq!(settings.reduce_empty_lines, Some(true));

        let untouched = settings.clone().apply_overrides(None, None);
        assert_eq!(untouched, settings);
    }

    #[test]
    fn test_log_level_filter_str() {
        assert_eq!("warning".parse::<LogLevel>().unwrap().as_filter_str(), "warn");
    }
}
