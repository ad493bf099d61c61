//! Logging setup for the CLI.
//!
//! Logs go to stderr so compiled messages on stdout can be piped into
//! `git commit -F -`.

use commitsmith_service::Settings;
use tracing_subscriber::EnvFilter;

fn filter_from_settings(settings: &Settings) -> EnvFilter {
    EnvFilter::new(settings.log_level.as_filter_str())
}

/// Install the global subscriber at the configured level.
///
/// A subscriber that is already installed wins.
pub fn init_logging(settings: &Settings) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter_from_settings(settings))
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .finish();

    let _ = tracing::subscriber::set_global_default(subscriber);
}

#[cfg(test)]
mod tests {
    use super::*;
    use commitsmith_service::LogLevel;

    #[test]
    fn filter_follows_log_level() {
        let settings = Settings {
            log_level: LogLevel::Debug,
            ..Settings::default()
        };
        assert_eq!(filter_from_settings(&settings).to_string(), "debug");
    }

    #[test]
    fn init_twice_does_not_panic() {
        init_logging(&Settings::default());
        init_logging(&Settings::default());
    }
}
