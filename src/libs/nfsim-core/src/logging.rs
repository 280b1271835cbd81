//! Logging setup
//!
//! All components log through the `log` facade. The process installs one
//! `env_logger` backend at startup with the level taken from configuration.

use serde::{Deserialize, Serialize};

/// Logger configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level (trace, debug, info, warn, error)
    pub level: String,
    /// Disable ANSI colours
    pub no_color: bool,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
            no_color: false,
        }
    }
}

/// Map a level name to a filter. Unknown names fall back to `Info`.
pub fn parse_level(level: &str) -> log::LevelFilter {
    match level.to_lowercase().as_str() {
        "trace" => log::LevelFilter::Trace,
        "debug" => log::LevelFilter::Debug,
        "info" => log::LevelFilter::Info,
        "warn" | "warning" => log::LevelFilter::Warn,
        "error" => log::LevelFilter::Error,
        "off" | "none" => log::LevelFilter::Off,
        _ => log::LevelFilter::Info,
    }
}

/// Install the process-wide logger.
///
/// Fails if a logger is already installed.
pub fn init_logging(config: &LogConfig) -> Result<(), log::SetLoggerError> {
    let mut builder = env_logger::Builder::new();

    builder.filter_level(parse_level(&config.level));
    builder.format_timestamp_millis();

    if config.no_color {
        builder.write_style(env_logger::WriteStyle::Never);
    }

    builder.try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), log::LevelFilter::Trace);
        assert_eq!(parse_level("DEBUG"), log::LevelFilter::Debug);
        assert_eq!(parse_level("warn"), log::LevelFilter::Warn);
        assert_eq!(parse_level("error"), log::LevelFilter::Error);
        assert_eq!(parse_level("off"), log::LevelFilter::Off);
        assert_eq!(parse_level("verbose"), log::LevelFilter::Info);
    }

    #[test]
    fn test_default_config() {
        let config = LogConfig::default();
        assert_eq!(config.level, "info");
        assert!(!config.no_color);
    }
}
