use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use waymark_config::domains::logging::LogFormat;
use waymark_config::LoggingConfig;

/// Build the `EnvFilter` for a logging configuration.
///
/// `RUST_LOG` is only consulted when the configured expression is rejected.
pub fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    let expression = config.filter_expression();
    EnvFilter::try_new(&expression)
        .or_else(|_| EnvFilter::try_from_default_env())
        .with_context(|| format!("Invalid log filter: {}", expression))
}

/// Initialize logging from configuration
pub fn init_logging_from_config(config: &LoggingConfig) -> Result<()> {
    let env_filter = build_env_filter(config)?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(config.include_target)
        .with_file(config.include_location)
        .with_line_number(config.include_location)
        .with_ansi(config.ansi);

    // Use try_init to avoid panic if global subscriber already set
    let result = match config.format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Text => builder.try_init(),
    };

    if result.is_err() {
        tracing::debug!("Global tracing subscriber already initialized, skipping");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use waymark_config::domains::logging::LogLevel;

    #[test]
    fn test_filter_from_config() {
        let config = LoggingConfig {
            level: LogLevel::Warn,
            directives: vec!["waymark_core=debug".to_string()],
            ..Default::default()
        };
        let filter = build_env_filter(&config).unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("warn"));
        assert!(rendered.contains("waymark_core=debug"));
    }

    #[test]
    fn test_repeated_initialisation_is_harmless() {
        let config = LoggingConfig {
            format: LogFormat::Compact,
            ansi: false,
            ..Default::default()
        };

        assert!(init_logging_from_config(&config).is_ok());
        assert!(init_logging_from_config(&config).is_ok());
    }
}
