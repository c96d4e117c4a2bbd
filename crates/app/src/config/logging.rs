//! Logging Config

use clap::Args;

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum LogFormat {
    /// Compact, human-readable logs.
    Compact,

    /// Structured JSON logs.
    Json,
}

/// Logging settings.
#[derive(Debug, Clone, Args)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "warn", global = true)]
    pub log_level: String,

    /// Log format (compact, json)
    #[arg(
        long,
        env = "LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Compact,
        global = true
    )]
    pub log_format: LogFormat,
}

#[cfg(test)]
mod tests {
    use clap::Parser;
    use testresult::TestResult;

    use super::*;

    #[derive(Debug, Parser)]
    struct Harness {
        #[command(flatten)]
        logging: LoggingConfig,
    }

    #[test]
    fn json_format_is_selectable() -> TestResult {
        let harness = Harness::try_parse_from(["storefront", "--log-format", "json"])?;

        assert_eq!(harness.logging.log_format, LogFormat::Json);

        Ok(())
    }

    #[test]
    fn unknown_formats_are_rejected() {
        let result = Harness::try_parse_from(["storefront", "--log-format", "xml"]);

        assert!(result.is_err(), "expected a parse error, got {result:?}");
    }
}
