use tracing::Level;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

/// Parse log level string to tracing Level.
fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Filter from `RUST_LOG` directives when they are set and valid, otherwise
/// from the configured level.
fn build_filter(rust_log: Option<&str>, level: &str) -> EnvFilter {
    let directives = rust_log.map(str::trim).filter(|d| !d.is_empty());
    match directives.map(EnvFilter::try_new) {
        Some(Ok(filter)) => filter,
        _ => EnvFilter::default().add_directive(parse_level(level).into()),
    }
}

/// Install the global subscriber. Logs go to stderr so that stdout stays
/// clean for command output such as `--json` reports.
///
/// `RUST_LOG`, when set, replaces `level`. Calling this twice keeps the
/// first subscriber.
pub fn init(level: &str) {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = build_filter(rust_log.as_deref(), level);

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false)
                .with_target(true),
        )
        .with(filter)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::filter::LevelFilter;

    #[test]
    fn test_parse_level() {
        assert_eq!(parse_level("trace"), Level::TRACE);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
        assert_eq!(parse_level(" info "), Level::INFO);
        assert_eq!(parse_level("warning"), Level::WARN);
        assert_eq!(parse_level("Error"), Level::ERROR);
    }

    #[test]
    fn test_parse_level_default() {
        assert_eq!(parse_level("loud"), Level::INFO);
        assert_eq!(parse_level(""), Level::INFO);
    }

    #[test]
    fn test_rust_log_overrides_configured_level() {
        let filter = build_filter(Some("debug"), "warn");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::DEBUG));
    }

    #[test]
    fn test_configured_level_without_rust_log() {
        assert_eq!(build_filter(None, "warn").max_level_hint(), Some(LevelFilter::WARN));
        assert_eq!(build_filter(Some("  "), "error").max_level_hint(), Some(LevelFilter::ERROR));
    }

    #[test]
    fn test_invalid_rust_log_falls_back_to_level() {
        let filter = build_filter(Some("news_ingest=loudest"), "info");
        assert_eq!(filter.max_level_hint(), Some(LevelFilter::INFO));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init("debug");
        init("warn");
    }
}
