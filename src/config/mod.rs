use std::time::Duration;

use crate::errors::{IngestError, IngestResult};
use crate::services::ingest_service::DEFAULT_MAX_PARALLEL;
use crate::sources::FetchConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub db_path: String,
    pub fetch: FetchConfig,
    pub max_parallel: usize,
    pub log_level: String,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> IngestResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        // Default db_path is relative to executable directory
        let default_db = exe_dir
            .map(|d| d.join("news-ingest.db").to_string_lossy().into_owned())
            .unwrap_or_else(|| "./news-ingest.db".to_string());

        Self::from_lookup(|key| std::env::var(key).ok(), default_db)
    }

    /// Build a config from any key lookup, with `default_db` used when no
    /// database path is set.
    pub fn from_lookup<L>(lookup: L, default_db: String) -> IngestResult<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        let value = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let defaults = FetchConfig::default();

        let db_path = value("NEWS_INGEST_DB_PATH").unwrap_or(default_db);
        let user_agent = value("NEWS_INGEST_USER_AGENT").unwrap_or(defaults.user_agent);

        let timeout_secs = parse_number(value("NEWS_INGEST_TIMEOUT_SECS"), "NEWS_INGEST_TIMEOUT_SECS")?
            .unwrap_or(defaults.timeout.as_secs());
        if timeout_secs == 0 {
            return Err(IngestError::Config(
                "NEWS_INGEST_TIMEOUT_SECS must be at least 1".to_string(),
            ));
        }

        let max_body_bytes =
            parse_number(value("NEWS_INGEST_MAX_BODY_BYTES"), "NEWS_INGEST_MAX_BODY_BYTES")?
                .unwrap_or(defaults.max_body_bytes);

        let max_parallel = parse_number(value("NEWS_INGEST_MAX_PARALLEL"), "NEWS_INGEST_MAX_PARALLEL")?
            .unwrap_or(DEFAULT_MAX_PARALLEL as u64);
        if max_parallel == 0 {
            return Err(IngestError::Config(
                "NEWS_INGEST_MAX_PARALLEL must be at least 1".to_string(),
            ));
        }

        let log_level = value("NEWS_INGEST_LOG").unwrap_or_else(|| "info".to_string());

        Ok(Self {
            db_path,
            fetch: FetchConfig {
                user_agent,
                timeout: Duration::from_secs(timeout_secs),
                max_body_bytes,
            },
            max_parallel: usize::try_from(max_parallel).unwrap_or(usize::MAX),
            log_level,
        })
    }
}

fn parse_number(raw: Option<String>, key: &str) -> IngestResult<Option<u64>> {
    raw.map(|v| {
        v.parse::<u64>()
            .map_err(|_| IngestError::Config(format!("{} must be a whole number, got {:?}", key, v)))
    })
    .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> IngestResult<Config> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned(), "/tmp/default.db".to_string())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();

        assert_eq!(config.db_path, "/tmp/default.db");
        assert_eq!(config.fetch.timeout, Duration::from_secs(20));
        assert_eq!(config.fetch.max_body_bytes, 10 * 1024 * 1024);
        assert!(config.fetch.user_agent.starts_with("news-ingest/"));
        assert!(config.fetch.user_agent.ends_with("(RSS Feed Crawler)"));
        assert_eq!(config.max_parallel, 4);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            ("NEWS_INGEST_DB_PATH", "/data/news.db"),
            ("NEWS_INGEST_USER_AGENT", "probe/1.0"),
            ("NEWS_INGEST_TIMEOUT_SECS", "5"),
            ("NEWS_INGEST_MAX_BODY_BYTES", "2048"),
            ("NEWS_INGEST_MAX_PARALLEL", "8"),
            ("NEWS_INGEST_LOG", "debug"),
        ])
        .unwrap();

        assert_eq!(config.db_path, "/data/news.db");
        assert_eq!(config.fetch.user_agent, "probe/1.0");
        assert_eq!(config.fetch.timeout, Duration::from_secs(5));
        assert_eq!(config.fetch.max_body_bytes, 2048);
        assert_eq!(config.max_parallel, 8);
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_blank_values_fall_back_to_defaults() {
        let config = config_from(&[("NEWS_INGEST_TIMEOUT_SECS", "  "), ("NEWS_INGEST_DB_PATH", "")])
            .unwrap();
        assert_eq!(config.fetch.timeout, Duration::from_secs(20));
        assert_eq!(config.db_path, "/tmp/default.db");
    }

    #[test]
    fn test_bad_numbers_are_config_errors() {
        assert!(matches!(
            config_from(&[("NEWS_INGEST_TIMEOUT_SECS", "soon")]),
            Err(IngestError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("NEWS_INGEST_MAX_PARALLEL", "0")]),
            Err(IngestError::Config(_))
        ));
        assert!(matches!(
            config_from(&[("NEWS_INGEST_MAX_BODY_BYTES", "-1")]),
            Err(IngestError::Config(_))
        ));
    }
}
