//! Script configuration loaded from environment variables.

use std::env;

use quill_infra::DatabaseConfig;

/// Script configuration.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// PostgreSQL settings; `None` selects the in-memory store.
    pub database: Option<DatabaseConfig>,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let database = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| {
                let defaults = DatabaseConfig::new(url);
                DatabaseConfig {
                    max_connections: lookup("DB_MAX_CONNECTIONS")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.max_connections),
                    min_connections: lookup("DB_MIN_CONNECTIONS")
                        .and_then(|s| s.parse().ok())
                        .unwrap_or(defaults.min_connections),
                    sqlx_logging: lookup("DB_SQL_LOGGING")
                        .map(|v| flag(&v))
                        .unwrap_or(defaults.sqlx_logging),
                    ..defaults
                }
            });

        Self { database }
    }
}

fn flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn missing_url_selects_in_memory() {
        assert!(load(&[]).database.is_none());
        assert!(load(&[("DATABASE_URL", "  ")]).database.is_none());
    }

    #[test]
    fn pool_settings_default_when_unparseable() {
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/quill"),
            ("DB_MAX_CONNECTIONS", "lots"),
            ("DB_MIN_CONNECTIONS", "2"),
            ("DB_SQL_LOGGING", "TRUE"),
        ]);
        let database = config.database.unwrap();
        assert_eq!(database.url, "postgres://localhost/quill");
        assert_eq!(database.max_connections, 5);
        assert_eq!(database.min_connections, 2);
        assert!(database.sqlx_logging);
    }
}
