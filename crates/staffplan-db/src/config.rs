use std::env;
use std::time::Duration;

/// Connection settings for the staffing-plan store.
///
/// Built from `STAFFPLAN_DATABASE_URL` (falling back to
/// [`DbConfig::DEFAULT_URL`]) and the optional pool tuning variables
/// `STAFFPLAN_DB_MAX_CONNECTIONS` and `STAFFPLAN_DB_ACQUIRE_TIMEOUT_SECS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Full PostgreSQL connection URL.
    pub database_url: String,
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl DbConfig {
    pub const DEFAULT_URL: &str = "postgresql://localhost:5432/staffplan";
    pub const DEFAULT_MAX_CONNECTIONS: u32 = 5;
    pub const DEFAULT_ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);

    /// Build a config from the environment.
    pub fn from_env() -> Self {
        let database_url =
            env::var("STAFFPLAN_DATABASE_URL").unwrap_or_else(|_| Self::DEFAULT_URL.to_owned());
        Self::new(database_url).with_pool_env()
    }

    /// Build a config for an explicit URL with default pool settings.
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: Self::DEFAULT_MAX_CONNECTIONS,
            acquire_timeout: Self::DEFAULT_ACQUIRE_TIMEOUT,
        }
    }

    /// Apply pool overrides from the environment. Unparseable values are
    /// ignored.
    pub fn with_pool_env(mut self) -> Self {
        if let Some(n) = env::var("STAFFPLAN_DB_MAX_CONNECTIONS")
            .ok()
            .and_then(|v| v.parse::<u32>().ok())
            .filter(|n| *n > 0)
        {
            self.max_connections = n;
        }
        if let Some(secs) = env::var("STAFFPLAN_DB_ACQUIRE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse::<u64>().ok())
        {
            self.acquire_timeout = Duration::from_secs(secs);
        }
        self
    }

    /// The database name: the last path segment of the URL, without any
    /// query string.
    pub fn database_name(&self) -> Option<&str> {
        let without_query = self
            .database_url
            .split_once('?')
            .map_or(self.database_url.as_str(), |(base, _)| base);
        without_query
            .rsplit_once('/')
            .map(|(_, name)| name)
            .filter(|name| !name.is_empty() && !name.contains(':'))
    }

    /// URL of the `postgres` maintenance database on the same server, used
    /// to issue `CREATE DATABASE`.
    pub fn maintenance_url(&self) -> String {
        match self.database_url.rfind('/') {
            Some(pos) => format!("{}/postgres", &self.database_url[..pos]),
            None => self.database_url.clone(),
        }
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_url_uses_default_pool_settings() {
        let cfg = DbConfig::new("postgresql://db.internal:5433/costing");
        assert_eq!(cfg.database_url, "postgresql://db.internal:5433/costing");
        assert_eq!(cfg.max_connections, DbConfig::DEFAULT_MAX_CONNECTIONS);
        assert_eq!(cfg.acquire_timeout, Duration::from_secs(10));
    }

    #[test]
    fn database_name_is_last_segment() {
        let cfg = DbConfig::new(DbConfig::DEFAULT_URL);
        assert_eq!(cfg.database_name(), Some("staffplan"));
    }

    #[test]
    fn database_name_ignores_query_string() {
        let cfg = DbConfig::new("postgresql://localhost:5432/plans?sslmode=disable");
        assert_eq!(cfg.database_name(), Some("plans"));
    }

    #[test]
    fn database_name_absent_without_path() {
        let cfg = DbConfig::new("postgresql://localhost:5432/");
        assert_eq!(cfg.database_name(), None);
    }

    #[test]
    fn maintenance_url_swaps_database() {
        let cfg = DbConfig::new("postgresql://localhost:5432/staffplan");
        assert_eq!(cfg.maintenance_url(), "postgresql://localhost:5432/postgres");
    }
}
