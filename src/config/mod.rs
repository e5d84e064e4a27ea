//! # Configuration
//!
//! Layered configuration for the query-safety core.
//!
//! Sources, later ones winning:
//!
//! 1. `config/examhub.yaml`
//! 2. `config/examhub.<environment>.yaml`
//! 3. `EXAMHUB__<SECTION>__<KEY>` environment variables
//!
//! Every section has defaults, so an empty directory yields a working
//! configuration apart from the database URL.

pub mod error;
pub mod loader;

pub use error::{ConfigResult, ConfigurationError};
pub use loader::ConfigManager;

use crate::constants;
use crate::query_builder::PageLimits;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExamhubConfig {
    pub database: DatabaseConfig,
    pub query: QueryConfig,
    pub loader: LoaderConfig,
    pub limits: LimitsConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub acquire_timeout_seconds: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: std::env::var(constants::env::DATABASE_URL)
                .unwrap_or_else(|_| "postgresql://localhost/examhub_development".to_string()),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout_seconds: 5,
        }
    }
}

impl DatabaseConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_secs(self.acquire_timeout_seconds)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    pub complexity_budget: u64,
    pub max_sort_keys: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            complexity_budget: constants::complexity::COMPLEXITY_BUDGET,
            max_sort_keys: constants::DEFAULT_MAX_SORT_KEYS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    pub wait_ms: u64,
    /// 0 disables the size cap
    pub max_batch: usize,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            wait_ms: constants::loader::DEFAULT_WAIT_MS,
            max_batch: constants::loader::DEFAULT_MAX_BATCH,
        }
    }
}

impl LoaderConfig {
    pub fn wait(&self) -> Duration {
        Duration::from_millis(self.wait_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    pub professions: PageLimits,
    pub qualifications: PageLimits,
    pub questions: PageLimits,
    pub users: PageLimits,
    pub generated_test: PageLimits,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            professions: constants::limits::PROFESSIONS,
            qualifications: constants::limits::QUALIFICATIONS,
            questions: constants::limits::QUESTIONS,
            users: constants::limits::USERS,
            generated_test: constants::limits::GENERATED_TEST,
        }
    }
}

impl LimitsConfig {
    fn entries(&self) -> [(&'static str, &PageLimits); 5] {
        [
            ("professions", &self.professions),
            ("qualifications", &self.qualifications),
            ("questions", &self.questions),
            ("users", &self.users),
            ("generated_test", &self.generated_test),
        ]
    }
}

impl ExamhubConfig {
    /// Reject configurations the core cannot run with
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.url.trim().is_empty() {
            return Err(ConfigurationError::invalid_value(
                "database.url",
                "",
                "a database URL is required",
            ));
        }

        if self.database.max_connections == 0 {
            return Err(ConfigurationError::invalid_value(
                "database.max_connections",
                "0",
                "pool size must be positive",
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(ConfigurationError::invalid_value(
                "database.min_connections",
                self.database.min_connections.to_string(),
                format!(
                    "must not exceed max_connections ({})",
                    self.database.max_connections
                ),
            ));
        }

        if self.query.complexity_budget == 0 {
            return Err(ConfigurationError::invalid_value(
                "query.complexity_budget",
                "0",
                "budget must be positive",
            ));
        }

        if self.query.max_sort_keys == 0 {
            return Err(ConfigurationError::invalid_value(
                "query.max_sort_keys",
                "0",
                "at least one sort key must be allowed",
            ));
        }

        for (name, limits) in self.limits.entries() {
            if limits.default_limit > limits.max_limit {
                return Err(ConfigurationError::invalid_value(
                    format!("limits.{name}.default_limit"),
                    limits.default_limit.to_string(),
                    format!("must not exceed max_limit ({})", limits.max_limit),
                ));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ExamhubConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.query.complexity_budget, 10_000);
        assert_eq!(config.loader.wait(), Duration::from_millis(2));
        assert_eq!(config.limits.generated_test, PageLimits::new(40, 40));
    }

    #[test]
    fn test_default_limit_over_max_is_rejected() {
        let mut config = ExamhubConfig::default();
        config.limits.users = PageLimits::new(500, 100);

        let error = config.validate().unwrap_err();
        assert!(error.to_string().contains("limits.users.default_limit"));
    }

    #[test]
    fn test_zero_budget_is_rejected() {
        let mut config = ExamhubConfig::default();
        config.query.complexity_budget = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_sort_keys_is_rejected() {
        let mut config = ExamhubConfig::default();
        config.query.max_sort_keys = 0;
        assert!(config.validate().is_err());
    }
}
