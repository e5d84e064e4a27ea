//! # System Constants
//!
//! Operational boundaries of the query-safety core: page sizes, the complexity
//! budget and its cost weights, and batch loader timing. Most of these are
//! defaults that [`crate::config::ExamhubConfig`] can override.

use crate::query_builder::PageLimits;

/// Maximum number of ORDER BY keys accepted from a client
pub const DEFAULT_MAX_SORT_KEYS: usize = 3;

/// Per-entity page sizes
pub mod limits {
    use super::PageLimits;

    pub const PROFESSIONS: PageLimits = PageLimits::new(100, 100);
    pub const QUALIFICATIONS: PageLimits = PageLimits::new(100, 100);
    pub const QUESTIONS: PageLimits = PageLimits::new(100, 100);
    pub const USERS: PageLimits = PageLimits::new(100, 100);
    pub const GENERATED_TEST: PageLimits = PageLimits::new(40, 40);
}

/// Query complexity budget and per-field weights
pub mod complexity {
    pub const COMPLEXITY_BUDGET: u64 = 10_000;

    // Extra cost of the total-count query behind each list
    pub const PROFESSIONS_TOTAL_COST: u64 = 100;
    pub const QUALIFICATIONS_TOTAL_COST: u64 = 100;
    pub const QUESTIONS_TOTAL_COST: u64 = 300;
    pub const USERS_TOTAL_COST: u64 = 50;

    pub const GENERATE_TEST_MULTIPLIER: u64 = 3;
    pub const PROFESSION_QUALIFICATIONS_COST: u64 = 10;

    /// Mutations cost `budget / divisor` plus their selection
    pub const DEFAULT_MUTATION_DIVISOR: u64 = 5;
    pub const QUESTION_MUTATION_DIVISOR: u64 = 4;
    pub const SIGN_IN_DIVISOR: u64 = 2;
}

/// Batch loader timing
pub mod loader {
    /// Debounce window before a batch is dispatched, in milliseconds
    pub const DEFAULT_WAIT_MS: u64 = 2;
    /// 0 means batches are bounded only by the wait window
    pub const DEFAULT_MAX_BATCH: usize = 0;
}

/// Environment variables consulted at startup
pub mod env {
    pub const ENVIRONMENT: &str = "EXAMHUB_ENV";
    pub const APP_ENVIRONMENT: &str = "APP_ENV";
    pub const CONFIG_DIR: &str = "EXAMHUB_CONFIG_DIR";
    pub const CONFIG_PREFIX: &str = "EXAMHUB";
    pub const DATABASE_URL: &str = "DATABASE_URL";
}
