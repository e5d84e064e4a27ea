//! Error types for the examhub core.

use crate::complexity::ComplexityError;
use crate::config::ConfigurationError;
use crate::loader::LoadError;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExamhubError {
    #[error("Database error: {0}")]
    DatabaseError(String),
    #[error("Configuration error: {0}")]
    ConfigurationError(String),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Query complexity limit exceeded: cost {cost} is over the budget of {budget}")]
    ComplexityLimitExceeded { cost: u64, budget: u64 },
    #[error("Batch load error: {0}")]
    LoadError(#[from] LoadError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sqlx::Error> for ExamhubError {
    fn from(err: sqlx::Error) -> Self {
        ExamhubError::DatabaseError(err.to_string())
    }
}

impl From<ConfigurationError> for ExamhubError {
    fn from(err: ConfigurationError) -> Self {
        ExamhubError::ConfigurationError(err.to_string())
    }
}

impl From<ComplexityError> for ExamhubError {
    fn from(err: ComplexityError) -> Self {
        match err {
            ComplexityError::BudgetExceeded { cost, budget } => {
                ExamhubError::ComplexityLimitExceeded { cost, budget }
            }
        }
    }
}

impl From<serde_json::Error> for ExamhubError {
    fn from(error: serde_json::Error) -> Self {
        ExamhubError::ValidationError(format!("JSON serialization error: {error}"))
    }
}

pub type Result<T> = std::result::Result<T, ExamhubError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_budget_rejection_maps_to_top_level_error() {
        let err: ExamhubError = ComplexityError::BudgetExceeded {
            cost: 10_001,
            budget: 10_000,
        }
        .into();

        assert_eq!(
            err,
            ExamhubError::ComplexityLimitExceeded {
                cost: 10_001,
                budget: 10_000
            }
        );
        assert!(err.to_string().contains("10001"));
    }

    #[test]
    fn test_row_not_found_is_database_error() {
        let err: ExamhubError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ExamhubError::DatabaseError(_)));
    }
}
