use thiserror::Error;

use crate::advisor::AdvisorError;
use crate::domain::AggregationError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Expense not found: {0}")]
    ExpenseNotFound(String),

    #[error("Saving not found: {0}")]
    SavingNotFound(String),

    #[error("Plan not found: {0}")]
    PlanNotFound(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid delta: {0}")]
    InvalidDelta(String),

    #[error("Malformed date: {0}")]
    MalformedDate(String),

    #[error("AI service not configured: {0}")]
    ServiceUnavailable(String),

    #[error("AI provider error: {0}")]
    Advisor(#[source] AdvisorError),

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl From<AggregationError> for AppError {
    fn from(err: AggregationError) -> Self {
        match err {
            AggregationError::InvalidDelta(reason) => AppError::InvalidDelta(reason),
            AggregationError::Overflow(sum) => {
                AppError::InvalidAmount(format!("total out of range ({})", sum))
            }
        }
    }
}

impl From<AdvisorError> for AppError {
    fn from(err: AdvisorError) -> Self {
        match err {
            AdvisorError::NotConfigured(reason) => AppError::ServiceUnavailable(reason),
            other => AppError::Advisor(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisor_errors_keep_their_kind() {
        let err = AppError::from(AdvisorError::Provider {
            status: 429,
            body: "rate limited".into(),
        });
        assert!(matches!(
            err,
            AppError::Advisor(AdvisorError::Provider { status: 429, .. })
        ));

        let err = AppError::from(AdvisorError::NotConfigured("no key".into()));
        assert!(matches!(err, AppError::ServiceUnavailable(_)));
    }

    #[test]
    fn test_overflow_is_an_invalid_amount() {
        let err = AppError::from(AggregationError::Overflow("1 + 2".into()));
        assert!(matches!(err, AppError::InvalidAmount(_)));
    }
}
