use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FinProjError {
    #[error("Invalid loan terms: {field} — {reason}")]
    InvalidTerms { field: String, reason: String },

    #[error("Invalid horizon: {horizon} periods (must be at least 1)")]
    InvalidHorizon { horizon: u32 },

    #[error("Invalid rate {rate}: {reason}")]
    InvalidRate { rate: Decimal, reason: String },

    #[error("IRR not found: no convergence after {iterations} iterations (last NPV: {last_npv})")]
    IrrNotFound { iterations: u32, last_npv: Decimal },

    #[error("Undefined result: {context}")]
    Undefined { context: String },

    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for FinProjError {
    fn from(e: serde_json::Error) -> Self {
        FinProjError::SerializationError(e.to_string())
    }
}
