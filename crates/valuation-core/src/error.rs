use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValuationError {
    #[error("Invalid input: {field} ({reason})")]
    InvalidInput { field: String, reason: String },

    #[error("Empty dataset: {0}")]
    EmptyDataset(String),

    #[error("Divergent valuation: discount rate ({discount_rate}%) must exceed terminal growth ({terminal_growth}%)")]
    DivergentValuation {
        discount_rate: Decimal,
        terminal_growth: Decimal,
    },

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ValuationError {
    /// Decimal arithmetic left the representable range while computing `context`.
    pub(crate) fn overflow(context: impl Into<String>) -> Self {
        ValuationError::InvalidInput {
            field: context.into(),
            reason: "result exceeds the representable decimal range".into(),
        }
    }
}

impl From<serde_json::Error> for ValuationError {
    fn from(e: serde_json::Error) -> Self {
        ValuationError::SerializationError(e.to_string())
    }
}
