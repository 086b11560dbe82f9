pub mod error;
pub mod financials;
pub mod time_value;
pub mod types;

#[cfg(feature = "valuation")]
pub mod valuation;

#[cfg(feature = "analysis")]
pub mod analysis;

pub use error::ValuationError;
pub use financials::{FinancialYear, FiscalPeriod};
pub use types::*;

/// Standard result type for all valuation operations
pub type ValuationResult<T> = Result<T, ValuationError>;
