use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::error::ValuationError;
use crate::types::Money;
use crate::ValuationResult;

/// One fiscal year of reported financial statements.
///
/// Monetary fields are in the reporting currency's millions, as supplied by the
/// external data source. Margin, ROE and dividend-yield fields are percentages.
/// Values stay as raw `f64` so that missing or corrupt upstream data (NaN,
/// infinities) can be detected and rejected at the point of use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinancialYear {
    /// Fiscal year label, e.g. "2024"
    pub year: String,
    // Income statement
    pub revenue: f64,
    pub gross_profit: f64,
    pub operating_income: f64,
    pub net_income: f64,
    pub eps: f64,
    // Balance sheet
    pub total_assets: f64,
    pub total_liabilities: f64,
    pub total_equity: f64,
    pub total_debt: f64,
    pub cash_and_equivalents: f64,
    // Cash flow
    pub operating_cash_flow: f64,
    pub free_cash_flow: f64,
    // Ratios
    pub pe_ratio: f64,
    pub ev_to_ebitda: f64,
    pub dividend_yield: f64,
    pub gross_margin: f64,
    pub operating_margin: f64,
    pub roe: f64,
}

impl FinancialYear {
    /// Convert one raw field of this record into a `Decimal`.
    ///
    /// `field` is the serialized (camelCase) field name, so errors read
    /// `<year>.<field>` in the vocabulary of the input document. Fails with
    /// `InvalidInput` when the value is NaN, infinite, too large for a 96-bit
    /// decimal mantissa, or so small that it would silently become zero.
    pub fn decimal(&self, field: &str, value: f64) -> ValuationResult<Money> {
        if !value.is_finite() {
            return Err(ValuationError::InvalidInput {
                field: format!("{}.{field}", self.year),
                reason: format!("must be a finite number, got {value}"),
            });
        }
        let converted = Decimal::try_from(value).map_err(|_| ValuationError::InvalidInput {
            field: format!("{}.{field}", self.year),
            reason: format!("{value} is outside the representable decimal range"),
        })?;
        if converted.is_zero() && value != 0.0 {
            return Err(ValuationError::InvalidInput {
                field: format!("{}.{field}", self.year),
                reason: format!("{value} is too small to represent as a decimal"),
            });
        }
        Ok(converted)
    }
}

/// A record keyed by a fiscal year label.
pub trait FiscalPeriod {
    fn year_label(&self) -> &str;

    /// Fiscal year parsed as an integer, if the label is numeric.
    fn fiscal_year(&self) -> Option<i32> {
        self.year_label().trim().parse().ok()
    }
}

impl FiscalPeriod for FinancialYear {
    fn year_label(&self) -> &str {
        &self.year
    }
}

/// The most recent record of a chronologically ordered dataset.
pub fn latest(years: &[FinancialYear]) -> ValuationResult<&FinancialYear> {
    years.last().ok_or_else(|| {
        ValuationError::EmptyDataset("at least one financial year is required".into())
    })
}

/// References to the records ordered latest year first, for tabular display.
///
/// Records whose label is not a plain integer keep their relative input order
/// and sort after all numeric years.
pub fn latest_first<T: FiscalPeriod>(rows: &[T]) -> Vec<&T> {
    let mut sorted: Vec<&T> = rows.iter().collect();
    sorted.sort_by(|a, b| match (a.fiscal_year(), b.fiscal_year()) {
        (Some(ya), Some(yb)) => yb.cmp(&ya),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}


#[cfg(test)]
mod tests {
    use super::fixtures::year;
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_decimal_conversion() {
        let y = year("2024");
        assert_eq!(y.decimal("eps", y.eps).unwrap(), dec!(2.5));
    }

    #[test]
    fn test_decimal_rejects_nan() {
        let y = year("2023");
        let err = y.decimal("netIncome", f64::NAN).unwrap_err();
        match err {
            ValuationError::InvalidInput { field, .. } => assert_eq!(field, "2023.netIncome"),
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_decimal_rejects_infinity_and_huge() {
        let y = year("2023");
        assert!(y.decimal("peRatio", f64::INFINITY).is_err());
        assert!(y.decimal("peRatio", f64::NEG_INFINITY).is_err());
        assert!(y.decimal("revenue", 1e40).is_err());
    }

    #[test]
    fn test_decimal_rejects_underflow_to_zero() {
        let y = year("2024");
        match y.decimal("eps", 1e-30).unwrap_err() {
            ValuationError::InvalidInput { field, reason } => {
                assert_eq!(field, "2024.eps");
                assert!(reason.contains("too small"), "unexpected reason: {reason}");
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
        assert_eq!(y.decimal("eps", 0.0).unwrap(), Decimal::ZERO);
        assert_eq!(y.decimal("eps", -0.0).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_latest_empty() {
        assert!(matches!(latest(&[]), Err(ValuationError::EmptyDataset(_))));
    }

    #[test]
    fn test_latest_first_ordering() {
        let years = vec![year("2021"), year("TTM"), year("2023"), year("2022")];
        let labels: Vec<&str> = latest_first(&years).iter().map(|y| y.year.as_str()).collect();
        assert_eq!(labels, vec!["2023", "2022", "2021", "TTM"]);
    }

    #[test]
    fn test_deserialize_camel_case() {
        let json = r#"{
            "year": "2024", "revenue": 60761, "grossProfit": 27000, "operatingIncome": 9600,
            "netIncome": 6400, "eps": 2.5, "totalAssets": 79000, "totalLiabilities": 58000,
            "totalEquity": 21000, "totalDebt": 29000, "cashAndEquivalents": 4600,
            "operatingCashFlow": 9900, "freeCashFlow": 7800, "peRatio": 18,
            "evToEbitda": 13.5, "dividendYield": 3.6, "grossMargin": 45,
            "operatingMargin": 16, "roe": 30.5
        }"#;
        let y: FinancialYear = serde_json::from_str(json).unwrap();
        assert_eq!(y.year, "2024");
        assert_eq!(y.cash_and_equivalents, 4600.0);
        assert_eq!(y.fiscal_year(), Some(2024));
    }
}
