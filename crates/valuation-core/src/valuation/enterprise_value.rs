use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValuationError;
use crate::financials::{FinancialYear, FiscalPeriod};
use crate::types::{Money, Percent};
use crate::ValuationResult;

/// Enterprise value bridge for a single fiscal year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnterpriseValueRecord {
    pub year: String,
    /// Net income × P/E
    pub market_cap: Money,
    /// Total debt − cash and equivalents
    pub net_debt: Money,
    /// Market cap + net debt
    pub enterprise_value: Money,
}

impl FiscalPeriod for EnterpriseValueRecord {
    fn year_label(&self) -> &str {
        &self.year
    }
}

/// Decompose enterprise value into market cap and net debt for every year.
///
/// Output is index-aligned with `years`. Fails on an empty dataset, or when any
/// record carries a non-finite operand.
pub fn decompose_enterprise_value(
    years: &[FinancialYear],
) -> ValuationResult<Vec<EnterpriseValueRecord>> {
    if years.is_empty() {
        return Err(ValuationError::EmptyDataset(
            "enterprise value decomposition needs at least one year".into(),
        ));
    }

    let records = years
        .iter()
        .map(enterprise_value_for_year)
        .collect::<ValuationResult<Vec<_>>>()?;

    debug!(years = records.len(), "decomposed enterprise value");
    Ok(records)
}

/// Enterprise value bridge for one record.
pub fn enterprise_value_for_year(year: &FinancialYear) -> ValuationResult<EnterpriseValueRecord> {
    let net_income = year.decimal("netIncome", year.net_income)?;
    let pe_ratio = year.decimal("peRatio", year.pe_ratio)?;
    let total_debt = year.decimal("totalDebt", year.total_debt)?;
    let cash = year.decimal("cashAndEquivalents", year.cash_and_equivalents)?;

    let market_cap = net_income
        .checked_mul(pe_ratio)
        .ok_or_else(|| ValuationError::overflow(format!("{}.market_cap", year.year)))?;
    let net_debt = total_debt
        .checked_sub(cash)
        .ok_or_else(|| ValuationError::overflow(format!("{}.net_debt", year.year)))?;
    let enterprise_value = market_cap
        .checked_add(net_debt)
        .ok_or_else(|| ValuationError::overflow(format!("{}.enterprise_value", year.year)))?;

    Ok(EnterpriseValueRecord {
        year: year.year.clone(),
        market_cap,
        net_debt,
        enterprise_value,
    })
}

/// Share of enterprise value financed by net debt, in percent.
pub fn debt_financing_pct(record: &EnterpriseValueRecord) -> ValuationResult<Percent> {
    if record.enterprise_value.is_zero() {
        return Err(ValuationError::InvalidInput {
            field: format!("{}.enterprise_value", record.year),
            reason: "Enterprise value is zero; debt financing share is undefined".into(),
        });
    }
    record
        .net_debt
        .checked_div(record.enterprise_value)
        .and_then(|share| share.checked_mul(dec!(100)))
        .ok_or_else(|| ValuationError::overflow(format!("{}.debt_financing_pct", record.year)))
}

/// Net debt as a fraction of enterprise value, clamped to be non-negative for
/// net-cash companies.
pub fn leverage_ratio(record: &EnterpriseValueRecord) -> Option<Decimal> {
    if record.enterprise_value.is_zero() {
        return None;
    }
    record
        .net_debt
        .checked_div(record.enterprise_value)
        .map(|ratio| ratio.max(Decimal::ZERO))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financials::fixtures::{reference_year, year};
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_reference_year_bridge() {
        let rec = enterprise_value_for_year(&reference_year()).unwrap();
        // 4000 * 18 = 72000; 10000 - 3000 = 7000
        assert_eq!(
            rec,
            EnterpriseValueRecord {
                year: "2024".into(),
                market_cap: dec!(72000),
                net_debt: dec!(7000),
                enterprise_value: dec!(79000),
            }
        );
    }

    #[test]
    fn test_empty_dataset() {
        assert!(matches!(
            decompose_enterprise_value(&[]),
            Err(ValuationError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_net_cash_company() {
        let mut y = year("2022");
        y.total_debt = 1_000.0;
        y.cash_and_equivalents = 2_500.0;
        let rec = enterprise_value_for_year(&y).unwrap();
        assert_eq!(rec.net_debt, dec!(-1500));
        assert!(rec.enterprise_value < rec.market_cap);
        assert_eq!(leverage_ratio(&rec), Some(Decimal::ZERO));
    }

    #[test]
    fn test_non_finite_pe_rejected() {
        let mut bad = year("2021");
        bad.pe_ratio = f64::NAN;
        let years = vec![year("2020"), bad, year("2022")];
        match decompose_enterprise_value(&years) {
            Err(ValuationError::InvalidInput { field, .. }) => {
                assert_eq!(field, "2021.peRatio")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_every_bridge_operand_rejects_non_finite() {
        let cases: [(&str, fn(&mut FinancialYear, f64)); 4] = [
            ("netIncome", |y, v| y.net_income = v),
            ("peRatio", |y, v| y.pe_ratio = v),
            ("totalDebt", |y, v| y.total_debt = v),
            ("cashAndEquivalents", |y, v| y.cash_and_equivalents = v),
        ];
        for (field, set) in cases {
            for bad in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
                let mut y = reference_year();
                set(&mut y, bad);
                match decompose_enterprise_value(&[year("2023"), y]) {
                    Err(ValuationError::InvalidInput { field: label, .. }) => {
                        assert_eq!(label, format!("2024.{field}"))
                    }
                    other => panic!("{field} = {bad}: expected InvalidInput, got {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_history_latest_first() {
        let history = decompose_enterprise_value(&[year("2022"), year("2023"), year("2024")]).unwrap();
        let labels: Vec<&str> = crate::financials::latest_first(&history)
            .iter()
            .map(|r| r.year.as_str())
            .collect();
        assert_eq!(labels, vec!["2024", "2023", "2022"]);
    }

    #[test]
    fn test_debt_financing_pct() {
        let rec = enterprise_value_for_year(&reference_year()).unwrap();
        let pct = debt_financing_pct(&rec).unwrap();
        // 7000 / 79000 * 100 ≈ 8.86%
        assert!((pct - dec!(8.8608)).abs() < dec!(0.001), "got {pct}");
    }

    #[test]
    fn test_debt_financing_zero_ev() {
        let rec = EnterpriseValueRecord {
            year: "2024".into(),
            market_cap: dec!(500),
            net_debt: dec!(-500),
            enterprise_value: Decimal::ZERO,
        };
        assert!(debt_financing_pct(&rec).is_err());
        assert_eq!(leverage_ratio(&rec), None);
    }
}
