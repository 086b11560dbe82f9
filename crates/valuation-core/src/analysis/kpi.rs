use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::financials::FinancialYear;
use crate::types::Percent;
use crate::ValuationResult;

/// Direction of a year-over-year move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Flat,
}

/// Headline metric for the latest year with its change versus the prior year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiMetric {
    pub name: String,
    pub value: Decimal,
    /// Change vs last year in percent, rounded to 2 dp
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_pct: Option<Percent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KpiSnapshot {
    pub year: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prior_year: Option<String>,
    pub metrics: Vec<KpiMetric>,
}

/// Percentage change from `prior` to `current`, measured against |prior| so a
/// loss narrowing towards profit reads as an improvement. `None` when prior is zero.
pub fn yoy_change_pct(current: Decimal, prior: Decimal) -> Option<Percent> {
    if prior.is_zero() {
        return None;
    }
    current
        .checked_sub(prior)
        .and_then(|delta| delta.checked_div(prior.abs()))
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .map(|pct| pct.round_dp(2))
}

fn trend_of(change: Option<Percent>) -> Option<Trend> {
    change.map(|c| {
        if c > Decimal::ZERO {
            Trend::Up
        } else if c < Decimal::ZERO {
            Trend::Down
        } else {
            Trend::Flat
        }
    })
}

/// Headline KPIs of the latest year: revenue, net income, EPS, free cash flow,
/// operating margin and ROE.
pub fn kpi_snapshot(years: &[FinancialYear]) -> ValuationResult<KpiSnapshot> {
    let (latest, prior) = match years {
        [] => {
            return Err(ValuationError::EmptyDataset(
                "KPI snapshot needs at least one year".into(),
            ))
        }
        [only] => (only, None),
        [.., prev, last] => (last, Some(prev)),
    };

    // (metric name, input field, accessor)
    let fields: [(&str, &str, fn(&FinancialYear) -> f64); 6] = [
        ("revenue", "revenue", |y: &FinancialYear| y.revenue),
        ("net_income", "netIncome", |y: &FinancialYear| y.net_income),
        ("eps", "eps", |y: &FinancialYear| y.eps),
        ("free_cash_flow", "freeCashFlow", |y: &FinancialYear| y.free_cash_flow),
        ("operating_margin", "operatingMargin", |y: &FinancialYear| y.operating_margin),
        ("roe", "roe", |y: &FinancialYear| y.roe),
    ];

    let metrics = fields
        .iter()
        .map(|(name, field, get)| {
            let value = latest.decimal(field, get(latest))?;
            let change_pct = match prior {
                Some(p) => yoy_change_pct(value, p.decimal(field, get(p))?),
                None => None,
            };
            Ok(KpiMetric {
                name: (*name).to_string(),
                value,
                change_pct,
                trend: trend_of(change_pct),
            })
        })
        .collect::<ValuationResult<Vec<_>>>()?;

    Ok(KpiSnapshot {
        year: latest.year.clone(),
        prior_year: prior.map(|p| p.year.clone()),
        metrics,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::financials::fixtures::year;
    use rust_decimal_macros::dec;

    #[test]
    fn test_yoy_change() {
        assert_eq!(yoy_change_pct(dec!(110), dec!(100)), Some(dec!(10)));
        assert_eq!(yoy_change_pct(dec!(90), dec!(100)), Some(dec!(-10)));
        assert_eq!(yoy_change_pct(dec!(5), Decimal::ZERO), None);
        // loss of 100 narrowing to a loss of 50 is +50%
        assert_eq!(yoy_change_pct(dec!(-50), dec!(-100)), Some(dec!(50)));
    }

    #[test]
    fn test_single_year_has_no_change() {
        let snap = kpi_snapshot(&[year("2024")]).unwrap();
        assert_eq!(snap.prior_year, None);
        assert_eq!(snap.metrics.len(), 6);
        assert!(snap.metrics.iter().all(|m| m.change_pct.is_none()));
    }

    #[test]
    fn test_revenue_growth_vs_prior_year() {
        let mut prev = year("2023");
        prev.revenue = 50_000.0;
        let snap = kpi_snapshot(&[year("2022"), prev, year("2024")]).unwrap();
        assert_eq!(snap.prior_year.as_deref(), Some("2023"));
        let revenue = &snap.metrics[0];
        assert_eq!(revenue.name, "revenue");
        assert_eq!(revenue.change_pct, Some(dec!(20)));
        assert_eq!(revenue.trend, Some(Trend::Up));
        let eps = snap.metrics.iter().find(|m| m.name == "eps").unwrap();
        assert_eq!(eps.trend, Some(Trend::Flat));
    }

    #[test]
    fn test_non_finite_metric_rejected() {
        let mut bad = year("2024");
        bad.operating_margin = f64::NAN;
        match kpi_snapshot(&[year("2023"), bad]) {
            Err(ValuationError::InvalidInput { field, .. }) => {
                assert_eq!(field, "2024.operatingMargin")
            }
            other => panic!("Expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn test_empty() {
        assert!(kpi_snapshot(&[]).is_err());
    }
}
