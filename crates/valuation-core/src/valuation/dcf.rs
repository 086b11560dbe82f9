use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ValuationError;
use crate::financials::FinancialYear;
use crate::time_value::{future_value, gordon_growth_value, present_value};
use crate::types::{Money, Percent, Rate};
use crate::ValuationResult;

use super::assumptions::Assumptions;

/// Length of the explicit forecast period, in years.
pub const PROJECTION_YEARS: u32 = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// One year of the explicit forecast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfYearProjection {
    /// 1-based offset from the base year
    pub period: u32,
    pub free_cash_flow: Money,
    pub present_value: Money,
}

/// Result of a single-path FCF DCF on the latest reported year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DcfValuation {
    /// Fiscal year whose free cash flow seeds the projection
    pub base_year: String,
    pub base_free_cash_flow: Money,
    /// Year-by-year explicit forecast
    pub projections: Vec<DcfYearProjection>,
    /// Sum of present values of the explicit-period FCFs
    pub sum_pv_fcf: Money,
    /// FCF in the final explicit year
    pub terminal_fcf: Money,
    /// Gordon growth value at the end of the explicit period
    pub terminal_value: Money,
    /// Present value of the terminal value
    pub pv_terminal: Money,
    /// Sum of PV(FCF) and PV(TV)
    pub enterprise_value: Money,
    /// Total debt − cash
    pub net_debt: Money,
    /// Enterprise value − net debt
    pub equity_value: Money,
    /// Net income / EPS
    pub shares_outstanding: Decimal,
    pub intrinsic_value_per_share: Money,
    /// EPS × P/E
    pub current_price: Money,
    /// (intrinsic − price) / price × 100
    pub upside_percent: Percent,
    /// PV of terminal value as a fraction of enterprise value
    pub terminal_value_pct: Rate,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Value one share from the latest year's free cash flow.
///
/// Projects FCF for [`PROJECTION_YEARS`] at the assumed growth rate, adds a
/// Gordon growth terminal value, bridges enterprise value to equity with the
/// year's net debt and divides by implied shares outstanding.
pub fn value_dcf(latest: &FinancialYear, assumptions: &Assumptions) -> ValuationResult<DcfValuation> {
    assumptions.ensure_convergent()?;
    if assumptions.discount_rate <= dec!(-100) {
        return Err(ValuationError::InvalidInput {
            field: "discountRate".into(),
            reason: "Discount rate must be greater than -100%".into(),
        });
    }

    let inputs = BaseYearInputs::from_year(latest)?;
    let g = assumptions.growth();
    let r = assumptions.discount();
    let tg = assumptions.terminal();

    // --- Explicit forecast ---
    let projections = build_projections(inputs.free_cash_flow, g, r)?;
    let sum_pv_fcf = projections
        .iter()
        .try_fold(Decimal::ZERO, |acc, p| acc.checked_add(p.present_value))
        .ok_or_else(|| ValuationError::overflow("sum of projected present values"))?;

    // --- Terminal value ---
    let terminal_fcf = future_value(inputs.free_cash_flow, g, PROJECTION_YEARS)?;
    let terminal_value = gordon_growth_value(terminal_fcf, r, tg)?;
    let pv_terminal = present_value(terminal_value, r, PROJECTION_YEARS)?;
    let enterprise_value = sum_pv_fcf
        .checked_add(pv_terminal)
        .ok_or_else(|| ValuationError::overflow("enterprise_value"))?;

    // --- Equity bridge ---
    let net_debt = inputs
        .total_debt
        .checked_sub(inputs.cash)
        .ok_or_else(|| ValuationError::overflow(format!("{}.net_debt", latest.year)))?;
    let equity_value = enterprise_value
        .checked_sub(net_debt)
        .ok_or_else(|| ValuationError::overflow("equity_value"))?;
    let shares_outstanding = checked_ratio(
        inputs.net_income,
        inputs.eps,
        &latest.year,
        "shares_outstanding",
    )?;
    if shares_outstanding.is_zero() {
        return Err(ValuationError::InvalidInput {
            field: format!("{}.netIncome", latest.year),
            reason: "Net income of zero implies zero shares outstanding".into(),
        });
    }
    let intrinsic_value_per_share = checked_ratio(
        equity_value,
        shares_outstanding,
        &latest.year,
        "intrinsic_value_per_share",
    )?;

    // --- Market comparison ---
    let current_price = inputs
        .eps
        .checked_mul(inputs.pe_ratio)
        .ok_or_else(|| ValuationError::overflow(format!("{}.current_price", latest.year)))?;
    if current_price.is_zero() {
        return Err(ValuationError::InvalidInput {
            field: format!("{}.peRatio", latest.year),
            reason: "Current price (EPS × P/E) is zero; upside is undefined".into(),
        });
    }
    let upside_percent = intrinsic_value_per_share
        .checked_sub(current_price)
        .and_then(|gap| gap.checked_div(current_price))
        .and_then(|ratio| ratio.checked_mul(dec!(100)))
        .ok_or_else(|| ValuationError::overflow(format!("{}.upside_percent", latest.year)))?;

    let terminal_value_pct = if enterprise_value.is_zero() {
        Decimal::ZERO
    } else {
        pv_terminal
            .checked_div(enterprise_value)
            .ok_or_else(|| ValuationError::overflow("terminal_value_pct"))?
    };

    debug!(
        year = %latest.year,
        growth = %assumptions.growth_rate,
        discount = %assumptions.discount_rate,
        terminal = %assumptions.terminal_growth,
        intrinsic = %intrinsic_value_per_share,
        upside = %upside_percent,
        "computed DCF valuation"
    );

    Ok(DcfValuation {
        base_year: latest.year.clone(),
        base_free_cash_flow: inputs.free_cash_flow,
        projections,
        sum_pv_fcf,
        terminal_fcf,
        terminal_value,
        pv_terminal,
        enterprise_value,
        net_debt,
        equity_value,
        shares_outstanding,
        intrinsic_value_per_share,
        current_price,
        upside_percent,
        terminal_value_pct,
    })
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

/// Fields of the base year the DCF reads, already validated and converted.
struct BaseYearInputs {
    free_cash_flow: Money,
    total_debt: Money,
    cash: Money,
    net_income: Money,
    eps: Money,
    pe_ratio: Decimal,
}

impl BaseYearInputs {
    fn from_year(year: &FinancialYear) -> ValuationResult<Self> {
        let inputs = Self {
            free_cash_flow: year.decimal("freeCashFlow", year.free_cash_flow)?,
            total_debt: year.decimal("totalDebt", year.total_debt)?,
            cash: year.decimal("cashAndEquivalents", year.cash_and_equivalents)?,
            net_income: year.decimal("netIncome", year.net_income)?,
            eps: year.decimal("eps", year.eps)?,
            pe_ratio: year.decimal("peRatio", year.pe_ratio)?,
        };
        if inputs.eps.is_zero() {
            return Err(ValuationError::InvalidInput {
                field: format!("{}.eps", year.year),
                reason: "EPS must be non-zero to derive shares outstanding".into(),
            });
        }
        Ok(inputs)
    }
}

fn build_projections(
    base_fcf: Money,
    growth: Rate,
    discount: Rate,
) -> ValuationResult<Vec<DcfYearProjection>> {
    (1..=PROJECTION_YEARS)
        .map(|period| {
            let free_cash_flow = future_value(base_fcf, growth, period)?;
            let present_value = present_value(free_cash_flow, discount, period)?;
            Ok(DcfYearProjection {
                period,
                free_cash_flow,
                present_value,
            })
        })
        .collect()
}

fn checked_ratio(
    numerator: Decimal,
    denominator: Decimal,
    year: &str,
    context: &str,
) -> ValuationResult<Decimal> {
    numerator
        .checked_div(denominator)
        .ok_or_else(|| ValuationError::overflow(format!("{year}.{context}")))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
