use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::warn;

use crate::error::ValuationError;
use crate::financials::{latest, FinancialYear};
use crate::types::{with_metadata, ComputationOutput, Money, Percent};
use crate::valuation::assumptions::Assumptions;
use crate::valuation::dcf::{value_dcf, DcfValuation};
use crate::valuation::enterprise_value::{
    debt_financing_pct, decompose_enterprise_value, leverage_ratio, EnterpriseValueRecord,
};
use crate::ValuationResult;

use super::kpi::{kpi_snapshot, KpiSnapshot};

const EV_METHODOLOGY: &str = "Enterprise Value Bridge (Market Cap + Net Debt)";
const DCF_METHODOLOGY: &str = "5-Year FCF DCF with Gordon Growth Terminal Value";
const REPORT_METHODOLOGY: &str = "EV Bridge + 5-Year FCF DCF (Gordon Growth)";

/// Terminal value share of EV above which the result is flagged as fragile.
const TERMINAL_VALUE_WARN_PCT: Decimal = dec!(0.75);

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A chronologically ordered dataset plus the assumptions to value it with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationInput {
    pub years: Vec<FinancialYear>,
    #[serde(default)]
    pub assumptions: Assumptions,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Undervalued,
    Overvalued,
}

/// Market price versus intrinsic value, as headline text would present it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuationVerdict {
    pub verdict: Verdict,
    /// |upside| in percent
    pub margin_pct: Percent,
}

/// Capital structure of the latest year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtFinancing {
    pub year: String,
    pub market_cap: Money,
    pub net_debt: Money,
    pub enterprise_value: Money,
    /// Net debt / EV × 100
    pub debt_financing_pct: Percent,
}

/// Everything a valuation dashboard needs in one payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationReport {
    pub enterprise_value_history: Vec<EnterpriseValueRecord>,
    pub debt_financing: DebtFinancing,
    pub dcf: DcfValuation,
    pub verdict: ValuationVerdict,
    pub kpis: KpiSnapshot,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Per-year enterprise value decomposition, wrapped with metadata.
pub fn build_ev_history(
    input: &ValuationInput,
) -> ValuationResult<ComputationOutput<Vec<EnterpriseValueRecord>>> {
    let start = Instant::now();
    let history = decompose_enterprise_value(&input.years)?;
    let mut warnings = Vec::new();
    if let Some(last) = history.last() {
        leverage_warnings(last, &mut warnings);
    }
    emit(&warnings);

    Ok(with_metadata(
        EV_METHODOLOGY,
        &input.assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        history,
    ))
}

/// DCF valuation of the latest year, wrapped with metadata.
pub fn build_dcf(input: &ValuationInput) -> ValuationResult<ComputationOutput<DcfValuation>> {
    let start = Instant::now();
    let dcf = value_dcf(latest(&input.years)?, &input.assumptions)?;
    let mut warnings = Vec::new();
    dcf_warnings(&dcf, &mut warnings);
    emit(&warnings);

    Ok(with_metadata(
        DCF_METHODOLOGY,
        &input.assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        dcf,
    ))
}

/// Full report: EV history, latest capital structure, DCF, verdict and KPIs.
pub fn build_report(input: &ValuationInput) -> ValuationResult<ComputationOutput<ValuationReport>> {
    let start = Instant::now();

    let history = decompose_enterprise_value(&input.years)?;
    let latest_ev = history.last().ok_or_else(|| {
        ValuationError::EmptyDataset("no enterprise value records produced".into())
    })?;
    let debt_financing = DebtFinancing {
        year: latest_ev.year.clone(),
        market_cap: latest_ev.market_cap,
        net_debt: latest_ev.net_debt,
        enterprise_value: latest_ev.enterprise_value,
        debt_financing_pct: debt_financing_pct(latest_ev)?,
    };

    let dcf = value_dcf(latest(&input.years)?, &input.assumptions)?;
    let verdict = verdict_of(&dcf);
    let kpis = kpi_snapshot(&input.years)?;

    let mut warnings = Vec::new();
    leverage_warnings(latest_ev, &mut warnings);
    dcf_warnings(&dcf, &mut warnings);
    emit(&warnings);

    let report = ValuationReport {
        enterprise_value_history: history,
        debt_financing,
        dcf,
        verdict,
        kpis,
    };

    Ok(with_metadata(
        REPORT_METHODOLOGY,
        &input.assumptions,
        warnings,
        start.elapsed().as_micros() as u64,
        report,
    ))
}

/// Undervalued when intrinsic value is at or above the market price.
pub fn verdict_of(dcf: &DcfValuation) -> ValuationVerdict {
    let verdict = if dcf.upside_percent >= Decimal::ZERO {
        Verdict::Undervalued
    } else {
        Verdict::Overvalued
    };
    ValuationVerdict {
        verdict,
        margin_pct: dcf.upside_percent.abs(),
    }
}

// ---------------------------------------------------------------------------
// Internal helpers
// ---------------------------------------------------------------------------

fn dcf_warnings(dcf: &DcfValuation, warnings: &mut Vec<String>) {
    if dcf.terminal_value_pct > TERMINAL_VALUE_WARN_PCT {
        warnings.push(format!(
            "Terminal value represents {:.1}% of enterprise value; the estimate is dominated by perpetuity assumptions",
            dcf.terminal_value_pct * dec!(100)
        ));
    }
    if dcf.base_free_cash_flow < Decimal::ZERO {
        warnings.push(format!(
            "Base free cash flow for {} is negative ({}); projections compound the outflow",
            dcf.base_year, dcf.base_free_cash_flow
        ));
    }
    if dcf.equity_value < Decimal::ZERO {
        warnings.push(format!(
            "Net debt ({}) exceeds DCF enterprise value; intrinsic equity value is negative",
            dcf.net_debt
        ));
    }
}

fn leverage_warnings(record: &EnterpriseValueRecord, warnings: &mut Vec<String>) {
    if let Some(ratio) = leverage_ratio(record) {
        if ratio > Decimal::ONE {
            warnings.push(format!(
                "Net debt exceeds enterprise value in {}; market cap implied by P/E is negative",
                record.year
            ));
        }
    }
}

fn emit(warnings: &[String]) {
    for w in warnings {
        warn!("{w}");
    }
}
