use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::ValuationError;
use crate::types::{Percent, Rate};
use crate::ValuationResult;

/// Admissible range and granularity of one assumption, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssumptionBounds {
    pub min: Percent,
    pub max: Percent,
    pub step: Percent,
    pub default: Percent,
}

/// Explicit-period FCF growth: 0% to 10%, default 3.5%
pub const GROWTH_RATE_BOUNDS: AssumptionBounds = AssumptionBounds {
    min: dec!(0),
    max: dec!(10),
    step: dec!(0.5),
    default: dec!(3.5),
};

/// Discount rate (WACC): 5% to 15%, default 8%
pub const DISCOUNT_RATE_BOUNDS: AssumptionBounds = AssumptionBounds {
    min: dec!(5),
    max: dec!(15),
    step: dec!(0.5),
    default: dec!(8.0),
};

/// Perpetuity growth after the explicit period: 0% to 5%, default 2%
pub const TERMINAL_GROWTH_BOUNDS: AssumptionBounds = AssumptionBounds {
    min: dec!(0),
    max: dec!(5),
    step: dec!(0.5),
    default: dec!(2.0),
};

/// Bounds of every control, keyed like [`Assumptions`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssumptionGrid {
    pub growth_rate: AssumptionBounds,
    pub discount_rate: AssumptionBounds,
    pub terminal_growth: AssumptionBounds,
}

pub const ASSUMPTION_GRID: AssumptionGrid = AssumptionGrid {
    growth_rate: GROWTH_RATE_BOUNDS,
    discount_rate: DISCOUNT_RATE_BOUNDS,
    terminal_growth: TERMINAL_GROWTH_BOUNDS,
};

impl AssumptionGrid {
    /// True when every field of `assumptions` lies on its grid.
    pub fn admits(&self, assumptions: &Assumptions) -> bool {
        self.growth_rate.admits(assumptions.growth_rate)
            && self.discount_rate.admits(assumptions.discount_rate)
            && self.terminal_growth.admits(assumptions.terminal_growth)
    }
}

impl AssumptionBounds {
    /// Clamp `value` into `[min, max]` and snap it to the nearest step counted
    /// from `min`. Exact midpoints between two steps snap upwards.
    pub fn clamp_and_snap(&self, value: Decimal) -> Percent {
        let clamped = value.clamp(self.min, self.max);
        let steps = ((clamped - self.min) / self.step)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero);
        (self.min + steps * self.step)
            .clamp(self.min, self.max)
            .normalize()
    }

    /// Clamp and snap a raw control value. Non-finite input is rejected.
    pub fn apply_raw(&self, field: &str, raw: f64) -> ValuationResult<Percent> {
        if !raw.is_finite() {
            return Err(ValuationError::InvalidInput {
                field: field.into(),
                reason: format!("must be a finite number, got {raw}"),
            });
        }
        // Anything beyond Decimal range is far outside every bound anyway.
        let value = Decimal::try_from(raw).unwrap_or(if raw.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        });
        Ok(self.clamp_and_snap(value))
    }

    /// True when `value` lies inside the range and on the step grid.
    pub fn admits(&self, value: Percent) -> bool {
        value >= self.min && value <= self.max && ((value - self.min) % self.step).is_zero()
    }
}

/// Growth, discount and terminal-growth assumptions for one valuation session.
///
/// Stored as percentages the way a user enters them (8.0 means 8%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    /// FCF growth over the explicit projection period
    pub growth_rate: Percent,
    /// Discount rate (WACC)
    pub discount_rate: Percent,
    /// Perpetuity growth after the projection period
    pub terminal_growth: Percent,
}

impl Default for Assumptions {
    fn default() -> Self {
        Self {
            growth_rate: GROWTH_RATE_BOUNDS.default,
            discount_rate: DISCOUNT_RATE_BOUNDS.default,
            terminal_growth: TERMINAL_GROWTH_BOUNDS.default,
        }
    }
}

impl Assumptions {
    /// Build from raw control values, clamping and snapping each one.
    pub fn from_raw(
        growth_rate: f64,
        discount_rate: f64,
        terminal_growth: f64,
    ) -> ValuationResult<Self> {
        Ok(Self {
            growth_rate: GROWTH_RATE_BOUNDS.apply_raw("growthRate", growth_rate)?,
            discount_rate: DISCOUNT_RATE_BOUNDS.apply_raw("discountRate", discount_rate)?,
            terminal_growth: TERMINAL_GROWTH_BOUNDS
                .apply_raw("terminalGrowth", terminal_growth)?,
        })
    }

    /// The same assumptions with every field clamped and snapped to its bounds.
    pub fn clamped(&self) -> Self {
        Self {
            growth_rate: GROWTH_RATE_BOUNDS.clamp_and_snap(self.growth_rate),
            discount_rate: DISCOUNT_RATE_BOUNDS.clamp_and_snap(self.discount_rate),
            terminal_growth: TERMINAL_GROWTH_BOUNDS.clamp_and_snap(self.terminal_growth),
        }
    }

    pub fn growth(&self) -> Rate {
        self.growth_rate / dec!(100)
    }

    pub fn discount(&self) -> Rate {
        self.discount_rate / dec!(100)
    }

    pub fn terminal(&self) -> Rate {
        self.terminal_growth / dec!(100)
    }

    /// The Gordon growth terminal value is finite only when r > tg.
    pub fn is_convergent(&self) -> bool {
        self.discount_rate > self.terminal_growth
    }

    /// Fail with `DivergentValuation` unless the discount rate exceeds terminal growth.
    pub fn ensure_convergent(&self) -> ValuationResult<()> {
        if self.is_convergent() {
            Ok(())
        } else {
            Err(ValuationError::DivergentValuation {
                discount_rate: self.discount_rate,
                terminal_growth: self.terminal_growth,
            })
        }
    }
}
