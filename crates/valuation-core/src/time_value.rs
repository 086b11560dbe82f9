use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::ValuationError;
use crate::types::{Money, Rate};
use crate::ValuationResult;

/// Growth factor (1 + rate)^periods
pub fn growth_factor(rate: Rate, periods: u32) -> ValuationResult<Decimal> {
    if rate <= dec!(-1) {
        return Err(ValuationError::InvalidInput {
            field: "rate".into(),
            reason: "Rate must be greater than -100%".into(),
        });
    }
    (Decimal::ONE + rate)
        .checked_powu(u64::from(periods))
        .ok_or_else(|| ValuationError::overflow(format!("growth factor over {periods} periods")))
}

/// Future value of `amount` compounded at `rate` for `periods`
pub fn future_value(amount: Money, rate: Rate, periods: u32) -> ValuationResult<Money> {
    let factor = growth_factor(rate, periods)?;
    amount
        .checked_mul(factor)
        .ok_or_else(|| ValuationError::overflow(format!("future value at period {periods}")))
}

/// Present value of `amount` received after `periods`, discounted at `rate`
pub fn present_value(amount: Money, rate: Rate, periods: u32) -> ValuationResult<Money> {
    let factor = growth_factor(rate, periods)?;
    amount
        .checked_div(factor)
        .ok_or_else(|| ValuationError::overflow(format!("present value at period {periods}")))
}

/// Gordon growth perpetuity value one period after `cash_flow`:
/// CF × (1 + g) / (r − g)
pub fn gordon_growth_value(
    cash_flow: Money,
    discount_rate: Rate,
    growth_rate: Rate,
) -> ValuationResult<Money> {
    let spread = discount_rate - growth_rate;
    if spread <= Decimal::ZERO {
        return Err(ValuationError::DivergentValuation {
            discount_rate: discount_rate * dec!(100),
            terminal_growth: growth_rate * dec!(100),
        });
    }
    cash_flow
        .checked_mul(Decimal::ONE + growth_rate)
        .and_then(|grown| grown.checked_div(spread))
        .ok_or_else(|| ValuationError::overflow("perpetuity value"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_growth_factor() {
        assert_eq!(growth_factor(dec!(0.10), 2).unwrap(), dec!(1.21));
        assert_eq!(growth_factor(dec!(0.05), 0).unwrap(), Decimal::ONE);
    }

    #[test]
    fn test_growth_factor_rejects_total_loss_rate() {
        assert!(growth_factor(dec!(-1), 3).is_err());
    }

    #[test]
    fn test_present_value_basic() {
        // 121 received in two years at 10% is worth 100 today
        assert_eq!(present_value(dec!(121), dec!(0.10), 2).unwrap(), dec!(100));
    }

    #[test]
    fn test_future_value_zero_rate() {
        assert_eq!(future_value(dec!(250), Decimal::ZERO, 5).unwrap(), dec!(250));
    }

    #[test]
    fn test_gordon_growth() {
        // 100 * 1.02 / (0.08 - 0.02) = 1700
        assert_eq!(
            gordon_growth_value(dec!(100), dec!(0.08), dec!(0.02)).unwrap(),
            dec!(1700)
        );
    }

    #[test]
    fn test_gordon_growth_divergent() {
        let result = gordon_growth_value(dec!(100), dec!(0.03), dec!(0.03));
        assert!(matches!(
            result,
            Err(ValuationError::DivergentValuation { .. })
        ));
    }

    #[test]
    fn test_future_value_overflow_is_error() {
        let huge = Decimal::MAX / dec!(2);
        assert!(future_value(huge, dec!(0.5), 5).is_err());
    }
}
