use std::fmt;

use tracing::{debug, warn};

use crate::financials::{latest, FinancialYear};
use crate::types::Percent;
use crate::ValuationResult;

use super::assumptions::{
    AssumptionGrid, Assumptions, ASSUMPTION_GRID, DISCOUNT_RATE_BOUNDS, GROWTH_RATE_BOUNDS,
    TERMINAL_GROWTH_BOUNDS,
};
use super::dcf::{value_dcf, DcfValuation};

/// Receives every recomputed valuation of an [`AssumptionController`].
pub trait ValuationSubscriber {
    fn on_valuation(&mut self, assumptions: &Assumptions, outcome: &ValuationResult<DcfValuation>);
}

impl<F> ValuationSubscriber for F
where
    F: FnMut(&Assumptions, &ValuationResult<DcfValuation>),
{
    fn on_valuation(&mut self, assumptions: &Assumptions, outcome: &ValuationResult<DcfValuation>) {
        self(assumptions, outcome)
    }
}

/// Owns one session's assumptions and keeps its DCF valuation current.
///
/// Each setter clamps and snaps the raw control value, stores it, revalues the
/// base year synchronously and publishes the outcome to all subscribers. A
/// failed valuation is published too, so consumers can show a "cannot
/// compute" state instead of a stale number.
pub struct AssumptionController {
    base_year: FinancialYear,
    assumptions: Assumptions,
    current: ValuationResult<DcfValuation>,
    subscribers: Vec<Box<dyn ValuationSubscriber>>,
}

impl AssumptionController {
    /// Start a session on `base_year` with default assumptions.
    pub fn new(base_year: FinancialYear) -> Self {
        Self::with_assumptions(base_year, Assumptions::default())
    }

    /// Start a session with explicit assumptions, clamped to their bounds.
    pub fn with_assumptions(base_year: FinancialYear, assumptions: Assumptions) -> Self {
        let assumptions = assumptions.clamped();
        let current = value_dcf(&base_year, &assumptions);
        Self {
            base_year,
            assumptions,
            current,
            subscribers: Vec::new(),
        }
    }

    /// Start a session on the latest year of a chronologically ordered dataset.
    pub fn from_dataset(years: &[FinancialYear]) -> ValuationResult<Self> {
        Ok(Self::new(latest(years)?.clone()))
    }

    pub fn assumptions(&self) -> &Assumptions {
        &self.assumptions
    }

    pub fn base_year(&self) -> &FinancialYear {
        &self.base_year
    }

    /// Outcome of the most recent recomputation.
    pub fn current(&self) -> &ValuationResult<DcfValuation> {
        &self.current
    }

    /// Register a subscriber. It immediately receives the current outcome.
    pub fn subscribe(&mut self, subscriber: impl ValuationSubscriber + 'static) {
        let mut subscriber: Box<dyn ValuationSubscriber> = Box::new(subscriber);
        subscriber.on_valuation(&self.assumptions, &self.current);
        self.subscribers.push(subscriber);
    }

    /// Set the explicit-period growth rate. Returns the value actually applied.
    pub fn set_growth_rate(&mut self, raw: f64) -> ValuationResult<Percent> {
        let applied = GROWTH_RATE_BOUNDS.apply_raw("growthRate", raw)?;
        self.assumptions.growth_rate = applied;
        self.recompute();
        Ok(applied)
    }

    /// Set the discount rate. Returns the value actually applied.
    pub fn set_discount_rate(&mut self, raw: f64) -> ValuationResult<Percent> {
        let applied = DISCOUNT_RATE_BOUNDS.apply_raw("discountRate", raw)?;
        self.assumptions.discount_rate = applied;
        self.recompute();
        Ok(applied)
    }

    /// Set the terminal growth rate. Returns the value actually applied.
    pub fn set_terminal_growth(&mut self, raw: f64) -> ValuationResult<Percent> {
        let applied = TERMINAL_GROWTH_BOUNDS.apply_raw("terminalGrowth", raw)?;
        self.assumptions.terminal_growth = applied;
        self.recompute();
        Ok(applied)
    }

    /// Restore every assumption to its default and revalue.
    pub fn reset(&mut self) {
        self.assumptions = Assumptions::default();
        self.recompute();
    }

    /// Range, step and default of each control, for rendering sliders.
    pub fn bounds() -> AssumptionGrid {
        ASSUMPTION_GRID
    }

    fn recompute(&mut self) {
        self.current = value_dcf(&self.base_year, &self.assumptions);
        match &self.current {
            Ok(v) => debug!(intrinsic = %v.intrinsic_value_per_share, "assumptions changed"),
            Err(e) => warn!(error = %e, "valuation unavailable for current assumptions"),
        }
        for subscriber in &mut self.subscribers {
            subscriber.on_valuation(&self.assumptions, &self.current);
        }
    }
}

impl fmt::Debug for AssumptionController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AssumptionController")
            .field("base_year", &self.base_year.year)
            .field("assumptions", &self.assumptions)
            .field("current", &self.current)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValuationError;
    use crate::financials::fixtures::{reference_year, year};
    use rust_decimal_macros::dec;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn test_initial_valuation_uses_defaults() {
        let ctl = AssumptionController::new(reference_year());
        assert_eq!(*ctl.assumptions(), Assumptions::default());
        let direct = value_dcf(&reference_year(), &Assumptions::default()).unwrap();
        assert_eq!(ctl.current().as_ref().unwrap(), &direct);
    }

    #[test]
    fn test_setter_clamps_and_snaps() {
        let mut ctl = AssumptionController::new(reference_year());
        assert_eq!(ctl.set_growth_rate(12.3).unwrap(), dec!(10));
        assert_eq!(ctl.set_discount_rate(9.2).unwrap(), dec!(9));
        assert_eq!(ctl.set_terminal_growth(-1.0).unwrap(), dec!(0));
        assert_eq!(
            *ctl.assumptions(),
            Assumptions {
                growth_rate: dec!(10),
                discount_rate: dec!(9),
                terminal_growth: dec!(0),
            }
        );
    }

    #[test]
    fn test_subscribers_receive_every_recompute() {
        let seen: Rc<RefCell<Vec<Percent>>> = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);

        let mut ctl = AssumptionController::new(reference_year());
        ctl.subscribe(move |a: &Assumptions, _: &ValuationResult<DcfValuation>| {
            sink.borrow_mut().push(a.growth_rate)
        });
        ctl.set_growth_rate(5.0).unwrap();
        ctl.set_growth_rate(6.0).unwrap();

        assert_eq!(*seen.borrow(), vec![dec!(3.5), dec!(5), dec!(6)]);
    }

    #[test]
    fn test_divergent_outcome_is_published() {
        let errors = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&errors);

        let mut ctl = AssumptionController::new(reference_year());
        ctl.subscribe(move |_: &Assumptions, o: &ValuationResult<DcfValuation>| {
            if matches!(o, Err(ValuationError::DivergentValuation { .. })) {
                *sink.borrow_mut() += 1;
            }
        });
        ctl.set_terminal_growth(5.0).unwrap();
        ctl.set_discount_rate(5.0).unwrap();

        assert_eq!(*errors.borrow(), 1);
        assert!(ctl.current().is_err());

        ctl.set_discount_rate(6.0).unwrap();
        assert!(ctl.current().is_ok());
    }

    #[test]
    fn test_non_finite_input_leaves_state_untouched() {
        let calls = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&calls);

        let mut ctl = AssumptionController::new(reference_year());
        ctl.subscribe(move |_: &Assumptions, _: &ValuationResult<DcfValuation>| {
            *sink.borrow_mut() += 1
        });
        assert!(ctl.set_discount_rate(f64::NAN).is_err());
        assert_eq!(ctl.assumptions().discount_rate, dec!(8));
        // only the delivery made on subscribe
        assert_eq!(*calls.borrow(), 1);
    }

    #[test]
    fn test_setters_always_land_on_the_grid() {
        let grid = AssumptionController::bounds();
        let mut ctl = AssumptionController::new(reference_year());
        for raw in [-3.0, 0.0, 0.24, 0.25, 4.74, 7.3, 9.99, 12.5, 1e9] {
            ctl.set_growth_rate(raw).unwrap();
            ctl.set_discount_rate(raw).unwrap();
            ctl.set_terminal_growth(raw).unwrap();
            assert!(
                grid.admits(ctl.assumptions()),
                "raw {raw} produced off-grid {:?}",
                ctl.assumptions()
            );
        }
        assert!(grid.growth_rate.admits(grid.growth_rate.default));
        assert!(!grid.discount_rate.admits(dec!(7.3)));
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut ctl = AssumptionController::new(reference_year());
        ctl.set_growth_rate(9.0).unwrap();
        ctl.reset();
        assert_eq!(*ctl.assumptions(), Assumptions::default());
    }

    #[test]
    fn test_from_dataset_uses_latest_year() {
        let years = vec![year("2022"), year("2023"), reference_year()];
        let ctl = AssumptionController::from_dataset(&years).unwrap();
        assert_eq!(ctl.base_year().year, "2024");
        assert!(matches!(
            AssumptionController::from_dataset(&[]),
            Err(ValuationError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_bad_base_year_reports_error() {
        let mut y = reference_year();
        y.eps = 0.0;
        let ctl = AssumptionController::new(y);
        assert!(matches!(
            ctl.current(),
            Err(ValuationError::InvalidInput { .. })
        ));
    }
}
