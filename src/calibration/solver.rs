//! Breakeven volatility by bisection on the hedge P&L.
//!
//! The standardised P&L (P&L divided by the spot at the window start) of a
//! hedge run at an assumed volatility is taken as increasing in that
//! volatility: charging more premium than the path realises leaves money on
//! the table. The solver bisects the volatility bracket until it is narrower
//! than `precision`, moving the upper end down whenever the P&L exceeds `tol`.

use tracing::{debug, warn};

use crate::calibration::config::{BracketCheck, SolverConfig};
use crate::calibration::types::{Breakeven, Estimator};
use crate::error::{HedgeError, Result};
use crate::hedging::HedgeSimulator;
use crate::models::traits::PricingModel;
use crate::models::OptionKind;

/// Volatility reported by [`ImpliedVolSolver::solve`] when the search fails.
pub const FAILED_VOL: f64 = 0.0;

#[derive(Debug, Clone, Default)]
pub struct ImpliedVolSolver {
    config: SolverConfig,
}

impl ImpliedVolSolver {
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: SolverConfig) {
        self.config = config;
    }

    /// Hedge direction for the current simulator state: a call when the option
    /// ends in the money, a put otherwise. Both give the same breakeven by
    /// call-put parity; the in-the-money leg is the better conditioned one.
    pub fn hedge_kind<M: PricingModel>(simulator: &HedgeSimulator<M>) -> OptionKind {
        if simulator.end_spot() - simulator.strike() > 0.0 {
            OptionKind::Call
        } else {
            OptionKind::Put
        }
    }

    /// Searches the volatility at which the hedge of `simulator` breaks even.
    ///
    /// # Errors
    ///
    /// * [`HedgeError::InvalidParameter`] for an invalid configuration, or a
    ///   bracket that does not straddle the breakeven when
    ///   [`BracketCheck::Reject`] is set
    /// * [`HedgeError::NonConvergence`] when the step budget runs out, the
    ///   bracket can no longer be split, or the P&L is not finite
    pub fn try_solve<M: PricingModel>(
        &self,
        simulator: &HedgeSimulator<M>,
        estimator: Estimator,
    ) -> Result<Breakeven> {
        let config = &self.config;
        config.validate()?;

        let kind = Self::hedge_kind(simulator);
        let spot = simulator.spot();
        let standardized = |vol: f64| simulator.estimate(estimator, vol, kind) / spot;

        if config.bracket_check != BracketCheck::Skip {
            let at_low = standardized(config.vol_low);
            let at_high = standardized(config.vol_high);
            if !(at_low <= config.tol && at_high > config.tol) {
                let message = format!(
                    "bracket {} - {} does not straddle the breakeven of {} at strike {:.4} \
                     (standardised P&L {at_low:.3e} / {at_high:.3e})",
                    config.vol_low,
                    config.vol_high,
                    simulator.name(),
                    simulator.strike()
                );
                match config.bracket_check {
                    BracketCheck::Reject => return Err(HedgeError::invalid(message).traced()),
                    _ => warn!(%estimator, "{message}"),
                }
            }
        }

        let max_iterations = config.max_iterations();
        let (mut low, mut high) = (config.vol_low, config.vol_high);
        let mut vol = 0.5 * (low + high);
        let mut iterations = 0;

        while (high - low).abs() >= config.precision {
            if iterations >= max_iterations {
                return Err(HedgeError::non_convergence(
                    iterations,
                    format!("bracket still {low} - {high}"),
                )
                .traced());
            }
            let pnl = standardized(vol);
            if !pnl.is_finite() {
                return Err(HedgeError::non_convergence(
                    iterations,
                    format!("P&L is {pnl} at vol {vol}"),
                )
                .traced());
            }
            if pnl > config.tol {
                high = vol;
            } else {
                low = vol;
            }
            iterations += 1;

            let next = 0.5 * (low + high);
            if next == low || next == high {
                return Err(HedgeError::non_convergence(
                    iterations,
                    format!(
                        "bracket {low} - {high} cannot be split below precision {}",
                        config.precision
                    ),
                )
                .traced());
            }
            vol = next;
        }

        debug!(
            simulator = %simulator.name(),
            strike = simulator.strike(),
            %estimator,
            ?kind,
            vol,
            iterations,
            "breakeven found"
        );
        Ok(Breakeven {
            vol,
            iterations,
            kind,
        })
    }

    /// Like [`try_solve`](Self::try_solve) but never fails: any error is
    /// logged and reported as [`FAILED_VOL`].
    pub fn solve<M: PricingModel>(
        &self,
        simulator: &HedgeSimulator<M>,
        estimator: Estimator,
    ) -> f64 {
        match self.try_solve(simulator, estimator) {
            Ok(breakeven) => breakeven.vol,
            Err(error) => {
                warn!(
                    simulator = %simulator.name(),
                    strike = simulator.strike(),
                    from = %simulator.start_date(),
                    to = %simulator.end_date(),
                    %error,
                    "breakeven search failed"
                );
                FAILED_VOL
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calibration::types::SimulatorParameters;
    use crate::series::{Date, DatedSeries};
    use crate::synthetic::breakeven_series;
    use std::sync::Arc;

    // Alternating moves of exactly `vol * sqrt(dt)` on consecutive days.
    fn zigzag(days: usize, vol: f64) -> Arc<DatedSeries> {
        let start = Date::from_ymd(2021, 1, 1).unwrap();
        let step = vol * (1.0f64 / 365.0).sqrt();
        let mut spot = 100.0;
        let mut dates = Vec::new();
        let mut values = Vec::new();
        for i in 0..days {
            dates.push(start.add_days(i as i64).unwrap());
            values.push(spot);
            spot *= if i % 2 == 0 { 1.0 + step } else { 1.0 - step };
        }
        Arc::new(DatedSeries::new("zigzag", dates, values).unwrap())
    }

    fn simulator(days: usize) -> HedgeSimulator {
        HedgeSimulator::new(zigzag(days, 0.2), SimulatorParameters::new(100.0, 0.0, 0.01))
            .unwrap()
    }

    #[test]
    fn test_robust_recovers_path_vol() {
        let sim = simulator(92);
        let solver = ImpliedVolSolver::default();
        let result = solver.try_solve(&sim, Estimator::Robust).unwrap();
        assert!((result.vol - 0.2).abs() < 1e-4, "vol {}", result.vol);
        assert!(result.iterations > 0);
        assert!(result.iterations < 20);
    }

    #[test]
    fn test_plain_close_to_path_vol() {
        let sim = simulator(183);
        let vol = ImpliedVolSolver::default().solve(&sim, Estimator::Plain);
        assert!((vol - 0.2).abs() < 0.05, "vol {vol}");
    }

    #[test]
    fn test_plain_recovers_replicated_vol() {
        let start = Date::from_ymd(2021, 1, 1).unwrap();
        let path = breakeven_series("replicated", start, 183, 100.0, 100.0, 0.2, 0.02).unwrap();
        let params = SimulatorParameters::new(100.0, 0.02, 0.01);
        let sim = HedgeSimulator::new(Arc::new(path), params).unwrap();
        assert!(sim.pnl(0.2, OptionKind::Call).abs() < 1e-10);

        let solver = ImpliedVolSolver::default();
        let result = solver.try_solve(&sim, Estimator::Plain).unwrap();
        let precision = solver.config().precision;
        assert!((result.vol - 0.2).abs() < precision, "vol {}", result.vol);
    }

    #[test]
    fn test_hedge_kind_follows_terminal_moneyness() {
        let mut sim = simulator(30);
        sim.set_strike(50.0, false).unwrap();
        assert_eq!(ImpliedVolSolver::hedge_kind(&sim), OptionKind::Call);
        sim.set_strike(150.0, false).unwrap();
        assert_eq!(ImpliedVolSolver::hedge_kind(&sim), OptionKind::Put);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let sim = simulator(30);
        let solver = ImpliedVolSolver::new(SolverConfig {
            precision: -1.0,
            ..SolverConfig::standard()
        });
        assert!(matches!(
            solver.try_solve(&sim, Estimator::Plain),
            Err(HedgeError::InvalidParameter { .. })
        ));
        assert_eq!(solver.solve(&sim, Estimator::Plain), FAILED_VOL);
    }

    #[test]
    fn test_bracket_reject() {
        let sim = simulator(92);
        // Both ends above the breakeven.
        let config = SolverConfig {
            vol_low: 0.5,
            vol_high: 0.9,
            bracket_check: BracketCheck::Reject,
            ..SolverConfig::standard()
        };
        let solver = ImpliedVolSolver::new(config.clone());
        for estimator in [Estimator::Plain, Estimator::Robust] {
            assert!(matches!(
                solver.try_solve(&sim, estimator),
                Err(HedgeError::InvalidParameter { .. })
            ));
        }

        // Warn bisects anyway and ends at the lower bound.
        let solver = ImpliedVolSolver::new(SolverConfig {
            bracket_check: BracketCheck::Warn,
            ..config
        });
        let vol = solver.try_solve(&sim, Estimator::Robust).unwrap().vol;
        assert!(vol < 0.5 + 1e-4);
    }

    #[test]
    fn test_unsplittable_bracket_fails() {
        let sim = simulator(30);
        let solver = ImpliedVolSolver::new(SolverConfig {
            precision: 1e-20,
            ..SolverConfig::standard()
        });
        assert!(matches!(
            solver.try_solve(&sim, Estimator::Robust),
            Err(HedgeError::NonConvergence { .. })
        ));
        assert_eq!(solver.solve(&sim, Estimator::Robust), FAILED_VOL);
    }
}
