// src/hedging/simulator.rs

//! Replay of a daily-rebalanced delta hedge over a window of a price series.
//!
//! The simulator sells nothing and buys nothing in the market: it starts from
//! the model premium of the option at the window start, holds `delta` units of
//! the underlying, keeps the residual in a cash account accruing at `rate`, and
//! rebalances at every observation. What is left after paying the payoff at the
//! window end is the realised P&L for the assumed volatility.

use std::sync::Arc;

use tracing::debug;

use crate::calibration::types::{Estimator, SimulatorParameters};
use crate::error::{HedgeError, Result};
use crate::models::traits::PricingModel;
use crate::models::{BlackScholes, OptionKind};
use crate::series::{Date, DatedSeries, Direction, Fallback};

#[derive(Debug, Clone)]
pub struct HedgeSimulator<M = BlackScholes> {
    series: Arc<DatedSeries>,
    model: M,
    start: usize,
    end: usize,
    strike: f64,
    rate: f64,
    dividend_yield: f64,
}

impl HedgeSimulator<BlackScholes> {
    /// Simulator over the whole series, priced with Black-Scholes.
    pub fn new(series: Arc<DatedSeries>, params: SimulatorParameters) -> Result<Self> {
        Self::with_model(series, params, BlackScholes)
    }
}

impl<M: PricingModel> HedgeSimulator<M> {
    /// Simulator over the whole series with a custom pricing model.
    ///
    /// # Errors
    ///
    /// * [`HedgeError::InvalidParameter`] if the series has fewer than two
    ///   observations, the strike is not positive or the dividend yield is not
    ///   positive
    pub fn with_model(
        series: Arc<DatedSeries>,
        params: SimulatorParameters,
        model: M,
    ) -> Result<Self> {
        if series.len() < 2 {
            return Err(HedgeError::invalid(format!(
                "series {} needs at least two observations to hedge, has {}",
                series.name(),
                series.len()
            ))
            .traced());
        }
        validate_strike(params.strike, series.name())?;
        validate_dividend_yield(params.dividend_yield, series.name())?;
        let end = series.len();
        Ok(Self {
            series,
            model,
            start: 1,
            end,
            strike: params.strike,
            rate: params.rate,
            dividend_yield: params.dividend_yield,
        })
    }

    // ---------------------------------------------------------------------
    // access
    // ---------------------------------------------------------------------

    pub fn name(&self) -> &str {
        self.series.name()
    }

    pub fn series(&self) -> &Arc<DatedSeries> {
        &self.series
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// Number of observations in the window, both ends included.
    pub fn window_len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn strike(&self) -> f64 {
        self.strike
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn dividend_yield(&self) -> f64 {
        self.dividend_yield
    }

    /// Spot at the window start.
    pub fn spot(&self) -> f64 {
        self.spot_at(self.start)
    }

    /// Spot at the window end.
    pub fn end_spot(&self) -> f64 {
        self.spot_at(self.end)
    }

    pub fn start_date(&self) -> Date {
        self.series.dates()[self.start - 1]
    }

    pub fn end_date(&self) -> Date {
        self.series.dates()[self.end - 1]
    }

    /// Window length in years (Actual/365).
    pub fn maturity(&self) -> f64 {
        self.start_date().year_fraction(&self.end_date())
    }

    // The window invariant keeps every index in 1..=len.
    fn spot_at(&self, index: usize) -> f64 {
        self.series.values()[index - 1]
    }

    fn years_between(&self, from: usize, to: usize) -> f64 {
        let dates = self.series.dates();
        dates[from - 1].year_fraction(&dates[to - 1])
    }

    // ---------------------------------------------------------------------
    // modify
    // ---------------------------------------------------------------------

    pub fn set_start(&mut self, start: usize) -> Result<()> {
        let len = self.series.len();
        if start < 1 || start > len - 1 {
            return Err(HedgeError::out_of_range(format!(
                "start {start} of {} outside its possible range 1 - {}",
                self.name(),
                len - 1
            ))
            .traced());
        }
        if start >= self.end {
            return Err(HedgeError::invalid(format!(
                "start {start} of {} is equal to or above end {}",
                self.name(),
                self.end
            ))
            .traced());
        }
        self.start = start;
        debug!(simulator = %self.name(), start, date = %self.start_date(), "window start set");
        Ok(())
    }

    pub fn set_end(&mut self, end: usize) -> Result<()> {
        let len = self.series.len();
        if end < 2 || end > len {
            return Err(HedgeError::out_of_range(format!(
                "end {end} of {} outside its possible range 2 - {len}",
                self.name()
            ))
            .traced());
        }
        if end <= self.start {
            return Err(HedgeError::invalid(format!(
                "end {end} of {} is equal to or below start {}",
                self.name(),
                self.start
            ))
            .traced());
        }
        self.end = end;
        debug!(simulator = %self.name(), end, date = %self.end_date(), "window end set");
        Ok(())
    }

    /// Moves both bounds at once. The request is validated as a whole, so a
    /// rejected range leaves the previous window in place.
    pub fn set_range(&mut self, start: usize, end: usize) -> Result<()> {
        if start == end {
            return Err(HedgeError::invalid(format!(
                "range {start} - {end} of {} has equal bounds",
                self.name()
            ))
            .traced());
        }
        if start > end {
            return Err(HedgeError::invalid(format!(
                "range {start} - {end} of {} is crossing",
                self.name()
            ))
            .traced());
        }
        let len = self.series.len();
        if start < 1 || end > len {
            return Err(HedgeError::out_of_range(format!(
                "range {start} - {end} of {} outside 1 - {len}",
                self.name()
            ))
            .traced());
        }
        self.start = start;
        self.end = end;
        debug!(
            simulator = %self.name(),
            start,
            end,
            from = %self.start_date(),
            to = %self.end_date(),
            "window set"
        );
        Ok(())
    }

    /// Window covering the last `months` months of the series, the start
    /// resolved to the first observation on or after the shifted date.
    pub fn set_last_months(&mut self, months: u32) -> Result<()> {
        let last = self.series.len();
        let start = self
            .series
            .shift_months(last, months, Direction::Before, Fallback::Next)?;
        self.set_range(start, last)
    }

    /// Sets the strike as an absolute level, or as a percentage of the spot at
    /// the current window start when `as_percent` is true. Set the window first.
    pub fn set_strike(&mut self, value: f64, as_percent: bool) -> Result<()> {
        validate_strike(value, self.name())?;
        let strike = if as_percent {
            value * self.spot() / 100.0
        } else {
            value
        };
        validate_strike(strike, self.name())?;
        self.strike = strike;
        debug!(simulator = %self.name(), strike, "strike set");
        Ok(())
    }

    /// Any rate is accepted, negative included.
    pub fn set_rate(&mut self, rate: f64) -> Result<()> {
        if !rate.is_finite() {
            return Err(HedgeError::invalid(format!("rate {rate} is not finite")).traced());
        }
        self.rate = rate;
        debug!(simulator = %self.name(), rate, "rate set");
        Ok(())
    }

    pub fn set_dividend_yield(&mut self, dividend_yield: f64) -> Result<()> {
        validate_dividend_yield(dividend_yield, self.name())?;
        self.dividend_yield = dividend_yield;
        debug!(simulator = %self.name(), dividend_yield, "dividend yield set");
        Ok(())
    }

    // ---------------------------------------------------------------------
    // P&L
    // ---------------------------------------------------------------------

    pub fn estimate(&self, estimator: Estimator, vol: f64, kind: OptionKind) -> f64 {
        match estimator {
            Estimator::Plain => self.pnl(vol, kind),
            Estimator::Robust => self.pnl_robust(vol, kind),
        }
    }

    /// Realised P&L of the self-financing hedge of the option at volatility `vol`.
    ///
    /// Positive when the premium charged at `vol` more than paid for the hedge.
    pub fn pnl(&self, vol: f64, kind: OptionKind) -> f64 {
        let (strike, rate) = (self.strike, self.rate);
        let mut spot = self.spot();

        let mut value = self
            .model
            .price(spot, strike, self.maturity(), rate, vol, kind);
        let mut stock = self
            .model
            .delta(spot, strike, self.maturity(), rate, vol, kind);
        let mut cash = value - spot * stock;

        for i in self.start + 1..=self.end {
            let previous = spot;
            spot = self.spot_at(i);
            let remaining = self.years_between(i, self.end);
            let elapsed = self.years_between(i - 1, i);

            value += stock * (spot - previous) + cash * ((rate * elapsed).exp() - 1.0);

            // No rebalancing once the option has expired.
            if remaining != 0.0 {
                stock = self.model.delta(spot, strike, remaining, rate, vol, kind);
            }
            cash = value - spot * stock;
        }

        value - kind.payoff(spot, strike)
    }

    /// Hedge P&L ignoring the cash account. Matches [`pnl`](Self::pnl) when the
    /// rate is zero; with a positive rate it omits the interest and is not fit
    /// for breakeven searches.
    pub fn delta_pnl(&self, vol: f64, kind: OptionKind) -> f64 {
        let (strike, rate) = (self.strike, self.rate);
        let mut spot = self.spot();

        let mut value = self
            .model
            .price(spot, strike, self.maturity(), rate, vol, kind);
        let mut stock = self
            .model
            .delta(spot, strike, self.maturity(), rate, vol, kind);

        for i in self.start + 1..=self.end {
            let previous = spot;
            spot = self.spot_at(i);
            let remaining = self.years_between(i, self.end);

            value += stock * (spot - previous);

            if remaining != 0.0 {
                stock = self.model.delta(spot, strike, remaining, rate, vol, kind);
            }
        }

        value - kind.payoff(spot, strike)
    }

    /// Second-order P&L: minus half the dollar-gamma weighted sum of realised
    /// minus implied variance, `-0.5 * sum(gamma * S^2 * (r^2 - vol^2 dt))`.
    ///
    /// Close to [`pnl`](Self::pnl) away from expiry; it departs from it for
    /// strikes ending near the money, where gamma explodes in the last steps.
    pub fn pnl_robust(&self, vol: f64, kind: OptionKind) -> f64 {
        let (strike, rate) = (self.strike, self.rate);
        let mut gamma = self
            .model
            .gamma(self.spot(), strike, self.maturity(), rate, vol, kind);
        let mut sum = 0.0;

        for i in self.start + 1..=self.end {
            let previous = self.spot_at(i - 1);
            let spot = self.spot_at(i);
            let remaining = self.years_between(i, self.end);
            let dt = self.years_between(i - 1, i);
            let ret = (spot - previous) / previous;

            sum += gamma * previous * previous * (ret * ret - vol * vol * dt);

            if remaining != 0.0 {
                gamma = self.model.gamma(spot, strike, remaining, rate, vol, kind);
            }
        }

        -0.5 * sum
    }
}

fn validate_strike(strike: f64, name: &str) -> Result<()> {
    if strike <= 0.0 || !strike.is_finite() {
        return Err(HedgeError::invalid(format!(
            "strike {strike} of {name} must be positive"
        ))
        .traced());
    }
    Ok(())
}

fn validate_dividend_yield(dividend_yield: f64, name: &str) -> Result<()> {
    if dividend_yield <= 0.0 || !dividend_yield.is_finite() {
        return Err(HedgeError::invalid(format!(
            "dividend yield {dividend_yield} of {name} must be positive"
        ))
        .traced());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(values: &[f64]) -> Arc<DatedSeries> {
        let start = Date::from_ymd(2020, 1, 1).unwrap();
        let dates = (0..values.len())
            .map(|i| start.add_days(i as i64).unwrap())
            .collect();
        Arc::new(DatedSeries::new("test", dates, values.to_vec()).unwrap())
    }

    fn simulator(values: &[f64]) -> HedgeSimulator {
        HedgeSimulator::new(series(values), SimulatorParameters::new(100.0, 0.0, 0.01)).unwrap()
    }

    #[test]
    fn test_construction_validation() {
        let one = series(&[100.0]);
        assert!(HedgeSimulator::new(one, SimulatorParameters::new(100.0, 0.0, 0.01)).is_err());
        let s = series(&[100.0, 101.0]);
        assert!(HedgeSimulator::new(s.clone(), SimulatorParameters::new(0.0, 0.0, 0.01)).is_err());
        assert!(HedgeSimulator::new(s.clone(), SimulatorParameters::new(100.0, 0.0, 0.0)).is_err());
        let ok = HedgeSimulator::new(s, SimulatorParameters::new(100.0, -0.01, 0.01)).unwrap();
        assert_eq!((ok.start(), ok.end()), (1, 2));
    }

    #[test]
    fn test_window_setters() {
        let mut sim = simulator(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        assert!(sim.set_start(5).is_err()); // above len - 1
        assert!(sim.set_start(0).is_err());
        sim.set_start(3).unwrap();
        assert!(sim.set_end(3).is_err()); // equal to start
        assert!(sim.set_end(6).is_err());
        sim.set_end(4).unwrap();
        assert!(sim.set_start(4).is_err()); // equal to end
        assert_eq!((sim.start(), sim.end()), (3, 4));
        assert_eq!(sim.window_len(), 2);
    }

    #[test]
    fn test_set_range_is_atomic() {
        let mut sim = simulator(&[100.0, 101.0, 102.0, 103.0, 104.0]);
        sim.set_range(1, 2).unwrap();
        // Moving both bounds past the current end works in one call.
        sim.set_range(4, 5).unwrap();
        assert_eq!((sim.start(), sim.end()), (4, 5));
        sim.set_range(1, 2).unwrap();
        assert_eq!((sim.start(), sim.end()), (1, 2));

        assert!(sim.set_range(3, 3).is_err());
        assert!(sim.set_range(4, 2).is_err());
        assert!(sim.set_range(3, 9).is_err());
        assert!(sim.set_range(0, 3).is_err());
        assert_eq!((sim.start(), sim.end()), (1, 2));
    }

    #[test]
    fn test_strike_in_percent_reads_window_start() {
        let mut sim = simulator(&[100.0, 120.0, 130.0]);
        sim.set_start(2).unwrap();
        sim.set_strike(90.0, true).unwrap();
        assert!((sim.strike() - 108.0).abs() < 1e-12);
        sim.set_strike(95.0, false).unwrap();
        assert_eq!(sim.strike(), 95.0);
        assert!(sim.set_strike(-5.0, false).is_err());
        assert!(sim.set_strike(0.0, true).is_err());
        assert_eq!(sim.strike(), 95.0);
    }

    #[test]
    fn test_rate_and_dividend_setters() {
        let mut sim = simulator(&[100.0, 101.0]);
        sim.set_rate(-0.005).unwrap();
        assert_eq!(sim.rate(), -0.005);
        assert!(sim.set_dividend_yield(-0.01).is_err());
        assert_eq!(sim.dividend_yield(), 0.01);
        sim.set_dividend_yield(0.03).unwrap();
        assert_eq!(sim.dividend_yield(), 0.03);
    }

    #[test]
    fn test_single_step_pnl_by_hand() {
        // One day, zero rate: P&L = premium + delta * dS - payoff.
        let sim = simulator(&[100.0, 102.0]);
        let t = 1.0 / 365.0;
        let premium = BlackScholes.price(100.0, 100.0, t, 0.0, 0.2, OptionKind::Call);
        let delta = BlackScholes.delta(100.0, 100.0, t, 0.0, 0.2, OptionKind::Call);
        let expected = premium + delta * 2.0 - 2.0;
        assert!((sim.pnl(0.2, OptionKind::Call) - expected).abs() < 1e-12);
    }

    #[test]
    fn test_pnl_equals_delta_pnl_at_zero_rate() {
        let sim = simulator(&[100.0, 101.5, 99.0, 100.5, 102.0]);
        for &vol in &[0.1, 0.2, 0.4] {
            assert_eq!(
                sim.pnl(vol, OptionKind::Put),
                sim.delta_pnl(vol, OptionKind::Put)
            );
        }
    }

    #[test]
    fn test_cash_leg_accrues_interest() {
        let mut sim = simulator(&[100.0, 100.0, 100.0]);
        sim.set_strike(150.0, false).unwrap();
        sim.set_rate(0.05).unwrap();
        let with_interest = sim.pnl(0.2, OptionKind::Put);
        let without = sim.delta_pnl(0.2, OptionKind::Put);
        // Deep in-the-money put: the premium sits in cash and earns the rate.
        assert!(with_interest > without);
    }

    #[test]
    fn test_robust_pnl_sign() {
        // Flat path: no realised variance, so any positive vol was overpaid.
        let sim = simulator(&[100.0, 100.0, 100.0, 100.0]);
        assert!(sim.pnl_robust(0.2, OptionKind::Call) > 0.0);
        // Large moves: realised variance dominates a small implied vol.
        let sim = simulator(&[100.0, 105.0, 95.0, 104.0]);
        assert!(sim.pnl_robust(0.05, OptionKind::Call) < 0.0);
        assert_eq!(
            sim.estimate(Estimator::Robust, 0.05, OptionKind::Call),
            sim.pnl_robust(0.05, OptionKind::Call)
        );
    }

    #[test]
    fn test_last_months_window() {
        let start = Date::from_ymd(2019, 1, 1).unwrap();
        let dates: Vec<Date> = (0..200).map(|i| start.add_days(i).unwrap()).collect();
        let values = vec![100.0; dates.len()];
        let last = dates[199];
        let series = Arc::new(DatedSeries::new("daily", dates, values).unwrap());
        let mut sim =
            HedgeSimulator::new(series, SimulatorParameters::new(100.0, 0.0, 0.01)).unwrap();

        sim.set_last_months(3).unwrap();
        assert_eq!(sim.end(), 200);
        assert_eq!(sim.start_date(), last.add_months(-3).unwrap());

        // Longer than the history: clamps to the first observation.
        sim.set_last_months(24).unwrap();
        assert_eq!(sim.start(), 1);

        // Zero months would collapse the window.
        assert!(sim.set_last_months(0).is_err());
        assert_eq!(sim.start(), 1);
    }
}
