use serde::{Deserialize, Serialize};
use std::fmt;

use crate::models::OptionKind;

/// Which realised-P&L estimator drives the breakeven search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Estimator {
    /// Self-financing daily delta hedge with an interest-bearing cash leg.
    #[default]
    Plain,
    /// Dollar-gamma weighted realised-minus-implied variance.
    Robust,
}

impl fmt::Display for Estimator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Estimator::Plain => write!(f, "delta hedging portfolio"),
            Estimator::Robust => write!(f, "Black-Scholes robustness formula"),
        }
    }
}

/// Market inputs shared by every cell of a surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketParameters {
    /// Continuously compounded risk-free rate
    pub rate: f64,
    /// Dividend yield; validated (> 0) but not used in valuation
    pub dividend_yield: f64,
}

impl Default for MarketParameters {
    fn default() -> Self {
        Self {
            rate: 0.0,
            dividend_yield: 0.02,
        }
    }
}

/// Strike and market inputs of a hedge simulator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SimulatorParameters {
    /// Absolute strike level (> 0)
    pub strike: f64,
    pub rate: f64,
    pub dividend_yield: f64,
}

impl SimulatorParameters {
    pub fn new(strike: f64, rate: f64, dividend_yield: f64) -> Self {
        Self {
            strike,
            rate,
            dividend_yield,
        }
    }

    pub fn with_market(strike: f64, market: MarketParameters) -> Self {
        Self::new(strike, market.rate, market.dividend_yield)
    }
}

/// Outcome of a successful breakeven search.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Breakeven {
    /// Breakeven volatility
    pub vol: f64,
    /// Bisection steps taken
    pub iterations: usize,
    /// Hedged option, picked from the terminal moneyness
    pub kind: OptionKind,
}
