pub mod bs;

pub use bs::BlackScholes;

use serde::{Deserialize, Serialize};

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionKind {
    Call,
    Put,
}

impl OptionKind {
    /// Terminal payoff of a European option.
    pub fn payoff(self, spot: f64, strike: f64) -> f64 {
        match self {
            OptionKind::Call => (spot - strike).max(0.0),
            OptionKind::Put => (strike - spot).max(0.0),
        }
    }
}

/// Common traits used by the hedging engine
pub mod traits {
    use super::OptionKind;

    /// Closed-form pricing model consumed by the hedge simulator.
    ///
    /// Implementations are pure functions of their arguments. `maturity` is in
    /// years, `rate` continuously compounded.
    pub trait PricingModel: Send + Sync + std::fmt::Debug {
        fn price(
            &self,
            spot: f64,
            strike: f64,
            maturity: f64,
            rate: f64,
            vol: f64,
            kind: OptionKind,
        ) -> f64;

        fn delta(
            &self,
            spot: f64,
            strike: f64,
            maturity: f64,
            rate: f64,
            vol: f64,
            kind: OptionKind,
        ) -> f64;

        fn gamma(
            &self,
            spot: f64,
            strike: f64,
            maturity: f64,
            rate: f64,
            vol: f64,
            kind: OptionKind,
        ) -> f64;
    }
}
