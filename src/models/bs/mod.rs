// Black-Scholes price, delta and gamma on a non-dividend-paying underlying.
// Puts come from call-put parity. Degenerate inputs (no time or no vol left)
// fall back to intrinsic value and its step-function delta.

use super::traits::PricingModel;
use super::OptionKind;

fn norm_cdf(x: f64) -> f64 {
    0.5 * libm::erfc(-x / std::f64::consts::SQRT_2)
}

fn norm_pdf(x: f64) -> f64 {
    (-0.5 * x * x).exp() / (2.0 * std::f64::consts::PI).sqrt()
}

#[allow(non_snake_case)]
fn d1(S: f64, K: f64, T: f64, r: f64, sigma: f64) -> f64 {
    ((S / K).ln() + (r + 0.5 * sigma * sigma) * T) / (sigma * T.sqrt())
}

/// Price of a European option under Black-Scholes assumptions.
#[allow(non_snake_case)]
pub fn bs_price(S: f64, K: f64, T: f64, r: f64, sigma: f64, kind: OptionKind) -> f64 {
    if T <= 0.0 || sigma <= 0.0 {
        let forward_intrinsic = S - K * (-r * T.max(0.0)).exp();
        return match kind {
            OptionKind::Call => forward_intrinsic.max(0.0),
            OptionKind::Put => (-forward_intrinsic).max(0.0),
        };
    }
    let d1 = d1(S, K, T, r, sigma);
    let d2 = d1 - sigma * T.sqrt();
    let call = S * norm_cdf(d1) - K * (-r * T).exp() * norm_cdf(d2);
    match kind {
        OptionKind::Call => call,
        OptionKind::Put => call - S + K * (-r * T).exp(),
    }
}

/// Sensitivity of the option price to the spot.
#[allow(non_snake_case)]
pub fn bs_delta(S: f64, K: f64, T: f64, r: f64, sigma: f64, kind: OptionKind) -> f64 {
    let call_delta = if T <= 0.0 || sigma <= 0.0 {
        if S > K * (-r * T.max(0.0)).exp() {
            1.0
        } else {
            0.0
        }
    } else {
        norm_cdf(d1(S, K, T, r, sigma))
    };
    match kind {
        OptionKind::Call => call_delta,
        OptionKind::Put => call_delta - 1.0,
    }
}

/// Second derivative of the option price to the spot; identical for calls and puts.
#[allow(non_snake_case)]
pub fn bs_gamma(S: f64, K: f64, T: f64, r: f64, sigma: f64) -> f64 {
    if T <= 0.0 || sigma <= 0.0 {
        return 0.0;
    }
    norm_pdf(d1(S, K, T, r, sigma)) / (S * sigma * T.sqrt())
}

/// Black-Scholes model for the hedge simulator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BlackScholes;

impl PricingModel for BlackScholes {
    fn price(
        &self,
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        vol: f64,
        kind: OptionKind,
    ) -> f64 {
        bs_price(spot, strike, maturity, rate, vol, kind)
    }

    fn delta(
        &self,
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        vol: f64,
        kind: OptionKind,
    ) -> f64 {
        bs_delta(spot, strike, maturity, rate, vol, kind)
    }

    fn gamma(
        &self,
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        vol: f64,
        _kind: OptionKind,
    ) -> f64 {
        bs_gamma(spot, strike, maturity, rate, vol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reference_price() {
        // Hull, S=42 K=40 T=0.5 r=10% sigma=20%: call 4.76, put 0.81
        let call = bs_price(42.0, 40.0, 0.5, 0.1, 0.2, OptionKind::Call);
        let put = bs_price(42.0, 40.0, 0.5, 0.1, 0.2, OptionKind::Put);
        assert_relative_eq!(call, 4.759, epsilon = 1e-3);
        assert_relative_eq!(put, 0.8086, epsilon = 1e-3);
    }

    #[test]
    fn test_call_put_parity() {
        let (s, k, t, r, v) = (100.0, 95.0, 0.75, 0.03, 0.25);
        let call = bs_price(s, k, t, r, v, OptionKind::Call);
        let put = bs_price(s, k, t, r, v, OptionKind::Put);
        assert_relative_eq!(call - put, s - k * (-r * t).exp(), epsilon = 1e-10);

        let dc = bs_delta(s, k, t, r, v, OptionKind::Call);
        let dp = bs_delta(s, k, t, r, v, OptionKind::Put);
        assert_relative_eq!(dc - dp, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_greeks_match_finite_differences() {
        let (s, k, t, r, v) = (100.0, 105.0, 0.5, 0.01, 0.3);
        let h = 1e-3;
        let up = bs_price(s + h, k, t, r, v, OptionKind::Call);
        let mid = bs_price(s, k, t, r, v, OptionKind::Call);
        let down = bs_price(s - h, k, t, r, v, OptionKind::Call);
        assert_relative_eq!(
            bs_delta(s, k, t, r, v, OptionKind::Call),
            (up - down) / (2.0 * h),
            epsilon = 1e-6
        );
        assert_relative_eq!(
            bs_gamma(s, k, t, r, v),
            (up - 2.0 * mid + down) / (h * h),
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_degenerate_inputs() {
        assert_eq!(bs_price(110.0, 100.0, 0.0, 0.05, 0.2, OptionKind::Call), 10.0);
        assert_eq!(bs_price(110.0, 100.0, 0.0, 0.05, 0.2, OptionKind::Put), 0.0);
        assert_eq!(bs_delta(90.0, 100.0, 0.0, 0.0, 0.2, OptionKind::Put), -1.0);
        assert_eq!(bs_gamma(100.0, 100.0, 0.0, 0.0, 0.2), 0.0);
    }

    #[test]
    fn test_model_gamma_ignores_kind() {
        let m = BlackScholes;
        assert_eq!(
            m.gamma(100.0, 90.0, 0.25, 0.0, 0.2, OptionKind::Call),
            m.gamma(100.0, 90.0, 0.25, 0.0, 0.2, OptionKind::Put)
        );
    }
}
