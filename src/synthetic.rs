//! Synthetic daily price paths with a known volatility.
//!
//! Every generator produces one observation per calendar day, so every step is
//! `1/365` of a year.

use rand::distributions::Distribution;
use rand::rngs::StdRng;
use rand::SeedableRng;
use statrs::distribution::Normal;

use crate::error::{HedgeError, Result};
use crate::models::traits::PricingModel;
use crate::models::{BlackScholes, OptionKind};
use crate::series::{Date, DatedSeries, DAYS_PER_YEAR};

fn daily_dates(start: Date, days: usize) -> Result<Vec<Date>> {
    (0..days)
        .map(|i| {
            start.add_days(i as i64).ok_or_else(|| {
                HedgeError::invalid(format!("{days} days from {start} leave the calendar"))
            })
        })
        .collect()
}

fn check_inputs(days: usize, spot: f64, vol: f64) -> Result<()> {
    if days < 2 {
        return Err(HedgeError::invalid(format!(
            "a path needs at least two days, got {days}"
        )));
    }
    if spot <= 0.0 || !spot.is_finite() {
        return Err(HedgeError::invalid(format!(
            "initial spot {spot} must be positive"
        )));
    }
    if vol < 0.0 || !vol.is_finite() {
        return Err(HedgeError::invalid(format!("vol {vol} must be non-negative")));
    }
    Ok(())
}

/// Path alternating simple returns of `+vol * sqrt(dt)` and `-vol * sqrt(dt)`.
///
/// Every squared daily return equals `vol^2 * dt` exactly, so the realised
/// variance the hedge sees is the one it is priced with at `vol`.
pub fn zigzag_series(
    name: &str,
    start: Date,
    days: usize,
    spot: f64,
    vol: f64,
) -> Result<DatedSeries> {
    check_inputs(days, spot, vol)?;
    let step = vol * (1.0 / DAYS_PER_YEAR).sqrt();
    let values = (0..days)
        .scan(spot, |level, i| {
            let current = *level;
            *level *= if i % 2 == 0 { 1.0 + step } else { 1.0 - step };
            Some(current)
        })
        .collect();
    DatedSeries::new(name, daily_dates(start, days)?, values)
}

/// Seeded geometric Brownian motion with annual `drift` and `vol`.
pub fn gbm_series(
    name: &str,
    start: Date,
    days: usize,
    spot: f64,
    vol: f64,
    drift: f64,
    seed: u64,
) -> Result<DatedSeries> {
    check_inputs(days, spot, vol)?;
    let normal = Normal::new(0.0, 1.0).map_err(|e| HedgeError::invalid(e.to_string()))?;
    let mut rng = StdRng::seed_from_u64(seed);
    let dt = 1.0 / DAYS_PER_YEAR;
    let (mu, sd) = ((drift - 0.5 * vol * vol) * dt, vol * dt.sqrt());

    let mut values = Vec::with_capacity(days);
    let mut level = spot;
    values.push(level);
    for _ in 1..days {
        level *= (mu + sd * normal.sample(&mut rng)).exp();
        values.push(level);
    }
    DatedSeries::new(name, daily_dates(start, days)?, values)
}

/// Path along which the self-financing delta hedge of a call struck at
/// `strike`, priced at `vol` and financed at `rate`, breaks even exactly.
///
/// Each observation is the spot at which the portfolio rebalanced on the
/// previous day is worth the Black-Scholes price over the remaining maturity.
/// Up and down moves alternate. By call-put parity the put hedge breaks even
/// as well, so the plain P&L of a simulator over the whole path vanishes at
/// `vol` whichever kind is hedged.
pub fn breakeven_series(
    name: &str,
    start: Date,
    days: usize,
    spot: f64,
    strike: f64,
    vol: f64,
    rate: f64,
) -> Result<DatedSeries> {
    check_inputs(days, spot, vol)?;
    if vol == 0.0 {
        return Err(HedgeError::invalid("a breakeven path needs a positive vol"));
    }
    if strike <= 0.0 || !strike.is_finite() || !rate.is_finite() {
        return Err(HedgeError::invalid(format!(
            "strike {strike} must be positive and rate {rate} finite"
        )));
    }

    let dates = daily_dates(start, days)?;
    let (model, kind) = (BlackScholes, OptionKind::Call);
    let expiry = dates[days - 1];
    let scale = vol * (1.0 / DAYS_PER_YEAR).sqrt();

    let maturity = dates[0].year_fraction(&expiry);
    let mut level = spot;
    let mut value = model.price(level, strike, maturity, rate, vol, kind);
    let mut stock = model.delta(level, strike, maturity, rate, vol, kind);
    let mut cash = value - level * stock;

    let mut values = Vec::with_capacity(days);
    values.push(level);
    for i in 1..days {
        let remaining = dates[i].year_fraction(&expiry);
        let growth = (rate * dates[i - 1].year_fraction(&dates[i])).exp() - 1.0;
        let previous = level;
        let portfolio = |s: f64| value + (stock * (s - previous) + cash * growth);
        let surplus = |s: f64| portfolio(s) - model.price(s, strike, remaining, rate, vol, kind);

        level = replicating_spot(surplus, previous, scale, i % 2 == 1)?;
        let next_value = portfolio(level);
        value = next_value;
        if remaining != 0.0 {
            stock = model.delta(level, strike, remaining, rate, vol, kind);
        }
        cash = value - level * stock;
        values.push(level);
    }
    DatedSeries::new(name, dates, values)
}

// `surplus` is positive at `from` (the day's time value) and concave in the
// spot, so it has one root on each side. Log moves double until the root is
// passed, then the bracket is bisected down to adjacent floats.
fn replicating_spot(
    surplus: impl Fn(f64) -> f64,
    from: f64,
    scale: f64,
    upward: bool,
) -> Result<f64> {
    let at_from = surplus(from);
    if !(at_from > 0.0) {
        return Err(HedgeError::invalid(format!(
            "no time value left to replicate at spot {from} (surplus {at_from})"
        )));
    }

    let mut reach = scale;
    let mut outside = None;
    for _ in 0..64 {
        let candidate = from * if upward { reach.exp() } else { (-reach).exp() };
        if surplus(candidate) <= 0.0 {
            outside = Some(candidate);
            break;
        }
        reach *= 2.0;
    }
    let mut outside = outside.ok_or_else(|| {
        HedgeError::non_convergence(64, format!("no replicating spot found from {from}"))
    })?;

    let mut inside = from;
    loop {
        let mid = 0.5 * (inside + outside);
        if mid == inside || mid == outside {
            return Ok(outside);
        }
        if surplus(mid) > 0.0 {
            inside = mid;
        } else {
            outside = mid;
        }
    }
}
