//! # breakeven-vol: Implied Volatility from Historical Delta Hedging
//!
//! `breakeven-vol` answers one question about a historical price path: at what
//! volatility would a daily-rebalanced, self-financing delta hedge of a
//! European option have broken even? Repeating the question over a grid of
//! strikes and window lengths gives a realised-data analogue of an implied
//! volatility surface.
//!
//! ## Core Features
//!
//! - **Dated series**: 1-based, strictly ascending `(date, value)` observations
//!   with nearest-date resolution and month/day shifts
//! - **Hedge replay**: plain P&L with an interest-bearing cash leg, and a
//!   second-order dollar-gamma estimator
//! - **Breakeven search**: bisection on the standardised P&L with a bounded
//!   step budget
//! - **Surfaces**: strike by maturity grids, `;`-delimited export and SVG charts
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use breakeven_vol::{build_surface, load_csv, Estimator, SurfaceConfig};
//!
//! let series = Arc::new(load_csv("data/SPX.csv", "SPX")?);
//! let config = SurfaceConfig {
//!     strikes: vec![90.0, 100.0, 110.0],
//!     maturities: vec![1, 3, 6, 12],
//!     estimator: Estimator::Plain,
//!     ..SurfaceConfig::default()
//! };
//!
//! let surface = build_surface(series, &config)?;
//! println!("{}", surface.to_delimited()?);
//! println!("ATM 3M: {:.4}", surface.vol_at(100.0, 3)?);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! ## Configuration Presets
//!
//! The solver comes with three presets in [`default_configs`]:
//! - `standard()`: basis-point precision, warns on a bracket without a sign change
//! - `fast()`: ten times coarser, for exploration
//! - `precise()`: 1e-6 precision over a wider bracket, rejects bad brackets

// ================================================================================================
// MODULES
// ================================================================================================

pub mod calibration;
pub mod error;
pub mod hedging;
pub mod models;
pub mod series;
pub mod surface;
pub mod synthetic;

// ================================================================================================
// PUBLIC RE-EXPORTS
// ================================================================================================

use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

pub use calibration::{
    BracketCheck, Breakeven, Estimator, ImpliedVolSolver, MarketParameters, SimulatorParameters,
    SolverConfig, SurfaceConfig, FAILED_VOL,
};
pub use error::HedgeError;
pub use hedging::HedgeSimulator;
pub use models::{traits::PricingModel, BlackScholes, OptionKind};
pub use series::{load_csv, load_csv_sized, Date, DatedSeries, Direction, Fallback, ShiftUnit};
pub use surface::{BuildSummary, VolSurface};

// ================================================================================================
// DEFAULT CONFIGURATIONS
// ================================================================================================

/// Pre-configured breakeven search settings.
///
/// # Available Configurations
///
/// - [`standard()`](default_configs::standard): default settings
/// - [`fast()`](default_configs::fast): coarse settings
/// - [`precise()`](default_configs::precise): fine settings with strict bracket checks
pub mod default_configs {
    use crate::calibration::config::SolverConfig;

    /// Precision `1e-4` over the bracket `[1e-4, 1.0]`, tolerance `1e-13`
    /// on the standardised P&L. A bracket whose ends do not change sign is
    /// logged and bisected anyway.
    ///
    /// # Example
    ///
    /// ```rust
    /// use breakeven_vol::default_configs;
    ///
    /// let config = default_configs::standard();
    /// assert_eq!(config.max_iterations(), 100_000);
    /// ```
    pub fn standard() -> SolverConfig {
        SolverConfig::standard()
    }

    /// Precision `1e-3`; otherwise as [`standard`].
    pub fn fast() -> SolverConfig {
        SolverConfig::fast()
    }

    /// Precision `1e-6` over `[1e-4, 2.0]`, tolerance `1e-15`, and a bracket
    /// without a sign change is an error.
    pub fn precise() -> SolverConfig {
        SolverConfig::precise()
    }
}

// ================================================================================================
// CONVENIENCE FUNCTIONS
// ================================================================================================

/// Builds a full surface over `series` as described by `config`.
///
/// Cells whose window or search fails hold [`FAILED_VOL`]; the build itself
/// only fails when the configuration cannot describe a surface (empty lists,
/// non-positive strikes or dividend yield, a series of one observation).
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use breakeven_vol::{build_surface, synthetic, Date, Estimator, SurfaceConfig};
///
/// let start = Date::from_ymd(2020, 1, 1)?;
/// let series = Arc::new(synthetic::zigzag_series("ZZ", start, 120, 100.0, 0.2)?);
/// let config = SurfaceConfig {
///     strikes: vec![100.0],
///     maturities: vec![1, 3],
///     estimator: Estimator::Robust,
///     ..SurfaceConfig::default()
/// };
/// let surface = build_surface(series, &config)?;
/// assert!((surface.vol_at(100.0, 3)? - 0.2).abs() < 1e-3);
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn build_surface(series: Arc<DatedSeries>, config: &SurfaceConfig) -> Result<VolSurface> {
    let name = series.name().to_string();
    let mut surface = VolSurface::from_config(series, config)
        .with_context(|| format!("configuring surface for {name}"))?;
    let summary = surface.build(config.estimator);
    info!(
        series = %name,
        cells = summary.cells,
        failures = summary.failures,
        "build_surface done"
    );
    Ok(surface)
}

/// Breakeven vol of a single option: the last `months` months of `series`,
/// strike at `strike_pct` percent of the spot at the window start, solved with
/// the estimator, solver and market settings of `config` (its grid lists are
/// ignored).
///
/// Unlike a surface build, a failed search is returned as an error.
pub fn breakeven_vol(
    series: Arc<DatedSeries>,
    months: u32,
    strike_pct: f64,
    config: &SurfaceConfig,
) -> Result<Breakeven> {
    let name = series.name().to_string();
    let params = SimulatorParameters::with_market(100.0, config.market);
    let mut simulator = HedgeSimulator::new(series, params)?;
    simulator
        .set_last_months(months)
        .with_context(|| format!("placing a {months}M window on {name}"))?;
    simulator
        .set_strike(strike_pct, true)
        .with_context(|| format!("strike {strike_pct}% on {name}"))?;
    let breakeven = ImpliedVolSolver::new(config.solver.clone())
        .try_solve(&simulator, config.estimator)
        .with_context(|| format!("breakeven of {name} {months}M {strike_pct}%"))?;
    Ok(breakeven)
}
