//! Strike by maturity grid of breakeven volatilities.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::calibration::config::{SolverConfig, SurfaceConfig};
use crate::calibration::solver::{ImpliedVolSolver, FAILED_VOL};
use crate::calibration::types::{Estimator, SimulatorParameters};
use crate::error::{HedgeError, Result};
use crate::hedging::HedgeSimulator;
use crate::models::traits::PricingModel;
use crate::models::BlackScholes;
use crate::series::DatedSeries;

/// Outcome of a [`VolSurface::build`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSummary {
    /// Number of grid cells computed
    pub cells: usize,
    /// Cells that hold [`FAILED_VOL`] because their window or search failed
    pub failures: usize,
    pub estimator: Estimator,
}

/// Breakeven volatilities for every `(strike, maturity)` pair.
///
/// Strikes are percentages of the spot at each window start; maturities are
/// window lengths in months, every window ending at the last observation.
/// The surface owns the simulator it drives, so a build has exclusive use of it.
#[derive(Debug, Clone)]
pub struct VolSurface<M = BlackScholes> {
    simulator: HedgeSimulator<M>,
    solver: ImpliedVolSolver,
    strikes: Vec<f64>,
    maturities: Vec<u32>,
    // Maturity-major, `maturity_index * strikes.len() + strike_index`.
    vols: Option<Vec<f64>>,
    estimator: Option<Estimator>,
}

impl VolSurface<BlackScholes> {
    /// Surface over `series` with the strikes, maturities, solver and market
    /// inputs of `config`. Nothing is computed until [`build`](Self::build).
    pub fn from_config(series: Arc<DatedSeries>, config: &SurfaceConfig) -> Result<Self> {
        // Placeholder strike, every build resolves the listed percentages.
        let params = SimulatorParameters::with_market(100.0, config.market);
        let simulator = HedgeSimulator::new(series, params)?;
        Self::new(
            simulator,
            config.strikes.clone(),
            config.maturities.clone(),
            config.solver.clone(),
        )
    }
}

impl<M: PricingModel> VolSurface<M> {
    pub fn new(
        simulator: HedgeSimulator<M>,
        strikes: Vec<f64>,
        maturities: Vec<u32>,
        solver: SolverConfig,
    ) -> Result<Self> {
        validate_strikes(&strikes)?;
        validate_maturities(&maturities)?;
        Ok(Self {
            simulator,
            solver: ImpliedVolSolver::new(solver),
            strikes,
            maturities,
            vols: None,
            estimator: None,
        })
    }

    pub fn name(&self) -> &str {
        self.simulator.name()
    }

    pub fn simulator(&self) -> &HedgeSimulator<M> {
        &self.simulator
    }

    pub fn solver(&self) -> &ImpliedVolSolver {
        &self.solver
    }

    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }

    pub fn maturities(&self) -> &[u32] {
        &self.maturities
    }

    pub fn is_built(&self) -> bool {
        self.vols.is_some()
    }

    /// Estimator of the last build, if the grid is current.
    pub fn estimator(&self) -> Option<Estimator> {
        self.estimator
    }

    /// Maturity-major cell values of the last build.
    pub fn vols(&self) -> Option<&[f64]> {
        self.vols.as_deref()
    }

    fn invalidate(&mut self, reason: &str) {
        if self.vols.take().is_some() {
            debug!(surface = %self.name(), reason, "grid discarded");
        }
        self.estimator = None;
    }

    /// Replaces the strike list and discards every computed cell.
    pub fn set_strikes(&mut self, strikes: Vec<f64>) -> Result<()> {
        validate_strikes(&strikes)?;
        self.strikes = strikes;
        self.invalidate("strikes redefined");
        Ok(())
    }

    /// Replaces the maturity list and discards every computed cell.
    pub fn set_maturities(&mut self, maturities: Vec<u32>) -> Result<()> {
        validate_maturities(&maturities)?;
        self.maturities = maturities;
        self.invalidate("maturities redefined");
        Ok(())
    }

    /// Swaps the simulator (and with it the series) and discards the grid.
    pub fn set_simulator(&mut self, simulator: HedgeSimulator<M>) {
        self.simulator = simulator;
        self.invalidate("simulator replaced");
    }

    pub fn set_solver_config(&mut self, config: SolverConfig) {
        self.solver.set_config(config);
        self.invalidate("solver settings changed");
    }

    /// Computes every cell, maturities in the outer loop and strikes in the
    /// inner one.
    ///
    /// Cells whose window cannot be set or whose search fails hold
    /// [`FAILED_VOL`] and are counted in [`BuildSummary::failures`].
    pub fn build(&mut self, estimator: Estimator) -> BuildSummary {
        let ns = self.strikes.len();
        let mut vols = vec![FAILED_VOL; ns * self.maturities.len()];
        let mut failures = 0;

        for (mi, &months) in self.maturities.iter().enumerate() {
            if let Err(error) = self.simulator.set_last_months(months) {
                warn!(surface = %self.simulator.name(), months, %error, "maturity skipped");
                failures += ns;
                continue;
            }
            for (ki, &strike) in self.strikes.iter().enumerate() {
                if let Err(error) = self.simulator.set_strike(strike, true) {
                    warn!(
                        surface = %self.simulator.name(),
                        months,
                        strike,
                        %error,
                        "strike skipped"
                    );
                    failures += 1;
                    continue;
                }
                let vol = self.solver.solve(&self.simulator, estimator);
                if vol == FAILED_VOL {
                    failures += 1;
                }
                vols[mi * ns + ki] = vol;
            }
        }

        let summary = BuildSummary {
            cells: vols.len(),
            failures,
            estimator,
        };
        info!(
            surface = %self.name(),
            %estimator,
            cells = summary.cells,
            failures,
            "surface built"
        );
        self.vols = Some(vols);
        self.estimator = Some(estimator);
        summary
    }

    fn grid(&self) -> Result<&[f64]> {
        self.vols.as_deref().ok_or_else(|| {
            HedgeError::not_found(format!("surface {} has not been built", self.name())).traced()
        })
    }

    fn strike_index(&self, strike: f64) -> Result<usize> {
        self.strikes.iter().position(|&k| k == strike).ok_or_else(|| {
            HedgeError::not_found(format!("strike {strike} not in surface {}", self.name()))
                .traced()
        })
    }

    fn maturity_index(&self, maturity: u32) -> Result<usize> {
        self.maturities
            .iter()
            .position(|&m| m == maturity)
            .ok_or_else(|| {
                HedgeError::not_found(format!(
                    "maturity {maturity}M not in surface {}",
                    self.name()
                ))
                .traced()
            })
    }

    /// Vol of one cell. Strike and maturity must equal a listed value exactly.
    pub fn vol_at(&self, strike: f64, maturity: u32) -> Result<f64> {
        let grid = self.grid()?;
        let ki = self.strike_index(strike)?;
        let mi = self.maturity_index(maturity)?;
        Ok(grid[mi * self.strikes.len() + ki])
    }

    /// Vols at `strike` in maturity-list order.
    pub fn term_structure(&self, strike: f64) -> Result<Vec<f64>> {
        let grid = self.grid()?;
        let ki = self.strike_index(strike)?;
        let ns = self.strikes.len();
        Ok((0..self.maturities.len()).map(|mi| grid[mi * ns + ki]).collect())
    }

    /// Vols at `maturity` in strike-list order.
    pub fn skew(&self, maturity: u32) -> Result<Vec<f64>> {
        let grid = self.grid()?;
        let mi = self.maturity_index(maturity)?;
        let ns = self.strikes.len();
        Ok(grid[mi * ns..(mi + 1) * ns].to_vec())
    }
}

fn validate_strikes(strikes: &[f64]) -> Result<()> {
    if strikes.is_empty() {
        return Err(HedgeError::invalid("strike list is empty").traced());
    }
    if let Some(bad) = strikes.iter().find(|k| **k <= 0.0 || !k.is_finite()) {
        return Err(HedgeError::invalid(format!("strike {bad}% must be positive")).traced());
    }
    Ok(())
}

fn validate_maturities(maturities: &[u32]) -> Result<()> {
    if maturities.is_empty() {
        return Err(HedgeError::invalid("maturity list is empty").traced());
    }
    if maturities.contains(&0) {
        return Err(HedgeError::invalid("maturity of 0 months").traced());
    }
    Ok(())
}
