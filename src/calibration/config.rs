use std::path::Path;

use anyhow::{Context, Result as AnyResult};
use serde::{Deserialize, Serialize};

use crate::calibration::types::{Estimator, MarketParameters};
use crate::error::{HedgeError, Result};

/// What the solver does when the P&L at the bracket ends does not change sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BracketCheck {
    /// Bisect without looking at the bracket ends.
    Skip,
    /// Log a warning and bisect anyway.
    #[default]
    Warn,
    /// Fail with `InvalidParameter` before bisecting.
    Reject,
}

/// Bisection settings of the breakeven search
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverConfig {
    /// Standardised P&L above which the assumed vol is too high
    #[serde(default = "default_tol")]
    pub tol: f64,

    /// Bracket width at which the search stops
    #[serde(default = "default_precision")]
    pub precision: f64,

    /// Lower end of the vol bracket (> 0)
    #[serde(default = "default_vol_low")]
    pub vol_low: f64,

    /// Upper end of the vol bracket
    #[serde(default = "default_vol_high")]
    pub vol_high: f64,

    #[serde(default)]
    pub bracket_check: BracketCheck,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl SolverConfig {
    /// Basis-point precision over a 0.01% - 100% bracket
    pub fn standard() -> Self {
        Self {
            tol: default_tol(),
            precision: default_precision(),
            vol_low: default_vol_low(),
            vol_high: default_vol_high(),
            bracket_check: BracketCheck::Warn,
        }
    }

    /// Coarse settings for exploration and quick checks
    pub fn fast() -> Self {
        Self {
            precision: 1e-3,
            ..Self::standard()
        }
    }

    /// Fine settings over a wider bracket, refusing brackets that do not straddle
    pub fn precise() -> Self {
        Self {
            tol: 1e-15,
            precision: 1e-6,
            vol_low: 1e-4,
            vol_high: 2.0,
            bracket_check: BracketCheck::Reject,
        }
    }

    /// Bisection step budget, ten times the steps needed to scan a unit bracket
    /// at `precision`.
    pub fn max_iterations(&self) -> usize {
        (10.0 / self.precision).ceil() as usize
    }

    /// # Errors
    ///
    /// [`HedgeError::InvalidParameter`] unless every value is finite,
    /// `precision > 0` and `0 < vol_low < vol_high`.
    pub fn validate(&self) -> Result<()> {
        let values = [self.tol, self.precision, self.vol_low, self.vol_high];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(HedgeError::invalid(format!(
                "solver settings must be finite: {self:?}"
            ))
            .traced());
        }
        if self.precision <= 0.0 {
            return Err(HedgeError::invalid(format!(
                "precision {} must be positive",
                self.precision
            ))
            .traced());
        }
        if self.vol_low <= 0.0 || self.vol_low >= self.vol_high {
            return Err(HedgeError::invalid(format!(
                "vol bracket {} - {} must satisfy 0 < low < high",
                self.vol_low, self.vol_high
            ))
            .traced());
        }
        Ok(())
    }
}

/// Everything needed to build a surface from a price series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Strikes in percent of the spot at each window start
    #[serde(default = "default_strikes")]
    pub strikes: Vec<f64>,

    /// Window lengths in months
    #[serde(default = "default_maturities")]
    pub maturities: Vec<u32>,

    #[serde(default)]
    pub estimator: Estimator,

    #[serde(default)]
    pub solver: SolverConfig,

    #[serde(default)]
    pub market: MarketParameters,
}

impl Default for SurfaceConfig {
    fn default() -> Self {
        Self {
            strikes: default_strikes(),
            maturities: default_maturities(),
            estimator: Estimator::default(),
            solver: SolverConfig::default(),
            market: MarketParameters::default(),
        }
    }
}

impl SurfaceConfig {
    pub fn from_toml_str(text: &str) -> AnyResult<Self> {
        toml::from_str(text).context("parsing surface configuration")
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> AnyResult<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading surface configuration {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("in {}", path.display()))
    }
}

fn default_tol() -> f64 {
    1e-13
}

fn default_precision() -> f64 {
    1e-4
}

fn default_vol_low() -> f64 {
    1e-4
}

fn default_vol_high() -> f64 {
    1.0
}

fn default_strikes() -> Vec<f64> {
    (5..=15).map(|k| f64::from(k * 10)).collect()
}

fn default_maturities() -> Vec<u32> {
    (1..=12).collect()
}
