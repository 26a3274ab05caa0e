pub mod config;
pub mod solver;
pub mod types;

pub use config::{BracketCheck, SolverConfig, SurfaceConfig};
pub use solver::{ImpliedVolSolver, FAILED_VOL};
pub use types::{Breakeven, Estimator, MarketParameters, SimulatorParameters};
