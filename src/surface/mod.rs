//! Breakeven volatility surfaces.
//!
//! [`VolSurface`] drives one [`HedgeSimulator`](crate::hedging::HedgeSimulator)
//! across a strike by maturity grid, [`export`] writes the grid as a
//! `;`-delimited table and [`plot`] draws its slices.

pub mod export;
pub mod grid;
pub mod plot;

pub use grid::{BuildSummary, VolSurface};
pub use plot::{render_skew_svg, render_term_structure_svg};
