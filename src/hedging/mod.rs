//! Delta-hedge replay over a dated price series.

pub mod simulator;

pub use simulator::HedgeSimulator;
