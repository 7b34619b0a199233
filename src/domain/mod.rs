//! Core domain types and logic.

pub mod error;
pub mod stats;
pub mod prices;
pub mod returns;
pub mod weights;
pub mod equity;
pub mod metrics;
pub mod monte_carlo;
pub mod frontier;
pub mod backtest;
pub mod rebalance;
pub mod universe;
pub mod config_validation;
