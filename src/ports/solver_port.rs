//! Quadratic program solver port used to trace the efficient frontier.

use crate::domain::error::PortfolioError;

/// minimize wᵀ Σ w subject to Σw = 1, w ≥ 0, μᵀw ≥ target.
#[derive(Debug, Clone, PartialEq)]
pub struct LongOnlyQp {
    pub covariance: Vec<Vec<f64>>,
    pub expected_returns: Vec<f64>,
    pub target_return: f64,
}

impl LongOnlyQp {
    pub fn dimension(&self) -> usize {
        self.expected_returns.len()
    }
}

/// Result of a single solve. Infeasibility and numerical failure are
/// reported separately; neither is an error.
#[derive(Debug, Clone, PartialEq)]
pub enum QpOutcome {
    Optimal { weights: Vec<f64>, variance: f64 },
    Infeasible,
    NotConverged { iterations: usize },
}

pub trait QpSolverPort {
    /// `Err` means the backend could not be invoked at all.
    fn solve(&self, problem: &LongOnlyQp) -> Result<QpOutcome, PortfolioError>;
}
