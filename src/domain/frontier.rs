//! Efficient frontier construction.
//!
//! For each target annual return on a grid spanning the lowest to the
//! highest single-asset mean, the minimum-variance long-only portfolio
//! reaching at least that return is solved through a [`QpSolverPort`].
//! Targets the solver reports as infeasible or unsolved are skipped.

use crate::domain::error::PortfolioError;
use crate::domain::metrics::TRADING_DAYS_PER_YEAR;
use crate::domain::returns::ReturnSeries;
use crate::domain::stats;
use crate::domain::weights::WeightVector;
use crate::ports::solver_port::{LongOnlyQp, QpOutcome, QpSolverPort};

pub const DEFAULT_FRONTIER_POINTS: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct FrontierPoint {
    pub target_return: f64,
    pub volatility: f64,
    pub weights: WeightVector,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTarget {
    pub target_return: f64,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Infeasible,
    NotConverged,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frontier {
    pub points: Vec<FrontierPoint>,
    pub skipped: Vec<SkippedTarget>,
}

impl Frontier {
    pub fn target_returns(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.target_return).collect()
    }

    pub fn volatilities(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.volatility).collect()
    }

    pub fn infeasible_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.reason == SkipReason::Infeasible)
            .count()
    }

    pub fn not_converged_count(&self) -> usize {
        self.skipped
            .iter()
            .filter(|s| s.reason == SkipReason::NotConverged)
            .count()
    }
}

pub struct FrontierSolver<'a> {
    solver: &'a dyn QpSolverPort,
    points: usize,
    periods_per_year: f64,
}

impl<'a> FrontierSolver<'a> {
    pub fn new(solver: &'a dyn QpSolverPort) -> Self {
        Self {
            solver,
            points: DEFAULT_FRONTIER_POINTS,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }

    pub fn with_points(mut self, points: usize) -> Self {
        self.points = points;
        self
    }

    pub fn with_periods_per_year(mut self, periods_per_year: f64) -> Self {
        self.periods_per_year = periods_per_year;
        self
    }

    /// Annualized mean return per asset.
    pub fn annual_means(&self, returns: &ReturnSeries) -> Vec<f64> {
        returns
            .mean_returns()
            .into_iter()
            .map(|m| m * self.periods_per_year)
            .collect()
    }

    /// Evenly spaced targets from the lowest to the highest annual mean.
    pub fn target_grid(&self, returns: &ReturnSeries) -> Vec<f64> {
        let mus = self.annual_means(returns);
        let lo = mus.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = mus.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if !lo.is_finite() || !hi.is_finite() {
            return Vec::new();
        }
        stats::linspace(lo, hi, self.points)
    }

    /// Frontier over the default grid.
    pub fn solve(&self, returns: &ReturnSeries) -> Result<Frontier, PortfolioError> {
        let grid = self.target_grid(returns);
        self.solve_targets(returns, &grid)
    }

    /// Frontier over caller-supplied targets. Only a solver that cannot be
    /// invoked at all produces an error.
    pub fn solve_targets(
        &self,
        returns: &ReturnSeries,
        targets: &[f64],
    ) -> Result<Frontier, PortfolioError> {
        let expected_returns = self.annual_means(returns);
        let covariance: Vec<Vec<f64>> = returns
            .covariance()
            .into_iter()
            .map(|row| row.into_iter().map(|c| c * self.periods_per_year).collect())
            .collect();

        let mut problem = LongOnlyQp {
            covariance,
            expected_returns,
            target_return: 0.0,
        };
        let mut frontier = Frontier::default();

        for &target in targets {
            problem.target_return = target;
            match self.solver.solve(&problem)? {
                QpOutcome::Optimal { weights, variance } => {
                    frontier.points.push(FrontierPoint {
                        target_return: target,
                        volatility: variance.max(0.0).sqrt(),
                        weights: WeightVector::new(weights),
                    });
                }
                QpOutcome::Infeasible => {
                    tracing::warn!(target_return = target, "frontier target infeasible");
                    frontier.skipped.push(SkippedTarget {
                        target_return: target,
                        reason: SkipReason::Infeasible,
                    });
                }
                QpOutcome::NotConverged { iterations } => {
                    tracing::warn!(
                        target_return = target,
                        iterations,
                        "frontier solve did not converge"
                    );
                    frontier.skipped.push(SkippedTarget {
                        target_return: target,
                        reason: SkipReason::NotConverged,
                    });
                }
            }
        }

        if !frontier.skipped.is_empty() {
            tracing::warn!(
                solved = frontier.points.len(),
                infeasible = frontier.infeasible_count(),
                not_converged = frontier.not_converged_count(),
                "frontier built with skipped targets"
            );
        }

        Ok(frontier)
    }
}
