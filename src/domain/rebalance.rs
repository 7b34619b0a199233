//! Annual rebalancing.
//!
//! The return series is cut into calendar years. Each year with enough
//! observations gets its own max-Sharpe allocation, a diagnostic frontier
//! and a backtest seeded with the previous year's closing equity. The
//! yearly equity segments are chained into one curve.

use std::collections::BTreeMap;

use super::backtest::{BacktestConfig, Backtester};
use super::equity::EquityCurve;
use super::error::PortfolioError;
use super::frontier::{DEFAULT_FRONTIER_POINTS, Frontier, FrontierSolver};
use super::metrics::PerformanceSummary;
use super::monte_carlo::{MonteCarloSampler, SamplerConfig, SamplingResult};
use super::returns::ReturnSeries;
use super::weights::WeightVector;
use crate::ports::solver_port::QpSolverPort;

pub const DEFAULT_MIN_OBSERVATIONS: usize = 50;

/// Weights chosen for each processed year.
pub type YearlyAllocation = BTreeMap<i32, WeightVector>;

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceConfig {
    pub min_observations: usize,
    pub seed: u64,
    pub frontier_points: usize,
    pub sampler: SamplerConfig,
    pub backtest: BacktestConfig,
}

impl Default for RebalanceConfig {
    fn default() -> Self {
        Self {
            min_observations: DEFAULT_MIN_OBSERVATIONS,
            seed: 42,
            frontier_points: DEFAULT_FRONTIER_POINTS,
            sampler: SamplerConfig::default(),
            backtest: BacktestConfig::default(),
        }
    }
}

/// Generator seed for `year`, so a year can be replayed on its own.
pub fn seed_for_year(seed: u64, year: i32) -> u64 {
    seed.wrapping_add_signed(i64::from(year))
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearResult {
    pub year: i32,
    pub initial_capital: f64,
    pub weights: WeightVector,
    pub herfindahl: f64,
    pub sampling: SamplingResult,
    pub frontier: Frontier,
    pub equity: EquityCurve,
    pub summary: PerformanceSummary,
}

impl YearResult {
    pub fn final_capital(&self) -> f64 {
        self.equity.final_value().unwrap_or(self.initial_capital)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedYear {
    pub year: i32,
    pub observations: usize,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RebalanceReport {
    pub years: Vec<YearResult>,
    pub skipped: Vec<SkippedYear>,
    pub allocations: YearlyAllocation,
    pub equity_curve: EquityCurve,
    pub full_summary: PerformanceSummary,
}

impl RebalanceReport {
    pub fn skipped_count(&self) -> usize {
        self.skipped.len()
    }

    pub fn year(&self, year: i32) -> Option<&YearResult> {
        self.years.iter().find(|y| y.year == year)
    }
}

pub struct RebalancingEngine<'a> {
    solver: &'a dyn QpSolverPort,
    config: RebalanceConfig,
}

impl<'a> RebalancingEngine<'a> {
    pub fn new(solver: &'a dyn QpSolverPort, config: RebalanceConfig) -> Self {
        Self { solver, config }
    }

    pub fn config(&self) -> &RebalanceConfig {
        &self.config
    }

    /// Runs every calendar year in order. Short years and years whose
    /// sampling has nothing to rank are skipped; a missing solver, an
    /// empty series or an empty universe abort.
    pub fn run(&self, returns: &ReturnSeries) -> Result<RebalanceReport, PortfolioError> {
        if returns.asset_count() == 0 {
            return Err(PortfolioError::EmptyUniverse {
                reason: "no assets to rebalance".into(),
            });
        }
        if returns.is_empty() {
            return Err(PortfolioError::InsufficientData {
                context: "annual rebalancing".into(),
                observations: 0,
                minimum: self.config.min_observations,
            });
        }

        let mut capital = self.config.backtest.initial_capital;
        let mut years = Vec::new();
        let mut skipped = Vec::new();
        let mut allocations = YearlyAllocation::new();
        let mut equity_curve = EquityCurve::default();

        for (year, window) in returns.split_by_year() {
            if window.len() < self.config.min_observations {
                tracing::warn!(
                    year,
                    observations = window.len(),
                    minimum = self.config.min_observations,
                    "skipping year with too few observations"
                );
                skipped.push(SkippedYear {
                    year,
                    observations: window.len(),
                    reason: format!(
                        "{} observations, need {}",
                        window.len(),
                        self.config.min_observations
                    ),
                });
                continue;
            }

            let result = match self.process_year(year, &window, capital) {
                Ok(result) => result,
                Err(err @ PortfolioError::InsufficientData { .. }) => {
                    tracing::warn!(year, error = %err, "skipping year");
                    skipped.push(SkippedYear {
                        year,
                        observations: window.len(),
                        reason: err.to_string(),
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };

            tracing::info!(
                year,
                start_capital = result.initial_capital,
                end_capital = result.final_capital(),
                sharpe = result.summary.sharpe_ratio,
                herfindahl = result.herfindahl,
                "year rebalanced"
            );

            capital = result.final_capital();
            allocations.insert(year, result.weights.clone());
            equity_curve.extend(&result.equity);
            years.push(result);
        }

        if !skipped.is_empty() {
            tracing::warn!(
                processed = years.len(),
                skipped = skipped.len(),
                "rebalancing finished with skipped years"
            );
        }

        let backtest = &self.config.backtest;
        let full_summary = PerformanceSummary::from_equity_curve(
            &equity_curve,
            backtest.risk_free_rate,
            backtest.periods_per_year,
            backtest.cvar_confidence,
        );

        Ok(RebalanceReport {
            years,
            skipped,
            allocations,
            equity_curve,
            full_summary,
        })
    }

    /// One year in isolation: sample, trace the frontier, backtest from
    /// `initial_capital`. Does not apply the observation threshold.
    pub fn process_year(
        &self,
        year: i32,
        window: &ReturnSeries,
        initial_capital: f64,
    ) -> Result<YearResult, PortfolioError> {
        let sampler = MonteCarloSampler::new(self.config.sampler.clone());
        let sampling = sampler.sample_seeded(window, seed_for_year(self.config.seed, year))?;
        let weights = sampling.best_weights().clone();

        let frontier = FrontierSolver::new(self.solver)
            .with_points(self.config.frontier_points)
            .with_periods_per_year(self.config.sampler.periods_per_year)
            .solve(window)?;

        let backtest = BacktestConfig {
            initial_capital,
            ..self.config.backtest.clone()
        };
        let mut backtester = Backtester::from_config(window, weights.clone(), &backtest);
        backtester.run()?;
        let summary = backtester.summarize(backtest.risk_free_rate)?;
        let equity = backtester.equity_curve()?.clone();

        Ok(YearResult {
            year,
            initial_capital,
            herfindahl: weights.herfindahl(),
            weights,
            sampling,
            frontier,
            equity,
            summary,
        })
    }
}
