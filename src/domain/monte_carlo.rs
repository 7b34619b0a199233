//! Random long-only portfolio sampling for max-Sharpe selection.
//!
//! Candidate weights are drawn from a symmetric Dirichlet(1) distribution
//! (normalized unit exponentials), scored by annualized return, volatility
//! and Sharpe ratio, and the best finite Sharpe ratio wins.

use crate::domain::error::PortfolioError;
use crate::domain::metrics::TRADING_DAYS_PER_YEAR;
use crate::domain::returns::ReturnSeries;
use crate::domain::stats;
use crate::domain::weights::WeightVector;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Exp1};

/// Annualized volatility at or below this is treated as zero.
pub const DEGENERATE_VOLATILITY: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct SamplerConfig {
    pub portfolios: usize,
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self {
            portfolios: 10_000,
            risk_free_rate: 0.03,
            periods_per_year: TRADING_DAYS_PER_YEAR,
        }
    }
}

/// All sampled candidates plus the selected one.
///
/// The per-candidate arrays share indexing with `weights`. A candidate with
/// zero volatility has `None` as its Sharpe ratio and never wins.
#[derive(Debug, Clone, PartialEq)]
pub struct SamplingResult {
    pub weights: Vec<WeightVector>,
    pub returns: Vec<f64>,
    pub volatilities: Vec<f64>,
    pub sharpe_ratios: Vec<Option<f64>>,
    pub best_index: usize,
    pub degenerate_count: usize,
}

impl SamplingResult {
    pub fn best_weights(&self) -> &WeightVector {
        &self.weights[self.best_index]
    }

    pub fn best_return(&self) -> f64 {
        self.returns[self.best_index]
    }

    pub fn best_volatility(&self) -> f64 {
        self.volatilities[self.best_index]
    }

    pub fn best_sharpe(&self) -> f64 {
        self.sharpe_ratios[self.best_index].unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonteCarloSampler {
    config: SamplerConfig,
}

impl MonteCarloSampler {
    pub fn new(config: SamplerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SamplerConfig {
        &self.config
    }

    /// Samples with a fresh generator seeded from `seed`.
    pub fn sample_seeded(
        &self,
        returns: &ReturnSeries,
        seed: u64,
    ) -> Result<SamplingResult, PortfolioError> {
        let mut rng = StdRng::seed_from_u64(seed);
        self.sample(returns, &mut rng)
    }

    pub fn sample<R: Rng + ?Sized>(
        &self,
        returns: &ReturnSeries,
        rng: &mut R,
    ) -> Result<SamplingResult, PortfolioError> {
        let k = self.config.portfolios;
        if k == 0 {
            return Err(PortfolioError::InsufficientData {
                context: "monte carlo sampling".into(),
                observations: 0,
                minimum: 1,
            });
        }
        if returns.len() < 2 {
            return Err(PortfolioError::InsufficientData {
                context: "covariance estimate".into(),
                observations: returns.len(),
                minimum: 2,
            });
        }

        let n = returns.asset_count();
        let ppy = self.config.periods_per_year;
        let rf = self.config.risk_free_rate;
        let means = returns.mean_returns();
        let cov = returns.covariance();

        let mut weights = Vec::with_capacity(k);
        let mut port_returns = Vec::with_capacity(k);
        let mut port_vols = Vec::with_capacity(k);
        let mut sharpe_ratios = Vec::with_capacity(k);
        let mut best: Option<(usize, f64)> = None;
        let mut degenerate_count = 0usize;

        for i in 0..k {
            let w = draw_dirichlet(n, rng);
            let ret = stats::dot(&means, &w) * ppy;
            let vol = stats::quadratic_form(&w, &cov).max(0.0).sqrt() * ppy.sqrt();

            let sharpe = if vol > DEGENERATE_VOLATILITY {
                Some((ret - rf) / vol)
            } else {
                degenerate_count += 1;
                None
            };

            if let Some(s) = sharpe {
                if best.is_none_or(|(_, b)| s > b) {
                    best = Some((i, s));
                }
            }

            weights.push(WeightVector::new(w));
            port_returns.push(ret);
            port_vols.push(vol);
            sharpe_ratios.push(sharpe);
        }

        if degenerate_count > 0 {
            tracing::warn!(
                degenerate = degenerate_count,
                sampled = k,
                "excluded zero-volatility portfolios from Sharpe ranking"
            );
        }

        let (best_index, best_sharpe) = best.ok_or_else(|| PortfolioError::InsufficientData {
            context: format!("max-Sharpe selection ({k} of {k} portfolios have zero volatility)"),
            observations: 0,
            minimum: 1,
        })?;

        tracing::debug!(best_index, best_sharpe, "selected max-Sharpe portfolio");

        Ok(SamplingResult {
            weights,
            returns: port_returns,
            volatilities: port_vols,
            sharpe_ratios,
            best_index,
            degenerate_count,
        })
    }
}

/// One draw from the symmetric Dirichlet(1) distribution over `n` assets.
fn draw_dirichlet<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<f64> {
    let raw: Vec<f64> = (0..n).map(|_| Exp1.sample(rng)).collect();
    let total: f64 = raw.iter().sum();
    if total > 0.0 {
        raw.into_iter().map(|x| x / total).collect()
    } else {
        vec![1.0 / n as f64; n]
    }
}
