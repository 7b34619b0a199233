//! Fixed-weight backtest.
//!
//! [`Backtester`] is a two-state machine. `run` validates the weights and
//! produces the portfolio return series and equity curve exactly once;
//! `summarize` reads them and may be called any number of times.

use super::equity::EquityCurve;
use super::error::PortfolioError;
use super::metrics::{PerformanceSummary, TRADING_DAYS_PER_YEAR};
use super::returns::ReturnSeries;
use super::weights::WeightVector;

pub const DEFAULT_INITIAL_CAPITAL: f64 = 1_000_000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub initial_capital: f64,
    pub risk_free_rate: f64,
    pub periods_per_year: f64,
    pub cvar_confidence: Option<f64>,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            initial_capital: DEFAULT_INITIAL_CAPITAL,
            risk_free_rate: 0.03,
            periods_per_year: TRADING_DAYS_PER_YEAR,
            cvar_confidence: Some(0.95),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Unrun,
    Run {
        daily_returns: Vec<f64>,
        equity_curve: EquityCurve,
    },
}

#[derive(Debug, Clone)]
pub struct Backtester<'a> {
    returns: &'a ReturnSeries,
    weights: WeightVector,
    initial_capital: f64,
    periods_per_year: f64,
    cvar_confidence: Option<f64>,
    state: State,
}

impl<'a> Backtester<'a> {
    pub fn new(returns: &'a ReturnSeries, weights: WeightVector, initial_capital: f64) -> Self {
        Self {
            returns,
            weights,
            initial_capital,
            periods_per_year: TRADING_DAYS_PER_YEAR,
            cvar_confidence: None,
            state: State::Unrun,
        }
    }

    pub fn from_config(
        returns: &'a ReturnSeries,
        weights: WeightVector,
        config: &BacktestConfig,
    ) -> Self {
        Self::new(returns, weights, config.initial_capital)
            .with_periods_per_year(config.periods_per_year)
            .with_cvar(config.cvar_confidence)
    }

    pub fn with_periods_per_year(mut self, periods_per_year: f64) -> Self {
        self.periods_per_year = periods_per_year;
        self
    }

    /// Requests CVaR at `confidence` in every summary.
    pub fn with_cvar(mut self, confidence: Option<f64>) -> Self {
        self.cvar_confidence = confidence;
        self
    }

    pub fn weights(&self) -> &WeightVector {
        &self.weights
    }

    pub fn initial_capital(&self) -> f64 {
        self.initial_capital
    }

    pub fn is_run(&self) -> bool {
        matches!(self.state, State::Run { .. })
    }

    /// Unrun → Run. On any error the instance stays Unrun.
    ///
    /// A second call on a run instance is rejected rather than recomputed.
    pub fn run(&mut self) -> Result<(), PortfolioError> {
        if self.is_run() {
            return Err(PortfolioError::State {
                reason: "backtest has already been run".into(),
            });
        }

        self.weights.validate()?;
        if self.weights.len() != self.returns.asset_count() {
            return Err(PortfolioError::Validation {
                reason: format!(
                    "{} weights for {} assets",
                    self.weights.len(),
                    self.returns.asset_count()
                ),
            });
        }
        if !self.initial_capital.is_finite() || self.initial_capital <= 0.0 {
            return Err(PortfolioError::Validation {
                reason: format!("initial capital must be positive, got {}", self.initial_capital),
            });
        }

        let daily_returns = self.returns.portfolio_returns(self.weights.as_slice());
        let equity_curve =
            EquityCurve::compound(self.returns.dates(), &daily_returns, self.initial_capital);

        tracing::debug!(
            periods = daily_returns.len(),
            final_equity = equity_curve.final_value().unwrap_or(self.initial_capital),
            "backtest run"
        );

        self.state = State::Run {
            daily_returns,
            equity_curve,
        };
        Ok(())
    }

    pub fn equity_curve(&self) -> Result<&EquityCurve, PortfolioError> {
        match &self.state {
            State::Run { equity_curve, .. } => Ok(equity_curve),
            State::Unrun => Err(not_run("equity curve")),
        }
    }

    pub fn daily_returns(&self) -> Result<&[f64], PortfolioError> {
        match &self.state {
            State::Run { daily_returns, .. } => Ok(daily_returns),
            State::Unrun => Err(not_run("daily returns")),
        }
    }

    /// Metrics of the stored curve and daily returns at `risk_free_rate`.
    pub fn summarize(&self, risk_free_rate: f64) -> Result<PerformanceSummary, PortfolioError> {
        let (curve, daily_returns) = match &self.state {
            State::Run {
                equity_curve,
                daily_returns,
            } => (equity_curve, daily_returns),
            State::Unrun => return Err(not_run("summary")),
        };
        Ok(PerformanceSummary::from_curve_and_returns(
            curve,
            daily_returns,
            risk_free_rate,
            self.periods_per_year,
            self.cvar_confidence,
        ))
    }
}

fn not_run(what: &str) -> PortfolioError {
    PortfolioError::State {
        reason: format!("{what} requested before run"),
    }
}
