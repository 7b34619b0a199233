//! Persistence sink for run results.
//!
//! Each method writes one table named `file` (without extension). Column
//! layout and number formatting belong to the implementation.

use crate::domain::equity::EquityCurve;
use crate::domain::error::PortfolioError;
use crate::domain::frontier::Frontier;
use crate::domain::metrics::MetricValue;
use crate::domain::monte_carlo::SamplingResult;
use crate::domain::rebalance::{YearResult, YearlyAllocation};
use crate::domain::weights::WeightVector;

pub trait ExportPort {
    /// Every sampled candidate: return, volatility, Sharpe ratio, weights.
    fn write_portfolios(
        &self,
        file: &str,
        tickers: &[String],
        sampling: &SamplingResult,
    ) -> Result<(), PortfolioError>;

    fn write_frontier(
        &self,
        file: &str,
        tickers: &[String],
        frontier: &Frontier,
    ) -> Result<(), PortfolioError>;

    fn write_weights(
        &self,
        file: &str,
        tickers: &[String],
        weights: &WeightVector,
    ) -> Result<(), PortfolioError>;

    fn write_equity_curve(&self, file: &str, curve: &EquityCurve) -> Result<(), PortfolioError>;

    fn write_drawdown(&self, file: &str, curve: &EquityCurve) -> Result<(), PortfolioError>;

    /// Metric/value pairs.
    fn write_metrics(&self, file: &str, metrics: &[MetricValue]) -> Result<(), PortfolioError>;

    /// One row of summary metrics per processed year.
    fn write_annual_summary(&self, file: &str, years: &[YearResult])
    -> Result<(), PortfolioError>;

    fn write_annual_weights(
        &self,
        file: &str,
        tickers: &[String],
        allocations: &YearlyAllocation,
    ) -> Result<(), PortfolioError>;

    /// Herfindahl index per processed year.
    fn write_concentration(&self, file: &str, years: &[YearResult])
    -> Result<(), PortfolioError>;
}
