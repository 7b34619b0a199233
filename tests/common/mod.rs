#![allow(dead_code)]

use allocator::domain::equity::EquityCurve;
use allocator::domain::error::PortfolioError;
use allocator::domain::frontier::Frontier;
use allocator::domain::metrics::MetricValue;
use allocator::domain::monte_carlo::SamplingResult;
use allocator::domain::prices::PricePoint;
use allocator::domain::rebalance::{YearResult, YearlyAllocation};
use allocator::domain::returns::ReturnSeries;
use allocator::domain::stats;
use allocator::domain::weights::WeightVector;
use allocator::ports::data_port::PriceDataPort;
use allocator::ports::export_port::ExportPort;
use allocator::ports::solver_port::{LongOnlyQp, QpOutcome, QpSolverPort};
use chrono::{Datelike, NaiveDate, Weekday};
use std::cell::RefCell;
use std::collections::HashMap;

pub struct MockDataPort {
    pub data: HashMap<String, Vec<PricePoint>>,
    pub errors: HashMap<String, String>,
}

impl MockDataPort {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_prices(mut self, ticker: &str, points: Vec<PricePoint>) -> Self {
        self.data.insert(ticker.to_string(), points);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl PriceDataPort for MockDataPort {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, PortfolioError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(PortfolioError::Data {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(ticker)
            .map(|points| {
                points
                    .iter()
                    .filter(|p| p.date >= start_date && p.date <= end_date)
                    .copied()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_tickers(&self) -> Result<Vec<String>, PortfolioError> {
        let mut tickers: Vec<String> = self.data.keys().cloned().collect();
        tickers.sort();
        Ok(tickers)
    }
}

/// Records the name of every table written instead of touching disk.
#[derive(Default)]
pub struct RecordingExporter {
    pub files: RefCell<Vec<String>>,
    pub metrics: RefCell<HashMap<String, Vec<MetricValue>>>,
}

impl RecordingExporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn written(&self) -> Vec<String> {
        self.files.borrow().clone()
    }

    fn record(&self, file: &str) -> Result<(), PortfolioError> {
        self.files.borrow_mut().push(file.to_string());
        Ok(())
    }
}

impl ExportPort for RecordingExporter {
    fn write_portfolios(
        &self,
        file: &str,
        _tickers: &[String],
        _sampling: &SamplingResult,
    ) -> Result<(), PortfolioError> {
        self.record(file)
    }

    fn write_frontier(
        &self,
        file: &str,
        _tickers: &[String],
        _frontier: &Frontier,
    ) -> Result<(), PortfolioError> {
        self.record(file)
    }

    fn write_weights(
        &self,
        file: &str,
        _tickers: &[String],
        _weights: &WeightVector,
    ) -> Result<(), PortfolioError> {
        self.record(file)
    }

    fn write_equity_curve(&self, file: &str, _curve: &EquityCurve) -> Result<(), PortfolioError> {
        self.record(file)
    }

    fn write_drawdown(&self, file: &str, _curve: &EquityCurve) -> Result<(), PortfolioError> {
        self.record(file)
    }

    fn write_metrics(&self, file: &str, metrics: &[MetricValue]) -> Result<(), PortfolioError> {
        self.metrics
            .borrow_mut()
            .insert(file.to_string(), metrics.to_vec());
        self.record(file)
    }

    fn write_annual_summary(
        &self,
        file: &str,
        _years: &[YearResult],
    ) -> Result<(), PortfolioError> {
        self.record(file)
    }

    fn write_annual_weights(
        &self,
        file: &str,
        _tickers: &[String],
        _allocations: &YearlyAllocation,
    ) -> Result<(), PortfolioError> {
        self.record(file)
    }

    fn write_concentration(
        &self,
        file: &str,
        _years: &[YearResult],
    ) -> Result<(), PortfolioError> {
        self.record(file)
    }
}

/// Solves every target at equal weights, or reports it infeasible above
/// the best asset mean.
pub struct EqualWeightSolver;

impl QpSolverPort for EqualWeightSolver {
    fn solve(&self, problem: &LongOnlyQp) -> Result<QpOutcome, PortfolioError> {
        let best = problem
            .expected_returns
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        if problem.target_return > best + 1e-9 {
            return Ok(QpOutcome::Infeasible);
        }
        let n = problem.dimension();
        let weights = vec![1.0 / n as f64; n];
        let variance = stats::quadratic_form(&weights, &problem.covariance);
        Ok(QpOutcome::Optimal { weights, variance })
    }
}

pub struct UnavailableSolver;

impl QpSolverPort for UnavailableSolver {
    fn solve(&self, _problem: &LongOnlyQp) -> Result<QpOutcome, PortfolioError> {
        Err(PortfolioError::SolverUnavailable {
            reason: "backend not configured".into(),
        })
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Weekdays from `start`, `count` of them.
pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut d = start;
    while days.len() < count {
        if !matches!(d.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(d);
        }
        d += chrono::Duration::days(1);
    }
    days
}

/// Deterministic wavy price path with a drift, one close per date.
pub fn generate_prices(dates: &[NaiveDate], start_price: f64, drift: f64, seed: usize) -> Vec<PricePoint> {
    let mut close = start_price;
    dates
        .iter()
        .enumerate()
        .map(|(i, &date)| {
            if i > 0 {
                let x = (i * (seed + 3)) as f64;
                close *= 1.0 + drift + 0.01 * (x * 0.37).sin() + 0.004 * (x * 1.13).cos();
            }
            PricePoint { date, close }
        })
        .collect()
}

/// Return rows for `assets` assets on the given dates.
pub fn synthetic_returns(assets: usize, dates: Vec<NaiveDate>) -> ReturnSeries {
    let rows = (0..dates.len())
        .map(|t| {
            (0..assets)
                .map(|j| {
                    let x = (t * (j + 2)) as f64;
                    0.0003 * (j as f64 + 1.0) + 0.008 * (x * 0.41).sin() * (1.0 + j as f64 * 0.5)
                })
                .collect()
        })
        .collect();
    let tickers = (0..assets).map(|j| format!("T{j}")).collect();
    ReturnSeries::new(tickers, dates, rows).unwrap()
}

/// Dates covering several calendar years, `per_year[i]` weekdays from
/// January 2 of `first_year + i`.
pub fn multi_year_dates(first_year: i32, per_year: &[usize]) -> Vec<NaiveDate> {
    per_year
        .iter()
        .enumerate()
        .flat_map(|(i, &n)| business_days(date(first_year + i as i32, 1, 2), n))
        .collect()
}
