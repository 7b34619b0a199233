//! Periodic simple returns derived from aligned prices.

use crate::domain::error::PortfolioError;
use crate::domain::prices::PriceTable;
use crate::domain::stats;
use chrono::{Datelike, NaiveDate};

/// Period-over-period percentage changes of an aligned price table.
///
/// Holds one row fewer than the prices it came from. Every entry is
/// finite and dates are strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    tickers: Vec<String>,
    dates: Vec<NaiveDate>,
    rows: Vec<Vec<f64>>,
}

impl ReturnSeries {
    /// Builds a return series from already computed rows, checking shape,
    /// finiteness and date ordering.
    pub fn new(
        tickers: Vec<String>,
        dates: Vec<NaiveDate>,
        rows: Vec<Vec<f64>>,
    ) -> Result<Self, PortfolioError> {
        if tickers.is_empty() {
            return Err(PortfolioError::EmptyUniverse {
                reason: "return series has no assets".into(),
            });
        }
        if dates.len() != rows.len() {
            return Err(PortfolioError::Data {
                reason: format!("{} dates for {} return rows", dates.len(), rows.len()),
            });
        }
        if let Some((i, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != tickers.len())
        {
            return Err(PortfolioError::Data {
                reason: format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    tickers.len()
                ),
            });
        }
        if rows.iter().flatten().any(|r| !r.is_finite()) {
            return Err(PortfolioError::Data {
                reason: "return series contains non-finite values".into(),
            });
        }
        if dates.windows(2).any(|w| w[0] >= w[1]) {
            return Err(PortfolioError::Data {
                reason: "return dates must be strictly increasing".into(),
            });
        }
        Ok(Self {
            tickers,
            dates,
            rows,
        })
    }

    /// Simple returns `p[t] / p[t-1] - 1`; rows with any non-finite result
    /// are dropped.
    pub fn from_prices(prices: &PriceTable) -> Result<Self, PortfolioError> {
        if prices.asset_count() == 0 {
            return Err(PortfolioError::EmptyUniverse {
                reason: "price table has no assets".into(),
            });
        }

        let mut dates = Vec::with_capacity(prices.len().saturating_sub(1));
        let mut rows = Vec::with_capacity(prices.len().saturating_sub(1));

        for i in 1..prices.len() {
            let prev = &prices.rows[i - 1];
            let curr = &prices.rows[i];
            let row: Vec<f64> = prev.iter().zip(curr).map(|(p, c)| c / p - 1.0).collect();
            if row.iter().all(|r| r.is_finite()) {
                dates.push(prices.dates[i]);
                rows.push(row);
            }
        }

        if rows.is_empty() {
            return Err(PortfolioError::InsufficientData {
                context: "return series".into(),
                observations: 0,
                minimum: 1,
            });
        }

        Self::new(prices.tickers.clone(), dates, rows)
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn asset_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Mean periodic return per asset.
    pub fn mean_returns(&self) -> Vec<f64> {
        stats::column_means(&self.rows, self.asset_count())
    }

    /// Sample covariance of periodic returns.
    pub fn covariance(&self) -> Vec<Vec<f64>> {
        stats::sample_covariance(&self.rows, self.asset_count())
    }

    /// Row-wise dot product with `weights`.
    pub fn portfolio_returns(&self, weights: &[f64]) -> Vec<f64> {
        self.rows.iter().map(|row| stats::dot(row, weights)).collect()
    }

    /// Distinct calendar years present, ascending.
    pub fn years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.dates.iter().map(|d| d.year()).collect();
        years.dedup();
        years
    }

    /// The rows dated within `year`, or `None` if the year is absent.
    pub fn slice_year(&self, year: i32) -> Option<ReturnSeries> {
        let start = self.dates.iter().position(|d| d.year() == year)?;
        let end = self.dates[start..]
            .iter()
            .position(|d| d.year() != year)
            .map_or(self.dates.len(), |offset| start + offset);
        Some(ReturnSeries {
            tickers: self.tickers.clone(),
            dates: self.dates[start..end].to_vec(),
            rows: self.rows[start..end].to_vec(),
        })
    }

    /// Partitions the series into calendar-year windows, in date order.
    pub fn split_by_year(&self) -> Vec<(i32, ReturnSeries)> {
        self.years()
            .into_iter()
            .filter_map(|year| self.slice_year(year).map(|slice| (year, slice)))
            .collect()
    }
}
