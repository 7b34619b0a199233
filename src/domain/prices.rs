//! Price series per asset and cross-asset date alignment.

use crate::domain::error::PortfolioError;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

/// Closing prices of one ticker, as supplied by a price data source.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    pub ticker: String,
    pub points: Vec<PricePoint>,
}

impl PriceSeries {
    pub fn new(ticker: impl Into<String>, points: Vec<PricePoint>) -> Self {
        Self {
            ticker: ticker.into(),
            points,
        }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Prices of the whole universe on the dates every asset has a usable close.
///
/// `rows[i][j]` is the close of `tickers[j]` on `dates[i]`. Dates are
/// strictly increasing.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceTable {
    pub tickers: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub rows: Vec<Vec<f64>>,
}

impl PriceTable {
    /// Aligns per-ticker series on their common dates.
    ///
    /// Rows where any asset is missing or has a non-finite or non-positive
    /// close are dropped. A ticker that repeats a date keeps its last value.
    pub fn align(series: &[PriceSeries]) -> Result<Self, PortfolioError> {
        if series.is_empty() {
            return Err(PortfolioError::EmptyUniverse {
                reason: "no price series supplied".into(),
            });
        }

        let lookups: Vec<HashMap<NaiveDate, f64>> = series
            .iter()
            .map(|s| s.points.iter().map(|p| (p.date, p.close)).collect())
            .collect();

        let candidate_dates: BTreeSet<NaiveDate> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.date))
            .collect();

        let mut dates = Vec::new();
        let mut rows = Vec::new();
        let mut dropped = 0usize;

        for date in candidate_dates {
            let row: Option<Vec<f64>> = lookups
                .iter()
                .map(|lookup| {
                    lookup
                        .get(&date)
                        .copied()
                        .filter(|close| close.is_finite() && *close > 0.0)
                })
                .collect();
            match row {
                Some(row) => {
                    dates.push(date);
                    rows.push(row);
                }
                None => dropped += 1,
            }
        }

        if dropped > 0 {
            tracing::warn!(dropped, kept = dates.len(), "dropped unaligned price rows");
        }

        Ok(Self {
            tickers: series.iter().map(|s| s.ticker.clone()).collect(),
            dates,
            rows,
        })
    }

    pub fn asset_count(&self) -> usize {
        self.tickers.len()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.dates.first().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.dates.last().copied()
    }
}
