//! Asset universe: ticker list parsing and loading price history for each
//! ticker from a data source.

use crate::domain::error::PortfolioError;
use crate::domain::prices::PriceSeries;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::collections::HashSet;

/// A ticker needs at least two prices to contribute one return.
pub const MIN_PRICE_POINTS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TickerListError {
    #[error("empty token in ticker list")]
    EmptyToken,

    #[error("duplicate ticker: {0}")]
    DuplicateTicker(String),
}

/// Splits a comma-separated list, trimming and upper-casing each entry.
pub fn parse_tickers(input: &str) -> Result<Vec<String>, TickerListError> {
    let mut tickers = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(TickerListError::EmptyToken);
        }
        let ticker = trimmed.to_uppercase();
        if !seen.insert(ticker.clone()) {
            return Err(TickerListError::DuplicateTicker(ticker));
        }
        tickers.push(ticker);
    }

    Ok(tickers)
}

#[derive(Debug, Clone, PartialEq)]
pub struct SkippedTicker {
    pub ticker: String,
    pub reason: TickerSkipReason,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickerSkipReason {
    FetchFailed(String),
    InsufficientPrices { points: usize },
}

#[derive(Debug, Clone)]
pub struct LoadedUniverse {
    pub series: Vec<PriceSeries>,
    pub skipped: Vec<SkippedTicker>,
}

impl LoadedUniverse {
    pub fn tickers(&self) -> Vec<&str> {
        self.series.iter().map(|s| s.ticker.as_str()).collect()
    }
}

/// Fetches every ticker, skipping those that fail or have too little
/// history. Fails only when nothing usable remains.
pub fn load_universe(
    data_port: &dyn PriceDataPort,
    tickers: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<LoadedUniverse, PortfolioError> {
    let mut series = Vec::new();
    let mut skipped = Vec::new();

    for ticker in tickers {
        let points = match data_port.fetch_prices(ticker, start_date, end_date) {
            Ok(points) => points,
            Err(e) => {
                tracing::warn!(ticker = %ticker, error = %e, "skipping ticker");
                skipped.push(SkippedTicker {
                    ticker: ticker.clone(),
                    reason: TickerSkipReason::FetchFailed(e.to_string()),
                });
                continue;
            }
        };

        if points.len() < MIN_PRICE_POINTS {
            tracing::warn!(
                ticker = %ticker,
                points = points.len(),
                minimum = MIN_PRICE_POINTS,
                "skipping ticker with too little history"
            );
            skipped.push(SkippedTicker {
                ticker: ticker.clone(),
                reason: TickerSkipReason::InsufficientPrices {
                    points: points.len(),
                },
            });
            continue;
        }

        tracing::debug!(ticker = %ticker, points = points.len(), "loaded prices");
        series.push(PriceSeries::new(ticker.clone(), points));
    }

    if series.is_empty() {
        return Err(PortfolioError::EmptyUniverse {
            reason: format!("none of {} tickers had usable prices", tickers.len()),
        });
    }

    if !skipped.is_empty() {
        tracing::warn!(
            loaded = series.len(),
            requested = tickers.len(),
            "universe loaded with skipped tickers"
        );
    }

    Ok(LoadedUniverse { series, skipped })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::prices::PricePoint;

    struct FixedSource;

    impl PriceDataPort for FixedSource {
        fn fetch_prices(
            &self,
            ticker: &str,
            start_date: NaiveDate,
            _end_date: NaiveDate,
        ) -> Result<Vec<PricePoint>, PortfolioError> {
            let n = match ticker {
                "GOOD" => 5,
                "THIN" => 1,
                _ => {
                    return Err(PortfolioError::Data {
                        reason: format!("no file for {ticker}"),
                    });
                }
            };
            Ok((0..n)
                .map(|i| PricePoint {
                    date: start_date + chrono::Duration::days(i),
                    close: 100.0 + i as f64,
                })
                .collect())
        }

        fn list_tickers(&self) -> Result<Vec<String>, PortfolioError> {
            Ok(vec!["GOOD".into(), "THIN".into()])
        }
    }

    fn range() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    #[test]
    fn parse_basic() {
        let result = parse_tickers("AAPL,MSFT,GOOG").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOG"]);
    }

    #[test]
    fn parse_trims_and_uppercases() {
        let result = parse_tickers("  aapl , msft ,Goog").unwrap();
        assert_eq!(result, vec!["AAPL", "MSFT", "GOOG"]);
    }

    #[test]
    fn parse_empty_token() {
        assert_eq!(parse_tickers("AAPL,,MSFT"), Err(TickerListError::EmptyToken));
        assert_eq!(parse_tickers(""), Err(TickerListError::EmptyToken));
    }

    #[test]
    fn parse_duplicate_after_case_folding() {
        assert_eq!(
            parse_tickers("AAPL,msft,aapl"),
            Err(TickerListError::DuplicateTicker("AAPL".into()))
        );
    }

    #[test]
    fn load_skips_failing_and_thin_tickers() {
        let (start, end) = range();
        let tickers = vec!["GOOD".to_string(), "THIN".to_string(), "GONE".to_string()];
        let loaded = load_universe(&FixedSource, &tickers, start, end).unwrap();
        assert_eq!(loaded.tickers(), vec!["GOOD"]);
        assert_eq!(loaded.skipped.len(), 2);
        assert_eq!(
            loaded.skipped[0].reason,
            TickerSkipReason::InsufficientPrices { points: 1 }
        );
        assert!(matches!(
            loaded.skipped[1].reason,
            TickerSkipReason::FetchFailed(_)
        ));
    }

    #[test]
    fn load_with_nothing_usable_is_empty_universe() {
        let (start, end) = range();
        let tickers = vec!["THIN".to_string(), "GONE".to_string()];
        assert!(matches!(
            load_universe(&FixedSource, &tickers, start, end),
            Err(PortfolioError::EmptyUniverse { .. })
        ));
    }
}
