//! CSV price data adapter.
//!
//! One file per ticker, `<TICKER>.csv`, with a header row containing a
//! `date` column (YYYY-MM-DD) and a close column. An adjusted close
//! (`adj_close` or `adj close`) is preferred over `close` when both exist.

use crate::domain::error::PortfolioError;
use crate::domain::prices::PricePoint;
use crate::ports::data_port::PriceDataPort;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

const CLOSE_COLUMNS: [&str; 3] = ["adj_close", "adj close", "close"];

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", ticker))
    }
}

fn data_error(reason: String) -> PortfolioError {
    PortfolioError::Data { reason }
}

impl PriceDataPort for CsvAdapter {
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, PortfolioError> {
        let path = self.csv_path(ticker);
        let content = fs::read_to_string(&path)
            .map_err(|e| data_error(format!("failed to read {}: {}", path.display(), e)))?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let headers: Vec<String> = rdr
            .headers()
            .map_err(|e| data_error(format!("{}: CSV header error: {}", path.display(), e)))?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let date_col = headers
            .iter()
            .position(|h| h == "date")
            .ok_or_else(|| data_error(format!("{}: missing date column", path.display())))?;
        let close_col = CLOSE_COLUMNS
            .iter()
            .find_map(|name| headers.iter().position(|h| h == name))
            .ok_or_else(|| data_error(format!("{}: missing close column", path.display())))?;

        let mut points = Vec::new();
        for (line, result) in rdr.records().enumerate() {
            let record = result
                .map_err(|e| data_error(format!("{}: CSV parse error: {}", path.display(), e)))?;

            let date_str = record.get(date_col).unwrap_or_default().trim();
            let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d").map_err(|e| {
                data_error(format!(
                    "{} row {}: invalid date '{}': {}",
                    path.display(),
                    line + 1,
                    date_str,
                    e
                ))
            })?;

            if date < start_date || date > end_date {
                continue;
            }

            // blank close means no trade that day; alignment drops the row
            let close_str = record.get(close_col).unwrap_or_default().trim();
            if close_str.is_empty() {
                continue;
            }
            let close: f64 = close_str.parse().map_err(|e| {
                data_error(format!(
                    "{} row {}: invalid close '{}': {}",
                    path.display(),
                    line + 1,
                    close_str,
                    e
                ))
            })?;

            points.push(PricePoint { date, close });
        }

        points.sort_by_key(|p| p.date);
        points.dedup_by_key(|p| p.date);
        Ok(points)
    }

    fn list_tickers(&self) -> Result<Vec<String>, PortfolioError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            data_error(format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ))
        })?;

        let mut tickers = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| data_error(format!("directory entry error: {}", e)))?;
            let name = entry.file_name();
            if let Some(ticker) = name.to_string_lossy().strip_suffix(".csv") {
                tickers.push(ticker.to_string());
            }
        }

        tickers.sort();
        Ok(tickers)
    }
}
