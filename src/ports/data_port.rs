//! Price data source port.

use crate::domain::error::PortfolioError;
use crate::domain::prices::PricePoint;
use chrono::NaiveDate;

pub trait PriceDataPort {
    /// Closing prices for `ticker` within `[start_date, end_date]`, in
    /// ascending date order.
    fn fetch_prices(
        &self,
        ticker: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PricePoint>, PortfolioError>;

    fn list_tickers(&self) -> Result<Vec<String>, PortfolioError>;
}
