//! CSV export of run results.
//!
//! Summary tables render percentages as `12.34%` and other figures with
//! four decimals. Curves and per-candidate tables keep raw values.

use crate::domain::equity::EquityCurve;
use crate::domain::error::PortfolioError;
use crate::domain::frontier::Frontier;
use crate::domain::metrics::{MetricFormat, MetricValue};
use crate::domain::monte_carlo::SamplingResult;
use crate::domain::rebalance::{YearResult, YearlyAllocation};
use crate::domain::weights::WeightVector;
use crate::ports::export_port::ExportPort;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

pub fn format_metric(metric: &MetricValue) -> String {
    match metric.format {
        MetricFormat::Percent => format_percent(metric.value),
        MetricFormat::Decimal => format!("{:.4}", metric.value),
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.2}%", value * 100.0)
}

#[derive(Serialize)]
struct MetricRow<'a> {
    metric: &'a str,
    value: String,
}

#[derive(Serialize)]
struct CurveRow {
    date: String,
    value: f64,
}

#[derive(Serialize)]
struct WeightRow<'a> {
    ticker: &'a str,
    weight: f64,
}

#[derive(Serialize)]
struct ConcentrationRow {
    year: i32,
    herfindahl: f64,
}

#[derive(Serialize)]
struct AnnualSummaryRow {
    year: i32,
    start_capital: f64,
    end_capital: f64,
    total_return: String,
    cagr: String,
    volatility: String,
    sharpe_ratio: String,
    max_drawdown: String,
    cvar: String,
    herfindahl: String,
}

pub struct CsvExportAdapter {
    output_dir: PathBuf,
}

fn export_error(path: &Path, e: impl std::fmt::Display) -> PortfolioError {
    PortfolioError::Export {
        reason: format!("{}: {}", path.display(), e),
    }
}

impl CsvExportAdapter {
    /// Creates `output_dir` if needed.
    pub fn create(output_dir: impl Into<PathBuf>) -> Result<Self, PortfolioError> {
        let output_dir = output_dir.into();
        fs::create_dir_all(&output_dir).map_err(|e| export_error(&output_dir, e))?;
        Ok(Self { output_dir })
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn path_for(&self, file: &str) -> PathBuf {
        self.output_dir.join(format!("{file}.csv"))
    }

    fn writer(&self, file: &str) -> Result<(csv::Writer<fs::File>, PathBuf), PortfolioError> {
        let path = self.path_for(file);
        let writer = csv::Writer::from_path(&path).map_err(|e| export_error(&path, e))?;
        Ok((writer, path))
    }

    fn serialize_all<T: Serialize>(
        &self,
        file: &str,
        rows: impl IntoIterator<Item = T>,
    ) -> Result<(), PortfolioError> {
        let (mut wtr, path) = self.writer(file)?;
        for row in rows {
            wtr.serialize(row).map_err(|e| export_error(&path, e))?;
        }
        wtr.flush().map_err(|e| export_error(&path, e))?;
        tracing::debug!(path = %path.display(), "exported");
        Ok(())
    }

    /// Header plus string records, for tables with one column per ticker.
    fn write_records(
        &self,
        file: &str,
        header: Vec<String>,
        records: impl IntoIterator<Item = Vec<String>>,
    ) -> Result<(), PortfolioError> {
        let (mut wtr, path) = self.writer(file)?;
        wtr.write_record(&header).map_err(|e| export_error(&path, e))?;
        for record in records {
            wtr.write_record(&record).map_err(|e| export_error(&path, e))?;
        }
        wtr.flush().map_err(|e| export_error(&path, e))?;
        tracing::debug!(path = %path.display(), "exported");
        Ok(())
    }

    fn curve_rows(curve: &EquityCurve) -> impl Iterator<Item = CurveRow> + '_ {
        curve.points().iter().map(|p| CurveRow {
            date: p.date.to_string(),
            value: p.equity,
        })
    }
}

fn header_with_tickers(leading: &[&str], tickers: &[String]) -> Vec<String> {
    leading
        .iter()
        .map(|s| s.to_string())
        .chain(tickers.iter().cloned())
        .collect()
}

fn weight_fields(weights: &WeightVector) -> impl Iterator<Item = String> + '_ {
    weights.as_slice().iter().map(|w| w.to_string())
}

impl ExportPort for CsvExportAdapter {
    fn write_portfolios(
        &self,
        file: &str,
        tickers: &[String],
        sampling: &SamplingResult,
    ) -> Result<(), PortfolioError> {
        let header = header_with_tickers(&["return", "volatility", "sharpe_ratio"], tickers);
        let records = (0..sampling.len()).map(|i| {
            let sharpe = sampling.sharpe_ratios[i]
                .map(|s| s.to_string())
                .unwrap_or_default();
            [
                sampling.returns[i].to_string(),
                sampling.volatilities[i].to_string(),
                sharpe,
            ]
            .into_iter()
            .chain(weight_fields(&sampling.weights[i]))
            .collect::<Vec<String>>()
        });
        self.write_records(file, header, records)
    }

    fn write_frontier(
        &self,
        file: &str,
        tickers: &[String],
        frontier: &Frontier,
    ) -> Result<(), PortfolioError> {
        let header = header_with_tickers(&["target_return", "volatility"], tickers);
        let records = frontier.points.iter().map(|p| {
            [p.target_return.to_string(), p.volatility.to_string()]
                .into_iter()
                .chain(weight_fields(&p.weights))
                .collect::<Vec<String>>()
        });
        self.write_records(file, header, records)
    }

    fn write_weights(
        &self,
        file: &str,
        tickers: &[String],
        weights: &WeightVector,
    ) -> Result<(), PortfolioError> {
        let rows = tickers
            .iter()
            .zip(weights.as_slice())
            .map(|(ticker, &weight)| WeightRow {
                ticker: ticker.as_str(),
                weight,
            });
        self.serialize_all(file, rows)
    }

    fn write_equity_curve(&self, file: &str, curve: &EquityCurve) -> Result<(), PortfolioError> {
        self.serialize_all(file, Self::curve_rows(curve))
    }

    fn write_drawdown(&self, file: &str, curve: &EquityCurve) -> Result<(), PortfolioError> {
        let rows = curve.drawdown_series();
        self.serialize_all(file, Self::curve_rows(&EquityCurve::new(rows)))
    }

    fn write_metrics(&self, file: &str, metrics: &[MetricValue]) -> Result<(), PortfolioError> {
        let rows = metrics.iter().map(|m| MetricRow {
            metric: m.name,
            value: format_metric(m),
        });
        self.serialize_all(file, rows)
    }

    fn write_annual_summary(
        &self,
        file: &str,
        years: &[YearResult],
    ) -> Result<(), PortfolioError> {
        let rows = years.iter().map(|y| AnnualSummaryRow {
            year: y.year,
            start_capital: y.initial_capital,
            end_capital: y.final_capital(),
            total_return: format_percent(y.summary.total_return),
            cagr: format_percent(y.summary.cagr),
            volatility: format_percent(y.summary.volatility),
            sharpe_ratio: format!("{:.4}", y.summary.sharpe_ratio),
            max_drawdown: format_percent(y.summary.max_drawdown),
            cvar: y.summary.cvar.map(format_percent).unwrap_or_default(),
            herfindahl: format!("{:.4}", y.herfindahl),
        });
        self.serialize_all(file, rows)
    }

    fn write_annual_weights(
        &self,
        file: &str,
        tickers: &[String],
        allocations: &YearlyAllocation,
    ) -> Result<(), PortfolioError> {
        let header = header_with_tickers(&["year"], tickers);
        let records = allocations.iter().map(|(year, weights)| {
            std::iter::once(year.to_string())
                .chain(weight_fields(weights))
                .collect::<Vec<String>>()
        });
        self.write_records(file, header, records)
    }

    fn write_concentration(
        &self,
        file: &str,
        years: &[YearResult],
    ) -> Result<(), PortfolioError> {
        let rows = years.iter().map(|y| ConcentrationRow {
            year: y.year,
            herfindahl: y.herfindahl,
        });
        self.serialize_all(file, rows)
    }
}
