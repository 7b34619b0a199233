//! Configuration validation.
//!
//! Checks every key a run reads before any data is loaded. Numeric keys
//! are parsed strictly here so that a typo is reported instead of silently
//! replaced by a default.

use crate::domain::error::PortfolioError;
use crate::domain::universe::parse_tickers;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;
use std::str::FromStr;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), PortfolioError> {
    validate_data_section(config)?;
    validate_optimizer_section(config)?;
    validate_backtest_section(config)?;
    validate_benchmark(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> PortfolioError {
    PortfolioError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> PortfolioError {
    PortfolioError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

/// Non-empty string value, or `ConfigMissing`.
pub fn required_string(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<String, PortfolioError> {
    match config.get_string(section, key) {
        Some(s) if !s.trim().is_empty() => Ok(s.trim().to_string()),
        _ => Err(missing(section, key)),
    }
}

/// Parsed value of `key`, `default` when absent, `ConfigInvalid` when
/// present but unparseable.
pub fn parse_or<T: FromStr>(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: T,
) -> Result<T, PortfolioError> {
    match config.get_string(section, key) {
        None => Ok(default),
        Some(s) if s.trim().is_empty() => Ok(default),
        Some(s) => s
            .trim()
            .parse()
            .map_err(|_| invalid(section, key, format!("cannot parse '{}'", s.trim()))),
    }
}

pub fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<NaiveDate, PortfolioError> {
    let value = required_string(config, section, key)?;
    NaiveDate::parse_from_str(&value, "%Y-%m-%d")
        .map_err(|_| invalid(section, key, "invalid date format, expected YYYY-MM-DD"))
}

fn validate_data_section(config: &dyn ConfigPort) -> Result<(), PortfolioError> {
    required_string(config, "data", "path")?;

    let tickers = required_string(config, "data", "tickers")?;
    parse_tickers(&tickers)?;

    let start_date = parse_date(config, "data", "start_date")?;
    let end_date = parse_date(config, "data", "end_date")?;
    if start_date >= end_date {
        return Err(invalid(
            "data",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

fn validate_optimizer_section(config: &dyn ConfigPort) -> Result<(), PortfolioError> {
    let portfolios: usize = parse_or(config, "optimizer", "portfolios", 10_000)?;
    if portfolios == 0 {
        return Err(invalid("optimizer", "portfolios", "portfolios must be at least 1"));
    }

    parse_or::<u64>(config, "optimizer", "seed", 42)?;

    let points: usize = parse_or(config, "optimizer", "frontier_points", 100)?;
    if points < 2 {
        return Err(invalid(
            "optimizer",
            "frontier_points",
            "frontier_points must be at least 2",
        ));
    }

    let ppy: f64 = parse_or(config, "optimizer", "periods_per_year", 252.0)?;
    if !ppy.is_finite() || ppy <= 0.0 {
        return Err(invalid(
            "optimizer",
            "periods_per_year",
            "periods_per_year must be positive",
        ));
    }
    Ok(())
}

fn validate_backtest_section(config: &dyn ConfigPort) -> Result<(), PortfolioError> {
    let capital: f64 = parse_or(config, "backtest", "initial_capital", 1_000_000.0)?;
    if !capital.is_finite() || capital <= 0.0 {
        return Err(invalid(
            "backtest",
            "initial_capital",
            "initial_capital must be positive",
        ));
    }

    let rf: f64 = parse_or(config, "backtest", "risk_free_rate", 0.03)?;
    if !(0.0..1.0).contains(&rf) {
        return Err(invalid(
            "backtest",
            "risk_free_rate",
            "risk_free_rate must be between 0 and 1",
        ));
    }

    let min_obs: usize = parse_or(config, "backtest", "min_observations", 50)?;
    if min_obs < 2 {
        return Err(invalid(
            "backtest",
            "min_observations",
            "min_observations must be at least 2",
        ));
    }

    let confidence: f64 = parse_or(config, "backtest", "cvar_confidence", 0.95)?;
    if !(confidence > 0.0 && confidence < 1.0) {
        return Err(invalid(
            "backtest",
            "cvar_confidence",
            "cvar_confidence must be strictly between 0 and 1",
        ));
    }
    Ok(())
}

fn validate_benchmark(config: &dyn ConfigPort) -> Result<(), PortfolioError> {
    if let Some(ticker) = config.get_string("benchmark", "ticker") {
        if ticker.trim().is_empty() || ticker.contains(',') {
            return Err(invalid("benchmark", "ticker", "expected a single ticker"));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::file_config_adapter::FileConfigAdapter;
    use crate::domain::universe::TickerListError;

    const DATA: &str = "[data]\npath = ./data\ntickers = AAPL,MSFT\nstart_date = 2020-01-01\nend_date = 2024-12-31\n";

    fn make_config(content: &str) -> FileConfigAdapter {
        FileConfigAdapter::from_string(content).unwrap()
    }

    fn with_data(extra: &str) -> FileConfigAdapter {
        make_config(&format!("{DATA}{extra}"))
    }

    #[test]
    fn full_config_passes() {
        let config = with_data(
            r#"
[optimizer]
portfolios = 5000
seed = 7
frontier_points = 50
periods_per_year = 252

[backtest]
initial_capital = 1000000
risk_free_rate = 0.03
min_observations = 50
cvar_confidence = 0.95

[benchmark]
ticker = SPY

[export]
output_dir = out
"#,
        );
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn data_section_alone_passes_with_defaults() {
        assert!(validate_config(&with_data("")).is_ok());
    }

    #[test]
    fn missing_path_fails() {
        let config = make_config("[data]\ntickers = AAPL\nstart_date = 2020-01-01\nend_date = 2021-01-01\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigMissing { key, .. } if key == "path"));
    }

    #[test]
    fn missing_tickers_fails() {
        let config = make_config("[data]\npath = d\nstart_date = 2020-01-01\nend_date = 2021-01-01\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigMissing { key, .. } if key == "tickers"));
    }

    #[test]
    fn duplicate_ticker_fails() {
        let config = make_config("[data]\npath = d\ntickers = AAPL,aapl\nstart_date = 2020-01-01\nend_date = 2021-01-01\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(
            err,
            PortfolioError::TickerList(TickerListError::DuplicateTicker(t)) if t == "AAPL"
        ));
    }

    #[test]
    fn bad_date_format_fails() {
        let config = make_config("[data]\npath = d\ntickers = AAPL\nstart_date = 2020/01/01\nend_date = 2021-01-01\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn start_after_end_fails() {
        let config = make_config("[data]\npath = d\ntickers = AAPL\nstart_date = 2022-01-01\nend_date = 2021-01-01\n");
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "start_date"));
    }

    #[test]
    fn zero_portfolios_fails() {
        let err = validate_config(&with_data("[optimizer]\nportfolios = 0\n")).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "portfolios"));
    }

    #[test]
    fn non_numeric_portfolios_fails() {
        let err = validate_config(&with_data("[optimizer]\nportfolios = many\n")).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "portfolios"));
    }

    #[test]
    fn single_frontier_point_fails() {
        let err = validate_config(&with_data("[optimizer]\nfrontier_points = 1\n")).unwrap_err();
        assert!(
            matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "frontier_points")
        );
    }

    #[test]
    fn negative_seed_fails() {
        let err = validate_config(&with_data("[optimizer]\nseed = -1\n")).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "seed"));
    }

    #[test]
    fn non_positive_capital_fails() {
        let err = validate_config(&with_data("[backtest]\ninitial_capital = 0\n")).unwrap_err();
        assert!(
            matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "initial_capital")
        );
    }

    #[test]
    fn risk_free_rate_out_of_range_fails() {
        for value in ["1.0", "-0.01", "1.5"] {
            let err = validate_config(&with_data(&format!("[backtest]\nrisk_free_rate = {value}\n")))
                .unwrap_err();
            assert!(
                matches!(err, PortfolioError::ConfigInvalid { ref key, .. } if key == "risk_free_rate")
            );
        }
    }

    #[test]
    fn cvar_confidence_bounds() {
        let err = validate_config(&with_data("[backtest]\ncvar_confidence = 1\n")).unwrap_err();
        assert!(
            matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "cvar_confidence")
        );
    }

    #[test]
    fn min_observations_too_small_fails() {
        let err = validate_config(&with_data("[backtest]\nmin_observations = 1\n")).unwrap_err();
        assert!(
            matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "min_observations")
        );
    }

    #[test]
    fn benchmark_list_fails() {
        let err = validate_config(&with_data("[benchmark]\nticker = SPY,QQQ\n")).unwrap_err();
        assert!(matches!(err, PortfolioError::ConfigInvalid { key, .. } if key == "ticker"));
    }

    #[test]
    fn parse_or_uses_default_when_absent() {
        let config = with_data("");
        assert_eq!(parse_or(&config, "optimizer", "seed", 42u64).unwrap(), 42);
    }
}
