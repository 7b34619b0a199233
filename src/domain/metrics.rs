//! Performance metrics computed from an equity curve.

use super::equity::EquityCurve;
use super::stats;

pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// How a metric is presented in reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricFormat {
    Percent,
    Decimal,
}

/// One named figure of a summary or risk report.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricValue {
    pub name: &'static str,
    pub value: f64,
    pub format: MetricFormat,
}

impl MetricValue {
    fn percent(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            format: MetricFormat::Percent,
        }
    }

    fn decimal(name: &'static str, value: f64) -> Self {
        Self {
            name,
            value,
            format: MetricFormat::Decimal,
        }
    }
}

/// Standard performance report for one equity curve.
///
/// Every field is derived from the curve alone; `cvar` is present only when
/// a confidence level was requested and the curve has at least one return.
#[derive(Debug, Clone, PartialEq)]
pub struct PerformanceSummary {
    pub total_return: f64,
    pub cagr: f64,
    pub volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub cvar: Option<f64>,
}

impl PerformanceSummary {
    /// Metrics of an arbitrary curve, independent of how it was produced.
    /// Return-based figures use the curve's own period returns.
    pub fn from_equity_curve(
        curve: &EquityCurve,
        risk_free_rate: f64,
        periods_per_year: f64,
        cvar_confidence: Option<f64>,
    ) -> Self {
        Self::from_curve_and_returns(
            curve,
            &curve.period_returns(),
            risk_free_rate,
            periods_per_year,
            cvar_confidence,
        )
    }

    /// Growth and drawdown from `curve`; volatility, Sharpe and CVaR from
    /// `returns`, the per-period returns the curve was compounded from.
    pub fn from_curve_and_returns(
        curve: &EquityCurve,
        returns: &[f64],
        risk_free_rate: f64,
        periods_per_year: f64,
        cvar_confidence: Option<f64>,
    ) -> Self {
        let initial = curve.initial_value().unwrap_or(0.0);
        let final_value = curve.final_value().unwrap_or(initial);

        let growth = if initial > 0.0 {
            final_value / initial
        } else {
            1.0
        };
        let total_return = growth - 1.0;

        let periods = curve.len() as f64;
        let cagr = if periods > 0.0 && growth.is_finite() && growth > 0.0 {
            growth.powf(periods_per_year / periods) - 1.0
        } else {
            0.0
        };

        let volatility = stats::sample_std(returns) * periods_per_year.sqrt();
        let sharpe_ratio = if volatility > 0.0 {
            (stats::mean(returns) * periods_per_year - risk_free_rate) / volatility
        } else {
            0.0
        };

        PerformanceSummary {
            total_return,
            cagr,
            volatility,
            sharpe_ratio,
            max_drawdown: curve.max_drawdown(),
            cvar: cvar_confidence.and_then(|c| conditional_value_at_risk(returns, c)),
        }
    }

    /// Named metrics in report order; CVaR only when present.
    pub fn metrics(&self) -> Vec<MetricValue> {
        let mut metrics = vec![
            MetricValue::percent("Total Return", self.total_return),
            MetricValue::percent("CAGR", self.cagr),
            MetricValue::percent("Volatility", self.volatility),
            MetricValue::decimal("Sharpe Ratio", self.sharpe_ratio),
            MetricValue::percent("Max Drawdown", self.max_drawdown),
        ];
        if let Some(cvar) = self.cvar {
            metrics.push(MetricValue::percent("CVaR", cvar));
        }
        metrics
    }
}

/// Loss threshold not exceeded with probability `confidence`, as a
/// positive number: `-percentile(returns, (1 - confidence) * 100)`.
pub fn value_at_risk(returns: &[f64], confidence: f64) -> Option<f64> {
    stats::percentile(returns, (1.0 - confidence) * 100.0).map(|q| -q)
}

/// Mean loss of the returns at or below the VaR threshold, negated.
pub fn conditional_value_at_risk(returns: &[f64], confidence: f64) -> Option<f64> {
    let threshold = stats::percentile(returns, (1.0 - confidence) * 100.0)?;
    let tail: Vec<f64> = returns.iter().copied().filter(|&r| r <= threshold).collect();
    if tail.is_empty() {
        return None;
    }
    Some(-stats::mean(&tail))
}

/// Risk profile of a selected allocation: the sampler's ex-ante figures
/// next to the realized tail and drawdown statistics of its backtest.
#[derive(Debug, Clone, PartialEq)]
pub struct RiskReport {
    pub expected_return: f64,
    pub annual_volatility: f64,
    pub sharpe_ratio: f64,
    pub max_drawdown: f64,
    pub calmar_ratio: f64,
    pub sortino_ratio: f64,
    pub value_at_risk: f64,
    pub conditional_value_at_risk: f64,
}

pub const ACCEPTANCE_MIN_SHARPE: f64 = 0.7;
pub const ACCEPTANCE_MAX_DRAWDOWN: f64 = -0.3;

impl RiskReport {
    pub fn compute(
        expected_return: f64,
        annual_volatility: f64,
        sharpe_ratio: f64,
        curve: &EquityCurve,
        returns: &[f64],
        risk_free_rate: f64,
        periods_per_year: f64,
        confidence: f64,
    ) -> Self {
        let max_drawdown = curve.max_drawdown();

        let calmar_ratio = if max_drawdown < 0.0 {
            expected_return / max_drawdown.abs()
        } else if expected_return > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        let downside: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        let downside_deviation = stats::population_std(&downside) * periods_per_year.sqrt();
        let sortino_ratio = if downside_deviation > 0.0 {
            (expected_return - risk_free_rate) / downside_deviation
        } else {
            0.0
        };

        RiskReport {
            expected_return,
            annual_volatility,
            sharpe_ratio,
            max_drawdown,
            calmar_ratio,
            sortino_ratio,
            value_at_risk: value_at_risk(returns, confidence).unwrap_or(0.0),
            conditional_value_at_risk: conditional_value_at_risk(returns, confidence)
                .unwrap_or(0.0),
        }
    }

    pub fn metrics(&self) -> Vec<MetricValue> {
        vec![
            MetricValue::percent("Expected Return", self.expected_return),
            MetricValue::percent("Annual Volatility", self.annual_volatility),
            MetricValue::decimal("Sharpe Ratio", self.sharpe_ratio),
            MetricValue::percent("Max Drawdown", self.max_drawdown),
            MetricValue::decimal("Calmar Ratio", self.calmar_ratio),
            MetricValue::decimal("Sortino Ratio", self.sortino_ratio),
            MetricValue::percent("VaR", self.value_at_risk),
            MetricValue::percent("CVaR", self.conditional_value_at_risk),
        ]
    }

    /// Sharpe above 0.7 with drawdown shallower than 30%.
    pub fn meets_acceptance(&self) -> bool {
        self.sharpe_ratio > ACCEPTANCE_MIN_SHARPE && self.max_drawdown > ACCEPTANCE_MAX_DRAWDOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::equity::EquityPoint;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn make_equity_curve(values: &[f64]) -> EquityCurve {
        EquityCurve::new(
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| EquityPoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                        + chrono::Duration::days(i as i64),
                    equity: v,
                })
                .collect(),
        )
    }

    #[test]
    fn summary_empty_curve() {
        let s = PerformanceSummary::from_equity_curve(
            &EquityCurve::default(),
            0.03,
            TRADING_DAYS_PER_YEAR,
            Some(0.95),
        );
        assert_eq!(s.total_return, 0.0);
        assert_eq!(s.cagr, 0.0);
        assert_eq!(s.volatility, 0.0);
        assert_eq!(s.sharpe_ratio, 0.0);
        assert_eq!(s.max_drawdown, 0.0);
        assert_eq!(s.cvar, None);
    }

    #[test]
    fn summary_total_return_positive() {
        let curve = make_equity_curve(&[100_000.0, 110_000.0]);
        let s = PerformanceSummary::from_equity_curve(&curve, 0.05, TRADING_DAYS_PER_YEAR, None);
        assert_relative_eq!(s.total_return, 0.10, epsilon = 1e-9);
        assert!(s.cagr > 0.0);
    }

    #[test]
    fn summary_total_return_negative() {
        let curve = make_equity_curve(&[100_000.0, 90_000.0]);
        let s = PerformanceSummary::from_equity_curve(&curve, 0.05, TRADING_DAYS_PER_YEAR, None);
        assert_relative_eq!(s.total_return, -0.10, epsilon = 1e-9);
        assert!(s.cagr < 0.0);
        assert_relative_eq!(s.max_drawdown, -0.10, epsilon = 1e-9);
    }

    #[test]
    fn summary_cagr_over_one_year_equals_total_return() {
        let mut values = vec![100.0];
        for _ in 1..252 {
            let last = *values.last().unwrap();
            values.push(last * 1.0005);
        }
        let curve = make_equity_curve(&values);
        let s = PerformanceSummary::from_equity_curve(&curve, 0.0, TRADING_DAYS_PER_YEAR, None);
        assert_relative_eq!(s.cagr, s.total_return, epsilon = 1e-12);
    }

    #[test]
    fn summary_flat_curve_has_zero_sharpe() {
        let curve = make_equity_curve(&[100.0; 10]);
        let s = PerformanceSummary::from_equity_curve(&curve, 0.03, TRADING_DAYS_PER_YEAR, None);
        assert_eq!(s.volatility, 0.0);
        assert_eq!(s.sharpe_ratio, 0.0);
    }

    #[test]
    fn summary_sharpe_matches_definition() {
        let curve = make_equity_curve(&[100.0, 101.0, 100.5, 102.0, 101.0, 103.0]);
        let s = PerformanceSummary::from_equity_curve(&curve, 0.02, TRADING_DAYS_PER_YEAR, None);
        let r = curve.period_returns();
        let vol = stats::sample_std(&r) * TRADING_DAYS_PER_YEAR.sqrt();
        assert_relative_eq!(s.volatility, vol, epsilon = 1e-12);
        assert_relative_eq!(
            s.sharpe_ratio,
            (stats::mean(&r) * TRADING_DAYS_PER_YEAR - 0.02) / vol,
            epsilon = 1e-12
        );
    }

    #[test]
    fn cvar_is_mean_of_tail() {
        let returns: Vec<f64> = (1..=100).map(|i| (i as f64 - 50.0) / 1000.0).collect();
        // 5th percentile of -0.049..0.050 sits at -0.04405; five values fall at or below it.
        let cvar = conditional_value_at_risk(&returns, 0.95).unwrap();
        assert_relative_eq!(cvar, (0.049 + 0.048 + 0.047 + 0.046 + 0.045) / 5.0, epsilon = 1e-12);
        let var = value_at_risk(&returns, 0.95).unwrap();
        assert!(cvar >= var);
    }

    #[test]
    fn cvar_requested_on_summary() {
        let curve = make_equity_curve(&[100.0, 99.0, 101.0, 97.0, 102.0]);
        let s = PerformanceSummary::from_equity_curve(
            &curve,
            0.0,
            TRADING_DAYS_PER_YEAR,
            Some(0.95),
        );
        assert!(s.cvar.is_some());
        assert!(s.cvar.unwrap() > 0.0);
    }

    #[test]
    fn risk_report_ratios() {
        let curve = make_equity_curve(&[100.0, 110.0, 88.0, 99.0]);
        let report = RiskReport::compute(0.2, 0.15, 1.1, &curve, &curve.period_returns(), 0.03, TRADING_DAYS_PER_YEAR, 0.95);
        assert_relative_eq!(report.max_drawdown, -0.2, epsilon = 1e-12);
        assert_relative_eq!(report.calmar_ratio, 1.0, epsilon = 1e-12);
        // single negative return: zero downside deviation
        assert_eq!(report.sortino_ratio, 0.0);
        assert!(report.value_at_risk > 0.0);
        assert!(report.meets_acceptance());
    }

    #[test]
    fn summary_metrics_list_cvar_only_when_present() {
        let curve = make_equity_curve(&[100.0, 99.0, 101.0, 97.0, 102.0]);
        let without = PerformanceSummary::from_equity_curve(&curve, 0.0, 252.0, None);
        let with = PerformanceSummary::from_equity_curve(&curve, 0.0, 252.0, Some(0.95));
        assert_eq!(without.metrics().len(), 5);
        assert_eq!(with.metrics().len(), 6);
        let sharpe = with.metrics()[3];
        assert_eq!(sharpe.name, "Sharpe Ratio");
        assert_eq!(sharpe.format, MetricFormat::Decimal);
        assert_eq!(with.metrics()[0].format, MetricFormat::Percent);
    }

    #[test]
    fn explicit_returns_drive_volatility_and_sharpe() {
        let curve = make_equity_curve(&[100.0, 101.0, 102.0]);
        let returns = [-0.2, 0.01, 0.0099];
        let s = PerformanceSummary::from_curve_and_returns(&curve, &returns, 0.0, 252.0, Some(0.95));
        let expected_vol = stats::sample_std(&returns) * 252.0_f64.sqrt();
        assert_relative_eq!(s.volatility, expected_vol, epsilon = 1e-12);
        assert_relative_eq!(
            s.sharpe_ratio,
            stats::mean(&returns) * 252.0 / expected_vol,
            epsilon = 1e-12
        );
        assert!(s.cvar.unwrap() > 0.1);
        // growth still comes from the curve
        assert_relative_eq!(s.total_return, 0.02, epsilon = 1e-12);
    }

    #[test]
    fn risk_report_rejects_deep_drawdown() {
        let curve = make_equity_curve(&[100.0, 60.0, 70.0]);
        let report = RiskReport::compute(0.2, 0.15, 1.5, &curve, &curve.period_returns(), 0.03, TRADING_DAYS_PER_YEAR, 0.95);
        assert!(!report.meets_acceptance());
    }
}
