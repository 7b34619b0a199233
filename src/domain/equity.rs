//! Equity curves and drawdown.

use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

/// Portfolio value over time. The first point is the capital the curve
/// started with.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EquityCurve {
    points: Vec<EquityPoint>,
}

impl EquityCurve {
    pub fn new(points: Vec<EquityPoint>) -> Self {
        Self { points }
    }

    /// Compounds `returns` from `initial_capital`.
    ///
    /// Capital is placed at the close of `dates[0]`, so the curve has one
    /// point per date, `equity[0] == initial_capital`, and the return
    /// dated `dates[i]` moves the curve from point `i - 1` to point `i`.
    pub fn compound(dates: &[NaiveDate], returns: &[f64], initial_capital: f64) -> Self {
        let mut points = Vec::with_capacity(dates.len());
        let mut equity = initial_capital;
        for (i, (&date, &r)) in dates.iter().zip(returns).enumerate() {
            if i > 0 {
                equity *= 1.0 + r;
            }
            points.push(EquityPoint { date, equity });
        }
        Self { points }
    }

    pub fn points(&self) -> &[EquityPoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn initial_value(&self) -> Option<f64> {
        self.points.first().map(|p| p.equity)
    }

    pub fn final_value(&self) -> Option<f64> {
        self.points.last().map(|p| p.equity)
    }

    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.equity).collect()
    }

    /// Period-over-period changes between consecutive points.
    pub fn period_returns(&self) -> Vec<f64> {
        self.points
            .windows(2)
            .map(|w| {
                if w[0].equity > 0.0 {
                    w[1].equity / w[0].equity - 1.0
                } else {
                    0.0
                }
            })
            .collect()
    }

    /// `equity / running_max(equity) - 1` at every point; never positive.
    pub fn drawdown_series(&self) -> Vec<EquityPoint> {
        let mut peak = f64::MIN;
        self.points
            .iter()
            .map(|p| {
                peak = peak.max(p.equity);
                let dd = if peak > 0.0 { p.equity / peak - 1.0 } else { 0.0 };
                EquityPoint {
                    date: p.date,
                    equity: dd,
                }
            })
            .collect()
    }

    /// Minimum of the drawdown series; 0.0 for an empty curve.
    pub fn max_drawdown(&self) -> f64 {
        self.drawdown_series()
            .iter()
            .map(|p| p.equity)
            .fold(0.0, f64::min)
    }

    /// Appends a segment as-is, without re-basing.
    pub fn extend(&mut self, segment: &EquityCurve) {
        self.points.extend_from_slice(&segment.points);
    }
}
