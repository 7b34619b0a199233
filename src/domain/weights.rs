//! Long-only allocation weights.

use crate::domain::error::PortfolioError;

/// Allowed deviation of the weight sum from 1.0.
pub const WEIGHT_SUM_TOLERANCE: f64 = 1e-8;

/// One non-negative weight per asset, in universe order.
///
/// Construction does not validate; [`WeightVector::validate`] checks the
/// unit-sum and non-negativity invariant and is called before any backtest.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightVector(Vec<f64>);

impl WeightVector {
    pub fn new(weights: Vec<f64>) -> Self {
        Self(weights)
    }

    /// 1/n for each of `n` assets.
    pub fn equal(n: usize) -> Self {
        Self(vec![1.0 / n.max(1) as f64; n])
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn sum(&self) -> f64 {
        self.0.iter().sum()
    }

    pub fn validate(&self) -> Result<(), PortfolioError> {
        if self.0.is_empty() {
            return Err(PortfolioError::Validation {
                reason: "weight vector is empty".into(),
            });
        }
        if let Some((i, w)) = self.0.iter().enumerate().find(|(_, w)| !w.is_finite()) {
            return Err(PortfolioError::Validation {
                reason: format!("weight {} is not finite ({})", i, w),
            });
        }
        if let Some((i, w)) = self.0.iter().enumerate().find(|(_, w)| **w < 0.0) {
            return Err(PortfolioError::Validation {
                reason: format!("weight {} is negative ({})", i, w),
            });
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(PortfolioError::Validation {
                reason: format!("weights sum to {}, expected 1", sum),
            });
        }
        Ok(())
    }

    /// Sum of squared weights. 1/n for equal weights, 1 for a single holding.
    pub fn herfindahl(&self) -> f64 {
        self.0.iter().map(|w| w * w).sum()
    }

    /// The `n` largest weights with their tickers, descending.
    pub fn top<'a>(&self, tickers: &'a [String], n: usize) -> Vec<(&'a str, f64)> {
        let mut pairs: Vec<(&str, f64)> = tickers
            .iter()
            .map(String::as_str)
            .zip(self.0.iter().copied())
            .collect();
        pairs.sort_by(|a, b| b.1.total_cmp(&a.1));
        pairs.truncate(n);
        pairs
    }
}

impl From<Vec<f64>> for WeightVector {
    fn from(weights: Vec<f64>) -> Self {
        Self(weights)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn equal_weights_validate() {
        let w = WeightVector::equal(3);
        assert!(w.validate().is_ok());
        assert_relative_eq!(w.herfindahl(), 1.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn rejects_negative_weight() {
        let w = WeightVector::new(vec![1.2, -0.2]);
        let err = w.validate().unwrap_err();
        assert!(matches!(err, PortfolioError::Validation { .. }));
        assert!(err.to_string().contains("negative"));
    }

    #[test]
    fn rejects_bad_sum() {
        let w = WeightVector::new(vec![0.5, 0.4]);
        assert!(matches!(
            w.validate(),
            Err(PortfolioError::Validation { .. })
        ));
    }

    #[test]
    fn accepts_sum_within_tolerance() {
        let w = WeightVector::new(vec![0.5, 0.5 + 5e-9]);
        assert!(w.validate().is_ok());
    }

    #[test]
    fn rejects_empty_and_nan() {
        assert!(WeightVector::new(vec![]).validate().is_err());
        assert!(WeightVector::new(vec![f64::NAN, 1.0]).validate().is_err());
    }

    #[test]
    fn herfindahl_single_holding_is_one() {
        let w = WeightVector::new(vec![0.0, 1.0, 0.0]);
        assert_relative_eq!(w.herfindahl(), 1.0);
    }

    #[test]
    fn top_sorts_descending() {
        let tickers = vec!["A".to_string(), "B".to_string(), "C".to_string()];
        let w = WeightVector::new(vec![0.2, 0.5, 0.3]);
        let top = w.top(&tickers, 2);
        assert_eq!(top, vec![("B", 0.5), ("C", 0.3)]);
    }
}
