//! Small statistics helpers shared by the sampler, solver and metrics.
//!
//! Variances and covariances use the sample (n - 1) denominator.

/// Arithmetic mean; 0.0 for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation; 0.0 with fewer than two values.
pub fn sample_std(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / (values.len() - 1) as f64).sqrt()
}

/// Population standard deviation; 0.0 for an empty slice.
pub fn population_std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let ss: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    (ss / values.len() as f64).sqrt()
}

/// Column means of a row-major matrix with `cols` columns.
pub fn column_means(rows: &[Vec<f64>], cols: usize) -> Vec<f64> {
    let mut sums = vec![0.0; cols];
    for row in rows {
        for (sum, v) in sums.iter_mut().zip(row) {
            *sum += v;
        }
    }
    let n = rows.len().max(1) as f64;
    sums.into_iter().map(|s| s / n).collect()
}

/// Sample covariance matrix of the columns of a row-major matrix.
///
/// Returns a zero matrix when there are fewer than two rows.
pub fn sample_covariance(rows: &[Vec<f64>], cols: usize) -> Vec<Vec<f64>> {
    let mut cov = vec![vec![0.0; cols]; cols];
    if rows.len() < 2 {
        return cov;
    }
    let means = column_means(rows, cols);
    for row in rows {
        for i in 0..cols {
            let di = row[i] - means[i];
            for j in i..cols {
                cov[i][j] += di * (row[j] - means[j]);
            }
        }
    }
    let denom = (rows.len() - 1) as f64;
    for i in 0..cols {
        for j in i..cols {
            cov[i][j] /= denom;
            cov[j][i] = cov[i][j];
        }
    }
    cov
}

pub fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// wᵀ Σ w
pub fn quadratic_form(weights: &[f64], matrix: &[Vec<f64>]) -> f64 {
    matrix
        .iter()
        .zip(weights)
        .map(|(row, wi)| wi * dot(row, weights))
        .sum()
}

/// `count` evenly spaced values from `start` to `end` inclusive.
pub fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count)
                .map(|i| {
                    if i == count - 1 {
                        end
                    } else {
                        start + step * i as f64
                    }
                })
                .collect()
        }
    }
}

/// Percentile with linear interpolation between closest ranks.
///
/// `q` is in [0, 100]. Returns `None` for an empty slice.
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let rank = (q.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] + (sorted[hi] - sorted[lo]) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn mean_and_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values), 5.0, epsilon = 1e-12);
        assert_relative_eq!(population_std(&values), 2.0, epsilon = 1e-12);
        assert_relative_eq!(sample_std(&values), (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn std_of_short_slices_is_zero() {
        assert_eq!(sample_std(&[1.0]), 0.0);
        assert_eq!(population_std(&[]), 0.0);
        assert_eq!(mean(&[]), 0.0);
    }

    #[test]
    fn covariance_matches_hand_computation() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 6.0]];
        let cov = sample_covariance(&rows, 2);
        assert_relative_eq!(cov[0][0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(cov[0][1], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[1][0], 2.0, epsilon = 1e-12);
        assert_relative_eq!(cov[1][1], 4.0, epsilon = 1e-12);
    }

    #[test]
    fn quadratic_form_of_identity() {
        let m = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        assert_relative_eq!(quadratic_form(&[0.6, 0.8], &m), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn linspace_endpoints_exact() {
        let grid = linspace(0.1, 0.3, 5);
        assert_eq!(grid.len(), 5);
        assert_eq!(grid[0], 0.1);
        assert_eq!(grid[4], 0.3);
        assert_relative_eq!(grid[2], 0.2, epsilon = 1e-12);
        assert_eq!(linspace(1.0, 2.0, 1), vec![1.0]);
        assert!(linspace(1.0, 2.0, 0).is_empty());
    }

    #[test]
    fn percentile_interpolates() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_relative_eq!(percentile(&values, 50.0).unwrap(), 3.0, epsilon = 1e-12);
        assert_relative_eq!(percentile(&values, 5.0).unwrap(), 1.2, epsilon = 1e-12);
        assert_relative_eq!(percentile(&values, 100.0).unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(percentile(&[], 5.0), None);
    }
}
