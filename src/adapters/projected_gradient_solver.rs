//! In-process solver for the long-only minimum-variance QP.
//!
//! The return constraint is moved into the objective with a multiplier
//! λ ≥ 0, giving `min wᵀΣw − λ μᵀw` over the unit simplex. Each inner
//! problem is solved by accelerated projected gradient (FISTA with
//! function-value restart); λ is found by bracketing and bisection so that
//! `μᵀw(λ)` just meets the target.

use crate::domain::error::PortfolioError;
use crate::domain::stats;
use crate::ports::solver_port::{LongOnlyQp, QpOutcome, QpSolverPort};

const MAX_BRACKET_DOUBLINGS: usize = 64;
const MAX_BISECTIONS: usize = 200;

#[derive(Debug, Clone)]
pub struct ProjectedGradientSolver {
    pub max_iterations: usize,
    pub tolerance: f64,
    pub feasibility_tolerance: f64,
}

impl Default for ProjectedGradientSolver {
    fn default() -> Self {
        Self {
            max_iterations: 50_000,
            tolerance: 1e-10,
            feasibility_tolerance: 1e-9,
        }
    }
}

impl ProjectedGradientSolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Minimizes `wᵀΣw − λ μᵀw` over the simplex from `start`.
    ///
    /// Stops when the projected-gradient residual `‖x − P(x − ∇f(x)/L)‖∞`
    /// drops below `tolerance`, or when a plain gradient step from the
    /// current iterate no longer decreases the objective. With `L` an upper
    /// bound on the gradient's Lipschitz constant that step always descends
    /// unless `x` is stationary, so the second case is rounding noise.
    /// Returns `None` when neither happens within the budget.
    fn minimize(
        &self,
        cov: &[Vec<f64>],
        mu: &[f64],
        lambda: f64,
        lipschitz: f64,
        start: &[f64],
    ) -> Option<Vec<f64>> {
        let objective = |w: &[f64]| stats::quadratic_form(w, cov) - lambda * stats::dot(mu, w);
        let step = |point: &[f64]| gradient_step(cov, mu, lambda, lipschitz, point);

        let mut x = project_to_simplex(start);
        if max_abs_diff(&x, &step(&x)) < self.tolerance {
            return Some(x);
        }
        let mut y = x.clone();
        let mut t = 1.0_f64;
        let mut fx = objective(&x);
        let mut restarted = false;

        for _ in 0..self.max_iterations {
            let x_next = step(&y);
            let f_next = objective(&x_next);

            if restarted && f_next >= fx {
                // y == x already: no descent left from x
                return Some(x);
            }
            if f_next > fx {
                // momentum overshoot: restart from the last iterate
                t = 1.0;
                y = x.clone();
                restarted = true;
                continue;
            }
            restarted = false;

            let t_next = (1.0 + (1.0 + 4.0 * t * t).sqrt()) / 2.0;
            let momentum = (t - 1.0) / t_next;
            y = x_next
                .iter()
                .zip(&x)
                .map(|(a, b)| a + momentum * (a - b))
                .collect();
            x = x_next;
            fx = f_next;
            t = t_next;

            if max_abs_diff(&x, &step(&x)) < self.tolerance {
                return Some(x);
            }
        }
        None
    }
}

/// Projected gradient step `P(point − ∇f(point) / L)`.
fn gradient_step(
    cov: &[Vec<f64>],
    mu: &[f64],
    lambda: f64,
    lipschitz: f64,
    point: &[f64],
) -> Vec<f64> {
    let moved: Vec<f64> = cov
        .iter()
        .zip(mu)
        .zip(point)
        .map(|((row, m), p)| p - (2.0 * stats::dot(row, point) - lambda * m) / lipschitz)
        .collect();
    project_to_simplex(&moved)
}

fn max_abs_diff(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).abs())
        .fold(0.0, f64::max)
}

impl QpSolverPort for ProjectedGradientSolver {
    fn solve(&self, problem: &LongOnlyQp) -> Result<QpOutcome, PortfolioError> {
        let n = problem.dimension();
        let cov = &problem.covariance;
        let mu = &problem.expected_returns;

        if n == 0 {
            return Err(PortfolioError::SolverUnavailable {
                reason: "problem has no assets".into(),
            });
        }
        if cov.len() != n || cov.iter().any(|row| row.len() != n) {
            return Err(PortfolioError::SolverUnavailable {
                reason: format!("covariance must be {n}x{n}"),
            });
        }
        if !problem.target_return.is_finite()
            || mu.iter().any(|m| !m.is_finite())
            || cov.iter().flatten().any(|c| !c.is_finite())
        {
            return Ok(QpOutcome::NotConverged { iterations: 0 });
        }

        let max_mu = mu.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min_mu = mu.iter().copied().fold(f64::INFINITY, f64::min);
        let target = problem.target_return;
        let tol = self.feasibility_tolerance;

        // Best reachable return on the simplex is the best single asset.
        if target > max_mu + tol {
            return Ok(QpOutcome::Infeasible);
        }

        let lipschitz = (2.0 * spectral_bound(cov)).max(1e-12);
        let uniform = vec![1.0 / n as f64; n];
        let meets = |w: &[f64]| stats::dot(mu, w) >= target - tol;
        let not_converged = QpOutcome::NotConverged {
            iterations: self.max_iterations,
        };

        let Some(unconstrained) = self.minimize(cov, mu, 0.0, lipschitz, &uniform) else {
            return Ok(not_converged);
        };
        if meets(&unconstrained) {
            return Ok(optimal(unconstrained, cov));
        }

        let spread = (max_mu - min_mu).max(1e-12);
        let mut lo = 0.0_f64;
        let mut hi = lipschitz / spread;
        let mut best = unconstrained;
        let mut bracketed = false;

        for _ in 0..MAX_BRACKET_DOUBLINGS {
            let Some(w) = self.minimize(cov, mu, hi, lipschitz, &best) else {
                return Ok(not_converged);
            };
            best = w;
            if meets(&best) {
                bracketed = true;
                break;
            }
            lo = hi;
            hi *= 2.0;
        }
        if !bracketed {
            return Ok(not_converged);
        }

        let mut warm = best.clone();
        for _ in 0..MAX_BISECTIONS {
            if hi - lo <= 1e-13 * hi {
                break;
            }
            let mid = 0.5 * (lo + hi);
            let Some(w) = self.minimize(cov, mu, mid, lipschitz, &warm) else {
                return Ok(not_converged);
            };
            if meets(&w) {
                hi = mid;
                best = w.clone();
            } else {
                lo = mid;
            }
            warm = w;
        }

        Ok(optimal(best, cov))
    }
}

fn optimal(weights: Vec<f64>, cov: &[Vec<f64>]) -> QpOutcome {
    let variance = stats::quadratic_form(&weights, cov).max(0.0);
    QpOutcome::Optimal { weights, variance }
}

/// Euclidean projection onto `{w : w ≥ 0, Σw = 1}`.
pub fn project_to_simplex(v: &[f64]) -> Vec<f64> {
    let mut sorted = v.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));

    let mut cumulative = 0.0;
    let mut theta = 0.0;
    for (i, &u) in sorted.iter().enumerate() {
        cumulative += u;
        let candidate = (cumulative - 1.0) / (i + 1) as f64;
        if u - candidate > 0.0 {
            theta = candidate;
        }
    }
    v.iter().map(|x| (x - theta).max(0.0)).collect()
}

/// Upper bound on the largest eigenvalue of a symmetric positive
/// semi-definite matrix: the smaller of its trace and its largest absolute
/// row sum.
fn spectral_bound(matrix: &[Vec<f64>]) -> f64 {
    let trace: f64 = matrix.iter().enumerate().map(|(i, row)| row[i]).sum();
    let row_sum = matrix
        .iter()
        .map(|row| row.iter().map(|v| v.abs()).sum::<f64>())
        .fold(0.0, f64::max);
    trace.min(row_sum).max(0.0)
}
