//! A Nelder-Mead simplex minimizer using a builder pattern.
//!
//! The integrated kinetic fit has four parameters and a cheap but non-smooth
//! (clamped) objective, which is the sweet spot for a derivative-free method.
//! Non-finite costs are treated as `+∞` so the objective can reject
//! unphysical regions simply by returning `f64::INFINITY`.

use std::cmp::Ordering;

use thiserror::Error;

/// Errors raised while configuring or running the minimizer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum OptimizeError {
    #[error("Invalid Nelder-Mead parameter: {0}")]
    InvalidParameter(String),
    #[error("Initial simplex has no finite vertex (all costs are infinite or NaN).")]
    NoFiniteStart,
}

/// The result of an optimization run.
#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationResult {
    pub best_param: Vec<f64>,
    pub best_cost: f64,
    pub iterations: usize,
    /// `true` when the cost tolerance was met before the iteration cap.
    pub converged: bool,
}

/// A Nelder-Mead solver over `dims` parameters (simplex of `dims + 1` vertices).
#[derive(Debug, Clone)]
pub struct NelderMead {
    simplex: Vec<Vec<f64>>,
    costs: Vec<f64>,
    alpha: f64, // reflection
    gamma: f64, // expansion
    rho: f64,   // contraction
    sigma: f64, // shrink
    max_iters: usize,
    abs_tol: f64,
    rel_tol: f64,
}

impl NelderMead {
    /// Build the axis-aligned initial simplex around `start` with per-axis `steps`.
    pub fn around(start: &[f64], steps: &[f64]) -> Result<Self, OptimizeError> {
        if start.is_empty() {
            return Err(OptimizeError::InvalidParameter(
                "Starting point must have at least one dimension.".to_string(),
            ));
        }
        if steps.len() != start.len() {
            return Err(OptimizeError::InvalidParameter(format!(
                "Step vector length {} does not match dimension {}.",
                steps.len(),
                start.len()
            )));
        }
        if steps.iter().any(|s| !s.is_finite() || *s == 0.0) {
            return Err(OptimizeError::InvalidParameter(
                "Simplex steps must be finite and non-zero.".to_string(),
            ));
        }

        let mut simplex = Vec::with_capacity(start.len() + 1);
        simplex.push(start.to_vec());
        for (j, step) in steps.iter().enumerate() {
            let mut vertex = start.to_vec();
            vertex[j] += step;
            simplex.push(vertex);
        }

        let points = simplex.len();
        Ok(Self {
            simplex,
            costs: vec![f64::INFINITY; points],
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            max_iters: 2000,
            abs_tol: 1e-14,
            rel_tol: 1e-10,
        })
    }

    // --- Builder Methods ---

    /// Sets the reflection coefficient (alpha). Must be positive.
    pub fn with_alpha(mut self, alpha: f64) -> Result<Self, OptimizeError> {
        if alpha <= 0.0 {
            return Err(OptimizeError::InvalidParameter(
                "Reflection coefficient (alpha) must be positive.".to_string(),
            ));
        }
        self.alpha = alpha;
        Ok(self)
    }

    /// Sets the expansion coefficient (gamma). Must be greater than 1.0.
    pub fn with_gamma(mut self, gamma: f64) -> Result<Self, OptimizeError> {
        if gamma <= 1.0 {
            return Err(OptimizeError::InvalidParameter(
                "Expansion coefficient (gamma) must be greater than 1.0.".to_string(),
            ));
        }
        self.gamma = gamma;
        Ok(self)
    }

    /// Sets the contraction coefficient (rho). Must be in the range (0.0, 1.0).
    pub fn with_rho(mut self, rho: f64) -> Result<Self, OptimizeError> {
        if !(rho > 0.0 && rho < 1.0) {
            return Err(OptimizeError::InvalidParameter(
                "Contraction coefficient (rho) must be in the range (0.0, 1.0).".to_string(),
            ));
        }
        self.rho = rho;
        Ok(self)
    }

    /// Sets the shrink coefficient (sigma). Must be in the range (0.0, 1.0).
    pub fn with_sigma(mut self, sigma: f64) -> Result<Self, OptimizeError> {
        if !(sigma > 0.0 && sigma < 1.0) {
            return Err(OptimizeError::InvalidParameter(
                "Shrink coefficient (sigma) must be in the range (0.0, 1.0).".to_string(),
            ));
        }
        self.sigma = sigma;
        Ok(self)
    }

    /// Sets the iteration cap.
    pub fn with_max_iters(mut self, max_iters: usize) -> Self {
        self.max_iters = max_iters;
        self
    }

    /// Sets the stopping rule `worst - best <= abs_tol + rel_tol * |best|`.
    pub fn with_tolerance(mut self, abs_tol: f64, rel_tol: f64) -> Result<Self, OptimizeError> {
        if !(abs_tol >= 0.0 && rel_tol >= 0.0) {
            return Err(OptimizeError::InvalidParameter(
                "Tolerances must be non-negative.".to_string(),
            ));
        }
        self.abs_tol = abs_tol;
        self.rel_tol = rel_tol;
        Ok(self)
    }

    fn shrink<F>(&mut self, best_idx: usize, cost_fn: &F)
    where
        F: Fn(&[f64]) -> f64,
    {
        let best = self.simplex[best_idx].clone();
        for i in 0..self.simplex.len() {
            if i == best_idx {
                continue;
            }
            for (x, b) in self.simplex[i].iter_mut().zip(&best) {
                *x = b + self.sigma * (*x - b);
            }
            self.costs[i] = sanitize(cost_fn(&self.simplex[i]));
        }
    }

    /// Runs the optimization loop.
    pub fn run<F>(&mut self, cost_fn: F) -> Result<OptimizationResult, OptimizeError>
    where
        F: Fn(&[f64]) -> f64,
    {
        let points = self.simplex.len();
        let dims = points - 1;

        for i in 0..points {
            self.costs[i] = sanitize(cost_fn(&self.simplex[i]));
        }
        if self.costs.iter().all(|c| !c.is_finite()) {
            return Err(OptimizeError::NoFiniteStart);
        }

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iters {
            let mut order: Vec<usize> = (0..points).collect();
            order.sort_by(|&a, &b| self.costs[a].partial_cmp(&self.costs[b]).unwrap_or(Ordering::Equal));

            let best_idx = order[0];
            let second_worst_idx = order[points - 2];
            let worst_idx = order[points - 1];

            let best_cost = self.costs[best_idx];
            let spread = self.costs[worst_idx] - best_cost;
            if spread.is_finite() && spread <= self.abs_tol + self.rel_tol * best_cost.abs() {
                converged = true;
                break;
            }
            iterations += 1;

            let mut centroid = vec![0.0; dims];
            for (i, vertex) in self.simplex.iter().enumerate() {
                if i != worst_idx {
                    for (c, x) in centroid.iter_mut().zip(vertex) {
                        *c += x;
                    }
                }
            }
            for c in &mut centroid {
                *c /= dims as f64;
            }

            let worst = self.simplex[worst_idx].clone();
            let reflected: Vec<f64> = centroid
                .iter()
                .zip(&worst)
                .map(|(c, w)| c + self.alpha * (c - w))
                .collect();
            let reflected_cost = sanitize(cost_fn(&reflected));

            if best_cost <= reflected_cost && reflected_cost < self.costs[second_worst_idx] {
                self.simplex[worst_idx] = reflected;
                self.costs[worst_idx] = reflected_cost;
            } else if reflected_cost < best_cost {
                let expanded: Vec<f64> = centroid
                    .iter()
                    .zip(&reflected)
                    .map(|(c, r)| c + self.gamma * (r - c))
                    .collect();
                let expanded_cost = sanitize(cost_fn(&expanded));

                if expanded_cost < reflected_cost {
                    self.simplex[worst_idx] = expanded;
                    self.costs[worst_idx] = expanded_cost;
                } else {
                    self.simplex[worst_idx] = reflected;
                    self.costs[worst_idx] = reflected_cost;
                }
            } else if reflected_cost < self.costs[worst_idx] {
                // Outside contraction.
                let contracted: Vec<f64> = centroid
                    .iter()
                    .zip(&reflected)
                    .map(|(c, r)| c + self.rho * (r - c))
                    .collect();
                let contracted_cost = sanitize(cost_fn(&contracted));
                if contracted_cost <= reflected_cost {
                    self.simplex[worst_idx] = contracted;
                    self.costs[worst_idx] = contracted_cost;
                } else {
                    self.shrink(best_idx, &cost_fn);
                }
            } else {
                // Inside contraction.
                let contracted: Vec<f64> = centroid
                    .iter()
                    .zip(&worst)
                    .map(|(c, w)| c + self.rho * (w - c))
                    .collect();
                let contracted_cost = sanitize(cost_fn(&contracted));
                if contracted_cost < self.costs[worst_idx] {
                    self.simplex[worst_idx] = contracted;
                    self.costs[worst_idx] = contracted_cost;
                } else {
                    self.shrink(best_idx, &cost_fn);
                }
            }
        }

        let mut best_idx = 0;
        for i in 1..points {
            if self.costs[i] < self.costs[best_idx] {
                best_idx = i;
            }
        }

        Ok(OptimizationResult {
            best_param: self.simplex[best_idx].clone(),
            best_cost: self.costs[best_idx],
            iterations,
            converged,
        })
    }
}

fn sanitize(cost: f64) -> f64 {
    if cost.is_finite() { cost } else { f64::INFINITY }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn minimizes_a_shifted_quadratic() {
        let mut nm = NelderMead::around(&[0.0, 0.0], &[1.0, 1.0]).unwrap().with_max_iters(500);
        let res = nm
            .run(|p| (p[0] - 3.0).powi(2) + 2.0 * (p[1] + 1.0).powi(2))
            .unwrap();
        assert!((res.best_param[0] - 3.0).abs() < 1e-4);
        assert!((res.best_param[1] + 1.0).abs() < 1e-4);
        assert!(res.converged);
    }

    #[test]
    fn minimizes_rosenbrock() {
        let mut nm = NelderMead::around(&[-1.2, 1.0], &[0.5, 0.5])
            .unwrap()
            .with_max_iters(5000)
            .with_tolerance(0.0, 0.0)
            .unwrap();
        let res = nm
            .run(|p| (1.0 - p[0]).powi(2) + 100.0 * (p[1] - p[0] * p[0]).powi(2))
            .unwrap();
        assert!((res.best_param[0] - 1.0).abs() < 1e-3, "{:?}", res.best_param);
        assert!((res.best_param[1] - 1.0).abs() < 1e-3, "{:?}", res.best_param);
    }

    #[test]
    fn infinite_costs_are_avoided() {
        // The admissible region is x > 0; the minimum of x + 1/x is at x = 1.
        let mut nm = NelderMead::around(&[3.0], &[0.5]).unwrap().with_max_iters(500);
        let res = nm
            .run(|p| if p[0] <= 0.0 { f64::INFINITY } else { p[0] + 1.0 / p[0] })
            .unwrap();
        assert!((res.best_param[0] - 1.0).abs() < 1e-3);
    }

    #[test]
    fn rejects_invalid_coefficients() {
        let nm = NelderMead::around(&[0.0], &[1.0]).unwrap();
        assert!(nm.clone().with_alpha(0.0).is_err());
        assert!(nm.clone().with_gamma(1.0).is_err());
        assert!(nm.clone().with_rho(1.0).is_err());
        assert!(nm.with_sigma(0.0).is_err());
        assert!(NelderMead::around(&[0.0, 1.0], &[1.0]).is_err());
    }

    #[test]
    fn fails_when_no_vertex_is_finite() {
        let mut nm = NelderMead::around(&[0.0], &[1.0]).unwrap();
        assert_eq!(nm.run(|_| f64::NAN), Err(OptimizeError::NoFiniteStart));
    }
}
