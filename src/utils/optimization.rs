//! Optimization utilities for fitting combination weights.
//!
//! Provides a derivative-free Nelder-Mead minimiser (used for the
//! non-smooth pinball objective), the softmax map from free parameters
//! to the probability simplex, and Euclidean projection onto that simplex
//! (used by projected gradient descent).

use serde::{Deserialize, Serialize};

/// Result of Nelder-Mead optimization.
#[derive(Debug, Clone)]
pub struct NelderMeadResult {
    /// The optimal point found.
    pub optimal_point: Vec<f64>,
    /// The objective function value at the optimal point.
    pub optimal_value: f64,
    /// Number of iterations performed.
    pub iterations: usize,
    /// Whether the algorithm converged.
    pub converged: bool,
}

/// Configuration for Nelder-Mead optimization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NelderMeadConfig {
    /// Maximum number of iterations.
    pub max_iter: usize,
    /// Convergence tolerance on the spread of objective values.
    pub tolerance: f64,
    /// Reflection coefficient.
    pub alpha: f64,
    /// Expansion coefficient.
    pub gamma: f64,
    /// Contraction coefficient.
    pub rho: f64,
    /// Shrinkage coefficient.
    pub sigma: f64,
    /// Initial simplex step size.
    pub initial_step: f64,
}

impl Default for NelderMeadConfig {
    fn default() -> Self {
        Self {
            max_iter: 2000,
            tolerance: 1e-10,
            alpha: 1.0,
            gamma: 2.0,
            rho: 0.5,
            sigma: 0.5,
            initial_step: 0.5,
        }
    }
}

/// Minimise `objective` with the Nelder-Mead simplex method.
///
/// # Example
/// ```
/// use quantile_ensembles::utils::optimization::{nelder_mead, NelderMeadConfig};
///
/// let result = nelder_mead(
///     |x| (x[0] - 2.0).powi(2) + (x[1] - 3.0).powi(2),
///     &[0.0, 0.0],
///     &NelderMeadConfig::default(),
/// );
/// assert!((result.optimal_point[0] - 2.0).abs() < 0.01);
/// assert!((result.optimal_point[1] - 3.0).abs() < 0.01);
/// ```
pub fn nelder_mead<F>(objective: F, initial: &[f64], config: &NelderMeadConfig) -> NelderMeadResult
where
    F: Fn(&[f64]) -> f64,
{
    let n = initial.len();
    if n == 0 {
        return NelderMeadResult {
            optimal_point: vec![],
            optimal_value: f64::NAN,
            iterations: 0,
            converged: false,
        };
    }

    let eval = |p: &[f64]| {
        let v = objective(p);
        if v.is_nan() {
            f64::INFINITY
        } else {
            v
        }
    };

    // Vertices kept sorted best-first
    let mut vertices: Vec<(Vec<f64>, f64)> = Vec::with_capacity(n + 1);
    vertices.push((initial.to_vec(), eval(initial)));
    for i in 0..n {
        let mut p = initial.to_vec();
        p[i] += config.initial_step;
        let v = eval(&p);
        vertices.push((p, v));
    }

    let mut iterations = 0;
    let mut converged = false;

    while iterations < config.max_iter {
        iterations += 1;
        vertices.sort_by(|a, b| a.1.total_cmp(&b.1));

        let best = vertices[0].1;
        let second_worst = vertices[n - 1].1;
        let worst = vertices[n].1;

        if (worst - best).abs() < config.tolerance {
            converged = true;
            break;
        }

        let centroid: Vec<f64> = (0..n)
            .map(|j| vertices[..n].iter().map(|(p, _)| p[j]).sum::<f64>() / n as f64)
            .collect();
        let toward = |from: &[f64], coef: f64| -> Vec<f64> {
            centroid
                .iter()
                .zip(from.iter())
                .map(|(c, x)| c + coef * (x - c))
                .collect()
        };

        let reflected = toward(&vertices[n].0, -config.alpha);
        let reflected_value = eval(&reflected);

        if reflected_value < best {
            let expanded = toward(&reflected, config.gamma);
            let expanded_value = eval(&expanded);
            vertices[n] = if expanded_value < reflected_value {
                (expanded, expanded_value)
            } else {
                (reflected, reflected_value)
            };
            continue;
        }

        if reflected_value < second_worst {
            vertices[n] = (reflected, reflected_value);
            continue;
        }

        let (contracted, contracted_value) = if reflected_value < worst {
            let p = toward(&reflected, config.rho);
            let v = eval(&p);
            (p, v)
        } else {
            let p = toward(&vertices[n].0, config.rho);
            let v = eval(&p);
            (p, v)
        };

        if contracted_value < reflected_value.min(worst) {
            vertices[n] = (contracted, contracted_value);
            continue;
        }

        let anchor = vertices[0].0.clone();
        for (p, v) in vertices.iter_mut().skip(1) {
            for (x, a) in p.iter_mut().zip(anchor.iter()) {
                *x = a + config.sigma * (*x - a);
            }
            *v = eval(p.as_slice());
        }
    }

    vertices.sort_by(|a, b| a.1.total_cmp(&b.1));
    let (optimal_point, optimal_value) = vertices.swap_remove(0);

    NelderMeadResult {
        optimal_point,
        optimal_value,
        iterations,
        converged,
    }
}

/// Map `n - 1` free parameters to `n` non-negative weights summing to one.
///
/// The first weight's logit is pinned at zero so the map is identifiable.
pub fn softmax_weights(free: &[f64]) -> Vec<f64> {
    let logits: Vec<f64> = std::iter::once(0.0).chain(free.iter().copied()).collect();
    let max = logits.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = logits.iter().map(|l| (l - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.iter().map(|e| e / total).collect()
}

/// Euclidean projection of `v` onto the probability simplex.
///
/// Sort-based algorithm of Duchi et al. (2008).
pub fn project_to_simplex(v: &[f64]) -> Vec<f64> {
    if v.is_empty() {
        return vec![];
    }

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
