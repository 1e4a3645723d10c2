//! Zero-mean GARCH(1,1) with Gaussian likelihood.
//!
//! ```text
//! r_t        = sigma_t * z_t
//! sigma2_t+1 = omega + alpha * r_t^2 + beta * sigma2_t
//! ```
//!
//! The optimiser works on unconstrained parameters `u`:
//! `omega = exp(u0)`, `alpha + beta = 0.999 * logistic(u1)`, and
//! `alpha / (alpha + beta) = logistic(u2)`, which keeps every candidate
//! stationary and positive.

use maestro_core::SignalError;
use tracing::debug;

use super::optimizer::NelderMead;
use crate::stats::sample_variance;

const PERSISTENCE_CAP: f64 = 0.999;
const LN_2PI: f64 = 1.837_877_066_409_345_5;

#[derive(Debug, Clone, PartialEq)]
pub struct GarchModel {
    pub omega: f64,
    pub alpha: f64,
    pub beta: f64,
    /// Conditional variance of the last observation
    last_variance: f64,
    last_return: f64,
    sample_variance: f64,
    log_likelihood: f64,
    converged: bool,
}

fn logistic(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

fn logit(p: f64) -> f64 {
    (p / (1.0 - p)).ln()
}

fn to_params(u: &[f64]) -> (f64, f64, f64) {
    let omega = u[0].exp();
    let persistence = PERSISTENCE_CAP * logistic(u[1]);
    let share = logistic(u[2]);
    (omega, persistence * share, persistence * (1.0 - share))
}

/// Negative log-likelihood and the conditional variance of the last point.
fn negative_log_likelihood(
    returns: &[f64],
    omega: f64,
    alpha: f64,
    beta: f64,
    initial_variance: f64,
) -> (f64, f64) {
    let mut sigma2 = initial_variance;
    let mut nll = 0.0;
    for (t, r) in returns.iter().enumerate() {
        if t > 0 {
            let prev = returns[t - 1];
            sigma2 = omega + alpha * prev * prev + beta * sigma2;
        }
        if !sigma2.is_finite() || sigma2 <= 0.0 {
            return (f64::INFINITY, sigma2);
        }
        nll += 0.5 * (LN_2PI + sigma2.ln() + r * r / sigma2);
    }
    (nll, sigma2)
}

impl GarchModel {
    /// Fits the model by maximum likelihood.
    ///
    /// # Errors
    /// * [`SignalError::InsufficientData`] for fewer than 3 returns.
    /// * [`SignalError::Degenerate`] when the returns have no variance.
    /// * [`SignalError::ModelFit`] for non-finite input or a failed optimisation.
    pub fn fit(returns: &[f64]) -> Result<Self, SignalError> {
        if returns.len() < 3 {
            return Err(SignalError::InsufficientData {
                required: 3,
                actual: returns.len(),
            });
        }
        if returns.iter().any(|r| !r.is_finite()) {
            return Err(SignalError::ModelFit("non-finite return".into()));
        }

        let variance = sample_variance(returns).unwrap_or(0.0);
        if variance <= 1e-12 {
            return Err(SignalError::Degenerate("returns have no variance".into()));
        }

        let start = [
            (variance * 0.1).ln(),
            logit(0.9 / PERSISTENCE_CAP),
            logit(0.1 / 0.9),
        ];
        let objective = |u: &[f64]| {
            let (omega, alpha, beta) = to_params(u);
            negative_log_likelihood(returns, omega, alpha, beta, variance).0
        };

        let minimum = NelderMead {
            max_iterations: 3000,
            ..NelderMead::default()
        }
        .minimize(objective, &start);

        if !minimum.value.is_finite() {
            return Err(SignalError::ModelFit("GARCH likelihood diverged".into()));
        }
        if !minimum.converged {
            debug!(iterations = minimum.iterations, "GARCH fit stopped at iteration limit");
        }

        let (omega, alpha, beta) = to_params(&minimum.x);
        let (nll, last_variance) = negative_log_likelihood(returns, omega, alpha, beta, variance);

        Ok(Self {
            omega,
            alpha,
            beta,
            last_variance,
            last_return: returns[returns.len() - 1],
            sample_variance: variance,
            log_likelihood: -nll,
            converged: minimum.converged,
        })
    }

    /// Conditional variance forecasts for steps `1..=horizon`.
    #[must_use]
    pub fn forecast_variance(&self, horizon: usize) -> Vec<f64> {
        let mut out = Vec::with_capacity(horizon);
        if horizon == 0 {
            return out;
        }
        let mut sigma2 = self.omega
            + self.alpha * self.last_return * self.last_return
            + self.beta * self.last_variance;
        out.push(sigma2);
        for _ in 1..horizon {
            sigma2 = self.omega + (self.alpha + self.beta) * sigma2;
            out.push(sigma2);
        }
        out
    }

    #[must_use]
    pub fn persistence(&self) -> f64 {
        self.alpha + self.beta
    }

    /// Long-run variance `omega / (1 - alpha - beta)`.
    #[must_use]
    pub fn unconditional_variance(&self) -> f64 {
        self.omega / (1.0 - self.persistence())
    }

    #[must_use]
    pub const fn sample_variance(&self) -> f64 {
        self.sample_variance
    }

    #[must_use]
    pub const fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    #[must_use]
    pub const fn converged(&self) -> bool {
        self.converged
    }
}
