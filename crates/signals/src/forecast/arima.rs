//! ARIMA(p, d, q) fitted by conditional sum of squares.

use maestro_core::{ArimaOrder, SignalError};
use tracing::debug;

use super::optimizer::NelderMead;
use crate::stats::{mean, sample_variance};

/// Upper bound on `sum(|phi|)` and `sum(|theta|)`.
const COEFFICIENT_BOUND: f64 = 0.999;
const MAX_P: usize = 5;
const MAX_Q: usize = 5;
const MAX_D: usize = 2;

/// A fitted ARIMA model, ready to forecast.
#[derive(Debug, Clone, PartialEq)]
pub struct ArimaModel {
    order: ArimaOrder,
    phi: Vec<f64>,
    theta: Vec<f64>,
    /// Mean of the stationary series, zero when `d > 0`
    mean: f64,
    sigma2: f64,
    aic: f64,
    converged: bool,
    /// Stationary (differenced, demeaned) series
    working: Vec<f64>,
    residuals: Vec<f64>,
    /// Last value at each differencing level, level 0 first
    anchors: Vec<f64>,
}

fn difference(values: &[f64]) -> Vec<f64> {
    values.windows(2).map(|w| w[1] - w[0]).collect()
}

/// One-step residuals of the ARMA recursion; the first `p` are zero.
fn css_residuals(w: &[f64], phi: &[f64], theta: &[f64]) -> Vec<f64> {
    let p = phi.len();
    let mut e = vec![0.0; w.len()];
    for t in p..w.len() {
        let ar: f64 = phi.iter().enumerate().map(|(i, c)| c * w[t - 1 - i]).sum();
        let ma: f64 = theta
            .iter()
            .enumerate()
            .filter(|(j, _)| t > *j)
            .map(|(j, c)| c * e[t - 1 - j])
            .sum();
        e[t] = w[t] - ar - ma;
    }
    e
}

fn sum_abs(values: &[f64]) -> f64 {
    values.iter().map(|v| v.abs()).sum()
}

impl ArimaModel {
    /// Fits the model to `values` (oldest first).
    ///
    /// # Errors
    /// * [`SignalError::InvalidConfig`] for an order outside `p, q <= 5`, `d <= 2`.
    /// * [`SignalError::InsufficientData`] when too few points remain after differencing.
    /// * [`SignalError::Degenerate`] when the differenced series does not vary.
    /// * [`SignalError::ModelFit`] for non-finite input or a failed optimisation.
    pub fn fit(values: &[f64], order: ArimaOrder) -> Result<Self, SignalError> {
        if order.p > MAX_P || order.q > MAX_Q || order.d > MAX_D {
            return Err(SignalError::InvalidConfig(format!(
                "unsupported ARIMA order {order}"
            )));
        }
        if values.iter().any(|v| !v.is_finite()) {
            return Err(SignalError::ModelFit("non-finite input".into()));
        }

        let required = order.d + order.p + order.q + 2;
        if values.len() < required {
            return Err(SignalError::InsufficientData {
                required,
                actual: values.len(),
            });
        }

        let mut anchors = Vec::with_capacity(order.d);
        let mut working = values.to_vec();
        for _ in 0..order.d {
            anchors.push(working[working.len() - 1]);
            working = difference(&working);
        }

        let variance = sample_variance(&working).unwrap_or(0.0);
        if variance <= 1e-12 {
            return Err(SignalError::Degenerate(
                "insufficient variation after differencing".into(),
            ));
        }

        let centre = if order.d == 0 {
            mean(&working).unwrap_or(0.0)
        } else {
            0.0
        };
        if centre != 0.0 {
            working.iter_mut().for_each(|v| *v -= centre);
        }

        let (p, q) = (order.p, order.q);
        let effective = (working.len() - p) as f64;
        let objective = |params: &[f64]| {
            let (phi, theta) = params.split_at(p);
            if sum_abs(phi) >= COEFFICIENT_BOUND || sum_abs(theta) >= COEFFICIENT_BOUND {
                return f64::INFINITY;
            }
            let css: f64 = css_residuals(&working, phi, theta)[p..]
                .iter()
                .map(|e| e * e)
                .sum();
            // scaled so the simplex tolerances are independent of price units
            css / effective / variance
        };

        let start = vec![0.0; p + q];
        let minimum = NelderMead::default().minimize(objective, &start);
        if !minimum.value.is_finite() {
            return Err(SignalError::ModelFit(format!(
                "ARIMA{order} objective diverged"
            )));
        }
        if !minimum.converged {
            debug!(%order, iterations = minimum.iterations, "ARIMA fit stopped at iteration limit");
        }

        let (phi, theta) = minimum.x.split_at(p);
        let residuals = css_residuals(&working, phi, theta);
        let sigma2 = minimum.value * variance;
        let aic = effective * sigma2.max(f64::MIN_POSITIVE).ln() + 2.0 * (p + q + 1) as f64;

        Ok(Self {
            order,
            phi: phi.to_vec(),
            theta: theta.to_vec(),
            mean: centre,
            sigma2,
            aic,
            converged: minimum.converged,
            working,
            residuals,
            anchors,
        })
    }

    /// Fits every order with `p <= max_p`, `q <= max_q` and keeps the lowest AIC.
    ///
    /// # Errors
    /// Returns the last fit error when no candidate order could be fitted.
    pub fn fit_auto(
        values: &[f64],
        max_p: usize,
        d: usize,
        max_q: usize,
    ) -> Result<Self, SignalError> {
        let mut best: Option<Self> = None;
        let mut last_err = SignalError::ModelFit("no candidate orders".into());

        for p in 0..=max_p.min(MAX_P) {
            for q in 0..=max_q.min(MAX_Q) {
                match Self::fit(values, ArimaOrder::new(p, d, q)) {
                    Ok(model) => {
                        if best.as_ref().map_or(true, |b| model.aic < b.aic) {
                            best = Some(model);
                        }
                    }
                    Err(e) => {
                        debug!(p, d, q, error = %e, "candidate order skipped");
                        last_err = e;
                    }
                }
            }
        }

        best.ok_or(last_err)
    }

    /// Point forecasts for the next `horizon` steps, on the original scale.
    #[must_use]
    pub fn forecast(&self, horizon: usize) -> Vec<f64> {
        let mut w = self.working.clone();
        let mut e = self.residuals.clone();

        for _ in 0..horizon {
            let t = w.len();
            let ar: f64 = self
                .phi
                .iter()
                .enumerate()
                .filter(|(i, _)| t > *i)
                .map(|(i, c)| c * w[t - 1 - i])
                .sum();
            let ma: f64 = self
                .theta
                .iter()
                .enumerate()
                .filter(|(j, _)| t > *j)
                .map(|(j, c)| c * e[t - 1 - j])
                .sum();
            w.push(ar + ma);
            e.push(0.0);
        }

        let mut path: Vec<f64> = w[self.working.len()..]
            .iter()
            .map(|v| v + self.mean)
            .collect();

        for anchor in self.anchors.iter().rev() {
            let mut level = *anchor;
            for v in &mut path {
                level += *v;
                *v = level;
            }
        }

        path
    }

    #[must_use]
    pub const fn order(&self) -> ArimaOrder {
        self.order
    }

    #[must_use]
    pub fn ar_coefficients(&self) -> &[f64] {
        &self.phi
    }

    #[must_use]
    pub fn ma_coefficients(&self) -> &[f64] {
        &self.theta
    }

    /// Innovation variance estimate.
    #[must_use]
    pub const fn sigma2(&self) -> f64 {
        self.sigma2
    }

    #[must_use]
    pub const fn aic(&self) -> f64 {
        self.aic
    }

    #[must_use]
    pub const fn converged(&self) -> bool {
        self.converged
    }
}
