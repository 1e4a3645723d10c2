//! Derivative-free minimisation (Nelder-Mead simplex).

/// Result of a minimisation run.
#[derive(Debug, Clone, PartialEq)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub iterations: usize,
    pub converged: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct NelderMead {
    pub max_iterations: usize,
    /// Spread of objective values across the simplex
    pub f_tolerance: f64,
    /// Largest vertex distance from the best vertex
    pub x_tolerance: f64,
    /// Initial simplex edge, relative to `max(|x|, 1)`
    pub initial_step: f64,
}

impl Default for NelderMead {
    fn default() -> Self {
        Self {
            max_iterations: 2000,
            f_tolerance: 1e-8,
            x_tolerance: 1e-6,
            initial_step: 0.05,
        }
    }
}

const REFLECT: f64 = 1.0;
const EXPAND: f64 = 2.0;
const CONTRACT: f64 = 0.5;
const SHRINK: f64 = 0.5;

impl NelderMead {
    /// Minimises `f` starting at `start`. Non-finite objective values are
    /// treated as `+inf`, so callers can reject infeasible points by
    /// returning `f64::INFINITY` or NaN.
    pub fn minimize<F>(&self, f: F, start: &[f64]) -> Minimum
    where
        F: Fn(&[f64]) -> f64,
    {
        let eval = |x: &[f64]| {
            let v = f(x);
            if v.is_finite() {
                v
            } else {
                f64::INFINITY
            }
        };

        let n = start.len();
        if n == 0 {
            return Minimum {
                x: Vec::new(),
                value: eval(start),
                iterations: 0,
                converged: true,
            };
        }

        let mut simplex: Vec<Vec<f64>> = Vec::with_capacity(n + 1);
        simplex.push(start.to_vec());
        for i in 0..n {
            let mut vertex = start.to_vec();
            vertex[i] += self.initial_step * vertex[i].abs().max(1.0);
            simplex.push(vertex);
        }
        let mut values: Vec<f64> = simplex.iter().map(|v| eval(v)).collect();

        let mut iterations = 0;
        let mut converged = false;

        while iterations < self.max_iterations {
            order(&mut simplex, &mut values);

            let spread = values[n] - values[0];
            let size = simplex[1..]
                .iter()
                .flat_map(|v| v.iter().zip(&simplex[0]).map(|(a, b)| (a - b).abs()))
                .fold(0.0f64, f64::max);
            if values[0].is_finite() && spread.abs() <= self.f_tolerance && size <= self.x_tolerance
            {
                converged = true;
                break;
            }
            iterations += 1;

            let centroid: Vec<f64> = (0..n)
                .map(|j| simplex[..n].iter().map(|v| v[j]).sum::<f64>() / n as f64)
                .collect();
            let toward = |coef: f64| -> Vec<f64> {
                centroid
                    .iter()
                    .zip(&simplex[n])
                    .map(|(c, w)| c + coef * (c - w))
                    .collect()
            };

            let reflected = toward(REFLECT);
            let f_reflected = eval(&reflected);

            if f_reflected < values[0] {
                let expanded = toward(EXPAND);
                let f_expanded = eval(&expanded);
                if f_expanded < f_reflected {
                    simplex[n] = expanded;
                    values[n] = f_expanded;
                } else {
                    simplex[n] = reflected;
                    values[n] = f_reflected;
                }
                continue;
            }

            if f_reflected < values[n - 1] {
                simplex[n] = reflected;
                values[n] = f_reflected;
                continue;
            }

            if f_reflected < values[n] {
                let outside = toward(REFLECT * CONTRACT);
                let f_outside = eval(&outside);
                if f_outside <= f_reflected {
                    simplex[n] = outside;
                    values[n] = f_outside;
                    continue;
                }
            } else {
                let inside = toward(-CONTRACT);
                let f_inside = eval(&inside);
                if f_inside < values[n] {
                    simplex[n] = inside;
                    values[n] = f_inside;
                    continue;
                }
            }

            let best = simplex[0].clone();
            for (vertex, value) in simplex.iter_mut().zip(values.iter_mut()).skip(1) {
                for (x, b) in vertex.iter_mut().zip(&best) {
                    *x = b + SHRINK * (*x - b);
                }
                *value = eval(vertex);
            }
        }

        order(&mut simplex, &mut values);
        Minimum {
            x: simplex.swap_remove(0),
            value: values[0],
            iterations,
            converged,
        }
    }
}

fn order(simplex: &mut Vec<Vec<f64>>, values: &mut Vec<f64>) {
    let mut paired: Vec<(f64, Vec<f64>)> = values
        .drain(..)
        .zip(simplex.drain(..))
        .collect();
    paired.sort_by(|a, b| a.0.total_cmp(&b.0));
    for (value, vertex) in paired {
        values.push(value);
        simplex.push(vertex);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_quadratic_minimum() {
        let result = NelderMead::default().minimize(
            |x| (x[0] - 3.0).powi(2) + (x[1] + 1.0).powi(2) + 2.0,
            &[0.0, 0.0],
        );
        assert!(result.converged);
        assert!((result.x[0] - 3.0).abs() < 1e-3);
        assert!((result.x[1] + 1.0).abs() < 1e-3);
        assert!((result.value - 2.0).abs() < 1e-6);
    }

    #[test]
    fn rosenbrock() {
        let nm = NelderMead {
            max_iterations: 5000,
            ..NelderMead::default()
        };
        let result = nm.minimize(
            |x| 100.0 * (x[1] - x[0] * x[0]).powi(2) + (1.0 - x[0]).powi(2),
            &[-1.2, 1.0],
        );
        assert!((result.x[0] - 1.0).abs() < 1e-2, "{:?}", result.x);
        assert!((result.x[1] - 1.0).abs() < 1e-2, "{:?}", result.x);
    }

    #[test]
    fn infeasible_region_is_avoided() {
        // minimum of x^2 restricted to x >= 1
        let result = NelderMead::default().minimize(
            |x| if x[0] < 1.0 { f64::NAN } else { x[0] * x[0] },
            &[4.0],
        );
        assert!(result.x[0] >= 1.0);
        assert!(result.x[0] < 1.01);
    }
}
