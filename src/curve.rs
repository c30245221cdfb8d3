//! Lactate and heart-rate curve fitting
//!
//! Turns the sparse stage samples into continuous, evaluable curves over the
//! tested speed range. Two construction modes exist:
//!
//! - **Smoothing**: least-squares polynomial regression. Passes near, not
//!   through, the samples, so single noisy readings do not bend the curve.
//! - **Monotone cubic**: exact Hermite interpolation with Fritsch-Carlson style
//!   tangents. No overshoot between monotonically related samples.
//!
//! Fitted values are clipped to physiological bounds after the fit, and every
//! downstream consumer searches the same fixed-resolution grid.

use crate::config::{CurveParameters, FitMode};
use crate::error::CurveError;
use crate::models::NormalizedStages;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Underlying function of one fitted series
#[derive(Debug, Clone, PartialEq)]
enum SeriesModel {
    /// Polynomial in the scaled variable `t = (x - center) / scale`
    Polynomial {
        coefficients: Vec<f64>,
        center: f64,
        scale: f64,
    },
    /// Piecewise Hermite cubic through the knots
    MonotoneCubic {
        xs: Vec<f64>,
        ys: Vec<f64>,
        tangents: Vec<f64>,
    },
}

impl SeriesModel {
    fn evaluate(&self, x: f64) -> f64 {
        match self {
            SeriesModel::Polynomial {
                coefficients,
                center,
                scale,
            } => {
                let t = (x - center) / scale;
                coefficients.iter().rev().fold(0.0, |acc, c| acc * t + c)
            }
            SeriesModel::MonotoneCubic { xs, ys, tangents } => {
                hermite_evaluate(xs, ys, tangents, x)
            }
        }
    }
}

/// One fitted series, clipped to `[lower, upper]` and evaluable over its domain
#[derive(Debug, Clone, PartialEq)]
pub struct FittedSeries {
    model: SeriesModel,
    min_x: f64,
    max_x: f64,
    lower: f64,
    upper: f64,
}

impl FittedSeries {
    /// Evaluate at `x`; speeds outside the tested range are clamped into it
    pub fn evaluate(&self, x: f64) -> f64 {
        let x = x.clamp(self.min_x, self.max_x);
        let y = self.model.evaluate(x);
        if y.is_finite() {
            y.clamp(self.lower, self.upper)
        } else {
            self.lower
        }
    }

    /// Polynomial degree actually used, or `None` for the interpolant
    pub fn degree(&self) -> Option<usize> {
        match &self.model {
            SeriesModel::Polynomial { coefficients, .. } => Some(coefficients.len() - 1),
            SeriesModel::MonotoneCubic { .. } => None,
        }
    }
}

/// Raw and fitted samples handed to renderers untouched
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSamples {
    pub raw_speeds: Vec<f64>,
    pub raw_lactates: Vec<f64>,
    pub raw_heart_rates: Vec<f64>,
    pub fitted_speeds: Vec<f64>,
    pub fitted_lactates: Vec<f64>,
    pub fitted_heart_rates: Vec<f64>,
}

/// Fitted lactate and heart-rate curves plus the shared search grid
#[derive(Debug, Clone, PartialEq)]
pub struct FittedCurve {
    lactate: FittedSeries,
    heart_rate: FittedSeries,
    mode: FitMode,
    grid_speeds: Vec<f64>,
    grid_lactates: Vec<f64>,
    grid_heart_rates: Vec<f64>,
    render_points: usize,
    raw: NormalizedStages,
}

impl FittedCurve {
    pub fn min_speed(&self) -> f64 {
        self.lactate.min_x
    }

    pub fn max_speed(&self) -> f64 {
        self.lactate.max_x
    }

    pub fn mode(&self) -> FitMode {
        self.mode
    }

    pub fn lactate_at(&self, speed: f64) -> f64 {
        self.lactate.evaluate(speed)
    }

    pub fn heart_rate_at(&self, speed: f64) -> f64 {
        self.heart_rate.evaluate(speed)
    }

    pub fn lactate_series(&self) -> &FittedSeries {
        &self.lactate
    }

    pub fn heart_rate_series(&self) -> &FittedSeries {
        &self.heart_rate
    }

    pub fn grid_speeds(&self) -> &[f64] {
        &self.grid_speeds
    }

    pub fn grid_lactates(&self) -> &[f64] {
        &self.grid_lactates
    }

    pub fn grid_heart_rates(&self) -> &[f64] {
        &self.grid_heart_rates
    }

    /// Grid index and value of the lowest fitted lactate (first on ties)
    pub fn baseline(&self) -> (usize, f64) {
        self.grid_lactates
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(best_i, best), (i, &value)| {
                if value < best {
                    (i, value)
                } else {
                    (best_i, best)
                }
            })
    }

    pub fn stages(&self) -> &NormalizedStages {
        &self.raw
    }

    /// Renderer payload: raw stages plus the fitted curves
    ///
    /// The smoothing mode renders its search grid; the monotone mode renders a
    /// denser grid for visual fidelity.
    pub fn samples(&self) -> CurveSamples {
        let fitted_speeds = if self.render_points == self.grid_speeds.len() {
            self.grid_speeds.clone()
        } else {
            linspace(self.min_speed(), self.max_speed(), self.render_points)
        };
        let fitted_lactates = fitted_speeds.iter().map(|&v| self.lactate_at(v)).collect();
        let fitted_heart_rates = fitted_speeds.iter().map(|&v| self.heart_rate_at(v)).collect();

        CurveSamples {
            raw_speeds: self.raw.speeds(),
            raw_lactates: self.raw.lactates(),
            raw_heart_rates: self.raw.heart_rates(),
            fitted_speeds,
            fitted_lactates,
            fitted_heart_rates,
        }
    }
}

/// Curve construction
pub struct CurveFitter;

impl CurveFitter {
    /// Fit both series of a normalized test
    ///
    /// Requires at least three distinct speeds.
    pub fn fit(stages: &NormalizedStages, params: &CurveParameters) -> Result<FittedCurve, CurveError> {
        if stages.len() < 3 {
            return Err(CurveError::InsufficientPoints {
                series: "lactate".to_string(),
                points: stages.len(),
            });
        }

        let speeds = stages.speeds();
        let lactates = stages.lactates();
        let heart_rates = stages.heart_rates();

        let (lactate_model, heart_rate_model) = match params.fit_mode {
            FitMode::Smoothing => (
                fit_polynomial(&speeds, &lactates, params.lactate_degree),
                fit_polynomial(&speeds, &heart_rates, params.heart_rate_degree),
            ),
            FitMode::MonotoneCubic => (
                monotone_cubic(&speeds, &lactates),
                monotone_cubic(&speeds, &heart_rates),
            ),
        };

        let min_x = stages.min_speed();
        let max_x = stages.max_speed();
        let lactate = FittedSeries {
            model: lactate_model,
            min_x,
            max_x,
            lower: params.min_lactate,
            upper: f64::MAX,
        };
        let heart_rate = FittedSeries {
            model: heart_rate_model,
            min_x,
            max_x,
            lower: params.min_heart_rate,
            upper: params.max_heart_rate,
        };

        let grid_speeds = linspace(min_x, max_x, params.grid_points);
        let grid_lactates = grid_speeds.iter().map(|&v| lactate.evaluate(v)).collect();
        let grid_heart_rates = grid_speeds.iter().map(|&v| heart_rate.evaluate(v)).collect();

        let render_points = match params.fit_mode {
            FitMode::Smoothing => params.grid_points,
            FitMode::MonotoneCubic => params.monotone_grid_points,
        };

        tracing::debug!(
            mode = ?params.fit_mode,
            lactate_degree = ?lactate.degree(),
            min_speed = min_x,
            max_speed = max_x,
            "Fitted stage curves"
        );

        Ok(FittedCurve {
            lactate,
            heart_rate,
            mode: params.fit_mode,
            grid_speeds,
            grid_lactates,
            grid_heart_rates,
            render_points,
            raw: stages.clone(),
        })
    }
}

/// `n` evenly spaced values from `start` to `end`, both included
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n - 1) as f64;
            let mut values: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            values[n - 1] = end;
            values
        }
    }
}

/// Piecewise-linear interpolation, clamped at the ends
pub fn interpolate_linear(xs: &[f64], ys: &[f64], x: f64) -> f64 {
    let n = xs.len().min(ys.len());
    if n == 0 {
        return 0.0;
    }
    if x <= xs[0] || n == 1 {
        return ys[0];
    }
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    let idx = xs[..n].partition_point(|&v| v <= x).saturating_sub(1).min(n - 2);
    let (x0, x1) = (xs[idx], xs[idx + 1]);
    let (y0, y1) = (ys[idx], ys[idx + 1]);
    if x1 - x0 <= 0.0 {
        return y0;
    }
    y0 + (y1 - y0) * (x - x0) / (x1 - x0)
}

/// Least-squares polynomial on centred and scaled abscissae
///
/// Degree is capped at `points - 1`. A singular normal system drops the degree
/// until it solves; degree zero is the plain mean.
fn fit_polynomial(xs: &[f64], ys: &[f64], degree: usize) -> SeriesModel {
    let center = xs.iter().mean();
    let half_range = xs
        .iter()
        .fold(0.0_f64, |acc, &x| acc.max((x - center).abs()));
    let scale = if half_range > 0.0 { half_range } else { 1.0 };
    let ts: Vec<f64> = xs.iter().map(|&x| (x - center) / scale).collect();

    let max_degree = degree.min(xs.len().saturating_sub(1));
    for d in (1..=max_degree).rev() {
        if let Some(coefficients) = solve_normal_equations(&ts, ys, d) {
            return SeriesModel::Polynomial {
                coefficients,
                center,
                scale,
            };
        }
    }

    SeriesModel::Polynomial {
        coefficients: vec![ys.iter().mean()],
        center,
        scale,
    }
}

/// Solve `(VᵀV) c = Vᵀy` for a Vandermonde matrix `V`
fn solve_normal_equations(ts: &[f64], ys: &[f64], degree: usize) -> Option<Vec<f64>> {
    let size = degree + 1;
    let mut power_sums = vec![0.0; 2 * degree + 1];
    let mut rhs = vec![0.0; size];

    for (&t, &y) in ts.iter().zip(ys) {
        let mut p = 1.0;
        for (k, sum) in power_sums.iter_mut().enumerate() {
            *sum += p;
            if k < size {
                rhs[k] += y * p;
            }
            p *= t;
        }
    }

    let mut matrix: Vec<Vec<f64>> = (0..size)
        .map(|row| (0..size).map(|col| power_sums[row + col]).collect())
        .collect();

    gaussian_elimination(&mut matrix, &mut rhs)
}

/// In-place Gaussian elimination with partial pivoting
fn gaussian_elimination(matrix: &mut [Vec<f64>], rhs: &mut [f64]) -> Option<Vec<f64>> {
    let n = rhs.len();
    for col in 0..n {
        let pivot_row = (col..n).max_by(|&a, &b| matrix[a][col].abs().total_cmp(&matrix[b][col].abs()))?;
        if matrix[pivot_row][col].abs() < 1e-12 {
            return None;
        }
        matrix.swap(col, pivot_row);
        rhs.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = matrix[row][col] / matrix[col][col];
            for k in col..n {
                matrix[row][k] -= factor * matrix[col][k];
            }
            rhs[row] -= factor * rhs[col];
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| matrix[row][k] * solution[k]).sum();
        solution[row] = (rhs[row] - tail) / matrix[row][row];
    }

    solution.iter().all(|c| c.is_finite()).then_some(solution)
}

/// Monotone cubic interpolant
///
/// Interior tangents are the weighted harmonic mean of the adjacent secants,
/// or zero where the secants disagree in sign. End tangents equal the end
/// secants.
fn monotone_cubic(xs: &[f64], ys: &[f64]) -> SeriesModel {
    let n = xs.len();
    let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
    let secants: Vec<f64> = ys
        .windows(2)
        .zip(&h)
        .map(|(w, &dx)| (w[1] - w[0]) / dx)
        .collect();

    let mut tangents = vec![0.0; n];
    for i in 1..n - 1 {
        let (m_prev, m_next) = (secants[i - 1], secants[i]);
        if m_prev * m_next <= 0.0 {
            continue;
        }
        let w1 = 2.0 * h[i] + h[i - 1];
        let w2 = h[i] + 2.0 * h[i - 1];
        tangents[i] = (w1 + w2) / (w1 / m_prev + w2 / m_next);
    }
    tangents[0] = secants[0];
    tangents[n - 1] = secants[n - 2];

    SeriesModel::MonotoneCubic {
        xs: xs.to_vec(),
        ys: ys.to_vec(),
        tangents,
    }
}

fn hermite_evaluate(xs: &[f64], ys: &[f64], tangents: &[f64], x: f64) -> f64 {
    let n = xs.len();
    if x >= xs[n - 1] {
        return ys[n - 1];
    }
    if x <= xs[0] {
        return ys[0];
    }

    let idx = xs.partition_point(|&v| v <= x).saturating_sub(1).min(n - 2);
    let h = xs[idx + 1] - xs[idx];
    let t = (x - xs[idx]) / h;
    let one_minus = 1.0 - t;

    ys[idx] * (1.0 + 2.0 * t) * one_minus * one_minus
        + h * tangents[idx] * t * one_minus * one_minus
        + ys[idx + 1] * t * t * (3.0 - 2.0 * t)
        + h * tangents[idx + 1] * t * t * (t - 1.0)
}
