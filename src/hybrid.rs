//! Hybrid and acid-bath analysis
//!
//! Mixed-modality tests record only three running stages, too few for a
//! regression curve. The threshold instead comes from the exact parabola
//! through the three samples. The acid-bath sub-protocol rates how a fixed
//! bike effort floods and clears lactate, and adjusts the running pace.

use crate::config::HybridParameters;
use crate::curve::linspace;
use crate::error::InputError;
use crate::models::NormalizedStages;
use crate::threshold::dmax_index;
use serde::{Deserialize, Serialize};

/// `y = a·x² + b·x + c`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Parabola {
    pub a: f64,
    pub b: f64,
    pub c: f64,
}

impl Parabola {
    /// Closed-form Lagrange parabola through three points
    ///
    /// Returns `None` when two abscissae coincide.
    pub fn through(points: [(f64, f64); 3]) -> Option<Self> {
        let [(x0, y0), (x1, y1), (x2, y2)] = points;
        let denom = (x0 - x1) * (x0 - x2) * (x1 - x2);
        if denom.abs() < f64::EPSILON {
            return None;
        }

        let a = (x2 * (y1 - y0) + x1 * (y0 - y2) + x0 * (y2 - y1)) / denom;
        let b = (x2 * x2 * (y0 - y1) + x1 * x1 * (y2 - y0) + x0 * x0 * (y1 - y2)) / denom;
        let c = (x1 * x2 * (x1 - x2) * y0 + x2 * x0 * (x2 - x0) * y1 + x0 * x1 * (x0 - x1) * y2) / denom;

        Some(Self { a, b, c })
    }

    pub fn evaluate(&self, x: f64) -> f64 {
        (self.a * x + self.b) * x + self.c
    }

    pub fn slope(&self, x: f64) -> f64 {
        2.0 * self.a * x + self.b
    }

    /// Smallest `x` in `[lo, hi]` with `evaluate(x) == target` on a rising branch
    ///
    /// Roots where the curve falls through `target` are skipped. Near-zero
    /// leading coefficients are solved as a line.
    pub fn solve_in_range(&self, target: f64, lo: f64, hi: f64, linear_epsilon: f64) -> Option<f64> {
        let valid = |x: f64| x.is_finite() && x >= lo && x <= hi && self.slope(x) > 0.0;
        let c = self.c - target;

        if self.a.abs() < linear_epsilon {
            if self.b.abs() < linear_epsilon {
                return None;
            }
            let x = -c / self.b;
            return valid(x).then_some(x);
        }

        let discriminant = self.b * self.b - 4.0 * self.a * c;
        if discriminant < 0.0 {
            return None;
        }

        let sqrt_d = discriminant.sqrt();
        let r1 = (-self.b - sqrt_d) / (2.0 * self.a);
        let r2 = (-self.b + sqrt_d) / (2.0 * self.a);

        [r1.min(r2), r1.max(r2)].into_iter().find(|&x| valid(x))
    }
}

/// Threshold of a three-stage test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridThreshold {
    pub threshold_speed: f64,
    /// Lactate the threshold was solved for
    pub target_lactate: f64,
    /// Lowest stage lactate
    pub baseline_lactate: f64,
    pub parabola: Parabola,
    /// Dmax point on the parabola, chord between first and last sample
    pub dmax_speed: Option<f64>,
    /// Whether the middle-stage fallback was used
    pub fallback_applied: bool,
}

/// Analyzer for three-stage hybrid tests
pub struct HybridAnalyzer<'a> {
    params: &'a HybridParameters,
    grid_points: usize,
}

impl<'a> HybridAnalyzer<'a> {
    pub fn new(params: &'a HybridParameters, grid_points: usize) -> Self {
        Self { params, grid_points }
    }

    /// (speed, lactate) points of a normalized three-stage test
    pub fn points(&self, stages: &NormalizedStages) -> Result<[(f64, f64); 3], InputError> {
        match stages.as_slice() {
            &[s0, s1, s2] => Ok([(s0.speed, s0.lactate), (s1.speed, s1.lactate), (s2.speed, s2.lactate)]),
            other => Err(InputError::WrongStageCount {
                protocol: "hybrid".to_string(),
                required: self.params.stage_count,
                actual: other.len(),
            }),
        }
    }

    /// Points from bare speed and lactate arrays, sorted by speed
    pub fn points_from_series(&self, speeds: &[f64], lactates: &[f64]) -> Result<[(f64, f64); 3], InputError> {
        if speeds.len() != lactates.len() {
            return Err(InputError::MismatchedLengths {
                speeds: speeds.len(),
                lactates: lactates.len(),
                heart_rates: 0,
            });
        }
        let mut pairs: Vec<(f64, f64)> = speeds.iter().copied().zip(lactates.iter().copied()).collect();
        for (i, &(speed, lactate)) in pairs.iter().enumerate() {
            if !speed.is_finite() || speed <= 0.0 {
                return Err(invalid("speed", i + 1, speed));
            }
            if !lactate.is_finite() || lactate < 0.0 {
                return Err(invalid("lactate", i + 1, lactate));
            }
        }
        pairs.sort_by(|a, b| a.0.total_cmp(&b.0));

        match pairs.as_slice() {
            &[p0, p1, p2] => Ok([p0, p1, p2]),
            other => Err(InputError::WrongStageCount {
                protocol: "hybrid".to_string(),
                required: self.params.stage_count,
                actual: other.len(),
            }),
        }
    }

    /// Parabola threshold of three points sorted by speed
    ///
    /// The threshold is the smallest speed in the tested range where the
    /// parabola rises through `baseline + offset`. Without such a root the
    /// middle stage speed is used.
    pub fn threshold(&self, points: [(f64, f64); 3]) -> Result<HybridThreshold, InputError> {
        let [(x0, y0), (x1, y1), (x2, y2)] = points;
        let baseline_lactate = y0.min(y1).min(y2);
        let target_lactate = baseline_lactate + self.params.threshold_offset;

        let parabola = Parabola::through(points).ok_or_else(|| invalid("speed", 2, x1))?;

        let (threshold_speed, fallback_applied) =
            match parabola.solve_in_range(target_lactate, x0, x2, self.params.linear_epsilon) {
                Some(speed) => (speed, false),
                None => {
                    tracing::warn!(
                        target_lactate,
                        "No parabola root in the tested range, using the middle stage"
                    );
                    (x1, true)
                }
            };

        Ok(HybridThreshold {
            threshold_speed,
            target_lactate,
            baseline_lactate,
            parabola,
            dmax_speed: self.dmax_speed(&parabola, points),
            fallback_applied,
        })
    }

    fn dmax_speed(&self, parabola: &Parabola, points: [(f64, f64); 3]) -> Option<f64> {
        let grid = linspace(points[0].0, points[2].0, self.grid_points);
        let mut lactates: Vec<f64> = grid.iter().map(|&x| parabola.evaluate(x)).collect();
        let last = grid.len() - 1;
        lactates[0] = points[0].1;
        lactates[last] = points[2].1;
        dmax_index(&grid, &lactates, 0, last).map(|i| grid[i])
    }

    /// Acid-bath indices and adjusted pace
    pub fn acid_bath(&self, input: &AcidBathInput) -> Result<AcidBathResult, InputError> {
        input.validate()?;
        let p = &self.params;

        let power_index = if input.weight_kg > 0.0 {
            input.bike_watt_avg / input.weight_kg.powf(p.allometric_exponent)
        } else {
            0.0
        };
        let glyco_index = if power_index > 0.0 {
            (input.lactate_peak - input.lactate_baseline) / power_index
        } else {
            0.0
        };
        let flush_rate = if input.lactate_peak > 0.0 {
            (input.lactate_peak - input.lactate_recovery) / input.lactate_peak * 100.0
        } else {
            0.0
        };

        let base = input.base_pace_mps;
        let adjusted_pace_mps =
            (base * (1.0 - glyco_index * p.glyco_weight + flush_rate * p.flush_weight)).clamp(0.0, base);

        tracing::debug!(power_index, glyco_index, flush_rate, adjusted_pace_mps, "Acid bath");

        Ok(AcidBathResult {
            power_index,
            glyco_index,
            flush_rate,
            base_pace_mps: base,
            adjusted_pace_mps,
            adjusted_pace_min_per_km: mps_to_min_per_km(adjusted_pace_mps),
            chart: vec![
                ChartPoint::new("Baseline", input.lactate_baseline),
                ChartPoint::new("Peak", input.lactate_peak),
                ChartPoint::new("Recovery", input.lactate_recovery),
            ],
        })
    }
}

/// Acid-bath measurements
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcidBathInput {
    pub weight_kg: f64,
    pub bike_watt_avg: f64,
    pub lactate_baseline: f64,
    pub lactate_peak: f64,
    pub lactate_recovery: f64,
    /// Unadjusted running pace in m/s
    pub base_pace_mps: f64,
}

impl AcidBathInput {
    fn validate(&self) -> Result<(), InputError> {
        let fields = [
            ("weight_kg", self.weight_kg),
            ("bike_watt_avg", self.bike_watt_avg),
            ("lactate_baseline", self.lactate_baseline),
            ("lactate_peak", self.lactate_peak),
            ("lactate_recovery", self.lactate_recovery),
            ("base_pace_mps", self.base_pace_mps),
        ];
        match fields.iter().find(|(_, v)| !v.is_finite() || *v < 0.0) {
            Some(&(parameter, value)) => Err(InputError::InvalidParameter {
                parameter: parameter.to_string(),
                value,
            }),
            None => Ok(()),
        }
    }
}

/// Labeled point of the acid-bath chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub label: String,
    pub lactate: f64,
}

impl ChartPoint {
    pub fn new(label: &str, lactate: f64) -> Self {
        Self {
            label: label.to_string(),
            lactate,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcidBathResult {
    /// Watts per kg^0.67
    pub power_index: f64,
    pub glyco_index: f64,
    /// Percent of peak lactate cleared during recovery
    pub flush_rate: f64,
    pub base_pace_mps: f64,
    pub adjusted_pace_mps: f64,
    pub adjusted_pace_min_per_km: f64,
    pub chart: Vec<ChartPoint>,
}

fn invalid(field: &str, stage: usize, value: f64) -> InputError {
    InputError::InvalidValue {
        field: field.to_string(),
        stage,
        value,
    }
}

/// Convert m/s to minutes per km; zero for non-positive speeds
pub fn mps_to_min_per_km(mps: f64) -> f64 {
    if mps > 0.0 {
        1000.0 / mps / 60.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::StageSample;

    fn points(speeds: [f64; 3], lactates: [f64; 3]) -> [(f64, f64); 3] {
        let params = HybridParameters::default();
        HybridAnalyzer::new(&params, 100)
            .points_from_series(&speeds, &lactates)
            .unwrap()
    }

    #[test]
    fn test_lagrange_coefficients() {
        let p = Parabola::through([(10.0, 1.0), (12.0, 2.0), (14.0, 5.0)]).unwrap();
        assert!((p.a - 0.25).abs() < 1e-12);
        assert!((p.b + 5.0).abs() < 1e-12);
        assert!((p.c - 26.0).abs() < 1e-9);
        assert!(Parabola::through([(10.0, 1.0), (10.0, 2.0), (14.0, 5.0)]).is_none());
    }

    #[test]
    fn test_threshold_reference_scenario() {
        let params = HybridParameters::default();
        let analyzer = HybridAnalyzer::new(&params, 100);
        let result = analyzer.threshold(points([10.0, 12.0, 14.0], [1.0, 2.0, 5.0])).unwrap();

        assert!(!result.fallback_applied);
        assert!(result.threshold_speed > 10.0 && result.threshold_speed < 14.0);
        // 0.25x² - 5x + 23.5 = 0
        assert!((result.threshold_speed - (10.0 + 2.0 * 1.5_f64.sqrt())).abs() < 1e-9);
        assert!((result.parabola.evaluate(result.threshold_speed) - 2.5).abs() < 1e-9);
        assert_eq!(result.baseline_lactate, 1.0);
        assert!(result.dmax_speed.is_some());
    }

    #[test]
    fn test_no_root_falls_back_to_middle_stage() {
        let params = HybridParameters::default();
        let analyzer = HybridAnalyzer::new(&params, 100);
        // concave curve peaking below baseline + 1.5: negative discriminant
        let result = analyzer.threshold(points([10.0, 12.0, 14.0], [1.0, 2.0, 1.2])).unwrap();
        assert!(result.fallback_applied);
        assert_eq!(result.threshold_speed, 12.0);
    }

    #[test]
    fn test_high_first_stage_skips_falling_root() {
        let params = HybridParameters::default();
        let analyzer = HybridAnalyzer::new(&params, 100);
        // 0.75x² - 17.5x + 100.5 = 0 has roots near 10.21 (falling) and 13.12 (rising)
        let result = analyzer.threshold(points([10.0, 12.0, 14.0], [3.0, 1.0, 5.0])).unwrap();

        assert!(!result.fallback_applied);
        let expected = (17.5 + 4.75_f64.sqrt()) / 1.5;
        assert!((result.threshold_speed - expected).abs() < 1e-9);
        assert!((result.threshold_speed - 13.12).abs() < 1e-2);
        assert!(result.parabola.slope(result.threshold_speed) > 0.0);
    }

    #[test]
    fn test_falling_line_has_no_valid_root() {
        let p = Parabola { a: 0.0, b: -1.0, c: 14.0 };
        assert_eq!(p.solve_in_range(2.5, 10.0, 14.0, 1e-9), None);
        let rising = Parabola { a: 0.0, b: 1.0, c: -9.0 };
        assert_eq!(rising.solve_in_range(2.5, 10.0, 14.0, 1e-9), Some(11.5));
    }

    #[test]
    fn test_points_are_sorted_and_validated() {
        let params = HybridParameters::default();
        let analyzer = HybridAnalyzer::new(&params, 100);
        let sorted = analyzer.points_from_series(&[14.0, 10.0, 12.0], &[5.0, 1.0, 2.0]).unwrap();
        assert_eq!(sorted, [(10.0, 1.0), (12.0, 2.0), (14.0, 5.0)]);

        assert!(analyzer.points_from_series(&[10.0, 12.0], &[1.0, 2.0]).is_err());
        assert!(analyzer.points_from_series(&[10.0, 12.0, 14.0], &[1.0, -2.0, 3.0]).is_err());
        // duplicate speeds leave the parabola undefined
        let duplicate = analyzer.points_from_series(&[10.0, 10.0, 14.0], &[1.0, 2.0, 3.0]).unwrap();
        assert!(analyzer.threshold(duplicate).is_err());
    }

    #[test]
    fn test_linear_data_uses_linear_solve() {
        let params = HybridParameters::default();
        let analyzer = HybridAnalyzer::new(&params, 100);
        let result = analyzer.threshold(points([10.0, 12.0, 14.0], [1.0, 2.0, 3.0])).unwrap();
        assert!((result.threshold_speed - 13.0).abs() < 1e-6);
    }

    #[test]
    fn test_wrong_stage_count() {
        let params = HybridParameters::default();
        let analyzer = HybridAnalyzer::new(&params, 100);
        let raw: Vec<StageSample> = (0..4).map(|i| StageSample::new(10.0 + i as f64, 1.0, 130.0)).collect();
        let four = NormalizedStages::normalize(&raw, 64).unwrap();
        assert_eq!(
            analyzer.points(&four).unwrap_err(),
            InputError::WrongStageCount {
                protocol: "hybrid".to_string(),
                required: 3,
                actual: 4
            }
        );
    }

    #[test]
    fn test_acid_bath_reference_scenario() {
        let params = HybridParameters::default();
        let analyzer = HybridAnalyzer::new(&params, 100);
        let input = AcidBathInput {
            weight_kg: 80.0,
            bike_watt_avg: 250.0,
            lactate_baseline: 1.5,
            lactate_peak: 9.0,
            lactate_recovery: 4.0,
            base_pace_mps: 3.5,
        };
        let result = analyzer.acid_bath(&input).unwrap();

        assert!((result.flush_rate - 55.555_555).abs() < 1e-3);
        assert!((result.power_index - 250.0 / 80.0_f64.powf(0.67)).abs() < 1e-12);
        assert!(result.adjusted_pace_mps <= 3.5);
        assert_eq!(result.chart.len(), 3);
        assert_eq!(result.chart[1].label, "Peak");
    }

    #[test]
    fn test_acid_bath_guards() {
        let params = HybridParameters::default();
        let analyzer = HybridAnalyzer::new(&params, 100);
        let input = AcidBathInput {
            weight_kg: 0.0,
            bike_watt_avg: 250.0,
            lactate_baseline: 0.0,
            lactate_peak: 0.0,
            lactate_recovery: 0.0,
            base_pace_mps: 0.0,
        };
        let result = analyzer.acid_bath(&input).unwrap();
        assert_eq!(result.power_index, 0.0);
        assert_eq!(result.glyco_index, 0.0);
        assert_eq!(result.flush_rate, 0.0);
        assert_eq!(result.adjusted_pace_min_per_km, 0.0);

        let bad = AcidBathInput {
            lactate_peak: f64::NAN,
            ..input
        };
        assert!(analyzer.acid_bath(&bad).is_err());
    }

    #[test]
    fn test_pace_conversion() {
        assert!((mps_to_min_per_km(1000.0 / 240.0) - 4.0).abs() < 1e-12);
        assert_eq!(mps_to_min_per_km(0.0), 0.0);
    }
}
