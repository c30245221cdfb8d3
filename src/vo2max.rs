//! VO2max estimation module
//!
//! Estimates aerobic capacity from the peak speed of a step test. The simple
//! form is the classic running approximation `VO2max ≈ 3.5 × v`. The refined
//! form adds the oxygen cost of overcoming air resistance, which grows with the
//! cube of speed and with the athlete's frontal area.

use crate::config::Vo2MaxParameters;
use serde::{Deserialize, Serialize};

/// VO2max estimation methods
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Vo2MaxMethod {
    /// Linear speed approximation
    Simple,
    /// Linear term plus aerodynamic drag cost and weight correction
    Aerodynamic,
}

/// VO2max estimate with the intermediate terms that produced it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vo2MaxEstimate {
    /// VO2max in ml/kg/min
    pub vo2max: f64,
    pub method: Vo2MaxMethod,
    /// Frontal area proxy in m², refined form only
    pub frontal_area_m2: Option<f64>,
    /// Drag power at peak speed in watts, refined form only
    pub drag_power_w: Option<f64>,
}

/// Aerobic capacity estimator
pub struct Vo2MaxEstimator<'a> {
    params: &'a Vo2MaxParameters,
}

impl<'a> Vo2MaxEstimator<'a> {
    pub fn new(params: &'a Vo2MaxParameters) -> Self {
        Self { params }
    }

    /// Estimate VO2max, picking the refined form when body dimensions differ
    /// from the defaults
    ///
    /// # Arguments
    /// * `v_max_kmh` - Peak speed reached in km/h
    /// * `weight_kg` - Body weight
    /// * `height_cm` - Body height
    /// * `width_cm` - Shoulder width
    pub fn estimate(&self, v_max_kmh: f64, weight_kg: f64, height_cm: f64, width_cm: f64) -> Vo2MaxEstimate {
        if !self.uses_refined(height_cm, width_cm) {
            return Vo2MaxEstimate {
                vo2max: self.simple(v_max_kmh),
                method: Vo2MaxMethod::Simple,
                frontal_area_m2: None,
                drag_power_w: None,
            };
        }

        let area = self.frontal_area(height_cm, width_cm);
        let drag = self.drag_power(v_max_kmh, area);
        let vo2max = self.refined(v_max_kmh, weight_kg, height_cm, width_cm);

        tracing::debug!(v_max_kmh, area, drag, vo2max, "Aerodynamic VO2max estimate");

        Vo2MaxEstimate {
            vo2max,
            method: Vo2MaxMethod::Aerodynamic,
            frontal_area_m2: Some(area),
            drag_power_w: Some(drag),
        }
    }

    /// Simple form: coefficient × speed
    pub fn simple(&self, v_max_kmh: f64) -> f64 {
        self.params.simple_coefficient * v_max_kmh.max(0.0)
    }

    /// Frontal area proxy in m²
    pub fn frontal_area(&self, height_cm: f64, width_cm: f64) -> f64 {
        self.params.frontal_shape_factor * (height_cm / 100.0) * (width_cm / 100.0)
    }

    /// Power spent against air drag, `0.5 ρ Cd A v³`
    pub fn drag_power(&self, v_kmh: f64, area_m2: f64) -> f64 {
        let v = v_kmh.max(0.0) / 3.6;
        0.5 * self.params.air_density * self.params.drag_coefficient * area_m2 * v.powi(3)
    }

    /// Refined form with drag cost and weight correction
    pub fn refined(&self, v_max_kmh: f64, weight_kg: f64, height_cm: f64, width_cm: f64) -> f64 {
        let p = &self.params;
        let drag = self.drag_power(v_max_kmh, self.frontal_area(height_cm, width_cm));

        // ml O2 per minute to deliver the drag power
        let drag_o2 = drag / p.mechanical_efficiency * 60.0 / p.joules_per_ml_o2;
        let drag_o2_per_kg = if weight_kg > 0.0 { drag_o2 / weight_kg } else { 0.0 };

        let base = p.base_coefficient * v_max_kmh.max(0.0) + drag_o2_per_kg;
        base * self.weight_correction(weight_kg)
    }

    /// Multiplicative correction for deviation from the reference weight
    pub fn weight_correction(&self, weight_kg: f64) -> f64 {
        let p = &self.params;
        (1.0 - p.weight_correction_per_kg * (weight_kg - p.reference_weight_kg)).clamp(0.85, 1.15)
    }

    pub fn uses_refined(&self, height_cm: f64, width_cm: f64) -> bool {
        (height_cm - self.params.default_height_cm).abs() > 1e-9
            || (width_cm - self.params.default_width_cm).abs() > 1e-9
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_estimate_for_default_body() {
        let params = Vo2MaxParameters::default();
        let estimate = Vo2MaxEstimator::new(&params).estimate(16.0, 75.0, 180.0, 45.0);
        assert_eq!(estimate.method, Vo2MaxMethod::Simple);
        assert!((estimate.vo2max - 56.0).abs() < 1e-12);
        assert!(estimate.frontal_area_m2.is_none());
    }

    #[test]
    fn test_refined_estimate_for_custom_body() {
        let params = Vo2MaxParameters::default();
        let estimator = Vo2MaxEstimator::new(&params);
        let estimate = estimator.estimate(18.0, 70.0, 190.0, 50.0);

        assert_eq!(estimate.method, Vo2MaxMethod::Aerodynamic);
        let area = estimate.frontal_area_m2.unwrap();
        assert!((area - 0.57).abs() < 1e-12);

        // 5 m/s: 0.5 * 1.225 * 0.9 * 0.57 * 125
        let drag = estimate.drag_power_w.unwrap();
        assert!((drag - 39.2765625).abs() < 1e-9);

        let expected = 3.2 * 18.0 + drag / 0.25 * 60.0 / 20.9 / 70.0;
        assert!((estimate.vo2max - expected).abs() < 1e-9);
    }

    #[test]
    fn test_weight_correction_is_clamped() {
        let params = Vo2MaxParameters::default();
        let estimator = Vo2MaxEstimator::new(&params);
        assert_eq!(estimator.weight_correction(70.0), 1.0);
        assert!((estimator.weight_correction(80.0) - 0.95).abs() < 1e-12);
        assert_eq!(estimator.weight_correction(150.0), 0.85);
        assert_eq!(estimator.weight_correction(10.0), 1.15);
    }

    #[test]
    fn test_drag_grows_with_speed_cubed() {
        let params = Vo2MaxParameters::default();
        let estimator = Vo2MaxEstimator::new(&params);
        let slow = estimator.drag_power(10.0, 0.5);
        let fast = estimator.drag_power(20.0, 0.5);
        assert!((fast / slow - 8.0).abs() < 1e-9);
    }
}
