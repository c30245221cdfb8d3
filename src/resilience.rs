//! Post-threshold resilience scoring
//!
//! Measures how quickly lactate accumulates once the athlete runs faster than
//! LT2. A shallow post-threshold slope maps to a high score through the
//! hyperbolic decay `100 / (1 + k·slope)`.

use crate::config::ResilienceParameters;
use crate::curve::FittedCurve;
use crate::threshold::ThresholdResult;
use serde::{Deserialize, Serialize};

/// Coarse band of the post-threshold slope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResilienceStatus {
    UltraStable,
    Resilient,
    Limit,
    Critical,
}

impl ResilienceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResilienceStatus::UltraStable => "Ultra Stable",
            ResilienceStatus::Resilient => "Resilient",
            ResilienceStatus::Limit => "Limit",
            ResilienceStatus::Critical => "Critical",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceResult {
    /// Lactate rise per km/h between LT2 and peak speed, never negative
    pub post_threshold_slope: f64,
    /// 0-100
    pub resilience_score: f64,
    pub is_stable: bool,
    pub status: ResilienceStatus,
    /// Lactate cost per km/h between LT1 and LT2
    pub speed_tax: f64,
}

pub struct ResilienceScorer<'a> {
    params: &'a ResilienceParameters,
}

impl<'a> ResilienceScorer<'a> {
    pub fn new(params: &'a ResilienceParameters) -> Self {
        Self { params }
    }

    pub fn assess(&self, curve: &FittedCurve, thresholds: &ThresholdResult) -> ResilienceResult {
        let slope = self.post_threshold_slope(curve, thresholds.lt2_speed);
        let resilience_score = self.score(slope);
        let speed_tax = self.speed_tax(curve, thresholds);

        tracing::debug!(slope, resilience_score, speed_tax, "Resilience assessed");

        ResilienceResult {
            post_threshold_slope: slope,
            resilience_score,
            is_stable: self.is_stable(resilience_score),
            status: self.status(slope),
            speed_tax,
        }
    }

    /// Slope of the fitted curve from LT2 to the end of the test
    pub fn post_threshold_slope(&self, curve: &FittedCurve, lt2_speed: f64) -> f64 {
        let max_speed = curve.max_speed();
        self.slope_between(
            (lt2_speed, curve.lactate_at(lt2_speed)),
            (max_speed, curve.lactate_at(max_speed)),
        )
    }

    /// Lactate slope from the threshold point to the peak point
    ///
    /// A test that ended at or right after the threshold gets the penalty
    /// slope. Falling lactate counts as zero.
    pub fn slope_between(&self, threshold: (f64, f64), peak: (f64, f64)) -> f64 {
        let dv = peak.0 - threshold.0;
        if dv <= self.params.min_speed_delta_kmh {
            tracing::warn!(
                threshold_speed = threshold.0,
                peak_speed = peak.0,
                "Test ended at threshold, applying penalty slope"
            );
            return self.params.penalty_slope;
        }

        let slope = (peak.1 - threshold.1) / dv;
        if slope.is_finite() {
            slope.max(0.0)
        } else {
            self.params.penalty_slope
        }
    }

    /// Score, stability and band for a known slope
    pub fn assess_slope(&self, slope: f64) -> (f64, bool, ResilienceStatus) {
        let score = self.score(slope);
        (score, self.is_stable(score), self.status(slope))
    }

    /// `100 / (1 + k·slope)`, non-increasing in slope
    pub fn score(&self, slope: f64) -> f64 {
        100.0 / (1.0 + self.params.k * slope.max(0.0))
    }

    pub fn is_stable(&self, score: f64) -> bool {
        score > self.params.stability_cutoff
    }

    pub fn status(&self, slope: f64) -> ResilienceStatus {
        let p = &self.params;
        if slope < p.ultra_stable_slope {
            ResilienceStatus::UltraStable
        } else if slope < p.resilient_slope {
            ResilienceStatus::Resilient
        } else if slope < p.limit_slope {
            ResilienceStatus::Limit
        } else {
            ResilienceStatus::Critical
        }
    }

    /// Lactate cost per km/h between LT1 and LT2; zero over short spans
    pub fn speed_tax(&self, curve: &FittedCurve, thresholds: &ThresholdResult) -> f64 {
        let span = thresholds.lt2_speed - thresholds.lt1_speed;
        if span <= self.params.min_speed_tax_span_kmh {
            return 0.0;
        }
        let tax = (curve.lactate_at(thresholds.lt2_speed) - curve.lactate_at(thresholds.lt1_speed)) / span;
        if tax.is_finite() {
            tax
        } else {
            0.0
        }
    }
}
