//! Metabolic profiling
//!
//! Estimates a glycolytic-rate proxy ("VLaMax score") from how steeply lactate
//! climbs at the top end of the test, buckets it into a metabolic type and
//! derives the FatMax speed as a type-specific fraction of LT2.

use crate::config::{MetabolicParameters, SlopeMode, TierTable};
use crate::curve::FittedCurve;
use crate::models::{Discipline, NormalizedStages};
use crate::threshold::ThresholdResult;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

/// Glycolytic tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MetabolicType {
    /// Low glycolytic flux, endurance profile
    Diesel,
    /// Balanced profile
    Allrounder,
    /// High glycolytic flux, power profile
    Sprinter,
}

impl MetabolicType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetabolicType::Diesel => "Diesel",
            MetabolicType::Allrounder => "Allrounder",
            MetabolicType::Sprinter => "Sprinter",
        }
    }
}

impl std::fmt::Display for MetabolicType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of metabolic profiling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetabolicProfile {
    /// Raw lactate slope in mmol/L per km/h
    pub glycolytic_slope: f64,
    /// Normalized, clamped glycolytic score
    pub vla_max_score: f64,
    pub metabolic_type: MetabolicType,
    /// Fraction of LT2 speed used for FatMax
    pub fat_max_factor: f64,
    pub fat_max_speed: f64,
    pub fat_max_heart_rate: f64,
}

/// Metabolic profiler bound to one parameter set
pub struct MetabolicProfiler<'a> {
    params: &'a MetabolicParameters,
}

impl<'a> MetabolicProfiler<'a> {
    pub fn new(params: &'a MetabolicParameters) -> Self {
        Self { params }
    }

    /// Profile a test from its raw stages, fitted curve and thresholds
    pub fn profile(
        &self,
        stages: &NormalizedStages,
        curve: &FittedCurve,
        thresholds: &ThresholdResult,
        discipline: Discipline,
    ) -> MetabolicProfile {
        let glycolytic_slope = match self.params.slope_mode {
            SlopeMode::Terminal => terminal_slope(stages),
            SlopeMode::Regression => self.regression_slope(stages, thresholds.lt2_speed),
        };
        let vla_max_score = self.score(glycolytic_slope);
        let table = self.tier_table(discipline);
        let metabolic_type = classify(vla_max_score, table);
        let fat_max_factor = fat_max_factor(metabolic_type, table);

        let fat_max_speed = thresholds.lt2_speed * fat_max_factor;
        let fat_max_heart_rate =
            curve.heart_rate_at(fat_max_speed.clamp(curve.min_speed(), curve.max_speed()));

        tracing::debug!(
            slope = glycolytic_slope,
            score = vla_max_score,
            metabolic_type = metabolic_type.as_str(),
            fat_max_speed,
            "Metabolic profile"
        );

        MetabolicProfile {
            glycolytic_slope,
            vla_max_score,
            metabolic_type,
            fat_max_factor,
            fat_max_speed,
            fat_max_heart_rate,
        }
    }

    /// Normalize a raw slope into `[score_min, score_max]`
    ///
    /// Non-finite slopes map to the floor.
    pub fn score(&self, slope: f64) -> f64 {
        let raw = slope / self.params.slope_divisor;
        if raw.is_finite() {
            raw.clamp(self.params.score_min, self.params.score_max)
        } else {
            self.params.score_min
        }
    }

    pub fn tier_table(&self, discipline: Discipline) -> &TierTable {
        match discipline {
            Discipline::Run => &self.params.run_tiers,
            Discipline::Hybrid => &self.params.hybrid_tiers,
        }
    }

    /// Least-squares slope over stages at or above `LT2 - window`
    ///
    /// Falls back to the terminal slope when fewer than two stages qualify.
    pub fn regression_slope(&self, stages: &NormalizedStages, lt2_speed: f64) -> f64 {
        let cutoff = lt2_speed - self.params.regression_window_kmh;
        let (xs, ys): (Vec<f64>, Vec<f64>) = stages
            .as_slice()
            .iter()
            .filter(|s| s.speed >= cutoff)
            .map(|s| (s.speed, s.lactate))
            .unzip();

        if xs.len() < 2 {
            return terminal_slope(stages);
        }

        let mean_x = xs.iter().mean();
        let mean_y = ys.iter().mean();
        let (cov, var) = xs.iter().zip(&ys).fold((0.0, 0.0), |(cov, var), (&x, &y)| {
            (cov + (x - mean_x) * (y - mean_y), var + (x - mean_x) * (x - mean_x))
        });

        if var > 0.0 {
            cov / var
        } else {
            terminal_slope(stages)
        }
    }
}

/// Lactate slope between the last two stages; zero if undefined
pub fn terminal_slope(stages: &NormalizedStages) -> f64 {
    match stages.as_slice() {
        [.., prev, last] => {
            let dv = last.speed - prev.speed;
            if dv > 0.0 {
                (last.lactate - prev.lactate) / dv
            } else {
                0.0
            }
        }
        _ => 0.0,
    }
}

/// Bucket a score with a discipline table
pub fn classify(score: f64, table: &TierTable) -> MetabolicType {
    if score < table.diesel_max {
        MetabolicType::Diesel
    } else if score < table.allrounder_max {
        MetabolicType::Allrounder
    } else {
        MetabolicType::Sprinter
    }
}

pub fn fat_max_factor(metabolic_type: MetabolicType, table: &TierTable) -> f64 {
    match metabolic_type {
        MetabolicType::Diesel => table.diesel_fatmax_factor,
        MetabolicType::Allrounder => table.allrounder_fatmax_factor,
        MetabolicType::Sprinter => table.sprinter_fatmax_factor,
    }
}
