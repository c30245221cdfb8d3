//! Race time projection
//!
//! Extrapolates threshold pace to race distances with a Riegel power law,
//! `t(d) = t_ref × (d / d_ref)^k`. The reference is the distance covered at LT2
//! speed over the reference duration (one hour by default). The fatigue
//! exponent `k` comes from the metabolic tier, or continuously from the
//! resilience score, plus a malus for hybrid athletes.
//!
//! A second, level-based model uses a start offset, a speed factor on LT2 and
//! a drift term for distances beyond 10 km.

use crate::config::{ExponentMode, RaceParameters};
use crate::metabolic::MetabolicType;
use crate::models::Discipline;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Projected finish for one distance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceProjection {
    pub distance_m: f64,
    pub time_s: f64,
    pub pace_min_per_km: f64,
    /// Riegel exponent, absent for the level model
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exponent: Option<f64>,
}

/// Athlete level for the level-based projection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AthleteLevel {
    Elite,
    #[default]
    Ambitious,
    Amateur,
}

impl AthleteLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AthleteLevel::Elite => "elite",
            AthleteLevel::Ambitious => "ambitious",
            AthleteLevel::Amateur => "amateur",
        }
    }

    /// Distance in meters effectively gained at the start
    pub fn start_offset_m(&self) -> f64 {
        match self {
            AthleteLevel::Elite => 500.0,
            AthleteLevel::Ambitious => 350.0,
            AthleteLevel::Amateur => 150.0,
        }
    }

    /// Sustainable fraction of LT2 speed
    pub fn speed_factor(&self) -> f64 {
        match self {
            AthleteLevel::Elite => 1.02,
            AthleteLevel::Ambitious => 1.0,
            AthleteLevel::Amateur => 0.96,
        }
    }

    /// Speed decay per hour of racing
    pub fn drift(&self) -> f64 {
        match self {
            AthleteLevel::Elite => 0.02,
            AthleteLevel::Ambitious => 0.04,
            AthleteLevel::Amateur => 0.08,
        }
    }
}

impl std::fmt::Display for AthleteLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AthleteLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "elite" => Ok(AthleteLevel::Elite),
            "ambitious" => Ok(AthleteLevel::Ambitious),
            "amateur" => Ok(AthleteLevel::Amateur),
            _ => Err(format!("Invalid athlete level: {}", s)),
        }
    }
}

/// Race projector bound to one parameter set
pub struct RaceProjector<'a> {
    params: &'a RaceParameters,
}

impl<'a> RaceProjector<'a> {
    pub fn new(params: &'a RaceParameters) -> Self {
        Self { params }
    }

    /// Fatigue exponent for an athlete
    pub fn exponent(&self, metabolic_type: MetabolicType, resilience_score: f64, discipline: Discipline) -> f64 {
        let p = &self.params;
        let base = match p.exponent_mode {
            ExponentMode::Tier => match metabolic_type {
                MetabolicType::Diesel => p.diesel_exponent,
                MetabolicType::Allrounder => p.allrounder_exponent,
                MetabolicType::Sprinter => p.sprinter_exponent,
            },
            ExponentMode::Continuous => p.continuous_base - resilience_score.clamp(0.0, 100.0) / 1000.0,
        };

        match discipline {
            Discipline::Run => base,
            Discipline::Hybrid => base + p.hybrid_malus,
        }
    }

    /// Riegel time in seconds for `distance_m`; zero without a usable LT2
    pub fn riegel_time(&self, distance_m: f64, lt2_kmh: f64, exponent: f64) -> f64 {
        let reference_distance = lt2_kmh * 1000.0 * self.params.reference_duration_s / 3600.0;
        if reference_distance <= 0.0 || distance_m <= 0.0 {
            return 0.0;
        }
        self.params.reference_duration_s * (distance_m / reference_distance).powf(exponent)
    }

    /// Projections for the configured distances
    pub fn project(
        &self,
        lt2_kmh: f64,
        metabolic_type: MetabolicType,
        resilience_score: f64,
        discipline: Discipline,
    ) -> Vec<RaceProjection> {
        if !(lt2_kmh > 0.0) {
            return Vec::new();
        }

        let k = self.exponent(metabolic_type, resilience_score, discipline);
        self.params
            .distances_m
            .iter()
            .map(|&d| {
                let time_s = self.riegel_time(d, lt2_kmh, k);
                RaceProjection {
                    distance_m: d,
                    time_s,
                    pace_min_per_km: pace_min_per_km(d, time_s),
                    exponent: Some(k),
                }
            })
            .collect()
    }

    /// Level-model projections for the configured distances
    pub fn project_for_level(&self, lt2_kmh: f64, level: AthleteLevel) -> Vec<RaceProjection> {
        if !(lt2_kmh > 0.0) {
            return Vec::new();
        }

        self.params
            .distances_m
            .iter()
            .map(|&d| {
                let time_s = level_time(d, lt2_kmh, level);
                RaceProjection {
                    distance_m: d,
                    time_s,
                    pace_min_per_km: pace_min_per_km(d, time_s),
                    exponent: None,
                }
            })
            .collect()
    }
}

/// Finish time in seconds under the level model
pub fn level_time(distance_m: f64, lt2_kmh: f64, level: AthleteLevel) -> f64 {
    let v = lt2_kmh * level.speed_factor() / 3.6;
    if v <= 0.0 {
        return 0.0;
    }
    if distance_m <= 10_000.0 {
        (distance_m - level.start_offset_m()).max(0.0) / v
    } else {
        let decay = (1.0 - level.drift() * (distance_m / v / 3600.0 / 2.0)).max(0.05);
        distance_m / (v * decay)
    }
}

/// Pace in minutes per km; zero for empty distances
pub fn pace_min_per_km(distance_m: f64, time_s: f64) -> f64 {
    if distance_m <= 0.0 {
        0.0
    } else {
        time_s / 60.0 / (distance_m / 1000.0)
    }
}
