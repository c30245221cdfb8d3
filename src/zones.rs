//! Training zones and benchmark ratings
//!
//! Five speed and heart-rate zones anchored on FatMax, LT1 and LT2, plus a
//! four-tier rating of the headline metrics against fixed population cutoffs.

use serde::{Deserialize, Serialize};

/// Named training zone
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ZoneName {
    Recovery,
    LongRun,
    Tempo,
    Threshold,
    Hit,
}

impl ZoneName {
    pub fn as_str(&self) -> &'static str {
        match self {
            ZoneName::Recovery => "Recovery",
            ZoneName::LongRun => "Long Run",
            ZoneName::Tempo => "Tempo",
            ZoneName::Threshold => "Threshold",
            ZoneName::Hit => "HIT",
        }
    }
}

/// One training zone; the top zone is open-ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingZone {
    pub name: ZoneName,
    /// km/h
    pub speed_min: f64,
    pub speed_max: Option<f64>,
    /// bpm
    pub heart_rate_min: f64,
    pub heart_rate_max: Option<f64>,
}

/// Zone anchors taken from a finished analysis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoneAnchors {
    pub fat_max_speed: f64,
    pub fat_max_heart_rate: f64,
    pub lt1_speed: f64,
    pub lt1_heart_rate: f64,
    pub lt2_speed: f64,
    pub lt2_heart_rate: f64,
}

/// Zone calculation utilities
pub struct ZoneCalculator;

impl ZoneCalculator {
    /// Calculate the five training zones
    ///
    /// Boundaries:
    /// - Recovery: below 90% FatMax, HR below FatMax HR - 10
    /// - Long Run: up to LT1
    /// - Tempo: up to 95% LT2
    /// - Threshold: 95-105% LT2, HR up to 103% LT2 HR
    /// - HIT: above 105% LT2
    ///
    /// Boundaries never decrease; a boundary below its predecessor is lifted
    /// to it, which collapses the zone to zero width.
    pub fn training_zones(anchors: &ZoneAnchors) -> Vec<TrainingZone> {
        let speeds = Self::monotone([
            anchors.fat_max_speed * 0.9,
            anchors.lt1_speed,
            anchors.lt2_speed * 0.95,
            anchors.lt2_speed * 1.05,
        ]);
        let heart_rates = Self::monotone([
            anchors.fat_max_heart_rate - 10.0,
            anchors.lt1_heart_rate,
            anchors.lt2_heart_rate * 0.95,
            anchors.lt2_heart_rate * 1.03,
        ]);

        let names = [
            ZoneName::Recovery,
            ZoneName::LongRun,
            ZoneName::Tempo,
            ZoneName::Threshold,
            ZoneName::Hit,
        ];

        names
            .iter()
            .enumerate()
            .map(|(i, &name)| TrainingZone {
                name,
                speed_min: if i == 0 { 0.0 } else { speeds[i - 1] },
                speed_max: speeds.get(i).copied(),
                heart_rate_min: if i == 0 { 0.0 } else { heart_rates[i - 1] },
                heart_rate_max: heart_rates.get(i).copied(),
            })
            .collect()
    }

    fn monotone(mut bounds: [f64; 4]) -> [f64; 4] {
        let mut floor = 0.0_f64;
        for b in bounds.iter_mut() {
            *b = if b.is_finite() { b.max(floor) } else { floor };
            floor = *b;
        }
        bounds
    }
}

/// Benchmark tier, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BenchmarkTier {
    Elite,
    Athlete,
    Amateur,
    Rookie,
}

impl BenchmarkTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            BenchmarkTier::Elite => "Elite",
            BenchmarkTier::Athlete => "Athlete",
            BenchmarkTier::Amateur => "Amateur",
            BenchmarkTier::Rookie => "Rookie",
        }
    }
}

/// Rated headline metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkMetric {
    Vo2Max,
    Lt2Speed,
    FatMaxSpeed,
    /// Lower is better
    SpeedTax,
    Resilience,
}

impl BenchmarkMetric {
    pub const ALL: [BenchmarkMetric; 5] = [
        BenchmarkMetric::Vo2Max,
        BenchmarkMetric::Lt2Speed,
        BenchmarkMetric::FatMaxSpeed,
        BenchmarkMetric::SpeedTax,
        BenchmarkMetric::Resilience,
    ];

    /// Elite, Athlete and Amateur cutoffs
    pub fn cutoffs(&self) -> [f64; 3] {
        match self {
            BenchmarkMetric::Vo2Max => [65.0, 55.0, 45.0],
            BenchmarkMetric::Lt2Speed => [17.5, 15.0, 12.0],
            BenchmarkMetric::FatMaxSpeed => [15.0, 12.5, 10.0],
            BenchmarkMetric::SpeedTax => [0.30, 0.55, 0.85],
            BenchmarkMetric::Resilience => [75.0, 60.0, 40.0],
        }
    }

    pub fn higher_is_better(&self) -> bool {
        !matches!(self, BenchmarkMetric::SpeedTax)
    }

    /// Tier of a value
    pub fn rate(&self, value: f64) -> BenchmarkTier {
        let tiers = [BenchmarkTier::Elite, BenchmarkTier::Athlete, BenchmarkTier::Amateur];
        let cutoffs = self.cutoffs();
        let higher = self.higher_is_better();

        tiers
            .iter()
            .zip(cutoffs)
            .find(|&(_, cutoff)| if higher { value >= cutoff } else { value < cutoff })
            .map(|(&tier, _)| tier)
            .unwrap_or(BenchmarkTier::Rookie)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkRating {
    pub metric: BenchmarkMetric,
    pub value: f64,
    pub tier: BenchmarkTier,
}

impl BenchmarkRating {
    pub fn new(metric: BenchmarkMetric, value: f64) -> Self {
        Self {
            metric,
            value,
            tier: metric.rate(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchors() -> ZoneAnchors {
        ZoneAnchors {
            fat_max_speed: 12.0,
            fat_max_heart_rate: 150.0,
            lt1_speed: 12.5,
            lt1_heart_rate: 152.0,
            lt2_speed: 14.0,
            lt2_heart_rate: 170.0,
        }
    }

    #[test]
    fn test_zone_boundaries() {
        let zones = ZoneCalculator::training_zones(&anchors());
        assert_eq!(zones.len(), 5);
        assert_eq!(zones[0].name, ZoneName::Recovery);
        assert!((zones[0].speed_max.unwrap() - 10.8).abs() < 1e-12);
        assert_eq!(zones[1].speed_max, Some(12.5));
        assert!((zones[2].speed_max.unwrap() - 13.3).abs() < 1e-12);
        assert!((zones[3].speed_max.unwrap() - 14.7).abs() < 1e-12);
        assert_eq!(zones[4].speed_max, None);
        assert_eq!(zones[0].heart_rate_max, Some(140.0));
        assert!((zones[3].heart_rate_max.unwrap() - 175.1).abs() < 1e-9);
    }

    #[test]
    fn test_zones_are_contiguous_and_monotone() {
        // LT1 below 90% FatMax would invert the long-run zone
        let inverted = ZoneAnchors {
            lt1_speed: 10.0,
            ..anchors()
        };
        let zones = ZoneCalculator::training_zones(&inverted);
        for pair in zones.windows(2) {
            assert_eq!(pair[0].speed_max, Some(pair[1].speed_min));
            assert!(pair[1].speed_min >= pair[0].speed_min);
        }
        assert_eq!(zones[1].speed_min, zones[1].speed_max.unwrap());
    }

    #[test]
    fn test_benchmark_tiers() {
        assert_eq!(BenchmarkMetric::Vo2Max.rate(66.0), BenchmarkTier::Elite);
        assert_eq!(BenchmarkMetric::Vo2Max.rate(65.0), BenchmarkTier::Elite);
        assert_eq!(BenchmarkMetric::Vo2Max.rate(50.0), BenchmarkTier::Amateur);
        assert_eq!(BenchmarkMetric::Lt2Speed.rate(11.9), BenchmarkTier::Rookie);
        assert_eq!(BenchmarkMetric::FatMaxSpeed.rate(12.5), BenchmarkTier::Athlete);
        assert_eq!(BenchmarkMetric::Resilience.rate(100.0), BenchmarkTier::Elite);
    }

    #[test]
    fn test_speed_tax_lower_is_better() {
        assert_eq!(BenchmarkMetric::SpeedTax.rate(0.1), BenchmarkTier::Elite);
        assert_eq!(BenchmarkMetric::SpeedTax.rate(0.30), BenchmarkTier::Athlete);
        assert_eq!(BenchmarkMetric::SpeedTax.rate(0.7), BenchmarkTier::Amateur);
        assert_eq!(BenchmarkMetric::SpeedTax.rate(2.0), BenchmarkTier::Rookie);
        assert!(BenchmarkTier::Elite < BenchmarkTier::Rookie);
    }
}
