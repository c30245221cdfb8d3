//! Input data model for step tests
//!
//! A test is an ordered series of [`StageSample`]s plus biometric parameters.
//! Stages are validated and normalized exactly once, into
//! [`NormalizedStages`], before any numeric work happens.

use crate::error::InputError;
use crate::race::AthleteLevel;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// One workload stage of an incremental test
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StageSample {
    /// Running speed in km/h
    pub speed: f64,
    /// Blood lactate in mmol/L
    pub lactate: f64,
    /// Heart rate in bpm
    #[serde(alias = "hr", alias = "heartRate")]
    pub heart_rate: f64,
}

impl StageSample {
    pub fn new(speed: f64, lactate: f64, heart_rate: f64) -> Self {
        Self {
            speed,
            lactate,
            heart_rate,
        }
    }
}

/// Athlete discipline; selects tier tables and race malus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Discipline {
    /// Pure running
    Run,
    /// Mixed-modality (running plus stations)
    #[default]
    Hybrid,
}

impl Discipline {
    pub fn as_str(&self) -> &'static str {
        match self {
            Discipline::Run => "run",
            Discipline::Hybrid => "hybrid",
        }
    }
}

impl FromStr for Discipline {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "run" | "running" => Ok(Discipline::Run),
            "hybrid" | "hyrox" => Ok(Discipline::Hybrid),
            _ => Err(format!("Invalid discipline: {}", s)),
        }
    }
}

impl std::fmt::Display for Discipline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Complete input of one step-test analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestInput {
    pub stages: Vec<StageSample>,
    pub body_weight_kg: f64,
    pub height_cm: f64,
    /// Shoulder width, used as the body-width proxy
    pub body_width_cm: f64,
    /// Selects Dmax (true) or the fixed-offset method (false)
    pub all_out_effort: bool,
    pub discipline: Discipline,
    /// Peak speed reached; defaults to the fastest stage
    #[serde(default)]
    pub v_max: Option<f64>,
    /// Level used for the level-model race projections
    #[serde(default)]
    pub athlete_level: AthleteLevel,
}

impl TestInput {
    pub const DEFAULT_WEIGHT_KG: f64 = 75.0;
    pub const DEFAULT_HEIGHT_CM: f64 = 180.0;
    pub const DEFAULT_WIDTH_CM: f64 = 45.0;

    /// Input with boundary defaults for everything except the stages
    pub fn new(stages: Vec<StageSample>) -> Self {
        Self {
            stages,
            body_weight_kg: Self::DEFAULT_WEIGHT_KG,
            height_cm: Self::DEFAULT_HEIGHT_CM,
            body_width_cm: Self::DEFAULT_WIDTH_CM,
            all_out_effort: true,
            discipline: Discipline::default(),
            v_max: None,
            athlete_level: AthleteLevel::default(),
        }
    }

    /// Build from the parallel sequences used at the protocol boundary
    pub fn from_series(
        speeds: &[f64],
        lactates: &[f64],
        heart_rates: &[f64],
    ) -> Result<Self, InputError> {
        if speeds.len() != lactates.len() || speeds.len() != heart_rates.len() {
            return Err(InputError::MismatchedLengths {
                speeds: speeds.len(),
                lactates: lactates.len(),
                heart_rates: heart_rates.len(),
            });
        }

        let stages = speeds
            .iter()
            .zip(lactates)
            .zip(heart_rates)
            .map(|((&s, &l), &h)| StageSample::new(s, l, h))
            .collect();

        Ok(Self::new(stages))
    }

    pub fn with_biometrics(mut self, weight_kg: f64, height_cm: f64, width_cm: f64) -> Self {
        self.body_weight_kg = weight_kg;
        self.height_cm = height_cm;
        self.body_width_cm = width_cm;
        self
    }

    pub fn with_discipline(mut self, discipline: Discipline) -> Self {
        self.discipline = discipline;
        self
    }

    pub fn with_all_out(mut self, all_out_effort: bool) -> Self {
        self.all_out_effort = all_out_effort;
        self
    }

    pub fn with_v_max(mut self, v_max: Option<f64>) -> Self {
        self.v_max = v_max;
        self
    }

    pub fn with_athlete_level(mut self, level: AthleteLevel) -> Self {
        self.athlete_level = level;
        self
    }

    /// Check the biometric parameters
    pub fn validate_biometrics(&self) -> Result<(), InputError> {
        let checks = [
            ("weight_kg", self.body_weight_kg),
            ("height_cm", self.height_cm),
            ("shoulder_width_cm", self.body_width_cm),
        ];
        for (parameter, value) in checks {
            if !value.is_finite() || value <= 0.0 {
                return Err(InputError::InvalidParameter {
                    parameter: parameter.to_string(),
                    value,
                });
            }
        }
        if let Some(v_max) = self.v_max {
            if !v_max.is_finite() || v_max <= 0.0 {
                return Err(InputError::InvalidParameter {
                    parameter: "v_max".to_string(),
                    value: v_max,
                });
            }
        }
        Ok(())
    }
}

/// Stages sorted by strictly increasing speed, duplicates merged
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedStages {
    stages: Vec<StageSample>,
}

impl NormalizedStages {
    /// Validate, sort and de-duplicate raw stages
    ///
    /// Out-of-order stages are sorted rather than rejected. Stages sharing a
    /// speed collapse into one whose lactate and heart rate are the means.
    pub fn normalize(raw: &[StageSample], max_stages: usize) -> Result<Self, InputError> {
        if raw.len() > max_stages {
            return Err(InputError::TooManyStages {
                actual: raw.len(),
                limit: max_stages,
            });
        }

        for (i, stage) in raw.iter().enumerate() {
            let stage_no = i + 1;
            if !stage.speed.is_finite() || stage.speed <= 0.0 {
                return Err(invalid("speed", stage_no, stage.speed));
            }
            if !stage.lactate.is_finite() || stage.lactate < 0.0 {
                return Err(invalid("lactate", stage_no, stage.lactate));
            }
            if !stage.heart_rate.is_finite() || stage.heart_rate <= 0.0 {
                return Err(invalid("heart_rate", stage_no, stage.heart_rate));
            }
        }

        let mut sorted = raw.to_vec();
        sorted.sort_by(|a, b| a.speed.total_cmp(&b.speed));

        let mut stages: Vec<StageSample> = Vec::with_capacity(sorted.len());
        let mut run_len = 0usize;
        for stage in sorted {
            match stages.last_mut() {
                Some(last) if (last.speed - stage.speed).abs() < f64::EPSILON * last.speed.max(1.0) => {
                    // running mean over the duplicate run
                    run_len += 1;
                    let n = run_len as f64;
                    last.lactate += (stage.lactate - last.lactate) / n;
                    last.heart_rate += (stage.heart_rate - last.heart_rate) / n;
                }
                _ => {
                    stages.push(stage);
                    run_len = 1;
                }
            }
        }

        Ok(Self { stages })
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    pub fn as_slice(&self) -> &[StageSample] {
        &self.stages
    }

    pub fn speeds(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.speed).collect()
    }

    pub fn lactates(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.lactate).collect()
    }

    pub fn heart_rates(&self) -> Vec<f64> {
        self.stages.iter().map(|s| s.heart_rate).collect()
    }

    pub fn min_speed(&self) -> f64 {
        self.stages.first().map(|s| s.speed).unwrap_or(0.0)
    }

    pub fn max_speed(&self) -> f64 {
        self.stages.last().map(|s| s.speed).unwrap_or(0.0)
    }
}

fn invalid(field: &str, stage: usize, value: f64) -> InputError {
    InputError::InvalidValue {
        field: field.to_string(),
        stage,
        value,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stage(speed: f64, lactate: f64, hr: f64) -> StageSample {
        StageSample::new(speed, lactate, hr)
    }

    #[test]
    fn test_normalize_sorts_out_of_order_stages() {
        let raw = vec![
            stage(12.0, 1.8, 150.0),
            stage(8.0, 1.2, 120.0),
            stage(10.0, 1.4, 135.0),
        ];
        let normalized = NormalizedStages::normalize(&raw, 64).unwrap();
        assert_eq!(normalized.speeds(), vec![8.0, 10.0, 12.0]);
        assert_eq!(normalized.lactates(), vec![1.2, 1.4, 1.8]);
    }

    #[test]
    fn test_normalize_merges_duplicate_speeds() {
        let raw = vec![
            stage(10.0, 1.0, 130.0),
            stage(12.0, 2.0, 150.0),
            stage(10.0, 2.0, 140.0),
            stage(10.0, 3.0, 150.0),
        ];
        let normalized = NormalizedStages::normalize(&raw, 64).unwrap();
        assert_eq!(normalized.len(), 2);
        let first = normalized.as_slice()[0];
        assert!((first.lactate - 2.0).abs() < 1e-12);
        assert!((first.heart_rate - 140.0).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_rejects_invalid_values() {
        let raw = vec![stage(10.0, -0.1, 130.0)];
        let err = NormalizedStages::normalize(&raw, 64).unwrap_err();
        assert!(matches!(err, InputError::InvalidValue { ref field, stage: 1, .. } if field == "lactate"));

        let raw = vec![stage(f64::NAN, 1.0, 130.0)];
        assert!(NormalizedStages::normalize(&raw, 64).is_err());

        let raw = vec![stage(10.0, 1.0, 0.0)];
        assert!(NormalizedStages::normalize(&raw, 64).is_err());
    }

    #[test]
    fn test_normalize_enforces_stage_cap() {
        let raw: Vec<StageSample> = (0..10).map(|i| stage(8.0 + i as f64, 1.0, 120.0)).collect();
        let err = NormalizedStages::normalize(&raw, 5).unwrap_err();
        assert_eq!(err, InputError::TooManyStages { actual: 10, limit: 5 });
    }

    #[test]
    fn test_from_series_length_mismatch() {
        let err = TestInput::from_series(&[8.0, 10.0], &[1.0], &[120.0, 130.0]).unwrap_err();
        assert!(matches!(err, InputError::MismatchedLengths { speeds: 2, lactates: 1, .. }));
    }

    #[test]
    fn test_biometric_validation() {
        let input = TestInput::new(vec![]).with_biometrics(0.0, 180.0, 45.0);
        assert!(input.validate_biometrics().is_err());

        let input = TestInput::new(vec![]).with_v_max(Some(-1.0));
        assert!(input.validate_biometrics().is_err());

        assert!(TestInput::new(vec![]).validate_biometrics().is_ok());
    }

    #[test]
    fn test_discipline_parsing() {
        assert_eq!("run".parse::<Discipline>().unwrap(), Discipline::Run);
        assert_eq!("HYBRID".parse::<Discipline>().unwrap(), Discipline::Hybrid);
        assert!("swim".parse::<Discipline>().is_err());
        assert_eq!(Discipline::default(), Discipline::Hybrid);
    }

    #[test]
    fn test_stage_deserializes_heart_rate_aliases() {
        let stage: StageSample =
            serde_json::from_str(r#"{"speed": 10.0, "lactate": 1.5, "hr": 140}"#).unwrap();
        assert_eq!(stage.heart_rate, 140.0);
    }
}
