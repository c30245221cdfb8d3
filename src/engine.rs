//! Analysis engine
//!
//! [`LactateEngine`] runs the full pipeline on one test: normalize stages, fit
//! curves, locate thresholds, then profile, estimate, score and project. The
//! engine holds only its parameters, so one instance can serve any number of
//! concurrent analyses.

use crate::config::{ModelParameters, ParameterSet};
use crate::curve::{interpolate_linear, CurveFitter, CurveSamples};
use crate::error::{InputError, Result};
use crate::hybrid::{AcidBathInput, AcidBathResult, HybridAnalyzer, HybridThreshold};
use crate::metabolic::{self, MetabolicProfiler, MetabolicType};
use crate::models::{Discipline, NormalizedStages, TestInput};
use crate::race::{AthleteLevel, RaceProjection, RaceProjector};
use crate::resilience::{ResilienceScorer, ResilienceStatus};
use crate::threshold::{ThresholdLocator, ThresholdMethod, ThresholdResult};
use crate::vo2max::{Vo2MaxEstimator, Vo2MaxMethod};
use crate::zones::{BenchmarkMetric, BenchmarkRating, TrainingZone, ZoneAnchors, ZoneCalculator};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Flat result of a standard step-test analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricsRecord {
    #[serde(flatten)]
    pub thresholds: ThresholdResult,
    pub discipline: Discipline,
    pub vo2max: f64,
    pub vo2max_method: Vo2MaxMethod,
    pub frontal_area_m2: Option<f64>,
    pub glycolytic_slope: f64,
    pub vla_max_score: f64,
    pub metabolic_type: MetabolicType,
    pub fat_max_speed: f64,
    pub fat_max_heart_rate: f64,
    pub post_threshold_slope: f64,
    pub resilience_score: f64,
    pub is_stable: bool,
    pub resilience_status: ResilienceStatus,
    pub speed_tax: f64,
    pub race_projections: Vec<RaceProjection>,
    pub athlete_level: AthleteLevel,
    /// Level-model projections for the same distances
    pub level_projections: Vec<RaceProjection>,
    pub training_zones: Vec<TrainingZone>,
    pub benchmarks: Vec<BenchmarkRating>,
    /// Raw and fitted samples for renderers
    pub curve: CurveSamples,
}

/// Flat result of a three-stage hybrid analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridMetrics {
    #[serde(flatten)]
    pub threshold: HybridThreshold,
    pub threshold_heart_rate: f64,
    pub discipline: Discipline,
    pub vo2max: f64,
    pub vo2max_method: Vo2MaxMethod,
    pub glycolytic_slope: f64,
    pub vla_max_score: f64,
    pub metabolic_type: MetabolicType,
    pub fat_max_speed: f64,
    pub fat_max_heart_rate: f64,
    pub post_threshold_slope: f64,
    pub resilience_score: f64,
    pub is_stable: bool,
    pub resilience_status: ResilienceStatus,
    pub race_projections: Vec<RaceProjection>,
    pub athlete_level: AthleteLevel,
    pub level_projections: Vec<RaceProjection>,
}

/// Stateless lactate test engine
#[derive(Debug, Clone, Default)]
pub struct LactateEngine {
    params: ModelParameters,
}

impl LactateEngine {
    /// Create an engine after validating the parameters
    pub fn new(params: ModelParameters) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Engine with one of the named calibrations
    pub fn with_parameter_set(set: ParameterSet) -> Self {
        Self {
            params: set.parameters(),
        }
    }

    pub fn parameters(&self) -> &ModelParameters {
        &self.params
    }

    /// Normalize stages and enforce the minimum count of the standard protocol
    pub fn prepare(&self, input: &TestInput) -> Result<NormalizedStages> {
        input.validate_biometrics()?;
        let stages = NormalizedStages::normalize(&input.stages, self.params.limits.max_stages)?;
        if stages.len() < self.params.limits.min_run_stages {
            return Err(InputError::TooFewStages {
                protocol: "step_test".to_string(),
                required: self.params.limits.min_run_stages,
                actual: stages.len(),
            }
            .into());
        }
        Ok(stages)
    }

    /// Run the standard pipeline on one test
    #[instrument(skip(self, input), fields(stages = input.stages.len(), discipline = %input.discipline))]
    pub fn analyze(&self, input: &TestInput) -> Result<MetricsRecord> {
        let p = &self.params;
        let stages = self.prepare(input)?;

        let curve = CurveFitter::fit(&stages, &p.curve)?;
        let method = ThresholdMethod::for_effort(input.all_out_effort);
        let thresholds = ThresholdLocator::new(&p.threshold).locate(&curve, method)?;

        let profile = MetabolicProfiler::new(&p.metabolic).profile(&stages, &curve, &thresholds, input.discipline);

        let v_max = input.v_max.unwrap_or_else(|| stages.max_speed());
        let vo2 = Vo2MaxEstimator::new(&p.vo2max).estimate(
            v_max,
            input.body_weight_kg,
            input.height_cm,
            input.body_width_cm,
        );

        let resilience = ResilienceScorer::new(&p.resilience).assess(&curve, &thresholds);

        let projector = RaceProjector::new(&p.race);
        let race_projections = projector.project(
            thresholds.lt2_speed,
            profile.metabolic_type,
            resilience.resilience_score,
            input.discipline,
        );
        let level_projections = projector.project_for_level(thresholds.lt2_speed, input.athlete_level);

        let training_zones = ZoneCalculator::training_zones(&ZoneAnchors {
            fat_max_speed: profile.fat_max_speed,
            fat_max_heart_rate: profile.fat_max_heart_rate,
            lt1_speed: thresholds.lt1_speed,
            lt1_heart_rate: thresholds.lt1_heart_rate,
            lt2_speed: thresholds.lt2_speed,
            lt2_heart_rate: thresholds.lt2_heart_rate,
        });

        let benchmarks = [
            (BenchmarkMetric::Vo2Max, vo2.vo2max),
            (BenchmarkMetric::Lt2Speed, thresholds.lt2_speed),
            (BenchmarkMetric::FatMaxSpeed, profile.fat_max_speed),
            (BenchmarkMetric::SpeedTax, resilience.speed_tax),
            (BenchmarkMetric::Resilience, resilience.resilience_score),
        ]
        .into_iter()
        .map(|(metric, value)| BenchmarkRating::new(metric, value))
        .collect();

        info!(
            lt1 = thresholds.lt1_speed,
            lt2 = thresholds.lt2_speed,
            method = thresholds.method.as_str(),
            metabolic_type = profile.metabolic_type.as_str(),
            resilience = resilience.resilience_score,
            "Step test analyzed"
        );

        Ok(MetricsRecord {
            discipline: input.discipline,
            vo2max: vo2.vo2max,
            vo2max_method: vo2.method,
            frontal_area_m2: vo2.frontal_area_m2,
            glycolytic_slope: profile.glycolytic_slope,
            vla_max_score: profile.vla_max_score,
            metabolic_type: profile.metabolic_type,
            fat_max_speed: profile.fat_max_speed,
            fat_max_heart_rate: profile.fat_max_heart_rate,
            post_threshold_slope: resilience.post_threshold_slope,
            resilience_score: resilience.resilience_score,
            is_stable: resilience.is_stable,
            resilience_status: resilience.status,
            speed_tax: resilience.speed_tax,
            race_projections,
            athlete_level: input.athlete_level,
            level_projections,
            training_zones,
            benchmarks,
            curve: curve.samples(),
            thresholds,
        })
    }

    /// Run the three-stage parabola pipeline
    #[instrument(skip(self, input), fields(stages = input.stages.len()))]
    pub fn analyze_hybrid(&self, input: &TestInput) -> Result<HybridMetrics> {
        let p = &self.params;
        input.validate_biometrics()?;
        let stages = NormalizedStages::normalize(&input.stages, p.limits.max_stages)?;

        let analyzer = HybridAnalyzer::new(&p.hybrid, p.curve.grid_points);
        let points = analyzer.points(&stages)?;
        let threshold = analyzer.threshold(points)?;

        let speeds = stages.speeds();
        let heart_rates = stages.heart_rates();
        let threshold_heart_rate = interpolate_linear(&speeds, &heart_rates, threshold.threshold_speed);

        let profiler = MetabolicProfiler::new(&p.metabolic);
        let glycolytic_slope = metabolic::terminal_slope(&stages);
        let vla_max_score = profiler.score(glycolytic_slope);
        let table = profiler.tier_table(input.discipline);
        let metabolic_type = metabolic::classify(vla_max_score, table);
        let fat_max_speed = threshold.threshold_speed * metabolic::fat_max_factor(metabolic_type, table);
        let fat_max_heart_rate = interpolate_linear(&speeds, &heart_rates, fat_max_speed);

        let v_max = input.v_max.unwrap_or_else(|| stages.max_speed());
        let vo2 = Vo2MaxEstimator::new(&p.vo2max).estimate(
            v_max,
            input.body_weight_kg,
            input.height_cm,
            input.body_width_cm,
        );

        let scorer = ResilienceScorer::new(&p.resilience);
        let last = points[2];
        let post_threshold_slope = scorer.slope_between(
            (threshold.threshold_speed, threshold.parabola.evaluate(threshold.threshold_speed)),
            last,
        );
        let (resilience_score, is_stable, resilience_status) = scorer.assess_slope(post_threshold_slope);

        let projector = RaceProjector::new(&p.race);
        let race_projections = projector.project(
            threshold.threshold_speed,
            metabolic_type,
            resilience_score,
            input.discipline,
        );
        let level_projections = projector.project_for_level(threshold.threshold_speed, input.athlete_level);

        debug!(
            threshold = threshold.threshold_speed,
            fallback = threshold.fallback_applied,
            "Hybrid test analyzed"
        );

        Ok(HybridMetrics {
            threshold_heart_rate,
            discipline: input.discipline,
            vo2max: vo2.vo2max,
            vo2max_method: vo2.method,
            glycolytic_slope,
            vla_max_score,
            metabolic_type,
            fat_max_speed,
            fat_max_heart_rate,
            post_threshold_slope,
            resilience_score,
            is_stable,
            resilience_status,
            race_projections,
            athlete_level: input.athlete_level,
            level_projections,
            threshold,
        })
    }

    /// Acid-bath indices and adjusted pace
    pub fn analyze_acid_bath(&self, input: &AcidBathInput) -> Result<AcidBathResult> {
        let analyzer = HybridAnalyzer::new(&self.params.hybrid, self.params.curve.grid_points);
        Ok(analyzer.acid_bath(input)?)
    }

    /// Parabola threshold speed from bare speed and lactate arrays
    pub fn parabola_threshold(&self, speeds: &[f64], lactates: &[f64]) -> Result<HybridThreshold> {
        let analyzer = HybridAnalyzer::new(&self.params.hybrid, self.params.curve.grid_points);
        let points = analyzer.points_from_series(speeds, lactates)?;
        Ok(analyzer.threshold(points)?)
    }

    /// Analyze independent tests in parallel; order is preserved
    pub fn analyze_batch(&self, inputs: &[TestInput]) -> Vec<Result<MetricsRecord>> {
        inputs.par_iter().map(|input| self.analyze(input)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CurveError, LactrsError};
    use crate::models::StageSample;

    fn reference_input() -> TestInput {
        TestInput::from_series(
            &[8.0, 10.0, 12.0, 14.0, 16.0],
            &[1.2, 1.4, 1.8, 3.0, 5.5],
            &[120.0, 135.0, 150.0, 165.0, 180.0],
        )
        .unwrap()
    }

    #[test]
    fn test_analyze_reference_scenario() {
        let engine = LactateEngine::default();
        let record = engine.analyze(&reference_input()).unwrap();

        assert_eq!(record.thresholds.method, ThresholdMethod::Dmax);
        assert!(record.thresholds.lt2_speed > 12.0 && record.thresholds.lt2_speed < 16.0);
        assert!(record.thresholds.lt1_speed < record.thresholds.lt2_speed);
        assert!((record.vo2max - 56.0).abs() < 1e-9);
        assert_eq!(record.vo2max_method, Vo2MaxMethod::Simple);
        assert_eq!(record.is_stable, record.resilience_score > 60.0);
        assert_eq!(record.race_projections.len(), 4);
        assert_eq!(record.training_zones.len(), 5);
        assert_eq!(record.benchmarks.len(), 5);
        assert_eq!(record.curve.raw_speeds.len(), 5);
        assert_eq!(record.curve.fitted_speeds.len(), 100);
    }

    #[test]
    fn test_effort_flag_selects_method() {
        let engine = LactateEngine::default();
        let record = engine.analyze(&reference_input().with_all_out(false)).unwrap();
        assert_eq!(record.thresholds.method, ThresholdMethod::FixedOffset);
    }

    #[test]
    fn test_v_max_override_and_refined_vo2max() {
        let engine = LactateEngine::default();
        let input = reference_input()
            .with_v_max(Some(18.0))
            .with_biometrics(70.0, 190.0, 50.0);
        let record = engine.analyze(&input).unwrap();
        assert_eq!(record.vo2max_method, Vo2MaxMethod::Aerodynamic);
        assert!(record.vo2max > 3.2 * 18.0);
        assert!(record.frontal_area_m2.is_some());
    }

    #[test]
    fn test_level_projections_follow_athlete_level() {
        let engine = LactateEngine::default();
        let ambitious = engine.analyze(&reference_input()).unwrap();
        let elite = engine
            .analyze(&reference_input().with_athlete_level(AthleteLevel::Elite))
            .unwrap();

        assert_eq!(ambitious.athlete_level, AthleteLevel::Ambitious);
        assert_eq!(ambitious.level_projections.len(), ambitious.race_projections.len());
        assert!(ambitious.level_projections.iter().all(|p| p.exponent.is_none()));
        assert_eq!(elite.thresholds, ambitious.thresholds);
        assert!(elite.level_projections[0].time_s < ambitious.level_projections[0].time_s);
    }

    #[test]
    fn test_too_few_stages() {
        let engine = LactateEngine::default();
        let input = TestInput::from_series(&[8.0, 10.0, 12.0], &[1.0, 1.5, 3.0], &[120.0, 130.0, 140.0]).unwrap();
        let err = engine.analyze(&input).unwrap_err();
        assert!(matches!(
            err,
            LactrsError::Input(InputError::TooFewStages { required: 4, actual: 3, .. })
        ));
    }

    #[test]
    fn test_flat_curve_is_degenerate_for_dmax() {
        let engine = LactateEngine::default();
        let input = TestInput::from_series(
            &[8.0, 10.0, 12.0, 14.0],
            &[1.0, 1.0, 1.0, 1.0],
            &[120.0, 130.0, 140.0, 150.0],
        )
        .unwrap();
        assert!(matches!(
            engine.analyze(&input).unwrap_err(),
            LactrsError::Curve(CurveError::ZeroLengthChord)
        ));
    }

    #[test]
    fn test_hybrid_analysis() {
        let engine = LactateEngine::default();
        let input = TestInput::from_series(&[10.0, 12.0, 14.0], &[1.0, 2.0, 5.0], &[140.0, 155.0, 170.0]).unwrap();
        let metrics = engine.analyze_hybrid(&input).unwrap();

        assert!(metrics.threshold.threshold_speed > 10.0 && metrics.threshold.threshold_speed < 14.0);
        assert!(metrics.threshold_heart_rate > 155.0 && metrics.threshold_heart_rate < 170.0);
        assert_eq!(metrics.discipline, Discipline::Hybrid);
        // hybrid malus on the exponent
        let k = metrics.race_projections[0].exponent.unwrap();
        assert!(k > 1.07);
    }

    #[test]
    fn test_batch_matches_sequential() {
        let engine = LactateEngine::default();
        let inputs = vec![
            reference_input(),
            reference_input().with_all_out(false),
            TestInput::new(vec![StageSample::new(10.0, 1.0, 130.0)]),
        ];
        let batch = engine.analyze_batch(&inputs);
        assert_eq!(batch.len(), 3);
        for (input, result) in inputs.iter().zip(&batch) {
            match (engine.analyze(input), result) {
                (Ok(a), Ok(b)) => assert_eq!(&a, b),
                (Err(_), Err(_)) => {}
                _ => panic!("batch and sequential disagree"),
            }
        }
    }

    #[test]
    fn test_invalid_parameters_rejected() {
        let mut params = ModelParameters::default();
        params.resilience.k = 0.0;
        assert!(LactateEngine::new(params).is_err());
    }
}
