use lactrs::config::ModelParameters;
use lactrs::engine::LactateEngine;
use lactrs::hybrid::{AcidBathInput, HybridAnalyzer};
use lactrs::metabolic::MetabolicProfiler;
use lactrs::models::{Discipline, NormalizedStages, StageSample, TestInput};
use lactrs::race::RaceProjector;
use lactrs::resilience::ResilienceScorer;
use lactrs::LactrsError;
use proptest::prelude::*;

/// Increasing speeds with a noisy but rising lactate response
fn step_test() -> impl Strategy<Value = Vec<StageSample>> {
    (4usize..9, 6.0f64..10.0, 0.8f64..2.5, 0.5f64..2.0).prop_flat_map(|(n, start, step, base)| {
        prop::collection::vec((0.0f64..1.5, -0.2f64..0.2), n).prop_map(move |increments| {
            let mut lactate = base;
            increments
                .iter()
                .enumerate()
                .map(|(i, &(rise, noise))| {
                    lactate += rise * (1.0 + i as f64 * 0.3);
                    StageSample::new(
                        start + step * i as f64,
                        (lactate + noise).max(0.3),
                        110.0 + 9.0 * i as f64,
                    )
                })
                .collect()
        })
    })
}

proptest! {
    #[test]
    fn prop_normalized_speeds_strictly_increase(
        stages in prop::collection::vec((4.0f64..25.0, 0.3f64..15.0, 80.0f64..200.0), 1..20)
    ) {
        let raw: Vec<StageSample> = stages
            .iter()
            .map(|&(s, l, h)| StageSample::new((s * 2.0).round() / 2.0, l, h))
            .collect();
        let normalized = NormalizedStages::normalize(&raw, 64).unwrap();
        let speeds = normalized.speeds();
        prop_assert!(speeds.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn prop_thresholds_ordered_within_range(stages in step_test(), all_out in any::<bool>()) {
        let engine = LactateEngine::default();
        let max_speed = stages.last().unwrap().speed;
        let input = TestInput::new(stages)
            .with_discipline(Discipline::Run)
            .with_all_out(all_out);

        match engine.analyze(&input) {
            Ok(record) => {
                let t = &record.thresholds;
                prop_assert!(t.lt1_speed < t.lt2_speed, "lt1 {} lt2 {}", t.lt1_speed, t.lt2_speed);
                prop_assert!(t.lt2_speed < max_speed);

                let curve = &record.curve;
                prop_assert!(curve.fitted_lactates.iter().all(|&l| l >= 0.5));
                prop_assert!(curve.fitted_heart_rates.iter().all(|&h| (40.0..=250.0).contains(&h)));
                prop_assert_eq!(record.is_stable, record.resilience_score > 60.0);
            }
            // degenerate random curves are allowed to fail, never to panic
            Err(e) => prop_assert!(matches!(e, LactrsError::Curve(_)), "unexpected error {}", e),
        }
    }

    #[test]
    fn prop_resilience_non_increasing_in_slope(a in -5.0f64..20.0, b in -5.0f64..20.0) {
        let params = ModelParameters::default();
        let scorer = ResilienceScorer::new(&params.resilience);
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(scorer.score(lo) >= scorer.score(hi));

        let (score, stable, _) = scorer.assess_slope(hi);
        prop_assert_eq!(stable, score > 60.0);
    }

    #[test]
    fn prop_vla_max_score_clamped(slope in prop::num::f64::ANY) {
        let params = ModelParameters::default();
        let score = MetabolicProfiler::new(&params.metabolic).score(slope);
        prop_assert!((0.25..=1.0).contains(&score));
    }

    #[test]
    fn prop_race_time_increases_with_distance(
        lt2 in 6.0f64..22.0,
        k in 1.01f64..1.2,
        d1 in 1000.0f64..50000.0,
        d2 in 1000.0f64..50000.0,
    ) {
        prop_assume!((d1 - d2).abs() > 1.0);
        let params = ModelParameters::default();
        let projector = RaceProjector::new(&params.race);
        let (short, long) = if d1 < d2 { (d1, d2) } else { (d2, d1) };
        prop_assert!(projector.riegel_time(short, lt2, k) < projector.riegel_time(long, lt2, k));
    }

    #[test]
    fn prop_acid_bath_pace_never_exceeds_base(
        weight in 40.0f64..120.0,
        watts in 0.0f64..500.0,
        baseline in 0.5f64..3.0,
        peak in 0.0f64..20.0,
        recovery in 0.0f64..20.0,
        base in 0.5f64..7.0,
    ) {
        let params = ModelParameters::default();
        let analyzer = HybridAnalyzer::new(&params.hybrid, params.curve.grid_points);
        let result = analyzer
            .acid_bath(&AcidBathInput {
                weight_kg: weight,
                bike_watt_avg: watts,
                lactate_baseline: baseline,
                lactate_peak: peak,
                lactate_recovery: recovery,
                base_pace_mps: base,
            })
            .unwrap();
        prop_assert!(result.adjusted_pace_mps <= base);
        prop_assert!(result.adjusted_pace_mps >= 0.0);
    }

    #[test]
    fn prop_hybrid_threshold_within_tested_range(
        start in 6.0f64..12.0,
        step in 0.5f64..3.0,
        l0 in 0.5f64..3.0,
        r1 in -1.0f64..3.0,
        r2 in -1.0f64..6.0,
    ) {
        let params = ModelParameters::default();
        let analyzer = HybridAnalyzer::new(&params.hybrid, params.curve.grid_points);
        let speeds = [start, start + step, start + 2.0 * step];
        let lactates = [l0, (l0 + r1).max(0.0), (l0 + r2).max(0.0)];
        let points = analyzer.points_from_series(&speeds, &lactates).unwrap();
        let threshold = analyzer.threshold(points).unwrap();

        prop_assert!(threshold.threshold_speed >= speeds[0] && threshold.threshold_speed <= speeds[2]);
        if threshold.fallback_applied {
            prop_assert_eq!(threshold.threshold_speed, speeds[1]);
        } else {
            // lactate must be rising where it crosses the target
            prop_assert!(threshold.parabola.slope(threshold.threshold_speed) >= 0.0);
        }
    }
}
