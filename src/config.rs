//! Model parameter configuration
//!
//! Every tunable constant of the pipeline lives here as a named field: slope
//! divisors, tier cutoffs, the resilience hardness factor, the Riegel exponent
//! table and so on. [`ModelParameters::default`] is the canonical set; the
//! alternates in [`ParameterSet`] reproduce earlier calibrations for regression
//! testing. Parameters load from TOML with per-section defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Complete parameter set consumed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelParameters {
    #[serde(default)]
    pub curve: CurveParameters,

    #[serde(default)]
    pub threshold: ThresholdParameters,

    #[serde(default)]
    pub metabolic: MetabolicParameters,

    #[serde(default)]
    pub vo2max: Vo2MaxParameters,

    #[serde(default)]
    pub resilience: ResilienceParameters,

    #[serde(default)]
    pub race: RaceParameters,

    #[serde(default)]
    pub hybrid: HybridParameters,

    #[serde(default)]
    pub limits: InputLimits,
}

/// Curve construction strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Least-squares polynomial, tolerant of measurement noise
    Smoothing,
    /// Exact monotone cubic Hermite interpolant
    MonotoneCubic,
}

/// Curve fitter settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurveParameters {
    pub fit_mode: FitMode,
    /// Polynomial degree of the lactate regression
    pub lactate_degree: usize,
    /// Polynomial degree of the heart-rate regression
    pub heart_rate_degree: usize,
    /// Sample count of the search grid
    pub grid_points: usize,
    /// Sample count of the monotone-cubic rendering grid
    pub monotone_grid_points: usize,
    /// Lower clip for fitted lactate (mmol/L)
    pub min_lactate: f64,
    /// Heart-rate clip range (bpm)
    pub min_heart_rate: f64,
    pub max_heart_rate: f64,
}

impl Default for CurveParameters {
    fn default() -> Self {
        Self {
            fit_mode: FitMode::Smoothing,
            lactate_degree: 3,
            heart_rate_degree: 2,
            grid_points: 100,
            monotone_grid_points: 500,
            min_lactate: 0.5,
            min_heart_rate: 40.0,
            max_heart_rate: 250.0,
        }
    }
}

/// Threshold locator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdParameters {
    /// LT1 rise above baseline (mmol/L)
    pub lt1_offset: f64,
    /// LT2 rise above baseline (mmol/L)
    pub lt2_offset: f64,
    /// Minimum LT2 - LT1 gap before the fixed-offset fallback kicks in (km/h)
    pub min_separation_kmh: f64,
    pub root_tolerance: f64,
    pub max_bisection_iterations: usize,
}

impl Default for ThresholdParameters {
    fn default() -> Self {
        Self {
            lt1_offset: 0.5,
            lt2_offset: 1.5,
            min_separation_kmh: 0.5,
            root_tolerance: 1e-6,
            max_bisection_iterations: 60,
        }
    }
}

/// Glycolytic slope estimation mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlopeMode {
    /// Last two stages only
    Terminal,
    /// Least-squares slope over stages near and above LT2
    Regression,
}

/// Tier boundaries and FatMax offsets for one discipline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierTable {
    /// Scores below this are Diesel
    pub diesel_max: f64,
    /// Scores below this (and at or above `diesel_max`) are Allrounder
    pub allrounder_max: f64,
    pub diesel_fatmax_factor: f64,
    pub allrounder_fatmax_factor: f64,
    pub sprinter_fatmax_factor: f64,
}

impl TierTable {
    pub fn run() -> Self {
        Self {
            diesel_max: 0.45,
            allrounder_max: 0.70,
            diesel_fatmax_factor: 0.90,
            allrounder_fatmax_factor: 0.86,
            sprinter_fatmax_factor: 0.80,
        }
    }

    pub fn hybrid() -> Self {
        Self {
            diesel_max: 0.40,
            allrounder_max: 0.65,
            diesel_fatmax_factor: 0.96,
            allrounder_fatmax_factor: 0.90,
            sprinter_fatmax_factor: 0.84,
        }
    }
}

/// Metabolic profiler settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetabolicParameters {
    pub slope_mode: SlopeMode,
    /// Raw slope is divided by this before clamping
    pub slope_divisor: f64,
    pub score_min: f64,
    pub score_max: f64,
    /// Regression includes stages at or above `LT2 - window` (km/h)
    pub regression_window_kmh: f64,
    pub run_tiers: TierTable,
    pub hybrid_tiers: TierTable,
}

impl Default for MetabolicParameters {
    fn default() -> Self {
        Self {
            slope_mode: SlopeMode::Terminal,
            slope_divisor: 4.0,
            score_min: 0.25,
            score_max: 1.0,
            regression_window_kmh: 0.5,
            run_tiers: TierTable::run(),
            hybrid_tiers: TierTable::hybrid(),
        }
    }
}

/// Aerobic capacity estimator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Vo2MaxParameters {
    /// ml/kg/min per km/h in the simple estimate
    pub simple_coefficient: f64,
    /// ml/kg/min per km/h before the drag term in the refined estimate
    pub base_coefficient: f64,
    /// kg/m^3
    pub air_density: f64,
    pub drag_coefficient: f64,
    /// Frontal area = shape factor x height x width
    pub frontal_shape_factor: f64,
    pub mechanical_efficiency: f64,
    /// Energy equivalent of one ml of oxygen
    pub joules_per_ml_o2: f64,
    pub reference_weight_kg: f64,
    /// Fractional correction per kg away from the reference weight
    pub weight_correction_per_kg: f64,
    pub default_height_cm: f64,
    pub default_width_cm: f64,
}

impl Default for Vo2MaxParameters {
    fn default() -> Self {
        Self {
            simple_coefficient: 3.5,
            base_coefficient: 3.2,
            air_density: 1.225,
            drag_coefficient: 0.9,
            frontal_shape_factor: 0.6,
            mechanical_efficiency: 0.25,
            joules_per_ml_o2: 20.9,
            reference_weight_kg: 70.0,
            weight_correction_per_kg: 0.005,
            default_height_cm: 180.0,
            default_width_cm: 45.0,
        }
    }
}

/// Resilience scorer settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResilienceParameters {
    /// Hardness factor in `100 / (1 + k * slope)`
    pub k: f64,
    /// Slope used when the test ended at or before LT2
    pub penalty_slope: f64,
    pub min_speed_delta_kmh: f64,
    /// Scores strictly above this are stable
    pub stability_cutoff: f64,
    /// Speed tax is zero when LT2 - LT1 is at most this (km/h)
    pub min_speed_tax_span_kmh: f64,
    pub ultra_stable_slope: f64,
    pub resilient_slope: f64,
    pub limit_slope: f64,
}

impl Default for ResilienceParameters {
    fn default() -> Self {
        Self {
            k: 1.5,
            penalty_slope: 3.0,
            min_speed_delta_kmh: 0.1,
            stability_cutoff: 60.0,
            min_speed_tax_span_kmh: 0.5,
            ultra_stable_slope: 0.45,
            resilient_slope: 0.75,
            limit_slope: 1.1,
        }
    }
}

/// How the Riegel exponent is chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExponentMode {
    /// Looked up from the metabolic tier
    Tier,
    /// `continuous_base - resilience / 1000`
    Continuous,
}

/// Race projector settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceParameters {
    pub exponent_mode: ExponentMode,
    pub diesel_exponent: f64,
    pub allrounder_exponent: f64,
    pub sprinter_exponent: f64,
    pub continuous_base: f64,
    /// Added to the exponent for hybrid-discipline athletes
    pub hybrid_malus: f64,
    /// Duration LT2 pace is assumed sustainable for (seconds)
    pub reference_duration_s: f64,
    /// Target distances in meters
    pub distances_m: Vec<f64>,
}

impl Default for RaceParameters {
    fn default() -> Self {
        Self {
            exponent_mode: ExponentMode::Tier,
            diesel_exponent: 1.06,
            allrounder_exponent: 1.08,
            sprinter_exponent: 1.10,
            continuous_base: 1.15,
            hybrid_malus: 0.02,
            reference_duration_s: 3600.0,
            distances_m: vec![5000.0, 10000.0, 21097.5, 42195.0],
        }
    }
}

/// Hybrid and acid-bath settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HybridParameters {
    pub stage_count: usize,
    /// Rise above baseline that defines the threshold (mmol/L)
    pub threshold_offset: f64,
    /// Exponent of body weight in the power index
    pub allometric_exponent: f64,
    pub glyco_weight: f64,
    pub flush_weight: f64,
    /// Leading coefficients below this are treated as linear
    pub linear_epsilon: f64,
}

impl Default for HybridParameters {
    fn default() -> Self {
        Self {
            stage_count: 3,
            threshold_offset: 1.5,
            allometric_exponent: 0.67,
            glyco_weight: 0.12,
            flush_weight: 0.004,
            linear_epsilon: 1e-9,
        }
    }
}

/// Stage-count limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputLimits {
    pub min_run_stages: usize,
    pub max_stages: usize,
}

impl Default for InputLimits {
    fn default() -> Self {
        Self {
            min_run_stages: 4,
            max_stages: 64,
        }
    }
}

/// Named calibrations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterSet {
    /// Current calibration
    Canonical,
    /// Stability cutoff 70, slope divisor 2.5
    LegacyStrict,
    /// Slope divisor 4.5, score floor 0.2, continuous Riegel exponent
    Conservative,
}

impl ParameterSet {
    pub fn parameters(&self) -> ModelParameters {
        let mut params = ModelParameters::default();
        match self {
            ParameterSet::Canonical => {}
            ParameterSet::LegacyStrict => {
                params.resilience.stability_cutoff = 70.0;
                params.metabolic.slope_divisor = 2.5;
            }
            ParameterSet::Conservative => {
                params.metabolic.slope_divisor = 4.5;
                params.metabolic.score_min = 0.2;
                params.race.exponent_mode = ExponentMode::Continuous;
            }
        }
        params
    }

    pub fn name(&self) -> &'static str {
        match self {
            ParameterSet::Canonical => "canonical",
            ParameterSet::LegacyStrict => "legacy_strict",
            ParameterSet::Conservative => "conservative",
        }
    }
}

impl FromStr for ParameterSet {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "canonical" => Ok(ParameterSet::Canonical),
            "legacy_strict" | "legacy" => Ok(ParameterSet::LegacyStrict),
            "conservative" => Ok(ParameterSet::Conservative),
            other => Err(ConfigError::InvalidParameter {
                name: "parameter_set".to_string(),
                reason: format!(
                    "unknown set '{}'. Must be one of: canonical, legacy_strict, conservative",
                    other
                ),
            }),
        }
    }
}

impl ModelParameters {
    /// Every scalar float parameter with its dotted name
    fn float_fields(&self) -> Vec<(&'static str, f64)> {
        let (c, t, m, v, r, race, h) = (
            &self.curve,
            &self.threshold,
            &self.metabolic,
            &self.vo2max,
            &self.resilience,
            &self.race,
            &self.hybrid,
        );
        let mut fields = vec![
            ("curve.min_lactate", c.min_lactate),
            ("curve.min_heart_rate", c.min_heart_rate),
            ("curve.max_heart_rate", c.max_heart_rate),
            ("threshold.lt1_offset", t.lt1_offset),
            ("threshold.lt2_offset", t.lt2_offset),
            ("threshold.min_separation_kmh", t.min_separation_kmh),
            ("threshold.root_tolerance", t.root_tolerance),
            ("metabolic.slope_divisor", m.slope_divisor),
            ("metabolic.score_min", m.score_min),
            ("metabolic.score_max", m.score_max),
            ("metabolic.regression_window_kmh", m.regression_window_kmh),
            ("vo2max.simple_coefficient", v.simple_coefficient),
            ("vo2max.base_coefficient", v.base_coefficient),
            ("vo2max.air_density", v.air_density),
            ("vo2max.drag_coefficient", v.drag_coefficient),
            ("vo2max.frontal_shape_factor", v.frontal_shape_factor),
            ("vo2max.mechanical_efficiency", v.mechanical_efficiency),
            ("vo2max.joules_per_ml_o2", v.joules_per_ml_o2),
            ("vo2max.reference_weight_kg", v.reference_weight_kg),
            ("vo2max.weight_correction_per_kg", v.weight_correction_per_kg),
            ("vo2max.default_height_cm", v.default_height_cm),
            ("vo2max.default_width_cm", v.default_width_cm),
            ("resilience.k", r.k),
            ("resilience.penalty_slope", r.penalty_slope),
            ("resilience.min_speed_delta_kmh", r.min_speed_delta_kmh),
            ("resilience.stability_cutoff", r.stability_cutoff),
            ("resilience.min_speed_tax_span_kmh", r.min_speed_tax_span_kmh),
            ("resilience.ultra_stable_slope", r.ultra_stable_slope),
            ("resilience.resilient_slope", r.resilient_slope),
            ("resilience.limit_slope", r.limit_slope),
            ("race.diesel_exponent", race.diesel_exponent),
            ("race.allrounder_exponent", race.allrounder_exponent),
            ("race.sprinter_exponent", race.sprinter_exponent),
            ("race.continuous_base", race.continuous_base),
            ("race.hybrid_malus", race.hybrid_malus),
            ("race.reference_duration_s", race.reference_duration_s),
            ("hybrid.threshold_offset", h.threshold_offset),
            ("hybrid.allometric_exponent", h.allometric_exponent),
            ("hybrid.glyco_weight", h.glyco_weight),
            ("hybrid.flush_weight", h.flush_weight),
            ("hybrid.linear_epsilon", h.linear_epsilon),
        ];
        for (name, table) in [
            ("metabolic.run_tiers", &m.run_tiers),
            ("metabolic.hybrid_tiers", &m.hybrid_tiers),
        ] {
            fields.extend([
                (name, table.diesel_max),
                (name, table.allrounder_max),
                (name, table.diesel_fatmax_factor),
                (name, table.allrounder_fatmax_factor),
                (name, table.sprinter_fatmax_factor),
            ]);
        }
        fields.extend(race.distances_m.iter().map(|&d| ("race.distances_m", d)));
        fields
    }

    /// Reject parameter combinations the pipeline cannot work with
    ///
    /// Non-finite values are rejected first, so the range checks below only
    /// ever see real numbers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |name: &str, reason: &str| {
            Err(ConfigError::InvalidParameter {
                name: name.to_string(),
                reason: reason.to_string(),
            })
        };

        if let Some((name, _)) = self.float_fields().into_iter().find(|(_, v)| !v.is_finite()) {
            return invalid(name, "must be a finite number");
        }

        if self.curve.grid_points < 3 || self.curve.monotone_grid_points < 3 {
            return invalid("curve.grid_points", "grids need at least 3 points");
        }
        if self.curve.min_heart_rate >= self.curve.max_heart_rate {
            return invalid("curve.min_heart_rate", "must be below max_heart_rate");
        }
        if self.threshold.lt1_offset <= 0.0 || self.threshold.lt2_offset <= self.threshold.lt1_offset {
            return invalid("threshold.lt2_offset", "offsets must satisfy 0 < lt1 < lt2");
        }
        if self.threshold.root_tolerance <= 0.0 {
            return invalid("threshold.root_tolerance", "must be positive");
        }
        if self.metabolic.slope_divisor <= 0.0 {
            return invalid("metabolic.slope_divisor", "must be positive");
        }
        if self.metabolic.score_min >= self.metabolic.score_max {
            return invalid("metabolic.score_min", "must be below score_max");
        }
        for (name, table) in [
            ("metabolic.run_tiers", &self.metabolic.run_tiers),
            ("metabolic.hybrid_tiers", &self.metabolic.hybrid_tiers),
        ] {
            if table.diesel_max >= table.allrounder_max {
                return invalid(name, "diesel_max must be below allrounder_max");
            }
            let factors = [
                table.diesel_fatmax_factor,
                table.allrounder_fatmax_factor,
                table.sprinter_fatmax_factor,
            ];
            if factors.iter().any(|f| *f <= 0.0 || *f > 1.0) {
                return invalid(name, "FatMax factors must lie in (0, 1]");
            }
        }
        if self.vo2max.mechanical_efficiency <= 0.0 || self.vo2max.joules_per_ml_o2 <= 0.0 {
            return invalid("vo2max.mechanical_efficiency", "must be positive");
        }
        if self.resilience.k <= 0.0 {
            return invalid("resilience.k", "must be positive");
        }
        if self.race.reference_duration_s <= 0.0 {
            return invalid("race.reference_duration_s", "must be positive");
        }
        if self.race.distances_m.iter().any(|d| *d <= 0.0) {
            return invalid("race.distances_m", "distances must be positive");
        }
        if self.hybrid.stage_count != 3 {
            return invalid("hybrid.stage_count", "the parabola fit needs exactly 3 stages");
        }
        if self.limits.min_run_stages < 3 || self.limits.max_stages < self.limits.min_run_stages {
            return invalid("limits", "need 3 <= min_run_stages <= max_stages");
        }
        Ok(())
    }
}

/// Loader for TOML parameter files
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load parameters from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<ModelParameters, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        Self::load_from_string(&content)
    }

    /// Load parameters from a TOML string; missing sections take defaults
    pub fn load_from_string(content: &str) -> Result<ModelParameters, ConfigError> {
        let params: ModelParameters =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    /// Export parameters to a TOML string
    pub fn export_to_string(params: &ModelParameters) -> Result<String, ConfigError> {
        toml::to_string_pretty(params).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Export parameters to a TOML file
    pub fn export_to_file<P: AsRef<Path>>(params: &ModelParameters, path: P) -> Result<(), ConfigError> {
        let content = Self::export_to_string(params)?;
        fs::write(&path, content).map_err(|e| ConfigError::Read {
            path: path.as_ref().to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Load from `path` if it exists, otherwise the canonical set
    pub fn load_with_defaults<P: AsRef<Path>>(path: P) -> Result<ModelParameters, ConfigError> {
        if path.as_ref().exists() {
            Self::load_from_file(path)
        } else {
            Ok(ModelParameters::default())
        }
    }

    /// Commented TOML template of a named calibration
    pub fn preset_template(set: ParameterSet) -> Result<String, ConfigError> {
        let body = Self::export_to_string(&set.parameters())?;
        Ok(format!(
            "# lactrs model parameters ({})\n# Omitted keys fall back to the canonical values.\n\n{}",
            set.name(),
            body
        ))
    }

    /// Default parameter file location
    pub fn default_config_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".lactrs")
            .join("model.toml")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_canonical_defaults() {
        let params = ModelParameters::default();
        assert_eq!(params.resilience.k, 1.5);
        assert_eq!(params.resilience.stability_cutoff, 60.0);
        assert_eq!(params.metabolic.slope_divisor, 4.0);
        assert_eq!(params.curve.grid_points, 100);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_parameter_sets_differ() {
        let legacy = ParameterSet::LegacyStrict.parameters();
        assert_eq!(legacy.resilience.stability_cutoff, 70.0);
        assert_eq!(legacy.metabolic.slope_divisor, 2.5);

        let conservative = ParameterSet::Conservative.parameters();
        assert_eq!(conservative.metabolic.slope_divisor, 4.5);
        assert_eq!(conservative.metabolic.score_min, 0.2);
        assert_eq!(conservative.race.exponent_mode, ExponentMode::Continuous);

        assert_eq!(ParameterSet::Canonical.parameters(), ModelParameters::default());
    }

    #[test]
    fn test_parameter_set_parsing() {
        assert_eq!("canonical".parse::<ParameterSet>().unwrap(), ParameterSet::Canonical);
        assert_eq!("legacy-strict".parse::<ParameterSet>().unwrap(), ParameterSet::LegacyStrict);
        assert!("nonsense".parse::<ParameterSet>().is_err());
    }

    #[test]
    fn test_load_partial_config() {
        let toml_str = r#"
[resilience]
stability_cutoff = 70.0

[metabolic]
slope_divisor = 2.5
slope_mode = "regression"
"#;
        let params = ConfigLoader::load_from_string(toml_str).unwrap();
        assert_eq!(params.resilience.stability_cutoff, 70.0);
        assert_eq!(params.resilience.k, 1.5);
        assert_eq!(params.metabolic.slope_mode, SlopeMode::Regression);
        assert_eq!(params.metabolic.run_tiers, TierTable::run());
        assert_eq!(params.curve, CurveParameters::default());
    }

    #[test]
    fn test_load_invalid_toml() {
        let result = ConfigLoader::load_from_string("[resilience\nk = 1.5");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let result = ConfigLoader::load_from_string("[metabolic]\nslope_divisor = 0.0\n");
        assert!(matches!(result, Err(ConfigError::InvalidParameter { .. })));

        let mut params = ModelParameters::default();
        params.threshold.lt2_offset = 0.2;
        assert!(params.validate().is_err());

        let mut params = ModelParameters::default();
        params.metabolic.run_tiers.sprinter_fatmax_factor = 1.2;
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_validation_rejects_non_finite_values() {
        match ConfigLoader::load_from_string("[resilience]\nk = nan\n") {
            Err(ConfigError::InvalidParameter { name, .. }) => assert_eq!(name, "resilience.k"),
            other => panic!("expected invalid parameter, got {:?}", other),
        }

        let mut params = ModelParameters::default();
        params.race.distances_m.push(f64::INFINITY);
        assert!(params.validate().is_err());

        let mut params = ModelParameters::default();
        params.metabolic.hybrid_tiers.diesel_max = f64::NAN;
        assert!(params.validate().is_err());

        assert!(ModelParameters::default().validate().is_ok());
    }

    #[test]
    fn test_export_and_reload() {
        let original = ParameterSet::Conservative.parameters();
        let toml_str = ConfigLoader::export_to_string(&original).unwrap();
        assert!(toml_str.contains("[resilience]"));

        let reloaded = ConfigLoader::load_from_string(&toml_str).unwrap();
        assert_eq!(original, reloaded);
    }

    #[test]
    fn test_preset_template_loads_back() {
        let template = ConfigLoader::preset_template(ParameterSet::LegacyStrict).unwrap();
        assert!(template.starts_with("# lactrs model parameters (legacy_strict)"));
        let params = ConfigLoader::load_from_string(&template).unwrap();
        assert_eq!(params, ParameterSet::LegacyStrict.parameters());
    }

    #[test]
    fn test_file_io_and_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("model.toml");

        let missing = ConfigLoader::load_with_defaults(&path).unwrap();
        assert_eq!(missing, ModelParameters::default());

        let legacy = ParameterSet::LegacyStrict.parameters();
        ConfigLoader::export_to_file(&legacy, &path).unwrap();
        let loaded = ConfigLoader::load_with_defaults(&path).unwrap();
        assert_eq!(loaded.resilience.stability_cutoff, 70.0);
    }
}
