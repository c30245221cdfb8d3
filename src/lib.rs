//! lactrs: lactate step test analysis
//!
//! Fits lactate and heart-rate curves to an incremental test and derives
//! LT1/LT2, FatMax, VO2max, a metabolic type, post-threshold resilience,
//! training zones and race projections. A three-stage hybrid protocol and the
//! acid-bath interval are analyzed separately.

pub mod config;
pub mod curve;
pub mod engine;
pub mod error;
pub mod hybrid;
pub mod import;
pub mod logging;
pub mod metabolic;
pub mod models;
pub mod protocol;
pub mod race;
pub mod report;
pub mod resilience;
pub mod threshold;
pub mod vo2max;
pub mod zones;

// Re-export commonly used types for convenience
pub use config::{ConfigLoader, ModelParameters, ParameterSet};
pub use curve::{CurveFitter, FittedCurve};
pub use engine::{HybridMetrics, LactateEngine, MetricsRecord};
pub use error::{CurveError, InputError, LactrsError, Result};
pub use hybrid::{AcidBathInput, AcidBathResult, HybridAnalyzer};
pub use logging::{LogConfig, LogFormat, LogLevel};
pub use models::{Discipline, NormalizedStages, StageSample, TestInput};
pub use protocol::{handle_json, handle_request, Protocol};
pub use threshold::{ThresholdLocator, ThresholdMethod, ThresholdResult};
