//! Request/response boundary
//!
//! Callers talk to the engine with JSON objects keyed by a `protocol`
//! discriminator. Requests are deserialized into typed structures once, the
//! engine runs on those, and the result is flattened back into a JSON object
//! with a `status` field. Every failure becomes
//! `{"status": "error", "message": ...}`; nothing panics across this boundary.
//!
//! Numeric outputs are rounded to 2 decimals, heart rates to 1, midpoint away
//! from zero.

use crate::engine::LactateEngine;
use crate::error::{ErrorSeverity, InputError, LactrsError};
use crate::hybrid::AcidBathInput;
use crate::models::{Discipline, TestInput};
use crate::race::AthleteLevel;
use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Number, Value};
use std::str::FromStr;

/// Request kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Protocol {
    /// Incremental running test; alias `run`
    StepTest,
    /// Bike interval with lactate recovery; alias `hyrox`
    AcidBath,
}

impl Protocol {
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::StepTest => "step_test",
            Protocol::AcidBath => "acid_bath",
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "step_test" | "run" => Ok(Protocol::StepTest),
            "acid_bath" | "hyrox" => Ok(Protocol::AcidBath),
            _ => Err("Unknown protocol".to_string()),
        }
    }
}

fn default_weight() -> f64 {
    TestInput::DEFAULT_WEIGHT_KG
}

fn default_height() -> f64 {
    TestInput::DEFAULT_HEIGHT_CM
}

fn default_width() -> f64 {
    TestInput::DEFAULT_WIDTH_CM
}

fn default_true() -> bool {
    true
}

/// `step_test` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepTestRequest {
    pub speeds: Vec<f64>,
    pub lactates: Vec<f64>,
    pub heart_rates: Vec<f64>,
    #[serde(default)]
    pub v_max: Option<f64>,
    #[serde(default = "default_weight")]
    pub weight_kg: f64,
    #[serde(default = "default_height")]
    pub height_cm: f64,
    #[serde(default = "default_width", alias = "body_width_cm")]
    pub shoulder_width_cm: f64,
    #[serde(default)]
    pub discipline_type: Discipline,
    #[serde(default = "default_true")]
    pub is_all_out: bool,
    #[serde(default)]
    pub athlete_level: AthleteLevel,
}

impl StepTestRequest {
    pub fn to_input(&self) -> Result<TestInput, LactrsError> {
        Ok(TestInput::from_series(&self.speeds, &self.lactates, &self.heart_rates)?
            .with_biometrics(self.weight_kg, self.height_cm, self.shoulder_width_cm)
            .with_discipline(self.discipline_type)
            .with_all_out(self.is_all_out)
            .with_v_max(self.v_max)
            .with_athlete_level(self.athlete_level))
    }

    /// Hybrid athletes with exactly three stages take the parabola pipeline
    pub fn routes_to_hybrid(&self) -> bool {
        self.discipline_type == Discipline::Hybrid && self.speeds.len() == 3
    }
}

/// `acid_bath` request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AcidBathRequest {
    #[serde(default = "default_weight")]
    pub weight_kg: f64,
    pub bike_watt_avg: f64,
    pub lactate_baseline: f64,
    pub lactate_peak: f64,
    pub lactate_recovery: f64,
    #[serde(default)]
    pub base_pace_mps: Option<f64>,
    /// Optional three-stage arrays for a parabola threshold
    #[serde(default)]
    pub speeds: Option<Vec<f64>>,
    #[serde(default)]
    pub lactates: Option<Vec<f64>>,
}

/// Handle one request object and return the response object
pub fn handle_request(engine: &LactateEngine, request: &Value) -> Value {
    let protocol = match request
        .get("protocol")
        .and_then(Value::as_str)
        .and_then(|p| p.parse::<Protocol>().ok())
    {
        Some(protocol) => protocol,
        None => return error_response("Unknown protocol"),
    };

    let result = match protocol {
        Protocol::StepTest => step_test(engine, request),
        Protocol::AcidBath => acid_bath(engine, request),
    };

    match result {
        Ok(Value::Object(mut fields)) => {
            round_fields(&mut fields);
            fields.insert("protocol".to_string(), json!(protocol.as_str()));
            fields.insert("status".to_string(), json!("success"));
            Value::Object(fields)
        }
        Ok(_) => error_response("Result is not an object"),
        Err(err) => {
            match err.severity() {
                ErrorSeverity::Error => tracing::error!(error = %err, "Request failed"),
                ErrorSeverity::Warning => tracing::warn!(error = %err, "Request rejected"),
            }
            error_response(&err.user_message())
        }
    }
}

/// Handle a raw JSON request string
pub fn handle_json(engine: &LactateEngine, request: &str) -> String {
    match serde_json::from_str::<Value>(request) {
        Ok(value) => handle_request(engine, &value).to_string(),
        Err(e) => error_response(&format!("Invalid JSON: {}", e)).to_string(),
    }
}

fn step_test(engine: &LactateEngine, request: &Value) -> Result<Value, LactrsError> {
    let req: StepTestRequest = serde_json::from_value(request.clone())?;
    let input = req.to_input()?;

    if req.routes_to_hybrid() {
        let mut value = serde_json::to_value(engine.analyze_hybrid(&input)?)?;
        if let Value::Object(fields) = &mut value {
            fields.insert("analysis".to_string(), json!("hybrid"));
        }
        Ok(value)
    } else {
        Ok(serde_json::to_value(engine.analyze(&input)?)?)
    }
}

fn acid_bath(engine: &LactateEngine, request: &Value) -> Result<Value, LactrsError> {
    let req: AcidBathRequest = serde_json::from_value(request.clone())?;

    let threshold = match (&req.speeds, &req.lactates) {
        (Some(speeds), Some(lactates)) => Some(engine.parabola_threshold(speeds, lactates)?),
        _ => None,
    };

    let base_pace_mps = match (req.base_pace_mps, &threshold) {
        (Some(pace), _) => pace,
        (None, Some(t)) => t.threshold_speed / 3.6,
        (None, None) => {
            return Err(InputError::MissingField("base_pace_mps".to_string()).into());
        }
    };

    let result = engine.analyze_acid_bath(&AcidBathInput {
        weight_kg: req.weight_kg,
        bike_watt_avg: req.bike_watt_avg,
        lactate_baseline: req.lactate_baseline,
        lactate_peak: req.lactate_peak,
        lactate_recovery: req.lactate_recovery,
        base_pace_mps,
    })?;

    let mut value = serde_json::to_value(result)?;
    if let (Value::Object(fields), Some(t)) = (&mut value, threshold) {
        fields.insert("threshold_speed".to_string(), json!(t.threshold_speed));
        fields.insert("threshold_fallback_applied".to_string(), json!(t.fallback_applied));
    }
    Ok(value)
}

fn error_response(message: &str) -> Value {
    json!({ "status": "error", "message": message })
}

fn round_fields(fields: &mut Map<String, Value>) {
    for (key, value) in fields.iter_mut() {
        let places = if key.contains("heart_rate") { 1 } else { 2 };
        round_value(value, places);
    }
}

fn round_value(value: &mut Value, places: u32) {
    match value {
        Value::Number(n) if n.is_f64() => {
            if let Some(rounded) = n
                .as_f64()
                .and_then(|x| round_to(x, places))
                .and_then(Number::from_f64)
            {
                *n = rounded;
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| round_value(v, places)),
        Value::Object(fields) => round_fields(fields),
        _ => {}
    }
}

/// Round half away from zero with decimal arithmetic
pub fn round_to(x: f64, places: u32) -> Option<f64> {
    Decimal::from_f64(x)?
        .round_dp_with_strategy(places, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
}
