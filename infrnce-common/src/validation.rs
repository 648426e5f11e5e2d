//! Classification payload validation
//!
//! Turns whatever the remote service sent into a [`ClassificationResult`] or a
//! typed [`ValidationError`]. `validate` is total: it never panics and never
//! returns a partially-populated result.

use crate::model::{ClassificationResult, JourneyStep, PipelineStage, ResultMode, StepStatus};
use serde_json::{Map, Value};
use thiserror::Error;

/// Why a payload is not a valid classification result
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("payload is not a JSON object")]
    NotAnObject,

    #[error("missing field: {field}")]
    MissingField { field: &'static str },

    #[error("field {field} has the wrong type")]
    InvalidFieldType { field: &'static str },

    #[error("unknown pipeline stage: {value}")]
    InvalidStage { value: String },

    #[error("invalid journey: {reason}")]
    InvalidJourney { reason: String },

    #[error("invalid processing time: {value}")]
    InvalidTiming { value: String },
}

impl ValidationError {
    fn journey(reason: impl Into<String>) -> Self {
        ValidationError::InvalidJourney { reason: reason.into() }
    }
}

/// Validate a raw classification payload
///
/// On success the result is normalized and tagged [`ResultMode::Live`].
pub fn validate(payload: &Value) -> Result<ClassificationResult, ValidationError> {
    let object = payload.as_object().ok_or(ValidationError::NotAnObject)?;

    let final_category = required(object, "final_category")?
        .as_str()
        .ok_or(ValidationError::InvalidFieldType { field: "final_category" })?
        .to_string();

    let stage_value = required(object, "pipeline_stage")?;
    let stage_name = stage_value
        .as_str()
        .ok_or_else(|| ValidationError::InvalidStage { value: stage_value.to_string() })?;
    let pipeline_stage = PipelineStage::parse(stage_name)
        .ok_or_else(|| ValidationError::InvalidStage { value: stage_name.to_string() })?;

    let journey_value = required(object, "journey")?;
    let raw_steps = journey_value
        .as_array()
        .ok_or_else(|| ValidationError::journey("journey is not an array"))?;
    let journey = raw_steps
        .iter()
        .enumerate()
        .map(|(index, raw)| parse_step(index, raw))
        .collect::<Result<Vec<_>, _>>()?;

    check_journey(&journey, pipeline_stage)?;

    let processing_time_ms = parse_timing(object.get("processing_time_ms"))?;

    let final_confidence = object.get("final_confidence").and_then(Value::as_f64);
    let log_analyzed = object
        .get("log_analyzed")
        .and_then(Value::as_str)
        .map(str::to_string);

    Ok(ClassificationResult {
        final_category,
        pipeline_stage,
        processing_time_ms,
        journey,
        mode: ResultMode::Live,
        final_confidence,
        log_analyzed,
    })
}

/// Check the ordering and terminal-step invariants of a typed journey
///
/// - non-empty
/// - stages strictly increasing in pipeline order
/// - at most one terminal step; when present it is the last step and its
///   stage equals `pipeline_stage`
/// - no terminal step is only allowed when every step was skipped
pub fn check_journey(journey: &[JourneyStep], pipeline_stage: PipelineStage) -> Result<(), ValidationError> {
    if journey.is_empty() {
        return Err(ValidationError::journey("journey is empty"));
    }

    for pair in journey.windows(2) {
        if pair[1].stage.position() <= pair[0].stage.position() {
            return Err(ValidationError::journey(format!(
                "stage {} cannot follow {}",
                pair[1].stage, pair[0].stage
            )));
        }
    }

    let terminal: Vec<(usize, &JourneyStep)> = journey
        .iter()
        .enumerate()
        .filter(|(_, step)| step.status.is_terminal())
        .collect();

    match terminal.as_slice() {
        [] => {
            if journey.iter().all(|step| step.status.is_not_attempted()) {
                Ok(())
            } else {
                Err(ValidationError::journey("no stage concluded the classification"))
            }
        }
        [(index, step)] => {
            if *index != journey.len() - 1 {
                return Err(ValidationError::journey(format!(
                    "stage {} ran after classification concluded at {}",
                    journey[index + 1].stage, step.stage
                )));
            }
            if step.stage != pipeline_stage {
                return Err(ValidationError::journey(format!(
                    "terminal stage {} does not match pipeline stage {}",
                    step.stage, pipeline_stage
                )));
            }
            Ok(())
        }
        _ => Err(ValidationError::journey(format!(
            "{} stages claim to have concluded the classification",
            terminal.len()
        ))),
    }
}

fn required<'a>(object: &'a Map<String, Value>, field: &'static str) -> Result<&'a Value, ValidationError> {
    match object.get(field) {
        None | Some(Value::Null) => Err(ValidationError::MissingField { field }),
        Some(value) => Ok(value),
    }
}

fn parse_step(index: usize, raw: &Value) -> Result<JourneyStep, ValidationError> {
    let step = raw
        .as_object()
        .ok_or_else(|| ValidationError::journey(format!("step {} is not an object", index)))?;

    let stage_name = step
        .get("stage")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::journey(format!("step {} has no stage", index)))?;
    let stage = PipelineStage::parse(stage_name)
        .ok_or_else(|| ValidationError::journey(format!("step {} has unknown stage {:?}", index, stage_name)))?;

    let status = step
        .get("status")
        .and_then(Value::as_str)
        .map(StepStatus::parse)
        .unwrap_or(StepStatus::Unknown);

    let details = step
        .get("details")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    Ok(JourneyStep { stage, status, details })
}

fn parse_timing(raw: Option<&Value>) -> Result<u64, ValidationError> {
    match raw {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(number)) => {
            if let Some(ms) = number.as_u64() {
                return Ok(ms);
            }
            // Integral floats such as 2.0 are accepted
            match number.as_f64() {
                Some(ms) if ms >= 0.0 && ms.fract() == 0.0 && ms <= u64::MAX as f64 => Ok(ms as u64),
                _ => Err(ValidationError::InvalidTiming { value: number.to_string() }),
            }
        }
        Some(other) => Err(ValidationError::InvalidTiming { value: other.to_string() }),
    }
}
