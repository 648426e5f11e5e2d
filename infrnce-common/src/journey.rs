//! Journey step categorization
//!
//! Maps raw step statuses onto a presentation-agnostic category and emphasis
//! so that any renderer (CLI, web, TUI) draws the same journey the same way.

use crate::model::{ClassificationResult, JourneyStep, StepStatus};
use serde::Serialize;

/// What happened at a stage, independent of display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepCategory {
    /// Classification concluded here
    Resolved,
    /// Stage ran but could not conclude
    Degraded,
    /// Stage was not exercised (or reported an unrecognized status)
    NotAttempted,
}

/// How prominently a renderer should present a step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Emphasis {
    Primary,
    Warning,
    Neutral,
}

/// Category and emphasis for one step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct StepClassification {
    pub category: StepCategory,
    pub emphasis: Emphasis,
}

/// Categorize a step status
pub fn classify_status(status: StepStatus) -> StepClassification {
    let (category, emphasis) = match status {
        StepStatus::Classified | StepStatus::Matched => (StepCategory::Resolved, Emphasis::Primary),
        StepStatus::LowConfidence => (StepCategory::Degraded, Emphasis::Warning),
        StepStatus::Skipped | StepStatus::NotRequired => (StepCategory::NotAttempted, Emphasis::Neutral),
        StepStatus::Unknown => (StepCategory::NotAttempted, Emphasis::Neutral),
    };
    StepClassification { category, emphasis }
}

/// Categorize a journey step
pub fn classify(step: &JourneyStep) -> StepClassification {
    classify_status(step.status)
}

/// A journey step paired with its categorization, in pipeline order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassifiedStep<'a> {
    pub step: &'a JourneyStep,
    #[serde(flatten)]
    pub classification: StepClassification,
}

/// Categorize every step of a result's journey
pub fn classify_journey(result: &ClassificationResult) -> Vec<ClassifiedStep<'_>> {
    result
        .journey
        .iter()
        .map(|step| ClassifiedStep {
            step,
            classification: classify(step),
        })
        .collect()
}
