//! Classification result schema
//!
//! Canonical data model for a classification result and the multi-stage
//! "pipeline journey" trace returned alongside it. Values of these types are
//! only ever produced by [`crate::validation::validate`] (live results) or by
//! the fallback synthesizer (demo results), so renderers may rely on the
//! journey invariants without re-checking them.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the three ordered remote classification tiers
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PipelineStage {
    /// Stage 1: pattern matching
    Regex,
    /// Stage 2: BERT model
    #[serde(rename = "BERT")]
    Bert,
    /// Stage 3: LLM fallback
    #[serde(rename = "LLM")]
    Llm,
}

impl PipelineStage {
    /// All stages in pipeline order
    pub const ALL: [PipelineStage; 3] = [PipelineStage::Regex, PipelineStage::Bert, PipelineStage::Llm];

    /// Position in the fixed pipeline order (0-based)
    pub fn position(self) -> usize {
        match self {
            PipelineStage::Regex => 0,
            PipelineStage::Bert => 1,
            PipelineStage::Llm => 2,
        }
    }

    /// Canonical wire name
    pub fn as_str(self) -> &'static str {
        match self {
            PipelineStage::Regex => "Regex",
            PipelineStage::Bert => "BERT",
            PipelineStage::Llm => "LLM",
        }
    }

    /// Human-readable name used in journey traces
    pub fn display_name(self) -> &'static str {
        match self {
            PipelineStage::Regex => "Regex Engine",
            PipelineStage::Bert => "BERT Model",
            PipelineStage::Llm => "LLM Fallback",
        }
    }

    /// Parse a stage name
    ///
    /// Accepts the canonical names and the journey display names,
    /// case-insensitively. Returns `None` for anything else.
    pub fn parse(name: &str) -> Option<Self> {
        let name = name.trim();
        Self::ALL.into_iter().find(|stage| {
            name.eq_ignore_ascii_case(stage.as_str()) || name.eq_ignore_ascii_case(stage.display_name())
        })
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a single stage within a journey
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum StepStatus {
    Classified,
    Matched,
    #[serde(rename = "Low Confidence")]
    LowConfidence,
    Skipped,
    #[serde(rename = "Not Required")]
    NotRequired,
    /// Any status string the service sent that is not recognized
    /// (e.g. "Failed", "Unavailable")
    Unknown,
}

impl StepStatus {
    /// Parse a status string; never fails
    pub fn parse(raw: &str) -> Self {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace() && *c != '_' && *c != '-')
            .flat_map(char::to_lowercase)
            .collect();

        match normalized.as_str() {
            "classified" => StepStatus::Classified,
            "matched" => StepStatus::Matched,
            "lowconfidence" => StepStatus::LowConfidence,
            "skipped" => StepStatus::Skipped,
            "notrequired" => StepStatus::NotRequired,
            _ => StepStatus::Unknown,
        }
    }

    /// Wire representation
    pub fn as_str(self) -> &'static str {
        match self {
            StepStatus::Classified => "Classified",
            StepStatus::Matched => "Matched",
            StepStatus::LowConfidence => "Low Confidence",
            StepStatus::Skipped => "Skipped",
            StepStatus::NotRequired => "Not Required",
            StepStatus::Unknown => "Unknown",
        }
    }

    /// Classification concluded at this step
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Classified | StepStatus::Matched)
    }

    /// Stage was bypassed entirely
    pub fn is_not_attempted(self) -> bool {
        matches!(self, StepStatus::Skipped | StepStatus::NotRequired)
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-stage outcome within a journey
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JourneyStep {
    pub stage: PipelineStage,
    pub status: StepStatus,
    pub details: String,
}

impl JourneyStep {
    pub fn new(stage: PipelineStage, status: StepStatus, details: impl Into<String>) -> Self {
        Self {
            stage,
            status,
            details: details.into(),
        }
    }
}

/// Where a result came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResultMode {
    /// Validated response from the remote service
    Live,
    /// Synthesized locally because the live call did not succeed
    Demo,
}

impl fmt::Display for ResultMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultMode::Live => f.write_str("live"),
            ResultMode::Demo => f.write_str("demo"),
        }
    }
}

/// A normalized classification result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub final_category: String,
    pub pipeline_stage: PipelineStage,
    pub processing_time_ms: u64,
    /// Ordered by pipeline position, never empty
    pub journey: Vec<JourneyStep>,
    pub mode: ResultMode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_analyzed: Option<String>,
}

impl ClassificationResult {
    /// The step at which classification concluded, if any
    ///
    /// `None` only for a total miss (every stage skipped).
    pub fn terminal_step(&self) -> Option<&JourneyStep> {
        self.journey.iter().find(|step| step.status.is_terminal())
    }

    pub fn is_demo(&self) -> bool {
        self.mode == ResultMode::Demo
    }
}

/// Body of `POST /api/classify`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRequest {
    pub log_message: String,
}

impl ClassificationRequest {
    /// Build a request, rejecting empty or whitespace-only input
    pub fn new(log_message: impl Into<String>) -> crate::Result<Self> {
        let log_message = log_message.into();
        if log_message.trim().is_empty() {
            return Err(crate::Error::InvalidInput(
                "Please enter a log message to classify.".to_string(),
            ));
        }
        Ok(Self { log_message })
    }
}
