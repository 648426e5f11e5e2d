//! # Infrnce Common Library
//!
//! Shared code for the Infrnce log-classification client including:
//! - Classification result schema (pipeline stages, journey steps)
//! - Total payload validation for remote responses
//! - Journey step categorization for renderers
//! - Request lifecycle state and the EventBus that publishes it
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod journey;
pub mod model;
pub mod validation;

pub use error::{Error, Result};
pub use model::{ClassificationRequest, ClassificationResult, JourneyStep, PipelineStage, ResultMode, StepStatus};
pub use validation::{validate, ValidationError};
