//! Request lifecycle state and event types
//!
//! Provides the lifecycle state published by the request controller and the
//! EventBus that carries state transitions to any number of observers.

use crate::model::{ClassificationResult, ResultMode};
use crate::validation::ValidationError;
use serde::Serialize;
use std::fmt;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Why a live call was replaced by a synthesized result
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum DegradedReason {
    /// Connection refused, DNS failure, body read failure, ...
    NetworkError(String),
    /// Service answered with a non-success status
    HttpStatus(u16),
    /// No answer within the configured timeout
    Timeout,
    /// Response body could not be decoded as JSON
    MalformedBody(String),
    /// Service answered but the payload failed validation
    InvalidResponse(#[serde(serialize_with = "serialize_display")] ValidationError),
}

fn serialize_display<S: serde::Serializer>(error: &ValidationError, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(error)
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DegradedReason::NetworkError(_) => f.write_str("network error"),
            DegradedReason::HttpStatus(code) => write!(f, "server returned HTTP {}", code),
            DegradedReason::Timeout => f.write_str("request timed out"),
            DegradedReason::MalformedBody(_) => f.write_str("invalid response: body is not JSON"),
            DegradedReason::InvalidResponse(error) => write!(f, "invalid response: {}", error),
        }
    }
}

/// Request lifecycle state
///
/// Owned by the request controller; observers only ever see clones.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LifecycleState {
    /// No request outstanding
    Idle,
    /// A request is in flight
    Submitting { request_id: Uuid },
    /// Remote call returned validated data (`mode = Live`)
    Success { result: ClassificationResult },
    /// Remote call failed; `result` was synthesized (`mode = Demo`)
    DegradedSuccess {
        result: ClassificationResult,
        reason: DegradedReason,
    },
    /// Caller-side precondition violated (e.g. empty input)
    Failed { message: String },
}

impl LifecycleState {
    /// Held result, if the state is terminal and successful
    pub fn result(&self) -> Option<&ClassificationResult> {
        match self {
            LifecycleState::Success { result } | LifecycleState::DegradedSuccess { result, .. } => Some(result),
            _ => None,
        }
    }

    /// Result mode; present exactly when a result is held
    pub fn mode(&self) -> Option<ResultMode> {
        self.result().map(|result| result.mode)
    }

    /// Degradation reason; present exactly when `mode()` is `Demo`
    pub fn reason(&self) -> Option<&DegradedReason> {
        match self {
            LifecycleState::DegradedSuccess { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn is_submitting(&self) -> bool {
        matches!(self, LifecycleState::Submitting { .. })
    }

    /// Short label for logs
    pub fn label(&self) -> &'static str {
        match self {
            LifecycleState::Idle => "idle",
            LifecycleState::Submitting { .. } => "submitting",
            LifecycleState::Success { .. } => "success",
            LifecycleState::DegradedSuccess { .. } => "degraded_success",
            LifecycleState::Failed { .. } => "failed",
        }
    }
}

/// Infrnce event types
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum LifecycleEvent {
    /// Controller state changed
    StateChanged {
        /// Request that caused the transition (None for `clear`)
        request_id: Option<Uuid>,
        /// State after the transition
        state: LifecycleState,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Input text was replaced by a sample log
    SampleLoaded {
        text: String,
        mode: ResultMode,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

/// Broadcast bus for lifecycle events
///
/// Subscribers only receive events emitted after they subscribe.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LifecycleEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LifecycleEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
