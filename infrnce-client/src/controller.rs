//! Request controller
//!
//! Single authority over the request lifecycle. Mediates between caller
//! intent, the remote classifier and the fallback synthesizer.
//!
//! **Concurrency policy: supersede.** A new `submit` (or `clear`) cancels the
//! outstanding request. The cancelled call may still complete on the wire, but
//! its settlement is discarded: every state write checks the generation it
//! was issued under while holding the state lock, so transitions land in
//! call-issue order and a stale response never overwrites a newer state.
//! The remote call and its settlement run on a spawned task, so dropping a
//! `submit` future does not leave the lifecycle in `Submitting`.
//!
//! Remote failures (network, HTTP status, timeout, invalid payload) are never
//! surfaced as errors; they become `DegradedSuccess` with a demo result.
//! Only caller-side precondition violations reach `Failed`.

use crate::fallback::{FallbackSynthesizer, SampleKind, DEMO_CLASSIFY_NOTICE, DEMO_SAMPLE_NOTICE};
use crate::remote::{ClassifierBackend, HealthStatus, RemoteError};
use infrnce_common::events::{DegradedReason, EventBus, LifecycleEvent, LifecycleState};
use infrnce_common::{validate, ClassificationRequest, ResultMode};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, RwLock};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default event buffer for lifecycle observers
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Outcome of a controller operation that may be superseded
#[derive(Debug, Clone, PartialEq)]
pub enum Settlement<T> {
    /// The operation settled and its outcome was applied
    Settled(T),
    /// A newer operation was issued first; nothing was applied
    Superseded,
}

impl<T> Settlement<T> {
    pub fn settled(self) -> Option<T> {
        match self {
            Settlement::Settled(value) => Some(value),
            Settlement::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, Settlement::Superseded)
    }
}

/// Result of `submit`
pub type Submission = Settlement<LifecycleState>;

/// Result of `request_sample`
#[derive(Debug, Clone, PartialEq)]
pub struct SampleOutcome {
    pub text: String,
    pub mode: ResultMode,
    /// Present exactly when `mode` is `Demo`
    pub reason: Option<DegradedReason>,
}

impl SampleOutcome {
    /// Demo-mode banner text, if any
    pub fn notice(&self) -> Option<&'static str> {
        self.reason.as_ref().map(|_| DEMO_SAMPLE_NOTICE)
    }
}

/// Banner text for a lifecycle state, if it holds a demo result
pub fn demo_notice(state: &LifecycleState) -> Option<&'static str> {
    state.reason().map(|_| DEMO_CLASSIFY_NOTICE)
}

/// Lifecycle state plus the bookkeeping needed to suppress stale settlements
struct LifecycleSlot {
    state: LifecycleState,
    generation: u64,
    in_flight: Option<CancellationToken>,
}

impl LifecycleSlot {
    /// Invalidate whatever is outstanding and return the new generation
    fn supersede(&mut self) -> u64 {
        if let Some(token) = self.in_flight.take() {
            token.cancel();
        }
        self.generation += 1;
        self.generation
    }
}

/// Controller-owned input text
struct InputSlot {
    text: String,
    generation: u64,
}

struct Inner {
    backend: Arc<dyn ClassifierBackend>,
    fallback: FallbackSynthesizer,
    request_timeout: Duration,
    lifecycle: RwLock<LifecycleSlot>,
    input: RwLock<InputSlot>,
    event_bus: EventBus,
}

/// Request lifecycle controller
///
/// Cheap to clone; clones share the same lifecycle.
#[derive(Clone)]
pub struct RequestController {
    inner: Arc<Inner>,
}

impl RequestController {
    pub fn new(backend: Arc<dyn ClassifierBackend>, request_timeout: Duration) -> Self {
        Self::with_fallback(backend, request_timeout, FallbackSynthesizer::new())
    }

    /// Build with a specific synthesizer (e.g. a seeded one)
    pub fn with_fallback(
        backend: Arc<dyn ClassifierBackend>,
        request_timeout: Duration,
        fallback: FallbackSynthesizer,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                fallback,
                request_timeout,
                lifecycle: RwLock::new(LifecycleSlot {
                    state: LifecycleState::Idle,
                    generation: 0,
                    in_flight: None,
                }),
                input: RwLock::new(InputSlot {
                    text: String::new(),
                    generation: 0,
                }),
                event_bus: EventBus::new(DEFAULT_EVENT_CAPACITY),
            }),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> LifecycleState {
        self.inner.lifecycle.read().await.state.clone()
    }

    /// Current input text (populated by `request_sample`)
    pub async fn input_text(&self) -> String {
        self.inner.input.read().await.text.clone()
    }

    /// Subscribe to lifecycle transitions issued after this call
    pub fn subscribe(&self) -> broadcast::Receiver<LifecycleEvent> {
        self.inner.event_bus.subscribe()
    }

    /// Classify a log message
    ///
    /// Resolves once this submission settles. Empty or whitespace-only input
    /// goes straight to `Failed` without a remote call.
    pub async fn submit(&self, log_message: &str) -> Submission {
        let request = match ClassificationRequest::new(log_message) {
            Ok(request) => request,
            Err(e) => {
                let state = LifecycleState::Failed { message: e.to_string() };
                let mut lifecycle = self.inner.lifecycle.write().await;
                lifecycle.supersede();
                self.transition(&mut lifecycle, None, state.clone());
                return Settlement::Settled(state);
            }
        };

        let request_id = Uuid::new_v4();
        let token = CancellationToken::new();
        let generation = {
            let mut lifecycle = self.inner.lifecycle.write().await;
            let generation = lifecycle.supersede();
            lifecycle.in_flight = Some(token.clone());
            self.transition(&mut lifecycle, Some(request_id), LifecycleState::Submitting { request_id });
            generation
        };

        info!(request_id = %request_id, bytes = request.log_message.len(), "Submitting log for classification");

        // Settlement runs detached so a dropped caller cannot strand `Submitting`
        let controller = self.clone();
        let handle = tokio::spawn(async move {
            controller
                .settle(request_id, generation, token, request.log_message)
                .await
        });

        match handle.await {
            Ok(submission) => submission,
            Err(e) => {
                warn!(request_id = %request_id, error = %e, "Settlement task aborted");
                let state = LifecycleState::Failed {
                    message: "Classification request was interrupted".to_string(),
                };
                self.apply(generation, Some(request_id), state).await
            }
        }
    }

    async fn settle(
        &self,
        request_id: Uuid,
        generation: u64,
        token: CancellationToken,
        log_message: String,
    ) -> Submission {
        let started = Instant::now();

        let outcome = tokio::select! {
            _ = token.cancelled() => {
                debug!(request_id = %request_id, "Submission superseded before settling");
                return Settlement::Superseded;
            }
            outcome = self.bounded(self.inner.backend.classify(&log_message)) => outcome,
        };

        let state = match outcome {
            Ok(payload) => match validate(&payload) {
                Ok(result) => {
                    info!(
                        request_id = %request_id,
                        category = %result.final_category,
                        stage = %result.pipeline_stage,
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "Live classification received"
                    );
                    LifecycleState::Success { result }
                }
                Err(e) => self.degrade(request_id, DegradedReason::InvalidResponse(e)),
            },
            Err(e) => self.degrade(request_id, e.degraded_reason()),
        };

        self.apply(generation, Some(request_id), state).await
    }

    /// Write a settlement unless a newer operation has superseded it
    async fn apply(&self, generation: u64, request_id: Option<Uuid>, state: LifecycleState) -> Submission {
        let mut lifecycle = self.inner.lifecycle.write().await;
        if lifecycle.generation != generation {
            debug!(request_id = ?request_id, "Discarding stale settlement");
            return Settlement::Superseded;
        }
        lifecycle.in_flight = None;
        self.transition(&mut lifecycle, request_id, state.clone());
        Settlement::Settled(state)
    }

    /// Return to `Idle`, discarding any held result
    ///
    /// An outstanding submission is cancelled.
    pub async fn clear(&self) {
        let mut lifecycle = self.inner.lifecycle.write().await;
        lifecycle.supersede();
        self.transition(&mut lifecycle, None, LifecycleState::Idle);
    }

    /// Replace the input text with a sample log
    ///
    /// Tries the live generator first and falls back to the built-in pool for
    /// `kind`. Does not touch the lifecycle state.
    pub async fn request_sample(&self, kind: SampleKind) -> Settlement<SampleOutcome> {
        let generation = {
            let mut input = self.inner.input.write().await;
            input.generation += 1;
            input.generation
        };

        let outcome = match self.bounded(self.inner.backend.generate()).await {
            Ok(text) => SampleOutcome {
                text,
                mode: ResultMode::Live,
                reason: None,
            },
            Err(e) => {
                let reason = e.degraded_reason();
                warn!(error = %e, reason = %reason, "Live sample unavailable, using demo sample");
                SampleOutcome {
                    text: self.inner.fallback.sample(kind),
                    mode: ResultMode::Demo,
                    reason: Some(reason),
                }
            }
        };

        let mut input = self.inner.input.write().await;
        if input.generation != generation {
            debug!("Discarding stale sample");
            return Settlement::Superseded;
        }
        input.text = outcome.text.clone();
        self.inner.event_bus.emit_lossy(LifecycleEvent::SampleLoaded {
            text: outcome.text.clone(),
            mode: outcome.mode,
            timestamp: chrono::Utc::now(),
        });
        Settlement::Settled(outcome)
    }

    /// Service readiness; no fallback
    pub async fn health(&self) -> Result<HealthStatus, RemoteError> {
        self.bounded(self.inner.backend.health()).await
    }

    async fn bounded<T>(&self, call: impl Future<Output = Result<T, RemoteError>>) -> Result<T, RemoteError> {
        let timeout = self.inner.request_timeout;
        tokio::time::timeout(timeout, call)
            .await
            .map_err(|_| RemoteError::Timeout(timeout))?
    }

    fn degrade(&self, request_id: Uuid, reason: DegradedReason) -> LifecycleState {
        let result = self.inner.fallback.classification();
        warn!(
            request_id = %request_id,
            reason = %reason,
            demo_stage = %result.pipeline_stage,
            "Live classification unavailable, using demo result"
        );
        LifecycleState::DegradedSuccess { result, reason }
    }

    fn transition(&self, lifecycle: &mut LifecycleSlot, request_id: Option<Uuid>, state: LifecycleState) {
        debug!(from = lifecycle.state.label(), to = state.label(), "Lifecycle transition");
        lifecycle.state = state.clone();
        self.inner.event_bus.emit_lossy(LifecycleEvent::StateChanged {
            request_id,
            state,
            timestamp: chrono::Utc::now(),
        });
    }
}
