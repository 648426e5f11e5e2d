//! Request controller lifecycle tests
//!
//! Drives the controller against a scripted in-process backend with
//! controllable delays, covering:
//! - empty-input rejection without a remote call
//! - live success and every demo-mode degradation path
//! - supersede semantics and stale-response suppression
//! - event ordering, clear, and sample loading

use async_trait::async_trait;
use infrnce_client::{
    ClassifierBackend, FallbackSynthesizer, HealthStatus, RemoteError, RequestController, SampleKind, Settlement,
};
use infrnce_common::events::{DegradedReason, LifecycleEvent, LifecycleState};
use infrnce_common::validation::{check_journey, ValidationError};
use infrnce_common::{PipelineStage, ResultMode};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Clone)]
enum Reply {
    Payload(Value),
    NetworkError,
    Status(u16),
    Hang,
}

#[derive(Default)]
struct ScriptedBackend {
    classify: Mutex<HashMap<String, (Duration, Reply)>>,
    generate: Mutex<Option<Reply>>,
    classify_calls: AtomicUsize,
}

impl ScriptedBackend {
    fn on(self, message: &str, delay_ms: u64, reply: Reply) -> Self {
        self.classify
            .lock()
            .unwrap()
            .insert(message.to_string(), (Duration::from_millis(delay_ms), reply));
        self
    }

    fn on_generate(self, reply: Reply) -> Self {
        *self.generate.lock().unwrap() = Some(reply);
        self
    }

    fn calls(&self) -> usize {
        self.classify_calls.load(Ordering::SeqCst)
    }
}

async fn play(reply: Reply) -> Result<Value, RemoteError> {
    match reply {
        Reply::Payload(payload) => Ok(payload),
        Reply::NetworkError => Err(RemoteError::Network("connection refused".to_string())),
        Reply::Status(code) => Err(RemoteError::Status(code, "Classifier not initialized".to_string())),
        Reply::Hang => {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Err(RemoteError::Network("unreachable".to_string()))
        }
    }
}

#[async_trait]
impl ClassifierBackend for ScriptedBackend {
    async fn classify(&self, log_message: &str) -> Result<Value, RemoteError> {
        self.classify_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = self.classify.lock().unwrap().get(log_message).cloned();
        let (delay, reply) = scripted.unwrap_or((Duration::ZERO, Reply::NetworkError));
        tokio::time::sleep(delay).await;
        play(reply).await
    }

    async fn generate(&self) -> Result<String, RemoteError> {
        let reply = self.generate.lock().unwrap().clone().unwrap_or(Reply::NetworkError);
        match play(reply).await? {
            Value::String(text) => Ok(text),
            other => Err(RemoteError::Decode(format!("unexpected payload {}", other))),
        }
    }

    async fn health(&self) -> Result<HealthStatus, RemoteError> {
        Ok(HealthStatus {
            status: "healthy".to_string(),
            classifier_ready: true,
            models_loaded: Default::default(),
        })
    }
}

fn regex_payload(category: &str) -> Value {
    json!({
        "log_analyzed": "INFO ...",
        "final_category": category,
        "pipeline_stage": "Regex",
        "final_confidence": 1.0,
        "processing_time_ms": 2,
        "journey": [{"stage": "Regex", "status": "Matched", "details": "Matched pattern"}]
    })
}

fn controller(backend: Arc<ScriptedBackend>) -> RequestController {
    RequestController::with_fallback(backend, TIMEOUT, FallbackSynthesizer::with_seed(3))
}

fn assert_valid_demo(state: &LifecycleState) {
    let result = state.result().expect("state should hold a result");
    assert_eq!(result.mode, ResultMode::Demo);
    assert!(state.reason().is_some(), "demo result must carry a reason");
    assert!(!state.reason().unwrap().to_string().is_empty());
    check_journey(&result.journey, result.pipeline_stage).expect("demo journey must be valid");
}

#[tokio::test]
async fn test_empty_input_fails_without_remote_call() {
    let backend = Arc::new(ScriptedBackend::default());
    let controller = controller(backend.clone());

    for input in ["", "   ", "\n\t  "] {
        let state = controller.submit(input).await.settled().unwrap();
        assert!(matches!(state, LifecycleState::Failed { .. }), "input {:?}", input);
        assert!(state.mode().is_none());
    }

    assert_eq!(backend.calls(), 0);
    assert!(matches!(controller.state().await, LifecycleState::Failed { .. }));
}

#[tokio::test]
async fn test_live_result_reaches_success() {
    let message = "INFO 2024-01-15 nova.compute.manager config reloaded";
    let backend = Arc::new(ScriptedBackend::default().on(message, 0, Reply::Payload(regex_payload("Config_Error"))));
    let controller = controller(backend.clone());

    let state = controller.submit(message).await.settled().unwrap();

    match &state {
        LifecycleState::Success { result } => {
            assert_eq!(result.mode, ResultMode::Live);
            assert_eq!(result.pipeline_stage, PipelineStage::Regex);
            assert_eq!(result.final_category, "Config_Error");
            assert_eq!(result.processing_time_ms, 2);
        }
        other => panic!("expected Success, got {:?}", other),
    }
    assert!(state.reason().is_none());
    assert_eq!(controller.state().await, state);
    assert_eq!(backend.calls(), 1);
}

#[tokio::test]
async fn test_network_error_degrades_to_demo() {
    let message = "ERROR 2024-01-15 14:23:01 [DatabaseConnection] Connection timeout after 30 seconds";
    let backend = Arc::new(ScriptedBackend::default().on(message, 0, Reply::NetworkError));
    let controller = controller(backend);

    let state = controller.submit(message).await.settled().unwrap();

    assert!(matches!(state, LifecycleState::DegradedSuccess { .. }));
    assert_valid_demo(&state);
    assert!(matches!(state.reason(), Some(DegradedReason::NetworkError(_))));
}

#[tokio::test]
async fn test_http_error_status_degrades_to_demo() {
    let backend = Arc::new(ScriptedBackend::default().on("WARN disk", 0, Reply::Status(503)));
    let controller = controller(backend);

    let state = controller.submit("WARN disk").await.settled().unwrap();

    assert_valid_demo(&state);
    assert_eq!(state.reason(), Some(&DegradedReason::HttpStatus(503)));
}

#[tokio::test]
async fn test_timeout_degrades_to_demo() {
    let backend = Arc::new(ScriptedBackend::default().on("ERROR slow", 0, Reply::Hang));
    let controller = RequestController::with_fallback(
        backend,
        Duration::from_millis(50),
        FallbackSynthesizer::with_seed(9),
    );

    let state = tokio::time::timeout(Duration::from_secs(5), controller.submit("ERROR slow"))
        .await
        .expect("controller must never stay in Submitting")
        .settled()
        .unwrap();

    assert_valid_demo(&state);
    assert_eq!(state.reason(), Some(&DegradedReason::Timeout));
}

#[tokio::test]
async fn test_dropped_submit_still_settles() {
    let backend = Arc::new(ScriptedBackend::default().on("ERROR x", 0, Reply::Hang));
    let controller = RequestController::with_fallback(
        backend,
        Duration::from_millis(50),
        FallbackSynthesizer::with_seed(9),
    );

    // Caller gives up well before the request timeout
    let abandoned = tokio::time::timeout(Duration::from_millis(10), controller.submit("ERROR x")).await;
    assert!(abandoned.is_err());
    assert!(controller.state().await.is_submitting());

    tokio::time::sleep(Duration::from_millis(500)).await;

    let state = controller.state().await;
    assert!(!state.is_submitting(), "state stuck in {}", state.label());
    assert_valid_demo(&state);
    assert_eq!(state.reason(), Some(&DegradedReason::Timeout));
}

#[tokio::test]
async fn test_terminal_stage_mismatch_degrades_to_demo() {
    let payload = json!({
        "final_category": "Auth_Error",
        "pipeline_stage": "LLM",
        "processing_time_ms": 40,
        "journey": [
            {"stage": "Regex", "status": "Skipped", "details": "No pattern matched."},
            {"stage": "BERT", "status": "Classified", "details": "High confidence"}
        ]
    });
    let backend = Arc::new(ScriptedBackend::default().on("WARN auth", 0, Reply::Payload(payload)));
    let controller = controller(backend);

    let state = controller.submit("WARN auth").await.settled().unwrap();

    assert_valid_demo(&state);
    assert!(matches!(
        state.reason(),
        Some(DegradedReason::InvalidResponse(ValidationError::InvalidJourney { .. }))
    ));
}

#[tokio::test]
async fn test_later_submit_wins_when_earlier_is_slower() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .on("A", 300, Reply::Payload(regex_payload("From_A")))
            .on("B", 20, Reply::Payload(regex_payload("From_B"))),
    );
    let controller = controller(backend.clone());

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit("A").await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(controller.state().await.is_submitting());

    let second = controller.submit("B").await;
    let first = first.await.unwrap();

    assert!(first.is_superseded());
    let state = second.settled().unwrap();
    assert_eq!(state.result().unwrap().final_category, "From_B");

    // Give the abandoned call time to finish on its own
    tokio::time::sleep(Duration::from_millis(350)).await;
    assert_eq!(controller.state().await.result().unwrap().final_category, "From_B");
}

#[tokio::test]
async fn test_later_submit_wins_when_earlier_is_faster() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .on("A", 60, Reply::Payload(regex_payload("From_A")))
            .on("B", 150, Reply::Payload(regex_payload("From_B"))),
    );
    let controller = controller(backend.clone());

    let first = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit("A").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    let second = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit("B").await })
    };

    // A's scripted reply would land here if it had not been superseded
    tokio::time::sleep(Duration::from_millis(90)).await;
    assert!(controller.state().await.is_submitting());

    assert!(first.await.unwrap().is_superseded());
    let state = second.await.unwrap().settled().unwrap();
    assert_eq!(state.result().unwrap().final_category, "From_B");
    assert_eq!(controller.state().await, state);
    assert_eq!(backend.calls(), 2);
}

#[tokio::test]
async fn test_events_published_in_transition_order() {
    let backend = Arc::new(ScriptedBackend::default().on("INFO ok", 0, Reply::Payload(regex_payload("Ok"))));
    let controller = controller(backend);
    let mut rx = controller.subscribe();

    controller.submit("INFO ok").await;
    controller.clear().await;

    let mut labels = Vec::new();
    for _ in 0..3 {
        match rx.recv().await.unwrap() {
            LifecycleEvent::StateChanged { state, .. } => labels.push(state.label()),
            other => panic!("unexpected event {:?}", other),
        }
    }
    assert_eq!(labels, vec!["submitting", "success", "idle"]);
}

#[tokio::test]
async fn test_clear_discards_result_and_cancels_in_flight() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .on("INFO ok", 0, Reply::Payload(regex_payload("Ok")))
            .on("INFO slow", 200, Reply::Payload(regex_payload("Slow"))),
    );
    let controller = controller(backend);

    controller.submit("INFO ok").await;
    controller.clear().await;
    assert_eq!(controller.state().await, LifecycleState::Idle);

    let pending = {
        let controller = controller.clone();
        tokio::spawn(async move { controller.submit("INFO slow").await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    controller.clear().await;

    assert!(pending.await.unwrap().is_superseded());
    assert_eq!(controller.state().await, LifecycleState::Idle);
}

#[tokio::test]
async fn test_new_submission_recovers_from_failed() {
    let backend = Arc::new(ScriptedBackend::default().on("INFO ok", 0, Reply::Payload(regex_payload("Ok"))));
    let controller = controller(backend);

    controller.submit(" ").await;
    assert!(matches!(controller.state().await, LifecycleState::Failed { .. }));

    let state = controller.submit("INFO ok").await.settled().unwrap();
    assert!(matches!(state, LifecycleState::Success { .. }));
}

#[tokio::test]
async fn test_live_sample_populates_input() {
    let backend = Arc::new(
        ScriptedBackend::default().on_generate(Reply::Payload(Value::String("ERROR nova.compute boom".into()))),
    );
    let controller = controller(backend);

    let outcome = controller.request_sample(SampleKind::Synthetic).await.settled().unwrap();

    assert_eq!(outcome.mode, ResultMode::Live);
    assert!(outcome.reason.is_none());
    assert!(outcome.notice().is_none());
    assert_eq!(controller.input_text().await, "ERROR nova.compute boom");
    assert_eq!(controller.state().await, LifecycleState::Idle);
}

#[tokio::test]
async fn test_sample_falls_back_to_demo_pool() {
    let backend = Arc::new(ScriptedBackend::default().on_generate(Reply::Status(500)));
    let controller = controller(backend);

    let outcome = controller.request_sample(SampleKind::Random).await.settled().unwrap();

    assert_eq!(outcome.mode, ResultMode::Demo);
    assert_eq!(outcome.reason, Some(DegradedReason::HttpStatus(500)));
    assert!(outcome.notice().is_some());
    assert!(!outcome.text.is_empty());
    assert_eq!(controller.input_text().await, outcome.text);
    assert_eq!(controller.state().await, LifecycleState::Idle);
}

#[tokio::test]
async fn test_health_passes_through() {
    let controller = controller(Arc::new(ScriptedBackend::default()));
    let health = controller.health().await.unwrap();
    assert!(health.is_healthy());
}
