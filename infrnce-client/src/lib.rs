//! infrnce-client library interface
//!
//! Client-side orchestration for the remote log-classification service:
//! remote boundary, demo-mode fallback and the request lifecycle controller.

pub mod controller;
pub mod fallback;
pub mod remote;

pub use controller::{RequestController, SampleOutcome, Settlement, Submission};
pub use fallback::{FallbackSynthesizer, RequestKind, SampleKind, Synthesized};
pub use remote::{ClassifierBackend, HealthStatus, HttpClassifier, RemoteError};
