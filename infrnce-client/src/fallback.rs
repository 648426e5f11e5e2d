//! Demo-mode fallback synthesizer
//!
//! Produces a clearly-labeled substitute whenever the live service cannot
//! deliver a validated answer. Everything comes from fixed built-in pools, so
//! synthesis cannot fail. Every synthesized result carries `mode = Demo`.

use infrnce_common::{ClassificationResult, JourneyStep, PipelineStage, ResultMode, StepStatus};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

/// Shown alongside a synthesized classification
pub const DEMO_CLASSIFY_NOTICE: &str =
    "Demo mode: Using mock classification result. Please ensure the API is running for live classification.";

/// Shown alongside a synthesized sample log
pub const DEMO_SAMPLE_NOTICE: &str =
    "Demo mode: Using sample log data. Please ensure the API is running for live data.";

/// Which sample pool to draw from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleKind {
    /// A representative log line
    Random,
    /// An AI-generated style log line
    Synthetic,
}

/// What the caller was trying to do when the live call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    Classify,
    GenerateSample(SampleKind),
}

/// A synthesized substitute
#[derive(Debug, Clone, PartialEq)]
pub enum Synthesized {
    Result(ClassificationResult),
    Sample(String),
}

struct DemoStep {
    stage: PipelineStage,
    status: StepStatus,
    details: &'static str,
}

struct DemoResult {
    final_category: &'static str,
    pipeline_stage: PipelineStage,
    processing_time_ms: u64,
    final_confidence: f64,
    journey: &'static [DemoStep],
}

const CLASSIFY_POOL: &[DemoResult] = &[
    DemoResult {
        final_category: "Network_Connection_Errors",
        pipeline_stage: PipelineStage::Llm,
        processing_time_ms: 150,
        final_confidence: 0.82,
        journey: &[
            DemoStep {
                stage: PipelineStage::Regex,
                status: StepStatus::Skipped,
                details: "No pattern matched.",
            },
            DemoStep {
                stage: PipelineStage::Bert,
                status: StepStatus::LowConfidence,
                details: "Confidence was 0.65, below the 0.7 threshold.",
            },
            DemoStep {
                stage: PipelineStage::Llm,
                status: StepStatus::Classified,
                details: "Classified into 1 of 11 enhanced categories.",
            },
        ],
    },
    DemoResult {
        final_category: "Config_Error",
        pipeline_stage: PipelineStage::Regex,
        processing_time_ms: 2,
        final_confidence: 1.0,
        journey: &[DemoStep {
            stage: PipelineStage::Regex,
            status: StepStatus::Matched,
            details: "Matched pattern for Config_Error",
        }],
    },
    DemoResult {
        final_category: "Authentication_Failure",
        pipeline_stage: PipelineStage::Bert,
        processing_time_ms: 48,
        final_confidence: 0.91,
        journey: &[
            DemoStep {
                stage: PipelineStage::Regex,
                status: StepStatus::Skipped,
                details: "No pattern matched.",
            },
            DemoStep {
                stage: PipelineStage::Bert,
                status: StepStatus::Classified,
                details: "High confidence classification: 0.910",
            },
        ],
    },
    DemoResult {
        final_category: "Resource_Exhaustion",
        pipeline_stage: PipelineStage::Llm,
        processing_time_ms: 212,
        final_confidence: 0.77,
        journey: &[
            DemoStep {
                stage: PipelineStage::Regex,
                status: StepStatus::Skipped,
                details: "No pattern matched.",
            },
            DemoStep {
                stage: PipelineStage::Bert,
                status: StepStatus::LowConfidence,
                details: "Confidence was 0.312, below the 0.4 threshold.",
            },
            DemoStep {
                stage: PipelineStage::Llm,
                status: StepStatus::Classified,
                details: "Classified into 1 of 11 enhanced categories. Memory pressure on cache node.",
            },
        ],
    },
];

const RANDOM_LOG_POOL: &[&str] = &[
    "ERROR 2024-01-15 14:23:01 [DatabaseConnection] Connection timeout after 30 seconds to database server mysql://prod-db:3306",
    "WARN 2024-01-15 14:23:02 [AuthService] Failed login attempt for user admin@company.com from IP 192.168.1.100",
    "INFO 2024-01-15 14:23:03 [APIGateway] Rate limit exceeded for endpoint /api/users - 1000 requests in 60 seconds",
];

const SYNTHETIC_LOG_POOL: &[&str] = &[
    "ERROR 2024-01-15 09:15:42 [LoadBalancer] Upstream server nginx-web-01:8080 failed health check - response time exceeded 5000ms",
    "CRITICAL 2024-01-15 09:15:43 [KubernetesController] Pod web-deployment-7b4f9d8c6-xk2m4 in namespace production failed to start - ImagePullBackOff",
    "WARN 2024-01-15 09:15:44 [RedisCluster] Memory usage at 85% capacity on node redis-cluster-0 - consider scaling up",
];

impl DemoResult {
    fn to_result(&self) -> ClassificationResult {
        ClassificationResult {
            final_category: self.final_category.to_string(),
            pipeline_stage: self.pipeline_stage,
            processing_time_ms: self.processing_time_ms,
            journey: self
                .journey
                .iter()
                .map(|step| JourneyStep::new(step.stage, step.status, step.details))
                .collect(),
            mode: ResultMode::Demo,
            final_confidence: Some(self.final_confidence),
            log_analyzed: None,
        }
    }
}

/// Demo-mode substitute generator
pub struct FallbackSynthesizer {
    rng: Mutex<StdRng>,
}

impl FallbackSynthesizer {
    /// Pseudo-random selection seeded from OS entropy
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic selection for a given seed
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Produce a substitute for the given request kind; never fails
    pub fn synthesize(&self, kind: RequestKind) -> Synthesized {
        match kind {
            RequestKind::Classify => Synthesized::Result(self.classification()),
            RequestKind::GenerateSample(sample_kind) => Synthesized::Sample(self.sample(sample_kind)),
        }
    }

    /// A demo classification result from the built-in pool
    pub fn classification(&self) -> ClassificationResult {
        CLASSIFY_POOL[self.pick(CLASSIFY_POOL.len())].to_result()
    }

    /// A demo log line from the pool matching `kind`
    pub fn sample(&self, kind: SampleKind) -> String {
        let pool = match kind {
            SampleKind::Random => RANDOM_LOG_POOL,
            SampleKind::Synthetic => SYNTHETIC_LOG_POOL,
        };
        pool[self.pick(pool.len())].to_string()
    }

    fn pick(&self, len: usize) -> usize {
        // Generator state stays valid even if a holder panicked
        let mut rng = self.rng.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        rng.gen_range(0..len)
    }
}

impl Default for FallbackSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}
