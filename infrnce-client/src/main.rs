//! infrnce - command-line front end for the log classification service
//!
//! Submits a log line to the remote classifier through the request
//! controller and renders the resulting lifecycle state, including the
//! pipeline journey. When the service is unreachable the output is a clearly
//! labeled demo result.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use infrnce_client::controller::demo_notice;
use infrnce_client::{HttpClassifier, RequestController, SampleKind, Settlement};
use infrnce_common::config::{ClientConfig, ConfigOverrides, DEFAULT_LOG_LEVEL};
use infrnce_common::events::LifecycleState;
use infrnce_common::journey::{classify_journey, Emphasis};
use infrnce_common::ClassificationResult;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, reload, util::SubscriberInitExt};

/// Command-line arguments for infrnce
#[derive(Parser, Debug)]
#[command(name = "infrnce")]
#[command(about = "Classify infrastructure log lines with the Infrnce pipeline")]
#[command(version)]
struct Args {
    /// Classifier service base URL (overrides INFRNCE_API_URL)
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// Per-request timeout in milliseconds (overrides INFRNCE_TIMEOUT_MS)
    #[arg(long, global = true)]
    timeout_ms: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Classify a single log message
    Classify {
        /// Log message text
        text: String,

        /// Print the lifecycle state as JSON
        #[arg(long)]
        json: bool,
    },

    /// Fetch a sample log line
    Sample {
        /// Draw from the synthetic-log pool when the service is offline
        #[arg(long)]
        synthetic: bool,
    },

    /// Show service and model readiness
    Health,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Subscriber goes up before config resolution so its warnings are kept
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().ok();
    let filter_from_env = env_filter.is_some();
    let (filter, filter_handle) =
        reload::Layer::new(env_filter.unwrap_or_else(|| default_filter(DEFAULT_LOG_LEVEL)));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = ClientConfig::resolve(&ConfigOverrides {
        api_url: args.api_url.clone(),
        request_timeout_ms: args.timeout_ms,
    });

    if !filter_from_env {
        if let Err(e) = filter_handle.reload(default_filter(&config.log_level)) {
            warn!(error = %e, level = %config.log_level, "Failed to apply configured log level");
        }
    }

    info!(
        api_url = %config.api_url,
        timeout_ms = config.request_timeout.as_millis() as u64,
        "Configuration resolved"
    );

    let backend = HttpClassifier::new(config.api_url.clone()).context("Failed to build HTTP client")?;
    let controller = RequestController::new(Arc::new(backend), config.request_timeout);

    match args.command {
        Command::Classify { text, json } => classify(&controller, &text, json).await,
        Command::Sample { synthetic } => sample(&controller, synthetic).await,
        Command::Health => health(&controller).await,
    }
}

fn default_filter(level: &str) -> tracing_subscriber::EnvFilter {
    format!("infrnce={level},infrnce_client={level},infrnce_common={level}").into()
}

async fn classify(controller: &RequestController, text: &str, json: bool) -> Result<()> {
    let state = match controller.submit(text).await {
        Settlement::Settled(state) => state,
        Settlement::Superseded => bail!("Submission was superseded"),
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&state).context("Failed to serialize state")?);
    }

    match &state {
        LifecycleState::Success { result } => {
            if !json {
                print_result(result);
            }
        }
        LifecycleState::DegradedSuccess { result, reason } => {
            if let Some(notice) = demo_notice(&state) {
                eprintln!("{} ({})", notice, reason);
            }
            if !json {
                print_result(result);
            }
        }
        LifecycleState::Failed { message } => bail!("{}", message),
        other => bail!("Unexpected lifecycle state: {}", other.label()),
    }

    Ok(())
}

fn print_result(result: &ClassificationResult) {
    println!("Classification Pipeline Journey [{}]", result.mode);
    for classified in classify_journey(result) {
        let marker = match classified.classification.emphasis {
            Emphasis::Primary => '+',
            Emphasis::Warning => '!',
            Emphasis::Neutral => '-',
        };
        println!(
            "  [{}] {:<13} {:<15} {}",
            marker,
            classified.step.stage.display_name(),
            classified.step.status,
            classified.step.details
        );
    }
    println!();
    println!("Final Classification: {}", result.final_category);
    println!(
        "Processed via {} stage in {}ms",
        result.pipeline_stage, result.processing_time_ms
    );
    if let Some(confidence) = result.final_confidence {
        println!("Confidence: {:.3}", confidence);
    }
}

async fn sample(controller: &RequestController, synthetic: bool) -> Result<()> {
    let kind = if synthetic { SampleKind::Synthetic } else { SampleKind::Random };

    let outcome = match controller.request_sample(kind).await {
        Settlement::Settled(outcome) => outcome,
        Settlement::Superseded => bail!("Sample request was superseded"),
    };

    if let (Some(notice), Some(reason)) = (outcome.notice(), &outcome.reason) {
        eprintln!("{} ({})", notice, reason);
    }
    println!("{}", controller.input_text().await);
    Ok(())
}

async fn health(controller: &RequestController) -> Result<()> {
    let health = controller.health().await.context("Health check failed")?;

    println!("Status: {}", health.status);
    println!("Classifier ready: {}", health.classifier_ready);
    println!("  Regex patterns: {}", health.models_loaded.regex_patterns);
    println!("  BERT model:     {}", health.models_loaded.bert_model);
    println!("  LLM client:     {}", health.models_loaded.llm_client);

    if !health.is_healthy() {
        bail!("Classifier service is not ready");
    }
    Ok(())
}
