//! # Claim Run
//!
//! One claim end to end: questions, evidence, verdict. Progress is reported
//! as a finite stream of `RunEvent`s that always ends in exactly one
//! `Completed` or `Failed`, unless the consumer drops the stream first.

use super::classifier::Classifier;
use super::dispatcher::{Dispatcher, RetrievalMode};
use crate::collaborators::QuestionGenerator;
use crate::error::AppError;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use veritas_core::{EvidenceBundle, RetrievalMethod, Verdict, VerdictStrategy};

/// Stage events buffered ahead of a slow consumer.
const EVENT_BUFFER: usize = 16;

// =============================================================================
// OPTIONS AND EVENTS
// =============================================================================

/// Per-run choices.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub mode: RetrievalMode,
    pub strategy: VerdictStrategy,
    pub method: RetrievalMethod,
    /// Model name passed to the question generator and verdict model.
    pub model: String,
    /// Deadline for the whole run.
    pub timeout: Duration,
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub claim: String,
    pub questions: Vec<String>,
    pub evidence: EvidenceBundle,
    pub verdict: Verdict,
    pub mode: RetrievalMode,
    pub strategy: VerdictStrategy,
    pub retrieval_method: RetrievalMethod,
    pub model: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    Stage { message: String },
    Completed(Box<RunReport>),
    Failed { reason: String },
}

impl RunEvent {
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Stage { .. })
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

pub struct Pipeline {
    questions: Arc<dyn QuestionGenerator>,
    dispatcher: Dispatcher,
    classifier: Classifier,
}

impl Pipeline {
    pub fn new(
        questions: Arc<dyn QuestionGenerator>,
        dispatcher: Dispatcher,
        classifier: Classifier,
    ) -> Self {
        Self {
            questions,
            dispatcher,
            classifier,
        }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Start a run in the background and return its event stream.
    ///
    /// Dropping the stream stops the run at its next await point.
    pub fn run_claim(self: &Arc<Self>, claim: String, options: RunOptions) -> ReceiverStream<RunEvent> {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let pipeline = Arc::clone(self);

        tokio::spawn(async move {
            let deadline = options.timeout;
            let terminal = tokio::select! {
                outcome = tokio::time::timeout(deadline, pipeline.execute(&claim, &options, &tx)) => {
                    match outcome {
                        Ok(event) => event,
                        Err(_) => {
                            tracing::warn!(timeout_secs = deadline.as_secs(), "Run deadline exceeded");
                            RunEvent::Failed {
                                reason: format!("Run exceeded its {}s deadline", deadline.as_secs()),
                            }
                        }
                    }
                }
                () = tx.closed() => {
                    tracing::info!("Consumer went away, abandoning run");
                    return;
                }
            };
            if tx.send(terminal).await.is_err() {
                tracing::debug!("Consumer went away before the result");
            }
        });

        ReceiverStream::new(rx)
    }

    /// Run to the end and return the report; a `Failed` run is an error.
    pub async fn run_to_completion(
        self: &Arc<Self>,
        claim: String,
        options: RunOptions,
    ) -> Result<RunReport, AppError> {
        let mut events = self.run_claim(claim, options);
        while let Some(event) = events.next().await {
            match event {
                RunEvent::Stage { .. } => {}
                RunEvent::Completed(report) => return Ok(*report),
                RunEvent::Failed { reason } => return Err(AppError::Collaborator(reason)),
            }
        }
        Err(AppError::Task("run ended without a result".to_string()))
    }

    async fn execute(
        &self,
        claim: &str,
        options: &RunOptions,
        tx: &mpsc::Sender<RunEvent>,
    ) -> RunEvent {
        let mut attempted = 0usize;
        let mut failed = 0usize;

        stage(tx, "Starting analysis").await;

        attempted += 1;
        let questions = match self.questions.generate(claim, &options.model).await {
            Ok(questions) if !questions.is_empty() => questions,
            Ok(_) => {
                tracing::warn!("Question generator returned nothing, using the claim itself");
                vec![claim.to_string()]
            }
            Err(e) => {
                tracing::warn!(error = %e, "Question generation failed, using the claim itself");
                failed += 1;
                vec![claim.to_string()]
            }
        };
        stage(tx, format!("Generated {} questions", questions.len())).await;

        stage(
            tx,
            format!("Retrieving evidence (mode: {}, method: {})", options.mode, options.method),
        )
        .await;
        let dispatched = self
            .dispatcher
            .dispatch(&questions, options.mode, options.method)
            .await;
        attempted += dispatched.calls_attempted;
        failed += dispatched.calls_failed;
        let evidence = dispatched.bundle;
        stage(tx, format!("Collected {} evidence results", evidence.result_count())).await;

        stage(tx, format!("Classifying (strategy: {})", options.strategy)).await;
        let classified = self
            .classifier
            .classify_detailed(claim, &evidence, options.strategy, &options.model)
            .await;
        if classified.model_called {
            attempted += 1;
            if classified.model_failed {
                failed += 1;
            }
        }
        let verdict = classified.verdict;
        stage(
            tx,
            format!("Verdict: {} ({}%)", verdict.classification, verdict.confidence),
        )
        .await;

        if failed == attempted && verdict.is_degraded() {
            tracing::error!(calls = attempted, "Every collaborator call failed");
            return RunEvent::Failed {
                reason: format!("All {attempted} collaborator calls failed"),
            };
        }

        tracing::info!(
            questions = questions.len(),
            evidence = evidence.result_count(),
            classification = %verdict.classification,
            confidence = verdict.confidence,
            "Claim analyzed"
        );

        RunEvent::Completed(Box::new(RunReport {
            claim: claim.to_string(),
            questions,
            evidence,
            verdict,
            mode: options.mode,
            strategy: options.strategy,
            retrieval_method: options.method,
            model: options.model.clone(),
        }))
    }
}

async fn stage(tx: &mpsc::Sender<RunEvent>, message: impl Into<String>) {
    let message = message.into();
    tracing::debug!(stage = %message);
    // A closed channel is noticed by the select in `run_claim`.
    let _ = tx.send(RunEvent::Stage { message }).await;
}

// =============================================================================
// TESTS
// =============================================================================
