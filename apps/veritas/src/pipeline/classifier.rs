//! # Verdict Classifier
//!
//! Runs the chosen `VerdictStrategy` over an evidence bundle. Never fails:
//! a broken model call becomes a degraded `Not Enough Evidence` verdict.

use crate::collaborators::VerdictModel;
use std::sync::Arc;
use veritas_core::{EvidenceBundle, Verdict, VerdictStrategy, build_verdict_prompt, label_majority};

/// A verdict plus whether the model was asked and answered.
#[derive(Debug, Clone)]
pub struct ClassifyOutcome {
    pub verdict: Verdict,
    pub model_called: bool,
    pub model_failed: bool,
}

pub struct Classifier {
    model: Arc<dyn VerdictModel>,
}

impl Classifier {
    pub fn new(model: Arc<dyn VerdictModel>) -> Self {
        Self { model }
    }

    /// Classify `claim` against `bundle`.
    ///
    /// `label_majority` with no labeled evidence is answered by the model.
    pub async fn classify(
        &self,
        claim: &str,
        bundle: &EvidenceBundle,
        strategy: VerdictStrategy,
        model: &str,
    ) -> Verdict {
        self.classify_detailed(claim, bundle, strategy, model)
            .await
            .verdict
    }

    pub async fn classify_detailed(
        &self,
        claim: &str,
        bundle: &EvidenceBundle,
        strategy: VerdictStrategy,
        model: &str,
    ) -> ClassifyOutcome {
        if strategy == VerdictStrategy::LabelMajority {
            if let Some(verdict) = label_majority(bundle) {
                return ClassifyOutcome {
                    verdict,
                    model_called: false,
                    model_failed: false,
                };
            }
            tracing::info!("No labeled evidence, asking the model instead");
        }

        let prompt = build_verdict_prompt(claim, bundle);
        match self.model.complete(&prompt, model).await {
            Ok(reply) => {
                let verdict = Verdict::from_model_response(&reply);
                if verdict.is_degraded() {
                    tracing::warn!(justification = %verdict.justification, "Unusable model verdict");
                }
                ClassifyOutcome {
                    verdict,
                    model_called: true,
                    model_failed: false,
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Verdict model call failed");
                ClassifyOutcome {
                    verdict: Verdict::degraded(format!("Verdict model unavailable: {e}")),
                    model_called: true,
                    model_failed: true,
                }
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
