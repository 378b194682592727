//! # Evidence Dispatcher
//!
//! Collects evidence for a list of questions from the local engine, the web,
//! or the local engine with a web top-up for thin questions.
//!
//! Per-question work runs concurrently; the bundle always comes back in
//! question order with one entry per question, even when a call failed.

use crate::collaborators::WebSearch;
use crate::error::AppError;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use veritas_core::primitives::MIN_LOCAL_RESULTS;
use veritas_core::{EvidenceBundle, EvidenceResult, QuestionEvidence, RetrievalEngine, RetrievalMethod};

// =============================================================================
// RETRIEVAL MODE
// =============================================================================

/// Where evidence comes from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetrievalMode {
    /// Local corpus only.
    #[default]
    #[serde(alias = "rag")]
    Local,
    /// Web search only.
    #[serde(alias = "web")]
    External,
    /// Local first, web appended for questions with too few local results.
    #[serde(alias = "hybrid")]
    FallbackHybrid,
}

impl RetrievalMode {
    pub const ALL: [RetrievalMode; 3] = [Self::Local, Self::External, Self::FallbackHybrid];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::External => "external",
            Self::FallbackHybrid => "fallback_hybrid",
        }
    }

    /// Whether this mode may call the web search collaborator.
    #[must_use]
    pub const fn uses_web(self) -> bool {
        !matches!(self, Self::Local)
    }
}

impl fmt::Display for RetrievalMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RetrievalMode {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "local" | "rag" => Ok(Self::Local),
            "external" | "web" => Ok(Self::External),
            "fallback_hybrid" | "hybrid" => Ok(Self::FallbackHybrid),
            other => Err(AppError::Config(format!("unknown retrieval mode: {other}"))),
        }
    }
}

// =============================================================================
// OUTCOME
// =============================================================================

/// A bundle plus how many collaborator calls it took.
///
/// Local lexical retrieval is not a collaborator call; semantic and hybrid
/// retrieval are, since they embed the question.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutcome {
    pub bundle: EvidenceBundle,
    pub calls_attempted: usize,
    pub calls_failed: usize,
}

#[derive(Debug, Default)]
struct CallTally {
    attempted: usize,
    failed: usize,
}

impl CallTally {
    fn record(&mut self, ok: bool) {
        self.attempted += 1;
        if !ok {
            self.failed += 1;
        }
    }
}

// =============================================================================
// DISPATCHER
// =============================================================================

pub struct Dispatcher {
    engine: Arc<RetrievalEngine>,
    search: Arc<dyn WebSearch>,
    k: usize,
}

impl Dispatcher {
    /// `k` is the number of local results requested per question.
    pub fn new(engine: Arc<RetrievalEngine>, search: Arc<dyn WebSearch>, k: usize) -> Self {
        Self { engine, search, k }
    }

    #[must_use]
    pub fn engine(&self) -> &Arc<RetrievalEngine> {
        &self.engine
    }

    /// Evidence for `questions`, one entry per question, in question order.
    pub async fn retrieve_evidence(
        &self,
        questions: &[String],
        mode: RetrievalMode,
        method: RetrievalMethod,
    ) -> EvidenceBundle {
        self.dispatch(questions, mode, method).await.bundle
    }

    /// Like `retrieve_evidence`, also reporting collaborator call counts.
    pub async fn dispatch(
        &self,
        questions: &[String],
        mode: RetrievalMode,
        method: RetrievalMethod,
    ) -> DispatchOutcome {
        let mut tally = CallTally::default();

        let groups = match mode {
            RetrievalMode::Local => self.local(questions, method, &mut tally).await,
            RetrievalMode::External => self.web(questions, &mut tally).await,
            RetrievalMode::FallbackHybrid => {
                let mut groups = self.local(questions, method, &mut tally).await;
                let thin: Vec<usize> = groups
                    .iter()
                    .enumerate()
                    .filter(|(_, results)| results.len() < MIN_LOCAL_RESULTS)
                    .map(|(i, _)| i)
                    .collect();
                if !thin.is_empty() {
                    tracing::info!(
                        questions = thin.len(),
                        "Topping up thin local results from the web"
                    );
                    let queries: Vec<String> = thin.iter().map(|&i| questions[i].clone()).collect();
                    let web = self.web(&queries, &mut tally).await;
                    for (i, hits) in thin.into_iter().zip(web) {
                        groups[i].extend(hits);
                    }
                }
                groups
            }
        };

        let bundle = EvidenceBundle::new(
            questions
                .iter()
                .cloned()
                .zip(groups)
                .map(|(question, results)| QuestionEvidence { question, results })
                .collect(),
        );

        DispatchOutcome {
            bundle,
            calls_attempted: tally.attempted,
            calls_failed: tally.failed,
        }
    }

    /// Local retrieval per question, skipping articles an earlier question
    /// already returned.
    async fn local(
        &self,
        questions: &[String],
        method: RetrievalMethod,
        tally: &mut CallTally,
    ) -> Vec<Vec<EvidenceResult>> {
        let k = self.k;
        let tasks = questions.iter().cloned().map(|question| {
            let engine = Arc::clone(&self.engine);
            tokio::task::spawn_blocking(move || engine.retrieve(&question, k, method))
        });
        let outcomes = join_all(tasks).await;

        let embeds = method != RetrievalMethod::Lexical;
        let mut seen: HashSet<String> = HashSet::new();

        outcomes
            .into_iter()
            .zip(questions)
            .map(|(joined, question)| {
                let results = match joined
                    .map_err(AppError::from)
                    .and_then(|r| r.map_err(AppError::from))
                {
                    Ok(results) => {
                        if embeds {
                            tally.record(true);
                        }
                        results
                    }
                    Err(e) => {
                        tracing::warn!(question = %question, error = %e, "Local retrieval failed");
                        if embeds {
                            tally.record(false);
                        }
                        Vec::new()
                    }
                };
                results
                    .into_iter()
                    .filter(|r| seen.insert(r.link.clone()))
                    .collect()
            })
            .collect()
    }

    /// Web search per query; a failed call yields an empty list.
    async fn web(&self, queries: &[String], tally: &mut CallTally) -> Vec<Vec<EvidenceResult>> {
        let calls = queries.iter().map(|query| self.search.search(query));
        join_all(calls)
            .await
            .into_iter()
            .zip(queries)
            .map(|(outcome, query)| match outcome {
                Ok(hits) => {
                    tally.record(true);
                    hits.into_iter().map(EvidenceResult::from).collect()
                }
                Err(e) => {
                    tracing::warn!(query = %query, error = %e, "Web search failed");
                    tally.record(false);
                    Vec::new()
                }
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================
