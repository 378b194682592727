//! # Collaborators
//!
//! External services the pipeline talks to, behind traits so tests can swap
//! in fakes:
//! - `QuestionGenerator`: claim -> investigative questions
//! - `WebSearch`: query -> web hits
//! - `VerdictModel`: prompt -> raw model reply
//!
//! Production implementations live in `ollama` (text generation and
//! embeddings) and `google` (Custom Search).

pub mod google;
pub mod ollama;

use crate::error::AppError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use veritas_core::{EvidenceResult, outer_json_span};

pub use google::{DisabledSearch, GoogleSearch};
pub use ollama::{OllamaClient, OllamaEmbedder};

/// Upper bound on generated questions per claim.
pub const MAX_QUESTIONS: usize = 5;

// =============================================================================
// TRAITS
// =============================================================================

/// Turns a claim into a handful of short investigative questions.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, claim: &str, model: &str) -> Result<Vec<String>, AppError>;
}

/// Web search backend.
#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<WebHit>, AppError>;
}

/// Free-text completion used for the verdict.
#[async_trait]
pub trait VerdictModel: Send + Sync {
    async fn complete(&self, prompt: &str, model: &str) -> Result<String, AppError>;
}

// =============================================================================
// WEB HIT
// =============================================================================

/// One web search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebHit {
    pub title: String,
    pub link: String,
    pub snippet: String,
}

impl From<WebHit> for EvidenceResult {
    fn from(hit: WebHit) -> Self {
        EvidenceResult::web(hit.title, hit.link, hit.snippet)
    }
}

// =============================================================================
// REPLY PARSING
// =============================================================================

/// Extract questions from a model reply.
///
/// Accepts `{"questions": [...]}`, a bare JSON array, or any JSON object
/// (its string values are taken). Anything else is split into lines, with
/// bullet characters stripped and lines of three characters or fewer dropped.
#[must_use]
pub fn parse_questions(raw: &str) -> Vec<String> {
    let trimmed = raw.trim();
    let candidate = outer_json_span(trimmed).unwrap_or(trimmed);

    let parsed: Option<Vec<String>> = match serde_json::from_str::<serde_json::Value>(candidate) {
        Ok(serde_json::Value::Object(map)) => Some(match map.get("questions") {
            Some(value) => strings_in(value),
            None => map.values().flat_map(strings_in).collect(),
        }),
        Ok(value @ serde_json::Value::Array(_)) => Some(strings_in(&value)),
        _ => None,
    };

    let questions = parsed.unwrap_or_else(|| {
        trimmed
            .lines()
            .filter(|line| line.trim().chars().count() > 3)
            .map(|line| line.trim_matches(|c| c == '-' || c == '•' || c == ' ').to_string())
            .collect()
    });

    questions
        .into_iter()
        .map(|q| q.trim().to_string())
        .filter(|q| !q.is_empty())
        .take(MAX_QUESTIONS)
        .collect()
}

fn strings_in(value: &serde_json::Value) -> Vec<String> {
    match value {
        serde_json::Value::String(s) => vec![s.clone()],
        serde_json::Value::Array(items) => items
            .iter()
            .filter_map(|item| item.as_str().map(str::to_string))
            .collect(),
        _ => Vec::new(),
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn questions_object_with_surrounding_text() {
        let raw = "Claro! Aqui estão:\n{\"questions\": [\"A vacina foi testada?\", \"Há estudos?\"]}\nFim.";
        assert_eq!(
            parse_questions(raw),
            vec!["A vacina foi testada?", "Há estudos?"]
        );
    }

    #[test]
    fn bare_array() {
        assert_eq!(parse_questions("[\"Quem disse?\", \"Quando?\"]"), vec![
            "Quem disse?",
            "Quando?"
        ]);
    }

    #[test]
    fn object_without_questions_key_uses_values() {
        let questions = parse_questions("{\"q1\": \"Primeira pergunta\", \"q2\": \"Segunda pergunta\"}");
        assert_eq!(questions.len(), 2);
        assert!(questions.contains(&"Primeira pergunta".to_string()));
    }

    #[test]
    fn plain_lines_fallback() {
        let raw = "- Quem publicou o estudo?\n• Qual a fonte?\nok\n\n";
        assert_eq!(
            parse_questions(raw),
            vec!["Quem publicou o estudo?", "Qual a fonte?"]
        );
    }

    #[test]
    fn caps_at_five() {
        let raw = (1..=8)
            .map(|i| format!("Pergunta numero {i}"))
            .collect::<Vec<_>>()
            .join("\n");
        assert_eq!(parse_questions(&raw).len(), MAX_QUESTIONS);
    }

    #[test]
    fn empty_reply_gives_nothing() {
        assert!(parse_questions("").is_empty());
        assert!(parse_questions("{\"questions\": []}").is_empty());
    }

    #[test]
    fn questions_inside_prose_are_found() {
        let reply = "Claro! {\"questions\": [\"Quem disse isso?\"]} Espero ter ajudado.";
        assert_eq!(parse_questions(reply), vec!["Quem disse isso?".to_string()]);
    }

    #[test]
    fn web_hit_becomes_unlabeled_evidence() {
        let result: EvidenceResult = WebHit {
            title: "T".to_string(),
            link: "https://example.org".to_string(),
            snippet: "S".to_string(),
        }
        .into();
        assert_eq!(result.label, None);
        assert_eq!(result.link, "https://example.org");
    }
}
