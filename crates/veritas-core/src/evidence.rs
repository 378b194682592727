//! # Evidence
//!
//! Retrieved evidence as it flows from retrieval to the verdict classifier.

use crate::SourceKey;
use crate::verdict::LabelTone;
use serde::{Deserialize, Serialize};

/// Where a piece of evidence came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EvidenceOrigin {
    Corpus(SourceKey),
    Web,
}

impl EvidenceOrigin {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Corpus(source) => source.name(),
            Self::Web => "web",
        }
    }
}

/// One retrieved result, local or web.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvidenceResult {
    pub title: String,
    pub link: String,
    pub snippet: String,
    pub score: f32,
    #[serde(with = "origin_name")]
    pub source: EvidenceOrigin,
    /// Normalized fact-check label; `None` for web results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Corpus article identifier; `None` for web results.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identifier: Option<String>,
    /// Display badge for the label. Never read by the classifier.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tone: Option<LabelTone>,
}

impl EvidenceResult {
    /// A web search hit. Web results carry no label and a zero score.
    #[must_use]
    pub fn web(title: impl Into<String>, link: impl Into<String>, snippet: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            snippet: snippet.into(),
            score: 0.0,
            source: EvidenceOrigin::Web,
            label: None,
            identifier: None,
            tone: None,
        }
    }

    /// The label, if present and non-empty.
    #[must_use]
    pub fn usable_label(&self) -> Option<&str> {
        self.label.as_deref().filter(|l| !l.is_empty())
    }
}

/// Evidence gathered for one investigative question.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestionEvidence {
    pub question: String,
    pub results: Vec<EvidenceResult>,
}

/// Evidence for every question, in question order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EvidenceBundle {
    pub groups: Vec<QuestionEvidence>,
}

impl EvidenceBundle {
    #[must_use]
    pub fn new(groups: Vec<QuestionEvidence>) -> Self {
        Self { groups }
    }

    /// Total number of results across all questions.
    #[must_use]
    pub fn result_count(&self) -> usize {
        self.groups.iter().map(|g| g.results.len()).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.result_count() == 0
    }

    /// Every result, question by question.
    pub fn results(&self) -> impl Iterator<Item = &EvidenceResult> {
        self.groups.iter().flat_map(|g| g.results.iter())
    }
}

/// Serializes `EvidenceOrigin` as its plain name (`"lupa"`, `"web"`).
mod origin_name {
    use super::EvidenceOrigin;
    use crate::SourceKey;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(origin: &EvidenceOrigin, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(origin.name())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<EvidenceOrigin, D::Error> {
        let name = String::deserialize(d)?;
        if name == "web" {
            return Ok(EvidenceOrigin::Web);
        }
        name.parse::<SourceKey>()
            .map(EvidenceOrigin::Corpus)
            .map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_results_have_no_label() {
        let hit = EvidenceResult::web("t", "https://x", "s");
        assert_eq!(hit.source, EvidenceOrigin::Web);
        assert!(hit.usable_label().is_none());

        let json = serde_json::to_value(&hit).expect("serialize");
        assert_eq!(json["source"], "web");
        assert!(json.get("label").is_none());
    }

    #[test]
    fn corpus_origin_serializes_as_source_name() {
        let result = EvidenceResult {
            title: "t".into(),
            link: "l".into(),
            snippet: "s".into(),
            score: 1.5,
            source: EvidenceOrigin::Corpus(SourceKey::AosFatos),
            label: Some("falso".into()),
            identifier: Some("l".into()),
            tone: Some(LabelTone::FalseLike),
        };
        let json = serde_json::to_string(&result).expect("serialize");
        assert!(json.contains("\"source\":\"aosfatos\""));
        assert!(json.contains("\"tone\":\"false_like\""));
        let back: EvidenceResult = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, result);
    }

    #[test]
    fn empty_label_is_not_usable() {
        let mut hit = EvidenceResult::web("t", "l", "s");
        hit.label = Some(String::new());
        assert!(hit.usable_label().is_none());
    }

    #[test]
    fn bundle_counts_results() {
        let bundle = EvidenceBundle::new(vec![
            QuestionEvidence {
                question: "q1".into(),
                results: vec![EvidenceResult::web("a", "1", "")],
            },
            QuestionEvidence {
                question: "q2".into(),
                results: Vec::new(),
            },
        ]);
        assert_eq!(bundle.result_count(), 1);
        assert!(!bundle.is_empty());
        assert!(EvidenceBundle::default().is_empty());
    }
}
