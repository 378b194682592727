//! # Verdict
//!
//! Pure parts of verdict classification:
//! - the label-majority vote over corpus labels
//! - the verdict prompt sent to the language model
//! - lenient parsing of the model's JSON answer
//!
//! Calling the model and choosing between strategies happens in the app.
//! Nothing here fails: unusable input degrades to `Not Enough Evidence`.

use crate::VeritasError;
use crate::evidence::EvidenceBundle;
use crate::text::normalize_label;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

// =============================================================================
// LABEL SETS
// =============================================================================

/// Normalized labels meaning the checked statement is false.
pub const FALSE_LABELS: [&str; 18] = [
    "falso",
    "fake",
    "enganoso",
    "distorcido",
    "golpe",
    "manipulado",
    "boato",
    "nao e verdade",
    "impreciso",
    "exagerado",
    "insustentavel",
    "sem evidencia",
    "sem contexto",
    "descontextualizado",
    "alterado",
    "nao ha evidencias",
    "nao e bem assim",
    "falso/enganoso",
];

/// Normalized labels meaning the checked statement is true.
pub const TRUE_LABELS: [&str; 8] = [
    "verdadeiro",
    "fato",
    "verdade",
    "correto",
    "real",
    "comprovado",
    "confirmado",
    "ainda e verdade",
];

// =============================================================================
// CLASSIFICATION
// =============================================================================

/// The four allowed verdict classes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[serde(rename = "Supported")]
    Supported,
    #[serde(rename = "Refuted")]
    Refuted,
    #[serde(rename = "Not Enough Evidence")]
    NotEnoughEvidence,
    #[serde(rename = "Conflicting Evidence/Cherry-picking")]
    ConflictingEvidence,
}

impl Classification {
    pub const ALL: [Classification; 4] = [
        Self::Supported,
        Self::Refuted,
        Self::NotEnoughEvidence,
        Self::ConflictingEvidence,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Supported => "Supported",
            Self::Refuted => "Refuted",
            Self::NotEnoughEvidence => "Not Enough Evidence",
            Self::ConflictingEvidence => "Conflicting Evidence/Cherry-picking",
        }
    }

    /// Case-insensitive match; `Conflicting` alone is accepted as shorthand.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Option<Self> {
        let wanted = raw.trim();
        if wanted.eq_ignore_ascii_case("conflicting") {
            return Some(Self::ConflictingEvidence);
        }
        Self::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// STRATEGY
// =============================================================================

/// How a verdict is reached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VerdictStrategy {
    /// Ask the language model.
    #[default]
    Model,
    /// Vote over corpus labels.
    LabelMajority,
}

impl VerdictStrategy {
    pub const ALL: [VerdictStrategy; 2] = [Self::Model, Self::LabelMajority];

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::LabelMajority => "label_majority",
        }
    }
}

impl fmt::Display for VerdictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for VerdictStrategy {
    type Err = VeritasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|strategy| strategy.name() == s)
            .ok_or_else(|| VeritasError::InvalidArgument(format!("unknown verdict strategy: {s}")))
    }
}

// =============================================================================
// VERDICT
// =============================================================================

/// Final judgement on a claim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Verdict {
    pub classification: Classification,
    /// 0 to 100, one decimal.
    pub confidence: f32,
    pub justification: String,
    pub strategy: VerdictStrategy,
    /// Count per normalized label; label-majority only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_breakdown: Option<BTreeMap<String, usize>>,
}

impl Verdict {
    /// The fallback verdict: `Not Enough Evidence`, confidence 0.
    #[must_use]
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self {
            classification: Classification::NotEnoughEvidence,
            confidence: 0.0,
            justification: reason.into(),
            strategy: VerdictStrategy::Model,
            label_breakdown: None,
        }
    }

    /// Whether this is a fallback verdict with no usable model output.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.strategy == VerdictStrategy::Model
            && self.classification == Classification::NotEnoughEvidence
            && self.confidence == 0.0
    }

    /// Interpret a raw model reply.
    ///
    /// The outermost `{...}` span is parsed as JSON. An unknown
    /// classification or unparseable reply yields `Verdict::degraded`.
    #[must_use]
    pub fn from_model_response(raw: &str) -> Self {
        let Some(span) = outer_json_span(raw) else {
            return Self::degraded("Model reply contained no JSON object");
        };
        let value: serde_json::Value = match serde_json::from_str(span) {
            Ok(value) => value,
            Err(e) => return Self::degraded(format!("Model reply was not valid JSON: {e}")),
        };

        let raw_class = value
            .get("classification")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default();
        let Some(classification) = Classification::parse_lenient(raw_class) else {
            return Self::degraded(format!("Model returned unknown classification {raw_class:?}"));
        };

        let confidence = value
            .get("confidence")
            .and_then(parse_confidence)
            .unwrap_or(0.0);
        let justification = value
            .get("justification")
            .and_then(serde_json::Value::as_str)
            .unwrap_or_default()
            .trim()
            .to_string();

        Self {
            classification,
            confidence: round_one_decimal(confidence.clamp(0.0, 100.0)),
            justification,
            strategy: VerdictStrategy::Model,
            label_breakdown: None,
        }
    }
}

/// Greedy `{...}` span of a model reply: first `{` through last `}`.
#[must_use]
pub fn outer_json_span(raw: &str) -> Option<&str> {
    let start = raw.find('{')?;
    let end = raw.rfind('}')?;
    (end > start).then(|| &raw[start..=end])
}

/// A number, or a numeric string with an optional trailing `%`.
fn parse_confidence(value: &serde_json::Value) -> Option<f32> {
    let parsed = match value {
        serde_json::Value::Number(n) => n.as_f64()? as f32,
        serde_json::Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok()?,
        _ => return None,
    };
    parsed.is_finite().then_some(parsed)
}

fn round_one_decimal(value: f32) -> f32 {
    (value * 10.0).round() / 10.0
}

// =============================================================================
// LABEL MAJORITY
// =============================================================================

/// Vote over the labels carried by the evidence.
///
/// Returns `None` when no result carries a label, so the caller can fall back
/// to the model strategy.
#[must_use]
pub fn label_majority(bundle: &EvidenceBundle) -> Option<Verdict> {
    let mut breakdown: BTreeMap<String, usize> = BTreeMap::new();
    let mut false_count = 0usize;
    let mut true_count = 0usize;

    for label in bundle.results().filter_map(|r| r.usable_label()) {
        let label = normalize_label(label);
        if FALSE_LABELS.contains(&label.as_str()) {
            false_count += 1;
        } else if TRUE_LABELS.contains(&label.as_str()) {
            true_count += 1;
        }
        *breakdown.entry(label).or_insert(0) += 1;
    }

    if breakdown.is_empty() {
        return None;
    }

    let decided = false_count + true_count;
    let (classification, confidence, justification) = if false_count > true_count {
        (
            Classification::Refuted,
            percent(false_count, decided),
            format!("{false_count} of {decided} decisive fact-checks rate it false."),
        )
    } else if true_count > false_count {
        (
            Classification::Supported,
            percent(true_count, decided),
            format!("{true_count} of {decided} decisive fact-checks rate it true."),
        )
    } else {
        (
            Classification::NotEnoughEvidence,
            0.0,
            format!("No majority: {false_count} false, {true_count} true."),
        )
    };

    Some(Verdict {
        classification,
        confidence,
        justification,
        strategy: VerdictStrategy::LabelMajority,
        label_breakdown: Some(breakdown),
    })
}

fn percent(part: usize, whole: usize) -> f32 {
    if whole == 0 {
        return 0.0;
    }
    round_one_decimal(part as f32 / whole as f32 * 100.0)
}

// =============================================================================
// PROMPT
// =============================================================================

/// Build the verdict prompt for `claim` over `bundle`.
#[must_use]
pub fn build_verdict_prompt(claim: &str, bundle: &EvidenceBundle) -> String {
    let mut prompt = String::from(
        "You are an academic fact-checking system. Decide whether the CLAIM below is \
         supported or refuted by the evidence.\n\n\
         Read the claim literally, including any negation:\n\
         - \"Vacinas NÃO causam autismo\": if the evidence says it is FALSE that vaccines \
         cause autism, the claim is Supported.\n\
         - \"Vacinas causam autismo\": with the same evidence, the claim is Refuted.\n\
         Fact-check labels such as \"falso\" describe the rumour that was checked, not \
         necessarily the claim you are judging.\n\n",
    );
    prompt.push_str(&format!("Claim: \"{}\"\n\nEvidence:\n", claim.trim()));

    if bundle.is_empty() {
        prompt.push_str("(no evidence found)\n");
    }
    for group in bundle.groups.iter().filter(|g| !g.results.is_empty()) {
        prompt.push_str(&format!("\nQuestion: {}\n", group.question));
        for (i, result) in group.results.iter().enumerate() {
            prompt.push_str(&format!(
                "{}. [{}] {}\n",
                i + 1,
                result.source.name(),
                result.title
            ));
            if let Some(label) = result.usable_label() {
                prompt.push_str(&format!("   label: {label}\n"));
            }
            if !result.snippet.is_empty() {
                prompt.push_str(&format!("   {}\n", result.snippet));
            }
            if !result.link.is_empty() {
                prompt.push_str(&format!("   {}\n", result.link));
            }
        }
    }

    prompt.push_str("\nAllowed classifications:\n");
    for class in Classification::ALL {
        prompt.push_str(&format!("- {}\n", class.as_str()));
    }
    prompt.push_str(
        "\nAnswer with JSON only, no other text:\n\
         {\"classification\": \"<one of the above>\", \
         \"justification\": \"<short explanation>\", \
         \"confidence\": <0-100>}\n",
    );
    prompt
}

// =============================================================================
// DISPLAY BADGES
// =============================================================================

/// Coarse tone of a label, for rendering only. The classifier never uses it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelTone {
    FalseLike,
    TrueLike,
    Neutral,
}

impl LabelTone {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::FalseLike => "false-like",
            Self::TrueLike => "true-like",
            Self::Neutral => "neutral",
        }
    }

    #[must_use]
    pub fn of(label: &str) -> Self {
        let label = normalize_label(label);
        const FALSE_MARKERS: [&str; 8] = [
            "fals", "engan", "fake", "boato", "golpe", "distorc", "manipul", "nao e",
        ];
        const TRUE_MARKERS: [&str; 5] = ["verdad", "correto", "fato", "comprov", "confirm"];
        if FALSE_MARKERS.iter().any(|m| label.contains(m)) {
            Self::FalseLike
        } else if TRUE_MARKERS.iter().any(|m| label.contains(m)) {
            Self::TrueLike
        } else {
            Self::Neutral
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
