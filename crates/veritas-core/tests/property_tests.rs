//! # Property-Based Tests
//!
//! Determinism and deduplication invariants checked with proptest.

use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;
use veritas_core::text::tokenize;
use veritas_core::{
    Article, Corpus, HashingEmbedder, RetrievalEngine, RetrievalMethod, RetrievalOptions,
    SourceKey, normalize_label,
};

const WORDS: [&str; 12] = [
    "vacina", "autismo", "eleicao", "urna", "fraude", "chuva", "covid", "mascara", "governo",
    "imposto", "pix", "golpe",
];

fn corpus_from(word_lists: &[Vec<usize>]) -> Corpus {
    Corpus::from_articles(
        word_lists
            .iter()
            .enumerate()
            .map(|(i, words)| {
                let body: Vec<&str> = words.iter().map(|&w| WORDS[w % WORDS.len()]).collect();
                Article::new(format!("https://corpus/{i}"), SourceKey::Lupa, "", body.join(" "))
            })
            .collect(),
    )
}

fn engine(corpus: Corpus) -> RetrievalEngine {
    RetrievalEngine::build(
        corpus,
        Arc::new(HashingEmbedder::new(64)),
        RetrievalOptions::default(),
    )
    .expect("build")
}

fn method_strategy() -> impl Strategy<Value = RetrievalMethod> {
    prop_oneof![
        Just(RetrievalMethod::Lexical),
        Just(RetrievalMethod::Semantic),
        Just(RetrievalMethod::Hybrid),
    ]
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Normalizing a label twice changes nothing.
    #[test]
    fn label_normalization_idempotent(raw in "[ a-zA-ZÀ-ÿ/\t]{0,40}") {
        let once = normalize_label(&raw);
        prop_assert_eq!(normalize_label(&once), once);
    }

    /// Normalized labels never carry outer or doubled whitespace.
    #[test]
    fn normalized_label_whitespace_is_canonical(raw in "[ a-zA-ZÀ-ÿ\t\n]{0,40}") {
        let normalized = normalize_label(&raw);
        prop_assert_eq!(normalized.trim(), normalized.as_str());
        prop_assert!(!normalized.contains("  "));
    }

    /// Tokens are lowercase ASCII alphanumerics of at least two characters.
    #[test]
    fn tokens_are_folded(raw in "\\PC{0,60}") {
        for token in tokenize(&raw) {
            prop_assert!(token.len() >= 2);
            prop_assert!(token.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()));
        }
    }

    /// Multi-query retrieval never returns one article twice.
    #[test]
    fn retrieve_multi_has_no_duplicates(
        docs in vec(vec(0usize..12, 1..8), 1..20),
        queries in vec(vec(0usize..12, 1..4), 1..5),
        k_per_query in 1usize..6,
        k_total in 1usize..10,
        method in method_strategy(),
    ) {
        let engine = engine(corpus_from(&docs));
        let queries: Vec<String> = queries
            .iter()
            .map(|q| q.iter().map(|&w| WORDS[w]).collect::<Vec<_>>().join(" "))
            .collect();

        let results = engine
            .retrieve_multi(&queries, k_per_query, k_total, method)
            .expect("retrieve");

        prop_assert!(results.len() <= k_total);
        let unique: BTreeSet<_> = results.iter().map(|r| r.link.clone()).collect();
        prop_assert_eq!(unique.len(), results.len());
        for pair in results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }

    /// Two engines built from the same corpus rank identically.
    #[test]
    fn rankings_are_deterministic(
        docs in vec(vec(0usize..12, 1..8), 1..20),
        query in vec(0usize..12, 1..4),
        method in method_strategy(),
    ) {
        let query: String = query.iter().map(|&w| WORDS[w]).collect::<Vec<_>>().join(" ");
        let first = engine(corpus_from(&docs)).retrieve(&query, 10, method).expect("retrieve");
        let second = engine(corpus_from(&docs)).retrieve(&query, 10, method).expect("retrieve");

        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            prop_assert_eq!(&a.link, &b.link);
            prop_assert_eq!(a.score.to_bits(), b.score.to_bits());
        }
    }

    /// Single-query results are sorted and strictly positive.
    #[test]
    fn retrieve_orders_by_score(
        docs in vec(vec(0usize..12, 1..8), 1..20),
        query in vec(0usize..12, 1..4),
        k in 0usize..10,
    ) {
        let engine = engine(corpus_from(&docs));
        let query: String = query.iter().map(|&w| WORDS[w]).collect::<Vec<_>>().join(" ");
        let results = engine.retrieve(&query, k, RetrievalMethod::Lexical).expect("retrieve");

        prop_assert!(results.len() <= k);
        prop_assert!(results.iter().all(|r| r.score > 0.0));
        for pair in results.windows(2) {
            prop_assert!(pair[0].score >= pair[1].score);
        }
    }
}
