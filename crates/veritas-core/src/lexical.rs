//! # Lexical Index
//!
//! Okapi BM25 over article `full_text`, built once from the corpus.
//!
//! The postings map is a `BTreeMap` so that building the index twice from the
//! same corpus yields the same structure and the same float summation order.

use crate::primitives::{BM25_B, BM25_K1};
use crate::ranking::top_k;
use crate::text::tokenize;
use crate::{Corpus, ScoredArticle};
use std::collections::BTreeMap;

/// One term occurrence count in one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Posting {
    doc: u32,
    tf: u32,
}

/// Inverted index with BM25 scoring.
#[derive(Debug, Clone)]
pub struct LexicalIndex {
    postings: BTreeMap<String, Vec<Posting>>,
    doc_lengths: Vec<u32>,
    avg_doc_length: f32,
}

impl LexicalIndex {
    /// Index every article's `full_text`.
    #[must_use]
    pub fn build(corpus: &Corpus) -> Self {
        let mut postings: BTreeMap<String, Vec<Posting>> = BTreeMap::new();
        let mut doc_lengths = Vec::with_capacity(corpus.len());

        for (id, article) in corpus.iter() {
            let tokens = tokenize(article.full_text());
            doc_lengths.push(tokens.len() as u32);

            let mut counts: BTreeMap<String, u32> = BTreeMap::new();
            for token in tokens {
                *counts.entry(token).or_insert(0) += 1;
            }
            for (term, tf) in counts {
                postings.entry(term).or_default().push(Posting {
                    doc: id.index() as u32,
                    tf,
                });
            }
        }

        let total: u64 = doc_lengths.iter().map(|&l| u64::from(l)).sum();
        let avg_doc_length = if doc_lengths.is_empty() || total == 0 {
            1.0
        } else {
            total as f32 / doc_lengths.len() as f32
        };

        Self {
            postings,
            doc_lengths,
            avg_doc_length,
        }
    }

    /// Number of indexed documents.
    #[must_use]
    pub fn len(&self) -> usize {
        self.doc_lengths.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.doc_lengths.is_empty()
    }

    /// Number of distinct terms.
    #[must_use]
    pub fn vocabulary_size(&self) -> usize {
        self.postings.len()
    }

    /// Non-negative BM25 inverse document frequency.
    fn idf(&self, doc_freq: usize) -> f32 {
        let n = self.doc_lengths.len() as f32;
        let df = doc_freq as f32;
        (1.0 + (n - df + 0.5) / (df + 0.5)).ln()
    }

    /// BM25 score of every document for `query`, indexed by `ArticleId`.
    ///
    /// Repeated query terms contribute once per occurrence.
    #[must_use]
    pub fn scores(&self, query: &str) -> Vec<f32> {
        let mut scores = vec![0.0f32; self.doc_lengths.len()];
        for term in tokenize(query) {
            let Some(list) = self.postings.get(&term) else {
                continue;
            };
            let idf = self.idf(list.len());
            for posting in list {
                let doc = posting.doc as usize;
                let tf = posting.tf as f32;
                let dl = self.doc_lengths[doc] as f32;
                let norm = BM25_K1 * (1.0 - BM25_B + BM25_B * dl / self.avg_doc_length);
                scores[doc] += idf * tf * (BM25_K1 + 1.0) / (tf + norm);
            }
        }
        scores
    }

    /// Top-k articles with a positive score.
    #[must_use]
    pub fn score(&self, query: &str, k: usize) -> Vec<ScoredArticle> {
        top_k(&self.scores(query), k)
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Article, ArticleId, SourceKey};

    fn corpus(texts: &[&str]) -> Corpus {
        Corpus::from_articles(
            texts
                .iter()
                .enumerate()
                .map(|(i, t)| Article::new(format!("u{i}"), SourceKey::Lupa, "", *t))
                .collect(),
        )
    }

    #[test]
    fn matching_article_ranks_first() {
        let index = LexicalIndex::build(&corpus(&[
            "Previsão do tempo: chuva forte em São Paulo",
            "É falso que vacinas causam autismo",
        ]));
        let hits = index.score("vacinas causam autismo", 5);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].article, ArticleId(1));
        assert!(hits[0].score > 0.0);
    }

    #[test]
    fn query_without_usable_tokens_returns_nothing() {
        let index = LexicalIndex::build(&corpus(&["qualquer texto"]));
        assert!(index.score("a e ! ?", 5).is_empty());
        assert!(index.score("", 5).is_empty());
    }

    #[test]
    fn accents_do_not_block_matches() {
        let index = LexicalIndex::build(&corpus(&["Eleição não foi fraudada"]));
        assert_eq!(index.score("eleicao", 1).len(), 1);
    }

    #[test]
    fn equal_documents_tie_by_insertion_order() {
        let index = LexicalIndex::build(&corpus(&["vacina segura", "outro", "vacina segura"]));
        let hits = index.score("vacina", 5);
        let ids: Vec<_> = hits.iter().map(|h| h.article.index()).collect();
        assert_eq!(ids, vec![0, 2]);
        assert_eq!(hits[0].score, hits[1].score);
    }

    #[test]
    fn shorter_document_scores_higher_for_same_tf() {
        let index = LexicalIndex::build(&corpus(&[
            "vacina",
            "vacina com muitas outras palavras que diluem o termo",
        ]));
        let hits = index.score("vacina", 2);
        assert_eq!(hits[0].article, ArticleId(0));
    }

    #[test]
    fn empty_corpus_is_harmless() {
        let index = LexicalIndex::build(&Corpus::default());
        assert!(index.is_empty());
        assert!(index.score("vacina", 3).is_empty());
    }
}
