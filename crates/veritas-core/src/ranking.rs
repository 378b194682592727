//! # Ranking
//!
//! Turns a dense per-article score vector into an ordered top-k list.
//!
//! Ordering is total and deterministic: descending score, then ascending
//! `ArticleId`. Only strictly positive, finite scores are kept.

use crate::{ArticleId, ScoredArticle};
use std::cmp::Ordering;

/// Rank the positive entries of `scores` and keep at most `k`.
#[must_use]
pub fn top_k(scores: &[f32], k: usize) -> Vec<ScoredArticle> {
    if k == 0 {
        return Vec::new();
    }
    let mut ranked: Vec<ScoredArticle> = scores
        .iter()
        .enumerate()
        .filter(|(_, s)| s.is_finite() && **s > 0.0)
        .map(|(i, s)| ScoredArticle::new(ArticleId(i), *s))
        .collect();
    ranked.sort_by(by_score_then_id);
    ranked.truncate(k);
    ranked
}

/// Descending score, ties broken by insertion order.
pub fn by_score_then_id(a: &ScoredArticle, b: &ScoredArticle) -> Ordering {
    b.score
        .total_cmp(&a.score)
        .then_with(|| a.article.cmp(&b.article))
}

/// Min-max normalize a score vector into `[0, 1]`.
///
/// A constant vector maps to all ones when its value is positive and to all
/// zeros otherwise.
#[must_use]
pub fn min_max_normalize(scores: &[f32]) -> Vec<f32> {
    let Some(first) = scores.first().copied() else {
        return Vec::new();
    };
    let (min, max) = scores
        .iter()
        .fold((first, first), |(lo, hi), &s| (lo.min(s), hi.max(s)));
    let range = max - min;
    if range <= f32::EPSILON {
        let fill = if max > 0.0 { 1.0 } else { 0.0 };
        return vec![fill; scores.len()];
    }
    scores.iter().map(|s| (s - min) / range).collect()
}
