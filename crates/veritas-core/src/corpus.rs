//! # Corpus Store
//!
//! Loads the fact-checking datasets into one ordered, immutable sequence of
//! articles.
//!
//! - Sources are JSONL files, one raw record per line
//! - A missing or unreadable source is skipped; the others still load
//! - Malformed lines are dropped and counted in the `LoadReport`
//! - Labels are normalized once, at load time
//!
//! The store does no logging of its own; callers log the returned report.

use crate::text::normalize_label;
use crate::{ArticleId, SourceKey, VeritasError};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::{BufRead, BufReader, ErrorKind};
use std::path::{Path, PathBuf};

// =============================================================================
// ARTICLE
// =============================================================================

/// A normalized fact-checking article.
///
/// `full_text` and `label` are derived at construction and never change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    identifier: String,
    title: String,
    subtitle: String,
    body: String,
    full_text: String,
    label: String,
    source: SourceKey,
    published: String,
    tags: Vec<String>,
}

impl Article {
    /// Create an article with a title and body; the label starts empty.
    #[must_use]
    pub fn new(
        identifier: impl Into<String>,
        source: SourceKey,
        title: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let mut article = Self {
            identifier: identifier.into(),
            title: title.into(),
            subtitle: String::new(),
            body: body.into(),
            full_text: String::new(),
            label: String::new(),
            source,
            published: String::new(),
            tags: Vec::new(),
        };
        article.full_text = article.compose_full_text();
        article
    }

    #[must_use]
    pub fn with_subtitle(mut self, subtitle: impl Into<String>) -> Self {
        self.subtitle = subtitle.into();
        self.full_text = self.compose_full_text();
        self
    }

    /// Attach a raw label; it is normalized here.
    #[must_use]
    pub fn with_label(mut self, raw_label: &str) -> Self {
        self.label = normalize_label(raw_label);
        self
    }

    #[must_use]
    pub fn with_published(mut self, published: impl Into<String>) -> Self {
        self.published = published.into();
        self
    }

    #[must_use]
    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    fn compose_full_text(&self) -> String {
        [&self.title, &self.subtitle, &self.body]
            .into_iter()
            .filter(|part| !part.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn subtitle(&self) -> &str {
        &self.subtitle
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Title, subtitle and body joined by single spaces (empty parts skipped).
    pub fn full_text(&self) -> &str {
        &self.full_text
    }

    /// Normalized label; empty when the source had none.
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn source(&self) -> SourceKey {
        self.source
    }

    pub fn published(&self) -> &str {
        &self.published
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }
}

// =============================================================================
// RAW RECORDS
// =============================================================================

/// One line of a cleaned source file.
///
/// Fields are read leniently: a value of the wrong JSON type counts as
/// absent instead of rejecting the line.
#[derive(Debug, Default, Deserialize)]
struct RawArticle {
    #[serde(default, deserialize_with = "lenient_text")]
    url: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    titulo: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    subtitulo: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    texto: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    classificacao: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    data_publicacao: Option<String>,
    #[serde(default, deserialize_with = "string_elements")]
    tags: Vec<String>,
}

/// Strings pass through, numbers are rendered, anything else is absent.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    })
}

/// The string elements of an array; any other value yields no tags.
fn string_elements<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(tag) => Some(tag),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    })
}

impl RawArticle {
    fn into_article(self, source: SourceKey, line_no: usize) -> Article {
        let identifier = match self.url {
            Some(url) if !url.trim().is_empty() => url,
            _ => format!("{}:{}", source.name(), line_no),
        };
        Article::new(
            identifier,
            source,
            self.titulo.unwrap_or_default(),
            self.texto.unwrap_or_default(),
        )
        .with_subtitle(self.subtitulo.unwrap_or_default())
        .with_label(self.classificacao.as_deref().unwrap_or_default())
        .with_published(self.data_publicacao.unwrap_or_default())
        .with_tags(self.tags)
    }
}

// =============================================================================
// LOAD REPORT
// =============================================================================

/// Outcome of loading one source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SourceStatus {
    /// The file was read; `dropped` lines could not be parsed.
    Loaded { articles: usize, dropped: usize },
    /// The file does not exist.
    Missing,
    /// The file exists but could not be read.
    Unreadable { reason: String },
}

/// Per-source load outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceReport {
    pub source: SourceKey,
    pub path: PathBuf,
    #[serde(flatten)]
    pub status: SourceStatus,
}

/// Summary of a corpus load, for the caller to log.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub sources: Vec<SourceReport>,
}

impl LoadReport {
    /// Articles loaded across all sources.
    #[must_use]
    pub fn total_loaded(&self) -> usize {
        self.sources
            .iter()
            .map(|s| match s.status {
                SourceStatus::Loaded { articles, .. } => articles,
                _ => 0,
            })
            .sum()
    }

    /// Lines dropped across all sources.
    #[must_use]
    pub fn total_dropped(&self) -> usize {
        self.sources
            .iter()
            .map(|s| match s.status {
                SourceStatus::Loaded { dropped, .. } => dropped,
                _ => 0,
            })
            .sum()
    }

    /// Sources that contributed nothing because they were missing or unreadable.
    pub fn skipped(&self) -> impl Iterator<Item = &SourceReport> {
        self.sources
            .iter()
            .filter(|s| !matches!(s.status, SourceStatus::Loaded { .. }))
    }
}

// =============================================================================
// CORPUS
// =============================================================================

/// The in-memory article store, ordered by insertion.
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    articles: Vec<Article>,
}

impl Corpus {
    /// Build a corpus directly from articles (fixtures, tests, pre-loaded data).
    #[must_use]
    pub fn from_articles(articles: Vec<Article>) -> Self {
        Self { articles }
    }

    /// Load every known source from `data_dir` using the fixed dataset layout.
    ///
    /// Returns `VeritasError::EmptyCorpus` if nothing at all could be loaded.
    pub fn load(data_dir: impl AsRef<Path>) -> Result<(Self, LoadReport), VeritasError> {
        let data_dir = data_dir.as_ref();
        let sources: Vec<(SourceKey, PathBuf)> = SourceKey::ALL
            .into_iter()
            .map(|key| (key, data_dir.join(key.relative_path())))
            .collect();
        Self::load_sources(&sources)
    }

    /// Load an explicit list of source files, in order.
    pub fn load_sources(
        sources: &[(SourceKey, PathBuf)],
    ) -> Result<(Self, LoadReport), VeritasError> {
        let mut articles = Vec::new();
        let mut report = LoadReport::default();

        for (source, path) in sources {
            let status = match read_source(*source, path) {
                Ok((loaded, dropped)) => {
                    let count = loaded.len();
                    articles.extend(loaded);
                    SourceStatus::Loaded {
                        articles: count,
                        dropped,
                    }
                }
                Err(SourceError::Missing) => SourceStatus::Missing,
                Err(SourceError::Unreadable(reason)) => SourceStatus::Unreadable { reason },
            };
            report.sources.push(SourceReport {
                source: *source,
                path: path.clone(),
                status,
            });
        }

        if articles.is_empty() {
            return Err(VeritasError::EmptyCorpus);
        }
        Ok((Self { articles }, report))
    }

    /// Number of articles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.articles.len()
    }

    /// Alias of `len`, matching the store's public contract.
    #[must_use]
    pub fn size(&self) -> usize {
        self.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.articles.is_empty()
    }

    /// Article at a corpus position.
    #[must_use]
    pub fn article_at(&self, id: ArticleId) -> Option<&Article> {
        self.articles.get(id.index())
    }

    /// Articles with their positions, in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (ArticleId, &Article)> {
        self.articles
            .iter()
            .enumerate()
            .map(|(i, article)| (ArticleId(i), article))
    }

    /// All articles as a slice, in insertion order.
    #[must_use]
    pub fn articles(&self) -> &[Article] {
        &self.articles
    }
}

enum SourceError {
    Missing,
    Unreadable(String),
}

/// Read one JSONL file. The whole source fails if the file cannot be read;
/// individual unparseable lines are only counted.
fn read_source(source: SourceKey, path: &Path) -> Result<(Vec<Article>, usize), SourceError> {
    let file = File::open(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => SourceError::Missing,
        _ => SourceError::Unreadable(e.to_string()),
    })?;

    let mut articles = Vec::new();
    let mut dropped = 0usize;

    for (line_no, line) in BufReader::new(file).split(b'\n').enumerate() {
        let bytes = line.map_err(|e| SourceError::Unreadable(e.to_string()))?;
        let Ok(text) = std::str::from_utf8(&bytes) else {
            dropped += 1;
            continue;
        };
        let text = text.trim();
        if text.is_empty() {
            continue;
        }
        match serde_json::from_str::<RawArticle>(text) {
            Ok(raw) => articles.push(raw.into_article(source, line_no + 1)),
            Err(_) => dropped += 1,
        }
    }

    Ok((articles, dropped))
}

// =============================================================================
// TESTS
// =============================================================================
