//! # Configuration
//!
//! `VeritasConfig` is assembled in three layers, later layers winning:
//! 1. an optional TOML file (`--config`, or `veritas.toml` when present)
//! 2. environment variables
//! 3. CLI flags (applied by the `cli` module)
//!
//! ## Environment Variables
//!
//! | Variable | Field |
//! |----------|-------|
//! | `VERITAS_DATA_DIR` | `corpus.data_dir` |
//! | `VERITAS_CACHE_DIR` | `index.cache_dir` (`off` disables the cache) |
//! | `VERITAS_ENCODING_STRATEGY` | `index.strategy` |
//! | `VERITAS_EMBEDDER` | `index.embedder` (`ollama` or `hashing`) |
//! | `VERITAS_EMBED_MODEL` | `index.embed_model` |
//! | `VERITAS_LLM_URL` | `llm.base_url` |
//! | `VERITAS_LLM_MODEL` | `llm.model` |
//! | `GOOGLE_API_KEY` / `GOOGLE_CSE_ID` | `search.api_key` / `search.cse_id` |
//! | `VERITAS_RUN_TIMEOUT_SECS` | `pipeline.run_timeout_secs` |
//! | `VERITAS_CORS_ORIGINS` | `server.cors_origins` |
//! | `VERITAS_RATE_LIMIT` | `server.rate_limit` |
//! | `VERITAS_API_KEY` | `server.api_key` |
//!
//! Unparseable environment values are logged and ignored.

use crate::error::AppError;
use crate::pipeline::RetrievalMode;
use serde::Deserialize;
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use veritas_core::primitives::{
    DEFAULT_K, DEFAULT_K_PER_QUERY, DEFAULT_K_TOTAL, DEFAULT_LEXICAL_WEIGHT, MAX_K,
};
use veritas_core::{EncodingStrategy, RetrievalMethod, VerdictStrategy};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "veritas.toml";

// =============================================================================
// EMBEDDER SELECTION
// =============================================================================

/// Which embedder backs the semantic index.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbedderKind {
    /// Ollama `/api/embed`.
    #[default]
    Ollama,
    /// In-process hashing embedder (offline, deterministic).
    Hashing,
}

impl FromStr for EmbedderKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ollama" => Ok(Self::Ollama),
            "hashing" => Ok(Self::Hashing),
            other => Err(AppError::Config(format!("unknown embedder: {other}"))),
        }
    }
}

// =============================================================================
// SECTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// Root of the dataset layout (`<data_dir>/lupa/lupa_cleaned.jsonl`, ...).
    pub data_dir: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Embedding cache directory; `None` disables caching.
    pub cache_dir: Option<PathBuf>,
    pub strategy: EncodingStrategy,
    pub embedder: EmbedderKind,
    pub embed_model: String,
    /// Vector width of the hashing embedder.
    pub hashing_dimensions: usize,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            cache_dir: Some(PathBuf::from("data/cache")),
            strategy: EncodingStrategy::default(),
            embedder: EmbedderKind::default(),
            embed_model: "nomic-embed-text".to_string(),
            hashing_dimensions: 256,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Results per question in the dispatcher.
    pub k: usize,
    pub k_per_query: usize,
    pub k_total: usize,
    pub lexical_weight: f32,
    pub method: RetrievalMethod,
    pub mode: RetrievalMode,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            k_per_query: DEFAULT_K_PER_QUERY,
            k_total: DEFAULT_K_TOTAL,
            lexical_weight: DEFAULT_LEXICAL_WEIGHT,
            method: RetrievalMethod::default(),
            mode: RetrievalMode::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "llama3.1:8b".to_string(),
            timeout_secs: 120,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub api_key: Option<String>,
    pub cse_id: Option<String>,
    pub num_results: usize,
    pub timeout_secs: u64,
    pub requests_per_second: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            cse_id: None,
            num_results: 5,
            timeout_secs: 10,
            requests_per_second: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strategy: VerdictStrategy,
    pub run_timeout_secs: u64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            strategy: VerdictStrategy::default(),
            run_timeout_secs: 300,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn run_timeout(&self) -> Duration {
        Duration::from_secs(self.run_timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Comma-separated origins, `*` for any; `None` means localhost only.
    pub cors_origins: Option<String>,
    /// Requests per second across all clients; 0 disables limiting.
    pub rate_limit: u32,
    /// Bearer token required on every route except `/health`.
    pub api_key: Option<String>,
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            cors_origins: None,
            rate_limit: 100,
            api_key: None,
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

// =============================================================================
// VERITAS CONFIG
// =============================================================================

/// Complete runtime configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct VeritasConfig {
    pub corpus: CorpusConfig,
    pub index: IndexConfig,
    pub retrieval: RetrievalConfig,
    pub llm: LlmConfig,
    pub search: SearchConfig,
    pub pipeline: PipelineConfig,
    pub server: ServerConfig,
}

impl VeritasConfig {
    /// Load file and environment layers, then validate.
    pub fn load(path: Option<&Path>) -> Result<Self, AppError> {
        let default_file = Path::new(DEFAULT_CONFIG_FILE);
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if default_file.is_file() => Self::from_file(default_file)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML file. Missing sections and fields take their defaults.
    pub fn from_file(path: &Path) -> Result<Self, AppError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, AppError> {
        toml::from_str(text).map_err(|e| AppError::Config(e.to_string()))
    }

    /// Override fields from environment-style lookups.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(dir) = get("VERITAS_DATA_DIR") {
            self.corpus.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = get("VERITAS_CACHE_DIR") {
            self.index.cache_dir = match dir.as_str() {
                "off" | "none" => None,
                _ => Some(PathBuf::from(dir)),
            };
        }
        if let Some(strategy) = parse_env(&get, "VERITAS_ENCODING_STRATEGY") {
            self.index.strategy = strategy;
        }
        if let Some(kind) = parse_env(&get, "VERITAS_EMBEDDER") {
            self.index.embedder = kind;
        }
        if let Some(model) = get("VERITAS_EMBED_MODEL") {
            self.index.embed_model = model;
        }
        if let Some(url) = get("VERITAS_LLM_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = get("VERITAS_LLM_MODEL") {
            self.llm.model = model;
        }
        if let Some(key) = get("GOOGLE_API_KEY") {
            self.search.api_key = Some(key);
        }
        if let Some(cx) = get("GOOGLE_CSE_ID") {
            self.search.cse_id = Some(cx);
        }
        if let Some(secs) = parse_env(&get, "VERITAS_RUN_TIMEOUT_SECS") {
            self.pipeline.run_timeout_secs = secs;
        }
        if let Some(origins) = get("VERITAS_CORS_ORIGINS") {
            self.server.cors_origins = Some(origins);
        }
        if let Some(rps) = parse_env(&get, "VERITAS_RATE_LIMIT") {
            self.server.rate_limit = rps;
        }
        if let Some(key) = get("VERITAS_API_KEY") {
            self.server.api_key = Some(key);
        }
    }

    /// Reject values no component can work with.
    pub fn validate(&self) -> Result<(), AppError> {
        let r = &self.retrieval;
        if !(0.0..=1.0).contains(&r.lexical_weight) {
            return Err(AppError::Config(format!(
                "retrieval.lexical_weight must be within [0, 1], got {}",
                r.lexical_weight
            )));
        }
        for (name, value) in [("k", r.k), ("k_per_query", r.k_per_query), ("k_total", r.k_total)] {
            if value == 0 || value > MAX_K {
                return Err(AppError::Config(format!(
                    "retrieval.{name} must be within 1..={MAX_K}, got {value}"
                )));
            }
        }
        if self.pipeline.run_timeout_secs == 0 {
            return Err(AppError::Config(
                "pipeline.run_timeout_secs must be positive".to_string(),
            ));
        }
        if self.index.embedder == EmbedderKind::Hashing && self.index.hashing_dimensions == 0 {
            return Err(AppError::Config(
                "index.hashing_dimensions must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Whether both Google credentials are present.
    #[must_use]
    pub fn web_search_configured(&self) -> bool {
        self.search.api_key.is_some() && self.search.cse_id.is_some()
    }
}

fn parse_env<T, G>(get: &G, key: &str) -> Option<T>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    let raw = get(key)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!(variable = key, value = %raw, "Ignoring invalid value: {}", e);
            None
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_are_valid() {
        let config = VeritasConfig::default();
        config.validate().expect("valid");
        assert_eq!(config.retrieval.mode, RetrievalMode::Local);
        assert_eq!(config.retrieval.method, RetrievalMethod::Lexical);
        assert_eq!(config.pipeline.strategy, VerdictStrategy::Model);
        assert!(!config.web_search_configured());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = VeritasConfig::from_toml_str(
            r#"
            [retrieval]
            method = "hybrid"
            mode = "fallback_hybrid"
            lexical_weight = 0.3

            [index]
            strategy = "title_label"
            embedder = "hashing"
            "#,
        )
        .expect("parse");
        assert_eq!(config.retrieval.method, RetrievalMethod::Hybrid);
        assert_eq!(config.retrieval.mode, RetrievalMode::FallbackHybrid);
        assert_eq!(config.retrieval.k, DEFAULT_K);
        assert_eq!(config.index.strategy, EncodingStrategy::TitleLabel);
        assert_eq!(config.index.embedder, EmbedderKind::Hashing);
        assert_eq!(config.llm, LlmConfig::default());
    }

    #[test]
    fn unknown_enum_value_in_file_is_an_error() {
        let result = VeritasConfig::from_toml_str("[retrieval]\nmethod = \"fuzzy\"\n");
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn environment_overrides_file() {
        let mut config = VeritasConfig::default();
        config.apply_env(lookup(&[
            ("VERITAS_DATA_DIR", "/srv/corpus"),
            ("VERITAS_CACHE_DIR", "off"),
            ("VERITAS_ENCODING_STRATEGY", "truncate"),
            ("VERITAS_EMBEDDER", "hashing"),
            ("VERITAS_LLM_MODEL", "qwen2.5"),
            ("GOOGLE_API_KEY", "k"),
            ("GOOGLE_CSE_ID", "cx"),
            ("VERITAS_RUN_TIMEOUT_SECS", "42"),
            ("VERITAS_RATE_LIMIT", "7"),
        ]));
        assert_eq!(config.corpus.data_dir, PathBuf::from("/srv/corpus"));
        assert_eq!(config.index.cache_dir, None);
        assert_eq!(config.index.strategy, EncodingStrategy::Truncate);
        assert_eq!(config.index.embedder, EmbedderKind::Hashing);
        assert_eq!(config.llm.model, "qwen2.5");
        assert!(config.web_search_configured());
        assert_eq!(config.pipeline.run_timeout(), Duration::from_secs(42));
        assert_eq!(config.server.rate_limit, 7);
    }

    #[test]
    fn invalid_environment_values_are_ignored() {
        let mut config = VeritasConfig::default();
        config.apply_env(lookup(&[
            ("VERITAS_ENCODING_STRATEGY", "paragraphs"),
            ("VERITAS_RUN_TIMEOUT_SECS", "soon"),
            ("VERITAS_LLM_URL", "   "),
        ]));
        assert_eq!(config, VeritasConfig::default());
    }

    #[test]
    fn validation_rejects_bad_values() {
        let mut config = VeritasConfig::default();
        config.retrieval.lexical_weight = 2.0;
        assert!(config.validate().is_err());

        let mut config = VeritasConfig::default();
        config.retrieval.k_total = 0;
        assert!(config.validate().is_err());

        let mut config = VeritasConfig::default();
        config.pipeline.run_timeout_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let result = VeritasConfig::load(Some(Path::new("/nonexistent/veritas.toml")));
        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
