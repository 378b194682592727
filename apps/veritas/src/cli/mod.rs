//! # Veritas CLI Module
//!
//! This module implements the CLI interface for Veritas.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `index` - Build (or warm) the indices and print the build report
//! - `search` - Multi-query retrieval over the local corpus
//! - `verify` - Run the full pipeline for one claim
//! - `status` - Load the corpus and print per-source counts

mod commands;

use crate::config::VeritasConfig;
use crate::error::AppError;
use crate::pipeline::RetrievalMode;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use veritas_core::{EncodingStrategy, RetrievalMethod, VerdictStrategy};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Veritas - claim verification over fact-check archives
///
/// Retrieves evidence from a local corpus of fact-checks (and optionally the
/// web) and classifies claims as Supported, Refuted, Not Enough Evidence or
/// Conflicting Evidence/Cherry-picking.
#[derive(Parser, Debug)]
#[command(name = "veritas")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (default: ./veritas.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Corpus directory, overriding the configuration
    #[arg(short = 'd', long, global = true)]
    pub data_dir: Option<PathBuf>,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Build the indices, filling the embedding cache
    Index {
        /// Encoding strategy (chunk_pool, title_label, truncate)
        #[arg(short, long)]
        strategy: Option<EncodingStrategy>,
    },

    /// Retrieve evidence for one or more queries
    Search {
        /// Queries to run
        #[arg(required = true, num_args = 1..)]
        queries: Vec<String>,

        /// Results per query
        #[arg(long)]
        k_per_query: Option<usize>,

        /// Results after merging
        #[arg(short, long)]
        k_total: Option<usize>,

        /// Retrieval method (lexical, semantic, hybrid)
        #[arg(short, long)]
        method: Option<RetrievalMethod>,
    },

    /// Verify a claim end to end
    Verify {
        /// The claim to verify
        claim: String,

        /// Evidence source (local, external, fallback_hybrid)
        #[arg(long)]
        mode: Option<RetrievalMode>,

        /// Verdict strategy (model, label_majority)
        #[arg(short, long)]
        strategy: Option<VerdictStrategy>,

        /// Retrieval method (lexical, semantic, hybrid)
        #[arg(short, long)]
        method: Option<RetrievalMethod>,

        /// Model name for questions and verdict
        #[arg(long)]
        model: Option<String>,
    },

    /// Show corpus status
    Status,
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), AppError> {
    let mut config = VeritasConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.corpus.data_dir = dir;
    }
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => cmd_server(config, &host, port).await,
        Some(Commands::Index { strategy }) => {
            if let Some(strategy) = strategy {
                config.index.strategy = strategy;
            }
            cmd_index(&config, json_mode).await
        }
        Some(Commands::Search {
            queries,
            k_per_query,
            k_total,
            method,
        }) => {
            if let Some(k) = k_per_query {
                config.retrieval.k_per_query = k;
            }
            if let Some(k) = k_total {
                config.retrieval.k_total = k;
            }
            if let Some(method) = method {
                config.retrieval.method = method;
            }
            config.validate()?;
            cmd_search(&config, queries, json_mode).await
        }
        Some(Commands::Verify {
            claim,
            mode,
            strategy,
            method,
            model,
        }) => {
            if let Some(mode) = mode {
                config.retrieval.mode = mode;
            }
            if let Some(strategy) = strategy {
                config.pipeline.strategy = strategy;
            }
            if let Some(method) = method {
                config.retrieval.method = method;
            }
            if let Some(model) = model {
                config.llm.model = model;
            }
            cmd_verify(&config, claim, json_mode).await
        }
        Some(Commands::Status) | None => cmd_status(&config, json_mode).await,
    }
}

// =============================================================================
// TESTS
// =============================================================================
