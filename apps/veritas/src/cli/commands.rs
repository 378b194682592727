//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use crate::config::VeritasConfig;
use crate::error::AppError;
use crate::pipeline::{RunEvent, RunReport};
use crate::startup;
use futures::StreamExt;
use std::sync::Arc;
use veritas_core::{Corpus, EvidenceResult, LabelTone, SourceStatus, VeritasError};

fn print_json<T: serde::Serialize>(value: &T) -> Result<(), AppError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| VeritasError::SerializationError(e.to_string()))?;
    println!("{text}");
    Ok(())
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(config: VeritasConfig, host: &str, port: u16) -> Result<(), AppError> {
    println!("Veritas Claim Verification Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:      {}", host);
    println!("  Port:      {}", port);
    println!("  Corpus:    {}", config.corpus.data_dir.display());
    println!("  Strategy:  {}", config.index.strategy);
    println!("  LLM:       {} ({})", config.llm.model, config.llm.base_url);
    println!(
        "  Web:       {}",
        if config.web_search_configured() {
            "google"
        } else {
            "disabled"
        }
    );
    println!();
    println!("Endpoints:");
    println!("  GET  /health         - Health and readiness");
    println!("  GET  /status         - Engine build report");
    println!("  POST /retrieve       - Multi-query retrieval");
    println!("  POST /analyze        - Verify a claim");
    println!("  GET  /analyze-stream - Verify a claim with progress events");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, config).await
}

// =============================================================================
// INDEX COMMAND
// =============================================================================

/// Build both indices and print the build report.
pub async fn cmd_index(config: &VeritasConfig, json_mode: bool) -> Result<(), AppError> {
    let corpus = startup::load_corpus(config).await?;
    let engine = startup::build_engine(config, corpus).await?;
    let report = engine.report();

    if json_mode {
        return print_json(report);
    }

    println!("Veritas Index");
    println!("=============");
    println!("Articles:    {}", report.articles);
    println!("Vocabulary:  {}", report.vocabulary);
    println!("Vectors:     {}", report.vectors);
    println!("Dimension:   {}", report.dimension);
    println!("Strategy:    {}", report.strategy);
    println!("Model:       {}", report.model_id);
    println!("Fingerprint: {}", report.fingerprint);
    println!("Cache hit:   {}", report.cache.is_hit());

    Ok(())
}

// =============================================================================
// SEARCH COMMAND
// =============================================================================

/// Multi-query retrieval over the local corpus.
pub async fn cmd_search(
    config: &VeritasConfig,
    queries: Vec<String>,
    json_mode: bool,
) -> Result<(), AppError> {
    let corpus = startup::load_corpus(config).await?;
    let engine = startup::build_engine(config, corpus).await?;

    let r = &config.retrieval;
    let (k_per_query, k_total, method) = (r.k_per_query, r.k_total, r.method);
    let searcher = Arc::clone(&engine);
    let results = tokio::task::spawn_blocking(move || {
        searcher.retrieve_multi(&queries, k_per_query, k_total, method)
    })
    .await??;

    if json_mode {
        return print_json(&results);
    }

    println!("Results ({method}, {} found)", results.len());
    println!("=======");
    for (rank, result) in results.iter().enumerate() {
        print_result(rank + 1, result);
    }
    Ok(())
}

fn print_result(rank: usize, result: &EvidenceResult) {
    for line in result_lines(rank, result) {
        println!("{line}");
    }
}

/// Display lines for one ranked result; the label carries its tone badge.
fn result_lines(rank: usize, result: &EvidenceResult) -> Vec<String> {
    let mut lines = vec![format!(
        "{rank:>2}. [{:.3}] {} ({})",
        result.score,
        result.title,
        result.source.name()
    )];
    if let Some(label) = result.usable_label() {
        let tone = result.tone.unwrap_or_else(|| LabelTone::of(label));
        lines.push(format!("    label: {label} [{}]", tone.name()));
    }
    lines.push(format!("    {}", result.link));
    lines
}

// =============================================================================
// VERIFY COMMAND
// =============================================================================

/// Verify one claim, printing stage events as they arrive.
pub async fn cmd_verify(
    config: &VeritasConfig,
    claim: String,
    json_mode: bool,
) -> Result<(), AppError> {
    let corpus = startup::load_corpus(config).await?;
    let engine = startup::build_engine(config, corpus).await?;
    let pipeline = startup::build_pipeline(config, engine)?;

    let mut events = pipeline.run_claim(claim, startup::default_run_options(config));
    while let Some(event) = events.next().await {
        match event {
            RunEvent::Stage { message } => {
                if !json_mode {
                    println!("- {message}");
                }
            }
            RunEvent::Completed(report) => {
                if json_mode {
                    return print_json(&report);
                }
                print_report(&report);
                return Ok(());
            }
            RunEvent::Failed { reason } => return Err(AppError::Collaborator(reason)),
        }
    }
    Err(AppError::Task("run ended without a result".to_string()))
}

fn print_report(report: &RunReport) {
    println!();
    println!("Claim: {}", report.claim);
    println!();
    println!("Questions:");
    for question in &report.questions {
        println!("  - {question}");
    }
    println!();
    println!(
        "Evidence: {} results ({}, {})",
        report.evidence.result_count(),
        report.mode,
        report.retrieval_method
    );
    for group in &report.evidence.groups {
        println!("  {}", group.question);
        for (rank, result) in group.results.iter().enumerate() {
            print_result(rank + 1, result);
        }
    }
    println!();
    println!("Verdict:       {}", report.verdict.classification);
    println!("Confidence:    {}%", report.verdict.confidence);
    println!("Strategy:      {}", report.verdict.strategy);
    println!("Justification: {}", report.verdict.justification);
    if let Some(breakdown) = &report.verdict.label_breakdown {
        println!("Labels:");
        for (label, count) in breakdown {
            println!("  {label}: {count}");
        }
    }
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Load the corpus and print what every source contributed.
pub async fn cmd_status(config: &VeritasConfig, json_mode: bool) -> Result<(), AppError> {
    let data_dir = config.corpus.data_dir.clone();
    let loaded = tokio::task::spawn_blocking(move || Corpus::load(&data_dir)).await?;

    let report = match loaded {
        Ok((_, report)) => report,
        Err(VeritasError::EmptyCorpus) => {
            return Err(AppError::Config(format!(
                "no source under {} yielded any article",
                config.corpus.data_dir.display()
            )));
        }
        Err(e) => return Err(e.into()),
    };

    if json_mode {
        return print_json(&serde_json::json!({
            "data_dir": config.corpus.data_dir.to_string_lossy(),
            "total_loaded": report.total_loaded(),
            "total_dropped": report.total_dropped(),
            "sources": report.sources,
        }));
    }

    println!("Veritas Corpus Status");
    println!("=====================");
    println!("Data dir: {}", config.corpus.data_dir.display());
    println!();
    for source in &report.sources {
        match &source.status {
            SourceStatus::Loaded { articles, dropped } => {
                println!("  {:<10} {:>7} articles ({} dropped)", source.source, articles, dropped);
            }
            SourceStatus::Missing => println!("  {:<10} missing", source.source),
            SourceStatus::Unreadable { reason } => {
                println!("  {:<10} unreadable: {}", source.source, reason);
            }
        }
    }
    println!();
    println!("Total:    {} articles", report.total_loaded());

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
