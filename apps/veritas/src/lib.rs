//! # veritas
//!
//! The Veritas application crate - THE BINARY's library half.
//!
//! - `collaborators`: Ollama and Google clients behind async traits
//! - `pipeline`: evidence dispatch, verdict classification, claim runs
//! - `api`: the axum HTTP server
//! - `cli`: the clap command line
//! - `config` / `startup`: configuration layers and wiring
//!
//! The engine itself lives in `veritas-core`.

pub mod api;
pub mod cli;
pub mod collaborators;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod startup;

pub use config::VeritasConfig;
pub use error::AppError;
