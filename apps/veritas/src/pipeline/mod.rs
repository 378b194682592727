//! # Claim Pipeline
//!
//! claim -> questions -> evidence bundle -> verdict
//!
//! - `dispatcher`: evidence per question (local, web, local with web top-up)
//! - `classifier`: verdict strategies over a bundle
//! - `run`: the end-to-end run with its progress event stream

mod classifier;
mod dispatcher;
mod run;

pub use classifier::{ClassifyOutcome, Classifier};
pub use dispatcher::{DispatchOutcome, Dispatcher, RetrievalMode};
pub use run::{Pipeline, RunEvent, RunOptions, RunReport};
