//! Batch processing of an input folder

mod orchestrator;
mod scanner;
mod summary;

pub use orchestrator::{run, BatchOutcome};
