//! Pipeline orchestration for Placebook.
//!
//! Sequences the phases end-to-end: fetch → segment → extract → enrich →
//! tag → persist. The orchestrator is the only component aware of the
//! skip/full-refresh policy.

pub mod pipeline;
pub mod source;

pub use pipeline::{
    Phase, Pipeline, ProgressEvent, ProgressReporter, RefreshDecision, RunConfig, RunSummary,
    SilentProgress,
};
pub use source::{DocumentSource, FileSource, HttpSource, SourceDocument};
