//! Enrichment orchestration for LeadEnrich.
//!
//! This crate turns a job posting into an [`EnrichmentResult`]: it gathers
//! candidate contacts from every configured source, ranks them, runs the paid
//! phone cascade and assembles the final record. All external work goes
//! through the collaborator traits in `leadenrich-shared`.
//!
//! [`EnrichmentResult`]: leadenrich_shared::EnrichmentResult

pub mod aggregate;
pub mod assemble;
pub mod cascade;
pub mod pipeline;
pub mod trail;

pub use aggregate::CandidatePool;
pub use cascade::{CascadeOutcome, input_phone};
pub use pipeline::{Collaborators, Enricher, ProgressReporter, SilentProgress};
pub use trail::RunTrail;
