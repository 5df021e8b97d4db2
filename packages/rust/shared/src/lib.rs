//! Shared types, error model, configuration and collaborator contracts for LeadEnrich.
//!
//! This crate is the foundation depended on by all other LeadEnrich crates.
//! It provides:
//! - [`LeadEnrichError`] and [`CollaboratorError`]: the error model
//! - Domain types ([`JobPosting`], [`Candidate`], [`EnrichmentResult`], ...)
//! - The DACH phone predicate ([`phone`]) and contact heuristics ([`contact`])
//! - Configuration ([`AppConfig`], [`PipelineConfig`], config loading)
//! - Collaborator traits ([`collab`])

pub mod collab;
pub mod config;
pub mod contact;
pub mod error;
pub mod phone;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use collab::{
    CandidateRanker, CompanyResearcher, JobPageSource, NameEnricher, NameQuery, PostingParser,
    ProfileEnricher, ProfileSearch, RegistrySource, StatsSink, TeamPageSource,
};
pub use config::{
    AppConfig, DefaultsConfig, FullEnrichConfig, GoogleConfig, KasprConfig,
    MAX_VALIDATION_CANDIDATES, OpenRouterConfig, PipelineConfig, config_dir, config_file_path,
    expand_home, init_config, load_config, load_config_from, require_secret, resolve_secret,
};
pub use error::{CollabResult, CollaboratorError, LeadEnrichError, Result};
pub use types::{
    Candidate, CandidateSource, CompanyInfo, CompanyIntel, DecisionMaker, EnrichmentResult,
    JobPosting, ParsedPosting, PhoneAttempt, PhoneResult, PhoneSource, PhoneStatus, PhoneType,
    RawPhone, RegistryInfo, RunId, ValidatedCandidate, VendorLookup,
};
