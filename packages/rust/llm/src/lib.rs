//! LLM-backed collaborators for LeadEnrich.
//!
//! - [`LlmClient`]: OpenRouter chat completions with model tiers
//! - [`AiPostingParser`]: structured extraction from job postings
//! - [`AiCandidateRanker`]: candidate validation and relevance scoring
//! - [`AiCompanyResearcher`]: company facts and a sales brief

pub mod client;
pub mod json;
pub mod posting;
pub mod ranker;
pub mod research;

pub use client::{Completion, LlmClient, ModelTier, Models, Usage, UsageTotals};
pub use json::extract_json;
pub use posting::{AiPostingParser, default_titles, detect_department, fallback_parse};
pub use ranker::AiCandidateRanker;
pub use research::{AiCompanyResearcher, fallback_brief, hiring_signals};
