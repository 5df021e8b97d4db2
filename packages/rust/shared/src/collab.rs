//! Contracts between the enrichment pipeline and its external collaborators.
//!
//! The pipeline only ever sees these traits. Concrete implementations live in
//! the discovery, crawler, llm, vendors and stats crates and are injected at
//! construction, so tests can substitute in-memory fakes.

use async_trait::async_trait;

use crate::error::CollabResult;
use crate::types::{
    Candidate, CompanyIntel, JobPosting, ParsedPosting, PhoneAttempt, RegistryInfo,
    ValidatedCandidate, VendorLookup,
};

/// Turns a raw posting into structured fields. Never fails: implementations
/// degrade to a deterministic extractor internally.
#[async_trait]
pub trait PostingParser: Send + Sync {
    async fn parse(&self, posting: &JobPosting) -> ParsedPosting;
}

/// Scrapes the live posting page for a named contact.
#[async_trait]
pub trait JobPageSource: Send + Sync {
    async fn discover_job_contact(&self, url: &str) -> CollabResult<Option<Candidate>>;
}

/// Reads the company's legal notice (Impressum).
#[async_trait]
pub trait RegistrySource: Send + Sync {
    async fn discover_company_registry(
        &self,
        company: &str,
        domain: &str,
    ) -> CollabResult<Option<RegistryInfo>>;
}

/// Finds and parses the company's team page.
#[async_trait]
pub trait TeamPageSource: Send + Sync {
    async fn discover_team_page(
        &self,
        company: &str,
        domain: Option<&str>,
        category: Option<&str>,
    ) -> CollabResult<Vec<Candidate>>;
}

/// Web search for people and company pages.
#[async_trait]
pub trait ProfileSearch: Send + Sync {
    /// LinkedIn profile URL of a named person at a company.
    async fn find_linkedin_profile(
        &self,
        name: &str,
        company: &str,
        domain: Option<&str>,
    ) -> CollabResult<Option<String>>;

    /// Likely decision makers at a company, for a given job category.
    async fn find_decision_makers(
        &self,
        company: &str,
        domain: Option<&str>,
        category: Option<&str>,
        max_results: usize,
    ) -> CollabResult<Vec<Candidate>>;

    /// Company website domain when the posting did not reveal it.
    async fn find_company_domain(&self, company: &str) -> CollabResult<Option<String>>;

    /// LinkedIn company page URL.
    async fn find_company_linkedin(
        &self,
        company: &str,
        domain: Option<&str>,
    ) -> CollabResult<Option<String>>;
}

/// Judges which candidates are real, relevant people and orders them.
#[async_trait]
pub trait CandidateRanker: Send + Sync {
    /// Returns only valid candidates, best first.
    async fn validate_and_rank(
        &self,
        candidates: &[Candidate],
        company: &str,
        domain: Option<&str>,
        category: Option<&str>,
    ) -> CollabResult<Vec<ValidatedCandidate>>;
}

/// Arguments for a name-based vendor lookup.
#[derive(Debug, Clone, Copy)]
pub struct NameQuery<'a> {
    pub first_name: &'a str,
    pub last_name: &'a str,
    pub company: &'a str,
    pub domain: Option<&'a str>,
    pub linkedin_url: Option<&'a str>,
}

/// Paid vendor keyed on name and company (FullEnrich).
#[async_trait]
pub trait NameEnricher: Send + Sync {
    async fn enrich_by_name(&self, query: NameQuery<'_>) -> CollabResult<VendorLookup>;
}

/// Paid vendor keyed on a LinkedIn profile (Kaspr).
#[async_trait]
pub trait ProfileEnricher: Send + Sync {
    async fn enrich_by_linkedin(&self, linkedin_url: &str, name: &str)
    -> CollabResult<VendorLookup>;
}

/// Produces a sales brief about the hiring company.
#[async_trait]
pub trait CompanyResearcher: Send + Sync {
    async fn research_company(
        &self,
        company: &str,
        domain: Option<&str>,
        description: &str,
        job_title: &str,
    ) -> CollabResult<Option<CompanyIntel>>;
}

/// Receives one record per paid vendor call. Recording never fails the run.
#[async_trait]
pub trait StatsSink: Send + Sync {
    async fn record(&self, attempt: &PhoneAttempt);
}
