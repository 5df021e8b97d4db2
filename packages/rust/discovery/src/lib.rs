//! Web search discovery backed by Google Custom Search.
//!
//! Before any paid vendor is asked, LeadEnrich uses plain web search to find
//! the company's website, LinkedIn profiles of named contacts, and likely
//! decision makers when the posting names nobody.

mod linkedin;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, info, instrument};
use url::Url;

use leadenrich_shared::collab::ProfileSearch;
use leadenrich_shared::contact::normalize_domain;
use leadenrich_shared::{
    AppConfig, Candidate, CandidateSource, CollabResult, LeadEnrichError, Result, require_secret,
};

pub use linkedin::{
    is_profile_url, name_from_result_title, normalize_profile_url, positions_for_category,
    score_profile_hit, snippet_confirms_current,
};

/// Default timeout in seconds for search requests.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Minimum score for a search hit to count as the person's profile.
const MIN_PROFILE_SCORE: u32 = 3;

/// Results requested per query.
const RESULTS_PER_QUERY: u8 = 5;

/// Hosts that are never a company's own website.
const NON_COMPANY_HOSTS: &[&str] = &[
    "linkedin.com",
    "xing.com",
    "facebook.com",
    "twitter.com",
    "instagram.com",
    "youtube.com",
    "wikipedia.org",
    "kununu.de",
    "kununu.com",
    "glassdoor.com",
    "glassdoor.de",
    "indeed.com",
    "stepstone.de",
    "monster.de",
    "arbeitsagentur.de",
    "northdata.de",
];

/// User-Agent string for search requests.
const USER_AGENT: &str = concat!("LeadEnrich/", env!("CARGO_PKG_VERSION"));

// ---------------------------------------------------------------------------
// SearchHit
// ---------------------------------------------------------------------------

/// One organic search result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchHit>,
}

// ---------------------------------------------------------------------------
// SearchClient
// ---------------------------------------------------------------------------

/// Thin client for the Custom Search JSON API.
#[derive(Clone)]
pub struct SearchClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    cse_id: String,
}

impl SearchClient {
    /// Create a client for the given endpoint and credentials.
    pub fn new(endpoint: &str, api_key: String, cse_id: String, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| LeadEnrichError::config(format!("invalid search endpoint '{endpoint}': {e}")))?;
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint,
            api_key,
            cse_id,
        })
    }

    /// Build from the `[google]` config section. Fails when a secret is missing.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = require_secret(&config.google.api_key_env, "Google Custom Search")?;
        let cse_id = require_secret(&config.google.cse_id_env, "Google Custom Search engine id")?;
        let timeout = match config.defaults.api_timeout_secs {
            0 => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            secs => Duration::from_secs(secs),
        };
        Self::new(&config.google.base_url, api_key, cse_id, timeout)
    }

    /// Run one query and return up to `num` results.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn search(&self, query: &str, num: u8) -> Result<Vec<SearchHit>> {
        let num = num.clamp(1, 10).to_string();
        let response = self
            .client
            .get(self.endpoint.clone())
            .query(&[
                ("key", self.api_key.as_str()),
                ("cx", self.cse_id.as_str()),
                ("q", query),
                ("num", num.as_str()),
            ])
            .send()
            .await
            .map_err(|e| LeadEnrichError::Network(format!("search request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(LeadEnrichError::Network(format!(
                "search returned HTTP {status}"
            )));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| LeadEnrichError::parse(format!("invalid search response: {e}")))?;

        debug!(results = body.items.len(), "search completed");
        Ok(body.items)
    }
}

// ---------------------------------------------------------------------------
// GoogleSearch (ProfileSearch implementation)
// ---------------------------------------------------------------------------

/// People and company discovery on top of [`SearchClient`].
#[derive(Clone)]
pub struct GoogleSearch {
    client: SearchClient,
}

impl GoogleSearch {
    pub fn new(client: SearchClient) -> Self {
        Self { client }
    }

    /// Access the underlying client (team-page discovery reuses it).
    pub fn client(&self) -> &SearchClient {
        &self.client
    }

    /// Try the query strategies in order until a hit scores high enough.
    async fn find_profile(&self, name: &str, company: &str, domain: Option<&str>) -> Result<Option<String>> {
        for query in profile_queries(name, company, domain) {
            let hits = self.client.search(&query, RESULTS_PER_QUERY).await?;
            let best = hits
                .iter()
                .filter(|hit| is_profile_url(&hit.link))
                .map(|hit| (score_profile_hit(hit, name, company), hit))
                .filter(|(score, _)| *score >= MIN_PROFILE_SCORE)
                .fold(None, |best: Option<(u32, &SearchHit)>, (score, hit)| match best {
                    Some((best_score, _)) if best_score >= score => best,
                    _ => Some((score, hit)),
                });

            if let Some((score, hit)) = best {
                let url = normalize_profile_url(&hit.link);
                info!(score, %url, "linkedin profile found");
                return Ok(Some(url));
            }
        }
        debug!(name, "no linkedin profile after all strategies");
        Ok(None)
    }

    async fn decision_makers(
        &self,
        company: &str,
        category: Option<&str>,
        max_results: usize,
    ) -> Result<Vec<Candidate>> {
        let mut found: Vec<Candidate> = Vec::new();

        for position in positions_for_category(category).into_iter().take(3) {
            let query = format!("\"{company}\" \"{position}\" site:linkedin.com/in");
            let hits = self.client.search(&query, 3).await?;

            for hit in hits.iter().filter(|h| is_profile_url(&h.link)) {
                if !mentions_company(hit, company) {
                    continue;
                }
                let Some(name) = name_from_result_title(&hit.title) else {
                    continue;
                };
                let Some(mut candidate) = Candidate::new(&name, CandidateSource::Linkedin) else {
                    continue;
                };
                if found.iter().any(|c| c.identity_key() == candidate.identity_key()) {
                    continue;
                }
                candidate = candidate
                    .with_title(position)
                    .with_linkedin(normalize_profile_url(&hit.link));
                if snippet_confirms_current(hit, company) {
                    candidate = candidate.verified();
                }
                found.push(candidate);
            }

            if found.len() >= max_results {
                break;
            }
        }

        found.truncate(max_results);
        info!(count = found.len(), "linkedin decision makers found");
        Ok(found)
    }

    async fn company_domain(&self, company: &str) -> Result<Option<String>> {
        let query = format!("\"{company}\" official website");
        let hits = self.client.search(&query, RESULTS_PER_QUERY).await?;
        Ok(hits.iter().find_map(|hit| company_host(&hit.link)))
    }

    async fn company_linkedin(&self, company: &str, domain: Option<&str>) -> Result<Option<String>> {
        let query = match domain {
            Some(domain) => format!("\"{company}\" OR \"{domain}\" site:linkedin.com/company"),
            None => format!("\"{company}\" site:linkedin.com/company"),
        };
        let hits = self.client.search(&query, 3).await?;
        Ok(hits
            .iter()
            .find(|hit| hit.link.to_lowercase().contains("linkedin.com/company/"))
            .map(|hit| hit.link.split('?').next().unwrap_or(&hit.link).to_string()))
    }
}

#[async_trait]
impl ProfileSearch for GoogleSearch {
    async fn find_linkedin_profile(
        &self,
        name: &str,
        company: &str,
        domain: Option<&str>,
    ) -> CollabResult<Option<String>> {
        Ok(self.find_profile(name, company, domain).await?)
    }

    async fn find_decision_makers(
        &self,
        company: &str,
        _domain: Option<&str>,
        category: Option<&str>,
        max_results: usize,
    ) -> CollabResult<Vec<Candidate>> {
        Ok(self.decision_makers(company, category, max_results).await?)
    }

    async fn find_company_domain(&self, company: &str) -> CollabResult<Option<String>> {
        Ok(self.company_domain(company).await?)
    }

    async fn find_company_linkedin(
        &self,
        company: &str,
        domain: Option<&str>,
    ) -> CollabResult<Option<String>> {
        Ok(self.company_linkedin(company, domain).await?)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Query strategies for a person's profile, most specific first.
fn profile_queries(name: &str, company: &str, domain: Option<&str>) -> Vec<String> {
    let mut queries = Vec::with_capacity(4);
    if !company.is_empty() {
        queries.push(format!("\"{name}\" \"{company}\" site:linkedin.com/in"));
        queries.push(format!("\"{name}\" {company} site:linkedin.com/in"));
    }
    if let Some(domain) = domain {
        queries.push(format!("\"{name}\" {domain} site:linkedin.com/in"));
    }
    queries.push(format!("\"{name}\" site:linkedin.com/in"));
    queries
}

/// Whether a hit's title or snippet mentions a significant word of the company name.
fn mentions_company(hit: &SearchHit, company: &str) -> bool {
    let haystack = format!("{} {}", hit.title, hit.snippet).to_lowercase();
    company
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .any(|w| haystack.contains(w))
}

/// Bare domain of a result link unless it is a social network or job board.
fn company_host(link: &str) -> Option<String> {
    let url = Url::parse(link).ok()?;
    let host = normalize_domain(url.host_str()?);
    if host.is_empty() || NON_COMPANY_HOSTS.iter().any(|skip| host.ends_with(skip)) {
        return None;
    }
    Some(host)
}
