//! Company website scraping.
//!
//! This crate provides:
//! - [`engine`]: page fetcher with SSRF protection
//! - [`text`]: visible-text extraction
//! - [`extract`]: job page, Impressum, team page and about page extractors
//! - [`WebScraper`]: the job page, registry and team page collaborators

pub mod engine;
pub mod extract;
pub mod text;

use std::collections::HashSet;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument, warn};

use leadenrich_discovery::{SearchClient, SearchHit};
use leadenrich_shared::contact::normalize_domain;
use leadenrich_shared::{
    AppConfig, Candidate, CollabResult, JobPageSource, RegistryInfo, RegistrySource, Result,
    TeamPageSource,
};

pub use engine::{FetchedPage, Fetcher, site_roots};
pub use extract::about::{AboutFacts, about_text, extract_facts};
pub use extract::impressum::extract_registry;
pub use extract::job_page::extract_job_contact;
pub use extract::team_page::extract_team_members;

/// Paths tried for the legal notice, in order.
const IMPRESSUM_PATHS: &[&str] = &["/impressum", "/impressum.html", "/de/impressum", "/kontakt"];

/// Paths tried for the team page before falling back to search.
const TEAM_PATHS: &[&str] = &[
    "/team",
    "/ueber-uns/team",
    "/unternehmen/team",
    "/about/team",
    "/ansprechpartner",
];

/// Team pages scraped per company.
const MAX_TEAM_PAGES: usize = 2;

/// Search queries tried when no team page sits at a well-known path.
const MAX_TEAM_QUERIES: usize = 3;

/// Hosts that never serve a company's own team page.
const TEAM_SKIP_HOSTS: &[&str] = &[
    "linkedin", "xing", "facebook", "twitter", "youtube", "instagram", "kununu", "glassdoor",
    "indeed", "stepstone", "monster", "arbeitsagentur",
];

/// URL/title words that mark a likely team page.
const TEAM_HINTS: &[&str] = &[
    "team", "ueber-uns", "über uns", "about", "ansprechpartner", "geschäftsführung",
    "management", "mitarbeiter",
];

// ---------------------------------------------------------------------------
// WebScraper
// ---------------------------------------------------------------------------

/// Scrapes job pages and company websites.
///
/// Search is optional: without it only well-known paths are tried.
#[derive(Clone)]
pub struct WebScraper {
    fetcher: Fetcher,
    search: Option<SearchClient>,
}

impl WebScraper {
    pub fn new(fetcher: Fetcher, search: Option<SearchClient>) -> Self {
        Self { fetcher, search }
    }

    /// Build from config. Missing search credentials disable the search fallbacks.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let fetcher = Fetcher::new(Duration::from_secs(config.defaults.api_timeout_secs.max(1)))?;
        let search = match SearchClient::from_config(config) {
            Ok(client) => Some(client),
            Err(e) => {
                debug!(error = %e, "search fallback disabled");
                None
            }
        };
        Ok(Self::new(fetcher, search))
    }

    /// Locate and fetch the legal notice page.
    pub async fn find_impressum(&self, company: &str, domain: &str) -> Option<FetchedPage> {
        let roots = site_roots(domain);
        let urls: Vec<String> = IMPRESSUM_PATHS
            .iter()
            .flat_map(|path| roots.iter().map(move |root| format!("{root}{path}")))
            .collect();

        if let Some(page) = self.fetcher.fetch_first(&urls).await {
            return Some(page);
        }

        let search = self.search.as_ref()?;
        let query = format!("\"{company}\" impressum site:{}", normalize_domain(domain));
        let hits = match search.search(&query, 3).await {
            Ok(hits) => hits,
            Err(e) => {
                warn!(error = %e, "impressum search failed");
                return None;
            }
        };
        let link = pick_impressum_link(&hits)?;
        self.fetcher.fetch(&link).await.ok()
    }

    /// Combined text of the company's about pages, `None` when nothing useful was found.
    #[instrument(skip(self))]
    pub async fn about_page_text(&self, domain: &str) -> Option<String> {
        let roots = site_roots(domain);
        let urls_for = |path: &str| -> Vec<String> {
            roots.iter().map(|root| format!("{root}{path}")).collect()
        };
        let (ueber, uber, about, about_us) = (
            urls_for("/ueber-uns"),
            urls_for("/uber-uns"),
            urls_for("/about"),
            urls_for("/about-us"),
        );

        let pages = tokio::join!(
            self.fetcher.fetch_first(&ueber),
            self.fetcher.fetch_first(&uber),
            self.fetcher.fetch_first(&about),
            self.fetcher.fetch_first(&about_us),
        );

        let texts: Vec<String> = [pages.0, pages.1, pages.2, pages.3]
            .into_iter()
            .flatten()
            .filter_map(|page| about_text(&page.html))
            .collect();

        debug!(pages = texts.len(), "about pages read");
        (!texts.is_empty()).then(|| texts.join("\n\n---\n\n"))
    }

    async fn team_pages_by_search(&self, company: &str, domain: Option<&str>) -> Vec<String> {
        let Some(search) = self.search.as_ref() else {
            return Vec::new();
        };

        let mut queries = Vec::new();
        if let Some(domain) = domain {
            queries.push(format!(
                "\"{company}\" Team OR Geschäftsführung OR Ansprechpartner site:{}",
                normalize_domain(domain)
            ));
        }
        queries.push(format!("\"{company}\" Team Geschäftsführung"));
        queries.push(format!("\"{company}\" Ansprechpartner über uns"));
        queries.push(format!("\"{company}\" Mitarbeiter Kontakt"));

        let mut hits = Vec::new();
        for query in queries.iter().take(MAX_TEAM_QUERIES) {
            match search.search(query, 5).await {
                Ok(found) => hits.extend(found),
                Err(e) => warn!(error = %e, "team page search failed"),
            }
        }
        rank_team_links(&hits)
    }
}

fn pick_impressum_link(hits: &[SearchHit]) -> Option<String> {
    let with_word = |word: &str| {
        hits.iter()
            .find(|h| h.link.to_lowercase().contains(word))
    };
    with_word("impressum")
        .or_else(|| with_word("kontakt"))
        .or_else(|| hits.first())
        .map(|h| h.link.clone())
}

/// Distinct links from company sites, likely team pages first, top three.
fn rank_team_links(hits: &[SearchHit]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut ranked: Vec<(bool, &str)> = hits
        .iter()
        .filter(|h| {
            let host = normalize_domain(&h.link);
            !TEAM_SKIP_HOSTS.iter().any(|skip| host.contains(skip))
        })
        .filter(|h| seen.insert(h.link.clone()))
        .map(|h| {
            let haystack = format!("{} {}", h.link, h.title).to_lowercase();
            (TEAM_HINTS.iter().any(|w| haystack.contains(w)), h.link.as_str())
        })
        .collect();
    ranked.sort_by_key(|(hinted, _)| !hinted);
    ranked.into_iter().take(3).map(|(_, link)| link.to_string()).collect()
}

// ---------------------------------------------------------------------------
// Collaborator implementations
// ---------------------------------------------------------------------------

#[async_trait]
impl JobPageSource for WebScraper {
    #[instrument(skip(self))]
    async fn discover_job_contact(&self, url: &str) -> CollabResult<Option<Candidate>> {
        let page = self.fetcher.fetch(url).await?;
        let contact = extract_job_contact(&page.html);
        match &contact {
            Some(c) => info!(name = %c.name, "job page contact found"),
            None => debug!("no named contact on job page"),
        }
        Ok(contact)
    }
}

#[async_trait]
impl RegistrySource for WebScraper {
    #[instrument(skip(self))]
    async fn discover_company_registry(
        &self,
        company: &str,
        domain: &str,
    ) -> CollabResult<Option<RegistryInfo>> {
        let Some(page) = self.find_impressum(company, domain).await else {
            debug!("no impressum page found");
            return Ok(None);
        };
        let info = extract_registry(&page.html, page.url.as_str());
        info!(
            url = %page.url,
            phones = info.phones.len(),
            executives = info.executives.len(),
            "impressum parsed"
        );
        Ok(Some(info))
    }
}

#[async_trait]
impl TeamPageSource for WebScraper {
    #[instrument(skip(self))]
    async fn discover_team_page(
        &self,
        company: &str,
        domain: Option<&str>,
        category: Option<&str>,
    ) -> CollabResult<Vec<Candidate>> {
        let mut urls: Vec<String> = match domain {
            Some(domain) => {
                let roots = site_roots(domain);
                TEAM_PATHS
                    .iter()
                    .flat_map(|path| roots.iter().map(move |root| format!("{root}{path}")))
                    .collect()
            }
            None => Vec::new(),
        };

        let mut members = self.members_from(&urls).await;
        if members.is_empty() {
            urls = self.team_pages_by_search(company, domain).await;
            members = self.members_from(&urls).await;
        }

        members.truncate(extract::team_page::MAX_MEMBERS);
        info!(members = members.len(), "team page discovery finished");
        Ok(members)
    }
}

impl WebScraper {
    /// Members from the first pages in `urls` that list people.
    async fn members_from(&self, urls: &[String]) -> Vec<Candidate> {
        let mut members: Vec<Candidate> = Vec::new();
        let mut seen = HashSet::new();
        let mut pages_used = 0;

        for url in urls {
            if pages_used >= MAX_TEAM_PAGES {
                break;
            }
            let page = match self.fetcher.fetch(url).await {
                Ok(page) => page,
                Err(e) => {
                    debug!(%url, error = %e, "team page unavailable");
                    continue;
                }
            };
            let found = extract_team_members(&page.html);
            if found.is_empty() {
                continue;
            }
            pages_used += 1;
            members.extend(found.into_iter().filter(|c| seen.insert(c.identity_key())));
        }
        members
    }
}
