//! Builds the pipeline's collaborators from the loaded configuration.

use std::sync::Arc;

use color_eyre::eyre::Result;
use tracing::debug;

use leadenrich_core::Collaborators;
use leadenrich_crawler::WebScraper;
use leadenrich_discovery::{GoogleSearch, SearchClient};
use leadenrich_llm::{AiCandidateRanker, AiCompanyResearcher, AiPostingParser, LlmClient};
use leadenrich_shared::{AppConfig, expand_home};
use leadenrich_stats::StatsStore;
use leadenrich_vendors::{FullEnrichClient, KasprClient};

/// Collaborators plus the handles the CLI reports on afterwards.
pub(crate) struct Wiring {
    pub collaborators: Collaborators,
    pub llm: Option<LlmClient>,
}

/// Wire every collaborator whose credentials are present.
///
/// Missing API keys disable the matching step. Only a broken HTTP client or
/// an unusable stats path is an error.
pub(crate) fn build(config: &AppConfig) -> Result<Wiring> {
    let llm = enabled("openrouter", LlmClient::from_config(config));
    let search = enabled("google", SearchClient::from_config(config));
    let scraper = WebScraper::from_config(config)?;
    let stats = StatsStore::open(expand_home(&config.defaults.stats_file)?);

    let collaborators = Collaborators {
        parser: Some(Arc::new(AiPostingParser::new(llm.clone()))),
        job_page: Some(Arc::new(scraper.clone())),
        registry: Some(Arc::new(scraper.clone())),
        team_page: Some(Arc::new(scraper.clone())),
        profile_search: search.map(|client| Arc::new(GoogleSearch::new(client)) as _),
        ranker: llm
            .clone()
            .map(|client| Arc::new(AiCandidateRanker::new(client)) as _),
        name_enricher: enabled("fullenrich", FullEnrichClient::from_config(config))
            .map(|client| Arc::new(client) as _),
        profile_enricher: enabled("kaspr", KasprClient::from_config(config))
            .map(|client| Arc::new(client) as _),
        researcher: Some(Arc::new(AiCompanyResearcher::new(scraper, llm.clone()))),
        stats: Some(Arc::new(stats)),
    };

    Ok(Wiring { collaborators, llm })
}

fn enabled<T>(service: &str, built: leadenrich_shared::Result<T>) -> Option<T> {
    match built {
        Ok(client) => Some(client),
        Err(e) => {
            debug!(service, error = %e, "collaborator disabled");
            None
        }
    }
}
