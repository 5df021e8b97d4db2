//! Company research: about-page facts, hiring signals and a sales brief.

use async_trait::async_trait;
use tracing::{info, instrument, warn};

use leadenrich_crawler::text::truncate_chars;
use leadenrich_crawler::{WebScraper, extract_facts};
use leadenrich_shared::contact::normalize_domain;
use leadenrich_shared::{CollabResult, CompanyIntel, CompanyResearcher};

use crate::client::{LlmClient, ModelTier};

const BRIEF_ABOUT_CHARS: usize = 3_000;
const BRIEF_DESCRIPTION_CHARS: usize = 2_000;
const FALLBACK_SENTENCE_CHARS: usize = 200;

/// [`CompanyResearcher`] combining the company website with the posting.
#[derive(Clone)]
pub struct AiCompanyResearcher {
    scraper: WebScraper,
    llm: Option<LlmClient>,
}

impl AiCompanyResearcher {
    /// Without a client the brief is assembled from scraped facts only.
    pub fn new(scraper: WebScraper, llm: Option<LlmClient>) -> Self {
        Self { scraper, llm }
    }

    async fn sales_brief(
        &self,
        company: &str,
        about: Option<&str>,
        description: &str,
        job_title: &str,
        signals: &[String],
    ) -> String {
        let Some(llm) = &self.llm else {
            return fallback_brief(company, about, signals);
        };

        let signal_lines = if signals.is_empty() {
            "Keine besonderen Signale".to_string()
        } else {
            signals.iter().map(|s| format!("- {s}")).collect::<Vec<_>>().join("\n")
        };
        let prompt = format!(
            "Unternehmen: {company}\n\n\
             Website-Auszug:\n{about}\n\n\
             Stellenanzeige: {job_title}\n{description}\n\n\
             Hiring-Signale:\n{signal_lines}\n\n\
             Schreibe eine Zusammenfassung für einen Vertriebsanruf einer Personalberatung: \
             was das Unternehmen macht, Branche und Größe falls erkennbar, warum es gerade \
             einstellt und ein konkreter Gesprächseinstieg. Höchstens 150 Wörter, auf Deutsch.",
            about = about
                .map(|a| truncate_chars(a, BRIEF_ABOUT_CHARS))
                .unwrap_or("Keine Informationen verfügbar"),
            description = truncate_chars(description, BRIEF_DESCRIPTION_CHARS),
        );

        match llm.complete(ModelTier::Smart, "", &prompt).await {
            Ok(completion) => completion.content,
            Err(e) => {
                warn!(error = %e, "sales brief generation failed");
                fallback_brief(company, about, signals)
            }
        }
    }
}

#[async_trait]
impl CompanyResearcher for AiCompanyResearcher {
    /// `None` when neither the website nor the posting revealed anything.
    #[instrument(skip(self, description))]
    async fn research_company(
        &self,
        company: &str,
        domain: Option<&str>,
        description: &str,
        job_title: &str,
    ) -> CollabResult<Option<CompanyIntel>> {
        let about = match domain {
            Some(domain) => self.scraper.about_page_text(domain).await,
            None => None,
        };
        let signals = hiring_signals(description, job_title);
        if about.is_none() && signals.is_empty() {
            return Ok(None);
        }

        let facts = about.as_deref().map(extract_facts).unwrap_or_default();
        let summary = self
            .sales_brief(company, about.as_deref(), description, job_title, &signals)
            .await;

        info!(
            about_chars = about.as_ref().map_or(0, |a| a.len()),
            signals = signals.len(),
            "company research finished"
        );

        Ok(Some(CompanyIntel {
            summary,
            description: facts.description,
            industry: String::new(),
            employee_count: facts.employee_count,
            founded: facts.founded,
            headquarters: String::new(),
            products_services: Vec::new(),
            hiring_signals: signals,
            website_url: domain
                .map(|d| format!("https://{}", normalize_domain(d)))
                .unwrap_or_default(),
        }))
    }
}

/// Sales-relevant signals read from the posting.
pub fn hiring_signals(description: &str, job_title: &str) -> Vec<String> {
    if description.trim().is_empty() || job_title.trim().is_empty() {
        return Vec::new();
    }
    let text = description.to_lowercase();
    let title = job_title.to_lowercase();
    let in_text = |words: &[&str]| words.iter().any(|w| text.contains(w));
    let in_title = |words: &[&str]| words.iter().any(|w| title.contains(w));

    let mut signals = Vec::new();
    if in_text(&["wachstum", "growth", "expanding", "wachsend"]) {
        signals.push("Unternehmen im Wachstum".to_string());
    }
    if in_text(&["neu gegründet", "startup", "young company"]) {
        signals.push("Junges/neues Unternehmen".to_string());
    }
    if in_text(&["ab sofort", "sofort", "immediately", "asap"]) {
        signals.push("Dringende Einstellung".to_string());
    }
    if in_text(&["team verstärk", "team erweiter", "team aufbau"]) {
        signals.push("Team wird ausgebaut".to_string());
    }
    if in_title(&["head", "lead", "manager", "director", "leiter"]) {
        signals.push("Führungsposition wird besetzt".to_string());
    }
    if in_title(&["senior", "experienced", "erfahren"]) {
        signals.push("Erfahrene Position (Senior)".to_string());
    }
    if in_text(&["remote", "homeoffice", "home office", "hybrid"]) {
        signals.push("Moderne Arbeitsplatzkultur (Remote/Hybrid)".to_string());
    }

    let mut benefits = Vec::new();
    if text.contains("betriebliche altersvorsorge") {
        benefits.push("bAV");
    }
    if text.contains("30 tage urlaub") || text.contains("30 urlaubstage") {
        benefits.push("30 Tage Urlaub");
    }
    if !benefits.is_empty() {
        signals.push(format!("Attraktive Benefits: {}", benefits.join(", ")));
    }
    signals
}

/// Brief without a model: company name, first sentence of the about text, signals.
pub fn fallback_brief(company: &str, about: Option<&str>, signals: &[String]) -> String {
    let mut brief = format!("**{company}**");
    if let Some(about) = about {
        let first = about.split('.').next().unwrap_or_default();
        brief.push('\n');
        brief.push_str(truncate_chars(first.trim(), FALLBACK_SENTENCE_CHARS));
        brief.push('.');
    }
    if !signals.is_empty() {
        brief.push_str("\n\nSignale: ");
        brief.push_str(&signals.join(", "));
    }
    brief
}
