//! Job posting parser: LLM extraction with a deterministic regex fallback.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use leadenrich_crawler::text::truncate_chars;
use leadenrich_shared::contact::{
    email_domain, extract_emails, is_plausible_person_name, normalize_domain,
};
use leadenrich_shared::{JobPosting, ParsedPosting, PostingParser, Result};

use crate::client::{LlmClient, ModelTier};

/// Description characters sent to the model.
const MAX_DESCRIPTION_CHARS: usize = 6_000;

const SYSTEM_PROMPT: &str = "Du extrahierst Kontaktdaten aus deutschsprachigen Stellenanzeigen. \
Antworte ausschließlich mit einem JSON-Objekt mit den Feldern \
company_name, company_domain, contact_name, contact_email, contact_phone, \
target_titles (Liste von Jobtiteln der Entscheider, die diese Stelle besetzen), \
department und location. Unbekannte Felder sind null. Erfinde keine Daten: \
contact_name nur, wenn eine konkrete Person genannt ist.";

static PHONE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:\+49|0049|\b0)\s*[\d\s\-/()]{8,20}").expect("valid regex")
});

static WEBSITE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:www\.)?([a-z0-9-]+\.(?:de|com|at|ch|eu|io|net|org))\b").expect("valid regex")
});

static CONTACT_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:Ihre?\s+)?(?:Ansprechpartner(?:in)?|Kontakt)\s*:?\s*(?:(?:Frau|Herr)\s+)?([A-ZÄÖÜ][a-zäöüß]+(?:(?:[ \t]+|-)[A-ZÄÖÜ][a-zäöüß]+)+)",
    )
    .expect("valid regex")
});

static LEGAL_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:gmbh|ag|kg|ohg|mbh|ug|se|co)\b|&").expect("valid regex")
});

/// Structured-extraction answer. Every field is optional on the wire.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ExtractedPosting {
    company_name: Option<String>,
    company_domain: Option<String>,
    contact_name: Option<String>,
    contact_email: Option<String>,
    contact_phone: Option<String>,
    target_titles: Vec<String>,
    department: Option<String>,
    location: Option<String>,
}

/// [`PostingParser`] backed by the LLM, degrading to regexes.
#[derive(Clone, Default)]
pub struct AiPostingParser {
    llm: Option<LlmClient>,
}

impl AiPostingParser {
    /// Without a client every posting goes through the regex extractor.
    pub fn new(llm: Option<LlmClient>) -> Self {
        Self { llm }
    }

    async fn parse_with_llm(&self, llm: &LlmClient, posting: &JobPosting) -> Result<ParsedPosting> {
        let prompt = format!(
            "Unternehmen: {}\nJobtitel: {}\nKategorie: {}\nOrt: {}\n\nBeschreibung:\n{}",
            posting.company,
            posting.title,
            posting.category.as_deref().unwrap_or("-"),
            posting.location.as_deref().unwrap_or("-"),
            truncate_chars(&posting.description, MAX_DESCRIPTION_CHARS),
        );
        let extracted: ExtractedPosting = llm
            .complete_json(ModelTier::Balanced, SYSTEM_PROMPT, &prompt)
            .await?;
        Ok(merge(extracted, posting))
    }
}

#[async_trait]
impl PostingParser for AiPostingParser {
    #[instrument(skip_all, fields(job_id = %posting.id))]
    async fn parse(&self, posting: &JobPosting) -> ParsedPosting {
        if let Some(llm) = &self.llm {
            match self.parse_with_llm(llm, posting).await {
                Ok(parsed) => return parsed,
                Err(e) => warn!(error = %e, "llm posting extraction failed, using regex fallback"),
            }
        }
        let parsed = fallback_parse(posting);
        debug!(domain = ?parsed.company_domain, contact = ?parsed.contact_name, "regex extraction");
        parsed
    }
}

/// Fill the gaps of a model answer from the posting itself.
fn merge(extracted: ExtractedPosting, posting: &JobPosting) -> ParsedPosting {
    let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());

    let contact_email = clean(extracted.contact_email).filter(|e| e.contains('@'));
    let company_domain = clean(extracted.company_domain)
        .map(|d| normalize_domain(&d))
        .filter(|d| d.contains('.'))
        .or_else(|| derive_domain(&posting.company, contact_email.as_deref(), &posting.description));
    let contact_name = clean(extracted.contact_name).filter(|n| is_plausible_person_name(n));
    let target_titles: Vec<String> = extracted
        .target_titles
        .into_iter()
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .collect();

    ParsedPosting {
        company_name: clean(extracted.company_name).unwrap_or_else(|| posting.company.clone()),
        company_domain,
        contact_name,
        contact_email,
        contact_phone: clean(extracted.contact_phone),
        target_titles: if target_titles.is_empty() {
            default_titles(&posting.title)
        } else {
            target_titles
        },
        department: clean(extracted.department)
            .or_else(|| detect_department(&posting.title, posting.category.as_deref())),
        location: clean(extracted.location).or_else(|| posting.location.clone()),
    }
}

// ---------------------------------------------------------------------------
// Regex fallback
// ---------------------------------------------------------------------------

/// Deterministic extraction from the description alone.
pub fn fallback_parse(posting: &JobPosting) -> ParsedPosting {
    let text = &posting.description;
    let contact_email = extract_emails(text).into_iter().next();
    let contact_phone = PHONE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|p| p.chars().filter(char::is_ascii_digit).count() >= 10)
        .map(str::to_string);
    let contact_name = CONTACT_NAME
        .captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .find(|n| is_plausible_person_name(n));

    ParsedPosting {
        company_name: posting.company.clone(),
        company_domain: derive_domain(&posting.company, contact_email.as_deref(), text),
        contact_name,
        contact_email,
        contact_phone,
        target_titles: default_titles(&posting.title),
        department: detect_department(&posting.title, posting.category.as_deref()),
        location: posting.location.clone(),
    }
}

/// Contact email domain, then a website mention, then a slug of the company name.
fn derive_domain(company: &str, email: Option<&str>, text: &str) -> Option<String> {
    if let Some(domain) = email.and_then(email_domain) {
        return Some(normalize_domain(&domain));
    }
    if let Some(site) = WEBSITE.captures(text).and_then(|c| c.get(1)) {
        return Some(site.as_str().to_lowercase());
    }
    company_slug(company).map(|slug| format!("{slug}.de"))
}

fn company_slug(company: &str) -> Option<String> {
    let stripped = LEGAL_SUFFIX.replace_all(&company.to_lowercase(), "").into_owned();
    let slug: String = stripped
        .replace('ä', "ae")
        .replace('ö', "oe")
        .replace('ü', "ue")
        .replace('ß', "ss")
        .chars()
        .filter(char::is_ascii_alphanumeric)
        .collect();
    (!slug.is_empty()).then_some(slug)
}

/// Whole-word match for short keywords, substring match otherwise.
fn mentions(lower: &str, keyword: &str) -> bool {
    if keyword.len() <= 3 {
        lower
            .split(|c: char| !c.is_alphanumeric())
            .any(|word| word == keyword)
    } else {
        lower.contains(keyword)
    }
}

const HR_KEYWORDS: &[&str] = &["hr", "personal", "recruiting", "talent"];
const IT_KEYWORDS: &[&str] = &["it", "software", "developer", "engineer", "tech", "consultant"];
const SALES_KEYWORDS: &[&str] = &["sales", "vertrieb", "account"];

/// Decision-maker titles worth targeting for a given job title.
pub fn default_titles(job_title: &str) -> Vec<String> {
    let lower = job_title.to_lowercase();
    let any = |keywords: &[&str]| keywords.iter().any(|k| mentions(&lower, k));

    let titles: &[&str] = if any(HR_KEYWORDS) {
        &[
            "HR Manager", "HR-Manager", "Personalleiter", "Personalleiterin", "Head of HR",
            "HR Director", "Leiter Personal", "Recruiting Manager", "Head of Recruiting",
        ]
    } else if any(IT_KEYWORDS) {
        &[
            "IT-Leiter", "Head of IT", "CTO", "IT Manager", "Leiter Softwareentwicklung",
            "Head of Engineering", "HR Manager", "Personalleiter",
        ]
    } else if any(SALES_KEYWORDS) {
        &[
            "Vertriebsleiter", "Head of Sales", "Sales Director", "Leiter Vertrieb",
            "HR Manager", "Personalleiter",
        ]
    } else {
        &[
            "HR Manager", "Personalleiter", "Personalleiterin", "Geschäftsführer",
            "Geschäftsführerin", "CEO", "Head of HR", "Leiter Personal",
        ]
    };
    titles.iter().map(|t| t.to_string()).collect()
}

/// Department label from job title and feed category.
pub fn detect_department(job_title: &str, category: Option<&str>) -> Option<String> {
    let lower = format!("{} {}", job_title, category.unwrap_or_default()).to_lowercase();
    let any = |keywords: &[&str]| keywords.iter().any(|k| mentions(&lower, k));

    let department = if any(HR_KEYWORDS) {
        "HR"
    } else if any(IT_KEYWORDS) {
        "IT"
    } else if any(SALES_KEYWORDS) {
        "Sales"
    } else if any(&["marketing"]) {
        "Marketing"
    } else if any(&["finance", "finanz", "accounting"]) {
        "Finance"
    } else {
        return None;
    };
    Some(department.to_string())
}
