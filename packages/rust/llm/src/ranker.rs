//! LLM validation and ranking of candidate contacts.

use std::collections::HashMap;
use std::fmt::Write as _;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, info, instrument};

use leadenrich_shared::{
    Candidate, CandidateRanker, CollabResult, CollaboratorError, ValidatedCandidate,
};

use crate::client::{LlmClient, ModelTier};

const SYSTEM_PROMPT: &str = "Du prüfst Kontaktpersonen für B2B-Vertrieb im DACH-Raum. \
Antworte ausschließlich mit einem JSON-Array.";

/// One verdict as returned by the model.
#[derive(Debug, Deserialize)]
struct Verdict {
    name: String,
    #[serde(default)]
    name_valid: bool,
    #[serde(default)]
    email_valid: bool,
    #[serde(default)]
    relevance_score: f64,
    #[serde(default)]
    name_reason: Option<String>,
    #[serde(default)]
    email_reason: Option<String>,
    #[serde(default)]
    validation_notes: Option<String>,
}

/// [`CandidateRanker`] that asks the model whether each candidate is a real,
/// relevant person and how good a target they are.
///
/// Model failures are returned as errors; the caller decides on a fallback.
#[derive(Clone)]
pub struct AiCandidateRanker {
    llm: LlmClient,
}

impl AiCandidateRanker {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl CandidateRanker for AiCandidateRanker {
    #[instrument(skip_all, fields(company = %company, candidates = candidates.len()))]
    async fn validate_and_rank(
        &self,
        candidates: &[Candidate],
        company: &str,
        domain: Option<&str>,
        category: Option<&str>,
    ) -> CollabResult<Vec<ValidatedCandidate>> {
        let plausible: Vec<&Candidate> = candidates
            .iter()
            .filter(|c| c.name.chars().count() >= 3)
            .collect();
        if plausible.is_empty() {
            return Ok(Vec::new());
        }

        let prompt = build_prompt(&plausible, company, domain, category);
        let verdicts: Vec<Verdict> = self
            .llm
            .complete_json(ModelTier::Balanced, SYSTEM_PROMPT, &prompt)
            .await?;

        let ranked = apply_verdicts(&plausible, verdicts)?;
        info!(
            valid = ranked.len(),
            top = ?ranked.first().map(|v| v.candidate.name.as_str()),
            "candidates ranked"
        );
        Ok(ranked)
    }
}

fn build_prompt(
    candidates: &[&Candidate],
    company: &str,
    domain: Option<&str>,
    category: Option<&str>,
) -> String {
    let mut list = String::new();
    for (i, c) in candidates.iter().enumerate() {
        let _ = writeln!(
            list,
            "{}. Name: {} | Titel: {} | E-Mail: {} | Quelle: {}",
            i + 1,
            c.name,
            c.title.as_deref().unwrap_or("-"),
            c.email.as_deref().unwrap_or("-"),
            c.source,
        );
    }

    format!(
        "Unternehmen: {company}\nDomain: {domain}\nStellenkategorie: {category}\n\n\
         Kandidaten:\n{list}\n\
         Prüfe für jeden Kandidaten:\n\
         - name_valid: echter Personenname (kein Menüpunkt, keine Überschrift, kein Jobtitel, kein Firmenname)\n\
         - email_valid: E-Mail gehört zur Firmendomain oder ist plausibel persönlich\n\
         - relevance_score (0-100): HR/Personal 100, Leitung der passenden Abteilung 80, \
         Geschäftsführung/Inhaber 60, sonstige namentlich bekannte Person 40, ungültig 0\n\n\
         Antworte als JSON-Array mit einem Objekt pro Kandidat: \
         {{\"name\", \"name_valid\", \"name_reason\", \"email\", \"email_valid\", \
         \"email_reason\", \"relevance_score\", \"validation_notes\"}}. \
         Übernimm den Namen exakt wie angegeben.",
        domain = domain.unwrap_or("unbekannt"),
        category = category.unwrap_or("unbekannt"),
    )
}

/// Join verdicts back onto candidates, keep valid ones, best score first.
///
/// Candidates the model did not mention are dropped. Ties keep input order.
/// An empty answer, or one naming none of the candidates, is unusable.
fn apply_verdicts(
    candidates: &[&Candidate],
    verdicts: Vec<Verdict>,
) -> CollabResult<Vec<ValidatedCandidate>> {
    if verdicts.is_empty() {
        return Err(CollaboratorError::InvalidResponse("empty verdict list".into()));
    }
    let mut by_key: HashMap<String, Verdict> = HashMap::new();
    for verdict in verdicts {
        let key = verdict.name.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
        by_key.entry(key).or_insert(verdict);
    }

    let mut matched = 0;
    let mut ranked: Vec<ValidatedCandidate> = candidates
        .iter()
        .filter_map(|&candidate| {
            let Some(verdict) = by_key.remove(&candidate.identity_key()) else {
                debug!(name = %candidate.name, "no verdict for candidate");
                return None;
            };
            matched += 1;
            let overall_valid =
                verdict.name_valid && (candidate.email.is_none() || verdict.email_valid);
            let notes = [verdict.validation_notes, verdict.name_reason, verdict.email_reason]
                .into_iter()
                .flatten()
                .filter(|n| !n.trim().is_empty())
                .collect::<Vec<_>>()
                .join("; ");
            Some(ValidatedCandidate {
                candidate: candidate.clone(),
                name_valid: verdict.name_valid,
                email_valid: verdict.email_valid,
                relevance_score: verdict.relevance_score.clamp(0.0, 100.0).round() as u8,
                overall_valid,
                notes,
            })
        })
        .filter(|v| v.overall_valid)
        .collect();

    if matched == 0 {
        return Err(CollaboratorError::InvalidResponse(
            "verdicts name none of the candidates".into(),
        ));
    }

    ranked.sort_by_key(|v| std::cmp::Reverse(v.relevance_score));
    Ok(ranked)
}
