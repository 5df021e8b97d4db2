//! Contact person on a job ad page.

use std::sync::LazyLock;

use regex::Regex;

use leadenrich_shared::contact::{extract_emails, is_generic_email, is_plausible_person_name, name_from_email};
use leadenrich_shared::{Candidate, CandidateSource};

use super::{context_window, digit_count};
use crate::text::{truncate_chars, visible_text};

/// Job pages beyond this many characters are cut before extraction.
const MAX_JOB_TEXT_CHARS: usize = 20_000;

/// Label-anchored contact names. Labels are case-insensitive, names are not.
static CONTACT_NAME: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    const NAME: &str = r"([A-ZÄÖÜ][a-zäöüß]+(?:-[A-ZÄÖÜ][a-zäöüß]+)?\s+[A-ZÄÖÜ][a-zäöüß]+(?:-[A-ZÄÖÜ][a-zäöüß]+)?)";
    [
        r"(?i:(?:ihr[e]?\s+)?ansprechpartner(?:in)?)[:\s]+",
        r"(?i:kontakt)[:\s]+",
        r"(?i:bewerbung(?:\s+an)?)[:\s]+",
        r"(?i:fragen\??)[:\s]+",
        r"(?i:frau|herr)\s+",
    ]
    .iter()
    .map(|label| Regex::new(&format!("{label}{NAME}")).expect("valid regex"))
    .collect()
});

static JOB_PHONE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?:\+49|0049|\b0)\s*[\d\s\-/]{8,15}").expect("valid regex"));

static CONTACT_TITLE: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)Personalleiter(?:in)?",
        r"(?i)HR\s*Manager(?:in)?",
        r"(?i)Recruiter(?:in)?",
        r"(?i)Talent\s*Acquisition",
        r"(?i)Geschäftsführer(?:in)?",
        r"\b(?:CEO|CTO|CFO|COO)\b",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Extract the named contact of a job ad.
///
/// A personal (non-role) email address wins for the name; otherwise a
/// labelled name such as `Ihr Ansprechpartner: Max Müller` is used. Pages
/// without a nameable person yield `None`.
pub fn extract_job_contact(html: &str) -> Option<Candidate> {
    let text = visible_text(html);
    let text = truncate_chars(&text, MAX_JOB_TEXT_CHARS);

    let personal_email = extract_emails(text)
        .into_iter()
        .find(|e| !is_generic_email(e));

    let name = personal_email
        .as_deref()
        .and_then(name_from_email)
        .or_else(|| find_contact_name(text))?;

    let mut candidate = Candidate::new(&name, CandidateSource::JobUrl)?;
    if let Some(email) = personal_email {
        candidate = candidate.with_email(email);
    }
    if let Some(phone) = find_phone(text) {
        candidate = candidate.with_phone(phone);
    }
    if let Some(title) = find_title_near(text, &candidate.name) {
        candidate = candidate.with_title(title);
    }
    Some(candidate)
}

fn find_contact_name(text: &str) -> Option<String> {
    CONTACT_NAME.iter().find_map(|re| {
        re.captures_iter(text)
            .filter_map(|c| c.get(1))
            .map(|m| m.as_str().to_string())
            .find(|name| is_plausible_person_name(name))
    })
}

/// First German-looking number with at least ten digits.
fn find_phone(text: &str) -> Option<String> {
    JOB_PHONE
        .find_iter(text)
        .map(|m| m.as_str().trim())
        .find(|p| digit_count(p) >= 10)
        .map(str::to_string)
}

fn find_title_near(text: &str, name: &str) -> Option<String> {
    let lower = text.to_lowercase();
    let needle = name.to_lowercase();
    // Lowercasing can shift byte offsets for a few scripts; bail out then.
    if lower.len() != text.len() {
        return None;
    }
    let start = lower.find(&needle)?;
    let context = context_window(text, start, start + needle.len(), 100);
    CONTACT_TITLE
        .iter()
        .find_map(|re| re.find(context))
        .map(|m| m.as_str().to_string())
}
