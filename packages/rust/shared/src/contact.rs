//! Name and email heuristics shared by scrapers and the result assembler.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

/// Mailbox names that belong to a function, not a person.
pub const GENERIC_EMAIL_PREFIXES: &[&str] = &[
    "info", "kontakt", "contact", "office", "mail", "bewerbung", "bewerbungen", "jobs", "job",
    "karriere", "career", "careers", "hr", "personal", "recruiting", "service", "support", "hello",
    "hallo", "team", "admin", "webmaster", "noreply", "no-reply", "hinweise", "datenschutz",
    "presse", "sales", "vertrieb", "buchhaltung", "zentrale",
];

/// Words that show a "name" is really navigation, a heading or boilerplate.
const NON_NAME_FRAGMENTS: &[&str] = &[
    "weitere", "möglichkeiten", "helfen", "navigation", "menü", "menu", "kontakt", "impressum",
    "startseite", "übersicht", "angebot", "unsere", "unser team", "mehr erfahren", "weiterlesen",
    "hier klicken", "jetzt bewerben", "alle rechte", "datenschutz", "cookie", "agb",
    "nutzungsbedingungen", "stellenangebot", "karriere",
];

/// Tokens that are job titles or organisation words, never part of a person's name.
const NON_NAME_TOKENS: &[&str] = &[
    "präsident", "teamleiter", "teamleiterin", "leiter", "leiterin", "manager", "managerin",
    "direktor", "direktorin", "geschäftsführer", "geschäftsführerin", "ceo", "cto", "cfo", "coo",
    "gmbh", "ag", "kg", "mbh", "ug", "se", "e.v.", "co", "abteilung", "personal", "recruiting",
    "team", "hr", "human", "resources", "recruiter", "recruiterin", "ansprechpartner",
    "ansprechpartnerin", "bewerbung", "herr", "frau",
];

/// Lowercase name particles allowed between capitalised tokens.
const NAME_PARTICLES: &[&str] = &["von", "van", "de", "der", "den", "zu", "vom", "zur", "di", "da"];

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[\w.+\-]+@[\w.\-]+\.[a-zA-Z]{2,}").expect("valid regex")
});

/// Find email addresses in free text, deduplicated case-insensitively.
///
/// Asset file names that look like addresses (`logo@2x.png`) and
/// placeholder domains are skipped.
pub fn extract_emails(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    EMAIL_RE
        .find_iter(text)
        .map(|m| m.as_str().trim_end_matches('.').to_string())
        .filter(|e| !is_asset_like(e) && !e.to_lowercase().ends_with("example.com"))
        .filter(|e| seen.insert(e.to_lowercase()))
        .collect()
}

/// Whether a string that matched the email regex is really an asset file name.
pub fn is_asset_like(candidate: &str) -> bool {
    let lower = candidate.to_lowercase();
    [".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// Local part of an email, lowercased.
pub fn email_local_part(email: &str) -> Option<String> {
    let (local, _) = email.trim().split_once('@')?;
    (!local.is_empty()).then(|| local.to_lowercase())
}

/// Domain of an email, lowercased, without `www.`.
pub fn email_domain(email: &str) -> Option<String> {
    let (_, domain) = email.trim().rsplit_once('@')?;
    let domain = normalize_domain(domain);
    (!domain.is_empty()).then_some(domain)
}

/// Whether the mailbox belongs to a function (info@, jobs@, ...).
pub fn is_generic_email(email: &str) -> bool {
    match email_local_part(email) {
        Some(local) => GENERIC_EMAIL_PREFIXES.contains(&local.as_str()),
        None => true,
    }
}

/// Reduce a URL or host to a bare lowercase domain (`https://www.Firma.de/x` → `firma.de`).
pub fn normalize_domain(raw: &str) -> String {
    let lower = raw.trim().to_lowercase();
    let without_scheme = lower
        .strip_prefix("https://")
        .or_else(|| lower.strip_prefix("http://"))
        .unwrap_or(&lower);
    let host = without_scheme
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default();
    host.strip_prefix("www.").unwrap_or(host).to_string()
}

/// Derive "First Last" from a `first.last@` address.
///
/// Generic mailboxes and local parts that are not exactly two alphabetic
/// parts of at least two letters yield `None`.
pub fn name_from_email(email: &str) -> Option<String> {
    if is_generic_email(email) {
        return None;
    }
    let local = email_local_part(email)?;
    let (first, last) = local.split_once('.')?;
    let valid = |part: &str| part.chars().count() >= 2 && part.chars().all(char::is_alphabetic);
    if !valid(first) || !valid(last) {
        return None;
    }
    Some(format!("{} {}", capitalize(first), capitalize(last)))
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Whether `name` plausibly names a human being.
///
/// Requires two to five tokens, capitalised words (lowercase particles such
/// as "von" allowed in between) and rejects navigation text, job titles and
/// company suffixes.
pub fn is_plausible_person_name(name: &str) -> bool {
    let name = name.trim();
    let char_count = name.chars().count();
    if !(5..=50).contains(&char_count) {
        return false;
    }

    let lower = name.to_lowercase();
    if NON_NAME_FRAGMENTS.iter().any(|f| lower.contains(f)) {
        return false;
    }

    let tokens: Vec<&str> = name.split_whitespace().collect();
    if !(2..=5).contains(&tokens.len()) {
        return false;
    }

    let mut real_words = 0;
    for (i, token) in tokens.iter().enumerate() {
        let token_lower = token.to_lowercase();
        if NON_NAME_TOKENS.contains(&token_lower.as_str()) {
            return false;
        }
        if !token
            .chars()
            .all(|c| c.is_alphabetic() || c == '-' || c == '\'' || c == '.')
        {
            return false;
        }
        let is_particle = i > 0 && i + 1 < tokens.len() && NAME_PARTICLES.contains(&token_lower.as_str());
        if is_particle {
            continue;
        }
        if !token.chars().next().is_some_and(char::is_uppercase) {
            return false;
        }
        // academic titles such as "Dr." do not count as a name part
        if !token.ends_with('.') {
            real_words += 1;
        }
    }
    real_words >= 2
}
