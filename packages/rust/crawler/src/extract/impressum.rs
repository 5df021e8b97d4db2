//! Legal notice (Impressum) parsing: phones, emails, address, executives.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use leadenrich_shared::contact::{extract_emails, is_plausible_person_name, name_from_email};
use leadenrich_shared::phone;
use leadenrich_shared::{Candidate, CandidateSource, RegistryInfo};

use super::{digit_count, strip_academic_titles};
use crate::text::visible_text;

/// Named executives kept per notice.
const MAX_EXECUTIVES: usize = 5;

static PHONE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"\+49\s*\(?\d{1,4}\)?\s*[\d\s\-/\.]{6,}",
        r"0049\s*\(?\d{1,4}\)?\s*[\d\s\-/\.]{6,}",
        r"\b0[1-9]\d{2,4}\s*[-/\s\.]*\d{2,}[\d\s\-/\.]*",
        r"(?i)(?:Tel(?:efon)?|Phone|Fon|Mobil|Handy)[:\.\s]+\+?[\d\s\-/\.\(\)]{8,}",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static POSTAL_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:D|A|CH)\s*-\s*)?\d{4,5}\s+\p{Lu}[\p{L}\s\.\-/()]*$").expect("valid regex")
});

static STREET_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\p{L}[\p{L}\s\.\-]*\s\d+\s?[a-zA-Z]?(?:\s*[-/]\s*\d+[a-zA-Z]?)?$").expect("valid regex")
});

static ROLE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(geschäftsführer(?:in(?:nen)?)?|geschäftsführung|vorstand(?:svorsitzende[r]?)?|inhaber(?:in)?|managing\s+directors?)\b\s*(?:\([^)]*\))?\s*[:\-]?\s*(.*)$",
    )
    .expect("valid regex")
});

static REPRESENTED_BY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)vertreten\s+durch\s*[:\-]?\s*(.*)$").expect("valid regex"));

static NAME_SEPARATORS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:,|;|&|\bund\b|\band\b)\s*").expect("valid regex"));

/// Parse the text of a legal notice page found at `url`.
pub fn extract_registry(html: &str, url: &str) -> RegistryInfo {
    let text = visible_text(html);
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let emails = extract_emails(&text);
    let mut executives = extract_executives(&lines);
    for email in &emails {
        let Some(name) = name_from_email(email) else {
            continue;
        };
        let key = name.to_lowercase();
        match executives.iter_mut().find(|c| c.identity_key() == key) {
            Some(existing) if existing.email.is_none() => existing.email = Some(email.clone()),
            Some(_) => {}
            None => {
                if let Some(c) = Candidate::new(&name, CandidateSource::Impressum) {
                    executives.push(c.with_email(email.clone()));
                }
            }
        }
    }
    executives.truncate(MAX_EXECUTIVES);

    RegistryInfo {
        phones: extract_phones(&lines),
        emails,
        address: extract_address(&lines),
        executives,
        website: Some(url.to_string()),
    }
}

/// DACH numbers in order of appearance, normalized to `+CC` form.
///
/// Fax lines are skipped; matches need at least ten digits.
pub fn extract_phones(lines: &[&str]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phones = Vec::new();
    for line in lines {
        if line.to_lowercase().contains("fax") {
            continue;
        }
        for re in PHONE_PATTERNS.iter() {
            for m in re.find_iter(line) {
                let raw = m.as_str();
                let Some(start) = raw.find(|c: char| c.is_ascii_digit() || c == '+') else {
                    continue;
                };
                let raw = &raw[start..];
                if digit_count(raw) < 10 {
                    continue;
                }
                if let Some(normalized) = phone::normalize(raw) {
                    if seen.insert(normalized.clone()) {
                        phones.push(normalized);
                    }
                }
            }
        }
    }
    phones
}

/// First `PLZ City` line, joined with the street line above it when present.
fn extract_address(lines: &[&str]) -> Option<String> {
    let idx = lines.iter().position(|l| POSTAL_LINE.is_match(l))?;
    let city = lines[idx];
    match idx.checked_sub(1).map(|i| lines[i]) {
        Some(street) if STREET_LINE.is_match(street) => Some(format!("{street}, {city}")),
        _ => Some(city.to_string()),
    }
}

fn extract_executives(lines: &[&str]) -> Vec<Candidate> {
    let mut found: Vec<Candidate> = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        let (title, rest) = if let Some(caps) = ROLE_LABEL.captures(line) {
            let label = caps.get(1).map_or("", |m| m.as_str());
            let rest = caps.get(2).map_or("", |m| m.as_str());
            (Some(role_title(label)), rest)
        } else if let Some(caps) = REPRESENTED_BY.captures(line) {
            (None, caps.get(1).map_or("", |m| m.as_str()))
        } else {
            continue;
        };

        // "Geschäftsführer:" on its own line, names on the next
        let names_line = if rest.trim().is_empty() {
            match lines.get(i + 1) {
                // a labelled line follows and is handled on its own
                Some(next) if ROLE_LABEL.is_match(next) => continue,
                Some(next) => *next,
                None => continue,
            }
        } else {
            rest
        };

        for part in NAME_SEPARATORS.split(names_line) {
            let name = strip_academic_titles(part.trim());
            if !is_plausible_person_name(name) {
                continue;
            }
            let Some(mut candidate) = Candidate::new(name, CandidateSource::Impressum) else {
                continue;
            };
            if found.iter().any(|c| c.identity_key() == candidate.identity_key()) {
                continue;
            }
            if let Some(title) = title {
                candidate = candidate.with_title(title);
            }
            found.push(candidate);
        }
    }
    found
}

fn role_title(label: &str) -> &'static str {
    let lower = label.to_lowercase();
    if lower.starts_with("geschäftsf") {
        "Geschäftsführer"
    } else if lower.starts_with("vorstand") {
        "Vorstand"
    } else if lower.starts_with("inhaber") {
        "Inhaber"
    } else {
        "Managing Director"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const IMPRESSUM: &str = r#"<html><body>
        <header><a href="/">Startseite</a></header>
        <main>
          <h1>Impressum</h1>
          <p>Firma GmbH<br>Hauptstraße 12a<br>10115 Berlin</p>
          <p>Telefon: +49 (0) 30 / 123 456 78<br>Telefax: +49 30 123 456 79<br>
             Mobil: 0171 2345678</p>
          <p>E-Mail: info@firma.de</p>
          <p>Vertreten durch den Geschäftsführer Dr. Max Müller und Anna Schmidt</p>
          <p>Registergericht: Amtsgericht Charlottenburg, HRB 123456</p>
          <p>Datenschutz: julia.wagner@firma.de</p>
        </main></body></html>"#;

    #[test]
    fn parses_full_notice() {
        let info = extract_registry(IMPRESSUM, "https://www.firma.de/impressum");
        assert_eq!(info.phones, vec!["+493012345678", "+491712345678"]);
        assert_eq!(info.emails, vec!["info@firma.de", "julia.wagner@firma.de"]);
        assert_eq!(info.address.as_deref(), Some("Hauptstraße 12a, 10115 Berlin"));
        assert_eq!(info.website.as_deref(), Some("https://www.firma.de/impressum"));

        let names: Vec<&str> = info.executives.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Max Müller", "Anna Schmidt", "Julia Wagner"]);
        assert_eq!(info.executives[0].title.as_deref(), Some("Geschäftsführer"));
        assert_eq!(info.executives[2].email.as_deref(), Some("julia.wagner@firma.de"));
        assert!(info.executives.iter().all(|c| c.source == CandidateSource::Impressum));
    }

    #[test]
    fn names_on_following_line() {
        let lines = ["Geschäftsführerin:", "Sabine Becker, Prof. Dr. Jan Vogel"];
        let execs = extract_executives(&lines);
        let names: Vec<&str> = execs.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["Sabine Becker", "Jan Vogel"]);
    }

    #[test]
    fn registry_numbers_are_not_phones() {
        let lines = ["HRB 123456", "USt-IdNr.: DE 123456789", "10115 Berlin"];
        assert!(extract_phones(&lines).is_empty());
    }

    #[test]
    fn austrian_number_kept() {
        let lines = ["Tel.: +43 1 234 56 78"];
        assert_eq!(extract_phones(&lines), vec!["+4312345678"]);
    }

    #[test]
    fn notice_without_people() {
        let info = extract_registry("<p>Firma AG</p><p>Tel 030 1234567</p>", "https://firma.de/kontakt");
        assert!(info.executives.is_empty());
        assert_eq!(info.phones, vec!["+49301234567"]);
        assert_eq!(info.address, None);
    }
}
