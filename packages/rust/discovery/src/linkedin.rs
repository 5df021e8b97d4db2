//! Heuristics for reading LinkedIn results out of web search hits.

use std::sync::LazyLock;

use regex::Regex;

use leadenrich_shared::contact::is_plausible_person_name;

use crate::SearchHit;

static PROFILE_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)linkedin\.com/(?:[a-z]{2}/)?in/([^/?#\s]+)").expect("valid regex")
});

static LINKEDIN_SUFFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\s*\|\s*linkedin.*$").expect("valid regex"));

static TITLE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+[-–—]\s+").expect("valid regex"));

/// Phrases that mark a past position.
const FORMER_MARKERS: &[&str] = &[
    "ehemals", "ehemalig", "früher", "former", "formerly", "previously", "ex-", "bis 20",
    "until 20",
];

/// Whether the link points at a personal profile (not a company page).
pub fn is_profile_url(url: &str) -> bool {
    PROFILE_PATH.is_match(url)
}

/// Canonical `https://www.linkedin.com/in/<slug>` form of a profile link.
///
/// Strips country subdomains, locale path segments, query strings and
/// trailing slashes. Non-profile links are returned trimmed.
pub fn normalize_profile_url(url: &str) -> String {
    match PROFILE_PATH.captures(url).and_then(|c| c.get(1)) {
        Some(slug) => format!("https://www.linkedin.com/in/{}", slug.as_str()),
        None => url.trim().to_string(),
    }
}

/// Score how well a hit matches the person and company.
///
/// First name in title +2, last name in title +3, each name part in the
/// snippet +1, and +2 when a company word longer than three letters appears.
pub fn score_profile_hit(hit: &SearchHit, name: &str, company: &str) -> u32 {
    let title = hit.title.to_lowercase();
    let snippet = hit.snippet.to_lowercase();
    let lower_name = name.to_lowercase();
    let parts: Vec<&str> = lower_name.split_whitespace().collect();
    let first = parts.first().copied().unwrap_or_default();
    let last = if parts.len() > 1 {
        parts.last().copied().unwrap_or_default()
    } else {
        ""
    };

    let mut score = 0;
    if !first.is_empty() && title.contains(first) {
        score += 2;
    }
    if !last.is_empty() && title.contains(last) {
        score += 3;
    }
    if !first.is_empty() && snippet.contains(first) {
        score += 1;
    }
    if !last.is_empty() && snippet.contains(last) {
        score += 1;
    }

    let company = company.to_lowercase();
    if company
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .any(|w| title.contains(w) || snippet.contains(w))
    {
        score += 2;
    }
    score
}

/// Person name from a result title like `Max Müller - HR Manager | LinkedIn`.
pub fn name_from_result_title(title: &str) -> Option<String> {
    let stripped = LINKEDIN_SUFFIX.replace(title, "");
    let name = TITLE_SEPARATOR.split(&stripped).next()?.trim();
    is_plausible_person_name(name).then(|| name.to_string())
}

/// Whether the hit reads as a present-day position at the company.
pub fn snippet_confirms_current(hit: &SearchHit, company: &str) -> bool {
    let text = format!("{} {}", hit.title, hit.snippet).to_lowercase();
    if FORMER_MARKERS.iter().any(|m| text.contains(m)) {
        return false;
    }
    company
        .to_lowercase()
        .split_whitespace()
        .filter(|w| w.chars().count() > 3)
        .any(|w| text.contains(w))
}

/// Positions worth searching for, given the posting's category.
pub fn positions_for_category(category: Option<&str>) -> Vec<&'static str> {
    let mut positions = vec!["Geschäftsführer", "HR Manager", "Personalleiter"];
    let Some(category) = category else {
        return positions;
    };

    let lower = category.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has = |needle: &str| tokens.iter().any(|t| t.contains(needle));

    if tokens.contains(&"it") || has("software") || has("tech") || has("entwicklung") {
        positions.insert(1, "CTO");
    } else if has("sales") || has("vertrieb") {
        positions.insert(1, "Vertriebsleiter");
    } else if has("marketing") {
        positions.insert(1, "Marketing-Leiter");
    }
    positions
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(title: &str, snippet: &str) -> SearchHit {
        SearchHit {
            link: "https://linkedin.com/in/x".into(),
            title: title.into(),
            snippet: snippet.into(),
        }
    }

    #[test]
    fn profile_urls() {
        assert!(is_profile_url("https://www.linkedin.com/in/anna"));
        assert!(is_profile_url("https://linkedin.com/de/in/anna"));
        assert!(!is_profile_url("https://www.linkedin.com/company/firma"));
        assert!(!is_profile_url("https://firma.de/in/anna"));
    }

    #[test]
    fn normalizes_profile_urls() {
        assert_eq!(
            normalize_profile_url("http://de.linkedin.com/in/anna-schmidt/?originalSubdomain=de"),
            "https://www.linkedin.com/in/anna-schmidt"
        );
        assert_eq!(
            normalize_profile_url("https://www.linkedin.com/de/in/max-mueller-42/"),
            "https://www.linkedin.com/in/max-mueller-42"
        );
        assert_eq!(normalize_profile_url(" https://x.de "), "https://x.de");
    }

    #[test]
    fn scoring() {
        let h = hit(
            "Anna Schmidt - Recruiting - Firma GmbH | LinkedIn",
            "Anna Schmidt. Firma GmbH. Berlin",
        );
        assert_eq!(score_profile_hit(&h, "Anna Schmidt", "Firma GmbH"), 9);

        let h = hit("Schmidt | LinkedIn", "");
        assert_eq!(score_profile_hit(&h, "Anna Schmidt", ""), 3);

        let h = hit("Anna Becker", "");
        assert_eq!(score_profile_hit(&h, "Anna Schmidt", "AB"), 2);
    }

    #[test]
    fn names_from_titles() {
        assert_eq!(
            name_from_result_title("Max Müller - HR Manager - Firma | LinkedIn").as_deref(),
            Some("Max Müller")
        );
        assert_eq!(
            name_from_result_title("Anne-Sophie Wagner – CTO | LinkedIn").as_deref(),
            Some("Anne-Sophie Wagner")
        );
        assert_eq!(name_from_result_title("Geschäftsführer | LinkedIn"), None);
        assert_eq!(name_from_result_title(""), None);
    }

    #[test]
    fn current_employment() {
        assert!(snippet_confirms_current(
            &hit("Max Müller - CEO - Firma GmbH", "Geschäftsführer seit 2019"),
            "Firma GmbH"
        ));
        assert!(!snippet_confirms_current(
            &hit("Max Müller - CEO", "Ehemaliger Geschäftsführer Firma GmbH"),
            "Firma GmbH"
        ));
        assert!(!snippet_confirms_current(&hit("Max Müller", "Berlin"), "Firma GmbH"));
    }

    #[test]
    fn positions_by_category() {
        assert_eq!(positions_for_category(None).len(), 3);
        assert_eq!(positions_for_category(Some("IT / Software"))[1], "CTO");
        assert_eq!(positions_for_category(Some("Vertrieb"))[1], "Vertriebsleiter");
        assert_eq!(positions_for_category(Some("Marketing & PR"))[1], "Marketing-Leiter");
        // "Recruiting" must not be mistaken for IT
        assert_eq!(positions_for_category(Some("Recruiting"))[1], "HR Manager");
    }
}
