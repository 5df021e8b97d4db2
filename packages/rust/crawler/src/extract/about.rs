//! "About us" page text and the hard facts that can be read from it.

use std::sync::LazyLock;

use regex::Regex;

use crate::text::{truncate_chars, visible_text_excluding};

/// Text kept per about page, in characters.
pub const MAX_ABOUT_CHARS: usize = 8_000;

/// Pages with less text than this carry no usable description.
const MIN_ABOUT_CHARS: usize = 100;

const DESCRIPTION_CHARS: usize = 500;

static FOUNDED: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)gegründet\s*(?:im\s*jahr\s*)?(\d{4})",
        r"(?i)seit\s+(\d{4})",
        r"(?i)founded\s*(?:in\s*)?(\d{4})",
        r"(?i)established\s*(?:in\s*)?(\d{4})",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

static EMPLOYEES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)(\d+(?:\.\d+)?)\s*(?:Mitarbeiter|Mitarbeitende|Angestellte|employees)",
        r"(?i)(?:über|mehr als|around|over)\s*(\d+)\s*(?:Mitarbeiter|employees)",
        r"(?i)team\s*(?:von|of)\s*(\d+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("valid regex"))
    .collect()
});

/// Facts read from about-page text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AboutFacts {
    pub founded: Option<String>,
    pub employee_count: Option<String>,
    pub description: String,
}

/// Readable text of an about page as one whitespace-collapsed paragraph.
///
/// Returns `None` when the page has too little text to be useful.
pub fn about_text(html: &str) -> Option<String> {
    let text = visible_text_excluding(html, &["aside", "form"]);
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let text = truncate_chars(&collapsed, MAX_ABOUT_CHARS);
    (text.chars().count() > MIN_ABOUT_CHARS).then(|| text.to_string())
}

/// Founding year, head count and a short description from about text.
pub fn extract_facts(text: &str) -> AboutFacts {
    let first_capture = |patterns: &[Regex]| {
        patterns
            .iter()
            .find_map(|re| re.captures(text).and_then(|c| c.get(1)))
            .map(|m| m.as_str().to_string())
    };

    AboutFacts {
        founded: first_capture(&FOUNDED),
        employee_count: first_capture(&EMPLOYEES),
        description: truncate_chars(text, DESCRIPTION_CHARS).trim().to_string(),
    }
}
