//! Page-specific extractors.
//!
//! Each extractor works on an already fetched HTML document and never does
//! I/O itself; `WebScraper` decides which pages to fetch.

pub mod about;
pub mod impressum;
pub mod job_page;
pub mod team_page;

use std::sync::LazyLock;

use regex::Regex;

use crate::text::truncate_chars;

static ACADEMIC_PREFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:(?:Dr|Prof|Dipl\.-\p{L}+|Ing|Mag|rer\.\s?nat|med)\.?\s+)+").expect("valid regex")
});

/// Text around the byte range `start..end`, widened by `radius` chars on each side.
pub(crate) fn context_window(text: &str, start: usize, end: usize, radius: usize) -> &str {
    let before = &text[..start];
    let from = before
        .char_indices()
        .rev()
        .nth(radius.saturating_sub(1))
        .map(|(i, _)| i)
        .unwrap_or(0);
    let after = truncate_chars(&text[end..], radius);
    &text[from..end + after.len()]
}

/// Drop leading academic titles: `Prof. Dr. Jan Vogel` becomes `Jan Vogel`.
pub(crate) fn strip_academic_titles(name: &str) -> &str {
    match ACADEMIC_PREFIX.find(name) {
        Some(m) => &name[m.end()..],
        None => name,
    }
}

/// Number of ASCII digits in `s`.
pub(crate) fn digit_count(s: &str) -> usize {
    s.chars().filter(char::is_ascii_digit).count()
}
