//! DACH phone number predicate and classification.
//!
//! Every scraper, vendor parser and the enrichment cascade use these
//! functions, so a number accepted in one place is accepted everywhere.

use std::sync::LazyLock;

use regex::Regex;

use crate::types::PhoneType;

/// Minimum number of digits for a plausible phone number.
const MIN_DIGITS: usize = 8;

/// International prefixes accepted as DACH, paired with their country.
const DACH_PREFIXES: &[(&str, Country)] = &[
    ("+49", Country::De),
    ("+43", Country::At),
    ("+41", Country::Ch),
    ("0049", Country::De),
    ("0043", Country::At),
    ("0041", Country::Ch),
];

/// Country-code labels used for vendor statistics.
const COUNTRY_LABELS: &[(&str, &str)] = &[
    ("+420", "CZ"),
    ("+49", "DE"),
    ("+43", "AT"),
    ("+41", "CH"),
    ("+44", "UK"),
    ("+33", "FR"),
    ("+31", "NL"),
    ("+32", "BE"),
    ("+39", "IT"),
    ("+34", "ES"),
    ("+48", "PL"),
    ("+1", "US/CA"),
];

static DE_MOBILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^1[567]\d").expect("valid regex"));
static AT_MOBILE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^6\d").expect("valid regex"));
static CH_MOBILE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^7[6789]\d").expect("valid regex"));
static AREA_CODE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[2-9]\d").expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Country {
    De,
    At,
    Ch,
    /// Domestic format with a single leading `0`; treated as German.
    Domestic,
}

/// Strip everything except digits and `+`.
pub fn clean(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_digit() || *c == '+')
        .collect()
}

/// Split a cleaned number into its DACH country and the national part
/// (without country code or trunk `0`).
fn split_dach(cleaned: &str) -> Option<(Country, &str)> {
    for (prefix, country) in DACH_PREFIXES {
        if let Some(rest) = cleaned.strip_prefix(prefix) {
            // "+49 (0) 30 ..." leaves a trunk zero behind
            return Some((*country, rest.strip_prefix('0').unwrap_or(rest)));
        }
    }
    if cleaned.starts_with('0') && !cleaned.starts_with("00") {
        return Some((Country::Domestic, &cleaned[1..]));
    }
    None
}

/// Whether `raw` is a German, Austrian or Swiss phone number.
///
/// Formatting characters are ignored. At least 8 digits are required.
/// International numbers outside DACH are rejected.
pub fn is_valid_dach(raw: &str) -> bool {
    let cleaned = clean(raw);
    let digits = cleaned.chars().filter(char::is_ascii_digit).count();
    if digits < MIN_DIGITS {
        return false;
    }
    split_dach(&cleaned).is_some()
}

/// Classify a number as mobile, landline or unknown.
///
/// Non-DACH numbers are always [`PhoneType::Unknown`].
pub fn classify(raw: &str) -> PhoneType {
    if !is_valid_dach(raw) {
        return PhoneType::Unknown;
    }
    let cleaned = clean(raw);
    let Some((country, national)) = split_dach(&cleaned) else {
        return PhoneType::Unknown;
    };

    let mobile = match country {
        Country::De | Country::Domestic => DE_MOBILE.is_match(national),
        Country::At => AT_MOBILE.is_match(national),
        Country::Ch => CH_MOBILE.is_match(national),
    };
    if mobile {
        return PhoneType::Mobile;
    }

    match country {
        Country::De | Country::At | Country::Ch => PhoneType::Landline,
        // 0180/0900 service numbers and the like
        Country::Domestic if AREA_CODE.is_match(national) => PhoneType::Landline,
        Country::Domestic => PhoneType::Unknown,
    }
}

/// Normalize a DACH number to `+CC...` form. Domestic numbers become `+49`.
///
/// Returns `None` for numbers failing [`is_valid_dach`].
pub fn normalize(raw: &str) -> Option<String> {
    if !is_valid_dach(raw) {
        return None;
    }
    let cleaned = clean(raw);
    let (country, national) = split_dach(&cleaned)?;
    let code = match country {
        Country::De | Country::Domestic => "+49",
        Country::At => "+43",
        Country::Ch => "+41",
    };
    Some(format!("{code}{national}"))
}

/// Country label of a number for statistics (`DE`, `US/CA`, `DE (national)`, ...).
pub fn country_label(raw: &str) -> Option<String> {
    let cleaned = clean(raw);
    if cleaned.is_empty() {
        return None;
    }

    if cleaned.starts_with('+') {
        let label = COUNTRY_LABELS
            .iter()
            .find(|(prefix, _)| cleaned.starts_with(prefix))
            .map(|(_, label)| (*label).to_string())
            .unwrap_or_else(|| cleaned.chars().take(4).collect());
        return Some(label);
    }

    if let Some(rest) = cleaned.strip_prefix("00") {
        let label = if rest.starts_with("49") {
            "DE".to_string()
        } else if rest.starts_with("43") {
            "AT".to_string()
        } else if rest.starts_with("41") {
            "CH".to_string()
        } else {
            format!("00{}", rest.chars().take(3).collect::<String>())
        };
        return Some(label);
    }

    if cleaned.starts_with('0') {
        return Some("DE (national)".into());
    }

    Some("unknown".into())
}
