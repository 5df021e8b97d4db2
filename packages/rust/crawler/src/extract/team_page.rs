//! Team page member extraction.
//!
//! Team pages are mostly cards: a name heading followed by a role line,
//! sometimes `Name | Role` on one line. Both shapes are recognised on the
//! visible text; leadership and HR people are listed first.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use leadenrich_shared::contact::{extract_emails, is_generic_email, is_plausible_person_name};
use leadenrich_shared::{Candidate, CandidateSource};

use super::strip_academic_titles;
use crate::text::visible_text;

/// Members kept per page.
pub const MAX_MEMBERS: usize = 20;

/// Lines after a name searched for its role and email.
const CARD_LOOKAHEAD: usize = 3;

static INLINE_SEPARATOR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*(?:\||–|—|,|\s-\s)\s*").expect("valid regex"));

/// Role keywords grouped by outreach value, best group first.
const ROLE_GROUPS: &[&[&str]] = &[
    &[
        "geschäftsführ", "ceo", "inhaber", "gründer", "founder", "vorstand", "managing", "cto",
        "cfo", "coo", "owner", "prokurist",
    ],
    &["personal", "hr", "human resources", "recruit", "talent", "people"],
    &["leiter", "leitung", "head", "director", "direktor", "lead"],
    &[
        "manager", "vertrieb", "sales", "marketing", "partner", "assistenz", "referent",
        "berater", "consultant", "entwickler", "developer", "engineer", "projekt", "office",
    ],
];

/// Extract team members from a team page.
pub fn extract_team_members(html: &str) -> Vec<Candidate> {
    let text = visible_text(html);
    let lines: Vec<&str> = text.lines().map(str::trim).filter(|l| !l.is_empty()).collect();

    let mut seen = HashSet::new();
    let mut members: Vec<(usize, Candidate)> = Vec::new();

    for (i, line) in lines.iter().enumerate() {
        let Some((name, role)) = card_at(&lines, i, line) else {
            continue;
        };
        let Some(mut candidate) = Candidate::new(strip_academic_titles(&name), CandidateSource::TeamPage)
        else {
            continue;
        };
        if !seen.insert(candidate.identity_key()) {
            continue;
        }
        candidate = candidate.with_title(role);

        let window_end = (i + 1 + CARD_LOOKAHEAD).min(lines.len());
        if let Some(email) = lines[i + 1..window_end]
            .iter()
            .flat_map(|l| extract_emails(l))
            .find(|e| !is_generic_email(e) && email_matches(e, &candidate))
        {
            candidate = candidate.with_email(email);
        }

        let rank = candidate.title.as_deref().map_or(ROLE_GROUPS.len(), role_rank);
        members.push((rank, candidate));
    }

    // stable: page order is kept inside each group
    members.sort_by_key(|(rank, _)| *rank);
    members
        .into_iter()
        .map(|(_, c)| c)
        .take(MAX_MEMBERS)
        .collect()
}

/// Name and role of a card starting at line `i`, if any.
fn card_at(lines: &[&str], i: usize, line: &str) -> Option<(String, String)> {
    if is_plausible_person_name(line) {
        let role = lines.get(i + 1).filter(|next| is_role(next))?;
        return Some((line.to_string(), role.to_string()));
    }

    let mut parts = INLINE_SEPARATOR.splitn(line, 2);
    let name = parts.next()?.trim();
    let role = parts.next()?.trim();
    (is_plausible_person_name(name) && is_role(role)).then(|| (name.to_string(), role.to_string()))
}

fn is_role(text: &str) -> bool {
    text.chars().count() <= 80 && role_rank(text) < ROLE_GROUPS.len()
}

fn role_rank(role: &str) -> usize {
    let lower = role.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    ROLE_GROUPS
        .iter()
        .position(|group| {
            group.iter().any(|kw| {
                // short keywords must be whole words ("hr" is not "Ihre")
                if kw.chars().count() <= 3 {
                    words.contains(kw)
                } else {
                    lower.contains(kw)
                }
            })
        })
        .unwrap_or(ROLE_GROUPS.len())
}

fn email_matches(email: &str, candidate: &Candidate) -> bool {
    let local = email.split('@').next().unwrap_or_default().to_lowercase();
    // final surname token, "von Müller" is matched as "mueller"
    let last = candidate.name.rsplit(' ').next().unwrap_or_default().to_lowercase();
    let transliterated = last.replace('ä', "ae").replace('ö', "oe").replace('ü', "ue").replace('ß', "ss");
    local.contains(&last) || local.contains(&transliterated)
}
