//! Final result assembly: email reconciliation, name check and phone status.

use std::collections::HashSet;

use tracing::{info, warn};

use leadenrich_shared::contact::{
    email_domain, is_asset_like, is_generic_email, is_plausible_person_name, name_from_email,
    normalize_domain,
};
use leadenrich_shared::{Candidate, CompanyInfo, DecisionMaker, PhoneResult, PhoneStatus, PhoneType};

use crate::trail::RunTrail;

/// Facts the status decision depends on.
#[derive(Debug, Clone, Copy, Default)]
pub struct StatusInputs<'a> {
    pub phone: Option<&'a PhoneResult>,
    pub skip_paid: bool,
    pub decision_maker: Option<&'a DecisionMaker>,
    pub filtered_non_dach: bool,
}

/// Terminal phone status, first matching rule wins.
pub fn determine_status(inputs: StatusInputs<'_>) -> PhoneStatus {
    if let Some(phone) = inputs.phone {
        return match phone.phone_type {
            PhoneType::Mobile => PhoneStatus::FoundMobile,
            PhoneType::Landline | PhoneType::Unknown => PhoneStatus::FoundLandline,
        };
    }
    if inputs.skip_paid {
        return PhoneStatus::SkippedPaidApi;
    }
    let Some(dm) = inputs.decision_maker else {
        return PhoneStatus::NoDecisionMaker;
    };
    if dm.linkedin_url.is_none() {
        return PhoneStatus::NoLinkedin;
    }
    if inputs.filtered_non_dach {
        return PhoneStatus::FilteredNonDach;
    }
    PhoneStatus::ApiNoResult
}

/// A run counts as successful when it produced anything to call or write to.
pub fn is_success(phone: Option<&PhoneResult>, company: &CompanyInfo, emails: &[String]) -> bool {
    phone.is_some() || company.phone.is_some() || !emails.is_empty()
}

/// Trimmed, lowercased, deduplicated addresses in first-seen order.
pub fn reconcile_emails(raw: &[String]) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.iter()
        .map(|e| e.trim().to_lowercase())
        .filter(|e| e.contains('@') && !is_asset_like(e))
        .filter(|e| seen.insert(e.clone()))
        .collect()
}

/// Personal addresses at the company domain, in order.
fn company_addresses<'a>(emails: &'a [String], domain: Option<&str>) -> Vec<&'a str> {
    let Some(domain) = domain.map(normalize_domain).filter(|d| !d.is_empty()) else {
        return Vec::new();
    };
    emails
        .iter()
        .map(String::as_str)
        .filter(|e| !is_generic_email(e) && email_domain(e).as_deref() == Some(domain.as_str()))
        .collect()
}

/// Give an email-less decision maker the first personal company address.
pub fn assign_company_email(dm: &mut DecisionMaker, emails: &[String], domain: Option<&str>) {
    if dm.email.is_some() {
        return;
    }
    if let Some(email) = company_addresses(emails, domain).first() {
        info!(%email, "assigned company email to decision maker");
        dm.email = Some((*email).to_string());
    }
}

/// Keep the decision maker only if its name looks like a person.
///
/// A bad name is recovered from a `first.last@` address (own email first,
/// then collected company addresses); without one the decision maker is dropped.
pub fn check_name(
    dm: DecisionMaker,
    emails: &[String],
    domain: Option<&str>,
    trail: &mut RunTrail,
) -> Option<DecisionMaker> {
    if is_plausible_person_name(&dm.name) {
        return Some(dm);
    }

    let recovered = dm
        .email
        .as_deref()
        .into_iter()
        .chain(company_addresses(emails, domain))
        .find_map(name_from_email)
        .and_then(|name| Candidate::new(&name, leadenrich_shared::CandidateSource::JobPosting));

    match recovered {
        Some(person) => {
            info!(rejected = %dm.name, recovered = %person.name, "decision maker name recovered from email");
            trail.tag("dm_name_recovered_from_email");
            Some(DecisionMaker {
                first_name: person.first_name().to_string(),
                last_name: person.last_name().to_string(),
                name: person.name,
                ..dm
            })
        }
        None => {
            warn!(rejected = %dm.name, "decision maker name is not a person");
            trail.tag("dm_name_rejected");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use leadenrich_shared::{CandidateSource, PhoneSource};

    fn dm(name: &str) -> DecisionMaker {
        let candidate = Candidate::new(name, CandidateSource::TeamPage).unwrap();
        DecisionMaker::from(&candidate)
    }

    fn phone(phone_type: PhoneType) -> PhoneResult {
        PhoneResult {
            number: "+4930123456".into(),
            phone_type,
            source: PhoneSource::Kaspr,
        }
    }

    fn emails(list: &[&str]) -> Vec<String> {
        list.iter().map(|e| e.to_string()).collect()
    }

    #[test]
    fn status_precedence() {
        let mobile = phone(PhoneType::Mobile);
        let unknown = phone(PhoneType::Unknown);
        let without_linkedin = dm("Anna Schmidt");
        let mut with_linkedin = dm("Anna Schmidt");
        with_linkedin.linkedin_url = Some("https://www.linkedin.com/in/anna".into());

        let status = |inputs| determine_status(inputs);
        assert_eq!(
            status(StatusInputs { phone: Some(&mobile), skip_paid: true, ..Default::default() }),
            PhoneStatus::FoundMobile
        );
        assert_eq!(
            status(StatusInputs { phone: Some(&unknown), ..Default::default() }),
            PhoneStatus::FoundLandline
        );
        assert_eq!(
            status(StatusInputs { skip_paid: true, ..Default::default() }),
            PhoneStatus::SkippedPaidApi
        );
        assert_eq!(
            status(StatusInputs { filtered_non_dach: true, ..Default::default() }),
            PhoneStatus::NoDecisionMaker
        );
        assert_eq!(
            status(StatusInputs {
                decision_maker: Some(&without_linkedin),
                filtered_non_dach: true,
                ..Default::default()
            }),
            PhoneStatus::NoLinkedin
        );
        assert_eq!(
            status(StatusInputs {
                decision_maker: Some(&with_linkedin),
                filtered_non_dach: true,
                ..Default::default()
            }),
            PhoneStatus::FilteredNonDach
        );
        assert_eq!(
            status(StatusInputs { decision_maker: Some(&with_linkedin), ..Default::default() }),
            PhoneStatus::ApiNoResult
        );
    }

    #[test]
    fn success_needs_a_phone_or_email() {
        let mut company = CompanyInfo::default();
        assert!(!is_success(None, &company, &[]));
        assert!(is_success(None, &company, &emails(&["a@b.de"])));
        company.phone = Some("+49401234560".into());
        assert!(is_success(None, &company, &[]));
    }

    #[test]
    fn emails_are_deduplicated() {
        let raw = emails(&[
            " Anna.Schmidt@Firma.de ",
            "anna.schmidt@firma.de",
            "logo@2x.png",
            "kein-email",
            "info@firma.de",
        ]);
        assert_eq!(reconcile_emails(&raw), vec!["anna.schmidt@firma.de", "info@firma.de"]);
    }

    #[test]
    fn company_email_must_match_domain() {
        let collected = emails(&["info@firma.de", "max@gmail.com", "max.mueller@firma.de"]);

        let mut person = dm("Max Müller");
        assign_company_email(&mut person, &collected, Some("https://www.Firma.de"));
        assert_eq!(person.email.as_deref(), Some("max.mueller@firma.de"));

        let mut person = dm("Max Müller");
        assign_company_email(&mut person, &emails(&["info@firma.de", "max@gmail.com"]), Some("firma.de"));
        assert!(person.email.is_none());

        let mut person = dm("Max Müller");
        assign_company_email(&mut person, &collected, None);
        assert!(person.email.is_none());
    }

    #[test]
    fn own_email_is_kept() {
        let mut person = dm("Max Müller");
        person.email = Some("max@gmail.com".into());
        assign_company_email(&mut person, &emails(&["max.mueller@firma.de"]), Some("firma.de"));
        assert_eq!(person.email.as_deref(), Some("max@gmail.com"));
    }

    #[test]
    fn plausible_name_passes() {
        let mut trail = RunTrail::new();
        let kept = check_name(dm("Anna Schmidt"), &[], None, &mut trail).unwrap();
        assert_eq!(kept.name, "Anna Schmidt");
        assert!(trail.path().is_empty());
    }

    #[test]
    fn bad_name_recovered_from_email() {
        let mut trail = RunTrail::new();
        let mut garbage = dm("Weitere Informationen");
        garbage.title = Some("HR".into());
        let collected = emails(&["jobs@firma.de", "lena.vogel@firma.de"]);

        let fixed = check_name(garbage, &collected, Some("firma.de"), &mut trail).unwrap();
        assert_eq!(fixed.name, "Lena Vogel");
        assert_eq!(fixed.first_name, "Lena");
        assert_eq!(fixed.last_name, "Vogel");
        assert_eq!(fixed.title.as_deref(), Some("HR"));
        assert!(trail.has("dm_name_recovered_from_email"));
    }

    #[test]
    fn own_email_wins_for_recovery() {
        let mut trail = RunTrail::new();
        let mut garbage = dm("Unser Team");
        garbage.email = Some("jonas.weber@firma.de".into());
        let fixed = check_name(garbage, &emails(&["lena.vogel@firma.de"]), Some("firma.de"), &mut trail)
            .unwrap();
        assert_eq!(fixed.name, "Jonas Weber");
    }

    #[test]
    fn unrecoverable_name_is_dropped() {
        let mut trail = RunTrail::new();
        let dropped = check_name(dm("Mehr Erfahren"), &emails(&["info@firma.de"]), Some("firma.de"), &mut trail);
        assert!(dropped.is_none());
        assert!(trail.has("dm_name_rejected"));
    }
}
