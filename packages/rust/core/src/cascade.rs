//! Paid phone lookup across ranked candidates.
//!
//! Vendors are tried in cost order per candidate: FullEnrich by name, then
//! Kaspr by LinkedIn profile when FullEnrich found no mobile. The first
//! candidate with an accepted DACH number wins.

use tracing::{info, instrument};

use leadenrich_shared::collab::NameQuery;
use leadenrich_shared::{
    Candidate, PhoneAttempt, PhoneResult, PhoneSource, PipelineConfig, RawPhone, VendorLookup,
};

use crate::pipeline::{Collaborators, guarded, log_failure};
use crate::trail::RunTrail;

/// What the cascade settled on.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CascadeOutcome {
    pub phone: Option<PhoneResult>,
    /// Candidate the phone belongs to, or the top candidate when none was found.
    pub decision_maker: Option<Candidate>,
    /// Some vendor returned numbers and all of them were outside DACH.
    pub filtered_non_dach: bool,
}

/// First candidate carrying a DACH-valid phone from the posting itself.
pub fn input_phone(candidates: &[Candidate]) -> Option<(usize, PhoneResult)> {
    candidates.iter().enumerate().find_map(|(i, c)| {
        let raw = RawPhone::new(c.phone.as_deref()?);
        PhoneResult::accept(&raw, PhoneSource::CompanyMain).map(|p| (i, p))
    })
}

/// One cascade run for a company.
pub(crate) struct PhoneCascade<'a> {
    pub collaborators: &'a Collaborators,
    pub config: &'a PipelineConfig,
    pub company: &'a str,
    pub domain: Option<&'a str>,
}

impl PhoneCascade<'_> {
    /// Try candidates in rank order until one yields a phone.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn run(&self, candidates: Vec<Candidate>, trail: &mut RunTrail) -> CascadeOutcome {
        let mut filtered_non_dach = false;
        let mut tried = Vec::with_capacity(candidates.len());

        for (i, mut candidate) in candidates.into_iter().enumerate() {
            info!(candidate = %candidate.name, rank = i + 1, "phone lookup");

            if candidate.linkedin_url.is_none() && candidate.source.resolves_linkedin() {
                self.resolve_linkedin(&mut candidate, trail).await;
            }

            let mut phone = self
                .by_name(&mut candidate, trail, &mut filtered_non_dach)
                .await;

            if !phone.as_ref().is_some_and(PhoneResult::is_mobile) {
                if let Some(found) = self
                    .by_profile(&candidate, trail, &mut filtered_non_dach)
                    .await
                {
                    match phone {
                        None => phone = Some(found),
                        Some(_) if found.is_mobile() => {
                            trail.tag("kaspr_mobile_upgrade");
                            phone = Some(found);
                        }
                        Some(_) => {}
                    }
                }
            }

            if let Some(phone) = phone {
                trail.tag(format!("phone_found_candidate_{}", i + 1));
                info!(candidate = %candidate.name, source = %phone.source, "phone found");
                return CascadeOutcome {
                    phone: Some(phone),
                    decision_maker: Some(candidate),
                    filtered_non_dach,
                };
            }
            tried.push(candidate);
        }

        let best = tried.into_iter().next();
        if best.is_some() {
            trail.tag("using_best_candidate_no_phone");
        }
        CascadeOutcome {
            phone: None,
            decision_maker: best,
            filtered_non_dach,
        }
    }

    /// Free-only run: no vendor calls, but the top candidate still gets the
    /// search-based LinkedIn lookup.
    #[instrument(skip_all, fields(candidates = candidates.len()))]
    pub async fn run_free(&self, candidates: Vec<Candidate>, trail: &mut RunTrail) -> CascadeOutcome {
        let Some(mut best) = candidates.into_iter().next() else {
            return CascadeOutcome::default();
        };
        if best.linkedin_url.is_none() && best.source.resolves_linkedin() {
            self.resolve_linkedin(&mut best, trail).await;
        }
        trail.tag("using_best_candidate_no_phone");
        CascadeOutcome {
            decision_maker: Some(best),
            ..CascadeOutcome::default()
        }
    }

    async fn resolve_linkedin(&self, candidate: &mut Candidate, trail: &mut RunTrail) {
        let Some(search) = &self.collaborators.profile_search else {
            return;
        };
        let first = candidate.first_name().to_string();
        let call = search.find_linkedin_profile(&candidate.name, self.company, self.domain);
        match guarded(self.config.step_timeout, call).await {
            Ok(Some(url)) => {
                candidate.linkedin_url = Some(url);
                trail.tag(format!("linkedin_found_{first}"));
            }
            Ok(None) => trail.tag(format!("linkedin_not_found_{first}")),
            Err(e) => {
                log_failure("linkedin_profile", &e);
                trail.tag(format!("linkedin_not_found_{first}"));
            }
        }
    }

    /// FullEnrich lookup. Adopts a returned LinkedIn URL when the candidate has none.
    async fn by_name(
        &self,
        candidate: &mut Candidate,
        trail: &mut RunTrail,
        filtered: &mut bool,
    ) -> Option<PhoneResult> {
        let enricher = self.collaborators.name_enricher.as_ref()?;
        if self.company.trim().is_empty() && self.domain.is_none() {
            return None;
        }

        let query = NameQuery {
            first_name: candidate.first_name(),
            last_name: candidate.last_name(),
            company: self.company,
            domain: self.domain,
            linkedin_url: candidate.linkedin_url.as_deref(),
        };
        let lookup = match guarded(self.config.name_enricher_timeout, enricher.enrich_by_name(query)).await
        {
            Ok(lookup) => lookup,
            Err(e) => {
                log_failure("fullenrich", &e);
                if !e.is_unavailable() {
                    trail.tag("fullenrich_error");
                }
                return None;
            }
        };

        if candidate.linkedin_url.is_none() {
            if let Some(url) = lookup.linkedin_url.clone() {
                candidate.linkedin_url = Some(url);
                trail.tag("linkedin_from_fullenrich");
            }
        }
        self.evaluate(PhoneSource::FullEnrich, &lookup, trail, filtered)
            .await
    }

    /// Kaspr lookup. Needs a LinkedIn URL.
    async fn by_profile(
        &self,
        candidate: &Candidate,
        trail: &mut RunTrail,
        filtered: &mut bool,
    ) -> Option<PhoneResult> {
        let enricher = self.collaborators.profile_enricher.as_ref()?;
        let Some(url) = candidate.linkedin_url.as_deref() else {
            trail.tag("kaspr_skipped_no_linkedin");
            return None;
        };

        match guarded(self.config.step_timeout, enricher.enrich_by_linkedin(url, &candidate.name)).await {
            Ok(lookup) => self.evaluate(PhoneSource::Kaspr, &lookup, trail, filtered).await,
            Err(e) => {
                log_failure("kaspr", &e);
                if !e.is_unavailable() {
                    trail.tag("kaspr_error");
                }
                None
            }
        }
    }

    /// Tag, record and filter one vendor answer.
    async fn evaluate(
        &self,
        source: PhoneSource,
        lookup: &VendorLookup,
        trail: &mut RunTrail,
        filtered: &mut bool,
    ) -> Option<PhoneResult> {
        let vendor = source.as_str();
        trail.tag(vendor);
        trail.collect_emails(&lookup.emails);

        let best = PhoneResult::best_of(&lookup.phones, source);
        if lookup.phones.is_empty() {
            trail.tag(format!("{vendor}_no_phone"));
        } else if best.is_some() {
            trail.tag(format!("{vendor}_phone_found"));
        } else {
            trail.tag(format!("{vendor}_filtered_non_dach"));
            *filtered = true;
        }

        if let Some(stats) = &self.collaborators.stats {
            stats.record(&PhoneAttempt {
                service: source,
                phones_returned: lookup.phones.iter().map(|p| p.number.clone()).collect(),
                accepted: best.as_ref().map(|p| p.phone_type),
            })
            .await;
        }
        best
    }
}
