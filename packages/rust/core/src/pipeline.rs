//! End-to-end enrichment: posting → sources → candidates → phone → result.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{Span, debug, field, info, instrument, warn};

use leadenrich_shared::collab::{
    CandidateRanker, CompanyResearcher, JobPageSource, NameEnricher, PostingParser,
    ProfileEnricher, ProfileSearch, RegistrySource, StatsSink, TeamPageSource,
};
use leadenrich_shared::contact::normalize_domain;
use leadenrich_shared::phone;
use leadenrich_shared::{
    Candidate, CandidateSource, CollabResult, CollaboratorError, CompanyInfo, CompanyIntel,
    DecisionMaker, EnrichmentResult, JobPosting, MAX_VALIDATION_CANDIDATES, ParsedPosting,
    PipelineConfig, RegistryInfo, Result, RunId, ValidatedCandidate,
};

use crate::aggregate::CandidatePool;
use crate::assemble::{
    StatusInputs, assign_company_email, check_name, determine_status, is_success,
    reconcile_emails,
};
use crate::cascade::{CascadeOutcome, PhoneCascade, input_phone};
use crate::trail::RunTrail;

/// External collaborators injected into the [`Enricher`].
///
/// Every slot is optional. A missing collaborator disables its step.
#[derive(Clone, Default)]
pub struct Collaborators {
    pub parser: Option<Arc<dyn PostingParser>>,
    pub job_page: Option<Arc<dyn JobPageSource>>,
    pub registry: Option<Arc<dyn RegistrySource>>,
    pub team_page: Option<Arc<dyn TeamPageSource>>,
    pub profile_search: Option<Arc<dyn ProfileSearch>>,
    pub ranker: Option<Arc<dyn CandidateRanker>>,
    pub name_enricher: Option<Arc<dyn NameEnricher>>,
    pub profile_enricher: Option<Arc<dyn ProfileEnricher>>,
    pub researcher: Option<Arc<dyn CompanyResearcher>>,
    pub stats: Option<Arc<dyn StatsSink>>,
}

impl Collaborators {
    /// Which steps are wired, in pipeline order.
    pub fn summary(&self) -> Vec<(&'static str, bool)> {
        vec![
            ("posting parser", self.parser.is_some()),
            ("job page", self.job_page.is_some()),
            ("impressum", self.registry.is_some()),
            ("team page", self.team_page.is_some()),
            ("profile search", self.profile_search.is_some()),
            ("candidate ranker", self.ranker.is_some()),
            ("fullenrich", self.name_enricher.is_some()),
            ("kaspr", self.profile_enricher.is_some()),
            ("company research", self.researcher.is_some()),
            ("statistics", self.stats.is_some()),
        ]
    }
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called when the run completes.
    fn done(&self, result: &EnrichmentResult);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn done(&self, _result: &EnrichmentResult) {}
}

/// Run a collaborator call under a time budget. Running out is a failure.
pub(crate) async fn guarded<T, F>(budget: Duration, call: F) -> CollabResult<T>
where
    F: Future<Output = CollabResult<T>>,
{
    tokio::time::timeout(budget, call)
        .await
        .unwrap_or_else(|_| Err(CollaboratorError::Timeout(budget.as_secs())))
}

pub(crate) fn log_failure(step: &str, err: &CollaboratorError) {
    if err.is_unavailable() {
        debug!(step, error = %err, "step disabled");
    } else {
        warn!(step, error = %err, "step failed, continuing without it");
    }
}

/// Unwrap a step outcome, logging and tagging `{step}_error` on failure.
fn settled<T>(step: &str, outcome: Option<CollabResult<T>>, trail: &mut RunTrail) -> Option<T> {
    match outcome? {
        Ok(value) => Some(value),
        Err(e) => {
            log_failure(step, &e);
            if !e.is_unavailable() {
                trail.tag(format!("{step}_error"));
            }
            None
        }
    }
}

/// Outcomes of the concurrent source collectors. `None` means not attempted.
struct Collected {
    job_contact: Option<CollabResult<Option<Candidate>>>,
    registry: Option<CollabResult<Option<RegistryInfo>>>,
    team: Option<CollabResult<Vec<Candidate>>>,
    intel: Option<CollabResult<Option<CompanyIntel>>>,
    company_linkedin: Option<CollabResult<Option<String>>>,
}

/// Orchestrates one enrichment run per job posting.
#[derive(Clone)]
pub struct Enricher {
    collaborators: Collaborators,
    config: PipelineConfig,
}

impl Enricher {
    pub fn new(collaborators: Collaborators, config: PipelineConfig) -> Self {
        Self {
            collaborators,
            config,
        }
    }

    pub fn collaborators(&self) -> &Collaborators {
        &self.collaborators
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Enrich a posting without progress reporting.
    pub async fn enrich(&self, posting: &JobPosting, skip_paid: bool) -> Result<EnrichmentResult> {
        self.enrich_with_progress(posting, skip_paid, &SilentProgress)
            .await
    }

    /// Run the full enrichment.
    ///
    /// 1. Parse the posting and settle the company domain
    /// 2. Collect sources concurrently
    /// 3. Aggregate and rank candidates
    /// 4. Take a posting phone, or run the paid cascade
    /// 5. Assemble the result
    ///
    /// Only an invalid posting is an error. Failing collaborators degrade
    /// the result instead.
    #[instrument(skip_all, fields(run_id = field::Empty, job_id = %posting.id, company = %posting.company))]
    pub async fn enrich_with_progress(
        &self,
        posting: &JobPosting,
        skip_paid: bool,
        progress: &dyn ProgressReporter,
    ) -> Result<EnrichmentResult> {
        posting.validate()?;

        let start = Instant::now();
        let run_id = RunId::new();
        Span::current().record("run_id", field::display(run_id));
        info!(skip_paid, "starting enrichment");

        let mut trail = RunTrail::new();

        // --- Phase 1: Posting ---
        progress.phase("Parsing posting");
        let parsed = self.parse(posting).await;
        trail.tag("posting_parsed");

        let company = Some(parsed.company_name.trim())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| posting.company.trim())
            .to_string();
        let domain = self.company_domain(&parsed, &company, &mut trail).await;
        let category = posting
            .category
            .as_deref()
            .or(parsed.department.as_deref());

        // --- Phase 2: Sources ---
        progress.phase("Collecting sources");
        let collected = self
            .collect(posting, &company, domain.as_deref(), category)
            .await;

        let mut pool =
            CandidatePool::new(self.config.max_candidates.min(MAX_VALIDATION_CANDIDATES));
        trail.collect_email(parsed.contact_email.as_deref());
        if let Some(contact) = posting_contact(&parsed) {
            pool.offer(contact);
        }

        if let Some(Some(contact)) = settled("job_url", collected.job_contact, &mut trail) {
            trail.tag("job_url_contact");
            trail.collect_email(contact.email.as_deref());
            pool.offer(contact);
        }

        let registry = settled("impressum", collected.registry, &mut trail).flatten();
        let mut company_phone = None;
        if let Some(info) = &registry {
            trail.tag("impressum_found");
            trail.collect_emails(&info.emails);
            company_phone = info.phones.iter().find_map(|p| phone::normalize(p));
            if company_phone.is_some() {
                trail.tag("impressum_company_phone");
            }
        }

        if let Some(members) = settled("team_discovery", collected.team, &mut trail) {
            if !members.is_empty() {
                trail.tag(format!("team_discovery_{}_contacts", members.len()));
            }
            trail.collect_emails(members.iter().filter_map(|m| m.email.as_deref()));
            if !pool.is_full() {
                pool.extend(members);
            }
        }

        let RegistryInfo {
            address,
            executives,
            website,
            ..
        } = registry.unwrap_or_default();
        if !pool.is_full() {
            pool.extend(executives);
        }

        if !pool.is_full() {
            self.search_decision_makers(&mut pool, &company, domain.as_deref(), category, &mut trail)
                .await;
        }
        trail.tag(format!("total_{}_raw_candidates", pool.len()));
        info!(candidates = pool.len(), "candidates aggregated");

        // --- Phase 3: Ranking ---
        progress.phase("Ranking candidates");
        let ranked = self
            .rank(pool.into_vec(), &company, domain.as_deref(), category, &mut trail)
            .await;

        // --- Phase 4: Phone ---
        progress.phase("Looking up phone numbers");
        let cascade = PhoneCascade {
            collaborators: &self.collaborators,
            config: &self.config,
            company: &company,
            domain: domain.as_deref(),
        };
        let outcome = match input_phone(&ranked) {
            Some((index, found)) => {
                trail.tag("phone_from_input");
                info!(number = %found.number, "using phone from posting");
                CascadeOutcome {
                    phone: Some(found),
                    decision_maker: ranked.into_iter().nth(index),
                    filtered_non_dach: false,
                }
            }
            None if skip_paid => {
                info!("paid lookups skipped");
                cascade.run_free(ranked, &mut trail).await
            }
            None => cascade.run(ranked, &mut trail).await,
        };

        // --- Phase 5: Assembly ---
        progress.phase("Assembling result");
        let intel = settled("company_research", collected.intel, &mut trail).flatten();
        if intel.is_some() {
            trail.tag("company_research");
        }
        let company_linkedin =
            settled("company_linkedin", collected.company_linkedin, &mut trail).flatten();
        if company_linkedin.is_some() {
            trail.tag("company_linkedin_found");
        }

        let emails = reconcile_emails(trail.emails());
        let decision_maker = outcome
            .decision_maker
            .as_ref()
            .map(DecisionMaker::from)
            .and_then(|dm| check_name(dm, &emails, domain.as_deref(), &mut trail))
            .map(|mut dm| {
                assign_company_email(&mut dm, &emails, domain.as_deref());
                dm
            });

        let company = CompanyInfo {
            website: website.or_else(|| domain.as_ref().map(|d| format!("https://{d}"))),
            industry: intel
                .as_ref()
                .map(|i| i.industry.clone())
                .filter(|i| !i.is_empty()),
            employee_count: intel.as_ref().and_then(|i| i.employee_count.clone()),
            location: posting
                .location
                .clone()
                .or_else(|| parsed.location.clone())
                .or(address),
            phone: company_phone,
            linkedin_url: company_linkedin,
            domain,
            name: company,
        };

        let phone_status = determine_status(StatusInputs {
            phone: outcome.phone.as_ref(),
            skip_paid,
            decision_maker: decision_maker.as_ref(),
            filtered_non_dach: outcome.filtered_non_dach,
        });
        let success = is_success(outcome.phone.as_ref(), &company, &emails);
        let (enrichment_path, _) = trail.into_parts();

        let result = EnrichmentResult {
            success,
            company,
            company_intel: intel,
            decision_maker,
            phone: outcome.phone,
            phone_status,
            emails,
            enrichment_path,
            job_id: posting.id.clone(),
            job_title: posting.title.clone(),
        };

        info!(
            %phone_status,
            success,
            steps = result.enrichment_path.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "enrichment complete"
        );
        progress.done(&result);
        Ok(result)
    }

    async fn parse(&self, posting: &JobPosting) -> ParsedPosting {
        let minimal = || ParsedPosting {
            company_name: posting.company.clone(),
            location: posting.location.clone(),
            ..ParsedPosting::default()
        };
        let Some(parser) = &self.collaborators.parser else {
            return minimal();
        };
        match tokio::time::timeout(self.config.step_timeout, parser.parse(posting)).await {
            Ok(parsed) => parsed,
            Err(_) => {
                warn!("posting parser timed out");
                minimal()
            }
        }
    }

    /// Parsed domain, or a web search for it.
    async fn company_domain(
        &self,
        parsed: &ParsedPosting,
        company: &str,
        trail: &mut RunTrail,
    ) -> Option<String> {
        let parsed_domain = parsed
            .company_domain
            .as_deref()
            .map(normalize_domain)
            .filter(|d| !d.is_empty());
        if parsed_domain.is_some() {
            return parsed_domain;
        }

        let search = self.collaborators.profile_search.as_ref()?;
        let call = guarded(self.config.step_timeout, search.find_company_domain(company)).await;
        let found = settled("google_domain", Some(call), trail)
            .flatten()
            .map(|d| normalize_domain(&d))
            .filter(|d| !d.is_empty())?;
        trail.tag("google_domain_found");
        info!(domain = %found, "company domain found by search");
        Some(found)
    }

    async fn collect(
        &self,
        posting: &JobPosting,
        company: &str,
        domain: Option<&str>,
        category: Option<&str>,
    ) -> Collected {
        let c = &self.collaborators;
        let budget = self.config.step_timeout;

        let job_page = async {
            match (&c.job_page, posting.url.as_deref()) {
                (Some(source), Some(url)) => {
                    Some(guarded(budget, source.discover_job_contact(url)).await)
                }
                _ => None,
            }
        };
        let registry = async {
            match (&c.registry, domain) {
                (Some(source), Some(domain)) => Some(
                    guarded(budget, source.discover_company_registry(company, domain)).await,
                ),
                _ => None,
            }
        };
        let team = async {
            match &c.team_page {
                Some(source) => Some(
                    guarded(budget, source.discover_team_page(company, domain, category)).await,
                ),
                None => None,
            }
        };
        let research = async {
            match &c.researcher {
                Some(researcher) => Some(
                    guarded(
                        budget,
                        researcher.research_company(
                            company,
                            domain,
                            &posting.description,
                            &posting.title,
                        ),
                    )
                    .await,
                ),
                None => None,
            }
        };
        let company_linkedin = async {
            match &c.profile_search {
                Some(search) => {
                    Some(guarded(budget, search.find_company_linkedin(company, domain)).await)
                }
                None => None,
            }
        };

        let (job_contact, registry, team, intel, company_linkedin) =
            tokio::join!(job_page, registry, team, research, company_linkedin);

        Collected {
            job_contact,
            registry,
            team,
            intel,
            company_linkedin,
        }
    }

    /// Fill the remaining pool slots from a LinkedIn decision-maker search.
    async fn search_decision_makers(
        &self,
        pool: &mut CandidatePool,
        company: &str,
        domain: Option<&str>,
        category: Option<&str>,
        trail: &mut RunTrail,
    ) {
        let Some(search) = &self.collaborators.profile_search else {
            return;
        };
        let call = search.find_decision_makers(company, domain, category, pool.remaining());
        let outcome = guarded(self.config.step_timeout, call).await;
        if let Some(found) = settled("linkedin_search", Some(outcome), trail) {
            trail.tag(format!("linkedin_search_{}_candidates", found.len()));
            pool.extend(found);
        }
    }

    /// Ranked candidates, or every candidate in discovery order when ranking fails.
    async fn rank(
        &self,
        candidates: Vec<Candidate>,
        company: &str,
        domain: Option<&str>,
        category: Option<&str>,
        trail: &mut RunTrail,
    ) -> Vec<Candidate> {
        if candidates.is_empty() {
            return candidates;
        }

        let ranked = match &self.collaborators.ranker {
            Some(ranker) => {
                let call = ranker.validate_and_rank(&candidates, company, domain, category);
                match guarded(self.config.step_timeout, call).await {
                    Ok(ranked) => Some(ranked),
                    Err(e) => {
                        log_failure("validation", &e);
                        None
                    }
                }
            }
            None => None,
        };

        let validated: Vec<ValidatedCandidate> = match ranked {
            Some(ranked) => {
                let valid: Vec<_> = ranked.into_iter().filter(|v| v.overall_valid).collect();
                trail.tag(format!("validated_{}_candidates", valid.len()));
                valid
            }
            None => {
                trail.tag("validation_fallback");
                candidates.into_iter().map(ValidatedCandidate::neutral).collect()
            }
        };

        for v in &validated {
            debug!(candidate = %v.candidate.name, score = v.relevance_score, "ranked");
        }
        validated.into_iter().map(|v| v.candidate).collect()
    }
}

/// The contact named in the posting, if it is a usable person.
fn posting_contact(parsed: &ParsedPosting) -> Option<Candidate> {
    let mut contact = Candidate::new(parsed.contact_name.as_deref()?, CandidateSource::JobPosting)?;
    if let Some(email) = &parsed.contact_email {
        contact = contact.with_email(email.as_str());
    }
    if let Some(phone) = &parsed.contact_phone {
        contact = contact.with_phone(phone.as_str());
    }
    Some(contact)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use leadenrich_shared::collab::NameQuery;
    use leadenrich_shared::{PhoneAttempt, PhoneSource, PhoneStatus, PhoneType, RawPhone, VendorLookup};

    const LINKEDIN: &str = "https://www.linkedin.com/in/max-mueller";

    // --- fakes ---

    struct FixedParser(ParsedPosting);

    #[async_trait]
    impl PostingParser for FixedParser {
        async fn parse(&self, _posting: &JobPosting) -> ParsedPosting {
            self.0.clone()
        }
    }

    struct FixedRegistry(RegistryInfo);

    #[async_trait]
    impl RegistrySource for FixedRegistry {
        async fn discover_company_registry(
            &self,
            _company: &str,
            _domain: &str,
        ) -> CollabResult<Option<RegistryInfo>> {
            Ok(Some(self.0.clone()))
        }
    }

    struct FixedTeam(Vec<Candidate>);

    #[async_trait]
    impl TeamPageSource for FixedTeam {
        async fn discover_team_page(
            &self,
            _company: &str,
            _domain: Option<&str>,
            _category: Option<&str>,
        ) -> CollabResult<Vec<Candidate>> {
            Ok(self.0.clone())
        }
    }

    struct SlowTeam;

    #[async_trait]
    impl TeamPageSource for SlowTeam {
        async fn discover_team_page(
            &self,
            _company: &str,
            _domain: Option<&str>,
            _category: Option<&str>,
        ) -> CollabResult<Vec<Candidate>> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok(vec![team_member("Max Müller")])
        }
    }

    #[derive(Default)]
    struct FakeSearch {
        profile: Option<String>,
        decision_makers: Vec<Candidate>,
        domain: Option<String>,
    }

    #[async_trait]
    impl ProfileSearch for FakeSearch {
        async fn find_linkedin_profile(
            &self,
            _name: &str,
            _company: &str,
            _domain: Option<&str>,
        ) -> CollabResult<Option<String>> {
            Ok(self.profile.clone())
        }

        async fn find_decision_makers(
            &self,
            _company: &str,
            _domain: Option<&str>,
            _category: Option<&str>,
            max_results: usize,
        ) -> CollabResult<Vec<Candidate>> {
            Ok(self.decision_makers.iter().take(max_results).cloned().collect())
        }

        async fn find_company_domain(&self, _company: &str) -> CollabResult<Option<String>> {
            Ok(self.domain.clone())
        }

        async fn find_company_linkedin(
            &self,
            _company: &str,
            _domain: Option<&str>,
        ) -> CollabResult<Option<String>> {
            Ok(None)
        }
    }

    struct FailingRanker;

    #[async_trait]
    impl CandidateRanker for FailingRanker {
        async fn validate_and_rank(
            &self,
            _candidates: &[Candidate],
            _company: &str,
            _domain: Option<&str>,
            _category: Option<&str>,
        ) -> CollabResult<Vec<ValidatedCandidate>> {
            Err(CollaboratorError::Transient("model overloaded".into()))
        }
    }

    /// Ranks candidates in reverse order and rejects names containing "Bot".
    struct ReversingRanker;

    #[async_trait]
    impl CandidateRanker for ReversingRanker {
        async fn validate_and_rank(
            &self,
            candidates: &[Candidate],
            _company: &str,
            _domain: Option<&str>,
            _category: Option<&str>,
        ) -> CollabResult<Vec<ValidatedCandidate>> {
            Ok(candidates
                .iter()
                .rev()
                .filter(|c| !c.name.contains("Bot"))
                .cloned()
                .map(ValidatedCandidate::neutral)
                .collect())
        }
    }

    /// Vendor double answering every lookup the same way.
    struct FakeVendor {
        answer: CollabResult<VendorLookup>,
        calls: AtomicUsize,
        names: Mutex<Vec<String>>,
    }

    impl FakeVendor {
        fn answering(phones: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(VendorLookup {
                    phones: phones.iter().map(|p| RawPhone::new(*p)).collect(),
                    ..VendorLookup::default()
                }),
                calls: AtomicUsize::new(0),
                names: Mutex::default(),
            })
        }

        fn with_lookup(lookup: VendorLookup) -> Arc<Self> {
            Arc::new(Self {
                answer: Ok(lookup),
                calls: AtomicUsize::new(0),
                names: Mutex::default(),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl NameEnricher for FakeVendor {
        async fn enrich_by_name(&self, query: NameQuery<'_>) -> CollabResult<VendorLookup> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.names
                .lock()
                .unwrap()
                .push(format!("{}|{}", query.first_name, query.last_name));
            self.answer.clone()
        }
    }

    #[async_trait]
    impl ProfileEnricher for FakeVendor {
        async fn enrich_by_linkedin(
            &self,
            _linkedin_url: &str,
            _name: &str,
        ) -> CollabResult<VendorLookup> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    #[derive(Default)]
    struct RecordingStats(Mutex<Vec<PhoneAttempt>>);

    #[async_trait]
    impl StatsSink for RecordingStats {
        async fn record(&self, attempt: &PhoneAttempt) {
            self.0.lock().unwrap().push(attempt.clone());
        }
    }

    // --- helpers ---

    fn config() -> PipelineConfig {
        PipelineConfig {
            max_candidates: 3,
            step_timeout: Duration::from_millis(200),
            name_enricher_timeout: Duration::from_millis(200),
        }
    }

    fn posting() -> JobPosting {
        JobPosting {
            id: "job-42".into(),
            company: "Nordlicht Software GmbH".into(),
            title: "Senior Java Developer (m/w/d)".into(),
            description: "Wir suchen Verstärkung für unser Backend-Team.".into(),
            category: Some("IT".into()),
            url: None,
            location: Some("Hamburg".into()),
            date_posted: None,
            source: None,
        }
    }

    fn parsed(contact: Option<(&str, &str)>) -> ParsedPosting {
        ParsedPosting {
            company_name: "Nordlicht Software GmbH".into(),
            company_domain: Some("nordlicht-software.de".into()),
            contact_name: contact.map(|(name, _)| name.to_string()),
            contact_phone: contact.map(|(_, phone)| phone.to_string()),
            ..ParsedPosting::default()
        }
    }

    fn team_member(name: &str) -> Candidate {
        Candidate::new(name, CandidateSource::TeamPage)
            .unwrap()
            .with_title("Head of Engineering")
    }

    fn position(path: &[String], tag: &str) -> usize {
        path.iter()
            .position(|t| t == tag)
            .unwrap_or_else(|| panic!("missing tag {tag} in {path:?}"))
    }

    // --- scenarios ---

    #[tokio::test]
    async fn posting_phone_skips_paid_vendors() {
        let fullenrich = FakeVendor::answering(&["+49 151 11111111"]);
        let kaspr = FakeVendor::answering(&["+49 151 22222222"]);
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(Some(("Anna Schmidt", "+49 30 1234567")))))),
            name_enricher: Some(fullenrich.clone()),
            profile_enricher: Some(kaspr.clone()),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert_eq!(fullenrich.calls(), 0);
        assert_eq!(kaspr.calls(), 0);
        let phone = result.phone.unwrap();
        assert_eq!(phone.number, "+49301234567");
        assert_eq!(phone.source, PhoneSource::CompanyMain);
        assert_eq!(result.phone_status, PhoneStatus::FoundLandline);
        assert!(result.success);
        assert_eq!(result.decision_maker.unwrap().name, "Anna Schmidt");
        assert!(result.enrichment_path.contains(&"phone_from_input".to_string()));
        assert!(result.enrichment_path.contains(&"validation_fallback".to_string()));
        assert_eq!(result.job_id, "job-42");
    }

    #[tokio::test]
    async fn posting_mobile_is_found_without_vendor_calls() {
        let fullenrich = FakeVendor::answering(&["+49 151 11111111"]);
        let kaspr = FakeVendor::answering(&["+49 151 22222222"]);
        let stats = Arc::new(RecordingStats::default());
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(Some(("Anna Schmidt", "0176 1234567")))))),
            name_enricher: Some(fullenrich.clone()),
            profile_enricher: Some(kaspr.clone()),
            stats: Some(stats.clone()),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        let phone = result.phone.unwrap();
        assert_eq!(phone.number, "+491761234567");
        assert_eq!(phone.phone_type, PhoneType::Mobile);
        assert_eq!(result.phone_status, PhoneStatus::FoundMobile);
        assert!(result.success);
        assert_eq!(result.decision_maker.unwrap().name, "Anna Schmidt");
        assert!(result.enrichment_path.contains(&"phone_from_input".to_string()));
        assert_eq!(fullenrich.calls() + kaspr.calls(), 0);
        assert!(stats.0.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn team_page_contact_gets_kaspr_mobile() {
        let fullenrich = FakeVendor::answering(&[]);
        let kaspr = FakeVendor::answering(&["+49 151 23456789"]);
        let stats = Arc::new(RecordingStats::default());
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![team_member("Max Müller")]))),
            profile_search: Some(Arc::new(FakeSearch {
                profile: Some(LINKEDIN.into()),
                ..FakeSearch::default()
            })),
            name_enricher: Some(fullenrich.clone()),
            profile_enricher: Some(kaspr.clone()),
            stats: Some(stats.clone()),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        let phone = result.phone.unwrap();
        assert_eq!(phone.number, "+4915123456789");
        assert_eq!(phone.phone_type, PhoneType::Mobile);
        assert_eq!(phone.source, PhoneSource::Kaspr);
        assert_eq!(result.phone_status, PhoneStatus::FoundMobile);

        let dm = result.decision_maker.unwrap();
        assert_eq!(dm.name, "Max Müller");
        assert_eq!(dm.linkedin_url.as_deref(), Some(LINKEDIN));
        assert!(dm.verified_current);

        let path = &result.enrichment_path;
        assert!(position(path, "team_discovery_1_contacts") < position(path, "kaspr_phone_found"));
        assert!(position(path, "linkedin_found_Max") < position(path, "fullenrich_no_phone"));
        assert!(path.contains(&"phone_found_candidate_1".to_string()));

        assert_eq!(fullenrich.calls(), 1);
        assert_eq!(kaspr.calls(), 1);
        let attempts = stats.0.lock().unwrap();
        assert_eq!(attempts.len(), 2);
        assert_eq!(attempts[1].service, PhoneSource::Kaspr);
        assert_eq!(attempts[1].accepted, Some(PhoneType::Mobile));
    }

    #[tokio::test]
    async fn kaspr_mobile_replaces_fullenrich_landline() {
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![
                team_member("Max Müller").with_linkedin(LINKEDIN),
            ]))),
            name_enricher: Some(FakeVendor::answering(&["040 1234567"])),
            profile_enricher: Some(FakeVendor::answering(&["0176 12345678"])),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        let phone = result.phone.unwrap();
        assert_eq!(phone.source, PhoneSource::Kaspr);
        assert!(phone.is_mobile());
        assert!(result.enrichment_path.contains(&"fullenrich_phone_found".to_string()));
        assert!(result.enrichment_path.contains(&"kaspr_mobile_upgrade".to_string()));
    }

    #[tokio::test]
    async fn fullenrich_mobile_skips_kaspr() {
        let kaspr = FakeVendor::answering(&["0176 12345678"]);
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![team_member("Max Müller")]))),
            name_enricher: Some(FakeVendor::with_lookup(VendorLookup {
                phones: vec![RawPhone::new("+43 664 1234567")],
                emails: vec!["max.mueller@nordlicht-software.de".into()],
                linkedin_url: Some(LINKEDIN.into()),
            })),
            profile_enricher: Some(kaspr.clone()),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert_eq!(kaspr.calls(), 0);
        assert_eq!(result.phone.unwrap().source, PhoneSource::FullEnrich);
        assert!(result.enrichment_path.contains(&"linkedin_from_fullenrich".to_string()));
        let dm = result.decision_maker.unwrap();
        assert_eq!(dm.linkedin_url.as_deref(), Some(LINKEDIN));
        assert_eq!(dm.email.as_deref(), Some("max.mueller@nordlicht-software.de"));
        assert_eq!(result.emails, vec!["max.mueller@nordlicht-software.de"]);
    }

    #[tokio::test]
    async fn foreign_numbers_are_filtered() {
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![
                team_member("Max Müller").with_linkedin(LINKEDIN),
            ]))),
            name_enricher: Some(FakeVendor::answering(&["+1 212 555 0100"])),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert!(result.phone.is_none());
        assert_eq!(result.phone_status, PhoneStatus::FilteredNonDach);
        assert!(result.enrichment_path.contains(&"fullenrich_filtered_non_dach".to_string()));
        assert!(result.enrichment_path.contains(&"using_best_candidate_no_phone".to_string()));
        assert!(!result.success);
    }

    #[tokio::test]
    async fn decision_maker_without_linkedin() {
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![team_member("Max Müller")]))),
            profile_enricher: Some(FakeVendor::answering(&["0176 12345678"])),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert_eq!(result.phone_status, PhoneStatus::NoLinkedin);
        assert!(result.enrichment_path.contains(&"kaspr_skipped_no_linkedin".to_string()));
    }

    #[tokio::test]
    async fn skip_paid_never_calls_vendors() {
        let fullenrich = FakeVendor::answering(&["0176 12345678"]);
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![team_member("Max Müller")]))),
            name_enricher: Some(fullenrich.clone()),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), true)
            .await
            .unwrap();

        assert_eq!(fullenrich.calls(), 0);
        assert_eq!(result.phone_status, PhoneStatus::SkippedPaidApi);
        assert_eq!(result.decision_maker.unwrap().name, "Max Müller");
    }

    #[tokio::test]
    async fn skip_paid_still_resolves_linkedin() {
        let kaspr = FakeVendor::answering(&["0176 12345678"]);
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![team_member("Max Müller")]))),
            profile_search: Some(Arc::new(FakeSearch {
                profile: Some(LINKEDIN.into()),
                ..FakeSearch::default()
            })),
            profile_enricher: Some(kaspr.clone()),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), true)
            .await
            .unwrap();

        assert_eq!(kaspr.calls(), 0);
        assert_eq!(result.phone_status, PhoneStatus::SkippedPaidApi);
        let path = &result.enrichment_path;
        assert!(position(path, "linkedin_found_Max") < position(path, "using_best_candidate_no_phone"));
        assert_eq!(result.decision_maker.unwrap().linkedin_url.as_deref(), Some(LINKEDIN));
    }

    #[tokio::test]
    async fn multi_word_surname_reaches_vendor_intact() {
        let fullenrich = FakeVendor::answering(&["0176 12345678"]);
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![team_member("Max von Müller")]))),
            name_enricher: Some(fullenrich.clone()),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert_eq!(*fullenrich.names.lock().unwrap(), vec!["Max|von Müller"]);
        let dm = result.decision_maker.unwrap();
        assert_eq!(dm.first_name, "Max");
        assert_eq!(dm.last_name, "von Müller");
    }

    #[tokio::test]
    async fn ranker_failure_keeps_discovery_order() {
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![
                team_member("Max Müller"),
                team_member("Lena Vogel"),
            ]))),
            ranker: Some(Arc::new(FailingRanker)),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), true)
            .await
            .unwrap();

        assert!(result.enrichment_path.contains(&"validation_fallback".to_string()));
        assert_eq!(result.decision_maker.unwrap().name, "Max Müller");
    }

    #[tokio::test]
    async fn ranker_order_and_filter_apply() {
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![
                team_member("Max Müller"),
                team_member("Lena Vogel"),
                team_member("Chat Bot"),
            ]))),
            ranker: Some(Arc::new(ReversingRanker)),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), true)
            .await
            .unwrap();

        assert!(result.enrichment_path.contains(&"validated_2_candidates".to_string()));
        assert_eq!(result.decision_maker.unwrap().name, "Lena Vogel");
    }

    #[tokio::test]
    async fn pool_is_capped_and_filled_in_order() {
        let search = FakeSearch {
            decision_makers: vec![
                Candidate::new("Jonas Weber", CandidateSource::Linkedin).unwrap(),
                Candidate::new("Sophie Wagner", CandidateSource::Linkedin).unwrap(),
            ],
            ..FakeSearch::default()
        };
        let registry = RegistryInfo {
            executives: vec![Candidate::new("Max Müller", CandidateSource::Impressum).unwrap()],
            ..RegistryInfo::default()
        };
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(Some(("Anna Schmidt", "")))))),
            team_page: Some(Arc::new(FixedTeam(vec![team_member("Max Müller")]))),
            registry: Some(Arc::new(FixedRegistry(registry))),
            profile_search: Some(Arc::new(search)),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), true)
            .await
            .unwrap();

        let path = &result.enrichment_path;
        assert!(path.contains(&"linkedin_search_1_candidates".to_string()));
        assert!(path.contains(&"total_3_raw_candidates".to_string()));
        assert_eq!(result.decision_maker.unwrap().name, "Anna Schmidt");
    }

    #[tokio::test]
    async fn configured_pool_size_cannot_exceed_limit() {
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(FixedTeam(vec![
                team_member("Max Müller"),
                team_member("Lena Vogel"),
                team_member("Jonas Weber"),
                team_member("Sophie Wagner"),
            ]))),
            ..Collaborators::default()
        };
        let config = PipelineConfig {
            max_candidates: 5,
            ..config()
        };

        let result = Enricher::new(collaborators, config)
            .enrich(&posting(), true)
            .await
            .unwrap();

        let path = &result.enrichment_path;
        assert!(path.contains(&"total_3_raw_candidates".to_string()), "{path:?}");
    }

    #[tokio::test]
    async fn impressum_feeds_company_and_emails() {
        let registry = RegistryInfo {
            phones: vec!["040 9876543".into()],
            emails: vec![
                "info@nordlicht-software.de".into(),
                "Lena.Vogel@nordlicht-software.de".into(),
                "lena.vogel@gmail.com".into(),
            ],
            address: Some("Speicherstadt 1, 20457 Hamburg".into()),
            executives: vec![Candidate::new("Lena Vogel", CandidateSource::Impressum).unwrap()],
            website: None,
        };
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            registry: Some(Arc::new(FixedRegistry(registry))),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert_eq!(result.company.phone.as_deref(), Some("+49409876543"));
        assert_eq!(result.company.website.as_deref(), Some("https://nordlicht-software.de"));
        assert_eq!(result.company.location.as_deref(), Some("Hamburg"));
        assert!(result.success);
        assert_eq!(
            result.emails,
            vec![
                "info@nordlicht-software.de",
                "lena.vogel@nordlicht-software.de",
                "lena.vogel@gmail.com"
            ]
        );
        let dm = result.decision_maker.unwrap();
        assert_eq!(dm.email.as_deref(), Some("lena.vogel@nordlicht-software.de"));
        assert!(!dm.verified_current);
        assert!(dm.employment_note.is_some());
        assert_eq!(result.phone_status, PhoneStatus::NoLinkedin);
        assert!(result.enrichment_path.contains(&"impressum_company_phone".to_string()));
    }

    #[tokio::test]
    async fn slow_source_times_out() {
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(parsed(None)))),
            team_page: Some(Arc::new(SlowTeam)),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert!(result.enrichment_path.contains(&"team_discovery_error".to_string()));
        assert!(result.enrichment_path.contains(&"total_0_raw_candidates".to_string()));
        assert!(result.decision_maker.is_none());
        assert_eq!(result.phone_status, PhoneStatus::NoDecisionMaker);
        assert!(!result.success);
    }

    #[tokio::test]
    async fn domain_found_by_search() {
        let mut without_domain = parsed(None);
        without_domain.company_domain = None;
        let collaborators = Collaborators {
            parser: Some(Arc::new(FixedParser(without_domain))),
            profile_search: Some(Arc::new(FakeSearch {
                domain: Some("https://www.nordlicht-software.de/".into()),
                ..FakeSearch::default()
            })),
            ..Collaborators::default()
        };

        let result = Enricher::new(collaborators, config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert_eq!(result.company.domain.as_deref(), Some("nordlicht-software.de"));
        assert!(result.enrichment_path.contains(&"google_domain_found".to_string()));
    }

    #[tokio::test]
    async fn invalid_posting_is_rejected() {
        let mut bad = posting();
        bad.company = "  ".into();
        let err = Enricher::new(Collaborators::default(), config())
            .enrich(&bad, false)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no company name"));
    }

    #[tokio::test]
    async fn bare_collaborators_still_produce_a_result() {
        let result = Enricher::new(Collaborators::default(), config())
            .enrich(&posting(), false)
            .await
            .unwrap();

        assert_eq!(result.company.name, "Nordlicht Software GmbH");
        assert_eq!(
            result.enrichment_path,
            vec!["posting_parsed", "total_0_raw_candidates"]
        );
        assert_eq!(result.phone_status, PhoneStatus::NoDecisionMaker);
    }
}
