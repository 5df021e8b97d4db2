//! Core domain types for lead enrichment.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{LeadEnrichError, Result};
use crate::phone;

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 identifier for one enrichment run (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A job posting as delivered by the upstream job feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPosting {
    /// External identifier of the posting.
    pub id: String,
    /// Hiring company name.
    pub company: String,
    /// Job title.
    pub title: String,
    /// Free-text job description.
    pub description: String,
    /// Job category as labelled by the feed (e.g. "IT", "Vertrieb").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Link to the live posting.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_posted: Option<String>,
    /// Name of the job board the posting came from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl JobPosting {
    /// Reject payloads that cannot be enriched at all.
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(LeadEnrichError::validation("job posting has no id"));
        }
        if self.company.trim().is_empty() {
            return Err(LeadEnrichError::validation(format!(
                "job posting {} has no company name",
                self.id
            )));
        }
        Ok(())
    }
}

/// Structured view of a posting, produced once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedPosting {
    pub company_name: String,
    /// Bare domain such as `firma.de`.
    #[serde(default)]
    pub company_domain: Option<String>,
    /// Person named as contact in the posting.
    #[serde(default)]
    pub contact_name: Option<String>,
    #[serde(default)]
    pub contact_email: Option<String>,
    #[serde(default)]
    pub contact_phone: Option<String>,
    /// Job titles worth targeting at this company.
    #[serde(default)]
    pub target_titles: Vec<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

// ---------------------------------------------------------------------------
// Candidates
// ---------------------------------------------------------------------------

/// Where a candidate contact was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Named in the posting text.
    JobPosting,
    /// Scraped from the live posting page.
    JobUrl,
    /// Listed on the company's team page.
    TeamPage,
    /// Listed as executive in the Impressum.
    Impressum,
    /// Found via LinkedIn search.
    Linkedin,
}

impl CandidateSource {
    /// Ranking table shared by aggregation, validation fallback and the
    /// phone cascade. Higher is better.
    pub fn priority(self) -> u8 {
        match self {
            Self::JobPosting => 100,
            Self::JobUrl => 90,
            Self::TeamPage => 70,
            Self::Impressum => 50,
            Self::Linkedin => 40,
        }
    }

    /// Whether the source itself proves present-day employment.
    pub fn implies_current(self) -> bool {
        matches!(self, Self::JobPosting | Self::JobUrl | Self::TeamPage)
    }

    /// Whether the cascade should look up a LinkedIn URL for candidates
    /// from this source.
    pub fn resolves_linkedin(self) -> bool {
        !matches!(self, Self::Linkedin)
    }

    /// Stable lowercase label used in logs and audit tags.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JobPosting => "job_posting",
            Self::JobUrl => "job_url",
            Self::TeamPage => "team_page",
            Self::Impressum => "impressum",
            Self::Linkedin => "linkedin",
        }
    }
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A potential contact person, regardless of where it was found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    /// Full name, whitespace-normalized, at least two tokens.
    pub name: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub linkedin_url: Option<String>,
    pub source: CandidateSource,
    /// Confirmed to work at the company today.
    pub verified_current: bool,
}

impl Candidate {
    /// Create a candidate. Returns `None` unless `name` has at least two words.
    pub fn new(name: &str, source: CandidateSource) -> Option<Self> {
        let name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        if name.split(' ').count() < 2 {
            return None;
        }
        Some(Self {
            name,
            title: None,
            email: None,
            phone: None,
            linkedin_url: None,
            source,
            verified_current: source.implies_current(),
        })
    }

    /// Set the job title.
    #[must_use]
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = non_empty(title.into());
        self
    }

    /// Set the email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = non_empty(email.into());
        self
    }

    /// Set the phone number as found in the source.
    #[must_use]
    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = non_empty(phone.into());
        self
    }

    /// Set the LinkedIn profile URL.
    #[must_use]
    pub fn with_linkedin(mut self, url: impl Into<String>) -> Self {
        self.linkedin_url = non_empty(url.into());
        self
    }

    /// Mark the candidate as confirmed current employee.
    #[must_use]
    pub fn verified(mut self) -> Self {
        self.verified_current = true;
        self
    }

    /// Deduplication key: the lowercased full name.
    pub fn identity_key(&self) -> String {
        self.name.to_lowercase()
    }

    /// Ranking priority derived from the source.
    pub fn priority(&self) -> u8 {
        self.source.priority()
    }

    pub fn first_name(&self) -> &str {
        self.name.split(' ').next().unwrap_or_default()
    }

    /// Everything after the first name, so particles and middle names stay.
    pub fn last_name(&self) -> &str {
        self.name.split_once(' ').map(|(_, rest)| rest).unwrap_or_default()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// A candidate annotated by the validator/ranker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedCandidate {
    pub candidate: Candidate,
    pub name_valid: bool,
    pub email_valid: bool,
    /// Relevance for B2B outreach, 0–100.
    pub relevance_score: u8,
    pub overall_valid: bool,
    #[serde(default)]
    pub notes: String,
}

impl ValidatedCandidate {
    /// Score given to every candidate when no ranking is available.
    pub const NEUTRAL_SCORE: u8 = 50;

    /// Accept a candidate unjudged, with the neutral score.
    pub fn neutral(candidate: Candidate) -> Self {
        Self {
            candidate,
            name_valid: true,
            email_valid: true,
            relevance_score: Self::NEUTRAL_SCORE,
            overall_valid: true,
            notes: "not validated".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Phones
// ---------------------------------------------------------------------------

/// Kind of phone line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneType {
    Mobile,
    Landline,
    Unknown,
}

impl PhoneType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mobile => "mobile",
            Self::Landline => "landline",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PhoneType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin of an accepted phone number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneSource {
    /// Vendor B, looked up by LinkedIn URL.
    Kaspr,
    /// Vendor A, looked up by name and company.
    #[serde(rename = "fullenrich")]
    FullEnrich,
    Impressum,
    /// The number given in the posting itself.
    CompanyMain,
}

impl PhoneSource {
    /// Tie-break order between two numbers of the same type. Lower wins.
    pub fn rank(self) -> u8 {
        match self {
            Self::Kaspr => 0,
            Self::FullEnrich => 1,
            Self::Impressum => 2,
            Self::CompanyMain => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kaspr => "kaspr",
            Self::FullEnrich => "fullenrich",
            Self::Impressum => "impressum",
            Self::CompanyMain => "company_main",
        }
    }
}

impl std::fmt::Display for PhoneSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A phone number returned by a vendor, before DACH filtering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawPhone {
    pub number: String,
    /// Line type as declared by the vendor, if it says.
    #[serde(default)]
    pub declared_type: Option<PhoneType>,
}

impl RawPhone {
    pub fn new(number: impl Into<String>) -> Self {
        Self {
            number: number.into(),
            declared_type: None,
        }
    }

    #[must_use]
    pub fn with_type(mut self, phone_type: PhoneType) -> Self {
        self.declared_type = Some(phone_type);
        self
    }
}

/// An accepted DACH phone number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneResult {
    /// Digits with an optional leading `+`.
    pub number: String,
    #[serde(rename = "type")]
    pub phone_type: PhoneType,
    pub source: PhoneSource,
}

impl PhoneResult {
    /// Accept a raw number if it passes the DACH predicate.
    ///
    /// A vendor-declared mobile/landline type wins over prefix classification.
    pub fn accept(raw: &RawPhone, source: PhoneSource) -> Option<Self> {
        if !phone::is_valid_dach(&raw.number) {
            return None;
        }
        let phone_type = match raw.declared_type {
            Some(declared @ (PhoneType::Mobile | PhoneType::Landline)) => declared,
            _ => phone::classify(&raw.number),
        };
        Some(Self {
            number: phone::clean(&raw.number),
            phone_type,
            source,
        })
    }

    pub fn is_mobile(&self) -> bool {
        self.phone_type == PhoneType::Mobile
    }

    /// Mobile beats non-mobile; otherwise the lower source rank wins.
    pub fn is_better_than(&self, other: &PhoneResult) -> bool {
        match (self.is_mobile(), other.is_mobile()) {
            (true, false) => true,
            (false, true) => false,
            _ => self.source.rank() < other.source.rank(),
        }
    }

    /// Pick the best DACH-valid number out of a vendor response.
    pub fn best_of(raw: &[RawPhone], source: PhoneSource) -> Option<Self> {
        raw.iter()
            .filter_map(|p| Self::accept(p, source))
            .fold(None, |best: Option<PhoneResult>, next| match best {
                Some(current) if !next.is_better_than(&current) => Some(current),
                _ => Some(next),
            })
    }
}

// ---------------------------------------------------------------------------
// Collaborator payloads
// ---------------------------------------------------------------------------

/// What the company's legal notice (Impressum) reveals.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryInfo {
    /// DACH-valid phone numbers in order of appearance.
    pub phones: Vec<String>,
    pub emails: Vec<String>,
    /// Postal address line.
    pub address: Option<String>,
    /// Managing directors and other named executives.
    pub executives: Vec<Candidate>,
    /// URL the notice was found at.
    pub website: Option<String>,
}

/// Raw answer of a paid contact-data vendor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VendorLookup {
    pub phones: Vec<RawPhone>,
    pub emails: Vec<String>,
    pub linkedin_url: Option<String>,
}

/// One vendor call as seen by the statistics store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhoneAttempt {
    pub service: PhoneSource,
    /// Every number the vendor returned, before filtering.
    pub phones_returned: Vec<String>,
    /// Type of the accepted number, `None` when all were filtered or none came back.
    pub accepted: Option<PhoneType>,
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// The person the outreach should target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecisionMaker {
    pub name: String,
    pub first_name: String,
    pub last_name: String,
    pub title: Option<String>,
    pub linkedin_url: Option<String>,
    pub email: Option<String>,
    pub verified_current: bool,
    /// Human-readable caveat when current employment is not confirmed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_note: Option<String>,
}

impl From<&Candidate> for DecisionMaker {
    fn from(candidate: &Candidate) -> Self {
        let employment_note = (!candidate.verified_current).then(|| {
            format!(
                "Current employment not confirmed (found via {})",
                candidate.source
            )
        });
        Self {
            name: candidate.name.clone(),
            first_name: candidate.first_name().to_string(),
            last_name: candidate.last_name().to_string(),
            title: candidate.title.clone(),
            linkedin_url: candidate.linkedin_url.clone(),
            email: candidate.email.clone(),
            verified_current: candidate.verified_current,
            employment_note,
        }
    }
}

/// Company facts gathered during the run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub domain: Option<String>,
    pub industry: Option<String>,
    pub employee_count: Option<String>,
    pub location: Option<String>,
    /// Main company line (from the Impressum).
    pub phone: Option<String>,
    pub website: Option<String>,
    pub linkedin_url: Option<String>,
}

/// Sales-oriented research about the company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyIntel {
    /// Short sales brief.
    pub summary: String,
    pub description: String,
    pub industry: String,
    pub employee_count: Option<String>,
    pub founded: Option<String>,
    pub headquarters: String,
    pub products_services: Vec<String>,
    pub hiring_signals: Vec<String>,
    pub website_url: String,
}

/// Why a run ended with or without a phone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PhoneStatus {
    FoundMobile,
    FoundLandline,
    SkippedPaidApi,
    NoDecisionMaker,
    NoLinkedin,
    FilteredNonDach,
    ApiNoResult,
}

impl PhoneStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FoundMobile => "FOUND_MOBILE",
            Self::FoundLandline => "FOUND_LANDLINE",
            Self::SkippedPaidApi => "SKIPPED_PAID_API",
            Self::NoDecisionMaker => "NO_DECISION_MAKER",
            Self::NoLinkedin => "NO_LINKEDIN",
            Self::FilteredNonDach => "FILTERED_NON_DACH",
            Self::ApiNoResult => "API_NO_RESULT",
        }
    }
}

impl std::fmt::Display for PhoneStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final output of one enrichment run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichmentResult {
    pub success: bool,
    pub company: CompanyInfo,
    pub company_intel: Option<CompanyIntel>,
    pub decision_maker: Option<DecisionMaker>,
    pub phone: Option<PhoneResult>,
    pub phone_status: PhoneStatus,
    /// Deduplicated, first-seen order.
    pub emails: Vec<String>,
    /// Ordered audit trail of what the run did.
    pub enrichment_path: Vec<String>,
    pub job_id: String,
    pub job_title: String,
}
