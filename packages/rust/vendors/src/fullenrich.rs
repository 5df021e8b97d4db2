//! FullEnrich client: bulk enrichment start, then status polling.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use leadenrich_shared::{
    AppConfig, CollabResult, CollaboratorError, LeadEnrichError, NameEnricher, NameQuery, RawPhone,
    Result, VendorLookup, require_secret,
};

use crate::{dedup_non_empty, http_client};

const ENRICH_FIELDS: [&str; 2] = ["contact.emails", "contact.phones"];

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct BulkRequest<'a> {
    name: String,
    datas: [ContactRequest<'a>; 1],
}

#[derive(Debug, Serialize)]
struct ContactRequest<'a> {
    firstname: &'a str,
    lastname: &'a str,
    enrich_fields: [&'static str; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    domain: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    company_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    linkedin_url: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    enrichment_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    datas: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct ContactData {
    #[serde(default)]
    phones: Vec<PhoneEntry>,
    #[serde(default)]
    emails: Vec<EmailEntry>,
    #[serde(default)]
    most_probable_email: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    social_medias: Vec<SocialMedia>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PhoneEntry {
    Detailed {
        #[serde(default)]
        number: Option<String>,
        #[serde(default)]
        phone: Option<String>,
        #[serde(default)]
        region: Option<String>,
    },
    Plain(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmailEntry {
    Detailed {
        #[serde(default)]
        email: Option<String>,
        #[serde(default)]
        status: Option<String>,
    },
    Plain(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum SocialMedia {
    Entry {
        #[serde(default, rename = "type")]
        kind: String,
        #[serde(default)]
        url: String,
    },
    Other(Value),
}

/// Terminal and in-flight states of a bulk enrichment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EnrichmentStatus {
    Finished,
    Failed,
    Pending,
}

impl EnrichmentStatus {
    fn parse(raw: &str) -> Self {
        match raw.to_uppercase().as_str() {
            "FINISHED" => Self::Finished,
            "CANCELED" | "CREDITS_INSUFFICIENT" | "RATE_LIMIT" | "UNKNOWN" => Self::Failed,
            // CREATED, IN_PROGRESS
            _ => Self::Pending,
        }
    }
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// FullEnrich API client.
#[derive(Clone)]
pub struct FullEnrichClient {
    client: Client,
    base_url: String,
    api_key: String,
    poll_interval: Duration,
    max_poll_attempts: u32,
}

impl FullEnrichClient {
    pub fn new(
        base_url: &str,
        api_key: String,
        timeout: Duration,
        poll_interval: Duration,
        max_poll_attempts: u32,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            poll_interval,
            max_poll_attempts: max_poll_attempts.max(1),
        })
    }

    /// Build from the `[fullenrich]` config section. Fails when the API key is missing.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let section = &config.fullenrich;
        let api_key = require_secret(&section.api_key_env, "FullEnrich")?;
        Self::new(
            &section.base_url,
            api_key,
            Duration::from_secs(config.defaults.api_timeout_secs.max(1)),
            Duration::from_secs(section.poll_interval_secs),
            section.max_poll_attempts,
        )
    }

    /// Start a single-contact bulk enrichment and return its id.
    async fn start(&self, query: &NameQuery<'_>) -> Result<String> {
        let company = Some(query.company.trim()).filter(|c| !c.is_empty());
        let body = BulkRequest {
            name: format!("Enrichment {} {}", query.first_name, query.last_name),
            datas: [ContactRequest {
                firstname: query.first_name,
                lastname: query.last_name,
                enrich_fields: ENRICH_FIELDS,
                domain: query.domain,
                company_name: company,
                linkedin_url: query.linkedin_url,
            }],
        };

        let response = self
            .client
            .post(format!("{}/contact/enrich/bulk", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LeadEnrichError::Network(format!("fullenrich start failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadEnrichError::Network(format!(
                "fullenrich start returned HTTP {status}: {text}"
            )));
        }

        let started: StartResponse = response
            .json()
            .await
            .map_err(|e| LeadEnrichError::parse(format!("invalid fullenrich start response: {e}")))?;
        started
            .enrichment_id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| LeadEnrichError::parse("fullenrich start response has no enrichment_id"))
    }

    /// Poll until the enrichment finishes, fails or the attempts run out.
    ///
    /// Transport errors during polling are retried like pending states.
    async fn poll(&self, enrichment_id: &str) -> CollabResult<VendorLookup> {
        let url = format!("{}/contact/enrich/bulk/{enrichment_id}", self.base_url);

        for attempt in 1..=self.max_poll_attempts {
            match self.poll_once(&url).await {
                Ok(body) => match EnrichmentStatus::parse(&body.status) {
                    EnrichmentStatus::Finished => return Ok(parse_contacts(&body.datas)),
                    EnrichmentStatus::Failed => {
                        warn!(status = %body.status, "fullenrich enrichment failed");
                        return Err(failure_for(&body.status));
                    }
                    EnrichmentStatus::Pending => {
                        debug!(attempt, status = %body.status, "fullenrich still running");
                    }
                },
                Err(e) => warn!(attempt, error = %e, "fullenrich poll error"),
            }
            if attempt < self.max_poll_attempts {
                tokio::time::sleep(self.poll_interval).await;
            }
        }

        let waited = self.poll_interval.as_secs() * u64::from(self.max_poll_attempts);
        warn!(enrichment_id, "fullenrich polling exhausted");
        Err(CollaboratorError::Timeout(waited))
    }

    async fn poll_once(&self, url: &str) -> Result<StatusResponse> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.api_key)
            .send()
            .await
            .map_err(|e| LeadEnrichError::Network(format!("fullenrich poll failed: {e}")))?;
        let status = response.status();
        if !status.is_success() {
            return Err(LeadEnrichError::Network(format!("fullenrich poll returned HTTP {status}")));
        }
        response
            .json()
            .await
            .map_err(|e| LeadEnrichError::parse(format!("invalid fullenrich status response: {e}")))
    }
}

fn failure_for(status: &str) -> CollaboratorError {
    if status.eq_ignore_ascii_case("CREDITS_INSUFFICIENT") {
        CollaboratorError::Unavailable("fullenrich credits insufficient".into())
    } else {
        CollaboratorError::Transient(format!("fullenrich enrichment {status}"))
    }
}

/// Collect phones, emails and the LinkedIn URL from finished enrichment items.
fn parse_contacts(items: &[Value]) -> VendorLookup {
    let mut phones = Vec::new();
    let mut emails = Vec::new();
    let mut linkedin_url = None;

    for item in items {
        // contact data is nested under "contact", older payloads are flat
        let raw = item.get("contact").unwrap_or(item);
        let contact: ContactData = match serde_json::from_value(raw.clone()) {
            Ok(contact) => contact,
            Err(e) => {
                warn!(error = %e, "skipping unreadable fullenrich item");
                continue;
            }
        };

        for entry in contact.phones {
            let (number, region) = match entry {
                PhoneEntry::Detailed {
                    number,
                    phone,
                    region,
                } => (number.or(phone), region),
                PhoneEntry::Plain(number) => (Some(number), None),
            };
            if let Some(number) = number.filter(|n| !n.trim().is_empty()) {
                phones.push(RawPhone::new(with_country_code(&number, region.as_deref())));
            }
        }
        if let Some(phone) = contact.phone.filter(|p| !p.trim().is_empty()) {
            phones.push(RawPhone::new(phone));
        }

        for entry in contact.emails {
            match entry {
                EmailEntry::Detailed { email, status } => {
                    let invalid = status.is_some_and(|s| s.eq_ignore_ascii_case("INVALID"));
                    if let Some(email) = email.filter(|_| !invalid) {
                        emails.push(email);
                    }
                }
                EmailEntry::Plain(email) => emails.push(email),
            }
        }
        emails.extend(contact.most_probable_email);
        emails.extend(contact.email);

        if linkedin_url.is_none() {
            linkedin_url = contact.social_medias.into_iter().find_map(|sm| match sm {
                SocialMedia::Entry { kind, url }
                    if kind.eq_ignore_ascii_case("linkedin") || url.contains("linkedin.com") =>
                {
                    Some(url).filter(|u| !u.is_empty())
                }
                _ => None,
            });
        }
    }

    VendorLookup {
        phones,
        emails: dedup_non_empty(emails),
        linkedin_url,
    }
}

/// German numbers reported without country code get `+49`.
fn with_country_code(number: &str, region: Option<&str>) -> String {
    let number = number.trim();
    if region.is_some_and(|r| r.eq_ignore_ascii_case("DE")) && !number.starts_with('+') {
        format!("+49{}", number.trim_start_matches('0'))
    } else {
        number.to_string()
    }
}

#[async_trait]
impl NameEnricher for FullEnrichClient {
    #[instrument(skip_all, fields(first = %query.first_name, last = %query.last_name, company = %query.company))]
    async fn enrich_by_name(&self, query: NameQuery<'_>) -> CollabResult<VendorLookup> {
        if query.company.trim().is_empty() && query.domain.is_none() {
            return Err(CollaboratorError::InvalidResponse(
                "fullenrich needs a company name or domain".into(),
            ));
        }

        let enrichment_id = self.start(&query).await?;
        info!(%enrichment_id, "fullenrich enrichment started");

        let lookup = self.poll(&enrichment_id).await?;
        info!(
            phones = lookup.phones.len(),
            emails = lookup.emails.len(),
            linkedin = lookup.linkedin_url.is_some(),
            "fullenrich enrichment finished"
        );
        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer, attempts: u32) -> FullEnrichClient {
        FullEnrichClient::new(
            &server.uri(),
            "fe-key".into(),
            Duration::from_secs(5),
            Duration::from_millis(10),
            attempts,
        )
        .unwrap()
    }

    fn query() -> NameQuery<'static> {
        NameQuery {
            first_name: "Anna",
            last_name: "Schmidt",
            company: "Firma GmbH",
            domain: Some("firma.de"),
            linkedin_url: None,
        }
    }

    async fn mount_start(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/contact/enrich/bulk"))
            .and(header("authorization", "Bearer fe-key"))
            .and(body_partial_json(json!({
                "datas": [{
                    "firstname": "Anna",
                    "lastname": "Schmidt",
                    "company_name": "Firma GmbH",
                    "domain": "firma.de",
                    "enrich_fields": ["contact.emails", "contact.phones"]
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"enrichment_id": "enr-1"})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn polls_until_finished() {
        let server = MockServer::start().await;
        mount_start(&server).await;
        Mock::given(method("GET"))
            .and(path("/contact/enrich/bulk/enr-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "IN_PROGRESS"})))
            .up_to_n_times(2)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/contact/enrich/bulk/enr-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "status": "FINISHED",
                "datas": [{
                    "contact": {
                        "phones": [
                            {"number": "1711234567", "region": "DE"},
                            {"number": "+1 415 555 0100", "region": "US"}
                        ],
                        "emails": [
                            {"email": "anna.schmidt@firma.de", "status": "DELIVERABLE"},
                            {"email": "a.schmidt@firma.de", "status": "INVALID"}
                        ],
                        "most_probable_email": "anna.schmidt@firma.de",
                        "social_medias": [
                            {"type": "LINKEDIN", "url": "https://www.linkedin.com/in/anna-schmidt"}
                        ]
                    }
                }]
            })))
            .mount(&server)
            .await;

        let lookup = client(&server, 5).enrich_by_name(query()).await.unwrap();
        let numbers: Vec<&str> = lookup.phones.iter().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, vec!["+491711234567", "+1 415 555 0100"]);
        assert_eq!(lookup.emails, vec!["anna.schmidt@firma.de"]);
        assert_eq!(
            lookup.linkedin_url.as_deref(),
            Some("https://www.linkedin.com/in/anna-schmidt")
        );
    }

    #[tokio::test]
    async fn failed_enrichment_is_an_error() {
        let server = MockServer::start().await;
        mount_start(&server).await;
        Mock::given(method("GET"))
            .and(path("/contact/enrich/bulk/enr-1"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"status": "CREDITS_INSUFFICIENT"})),
            )
            .mount(&server)
            .await;

        let err = client(&server, 5).enrich_by_name(query()).await.unwrap_err();
        assert!(err.is_unavailable());
    }

    #[tokio::test]
    async fn exhausted_polling_times_out() {
        let server = MockServer::start().await;
        mount_start(&server).await;
        Mock::given(method("GET"))
            .and(path("/contact/enrich/bulk/enr-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "CREATED"})))
            .expect(3)
            .mount(&server)
            .await;

        let err = client(&server, 3).enrich_by_name(query()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Timeout(_)));
    }

    #[tokio::test]
    async fn start_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/contact/enrich/bulk"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = client(&server, 3).enrich_by_name(query()).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Http(ref m) if m.contains("401")));
    }

    #[tokio::test]
    async fn needs_company_or_domain() {
        let server = MockServer::start().await;
        let q = NameQuery {
            company: " ",
            domain: None,
            ..query()
        };
        assert!(client(&server, 1).enrich_by_name(q).await.is_err());
    }

    #[test]
    fn flat_items_and_plain_entries() {
        let items = vec![json!({
            "phones": ["+49 30 1234567"],
            "emails": ["info@firma.de", "INFO@firma.de"],
            "phone": "0171 2345678",
            "social_medias": ["https://twitter.com/firma"]
        })];
        let lookup = parse_contacts(&items);
        let numbers: Vec<&str> = lookup.phones.iter().map(|p| p.number.as_str()).collect();
        assert_eq!(numbers, vec!["+49 30 1234567", "0171 2345678"]);
        assert_eq!(lookup.emails, vec!["info@firma.de"]);
        assert_eq!(lookup.linkedin_url, None);
    }

    #[test]
    fn country_code_added_for_german_region() {
        assert_eq!(with_country_code("01711234567", Some("DE")), "+491711234567");
        assert_eq!(with_country_code("+491711234567", Some("DE")), "+491711234567");
        assert_eq!(with_country_code("6641234567", Some("AT")), "6641234567");
    }
}
