//! Kaspr client: phone and email lookup by LinkedIn profile.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{info, instrument};

use leadenrich_shared::{
    AppConfig, CollabResult, CollaboratorError, LeadEnrichError, PhoneType, ProfileEnricher,
    RawPhone, Result, VendorLookup, require_secret,
};

use crate::{dedup_non_empty, http_client};

const API_VERSION: &str = "v2.0";

static PROFILE_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)linkedin\.com/(?:in|pub)/([^/?#\s]+)").expect("valid regex")
});

/// Profile id (`anna-schmidt-123`) of a LinkedIn `/in/` or `/pub/` URL.
pub fn linkedin_id(url: &str) -> Option<&str> {
    PROFILE_ID
        .captures(url.trim())
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ProfileRequest<'a> {
    name: &'a str,
    id: &'a str,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Profile {
    #[serde(default)]
    phones: Vec<PhoneEntry>,
    #[serde(default)]
    starry_phone: Option<String>,
    #[serde(default)]
    starry_work_email: Option<String>,
    #[serde(default)]
    starry_direct_email: Option<String>,
    #[serde(default)]
    work_emails: Vec<String>,
    #[serde(default)]
    direct_emails: Vec<String>,
    #[serde(default)]
    emails: Vec<EmailEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PhoneEntry {
    Detailed {
        #[serde(default, rename = "phoneNumber")]
        phone_number: Option<String>,
        #[serde(default)]
        phone: Option<String>,
        #[serde(default, rename = "phoneType")]
        phone_type: Option<String>,
    },
    Plain(String),
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum EmailEntry {
    Detailed {
        #[serde(default)]
        email: Option<String>,
    },
    Plain(String),
}

/// Line type from Kaspr's free-text `phoneType`; `None` leaves it to prefix classification.
fn declared_type(raw: &str) -> Option<PhoneType> {
    let lower = raw.to_lowercase();
    if lower.contains("mobile") || lower.contains("cell") {
        Some(PhoneType::Mobile)
    } else if lower.contains("landline") || lower.contains("work") || lower.contains("office") {
        Some(PhoneType::Landline)
    } else {
        None
    }
}

fn parse_profile(body: &Value) -> Result<VendorLookup> {
    let raw = body.get("profile").unwrap_or(body);
    let profile: Profile = serde_json::from_value(raw.clone())
        .map_err(|e| LeadEnrichError::parse(format!("invalid kaspr profile: {e}")))?;

    let mut phones: Vec<RawPhone> = profile
        .phones
        .into_iter()
        .filter_map(|entry| {
            let (number, kind) = match entry {
                PhoneEntry::Detailed {
                    phone_number,
                    phone,
                    phone_type,
                } => (phone_number.or(phone)?, phone_type),
                PhoneEntry::Plain(number) => (number, None),
            };
            if number.trim().is_empty() {
                return None;
            }
            let raw = RawPhone::new(number.trim());
            Some(match kind.as_deref().and_then(declared_type) {
                Some(t) => raw.with_type(t),
                None => raw,
            })
        })
        .collect();

    // the single "best" phone is only reported when the list is empty
    if phones.is_empty() {
        if let Some(starry) = profile.starry_phone.filter(|p| !p.trim().is_empty()) {
            phones.push(RawPhone::new(starry.trim()));
        }
    }

    let emails = profile
        .starry_work_email
        .into_iter()
        .chain(profile.starry_direct_email)
        .chain(profile.work_emails)
        .chain(profile.direct_emails)
        .chain(profile.emails.into_iter().filter_map(|e| match e {
            EmailEntry::Detailed { email } => email,
            EmailEntry::Plain(email) => Some(email),
        }));

    Ok(VendorLookup {
        phones,
        emails: dedup_non_empty(emails),
        linkedin_url: None,
    })
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

/// Kaspr API client.
#[derive(Clone)]
pub struct KasprClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl KasprClient {
    pub fn new(base_url: &str, api_key: String, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Build from the `[kaspr]` config section. Fails when the API key is missing.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = require_secret(&config.kaspr.api_key_env, "Kaspr")?;
        Self::new(
            &config.kaspr.base_url,
            api_key,
            Duration::from_secs(config.defaults.api_timeout_secs.max(1)),
        )
    }

    async fn fetch_profile(&self, id: &str, name: &str) -> Result<VendorLookup> {
        let response = self
            .client
            .post(format!("{}/profile/linkedin", self.base_url))
            .bearer_auth(&self.api_key)
            .header("accept-version", API_VERSION)
            .json(&ProfileRequest { name, id })
            .send()
            .await
            .map_err(|e| LeadEnrichError::Network(format!("kaspr request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadEnrichError::Network(format!("kaspr returned HTTP {status}: {text}")));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LeadEnrichError::parse(format!("invalid kaspr response: {e}")))?;
        parse_profile(&body)
    }
}

#[async_trait]
impl ProfileEnricher for KasprClient {
    #[instrument(skip(self))]
    async fn enrich_by_linkedin(&self, linkedin_url: &str, name: &str) -> CollabResult<VendorLookup> {
        let id = linkedin_id(linkedin_url).ok_or_else(|| {
            CollaboratorError::InvalidResponse(format!("no LinkedIn profile id in {linkedin_url}"))
        })?;

        let lookup = self.fetch_profile(id, name).await?;
        info!(
            phones = lookup.phones.len(),
            emails = lookup.emails.len(),
            "kaspr lookup finished"
        );
        Ok(lookup)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> KasprClient {
        KasprClient::new(&server.uri(), "kaspr-key".into(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn extracts_profile_ids() {
        assert_eq!(
            linkedin_id("https://www.linkedin.com/in/anna-schmidt-123/"),
            Some("anna-schmidt-123")
        );
        assert_eq!(linkedin_id("https://de.linkedin.com/pub/max-mueller/1a/2b"), Some("max-mueller"));
        assert_eq!(linkedin_id("https://linkedin.com/in/x?trk=abc"), Some("x"));
        assert_eq!(linkedin_id("https://www.linkedin.com/company/firma"), None);
    }

    #[test]
    fn phone_type_words() {
        assert_eq!(declared_type("MOBILE"), Some(PhoneType::Mobile));
        assert_eq!(declared_type("cell phone"), Some(PhoneType::Mobile));
        assert_eq!(declared_type("Work"), Some(PhoneType::Landline));
        assert_eq!(declared_type("other"), None);
    }

    #[tokio::test]
    async fn profile_lookup() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/profile/linkedin"))
            .and(header("authorization", "Bearer kaspr-key"))
            .and(header("accept-version", "v2.0"))
            .and(body_json(json!({"name": "Anna Schmidt", "id": "anna-schmidt-123"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "profile": {
                    "phones": [
                        {"phoneNumber": "+49 30 1234567", "phoneType": "work"},
                        {"phoneNumber": "+49 171 2345678", "phoneType": "mobile"},
                        "+44 20 7946 0958"
                    ],
                    "starryPhone": "+49 171 2345678",
                    "starryWorkEmail": "anna.schmidt@firma.de",
                    "workEmails": ["anna.schmidt@firma.de", "a.schmidt@firma.de"],
                    "emails": [{"email": "anna@gmail.com"}]
                }
            })))
            .mount(&server)
            .await;

        let lookup = client(&server)
            .enrich_by_linkedin("https://www.linkedin.com/in/anna-schmidt-123", "Anna Schmidt")
            .await
            .unwrap();

        assert_eq!(lookup.phones.len(), 3);
        assert_eq!(lookup.phones[0].declared_type, Some(PhoneType::Landline));
        assert_eq!(lookup.phones[1].declared_type, Some(PhoneType::Mobile));
        assert_eq!(lookup.phones[2].declared_type, None);
        assert_eq!(
            lookup.emails,
            vec!["anna.schmidt@firma.de", "a.schmidt@firma.de", "anna@gmail.com"]
        );
    }

    #[tokio::test]
    async fn starry_phone_when_list_empty() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/profile/linkedin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "phones": [],
                "starryPhone": "0171 2345678"
            })))
            .mount(&server)
            .await;

        let lookup = client(&server)
            .enrich_by_linkedin("https://linkedin.com/in/max", "Max Müller")
            .await
            .unwrap();
        assert_eq!(lookup.phones, vec![RawPhone::new("0171 2345678")]);
        assert!(lookup.emails.is_empty());
    }

    #[tokio::test]
    async fn http_error_is_reported() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(402).set_body_string("no credits"))
            .mount(&server)
            .await;

        let err = client(&server)
            .enrich_by_linkedin("https://linkedin.com/in/max", "Max Müller")
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::Http(ref m) if m.contains("402")));
    }

    #[tokio::test]
    async fn rejects_non_profile_urls() {
        let server = MockServer::start().await;
        let err = client(&server)
            .enrich_by_linkedin("https://www.linkedin.com/company/firma", "Max Müller")
            .await
            .unwrap_err();
        assert!(matches!(err, CollaboratorError::InvalidResponse(_)));
    }
}
