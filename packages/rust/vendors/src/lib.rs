//! Paid contact-data vendors.
//!
//! - [`FullEnrichClient`]: name + company lookup with asynchronous polling
//! - [`KasprClient`]: LinkedIn profile lookup
//!
//! Both return raw [`VendorLookup`](leadenrich_shared::VendorLookup) values;
//! DACH filtering and phone selection happen in the pipeline.

pub mod fullenrich;
pub mod kaspr;

use std::time::Duration;

use reqwest::Client;

use leadenrich_shared::{LeadEnrichError, Result};

pub use fullenrich::FullEnrichClient;
pub use kaspr::{KasprClient, linkedin_id};

/// User-Agent for vendor API calls.
const USER_AGENT: &str = concat!("LeadEnrich/", env!("CARGO_PKG_VERSION"));

fn http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .user_agent(USER_AGENT)
        .timeout(timeout)
        .build()
        .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))
}

/// Trimmed, non-empty strings, first occurrence wins (case-insensitive).
fn dedup_non_empty(values: impl IntoIterator<Item = String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    values
        .into_iter()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty() && seen.insert(v.to_lowercase()))
        .collect()
}
