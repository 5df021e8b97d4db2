//! OpenRouter chat-completions client.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use leadenrich_shared::{AppConfig, LeadEnrichError, Result, require_secret};

use crate::json::extract_json;

/// User-Agent for LLM calls.
const USER_AGENT: &str = concat!("LeadEnrich/", env!("CARGO_PKG_VERSION"));

const APP_REFERER: &str = "https://lead-enrichment.local";
const APP_TITLE: &str = "LeadEnrich";

/// Pause before the single retry of a rate-limited request.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(2);

// ---------------------------------------------------------------------------
// Model tiers
// ---------------------------------------------------------------------------

/// Cost/quality tier of a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    /// Yes/no checks.
    Fast,
    /// Extraction and ranking.
    Balanced,
    /// Long-form writing.
    Smart,
}

impl ModelTier {
    fn max_tokens(self) -> u32 {
        match self {
            Self::Fast => 1000,
            Self::Balanced => 2000,
            Self::Smart => 4000,
        }
    }

    fn temperature(self) -> f32 {
        match self {
            Self::Fast | Self::Balanced => 0.1,
            Self::Smart => 0.2,
        }
    }
}

/// Model id per tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Models {
    pub fast: String,
    pub balanced: String,
    pub smart: String,
}

impl Models {
    fn for_tier(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Fast => &self.fast,
            ModelTier::Balanced => &self.balanced,
            ModelTier::Smart => &self.smart,
        }
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Token counts reported for one request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Text answer plus its token cost.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub content: String,
    pub usage: Usage,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Counters {
    requests: AtomicU64,
    prompt_tokens: AtomicU64,
    completion_tokens: AtomicU64,
}

/// Cumulative usage of a client and its clones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UsageTotals {
    pub requests: u64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

/// OpenRouter client shared by the parser, ranker and researcher.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    base_url: String,
    api_key: String,
    models: Models,
    rate_limit_backoff: Duration,
    counters: Arc<Counters>,
}

impl LlmClient {
    pub fn new(base_url: &str, api_key: String, models: Models, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| LeadEnrichError::Network(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            models,
            rate_limit_backoff: RATE_LIMIT_BACKOFF,
            counters: Arc::default(),
        })
    }

    /// Build from the `[openrouter]` config section. Fails when the API key is missing.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let section = &config.openrouter;
        let api_key = require_secret(&section.api_key_env, "OpenRouter")?;
        Self::new(
            &section.base_url,
            api_key,
            Models {
                fast: section.fast_model.clone(),
                balanced: section.balanced_model.clone(),
                smart: section.smart_model.clone(),
            },
            Duration::from_secs(config.defaults.api_timeout_secs.max(1)),
        )
    }

    /// Override the pause before retrying a rate-limited request.
    #[must_use]
    pub fn with_rate_limit_backoff(mut self, backoff: Duration) -> Self {
        self.rate_limit_backoff = backoff;
        self
    }

    /// Tokens spent so far.
    pub fn usage(&self) -> UsageTotals {
        UsageTotals {
            requests: self.counters.requests.load(Ordering::Relaxed),
            prompt_tokens: self.counters.prompt_tokens.load(Ordering::Relaxed),
            completion_tokens: self.counters.completion_tokens.load(Ordering::Relaxed),
        }
    }

    /// Send one system + user prompt and return the answer text.
    ///
    /// A 429 is retried once after a short pause.
    pub async fn complete(&self, tier: ModelTier, system: &str, user: &str) -> Result<Completion> {
        let model = self.models.for_tier(tier);
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage { role: "system", content: system });
        }
        messages.push(ChatMessage { role: "user", content: user });
        let request = ChatRequest {
            model,
            messages,
            max_tokens: tier.max_tokens(),
            temperature: tier.temperature(),
        };

        let start = Instant::now();
        let mut response = self.send(&request).await?;
        if response.status() == StatusCode::TOO_MANY_REQUESTS {
            warn!(model, "rate limited, retrying once");
            tokio::time::sleep(self.rate_limit_backoff).await;
            response = self.send(&request).await?;
        }

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(LeadEnrichError::Llm(format!("{model} returned HTTP {status}: {text}")));
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| LeadEnrichError::Llm(format!("invalid completion response: {e}")))?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| LeadEnrichError::Llm(format!("{model} returned no content")))?;

        self.counters.requests.fetch_add(1, Ordering::Relaxed);
        self.counters
            .prompt_tokens
            .fetch_add(body.usage.prompt_tokens, Ordering::Relaxed);
        self.counters
            .completion_tokens
            .fetch_add(body.usage.completion_tokens, Ordering::Relaxed);

        debug!(
            model,
            prompt_tokens = body.usage.prompt_tokens,
            completion_tokens = body.usage.completion_tokens,
            duration_ms = start.elapsed().as_millis() as u64,
            "llm completion"
        );

        Ok(Completion {
            content,
            usage: body.usage,
        })
    }

    /// Like [`complete`](Self::complete) but parses the answer as JSON.
    ///
    /// Code fences and prose around the JSON value are tolerated.
    pub async fn complete_json<T: DeserializeOwned>(
        &self,
        tier: ModelTier,
        system: &str,
        user: &str,
    ) -> Result<T> {
        let completion = self.complete(tier, system, user).await?;
        let json = extract_json(&completion.content).ok_or_else(|| {
            LeadEnrichError::parse(format!(
                "no JSON in llm answer: {}",
                completion.content.chars().take(120).collect::<String>()
            ))
        })?;
        serde_json::from_str(json)
            .map_err(|e| LeadEnrichError::parse(format!("unexpected llm JSON: {e}")))
    }

    async fn send(&self, request: &ChatRequest<'_>) -> Result<reqwest::Response> {
        self.client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .header("HTTP-Referer", APP_REFERER)
            .header("X-Title", APP_TITLE)
            .json(request)
            .send()
            .await
            .map_err(|e| LeadEnrichError::Network(format!("llm request failed: {e}")))
    }
}
