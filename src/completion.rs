//! Text-completion provider abstraction.
//!
//! Defines the [`Completion`] trait and concrete implementations:
//! - **[`DisabledCompletion`]**: always fails; every section of a report
//!   then renders its failure placeholder.
//! - **[`OpenAiCompletion`]**: calls an OpenAI-compatible
//!   `POST {api_base}/chat/completions` endpoint.
//!
//! # Provider Selection
//!
//! ```rust,no_run
//! # use dd_report::config::CompletionConfig;
//! # use dd_report::completion::create_completion;
//! let config = CompletionConfig { provider: "disabled".into(), ..Default::default() };
//! let completion = create_completion(&config).unwrap();
//! assert_eq!(completion.model_name(), "disabled");
//! ```
//!
//! # Failure Policy
//!
//! One request per call, no retry and no backoff. Transport errors, non-2xx
//! statuses and responses without message content all surface as
//! [`Error::SummarizationFailure`] carrying the provider's detail.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::CompletionConfig;
use crate::error::{Error, Result};
use crate::fetch::http_client;

#[async_trait]
pub trait Completion: Send + Sync {
    /// Returns the model identifier (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Send a system persona and a user prompt; return the model's reply.
    async fn complete(&self, persona: &str, prompt: &str, temperature: f32) -> Result<String>;
}

// ============ Disabled Provider ============

pub struct DisabledCompletion;

#[async_trait]
impl Completion for DisabledCompletion {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _persona: &str, _prompt: &str, _temperature: f32) -> Result<String> {
        Err(Error::SummarizationFailure(
            "completion provider is disabled".to_string(),
        ))
    }
}

// ============ OpenAI-compatible Provider ============

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Chat-completions client for OpenAI and API-compatible servers.
pub struct OpenAiCompletion {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
}

impl OpenAiCompletion {
    /// Build a client, reading the API key from `config.api_key_env`.
    pub fn new(config: &CompletionConfig) -> anyhow::Result<Self> {
        let api_key = match std::env::var(&config.api_key_env) {
            Ok(key) if !key.is_empty() => key,
            _ => anyhow::bail!("{} environment variable not set", config.api_key_env),
        };
        Ok(Self::with_api_key(config, api_key)?)
    }

    pub fn with_api_key(config: &CompletionConfig, api_key: String) -> reqwest::Result<Self> {
        Ok(Self {
            client: http_client(config.timeout())?,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl Completion for OpenAiCompletion {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, persona: &str, prompt: &str, temperature: f32) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: persona,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature,
        };

        debug!(model = %self.model, prompt_chars = prompt.chars().count(), "calling completion API");
        let resp = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::SummarizationFailure(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body_text = resp.text().await.unwrap_or_default();
            return Err(Error::SummarizationFailure(format!(
                "completion API error {}: {}",
                status, body_text
            )));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| Error::SummarizationFailure(format!("invalid completion response: {}", e)))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                Error::SummarizationFailure("completion response has no message content".to_string())
            })
    }
}

/// Create the [`Completion`] provider named by `config.provider`.
///
/// | Config Value | Provider |
/// |-------------|----------|
/// | `"disabled"` | [`DisabledCompletion`] |
/// | `"openai"` | [`OpenAiCompletion`] |
pub fn create_completion(config: &CompletionConfig) -> anyhow::Result<Box<dyn Completion>> {
    match config.provider.as_str() {
        "disabled" => Ok(Box::new(DisabledCompletion)),
        "openai" => Ok(Box::new(OpenAiCompletion::new(config)?)),
        other => anyhow::bail!("Unknown completion provider: {}", other),
    }
}
