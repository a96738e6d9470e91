//! Completion-model client for Placebook.
//!
//! The extractor and tag synthesizer speak to any OpenAI-compatible chat
//! endpoint through the [`CompletionBackend`] trait. [`OpenAiCompatClient`]
//! is the production implementation; [`MockCompletion`] scripts responses
//! for tests.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use placebook_shared::{PlacebookError, Result};

// ---------------------------------------------------------------------------
// Backend trait
// ---------------------------------------------------------------------------

/// A completion model: system prompt + user prompt in, text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}

// ---------------------------------------------------------------------------
// OpenAI-compatible client
// ---------------------------------------------------------------------------

/// Configuration for [`OpenAiCompatClient`].
#[derive(Debug, Clone)]
pub struct CompletionConfig {
    /// Base URL for the API endpoint.
    pub base_url: String,
    /// API key for authentication.
    pub api_key: String,
    /// Model identifier.
    pub model: String,
    /// Output token ceiling. Must accommodate full-document extraction.
    pub max_output_tokens: u32,
    /// Request timeout.
    pub timeout: Duration,
}

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiCompatClient {
    client: Client,
    config: CompletionConfig,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Deserialize)]
struct ApiErrorDetail {
    message: String,
}

impl OpenAiCompatClient {
    pub fn new(config: CompletionConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PlacebookError::Network(format!("client build: {e}")))?;

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &CompletionConfig {
        &self.config
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompatClient {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        let mut messages = Vec::with_capacity(2);
        if !system.is_empty() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: user,
        });

        let request = ChatRequest {
            model: &self.config.model,
            messages,
            max_tokens: self.config.max_output_tokens,
            temperature: 0.1,
        };

        debug!(
            model = %self.config.model,
            prompt_len = user.len(),
            "sending completion request"
        );

        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| PlacebookError::Network(format!("completion request: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let message = response
                .json::<ApiErrorBody>()
                .await
                .map(|body| body.error.message)
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(PlacebookError::Network(format!(
                "completion endpoint returned {status}: {message}"
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| PlacebookError::Network(format!("invalid completion response: {e}")))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| PlacebookError::Network("completion response had no choices".into()))?;

        // A length-limited response means the output was cut off mid-list.
        // Partial output must never be parsed as if it were complete.
        if choice.finish_reason.as_deref() == Some("length") {
            return Err(PlacebookError::Network(format!(
                "completion truncated at max_tokens={}; raise the output limit",
                self.config.max_output_tokens
            )));
        }

        choice
            .message
            .content
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(|| PlacebookError::Network("completion response had empty content".into()))
    }
}

// ---------------------------------------------------------------------------
// Mock backend for tests
// ---------------------------------------------------------------------------

/// Scripted completion backend. Responses are returned in order; calls past
/// the end of the script return an error. Prompts are recorded for
/// assertions.
pub struct MockCompletion {
    responses: std::sync::Mutex<std::collections::VecDeque<Result<String>>>,
    calls: std::sync::Mutex<Vec<(String, String)>>,
}

impl MockCompletion {
    pub fn new(responses: Vec<Result<String>>) -> Self {
        Self {
            responses: std::sync::Mutex::new(responses.into_iter().collect()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    /// Recorded `(system, user)` prompt pairs.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().expect("mock lock").clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().expect("mock lock").len()
    }
}

#[async_trait]
impl CompletionBackend for MockCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.calls
            .lock()
            .expect("mock lock")
            .push((system.to_string(), user.to_string()));
        self.responses
            .lock()
            .expect("mock lock")
            .pop_front()
            .unwrap_or_else(|| {
                Err(PlacebookError::Network(
                    "mock completion script exhausted".into(),
                ))
            })
    }
}
