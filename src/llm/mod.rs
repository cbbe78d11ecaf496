use std::fmt;

use anyhow::{Context, Result, anyhow, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::ProviderSettings;

#[cfg(test)]
pub mod testing;

/// Enumerates the supported LLM backends behind the shared utility.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LlmProvider {
    OpenAi,
    Gemini,
}

impl fmt::Display for LlmProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmProvider::OpenAi => write!(f, "openai"),
            LlmProvider::Gemini => write!(f, "gemini"),
        }
    }
}

/// Defines the shape of a chat-style interaction with an LLM.
#[derive(Debug, Clone)]
pub struct LlmRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
}

impl LlmRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            temperature: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// Individual chat message, compatible with OpenAI compliant providers.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatMessage {
    pub role: MessageRole,
    pub text: String,
}

impl ChatMessage {
    pub fn new(role: MessageRole, text: impl Into<String>) -> Self {
        Self {
            role,
            text: text.into(),
        }
    }

    pub fn system(text: impl Into<String>) -> Self {
        Self::new(MessageRole::System, text)
    }

    pub fn user(text: impl Into<String>) -> Self {
        Self::new(MessageRole::User, text)
    }
}

/// Supported chat roles passed to providers.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum MessageRole {
    System,
    User,
}

impl MessageRole {
    fn as_str(&self) -> &'static str {
        match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        }
    }
}

/// Captures basic token usage metrics associated with a call.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub response_tokens: usize,
    pub total_tokens: usize,
}

/// Full response surface returned to callers.
#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub token_usage: TokenUsage,
    pub provider: LlmProvider,
    pub model: String,
}

/// Seam between the gateways and whichever upstream produces text.
///
/// Handlers only ever see `Arc<dyn LanguageModel>`, so tests can swap in a stub.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse>;
}

/// Main entry point for invoking providers.
#[derive(Clone)]
pub struct LlmClient {
    http: Client,
    config: ProviderSettings,
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        self.execute(request).await
    }
}

impl LlmClient {
    pub fn new(config: ProviderSettings) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    /// Execute a request against the provider encoded in the model name.
    pub async fn execute(&self, request: LlmRequest) -> Result<LlmResponse> {
        let model = request.model.clone();
        let (provider, provider_model) = parse_model_provider(&model)?;

        match provider {
            LlmProvider::OpenAi => self.execute_openai(provider_model, request).await,
            LlmProvider::Gemini => self.execute_gemini(provider_model, request).await,
        }
    }

    async fn execute_openai(&self, model: &str, request: LlmRequest) -> Result<LlmResponse> {
        let Some(api_key) = self.config.openai_api_key.as_ref() else {
            bail!("OPENAI_API_KEY is not configured but required for OpenAI requests");
        };

        let messages: Vec<_> = request
            .messages
            .iter()
            .map(|msg| {
                json!({
                    "role": msg.role.as_str(),
                    "content": msg.text,
                })
            })
            .collect();

        let mut payload = json!({
            "model": model,
            "messages": messages,
        });
        if let Some(temperature) = request.temperature {
            payload["temperature"] = json!(temperature);
        }

        let url = format!(
            "{}/chat/completions",
            self.config.openai_base_url.trim_end_matches('/')
        );
        let response = self
            .http
            .post(url)
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .context("failed to reach OpenAI")?;

        let body = read_json_body(response, "OpenAI").await?;
        let chat: OpenAiChatCompletionPayload = serde_json::from_value(body.clone())
            .map_err(|_| anyhow!("unexpected OpenAI response payload: {}", body))?;

        let text = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        let usage = chat.usage.map(|usage| TokenUsage {
            prompt_tokens: usage.prompt_tokens.unwrap_or_default(),
            response_tokens: usage.completion_tokens.unwrap_or_default(),
            total_tokens: usage.total_tokens.unwrap_or_default(),
        });

        Ok(LlmResponse {
            token_usage: settle_usage(usage, &request, &text),
            text,
            provider: LlmProvider::OpenAi,
            model: model.to_string(),
        })
    }

    async fn execute_gemini(&self, model: &str, request: LlmRequest) -> Result<LlmResponse> {
        let Some(api_key) = self.config.gemini_api_key.as_ref() else {
            bail!("GEMINI_API_KEY is not configured but required for Gemini requests");
        };

        // Gemini takes system text out of band; everything else becomes content turns.
        let system_parts: Vec<_> = request
            .messages
            .iter()
            .filter(|msg| msg.role == MessageRole::System)
            .map(|msg| json!({ "text": msg.text }))
            .collect();
        let contents: Vec<_> = request
            .messages
            .iter()
            .filter(|msg| msg.role != MessageRole::System)
            .map(|msg| {
                json!({
                    "role": "user",
                    "parts": [{ "text": msg.text }],
                })
            })
            .collect();

        let mut payload = json!({ "contents": contents });
        if !system_parts.is_empty() {
            payload["systemInstruction"] = json!({ "parts": system_parts });
        }
        if let Some(temperature) = request.temperature {
            payload["generationConfig"] = json!({ "temperature": temperature });
        }

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.gemini_base_url.trim_end_matches('/'),
            model
        );
        let response = self
            .http
            .post(url)
            .header("x-goog-api-key", api_key)
            .json(&payload)
            .send()
            .await
            .context("failed to reach Gemini")?;

        let body = read_json_body(response, "Gemini").await?;
        let generated: GeminiGenerateContentPayload = serde_json::from_value(body.clone())
            .map_err(|_| anyhow!("unexpected Gemini response payload: {}", body))?;

        let candidate = generated
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("Gemini returned no candidates: {}", body))?;
        let text = candidate
            .content
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect::<String>()
            })
            .unwrap_or_default();

        let usage = generated.usage_metadata.map(|usage| TokenUsage {
            prompt_tokens: usage.prompt_token_count.unwrap_or_default(),
            response_tokens: usage.candidates_token_count.unwrap_or_default(),
            total_tokens: usage.total_token_count.unwrap_or_default(),
        });

        Ok(LlmResponse {
            token_usage: settle_usage(usage, &request, &text),
            text,
            provider: LlmProvider::Gemini,
            model: model.to_string(),
        })
    }
}

async fn read_json_body(response: reqwest::Response, provider: &str) -> Result<serde_json::Value> {
    let status = response.status();
    let response_text = response
        .text()
        .await
        .context("failed to read response body")?;
    let body: serde_json::Value = serde_json::from_str(&response_text).with_context(|| {
        format!(
            "failed to parse {provider} response as JSON. Response body: {}",
            preview(&response_text)
        )
    })?;
    if !status.is_success() {
        bail!("{provider} call failed with status {}: {}", status, body);
    }
    Ok(body)
}

fn preview(text: &str) -> String {
    match text.char_indices().nth(500) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}

/// Fill in whatever the provider left out with whitespace-token estimates.
fn settle_usage(usage: Option<TokenUsage>, request: &LlmRequest, text: &str) -> TokenUsage {
    let prompt_tokens = approximate_token_count(
        &request
            .messages
            .iter()
            .map(|m| m.text.as_str())
            .collect::<Vec<_>>()
            .join("\n"),
    );
    let mut token_usage = usage.unwrap_or_default();
    if token_usage.prompt_tokens == 0 {
        token_usage.prompt_tokens = prompt_tokens;
    }
    if token_usage.response_tokens == 0 {
        token_usage.response_tokens = approximate_token_count(text);
    }
    token_usage.total_tokens = token_usage.prompt_tokens + token_usage.response_tokens;
    token_usage
}

pub fn parse_model_provider(model: &str) -> Result<(LlmProvider, &str)> {
    let (provider, name) = model.split_once('/').ok_or_else(|| {
        anyhow!("model must be prefixed with provider, e.g. 'openai/gpt-4o'")
    })?;

    if name.trim().is_empty() {
        bail!("model name is required after provider prefix");
    }

    match provider {
        "openai" => Ok((LlmProvider::OpenAi, name)),
        "gemini" => Ok((LlmProvider::Gemini, name)),
        other => bail!("unsupported provider prefix: {other}"),
    }
}

fn approximate_token_count(input: &str) -> usize {
    input.split_whitespace().count()
}

#[derive(Debug, Deserialize)]
struct OpenAiChatCompletionPayload {
    #[serde(default)]
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiChatMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    #[serde(default)]
    prompt_tokens: Option<usize>,
    #[serde(default)]
    completion_tokens: Option<usize>,
    #[serde(default)]
    total_tokens: Option<usize>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerateContentPayload {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    #[serde(default)]
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: Option<usize>,
    #[serde(default)]
    candidates_token_count: Option<usize>,
    #[serde(default)]
    total_token_count: Option<usize>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_provider_prefixes() {
        let (provider, name) = parse_model_provider("openai/gpt-4o").expect("openai");
        assert_eq!(provider, LlmProvider::OpenAi);
        assert_eq!(name, "gpt-4o");

        let (provider, name) = parse_model_provider("gemini/gemini-1.5-flash").expect("gemini");
        assert_eq!(provider, LlmProvider::Gemini);
        assert_eq!(name, "gemini-1.5-flash");
    }

    #[test]
    fn rejects_unprefixed_or_unknown_models() {
        assert!(parse_model_provider("gpt-4o").is_err());
        assert!(parse_model_provider("openai/ ").is_err());
        assert!(parse_model_provider("poe/claude").is_err());
    }

    #[test]
    fn usage_falls_back_to_word_counts() {
        let request = LlmRequest::new(
            "openai/gpt-4o",
            vec![ChatMessage::system("be brief"), ChatMessage::user("hello there")],
        );
        let usage = settle_usage(None, &request, "one two three");
        assert_eq!(usage.prompt_tokens, 4);
        assert_eq!(usage.response_tokens, 3);
        assert_eq!(usage.total_tokens, 7);
    }

    #[test]
    fn preview_clips_long_bodies_on_char_boundary() {
        let body = "é".repeat(600);
        let clipped = preview(&body);
        assert!(clipped.ends_with("..."));
        assert_eq!(clipped.chars().count(), 503);
    }

    #[test]
    fn openai_payload_takes_first_choice() {
        let body = json!({
            "choices": [
                { "message": { "content": "first" } },
                { "message": { "content": "second" } }
            ]
        });
        let chat: OpenAiChatCompletionPayload = serde_json::from_value(body).expect("payload");
        let text = chat.choices.into_iter().next().and_then(|c| c.message.content);
        assert_eq!(text.as_deref(), Some("first"));
    }

    #[test]
    fn gemini_payload_reads_camel_case_usage() {
        let body = json!({
            "candidates": [{ "content": { "parts": [{ "text": "Hi" }, { "text": " there" }] } }],
            "usageMetadata": { "promptTokenCount": 5, "candidatesTokenCount": 2, "totalTokenCount": 7 }
        });
        let generated: GeminiGenerateContentPayload =
            serde_json::from_value(body).expect("payload");
        let usage = generated.usage_metadata.expect("usage");
        assert_eq!(usage.prompt_token_count, Some(5));
        assert_eq!(usage.candidates_token_count, Some(2));
        assert_eq!(generated.candidates.len(), 1);
    }
}
