use std::sync::Mutex;

use anyhow::{Result, anyhow};
use async_trait::async_trait;

use super::{LanguageModel, LlmProvider, LlmRequest, LlmResponse, TokenUsage};

/// Canned `LanguageModel` that records every request it receives.
pub struct StubModel {
    reply: Result<String, String>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl StubModel {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            reply: Ok(text.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            reply: Err(message.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().expect("stub lock").clone()
    }
}

#[async_trait]
impl LanguageModel for StubModel {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let model = request.model.clone();
        self.requests.lock().expect("stub lock").push(request);
        match &self.reply {
            Ok(text) => Ok(LlmResponse {
                text: text.clone(),
                token_usage: TokenUsage::default(),
                provider: LlmProvider::OpenAi,
                model,
            }),
            Err(message) => Err(anyhow!(message.clone())),
        }
    }
}
