use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::{
    config::{GatewayModels, Settings},
    llm::{LanguageModel, LlmClient},
};

#[derive(Clone)]
pub struct AppState {
    settings: Arc<Settings>,
    chat_model: Arc<dyn LanguageModel>,
    completion_model: Arc<dyn LanguageModel>,
}

impl AppState {
    /// Build the production state: both gateways share one HTTP-backed client.
    pub async fn new(settings: Settings) -> Result<Self> {
        tokio::fs::create_dir_all(&settings.upload_dir)
            .await
            .with_context(|| {
                format!(
                    "failed to ensure upload directory at {}",
                    settings.upload_dir.display()
                )
            })?;

        let client: Arc<dyn LanguageModel> = Arc::new(LlmClient::new(settings.providers.clone()));
        info!(
            chat_model = %settings.models.chat,
            summary_model = %settings.models.summary,
            flashcard_model = %settings.models.flashcards,
            "configured upstream models"
        );

        Ok(Self::with_models(settings, client.clone(), client))
    }

    pub fn with_models(
        settings: Settings,
        chat_model: Arc<dyn LanguageModel>,
        completion_model: Arc<dyn LanguageModel>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            chat_model,
            completion_model,
        }
    }

    /// Generative-text provider behind `/chat` and the mentor chat.
    pub fn chat_model(&self) -> Arc<dyn LanguageModel> {
        self.chat_model.clone()
    }

    /// Chat-completion provider behind `/summarize` and `/flashcards`.
    pub fn completion_model(&self) -> Arc<dyn LanguageModel> {
        self.completion_model.clone()
    }

    pub fn models(&self) -> &GatewayModels {
        &self.settings.models
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }
}
