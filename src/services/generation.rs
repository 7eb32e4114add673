//! Adaptador do backend de geração (fallback quando a KB não casa)

use async_trait::async_trait;
use ia_service::{IaService, IaServiceConfig, IaServiceError};
use thiserror::Error;

use crate::config::settings::OpenAISettings;

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation backend disabled")]
    Disabled,
    #[error("generation backend returned an empty completion")]
    Empty,
    #[error("generation backend error: {0}")]
    Backend(String),
}

impl From<IaServiceError> for GenerationError {
    fn from(err: IaServiceError) -> Self {
        match err {
            IaServiceError::EmptyCompletion => GenerationError::Empty,
            other => GenerationError::Backend(other.to_string()),
        }
    }
}

#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    /// Resposta de turno único para o texto bruto do usuário
    async fn generate(
        &self,
        conversation_id: u64,
        user_text: &str,
        contact_has_phone: bool,
    ) -> Result<String, GenerationError>;

    fn is_enabled(&self) -> bool {
        true
    }
}

pub struct OpenAiGenerator {
    service: IaService,
}

impl OpenAiGenerator {
    pub fn new(service: IaService) -> Self {
        Self { service }
    }

    pub fn from_settings(settings: &OpenAISettings) -> Result<Self, GenerationError> {
        let api_key = settings.api_key.clone().unwrap_or_default();
        let config = IaServiceConfig::new(api_key)
            .with_chat_model(settings.model.clone())
            .with_temperature(settings.temperature)
            .with_max_tokens(settings.max_tokens)
            .with_system_prompt(settings.system_prompt.clone());

        Ok(Self::new(IaService::new(config)?))
    }
}

#[async_trait]
impl ReplyGenerator for OpenAiGenerator {
    async fn generate(
        &self,
        conversation_id: u64,
        user_text: &str,
        contact_has_phone: bool,
    ) -> Result<String, GenerationError> {
        tracing::info!("🔹 Fallback de generación para conversación {}", conversation_id);
        let reply = self.service.generate_reply(user_text, contact_has_phone).await?;
        let reply = reply.trim();
        if reply.is_empty() {
            return Err(GenerationError::Empty);
        }
        Ok(reply.to_string())
    }
}

/// Usado quando não há chave da OpenAI configurada
pub struct DisabledGenerator;

#[async_trait]
impl ReplyGenerator for DisabledGenerator {
    async fn generate(&self, _: u64, _: &str, _: bool) -> Result<String, GenerationError> {
        Err(GenerationError::Disabled)
    }

    fn is_enabled(&self) -> bool {
        false
    }
}
