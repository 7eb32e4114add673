//! Serviço de IA usando async-openai
//!
//! Gera a resposta de fallback do atendimento quando nenhuma entrada da base de
//! conhecimento casa com a mensagem do usuário. A chamada é de turno único:
//!
//! 1. instrução de sistema (persona de atendimento)
//! 2. texto cru do usuário
//! 3. dica de sistema dizendo se o contato tem telefone cadastrado
//!
//! Resposta vazia é tratada como erro ([`IaServiceError::EmptyCompletion`]).

use async_openai::{
    config::OpenAIConfig,
    types::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
    },
    Client,
};
use std::error::Error;
use std::fmt;

pub const DEFAULT_SYSTEM_PROMPT: &str = "Eres un asistente de atención al cliente.";
pub const HINT_WITH_PHONE: &str = "El usuario tiene un número de teléfono.";
pub const HINT_WITHOUT_PHONE: &str = "El usuario no tiene un número de teléfono.";

/// Erros do serviço de IA
#[derive(Debug)]
pub enum IaServiceError {
    OpenAIError(String),
    EmptyCompletion,
    ConfigError(String),
}

impl fmt::Display for IaServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IaServiceError::OpenAIError(msg) => write!(f, "OpenAI error: {}", msg),
            IaServiceError::EmptyCompletion => write!(f, "OpenAI returned an empty completion"),
            IaServiceError::ConfigError(msg) => write!(f, "Config error: {}", msg),
        }
    }
}

impl Error for IaServiceError {}

pub type IaResult<T> = Result<T, IaServiceError>;

/// Configuração do serviço de IA
#[derive(Clone)]
pub struct IaServiceConfig {
    /// API key da OpenAI
    pub api_key: String,
    /// Modelo de chat (padrão: gpt-4o-mini)
    pub chat_model: String,
    /// Temperatura (padrão: 0.7)
    pub temperature: f32,
    /// Max tokens da resposta (padrão: 200)
    pub max_tokens: u16,
    /// Instrução de sistema
    pub system_prompt: String,
    /// Endpoint alternativo (proxy, Azure-compatível, mock)
    pub api_base: Option<String>,
}

impl IaServiceConfig {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            chat_model: "gpt-4o-mini".to_string(),
            temperature: 0.7,
            max_tokens: 200,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            api_base: None,
        }
    }

    pub fn with_chat_model(mut self, model: impl Into<String>) -> Self {
        self.chat_model = model.into();
        self
    }

    pub fn with_temperature(mut self, temp: f32) -> Self {
        self.temperature = temp;
        self
    }

    pub fn with_max_tokens(mut self, tokens: u16) -> Self {
        self.max_tokens = tokens;
        self
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }
}

/// Serviço principal de IA
#[derive(Clone)]
pub struct IaService {
    client: Client<OpenAIConfig>,
    config: IaServiceConfig,
}

impl IaService {
    /// Cria novo serviço de IA
    pub fn new(config: IaServiceConfig) -> IaResult<Self> {
        if config.api_key.trim().is_empty() {
            return Err(IaServiceError::ConfigError("OpenAI API key is empty".to_string()));
        }

        let mut openai_config = OpenAIConfig::new().with_api_key(&config.api_key);
        if let Some(api_base) = &config.api_base {
            openai_config = openai_config.with_api_base(api_base);
        }
        let client = Client::with_config(openai_config);

        tracing::info!("✅ IaService inicializado com modelo: {}", config.chat_model);

        Ok(Self { client, config })
    }

    /// Gera a resposta de atendimento para o texto do usuário
    pub async fn generate_reply(&self, user_text: &str, contact_has_phone: bool) -> IaResult<String> {
        tracing::info!("🤖 Gerando resposta de fallback ({} chars)", user_text.chars().count());

        let messages = build_messages(&self.config.system_prompt, user_text, contact_has_phone)?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.config.chat_model)
            .messages(messages)
            .temperature(self.config.temperature)
            .max_tokens(self.config.max_tokens)
            .build()
            .map_err(|e| IaServiceError::OpenAIError(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| IaServiceError::OpenAIError(format!("API call failed: {}", e)))?;

        let content = response
            .choices
            .first()
            .and_then(|choice| choice.message.content.as_deref())
            .map(str::trim)
            .unwrap_or_default();

        if content.is_empty() {
            tracing::warn!("⚠️ OpenAI respondeu vazio");
            return Err(IaServiceError::EmptyCompletion);
        }

        tracing::info!("✅ Resposta gerada: {} chars", content.chars().count());
        Ok(content.to_string())
    }

    /// Obtém informações sobre a configuração atual
    pub fn get_config(&self) -> &IaServiceConfig {
        &self.config
    }
}

pub fn phone_hint(contact_has_phone: bool) -> &'static str {
    if contact_has_phone {
        HINT_WITH_PHONE
    } else {
        HINT_WITHOUT_PHONE
    }
}

/// Monta as três mensagens da chamada: sistema, usuário, dica de telefone
pub fn build_messages(
    system_prompt: &str,
    user_text: &str,
    contact_has_phone: bool,
) -> IaResult<Vec<ChatCompletionRequestMessage>> {
    let build_err = |e: async_openai::error::OpenAIError| {
        IaServiceError::OpenAIError(format!("Failed to build message: {}", e))
    };

    Ok(vec![
        ChatCompletionRequestSystemMessageArgs::default()
            .content(system_prompt)
            .build()
            .map_err(build_err)?
            .into(),
        ChatCompletionRequestUserMessageArgs::default()
            .content(user_text)
            .build()
            .map_err(build_err)?
            .into(),
        ChatCompletionRequestSystemMessageArgs::default()
            .content(phone_hint(contact_has_phone))
            .build()
            .map_err(build_err)?
            .into(),
    ])
}
