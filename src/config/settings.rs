use serde::{Deserialize, Serialize};
use config::{Config, ConfigError, Environment, File};
use std::collections::BTreeMap;
use std::time::Duration;

use chatwoot::types::Priority;

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub chatwoot: ChatwootSettings,
    #[serde(default)]
    pub openai: OpenAISettings,
    #[serde(default)]
    pub bot: BotSettings,
    /// Tabela de fluxos por inbox lógico ("principal", "soporte", ...)
    #[serde(default)]
    pub inboxes: BTreeMap<String, InboxFlow>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self { host: "0.0.0.0".to_string(), port: 8080 }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ChatwootSettings {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub account_id: u64,
    #[serde(default)]
    pub bot_token: String,
    #[serde(default)]
    pub admin_token: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_messages_page_size")]
    pub messages_page_size: usize,
    pub webhook_secret: Option<String>,
    #[serde(default)]
    pub validate_signature: bool,
}

impl Default for ChatwootSettings {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            account_id: 0,
            bot_token: String::new(),
            admin_token: String::new(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            messages_page_size: default_messages_page_size(),
            webhook_secret: None,
            validate_signature: false,
        }
    }
}

impl ChatwootSettings {
    /// Segredo do webhook, ignorando valor em branco
    pub fn signature_secret(&self) -> Option<&str> {
        self.webhook_secret
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// Validação ligada sem segredo: nenhum webhook é aceito
    pub fn signature_misconfigured(&self) -> bool {
        self.validate_signature && self.signature_secret().is_none()
    }

    pub fn is_configured(&self) -> bool {
        !self.base_url.is_empty()
            && self.account_id != 0
            && !self.bot_token.is_empty()
            && !self.admin_token.is_empty()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAISettings {
    pub api_key: Option<String>,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u16,
    #[serde(default = "default_system_prompt")]
    pub system_prompt: String,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            system_prompt: default_system_prompt(),
        }
    }
}

impl OpenAISettings {
    /// Chave presente e não vazia
    pub fn enabled(&self) -> bool {
        self.api_key.as_deref().map_or(false, |k| !k.trim().is_empty())
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BotSettings {
    #[serde(default = "default_send_cooldown_ms")]
    pub send_cooldown_ms: u64,
    #[serde(default = "default_response_lock_ms")]
    pub response_lock_ms: u64,
    #[serde(default = "default_duplicate_window_ms")]
    pub duplicate_window_ms: u64,
    #[serde(default = "default_auto_close_base_ms")]
    pub auto_close_base_ms: u64,
    #[serde(default = "default_auto_close_increment_ms")]
    pub auto_close_increment_ms: u64,
    #[serde(default = "default_inbox")]
    pub default_inbox: String,
    pub knowledge_base_path: Option<String>,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            send_cooldown_ms: default_send_cooldown_ms(),
            response_lock_ms: default_response_lock_ms(),
            duplicate_window_ms: default_duplicate_window_ms(),
            auto_close_base_ms: default_auto_close_base_ms(),
            auto_close_increment_ms: default_auto_close_increment_ms(),
            default_inbox: default_inbox(),
            knowledge_base_path: None,
        }
    }
}

impl BotSettings {
    pub fn send_cooldown(&self) -> Duration {
        Duration::from_millis(self.send_cooldown_ms)
    }

    pub fn response_lock(&self) -> Duration {
        Duration::from_millis(self.response_lock_ms)
    }

    pub fn duplicate_window(&self) -> Duration {
        Duration::from_millis(self.duplicate_window_ms)
    }

    pub fn auto_close_base(&self) -> Duration {
        Duration::from_millis(self.auto_close_base_ms)
    }

    pub fn auto_close_increment(&self) -> Duration {
        Duration::from_millis(self.auto_close_increment_ms)
    }
}

/// Regra de fluxo aplicada na criação da conversa
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct InboxFlow {
    pub inbox_id: u64,
    pub team_id: Option<u64>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub priority: Option<Priority>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let run_mode = std::env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            // Arquivo de configuração base
            .add_source(File::with_name("config/default").required(false))
            // Arquivo específico do ambiente
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false));

        // Variáveis de ambiente do deploy
        if let Ok(url) = std::env::var("CHATWOOT_URL") {
            builder = builder.set_override("chatwoot.base_url", url)?;
        }
        if let Ok(account_id) = std::env::var("CHATWOOT_ACCOUNT_ID") {
            let account_id: i64 = account_id.trim().parse().map_err(|e| {
                ConfigError::Message(format!("CHATWOOT_ACCOUNT_ID inválido: {}", e))
            })?;
            builder = builder.set_override("chatwoot.account_id", account_id)?;
        }
        if let Ok(token) = std::env::var("CHATWOOT_BOT_TOKEN").or_else(|_| std::env::var("BOT_TOKEN")) {
            builder = builder.set_override("chatwoot.bot_token", token)?;
        }
        if let Ok(token) = std::env::var("CHATWOOT_PERSONAL_TOKEN") {
            builder = builder.set_override("chatwoot.admin_token", token)?;
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            builder = builder.set_override("openai.api_key", key)?;
        }
        if let Ok(path) = std::env::var("KNOWLEDGE_BASE_PATH") {
            builder = builder.set_override("bot.knowledge_base_path", path)?;
        }
        if let Ok(port) = std::env::var("PORT") {
            let port: i64 = port.trim().parse().map_err(|e| {
                ConfigError::Message(format!("PORT inválido: {}", e))
            })?;
            builder = builder.set_override("server.port", port)?;
        }

        builder = builder.add_source(Environment::with_prefix("SUPPORT_BOT").separator("__"));

        let s = builder.build()?;

        s.try_deserialize()
    }

    /// Busca o fluxo pelo id numérico do inbox
    pub fn flow_for_inbox(&self, inbox_id: u64) -> Option<(&str, &InboxFlow)> {
        self.inboxes
            .iter()
            .find(|(_, flow)| flow.inbox_id == inbox_id)
            .map(|(name, flow)| (name.as_str(), flow))
    }

    pub fn default_inbox(&self) -> Option<&InboxFlow> {
        self.inboxes.get(&self.bot.default_inbox)
    }
}

fn default_timeout_secs() -> u64 { 10 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_base_delay_ms() -> u64 { 500 }
fn default_messages_page_size() -> usize { 10 }
fn default_model() -> String { "gpt-4o-mini".to_string() }
fn default_temperature() -> f32 { 0.7 }
fn default_max_tokens() -> u16 { 200 }
fn default_system_prompt() -> String { ia_service::DEFAULT_SYSTEM_PROMPT.to_string() }
fn default_send_cooldown_ms() -> u64 { 2000 }
fn default_response_lock_ms() -> u64 { 3000 }
fn default_duplicate_window_ms() -> u64 { 2000 }
fn default_auto_close_base_ms() -> u64 { 30_000 }
fn default_auto_close_increment_ms() -> u64 { 600_000 }
fn default_inbox() -> String { "principal".to_string() }

#[cfg(test)]
mod tests {
    use super::*;
    use config::FileFormat;

    fn from_toml(content: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults_when_sections_missing() {
        let s = from_toml("");
        assert_eq!(s.server.port, 8080);
        assert_eq!(s.chatwoot.max_retries, 3);
        assert_eq!(s.chatwoot.retry_base_delay_ms, 500);
        assert_eq!(s.chatwoot.messages_page_size, 10);
        assert_eq!(s.bot.send_cooldown(), Duration::from_millis(2000));
        assert_eq!(s.bot.response_lock(), Duration::from_millis(3000));
        assert_eq!(s.bot.auto_close_base(), Duration::from_secs(30));
        assert_eq!(s.bot.auto_close_increment(), Duration::from_secs(600));
        assert_eq!(s.openai.model, "gpt-4o-mini");
        assert!(!s.openai.enabled());
        assert!(!s.chatwoot.is_configured());
    }

    #[test]
    fn test_inbox_flow_table() {
        let s = from_toml(r#"
            [bot]
            default_inbox = "principal"

            [inboxes.principal]
            inbox_id = 75070
            team_id = 9025
            tags = ["lead_calificado", "marketing"]
            priority = "high"

            [inboxes.soporte]
            inbox_id = 75071
            team_id = 9023
            tags = ["soporte_incidente"]
            priority = "medium"
        "#);

        let (name, flow) = s.flow_for_inbox(75071).unwrap();
        assert_eq!(name, "soporte");
        assert_eq!(flow.team_id, Some(9023));
        assert_eq!(flow.priority, Some(Priority::Medium));

        assert_eq!(s.default_inbox().unwrap().inbox_id, 75070);
        assert!(s.flow_for_inbox(1).is_none());
    }

    #[test]
    fn test_signature_without_secret_is_misconfigured() {
        let mut s = ChatwootSettings::default();
        assert!(!s.signature_misconfigured());

        s.validate_signature = true;
        assert!(s.signature_misconfigured());
        s.webhook_secret = Some(" ".into());
        assert!(s.signature_misconfigured());

        s.webhook_secret = Some("segredo".into());
        assert!(!s.signature_misconfigured());
        assert_eq!(s.signature_secret(), Some("segredo"));
    }

    #[test]
    fn test_openai_enabled_requires_non_blank_key() {
        let mut s = OpenAISettings::default();
        s.api_key = Some("   ".into());
        assert!(!s.enabled());
        s.api_key = Some("sk-test".into());
        assert!(s.enabled());
    }
}
