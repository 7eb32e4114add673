//! Cliente HTTP para a API do Chatwoot
//!
//! Todas as chamadas passam por [`ChatwootClient::request`], que aplica:
//! - timeout rígido por tentativa (padrão 10s)
//! - retry com backoff exponencial em falhas de rede e status {429, 500, 502, 503, 504}
//! - erro imediato (sem retry) para os demais 4xx e respostas malformadas
//!
//! Chamadas não-idempotentes (POST de mensagem, POST de labels) são portanto
//! *at-least-once*: um timeout pode gerar entrega duplicada no Chatwoot.

use crate::error::{ChatwootError, Result};
use reqwest::{Client as HttpClient, Method, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

/// Qual token de acesso usar na requisição
///
/// - `Admin`: token pessoal/administrativo (leitura e gerenciamento)
/// - `Bot`: token do agente bot (envio de mensagens)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthToken {
    Admin,
    Bot,
}

/// Política de retry com backoff exponencial
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Número de novas tentativas após a primeira (padrão: 3)
    pub max_retries: u32,
    /// Atraso antes da primeira nova tentativa; dobra a cada tentativa (padrão: 500ms)
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Sem retry: uma única tentativa
    pub fn none() -> Self {
        Self::new(0, Duration::ZERO)
    }

    /// Atraso antes da nova tentativa `retry` (1-based): base * 2^(retry-1)
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 2u32.saturating_pow(retry.saturating_sub(1));
        self.base_delay.saturating_mul(factor)
    }
}

/// Configuração de conexão com o Chatwoot
#[derive(Debug, Clone)]
pub struct ChatwootConfig {
    pub base_url: String,
    pub account_id: u64,
    pub admin_token: String,
    pub bot_token: String,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ChatwootConfig {
    pub fn new(
        base_url: impl Into<String>,
        account_id: u64,
        admin_token: impl Into<String>,
        bot_token: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            account_id,
            admin_token: admin_token.into(),
            bot_token: bot_token.into(),
            timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Cliente para interagir com a API v1 do Chatwoot
#[derive(Clone)]
pub struct ChatwootClient {
    http_client: HttpClient,
    config: ChatwootConfig,
    base_url: String,
}

impl ChatwootClient {
    /// Cria um novo cliente Chatwoot
    ///
    /// # Timeouts
    ///
    /// - Total por tentativa: `config.timeout`
    /// - Connect: 5s (ou o timeout total, se menor)
    pub fn new(config: ChatwootConfig) -> Result<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ChatwootError::Config("Chatwoot base URL is empty".to_string()));
        }

        let http_client = HttpClient::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(5)))
            .build()
            .map_err(|e| ChatwootError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            config,
            base_url,
        })
    }

    /// URL completa de um recurso da conta: `{base}/api/v1/accounts/{account}{path}`
    pub fn account_url(&self, path: &str) -> String {
        format!(
            "{}/api/v1/accounts/{}{}",
            self.base_url, self.config.account_id, path
        )
    }

    pub fn config(&self) -> &ChatwootConfig {
        &self.config
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.request_json(Method::GET, path, None, AuthToken::Admin).await
    }

    pub(crate) async fn post_json<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
        auth: AuthToken,
    ) -> Result<T> {
        self.request_json(Method::POST, path, Some(body), auth).await
    }

    pub(crate) async fn put_json<T: DeserializeOwned>(&self, path: &str, body: &Value) -> Result<T> {
        self.request_json(Method::PUT, path, Some(body), AuthToken::Admin).await
    }

    pub(crate) async fn delete_with_body(&self, path: &str, body: &Value) -> Result<Value> {
        self.request(Method::DELETE, path, Some(body), AuthToken::Admin).await
    }

    /// Executa a requisição e desserializa o corpo JSON em `T`
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth: AuthToken,
    ) -> Result<T> {
        let value = self.request(method, path, body, auth).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Executa a requisição com retry e backoff exponencial
    ///
    /// Corpo vazio na resposta vira `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        auth: AuthToken,
    ) -> Result<Value> {
        let url = self.account_url(path);
        let max_attempts = self.config.retry.max_retries + 1;
        let mut attempt = 0;

        loop {
            attempt += 1;

            match self.send_once(method.clone(), &url, body, auth).await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!("✅ {} {} succeeded on attempt {}/{}", method, url, attempt, max_attempts);
                    }
                    return Ok(value);
                }
                Err(e) if e.is_transient() && attempt < max_attempts => {
                    let backoff = self.config.retry.backoff(attempt);
                    tracing::warn!(
                        "⚠️ {} {} failed (attempt {}/{}): {}. Retrying in {}ms...",
                        method,
                        url,
                        attempt,
                        max_attempts,
                        e,
                        backoff.as_millis()
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    tracing::error!("❌ {} {} failed after {} attempt(s): {}", method, url, attempt, e);
                    return Err(e);
                }
            }
        }
    }

    async fn send_once(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
        auth: AuthToken,
    ) -> Result<Value> {
        tracing::debug!("{} {}", method, url);

        let token = match auth {
            AuthToken::Admin => &self.config.admin_token,
            AuthToken::Bot => &self.config.bot_token,
        };

        let mut request = self
            .http_client
            .request(method, url)
            .header("api_access_token", token)
            .header("Content-Type", "application/json");

        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        self.handle_response(response).await
    }

    /// Processa a resposta HTTP e trata erros
    async fn handle_response(&self, response: Response) -> Result<Value> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ChatwootError::Http {
                status: status.as_u16(),
                body: text,
            });
        }

        if text.trim().is_empty() {
            return Ok(Value::Null);
        }

        Ok(serde_json::from_str(&text)?)
    }
}
