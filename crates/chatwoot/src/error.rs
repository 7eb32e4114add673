//! Tipos de erro para o crate chatwoot

use thiserror::Error;

/// Status HTTP considerados transitórios (retry com backoff)
pub const RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Erros do cliente Chatwoot
#[derive(Debug, Error)]
pub enum ChatwootError {
    /// Falha de transporte (conexão recusada, DNS, timeout)
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Resposta da API com status não-2xx
    #[error("Chatwoot API error (status {status}): {body}")]
    Http { status: u16, body: String },

    /// Corpo da resposta não é o JSON esperado
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// Erro de configuração do cliente
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ChatwootError {
    /// Indica se vale a pena repetir a requisição
    pub fn is_transient(&self) -> bool {
        match self {
            ChatwootError::Network(e) => !e.is_builder(),
            ChatwootError::Http { status, .. } => is_retryable_status(*status),
            ChatwootError::Json(_) | ChatwootError::Config(_) => false,
        }
    }

    /// Status HTTP, quando a falha veio da API
    pub fn status(&self) -> Option<u16> {
        match self {
            ChatwootError::Http { status, .. } => Some(*status),
            ChatwootError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub fn is_retryable_status(status: u16) -> bool {
    RETRYABLE_STATUSES.contains(&status)
}

/// Tipo Result padrão para o crate
pub type Result<T> = std::result::Result<T, ChatwootError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_statuses() {
        for status in [429, 500, 502, 503, 504] {
            assert!(is_retryable_status(status), "{} deveria ser transitório", status);
        }
        for status in [400, 401, 403, 404, 422, 501] {
            assert!(!is_retryable_status(status), "{} não deveria ser transitório", status);
        }
    }

    #[test]
    fn test_http_error_transience() {
        let transient = ChatwootError::Http { status: 503, body: "unavailable".into() };
        let permanent = ChatwootError::Http { status: 404, body: "not found".into() };

        assert!(transient.is_transient());
        assert!(!permanent.is_transient());
        assert_eq!(permanent.status(), Some(404));
        assert!(!ChatwootError::Config("x".into()).is_transient());
    }
}
