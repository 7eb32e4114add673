//! Cliente da API Chatwoot (v1)
//!
//! Cobre apenas o que o middleware de atendimento consome:
//!
//! - **Conversas**: leitura, criação, status/prioridade/meta, atribuição de time
//! - **Contatos**: leitura, criação, atualização de telefone
//! - **Mensagens**: últimas mensagens, envio de mensagem de saída (token do bot)
//! - **Labels**: leitura, substituição do conjunto, remoção individual
//!
//! Toda requisição passa pelo loop de retry de [`ChatwootClient::request`].
//!
//! # Exemplo
//!
//! ```rust,ignore
//! use chatwoot::{ChatwootClient, ChatwootConfig};
//!
//! let config = ChatwootConfig::new("https://app.chatwoot.com", 1, admin_token, bot_token);
//! let client = ChatwootClient::new(config)?;
//! let conversation = client.get_conversation(42).await?;
//! ```

pub mod client;
pub mod contacts;
pub mod conversations;
pub mod error;
pub mod labels;
pub mod messages;
pub mod types;

pub use client::{AuthToken, ChatwootClient, ChatwootConfig, RetryPolicy};
pub use error::{ChatwootError, Result};
