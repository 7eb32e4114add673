//! Endpoints de mensagens

use crate::client::{AuthToken, ChatwootClient};
use crate::error::Result;
use crate::types::Message;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Debug, Deserialize)]
struct MessagesPage {
    #[serde(default)]
    payload: Vec<Message>,
}

impl ChatwootClient {
    /// Últimas `limit` mensagens da conversa, em ordem cronológica
    pub async fn recent_messages(&self, conversation_id: u64, limit: usize) -> Result<Vec<Message>> {
        let page: MessagesPage = self
            .get_json(&format!("/conversations/{}/messages", conversation_id))
            .await?;

        let mut messages = page.payload;
        if messages.len() > limit {
            let excess = messages.len() - limit;
            messages.drain(..excess);
        }
        Ok(messages)
    }

    /// Envia mensagem de saída usando o token do bot
    pub async fn send_message(&self, conversation_id: u64, content: &str) -> Result<()> {
        let body = json!({
            "content": content,
            "message_type": "outgoing",
            "private": false,
        });
        let _: Value = self
            .post_json(
                &format!("/conversations/{}/messages", conversation_id),
                &body,
                AuthToken::Bot,
            )
            .await?;
        Ok(())
    }
}
