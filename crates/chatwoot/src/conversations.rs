//! Endpoints de conversas: leitura, criação, atualização e atribuição de time

use crate::client::{AuthToken, ChatwootClient};
use crate::error::Result;
use crate::types::{Conversation, ConversationStatus, ConversationUpdate, Priority};
use serde_json::{json, Value};
use std::collections::BTreeMap;

impl ChatwootClient {
    /// `GET /conversations/{id}`
    pub async fn get_conversation(&self, conversation_id: u64) -> Result<Conversation> {
        self.get_json(&format!("/conversations/{}", conversation_id)).await
    }

    /// `POST /conversations` abrindo uma conversa para o contato na inbox
    pub async fn create_conversation(&self, inbox_id: u64, contact_id: u64) -> Result<Conversation> {
        let body = json!({ "inbox_id": inbox_id, "contact_id": contact_id });
        let conversation: Conversation = self.post_json("/conversations", &body, AuthToken::Admin).await?;
        tracing::info!("🆕 Conversa {} criada (inbox {}, contato {})", conversation.id, inbox_id, contact_id);
        Ok(conversation)
    }

    /// `PUT /conversations/{id}`
    pub async fn update_conversation(&self, conversation_id: u64, update: &ConversationUpdate) -> Result<()> {
        let body = serde_json::to_value(update)?;
        let _: Value = self
            .put_json(&format!("/conversations/{}", conversation_id), &body)
            .await?;
        Ok(())
    }

    pub async fn set_status(&self, conversation_id: u64, status: ConversationStatus) -> Result<()> {
        self.update_conversation(conversation_id, &ConversationUpdate::status(status)).await
    }

    pub async fn set_priority(&self, conversation_id: u64, priority: Priority) -> Result<()> {
        self.update_conversation(conversation_id, &ConversationUpdate::priority(priority)).await
    }

    /// Persiste os contadores da base de conhecimento em `meta.kb_counter`
    pub async fn save_kb_counter(&self, conversation_id: u64, counters: BTreeMap<String, u32>) -> Result<()> {
        self.update_conversation(conversation_id, &ConversationUpdate::kb_counter(counters)).await
    }

    /// `POST /conversations/{id}/assignments` com `team_id`
    pub async fn assign_team(&self, conversation_id: u64, team_id: u64) -> Result<()> {
        let body = json!({ "team_id": team_id });
        let _: Value = self
            .post_json(
                &format!("/conversations/{}/assignments", conversation_id),
                &body,
                AuthToken::Admin,
            )
            .await?;
        Ok(())
    }
}
