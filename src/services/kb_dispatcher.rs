use chatwoot::types::{Conversation, ConversationUpdate};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::time::Duration;

use super::helpdesk::Helpdesk;
use super::knowledge_base::KbEntry;
use super::messenger::{Messenger, SendOutcome};
use super::state_store::{ConversationStateStore, LockKey};
use super::tags::TagEngine;
use crate::utils::logging::*;
use crate::utils::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Resposta normal enviada
    Sent,
    /// Limite de respostas atingido; enviada a resposta de excedente
    Exceeded,
    /// Mesma entrada despachada há pouco nesta conversa
    Duplicate,
    /// Lock de envio ocupado; efeitos colaterais aplicados mesmo assim
    SendSuppressed,
}

/// Despacho de uma entrada da base de conhecimento
///
/// Ordem: lock de resposta → limite → resposta → contador → tags → time →
/// prioridade. Cada efeito colateral é independente; uma falha é registrada
/// e o passo seguinte roda. Só a falha de envio da resposta volta como `Err`,
/// depois que todos os passos rodaram.
pub struct KbDispatcher {
    helpdesk: Arc<dyn Helpdesk>,
    store: Arc<dyn ConversationStateStore>,
    messenger: Messenger,
    tags: TagEngine,
    response_lock: Duration,
}

impl KbDispatcher {
    pub fn new(
        helpdesk: Arc<dyn Helpdesk>,
        store: Arc<dyn ConversationStateStore>,
        messenger: Messenger,
        tags: TagEngine,
        response_lock: Duration,
    ) -> Self {
        Self { helpdesk, store, messenger, tags, response_lock }
    }

    /// `conversation` é o snapshot lido no início do evento; `extra_tags`
    /// entram na mesma passada de reconciliação das tags da entrada
    pub async fn dispatch(
        &self,
        conversation: &Conversation,
        entry: &KbEntry,
        contact_has_phone: bool,
        extra_tags: &[String],
    ) -> AppResult<DispatchOutcome> {
        let conversation_id = conversation.id;

        let lock = LockKey::Response(conversation_id, entry.id.clone());
        if !self.store.try_acquire(&lock, self.response_lock).await {
            tracing::info!(
                "🔁 Entrada '{}' ya respondida hace instantes en conversación {}",
                entry.id,
                conversation_id
            );
            return Ok(DispatchOutcome::Duplicate);
        }

        let counters = self.load_counters(conversation).await;

        if let (Some(key), Some(limit)) = (entry.counter_key(), entry.actions.max_responses) {
            let count = counters.get(key).copied().unwrap_or(0);
            if count >= limit {
                tracing::info!(
                    "🚫 Límite de respuestas alcanzado para '{}' en conversación {} ({}/{})",
                    key,
                    conversation_id,
                    count,
                    limit
                );
                self.messenger
                    .send_guarded(conversation_id, &entry.exceeded_response)
                    .await?;
                return Ok(DispatchOutcome::Exceeded);
            }
        }

        tracing::info!("📚 Enviando entrada '{}' en conversación {}", entry.id, conversation_id);
        let reply = self
            .messenger
            .send_guarded(conversation_id, &entry.render(contact_has_phone))
            .await;

        if matches!(reply, Ok(SendOutcome::Sent)) {
            if let Some(key) = entry.counter_key() {
                let updated = self.store.increment_counter(conversation_id, key).await;
                self.persist_counters(conversation_id, updated).await;
            }
        }

        let mut requests = entry.tag_requests();
        for tag in extra_tags {
            if !requests.contains(tag) {
                requests.push(tag.clone());
            }
        }
        self.tags.add_tags_safely(conversation_id, &requests).await;

        if let Some(team_id) = entry.actions.assign_team_id {
            if conversation.assigned_team().is_none() {
                match self.helpdesk.assign_team(conversation_id, team_id).await {
                    Ok(()) => tracing::info!("👥 Conversación {} asignada al equipo {}", conversation_id, team_id),
                    Err(e) => log_chatwoot_api_error("assign_team", conversation_id, &e.to_string()),
                }
            }
        }

        if let Some(priority) = entry.actions.priority {
            if conversation.priority.is_none() {
                match self
                    .helpdesk
                    .update_conversation(conversation_id, &ConversationUpdate::priority(priority))
                    .await
                {
                    Ok(()) => tracing::info!("⚡ Prioridad '{}' en conversación {}", priority, conversation_id),
                    Err(e) => log_chatwoot_api_error("set_priority", conversation_id, &e.to_string()),
                }
            }
        }

        match reply? {
            SendOutcome::Sent => Ok(DispatchOutcome::Sent),
            SendOutcome::Suppressed => Ok(DispatchOutcome::SendSuppressed),
        }
    }

    /// Cache do processo, ou o `meta.kb_counter` salvo na conversa
    async fn load_counters(&self, conversation: &Conversation) -> BTreeMap<String, u32> {
        if let Some(counters) = self.store.counters(conversation.id).await {
            return counters;
        }
        let persisted = conversation.meta.kb_counter.clone();
        self.store.set_counters(conversation.id, persisted.clone()).await;
        persisted
    }

    async fn persist_counters(&self, conversation_id: u64, counters: BTreeMap<String, u32>) {
        if let Err(e) = self
            .helpdesk
            .update_conversation(conversation_id, &ConversationUpdate::kb_counter(counters))
            .await
        {
            log_chatwoot_api_error("save_kb_counter", conversation_id, &e.to_string());
        }
    }
}
