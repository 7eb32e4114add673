//! Fechamento automático de conversas inativas
//!
//! No máximo um timer pendente por conversa. O prazo cresce com o número de
//! mensagens do usuário: `base + incremento × mensagens`. O timer não é
//! abortado quando a conversa muda; no disparo ele confere o próprio ticket,
//! a flag de auto-close e o status atual antes de agir.

use chatwoot::types::{ConversationStatus, ConversationUpdate};
use std::sync::Arc;
use tokio::time::{Duration, Instant};

use super::helpdesk::Helpdesk;
use super::knowledge_base::pick_random;
use super::messenger::Messenger;
use super::state_store::ConversationStateStore;
use super::tags::TagEngine;
use crate::utils::logging::*;
use crate::utils::AppResult;

pub const TAG_NO_RESPONSE: &str = "no_respuesta";

pub fn timeout_for(base: Duration, increment: Duration, user_message_count: u32) -> Duration {
    base + increment * user_message_count
}

#[derive(Clone)]
pub struct AutoCloseScheduler {
    inner: Arc<Inner>,
}

struct Inner {
    helpdesk: Arc<dyn Helpdesk>,
    store: Arc<dyn ConversationStateStore>,
    messenger: Messenger,
    tags: TagEngine,
    farewells: Vec<String>,
    base: Duration,
    increment: Duration,
}

impl AutoCloseScheduler {
    pub fn new(
        helpdesk: Arc<dyn Helpdesk>,
        store: Arc<dyn ConversationStateStore>,
        messenger: Messenger,
        tags: TagEngine,
        farewells: Vec<String>,
        base: Duration,
        increment: Duration,
    ) -> Self {
        Self {
            inner: Arc::new(Inner { helpdesk, store, messenger, tags, farewells, base, increment }),
        }
    }

    pub fn timeout(&self, user_message_count: u32) -> Duration {
        timeout_for(self.inner.base, self.inner.increment, user_message_count)
    }

    /// Agenda o fechamento; `false` quando já fechou ou já há timer pendente
    pub async fn schedule(&self, conversation_id: u64, user_message_count: u32) -> bool {
        let store = &self.inner.store;
        if store.is_auto_closed(conversation_id).await {
            return false;
        }

        let timeout = self.timeout(user_message_count);
        let ticket = match store.try_set_timer(conversation_id, Instant::now() + timeout).await {
            Some(ticket) => ticket,
            None => return false,
        };

        tracing::info!(
            "⏳ Auto-close agendado para conversación {}, timeout = {}ms",
            conversation_id,
            timeout.as_millis()
        );

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep_until(ticket.deadline).await;
            this.fire(conversation_id, ticket.id).await;
        });

        true
    }

    /// Reabertura pelo bot: limpa o estado e rearma o relógio com zero mensagens
    pub async fn reactivate(&self, conversation_id: u64) -> bool {
        self.reset(conversation_id).await;
        self.schedule(conversation_id, 0).await
    }

    /// Reabertura por um agente: limpa o estado sem rearmar; a próxima
    /// mensagem do usuário agenda o timer
    pub async fn reset(&self, conversation_id: u64) {
        self.inner.store.forget(conversation_id).await;
    }

    /// Conversa resolvida: desarma o timer e descarta o estado.
    /// Devolve `true` quando a resolução foi o próprio auto-close.
    pub async fn resolved(&self, conversation_id: u64) -> bool {
        let store = &self.inner.store;
        let closed_by_bot = store.take_closed_by_bot(conversation_id).await;
        store.cancel_timer(conversation_id).await;
        store.forget(conversation_id).await;
        closed_by_bot
    }

    async fn fire(&self, conversation_id: u64, ticket_id: u64) {
        let store = &self.inner.store;
        let current = store.pending_timer(conversation_id).await.map(|t| t.id);
        if current != Some(ticket_id) {
            tracing::debug!("Auto-close cancelado para conversación {}", conversation_id);
            return;
        }

        match self.close_if_idle(conversation_id).await {
            Ok(true) => log_info(&format!(
                "✅ Conversación {} cerrada automáticamente por inactividad",
                conversation_id
            )),
            Ok(false) => {}
            Err(e) => log_error(&format!("❌ Error en auto-close de conversación {}: {}", conversation_id, e)),
        }

        store.complete_timer(conversation_id, ticket_id).await;
    }

    async fn close_if_idle(&self, conversation_id: u64) -> AppResult<bool> {
        let inner = &self.inner;
        if inner.store.is_auto_closed(conversation_id).await {
            return Ok(false);
        }

        let conversation = inner.helpdesk.get_conversation(conversation_id).await?;
        if !conversation.is_open() {
            tracing::debug!(
                "Conversación {} en estado '{}', auto-close omitido",
                conversation_id,
                conversation.status
            );
            return Ok(false);
        }

        inner
            .tags
            .add_tags_safely(conversation_id, &[TAG_NO_RESPONSE.to_string()])
            .await;

        if let Some(farewell) = pick_random(&inner.farewells) {
            if let Err(e) = inner.messenger.send_guarded(conversation_id, farewell).await {
                log_warning(&format!("Despedida no enviada en conversación {}: {}", conversation_id, e));
            }
        }

        // Flag e marca vêm antes do PUT: o webhook de "resolved" gerado por
        // este fechamento não deve disparar a mensagem de cortesia
        inner.store.set_auto_closed(conversation_id, true).await;
        inner.store.set_closed_by_bot(conversation_id, true).await;
        if let Err(e) = inner
            .helpdesk
            .update_conversation(conversation_id, &ConversationUpdate::status(ConversationStatus::Resolved))
            .await
        {
            inner.store.set_auto_closed(conversation_id, false).await;
            inner.store.set_closed_by_bot(conversation_id, false).await;
            return Err(e.into());
        }

        Ok(true)
    }
}
