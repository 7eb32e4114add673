use std::sync::Arc;
use tokio::time::Duration;

use super::helpdesk::Helpdesk;
use super::state_store::{ConversationStateStore, LockKey};
use crate::utils::logging::*;
use crate::utils::AppResult;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    Sent,
    /// Outro envio na mesma conversa dentro do cooldown
    Suppressed,
}

/// Envio de mensagens de saída
///
/// `send_guarded` passa pelo lock de envio da conversa: o lease dura o
/// cooldown inteiro e expira sozinho, tenha o envio funcionado ou não.
/// Retry fica a cargo do cliente HTTP.
#[derive(Clone)]
pub struct Messenger {
    helpdesk: Arc<dyn Helpdesk>,
    store: Arc<dyn ConversationStateStore>,
    cooldown: Duration,
}

impl Messenger {
    pub fn new(
        helpdesk: Arc<dyn Helpdesk>,
        store: Arc<dyn ConversationStateStore>,
        cooldown: Duration,
    ) -> Self {
        Self { helpdesk, store, cooldown }
    }

    /// Envio direto, sem lock (telefone registrado, reabertura)
    pub async fn send_now(&self, conversation_id: u64, content: &str) -> AppResult<()> {
        match self.helpdesk.send_message(conversation_id, content).await {
            Ok(()) => {
                log_reply_sent(conversation_id, content);
                Ok(())
            }
            Err(e) => {
                log_chatwoot_api_error("send_message", conversation_id, &e.to_string());
                Err(e.into())
            }
        }
    }

    pub async fn send_guarded(&self, conversation_id: u64, content: &str) -> AppResult<SendOutcome> {
        let key = LockKey::Send(conversation_id);
        if !self.store.try_acquire(&key, self.cooldown).await {
            log_reply_suppressed(conversation_id);
            return Ok(SendOutcome::Suppressed);
        }

        self.send_now(conversation_id, content).await?;
        Ok(SendOutcome::Sent)
    }
}
