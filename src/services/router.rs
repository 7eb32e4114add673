//! Roteador de eventos do webhook
//!
//! Para `message_created` (entrada) a ordem é fixa e cada ramo é terminal:
//! duplicata → reabertura → telefone → small talk → pedido de menu →
//! opção numérica → base de conhecimento → palavras groseiras → fallback de
//! geração.
//! Reabertura e telefone não encerram o processamento da mensagem.

use chatwoot::types::{Conversation, ConversationStatus, ConversationUpdate, Message, NewContact};
use std::sync::Arc;
use tokio::time::Duration;

use super::auto_close::AutoCloseScheduler;
use super::bad_words::{Severity, TAG_RUDE_CUSTOMER, TAG_SPECIAL_CASE};
use super::generation::ReplyGenerator;
use super::helpdesk::Helpdesk;
use super::kb_dispatcher::{DispatchOutcome, KbDispatcher};
use super::knowledge_base::{is_menu_request, pick_random, KnowledgeBase};
use super::lead_detection::{extract_phone, LeadDetector};
use super::messenger::{Messenger, SendOutcome};
use super::state_store::ConversationStateStore;
use super::tags::TagEngine;
use crate::config::Settings;
use crate::models::webhook_payload::{WebhookEvent, WebhookPayload};
use crate::utils::logging::*;
use crate::utils::normalization::{is_numeric_selection, normalize_text};
use crate::utils::AppResult;

pub const TAG_MENU_SENT: &str = "menu_enviado";
pub const TAG_WIDGET_OPENED: &str = "widget_abierto";
pub const TAG_SMALL_TALK_ANSWERED: &str = "small_talk_respondido";
pub const TAG_FALLBACK_ANSWERED: &str = "gpt_fallback_respondido";
pub const TAG_GENERATION_ERROR: &str = "error_gpt";

const UNKNOWN_CONTACT_NAME: &str = "Cliente desconocido";

/// O que o roteador fez com um evento
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Ignored(String),
    Duplicate,
    SmallTalk,
    Menu,
    KbDispatched { entry_id: String, outcome: DispatchOutcome },
    KbFailed { entry_id: String },
    InvalidOption,
    BadWords { severity: Severity },
    Generated,
    GenerationFailed,
    NoAction,
    Welcome { conversation_id: u64 },
    ClosingCourtesy,
    Reactivated,
    ContactUpdated,
}

impl RouteOutcome {
    fn ignored(reason: impl Into<String>) -> Self {
        RouteOutcome::Ignored(reason.into())
    }
}

pub struct EventRouter {
    settings: Settings,
    kb: Arc<KnowledgeBase>,
    helpdesk: Arc<dyn Helpdesk>,
    store: Arc<dyn ConversationStateStore>,
    generator: Arc<dyn ReplyGenerator>,
    messenger: Messenger,
    tags: TagEngine,
    dispatcher: KbDispatcher,
    leads: LeadDetector,
    auto_close: AutoCloseScheduler,
    duplicate_window: Duration,
}

impl EventRouter {
    pub fn new(
        settings: Settings,
        kb: Arc<KnowledgeBase>,
        helpdesk: Arc<dyn Helpdesk>,
        store: Arc<dyn ConversationStateStore>,
        generator: Arc<dyn ReplyGenerator>,
    ) -> Self {
        let bot = &settings.bot;
        let messenger = Messenger::new(Arc::clone(&helpdesk), Arc::clone(&store), bot.send_cooldown());
        let tags = TagEngine::new(Arc::clone(&helpdesk), kb.catalog());
        let dispatcher = KbDispatcher::new(
            Arc::clone(&helpdesk),
            Arc::clone(&store),
            messenger.clone(),
            tags.clone(),
            bot.response_lock(),
        );
        let leads = LeadDetector::new(Arc::clone(&helpdesk), kb.messages().phone_registered.clone());
        let auto_close = AutoCloseScheduler::new(
            Arc::clone(&helpdesk),
            Arc::clone(&store),
            messenger.clone(),
            tags.clone(),
            kb.messages().farewells.clone(),
            bot.auto_close_base(),
            bot.auto_close_increment(),
        );
        let duplicate_window = bot.duplicate_window();

        Self {
            settings,
            kb,
            helpdesk,
            store,
            generator,
            messenger,
            tags,
            dispatcher,
            leads,
            auto_close,
            duplicate_window,
        }
    }

    pub fn auto_close(&self) -> &AutoCloseScheduler {
        &self.auto_close
    }

    pub async fn handle(&self, payload: &WebhookPayload) -> AppResult<RouteOutcome> {
        match payload.kind() {
            WebhookEvent::MessageCreated => self.on_message_created(payload).await,
            WebhookEvent::ConversationCreated | WebhookEvent::WebwidgetTriggered => {
                self.on_conversation_opened(payload).await
            }
            WebhookEvent::ConversationStatusChanged => self.on_status_changed(payload).await,
            WebhookEvent::ConversationUpdated => {
                if !payload.status_changed() {
                    return Ok(RouteOutcome::ignored("conversation_updated sem mudança de status"));
                }
                self.on_status_changed(payload).await
            }
            WebhookEvent::ContactUpdated => self.on_contact_updated(payload).await,
            WebhookEvent::Other(event) => {
                log_event_ignored(&event, "evento não tratado");
                Ok(RouteOutcome::ignored(format!("evento não tratado: {}", event)))
            }
        }
    }

    // ------------------- message_created -------------------

    async fn on_message_created(&self, payload: &WebhookPayload) -> AppResult<RouteOutcome> {
        if !payload.is_incoming() {
            return Ok(RouteOutcome::ignored("mensagem não é de entrada"));
        }
        let conversation_id = match payload.conversation_id() {
            Some(id) => id,
            None => {
                log_warning("⚠️ message_created sin conversation id, ignorando");
                return Ok(RouteOutcome::ignored("sem conversation id"));
            }
        };

        let raw_text = payload.message_text().trim();
        if raw_text.is_empty() {
            return Ok(RouteOutcome::ignored("mensagem vazia"));
        }
        let normalized = normalize_text(raw_text);

        if self
            .store
            .check_duplicate(conversation_id, &normalized, self.duplicate_window)
            .await
        {
            tracing::info!("🔁 Webhook duplicado en conversación {}, descartado", conversation_id);
            return Ok(RouteOutcome::Duplicate);
        }

        log_info(&format!("💬 Mensaje entrante en conversación {}: {}", conversation_id, raw_text));

        let mut conversation = self.helpdesk.get_conversation(conversation_id).await?;
        if conversation.status == ConversationStatus::Resolved {
            self.reopen(&mut conversation).await?;
        }

        let labels = self.labels(conversation_id).await;
        let recent = self.recent_messages(conversation_id).await;
        let user_messages = count_incoming(&recent);
        let contact_id = conversation
            .contact()
            .or_else(|| payload.sender().and_then(|s| s.id));

        // 0️⃣ Telefone: resposta imediata, fora do lock de envio
        let detection = self
            .leads
            .detect_phone(conversation_id, contact_id, raw_text, &recent, &labels)
            .await;
        if let Some(reply) = &detection.reply {
            if let Err(e) = self.messenger.send_now(conversation_id, reply).await {
                log_error(&format!("❌ Error confirmando teléfono en conversación {}: {}", conversation_id, e));
            }
        }
        if !detection.tags.is_empty() {
            self.tags.add_tags_safely(conversation_id, &detection.tags).await;
        }

        // 1️⃣ Small talk
        if !has_label(&labels, TAG_SMALL_TALK_ANSWERED) && self.kb.is_small_talk(raw_text) {
            tracing::info!("🔹 Small talk detectado en conversación {}", conversation_id);
            self.messenger
                .send_guarded(conversation_id, &self.kb.messages().small_talk_reply)
                .await?;
            self.tags
                .add_tags_safely(conversation_id, &[TAG_SMALL_TALK_ANSWERED.to_string()])
                .await;
            return Ok(RouteOutcome::SmallTalk);
        }

        // 2️⃣ Pedido de menu
        if is_menu_request(raw_text) {
            tracing::info!("🔹 Solicitud de menú en conversación {}", conversation_id);
            self.messenger
                .send_guarded(conversation_id, self.kb.menu_message())
                .await?;
            self.auto_close.schedule(conversation_id, user_messages).await;
            return Ok(RouteOutcome::Menu);
        }

        let has_phone = match detection.phone {
            Some(_) => true,
            None => self.contact_has_phone(conversation_id, contact_id).await,
        };

        // 3️⃣ Opção numérica
        if is_numeric_selection(raw_text) {
            let entry = match self.kb.menu_selection(raw_text) {
                Some(entry) => entry,
                None => {
                    log_warning(&format!(
                        "⚠️ Opción de menú no válida: {} en conversación {}",
                        raw_text, conversation_id
                    ));
                    self.messenger
                        .send_guarded(conversation_id, &self.kb.messages().invalid_option)
                        .await?;
                    return Ok(RouteOutcome::InvalidOption);
                }
            };

            tracing::info!("🔹 Selección de menú válida: {} → {}", raw_text, entry.id);
            let outcome = match self
                .dispatcher
                .dispatch(&conversation, entry, has_phone, &[TAG_MENU_SENT.to_string()])
                .await
            {
                Ok(outcome) => RouteOutcome::KbDispatched { entry_id: entry.id.clone(), outcome },
                Err(e) => {
                    log_error(&format!("❌ Error enviando entrada '{}' en conversación {}: {}", entry.id, conversation_id, e));
                    self.apologize(conversation_id, &self.kb.messages().generic_error).await;
                    RouteOutcome::KbFailed { entry_id: entry.id.clone() }
                }
            };
            self.auto_close.schedule(conversation_id, user_messages).await;
            return Ok(outcome);
        }

        // 4️⃣ Base de conhecimento
        if let Some(entry) = self.kb.find_entry(raw_text) {
            tracing::info!("🔹 Coincidencia KB encontrada: {}", entry.id);
            let outcome = match self.dispatcher.dispatch(&conversation, entry, has_phone, &[]).await {
                Ok(outcome) => RouteOutcome::KbDispatched { entry_id: entry.id.clone(), outcome },
                Err(e) => {
                    log_error(&format!("❌ Error enviando entrada '{}' en conversación {}: {}", entry.id, conversation_id, e));
                    self.apologize(conversation_id, &self.kb.messages().generic_error).await;
                    RouteOutcome::KbFailed { entry_id: entry.id.clone() }
                }
            };
            self.auto_close.schedule(conversation_id, user_messages).await;
            return Ok(outcome);
        }

        // 5️⃣ Palavras groseiras
        if let Some(severity) = self.kb.bad_words().detect(raw_text) {
            log_warning(&format!(
                "🚫 Lenguaje ofensivo ({:?}) en conversación {}",
                severity, conversation_id
            ));
            if let Some(reply) = self.kb.bad_words().response(severity) {
                if let Err(e) = self.messenger.send_guarded(conversation_id, reply).await {
                    log_error(&format!("❌ Error respondiendo groserías en conversación {}: {}", conversation_id, e));
                }
            }
            self.tags
                .add_tags_safely(
                    conversation_id,
                    &[TAG_RUDE_CUSTOMER.to_string(), TAG_SPECIAL_CASE.to_string()],
                )
                .await;
            self.auto_close.schedule(conversation_id, user_messages).await;
            return Ok(RouteOutcome::BadWords { severity });
        }

        // 6️⃣ Fallback de geração, uma vez por conversa
        if has_label(&labels, TAG_FALLBACK_ANSWERED) {
            tracing::info!("Sin acción para conversación {} (fallback ya respondido)", conversation_id);
            return Ok(RouteOutcome::NoAction);
        }

        tracing::info!("🤖 Fallback de generación activado para conversación {}", conversation_id);
        let outcome = self.generation_fallback(conversation_id, raw_text, has_phone).await;
        self.auto_close.schedule(conversation_id, user_messages).await;
        Ok(outcome)
    }

    async fn generation_fallback(&self, conversation_id: u64, raw_text: &str, has_phone: bool) -> RouteOutcome {
        let reply = match self.generator.generate(conversation_id, raw_text, has_phone).await {
            Ok(reply) => reply,
            Err(e) => {
                log_error(&format!("❌ Error generando respuesta en conversación {}: {}", conversation_id, e));
                self.tags
                    .add_tags_safely(conversation_id, &[TAG_GENERATION_ERROR.to_string()])
                    .await;
                self.apologize(conversation_id, &self.kb.messages().generation_unavailable).await;
                return RouteOutcome::GenerationFailed;
            }
        };

        match self.messenger.send_guarded(conversation_id, &reply).await {
            Ok(_) => {
                self.tags
                    .add_tags_safely(conversation_id, &[TAG_FALLBACK_ANSWERED.to_string()])
                    .await;
                RouteOutcome::Generated
            }
            Err(e) => {
                log_error(&format!("❌ Error enviando respuesta generada en conversación {}: {}", conversation_id, e));
                self.apologize(conversation_id, &self.kb.messages().generic_error).await;
                RouteOutcome::GenerationFailed
            }
        }
    }

    /// Conversa resolvida recebendo mensagem: volta para `open`, rearma o
    /// auto-close e manda uma mensagem de reabertura
    async fn reopen(&self, conversation: &mut Conversation) -> AppResult<()> {
        let conversation_id = conversation.id;
        self.helpdesk
            .update_conversation(conversation_id, &ConversationUpdate::status(ConversationStatus::Open))
            .await?;
        conversation.status = ConversationStatus::Open;
        log_info(&format!("🔄 Conversación {} reabierta", conversation_id));

        self.auto_close.reactivate(conversation_id).await;

        if let Some(message) = pick_random(&self.kb.messages().reopenings) {
            if let Err(e) = self.messenger.send_now(conversation_id, message).await {
                log_error(&format!("❌ Error enviando reapertura en conversación {}: {}", conversation_id, e));
            }
        }
        Ok(())
    }

    // ------------------- conversation_created / webwidget_triggered -------------------

    async fn on_conversation_opened(&self, payload: &WebhookPayload) -> AppResult<RouteOutcome> {
        let conversation = match payload.conversation_id() {
            Some(id) => self.helpdesk.get_conversation(id).await?,
            None => match self.bootstrap_conversation(payload).await? {
                Some(conversation) => conversation,
                None => return Ok(RouteOutcome::ignored("sem conversa nem remetente")),
            },
        };
        let conversation_id = conversation.id;

        let labels = self.labels(conversation_id).await;
        if has_label(&labels, TAG_MENU_SENT) {
            tracing::info!("Menú ya enviado en conversación {}", conversation_id);
            return Ok(RouteOutcome::ignored("menu já enviado"));
        }

        log_info(&format!("🌟 Conversación {} iniciada o widget abierto, enviando menú inicial", conversation_id));
        self.messenger
            .send_guarded(conversation_id, &self.kb.welcome_message())
            .await?;
        self.tags
            .safe_add_tags(conversation_id, &[TAG_MENU_SENT.to_string(), TAG_WIDGET_OPENED.to_string()])
            .await;

        let contact_id = conversation
            .contact()
            .or_else(|| payload.sender().and_then(|s| s.id));
        let mut requests = self.leads.lead_tags(conversation_id, contact_id, &labels).await;

        let inbox_id = conversation.inbox_id.or_else(|| payload.conversation_inbox());
        if let Some((name, flow)) = inbox_id.and_then(|id| self.settings.flow_for_inbox(id)) {
            tracing::info!("📥 Flujo '{}' aplicado a conversación {}", name, conversation_id);
            for tag in &flow.tags {
                if !requests.contains(tag) {
                    requests.push(tag.clone());
                }
            }
            self.apply_flow_rule(&conversation, flow.team_id, flow.priority).await;
        }
        self.tags.add_tags_safely(conversation_id, &requests).await;

        self.auto_close.schedule(conversation_id, 1).await;
        Ok(RouteOutcome::Welcome { conversation_id })
    }

    /// Sem conversa no payload: reaproveita ou cria o contato e abre uma
    /// conversa no inbox padrão
    async fn bootstrap_conversation(&self, payload: &WebhookPayload) -> AppResult<Option<Conversation>> {
        let sender = match payload.sender() {
            Some(sender) => sender,
            None => return Ok(None),
        };
        let inbox = match self.settings.default_inbox() {
            Some(flow) => flow.inbox_id,
            None => {
                log_warning(&format!(
                    "⚠️ Inbox padrão '{}' no configurado; no se puede abrir conversación",
                    self.settings.bot.default_inbox
                ));
                return Ok(None);
            }
        };

        let contact_id = match sender.id {
            Some(id) => id,
            None => {
                let contact = self
                    .helpdesk
                    .create_contact(&NewContact {
                        name: sender
                            .name
                            .clone()
                            .filter(|n| !n.trim().is_empty())
                            .unwrap_or_else(|| UNKNOWN_CONTACT_NAME.to_string()),
                        email: sender.email.clone(),
                    })
                    .await?;
                tracing::info!("👤 Contacto {} creado", contact.id);
                contact.id
            }
        };

        let conversation = self.helpdesk.create_conversation(inbox, contact_id).await?;
        log_info(&format!("🆕 Conversación {} creada para contacto {}", conversation.id, contact_id));
        Ok(Some(conversation))
    }

    async fn apply_flow_rule(
        &self,
        conversation: &Conversation,
        team_id: Option<u64>,
        priority: Option<chatwoot::types::Priority>,
    ) {
        let conversation_id = conversation.id;
        if let Some(team_id) = team_id {
            if conversation.assigned_team().is_none() {
                if let Err(e) = self.helpdesk.assign_team(conversation_id, team_id).await {
                    log_chatwoot_api_error("assign_team", conversation_id, &e.to_string());
                }
            }
        }
        if let Some(priority) = priority {
            if conversation.priority.is_none() {
                if let Err(e) = self
                    .helpdesk
                    .update_conversation(conversation_id, &ConversationUpdate::priority(priority))
                    .await
                {
                    log_chatwoot_api_error("set_priority", conversation_id, &e.to_string());
                }
            }
        }
    }

    // ------------------- conversation_status_changed / conversation_updated -------------------

    async fn on_status_changed(&self, payload: &WebhookPayload) -> AppResult<RouteOutcome> {
        let conversation_id = match payload.conversation_id() {
            Some(id) => id,
            None => return Ok(RouteOutcome::ignored("sem conversation id")),
        };
        let status = payload
            .conversation_status()
            .and_then(|s| s.parse::<ConversationStatus>().ok());

        match status {
            Some(ConversationStatus::Open) => {
                // Reaberta fora do bot (agente ou API): estado anterior não vale mais
                log_info(&format!("🔄 Conversación {} reabierta", conversation_id));
                self.auto_close.reset(conversation_id).await;
                Ok(RouteOutcome::Reactivated)
            }
            Some(ConversationStatus::Resolved) => {
                if self.auto_close.resolved(conversation_id).await {
                    tracing::info!("Conversación {} cerrada por auto-close, sin cortesía", conversation_id);
                    return Ok(RouteOutcome::ignored("fechada pelo auto-close"));
                }

                log_info(&format!("✅ Conversación {} cerrada", conversation_id));
                match self
                    .messenger
                    .send_guarded(conversation_id, &self.kb.messages().closing_courtesy)
                    .await?
                {
                    SendOutcome::Sent => Ok(RouteOutcome::ClosingCourtesy),
                    SendOutcome::Suppressed => Ok(RouteOutcome::ignored("cortesia suprimida pelo lock de envio")),
                }
            }
            _ => Ok(RouteOutcome::ignored("status sem ação")),
        }
    }

    // ------------------- contact_updated -------------------

    async fn on_contact_updated(&self, payload: &WebhookPayload) -> AppResult<RouteOutcome> {
        let phone_field = payload.phone_number.as_deref().unwrap_or("").trim();
        let conversation_id = match payload.conversation_id() {
            Some(id) => id,
            None => {
                match extract_phone(phone_field) {
                    Some(phone) => tracing::info!(
                        "📇 Contacto {:?} actualizado con teléfono {}",
                        payload.id,
                        phone
                    ),
                    None => tracing::debug!("Contacto {:?} actualizado sin teléfono válido", payload.id),
                }
                return Ok(RouteOutcome::ContactUpdated);
            }
        };

        let labels = self.labels(conversation_id).await;
        let detection = self
            .leads
            .detect_phone(conversation_id, payload.id, phone_field, &[], &labels)
            .await;
        if let Some(reply) = &detection.reply {
            if let Err(e) = self.messenger.send_now(conversation_id, reply).await {
                log_error(&format!("❌ Error confirmando teléfono en conversación {}: {}", conversation_id, e));
            }
        }
        if !detection.tags.is_empty() {
            self.tags.add_tags_safely(conversation_id, &detection.tags).await;
        }
        Ok(RouteOutcome::ContactUpdated)
    }

    // ------------------- helpers -------------------

    async fn labels(&self, conversation_id: u64) -> Vec<String> {
        match self.helpdesk.get_labels(conversation_id).await {
            Ok(labels) => labels,
            Err(e) => {
                log_chatwoot_api_error("get_labels", conversation_id, &e.to_string());
                Vec::new()
            }
        }
    }

    async fn recent_messages(&self, conversation_id: u64) -> Vec<Message> {
        match self.helpdesk.recent_messages(conversation_id).await {
            Ok(messages) => messages,
            Err(e) => {
                log_chatwoot_api_error("recent_messages", conversation_id, &e.to_string());
                Vec::new()
            }
        }
    }

    async fn contact_has_phone(&self, conversation_id: u64, contact_id: Option<u64>) -> bool {
        let contact_id = match contact_id {
            Some(id) => id,
            None => return false,
        };
        match self.helpdesk.get_contact(contact_id).await {
            Ok(contact) => contact.has_phone(),
            Err(e) => {
                log_chatwoot_api_error("get_contact", conversation_id, &e.to_string());
                false
            }
        }
    }

    /// Desculpa ao usuário; fora do lock, que o envio que falhou já ocupou
    async fn apologize(&self, conversation_id: u64, message: &str) {
        if let Err(e) = self.messenger.send_now(conversation_id, message).await {
            log_error(&format!("❌ Error enviando disculpa en conversación {}: {}", conversation_id, e));
        }
    }
}

fn has_label(labels: &[String], tag: &str) -> bool {
    labels.iter().any(|l| l == tag)
}

/// Mensagens do usuário na página recente; a mensagem atual sempre conta
fn count_incoming(recent: &[Message]) -> u32 {
    let count = recent.iter().filter(|m| m.is_incoming()).count() as u32;
    count.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatwoot::types::MessageType;

    fn message(kind: MessageType) -> Message {
        Message { id: None, content: Some("x".into()), message_type: kind }
    }

    #[test]
    fn test_count_incoming() {
        assert_eq!(count_incoming(&[]), 1);
        let recent = vec![
            message(MessageType::Incoming),
            message(MessageType::Outgoing),
            message(MessageType::Incoming),
            message(MessageType::Activity),
        ];
        assert_eq!(count_incoming(&recent), 2);
    }

    #[test]
    fn test_has_label() {
        let labels = vec!["menu_enviado".to_string()];
        assert!(has_label(&labels, TAG_MENU_SENT));
        assert!(!has_label(&labels, TAG_WIDGET_OPENED));
    }
}
