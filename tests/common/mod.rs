#![allow(dead_code)]

use async_trait::async_trait;
use chatwoot::types::{
    Contact, ContactUpdate, Conversation, ConversationStatus, ConversationUpdate, Message, MessageType,
    NewContact,
};
use chatwoot::ChatwootError;
use serde_json::json;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chatwoot_bot_middleware::config::knowledge_base_loader;
use chatwoot_bot_middleware::config::{InboxFlow, Settings};
use chatwoot_bot_middleware::models::WebhookPayload;
use chatwoot_bot_middleware::services::helpdesk::{Helpdesk, HelpdeskResult};
use chatwoot_bot_middleware::services::{
    GenerationError, InMemoryStateStore, KnowledgeBase, ReplyGenerator,
};
use chatwoot_bot_middleware::AppState;

/// Estado do helpdesk fake
#[derive(Default)]
pub struct FakeState {
    pub conversations: HashMap<u64, Conversation>,
    pub contacts: HashMap<u64, Contact>,
    pub labels: HashMap<u64, Vec<String>>,
    pub messages: HashMap<u64, Vec<Message>>,
    pub sent: Vec<(u64, String)>,
    pub calls: Vec<String>,
    pub fail_send: bool,
    pub fail_labels: bool,
    next_id: u64,
}

#[derive(Default)]
pub struct FakeHelpdesk {
    pub state: Mutex<FakeState>,
}

fn not_found(what: &str) -> ChatwootError {
    ChatwootError::Http { status: 404, body: format!("{} not found", what) }
}

fn server_error() -> ChatwootError {
    ChatwootError::Http { status: 500, body: "boom".to_string() }
}

impl FakeHelpdesk {
    pub fn new() -> Self {
        let fake = Self::default();
        fake.state.lock().unwrap().next_id = 1000;
        fake
    }

    pub fn add_conversation(&self, id: u64, status: ConversationStatus, contact_id: Option<u64>) {
        let conversation = Conversation {
            id,
            status,
            inbox_id: Some(75070),
            contact_id,
            ..Default::default()
        };
        self.state.lock().unwrap().conversations.insert(id, conversation);
    }

    pub fn add_contact(&self, id: u64, phone: Option<&str>) {
        let contact = Contact {
            id,
            name: Some("Cliente".to_string()),
            phone_number: phone.map(str::to_string),
            ..Default::default()
        };
        self.state.lock().unwrap().contacts.insert(id, contact);
    }

    pub fn set_labels_raw(&self, conversation_id: u64, labels: &[&str]) {
        self.state
            .lock()
            .unwrap()
            .labels
            .insert(conversation_id, labels.iter().map(|l| l.to_string()).collect());
    }

    /// Registra mensagens de entrada na página recente
    pub fn push_incoming(&self, conversation_id: u64, text: &str) {
        self.state
            .lock()
            .unwrap()
            .messages
            .entry(conversation_id)
            .or_default()
            .push(Message {
                id: None,
                content: Some(text.to_string()),
                message_type: MessageType::Incoming,
            });
    }

    pub fn sent_to(&self, conversation_id: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .sent
            .iter()
            .filter(|(id, _)| *id == conversation_id)
            .map(|(_, content)| content.clone())
            .collect()
    }

    pub fn labels_of(&self, conversation_id: u64) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .labels
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn conversation(&self, id: u64) -> Conversation {
        self.state.lock().unwrap().conversations.get(&id).cloned().unwrap_or_default()
    }

    pub fn contact(&self, id: u64) -> Contact {
        self.state.lock().unwrap().contacts.get(&id).cloned().unwrap_or_default()
    }

    pub fn calls_named(&self, name: &str) -> usize {
        self.state.lock().unwrap().calls.iter().filter(|c| c.as_str() == name).count()
    }

    fn record(&self, call: &str) {
        self.state.lock().unwrap().calls.push(call.to_string());
    }
}

#[async_trait]
impl Helpdesk for FakeHelpdesk {
    async fn get_conversation(&self, conversation_id: u64) -> HelpdeskResult<Conversation> {
        self.record("get_conversation");
        let state = self.state.lock().unwrap();
        state
            .conversations
            .get(&conversation_id)
            .cloned()
            .ok_or_else(|| not_found("conversation"))
    }

    async fn create_conversation(&self, inbox_id: u64, contact_id: u64) -> HelpdeskResult<Conversation> {
        self.record("create_conversation");
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let conversation = Conversation {
            id: state.next_id,
            inbox_id: Some(inbox_id),
            contact_id: Some(contact_id),
            ..Default::default()
        };
        state.conversations.insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn update_conversation(&self, conversation_id: u64, update: &ConversationUpdate) -> HelpdeskResult<()> {
        self.record("update_conversation");
        let mut state = self.state.lock().unwrap();
        let conversation = state
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| not_found("conversation"))?;
        if let Some(status) = update.status {
            conversation.status = status;
        }
        if let Some(priority) = update.priority {
            conversation.priority = Some(priority);
        }
        if let Some(meta) = &update.meta {
            conversation.meta.kb_counter = meta.kb_counter.clone();
        }
        Ok(())
    }

    async fn assign_team(&self, conversation_id: u64, team_id: u64) -> HelpdeskResult<()> {
        self.record("assign_team");
        let mut state = self.state.lock().unwrap();
        let conversation = state
            .conversations
            .get_mut(&conversation_id)
            .ok_or_else(|| not_found("conversation"))?;
        conversation.team_id = Some(team_id);
        Ok(())
    }

    async fn get_contact(&self, contact_id: u64) -> HelpdeskResult<Contact> {
        self.record("get_contact");
        let state = self.state.lock().unwrap();
        state.contacts.get(&contact_id).cloned().ok_or_else(|| not_found("contact"))
    }

    async fn create_contact(&self, contact: &NewContact) -> HelpdeskResult<Contact> {
        self.record("create_contact");
        let mut state = self.state.lock().unwrap();
        state.next_id += 1;
        let created = Contact {
            id: state.next_id,
            name: Some(contact.name.clone()),
            email: contact.email.clone(),
            phone_number: None,
        };
        state.contacts.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_contact(&self, contact_id: u64, update: &ContactUpdate) -> HelpdeskResult<()> {
        self.record("update_contact");
        let mut state = self.state.lock().unwrap();
        let contact = state.contacts.get_mut(&contact_id).ok_or_else(|| not_found("contact"))?;
        if let Some(phone) = &update.phone_number {
            contact.phone_number = Some(phone.clone());
        }
        Ok(())
    }

    async fn recent_messages(&self, conversation_id: u64) -> HelpdeskResult<Vec<Message>> {
        self.record("recent_messages");
        let state = self.state.lock().unwrap();
        Ok(state.messages.get(&conversation_id).cloned().unwrap_or_default())
    }

    async fn send_message(&self, conversation_id: u64, content: &str) -> HelpdeskResult<()> {
        self.record("send_message");
        let mut state = self.state.lock().unwrap();
        if state.fail_send {
            return Err(server_error());
        }
        state.sent.push((conversation_id, content.to_string()));
        Ok(())
    }

    async fn get_labels(&self, conversation_id: u64) -> HelpdeskResult<Vec<String>> {
        self.record("get_labels");
        let state = self.state.lock().unwrap();
        if state.fail_labels {
            return Err(server_error());
        }
        Ok(state.labels.get(&conversation_id).cloned().unwrap_or_default())
    }

    async fn set_labels(&self, conversation_id: u64, labels: &[String]) -> HelpdeskResult<()> {
        self.record("set_labels");
        let mut state = self.state.lock().unwrap();
        if state.fail_labels {
            return Err(server_error());
        }
        state.labels.insert(conversation_id, labels.to_vec());
        Ok(())
    }

    async fn add_labels(&self, conversation_id: u64, labels: &[String]) -> HelpdeskResult<Vec<String>> {
        self.record("add_labels");
        let mut state = self.state.lock().unwrap();
        let current = state.labels.entry(conversation_id).or_default();
        for label in labels {
            if !current.contains(label) {
                current.push(label.clone());
            }
        }
        Ok(current.clone())
    }

    async fn remove_label(&self, conversation_id: u64, label: &str) -> HelpdeskResult<()> {
        self.record("remove_label");
        let mut state = self.state.lock().unwrap();
        if let Some(current) = state.labels.get_mut(&conversation_id) {
            current.retain(|l| l != label);
        }
        Ok(())
    }
}

/// Gerador fake: `None` simula completion vazia
pub struct FakeGenerator {
    pub reply: Mutex<Option<String>>,
    pub calls: Mutex<Vec<(u64, String, bool)>>,
}

impl FakeGenerator {
    pub fn replying(reply: Option<&str>) -> Self {
        Self {
            reply: Mutex::new(reply.map(str::to_string)),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ReplyGenerator for FakeGenerator {
    async fn generate(
        &self,
        conversation_id: u64,
        user_text: &str,
        contact_has_phone: bool,
    ) -> Result<String, GenerationError> {
        self.calls
            .lock()
            .unwrap()
            .push((conversation_id, user_text.to_string(), contact_has_phone));
        self.reply.lock().unwrap().clone().ok_or(GenerationError::Empty)
    }
}

pub fn test_settings() -> Settings {
    let mut settings = Settings::default();
    settings.inboxes.insert(
        "principal".to_string(),
        InboxFlow {
            inbox_id: 75070,
            team_id: Some(9025),
            tags: vec!["marketing".to_string()],
            priority: Some(chatwoot::types::Priority::High),
        },
    );
    settings
}

pub struct Harness {
    pub state: Arc<AppState>,
    pub helpdesk: Arc<FakeHelpdesk>,
    pub store: Arc<InMemoryStateStore>,
    pub generator: Arc<FakeGenerator>,
    pub kb: Arc<KnowledgeBase>,
}

pub fn harness() -> Harness {
    harness_with(test_settings(), Some("Respuesta generada"))
}

pub fn harness_with(settings: Settings, generated: Option<&str>) -> Harness {
    let kb = Arc::new(knowledge_base_loader::load_embedded().unwrap());
    let helpdesk = Arc::new(FakeHelpdesk::new());
    let store = Arc::new(InMemoryStateStore::new());
    let generator = Arc::new(FakeGenerator::replying(generated));

    let state = Arc::new(AppState::new(
        settings,
        Arc::clone(&kb),
        helpdesk.clone(),
        store.clone(),
        generator.clone(),
    ));

    Harness { state, helpdesk, store, generator, kb }
}

pub fn incoming(conversation_id: u64, text: &str) -> WebhookPayload {
    serde_json::from_value(json!({
        "event": "message_created",
        "content": text,
        "message_type": "incoming",
        "conversation": {"id": conversation_id, "status": "open"}
    }))
    .unwrap()
}

pub fn status_changed(conversation_id: u64, status: &str) -> WebhookPayload {
    serde_json::from_value(json!({
        "event": "conversation_status_changed",
        "id": conversation_id,
        "status": status
    }))
    .unwrap()
}

pub fn conversation_created(conversation_id: u64) -> WebhookPayload {
    serde_json::from_value(json!({
        "event": "conversation_created",
        "id": conversation_id,
        "inbox_id": 75070,
        "status": "open"
    }))
    .unwrap()
}
