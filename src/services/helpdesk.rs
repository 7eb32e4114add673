//! Fronteira com o helpdesk (Chatwoot)
//!
//! Os serviços do bot falam com o helpdesk apenas através do trait
//! [`Helpdesk`]; em produção a implementação é [`ChatwootHelpdesk`], nos
//! testes de integração um fake em memória.

use async_trait::async_trait;
use chatwoot::types::{Contact, ContactUpdate, Conversation, ConversationUpdate, Message, NewContact};
use chatwoot::ChatwootClient;

pub use chatwoot::Result as HelpdeskResult;

#[async_trait]
pub trait Helpdesk: Send + Sync {
    async fn get_conversation(&self, conversation_id: u64) -> HelpdeskResult<Conversation>;

    async fn create_conversation(&self, inbox_id: u64, contact_id: u64) -> HelpdeskResult<Conversation>;

    async fn update_conversation(&self, conversation_id: u64, update: &ConversationUpdate) -> HelpdeskResult<()>;

    async fn assign_team(&self, conversation_id: u64, team_id: u64) -> HelpdeskResult<()>;

    async fn get_contact(&self, contact_id: u64) -> HelpdeskResult<Contact>;

    async fn create_contact(&self, contact: &NewContact) -> HelpdeskResult<Contact>;

    async fn update_contact(&self, contact_id: u64, update: &ContactUpdate) -> HelpdeskResult<()>;

    /// Última página de mensagens, em ordem cronológica
    async fn recent_messages(&self, conversation_id: u64) -> HelpdeskResult<Vec<Message>>;

    async fn send_message(&self, conversation_id: u64, content: &str) -> HelpdeskResult<()>;

    async fn get_labels(&self, conversation_id: u64) -> HelpdeskResult<Vec<String>>;

    /// Substitui o conjunto completo de labels
    async fn set_labels(&self, conversation_id: u64, labels: &[String]) -> HelpdeskResult<()>;

    /// União com as labels atuais; devolve o conjunto resultante
    async fn add_labels(&self, conversation_id: u64, labels: &[String]) -> HelpdeskResult<Vec<String>>;

    async fn remove_label(&self, conversation_id: u64, label: &str) -> HelpdeskResult<()>;
}

/// Implementação sobre o cliente HTTP com retry
pub struct ChatwootHelpdesk {
    client: ChatwootClient,
    page_size: usize,
}

impl ChatwootHelpdesk {
    pub fn new(client: ChatwootClient, page_size: usize) -> Self {
        Self { client, page_size: page_size.max(1) }
    }
}

#[async_trait]
impl Helpdesk for ChatwootHelpdesk {
    async fn get_conversation(&self, conversation_id: u64) -> HelpdeskResult<Conversation> {
        self.client.get_conversation(conversation_id).await
    }

    async fn create_conversation(&self, inbox_id: u64, contact_id: u64) -> HelpdeskResult<Conversation> {
        self.client.create_conversation(inbox_id, contact_id).await
    }

    async fn update_conversation(&self, conversation_id: u64, update: &ConversationUpdate) -> HelpdeskResult<()> {
        self.client.update_conversation(conversation_id, update).await
    }

    async fn assign_team(&self, conversation_id: u64, team_id: u64) -> HelpdeskResult<()> {
        self.client.assign_team(conversation_id, team_id).await
    }

    async fn get_contact(&self, contact_id: u64) -> HelpdeskResult<Contact> {
        self.client.get_contact(contact_id).await
    }

    async fn create_contact(&self, contact: &NewContact) -> HelpdeskResult<Contact> {
        self.client.create_contact(contact).await
    }

    async fn update_contact(&self, contact_id: u64, update: &ContactUpdate) -> HelpdeskResult<()> {
        self.client.update_contact(contact_id, update).await
    }

    async fn recent_messages(&self, conversation_id: u64) -> HelpdeskResult<Vec<Message>> {
        self.client.recent_messages(conversation_id, self.page_size).await
    }

    async fn send_message(&self, conversation_id: u64, content: &str) -> HelpdeskResult<()> {
        self.client.send_message(conversation_id, content).await
    }

    async fn get_labels(&self, conversation_id: u64) -> HelpdeskResult<Vec<String>> {
        self.client.get_labels(conversation_id).await
    }

    async fn set_labels(&self, conversation_id: u64, labels: &[String]) -> HelpdeskResult<()> {
        self.client.set_labels(conversation_id, labels).await
    }

    async fn add_labels(&self, conversation_id: u64, labels: &[String]) -> HelpdeskResult<Vec<String>> {
        self.client.add_labels(conversation_id, labels).await
    }

    async fn remove_label(&self, conversation_id: u64, label: &str) -> HelpdeskResult<()> {
        self.client.remove_label(conversation_id, label).await
    }
}
