use chatwoot::types::MessageType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Eventos do webhook do Chatwoot que o bot trata
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    ConversationCreated,
    WebwidgetTriggered,
    MessageCreated,
    ConversationStatusChanged,
    ConversationUpdated,
    ContactUpdated,
    Other(String),
}

impl WebhookEvent {
    pub fn parse(event: &str) -> Self {
        match event.trim() {
            "conversation_created" => WebhookEvent::ConversationCreated,
            "webwidget_triggered" => WebhookEvent::WebwidgetTriggered,
            "message_created" => WebhookEvent::MessageCreated,
            "conversation_status_changed" => WebhookEvent::ConversationStatusChanged,
            "conversation_updated" => WebhookEvent::ConversationUpdated,
            "contact_updated" => WebhookEvent::ContactUpdated,
            other => WebhookEvent::Other(other.to_string()),
        }
    }
}

/// Referência de conversa embutida em eventos de mensagem/widget
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ConversationRef {
    pub id: u64,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub inbox_id: Option<u64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct MessageRef {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: MessageType,
}

/// Remetente/contato como aparece em `sender`, `contact` ou `meta.sender`
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct SenderInfo {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PayloadMeta {
    #[serde(default)]
    pub sender: Option<SenderInfo>,
}

/// Payload do webhook do Chatwoot
///
/// Um único formato tolerante: eventos de mensagem trazem a conversa em
/// `conversation`, eventos de conversa são a própria conversa (`id`,
/// `status`, `inbox_id`, `meta`), o widget usa `current_conversation` e
/// `contact_updated` é o próprio contato.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct WebhookPayload {
    pub event: String,
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: MessageType,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub inbox_id: Option<u64>,
    #[serde(default)]
    pub conversation: Option<ConversationRef>,
    #[serde(default)]
    pub current_conversation: Option<ConversationRef>,
    #[serde(default)]
    pub message: Option<MessageRef>,
    #[serde(default)]
    pub sender: Option<SenderInfo>,
    #[serde(default)]
    pub contact: Option<SenderInfo>,
    #[serde(default)]
    pub meta: Option<PayloadMeta>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub changed_attributes: Option<Value>,
}

impl WebhookPayload {
    pub fn kind(&self) -> WebhookEvent {
        WebhookEvent::parse(&self.event)
    }

    fn is_conversation_event(&self) -> bool {
        matches!(
            self.kind(),
            WebhookEvent::ConversationCreated
                | WebhookEvent::ConversationStatusChanged
                | WebhookEvent::ConversationUpdated
        )
    }

    fn conversation_ref(&self) -> Option<&ConversationRef> {
        self.conversation.as_ref().or(self.current_conversation.as_ref())
    }

    /// Id da conversa; em eventos de conversa o `id` de topo é a conversa
    pub fn conversation_id(&self) -> Option<u64> {
        self.conversation_ref()
            .map(|c| c.id)
            .or_else(|| if self.is_conversation_event() { self.id } else { None })
    }

    pub fn conversation_status(&self) -> Option<&str> {
        if self.is_conversation_event() {
            if let Some(status) = self.status.as_deref() {
                return Some(status);
            }
        }
        self.conversation_ref().and_then(|c| c.status.as_deref())
    }

    pub fn conversation_inbox(&self) -> Option<u64> {
        self.conversation_ref().and_then(|c| c.inbox_id).or(self.inbox_id)
    }

    /// Texto da mensagem (`message.content` ou `content` de topo)
    pub fn message_text(&self) -> &str {
        self.message
            .as_ref()
            .and_then(|m| m.content.as_deref())
            .or(self.content.as_deref())
            .unwrap_or("")
    }

    pub fn is_incoming(&self) -> bool {
        match &self.message {
            Some(m) if m.message_type != MessageType::Other => m.message_type == MessageType::Incoming,
            _ => self.message_type == MessageType::Incoming,
        }
    }

    pub fn sender(&self) -> Option<&SenderInfo> {
        self.sender
            .as_ref()
            .or(self.contact.as_ref())
            .or_else(|| self.meta.as_ref().and_then(|m| m.sender.as_ref()))
    }

    /// `conversation_updated` só interessa quando o status mudou; sem
    /// `changed_attributes` o evento é tratado como mudança
    pub fn status_changed(&self) -> bool {
        match &self.changed_attributes {
            None | Some(Value::Null) => true,
            Some(Value::Array(items)) => items.iter().any(|item| item.get("status").is_some()),
            Some(Value::Object(map)) => map.contains_key("status"),
            Some(_) => false,
        }
    }
}
