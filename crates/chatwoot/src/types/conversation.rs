use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Status de uma conversa no Chatwoot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversationStatus {
    #[default]
    Open,
    Pending,
    Resolved,
    Snoozed,
    Spam,
    Ignored,
    Blocked,
}

impl ConversationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConversationStatus::Open => "open",
            ConversationStatus::Pending => "pending",
            ConversationStatus::Resolved => "resolved",
            ConversationStatus::Snoozed => "snoozed",
            ConversationStatus::Spam => "spam",
            ConversationStatus::Ignored => "ignored",
            ConversationStatus::Blocked => "blocked",
        }
    }
}

impl fmt::Display for ConversationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ConversationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "open" => Ok(ConversationStatus::Open),
            "pending" => Ok(ConversationStatus::Pending),
            "resolved" => Ok(ConversationStatus::Resolved),
            "snoozed" => Ok(ConversationStatus::Snoozed),
            "spam" => Ok(ConversationStatus::Spam),
            "ignored" => Ok(ConversationStatus::Ignored),
            "blocked" => Ok(ConversationStatus::Blocked),
            other => Err(format!("status de conversa desconhecido: {}", other)),
        }
    }
}

/// Prioridade de uma conversa
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
    Urgent,
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
            Priority::Urgent => "urgent",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamRef {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SenderRef {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

/// Bloco `meta` da conversa
///
/// `kb_counter` guarda quantas vezes cada control tag da base de conhecimento
/// já respondeu nesta conversa, para sobreviver a reinícios do processo.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationMeta {
    #[serde(default)]
    pub sender: Option<SenderRef>,
    #[serde(default)]
    pub team: Option<TeamRef>,
    #[serde(default)]
    pub kb_counter: BTreeMap<String, u32>,
}

/// Conversa (somente os campos que o middleware lê)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: u64,
    #[serde(default)]
    pub status: ConversationStatus,
    #[serde(default)]
    pub inbox_id: Option<u64>,
    #[serde(default)]
    pub team: Option<TeamRef>,
    #[serde(default)]
    pub team_id: Option<u64>,
    #[serde(default)]
    pub priority: Option<Priority>,
    #[serde(default)]
    pub contact_id: Option<u64>,
    #[serde(default)]
    pub meta: ConversationMeta,
}

impl Conversation {
    /// Time atribuído, em qualquer um dos formatos que a API devolve
    pub fn assigned_team(&self) -> Option<u64> {
        self.team
            .as_ref()
            .map(|t| t.id)
            .or(self.team_id)
            .or_else(|| self.meta.team.as_ref().map(|t| t.id))
    }

    /// Contato associado (`contact_id` ou `meta.sender.id`)
    pub fn contact(&self) -> Option<u64> {
        self.contact_id
            .or_else(|| self.meta.sender.as_ref().and_then(|s| s.id))
    }

    pub fn is_open(&self) -> bool {
        self.status == ConversationStatus::Open
    }
}

/// Corpo de `PUT /conversations/{id}`; campos `None` não são enviados
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversationUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<ConversationStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<MetaUpdate>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MetaUpdate {
    pub kb_counter: BTreeMap<String, u32>,
}

impl ConversationUpdate {
    pub fn status(status: ConversationStatus) -> Self {
        Self { status: Some(status), ..Default::default() }
    }

    pub fn priority(priority: Priority) -> Self {
        Self { priority: Some(priority), ..Default::default() }
    }

    pub fn kb_counter(kb_counter: BTreeMap<String, u32>) -> Self {
        Self { meta: Some(MetaUpdate { kb_counter }), ..Default::default() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversation_minimal_payload() {
        let conv: Conversation = serde_json::from_str(r#"{"id": 42}"#).unwrap();
        assert_eq!(conv.id, 42);
        assert!(conv.is_open());
        assert_eq!(conv.assigned_team(), None);
        assert!(conv.meta.kb_counter.is_empty());
    }

    #[test]
    fn test_conversation_full_payload() {
        let json = r#"{
            "id": 7,
            "status": "resolved",
            "inbox_id": 3,
            "priority": "high",
            "team": {"id": 2, "name": "Soporte"},
            "meta": {"sender": {"id": 99}, "kb_counter": {"kb_pos": 2}}
        }"#;
        let conv: Conversation = serde_json::from_str(json).unwrap();
        assert_eq!(conv.status, ConversationStatus::Resolved);
        assert_eq!(conv.priority, Some(Priority::High));
        assert_eq!(conv.assigned_team(), Some(2));
        assert_eq!(conv.contact(), Some(99));
        assert_eq!(conv.meta.kb_counter.get("kb_pos"), Some(&2));
    }

    #[test]
    fn test_team_id_fallback() {
        let conv: Conversation = serde_json::from_str(r#"{"id": 1, "team_id": 5}"#).unwrap();
        assert_eq!(conv.assigned_team(), Some(5));
    }

    #[test]
    fn test_update_serializes_only_set_fields() {
        let body = serde_json::to_value(ConversationUpdate::status(ConversationStatus::Resolved)).unwrap();
        assert_eq!(body, serde_json::json!({"status": "resolved"}));

        let mut counter = BTreeMap::new();
        counter.insert("kb_pos".to_string(), 1);
        let body = serde_json::to_value(ConversationUpdate::kb_counter(counter)).unwrap();
        assert_eq!(body, serde_json::json!({"meta": {"kb_counter": {"kb_pos": 1}}}));
    }

    #[test]
    fn test_status_from_str() {
        assert_eq!("Resolved".parse::<ConversationStatus>(), Ok(ConversationStatus::Resolved));
        assert_eq!(" open ".parse::<ConversationStatus>(), Ok(ConversationStatus::Open));
        assert!("archived".parse::<ConversationStatus>().is_err());
    }
}
