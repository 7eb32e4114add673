use serde::{Deserialize, Deserializer, Serialize};

/// Tipo de mensagem
///
/// Webhooks enviam string (`"incoming"`), a API REST devolve inteiro (`0`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageType {
    Incoming,
    Outgoing,
    Activity,
    Template,
    #[default]
    Other,
}

impl MessageType {
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => MessageType::Incoming,
            1 => MessageType::Outgoing,
            2 => MessageType::Activity,
            3 => MessageType::Template,
            _ => MessageType::Other,
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.trim().to_lowercase().as_str() {
            "incoming" => MessageType::Incoming,
            "outgoing" => MessageType::Outgoing,
            "activity" => MessageType::Activity,
            "template" => MessageType::Template,
            _ => MessageType::Other,
        }
    }
}

impl<'de> Deserialize<'de> for MessageType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Code(i64),
            Name(String),
        }

        Ok(match Option::<Raw>::deserialize(deserializer)? {
            Some(Raw::Code(code)) => MessageType::from_code(code),
            Some(Raw::Name(name)) => MessageType::from_name(&name),
            None => MessageType::Other,
        })
    }
}

/// Mensagem de uma conversa
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(default)]
    pub id: Option<u64>,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message_type: MessageType,
}

impl Message {
    pub fn is_incoming(&self) -> bool {
        self.message_type == MessageType::Incoming
    }

    pub fn text(&self) -> &str {
        self.content.as_deref().unwrap_or("")
    }
}

/// Label como a API devolve: string simples ou objeto `{ "title": ... }`
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Label {
    Title(String),
    Object { title: Option<String> },
}

impl Label {
    pub fn into_title(self) -> Option<String> {
        let title = match self {
            Label::Title(t) => Some(t),
            Label::Object { title } => title,
        };
        title.filter(|t| !t.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_type_from_string_and_code() {
        let m: Message = serde_json::from_str(r#"{"content": "hola", "message_type": "incoming"}"#).unwrap();
        assert!(m.is_incoming());

        let m: Message = serde_json::from_str(r#"{"content": "ok", "message_type": 1}"#).unwrap();
        assert_eq!(m.message_type, MessageType::Outgoing);

        let m: Message = serde_json::from_str(r#"{"content": null, "message_type": null}"#).unwrap();
        assert_eq!(m.message_type, MessageType::Other);
        assert_eq!(m.text(), "");
    }

    #[test]
    fn test_label_shapes() {
        let labels: Vec<Label> =
            serde_json::from_str(r#"["vip", {"title": "kb_pos"}, {"title": ""}, {"title": null}]"#).unwrap();
        let titles: Vec<String> = labels.into_iter().filter_map(Label::into_title).collect();
        assert_eq!(titles, vec!["vip".to_string(), "kb_pos".to_string()]);
    }
}
