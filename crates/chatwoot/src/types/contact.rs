use serde::{Deserialize, Serialize};

/// Contato do Chatwoot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    pub id: u64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone_number: Option<String>,
}

impl Contact {
    /// Verdadeiro quando há telefone não-vazio cadastrado
    pub fn has_phone(&self) -> bool {
        self.phone_number
            .as_deref()
            .map(|p| !p.trim().is_empty())
            .unwrap_or(false)
    }
}

/// Corpo de `POST /contacts`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewContact {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Corpo de `PUT /contacts/{id}`
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContactUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

impl ContactUpdate {
    pub fn phone(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: Some(phone_number.into()),
            ..Default::default()
        }
    }
}

/// A API às vezes envolve o contato em `{"payload": {...}}` ou
/// `{"payload": {"contact": {...}}}`
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContactEnvelope {
    Nested { payload: NestedContact },
    Wrapped { payload: Contact },
    Bare(Contact),
}

#[derive(Debug, Deserialize)]
pub(crate) struct NestedContact {
    pub contact: Contact,
}

impl ContactEnvelope {
    pub(crate) fn into_contact(self) -> Contact {
        match self {
            ContactEnvelope::Nested { payload } => payload.contact,
            ContactEnvelope::Wrapped { payload } => payload,
            ContactEnvelope::Bare(contact) => contact,
        }
    }
}
