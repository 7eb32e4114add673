//! Detecção de telefone mexicano e tags de lead
//!
//! O número encontrado no texto é normalizado para `+52XXXXXXXXXX` e gravado
//! no contato apenas se ele ainda não tiver telefone. Falhas no helpdesk
//! nunca bloqueiam o restante do atendimento: o resultado vira "nada detectado".

use once_cell::sync::Lazy;
use regex::Regex;
use std::sync::Arc;

use chatwoot::types::{ContactUpdate, Message};

use super::helpdesk::Helpdesk;
use super::tags::remove_request;
use crate::utils::logging::*;

pub const TAG_PHONE_RECEIVED: &str = "telefono_recibido";
pub const TAG_NO_PHONE: &str = "sin_telefono";
pub const TAG_QUALIFIED_LEAD: &str = "lead_calificado";

/// `+52` opcional; grupos de 2–4, 3–4 e 4 dígitos separados por espaço, hífen,
/// parênteses ou ponto
static PHONE_REGEX: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"(?:\+52)?[\s\-().]*([0-9]{2,4})[\s\-().]*([0-9]{3,4})[\s\-().]*([0-9]{4})").ok()
});

/// 12 dígitos começando com 52 → `+52...`; 10 dígitos → `+52` + dígitos
pub fn normalize_mex_phone(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();

    match digits.len() {
        12 if digits.starts_with("52") => Some(format!("+{}", digits)),
        10 => Some(format!("+52{}", digits)),
        _ => None,
    }
}

/// Primeiro número válido encontrado no texto
pub fn extract_phone(text: &str) -> Option<String> {
    let m = PHONE_REGEX.as_ref()?.find(text)?;
    normalize_mex_phone(m.as_str())
}

/// Resultado da detecção; `reply` só existe quando o telefone foi gravado agora
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PhoneDetection {
    pub phone: Option<String>,
    pub reply: Option<String>,
    pub tags: Vec<String>,
}

pub struct LeadDetector {
    helpdesk: Arc<dyn Helpdesk>,
    reply_template: String,
}

impl LeadDetector {
    /// `reply_template` aceita o placeholder `{phone}`
    pub fn new(helpdesk: Arc<dyn Helpdesk>, reply_template: impl Into<String>) -> Self {
        Self { helpdesk, reply_template: reply_template.into() }
    }

    pub async fn detect_phone(
        &self,
        conversation_id: u64,
        contact_id: Option<u64>,
        text: &str,
        recent: &[Message],
        labels: &[String],
    ) -> PhoneDetection {
        let candidate = if text.trim().is_empty() {
            recent.last().map(Message::text).unwrap_or_default()
        } else {
            text
        };

        let phone = match extract_phone(candidate) {
            Some(phone) => phone,
            None => return PhoneDetection::default(),
        };

        let contact_id = match contact_id {
            Some(id) => id,
            None => {
                log_warning(&format!(
                    "📵 Teléfono detectado en conversación {} sin contacto asociado",
                    conversation_id
                ));
                return PhoneDetection::default();
            }
        };

        let contact = match self.helpdesk.get_contact(contact_id).await {
            Ok(contact) => contact,
            Err(e) => {
                log_chatwoot_api_error("get_contact", conversation_id, &e.to_string());
                return PhoneDetection::default();
            }
        };

        let newly_set = if contact.has_phone() {
            tracing::info!(
                "Contacto {} ya tiene teléfono: {}",
                contact_id,
                contact.phone_number.as_deref().unwrap_or_default()
            );
            false
        } else {
            if let Err(e) = self
                .helpdesk
                .update_contact(contact_id, &ContactUpdate::phone(phone.clone()))
                .await
            {
                log_chatwoot_api_error("update_contact", conversation_id, &e.to_string());
                return PhoneDetection::default();
            }
            tracing::info!("📱 Número registrado para contacto {}: {}", contact_id, phone);
            true
        };

        let mut tags = vec![TAG_PHONE_RECEIVED.to_string()];
        if labels.iter().any(|l| l == TAG_NO_PHONE) {
            tags.push(remove_request(TAG_NO_PHONE));
        }

        PhoneDetection {
            reply: newly_set.then(|| self.reply_template.replace("{phone}", &phone)),
            phone: Some(phone),
            tags,
        }
    }

    /// Pedidos de tag conforme o contato ter ou não telefone
    pub async fn lead_tags(&self, conversation_id: u64, contact_id: Option<u64>, labels: &[String]) -> Vec<String> {
        let contact_id = match contact_id {
            Some(id) => id,
            None => return Vec::new(),
        };

        let contact = match self.helpdesk.get_contact(contact_id).await {
            Ok(contact) => contact,
            Err(e) => {
                log_chatwoot_api_error("get_contact", conversation_id, &e.to_string());
                return Vec::new();
            }
        };

        lead_tag_requests(contact.has_phone(), labels)
    }
}

pub fn lead_tag_requests(has_phone: bool, labels: &[String]) -> Vec<String> {
    let has = |tag: &str| labels.iter().any(|l| l == tag);
    let mut tags = Vec::new();

    if has_phone {
        if !has(TAG_QUALIFIED_LEAD) {
            tags.push(TAG_QUALIFIED_LEAD.to_string());
        }
        if has(TAG_NO_PHONE) {
            tags.push(remove_request(TAG_NO_PHONE));
        }
    } else if !has(TAG_NO_PHONE) {
        tags.push(TAG_NO_PHONE.to_string());
    }

    tags
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_mex_phone() {
        assert_eq!(normalize_mex_phone("55 1234 5678").as_deref(), Some("+525512345678"));
        assert_eq!(normalize_mex_phone("+52 (55) 1234-5678").as_deref(), Some("+525512345678"));
        assert_eq!(normalize_mex_phone("525512345678").as_deref(), Some("+525512345678"));
        assert_eq!(normalize_mex_phone("12345"), None);
        assert_eq!(normalize_mex_phone("135512345678"), None);
        assert_eq!(normalize_mex_phone("55123456789"), None);
        assert_eq!(normalize_mex_phone(""), None);
    }

    #[test]
    fn test_normalize_round_trip() {
        for d in ["5512345678", "3312345678", "8187654321", "0000000000", "9999999999"] {
            let expected = format!("+52{}", d);
            assert_eq!(normalize_mex_phone(d).as_deref(), Some(expected.as_str()));
            assert_eq!(normalize_mex_phone(&expected).as_deref(), Some(expected.as_str()));
        }
    }

    #[test]
    fn test_invalid_lengths_return_none() {
        for len in (0..20).filter(|l| *l != 10 && *l != 12) {
            let digits = "5".repeat(len);
            assert_eq!(normalize_mex_phone(&digits), None, "len {}", len);
        }
        // 12 dígitos sem prefixo 52
        assert_eq!(normalize_mex_phone("555512345678"), None);
    }

    #[test]
    fn test_extract_phone_from_text() {
        assert_eq!(extract_phone("mi número es 55 1234 5678").as_deref(), Some("+525512345678"));
        assert_eq!(extract_phone("llámame al (33) 1234-5678 porfa").as_deref(), Some("+523312345678"));
        assert_eq!(extract_phone("+52 81.8765.4321").as_deref(), Some("+528187654321"));
        assert_eq!(extract_phone("no tengo teléfono"), None);
        assert_eq!(extract_phone("folio 1234"), None);
    }

    #[test]
    fn test_lead_tag_requests() {
        let labels = vec!["sin_telefono".to_string()];
        assert_eq!(lead_tag_requests(true, &labels), vec!["lead_calificado", "__remove__sin_telefono"]);
        assert_eq!(lead_tag_requests(true, &["lead_calificado".to_string()]), Vec::<String>::new());
        assert_eq!(lead_tag_requests(false, &[]), vec!["sin_telefono"]);
        assert!(lead_tag_requests(false, &labels).is_empty());
    }
}
