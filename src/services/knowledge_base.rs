//! Base de conhecimento: entradas gatilho → resposta e o casamento de texto
//!
//! A ordem das entradas é o desempate. Uma entrada casa quando algum gatilho
//! (já normalizado) é substring do texto normalizado, ou quando algum padrão
//! regex (case-insensitive) casa com o texto bruto.

use rand::seq::SliceRandom;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;

use chatwoot::types::Priority;

use super::bad_words::BadWordFilter;
use super::tags::{remove_request, TagCatalog};
use crate::config::knowledge_base_loader::BotMessages;
use crate::utils::normalization::normalize_text;

/// Resposta literal ou dependente de o contato ter telefone
///
/// Cada forma carrega uma ou mais variantes; uma delas é sorteada no envio.
#[derive(Debug, Clone, PartialEq)]
pub enum KbResponse {
    Literal(Vec<String>),
    PhoneAware {
        with_phone: Vec<String>,
        without_phone: Vec<String>,
    },
}

impl KbResponse {
    pub fn variants(&self, has_phone: bool) -> &[String] {
        match self {
            KbResponse::Literal(variants) => variants,
            KbResponse::PhoneAware { with_phone, without_phone } => {
                if has_phone { with_phone } else { without_phone }
            }
        }
    }

    pub fn resolve(&self, has_phone: bool) -> String {
        pick_random(self.variants(has_phone)).cloned().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct KbActions {
    pub add_tags: Vec<String>,
    pub remove_tags: Vec<String>,
    pub assign_team_id: Option<u64>,
    pub priority: Option<Priority>,
    pub max_responses: Option<u32>,
    pub control_tag: Option<String>,
}

#[derive(Debug, Clone)]
pub struct KbEntry {
    pub id: String,
    pub category: String,
    /// Gatilhos normalizados
    pub triggers: Vec<String>,
    pub patterns: Vec<Regex>,
    pub response: KbResponse,
    pub followups: Vec<String>,
    pub actions: KbActions,
    pub tags: Vec<String>,
    pub exceeded_response: String,
}

impl KbEntry {
    pub fn matches(&self, normalized: &str, raw: &str) -> bool {
        self.triggers.iter().any(|t| normalized.contains(t.as_str()))
            || self.patterns.iter().any(|p| p.is_match(raw))
    }

    /// Resposta + lista de próximos passos
    pub fn render(&self, has_phone: bool) -> String {
        let mut text = self.response.resolve(has_phone);
        if !self.followups.is_empty() {
            let steps: Vec<String> = self.followups.iter().map(|f| format!("• {}", f)).collect();
            text.push_str("\n\nSiguientes pasos:\n");
            text.push_str(&steps.join("\n"));
        }
        text
    }

    /// Chave do contador de respostas: control tag, ou o id quando só há limite
    pub fn counter_key(&self) -> Option<&str> {
        match (&self.actions.control_tag, self.actions.max_responses) {
            (Some(tag), _) => Some(tag.as_str()),
            (None, Some(_)) => Some(self.id.as_str()),
            (None, None) => None,
        }
    }

    /// Tags pedidas num despacho: `add_tags` (ou `tags` quando vazio), as tags
    /// estáticas, a control tag e as remoções
    pub fn tag_requests(&self) -> Vec<String> {
        let primary = if self.actions.add_tags.is_empty() {
            &self.tags
        } else {
            &self.actions.add_tags
        };

        let mut requests: Vec<String> = Vec::new();
        let additions = primary
            .iter()
            .chain(self.tags.iter())
            .chain(self.actions.control_tag.iter());
        for tag in additions {
            if !requests.contains(tag) {
                requests.push(tag.clone());
            }
        }
        requests.extend(self.actions.remove_tags.iter().map(|t| remove_request(t)));
        requests
    }
}

/// Primeira entrada (na ordem declarada) que casa com o texto
pub fn find_kb_entry<'a>(text: &str, entries: &'a [KbEntry]) -> Option<&'a KbEntry> {
    let normalized = normalize_text(text);
    entries.iter().find(|e| e.matches(&normalized, text))
}

pub fn should_use_generation(text: &str, entries: &[KbEntry]) -> bool {
    find_kb_entry(text, entries).is_none()
}

pub fn pick_random(options: &[String]) -> Option<&String> {
    options.choose(&mut rand::thread_rng())
}

/// "menú", "menu" ou "opciones", ignorando caixa e acentos
pub fn is_menu_request(text: &str) -> bool {
    matches!(normalize_text(text).as_str(), "menu" | "opciones")
}

/// Base carregada e validada
#[derive(Debug)]
pub struct KnowledgeBase {
    entries: Vec<KbEntry>,
    menu: BTreeMap<String, String>,
    menu_message: String,
    small_talk_triggers: Vec<String>,
    catalog: Arc<TagCatalog>,
    messages: BotMessages,
    bad_words: BadWordFilter,
}

impl KnowledgeBase {
    pub fn new(
        entries: Vec<KbEntry>,
        menu: BTreeMap<String, String>,
        menu_message: String,
        small_talk_triggers: Vec<String>,
        catalog: TagCatalog,
        messages: BotMessages,
    ) -> Self {
        Self {
            entries,
            menu,
            menu_message,
            small_talk_triggers: small_talk_triggers
                .iter()
                .map(|t| normalize_text(t))
                .filter(|t| !t.is_empty())
                .collect(),
            catalog: Arc::new(catalog),
            messages,
            bad_words: BadWordFilter::default(),
        }
    }

    pub fn with_bad_words(mut self, bad_words: BadWordFilter) -> Self {
        self.bad_words = bad_words;
        self
    }

    pub fn bad_words(&self) -> &BadWordFilter {
        &self.bad_words
    }

    pub fn entries(&self) -> &[KbEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: &str) -> Option<&KbEntry> {
        self.entries.iter().find(|e| e.id == id)
    }

    pub fn find_entry(&self, text: &str) -> Option<&KbEntry> {
        find_kb_entry(text, &self.entries)
    }

    pub fn should_use_generation(&self, text: &str) -> bool {
        should_use_generation(text, &self.entries)
    }

    /// Entrada mapeada para um número do menu
    pub fn menu_selection(&self, number: &str) -> Option<&KbEntry> {
        self.menu.get(number.trim()).and_then(|id| self.entry(id))
    }

    pub fn menu_message(&self) -> &str {
        &self.menu_message
    }

    pub fn is_small_talk(&self, text: &str) -> bool {
        let normalized = normalize_text(text);
        self.small_talk_triggers.iter().any(|t| normalized.contains(t.as_str()))
    }

    pub fn catalog(&self) -> Arc<TagCatalog> {
        Arc::clone(&self.catalog)
    }

    pub fn messages(&self) -> &BotMessages {
        &self.messages
    }

    /// Mensagem de boas-vindas: saudação sorteada + menu
    pub fn welcome_message(&self) -> String {
        match pick_random(&self.messages.greetings) {
            Some(greeting) => format!("{}\n\n{}", greeting, self.menu_message),
            None => self.menu_message.clone(),
        }
    }
}
