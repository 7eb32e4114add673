//! Carregador da base de conhecimento
//!
//! - Com `bot.knowledge_base_path` (ou `KNOWLEDGE_BASE_PATH`): arquivo YAML local
//! - Sem caminho: a base embutida no binário (`config/knowledge_base.yaml`)
//!
//! A validação acontece na carga; uma base inválida impede o servidor de subir.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use chatwoot::types::Priority;

use crate::services::bad_words::{BadWord, BadWordFilter, Severity};
use crate::services::knowledge_base::{KbActions, KbEntry, KbResponse, KnowledgeBase};
use crate::services::tags::TagCatalog;
use crate::utils::logging::log_knowledge_base_loaded;
use crate::utils::normalization::normalize_text;
use crate::utils::{AppError, AppResult};

const EMBEDDED_KNOWLEDGE_BASE: &str = include_str!("../../config/knowledge_base.yaml");

/// Textos fixos do bot
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BotMessages {
    pub greetings: Vec<String>,
    pub farewells: Vec<String>,
    pub reopenings: Vec<String>,
    pub small_talk_reply: String,
    pub invalid_option: String,
    pub generic_error: String,
    pub generation_unavailable: String,
    pub closing_courtesy: String,
    /// `{phone}` é substituído pelo número normalizado
    pub phone_registered: String,
    /// Usado por entradas com limite e sem `exceeded_response` própria
    pub default_exceeded: String,
}

impl Default for BotMessages {
    fn default() -> Self {
        Self {
            greetings: vec!["¡Hola! ¿Cómo estás hoy?".to_string()],
            farewells: vec!["¡Hasta luego, que tengas un excelente día!".to_string()],
            reopenings: vec!["¿Necesitas algo? Estamos aquí para ayudarte.".to_string()],
            small_talk_reply: "¡Hola! Escribe 'menú' para ver las opciones de soporte.".to_string(),
            invalid_option: "❌ Opción no válida. Escribe 'menú' para ver opciones.".to_string(),
            generic_error: "❌ Ocurrió un error al obtener la información, intenta nuevamente.".to_string(),
            generation_unavailable: "⚠️ Nuestro asistente AI no puede responder en este momento. Un agente humano te atenderá pronto.".to_string(),
            closing_courtesy: "Gracias por contactarnos. Si necesitas más ayuda, escribe 'menú' para ver las opciones de soporte.".to_string(),
            phone_registered: "📱 Hemos registrado tu teléfono: {phone}".to_string(),
            default_exceeded: "¡Gracias por tu tiempo! Un agente revisará tu caso. No dudes en hacernos saber si necesitas algo más.".to_string(),
        }
    }
}

impl BotMessages {
    pub fn phone_registered(&self, phone: &str) -> String {
        self.phone_registered.replace("{phone}", phone)
    }
}

#[derive(Debug, Deserialize)]
struct KnowledgeBaseFile {
    menu_message: String,
    #[serde(default)]
    menu: BTreeMap<String, String>,
    #[serde(default)]
    small_talk_triggers: Vec<String>,
    #[serde(default)]
    tags: TagClassesFile,
    #[serde(default)]
    messages: BotMessages,
    #[serde(default)]
    entries: Vec<EntryFile>,
    #[serde(default)]
    bad_words: BadWordsFile,
}

#[derive(Debug, Default, Deserialize)]
struct BadWordsFile {
    #[serde(default)]
    words: Vec<BadWordFile>,
    #[serde(default)]
    responses: Vec<BadWordResponseFile>,
}

#[derive(Debug, Deserialize)]
struct BadWordFile {
    word: String,
    #[serde(default)]
    severity: Severity,
}

#[derive(Debug, Deserialize)]
struct BadWordResponseFile {
    response: String,
    #[serde(default)]
    severity: Severity,
}

#[derive(Debug, Default, Deserialize)]
struct TagClassesFile {
    #[serde(default)]
    permanent: Vec<String>,
    #[serde(default)]
    semi_permanent: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EntryFile {
    id: String,
    #[serde(default)]
    category: String,
    #[serde(default)]
    triggers: Vec<String>,
    #[serde(default)]
    patterns: Vec<String>,
    response: ResponseFile,
    #[serde(default)]
    followups: Vec<String>,
    #[serde(default)]
    actions: ActionsFile,
    #[serde(default)]
    tags: Vec<String>,
    exceeded_response: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ResponseFile {
    Text(String),
    Variants { variants: Vec<String> },
    PhoneAware { with_phone: Vec<String>, without_phone: Vec<String> },
}

#[derive(Debug, Default, Deserialize)]
struct ActionsFile {
    #[serde(default)]
    add_tags: Vec<String>,
    #[serde(default)]
    remove_tags: Vec<String>,
    assign_team_id: Option<u64>,
    priority: Option<Priority>,
    max_responses: Option<u32>,
    control_tag: Option<String>,
}

/// Carrega do caminho configurado ou da base embutida
pub async fn load(path: Option<&str>) -> AppResult<KnowledgeBase> {
    match path {
        Some(path) => {
            tracing::info!("📂 Carregando base de conhecimento de: {}", path);
            let content = tokio::fs::read_to_string(path)
                .await
                .map_err(|e| AppError::ConfigError(format!("Falha ao ler {}: {}", path, e)))?;
            let kb = parse_yaml(&content)?;
            log_knowledge_base_loaded(path, kb.len());
            Ok(kb)
        }
        None => load_embedded(),
    }
}

pub fn load_embedded() -> AppResult<KnowledgeBase> {
    let kb = parse_yaml(EMBEDDED_KNOWLEDGE_BASE)?;
    log_knowledge_base_loaded("embutida", kb.len());
    Ok(kb)
}

/// Faz o parse e valida a base
pub fn parse_yaml(content: &str) -> AppResult<KnowledgeBase> {
    let file: KnowledgeBaseFile = serde_yaml::from_str(content)
        .map_err(|e| AppError::ConfigError(format!("YAML da base de conhecimento inválido: {}", e)))?;

    let catalog = TagCatalog::new(file.tags.permanent, file.tags.semi_permanent);
    let overlapping = catalog.overlapping();
    if !overlapping.is_empty() {
        return Err(AppError::ConfigError(format!(
            "Tags declaradas como permanentes e semi-permanentes: {:?}",
            overlapping
        )));
    }

    let mut seen_ids: HashSet<String> = HashSet::new();
    let mut entries = Vec::with_capacity(file.entries.len());
    for raw in file.entries {
        if !seen_ids.insert(raw.id.clone()) {
            return Err(AppError::ConfigError(format!("Entrada duplicada na base: {}", raw.id)));
        }
        entries.push(build_entry(raw, &file.messages)?);
    }

    for (number, target) in &file.menu {
        if !seen_ids.contains(target) {
            return Err(AppError::ConfigError(format!(
                "Opção de menu {} aponta para entrada inexistente: {}",
                number, target
            )));
        }
    }

    let bad_words = build_bad_words(file.bad_words)?;

    Ok(KnowledgeBase::new(
        entries,
        file.menu,
        file.menu_message,
        file.small_talk_triggers,
        catalog,
        file.messages,
    )
    .with_bad_words(bad_words))
}

fn build_bad_words(raw: BadWordsFile) -> AppResult<BadWordFilter> {
    let mut words = Vec::with_capacity(raw.words.len());
    for entry in raw.words {
        let word = normalize_text(&entry.word);
        if word.is_empty() {
            return Err(AppError::ConfigError("Palavra grosseira vazia".to_string()));
        }
        words.push(BadWord { word, severity: entry.severity });
    }

    let responses: Vec<(Severity, String)> = raw
        .responses
        .into_iter()
        .filter(|r| !r.response.trim().is_empty())
        .map(|r| (r.severity, r.response))
        .collect();

    let filter = BadWordFilter::new(words.clone(), responses);
    if let Some(word) = words.iter().find(|w| !filter.has_response_for(w.severity)) {
        return Err(AppError::ConfigError(format!(
            "Sem resposta de severidade {:?} para a palavra '{}'",
            word.severity, word.word
        )));
    }
    Ok(filter)
}

fn build_entry(raw: EntryFile, messages: &BotMessages) -> AppResult<KbEntry> {
    let mut triggers = Vec::with_capacity(raw.triggers.len());
    for trigger in &raw.triggers {
        let normalized = normalize_text(trigger);
        if normalized.is_empty() {
            return Err(AppError::ConfigError(format!("Gatilho vazio na entrada {}", raw.id)));
        }
        triggers.push(normalized);
    }

    let patterns = raw
        .patterns
        .iter()
        .map(|p| {
            Regex::new(&format!("(?i){}", p)).map_err(|e| {
                AppError::ConfigError(format!("Regex inválida na entrada {}: {} ({})", raw.id, p, e))
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    let response = match raw.response {
        ResponseFile::Text(text) => KbResponse::Literal(vec![text]),
        ResponseFile::Variants { variants } => KbResponse::Literal(variants),
        ResponseFile::PhoneAware { with_phone, without_phone } => {
            KbResponse::PhoneAware { with_phone, without_phone }
        }
    };
    if response.variants(true).is_empty() || response.variants(false).is_empty() {
        return Err(AppError::ConfigError(format!("Entrada {} sem resposta", raw.id)));
    }

    let exceeded_response = raw
        .exceeded_response
        .filter(|r| !r.trim().is_empty())
        .unwrap_or_else(|| messages.default_exceeded.clone());

    Ok(KbEntry {
        id: raw.id,
        category: raw.category,
        triggers,
        patterns,
        response,
        followups: raw.followups,
        actions: KbActions {
            add_tags: raw.actions.add_tags,
            remove_tags: raw.actions.remove_tags,
            assign_team_id: raw.actions.assign_team_id,
            priority: raw.actions.priority,
            max_responses: raw.actions.max_responses,
            control_tag: raw.actions.control_tag,
        },
        tags: raw.tags,
        exceeded_response,
    })
}
