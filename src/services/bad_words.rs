//! Filtro de palavras groseiras
//!
//! A comparação é por palavra inteira sobre o texto normalizado: "imbécil"
//! casa com "imbecil", e "cómputo" não casa com "puto".

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::utils::normalization::normalize_text;

pub const TAG_RUDE_CUSTOMER: &str = "cliente-grosero";
pub const TAG_SPECIAL_CASE: &str = "caso_especial";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    #[default]
    Leve,
    Grave,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BadWord {
    /// Já normalizada
    pub word: String,
    pub severity: Severity,
}

#[derive(Debug, Clone, Default)]
pub struct BadWordFilter {
    words: Vec<BadWord>,
    responses: Vec<(Severity, String)>,
}

impl BadWordFilter {
    pub fn new(words: Vec<BadWord>, responses: Vec<(Severity, String)>) -> Self {
        Self { words, responses }
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Severidade da primeira palavra da lista presente no texto
    pub fn detect(&self, text: &str) -> Option<Severity> {
        let normalized = normalize_text(text);
        let tokens: Vec<&str> = normalized
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        self.words
            .iter()
            .find(|w| tokens.contains(&w.word.as_str()))
            .map(|w| w.severity)
    }

    /// Resposta sorteada entre as da mesma severidade
    pub fn response(&self, severity: Severity) -> Option<&String> {
        let options: Vec<&String> = self
            .responses
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, r)| r)
            .collect();
        options.choose(&mut rand::thread_rng()).copied()
    }

    pub fn has_response_for(&self, severity: Severity) -> bool {
        self.responses.iter().any(|(s, _)| *s == severity)
    }
}
