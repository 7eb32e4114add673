//! Normalização de texto usada em toda comparação de mensagens
//!
//! Remove acentos (NFD + descarte de marcas combinantes), converte para
//! minúsculas e colapsa espaços. Diferente de uma limpeza agressiva, a
//! pontuação é preservada: gatilhos como "¿cuánto cuesta?" continuam
//! comparáveis por substring.

use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Normaliza texto para comparação
///
/// # Exemplos
/// ```
/// use chatwoot_bot_middleware::utils::normalization::normalize_text;
///
/// assert_eq!(normalize_text("  Buenos   DÍAS "), "buenos dias");
/// assert_eq!(normalize_text("Menú"), "menu");
/// assert_eq!(normalize_text(""), "");
/// ```
pub fn normalize_text(input: &str) -> String {
    input
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Texto composto apenas por dígitos ASCII (seleção numérica do menu)
pub fn is_numeric_selection(input: &str) -> bool {
    let trimmed = input.trim();
    !trimmed.is_empty() && trimmed.chars().all(|c| c.is_ascii_digit())
}
