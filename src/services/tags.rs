//! Reconciliação de labels da conversa
//!
//! Pedidos de tag chegam como uma lista ordenada de nomes; `__remove__<tag>`
//! pede a remoção de `<tag>`, qualquer outro nome pede a adição. Tags
//! permanentes e semi-permanentes nunca são removidas, nem quando pedido
//! explicitamente. Tags comuns sobrevivem à passada, a menos que sejam
//! removidas; pedir adição e remoção da mesma tag na mesma passada mantém a tag.

use std::collections::HashSet;
use std::sync::Arc;

use super::helpdesk::Helpdesk;
use crate::utils::logging::*;

pub const REMOVE_MARKER: &str = "__remove__";

/// Classe de tempo de vida de uma tag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    Permanent,
    SemiPermanent,
    Ordinary,
}

/// Classificação fixa das tags conhecidas; o que não está listado é comum
#[derive(Debug, Clone, Default)]
pub struct TagCatalog {
    permanent: HashSet<String>,
    semi_permanent: HashSet<String>,
}

impl TagCatalog {
    pub fn new<P, S>(permanent: P, semi_permanent: S) -> Self
    where
        P: IntoIterator<Item = String>,
        S: IntoIterator<Item = String>,
    {
        Self {
            permanent: permanent.into_iter().collect(),
            semi_permanent: semi_permanent.into_iter().collect(),
        }
    }

    pub fn classify(&self, tag: &str) -> TagClass {
        if self.permanent.contains(tag) {
            TagClass::Permanent
        } else if self.semi_permanent.contains(tag) {
            TagClass::SemiPermanent
        } else {
            TagClass::Ordinary
        }
    }

    /// Permanente ou semi-permanente
    pub fn is_sticky(&self, tag: &str) -> bool {
        self.classify(tag) != TagClass::Ordinary
    }

    /// Tags declaradas nas duas classes (configuração inválida)
    pub fn overlapping(&self) -> Vec<String> {
        let mut both: Vec<String> = self
            .permanent
            .intersection(&self.semi_permanent)
            .cloned()
            .collect();
        both.sort();
        both
    }
}

/// Pedido de remoção no formato aceito por [`TagEngine::add_tags_safely`]
pub fn remove_request(tag: &str) -> String {
    format!("{}{}", REMOVE_MARKER, tag)
}

/// Resultado puro da reconciliação
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TagPlan {
    /// Tags a remover explicitamente (presentes, comuns, não re-pedidas)
    pub to_delete: Vec<String>,
    /// Conjunto completo a gravar
    pub final_labels: Vec<String>,
}

/// Calcula o conjunto final de labels a partir do atual e dos pedidos
pub fn reconcile(existing: &[String], requests: &[String], catalog: &TagCatalog) -> TagPlan {
    let mut to_remove: Vec<&str> = Vec::new();
    let mut to_add: Vec<&str> = Vec::new();

    for request in requests {
        match request.strip_prefix(REMOVE_MARKER) {
            Some(tag) if !tag.is_empty() => to_remove.push(tag),
            Some(_) => {}
            None if !request.trim().is_empty() => to_add.push(request.as_str()),
            None => {}
        }
    }

    let mut to_delete: Vec<String> = Vec::new();
    for tag in &to_remove {
        let removable = existing.iter().any(|l| l == tag)
            && !catalog.is_sticky(tag)
            && !to_add.contains(tag);
        if removable && !to_delete.iter().any(|d| d == tag) {
            to_delete.push(tag.to_string());
        }
    }

    let mut final_labels: Vec<String> = Vec::with_capacity(existing.len() + to_add.len());
    let retained = existing
        .iter()
        .map(String::as_str)
        .filter(|l| !to_delete.iter().any(|d| d == l));

    for label in retained.chain(to_add.iter().copied()) {
        if !final_labels.iter().any(|f| f == label) {
            final_labels.push(label.to_string());
        }
    }

    TagPlan { to_delete, final_labels }
}

/// Aplica pedidos de tag no helpdesk, sempre em modo best-effort
#[derive(Clone)]
pub struct TagEngine {
    helpdesk: Arc<dyn Helpdesk>,
    catalog: Arc<TagCatalog>,
}

impl TagEngine {
    pub fn new(helpdesk: Arc<dyn Helpdesk>, catalog: Arc<TagCatalog>) -> Self {
        Self { helpdesk, catalog }
    }

    pub fn catalog(&self) -> &TagCatalog {
        &self.catalog
    }

    /// Reconciliação completa; devolve o conjunto gravado, ou `None` se nada
    /// foi gravado (sem pedidos, nada mudou, ou falha já registrada no log)
    pub async fn add_tags_safely(&self, conversation_id: u64, requests: &[String]) -> Option<Vec<String>> {
        if requests.is_empty() {
            return None;
        }

        let existing = match self.helpdesk.get_labels(conversation_id).await {
            Ok(labels) => labels,
            Err(e) => {
                // Sem o conjunto atual, um POST apagaria as labels existentes
                log_chatwoot_api_error("get_labels", conversation_id, &e.to_string());
                return None;
            }
        };

        let plan = reconcile(&existing, requests, &self.catalog);

        for tag in &plan.to_delete {
            match self.helpdesk.remove_label(conversation_id, tag).await {
                Ok(()) => tracing::info!("🗑️ Etiqueta '{}' eliminada de conversación {}", tag, conversation_id),
                Err(e) => log_chatwoot_api_error("remove_label", conversation_id, &e.to_string()),
            }
        }

        if plan.to_delete.is_empty() && plan.final_labels == existing {
            tracing::debug!("Etiquetas sin cambios en conversación {}", conversation_id);
            return None;
        }

        match self.helpdesk.set_labels(conversation_id, &plan.final_labels).await {
            Ok(()) => {
                log_tags_updated(conversation_id, &plan.final_labels);
                Some(plan.final_labels)
            }
            Err(e) => {
                log_chatwoot_api_error("set_labels", conversation_id, &e.to_string());
                None
            }
        }
    }

    /// Variante simples para tags de boas-vindas: descarta do pedido as tags
    /// permanentes/semi-permanentes e faz uma união aditiva
    pub async fn safe_add_tags(&self, conversation_id: u64, tags: &[String]) -> Option<Vec<String>> {
        let filtered: Vec<String> = tags
            .iter()
            .filter(|t| !t.trim().is_empty())
            .filter(|t| !t.starts_with(REMOVE_MARKER))
            .filter(|t| !self.catalog.is_sticky(t))
            .cloned()
            .collect();

        if filtered.is_empty() {
            return None;
        }

        match self.helpdesk.add_labels(conversation_id, &filtered).await {
            Ok(labels) => {
                log_tags_updated(conversation_id, &labels);
                Some(labels)
            }
            Err(e) => {
                log_chatwoot_api_error("add_labels", conversation_id, &e.to_string());
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> TagCatalog {
        TagCatalog::new(
            vec!["lead_calificado".to_string(), "pos".to_string()],
            vec!["kb_pos".to_string(), "no_respuesta".to_string()],
        )
    }

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_classify() {
        let c = catalog();
        assert_eq!(c.classify("pos"), TagClass::Permanent);
        assert_eq!(c.classify("kb_pos"), TagClass::SemiPermanent);
        assert_eq!(c.classify("menu_enviado"), TagClass::Ordinary);
        assert!(c.overlapping().is_empty());
    }

    #[test]
    fn test_add_and_remove() {
        let plan = reconcile(
            &strings(&["sin_telefono", "menu_enviado"]),
            &strings(&["telefono_recibido", "__remove__sin_telefono"]),
            &catalog(),
        );
        assert_eq!(plan.to_delete, strings(&["sin_telefono"]));
        assert_eq!(plan.final_labels, strings(&["menu_enviado", "telefono_recibido"]));
    }

    #[test]
    fn test_sticky_tags_are_never_removed() {
        let plan = reconcile(
            &strings(&["lead_calificado", "kb_pos"]),
            &strings(&["__remove__lead_calificado", "__remove__kb_pos"]),
            &catalog(),
        );
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.final_labels, strings(&["lead_calificado", "kb_pos"]));
    }

    #[test]
    fn test_ordinary_tags_survive_when_not_requested() {
        let plan = reconcile(&strings(&["widget_abierto"]), &strings(&["kb_pos"]), &catalog());
        assert_eq!(plan.final_labels, strings(&["widget_abierto", "kb_pos"]));
    }

    #[test]
    fn test_add_wins_over_remove_in_same_pass() {
        let plan = reconcile(
            &strings(&["sin_telefono"]),
            &strings(&["__remove__sin_telefono", "sin_telefono"]),
            &catalog(),
        );
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.final_labels, strings(&["sin_telefono"]));
    }

    #[test]
    fn test_removing_absent_tag_is_noop() {
        let plan = reconcile(&strings(&["a"]), &strings(&["__remove__b", "__remove__"]), &catalog());
        assert!(plan.to_delete.is_empty());
        assert_eq!(plan.final_labels, strings(&["a"]));
    }

    #[test]
    fn test_reconcile_is_idempotent() {
        let c = catalog();
        let cases: Vec<(Vec<String>, Vec<String>)> = vec![
            (strings(&[]), strings(&["a", "b", "a"])),
            (strings(&["x", "pos"]), strings(&["__remove__x", "__remove__pos", "y"])),
            (strings(&["kb_pos", "z"]), strings(&["z", "__remove__z", "kb_pos"])),
            (strings(&["m", "n"]), strings(&["__remove__m", "__remove__n", "__remove__m"])),
        ];

        for (existing, requests) in cases {
            let first = reconcile(&existing, &requests, &c);
            let second = reconcile(&first.final_labels, &requests, &c);
            assert_eq!(first.final_labels, second.final_labels, "drift for {:?}", requests);
            assert!(second.to_delete.is_empty());
        }
    }

    #[test]
    fn test_remove_request_format() {
        assert_eq!(remove_request("sin_telefono"), "__remove__sin_telefono");
    }
}
