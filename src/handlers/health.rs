use axum::{extract::State, response::Json};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::utils::logging::*;
use crate::AppState;

pub async fn health_check() -> Json<Value> {
    log_health_check();

    Json(json!({
        "status": "healthy",
        "service": "chatwoot-bot-middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

/// Resumo de configuração; não chama nenhum serviço externo
pub async fn status_check(State(state): State<Arc<AppState>>) -> Json<Value> {
    log_integration_status_check();

    let chatwoot = &state.settings.chatwoot;
    let inboxes: Vec<&String> = state.settings.inboxes.keys().collect();

    Json(json!({
        "service": "chatwoot-bot-middleware",
        "version": env!("CARGO_PKG_VERSION"),
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "chatwoot": {
            "configured": chatwoot.is_configured(),
            "base_url": chatwoot.base_url,
            "account_id": chatwoot.account_id,
            "signature_validation": chatwoot.validate_signature && chatwoot.webhook_secret.is_some()
        },
        "generation": {
            "enabled": state.generation_enabled,
            "model": state.settings.openai.model
        },
        "knowledge_base": {
            "entries": state.kb.len()
        },
        "inboxes": inboxes
    }))
}
