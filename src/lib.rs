// Biblioteca do middleware de atendimento Chatwoot
// Expõe módulos para uso em testes e no binário

pub mod config;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use config::Settings;
use services::{ConversationStateStore, EventRouter, Helpdesk, KnowledgeBase, ReplyGenerator};

// AppState é definido aqui para ser compartilhado
pub struct AppState {
    pub settings: Settings,
    pub kb: Arc<KnowledgeBase>,
    pub router: Arc<EventRouter>,
    pub generation_enabled: bool,
}

impl AppState {
    pub fn new(
        settings: Settings,
        kb: Arc<KnowledgeBase>,
        helpdesk: Arc<dyn Helpdesk>,
        store: Arc<dyn ConversationStateStore>,
        generator: Arc<dyn ReplyGenerator>,
    ) -> Self {
        let generation_enabled = generator.is_enabled();
        let router = EventRouter::new(settings.clone(), Arc::clone(&kb), helpdesk, store, generator);
        Self {
            settings,
            kb,
            router: Arc::new(router),
            generation_enabled,
        }
    }
}

/// Rotas HTTP do serviço
pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        // Health checks
        .route("/health", get(handlers::health_check))
        .route("/status", get(handlers::status_check))
        // Webhook do Chatwoot (mesmo handler no caminho do deploy antigo)
        .route("/webhooks/chatwoot", post(handlers::handle_chatwoot_webhook))
        .route("/api/chat-webhook", post(handlers::handle_chatwoot_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
