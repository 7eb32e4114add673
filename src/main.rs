/// Middleware de atendimento Chatwoot
///
/// - Webhook do Chatwoot processado na hora pelo roteador de eventos
/// - Base de conhecimento + menu numérico, OpenAI como fallback
/// - Tags, time, prioridade e fechamento automático por inatividade

use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use chatwoot::{ChatwootClient, ChatwootConfig, RetryPolicy};
use chatwoot_bot_middleware::config::{knowledge_base_loader, Settings};
use chatwoot_bot_middleware::services::{
    ChatwootHelpdesk, DisabledGenerator, InMemoryStateStore, OpenAiGenerator, ReplyGenerator,
};
use chatwoot_bot_middleware::utils::logging::*;
use chatwoot_bot_middleware::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 🔧 Carregar variáveis de ambiente do arquivo .env (se existir)
    let dotenv_loaded = dotenvy::dotenv().is_ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if dotenv_loaded {
        tracing::info!("✅ Arquivo .env carregado com sucesso");
    } else {
        tracing::debug!("Arquivo .env não encontrado - usando variáveis de ambiente do sistema");
    }

    // Carregar configurações
    let settings = Settings::new().map_err(|e| anyhow::anyhow!("Failed to load settings: {}", e))?;
    log_config_loaded(&std::env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string()));

    let kb = Arc::new(knowledge_base_loader::load(settings.bot.knowledge_base_path.as_deref()).await?);

    // Cliente Chatwoot com retry
    let chatwoot_settings = &settings.chatwoot;
    if !chatwoot_settings.is_configured() {
        log_warning("⚠️ Chatwoot no configurado por completo (URL/tokens). Las llamadas van a fallar.");
    }
    if chatwoot_settings.signature_misconfigured() {
        log_warning("⚠️ validate_signature ativo sem webhook_secret: todos os webhooks serão rejeitados");
    }
    let client = ChatwootClient::new(
        ChatwootConfig::new(
            chatwoot_settings.base_url.clone(),
            chatwoot_settings.account_id,
            chatwoot_settings.admin_token.clone(),
            chatwoot_settings.bot_token.clone(),
        )
        .with_timeout(Duration::from_secs(chatwoot_settings.timeout_secs))
        .with_retry_policy(RetryPolicy::new(
            chatwoot_settings.max_retries,
            Duration::from_millis(chatwoot_settings.retry_base_delay_ms),
        )),
    )?;
    let helpdesk = Arc::new(ChatwootHelpdesk::new(client, chatwoot_settings.messages_page_size));
    log_info(&format!(
        "⚡ Cliente Chatwoot configurado (conta {}, {} tentativas)",
        chatwoot_settings.account_id, chatwoot_settings.max_retries
    ));

    // Inicializar geração (OpenAI)
    let generator: Arc<dyn ReplyGenerator> = if settings.openai.enabled() {
        match OpenAiGenerator::from_settings(&settings.openai) {
            Ok(generator) => {
                log_info(&format!("✅ Geração habilitada com OpenAI ({})", settings.openai.model));
                Arc::new(generator)
            }
            Err(e) => {
                log_warning(&format!("⚠️ Falha ao inicializar OpenAI: {}. Fallback desabilitado.", e));
                Arc::new(DisabledGenerator)
            }
        }
    } else {
        log_warning("⚠️ OPENAI_API_KEY não configurada. Fallback de geração desabilitado.");
        Arc::new(DisabledGenerator)
    };

    let store = Arc::new(InMemoryStateStore::new());
    let state = Arc::new(AppState::new(settings.clone(), kb, helpdesk, store, generator));
    let app = build_router(state);

    let port = settings.server.port;
    let listener = TcpListener::bind(format!("{}:{}", settings.server.host, port)).await?;

    log_server_startup(port);
    log_server_ready(port);

    // Graceful shutdown com signal handling
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log_info("🛑 Server shut down gracefully");
    Ok(())
}

/// Signal handler para graceful shutdown
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log_error(&format!("Failed to install Ctrl+C handler: {}", e));
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log_error(&format!("Failed to install SIGTERM handler: {}", e));
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            log_info("🛑 Received Ctrl+C, shutting down gracefully...");
        },
        _ = terminate => {
            log_info("🛑 Received SIGTERM, shutting down gracefully...");
        }
    }
}
