use tracing::{debug, error, info, warn};

pub fn log_request_received(endpoint: &str, method: &str) {
    info!("Request received: {} {}", method, endpoint);
}

pub fn log_request_processed(endpoint: &str, status: u16, duration_ms: u64) {
    info!("Request processed: {} - Status: {} - Duration: {}ms",
          endpoint, status, duration_ms);
}

pub fn log_event_ignored(event: &str, reason: &str) {
    info!("⏭️ Evento '{}' ignorado: {}", event, reason);
}

pub fn log_reply_sent(conversation_id: u64, content: &str) {
    info!("💬 Mensaje enviado en conversación {} ✅: {}", conversation_id, preview(content));
}

pub fn log_reply_suppressed(conversation_id: u64) {
    debug!("🔒 Envío bloqueado por cooldown en conversación {}", conversation_id);
}

pub fn log_chatwoot_api_error(operation: &str, conversation_id: u64, error: &str) {
    error!("Chatwoot API error: {} - Conversation: {} - Error: {}", operation, conversation_id, error);
}

pub fn log_tags_updated(conversation_id: u64, labels: &[String]) {
    info!("🏷️ Etiquetas actualizadas para conversación {}: {:?}", conversation_id, labels);
}

pub fn log_config_loaded(env: &str) {
    info!("Configuration loaded successfully for environment: {}", env);
}

pub fn log_knowledge_base_loaded(source: &str, entries: usize) {
    info!("📚 Base de conocimiento cargada ({}): {} entradas", source, entries);
}

pub fn log_server_startup(port: u16) {
    info!("🚀 Chatwoot bot middleware server starting on port {}", port);
}

pub fn log_server_ready(port: u16) {
    info!("✅ Server ready and listening on http://0.0.0.0:{}", port);
}

pub fn log_health_check() {
    debug!("Health check requested");
}

pub fn log_integration_status_check() {
    debug!("Integration status check requested");
}

pub fn log_validation_error(field: &str, message: &str) {
    warn!("Validation error: {} - {}", field, message);
}

pub fn log_info(message: &str) {
    info!("{}", message);
}

pub fn log_error(message: &str) {
    error!("{}", message);
}

pub fn log_warning(message: &str) {
    warn!("{}", message);
}

// Mensagens longas (menu, respostas da KB) poluem o log
fn preview(content: &str) -> String {
    const MAX_CHARS: usize = 80;
    let mut chars = content.chars();
    let head: String = chars.by_ref().take(MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}…", head.replace('\n', " "))
    } else {
        head.replace('\n', " ")
    }
}
