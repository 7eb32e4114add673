use axum::{
    body::Bytes,
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::Instrument;
use uuid::Uuid;

use crate::middleware::panic_protection;
use crate::models::WebhookPayload;
use crate::utils::logging::*;
use crate::utils::{AppError, AppResult};
use crate::AppState;

pub const SIGNATURE_HEADER: &str = "X-Chatwoot-Signature";

/// Webhook do Chatwoot
///
/// O evento é processado antes da resposta: `200 {"status":"ok"}` quando o
/// roteador termina, `500` em erro ou panic, `400` para corpo inválido.
pub async fn handle_chatwoot_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start_time = Instant::now();
    log_request_received("/webhooks/chatwoot", "POST");

    // Verificar assinatura do webhook (se configurado)
    if state.settings.chatwoot.validate_signature {
        let secret = match state.settings.chatwoot.signature_secret() {
            Some(secret) => secret,
            None => {
                log_error("❌ validate_signature ativo sem webhook_secret; webhook rejeitado");
                log_request_processed("/webhooks/chatwoot", 500, elapsed_ms(start_time));
                return AppError::ConfigError("validate_signature enabled without webhook_secret".to_string())
                    .into_response();
            }
        };
        if let Err(e) = verify_webhook_signature(&headers, &body, secret) {
            log_request_processed("/webhooks/chatwoot", 400, elapsed_ms(start_time));
            return e.into_response();
        }
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            log_validation_error("payload", &format!("Invalid JSON: {}", e));
            log_request_processed("/webhooks/chatwoot", 400, elapsed_ms(start_time));
            return AppError::ValidationError(format!("Invalid JSON payload: {}", e)).into_response();
        }
    };

    let span = tracing::info_span!(
        "webhook",
        event = %payload.event,
        conversation_id = ?payload.conversation_id(),
        delivery_id = %Uuid::new_v4(),
    );

    let router = Arc::clone(&state.router);
    let response = panic_protection(move || {
        async move {
            match router.handle(&payload).await {
                Ok(outcome) => {
                    tracing::info!("Evento '{}' processado: {:?}", payload.event, outcome);
                    Ok(Json(json!({ "status": "ok" })).into_response())
                }
                Err(e) => {
                    log_error(&format!("❌ Error procesando evento '{}': {}", payload.event, e));
                    Err(e.into_response())
                }
            }
        }
        .instrument(span)
    })
    .await;

    log_request_processed("/webhooks/chatwoot", response.status().as_u16(), elapsed_ms(start_time));
    response
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

pub fn verify_webhook_signature(headers: &HeaderMap, body: &[u8], secret: &str) -> AppResult<()> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let signature_header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::ValidationError(format!("Missing {} header", SIGNATURE_HEADER)))?;

    // Remove o prefixo "sha256=" se presente
    let signature = signature_header.strip_prefix("sha256=").unwrap_or(signature_header);

    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| AppError::ValidationError(format!("Invalid secret key: {}", e)))?;
    mac.update(body);
    let expected = hex::encode(mac.finalize().into_bytes());

    if !constant_time_eq(signature.as_bytes(), expected.as_bytes()) {
        log_validation_error("webhook_signature", "Invalid signature");
        return Err(AppError::ValidationError("Invalid webhook signature".to_string()));
    }

    Ok(())
}

// Comparação de tempo constante
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        result |= x ^ y;
    }
    result == 0
}
