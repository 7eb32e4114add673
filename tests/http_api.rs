mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use chatwoot::types::ConversationStatus;
use hmac::{Hmac, Mac};
use serde_json::{json, Value};
use sha2::Sha256;
use tower::ServiceExt;

use chatwoot_bot_middleware::build_router;
use common::*;

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let h = harness();
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn test_status_reports_configuration() {
    let h = harness();
    let app = build_router(h.state.clone());

    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["knowledge_base"]["entries"], json!(h.kb.len()));
    assert_eq!(body["generation"]["enabled"], json!(true));
    assert_eq!(body["chatwoot"]["configured"], json!(false));
}

#[tokio::test]
async fn test_webhook_ok() {
    let h = harness();
    h.helpdesk.add_contact(10, None);
    h.helpdesk.add_conversation(1, ConversationStatus::Open, Some(10));
    let app = build_router(h.state.clone());

    let body = json!({
        "event": "message_created",
        "content": "menu",
        "message_type": "incoming",
        "conversation": {"id": 1}
    })
    .to_string();
    let response = app.oneshot(post("/webhooks/chatwoot", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({"status": "ok"}));
    assert_eq!(h.helpdesk.sent_to(1), vec![h.kb.menu_message().to_string()]);
}

#[tokio::test]
async fn test_legacy_path_is_mounted() {
    let h = harness();
    let app = build_router(h.state.clone());

    let body = json!({"event": "conversation_typing_on"}).to_string();
    let response = app.oneshot(post("/api/chat-webhook", &body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_invalid_json_is_400() {
    let h = harness();
    let app = build_router(h.state.clone());

    let response = app.oneshot(post("/webhooks/chatwoot", "{not json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["status"], json!(400));
}

#[tokio::test]
async fn test_router_error_is_500_json() {
    let h = harness();
    let app = build_router(h.state.clone());

    // Conversa inexistente no helpdesk
    let body = json!({
        "event": "message_created",
        "content": "hola",
        "message_type": "incoming",
        "conversation": {"id": 404}
    })
    .to_string();
    let response = app.oneshot(post("/webhooks/chatwoot", &body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_signature_is_checked_when_enabled() {
    let mut settings = test_settings();
    settings.chatwoot.validate_signature = true;
    settings.chatwoot.webhook_secret = Some("segredo".to_string());
    let h = harness_with(settings, Some("ok"));

    let body = json!({"event": "conversation_typing_on"}).to_string();

    let response = build_router(h.state.clone())
        .oneshot(post("/webhooks/chatwoot", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut mac = Hmac::<Sha256>::new_from_slice(b"segredo").unwrap();
    mac.update(body.as_bytes());
    let signature = format!("sha256={}", hex::encode(mac.finalize().into_bytes()));

    let mut request = post("/webhooks/chatwoot", &body);
    request
        .headers_mut()
        .insert("X-Chatwoot-Signature", signature.parse().unwrap());
    let response = build_router(h.state.clone()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_signature_enabled_without_secret_rejects() {
    let mut settings = test_settings();
    settings.chatwoot.validate_signature = true;
    settings.chatwoot.webhook_secret = Some("  ".to_string());
    let h = harness_with(settings, Some("ok"));
    h.helpdesk.add_contact(10, None);
    h.helpdesk.add_conversation(7, ConversationStatus::Open, Some(10));

    let body = json!({
        "event": "message_created",
        "content": "menu",
        "message_type": "incoming",
        "conversation": {"id": 7}
    })
    .to_string();
    let response = build_router(h.state.clone())
        .oneshot(post("/webhooks/chatwoot", &body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert!(json["error"].as_str().unwrap().contains("webhook_secret"));
    assert!(h.helpdesk.sent_to(7).is_empty());
}
