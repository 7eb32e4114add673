/// Proteção contra panics nos handlers
///
/// O processamento roda numa task separada; se ela entrar em panic o
/// cliente ainda recebe um JSON 500 em vez de uma conexão cortada.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::future::Future;

pub async fn panic_protection<F, Fut>(f: F) -> Response
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Response, Response>> + Send + 'static,
{
    match tokio::task::spawn(async move { f().await }).await {
        Ok(Ok(response)) => response,
        Ok(Err(response)) => response,
        Err(e) => {
            tracing::error!("💥 Panic ao processar requisição: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                axum::Json(json!({
                    "error": "Internal server error",
                    "status": 500,
                    "message": "Request processing failed"
                })),
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_passes_response_through() {
        let response = panic_protection(|| async { Ok(StatusCode::OK.into_response()) }).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let response = panic_protection(|| async {
            if true {
                panic!("boom");
            }
            Ok(StatusCode::OK.into_response())
        })
        .await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
