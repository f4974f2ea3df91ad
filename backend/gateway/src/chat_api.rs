//! `POST /chat`, the single conversational endpoint.

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
};
use serde_json::{json, Value};
use tracing::{error, info};

use chatrelay_core::RelayError;

use crate::server::GatewayState;

/// Handler for `POST /chat`.
///
/// Request body `{"text": string}`; success `{"response": string}`. Any
/// validation failure is a 400 with `{"error": string}`, produced before
/// the session lock is taken so bad input never touches the transcript.
pub async fn chat(
    State(state): State<GatewayState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let Ok(Json(payload)) = payload else {
        return error_response(StatusCode::BAD_REQUEST, "Request body is not valid JSON");
    };

    let Some(text) = payload.get("text").and_then(Value::as_str) else {
        return error_response(StatusCode::BAD_REQUEST, "Missing 'text' field in request");
    };

    info!(chars = text.len(), "Received chat request");

    let mut session = state.session.lock().await;
    match session.handle_message(text).await {
        Ok(reply) => (StatusCode::OK, Json(json!({ "response": reply }))),
        Err(RelayError::InvalidRequest(message)) => {
            error_response(StatusCode::BAD_REQUEST, &message)
        }
        Err(e) => {
            error!(error = %e, "Chat turn failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
        }
    }
}

/// Health check endpoint.
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "service": "chatrelay",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

fn error_response(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    use chatrelay_agent::{ChatSession, ContextWindow, FALLBACK_REPLY};
    use chatrelay_core::GenerationParams;
    use chatrelay_history::HistoryStore;
    use chatrelay_model::MockModel;

    use crate::server::{build_router, GatewayState};

    fn router_with(dir: &tempfile::TempDir, model: MockModel) -> axum::Router {
        let store = HistoryStore::new(dir.path().join("historial.json"));
        let window = ContextWindow::new(10, 4096 - 150);
        let session = ChatSession::new(window, store, Arc::new(model), GenerationParams::default());
        build_router(GatewayState::new(session))
    }

    fn chat_request(body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/chat")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_chat_round_trip_and_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(&dir, MockModel::new().with_reply("hi"));

        let response = app
            .oneshot(chat_request(r#"{"text": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["response"], "hi");

        let turns = HistoryStore::new(dir.path().join("historial.json"))
            .load()
            .await;
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].user_text, "hello");
        assert_eq!(turns[0].response_text, "hi");
    }

    #[tokio::test]
    async fn test_missing_text_field_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(&dir, MockModel::new());

        let response = app
            .oneshot(chat_request(r#"{"message": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].is_string());

        // The pipeline was never entered.
        assert!(!dir.path().join("historial.json").exists());
    }

    #[tokio::test]
    async fn test_malformed_json_body_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(&dir, MockModel::new());

        let response = app.oneshot(chat_request("not json")).await.unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_model_failure_returns_fallback_reply() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(&dir, MockModel::new().failing());

        let response = app
            .oneshot(chat_request(r#"{"text": "hello"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["response"], FALLBACK_REPLY);

        let turns = HistoryStore::new(dir.path().join("historial.json"))
            .load()
            .await;
        assert_eq!(turns[0].response_text, FALLBACK_REPLY);
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let dir = tempfile::tempdir().unwrap();
        let app = router_with(&dir, MockModel::new());

        let response = app
            .oneshot(
                Request::builder()
                    .method("GET")
                    .uri("/api/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["status"], "ok");
    }
}
