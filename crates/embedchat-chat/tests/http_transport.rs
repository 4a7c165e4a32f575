//! Integration tests for the HTTP transport against a local axum server.
//!
//! Each test starts its own server on an ephemeral port so tests stay
//! independent.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

use embedchat_chat::{
    ChatError, ChatRequest, ChatTransport, ConversationManager, HttpTransport, TransportError,
    CONNECTION_NOTICE,
};
use embedchat_core::events::EventBus;
use embedchat_core::types::{Completion, ConversationTurn, WidgetId};

// =============================================================================
// Helpers
// =============================================================================

async fn echo(Json(request): Json<ChatRequest>) -> Json<Value> {
    Json(json!({
        "success": true,
        "reply": format!(
            "echo: {} ({} turns)",
            request.message,
            request.conversation_history.len()
        ),
    }))
}

fn router() -> Router {
    Router::new()
        .route("/api/chat", post(echo))
        .route(
            "/broken",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "boom") }),
        )
        .route("/garbage", post(|| async { "definitely not json" }))
        .route(
            "/refused",
            post(|| async {
                Json(json!({"success": false, "error": "LLM provider not configured"}))
            }),
        )
        .route(
            "/slow",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(2)).await;
                Json(json!({"success": true, "reply": "too late"}))
            }),
        )
}

async fn spawn_server() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router()).await.unwrap();
    });
    addr
}

fn transport(addr: SocketAddr, path: &str) -> HttpTransport {
    HttpTransport::with_config(&format!("http://{}{}", addr, path), Duration::from_secs(5))
        .unwrap()
}

fn request(message: &str) -> ChatRequest {
    ChatRequest {
        message: message.to_string(),
        conversation_history: vec![ConversationTurn::user(message)],
    }
}

// =============================================================================
// Transport
// =============================================================================

#[tokio::test]
async fn test_success_reply() {
    let addr = spawn_server().await;
    let reply = transport(addr, "/api/chat")
        .send(&request("hi"))
        .await
        .unwrap();
    assert_eq!(reply, "echo: hi (1 turns)");
}

#[tokio::test]
async fn test_server_error_status() {
    let addr = spawn_server().await;
    let result = transport(addr, "/broken").send(&request("hi")).await;
    assert_eq!(result, Err(TransportError::Status(500)));
}

#[tokio::test]
async fn test_unknown_route_is_status_error() {
    let addr = spawn_server().await;
    let result = transport(addr, "/missing").send(&request("hi")).await;
    assert_eq!(result, Err(TransportError::Status(404)));
}

#[tokio::test]
async fn test_malformed_body() {
    let addr = spawn_server().await;
    let result = transport(addr, "/garbage").send(&request("hi")).await;
    assert!(matches!(result, Err(TransportError::Malformed(_))));
}

#[tokio::test]
async fn test_success_false_body() {
    let addr = spawn_server().await;
    let result = transport(addr, "/refused").send(&request("hi")).await;
    assert_eq!(
        result,
        Err(TransportError::Rejected(
            "LLM provider not configured".to_string()
        ))
    );
}

#[tokio::test]
async fn test_timeout() {
    let addr = spawn_server().await;
    let transport =
        HttpTransport::with_config(&format!("http://{}/slow", addr), Duration::from_millis(200))
            .unwrap();
    let result = transport.send(&request("hi")).await;
    assert_eq!(result, Err(TransportError::Timeout(200)));
}

#[tokio::test]
async fn test_connection_refused() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let result = transport(addr, "/api/chat").send(&request("hi")).await;
    assert!(matches!(result, Err(TransportError::Connection(_))));
}

// =============================================================================
// Conversation over HTTP
// =============================================================================

#[tokio::test]
async fn test_conversation_round_trip_over_http() {
    let addr = spawn_server().await;
    let cm = ConversationManager::new(
        Arc::new(transport(addr, "/api/chat")),
        EventBus::new(WidgetId::new()),
    );

    assert_eq!(cm.send_user_message("hi").await.unwrap(), Completion::Applied);
    assert_eq!(cm.send_user_message("again").await.unwrap(), Completion::Applied);
    assert_eq!(
        cm.history().unwrap(),
        vec![
            ConversationTurn::user("hi"),
            ConversationTurn::assistant("echo: hi (1 turns)"),
            ConversationTurn::user("again"),
            ConversationTurn::assistant("echo: again (3 turns)"),
        ]
    );
}

#[tokio::test]
async fn test_conversation_http_500_over_http() {
    let addr = spawn_server().await;
    let cm = ConversationManager::new(
        Arc::new(transport(addr, "/broken")),
        EventBus::new(WidgetId::new()),
    );

    let result = cm.send_user_message("hi").await;
    assert!(matches!(
        result,
        Err(ChatError::Transport(TransportError::Status(500)))
    ));
    assert_eq!(cm.history().unwrap(), vec![ConversationTurn::user("hi")]);
    assert_eq!(cm.notice().unwrap().as_deref(), Some(CONNECTION_NOTICE));
    assert!(!cm.is_busy().unwrap());
}
