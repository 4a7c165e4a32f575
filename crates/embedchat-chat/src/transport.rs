//! Transports carrying a [`ChatRequest`] to the chat API.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Notify;

use embedchat_core::config::WidgetConfig;

use crate::error::{ChatError, TransportError};
use crate::types::{ChatReply, ChatRequest};

/// One request/reply round-trip with the chat backend.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    /// Send `request` and return the assistant's reply text.
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError>;
}

// =============================================================================
// HttpTransport
// =============================================================================

/// JSON-over-HTTP transport: `POST` to the configured endpoint.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    endpoint: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpTransport {
    /// Build a transport for the widget's endpoint and timeout.
    pub fn from_config(config: &WidgetConfig) -> Result<Self, ChatError> {
        Self::with_config(&config.api_endpoint, config.request_timeout())
    }

    /// Build a transport with an explicit endpoint and timeout.
    pub fn with_config(endpoint: &str, timeout: Duration) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChatError::Client(e.to_string()))?;

        Ok(Self {
            endpoint: endpoint.to_string(),
            client,
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

#[async_trait]
impl ChatTransport for HttpTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout(self.timeout.as_millis())
                } else {
                    TransportError::Connection(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(status = status.as_u16(), endpoint = %self.endpoint, "Chat API error status");
            return Err(TransportError::Status(status.as_u16()));
        }

        let reply: ChatReply = response.json().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout(self.timeout.as_millis())
            } else {
                TransportError::Malformed(e.to_string())
            }
        })?;

        reply.into_reply()
    }
}

// =============================================================================
// MockTransport
// =============================================================================

/// Scripted transport for tests and offline demos.
///
/// Outcomes are taken from a queue in order; once it is empty every call
/// gets the fallback outcome, or a connection error if there is none.
#[derive(Debug, Clone, Default)]
pub struct MockTransport {
    script: Arc<Mutex<VecDeque<Result<String, TransportError>>>>,
    fallback: Option<Result<String, TransportError>>,
    requests: Arc<Mutex<Vec<ChatRequest>>>,
    calls: Arc<AtomicUsize>,
    gate: Option<Arc<Notify>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always reply with `reply`.
    pub fn replying(reply: impl Into<String>) -> Self {
        Self {
            fallback: Some(Ok(reply.into())),
            ..Self::default()
        }
    }

    /// Always fail with `error`.
    pub fn failing(error: TransportError) -> Self {
        Self {
            fallback: Some(Err(error)),
            ..Self::default()
        }
    }

    /// Hold every call until `gate` is notified.
    pub fn with_gate(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    /// Queue the outcome of the next unanswered call.
    pub fn push(&self, outcome: Result<String, TransportError>) {
        if let Ok(mut script) = self.script.lock() {
            script.push_back(outcome);
        }
    }

    /// Number of calls that reached the transport.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every request received, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatTransport for MockTransport {
    async fn send(&self, request: &ChatRequest) -> Result<String, TransportError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let scripted = self
            .script
            .lock()
            .ok()
            .and_then(|mut script| script.pop_front());
        match scripted {
            Some(outcome) => outcome,
            None => self.fallback.clone().unwrap_or_else(|| {
                Err(TransportError::Connection(
                    "mock transport has no scripted reply".to_string(),
                ))
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedchat_core::types::ConversationTurn;

    fn request(text: &str) -> ChatRequest {
        ChatRequest {
            message: text.to_string(),
            conversation_history: vec![ConversationTurn::user(text)],
        }
    }

    #[test]
    fn test_http_transport_from_config() {
        let config = WidgetConfig {
            request_timeout_secs: 12,
            ..WidgetConfig::default()
        };
        let transport = HttpTransport::from_config(&config).unwrap();
        assert_eq!(transport.endpoint(), "http://localhost:8000/api/chat");
        assert_eq!(transport.timeout(), Duration::from_secs(12));
    }

    #[tokio::test]
    async fn test_mock_scripted_then_fallback() {
        let transport = MockTransport::replying("fallback");
        transport.push(Ok("first".to_string()));
        transport.push(Err(TransportError::Status(500)));

        assert_eq!(transport.send(&request("a")).await.unwrap(), "first");
        assert_eq!(
            transport.send(&request("b")).await,
            Err(TransportError::Status(500))
        );
        assert_eq!(transport.send(&request("c")).await.unwrap(), "fallback");
        assert_eq!(transport.calls(), 3);
        assert_eq!(transport.requests()[1].message, "b");
    }

    #[tokio::test]
    async fn test_mock_without_script_fails() {
        let transport = MockTransport::new();
        let result = transport.send(&request("a")).await;
        assert!(matches!(result, Err(TransportError::Connection(_))));
    }

    #[tokio::test]
    async fn test_mock_failing_repeats() {
        let transport = MockTransport::failing(TransportError::Timeout(10));
        for _ in 0..3 {
            assert_eq!(
                transport.send(&request("x")).await,
                Err(TransportError::Timeout(10))
            );
        }
    }
}
