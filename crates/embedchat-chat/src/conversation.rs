//! Conversation manager: history ownership and the request/reply exchange.
//!
//! At most one exchange is in flight per widget. A second send while one is
//! outstanding is refused, not queued, so history order always equals
//! completion order. Failed exchanges never add a turn; they raise a
//! transient notice instead.

use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use embedchat_core::events::{EventBus, WidgetEvent};
use embedchat_core::types::{Completion, ConversationTurn, Role};

use crate::error::ChatError;
use crate::transport::ChatTransport;
use crate::types::ChatRequest;

/// Notice shown when an exchange fails for any reason.
pub const CONNECTION_NOTICE: &str = "Sorry, I'm having trouble connecting. Please try again.";

/// The single outstanding message round-trip.
#[derive(Debug, Clone)]
pub struct PendingExchange {
    pub id: Uuid,
    pub request: ChatRequest,
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct ConversationInner {
    history: Vec<ConversationTurn>,
    pending: Option<PendingExchange>,
    notice: Option<String>,
    torn_down: bool,
}

impl ConversationInner {
    fn ensure_alive(&self) -> Result<(), ChatError> {
        if self.torn_down {
            Err(ChatError::TornDown)
        } else {
            Ok(())
        }
    }

    fn append(&mut self, turn: ConversationTurn, events: &EventBus) {
        let role = turn.role;
        self.history.push(turn);
        events.publish(WidgetEvent::TurnAppended {
            widget_id: events.widget_id(),
            role,
            index: self.history.len() - 1,
            timestamp: Utc::now(),
        });
    }
}

/// Releases the busy gate when a send future is dropped mid-exchange.
///
/// Only clears `pending` if it still holds the exchange this guard was
/// created for.
struct PendingGuard<'a> {
    manager: &'a ConversationManager,
    exchange_id: Uuid,
    armed: bool,
}

impl<'a> PendingGuard<'a> {
    fn new(manager: &'a ConversationManager, exchange_id: Uuid) -> Self {
        Self {
            manager,
            exchange_id,
            armed: true,
        }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let cleared = match self.manager.lock() {
            Ok(mut inner) => {
                let current = inner.pending.as_ref().map(|p| p.id);
                if current == Some(self.exchange_id) {
                    inner.pending = None;
                    true
                } else {
                    false
                }
            }
            Err(_) => false,
        };
        if cleared {
            tracing::debug!(exchange_id = %self.exchange_id, "Exchange dropped before completion, busy cleared");
            self.manager.publish_busy(false);
        }
    }
}

/// Owns a widget's conversation history and exchanges it with the chat API.
pub struct ConversationManager {
    transport: Arc<dyn ChatTransport>,
    events: EventBus,
    inner: Mutex<ConversationInner>,
}

impl std::fmt::Debug for ConversationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationManager")
            .field("inner", &self.inner)
            .finish()
    }
}

impl ConversationManager {
    pub fn new(transport: Arc<dyn ChatTransport>, events: EventBus) -> Self {
        Self {
            transport,
            events,
            inner: Mutex::new(ConversationInner::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, ConversationInner>, ChatError> {
        self.inner.lock().map_err(|_| ChatError::Poisoned)
    }

    /// Ordered copy of the history, oldest first.
    pub fn history(&self) -> Result<Vec<ConversationTurn>, ChatError> {
        Ok(self.lock()?.history.clone())
    }

    pub fn len(&self) -> Result<usize, ChatError> {
        Ok(self.lock()?.history.len())
    }

    pub fn is_empty(&self) -> Result<bool, ChatError> {
        Ok(self.len()? == 0)
    }

    /// Whether an exchange is outstanding.
    pub fn is_busy(&self) -> Result<bool, ChatError> {
        Ok(self.lock()?.pending.is_some())
    }

    /// Copy of the outstanding exchange, if any.
    pub fn pending(&self) -> Result<Option<PendingExchange>, ChatError> {
        Ok(self.lock()?.pending.clone())
    }

    /// Transient notice from the last failed exchange.
    pub fn notice(&self) -> Result<Option<String>, ChatError> {
        Ok(self.lock()?.notice.clone())
    }

    pub fn dismiss_notice(&self) -> Result<(), ChatError> {
        self.lock()?.notice = None;
        Ok(())
    }

    /// Append an assistant turn without contacting the API.
    ///
    /// Used for the welcome text shown on entering the chat screen.
    pub fn add_system_message(&self, text: &str) -> Result<(), ChatError> {
        let mut inner = self.lock()?;
        inner.ensure_alive()?;
        inner.append(ConversationTurn::assistant(text), &self.events);
        tracing::debug!(len = inner.history.len(), "System message appended");
        Ok(())
    }

    /// Send a user message and wait for the assistant's reply.
    ///
    /// Returns `Completion::Ignored` when the widget was torn down while the
    /// exchange was in flight.
    pub async fn send_user_message(&self, text: &str) -> Result<Completion, ChatError> {
        let exchange = {
            let mut inner = self.lock()?;
            inner.ensure_alive()?;
            if inner.pending.is_some() {
                tracing::debug!("Send refused, exchange already in flight");
                return Err(ChatError::Busy);
            }
            let message = text.trim();
            if message.is_empty() {
                return Err(ChatError::EmptyMessage);
            }

            inner.notice = None;
            inner.append(ConversationTurn::user(message), &self.events);
            let exchange = PendingExchange {
                id: Uuid::new_v4(),
                request: ChatRequest {
                    message: message.to_string(),
                    conversation_history: inner.history.clone(),
                },
                started_at: Utc::now(),
            };
            inner.pending = Some(exchange.clone());
            self.publish_busy(true);
            exchange
        };

        tracing::info!(
            exchange_id = %exchange.id,
            history_len = exchange.request.conversation_history.len(),
            "Sending chat message"
        );
        let mut guard = PendingGuard::new(self, exchange.id);
        let outcome = self.transport.send(&exchange.request).await;

        let mut inner = self.lock()?;
        guard.disarm();
        let current = inner.pending.as_ref().map(|p| p.id);
        if inner.torn_down || current != Some(exchange.id) {
            tracing::debug!(exchange_id = %exchange.id, "Exchange completed after teardown, ignored");
            return Ok(Completion::Ignored);
        }
        inner.pending = None;

        let elapsed_ms = (Utc::now() - exchange.started_at).num_milliseconds();
        let result = match outcome {
            Ok(reply) => {
                inner.append(ConversationTurn::assistant(reply), &self.events);
                tracing::info!(exchange_id = %exchange.id, elapsed_ms, "Chat reply received");
                Ok(Completion::Applied)
            }
            Err(e) => {
                tracing::warn!(exchange_id = %exchange.id, elapsed_ms, error = %e, "Chat exchange failed");
                inner.notice = Some(CONNECTION_NOTICE.to_string());
                self.events.publish(WidgetEvent::NoticeRaised {
                    widget_id: self.events.widget_id(),
                    message: CONNECTION_NOTICE.to_string(),
                    timestamp: Utc::now(),
                });
                Err(ChatError::Transport(e))
            }
        };
        self.publish_busy(false);
        result
    }

    /// Abandon any outstanding exchange and refuse further work.
    pub fn teardown(&self) -> Result<(), ChatError> {
        let mut inner = self.lock()?;
        inner.torn_down = true;
        if let Some(pending) = inner.pending.take() {
            tracing::debug!(exchange_id = %pending.id, "Outstanding exchange abandoned");
        }
        Ok(())
    }

    /// Number of turns spoken by `role`.
    pub fn count_by_role(&self, role: Role) -> Result<usize, ChatError> {
        Ok(self
            .lock()?
            .history
            .iter()
            .filter(|t| t.role == role)
            .count())
    }

    fn publish_busy(&self, busy: bool) {
        self.events.publish(WidgetEvent::BusyChanged {
            widget_id: self.events.widget_id(),
            busy,
            timestamp: Utc::now(),
        });
    }
}

// =============================================================================
// Tests
// =============================================================================
