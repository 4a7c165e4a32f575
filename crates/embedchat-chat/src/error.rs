//! Error types for the conversation exchange.

use embedchat_core::error::WidgetError;

/// Failures of one round-trip to the chat API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connection(String),
    #[error("request timed out after {0} ms")]
    Timeout(u128),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("malformed reply: {0}")]
    Malformed(String),
    #[error("reply reported failure: {0}")]
    Rejected(String),
}

/// Errors from the conversation manager.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("an exchange is already in flight")]
    Busy,
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error("HTTP client error: {0}")]
    Client(String),
    #[error("conversation state lock poisoned")]
    Poisoned,
    #[error("conversation has been torn down")]
    TornDown,
}

impl From<ChatError> for WidgetError {
    fn from(err: ChatError) -> Self {
        let message = err.to_string();
        match err {
            ChatError::EmptyMessage => WidgetError::Validation(message),
            ChatError::Busy => WidgetError::Busy,
            ChatError::Transport(e) => WidgetError::Transport(e.to_string()),
            ChatError::Client(msg) => WidgetError::Config(msg),
            ChatError::TornDown => WidgetError::TornDown,
            ChatError::Poisoned => WidgetError::InvalidTransition(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedchat_core::error::ErrorKind;

    #[test]
    fn test_transport_error_display() {
        assert_eq!(
            TransportError::Connection("refused".into()).to_string(),
            "connection failed: refused"
        );
        assert_eq!(
            TransportError::Timeout(1500).to_string(),
            "request timed out after 1500 ms"
        );
        assert_eq!(TransportError::Status(500).to_string(), "server returned HTTP 500");
        assert_eq!(
            TransportError::Malformed("expected value".into()).to_string(),
            "malformed reply: expected value"
        );
        assert_eq!(
            TransportError::Rejected("quota".into()).to_string(),
            "reply reported failure: quota"
        );
    }

    #[test]
    fn test_chat_error_display() {
        assert_eq!(ChatError::EmptyMessage.to_string(), "message cannot be empty");
        assert_eq!(ChatError::Busy.to_string(), "an exchange is already in flight");
        let err: ChatError = TransportError::Status(502).into();
        assert_eq!(err.to_string(), "server returned HTTP 502");
    }

    #[test]
    fn test_into_widget_error() {
        let err: WidgetError = ChatError::EmptyMessage.into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: WidgetError = ChatError::Busy.into();
        assert!(matches!(err, WidgetError::Busy));

        let err: WidgetError = ChatError::Transport(TransportError::Status(500)).into();
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert!(err.to_string().contains("HTTP 500"));

        let err: WidgetError = ChatError::TornDown.into();
        assert!(matches!(err, WidgetError::TornDown));
    }
}
