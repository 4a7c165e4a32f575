//! Error types for the session state machine.

use embedchat_core::error::WidgetError;
use embedchat_core::types::Screen;

/// Errors from widget visibility and screen transitions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("{0}")]
    Validation(String),
    #[error("cannot {action} from {from}")]
    InvalidTransition { action: &'static str, from: String },
    #[error("session state lock poisoned")]
    Poisoned,
}

impl SessionError {
    pub(crate) fn invalid(action: &'static str, open: bool, screen: Screen) -> Self {
        let from = if open {
            format!("Open.{}", screen)
        } else {
            "Closed".to_string()
        };
        SessionError::InvalidTransition { action, from }
    }
}

impl From<SessionError> for WidgetError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Validation(msg) => WidgetError::Validation(msg),
            other => WidgetError::InvalidTransition(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use embedchat_core::error::ErrorKind;

    #[test]
    fn test_session_error_display() {
        let err = SessionError::invalid("enter guest mode", true, Screen::Voice);
        assert_eq!(err.to_string(), "cannot enter guest mode from Open.Voice");

        let err = SessionError::invalid("select a connect mode", false, Screen::Connect);
        assert_eq!(err.to_string(), "cannot select a connect mode from Closed");

        let err = SessionError::Validation("bad phone".to_string());
        assert_eq!(err.to_string(), "bad phone");
    }

    #[test]
    fn test_into_widget_error() {
        let err: WidgetError = SessionError::Validation("bad".into()).into();
        assert_eq!(err.kind(), ErrorKind::Validation);

        let err: WidgetError = SessionError::invalid("submit identity", true, Screen::Chat).into();
        assert!(matches!(err, WidgetError::InvalidTransition(_)));
        assert!(err.to_string().contains("Open.Chat"));
    }
}
