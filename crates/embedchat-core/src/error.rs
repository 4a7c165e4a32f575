use thiserror::Error;

/// Top-level error type for an embedded widget.
///
/// Subsystem crates define their own error types and implement
/// `From<SubsystemError> for WidgetError` so that the `?` operator works
/// across crate boundaries. No variant is fatal: each one leaves the
/// component that raised it in a well-defined prior state.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WidgetError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Capture unavailable: {0}")]
    CaptureUnavailable(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("An exchange is already in flight")]
    Busy,

    #[error("Nothing to send")]
    NothingToSend,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Widget has been torn down")]
    TornDown,

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Coarse classification used by the presentation layer to pick where an
/// error is shown (inline field feedback, status text, or transient notice).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    CaptureUnavailable,
    Transport,
    Other,
}

impl WidgetError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            WidgetError::Validation(_) => ErrorKind::Validation,
            WidgetError::CaptureUnavailable(_) => ErrorKind::CaptureUnavailable,
            WidgetError::Transport(_) => ErrorKind::Transport,
            _ => ErrorKind::Other,
        }
    }
}

impl From<toml::de::Error> for WidgetError {
    fn from(err: toml::de::Error) -> Self {
        WidgetError::Config(err.to_string())
    }
}

impl From<serde_json::Error> for WidgetError {
    fn from(err: serde_json::Error) -> Self {
        WidgetError::Serialization(err.to_string())
    }
}

impl From<url::ParseError> for WidgetError {
    fn from(err: url::ParseError) -> Self {
        WidgetError::Config(format!("invalid apiEndpoint: {}", err))
    }
}

/// A specialized `Result` type for widget operations.
pub type Result<T> = std::result::Result<T, WidgetError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_all_variants() {
        let cases: Vec<(WidgetError, &str)> = vec![
            (
                WidgetError::Config("bad key".to_string()),
                "Configuration error: bad key",
            ),
            (
                WidgetError::Validation("phone".to_string()),
                "Validation error: phone",
            ),
            (
                WidgetError::CaptureUnavailable("denied".to_string()),
                "Capture unavailable: denied",
            ),
            (
                WidgetError::Transport("HTTP 500".to_string()),
                "Transport error: HTTP 500",
            ),
            (WidgetError::Busy, "An exchange is already in flight"),
            (WidgetError::NothingToSend, "Nothing to send"),
            (
                WidgetError::InvalidTransition("Closed -> Chat".to_string()),
                "Invalid transition: Closed -> Chat",
            ),
            (WidgetError::TornDown, "Widget has been torn down"),
        ];

        for (error, expected) in cases {
            assert_eq!(error.to_string(), expected);
        }
    }

    #[test]
    fn test_kind_classification() {
        assert_eq!(
            WidgetError::Validation("x".into()).kind(),
            ErrorKind::Validation
        );
        assert_eq!(
            WidgetError::CaptureUnavailable("x".into()).kind(),
            ErrorKind::CaptureUnavailable
        );
        assert_eq!(
            WidgetError::Transport("x".into()).kind(),
            ErrorKind::Transport
        );
        assert_eq!(WidgetError::Busy.kind(), ErrorKind::Other);
        assert_eq!(WidgetError::TornDown.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_error_from_serde_json() {
        let err: std::result::Result<serde_json::Value, _> = serde_json::from_str("{ nope }");
        let widget_err: WidgetError = err.unwrap_err().into();
        assert!(matches!(widget_err, WidgetError::Serialization(_)));
    }

    #[test]
    fn test_error_from_toml_de() {
        let err: std::result::Result<toml::Value, _> = toml::from_str("invalid = [[[");
        let widget_err: WidgetError = err.unwrap_err().into();
        assert!(matches!(widget_err, WidgetError::Config(_)));
    }

    #[test]
    fn test_error_from_url_parse() {
        let err = url::Url::parse("not a url").unwrap_err();
        let widget_err: WidgetError = err.into();
        assert!(widget_err.to_string().contains("invalid apiEndpoint"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let widget_err: WidgetError = io_err.into();
        assert!(matches!(widget_err, WidgetError::Io(_)));
        assert!(widget_err.to_string().starts_with("I/O error:"));
    }
}
