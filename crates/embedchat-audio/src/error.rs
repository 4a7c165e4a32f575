//! Error types for the recording controller.

use embedchat_core::error::WidgetError;

/// Errors from microphone capture and audio dispatch.
#[derive(Debug, thiserror::Error)]
pub enum RecordingError {
    #[error("microphone unavailable: {0}")]
    CaptureUnavailable(String),
    #[error("no recorded audio to send")]
    NothingToSend,
    #[error("a recording is already being sent")]
    DispatchInFlight,
    #[error("audio delivery failed: {0}")]
    Delivery(String),
    #[error("invalid recording transition: {0}")]
    InvalidTransition(String),
    #[error("recorder state lock poisoned")]
    Poisoned,
    #[error("recorder has been torn down")]
    TornDown,
}

impl From<RecordingError> for WidgetError {
    fn from(err: RecordingError) -> Self {
        match err {
            RecordingError::CaptureUnavailable(msg) => WidgetError::CaptureUnavailable(msg),
            RecordingError::NothingToSend => WidgetError::NothingToSend,
            RecordingError::DispatchInFlight => WidgetError::Busy,
            RecordingError::Delivery(msg) => WidgetError::Transport(msg),
            RecordingError::TornDown => WidgetError::TornDown,
            RecordingError::InvalidTransition(msg) => WidgetError::InvalidTransition(msg),
            RecordingError::Poisoned => {
                WidgetError::InvalidTransition("recorder state lock poisoned".to_string())
            }
        }
    }
}
