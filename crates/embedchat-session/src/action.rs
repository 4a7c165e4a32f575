//! Commands the presentation layer sends to a widget.

use serde::{Deserialize, Serialize};

use embedchat_audio::AudioChunk;
use embedchat_core::types::ConnectMode;

/// A user action routed through [`crate::Widget::handle`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum WidgetAction {
    /// Trigger button.
    ToggleWidget,
    /// Header close button.
    CloseWidget,
    HoverTrigger,
    UnhoverTrigger,
    ToggleFullscreen,
    SelectConnectMode(ConnectMode),
    EnterGuestMode,
    /// Phone field submit; the raw field value.
    SubmitIdentity(String),
    SendMessage(String),
    DismissNotice,
    /// Microphone button.
    ToggleRecording,
    StartRecording,
    StopRecording,
    ResetRecording,
    SendRecording,
    /// Encoded buffer from the capture device.
    AudioChunk(AudioChunk),
}

impl WidgetAction {
    /// Short name used in logs.
    pub fn name(&self) -> &'static str {
        match self {
            WidgetAction::ToggleWidget => "toggle_widget",
            WidgetAction::CloseWidget => "close_widget",
            WidgetAction::HoverTrigger => "hover_trigger",
            WidgetAction::UnhoverTrigger => "unhover_trigger",
            WidgetAction::ToggleFullscreen => "toggle_fullscreen",
            WidgetAction::SelectConnectMode(_) => "select_connect_mode",
            WidgetAction::EnterGuestMode => "enter_guest_mode",
            WidgetAction::SubmitIdentity(_) => "submit_identity",
            WidgetAction::SendMessage(_) => "send_message",
            WidgetAction::DismissNotice => "dismiss_notice",
            WidgetAction::ToggleRecording => "toggle_recording",
            WidgetAction::StartRecording => "start_recording",
            WidgetAction::StopRecording => "stop_recording",
            WidgetAction::ResetRecording => "reset_recording",
            WidgetAction::SendRecording => "send_recording",
            WidgetAction::AudioChunk(_) => "audio_chunk",
        }
    }

    /// Whether handling this action may suspend on I/O.
    pub fn is_async(&self) -> bool {
        matches!(
            self,
            WidgetAction::SendMessage(_)
                | WidgetAction::ToggleRecording
                | WidgetAction::StartRecording
                | WidgetAction::SendRecording
        )
    }
}
