use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Wall-clock timestamp attached to events.
pub type Timestamp = DateTime<Utc>;

// =============================================================================
// Identity
// =============================================================================

/// Identifies one embedded widget instance.
///
/// Several widgets may be mounted on the same page; each owns its own
/// session, conversation, and recorder, and tags its events with this id.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WidgetId(pub Uuid);

impl WidgetId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WidgetId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for WidgetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Content pane shown inside the open widget.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Screen {
    /// Connection-mode chooser (voice or text).
    #[default]
    Connect,
    /// Microphone capture pane.
    Voice,
    /// Guest / phone-number entry pane.
    Text,
    /// Conversation transcript.
    Chat,
}

impl fmt::Display for Screen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Screen::Connect => write!(f, "Connect"),
            Screen::Voice => write!(f, "Voice"),
            Screen::Text => write!(f, "Text"),
            Screen::Chat => write!(f, "Chat"),
        }
    }
}

impl Screen {
    /// Returns whether the pane funnel allows moving from `self` to `target`.
    ///
    /// The funnel is one-directional: Connect -> {Voice | Text}, Text -> Chat.
    pub fn can_transition_to(&self, target: &Screen) -> bool {
        matches!(
            (self, target),
            (Screen::Connect, Screen::Voice)
                | (Screen::Connect, Screen::Text)
                | (Screen::Text, Screen::Chat)
        )
    }
}

/// Connection path picked on the connect screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectMode {
    Voice,
    Text,
}

impl ConnectMode {
    /// Screen this mode leads to.
    pub fn screen(self) -> Screen {
        match self {
            ConnectMode::Voice => Screen::Voice,
            ConnectMode::Text => Screen::Text,
        }
    }
}

/// Speaker of a conversation turn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

/// Edge of the page the trigger button is anchored to.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Left,
    #[default]
    Right,
}

/// Which widget flavour is mounted.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum WidgetVariant {
    /// Connect chooser with voice and text paths.
    #[default]
    ModeChooser,
    /// Single chat pane greeted with the configured welcome message.
    Classic,
}

/// Microphone capture lifecycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    /// Nothing buffered, device released.
    #[default]
    Idle,
    /// Device held, chunks accumulating.
    Recording,
    /// Device released, chunks held for dispatch.
    Stopped,
    /// Buffered audio handed to the transport, awaiting its outcome.
    Processing,
}

impl fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordingStatus::Idle => write!(f, "Idle"),
            RecordingStatus::Recording => write!(f, "Recording"),
            RecordingStatus::Stopped => write!(f, "Stopped"),
            RecordingStatus::Processing => write!(f, "Processing"),
        }
    }
}

impl RecordingStatus {
    /// Returns whether a transition from `self` to `target` is valid.
    pub fn can_transition_to(&self, target: &RecordingStatus) -> bool {
        matches!(
            (self, target),
            (RecordingStatus::Idle, RecordingStatus::Recording)
                | (RecordingStatus::Stopped, RecordingStatus::Recording)
                | (RecordingStatus::Recording, RecordingStatus::Stopped)
                | (RecordingStatus::Stopped, RecordingStatus::Processing)
                // Delivery failed, chunks kept for another try
                | (RecordingStatus::Processing, RecordingStatus::Stopped)
                // Reset, or delivery succeeded
                | (_, RecordingStatus::Idle)
        )
    }
}

/// Whether an async completion was applied or dropped because the state it
/// belonged to is gone (reset, teardown).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Completion {
    Applied,
    Ignored,
}

// =============================================================================
// Conversation
// =============================================================================

/// One message entry in the conversation history.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}
