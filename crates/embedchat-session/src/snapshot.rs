//! Owned, serializable view of a widget for rendering.

use serde::{Deserialize, Serialize};

use embedchat_core::config::ThemeConfig;
use embedchat_core::types::{ConversationTurn, Position, RecordingStatus, WidgetId};

use crate::state::SessionState;

/// Everything the presentation layer needs to render one frame.
///
/// A copy: mutating it has no effect on the widget.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WidgetSnapshot {
    pub widget_id: WidgetId,
    pub bot_name: String,
    pub full_bot_name: String,
    pub position: Position,
    pub theme: ThemeConfig,
    pub session: SessionState,
    pub history: Vec<ConversationTurn>,
    /// Typing indicator and disabled send button.
    pub busy: bool,
    /// Transient connection notice.
    pub notice: Option<String>,
    /// Inline feedback under the phone field.
    pub validation_message: Option<String>,
    pub recording_status: RecordingStatus,
    pub recording_status_text: String,
    pub alive: bool,
}

impl WidgetSnapshot {
    pub fn to_json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::to_value(self)
    }
}
