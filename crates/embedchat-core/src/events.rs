use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::types::{RecordingStatus, Role, Screen, Timestamp, WidgetId};

/// Capacity of the per-widget event channel.
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Notifications emitted after widget state changes.
///
/// Consumed by the presentation layer as a re-render signal; the payload
/// names what changed, the current values come from a snapshot.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum WidgetEvent {
    /// The widget opened or closed.
    VisibilityChanged {
        widget_id: WidgetId,
        open: bool,
        timestamp: Timestamp,
    },

    /// Fullscreen was switched on or off.
    FullscreenChanged {
        widget_id: WidgetId,
        fullscreen: bool,
        timestamp: Timestamp,
    },

    /// The hover tooltip was shown or hidden.
    TooltipChanged {
        widget_id: WidgetId,
        visible: bool,
        timestamp: Timestamp,
    },

    /// A different content pane became active.
    ScreenChanged {
        widget_id: WidgetId,
        from: Screen,
        to: Screen,
        timestamp: Timestamp,
    },

    /// A turn was appended to the conversation history.
    TurnAppended {
        widget_id: WidgetId,
        role: Role,
        index: usize,
        timestamp: Timestamp,
    },

    /// A message exchange started or finished.
    BusyChanged {
        widget_id: WidgetId,
        busy: bool,
        timestamp: Timestamp,
    },

    /// A transient notice should be shown.
    NoticeRaised {
        widget_id: WidgetId,
        message: String,
        timestamp: Timestamp,
    },

    /// The recorder moved between capture states.
    RecordingStatusChanged {
        widget_id: WidgetId,
        from: RecordingStatus,
        to: RecordingStatus,
        timestamp: Timestamp,
    },

    /// The widget was unmounted; no further events follow.
    TornDown {
        widget_id: WidgetId,
        timestamp: Timestamp,
    },
}

impl WidgetEvent {
    pub fn widget_id(&self) -> WidgetId {
        match self {
            WidgetEvent::VisibilityChanged { widget_id, .. }
            | WidgetEvent::FullscreenChanged { widget_id, .. }
            | WidgetEvent::TooltipChanged { widget_id, .. }
            | WidgetEvent::ScreenChanged { widget_id, .. }
            | WidgetEvent::TurnAppended { widget_id, .. }
            | WidgetEvent::BusyChanged { widget_id, .. }
            | WidgetEvent::NoticeRaised { widget_id, .. }
            | WidgetEvent::RecordingStatusChanged { widget_id, .. }
            | WidgetEvent::TornDown { widget_id, .. } => *widget_id,
        }
    }
}

/// Sending half of a widget's event channel.
///
/// Cloned into each component so they can publish without knowing about
/// each other. Publishing with no subscribers is not an error.
#[derive(Clone, Debug)]
pub struct EventBus {
    widget_id: WidgetId,
    tx: broadcast::Sender<WidgetEvent>,
}

impl EventBus {
    pub fn new(widget_id: WidgetId) -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self { widget_id, tx }
    }

    pub fn widget_id(&self) -> WidgetId {
        self.widget_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WidgetEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: WidgetEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!(widget_id = %self.widget_id, "No event subscribers");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_publish_without_subscribers_is_ok() {
        let bus = EventBus::new(WidgetId::new());
        bus.publish(WidgetEvent::BusyChanged {
            widget_id: bus.widget_id(),
            busy: true,
            timestamp: Utc::now(),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let bus = EventBus::new(WidgetId::new());
        let mut rx = bus.subscribe();
        let id = bus.widget_id();

        bus.publish(WidgetEvent::VisibilityChanged {
            widget_id: id,
            open: true,
            timestamp: Utc::now(),
        });
        bus.publish(WidgetEvent::FullscreenChanged {
            widget_id: id,
            fullscreen: true,
            timestamp: Utc::now(),
        });

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, WidgetEvent::VisibilityChanged { open: true, .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second,
            WidgetEvent::FullscreenChanged {
                fullscreen: true,
                ..
            }
        ));
        assert_eq!(second.widget_id(), id);
    }

    #[test]
    fn test_event_serializes() {
        let event = WidgetEvent::ScreenChanged {
            widget_id: WidgetId::new(),
            from: Screen::Text,
            to: Screen::Chat,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["ScreenChanged"]["to"], "chat");
    }
}
