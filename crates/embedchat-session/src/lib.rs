//! Embedchat session crate - the widget facade.
//!
//! Owns the session state machine (visibility, fullscreen, screen funnel,
//! identity) and wires it to the conversation manager and the recording
//! controller behind [`Widget::handle`]. The presentation layer sends
//! [`WidgetAction`]s and renders [`WidgetSnapshot`]s.

pub mod action;
pub mod error;
pub mod snapshot;
pub mod state;
pub mod widget;

pub use action::WidgetAction;
pub use error::SessionError;
pub use snapshot::WidgetSnapshot;
pub use state::{PhoneNumber, SessionMachine, SessionState};
pub use widget::{Widget, WidgetBuilder};
