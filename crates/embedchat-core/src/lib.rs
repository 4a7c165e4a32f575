//! Embedchat core - shared configuration, data model, errors, and events for
//! the embeddable chat widget.

pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod types;

pub use config::{ThemeConfig, WidgetConfig};
pub use error::{ErrorKind, Result, WidgetError};
pub use events::{EventBus, WidgetEvent};
pub use types::*;
