//! Conversational exchange for the embedded widget.
//!
//! Owns the message history, the single-outstanding-request busy gate, and
//! the transports that carry requests to the remote chat API.

pub mod conversation;
pub mod error;
pub mod transport;
pub mod types;

pub use conversation::{ConversationManager, PendingExchange, CONNECTION_NOTICE};
pub use error::{ChatError, TransportError};
pub use transport::{ChatTransport, HttpTransport, MockTransport};
pub use types::{ChatReply, ChatRequest};
