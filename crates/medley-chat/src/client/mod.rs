//! Client side of the chat: a REST wrapper, a reconnecting event-stream
//! consumer and typing indicator bookkeeping.

pub mod api;
pub mod decoder;
pub mod stream;
pub mod typing;

use thiserror::Error;

pub use api::ChatApi;
pub use decoder::SseDecoder;
pub use stream::{EventStreamClient, StreamHandle};
pub use typing::{TypingNotifier, TypingTracker};

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("unexpected response: {0}")]
    Decode(String),

    #[error("event consumer went away")]
    ConsumerGone,
}
