//! medley-chat — Real-time chat rooms over REST + Server-Sent Events.
//! Provides:
//!   - Account registration, login and bearer sessions
//!   - Rooms, paginated history, undo of one's own last message, search
//!   - Mention notifications and presence
//!   - Per-room SSE fan-out (messages, deletions, typing, join/leave)
//!   - A client side: typing indicator bookkeeping and a reconnecting
//!     event-stream consumer

pub mod auth;
pub mod client;
pub mod engine;
pub mod error;
pub mod events;
pub mod handlers;
pub mod hub;
pub mod models;
pub mod router;
pub mod sse;
pub mod state;

pub use engine::ChatEngine;
pub use error::ChatError;
pub use events::ChatEvent;
pub use hub::SseHub;
pub use router::build_router;
pub use state::{ChatState, SharedState};
