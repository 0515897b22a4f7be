//! Events pushed to room subscribers over SSE. The same type is decoded by
//! the client.

use serde::{Deserialize, Serialize};

use crate::models::Message;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChatEvent {
    /// First event on every stream
    Connected { username: String },
    NewMessage { message: Message },
    MessageDeleted { message_id: String },
    Typing { username: String, is_typing: bool },
    UserJoined { username: String, display_name: String, avatar_color: String },
    UserLeft { username: String },
    /// Sent when a stream has been idle for the ping interval
    Ping,
}
