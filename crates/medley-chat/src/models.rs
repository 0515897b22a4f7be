//! Records served by the chat API.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub username: String,
    pub display_name: String,
    pub avatar_color: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Room {
    pub room_id: String,
    pub name: String,
    pub description: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub message_count: usize,
    pub participant_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    pub username: String,
    pub display_name: String,
    pub avatar_color: String,
    pub online: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MsgType {
    #[default]
    Text,
    Code,
    Emoji,
}

impl MsgType {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "" | "text" => Some(MsgType::Text),
            "code"      => Some(MsgType::Code),
            "emoji"     => Some(MsgType::Emoji),
            _           => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub message_id: String,
    pub room_id: String,
    pub sender: String,
    pub display_name: String,
    pub content: String,
    pub msg_type: MsgType,
    pub timestamp: DateTime<Utc>,
    pub avatar_color: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessagePage {
    pub messages: Vec<Message>,
    pub page: usize,
    pub has_more: bool,
    pub total: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub kind: String,
    pub room_id: String,
    pub from: String,
    pub preview: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatStats {
    pub users: usize,
    pub rooms: usize,
    pub messages: usize,
    pub online: usize,
}
