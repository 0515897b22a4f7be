//! In-memory chat engine: accounts, sessions, rooms, history and presence.
//!
//! All state sits behind one `RwLock`. Password hashing runs outside the
//! lock; callers on an async runtime should invoke `register`/`login` from a
//! blocking task.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::RwLock;

use medley_common::sync::{read, write};
use medley_common::{new_id, now, short_id};
use medley_config::ChatConfig;
use medley_security::{new_session_token, PasswordHasher};
use regex::Regex;
use tracing::{debug, info};

use crate::error::ChatError;
use crate::models::{ChatStats, Message, MessagePage, MsgType, Notification, Participant, Room, User};

const AVATAR_PALETTE: &[&str] = &[
    "#6C63FF", "#FF6584", "#43B89C", "#F7B731", "#20BF6B", "#FC5C65", "#45AAF2", "#A55EEA",
];

const MAX_NOTIFICATIONS: usize = 50;
const MAX_SEARCH_RESULTS: usize = 50;
const PREVIEW_CHARS: usize = 80;

struct UserRecord {
    user: User,
    password_hash: String,
}

struct RoomRecord {
    room_id: String,
    name: String,
    description: String,
    created_by: String,
    created_at: chrono::DateTime<chrono::Utc>,
    /// Join order
    participants: Vec<String>,
    messages: Vec<Message>,
}

impl RoomRecord {
    fn view(&self) -> Room {
        Room {
            room_id: self.room_id.clone(),
            name: self.name.clone(),
            description: self.description.clone(),
            created_by: self.created_by.clone(),
            created_at: self.created_at,
            message_count: self.messages.len(),
            participant_count: self.participants.len(),
        }
    }

    fn join(&mut self, username: &str) -> bool {
        if self.participants.iter().any(|p| p == username) {
            return false;
        }
        self.participants.push(username.to_string());
        true
    }
}

#[derive(Default)]
struct ChatStore {
    users: HashMap<String, UserRecord>,
    /// token -> username
    sessions: HashMap<String, String>,
    rooms: HashMap<String, RoomRecord>,
    room_order: Vec<String>,
    /// (room_id, username) -> message ids, most recent last
    undo: HashMap<(String, String), Vec<String>>,
    notifications: HashMap<String, VecDeque<Notification>>,
    /// username -> open stream count
    online: HashMap<String, usize>,
}

pub struct ChatEngine {
    store: RwLock<ChatStore>,
    hasher: PasswordHasher,
    config: ChatConfig,
    mention_re: Regex,
}

impl ChatEngine {
    pub fn new(config: ChatConfig, hasher: PasswordHasher) -> Self {
        let mut store = ChatStore::default();
        let room_id = config.default_room.clone();
        store.rooms.insert(room_id.clone(), RoomRecord {
            room_id: room_id.clone(),
            name: room_id.clone(),
            description: "Default room for everyone".to_string(),
            created_by: "system".to_string(),
            created_at: now(),
            participants: Vec::new(),
            messages: Vec::new(),
        });
        store.room_order.push(room_id);

        Self {
            store: RwLock::new(store),
            hasher,
            config,
            mention_re: Regex::new(r"@([A-Za-z0-9_]{3,32})").expect("static mention regex"),
        }
    }

    pub fn config(&self) -> &ChatConfig {
        &self.config
    }

    // ── Accounts ────────────────────────────────────────────────────────────

    pub fn register(&self, username: &str, password: &str, display_name: &str) -> Result<User, ChatError> {
        let username = username.trim();
        validate_username(username)?;
        if password.chars().count() < 6 {
            return Err(ChatError::Validation("Password must be at least 6 characters".into()));
        }
        if read(&self.store).users.contains_key(username) {
            return Err(ChatError::UsernameTaken);
        }

        let password_hash = self
            .hasher
            .hash(password)
            .map_err(|e| ChatError::Internal(e.to_string()))?;

        let display_name = match display_name.trim() {
            "" => username.to_string(),
            name => name.chars().take(50).collect(),
        };
        let user = User {
            username: username.to_string(),
            display_name,
            avatar_color: avatar_color(username).to_string(),
            created_at: now(),
        };

        let mut store = write(&self.store);
        if store.users.contains_key(username) {
            return Err(ChatError::UsernameTaken);
        }
        store.users.insert(username.to_string(), UserRecord { user: user.clone(), password_hash });
        info!(username, "registered chat user");
        Ok(user)
    }

    /// Returns a fresh session token.
    pub fn login(&self, username: &str, password: &str) -> Result<(String, User), ChatError> {
        let username = username.trim();
        let (user, hash) = {
            let store = read(&self.store);
            let record = store.users.get(username).ok_or(ChatError::InvalidCredentials)?;
            (record.user.clone(), record.password_hash.clone())
        };
        if !self.hasher.verify(password, &hash) {
            return Err(ChatError::InvalidCredentials);
        }
        let token = new_session_token();
        write(&self.store).sessions.insert(token.clone(), username.to_string());
        debug!(username, "chat login");
        Ok((token, user))
    }

    pub fn logout(&self, token: &str) {
        if let Some(username) = write(&self.store).sessions.remove(token) {
            debug!(username = %username, "chat logout");
        }
    }

    pub fn user_by_token(&self, token: &str) -> Option<User> {
        let store = read(&self.store);
        let username = store.sessions.get(token)?;
        store.users.get(username).map(|r| r.user.clone())
    }

    pub fn user(&self, username: &str) -> Option<User> {
        read(&self.store).users.get(username).map(|r| r.user.clone())
    }

    // ── Presence ────────────────────────────────────────────────────────────

    pub fn set_online(&self, username: &str) {
        *write(&self.store).online.entry(username.to_string()).or_insert(0) += 1;
    }

    pub fn set_offline(&self, username: &str) {
        let mut store = write(&self.store);
        if let Some(count) = store.online.get_mut(username) {
            *count = count.saturating_sub(1);
            if *count == 0 {
                store.online.remove(username);
            }
        }
    }

    pub fn is_online(&self, username: &str) -> bool {
        read(&self.store).online.contains_key(username)
    }

    /// Online users, sorted by username.
    pub fn online_users(&self) -> Vec<User> {
        let store = read(&self.store);
        let mut users: Vec<User> = store
            .online
            .keys()
            .filter_map(|u| store.users.get(u).map(|r| r.user.clone()))
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));
        users
    }

    // ── Rooms ───────────────────────────────────────────────────────────────

    pub fn create_room(&self, name: &str, description: &str, creator: &str) -> Result<Room, ChatError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > 50 {
            return Err(ChatError::Validation("Room name must be 1-50 characters".into()));
        }
        let mut store = write(&self.store);
        let mut room_id = short_id();
        while store.rooms.contains_key(&room_id) {
            room_id = short_id();
        }
        let record = RoomRecord {
            room_id: room_id.clone(),
            name: name.to_string(),
            description: description.trim().chars().take(200).collect(),
            created_by: creator.to_string(),
            created_at: now(),
            participants: vec![creator.to_string()],
            messages: Vec::new(),
        };
        let room = record.view();
        store.rooms.insert(room_id.clone(), record);
        store.room_order.push(room_id);
        info!(room_id = %room.room_id, name = %room.name, creator, "room created");
        Ok(room)
    }

    /// All rooms in creation order.
    pub fn rooms(&self) -> Vec<Room> {
        let store = read(&self.store);
        store
            .room_order
            .iter()
            .filter_map(|id| store.rooms.get(id).map(RoomRecord::view))
            .collect()
    }

    pub fn room(&self, room_id: &str) -> Option<Room> {
        read(&self.store).rooms.get(room_id).map(RoomRecord::view)
    }

    pub fn join_room(&self, room_id: &str, username: &str) -> Result<Room, ChatError> {
        let mut store = write(&self.store);
        let room = store.rooms.get_mut(room_id).ok_or(ChatError::NotFound("Room"))?;
        if room.join(username) {
            debug!(room_id, username, "joined room");
        }
        Ok(room.view())
    }

    pub fn leave_room(&self, room_id: &str, username: &str) {
        if let Some(room) = write(&self.store).rooms.get_mut(room_id) {
            room.participants.retain(|p| p != username);
        }
    }

    pub fn participants(&self, room_id: &str) -> Vec<Participant> {
        let store = read(&self.store);
        let Some(room) = store.rooms.get(room_id) else {
            return Vec::new();
        };
        room.participants
            .iter()
            .filter_map(|name| store.users.get(name))
            .map(|r| Participant {
                username: r.user.username.clone(),
                display_name: r.user.display_name.clone(),
                avatar_color: r.user.avatar_color.clone(),
                online: store.online.contains_key(&r.user.username),
            })
            .collect()
    }

    // ── Messages ────────────────────────────────────────────────────────────

    /// Page 1 is the newest page; each page is returned oldest first.
    pub fn messages(&self, room_id: &str, page: usize) -> Result<MessagePage, ChatError> {
        let store = read(&self.store);
        let room = store.rooms.get(room_id).ok_or(ChatError::NotFound("Room"))?;
        let page = page.max(1);
        let size = self.config.page_size;
        let total = room.messages.len();
        let end = total.saturating_sub((page - 1).saturating_mul(size));
        let start = end.saturating_sub(size);
        Ok(MessagePage {
            messages: room.messages[start..end].to_vec(),
            page,
            has_more: start > 0,
            total,
        })
    }

    pub fn send_message(&self, room_id: &str, sender: &str, content: &str, msg_type: &str) -> Result<Message, ChatError> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::Validation("Message cannot be empty".into()));
        }
        if content.chars().count() > self.config.max_message_len {
            return Err(ChatError::Validation(format!(
                "Message exceeds {} characters",
                self.config.max_message_len
            )));
        }
        let msg_type = MsgType::parse(msg_type)
            .ok_or_else(|| ChatError::Validation(format!("Unknown message type '{msg_type}'")))?;

        let mut store = write(&self.store);
        let author = store
            .users
            .get(sender)
            .map(|r| r.user.clone())
            .ok_or(ChatError::Unauthorized)?;
        if !store.rooms.contains_key(room_id) {
            return Err(ChatError::Validation("Room does not exist".into()));
        }

        let message = Message {
            message_id: new_id(),
            room_id: room_id.to_string(),
            sender: author.username.clone(),
            display_name: author.display_name.clone(),
            content: content.to_string(),
            msg_type,
            timestamp: now(),
            avatar_color: author.avatar_color.clone(),
        };

        let mentioned: HashSet<String> = self
            .mention_re
            .captures_iter(content)
            .map(|c| c[1].to_string())
            .filter(|name| name != sender && store.users.contains_key(name))
            .collect();

        if let Some(room) = store.rooms.get_mut(room_id) {
            room.join(sender);
            room.messages.push(message.clone());
        }
        store
            .undo
            .entry((room_id.to_string(), sender.to_string()))
            .or_default()
            .push(message.message_id.clone());

        let preview: String = content.chars().take(PREVIEW_CHARS).collect();
        for name in mentioned {
            let inbox = store.notifications.entry(name).or_default();
            inbox.push_front(Notification {
                id: new_id(),
                kind: "mention".to_string(),
                room_id: room_id.to_string(),
                from: sender.to_string(),
                preview: preview.clone(),
                timestamp: message.timestamp,
            });
            inbox.truncate(MAX_NOTIFICATIONS);
        }

        Ok(message)
    }

    /// Delete the caller's most recent message in the room. Returns its id.
    pub fn undo_last_message(&self, room_id: &str, username: &str) -> Result<String, ChatError> {
        let mut store = write(&self.store);
        let key = (room_id.to_string(), username.to_string());
        let message_id = store
            .undo
            .get_mut(&key)
            .and_then(Vec::pop)
            .ok_or(ChatError::NothingToUndo)?;
        if let Some(room) = store.rooms.get_mut(room_id) {
            room.messages.retain(|m| m.message_id != message_id);
        }
        debug!(room_id, username, message_id = %message_id, "message undone");
        Ok(message_id)
    }

    /// Case-insensitive substring search, newest first.
    pub fn search_messages(&self, room_id: &str, query: &str) -> Vec<Message> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Vec::new();
        }
        let store = read(&self.store);
        let Some(room) = store.rooms.get(room_id) else {
            return Vec::new();
        };
        room.messages
            .iter()
            .rev()
            .filter(|m| m.content.to_lowercase().contains(&needle))
            .take(MAX_SEARCH_RESULTS)
            .cloned()
            .collect()
    }

    // ── Notifications & stats ───────────────────────────────────────────────

    pub fn notifications(&self, username: &str) -> Vec<Notification> {
        read(&self.store)
            .notifications
            .get(username)
            .map(|inbox| inbox.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn clear_notifications(&self, username: &str) -> usize {
        write(&self.store)
            .notifications
            .remove(username)
            .map(|inbox| inbox.len())
            .unwrap_or(0)
    }

    pub fn stats(&self) -> ChatStats {
        let store = read(&self.store);
        ChatStats {
            users: store.users.len(),
            rooms: store.rooms.len(),
            messages: store.rooms.values().map(|r| r.messages.len()).sum(),
            online: store.online.len(),
        }
    }
}

fn validate_username(username: &str) -> Result<(), ChatError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ChatError::Validation("Username must be 3-32 characters".into()));
    }
    if !username.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ChatError::Validation(
            "Username may only contain letters, digits and underscores".into(),
        ));
    }
    Ok(())
}

fn avatar_color(username: &str) -> &'static str {
    let hash = username
        .bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize));
    AVATAR_PALETTE[hash % AVATAR_PALETTE.len()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn engine() -> ChatEngine {
        ChatEngine::new(ChatConfig::default(), PasswordHasher::new(1024, 1).unwrap())
    }

    fn engine_with_page_size(page_size: usize) -> ChatEngine {
        let config = ChatConfig { page_size, ..ChatConfig::default() };
        ChatEngine::new(config, PasswordHasher::new(1024, 1).unwrap())
    }

    #[test]
    fn test_register_and_login() {
        let engine = engine();
        let user = engine.register("alice", "secret1", "Alice A").unwrap();
        assert_eq!(user.display_name, "Alice A");

        let (token, logged_in) = engine.login("alice", "secret1").unwrap();
        assert_eq!(logged_in.username, "alice");
        assert_eq!(engine.user_by_token(&token).unwrap().username, "alice");

        engine.logout(&token);
        assert!(engine.user_by_token(&token).is_none());
    }

    #[test]
    fn test_register_rejects_duplicates_and_bad_input() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        assert!(matches!(engine.register("alice", "secret2", ""), Err(ChatError::UsernameTaken)));
        assert!(matches!(engine.register("al", "secret1", ""), Err(ChatError::Validation(_))));
        assert!(matches!(engine.register("bad name", "secret1", ""), Err(ChatError::Validation(_))));
        assert!(matches!(engine.register("bobby", "123", ""), Err(ChatError::Validation(_))));
    }

    #[test]
    fn test_display_name_defaults_to_username() {
        let engine = engine();
        assert_eq!(engine.register("carol", "secret1", "  ").unwrap().display_name, "carol");
    }

    #[test]
    fn test_wrong_password_is_invalid_credentials() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        assert!(matches!(engine.login("alice", "nope"), Err(ChatError::InvalidCredentials)));
        assert!(matches!(engine.login("ghost", "secret1"), Err(ChatError::InvalidCredentials)));
    }

    #[test]
    fn test_default_room_exists() {
        let engine = engine();
        let rooms = engine.rooms();
        assert_eq!(rooms.len(), 1);
        assert_eq!(rooms[0].room_id, "general");
    }

    #[test]
    fn test_create_room_joins_creator() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        let room = engine.create_room("  Rustaceans ", "crabs", "alice").unwrap();
        assert_eq!(room.name, "Rustaceans");
        assert_eq!(room.participant_count, 1);
        assert_eq!(engine.rooms().last().unwrap().room_id, room.room_id);
        assert!(engine.create_room("   ", "", "alice").is_err());
    }

    #[test]
    fn test_join_unknown_room_is_not_found() {
        let engine = engine();
        assert!(matches!(engine.join_room("nope", "alice"), Err(ChatError::NotFound("Room"))));
    }

    #[test]
    fn test_pagination_newest_first_pages_oldest_first_within() {
        let engine = engine_with_page_size(2);
        engine.register("alice", "secret1", "").unwrap();
        for i in 1..=5 {
            engine.send_message("general", "alice", &format!("m{i}"), "text").unwrap();
        }

        let contents = |page: &MessagePage| page.messages.iter().map(|m| m.content.clone()).collect::<Vec<_>>();

        let p1 = engine.messages("general", 1).unwrap();
        assert_eq!(contents(&p1), vec!["m4", "m5"]);
        assert!(p1.has_more);
        assert_eq!(p1.total, 5);

        let p3 = engine.messages("general", 3).unwrap();
        assert_eq!(contents(&p3), vec!["m1"]);
        assert!(!p3.has_more);

        let p4 = engine.messages("general", 4).unwrap();
        assert!(p4.messages.is_empty());
        assert!(!p4.has_more);
    }

    #[test]
    fn test_send_validates_content_and_room() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        assert!(matches!(engine.send_message("general", "alice", "   ", "text"), Err(ChatError::Validation(_))));
        assert!(matches!(engine.send_message("nope", "alice", "hi", "text"), Err(ChatError::Validation(_))));
        assert!(matches!(engine.send_message("general", "alice", "hi", "video"), Err(ChatError::Validation(_))));
        let long = "x".repeat(2001);
        assert!(engine.send_message("general", "alice", &long, "text").is_err());
    }

    #[test]
    fn test_send_auto_joins_sender() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        engine.send_message("general", "alice", "hello", "").unwrap();
        let participants = engine.participants("general");
        assert_eq!(participants.len(), 1);
        assert_eq!(participants[0].username, "alice");
    }

    #[test]
    fn test_undo_removes_only_own_latest() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        engine.register("bobby", "secret1", "").unwrap();
        let first = engine.send_message("general", "alice", "one", "text").unwrap();
        let second = engine.send_message("general", "alice", "two", "text").unwrap();
        engine.send_message("general", "bobby", "three", "text").unwrap();

        assert_eq!(engine.undo_last_message("general", "alice").unwrap(), second.message_id);
        assert_eq!(engine.undo_last_message("general", "alice").unwrap(), first.message_id);
        assert!(matches!(engine.undo_last_message("general", "alice"), Err(ChatError::NothingToUndo)));

        let remaining = engine.messages("general", 1).unwrap();
        assert_eq!(remaining.messages.len(), 1);
        assert_eq!(remaining.messages[0].sender, "bobby");
    }

    #[test]
    fn test_search_is_case_insensitive_newest_first() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        engine.send_message("general", "alice", "Rust is great", "text").unwrap();
        engine.send_message("general", "alice", "so is tokio", "text").unwrap();
        engine.send_message("general", "alice", "RUST again", "text").unwrap();

        let hits = engine.search_messages("general", "rust");
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].content, "RUST again");
        assert!(engine.search_messages("general", "  ").is_empty());
    }

    #[test]
    fn test_mentions_notify_other_known_users() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        engine.register("bobby", "secret1", "").unwrap();
        engine
            .send_message("general", "alice", "hey @bobby and @alice and @nobody", "text")
            .unwrap();

        let inbox = engine.notifications("bobby");
        assert_eq!(inbox.len(), 1);
        assert_eq!(inbox[0].from, "alice");
        assert_eq!(inbox[0].kind, "mention");
        assert!(engine.notifications("alice").is_empty());

        assert_eq!(engine.clear_notifications("bobby"), 1);
        assert!(engine.notifications("bobby").is_empty());
    }

    #[test]
    fn test_presence_is_reference_counted() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        engine.set_online("alice");
        engine.set_online("alice");
        engine.set_offline("alice");
        assert!(engine.is_online("alice"));
        engine.set_offline("alice");
        assert!(!engine.is_online("alice"));
        engine.set_offline("alice");
        assert!(engine.online_users().is_empty());
    }

    #[test]
    fn test_stats_counts_everything() {
        let engine = engine();
        engine.register("alice", "secret1", "").unwrap();
        engine.create_room("dev", "", "alice").unwrap();
        engine.send_message("general", "alice", "hi", "text").unwrap();
        engine.set_online("alice");
        assert_eq!(
            engine.stats(),
            ChatStats { users: 1, rooms: 2, messages: 1, online: 1 }
        );
    }

    #[test]
    fn test_avatar_color_is_deterministic() {
        assert_eq!(avatar_color("alice"), avatar_color("alice"));
        assert!(AVATAR_PALETTE.contains(&avatar_color("zed")));
    }
}
