//! Typing indicators.
//!
//! [`TypingTracker`] is the receiving side: who is typing in the room right
//! now. [`TypingNotifier`] is the sending side: when to tell the server that
//! the local user started or stopped typing.

use std::time::Duration;

use tokio::time::Instant;

pub const TYPING_WINDOW: Duration = Duration::from_secs(3);
pub const IDLE_AFTER: Duration = Duration::from_millis(1200);

#[derive(Debug)]
pub struct TypingTracker {
    me: String,
    window: Duration,
    /// (username, deadline) in first-appearance order
    peers: Vec<(String, Instant)>,
}

impl TypingTracker {
    pub fn new(me: impl Into<String>) -> Self {
        Self::with_window(me, TYPING_WINDOW)
    }

    pub fn with_window(me: impl Into<String>, window: Duration) -> Self {
        Self { me: me.into(), window, peers: Vec::new() }
    }

    /// Apply a `typing` event received at `now`.
    pub fn typing(&mut self, username: &str, is_typing: bool, now: Instant) {
        if username == self.me {
            return;
        }
        if !is_typing {
            self.peers.retain(|(name, _)| name != username);
            return;
        }
        let deadline = now + self.window;
        match self.peers.iter_mut().find(|(name, _)| name == username) {
            Some(entry) => entry.1 = deadline,
            None => self.peers.push((username.to_string(), deadline)),
        }
    }

    /// Drop peers whose deadline has passed.
    pub fn expire(&mut self, now: Instant) {
        self.peers.retain(|(_, deadline)| *deadline > now);
    }

    pub fn typing_users(&self) -> Vec<&str> {
        self.peers.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}

/// Debounces the local user's keystrokes into typing start/stop signals.
#[derive(Debug)]
pub struct TypingNotifier {
    idle_after: Duration,
    last_keystroke: Option<Instant>,
}

impl Default for TypingNotifier {
    fn default() -> Self {
        Self::new(IDLE_AFTER)
    }
}

impl TypingNotifier {
    pub fn new(idle_after: Duration) -> Self {
        Self { idle_after, last_keystroke: None }
    }

    /// Returns `Some(true)` when this keystroke starts a typing burst.
    pub fn keystroke(&mut self, now: Instant) -> Option<bool> {
        let started = self.last_keystroke.is_none();
        self.last_keystroke = Some(now);
        started.then_some(true)
    }

    /// Returns `Some(false)` once the burst has been idle long enough.
    pub fn tick(&mut self, now: Instant) -> Option<bool> {
        match self.last_keystroke {
            Some(last) if now.duration_since(last) >= self.idle_after => {
                self.last_keystroke = None;
                Some(false)
            }
            _ => None,
        }
    }

    /// Sending a message ends any burst immediately.
    pub fn message_sent(&mut self) -> Option<bool> {
        self.last_keystroke.take().map(|_| false)
    }

    /// When `tick` should next be called, if a burst is in progress.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.last_keystroke.map(|last| last + self.idle_after)
    }
}
