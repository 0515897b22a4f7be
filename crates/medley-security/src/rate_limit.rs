//! Fixed-window request limiter keyed by client.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use axum::extract::ConnectInfo;
use axum::http::Request;
use medley_common::sync::lock;

/// Purge expired windows once the table grows past this many keys.
const PURGE_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone)]
struct Window {
    started: Instant,
    hits: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_after: Duration,
}

#[derive(Debug)]
pub struct RateLimiter {
    window: Duration,
    max: u32,
    windows: Mutex<HashMap<String, Window>>,
}

impl RateLimiter {
    pub fn new(window: Duration, max: u32) -> Self {
        Self {
            window,
            max,
            windows: Mutex::new(HashMap::new()),
        }
    }

    pub fn check(&self, key: &str) -> RateDecision {
        self.check_at(key, Instant::now())
    }

    pub fn check_at(&self, key: &str, now: Instant) -> RateDecision {
        let mut windows = lock(&self.windows);
        if windows.len() > PURGE_THRESHOLD {
            let window = self.window;
            windows.retain(|_, w| now.duration_since(w.started) < window);
        }

        let entry = windows.entry(key.to_string()).or_insert(Window { started: now, hits: 0 });
        if now.duration_since(entry.started) >= self.window {
            entry.started = now;
            entry.hits = 0;
        }
        entry.hits = entry.hits.saturating_add(1);

        RateDecision {
            allowed: entry.hits <= self.max,
            limit: self.max,
            remaining: self.max.saturating_sub(entry.hits),
            reset_after: self.window.saturating_sub(now.duration_since(entry.started)),
        }
    }

    pub fn tracked_keys(&self) -> usize {
        lock(&self.windows).len()
    }
}

/// Identify the caller: socket peer address when the server was started with
/// connect info, otherwise the first `X-Forwarded-For` hop.
pub fn client_key<B>(req: &Request<B>) -> String {
    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        return addr.ip().to_string();
    }
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|raw| raw.split(',').next())
        .map(|first| first.trim().to_string())
        .filter(|first| !first.is_empty() && first.len() <= 64)
        .unwrap_or_else(|| "unknown".to_string())
}
