//! Per-room Server-Sent Events stream and the typing side channel.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Response};
use futures_util::stream::{self, Stream};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::handlers::ChatQuery;
use crate::hub::Frame;
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    #[serde(default)]
    pub token: String,
}

#[derive(Debug, Default, Deserialize)]
struct TypingBody {
    #[serde(default)]
    is_typing: bool,
}

/// One open SSE stream. Dropping it (client gone, or the hub evicted the
/// subscriber) unsubscribes, marks the user offline and announces the leave.
struct Connection {
    state: SharedState,
    room_id: String,
    username: String,
    sub_id: u64,
    rx: mpsc::Receiver<Frame>,
    greeted: bool,
    ping_every: Duration,
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.state.hub.unsubscribe(&self.room_id, self.sub_id);
        self.state.engine.set_offline(&self.username);
        self.state.hub.broadcast(
            &self.room_id,
            &ChatEvent::UserLeft { username: self.username.clone() },
            None,
        );
        info!(room_id = %self.room_id, username = %self.username, "sse stream closed");
    }
}

fn data_event(event: &ChatEvent) -> Event {
    Event::default().data(serde_json::to_string(event).unwrap_or_default())
}

/// GET /sse/{room_id}?token=...
pub async fn room_stream(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    ChatQuery(query): ChatQuery<StreamQuery>,
) -> Result<Response, ChatError> {
    let user = state.engine.user_by_token(&query.token).ok_or(ChatError::Unauthorized)?;
    state.engine.join_room(&room_id, &user.username)?;
    state.engine.set_online(&user.username);

    let sub = state.hub.subscribe(&room_id, &user.username);
    state.hub.broadcast(
        &room_id,
        &ChatEvent::UserJoined {
            username: user.username.clone(),
            display_name: user.display_name.clone(),
            avatar_color: user.avatar_color.clone(),
        },
        Some(&user.username),
    );
    info!(room_id = %room_id, username = %user.username, "sse stream opened");

    let conn = Connection {
        ping_every: Duration::from_secs(state.config.ping_interval_secs.max(1)),
        state,
        room_id,
        username: user.username,
        sub_id: sub.id,
        rx: sub.rx,
        greeted: false,
    };

    let mut response = Sse::new(event_stream(conn)).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    Ok(response)
}

fn event_stream(conn: Connection) -> impl Stream<Item = Result<Event, Infallible>> {
    stream::unfold(conn, |mut conn| async move {
        if !conn.greeted {
            conn.greeted = true;
            let hello = ChatEvent::Connected { username: conn.username.clone() };
            return Some((Ok(data_event(&hello)), conn));
        }
        match tokio::time::timeout(conn.ping_every, conn.rx.recv()).await {
            Ok(Some(frame)) => Some((Ok(Event::default().data(&*frame)), conn)),
            // Evicted by the hub
            Ok(None) => None,
            Err(_) => Some((Ok(data_event(&ChatEvent::Ping)), conn)),
        }
    })
}

/// POST /sse/{room_id}/typing. Always 204; unauthenticated or malformed
/// requests are ignored.
pub async fn typing(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));
    let Some(user) = token.and_then(|t| state.engine.user_by_token(t)) else {
        return StatusCode::NO_CONTENT;
    };

    let body: TypingBody = serde_json::from_slice(&body).unwrap_or_default();
    let delivered = state.hub.broadcast(
        &room_id,
        &ChatEvent::Typing { username: user.username.clone(), is_typing: body.is_typing },
        Some(&user.username),
    );
    debug!(room_id = %room_id, username = %user.username, delivered, "typing relayed");
    StatusCode::NO_CONTENT
}
