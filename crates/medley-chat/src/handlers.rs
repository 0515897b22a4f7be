//! REST handlers for accounts, rooms and messages.

use axum::{
    extract::{FromRequest, FromRequestParts, Path, State},
    http::{header, HeaderMap},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use crate::auth::CurrentUser;
use crate::engine::ChatEngine;
use crate::error::ChatError;
use crate::events::ChatEvent;
use crate::state::SharedState;

type ApiResult = Result<Json<Value>, ChatError>;

/// JSON body whose rejections become `400 {ok: false, error}`.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ChatError))]
pub struct ChatJson<T>(pub T);

/// Query string whose rejections become `400 {ok: false, error}`.
#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ChatError))]
pub struct ChatQuery<T>(pub T);

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub display_name: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct CreateRoomRequest {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub content: String,
    #[serde(default = "default_msg_type")]
    pub msg_type: String,
}

fn default_msg_type() -> String { "text".to_string() }

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default = "default_page")]
    pub page: usize,
}

fn default_page() -> usize { 1 }

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
}

/// Runs password hashing work off the async executor.
async fn blocking<T, F>(state: &SharedState, f: F) -> Result<T, ChatError>
where
    F: FnOnce(&ChatEngine) -> Result<T, ChatError> + Send + 'static,
    T: Send + 'static,
{
    let engine = state.engine.clone();
    tokio::task::spawn_blocking(move || f(&engine))
        .await
        .map_err(|e| ChatError::Internal(format!("worker panicked: {e}")))?
}

// ── Auth ──────────────────────────────────────────────────────────────────────

/// POST /api/auth/register
pub async fn register(
    State(state): State<SharedState>,
    ChatJson(req): ChatJson<RegisterRequest>,
) -> ApiResult {
    let user = blocking(&state, move |engine| {
        engine.register(&req.username, &req.password, &req.display_name)
    })
    .await?;
    Ok(Json(json!({ "ok": true, "user": user })))
}

/// POST /api/auth/login
pub async fn login(State(state): State<SharedState>, ChatJson(req): ChatJson<LoginRequest>) -> ApiResult {
    let (token, user) = blocking(&state, move |engine| engine.login(&req.username, &req.password)).await?;
    Ok(Json(json!({ "ok": true, "token": token, "user": user })))
}

/// POST /api/auth/logout. Succeeds with or without a valid token.
pub async fn logout(State(state): State<SharedState>, headers: HeaderMap) -> Json<Value> {
    if let Some(token) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
    {
        state.engine.logout(token);
    }
    Json(json!({ "ok": true }))
}

// ── Users ─────────────────────────────────────────────────────────────────────

/// GET /api/users/online
pub async fn online_users(State(state): State<SharedState>, _user: CurrentUser) -> Json<Value> {
    Json(json!({ "ok": true, "users": state.engine.online_users() }))
}

/// GET /api/users/notifications
pub async fn notifications(State(state): State<SharedState>, current: CurrentUser) -> Json<Value> {
    Json(json!({ "ok": true, "notifications": state.engine.notifications(&current.user.username) }))
}

/// POST /api/users/notifications/clear
pub async fn clear_notifications(State(state): State<SharedState>, current: CurrentUser) -> Json<Value> {
    let cleared = state.engine.clear_notifications(&current.user.username);
    Json(json!({ "ok": true, "cleared": cleared }))
}

/// GET /api/stats
pub async fn stats(State(state): State<SharedState>) -> Json<Value> {
    let stats = state.engine.stats();
    Json(json!({
        "ok": true,
        "users": stats.users,
        "rooms": stats.rooms,
        "messages": stats.messages,
        "online": stats.online,
    }))
}

// ── Rooms ─────────────────────────────────────────────────────────────────────

/// GET /api/rooms
pub async fn list_rooms(State(state): State<SharedState>, _user: CurrentUser) -> Json<Value> {
    Json(json!({ "ok": true, "rooms": state.engine.rooms() }))
}

/// POST /api/rooms
pub async fn create_room(
    State(state): State<SharedState>,
    current: CurrentUser,
    ChatJson(req): ChatJson<CreateRoomRequest>,
) -> ApiResult {
    let room = state.engine.create_room(&req.name, &req.description, &current.user.username)?;
    Ok(Json(json!({ "ok": true, "room": room })))
}

/// POST /api/rooms/{room_id}/join
pub async fn join_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    current: CurrentUser,
) -> ApiResult {
    let room = state.engine.join_room(&room_id, &current.user.username)?;
    Ok(Json(json!({ "ok": true, "room": room })))
}

/// POST /api/rooms/{room_id}/leave
pub async fn leave_room(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    current: CurrentUser,
) -> Json<Value> {
    state.engine.leave_room(&room_id, &current.user.username);
    Json(json!({ "ok": true }))
}

/// GET /api/rooms/{room_id}/participants
pub async fn participants(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    _user: CurrentUser,
) -> Json<Value> {
    Json(json!({ "ok": true, "participants": state.engine.participants(&room_id) }))
}

// ── Messages ──────────────────────────────────────────────────────────────────

/// GET /api/rooms/{room_id}/messages?page=N
pub async fn list_messages(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    ChatQuery(query): ChatQuery<PageQuery>,
    _user: CurrentUser,
) -> ApiResult {
    let page = state.engine.messages(&room_id, query.page)?;
    Ok(Json(json!({
        "ok": true,
        "messages": page.messages,
        "page": page.page,
        "has_more": page.has_more,
        "total": page.total,
    })))
}

/// POST /api/rooms/{room_id}/messages
pub async fn send_message(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    current: CurrentUser,
    ChatJson(req): ChatJson<SendMessageRequest>,
) -> ApiResult {
    let message = state
        .engine
        .send_message(&room_id, &current.user.username, &req.content, &req.msg_type)?;
    let delivered = state
        .hub
        .broadcast(&room_id, &ChatEvent::NewMessage { message: message.clone() }, None);
    debug!(room_id = %room_id, delivered, "message broadcast");
    Ok(Json(json!({ "ok": true, "message": message })))
}

/// DELETE /api/rooms/{room_id}/messages/undo
pub async fn undo_message(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    current: CurrentUser,
) -> ApiResult {
    let message_id = state.engine.undo_last_message(&room_id, &current.user.username)?;
    state
        .hub
        .broadcast(&room_id, &ChatEvent::MessageDeleted { message_id: message_id.clone() }, None);
    Ok(Json(json!({ "ok": true, "message_id": message_id })))
}

/// GET /api/rooms/{room_id}/search?q=...
pub async fn search(
    State(state): State<SharedState>,
    Path(room_id): Path<String>,
    ChatQuery(query): ChatQuery<SearchQuery>,
    _user: CurrentUser,
) -> Json<Value> {
    let results = state.engine.search_messages(&room_id, &query.q);
    Json(json!({ "ok": true, "query": query.q, "results": results }))
}
