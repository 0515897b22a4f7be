//! Chat routes.

use axum::{
    routing::{delete, get, post},
    Router,
};

use crate::handlers::{
    clear_notifications, create_room, join_room, leave_room, list_messages, list_rooms, login, logout,
    notifications, online_users, participants, register, search, send_message, stats, undo_message,
};
use crate::sse::{room_stream, typing};
use crate::state::SharedState;

/// Build the chat router with its state applied.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        // Auth
        .route("/api/auth/register", post(register))
        .route("/api/auth/login",    post(login))
        .route("/api/auth/logout",   post(logout))

        // Users
        .route("/api/users/online",              get(online_users))
        .route("/api/users/notifications",       get(notifications))
        .route("/api/users/notifications/clear", post(clear_notifications))
        .route("/api/stats",                     get(stats))

        // Rooms
        .route("/api/rooms",                            get(list_rooms).post(create_room))
        .route("/api/rooms/{room_id}/join",             post(join_room))
        .route("/api/rooms/{room_id}/leave",            post(leave_room))
        .route("/api/rooms/{room_id}/participants",     get(participants))
        .route("/api/rooms/{room_id}/messages",         get(list_messages).post(send_message))
        .route("/api/rooms/{room_id}/messages/undo",    delete(undo_message))
        .route("/api/rooms/{room_id}/search",           get(search))

        // Live updates
        .route("/sse/{room_id}",        get(room_stream))
        .route("/sse/{room_id}/typing", post(typing))

        .with_state(state)
}
