//! Bearer-token extractor for authenticated chat routes.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::request::Parts;
use axum_extra::headers::authorization::Bearer;
use axum_extra::headers::Authorization;
use axum_extra::TypedHeader;

use crate::error::ChatError;
use crate::models::User;
use crate::state::SharedState;

/// The user owning the request's session token.
pub struct CurrentUser {
    pub user: User,
    pub token: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    SharedState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ChatError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let TypedHeader(Authorization(bearer)) =
            TypedHeader::<Authorization<Bearer>>::from_request_parts(parts, state)
                .await
                .map_err(|_| ChatError::Unauthorized)?;
        let state = SharedState::from_ref(state);
        let token = bearer.token().to_string();
        let user = state.engine.user_by_token(&token).ok_or(ChatError::Unauthorized)?;
        Ok(Self { user, token })
    }
}
