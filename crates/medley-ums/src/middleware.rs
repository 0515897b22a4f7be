//! Request guards in front of the UMS routes.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use medley_security::{client_key, RateLimiter};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tracing::warn;

use crate::error::UmsError;


/// Fixed-window limit per client address. Over the limit the request is
/// answered with 429 and never reaches the handler.
pub async fn rate_limit(
    State(limiter): State<Arc<RateLimiter>>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let key = client_key(&req);
    let decision = limiter.check(&key);

    let mut response = if decision.allowed {
        next.run(req).await
    } else {
        warn!(client = %key, path = %req.uri().path(), "rate limit exceeded");
        UmsError::TooManyRequests.into_response()
    };

    let headers = response.headers_mut();
    headers.insert("x-ratelimit-limit", HeaderValue::from(decision.limit));
    headers.insert("x-ratelimit-remaining", HeaderValue::from(decision.remaining));
    headers.insert("x-ratelimit-reset", HeaderValue::from(decision.reset_after.as_secs()));
    response
}

/// CORS for the single configured frontend origin, cookies allowed.
pub fn frontend_cors(frontend_url: &str) -> CorsLayer {
    let origin = match HeaderValue::from_str(frontend_url.trim_end_matches('/')) {
        Ok(origin) => AllowOrigin::exact(origin),
        Err(e) => {
            warn!(frontend_url, "frontend url is not a valid origin, cross-origin requests will be refused: {e}");
            AllowOrigin::list(Vec::<HeaderValue>::new())
        }
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}
