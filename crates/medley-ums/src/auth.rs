//! UMS accounts and bearer sessions.
//!
//! Routes live under `/api/ums/auth/` so they can share a server with the
//! chat service's `/api/auth/`. A valid session is demanded on the resource
//! routes by [`require_session`], which also hands the signed-in [`Account`]
//! to the handler as a request extension.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use medley_common::sync::{read, write};
use medley_common::{new_id, now};
use medley_config::SecurityConfig;
use medley_security::{new_session_token, PasswordHasher, SecurityError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info};

use crate::error::UmsError;
use crate::handlers::UmsJson;
use crate::resource::{email as validate_email, required};

const MIN_PASSWORD: usize = 6;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Faculty,
    #[default]
    Student,
}

/// A UMS login, as returned to clients.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub created_at: DateTime<Utc>,
}

struct AccountRecord {
    account: Account,
    password_hash: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub role: Role,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Default)]
struct Store {
    /// Keyed by lowercased email.
    accounts: HashMap<String, AccountRecord>,
    /// Session token to account email.
    sessions: HashMap<String, String>,
}

pub struct UmsAuth {
    hasher: PasswordHasher,
    store: RwLock<Store>,
}

pub type SharedAuth = Arc<UmsAuth>;

impl UmsAuth {
    pub fn from_config(security: &SecurityConfig) -> Result<Self, SecurityError> {
        let hasher = PasswordHasher::new(security.argon2_memory_kib, security.argon2_iterations)?;
        Ok(Self::new(hasher))
    }

    pub fn new(hasher: PasswordHasher) -> Self {
        Self { hasher, store: RwLock::new(Store::default()) }
    }

    pub fn register(&self, req: RegisterRequest) -> Result<Account, UmsError> {
        required("name", &req.name)?;
        validate_email(&req.email)?;
        if req.password.chars().count() < MIN_PASSWORD {
            return Err(UmsError::Validation(format!("password must be at least {MIN_PASSWORD} characters")));
        }
        let key = req.email.trim().to_lowercase();
        if read(&self.store).accounts.contains_key(&key) {
            return Err(taken(&key));
        }

        let password_hash = self.hasher.hash(&req.password).map_err(|e| UmsError::Internal(e.to_string()))?;
        let account = Account {
            id: new_id(),
            name: req.name.trim().to_string(),
            email: key.clone(),
            role: req.role,
            created_at: now(),
        };

        let mut store = write(&self.store);
        if store.accounts.contains_key(&key) {
            return Err(taken(&key));
        }
        store.accounts.insert(key, AccountRecord { account: account.clone(), password_hash });
        info!(email = %account.email, role = ?account.role, "registered ums account");
        Ok(account)
    }

    /// A fresh session token for matching credentials.
    pub fn login(&self, email: &str, password: &str) -> Result<(String, Account), UmsError> {
        let key = email.trim().to_lowercase();
        let (account, hash) = {
            let store = read(&self.store);
            let record = store.accounts.get(&key).ok_or_else(invalid_credentials)?;
            (record.account.clone(), record.password_hash.clone())
        };
        if !self.hasher.verify(password, &hash) {
            return Err(invalid_credentials());
        }
        let token = new_session_token();
        write(&self.store).sessions.insert(token.clone(), key);
        debug!(email = %account.email, "ums login");
        Ok((token, account))
    }

    pub fn logout(&self, token: &str) -> bool {
        write(&self.store).sessions.remove(token).is_some()
    }

    pub fn account_by_token(&self, token: &str) -> Option<Account> {
        let store = read(&self.store);
        let key = store.sessions.get(token)?;
        store.accounts.get(key).map(|r| r.account.clone())
    }

    pub fn len(&self) -> usize {
        read(&self.store).accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn taken(email: &str) -> UmsError {
    UmsError::Conflict(format!("User with email '{email}' already exists"))
}

fn invalid_credentials() -> UmsError {
    UmsError::Unauthorized("Invalid email or password")
}

fn bearer<B>(req: &Request<B>) -> Option<&str> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

/// Answers 401 unless the request carries a live session token.
pub async fn require_session(State(auth): State<SharedAuth>, mut req: Request<Body>, next: Next) -> Response {
    let Some(token) = bearer(&req).map(str::to_owned) else {
        return UmsError::Unauthorized("Not authorized, no token").into_response();
    };
    let Some(account) = auth.account_by_token(&token) else {
        return UmsError::Unauthorized("Not authorized, token invalid").into_response();
    };
    req.extensions_mut().insert(Session(token));
    req.extensions_mut().insert(account);
    next.run(req).await
}

/// The bearer token [`require_session`] accepted.
#[derive(Debug, Clone)]
pub struct Session(pub String);

async fn hashing<T, F>(auth: SharedAuth, f: F) -> Result<T, UmsError>
where
    F: FnOnce(&UmsAuth) -> Result<T, UmsError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&auth))
        .await
        .map_err(|e| UmsError::Internal(format!("worker panicked: {e}")))?
}

/// POST /api/ums/auth/register
pub async fn register(
    State(auth): State<SharedAuth>,
    UmsJson(req): UmsJson<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>), UmsError> {
    let email = req.email.clone();
    let password = req.password.clone();
    let (token, account) = hashing(auth, move |auth| {
        auth.register(req)?;
        auth.login(&email, &password)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "token": token, "user": account }))))
}

/// POST /api/ums/auth/login
pub async fn login(State(auth): State<SharedAuth>, UmsJson(req): UmsJson<LoginRequest>) -> Result<Json<Value>, UmsError> {
    let (token, account) = hashing(auth, move |auth| auth.login(&req.email, &req.password)).await?;
    Ok(Json(json!({ "success": true, "token": token, "user": account })))
}

/// GET /api/ums/auth/me
pub async fn me(Extension(account): Extension<Account>) -> Json<Value> {
    Json(json!({ "success": true, "data": account }))
}

/// POST /api/ums/auth/logout
pub async fn logout(State(auth): State<SharedAuth>, Extension(Session(token)): Extension<Session>) -> Json<Value> {
    auth.logout(&token);
    Json(json!({ "success": true, "message": "Logged out" }))
}
