//! Thin REST client for the chat API.

use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::ClientError;
use crate::models::{Message, Room, User};

#[derive(Debug, Clone)]
pub struct ChatApi {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl ChatApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { http: reqwest::Client::new(), base_url: base_url.into(), token: None }
    }

    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        let req = self.http.request(method, url);
        match &self.token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    async fn call(&self, req: RequestBuilder) -> Result<Value, ClientError> {
        let resp = req.send().await?;
        let status = resp.status();
        let body: Value = resp.json().await.unwrap_or_default();
        if !status.is_success() {
            let message = body["error"].as_str().unwrap_or("request failed").to_string();
            return Err(ClientError::Status { status: status.as_u16(), message });
        }
        Ok(body)
    }

    fn field<T: DeserializeOwned>(body: &Value, key: &str) -> Result<T, ClientError> {
        serde_json::from_value(body[key].clone())
            .map_err(|e| ClientError::Decode(format!("field '{key}': {e}")))
    }

    pub async fn register(&self, username: &str, password: &str, display_name: &str) -> Result<User, ClientError> {
        let body = self
            .call(self.request(Method::POST, "/api/auth/register").json(&json!({
                "username": username,
                "password": password,
                "display_name": display_name,
            })))
            .await?;
        Self::field(&body, "user")
    }

    /// Stores the session token for subsequent calls.
    pub async fn login(&mut self, username: &str, password: &str) -> Result<User, ClientError> {
        let body = self
            .call(
                self.request(Method::POST, "/api/auth/login")
                    .json(&json!({ "username": username, "password": password })),
            )
            .await?;
        self.token = Some(Self::field(&body, "token")?);
        Self::field(&body, "user")
    }

    pub async fn rooms(&self) -> Result<Vec<Room>, ClientError> {
        let body = self.call(self.request(Method::GET, "/api/rooms")).await?;
        Self::field(&body, "rooms")
    }

    pub async fn create_room(&self, name: &str, description: &str) -> Result<Room, ClientError> {
        let body = self
            .call(
                self.request(Method::POST, "/api/rooms")
                    .json(&json!({ "name": name, "description": description })),
            )
            .await?;
        Self::field(&body, "room")
    }

    pub async fn send(&self, room_id: &str, content: &str, msg_type: &str) -> Result<Message, ClientError> {
        let body = self
            .call(
                self.request(Method::POST, &format!("/api/rooms/{room_id}/messages"))
                    .json(&json!({ "content": content, "msg_type": msg_type })),
            )
            .await?;
        Self::field(&body, "message")
    }

    /// Returns the id of the deleted message.
    pub async fn undo(&self, room_id: &str) -> Result<String, ClientError> {
        let body = self
            .call(self.request(Method::DELETE, &format!("/api/rooms/{room_id}/messages/undo")))
            .await?;
        Self::field(&body, "message_id")
    }

    pub async fn typing(&self, room_id: &str, is_typing: bool) -> Result<(), ClientError> {
        let resp = self
            .request(Method::POST, &format!("/sse/{room_id}/typing"))
            .json(&json!({ "is_typing": is_typing }))
            .send()
            .await?;
        resp.error_for_status()?;
        Ok(())
    }
}
