//! Request builders and a throwaway server for exercising Axum routers in
//! tests.

use std::net::SocketAddr;

use axum::body::{to_bytes, Body};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tower::ServiceExt;

const MAX_BODY: usize = 16 * 1024 * 1024;

/// Builder for a single in-process request.
pub struct TestRequest {
    method: Method,
    uri: String,
    headers: Vec<(HeaderName, HeaderValue)>,
    body: Body,
}

impl TestRequest {
    pub fn new(method: Method, uri: impl Into<String>) -> Self {
        Self { method, uri: uri.into(), headers: Vec::new(), body: Body::empty() }
    }

    pub fn get(uri: impl Into<String>) -> Self { Self::new(Method::GET, uri) }
    pub fn post(uri: impl Into<String>) -> Self { Self::new(Method::POST, uri) }
    pub fn put(uri: impl Into<String>) -> Self { Self::new(Method::PUT, uri) }
    pub fn patch(uri: impl Into<String>) -> Self { Self::new(Method::PATCH, uri) }
    pub fn delete(uri: impl Into<String>) -> Self { Self::new(Method::DELETE, uri) }

    pub fn header(mut self, name: &'static str, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.push((HeaderName::from_static(name), value));
        }
        self
    }

    pub fn bearer(self, token: &str) -> Self {
        self.header("authorization", &format!("Bearer {token}"))
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        let bytes = serde_json::to_vec(body).unwrap_or_default();
        self.headers.push((header::CONTENT_TYPE, HeaderValue::from_static("application/json")));
        self.body = Body::from(bytes);
        self
    }

    /// Raw body with an explicit content type.
    pub fn body(mut self, content_type: &str, body: impl Into<Body>) -> Self {
        if let Ok(value) = HeaderValue::from_str(content_type) {
            self.headers.push((header::CONTENT_TYPE, value));
        }
        self.body = body.into();
        self
    }

    pub fn build(self) -> Request<Body> {
        let mut request = Request::new(self.body);
        *request.method_mut() = self.method;
        *request.uri_mut() = self.uri.parse().unwrap_or_default();
        for (name, value) in self.headers {
            request.headers_mut().append(name, value);
        }
        request
    }

    /// Run through `router` without binding a socket.
    pub async fn send(self, router: &Router) -> TestResponse {
        let response = router
            .clone()
            .oneshot(self.build())
            .await
            .unwrap_or_else(|never| match never {});
        let status = response.status();
        let headers = response.headers().clone();
        let body = to_bytes(response.into_body(), MAX_BODY).await.unwrap_or_default();
        TestResponse { status, headers, body: body.to_vec() }
    }
}

#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl TestResponse {
    /// Body as JSON; `Value::Null` when empty or not JSON.
    pub fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap_or(Value::Null)
    }

    pub fn parse<T: DeserializeOwned>(&self) -> T {
        serde_json::from_slice(&self.body).expect("response body did not match the expected type")
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Serve `router` on an ephemeral loopback port for the rest of the test.
pub async fn spawn_server(router: Router) -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await;
    });
    addr
}
