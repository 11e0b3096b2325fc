#![allow(dead_code)]

pub mod api_app;
pub mod mock_openai;

use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub text: String,
    pub body: Value,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn error_code(&self) -> Option<&str> {
        self.body.get("error")?.get("code")?.as_str()
    }

    pub fn error_field(&self) -> Option<&str> {
        self.body.get("error")?.get("field")?.as_str()
    }
}

pub async fn send(app: &axum::Router, request: Request<Body>) -> TestResponse {
    let response = app
        .clone()
        .oneshot(request)
        .await
        .expect("request should succeed");
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body should read");
    let text = String::from_utf8(bytes.to_vec()).expect("response body should be utf-8");
    let body = serde_json::from_str::<Value>(&text).unwrap_or_else(|_| json!({}));

    TestResponse {
        status,
        headers,
        text,
        body,
    }
}

pub fn post_json(path: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(&body).expect("json body should serialize"),
        ))
        .expect("integration request should build")
}

pub fn get(path: &str) -> Request<Body> {
    Request::builder()
        .method(Method::GET)
        .uri(path)
        .body(Body::empty())
        .expect("integration request should build")
}

/// Serves `app` on an ephemeral local port until dropped.
pub struct LocalServer {
    pub base_url: String,
    handle: tokio::task::JoinHandle<()>,
}

impl LocalServer {
    pub async fn start(app: axum::Router) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("test listener should bind");
        let bind_addr = listener
            .local_addr()
            .expect("test listener local address should exist");

        let handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .await
                .expect("test server should run");
        });

        Self {
            base_url: format!("http://{bind_addr}"),
            handle,
        }
    }
}

impl Drop for LocalServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
