//! Throwaway chat completion endpoint for tests.

use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{Value, json};

/// Base URL nothing listens on.
pub const UNREACHABLE_BASE_URL: &str = "http://127.0.0.1:9/v1";

/// A request seen by the fake endpoint.
#[derive(Clone, Debug)]
pub struct Recorded {
    pub body: Value,
    pub authorization: Option<String>,
    pub title: Option<String>,
}

struct Inner {
    status: StatusCode,
    reply: Value,
    requests: Mutex<Vec<Recorded>>,
}

/// Local server answering `POST /v1/chat/completions` with a canned response.
pub struct FakeCompletions {
    pub base_url: String,
    inner: Arc<Inner>,
}

impl FakeCompletions {
    pub async fn start(status: StatusCode, reply: Value) -> Self {
        let inner = Arc::new(Inner {
            status,
            reply,
            requests: Mutex::new(Vec::new()),
        });
        let app = Router::new()
            .route("/v1/chat/completions", post(handle))
            .with_state(Arc::clone(&inner));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}/v1"),
            inner,
        }
    }

    pub async fn replying(text: &str) -> Self {
        Self::start(
            StatusCode::OK,
            json!({
                "id": "chatcmpl-test",
                "object": "chat.completion",
                "choices": [{
                    "index": 0,
                    "message": { "role": "assistant", "content": text },
                    "finish_reason": "stop"
                }]
            }),
        )
        .await
    }

    pub fn requests(&self) -> Vec<Recorded> {
        self.inner.requests.lock().unwrap().clone()
    }
}

async fn handle(
    State(inner): State<Arc<Inner>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    };
    inner.requests.lock().unwrap().push(Recorded {
        body,
        authorization: header("authorization"),
        title: header("x-title"),
    });
    (inner.status, Json(inner.reply.clone()))
}
