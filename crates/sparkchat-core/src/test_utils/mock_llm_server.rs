// src/test_utils/mock_llm_server.rs
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::post, Json, Router};
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

/// One scripted reply, served in order.
#[derive(Debug, Clone)]
pub struct MockReply {
    pub status: u16,
    pub body: String,
    pub delay: Option<Duration>,
}

impl MockReply {
    pub fn content(text: &str) -> Self {
        let body = json!({
            "id": "chatcmpl-mock",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": text},
                "finish_reason": "stop"
            }]
        });
        Self {
            status: 200,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn raw(body: &str) -> Self {
        Self::status(200, body)
    }

    pub fn delayed(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

#[derive(Clone)]
struct MockServerState {
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

async fn chat_completions_handler(
    State(state): State<MockServerState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    state.requests.lock().unwrap().push(RecordedRequest {
        authorization,
        body,
    });

    let reply = state.replies.lock().unwrap().pop_front();
    match reply {
        Some(reply) => {
            if let Some(delay) = reply.delay {
                tokio::time::sleep(delay).await;
            }
            let status = StatusCode::from_u16(reply.status)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
            (
                status,
                [(header::CONTENT_TYPE, "application/json")],
                reply.body,
            )
                .into_response()
        }
        None => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}

pub struct MockLLMServer {
    addr: SocketAddr,
    shutdown_tx: tokio::sync::oneshot::Sender<()>,
    recorded_requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockLLMServer {
    pub async fn start(replies: Vec<MockReply>) -> Self {
        let state = MockServerState {
            replies: Arc::new(Mutex::new(VecDeque::from(replies))),
            requests: Arc::new(Mutex::new(Vec::new())),
        };
        let recorded_requests = state.requests.clone();

        let app = Router::new()
            .route("/chat/completions", post(chat_completions_handler))
            .with_state(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await;
        });

        MockLLMServer {
            addr,
            shutdown_tx,
            recorded_requests,
        }
    }

    pub fn address(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn get_requests(&self) -> Vec<RecordedRequest> {
        self.recorded_requests.lock().unwrap().clone()
    }
}
