//! A local HTTP embedding endpoint.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const EMBED_PATH: &str = "/api/embeddings";

#[derive(Debug, Clone)]
pub enum Behavior {
    /// `{"embedding": [...]}`.
    Embedding(Vec<f32>),
    /// `{"vector": [...]}` after a delay.
    Slow(Duration, Vec<f32>),
    /// Bare status code with no body.
    Status(u16),
    /// `{"embedding": []}`.
    Empty,
}

struct FakeState {
    behavior: Behavior,
    hits: AtomicUsize,
    requests: Mutex<Vec<Value>>,
}

pub struct FakeProvider {
    pub addr: SocketAddr,
    state: Arc<FakeState>,
    shutdown_tx: Option<oneshot::Sender<()>>,
    _server_handle: JoinHandle<()>,
}

impl FakeProvider {
    pub async fn spawn(behavior: Behavior) -> Self {
        let state = Arc::new(FakeState {
            behavior,
            hits: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route(EMBED_PATH, post(embed))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake provider");
        let addr = listener.local_addr().expect("fake provider address");
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        let server_handle = tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
        });

        Self {
            addr,
            state,
            shutdown_tx: Some(shutdown_tx),
            _server_handle: server_handle,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}{}", self.addr, EMBED_PATH)
    }

    pub fn hits(&self) -> usize {
        self.state.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().clone()
    }
}

impl Drop for FakeProvider {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

async fn embed(State(state): State<Arc<FakeState>>, Json(body): Json<Value>) -> Response {
    state.hits.fetch_add(1, Ordering::SeqCst);
    state.requests.lock().push(body);

    match &state.behavior {
        Behavior::Embedding(vector) => Json(json!({ "embedding": vector })).into_response(),
        Behavior::Slow(delay, vector) => {
            tokio::time::sleep(*delay).await;
            Json(json!({ "vector": vector })).into_response()
        }
        Behavior::Status(code) => StatusCode::from_u16(*code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
        Behavior::Empty => Json(json!({ "embedding": [] })).into_response(),
    }
}
