//! Stub servers bound to loopback for the integration tests.
#![allow(dead_code)]

use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use sharelink::config::Config;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
    task::JoinHandle,
};
use tokio_tungstenite::tungstenite::Message;
use url::Url;

/// Behavior of the JSON endpoints.
#[derive(Clone, Debug)]
pub struct Api {
    /// Resolve response body.
    pub tracks: Value,
    pub resolve_status: StatusCode,
    pub submit_status: StatusCode,
    pub task_id: String,
    /// Resolve to the selections submitted last, one variant per track.
    pub echo: bool,
    /// How long the submit endpoint takes to answer.
    pub submit_delay: Duration,
}

impl Default for Api {
    fn default() -> Self {
        Self {
            tracks: json!([track("Song", &["v1", "v2"])]),
            resolve_status: StatusCode::OK,
            submit_status: StatusCode::OK,
            task_id: "task-1".to_owned(),
            echo: false,
            submit_delay: Duration::ZERO,
        }
    }
}

/// What the JSON endpoints have seen.
#[derive(Debug, Default)]
pub struct Hits {
    pub resolve: AtomicUsize,
    pub submit: AtomicUsize,
    pub links: Mutex<Vec<String>>,
    pub submitted: Mutex<Option<Value>>,
}

impl Hits {
    pub fn resolve_count(&self) -> usize {
        self.resolve.load(Ordering::SeqCst)
    }

    pub fn submit_count(&self) -> usize {
        self.submit.load(Ordering::SeqCst)
    }
}

#[derive(Clone)]
struct ApiState {
    api: Arc<Api>,
    hits: Arc<Hits>,
}

/// A track record as the resolve endpoint returns it.
pub fn track(title: &str, variant_ids: &[&str]) -> Value {
    let variants: Vec<_> = variant_ids
        .iter()
        .enumerate()
        .map(|(i, id)| {
            json!({
                "id": id,
                "url": format!("https://youtu.be/{id}"),
                "title": format!("{title} ({id})"),
                "duration": format!("{}", 180 + i),
                "views": 1000 * (i + 1),
                "uploader": "Uploader",
                "uploadDate": "20240101",
            })
        })
        .collect();

    json!({
        "metadata": {
            "title": title,
            "artist": "Artist",
            "album": "Album",
            "genre": "Pop",
            "year": "2024",
        },
        "variants": variants,
    })
}

async fn resolve(State(state): State<ApiState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    state.hits.resolve.fetch_add(1, Ordering::SeqCst);
    state
        .hits
        .links
        .lock()
        .unwrap()
        .push(body["link"].as_str().unwrap_or_default().to_owned());

    let tracks: Value = if state.api.echo {
        let submitted = state.hits.submitted.lock().unwrap().clone();
        submitted
            .and_then(|body| body["selections"].as_array().cloned())
            .unwrap_or_default()
            .into_iter()
            .map(|selection| {
                json!({
                    "metadata": selection["metadata"],
                    "variants": [selection["variant"]],
                })
            })
            .collect()
    } else {
        state.api.tracks.clone()
    };

    (state.api.resolve_status, Json(tracks))
}

async fn submit(State(state): State<ApiState>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    state.hits.submit.fetch_add(1, Ordering::SeqCst);
    *state.hits.submitted.lock().unwrap() = Some(body);
    tokio::time::sleep(state.api.submit_delay).await;

    (
        state.api.submit_status,
        Json(json!({ "taskId": state.api.task_id })),
    )
}

/// Serves the resolve and submit endpoints. Returns the server base URL.
pub async fn serve_api(api: Api) -> (Url, Arc<Hits>) {
    let hits = Arc::new(Hits::default());
    let state = ApiState {
        api: Arc::new(api),
        hits: Arc::clone(&hits),
    };

    let app = Router::new()
        .route("/api/share-link", post(resolve))
        .route("/api/submit-selections", post(submit))
        .with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });

    (url, hits)
}

/// Serves responses that announce a body but stop sending halfway.
/// Returns the server base URL.
pub async fn serve_stalled() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();

    tokio::spawn(async move {
        while let Ok((mut stream, _)) = listener.accept().await {
            tokio::spawn(async move {
                let mut request = [0; 4096];
                let _ = stream.read(&mut request).await;
                let _ = stream
                    .write_all(
                        b"HTTP/1.1 200 OK\r\n\
                          Content-Type: application/json\r\n\
                          Content-Length: 100\r\n\
                          \r\n\
                          [{",
                    )
                    .await;

                // Keep the connection open without finishing the body.
                tokio::time::sleep(Duration::from_secs(60)).await;
                drop(stream);
            });
        }
    });

    url
}

/// A base URL that refuses connections.
pub async fn refusing() -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("http://{}/", listener.local_addr().unwrap())).unwrap();
    drop(listener);
    url
}

/// One step of a scripted progress server.
#[derive(Clone, Debug)]
pub enum Step {
    Text(&'static str),
    Pause(Duration),
    Close,
}

/// Serves a single progress subscription that plays `steps` after the first
/// client message. Resolves to every message received from the client.
pub async fn serve_progress(steps: Vec<Step>) -> (Url, JoinHandle<Vec<Message>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = Url::parse(&format!("ws://{}/ws/progress", listener.local_addr().unwrap())).unwrap();

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        let mut received = Vec::new();
        if let Some(Ok(message)) = ws.next().await {
            received.push(message);
        }

        for step in steps {
            match step {
                Step::Text(text) => {
                    if ws.send(Message::text(text)).await.is_err() {
                        return received;
                    }
                }
                Step::Pause(duration) => tokio::time::sleep(duration).await,
                Step::Close => {
                    let _ = ws.close(None).await;
                }
            }
        }

        while let Some(Ok(message)) = ws.next().await {
            received.push(message);
        }
        received
    });

    (url, server)
}

/// Configuration pointing at the stub servers.
pub fn config(api: &Url, progress: &Url, grace_period: Duration) -> Config {
    let mut config = Config::with_server(api).unwrap();
    config.progress_url = progress.clone();
    config.grace_period = grace_period;
    config
}
