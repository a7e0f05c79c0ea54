//! HTTP + WebSocket surface.
//!
//! ```text
//! GET /         - WebSocket device feed
//! GET /ws       - same feed
//! GET /devices  - current device list as JSON
//! ```
//!
//! Each WebSocket connection owns one `Subscription` and lives in its own
//! task. The feed never blocks the poll loop: snapshots queue per observer
//! and the socket write is bounded by `send_timeout`.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json, Router,
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::{Method, header},
    response::Response,
    routing::get,
};
use chrono::{SecondsFormat, Utc};
use futures_util::{Sink, SinkExt, StreamExt};
use serde::Serialize;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tracing::{debug, info, warn};

use adbwatch_core::{DeviceStore, FeedMessage, Snapshot};

use crate::error::CliError;

// ── State ────────────────────────────────────────────────────────────

/// Shared by every handler.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<DeviceStore>,
    /// Longest a single WebSocket write may take before the observer is
    /// dropped.
    pub send_timeout: Duration,
    /// Cancelled on shutdown; ends the server and every open feed.
    pub cancel: CancellationToken,
}

// ── Router ───────────────────────────────────────────────────────────

pub fn router(state: AppState, cors: bool) -> Router {
    let router = Router::new()
        .route("/", get(device_feed))
        .route("/ws", get(device_feed))
        .route("/devices", get(list_devices))
        .with_state(state);

    if cors {
        router.layer(cors_layer())
    } else {
        router
    }
}

fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}

/// Serve until `state.cancel` fires, then drain gracefully.
pub async fn run(listener: TcpListener, state: AppState, cors: bool) -> Result<(), CliError> {
    let cancel = state.cancel.clone();
    let addr = listener.local_addr()?;
    info!(%addr, "device feed listening");

    axum::serve(listener, router(state, cors))
        .with_graceful_shutdown(cancel.cancelled_owned())
        .await
        .map_err(|source| CliError::Server { source })
}

// ── Query endpoint ───────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct DevicesResponse {
    success: bool,
    devices: Arc<Snapshot>,
    /// Response time, RFC 3339 UTC with milliseconds.
    timestamp: String,
}

async fn list_devices(State(state): State<AppState>) -> Json<DevicesResponse> {
    Json(DevicesResponse {
        success: true,
        devices: state.store.current(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

// ── Streaming endpoint ───────────────────────────────────────────────

async fn device_feed(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_devices(socket, state))
}

#[derive(Debug, Error)]
enum FeedError {
    #[error("failed to encode snapshot: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("socket write failed: {0}")]
    Send(#[from] axum::Error),

    #[error("socket write timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Pump snapshots to one observer until either side goes away.
///
/// Client messages are read only to notice a close; their content is
/// ignored.
async fn stream_devices(socket: WebSocket, state: AppState) {
    let mut subscription = state.store.subscribe();
    let id = subscription.id();
    let (mut sink, mut incoming) = socket.split();
    debug!(subscriber = %id, "feed opened");

    loop {
        tokio::select! {
            biased;

            () = state.cancel.cancelled() => {
                close(&mut sink, state.send_timeout).await;
                break;
            }

            frame = incoming.next() => match frame {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(e)) => {
                    debug!(subscriber = %id, error = %e, "feed read failed");
                    break;
                }
                Some(Ok(_)) => {}
            },

            snapshot = subscription.recv() => {
                let Some(snapshot) = snapshot else {
                    // Dropped by the registry: stalled, or shutting down.
                    close(&mut sink, state.send_timeout).await;
                    break;
                };
                if let Err(e) = push(&mut sink, snapshot, state.send_timeout).await {
                    warn!(subscriber = %id, error = %e, "dropping observer");
                    break;
                }
            }
        }
    }

    debug!(subscriber = %id, "feed closed");
}

async fn push<S>(sink: &mut S, snapshot: Arc<Snapshot>, limit: Duration) -> Result<(), FeedError>
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let text = FeedMessage::Devices(snapshot).to_json()?;
    tokio::time::timeout(limit, sink.send(Message::Text(text.into())))
        .await
        .map_err(|_| FeedError::Timeout(limit))??;
    Ok(())
}

async fn close<S>(sink: &mut S, limit: Duration)
where
    S: Sink<Message, Error = axum::Error> + Unpin,
{
    let _ = tokio::time::timeout(limit, sink.send(Message::Close(None))).await;
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::net::SocketAddr;

    use adbwatch_core::{DeviceRecord, DeviceStatus};
    use pretty_assertions::assert_eq;
    use serde_json::{Value, json};
    use tokio_tungstenite::{connect_async, tungstenite};

    use super::*;

    async fn spawn_server(store: Arc<DeviceStore>, cors: bool) -> (SocketAddr, CancellationToken) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let cancel = CancellationToken::new();
        let state = AppState {
            store,
            send_timeout: Duration::from_secs(2),
            cancel: cancel.clone(),
        };
        tokio::spawn(run(listener, state, cors));
        (addr, cancel)
    }

    async fn next_json<S>(ws: &mut S) -> Value
    where
        S: futures_util::Stream<Item = Result<tungstenite::Message, tungstenite::Error>> + Unpin,
    {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), ws.next())
                .await
                .unwrap()
                .unwrap()
                .unwrap();
            if msg.is_text() {
                return serde_json::from_str(msg.to_text().unwrap()).unwrap();
            }
        }
    }

    fn emulator() -> Snapshot {
        Snapshot::new(vec![
            DeviceRecord::new("emulator-5554", DeviceStatus::Online)
                .with_model("sdk_gphone64_x86_64")
                .with_android_version("14"),
        ])
    }

    #[tokio::test]
    async fn devices_endpoint_before_any_poll_is_empty() {
        let (addr, cancel) = spawn_server(Arc::new(DeviceStore::default()), true).await;

        let body: Value = reqwest::get(format!("http://{addr}/devices"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(body["success"], json!(true));
        assert_eq!(body["devices"], json!([]));
        let stamp = body["timestamp"].as_str().unwrap();
        assert!(stamp.ends_with('Z'));
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
        cancel.cancel();
    }

    #[tokio::test]
    async fn devices_endpoint_serves_accepted_snapshot() {
        let store = Arc::new(DeviceStore::default());
        store.apply(emulator());
        let (addr, cancel) = spawn_server(Arc::clone(&store), true).await;

        let body: Value = reqwest::get(format!("http://{addr}/devices"))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();

        assert_eq!(
            body["devices"],
            json!([{
                "id": "emulator-5554",
                "status": "device",
                "model": "sdk_gphone64_x86_64",
                "androidVersion": "14"
            }])
        );
        cancel.cancel();
    }

    #[tokio::test]
    async fn feed_sends_current_state_then_changes() {
        let store = Arc::new(DeviceStore::default());
        store.apply(Snapshot::new(vec![DeviceRecord::new(
            "B",
            DeviceStatus::Unauthorized,
        )]));
        let (addr, cancel) = spawn_server(Arc::clone(&store), true).await;

        let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        assert_eq!(
            next_json(&mut ws).await,
            json!({"type": "devices", "data": [{"id": "B", "status": "unauthorized"}]})
        );

        store.apply(emulator());
        let update = next_json(&mut ws).await;
        assert_eq!(update["type"], json!("devices"));
        assert_eq!(update["data"][0]["id"], json!("emulator-5554"));
        cancel.cancel();
    }

    #[tokio::test]
    async fn root_path_serves_the_same_feed() {
        let (addr, cancel) = spawn_server(Arc::new(DeviceStore::default()), true).await;

        let (mut ws, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
        assert_eq!(next_json(&mut ws).await, json!({"type": "devices", "data": []}));
        cancel.cancel();
    }

    #[tokio::test]
    async fn client_messages_are_ignored_and_close_unsubscribes() {
        let store = Arc::new(DeviceStore::default());
        let (addr, cancel) = spawn_server(Arc::clone(&store), true).await;

        let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        next_json(&mut ws).await;
        ws.send(tungstenite::Message::text("hello")).await.unwrap();

        store.apply(emulator());
        assert_eq!(next_json(&mut ws).await["data"][0]["id"], json!("emulator-5554"));

        ws.close(None).await.unwrap();
        for _ in 0..100 {
            if store.subscriber_count() == 0 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        assert_eq!(store.subscriber_count(), 0);
        cancel.cancel();
    }

    #[tokio::test]
    async fn shutdown_closes_open_feeds() {
        let store = Arc::new(DeviceStore::default());
        let (addr, cancel) = spawn_server(Arc::clone(&store), true).await;

        let (mut ws, _) = connect_async(format!("ws://{addr}/ws")).await.unwrap();
        next_json(&mut ws).await;

        cancel.cancel();
        let ended = tokio::time::timeout(Duration::from_secs(5), async {
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
            }
        })
        .await;
        assert!(ended.is_ok());
    }

    #[tokio::test]
    async fn cors_headers_are_sent_when_enabled() {
        let (addr, cancel) = spawn_server(Arc::new(DeviceStore::default()), true).await;

        let response = reqwest::Client::new()
            .get(format!("http://{addr}/devices"))
            .header("Origin", "http://example.test")
            .send()
            .await
            .unwrap();
        assert_eq!(response.headers()["access-control-allow-origin"], "*");
        cancel.cancel();
    }

    #[tokio::test]
    async fn cors_can_be_disabled() {
        let (addr, cancel) = spawn_server(Arc::new(DeviceStore::default()), false).await;

        let response = reqwest::Client::new()
            .get(format!("http://{addr}/devices"))
            .header("Origin", "http://example.test")
            .send()
            .await
            .unwrap();
        assert!(response.headers().get("access-control-allow-origin").is_none());
        cancel.cancel();
    }
}
