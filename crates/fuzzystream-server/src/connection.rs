//! Per-client WebSocket handling.
//!
//! A connection is registered as soon as the upgrade completes and stays
//! registered until the peer closes, the socket errors, the writer fails, or
//! the server shuts down. Inbound frames are read only to notice closure.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use log::debug;
use tokio::sync::mpsc;

use crate::AppState;

/// Messages buffered per client before the broadcaster starts dropping.
pub(crate) const OUTBOUND_QUEUE: usize = 64;

/// How long a closing client gets to flush its close frame.
const CLOSE_GRACE: Duration = Duration::from_millis(500);

pub(crate) async fn handle_upgrade(
    State(state): State<Arc<AppState>>,
    ws: WebSocketUpgrade,
) -> Response {
    ws.on_upgrade(move |socket| serve_client(socket, state))
}

async fn serve_client(socket: WebSocket, state: Arc<AppState>) {
    let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
    let registration = state.registry.register(tx);
    let id = registration.id();

    let (sink, mut stream) = socket.split();
    let mut writer = tokio::spawn(forward_outbound(sink, rx));

    let writer_finished = tokio::select! {
        _ = drain_inbound(&mut stream) => false,
        _ = &mut writer => true,
        _ = state.cancel.cancelled() => false,
    };

    // Deregistering drops the registry's sender, which ends the writer.
    drop(registration);
    if !writer_finished && tokio::time::timeout(CLOSE_GRACE, &mut writer).await.is_err() {
        writer.abort();
    }
    debug!("{id}: handler finished");
}

/// Read and discard client frames until close or error.
async fn drain_inbound(stream: &mut SplitStream<WebSocket>) {
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!("connection error: {e}");
                break;
            }
        }
    }
}

/// Write queued payloads as text frames. Returns on the first send failure or
/// once the queue's senders are gone.
async fn forward_outbound(
    mut sink: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<Arc<str>>,
) {
    while let Some(payload) = rx.recv().await {
        if let Err(e) = sink.send(Message::Text(payload.to_string().into())).await {
            debug!("send failed: {e}");
            return;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuzzystream_core::ConnectionRegistry;

    #[test]
    fn stalled_client_drops_only_the_overflow() {
        let registry = Arc::new(ConnectionRegistry::new());
        let (stalled_tx, mut stalled_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let _stalled = registry.register(stalled_tx);

        for _ in 0..OUTBOUND_QUEUE {
            assert_eq!(registry.broadcast("abcd").failed, 0);
        }
        let (live_tx, mut live_rx) = mpsc::channel(OUTBOUND_QUEUE);
        let _live = registry.register(live_tx);

        let delivery = registry.broadcast("beef");
        assert_eq!(delivery.recipients, 2);
        assert_eq!(delivery.failed, 1);
        assert_eq!(live_rx.try_recv().as_deref().ok(), Some("beef"));
        assert_eq!(stalled_rx.try_recv().as_deref().ok(), Some("abcd"));
    }
}
