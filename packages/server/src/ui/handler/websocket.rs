//! WebSocket plumbing shared by every real-time endpoint.

use std::future::Future;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{
    sink::SinkExt,
    stream::{SplitSink, StreamExt},
};
use tokio::{sync::mpsc, task::JoinHandle};

/// Spawns a task that forwards frames pushed for this client to its socket.
///
/// The socket is closed once every sender of `rx` is gone.
fn pusher_loop(
    mut rx: mpsc::UnboundedReceiver<String>,
    mut sender: SplitSink<WebSocket, Message>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }
        let _ = sender.close().await;
    })
}

/// Drive one client socket until either direction ends.
///
/// Frames from `rx` go out; every text frame that comes in is handed to
/// `on_text`, in order.
pub(super) async fn run_socket<F, Fut>(
    socket: WebSocket,
    rx: mpsc::UnboundedReceiver<String>,
    mut on_text: F,
) where
    F: FnMut(String) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let (sender, mut receiver) = socket.split();

    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::debug!("WebSocket error: {}", e);
                    break;
                }
            };
            match msg {
                Message::Text(text) => on_text(text.to_string()).await,
                Message::Close(_) => break,
                // Ping/pong is answered by the WebSocket layer
                _ => {}
            }
        }
    });

    let mut send_task = pusher_loop(rx, sender);

    // If any one of the tasks completes, abort the other
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };
}
