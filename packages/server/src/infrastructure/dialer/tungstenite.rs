//! Outbound federation connections over tokio-tungstenite.

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use crate::domain::{FederationError, PeerChannel, PeerDialer};

/// Dials peers and bridges each socket to a [`PeerChannel`].
///
/// Two tasks serve every socket: one forwards queued frames to the socket
/// and closes it once every sender is gone, the other forwards text frames
/// from the socket until it closes.
#[derive(Debug, Clone, Copy, Default)]
pub struct TungsteniteDialer;

#[async_trait]
impl PeerDialer for TungsteniteDialer {
    async fn dial(&self, url: &str) -> Result<PeerChannel, FederationError> {
        let (ws_stream, _response) =
            connect_async(url)
                .await
                .map_err(|e| FederationError::DialFailed {
                    url: url.to_string(),
                    reason: e.to_string(),
                })?;
        tracing::debug!("Outbound federation socket open to {}", url);

        let (mut write, mut read) = ws_stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel::<String>();

        tokio::spawn(async move {
            while let Some(frame) = outbound_rx.recv().await {
                if write.send(Message::Text(frame.into())).await.is_err() {
                    break;
                }
            }
            let _ = write.close().await;
        });

        let peer_url = url.to_string();
        tokio::spawn(async move {
            while let Some(message) = read.next().await {
                match message {
                    Ok(Message::Text(text)) => {
                        if inbound_tx.send(text.to_string()).is_err() {
                            break;
                        }
                    }
                    Ok(Message::Close(_)) => break,
                    Ok(_) => {}
                    Err(e) => {
                        tracing::debug!("Federation socket to {} failed: {}", peer_url, e);
                        break;
                    }
                }
            }
        });

        Ok(PeerChannel {
            outbound: outbound_tx,
            inbound: inbound_rx,
        })
    }
}
