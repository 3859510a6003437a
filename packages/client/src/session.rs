//! WebSocket client session management.

use between_server::infrastructure::dto::websocket::{ThresholdRequest, ThresholdServerMessage};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};

use super::{
    domain::{Command, parse_input},
    error::ClientError,
    formatter::MessageFormatter,
    ui::redisplay_prompt,
};

fn encode(request: &ThresholdRequest) -> Option<Message> {
    match serde_json::to_string(request) {
        Ok(json) => Some(Message::Text(json.into())),
        Err(e) => {
            tracing::error!("Failed to serialize request: {}", e);
            None
        }
    }
}

fn display(text: &str, name: Option<&str>) {
    let formatted = match serde_json::from_str::<ThresholdServerMessage>(text) {
        Ok(ThresholdServerMessage::History(history)) => MessageFormatter::format_history(&history),
        Ok(ThresholdServerMessage::Event(event)) => MessageFormatter::format_event(&event),
        Err(_) => MessageFormatter::format_raw_message(text),
    };
    print!("\r{}", formatted);
    redisplay_prompt(name);
}

/// Run one connection to the threshold.
///
/// Returns `Ok` when the user quits or input ends, and an error when the
/// connection cannot be opened or is lost. `name` is re-announced on every
/// connection and updated by `/name`.
pub async fn run_client_session(
    url: &str,
    name: &mut Option<String>,
    input: &mut mpsc::UnboundedReceiver<String>,
) -> Result<(), ClientError> {
    let (ws_stream, _) = connect_async(url)
        .await
        .map_err(|e| ClientError::ConnectionError(e.to_string()))?;

    tracing::info!("Connected to the threshold");
    println!("\nType to speak. /name <name>, /witness, /quit.\n");

    let (mut write, mut read) = ws_stream.split();

    if let Some(current) = name.as_deref() {
        let request = ThresholdRequest::Name {
            name: current.to_string(),
        };
        if let Some(message) = encode(&request) {
            write
                .send(message)
                .await
                .map_err(|_| ClientError::ConnectionLost)?;
        }
    }

    loop {
        tokio::select! {
            message = read.next() => match message {
                Some(Ok(Message::Text(text))) => display(text.as_str(), name.as_deref()),
                Some(Ok(Message::Close(_))) | None => {
                    tracing::info!("Server closed the connection");
                    return Err(ClientError::ConnectionLost);
                }
                Some(Err(e)) => {
                    tracing::warn!("WebSocket read error: {}", e);
                    return Err(ClientError::ConnectionLost);
                }
                Some(Ok(_)) => {}
            },
            line = input.recv() => {
                let Some(line) = line else {
                    // Input ended (Ctrl+D / Ctrl+C)
                    let _ = write.close().await;
                    return Ok(());
                };
                let Some(command) = parse_input(&line) else {
                    redisplay_prompt(name.as_deref());
                    continue;
                };
                if command == Command::Quit {
                    let _ = write.close().await;
                    return Ok(());
                }
                if let Command::Name(new_name) = &command {
                    *name = Some(new_name.clone());
                }
                if let Some(message) = command.to_request().as_ref().and_then(encode)
                    && let Err(e) = write.send(message).await
                {
                    tracing::warn!("Failed to send: {}", e);
                    return Err(ClientError::ConnectionLost);
                }
                redisplay_prompt(name.as_deref());
            }
        }
    }
}
