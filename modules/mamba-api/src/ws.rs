//! WebSocket gateway. Clients join named topics and get pushed event
//! frames; nothing is acknowledged or replayed, and the REST API stays
//! the source of truth for incident state.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    extract::ws::{Message, WebSocket, WebSocketUpgrade},
    extract::State,
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, warn};
use uuid::Uuid;

use mamba_realtime::{BroadcastHub, Topic};

use crate::AppState;

/// Messages a client may send over the socket.
#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientMessage {
    JoinTopic {
        topic: String,
    },
    LeaveTopic {
        topic: String,
    },
    /// Convenience bundle: the general feed plus optional hospital and
    /// responder feeds in one message.
    SubscribeSos {
        hospital_id: Option<Uuid>,
        responder_id: Option<String>,
    },
    Ping,
}

pub async fn ws_handler(State(state): State<Arc<AppState>>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| client_session(state, socket))
}

async fn client_session(state: Arc<AppState>, socket: WebSocket) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::channel::<String>(64);

    // Single writer task; topic forwarders feed it through the channel so
    // frames from different topics never interleave mid-message.
    let writer: JoinHandle<()> = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sink.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut subscriptions: HashMap<String, JoinHandle<()>> = HashMap::new();

    // Every client starts on the general incident feed.
    let global = Topic::IncidentGlobal;
    subscriptions.insert(
        global.to_string(),
        spawn_forwarder(&state.hub, &global, tx.clone()),
    );

    let _ = tx
        .send(
            json!({
                "type": "connected",
                "message": "Connected to realtime updates",
                "timestamp": chrono::Utc::now(),
            })
            .to_string(),
        )
        .await;

    while let Some(Ok(msg)) = stream.next().await {
        match msg {
            Message::Text(text) => {
                let parsed: Result<ClientMessage, _> = serde_json::from_str(&text);
                match parsed {
                    Ok(message) => {
                        handle_client_message(&state.hub, message, &mut subscriptions, &tx).await
                    }
                    Err(e) => {
                        debug!(error = %e, "Ignoring malformed client message");
                        let _ = tx
                            .send(json!({"type": "error", "message": "malformed message"}).to_string())
                            .await;
                    }
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }

    for (_, handle) in subscriptions {
        handle.abort();
    }
    writer.abort();
    debug!("WebSocket client disconnected");
}

async fn handle_client_message(
    hub: &Arc<BroadcastHub>,
    message: ClientMessage,
    subscriptions: &mut HashMap<String, JoinHandle<()>>,
    tx: &mpsc::Sender<String>,
) {
    match message {
        ClientMessage::JoinTopic { topic } => {
            join(hub, &topic, subscriptions, tx).await;
        }
        ClientMessage::LeaveTopic { topic } => {
            if let Some(handle) = subscriptions.remove(&topic) {
                handle.abort();
                let _ = tx
                    .send(
                        json!({
                            "type": "left_topic",
                            "topic": topic,
                            "timestamp": chrono::Utc::now(),
                        })
                        .to_string(),
                    )
                    .await;
            }
        }
        ClientMessage::SubscribeSos {
            hospital_id,
            responder_id,
        } => {
            join(hub, &Topic::IncidentGlobal.to_string(), subscriptions, tx).await;
            if let Some(id) = hospital_id {
                join(hub, &Topic::Hospital(id).to_string(), subscriptions, tx).await;
            }
            if let Some(id) = responder_id {
                join(hub, &Topic::Responder(id).to_string(), subscriptions, tx).await;
            }
        }
        ClientMessage::Ping => {
            let _ = tx
                .send(json!({"type": "pong", "timestamp": chrono::Utc::now()}).to_string())
                .await;
        }
    }
}

async fn join(
    hub: &Arc<BroadcastHub>,
    name: &str,
    subscriptions: &mut HashMap<String, JoinHandle<()>>,
    tx: &mpsc::Sender<String>,
) {
    let Some(topic) = Topic::parse(name) else {
        warn!(topic = name, "Rejecting join for unknown topic shape");
        let _ = tx
            .send(json!({"type": "error", "message": format!("unknown topic: {name}")}).to_string())
            .await;
        return;
    };

    if subscriptions.contains_key(name) {
        return;
    }
    subscriptions.insert(name.to_string(), spawn_forwarder(hub, &topic, tx.clone()));

    let _ = tx
        .send(
            json!({
                "type": "joined_topic",
                "topic": name,
                "timestamp": chrono::Utc::now(),
            })
            .to_string(),
        )
        .await;
}

/// Forward a topic's events into the client's outbound queue. A lagging
/// client just skips the dropped frames; the source of truth is queryable.
fn spawn_forwarder(hub: &BroadcastHub, topic: &Topic, tx: mpsc::Sender<String>) -> JoinHandle<()> {
    let mut rx = hub.subscribe(topic);
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if tx.send(event.to_frame().to_string()).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "WebSocket subscriber lagged; frames dropped");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_topic_message_parses() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"join_topic","topic":"incident-global"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::JoinTopic { topic } if topic == "incident-global"));
    }

    #[test]
    fn subscribe_sos_allows_partial_fields() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"action":"subscribe_sos","responder_id":"responder-7"}"#)
                .unwrap();
        match msg {
            ClientMessage::SubscribeSos {
                hospital_id,
                responder_id,
            } => {
                assert!(hospital_id.is_none());
                assert_eq!(responder_id.as_deref(), Some("responder-7"));
            }
            _ => panic!("expected SubscribeSos"),
        }
    }

    #[test]
    fn ping_parses() {
        let msg: ClientMessage = serde_json::from_str(r#"{"action":"ping"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::Ping));
    }
}
