//! Real-time fan-out transport: the one websocket endpoint.
//!
//! Each connection starts with no subscriptions. The client opts into topics
//! by sending `{"type":"subscribe","topic":"..."}` / `"unsubscribe"` frames;
//! the server multiplexes every subscribed [`FanOut`] broadcast receiver onto
//! one outbound stream. A `Lagged` receiver error becomes a `Lag` frame
//! instead of dropping the connection, so no event ever blocks on a slow
//! consumer.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::auth::{AuthContext, Capability};
use super::AppState;
use crate::realtime::FanOut;

pub async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    auth: AuthContext,
) -> axum::response::Response {
    if let Err(rejection) = auth.require(Capability::ReadOnly) {
        return rejection.into_response();
    }
    ws.on_upgrade(move |socket| run_session(socket, state)).into_response()
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ClientFrame {
    Subscribe { topic: String },
    Unsubscribe { topic: String },
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum ServerFrame {
    Event { topic: String, payload: Json },
    Lag { topic: String, skipped: u64 },
    Error { message: String },
}

/// Owns one connection's forwarder tasks, one per subscribed topic, each
/// draining a [`FanOut`] broadcast receiver into the shared outbound queue.
struct Session {
    fan_out: std::sync::Arc<FanOut>,
    out_tx: mpsc::Sender<ServerFrame>,
    forwarders: HashMap<String, JoinHandle<()>>,
}

impl Session {
    fn subscribe(&mut self, topic: String) {
        if self.forwarders.contains_key(&topic) {
            return;
        }
        let mut rx = self.fan_out.subscribe(&topic);
        let out_tx = self.out_tx.clone();
        let forwarded_topic = topic.clone();
        let handle = tokio::spawn(async move {
                loop {
                    match rx.recv().await {
                        Ok(payload) => {
                            let frame = ServerFrame::Event {
                                topic: forwarded_topic.clone(),
                                payload,
                            };
                            if out_tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                            let frame = ServerFrame::Lag {
                                topic: forwarded_topic.clone(),
                                skipped,
                            };
                            if out_tx.send(frame).await.is_err() {
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                    }
                }
        });
        self.forwarders.insert(topic, handle);
    }

    fn unsubscribe(&mut self, topic: &str) {
        if let Some(handle) = self.forwarders.remove(topic) {
            handle.abort();
        }
    }

    fn shutdown(&mut self) {
        for (_, handle) in self.forwarders.drain() {
            handle.abort();
        }
    }
}

async fn run_session(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<ServerFrame>(256);

    let mut session = Session {
        fan_out: state.fan_out.clone(),
        out_tx,
        forwarders: HashMap::new(),
    };

    let mut writer = tokio::spawn(async move {
            while let Some(frame) = out_rx.recv().await {
                let Ok(text) = serde_json::to_string(&frame) else {
                    continue;
                };
                if sink.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
    });

    loop {
        tokio::select! {
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(raw))) => handle_client_frame(&mut session, &raw).await,
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
            _ = &mut writer => break,
        }
    }

    session.shutdown();
}

async fn handle_client_frame(session: &mut Session, raw: &str) {
    match serde_json::from_str::<ClientFrame>(raw) {
        Ok(ClientFrame::Subscribe { topic }) => session.subscribe(topic),
        Ok(ClientFrame::Unsubscribe { topic }) => session.unsubscribe(&topic),
        Err(err) => {
            let _ = session
            .out_tx
            .send(ServerFrame::Error {
                message: format!("unrecognized frame: {err}"),
            })
            .await;
        }
    }
}
