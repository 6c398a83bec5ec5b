//! WebSocket voice-query channel.
//!
//! Each connection is greeted with a `connection` frame listing the loaded
//! agents. A `voice_query` frame fans the query out to the selected agents
//! and answers with one `agent_responses` frame; anything unparseable gets an
//! `error` frame. The connection stays open across errors.

use std::collections::BTreeMap;
use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::server::agents::{AgentCatalog, AgentResponse};
use crate::server::{ASSEMBLY_BANNER, AppState};

/// Frames sent by the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Greeting sent once per connection.
    Connection {
        message: String,
        agents: Vec<String>,
    },
    /// Fan-out result for one voice query.
    AgentResponses {
        query: String,
        responses: BTreeMap<String, AgentResponse>,
        timestamp: String,
    },
    /// A frame the server could not process.
    Error { message: String },
}

/// Frames accepted from clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    VoiceQuery {
        query: String,
        #[serde(rename = "activeAgents", default, skip_serializing_if = "Option::is_none")]
        active_agents: Option<Vec<String>>,
    },
}

/// `GET /ws` — upgrades to the voice-query channel.
pub(crate) async fn handle_upgrade(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| serve_socket(socket, state.catalog))
}

async fn serve_socket(mut socket: WebSocket, catalog: Arc<AgentCatalog>) {
    info!("voice-query client connected");

    let greeting = ServerFrame::Connection {
        message: ASSEMBLY_BANNER.to_owned(),
        agents: catalog.ids(),
    };
    if send_frame(&mut socket, &greeting).await.is_err() {
        return;
    }

    while let Some(message) = socket.recv().await {
        let text = match message {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) | Err(_) => break,
            // Ping/pong and binary frames carry nothing for us.
            Ok(_) => continue,
        };

        let reply = match serde_json::from_str::<ClientFrame>(text.as_str()) {
            Ok(ClientFrame::VoiceQuery {
                query,
                active_agents,
            }) => {
                debug!(query = %query, "voice query received");
                let responses = catalog.respond(&query, active_agents.as_deref());
                ServerFrame::AgentResponses {
                    query,
                    responses,
                    timestamp: Utc::now().to_rfc3339(),
                }
            }
            Err(e) => ServerFrame::Error {
                message: format!("invalid frame: {e}"),
            },
        };

        if send_frame(&mut socket, &reply).await.is_err() {
            break;
        }
    }

    info!("voice-query client disconnected");
}

async fn send_frame(socket: &mut WebSocket, frame: &ServerFrame) -> Result<(), axum::Error> {
    let json = serde_json::to_string(frame).unwrap_or_else(|_| {
        r#"{"type":"error","message":"internal serialization failure"}"#.to_owned()
    });
    socket.send(Message::Text(json.into())).await
}
