//! Companion multi-agent demo server.
//!
//! A small axum service that fans a single query out to a catalog of canned
//! "agent" responders, over both REST and a WebSocket channel.
//!
//! ## Endpoints
//!
//! - `GET /api/agents` — map of agent id to descriptor
//! - `GET /api/agents/{id}` — one descriptor, 404 when absent
//! - `POST /api/agents/{id}` — create or update a descriptor
//! - `DELETE /api/agents/{id}` — remove a descriptor, 404 when absent
//! - `POST /api/query` — HTTP fan-out of one query
//! - `GET /ws` — WebSocket voice-query channel

pub mod agents;
pub mod ws;

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::{AssemblyError, Result};

pub use agents::{AgentCatalog, AgentPersonality, AgentProfile, AgentResponse};
pub use ws::{ClientFrame, ServerFrame};

/// Banner announced at startup and in the WebSocket greeting.
pub const ASSEMBLY_BANNER: &str = "♠️🌿🎸🧵 G.MUSIC ASSEMBLY MODE ACTIVE";

/// Companion-server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (0 for auto-assign).
    pub port: u16,
    /// Directory of agent descriptor JSON files; seeded from the persona
    /// registry when unset or unreadable.
    pub agents_dir: Option<PathBuf>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 3000,
            agents_dir: None,
        }
    }
}

/// Shared state for axum handlers.
#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) catalog: Arc<AgentCatalog>,
}

/// Body of `POST /api/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryRequest {
    pub query: String,
    #[serde(
        rename = "activeAgents",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub active_agents: Option<Vec<String>>,
}

/// Response of `POST /api/query`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub query: String,
    pub timestamp: String,
    pub responses: BTreeMap<String, AgentResponse>,
}

/// Uniform error body for the REST API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
}

/// The running companion server.
pub struct AgentServer {
    addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl AgentServer {
    /// Loads the agent catalog and begins serving in a background task.
    ///
    /// # Errors
    ///
    /// Returns an error if the TCP listener cannot bind.
    pub async fn start(config: &ServerConfig) -> Result<Self> {
        let catalog = Arc::new(AgentCatalog::load_or_seed(config.agents_dir.as_deref()));
        Self::start_with_catalog(config, catalog).await
    }

    /// Begins serving an explicit catalog (used by tests).
    pub async fn start_with_catalog(
        config: &ServerConfig,
        catalog: Arc<AgentCatalog>,
    ) -> Result<Self> {
        let state = AppState {
            catalog: Arc::clone(&catalog),
        };
        let app = router(state);

        let bind_addr = format!("{}:{}", config.host, config.port);
        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| AssemblyError::Server(format!("bind failed on {bind_addr}: {e}")))?;
        let addr = listener
            .local_addr()
            .map_err(|e| AssemblyError::Server(format!("failed to get local addr: {e}")))?;

        info!("{ASSEMBLY_BANNER}");
        info!(
            agents = catalog.ids().len(),
            "agent server listening on http://{addr}"
        );

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("agent server error: {e}");
            }
        });

        Ok(Self { addr, handle })
    }

    /// The address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The port the server is listening on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// Aborts the server task.
    pub fn shutdown(&self) {
        self.handle.abort();
    }
}

impl Drop for AgentServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/agents", get(handle_list_agents))
        .route(
            "/api/agents/{id}",
            get(handle_get_agent)
                .post(handle_upsert_agent)
                .delete(handle_delete_agent),
        )
        .route("/api/query", post(handle_query))
        .route("/ws", get(ws::handle_upgrade))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// `GET /api/agents` — the whole catalog keyed by id.
async fn handle_list_agents(
    State(state): State<AppState>,
) -> Json<BTreeMap<String, AgentProfile>> {
    Json(state.catalog.snapshot())
}

/// `GET /api/agents/{id}` — one descriptor or 404.
async fn handle_get_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> axum::response::Response {
    match state.catalog.get(&id) {
        Some(agent) => Json(agent).into_response(),
        None => agent_not_found(),
    }
}

/// `POST /api/agents/{id}` — create or update. The path id wins over any id
/// in the body.
async fn handle_upsert_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(mut agent): Json<AgentProfile>,
) -> Json<AgentProfile> {
    agent.id = id;
    state.catalog.upsert(agent.clone());
    Json(agent)
}

/// `DELETE /api/agents/{id}` — remove, 404 when absent.
async fn handle_delete_agent(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if state.catalog.remove(&id) {
        StatusCode::NO_CONTENT.into_response()
    } else {
        agent_not_found()
    }
}

/// `POST /api/query` — fan one query out over plain HTTP.
async fn handle_query(
    State(state): State<AppState>,
    Json(request): Json<QueryRequest>,
) -> axum::response::Response {
    if request.query.trim().is_empty() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiError {
                error: "Query is required".to_owned(),
            }),
        )
            .into_response();
    }

    let responses = state
        .catalog
        .respond(&request.query, request.active_agents.as_deref());
    Json(QueryResponse {
        query: request.query,
        timestamp: Utc::now().to_rfc3339(),
        responses,
    })
    .into_response()
}

fn agent_not_found() -> axum::response::Response {
    (
        StatusCode::NOT_FOUND,
        Json(ApiError {
            error: "Agent not found".to_owned(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

    use super::*;

    #[test]
    fn config_defaults_to_localhost_3000() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert!(config.agents_dir.is_none());
    }

    #[test]
    fn config_backfills_missing_fields() {
        let config: ServerConfig = serde_json::from_str(r#"{"port":8443}"#).unwrap();
        assert_eq!(config.port, 8443);
        assert_eq!(config.host, "127.0.0.1");
    }

    #[test]
    fn query_request_parses_wire_field_names() {
        let json = r#"{"query":"motif","activeAgents":["jerry","nyro"]}"#;
        let request: QueryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.query, "motif");
        assert_eq!(
            request.active_agents,
            Some(vec!["jerry".to_owned(), "nyro".to_owned()])
        );

        let bare: QueryRequest = serde_json::from_str(r#"{"query":"motif"}"#).unwrap();
        assert!(bare.active_agents.is_none());
    }

    #[test]
    fn query_response_round_trip() {
        let response = QueryResponse {
            query: "motif".to_owned(),
            timestamp: "2025-05-01T00:00:00Z".to_owned(),
            responses: BTreeMap::new(),
        };
        let json = serde_json::to_string(&response).unwrap();
        let restored: QueryResponse = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.query, "motif");
        assert!(restored.responses.is_empty());
    }
}
