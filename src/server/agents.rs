//! Agent catalog and canned responders for the companion server.
//!
//! Agents are lightweight descriptors, not live model sessions: a query is
//! answered with a formatted analysis line derived from the agent's
//! personality. Descriptors load from a directory of JSON files at startup;
//! when no directory is configured (or it is missing) the catalog is seeded
//! from the built-in persona registry.

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::RwLock;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{AssemblyError, Result};
use crate::personas::all_personas;

/// Personality descriptor driving the canned response text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentPersonality {
    /// Analytical lens the agent applies to a query.
    pub focus: String,
    /// Tone of the agent's perspective.
    pub style: String,
}

/// One agent descriptor as stored on disk and served over the API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentProfile {
    pub id: String,
    pub name: String,
    pub symbol: String,
    pub role: String,
    pub personality: AgentPersonality,
}

/// One agent's canned answer to a query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Display name of the responding agent.
    pub agent: String,
    pub symbol: String,
    pub role: String,
    /// The formatted analysis line.
    pub response: String,
    /// The agent's stylistic perspective.
    pub perspective: String,
    /// RFC 3339 timestamp of the response.
    pub timestamp: String,
}

/// Formats the canned analysis line for one agent.
#[must_use]
pub fn generate_agent_response(agent: &AgentProfile, query: &str) -> AgentResponse {
    AgentResponse {
        agent: agent.name.clone(),
        symbol: agent.symbol.clone(),
        role: agent.role.clone(),
        response: format!(
            "{} {}: Analyzing \"{}\" through {}...",
            agent.symbol, agent.name, query, agent.personality.focus
        ),
        perspective: agent.personality.style.clone(),
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Loads every `*.json` descriptor from a directory.
///
/// Individual unreadable or malformed files are logged and skipped; only a
/// missing or unlistable directory is an error.
pub fn load_agents_dir(dir: &Path) -> Result<Vec<AgentProfile>> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| AssemblyError::Server(format!("cannot read agents directory: {e}")))?;

    let mut agents = Vec::new();
    for entry in entries {
        let path = match entry {
            Ok(entry) => entry.path(),
            Err(e) => {
                warn!("skipping unreadable directory entry: {e}");
                continue;
            }
        };
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        match std::fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<AgentProfile>(&raw) {
                Ok(agent) => agents.push(agent),
                Err(e) => warn!("skipping malformed agent file {}: {e}", path.display()),
            },
            Err(e) => warn!("skipping unreadable agent file {}: {e}", path.display()),
        }
    }
    Ok(agents)
}

/// Builds descriptors from the built-in persona registry.
#[must_use]
pub fn seed_from_personas() -> Vec<AgentProfile> {
    all_personas()
        .iter()
        .map(|p| AgentProfile {
            id: p.id.to_owned(),
            name: p.name.to_owned(),
            symbol: p.glyph.to_owned(),
            role: p.role.to_owned(),
            personality: AgentPersonality {
                focus: p.description.to_owned(),
                style: p.voice.tone.to_owned(),
            },
        })
        .collect()
}

/// In-memory agent catalog shared by the REST and WebSocket handlers.
#[derive(Debug, Default)]
pub struct AgentCatalog {
    agents: RwLock<BTreeMap<String, AgentProfile>>,
}

impl AgentCatalog {
    /// Builds a catalog from explicit descriptors.
    #[must_use]
    pub fn from_agents(agents: Vec<AgentProfile>) -> Self {
        let map = agents.into_iter().map(|a| (a.id.clone(), a)).collect();
        Self {
            agents: RwLock::new(map),
        }
    }

    /// Loads the catalog from a directory when one is given and readable,
    /// otherwise seeds it from the persona registry.
    #[must_use]
    pub fn load_or_seed(dir: Option<&Path>) -> Self {
        if let Some(dir) = dir {
            match load_agents_dir(dir) {
                Ok(agents) if !agents.is_empty() => {
                    info!(count = agents.len(), dir = %dir.display(), "loaded agent embodiments");
                    return Self::from_agents(agents);
                }
                Ok(_) => warn!(dir = %dir.display(), "agents directory is empty, seeding from personas"),
                Err(e) => warn!("falling back to persona-seeded agents: {e}"),
            }
        }
        let seeded = seed_from_personas();
        info!(count = seeded.len(), "seeded agent catalog from personas");
        Self::from_agents(seeded)
    }

    /// Agent ids in catalog order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    /// A point-in-time copy of the whole catalog.
    #[must_use]
    pub fn snapshot(&self) -> BTreeMap<String, AgentProfile> {
        self.read().clone()
    }

    /// Looks up one agent by id.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<AgentProfile> {
        self.read().get(id).cloned()
    }

    /// Inserts or replaces an agent descriptor.
    pub fn upsert(&self, agent: AgentProfile) {
        self.write().insert(agent.id.clone(), agent);
    }

    /// Removes an agent. Returns whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        self.write().remove(id).is_some()
    }

    /// Fans a query out to the selected agents (all agents when no selection
    /// is given). Unknown ids in the selection are silently skipped.
    #[must_use]
    pub fn respond(
        &self,
        query: &str,
        active_agents: Option<&[String]>,
    ) -> BTreeMap<String, AgentResponse> {
        let agents = self.read();
        let selected: Vec<&str> = match active_agents {
            Some(ids) => ids.iter().map(String::as_str).collect(),
            None => agents.keys().map(String::as_str).collect(),
        };

        let mut responses = BTreeMap::new();
        for id in selected {
            if let Some(agent) = agents.get(id) {
                responses.insert(id.to_owned(), generate_agent_response(agent, query));
            }
        }
        responses
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, BTreeMap<String, AgentProfile>> {
        match self.agents.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, BTreeMap<String, AgentProfile>> {
        match self.agents.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
