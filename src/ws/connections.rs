//! Live connection tracking

use dashmap::DashMap;
use uuid::Uuid;

/// One open WebSocket and the actor it drives
#[derive(Debug, Clone)]
pub struct ConnectionInfo {
    pub connection_id: Uuid,
    pub actor_id: Uuid,
    pub match_id: Uuid,
    pub ign: String,
    pub connected_at: u64,
}

/// Set of open connections, safe to mutate while other tasks iterate it
pub struct ConnectionRegistry {
    connections: DashMap<Uuid, ConnectionInfo>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    pub fn register(&self, info: ConnectionInfo) {
        self.connections.insert(info.connection_id, info);
    }

    pub fn remove(&self, connection_id: &Uuid) -> Option<ConnectionInfo> {
        self.connections.remove(connection_id).map(|(_, info)| info)
    }

    pub fn len(&self) -> usize {
        self.connections.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Connections currently attached to `match_id`
    pub fn for_match(&self, match_id: &Uuid) -> Vec<ConnectionInfo> {
        self.connections
            .iter()
            .filter(|c| &c.value().match_id == match_id)
            .map(|c| c.value().clone())
            .collect()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
