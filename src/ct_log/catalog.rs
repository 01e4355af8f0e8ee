// src/ct_log/catalog.rs
use arc_swap::ArcSwap;
use std::collections::HashSet;
use std::sync::Arc;

use super::types::LogServer;

/// Immutable, ordered set of log servers to poll
///
/// Urls are unique; one server is never polled twice in a tick.
#[derive(Debug, Clone, Default)]
pub struct ServerCatalog {
    servers: Vec<LogServer>,
}

impl ServerCatalog {
    /// Keeps the first server for each url
    pub fn new(mut servers: Vec<LogServer>) -> Self {
        let mut seen = HashSet::new();
        servers.retain(|server| seen.insert(server.url.clone()));
        Self { servers }
    }

    pub fn servers(&self) -> &[LogServer] {
        &self.servers
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }

    pub fn contains_url(&self, url: &str) -> bool {
        self.servers.iter().any(|s| s.url == url)
    }
}

/// Shared holder for the current catalog
///
/// Readers get a whole snapshot; a refresh replaces the pointer and never
/// touches a snapshot already handed out.
pub struct CatalogHandle {
    current: ArcSwap<ServerCatalog>,
}

impl CatalogHandle {
    pub fn new(initial: ServerCatalog) -> Self {
        Self {
            current: ArcSwap::from_pointee(initial),
        }
    }

    pub fn snapshot(&self) -> Arc<ServerCatalog> {
        self.current.load_full()
    }

    pub fn replace(&self, catalog: ServerCatalog) {
        self.current.store(Arc::new(catalog));
    }
}

impl Default for CatalogHandle {
    fn default() -> Self {
        Self::new(ServerCatalog::default())
    }
}
