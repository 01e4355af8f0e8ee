// src/state.rs
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::ct_log::catalog::ServerCatalog;

/// Half-open range `[start, end)` of entry indexes whose fetch failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingRange {
    pub start: u64,
    pub end: u64,
    /// Retries already spent on this range
    pub retries: u32,
}

impl PendingRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self {
            start,
            end,
            retries: 0,
        }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Default)]
struct ServerPosition {
    tree_size: u64,
    pending: VecDeque<PendingRange>,
}

/// Last-observed tree size per log server, in memory only
///
/// Keyed by server url. Written by the poll task alone.
pub struct PollState {
    positions: Mutex<HashMap<String, ServerPosition>>,
    max_pending_ranges: usize,
}

impl PollState {
    pub fn new(max_pending_ranges: usize) -> Self {
        Self {
            positions: Mutex::new(HashMap::new()),
            max_pending_ranges,
        }
    }

    /// Last-seen tree size for a log, `None` before its baseline
    pub async fn tree_size(&self, log_url: &str) -> Option<u64> {
        let positions = self.positions.lock().await;
        positions.get(log_url).map(|p| p.tree_size)
    }

    pub async fn set_tree_size(&self, log_url: &str, tree_size: u64) {
        let mut positions = self.positions.lock().await;
        positions.entry(log_url.to_string()).or_default().tree_size = tree_size;
    }

    /// Queue a failed range for retry, dropping the oldest one past the limit
    pub async fn push_pending(&self, log_url: &str, range: PendingRange) {
        if range.is_empty() || self.max_pending_ranges == 0 {
            return;
        }

        let mut positions = self.positions.lock().await;
        let position = positions.entry(log_url.to_string()).or_default();
        position.pending.push_back(range);

        while position.pending.len() > self.max_pending_ranges {
            if let Some(dropped) = position.pending.pop_front() {
                error!(
                    "{}: Too many pending ranges, giving up on entries {}-{} ({} entries lost)",
                    log_url,
                    dropped.start,
                    dropped.end.saturating_sub(1),
                    dropped.len()
                );
            }
        }
    }

    /// Remove and return all pending ranges for a log, oldest first
    pub async fn take_pending(&self, log_url: &str) -> Vec<PendingRange> {
        let mut positions = self.positions.lock().await;
        positions
            .get_mut(log_url)
            .map(|p| p.pending.drain(..).collect())
            .unwrap_or_default()
    }

    pub async fn pending(&self, log_url: &str) -> Vec<PendingRange> {
        let positions = self.positions.lock().await;
        positions
            .get(log_url)
            .map(|p| p.pending.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Forget logs that are no longer in the catalog
    pub async fn retain_catalog(&self, catalog: &ServerCatalog) -> usize {
        let mut positions = self.positions.lock().await;
        let before = positions.len();
        positions.retain(|url, _| catalog.contains_url(url));
        let pruned = before - positions.len();

        if pruned > 0 {
            debug!("Pruned position state for {} logs no longer in the catalog", pruned);
        }

        pruned
    }

    /// Get total number of tracked logs
    pub async fn count(&self) -> usize {
        let positions = self.positions.lock().await;
        positions.len()
    }
}

impl Default for PollState {
    fn default() -> Self {
        Self::new(16)
    }
}
