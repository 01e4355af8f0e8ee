// src/ct_log/poller.rs
use futures_util::future::BoxFuture;
use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};
use url::Url;

use super::catalog::CatalogHandle;
use super::client::CtLogClient;
use super::types::{LogServer, RawEntry};
use crate::decoder::CertificateDecoder;
use crate::error::FetchError;
use crate::output::CertificateSink;
use crate::state::{PendingRange, PollState};

/// Tuning for the polling engine
#[derive(Debug, Clone)]
pub struct PollConfig {
    /// Most entries requested from a log in one get-entries call
    pub chunk_size: u64,
    /// Servers polled at the same time within one tick
    pub max_concurrent_servers: usize,
    /// Retries for a range whose fetch failed before it is given up
    pub max_range_retries: u32,
    /// Failed ranges remembered per server
    pub max_pending_ranges: usize,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            chunk_size: 64,
            max_concurrent_servers: 1,
            max_range_retries: 3,
            max_pending_ranges: 16,
        }
    }
}

/// What one call to [`PollingEngine::tick`] did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub servers: usize,
    pub baselined: usize,
    pub failed: usize,
    pub entries_fetched: u64,
    pub records_emitted: u64,
}

#[derive(Debug, Default)]
struct ServerReport {
    baselined: bool,
    failed: bool,
    entries_fetched: u64,
    records_emitted: u64,
}

/// Progress through a range, kept when a fetch fails part way
#[derive(Debug, Default)]
struct RangeProgress {
    entries_fetched: u64,
    records_emitted: u64,
}

struct RangeFailure {
    /// First index not yet processed
    next: u64,
    error: FetchError,
}

/// Turns tree-size growth on every catalog server into decoded records
pub struct PollingEngine {
    client: CtLogClient,
    catalog: Arc<CatalogHandle>,
    state: PollState,
    decoder: CertificateDecoder,
    sink: Arc<dyn CertificateSink>,
    config: PollConfig,
    tick_lock: Mutex<()>,
}

impl PollingEngine {
    pub fn new(
        client: CtLogClient,
        catalog: Arc<CatalogHandle>,
        decoder: CertificateDecoder,
        sink: Arc<dyn CertificateSink>,
        mut config: PollConfig,
    ) -> Self {
        config.chunk_size = config.chunk_size.max(1);
        config.max_concurrent_servers = config.max_concurrent_servers.max(1);

        Self {
            client,
            catalog,
            state: PollState::new(config.max_pending_ranges),
            decoder,
            sink,
            config,
            tick_lock: Mutex::new(()),
        }
    }

    pub fn state(&self) -> &PollState {
        &self.state
    }

    pub fn catalog(&self) -> &Arc<CatalogHandle> {
        &self.catalog
    }

    /// Poll every server in the current catalog once
    ///
    /// Per-server failures are logged and never stop the other servers.
    pub async fn tick(&self) -> TickSummary {
        let _guard = self.tick_lock.lock().await;

        let catalog = self.catalog.snapshot();
        self.state.retain_catalog(&catalog).await;

        let reports: Vec<ServerReport> = stream::iter(catalog.servers().to_vec())
            .map(|server| self.poll_owned(server))
            .buffered(self.config.max_concurrent_servers)
            .collect()
            .await;

        let mut summary = TickSummary {
            servers: reports.len(),
            ..TickSummary::default()
        };
        for report in &reports {
            summary.baselined += usize::from(report.baselined);
            summary.failed += usize::from(report.failed);
            summary.entries_fetched += report.entries_fetched;
            summary.records_emitted += report.records_emitted;
        }

        debug!(
            "Certificate Transparency read run finished: {} servers, {} baselined, {} failed, {} entries, {} records",
            summary.servers,
            summary.baselined,
            summary.failed,
            summary.entries_fetched,
            summary.records_emitted
        );

        summary
    }

    /// Owns its server so the tick future stays `Send` when spawned
    fn poll_owned(&self, server: LogServer) -> BoxFuture<'_, ServerReport> {
        Box::pin(async move { self.poll_server(&server).await })
    }

    async fn poll_server(&self, server: &LogServer) -> ServerReport {
        let mut report = ServerReport::default();

        debug!("Reading Certificate Transparency logs from [{}]", server.url);

        let base_url = match server.base_url() {
            Ok(url) => url,
            Err(e) => {
                warn!(
                    "Skipping Certificate Transparency log server with invalid URL [{}]: {}",
                    server.url, e
                );
                report.failed = true;
                return report;
            }
        };

        let tree_size = match self.client.get_sth(&base_url).await {
            Ok(sth) => sth.tree_size,
            Err(e) => {
                error!("Could not read tree head from [{}]. Skipping: {}", server.url, e);
                report.failed = true;
                return report;
            }
        };

        let previous = match self.state.tree_size(&server.url).await {
            Some(previous) => previous,
            None => {
                debug!("{}: Baseline tree size {}, skipping first run", server.url, tree_size);
                self.state.set_tree_size(&server.url, tree_size).await;
                report.baselined = true;
                return report;
            }
        };

        self.retry_pending(server, &base_url, &mut report).await;

        if tree_size < previous {
            warn!(
                "{}: Tree size went backwards ({} -> {}), keeping position {}",
                server.url, previous, tree_size, previous
            );
            return report;
        }

        if tree_size == previous {
            debug!("{}: Up to date (tree_size={})", server.url, tree_size);
            return report;
        }

        debug!(
            "{}: Fetching {} [{}->{}] new entries",
            server.url,
            tree_size - previous,
            previous,
            tree_size
        );

        let mut progress = RangeProgress::default();
        let outcome = self
            .fetch_range(server, &base_url, previous, tree_size, &mut progress)
            .await;

        report.entries_fetched += progress.entries_fetched;
        report.records_emitted += progress.records_emitted;

        self.state.set_tree_size(&server.url, tree_size).await;

        match outcome {
            Ok(()) => {
                info!(
                    "{}: Processed entries {}-{} ({} entries, {} records)",
                    server.url,
                    previous,
                    tree_size - 1,
                    progress.entries_fetched,
                    progress.records_emitted
                );
            }
            Err(failure) => {
                report.failed = true;
                self.record_failure(server, PendingRange::new(failure.next, tree_size), failure.error)
                    .await;
            }
        }

        report
    }

    /// Re-fetch ranges that failed on earlier ticks
    async fn retry_pending(&self, server: &LogServer, base_url: &Url, report: &mut ServerReport) {
        for range in self.state.take_pending(&server.url).await {
            debug!(
                "{}: Retrying entries {}-{} (retry {})",
                server.url,
                range.start,
                range.end - 1,
                range.retries + 1
            );

            let mut progress = RangeProgress::default();
            let outcome = self
                .fetch_range(server, base_url, range.start, range.end, &mut progress)
                .await;

            report.entries_fetched += progress.entries_fetched;
            report.records_emitted += progress.records_emitted;

            if let Err(failure) = outcome {
                report.failed = true;
                let remaining = PendingRange {
                    start: failure.next,
                    end: range.end,
                    retries: range.retries + 1,
                };
                self.record_failure(server, remaining, failure.error).await;
            }
        }
    }

    async fn record_failure(&self, server: &LogServer, range: PendingRange, error: FetchError) {
        if range.retries >= self.config.max_range_retries {
            error!(
                "{}: Giving up on entries {}-{} after {} retries ({} entries lost): {}",
                server.url,
                range.start,
                range.end - 1,
                range.retries,
                range.len(),
                error
            );
            return;
        }

        warn!(
            "{}: Could not fetch entries {}-{}, will retry next run: {}",
            server.url,
            range.start,
            range.end - 1,
            error
        );
        self.state.push_pending(&server.url, range).await;
    }

    /// Fetch, decode and emit `[start, end)` in chunks
    async fn fetch_range(
        &self,
        server: &LogServer,
        base_url: &Url,
        start: u64,
        end: u64,
        progress: &mut RangeProgress,
    ) -> Result<(), RangeFailure> {
        let mut next = start;

        while next < end {
            let chunk_end = std::cmp::min(next.saturating_add(self.config.chunk_size), end) - 1;

            let entries = self
                .client
                .get_entries(base_url, next, chunk_end)
                .await
                .map_err(|error| RangeFailure { next, error })?;

            if entries.is_empty() {
                return Err(RangeFailure {
                    next,
                    error: FetchError::EmptyRange {
                        url: server.url.clone(),
                        start: next,
                        end: chunk_end,
                    },
                });
            }

            // Logs may return fewer entries than asked for, never trust more
            let requested = (chunk_end - next + 1) as usize;

            for (offset, entry) in entries.iter().take(requested).enumerate() {
                let entry_index = next + offset as u64;
                progress.entries_fetched += 1;

                let raw = match RawEntry::try_from(entry) {
                    Ok(raw) => raw,
                    Err(e) => {
                        warn!(
                            "{}: Malformed entry at index {}: {}",
                            server.url, entry_index, e
                        );
                        continue;
                    }
                };

                let Some(mut record) = self.decoder.decode(&raw) else {
                    continue;
                };

                record.log_url = Some(server.url.clone());
                record.entry_index = Some(entry_index);

                match self.sink.emit(record).await {
                    Ok(()) => progress.records_emitted += 1,
                    Err(e) => warn!(
                        "{}: Sink rejected record at index {}: {}",
                        server.url, entry_index, e
                    ),
                }
            }

            next += entries.len().min(requested) as u64;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ct_log::catalog::ServerCatalog;
    use crate::output::testing::CollectingSink;

    fn engine_with(catalog: ServerCatalog, sink: Arc<CollectingSink>) -> PollingEngine {
        PollingEngine::new(
            CtLogClient::new(reqwest::Client::new()),
            Arc::new(CatalogHandle::new(catalog)),
            CertificateDecoder::new("example.com"),
            sink,
            PollConfig::default(),
        )
    }

    #[tokio::test]
    async fn test_invalid_url_is_skipped_without_state() {
        let sink = Arc::new(CollectingSink::default());
        let engine = engine_with(
            ServerCatalog::new(vec![LogServer::new("Broken", "exa mple.com/", vec![])]),
            sink.clone(),
        );

        let summary = engine.tick().await;

        assert_eq!(summary.servers, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(engine.state().count().await, 0);
        assert!(sink.records.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_empty_catalog_tick() {
        let sink = Arc::new(CollectingSink::default());
        let engine = engine_with(ServerCatalog::default(), sink);

        assert_eq!(engine.tick().await, TickSummary::default());
    }

    #[test]
    fn test_config_floors_chunk_and_concurrency() {
        let engine = PollingEngine::new(
            CtLogClient::new(reqwest::Client::new()),
            Arc::new(CatalogHandle::default()),
            CertificateDecoder::new("example.com"),
            Arc::new(CollectingSink::default()),
            PollConfig {
                chunk_size: 0,
                max_concurrent_servers: 0,
                ..PollConfig::default()
            },
        );

        assert_eq!(engine.config.chunk_size, 1);
        assert_eq!(engine.config.max_concurrent_servers, 1);
    }
}
