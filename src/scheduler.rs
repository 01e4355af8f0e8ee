// src/scheduler.rs
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::ct_log::{CatalogHandle, LogServerDirectory, PollingEngine};

/// Cadences for the two periodic tasks
#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    /// Delay between the end of one poll tick and the start of the next
    pub poll_interval: Duration,
    /// Delay between successful catalog refreshes
    pub refresh_interval: Duration,
    /// Delay before retrying while no catalog has been loaded yet
    pub refresh_retry: Duration,
    /// Time in-flight work gets to finish on shutdown
    pub shutdown_grace: Duration,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(5),
            refresh_interval: Duration::from_secs(3600),
            refresh_retry: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

/// Drives catalog refreshes and poll ticks on independent timers
pub struct Scheduler {
    engine: Arc<PollingEngine>,
    directory: Arc<LogServerDirectory>,
    catalog: Arc<CatalogHandle>,
    config: ScheduleConfig,
}

impl Scheduler {
    pub fn new(
        engine: Arc<PollingEngine>,
        directory: Arc<LogServerDirectory>,
        config: ScheduleConfig,
    ) -> Self {
        let catalog = Arc::clone(engine.catalog());
        Self {
            engine,
            directory,
            catalog,
            config,
        }
    }

    /// Refresh the catalog once; a failure keeps the current catalog
    pub async fn refresh_catalog(&self) -> bool {
        refresh(&self.directory, &self.catalog).await
    }

    /// Spawn both loops and return a handle to stop them
    pub fn start(self) -> SchedulerHandle {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        info!(
            "Starting scheduler (poll every {:?}, refresh every {:?})",
            self.config.poll_interval, self.config.refresh_interval
        );

        let directory = Arc::clone(&self.directory);
        let catalog = Arc::clone(&self.catalog);
        let refresh_interval = self.config.refresh_interval;
        let refresh_retry = self.config.refresh_retry;
        // A catalog loaded before start() is not fetched again right away
        let first_refresh = if self.catalog.snapshot().is_empty() {
            Duration::ZERO
        } else {
            refresh_interval
        };
        let refresh_task = tokio::spawn(run_every(
            "catalog refresh",
            first_refresh,
            shutdown_rx.clone(),
            move || {
                let directory = Arc::clone(&directory);
                let catalog = Arc::clone(&catalog);
                async move {
                    let ok = refresh(&directory, &catalog).await;
                    if ok || !catalog.snapshot().is_empty() {
                        refresh_interval
                    } else {
                        refresh_retry
                    }
                }
            },
        ));

        let engine = Arc::clone(&self.engine);
        let poll_interval = self.config.poll_interval;
        let poll_task = tokio::spawn(run_every("poll", Duration::ZERO, shutdown_rx, move || {
            let engine = Arc::clone(&engine);
            async move {
                engine.tick().await;
                poll_interval
            }
        }));

        SchedulerHandle {
            shutdown_tx,
            tasks: vec![refresh_task, poll_task],
            grace: self.config.shutdown_grace,
        }
    }
}

async fn refresh(directory: &LogServerDirectory, catalog: &CatalogHandle) -> bool {
    match directory.fetch().await {
        Ok(fresh) => {
            catalog.replace(fresh);
            true
        }
        Err(e) => {
            error!("Could not refresh Certificate Transparency log servers: {}", e);
            false
        }
    }
}

/// Run `work` after `first_delay`, then again after the delay it returns,
/// until shutdown
async fn run_every<F, Fut>(
    name: &'static str,
    first_delay: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
    mut work: F,
) where
    F: FnMut() -> Fut,
    Fut: Future<Output = Duration>,
{
    if !first_delay.is_zero() && wait_or_shutdown(first_delay, &mut shutdown_rx).await {
        info!("Scheduler task [{}] stopped", name);
        return;
    }

    loop {
        if *shutdown_rx.borrow() {
            break;
        }

        let delay = work().await;

        if wait_or_shutdown(delay, &mut shutdown_rx).await {
            break;
        }
    }

    info!("Scheduler task [{}] stopped", name);
}

/// Sleep for `delay`; returns true if shutdown was signalled meanwhile
async fn wait_or_shutdown(delay: Duration, shutdown_rx: &mut watch::Receiver<bool>) -> bool {
    tokio::select! {
        _ = tokio::time::sleep(delay) => false,
        changed = shutdown_rx.changed() => changed.is_err() || *shutdown_rx.borrow(),
    }
}

/// Running scheduler; dropping it without `shutdown` leaves the tasks running
pub struct SchedulerHandle {
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
    grace: Duration,
}

impl SchedulerHandle {
    /// Stop scheduling new work and wait up to the grace period for running work
    pub async fn shutdown(self) {
        info!("Signaling shutdown to scheduler tasks");
        let _ = self.shutdown_tx.send(true);

        let deadline = tokio::time::Instant::now() + self.grace;
        for mut task in self.tasks {
            match tokio::time::timeout_at(deadline, &mut task).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => error!("Scheduler task failed: {}", e),
                Err(_) => {
                    warn!("Scheduler task still running after {:?}, aborting", self.grace);
                    task.abort();
                }
            }
        }

        info!("Scheduler stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn test_run_every_repeats_until_shutdown() {
        let (tx, rx) = watch::channel(false);
        let runs = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&runs);
        let task = tokio::spawn(run_every("test", Duration::ZERO, rx, move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Duration::from_millis(10)
            }
        }));

        tokio::time::sleep(Duration::from_millis(100)).await;
        tx.send(true).unwrap();
        task.await.unwrap();

        let seen = runs.load(Ordering::SeqCst);
        assert!(seen >= 2, "ran {} times", seen);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(runs.load(Ordering::SeqCst), seen);
    }

    #[tokio::test]
    async fn test_shutdown_aborts_after_grace() {
        let (shutdown_tx, _rx) = watch::channel(false);
        let stuck = tokio::spawn(async {
            tokio::time::sleep(Duration::from_secs(60)).await;
        });

        let handle = SchedulerHandle {
            shutdown_tx,
            tasks: vec![stuck],
            grace: Duration::from_millis(20),
        };

        tokio::time::timeout(Duration::from_secs(2), handle.shutdown())
            .await
            .expect("shutdown should respect the grace period");
    }
}
