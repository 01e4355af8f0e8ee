// src/main.rs
use clap::Parser;
use ct_ingest::cli::{Cli, OutputFormat};
use ct_ingest::config::Config;
use ct_ingest::ct_log::{CatalogHandle, CtLogClient, LogServerDirectory, PollingEngine};
use ct_ingest::decoder::CertificateDecoder;
use ct_ingest::output::{CertificateSink, HumanSink, JsonSink};
use ct_ingest::scheduler::{ScheduleConfig, Scheduler};
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Validate arguments
    cli.validate()?;

    // Load config file; only an explicitly named file has to exist
    let config = match cli.config_path() {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    // Initialize logging
    // Precedence: RUST_LOG, then CLI flags, then config
    let log_level = cli.log_level().unwrap_or(config.logging.level.as_str());

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting ct-ingest...");

    let http_client = config.http.build_client()?;

    let directory = Arc::new(
        LogServerDirectory::with_default_exclusions(
            http_client.clone(),
            config.log_list_url()?,
            &config.ct_logs.extra_bad_servers,
        )
        .with_additional_logs(config.ct_logs.additional_logs.clone()),
    );

    // Handle --list-logs flag
    if cli.list_logs {
        let catalog = directory.fetch().await?;
        for server in catalog.servers() {
            println!(
                "{}\t{}\t{}",
                server.url,
                server.description,
                server.operators.join(", ")
            );
        }
        tracing::info!("Listed {} log servers. Exiting.", catalog.len());
        return Ok(());
    }

    // Create the sink
    let sink: Arc<dyn CertificateSink> = match cli.output_format() {
        OutputFormat::Human => {
            if let Some(ref path) = cli.output {
                let file = std::fs::File::create(path)?;
                tracing::info!("Writing human-readable output to: {}", path);
                Arc::new(HumanSink::to_file(file))
            } else {
                Arc::new(HumanSink::new())
            }
        }
        OutputFormat::Json => {
            if let Some(ref path) = cli.output {
                let file = std::fs::File::create(path)?;
                tracing::info!("Writing JSON output to: {}", path);
                Arc::new(JsonSink::to_file(file))
            } else {
                Arc::new(JsonSink::new())
            }
        }
    };

    let catalog = Arc::new(CatalogHandle::default());
    let engine = Arc::new(PollingEngine::new(
        CtLogClient::new(http_client),
        catalog,
        CertificateDecoder::new(config.decoder.reference_domain.clone()),
        Arc::clone(&sink),
        config.ct_logs.poll_config(),
    ));

    let scheduler = Scheduler::new(
        engine,
        directory,
        ScheduleConfig {
            poll_interval: Duration::from_secs(config.ct_logs.poll_interval_secs),
            refresh_interval: Duration::from_secs(config.ct_logs.refresh_interval_secs),
            refresh_retry: Duration::from_secs(config.ct_logs.refresh_retry_secs),
            shutdown_grace: Duration::from_secs(config.ct_logs.shutdown_grace_secs),
        },
    );

    // Load the list before the first poll; the refresh loop retries on failure
    if !scheduler.refresh_catalog().await {
        tracing::warn!(
            "No log servers loaded yet, retrying every {}s",
            config.ct_logs.refresh_retry_secs
        );
    }

    tracing::info!("Starting CT log polling...");
    let handle = scheduler.start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Received Ctrl+C, shutting down...");

    handle.shutdown().await;
    sink.flush().await?;

    Ok(())
}
