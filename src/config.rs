// src/config.rs

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use url::Url;

use crate::ct_log::PollConfig;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct CtLogConfig {
    pub log_list_url: String,
    pub poll_interval_secs: u64,
    pub refresh_interval_secs: u64,
    pub refresh_retry_secs: u64,
    pub chunk_size: u64,
    pub max_concurrent_servers: usize,
    pub max_range_retries: u32,
    pub max_pending_ranges: usize,
    pub extra_bad_servers: Vec<String>, // Excluded on top of the built-in list
    pub additional_logs: Vec<String>,   // Merged with the canonical list
    pub shutdown_grace_secs: u64,
}

fn default_log_list_url() -> String {
    "https://www.gstatic.com/ct/log_list/all_logs_list.json".to_string()
}

impl Default for CtLogConfig {
    fn default() -> Self {
        Self {
            log_list_url: default_log_list_url(),
            poll_interval_secs: 5,
            refresh_interval_secs: 3600,
            refresh_retry_secs: 60,
            chunk_size: 64,
            max_concurrent_servers: 1,
            max_range_retries: 3,
            max_pending_ranges: 16,
            extra_bad_servers: Vec::new(),
            additional_logs: Vec::new(),
            shutdown_grace_secs: 5,
        }
    }
}

impl CtLogConfig {
    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            chunk_size: self.chunk_size,
            max_concurrent_servers: self.max_concurrent_servers,
            max_range_retries: self.max_range_retries,
            max_pending_ranges: self.max_pending_ranges,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout_secs: u64,
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 10,
            timeout_secs: 10,
        }
    }
}

impl HttpConfig {
    /// Build the HTTP client shared by the directory and the poller
    pub fn build_client(&self) -> anyhow::Result<reqwest::Client> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .timeout(Duration::from_secs(self.timeout_secs))
            .gzip(true)
            .user_agent(concat!("ct-ingest/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(client)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DecoderConfig {
    pub reference_domain: String,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            reference_domain: "example.com".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub ct_logs: CtLogConfig,
    pub http: HttpConfig,
    pub decoder: DecoderConfig,
    pub logging: LoggingConfig,
}

impl Config {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path)?;
        let cfg: Config = toml::from_str(&contents)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject settings the scheduler or poller cannot run with
    pub fn validate(&self) -> anyhow::Result<()> {
        self.log_list_url()?;

        if self.ct_logs.poll_interval_secs == 0 {
            anyhow::bail!("ct_logs.poll_interval_secs must be greater than 0");
        }
        if self.ct_logs.refresh_interval_secs == 0 {
            anyhow::bail!("ct_logs.refresh_interval_secs must be greater than 0");
        }
        if self.ct_logs.refresh_retry_secs == 0 {
            anyhow::bail!("ct_logs.refresh_retry_secs must be greater than 0");
        }
        if self.ct_logs.chunk_size == 0 {
            anyhow::bail!("ct_logs.chunk_size must be greater than 0");
        }
        if self.ct_logs.max_concurrent_servers == 0 {
            anyhow::bail!("ct_logs.max_concurrent_servers must be greater than 0");
        }
        if self.http.connect_timeout_secs == 0 {
            anyhow::bail!("http.connect_timeout_secs must be greater than 0");
        }
        if self.http.timeout_secs == 0 {
            anyhow::bail!("http.timeout_secs must be greater than 0");
        }
        if self.decoder.reference_domain.is_empty() {
            anyhow::bail!("decoder.reference_domain must not be empty");
        }

        Ok(())
    }

    pub fn log_list_url(&self) -> anyhow::Result<Url> {
        let url = Url::parse(&self.ct_logs.log_list_url).map_err(|e| {
            anyhow::anyhow!("Invalid ct_logs.log_list_url [{}]: {}", self.ct_logs.log_list_url, e)
        })?;

        match url.scheme() {
            "http" | "https" => Ok(url),
            other => anyhow::bail!("Unsupported ct_logs.log_list_url scheme [{}]", other),
        }
    }
}
