// src/ct_log/log_list.rs
use std::collections::{HashMap, HashSet};
use tracing::{debug, info};
use url::Url;

use super::catalog::ServerCatalog;
use super::client::get_json;
use super::types::{LogListV1, LogServer};
use crate::error::FetchError;

/// Operator name used when a log references an id missing from the list
pub const UNKNOWN_OPERATOR: &str = "UNKNOWN";

/// Known broken servers that would only produce failures every tick
pub const BAD_SERVERS: &[&str] = &[
    "log.certly.io/",                     // NXDOMAIN
    "ct.izenpe.com/",                     // timeout
    "ct.izenpe.eus/",                     // timeout
    "ct.wosign.com/",                     // connection refused
    "ctlog.wosign.com/",                  // ssl handshake errors
    "ctlog2.wosign.com/",                 // NXDOMAIN
    "ct.gdca.com.cn/",                    // ssl handshake error
    "ctlog.gdca.com.cn/",                 // ssl handshake error
    "ctlog.api.venafi.com/",              // NXDOMAIN
    "ct.startssl.com/",                   // ssl handshake error
    "www.certificatetransparency.cn/ct/", // timeout
    "flimsy.ct.nordu.net:8080/",          // connection refused
    "ctlog.sheca.com/",                   // NXDOMAIN
    "ct.sheca.com/",                      // ssl handshake error
    "ct.akamai.com/",                     // ssl unverified peer
    "alpha.ctlogs.org/",                  // NXDOMAIN
    "clicky.ct.letsencrypt.org/",         // NXDOMAIN
    "ct.filippo.io/behindthesofa/",       // no route
];

/// Fetches the canonical CT log list and turns it into a catalog
pub struct LogServerDirectory {
    http_client: reqwest::Client,
    list_url: Url,
    bad_servers: HashSet<String>,
    additional_logs: Vec<String>,
}

impl LogServerDirectory {
    /// Directory excluding exactly the urls in `bad_servers`
    pub fn new(http_client: reqwest::Client, list_url: Url, bad_servers: HashSet<String>) -> Self {
        Self {
            http_client,
            list_url,
            bad_servers,
            additional_logs: Vec::new(),
        }
    }

    /// Directory excluding [`BAD_SERVERS`] plus `extra_bad_servers`
    pub fn with_default_exclusions(
        http_client: reqwest::Client,
        list_url: Url,
        extra_bad_servers: &[String],
    ) -> Self {
        let bad_servers = BAD_SERVERS
            .iter()
            .map(|s| s.to_string())
            .chain(extra_bad_servers.iter().cloned())
            .collect();

        Self::new(http_client, list_url, bad_servers)
    }

    /// Logs to poll in addition to the canonical list
    pub fn with_additional_logs(mut self, additional_logs: Vec<String>) -> Self {
        self.additional_logs = additional_logs;
        self
    }

    pub fn list_url(&self) -> &Url {
        &self.list_url
    }

    pub fn is_excluded(&self, url: &str) -> bool {
        self.bad_servers.contains(url)
    }

    /// Fetch the current list of log servers
    pub async fn fetch(&self) -> Result<ServerCatalog, FetchError> {
        info!("Fetching current list of Certificate Transparency log servers from {}", self.list_url);

        let list: LogListV1 = get_json(&self.http_client, self.list_url.clone()).await?;

        let catalog = self.build_catalog(list);

        info!("Loaded {} Certificate Transparency log servers", catalog.len());

        Ok(catalog)
    }

    fn build_catalog(&self, list: LogListV1) -> ServerCatalog {
        let operator_names: HashMap<u64, &str> = list
            .operators
            .iter()
            .map(|op| (op.id, op.name.as_str()))
            .collect();

        let mut servers: Vec<LogServer> = Vec::with_capacity(list.logs.len());
        let mut seen: HashSet<&str> = HashSet::with_capacity(list.logs.len());

        for log in &list.logs {
            if self.is_excluded(&log.url) {
                debug!("Skipping known broken CT server [{}]", log.url);
                continue;
            }
            if !seen.insert(log.url.as_str()) {
                debug!("Skipping repeated CT server [{}]", log.url);
                continue;
            }

            let operators = log
                .operated_by
                .iter()
                .map(|id| {
                    operator_names
                        .get(id)
                        .copied()
                        .unwrap_or(UNKNOWN_OPERATOR)
                        .to_string()
                })
                .collect();

            servers.push(LogServer::new(log.description.clone(), log.url.clone(), operators));
        }

        for url in &self.additional_logs {
            if url.is_empty() || self.is_excluded(url) || !seen.insert(url.as_str()) {
                continue;
            }
            info!("Adding additional log: {}", url);
            servers.push(LogServer::new(url.clone(), url.clone(), vec![UNKNOWN_OPERATOR.to_string()]));
        }

        ServerCatalog::new(servers)
    }
}
