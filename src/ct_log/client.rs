// src/ct_log/client.rs
use serde::de::DeserializeOwned;
use tracing::{debug, warn};
use url::Url;

use super::types::{GetEntriesResponse, LogEntry, SignedTreeHead};
use crate::error::{DecodeError, FetchError};

/// HTTP client for the RFC 6962 log API
///
/// Wraps a caller-built `reqwest::Client`; timeouts and proxies are the
/// caller's business.
#[derive(Clone)]
pub struct CtLogClient {
    http_client: reqwest::Client,
}

impl CtLogClient {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self { http_client }
    }

    /// Get Signed Tree Head (current log size and timestamp)
    /// Endpoint: GET {base_url}/ct/v1/get-sth
    pub async fn get_sth(&self, base_url: &Url) -> Result<SignedTreeHead, FetchError> {
        let url = endpoint(base_url, "ct/v1/get-sth")?;

        debug!("Fetching STH from {}", url);

        let sth: SignedTreeHead = get_json(&self.http_client, url).await?;

        debug!(
            "STH received: tree_size={}, timestamp={}",
            sth.tree_size, sth.timestamp
        );

        Ok(sth)
    }

    /// Get entries `start..=end` (inclusive on both ends, as the API defines it)
    /// Endpoint: GET {base_url}/ct/v1/get-entries?start={start}&end={end}
    pub async fn get_entries(
        &self,
        base_url: &Url,
        start: u64,
        end: u64,
    ) -> Result<Vec<LogEntry>, FetchError> {
        let mut url = endpoint(base_url, "ct/v1/get-entries")?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("end", &end.to_string());

        debug!("Fetching entries {}-{} from {}", start, end, base_url);

        let response: GetEntriesResponse = get_json(&self.http_client, url).await?;

        debug!(
            "Received {} entries from {}",
            response.entries.len(),
            base_url
        );

        Ok(response.entries)
    }
}

fn endpoint(base_url: &Url, path: &str) -> Result<Url, FetchError> {
    base_url.join(path).map_err(|source| FetchError::InvalidUrl {
        url: base_url.to_string(),
        source,
    })
}

/// GET a URL and decode its JSON body, insisting on a 200
pub(crate) async fn get_json<T: DeserializeOwned>(
    http_client: &reqwest::Client,
    url: Url,
) -> Result<T, FetchError> {
    let url_str = url.to_string();

    let response = http_client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Transport {
            url: url_str.clone(),
            source,
        })?;

    let status = response.status();
    if status != reqwest::StatusCode::OK {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            warn!("Rate limited by {}", url_str);
        }
        return Err(FetchError::Status {
            url: url_str,
            status,
        });
    }

    let body = response
        .bytes()
        .await
        .map_err(|source| FetchError::Transport {
            url: url_str.clone(),
            source,
        })?;

    serde_json::from_slice(&body).map_err(|e| FetchError::Decode {
        url: url_str,
        source: DecodeError::Json(e),
    })
}
