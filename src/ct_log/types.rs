// src/ct_log/types.rs
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use url::Url;

use crate::error::DecodeError;

/// Response from CT log's get-sth endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTreeHead {
    pub tree_size: u64,
    #[serde(default)]
    pub timestamp: u64,
    #[serde(default)]
    pub sha256_root_hash: String,
    #[serde(default)]
    pub tree_head_signature: String,
}

/// Single entry from CT log's get-entries endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub leaf_input: String, // base64-encoded MerkleTreeLeaf
    pub extra_data: String, // base64-encoded chain data
}

/// Response wrapper for get-entries endpoint
#[derive(Debug, Serialize, Deserialize)]
pub struct GetEntriesResponse {
    pub entries: Vec<LogEntry>,
}

/// One leaf with its chain data, base64-decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEntry {
    pub leaf_input: Vec<u8>,
    pub extra_data: Vec<u8>,
}

impl RawEntry {
    pub fn new(leaf_input: Vec<u8>, extra_data: Vec<u8>) -> Self {
        Self {
            leaf_input,
            extra_data,
        }
    }
}

impl TryFrom<&LogEntry> for RawEntry {
    type Error = DecodeError;

    fn try_from(entry: &LogEntry) -> Result<Self, Self::Error> {
        let engine = &base64::engine::general_purpose::STANDARD;

        let leaf_input = engine
            .decode(&entry.leaf_input)
            .map_err(|source| DecodeError::Base64 {
                field: "leaf_input",
                source,
            })?;
        let extra_data = engine
            .decode(&entry.extra_data)
            .map_err(|source| DecodeError::Base64 {
                field: "extra_data",
                source,
            })?;

        Ok(Self {
            leaf_input,
            extra_data,
        })
    }
}

/// Canonical log list document (all_logs_list.json)
#[derive(Debug, Serialize, Deserialize)]
pub struct LogListV1 {
    pub logs: Vec<LogListEntry>,
    pub operators: Vec<OperatorEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogListEntry {
    #[serde(default)]
    pub description: String,
    pub url: String,
    #[serde(default)]
    pub operated_by: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorEntry {
    pub id: u64,
    pub name: String,
}

/// A CT log server as listed in the catalog
///
/// Identity is the `url`; two servers with the same url are the same server.
#[derive(Debug, Clone, Serialize)]
pub struct LogServer {
    pub description: String,
    pub url: String,
    pub operators: Vec<String>,
}

impl LogServer {
    pub fn new(description: impl Into<String>, url: impl Into<String>, operators: Vec<String>) -> Self {
        Self {
            description: description.into(),
            url: url.into(),
            operators,
        }
    }

    /// Absolute base URL of the log API, always ending in `/`
    ///
    /// Catalog urls carry no scheme (`ct.googleapis.com/pilot/`), so `https://`
    /// is assumed unless one is present.
    pub fn base_url(&self) -> Result<Url, url::ParseError> {
        let mut raw = if self.url.contains("://") {
            self.url.clone()
        } else {
            format!("https://{}", self.url)
        };

        if !raw.ends_with('/') {
            raw.push('/');
        }

        let url = Url::parse(&raw)?;
        if url.cannot_be_a_base() || url.host_str().is_none() {
            return Err(url::ParseError::EmptyHost);
        }

        Ok(url)
    }
}

impl PartialEq for LogServer {
    fn eq(&self, other: &Self) -> bool {
        self.url == other.url
    }
}

impl Eq for LogServer {}

impl Hash for LogServer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.url.hash(state);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_adds_scheme_and_slash() {
        let server = LogServer::new("Pilot", "ct.googleapis.com/pilot", vec![]);
        let url = server.base_url().unwrap();
        assert_eq!(url.as_str(), "https://ct.googleapis.com/pilot/");
        assert_eq!(
            url.join("ct/v1/get-sth").unwrap().as_str(),
            "https://ct.googleapis.com/pilot/ct/v1/get-sth"
        );
    }

    #[test]
    fn test_base_url_keeps_explicit_scheme() {
        let server = LogServer::new("Local", "http://127.0.0.1:8080/log/", vec![]);
        assert_eq!(server.base_url().unwrap().as_str(), "http://127.0.0.1:8080/log/");
    }

    #[test]
    fn test_base_url_rejects_garbage() {
        let server = LogServer::new("Broken", "http://", vec![]);
        assert!(server.base_url().is_err());

        let server = LogServer::new("Broken", "exa mple.com/", vec![]);
        assert!(server.base_url().is_err());
    }

    #[test]
    fn test_identity_is_url() {
        let a = LogServer::new("A", "log.example.com/", vec!["Op".to_string()]);
        let b = LogServer::new("B", "log.example.com/", vec![]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_raw_entry_from_wire() {
        let entry = LogEntry {
            leaf_input: "AAE=".to_string(),
            extra_data: "".to_string(),
        };
        let raw = RawEntry::try_from(&entry).unwrap();
        assert_eq!(raw.leaf_input, vec![0, 1]);
        assert!(raw.extra_data.is_empty());

        let entry = LogEntry {
            leaf_input: "not base64!".to_string(),
            extra_data: "".to_string(),
        };
        assert!(matches!(
            RawEntry::try_from(&entry),
            Err(DecodeError::Base64 { field: "leaf_input", .. })
        ));
    }
}
