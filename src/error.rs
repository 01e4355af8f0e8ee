// src/error.rs
//! Error types for ct-ingest
//!
//! Library code returns these typed errors; the binary and the sinks use
//! `anyhow` at the edges.

use thiserror::Error;

/// Failure talking to a CT log server or to the log-list source
#[derive(Debug, Error)]
pub enum FetchError {
    /// Transport-level failure (DNS, TLS, connect/read timeout, reset)
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// Server answered with a non-success status
    #[error("expected HTTP 200 from {url} but got {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    /// Server answered 200 with a body we could not decode
    #[error("malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: DecodeError,
    },

    /// The endpoint URL could not be built
    #[error("invalid url [{url}]: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    /// get-entries returned nothing for a non-empty range
    #[error("{url} returned no entries for range {start}-{end}")]
    EmptyRange { url: String, start: u64, end: u64 },
}

/// Malformed JSON or base64 payload
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid base64 in {field}: {source}")]
    Base64 {
        field: &'static str,
        #[source]
        source: base64::DecodeError,
    },
}

/// Leaf structure or DER certificate could not be parsed
#[derive(Debug, Error)]
pub enum CertificateParseError {
    #[error("{what} truncated: need {needed} bytes, have {available}")]
    Truncated {
        what: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("unsupported CT leaf version {0}")]
    UnsupportedVersion(u8),

    #[error("unsupported Merkle leaf type {0}")]
    UnsupportedLeafType(u8),

    #[error("invalid DER certificate: {0}")]
    Der(String),
}

/// Domain has no label separator
#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid domain [{0}]")]
pub struct InvalidDomainError(pub String);

/// A field the record cannot be built without is missing
#[derive(Debug, Error, PartialEq, Eq)]
#[error("missing required field {0}")]
pub struct ValidationError(pub &'static str);

/// Any reason a single log entry could not be turned into a record
#[derive(Debug, Error)]
pub enum EntryError {
    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    CertificateParse(#[from] CertificateParseError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
