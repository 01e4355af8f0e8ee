// Shared helpers for integration tests
#![allow(dead_code)]

use base64::{Engine as _, engine::general_purpose::STANDARD};
use ct_ingest::ct_log::{CatalogHandle, CtLogClient, LogServer, PollConfig, PollingEngine, ServerCatalog};
use ct_ingest::decoder::CertificateDecoder;
use ct_ingest::output::ChannelSink;
use ct_ingest::types::CertificateRecord;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const LEAF_DER: &[u8] = include_bytes!("../fixtures/leaf.der");
pub const TYPO_DER: &[u8] = include_bytes!("../fixtures/typo.der");
pub const NO_CN_DER: &[u8] = include_bytes!("../fixtures/no_cn.der");
pub const CA_DER: &[u8] = include_bytes!("../fixtures/issuer_ca.der");

fn u24(len: usize) -> [u8; 3] {
    [(len >> 16) as u8, (len >> 8) as u8, len as u8]
}

fn leaf_header(entry_type: u16) -> Vec<u8> {
    let mut leaf = vec![0u8, 0u8];
    leaf.extend_from_slice(&1_650_000_000_000u64.to_be_bytes());
    leaf.extend_from_slice(&entry_type.to_be_bytes());
    leaf
}

fn chain(certs: &[&[u8]]) -> Vec<u8> {
    let mut body = Vec::new();
    for cert in certs {
        body.extend_from_slice(&u24(cert.len()));
        body.extend_from_slice(cert);
    }
    let mut out = u24(body.len()).to_vec();
    out.extend(body);
    out
}

fn entry(leaf: &[u8], extra: &[u8]) -> Value {
    json!({
        "leaf_input": STANDARD.encode(leaf),
        "extra_data": STANDARD.encode(extra),
    })
}

/// get-entries item for a plain X.509 leaf issued by the test CA
pub fn x509_entry(der: &[u8]) -> Value {
    let mut leaf = leaf_header(0);
    leaf.extend_from_slice(&u24(der.len()));
    leaf.extend_from_slice(der);
    leaf.extend_from_slice(&[0, 0]);
    entry(&leaf, &chain(&[CA_DER]))
}

/// get-entries item for a pre-certificate
pub fn precert_entry() -> Value {
    let mut leaf = leaf_header(1);
    leaf.extend_from_slice(&[9u8; 32]);
    leaf.extend_from_slice(&u24(LEAF_DER.len()));
    leaf.extend_from_slice(LEAF_DER);
    leaf.extend_from_slice(&[0, 0]);

    let mut extra = u24(LEAF_DER.len()).to_vec();
    extra.extend_from_slice(LEAF_DER);
    extra.extend(chain(&[CA_DER]));
    entry(&leaf, &extra)
}

pub async fn mount_sth(server: &MockServer, tree_size: u64) {
    Mock::given(method("GET"))
        .and(path("/ct/v1/get-sth"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "tree_size": tree_size,
            "timestamp": 1_650_000_000_000u64,
            "sha256_root_hash": "AAAA",
            "tree_head_signature": "AAAA",
        })))
        .mount(server)
        .await;
}

pub fn entries_request(start: u64, end: u64) -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path("/ct/v1/get-entries"))
        .and(query_param("start", start.to_string()))
        .and(query_param("end", end.to_string()))
}

pub async fn mount_entries(server: &MockServer, start: u64, end: u64, entries: Vec<Value>) {
    entries_request(start, end)
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "entries": entries })))
        .expect(1)
        .mount(server)
        .await;
}

/// Catalog url for a mock server, in the list's trailing-slash form
pub fn log_url(server: &MockServer) -> String {
    format!("{}/", server.uri())
}

pub fn mock_log(server: &MockServer) -> LogServer {
    LogServer::new("Mock log", log_url(server), vec!["Test Operator".to_string()])
}

pub struct Harness {
    pub engine: PollingEngine,
    pub records: mpsc::Receiver<CertificateRecord>,
}

impl Harness {
    pub fn new(servers: Vec<LogServer>, config: PollConfig) -> Self {
        let (sink, records) = ChannelSink::channel(1024, Duration::from_millis(100));
        let engine = PollingEngine::new(
            CtLogClient::new(reqwest::Client::new()),
            Arc::new(CatalogHandle::new(ServerCatalog::new(servers))),
            CertificateDecoder::new("example.org"),
            Arc::new(sink),
            config,
        );
        Self { engine, records }
    }

    /// Everything emitted so far
    pub fn drain(&mut self) -> Vec<CertificateRecord> {
        let mut out = Vec::new();
        while let Ok(record) = self.records.try_recv() {
            out.push(record);
        }
        out
    }
}
