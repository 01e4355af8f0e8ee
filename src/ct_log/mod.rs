// src/ct_log/mod.rs
pub mod catalog;
pub mod client;
pub mod log_list;
pub mod poller;
pub mod types;

pub use catalog::{CatalogHandle, ServerCatalog};
pub use client::CtLogClient;
pub use log_list::{BAD_SERVERS, LogServerDirectory, UNKNOWN_OPERATOR};
pub use poller::{PollConfig, PollingEngine, TickSummary};
pub use types::{LogEntry, LogServer, RawEntry, SignedTreeHead};
