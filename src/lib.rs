// src/lib.rs
// Library interface for ct-ingest
pub mod cli;
pub mod config;
pub mod ct_log;
pub mod decoder;
pub mod domain;
pub mod error;
pub mod output;
pub mod scheduler;
pub mod state;
pub mod types;
