// src/output/mod.rs
//! Certificate sinks
//!
//! The polling engine hands every decoded record to a [`CertificateSink`] and
//! moves on. Delivery guarantees and backpressure belong to the sink.

use crate::types::CertificateRecord;
use async_trait::async_trait;

pub mod channel;
pub mod human;
pub mod json;

pub use channel::ChannelSink;
pub use human::HumanSink;
pub use json::JsonSink;

/// Receives decoded certificate records one at a time
#[async_trait]
pub trait CertificateSink: Send + Sync {
    /// Accept one record; must not block indefinitely
    async fn emit(&self, record: CertificateRecord) -> anyhow::Result<()>;

    /// Flush any buffered output
    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use tokio::sync::Mutex;

    /// Sink that keeps everything it receives
    #[derive(Default)]
    pub struct CollectingSink {
        pub records: Mutex<Vec<CertificateRecord>>,
    }

    #[async_trait]
    impl CertificateSink for CollectingSink {
        async fn emit(&self, record: CertificateRecord) -> anyhow::Result<()> {
            self.records.lock().await.push(record);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_default_flush_is_ok() {
        let sink = CollectingSink::default();
        sink.emit(crate::types::sample_record()).await.unwrap();
        assert!(sink.flush().await.is_ok());
        assert_eq!(sink.records.lock().await.len(), 1);
    }
}
