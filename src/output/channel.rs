// src/output/channel.rs
//! Sink that hands records to a host pipeline over a tokio channel

use crate::output::CertificateSink;
use crate::types::CertificateRecord;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;

/// Forwards records into a bounded mpsc channel
///
/// A full channel is waited on for at most `send_timeout`; after that the
/// record is dropped and an error returned.
pub struct ChannelSink {
    tx: mpsc::Sender<CertificateRecord>,
    send_timeout: Duration,
}

impl ChannelSink {
    pub fn new(tx: mpsc::Sender<CertificateRecord>, send_timeout: Duration) -> Self {
        Self { tx, send_timeout }
    }

    /// Create a sink and the receiving end of its channel
    pub fn channel(
        capacity: usize,
        send_timeout: Duration,
    ) -> (Self, mpsc::Receiver<CertificateRecord>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self::new(tx, send_timeout), rx)
    }
}

#[async_trait]
impl CertificateSink for ChannelSink {
    async fn emit(&self, record: CertificateRecord) -> anyhow::Result<()> {
        match self.tx.send_timeout(record, self.send_timeout).await {
            Ok(()) => Ok(()),
            Err(mpsc::error::SendTimeoutError::Timeout(_)) => {
                anyhow::bail!("Certificate pipeline full for {:?}, record dropped", self.send_timeout)
            }
            Err(mpsc::error::SendTimeoutError::Closed(_)) => {
                anyhow::bail!("Certificate pipeline closed")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_record;

    #[tokio::test]
    async fn test_channel_sink_delivers() {
        let (sink, mut rx) = ChannelSink::channel(4, Duration::from_millis(50));

        sink.emit(sample_record()).await.unwrap();

        let received = rx.recv().await.unwrap();
        assert_eq!(received, sample_record());
    }

    #[tokio::test]
    async fn test_channel_sink_full_times_out() {
        let (sink, _rx) = ChannelSink::channel(1, Duration::from_millis(20));

        sink.emit(sample_record()).await.unwrap();
        let err = sink.emit(sample_record()).await.unwrap_err();
        assert!(err.to_string().contains("full"));
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (sink, rx) = ChannelSink::channel(1, Duration::from_millis(20));
        drop(rx);

        let err = sink.emit(sample_record()).await.unwrap_err();
        assert!(err.to_string().contains("closed"));
    }
}
