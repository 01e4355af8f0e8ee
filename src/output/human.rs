// src/output/human.rs
//! Human-readable colored terminal output

use crate::output::CertificateSink;
use crate::types::CertificateRecord;
use async_trait::async_trait;
use colored::Colorize;
use std::io::{self, Write};
use std::sync::Mutex;

/// Human-readable sink with colored terminal output
pub struct HumanSink {
    writer: Mutex<Box<dyn Write + Send>>,
    use_colors: bool,
}

impl HumanSink {
    /// Create a new HumanSink that writes to stdout
    pub fn new() -> Self {
        Self {
            writer: Mutex::new(Box::new(io::stdout())),
            use_colors: is_terminal::is_terminal(std::io::stdout()),
        }
    }

    /// Create a new HumanSink that writes to a file
    pub fn to_file(file: std::fs::File) -> Self {
        Self {
            writer: Mutex::new(Box::new(file)),
            use_colors: false, // No colors when writing to file
        }
    }

    fn format_line(&self, record: &CertificateRecord) -> String {
        let timestamp = record.seen_at.format("%Y-%m-%d %H:%M:%S").to_string();
        let cn = record.subject_common_name().unwrap_or_default();
        let issuer = record.issuer_common_name().unwrap_or("unknown issuer");
        let source = match (&record.log_url, record.entry_index) {
            (Some(url), Some(index)) => format!("{}#{}", url, index),
            _ => "-".to_string(),
        };

        if self.use_colors {
            format!(
                "{} {} {} {} {} {}",
                format!("[{}]", timestamp).dimmed(),
                "[+]".green().bold(),
                cn.cyan().bold(),
                format!("issuer={}", issuer).yellow(),
                format!("distance={}", record.similarity_score).magenta(),
                source.dimmed()
            )
        } else {
            format!(
                "[{}] [+] {} issuer={} distance={} {}",
                timestamp, cn, issuer, record.similarity_score, source
            )
        }
    }
}

impl Default for HumanSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CertificateSink for HumanSink {
    async fn emit(&self, record: CertificateRecord) -> anyhow::Result<()> {
        let line = self.format_line(&record);

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("output writer poisoned"))?;
        writeln!(writer, "{}", line)?;
        writer.flush()?;

        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("output writer poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_record;

    #[test]
    fn test_plain_line_format() {
        let sink = HumanSink::to_file(tempfile::tempfile().unwrap());
        let line = sink.format_line(&sample_record());

        assert_eq!(
            line,
            "[2022-04-15 05:20:01] [+] foo.example.org issuer=Test Issuing CA distance=7 ct.example.com/#12"
        );
    }

    #[tokio::test]
    async fn test_human_emit() {
        let sink = HumanSink::to_file(tempfile::tempfile().unwrap());
        assert!(sink.emit(sample_record()).await.is_ok());
        assert!(sink.flush().await.is_ok());
    }
}
