// src/output/json.rs
//! JSON Lines (JSONL) output

use crate::output::CertificateSink;
use crate::types::CertificateRecord;
use async_trait::async_trait;
use std::io::{self, Write};
use std::sync::Mutex;

/// Writes one JSON object per record per line
pub struct JsonSink {
    writer: Mutex<Box<dyn Write + Send>>,
}

impl JsonSink {
    /// Create a new JsonSink that writes to stdout
    pub fn new() -> Self {
        Self::to_writer(Box::new(io::stdout()))
    }

    /// Create a new JsonSink that writes to a file
    pub fn to_file(file: std::fs::File) -> Self {
        Self::to_writer(Box::new(file))
    }

    pub fn to_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }
}

impl Default for JsonSink {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CertificateSink for JsonSink {
    async fn emit(&self, record: CertificateRecord) -> anyhow::Result<()> {
        let json = serde_json::to_string(&record)?;

        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("JSON output writer poisoned"))?;
        writeln!(writer, "{}", json)?;
        writer.flush()?;

        Ok(())
    }

    async fn flush(&self) -> anyhow::Result<()> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| anyhow::anyhow!("JSON output writer poisoned"))?;
        writer.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::sample_record;
    use std::io::{Read, Seek, SeekFrom};

    #[tokio::test]
    async fn test_json_sink_writes_lines() {
        let mut file = tempfile::tempfile().unwrap();
        let sink = JsonSink::to_file(file.try_clone().unwrap());

        sink.emit(sample_record()).await.unwrap();
        sink.emit(sample_record()).await.unwrap();
        sink.flush().await.unwrap();

        let mut contents = String::new();
        file.seek(SeekFrom::Start(0)).unwrap();
        file.read_to_string(&mut contents).unwrap();

        let lines: Vec<&str> = contents.lines().collect();
        assert_eq!(lines.len(), 2);
        let parsed: CertificateRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.subject_common_name(), Some("foo.example.org"));
    }
}
