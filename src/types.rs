// src/types.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A decoded, issued certificate ready for the sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CertificateRecord {
    /// One-line description naming the subject common name
    pub summary: String,

    /// `ct_issuer_*` fields from the issuer DN
    pub issuer_fields: BTreeMap<String, String>,

    /// `ct_subject_*` fields from the subject DN
    pub subject_fields: BTreeMap<String, String>,

    /// `ct_subject_common_name_l1/l2/l12` labels, empty if the CN has no dot
    #[serde(default)]
    pub domain_labels: BTreeMap<String, String>,

    /// Edit distance between the subject CN and the reference domain
    pub similarity_score: u32,

    /// SHA-256 of the leaf DER, hex
    pub fingerprint: String,

    /// Certificate validity start (Unix timestamp)
    pub not_before: i64,

    /// Certificate validity end (Unix timestamp)
    pub not_after: i64,

    /// Leaf timestamp assigned by the log (Unix millis)
    pub logged_at: u64,

    /// When this entry was decoded
    pub seen_at: DateTime<Utc>,

    /// CT log the entry was read from
    pub log_url: Option<String>,

    /// Index of the entry in that log
    pub entry_index: Option<u64>,
}

impl CertificateRecord {
    pub fn subject_common_name(&self) -> Option<&str> {
        self.subject_fields
            .get("ct_subject_common_name")
            .map(String::as_str)
    }

    pub fn issuer_common_name(&self) -> Option<&str> {
        self.issuer_fields
            .get("ct_issuer_common_name")
            .map(String::as_str)
    }
}

impl fmt::Display for CertificateRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary)?;
        if let Some(issuer) = self.issuer_common_name() {
            write!(f, " by [{}]", issuer)?;
        }
        write!(f, " (distance {})", self.similarity_score)?;
        if let (Some(url), Some(index)) = (&self.log_url, self.entry_index) {
            write!(f, " <{}#{}>", url, index)?;
        }
        Ok(())
    }
}

#[cfg(test)]
pub(crate) fn sample_record() -> CertificateRecord {
    let mut subject_fields = BTreeMap::new();
    subject_fields.insert("ct_subject_common_name".to_string(), "foo.example.org".to_string());
    let mut issuer_fields = BTreeMap::new();
    issuer_fields.insert("ct_issuer_common_name".to_string(), "Test Issuing CA".to_string());

    CertificateRecord {
        summary: "[CT] Certificate for [foo.example.org] issued".to_string(),
        issuer_fields,
        subject_fields,
        domain_labels: BTreeMap::new(),
        similarity_score: 7,
        fingerprint: "00".repeat(32),
        not_before: 1_600_000_000,
        not_after: 1_700_000_000,
        logged_at: 1_650_000_000_000,
        seen_at: DateTime::from_timestamp(1_650_000_001, 0).unwrap_or_default(),
        log_url: Some("ct.example.com/".to_string()),
        entry_index: Some(12),
    }
}
