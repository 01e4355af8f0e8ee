// src/decoder.rs
use chrono::Utc;
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use tracing::{debug, error};
use x509_parser::oid_registry::{
    OID_X509_COMMON_NAME, OID_X509_COUNTRY_NAME, OID_X509_ORGANIZATIONAL_UNIT,
    OID_X509_ORGANIZATION_NAME,
};
use x509_parser::prelude::*;

use crate::ct_log::types::RawEntry;
use crate::domain;
use crate::error::{CertificateParseError, EntryError, ValidationError};
use crate::types::CertificateRecord;

const SUBJECT_COMMON_NAME: &str = "ct_subject_common_name";

/// A Merkle tree leaf decoded per RFC 6962 §3.4
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLogEntry {
    X509 {
        timestamp: u64,
        leaf_certificate: Vec<u8>,
        certificate_chain: Vec<Vec<u8>>,
    },
    PreCert {
        timestamp: u64,
        issuer_key_hash: [u8; 32],
        tbs_certificate: Vec<u8>,
        pre_certificate: Option<Vec<u8>>,
        certificate_chain: Vec<Vec<u8>>,
    },
    Unknown {
        entry_type: u16,
    },
}

impl ParsedLogEntry {
    /// Parse a leaf and its extra data
    ///
    /// Layout of `leaf_input`:
    /// version(1) leaf_type(1) timestamp(8) entry_type(2) signed_entry extensions
    pub fn parse(entry: &RawEntry) -> Result<Self, CertificateParseError> {
        let mut leaf = TlsReader::new(&entry.leaf_input);

        let version = leaf.u8("leaf version")?;
        if version != 0 {
            return Err(CertificateParseError::UnsupportedVersion(version));
        }

        let leaf_type = leaf.u8("leaf type")?;
        if leaf_type != 0 {
            return Err(CertificateParseError::UnsupportedLeafType(leaf_type));
        }

        let timestamp = leaf.u64("leaf timestamp")?;
        let entry_type = leaf.u16("entry type")?;

        match entry_type {
            0 => {
                let leaf_certificate = leaf.opaque24("x509 leaf certificate")?.to_vec();
                let certificate_chain = if entry.extra_data.is_empty() {
                    Vec::new()
                } else {
                    let mut extra = TlsReader::new(&entry.extra_data);
                    parse_chain(extra.opaque24("certificate chain")?)?
                };

                Ok(Self::X509 {
                    timestamp,
                    leaf_certificate,
                    certificate_chain,
                })
            }
            1 => {
                let hash = leaf.bytes(32, "issuer key hash")?;
                let mut issuer_key_hash = [0u8; 32];
                issuer_key_hash.copy_from_slice(hash);
                let tbs_certificate = leaf.opaque24("tbs certificate")?.to_vec();

                let (pre_certificate, certificate_chain) = if entry.extra_data.is_empty() {
                    (None, Vec::new())
                } else {
                    let mut extra = TlsReader::new(&entry.extra_data);
                    let pre_certificate = extra.opaque24("pre-certificate")?.to_vec();
                    let chain = parse_chain(extra.opaque24("pre-certificate chain")?)?;
                    (Some(pre_certificate), chain)
                };

                Ok(Self::PreCert {
                    timestamp,
                    issuer_key_hash,
                    tbs_certificate,
                    pre_certificate,
                    certificate_chain,
                })
            }
            other => Ok(Self::Unknown { entry_type: other }),
        }
    }
}

fn parse_chain(bytes: &[u8]) -> Result<Vec<Vec<u8>>, CertificateParseError> {
    let mut reader = TlsReader::new(bytes);
    let mut chain = Vec::new();
    while !reader.is_empty() {
        chain.push(reader.opaque24("chain certificate")?.to_vec());
    }
    Ok(chain)
}

/// Big-endian cursor over TLS presentation-language structures
struct TlsReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> TlsReader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.buf.len()
    }

    fn bytes(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], CertificateParseError> {
        let available = self.buf.len() - self.pos;
        if len > available {
            return Err(CertificateParseError::Truncated {
                what,
                needed: len,
                available,
            });
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8, CertificateParseError> {
        Ok(self.bytes(1, what)?[0])
    }

    fn u16(&mut self, what: &'static str) -> Result<u16, CertificateParseError> {
        let b = self.bytes(2, what)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u64(&mut self, what: &'static str) -> Result<u64, CertificateParseError> {
        let b = self.bytes(8, what)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    /// `opaque<0..2^24-1>`: 3-byte length prefix then data
    fn opaque24(&mut self, what: &'static str) -> Result<&'a [u8], CertificateParseError> {
        let b = self.bytes(3, what)?;
        let len = ((b[0] as usize) << 16) | ((b[1] as usize) << 8) | (b[2] as usize);
        self.bytes(len, what)
    }
}

/// Outcome of decoding one entry that did not fail
#[derive(Debug)]
pub enum Decoded {
    Record(Box<CertificateRecord>),
    PreCert,
    Unknown(u16),
}

/// Turns raw CT log entries into certificate records
#[derive(Debug, Clone)]
pub struct CertificateDecoder {
    reference_domain: String,
}

impl CertificateDecoder {
    /// `reference_domain` is what subject names are scored against
    pub fn new(reference_domain: impl Into<String>) -> Self {
        Self {
            reference_domain: reference_domain.into(),
        }
    }

    /// Decode an entry, logging and dropping anything that is not an issued
    /// certificate with a subject common name
    pub fn decode(&self, entry: &RawEntry) -> Option<CertificateRecord> {
        match self.try_decode(entry) {
            Ok(Decoded::Record(record)) => Some(*record),
            Ok(Decoded::PreCert) => {
                debug!("Unsupported pre-certificate entry received. Skipping.");
                None
            }
            Ok(Decoded::Unknown(entry_type)) => {
                error!(
                    "Certificate Transparency entry is not a pre-cert or an issued X509 (type {}). Skipping.",
                    entry_type
                );
                None
            }
            Err(EntryError::Validation(e)) => {
                error!(
                    "Certificate Transparency entry is missing subject name (domain name): {}. Skipping.",
                    e
                );
                None
            }
            Err(e) => {
                error!("Could not decode Certificate Transparency entry: {}", e);
                None
            }
        }
    }

    /// Decode an entry, reporting why it produced no record
    pub fn try_decode(&self, entry: &RawEntry) -> Result<Decoded, EntryError> {
        match ParsedLogEntry::parse(entry)? {
            ParsedLogEntry::X509 {
                timestamp,
                leaf_certificate,
                ..
            } => {
                let record = self.record_from_der(&leaf_certificate, timestamp)?;
                Ok(Decoded::Record(Box::new(record)))
            }
            ParsedLogEntry::PreCert { .. } => Ok(Decoded::PreCert),
            ParsedLogEntry::Unknown { entry_type } => Ok(Decoded::Unknown(entry_type)),
        }
    }

    fn record_from_der(&self, der: &[u8], logged_at: u64) -> Result<CertificateRecord, EntryError> {
        let (_, cert) = X509Certificate::from_der(der)
            .map_err(|e| CertificateParseError::Der(e.to_string()))?;

        let issuer_fields = name_fields(cert.issuer(), "issuer");
        let subject_fields = name_fields(cert.subject(), "subject");

        let common_name = subject_fields
            .get(SUBJECT_COMMON_NAME)
            .filter(|cn| !cn.is_empty())
            .cloned()
            .ok_or(ValidationError(SUBJECT_COMMON_NAME))?;

        let domain_labels = match domain::split(&common_name, "subject") {
            Ok(mut labels) => {
                labels.remove(SUBJECT_COMMON_NAME);
                labels
            }
            Err(e) => {
                debug!("Not labelling subject name: {}", e);
                BTreeMap::new()
            }
        };

        let distance = strsim::levenshtein(&self.reference_domain, &common_name);

        let fingerprint = {
            let mut hasher = Sha256::new();
            hasher.update(der);
            hex::encode(hasher.finalize())
        };

        Ok(CertificateRecord {
            summary: format!("[CT] Certificate for [{}] issued", common_name),
            issuer_fields,
            subject_fields,
            domain_labels,
            similarity_score: u32::try_from(distance).unwrap_or(u32::MAX),
            fingerprint,
            not_before: cert.validity().not_before.timestamp(),
            not_after: cert.validity().not_after.timestamp(),
            logged_at,
            seen_at: Utc::now(),
            log_url: None,
            entry_index: None,
        })
    }
}

/// Map CN, C, O and OU attributes to `ct_<role>_*` keys; later RDNs win
fn name_fields(name: &X509Name<'_>, role: &str) -> BTreeMap<String, String> {
    let mut fields = BTreeMap::new();

    for rdn in name.iter() {
        for attr in rdn.iter() {
            let attr_type = attr.attr_type();
            let suffix = if attr_type == &OID_X509_COMMON_NAME {
                "common_name"
            } else if attr_type == &OID_X509_COUNTRY_NAME {
                "country"
            } else if attr_type == &OID_X509_ORGANIZATION_NAME {
                "organization"
            } else if attr_type == &OID_X509_ORGANIZATIONAL_UNIT {
                "organizational_unit"
            } else {
                continue;
            };

            match attr.as_str() {
                Ok(value) => {
                    fields.insert(format!("ct_{}_{}", role, suffix), value.to_string());
                }
                Err(e) => debug!("Skipping undecodable {} {} attribute: {}", role, suffix, e),
            }
        }
    }

    fields
}
