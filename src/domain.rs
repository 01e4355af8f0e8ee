// src/domain.rs
use std::collections::BTreeMap;

use crate::error::InvalidDomainError;

/// Split a hostname into its common-name field and last two labels.
///
/// Produces `ct_<prefix>_common_name`, `..._l1` (last label), `..._l2`
/// (second-to-last label) and `..._l12` (`l2.l1`).
pub fn split(domain: &str, prefix: &str) -> Result<BTreeMap<String, String>, InvalidDomainError> {
    if !domain.contains('.') {
        return Err(InvalidDomainError(domain.to_string()));
    }

    let mut levels = domain.rsplit('.');
    // contains('.') guarantees at least two labels
    let l1 = levels.next().unwrap_or_default();
    let l2 = levels.next().unwrap_or_default();

    let key = format!("ct_{}_common_name", prefix);
    let mut result = BTreeMap::new();
    result.insert(format!("{}_l1", key), l1.to_string());
    result.insert(format!("{}_l2", key), l2.to_string());
    result.insert(format!("{}_l12", key), format!("{}.{}", l2, l1));
    result.insert(key, domain.to_string());

    Ok(result)
}
