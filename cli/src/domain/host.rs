//! Host facts parsing and certificate fingerprints.

use sha2::{Digest, Sha256};

/// `MemTotal` in KiB from `/proc/meminfo` content.
#[must_use]
pub fn parse_mem_total_kib(meminfo: &str) -> Option<u64> {
    meminfo.lines().find_map(|line| {
        let rest = line.strip_prefix("MemTotal:")?;
        rest.split_whitespace().next()?.parse().ok()
    })
}

/// SHA-256 fingerprint of the first certificate in `pem_data`, formatted as
/// colon-separated upper-case hex (the form `openssl x509 -fingerprint` prints).
#[must_use]
pub fn certificate_fingerprint(pem_data: &[u8]) -> Option<String> {
    let blocks = pem::parse_many(pem_data).ok()?;
    let cert = blocks.iter().find(|b| b.tag() == "CERTIFICATE")?;
    let digest = Sha256::digest(cert.contents());
    Some(
        digest
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect::<Vec<_>>()
            .join(":"),
    )
}
