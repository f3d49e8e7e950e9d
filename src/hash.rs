//! Stable identities for package references.
use sha2::{Digest, Sha256};

/// Number of digest bytes kept in an identity.
const IDENTITY_BYTES: usize = 8;

/// Derives the job key (and log file stem) for a package reference.
///
/// The key is the first eight bytes of the SHA-256 digest of the reference,
/// rendered as lowercase hex.
pub fn identity(reference: &str) -> String {
    let digest = Sha256::digest(reference.as_bytes());
    digest[..IDENTITY_BYTES]
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
