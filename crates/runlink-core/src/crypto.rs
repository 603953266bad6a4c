//! Hashing utilities for Runlink
//!
//! Commitments are SHA-256 over the canonical JSON encoding of the terms.

use serde::Serialize;
use sha2::{Digest, Sha256};

use runlink_types::{CommitmentDigest, RequestTerms, Result};

/// Compute SHA256 hash of data
pub fn hash_sha256(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

/// Hash any serializable object
pub fn hash_object<T: Serialize>(obj: &T) -> Result<String> {
    let json = serde_json::to_vec(obj)?;
    Ok(hash_sha256(&json))
}

/// Commitment digest binding a request's terms
pub fn commitment_digest(terms: &RequestTerms) -> Result<CommitmentDigest> {
    Ok(CommitmentDigest(hash_object(terms)?))
}
