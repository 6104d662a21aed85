//! Stable hashing helpers for configs and sorted outputs.

use blake3::Hasher;
use serde::Serialize;

use crate::tuple::Tuple;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub fn to_hex(&self) -> String {
        // blake3 hex(32b) is 64 hex chars
        let mut s = String::with_capacity(64);
        for b in &self.0 {
            use std::fmt::Write as _;
            let _ = write!(&mut s, "{:02x}", b);
        }
        s
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub fn hash_bytes(bytes: &[u8]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(bytes);
    Hash256(h.finalize().into())
}

/// Hash any serde-serializable value deterministically (via JSON).
pub fn hash_serde<T: Serialize>(v: &T) -> Result<Hash256, crate::error::Error> {
    let bytes = serde_json::to_vec(v)
        .map_err(|e| crate::error::Error::Invariant(format!("hash serialization: {e}")))?;
    Ok(hash_bytes(&bytes))
}

/// Order-sensitive digest of a tuple sequence: equal digests mean the same
/// tuples in the same order, payloads included.
pub fn digest_tuples(tuples: &[Tuple]) -> Hash256 {
    let mut h = Hasher::new();
    h.update(&(tuples.len() as u64).to_le_bytes());
    for t in tuples {
        h.update(&t.key.to_le_bytes());
        h.update(&t.id.get().to_le_bytes());
        h.update(&(t.payload.len() as u64).to_le_bytes());
        h.update(&t.payload);
    }
    Hash256(h.finalize().into())
}
