use serde_json::Value;
use sha2::{Digest, Sha256};

/// SHA-256 over the JSON renderings of `fields`, sorted and space-joined,
/// so the digest does not depend on argument order.
pub fn crypto_hash(fields: &[Value]) -> String {
    hex::encode(digest_parts(fields.iter().map(Value::to_string).collect()))
}

/// Same digest as [`crypto_hash`] for fields already rendered to JSON.
/// Mining uses this to avoid re-serializing the block body per nonce.
pub fn digest_parts(mut parts: Vec<String>) -> [u8; 32] {
    parts.sort();
    let mut hasher = Sha256::new();
    hasher.update(parts.join(" ").as_bytes());
    hasher.finalize().into()
}

/// 32-byte message that gets signed for `data`.
pub fn signing_digest(data: &Value) -> [u8; 32] {
    digest_parts(vec![data.to_string()])
}
