//! Hashing and address encoding utilities
//!
//! Provides SHA-256 and HASH160 digests plus the Base58Check encoding
//! used for owner and wallet addresses.

use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// Length of a Base58Check checksum in bytes
pub const CHECKSUM_LEN: usize = 4;

/// Computes SHA-256 hash of the input data
pub fn sha256(data: &[u8]) -> Vec<u8> {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().to_vec()
}

/// Computes double SHA-256 hash (SHA-256 of SHA-256)
pub fn double_sha256(data: &[u8]) -> Vec<u8> {
    sha256(&sha256(data))
}

/// Computes SHA-256 hash and returns it as a hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// RIPEMD160(SHA256(data)), the 20-byte digest behind every address
pub fn hash160(data: &[u8]) -> [u8; 20] {
    let mut ripemd = Ripemd160::new();
    ripemd.update(sha256(data));

    let mut out = [0u8; 20];
    out.copy_from_slice(&ripemd.finalize());
    out
}

/// Encode `version || payload || checksum` as Base58
pub fn base58check_encode(version: u8, payload: &[u8]) -> String {
    let mut bytes = Vec::with_capacity(1 + payload.len() + CHECKSUM_LEN);
    bytes.push(version);
    bytes.extend_from_slice(payload);

    let checksum = double_sha256(&bytes);
    bytes.extend_from_slice(&checksum[..CHECKSUM_LEN]);

    bs58::encode(bytes).into_string()
}

/// Decode a Base58Check string into `(version, payload)`
///
/// Returns `None` if the text is not valid Base58 or the checksum does not match.
pub fn base58check_decode(text: &str) -> Option<(u8, Vec<u8>)> {
    let bytes = bs58::decode(text).into_vec().ok()?;
    if bytes.len() < 1 + CHECKSUM_LEN {
        return None;
    }

    let (body, checksum) = bytes.split_at(bytes.len() - CHECKSUM_LEN);
    if double_sha256(body)[..CHECKSUM_LEN] != *checksum {
        return None;
    }

    Some((body[0], body[1..].to_vec()))
}
