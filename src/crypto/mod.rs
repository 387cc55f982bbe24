//! Cryptographic utilities for the wallet
//!
//! This module provides:
//! - SHA-256 / HASH160 hashing and Base58Check encoding
//! - ECDSA key management with recoverable signatures (secp256k1)

pub mod hash;
pub mod keys;

pub use hash::{base58check_decode, base58check_encode, double_sha256, hash160, sha256, sha256_hex};
pub use keys::{recover_signer, sign_recoverable, KeyError, KeyPair, SIGNATURE_LEN};
