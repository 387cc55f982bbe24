//! ECDSA key management for wallet owners
//!
//! Provides key pair generation, recoverable signing, and signer recovery
//! using the secp256k1 elliptic curve.

use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::sha256;
use crate::multisig::Owner;

/// Length of a serialized recoverable signature: `r || s || recovery id`
pub const SIGNATURE_LEN: usize = 65;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// The owner identity controlled by this key
    pub fn owner(&self) -> Owner {
        Owner::from_public_key(&self.public_key)
    }

    /// Sign a digest, producing a 65-byte recoverable signature
    pub fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_recoverable(&self.secret_key, digest)
    }
}

/// Digests that are not already 32 bytes are hashed down to one
fn to_message(digest: &[u8]) -> Result<Message, KeyError> {
    let hash = if digest.len() == 32 {
        digest.to_vec()
    } else {
        sha256(digest)
    };
    Ok(Message::from_digest_slice(&hash)?)
}

/// Sign a digest with a secret key
pub fn sign_recoverable(secret_key: &SecretKey, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = to_message(digest)?;

    let (recovery_id, compact) = secp
        .sign_ecdsa_recoverable(&message, secret_key)
        .serialize_compact();

    let mut signature = Vec::with_capacity(SIGNATURE_LEN);
    signature.extend_from_slice(&compact);
    signature.push(recovery_id.to_i32() as u8);
    Ok(signature)
}

/// Recover the public key that produced `signature` over `digest`
pub fn recover_signer(digest: &[u8], signature: &[u8]) -> Result<PublicKey, KeyError> {
    if signature.len() != SIGNATURE_LEN {
        return Err(KeyError::InvalidSignature);
    }

    let secp = Secp256k1::new();
    let message = to_message(digest)?;

    let recovery_id = RecoveryId::from_i32(i32::from(signature[64]))
        .map_err(|_| KeyError::InvalidSignature)?;
    let sig = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|_| KeyError::InvalidSignature)?;

    Ok(secp.recover_ecdsa(&message, &sig)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_pair_generation() {
        let kp = KeyPair::generate();
        assert!(!kp.private_key_hex().is_empty());
        assert!(!kp.public_key_hex().is_empty());
        assert!(!kp.owner().is_zero());
    }

    #[test]
    fn test_sign_and_recover() {
        let kp = KeyPair::generate();
        let digest = sha256(b"operation digest");

        let signature = kp.sign_digest(&digest).unwrap();
        assert_eq!(signature.len(), SIGNATURE_LEN);

        let recovered = recover_signer(&digest, &signature).unwrap();
        assert_eq!(recovered, kp.public_key);
    }

    #[test]
    fn test_recover_with_other_digest_yields_other_key() {
        let kp = KeyPair::generate();
        let signature = kp.sign_digest(&sha256(b"one")).unwrap();

        if let Ok(recovered) = recover_signer(&sha256(b"two"), &signature) {
            assert_ne!(recovered, kp.public_key);
        }
    }

    #[test]
    fn test_recover_rejects_malformed_signature() {
        let digest = sha256(b"digest");
        assert!(matches!(
            recover_signer(&digest, &[0u8; 10]),
            Err(KeyError::InvalidSignature)
        ));

        let mut bad_recid = vec![1u8; SIGNATURE_LEN];
        bad_recid[64] = 9;
        assert!(matches!(
            recover_signer(&digest, &bad_recid),
            Err(KeyError::InvalidSignature)
        ));
    }

    #[test]
    fn test_key_pair_from_hex() {
        let kp1 = KeyPair::generate();
        let private_hex = kp1.private_key_hex();

        let kp2 = KeyPair::from_private_key_hex(&private_hex).unwrap();
        assert_eq!(kp1.public_key_hex(), kp2.public_key_hex());
        assert_eq!(kp1.owner(), kp2.owner());
    }
}
