//! Signature verification for approvals
//!
//! The wallet never checks signatures itself; it asks a [`SignatureVerifier`]
//! whether a signature over an operation digest was produced by the claimed
//! owner. [`Secp256k1Verifier`] is the default, recovering the signing key
//! from a recoverable ECDSA signature.

use super::owner::Owner;
use crate::crypto::recover_signer;

/// Checks that `signature` over `digest` was produced by `claimed_signer`
pub trait SignatureVerifier {
    fn verify(&self, digest: &[u8], signature: &[u8], claimed_signer: &Owner) -> bool;
}

impl<F> SignatureVerifier for F
where
    F: Fn(&[u8], &[u8], &Owner) -> bool,
{
    fn verify(&self, digest: &[u8], signature: &[u8], claimed_signer: &Owner) -> bool {
        self(digest, signature, claimed_signer)
    }
}

/// Verifies 65-byte recoverable secp256k1 signatures
#[derive(Clone, Copy, Debug, Default)]
pub struct Secp256k1Verifier;

impl SignatureVerifier for Secp256k1Verifier {
    fn verify(&self, digest: &[u8], signature: &[u8], claimed_signer: &Owner) -> bool {
        match recover_signer(digest, signature) {
            Ok(public_key) => Owner::from_public_key(&public_key) == *claimed_signer,
            Err(e) => {
                log::debug!("Signature recovery failed: {}", e);
                false
            }
        }
    }
}
