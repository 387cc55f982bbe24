//! Owner identities and the owner registry
//!
//! An [`Owner`] is the HASH160 of a secp256k1 public key, written as a
//! Base58Check address. The [`OwnerRegistry`] holds the authorized owner set
//! together with the approval threshold and guards the invariant
//! `1 <= threshold <= |owners|`.

use secp256k1::PublicKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use super::error::MultisigError;
use crate::crypto::{base58check_decode, base58check_encode, hash160};

/// Address version byte for owner identities (addresses start with '1')
pub const OWNER_VERSION: u8 = 0x00;

/// Maximum number of owners a wallet may have
pub const MAX_OWNERS: usize = 50;

/// An identity authorized to propose and approve operations
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Owner([u8; 20]);

impl Owner {
    /// The null identity; never a valid owner
    pub const ZERO: Owner = Owner([0u8; 20]);

    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Derive the owner identity of a public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        Self(hash160(&public_key.serialize()))
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }

    /// Base58Check address text
    pub fn to_address(&self) -> String {
        base58check_encode(OWNER_VERSION, &self.0)
    }
}

impl fmt::Display for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_address())
    }
}

impl fmt::Debug for Owner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Owner({})", self.to_address())
    }
}

impl FromStr for Owner {
    type Err = MultisigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (version, payload) = base58check_decode(s.trim())
            .ok_or_else(|| MultisigError::InvalidOwner(format!("malformed address {}", s)))?;

        if version != OWNER_VERSION {
            return Err(MultisigError::InvalidOwner(format!(
                "unexpected address version {:#04x}",
                version
            )));
        }

        let bytes: [u8; 20] = payload
            .try_into()
            .map_err(|_| MultisigError::InvalidOwner(format!("bad address length {}", s)))?;
        Ok(Self(bytes))
    }
}

impl TryFrom<String> for Owner {
    type Error = MultisigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Owner> for String {
    fn from(owner: Owner) -> Self {
        owner.to_address()
    }
}

/// The current set of authorized owners and the approval threshold
///
/// Mutators validate first and only then change state, so a failed call leaves
/// the registry untouched. Outside this crate the registry is read-only; the
/// only mutation path is executing an administrative operation.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerRegistry {
    owners: BTreeSet<Owner>,
    threshold: usize,
}

impl OwnerRegistry {
    /// Build a registry from the deployment parameters
    ///
    /// # Errors
    /// - `InvalidOwner` for the zero identity
    /// - `DuplicateOwner` if an identity appears twice
    /// - `TooManyOwners` above [`MAX_OWNERS`]
    /// - `ThresholdViolation` if the threshold is outside `1..=owners.len()`
    pub fn new(owners: Vec<Owner>, threshold: usize) -> Result<Self, MultisigError> {
        if owners.len() > MAX_OWNERS {
            return Err(MultisigError::TooManyOwners(MAX_OWNERS));
        }

        let mut set = BTreeSet::new();
        for owner in owners {
            if owner.is_zero() {
                return Err(MultisigError::InvalidOwner(
                    "the zero identity cannot be an owner".to_string(),
                ));
            }
            if !set.insert(owner) {
                return Err(MultisigError::DuplicateOwner(owner));
            }
        }

        Self::check_threshold(threshold, set.len())?;

        Ok(Self {
            owners: set,
            threshold,
        })
    }

    pub fn is_owner(&self, identity: &Owner) -> bool {
        self.owners.contains(identity)
    }

    pub fn owners(&self) -> impl Iterator<Item = &Owner> {
        self.owners.iter()
    }

    pub fn owner_count(&self) -> usize {
        self.owners.len()
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }

    pub(crate) fn add_owner(&mut self, identity: Owner) -> Result<(), MultisigError> {
        if identity.is_zero() {
            return Err(MultisigError::InvalidOwner(
                "the zero identity cannot be an owner".to_string(),
            ));
        }
        if self.owners.contains(&identity) {
            return Err(MultisigError::DuplicateOwner(identity));
        }
        if self.owners.len() >= MAX_OWNERS {
            return Err(MultisigError::TooManyOwners(MAX_OWNERS));
        }

        self.owners.insert(identity);
        Ok(())
    }

    pub(crate) fn remove_owner(&mut self, identity: &Owner) -> Result<(), MultisigError> {
        if !self.owners.contains(identity) {
            return Err(MultisigError::UnknownOwner(*identity));
        }

        let remaining = self.owners.len() - 1;
        if self.threshold > remaining {
            return Err(MultisigError::ThresholdViolation(format!(
                "removing {} would leave {} owners below threshold {}",
                identity, remaining, self.threshold
            )));
        }

        self.owners.remove(identity);
        Ok(())
    }

    /// Re-check the deployment invariants on a registry that was deserialized
    /// rather than built through [`OwnerRegistry::new`]
    pub fn validate(&self) -> Result<(), MultisigError> {
        if self.owners.len() > MAX_OWNERS {
            return Err(MultisigError::TooManyOwners(MAX_OWNERS));
        }
        if self.owners.contains(&Owner::ZERO) {
            return Err(MultisigError::InvalidOwner(
                "the zero identity cannot be an owner".to_string(),
            ));
        }
        Self::check_threshold(self.threshold, self.owners.len())
    }

    /// Returns the previous threshold
    pub(crate) fn set_threshold(&mut self, threshold: usize) -> Result<usize, MultisigError> {
        Self::check_threshold(threshold, self.owners.len())?;
        Ok(std::mem::replace(&mut self.threshold, threshold))
    }

    fn check_threshold(threshold: usize, owner_count: usize) -> Result<(), MultisigError> {
        if threshold == 0 {
            return Err(MultisigError::ThresholdViolation(
                "threshold must be at least 1".to_string(),
            ));
        }
        if threshold > owner_count {
            return Err(MultisigError::ThresholdViolation(format!(
                "threshold {} exceeds owner count {}",
                threshold, owner_count
            )));
        }
        Ok(())
    }
}
