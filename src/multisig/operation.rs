//! Proposed operations and their effects
//!
//! An [`Operation`] wraps an [`Effect`] with a sequence id, a creation
//! timestamp, and the set of owners that approved it. Signers sign the
//! operation's canonical digest, which binds the effect to a single wallet
//! and a single sequence id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::owner::Owner;
use crate::crypto::sha256;

/// Sequence id of an operation, assigned at proposal time
pub type OperationId = u64;

/// Domain separation tag for operation digests
const DIGEST_DOMAIN: &[u8] = b"MULTISIG-OP\x01";

/// The state-changing action an operation performs once executed
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Effect {
    /// Send value held by the wallet to an address
    Transfer { to: String, amount: u64 },
    AddOwner { owner: Owner },
    RemoveOwner { owner: Owner },
    SetThreshold { threshold: usize },
    /// Opaque call handed to the hosting ledger
    ExternalCall {
        target: String,
        #[serde(with = "hex_bytes")]
        payload: Vec<u8>,
    },
}

impl Effect {
    /// Canonical byte encoding: tag byte followed by length-prefixed fields
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        match self {
            Effect::Transfer { to, amount } => {
                out.push(0x01);
                put_bytes(&mut out, to.as_bytes());
                out.extend_from_slice(&amount.to_be_bytes());
            }
            Effect::AddOwner { owner } => {
                out.push(0x02);
                out.extend_from_slice(owner.as_bytes());
            }
            Effect::RemoveOwner { owner } => {
                out.push(0x03);
                out.extend_from_slice(owner.as_bytes());
            }
            Effect::SetThreshold { threshold } => {
                out.push(0x04);
                out.extend_from_slice(&(*threshold as u64).to_be_bytes());
            }
            Effect::ExternalCall { target, payload } => {
                out.push(0x05);
                put_bytes(&mut out, target.as_bytes());
                put_bytes(&mut out, payload);
            }
        }
        out
    }
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    out.extend_from_slice(bytes);
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Transfer { to, amount } => write!(f, "transfer {} to {}", amount, to),
            Effect::AddOwner { owner } => write!(f, "add owner {}", owner),
            Effect::RemoveOwner { owner } => write!(f, "remove owner {}", owner),
            Effect::SetThreshold { threshold } => write!(f, "set threshold to {}", threshold),
            Effect::ExternalCall { target, payload } => {
                write!(f, "call {} with {} byte payload", target, payload.len())
            }
        }
    }
}

/// Lifecycle of an operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OperationStatus {
    /// Collecting approvals; may stay here indefinitely
    Proposed,
    /// Effect applied; terminal
    Executed,
}

/// What an executed operation did
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExecutionResult {
    Transferred {
        to: String,
        amount: u64,
        remaining_balance: u64,
    },
    OwnerAdded {
        owner: Owner,
    },
    OwnerRemoved {
        owner: Owner,
    },
    ThresholdChanged {
        previous: usize,
        current: usize,
    },
    CallDispatched {
        target: String,
        payload_digest: String,
    },
}

/// A proposed operation awaiting approval or already executed
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Operation {
    pub id: OperationId,
    pub effect: Effect,
    pub proposer: Owner,
    /// Address of the wallet this operation belongs to
    pub wallet: String,
    pub created_at: DateTime<Utc>,
    /// Every owner that approved, including ones removed since
    pub approvals: BTreeSet<Owner>,
    pub status: OperationStatus,
    pub executed_at: Option<DateTime<Utc>>,
    pub result: Option<ExecutionResult>,
}

impl Operation {
    pub(crate) fn new(id: OperationId, effect: Effect, proposer: Owner, wallet: String) -> Self {
        let mut approvals = BTreeSet::new();
        approvals.insert(proposer);

        Self {
            id,
            effect,
            proposer,
            wallet,
            created_at: Utc::now(),
            approvals,
            status: OperationStatus::Proposed,
            executed_at: None,
            result: None,
        }
    }

    /// The digest owners sign to approve this operation
    ///
    /// `SHA256(domain || wallet || id || created_at millis || effect)`
    pub fn digest(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(128);
        data.extend_from_slice(DIGEST_DOMAIN);
        put_bytes(&mut data, self.wallet.as_bytes());
        data.extend_from_slice(&self.id.to_be_bytes());
        data.extend_from_slice(&self.created_at.timestamp_millis().to_be_bytes());
        data.extend_from_slice(&self.effect.encode());
        sha256(&data)
    }

    pub fn digest_hex(&self) -> String {
        hex::encode(self.digest())
    }

    pub fn is_executed(&self) -> bool {
        self.status == OperationStatus::Executed
    }

    pub fn execution_record(&self) -> ExecutionRecord {
        ExecutionRecord {
            operation_id: self.id,
            executed: self.is_executed(),
            result: self.result.clone(),
        }
    }
}

/// Execution outcome of a single operation
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExecutionRecord {
    pub operation_id: OperationId,
    pub executed: bool,
    pub result: Option<ExecutionResult>,
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        hex::decode(text).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;

    fn transfer(amount: u64) -> Effect {
        Effect::Transfer {
            to: "recipient".to_string(),
            amount,
        }
    }

    #[test]
    fn test_new_operation_is_approved_by_proposer() {
        let proposer = KeyPair::generate().owner();
        let op = Operation::new(1, transfer(10), proposer, "3wallet".to_string());

        assert_eq!(op.status, OperationStatus::Proposed);
        assert!(op.approvals.contains(&proposer));
        assert_eq!(op.approvals.len(), 1);
        assert!(!op.execution_record().executed);
    }

    #[test]
    fn test_digest_binds_id_wallet_and_effect() {
        let proposer = KeyPair::generate().owner();
        let op = Operation::new(1, transfer(10), proposer, "3wallet".to_string());

        let mut other_id = op.clone();
        other_id.id = 2;
        let mut other_wallet = op.clone();
        other_wallet.wallet = "3other".to_string();
        let mut other_effect = op.clone();
        other_effect.effect = transfer(11);

        assert_eq!(op.digest().len(), 32);
        assert_eq!(op.digest(), op.clone().digest());
        assert_ne!(op.digest(), other_id.digest());
        assert_ne!(op.digest(), other_wallet.digest());
        assert_ne!(op.digest(), other_effect.digest());
    }

    #[test]
    fn test_effect_encoding_is_unambiguous() {
        let a = Effect::ExternalCall {
            target: "ab".to_string(),
            payload: b"c".to_vec(),
        };
        let b = Effect::ExternalCall {
            target: "a".to_string(),
            payload: b"bc".to_vec(),
        };
        assert_ne!(a.encode(), b.encode());
    }

    #[test]
    fn test_effect_serde_shape() {
        let effect = Effect::ExternalCall {
            target: "oracle".to_string(),
            payload: vec![0xde, 0xad],
        };
        let json = serde_json::to_value(&effect).unwrap();
        assert_eq!(json["kind"], "external_call");
        assert_eq!(json["payload"], "dead");

        let back: Effect = serde_json::from_value(json).unwrap();
        assert_eq!(back, effect);
    }
}
