//! Transaction ledger
//!
//! Stores proposed operations under strictly increasing sequence ids and
//! tracks which owners approved each one. Approval counts are always computed
//! against the registry passed in, so owners removed after approving stop
//! counting immediately.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::error::MultisigError;
use super::operation::{Effect, ExecutionResult, Operation, OperationId, OperationStatus};
use super::owner::{Owner, OwnerRegistry};
use super::verifier::SignatureVerifier;

/// Proposed and executed operations of one wallet
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionLedger {
    /// Next sequence id; ids are never reused
    next_id: OperationId,
    operations: BTreeMap<OperationId, Operation>,
}

impl Default for TransactionLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionLedger {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            operations: BTreeMap::new(),
        }
    }

    /// Record a new operation; the proposer's approval is implied
    pub fn propose(
        &mut self,
        effect: Effect,
        proposer: Owner,
        registry: &OwnerRegistry,
        wallet: &str,
    ) -> Result<OperationId, MultisigError> {
        if !registry.is_owner(&proposer) {
            return Err(MultisigError::NotAnOwner(proposer));
        }

        let id = self.next_id;
        if self.operations.contains_key(&id) {
            return Err(MultisigError::CorruptState(format!(
                "operation id {} is already taken",
                id
            )));
        }
        self.next_id += 1;

        self.operations
            .insert(id, Operation::new(id, effect, proposer, wallet.to_string()));

        Ok(id)
    }

    /// Check a deserialized ledger: keys match ids, every operation belongs to
    /// `wallet`, and `next_id` is above every id already handed out
    pub fn validate(&self, wallet: &str) -> Result<(), MultisigError> {
        for (key, op) in &self.operations {
            if *key != op.id {
                return Err(MultisigError::CorruptState(format!(
                    "operation stored under {} carries id {}",
                    key, op.id
                )));
            }
            if op.wallet != wallet {
                return Err(MultisigError::CorruptState(format!(
                    "operation {} belongs to wallet {}",
                    op.id, op.wallet
                )));
            }
        }

        if let Some(max_id) = self.operations.keys().next_back() {
            if self.next_id <= *max_id {
                return Err(MultisigError::CorruptState(format!(
                    "next id {} would reuse operation {}",
                    self.next_id, max_id
                )));
            }
        }
        if self.next_id == 0 {
            return Err(MultisigError::CorruptState("next id must start at 1".to_string()));
        }

        Ok(())
    }

    /// Record `owner`'s approval after checking their signature over the digest
    ///
    /// Returns `false` if the owner had already approved (a successful no-op).
    pub fn approve<V: SignatureVerifier + ?Sized>(
        &mut self,
        id: OperationId,
        owner: Owner,
        signature: &[u8],
        registry: &OwnerRegistry,
        verifier: &V,
    ) -> Result<bool, MultisigError> {
        let op = self
            .operations
            .get_mut(&id)
            .ok_or(MultisigError::UnknownOperation(id))?;

        if !registry.is_owner(&owner) {
            return Err(MultisigError::NotAnOwner(owner));
        }

        if op.is_executed() {
            return Err(MultisigError::AlreadyExecuted(id));
        }

        if !verifier.verify(&op.digest(), signature, &owner) {
            log::warn!("Rejected signature from {} on operation {}", owner, id);
            return Err(MultisigError::InvalidSignature(owner));
        }

        Ok(op.approvals.insert(owner))
    }

    /// Withdraw `owner`'s approval
    ///
    /// Returns `false` if the owner had not approved (a successful no-op).
    pub fn revoke(
        &mut self,
        id: OperationId,
        owner: Owner,
        registry: &OwnerRegistry,
    ) -> Result<bool, MultisigError> {
        let op = self
            .operations
            .get_mut(&id)
            .ok_or(MultisigError::UnknownOperation(id))?;

        if !registry.is_owner(&owner) {
            return Err(MultisigError::NotAnOwner(owner));
        }

        if op.is_executed() {
            return Err(MultisigError::AlreadyExecuted(id));
        }

        Ok(op.approvals.remove(&owner))
    }

    /// Approvals from current owners only
    pub fn approvals(
        &self,
        id: OperationId,
        registry: &OwnerRegistry,
    ) -> Result<Vec<Owner>, MultisigError> {
        let op = self.get(id)?;
        Ok(op
            .approvals
            .iter()
            .filter(|owner| registry.is_owner(owner))
            .copied()
            .collect())
    }

    /// Number of current owners with an active approval
    pub fn approval_count(
        &self,
        id: OperationId,
        registry: &OwnerRegistry,
    ) -> Result<usize, MultisigError> {
        let op = self.get(id)?;
        Ok(op
            .approvals
            .iter()
            .filter(|owner| registry.is_owner(owner))
            .count())
    }

    pub fn get(&self, id: OperationId) -> Result<&Operation, MultisigError> {
        self.operations
            .get(&id)
            .ok_or(MultisigError::UnknownOperation(id))
    }

    pub fn operations(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values()
    }

    /// Operations still collecting approvals, oldest first
    pub fn pending(&self) -> impl Iterator<Item = &Operation> {
        self.operations.values().filter(|op| !op.is_executed())
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// The id the next proposal will receive
    pub fn next_id(&self) -> OperationId {
        self.next_id
    }

    pub(crate) fn mark_executed(&mut self, id: OperationId, result: ExecutionResult) {
        if let Some(op) = self.operations.get_mut(&id) {
            op.status = OperationStatus::Executed;
            op.executed_at = Some(chrono::Utc::now());
            op.result = Some(result);
        }
    }

    /// Drop a removed owner's approvals from operations that have not executed
    pub(crate) fn purge_owner(&mut self, owner: &Owner) -> usize {
        let mut purged = 0;
        for op in self.operations.values_mut().filter(|op| !op.is_executed()) {
            if op.approvals.remove(owner) {
                purged += 1;
            }
        }
        purged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::multisig::verifier::Secp256k1Verifier;

    const WALLET: &str = "3TestWallet";

    fn setup() -> (TransactionLedger, OwnerRegistry, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let registry = OwnerRegistry::new(keys.iter().map(|k| k.owner()).collect(), 2).unwrap();
        (TransactionLedger::new(), registry, keys)
    }

    fn transfer() -> Effect {
        Effect::Transfer {
            to: "recipient".to_string(),
            amount: 10,
        }
    }

    fn sign(ledger: &TransactionLedger, id: OperationId, key: &KeyPair) -> Vec<u8> {
        key.sign_digest(&ledger.get(id).unwrap().digest()).unwrap()
    }

    #[test]
    fn test_propose_assigns_increasing_ids() {
        let (mut ledger, registry, keys) = setup();

        let first = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();
        let second = ledger
            .propose(transfer(), keys[1].owner(), &registry, WALLET)
            .unwrap();

        assert_eq!(first, 1);
        assert_eq!(second, 2);
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.approval_count(first, &registry).unwrap(), 1);
    }

    #[test]
    fn test_propose_requires_owner() {
        let (mut ledger, registry, _) = setup();
        let outsider = KeyPair::generate().owner();

        assert_eq!(
            ledger.propose(transfer(), outsider, &registry, WALLET),
            Err(MultisigError::NotAnOwner(outsider))
        );
        assert!(ledger.is_empty());
        assert_eq!(ledger.next_id(), 1);
    }

    #[test]
    fn test_approve_with_valid_signature() {
        let (mut ledger, registry, keys) = setup();
        let id = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();

        let sig = sign(&ledger, id, &keys[1]);
        assert!(ledger
            .approve(id, keys[1].owner(), &sig, &registry, &Secp256k1Verifier)
            .unwrap());
        assert_eq!(ledger.approval_count(id, &registry).unwrap(), 2);

        // Approving again is an idempotent success
        assert!(!ledger
            .approve(id, keys[1].owner(), &sig, &registry, &Secp256k1Verifier)
            .unwrap());
        assert_eq!(ledger.approval_count(id, &registry).unwrap(), 2);
    }

    #[test]
    fn test_approve_errors() {
        let (mut ledger, registry, keys) = setup();
        let id = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();

        let sig = sign(&ledger, id, &keys[1]);
        assert_eq!(
            ledger.approve(99, keys[1].owner(), &sig, &registry, &Secp256k1Verifier),
            Err(MultisigError::UnknownOperation(99))
        );

        let outsider = KeyPair::generate();
        let outsider_sig = sign(&ledger, id, &outsider);
        assert_eq!(
            ledger.approve(id, outsider.owner(), &outsider_sig, &registry, &Secp256k1Verifier),
            Err(MultisigError::NotAnOwner(outsider.owner()))
        );

        // keys[2] presenting keys[1]'s signature
        assert_eq!(
            ledger.approve(id, keys[2].owner(), &sig, &registry, &Secp256k1Verifier),
            Err(MultisigError::InvalidSignature(keys[2].owner()))
        );
        assert_eq!(ledger.approval_count(id, &registry).unwrap(), 1);
    }

    #[test]
    fn test_signature_for_other_operation_is_rejected() {
        let (mut ledger, registry, keys) = setup();
        let first = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();
        let second = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();

        let sig_for_first = sign(&ledger, first, &keys[1]);
        assert!(matches!(
            ledger.approve(second, keys[1].owner(), &sig_for_first, &registry, &Secp256k1Verifier),
            Err(MultisigError::InvalidSignature(_))
        ));
    }

    #[test]
    fn test_revoke() {
        let (mut ledger, registry, keys) = setup();
        let id = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();

        // Not approved yet: no-op
        assert!(!ledger.revoke(id, keys[1].owner(), &registry).unwrap());

        // Proposer may withdraw the implied approval
        assert!(ledger.revoke(id, keys[0].owner(), &registry).unwrap());
        assert_eq!(ledger.approval_count(id, &registry).unwrap(), 0);

        assert_eq!(
            ledger.revoke(42, keys[0].owner(), &registry),
            Err(MultisigError::UnknownOperation(42))
        );
    }

    #[test]
    fn test_executed_operation_is_frozen() {
        let (mut ledger, registry, keys) = setup();
        let id = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();
        ledger.mark_executed(
            id,
            ExecutionResult::ThresholdChanged {
                previous: 2,
                current: 2,
            },
        );

        let sig = sign(&ledger, id, &keys[1]);
        assert_eq!(
            ledger.approve(id, keys[1].owner(), &sig, &registry, &Secp256k1Verifier),
            Err(MultisigError::AlreadyExecuted(id))
        );
        assert_eq!(
            ledger.revoke(id, keys[0].owner(), &registry),
            Err(MultisigError::AlreadyExecuted(id))
        );
        assert_eq!(ledger.pending().count(), 0);
    }

    #[test]
    fn test_count_ignores_removed_owners() {
        let (mut ledger, mut registry, keys) = setup();
        let id = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();
        let sig = sign(&ledger, id, &keys[1]);
        ledger
            .approve(id, keys[1].owner(), &sig, &registry, &Secp256k1Verifier)
            .unwrap();
        assert_eq!(ledger.approval_count(id, &registry).unwrap(), 2);

        registry.remove_owner(&keys[1].owner()).unwrap();
        assert_eq!(ledger.approval_count(id, &registry).unwrap(), 1);
        assert_eq!(ledger.approvals(id, &registry).unwrap(), vec![keys[0].owner()]);
    }

    #[test]
    fn test_validate_rejects_reused_ids() {
        let (mut ledger, registry, keys) = setup();
        let id = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();
        assert!(ledger.validate(WALLET).is_ok());
        assert!(matches!(
            ledger.validate("3OtherWallet"),
            Err(MultisigError::CorruptState(_))
        ));

        // A ledger rewound below an existing id
        ledger.next_id = id;
        assert!(matches!(
            ledger.validate(WALLET),
            Err(MultisigError::CorruptState(_))
        ));

        // propose refuses to overwrite the taken slot
        assert!(matches!(
            ledger.propose(transfer(), keys[1].owner(), &registry, WALLET),
            Err(MultisigError::CorruptState(_))
        ));
        assert_eq!(ledger.get(id).unwrap().proposer, keys[0].owner());
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_purge_owner_skips_executed() {
        let (mut ledger, registry, keys) = setup();
        let executed = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();
        let pending = ledger
            .propose(transfer(), keys[0].owner(), &registry, WALLET)
            .unwrap();
        ledger.mark_executed(
            executed,
            ExecutionResult::OwnerRemoved {
                owner: keys[2].owner(),
            },
        );

        assert_eq!(ledger.purge_owner(&keys[0].owner()), 1);
        assert!(ledger.get(executed).unwrap().approvals.contains(&keys[0].owner()));
        assert!(ledger.get(pending).unwrap().approvals.is_empty());
    }
}
