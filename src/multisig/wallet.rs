//! Multi-signature wallet façade
//!
//! Public entry points that compose the registry, ledger, and execution
//! engine. Owner and threshold changes have no direct setter: they are
//! proposed, approved, and executed like any other operation.

use chrono::Utc;

use super::engine;
use super::error::MultisigError;
use super::operation::{Effect, ExecutionRecord, ExecutionResult, Operation, OperationId};
use super::owner::Owner;
use super::state::{Dispatch, WalletEvent, WalletState};
use super::verifier::{Secp256k1Verifier, SignatureVerifier};

/// An M-of-N wallet that executes operations once enough owners approve
#[derive(Debug)]
pub struct MultisigWallet<V = Secp256k1Verifier> {
    state: WalletState,
    verifier: V,
}

impl MultisigWallet<Secp256k1Verifier> {
    /// Deploy a wallet verifying secp256k1 signatures
    ///
    /// # Errors
    /// Returns error if the owner set or threshold is invalid
    pub fn deploy(owners: Vec<Owner>, threshold: usize) -> Result<Self, MultisigError> {
        Self::with_verifier(owners, threshold, Secp256k1Verifier)
    }
}

impl<V: SignatureVerifier> MultisigWallet<V> {
    /// Deploy a wallet with a custom signature verifier
    pub fn with_verifier(
        owners: Vec<Owner>,
        threshold: usize,
        verifier: V,
    ) -> Result<Self, MultisigError> {
        let state = WalletState::new(owners, threshold)?;
        log::info!(
            "Deployed {} multisig wallet {}",
            state.registry.description(),
            state.address
        );
        Ok(Self { state, verifier })
    }

    /// Re-open a wallet from previously saved state
    ///
    /// # Errors
    /// Returns error if the state breaks a registry or ledger invariant
    pub fn from_state(state: WalletState, verifier: V) -> Result<Self, MultisigError> {
        state.validate()?;
        Ok(Self { state, verifier })
    }

    /// Propose an operation; the proposer's approval is recorded with it
    pub fn propose(&mut self, effect: Effect, proposer: Owner) -> Result<OperationId, MultisigError> {
        Self::check_effect(&effect)?;

        let state = &mut self.state;
        let id = state
            .ledger
            .propose(effect, proposer, &state.registry, &state.address)?;

        state.record(WalletEvent::Proposed {
            id,
            proposer,
            at: Utc::now(),
        });
        log::debug!("Operation {} proposed by {}", id, proposer);

        Ok(id)
    }

    /// State-independent checks; everything else is checked at execution time
    fn check_effect(effect: &Effect) -> Result<(), MultisigError> {
        match effect {
            Effect::AddOwner { owner } if owner.is_zero() => Err(MultisigError::InvalidOwner(
                "the zero identity cannot be an owner".to_string(),
            )),
            Effect::SetThreshold { threshold: 0 } => Err(MultisigError::ThresholdViolation(
                "threshold must be at least 1".to_string(),
            )),
            Effect::Transfer { amount: 0, .. } => Err(MultisigError::InvalidAmount),
            _ => Ok(()),
        }
    }

    pub fn propose_transfer(
        &mut self,
        proposer: Owner,
        to: &str,
        amount: u64,
    ) -> Result<OperationId, MultisigError> {
        let effect = Effect::Transfer {
            to: to.to_string(),
            amount,
        };
        self.propose(effect, proposer)
    }

    pub fn propose_add_owner(
        &mut self,
        proposer: Owner,
        owner: Owner,
    ) -> Result<OperationId, MultisigError> {
        self.propose(Effect::AddOwner { owner }, proposer)
    }

    pub fn propose_remove_owner(
        &mut self,
        proposer: Owner,
        owner: Owner,
    ) -> Result<OperationId, MultisigError> {
        self.propose(Effect::RemoveOwner { owner }, proposer)
    }

    pub fn propose_set_threshold(
        &mut self,
        proposer: Owner,
        threshold: usize,
    ) -> Result<OperationId, MultisigError> {
        self.propose(Effect::SetThreshold { threshold }, proposer)
    }

    pub fn propose_external_call(
        &mut self,
        proposer: Owner,
        target: &str,
        payload: Vec<u8>,
    ) -> Result<OperationId, MultisigError> {
        let effect = Effect::ExternalCall {
            target: target.to_string(),
            payload,
        };
        self.propose(effect, proposer)
    }

    /// Approve with a signature over the operation digest
    ///
    /// Approving twice is a successful no-op.
    pub fn approve(
        &mut self,
        id: OperationId,
        owner: Owner,
        signature: &[u8],
    ) -> Result<(), MultisigError> {
        let state = &mut self.state;
        let added = state
            .ledger
            .approve(id, owner, signature, &state.registry, &self.verifier)?;

        if added {
            state.record(WalletEvent::Approved {
                id,
                owner,
                at: Utc::now(),
            });
            log::debug!("Operation {} approved by {}", id, owner);
        }
        Ok(())
    }

    /// Withdraw an approval; a no-op if the owner had not approved
    pub fn revoke(&mut self, id: OperationId, owner: Owner) -> Result<(), MultisigError> {
        let state = &mut self.state;
        let removed = state.ledger.revoke(id, owner, &state.registry)?;

        if removed {
            state.record(WalletEvent::Revoked {
                id,
                owner,
                at: Utc::now(),
            });
            log::debug!("Approval of operation {} revoked by {}", id, owner);
        }
        Ok(())
    }

    /// Apply an operation's effect once quorum is met
    pub fn execute(
        &mut self,
        id: OperationId,
        caller: Owner,
    ) -> Result<ExecutionResult, MultisigError> {
        engine::try_execute(&mut self.state, id, caller)
    }

    /// Credit value to the wallet; anyone may deposit
    pub fn deposit(&mut self, from: &str, amount: u64) -> Result<u64, MultisigError> {
        if amount == 0 {
            return Err(MultisigError::InvalidAmount);
        }

        let balance = self
            .state
            .balance
            .checked_add(amount)
            .ok_or(MultisigError::InvalidAmount)?;
        self.state.balance = balance;

        self.state.record(WalletEvent::Deposited {
            from: from.to_string(),
            amount,
            at: Utc::now(),
        });
        log::info!("Deposit of {} from {}, balance {}", amount, from, balance);

        Ok(balance)
    }

    /// The digest an owner must sign to approve operation `id`
    pub fn operation_digest(&self, id: OperationId) -> Result<Vec<u8>, MultisigError> {
        Ok(self.state.ledger.get(id)?.digest())
    }

    pub fn operation(&self, id: OperationId) -> Result<&Operation, MultisigError> {
        self.state.ledger.get(id)
    }

    /// Current owners with an active approval on `id`
    pub fn approvals(&self, id: OperationId) -> Result<Vec<Owner>, MultisigError> {
        self.state.ledger.approvals(id, &self.state.registry)
    }

    pub fn approval_count(&self, id: OperationId) -> Result<usize, MultisigError> {
        self.state.ledger.approval_count(id, &self.state.registry)
    }

    pub fn is_executed(&self, id: OperationId) -> Result<bool, MultisigError> {
        Ok(self.state.ledger.get(id)?.is_executed())
    }

    pub fn execution_record(&self, id: OperationId) -> Result<ExecutionRecord, MultisigError> {
        Ok(self.state.ledger.get(id)?.execution_record())
    }

    pub fn pending_operations(&self) -> Vec<&Operation> {
        self.state.ledger.pending().collect()
    }

    pub fn operation_count(&self) -> usize {
        self.state.ledger.len()
    }

    pub fn is_owner(&self, identity: &Owner) -> bool {
        self.state.registry.is_owner(identity)
    }

    pub fn owners(&self) -> Vec<Owner> {
        self.state.registry.owners().copied().collect()
    }

    pub fn threshold(&self) -> usize {
        self.state.registry.threshold()
    }

    /// Get human-readable description like "2-of-3"
    pub fn description(&self) -> String {
        self.state.registry.description()
    }

    pub fn address(&self) -> &str {
        self.state.address()
    }

    pub fn balance(&self) -> u64 {
        self.state.balance()
    }

    pub fn events(&self) -> &[WalletEvent] {
        self.state.events()
    }

    pub fn outbox(&self) -> &[Dispatch] {
        self.state.outbox()
    }

    pub fn state(&self) -> &WalletState {
        &self.state
    }
}
