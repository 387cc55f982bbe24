//! Wallet state aggregate
//!
//! [`WalletState`] owns everything a wallet instance mutates: the owner
//! registry, the transaction ledger, the held balance, the outbox of
//! dispatched effects, and the event log. It is the unit that gets persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::error::MultisigError;
use super::ledger::TransactionLedger;
use super::operation::{Effect, OperationId};
use super::owner::{Owner, OwnerRegistry};
use crate::crypto::{base58check_encode, hash160};

/// Address version byte for wallets (P2SH-style, addresses start with '3')
pub const WALLET_VERSION: u8 = 0x05;

/// Value transfer or external call handed to the hosting ledger
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Dispatch {
    pub operation_id: OperationId,
    pub effect: Effect,
    pub dispatched_at: DateTime<Utc>,
}

/// Something that happened to the wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalletEvent {
    Deposited {
        from: String,
        amount: u64,
        at: DateTime<Utc>,
    },
    Proposed {
        id: OperationId,
        proposer: Owner,
        at: DateTime<Utc>,
    },
    Approved {
        id: OperationId,
        owner: Owner,
        at: DateTime<Utc>,
    },
    Revoked {
        id: OperationId,
        owner: Owner,
        at: DateTime<Utc>,
    },
    Executed {
        id: OperationId,
        caller: Owner,
        at: DateTime<Utc>,
    },
    OwnerAdded {
        owner: Owner,
        at: DateTime<Utc>,
    },
    OwnerRemoved {
        owner: Owner,
        at: DateTime<Utc>,
    },
    ThresholdChanged {
        previous: usize,
        current: usize,
        at: DateTime<Utc>,
    },
}

/// All mutable state of one wallet instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletState {
    /// Unique wallet address, bound into every operation digest
    pub(crate) address: String,
    pub(crate) registry: OwnerRegistry,
    pub(crate) ledger: TransactionLedger,
    /// Value held by the wallet
    pub(crate) balance: u64,
    pub(crate) outbox: Vec<Dispatch>,
    pub(crate) events: Vec<WalletEvent>,
    pub(crate) created_at: DateTime<Utc>,
}

impl WalletState {
    /// Fresh state for a newly deployed wallet
    pub fn new(owners: Vec<Owner>, threshold: usize) -> Result<Self, MultisigError> {
        let registry = OwnerRegistry::new(owners, threshold)?;
        let created_at = Utc::now();
        let address = Self::generate_address(&registry, &created_at);

        Ok(Self {
            address,
            registry,
            ledger: TransactionLedger::new(),
            balance: 0,
            outbox: Vec::new(),
            events: Vec::new(),
            created_at,
        })
    }

    /// Address = Base58Check(0x05 || HASH160(threshold || sorted owners || deployment time))
    ///
    /// The deployment time keeps two wallets with the same owner set from
    /// sharing an address, so a signature for one cannot be replayed on the other.
    fn generate_address(registry: &OwnerRegistry, created_at: &DateTime<Utc>) -> String {
        let mut data = Vec::new();
        data.extend_from_slice(&(registry.threshold() as u64).to_be_bytes());
        for owner in registry.owners() {
            data.extend_from_slice(owner.as_bytes());
        }
        data.extend_from_slice(&created_at.timestamp_nanos_opt().unwrap_or(0).to_be_bytes());

        base58check_encode(WALLET_VERSION, &hash160(&data))
    }

    /// Re-check the registry and ledger invariants of a loaded state
    pub fn validate(&self) -> Result<(), MultisigError> {
        self.registry.validate()?;
        self.ledger.validate(&self.address)
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn registry(&self) -> &OwnerRegistry {
        &self.registry
    }

    pub fn ledger(&self) -> &TransactionLedger {
        &self.ledger
    }

    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn outbox(&self) -> &[Dispatch] {
        &self.outbox
    }

    pub fn events(&self) -> &[WalletEvent] {
        &self.events
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub(crate) fn record(&mut self, event: WalletEvent) {
        self.events.push(event);
    }
}
