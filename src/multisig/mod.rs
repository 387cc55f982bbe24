//! Multi-signature wallet authorization engine
//!
//! An M-of-N wallet collects owner approvals for proposed operations and
//! executes each one exactly once, after the number of approvals from
//! current owners reaches the threshold. Adding or removing owners and
//! changing the threshold are operations too, so they need the same quorum.
//!
//! # Example
//!
//! ```ignore
//! use multisig_wallet::crypto::KeyPair;
//! use multisig_wallet::multisig::MultisigWallet;
//!
//! // Deploy a 2-of-3 wallet
//! let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
//! let owners = keys.iter().map(|k| k.owner()).collect();
//! let mut wallet = MultisigWallet::deploy(owners, 2)?;
//! wallet.deposit("funder", 100)?;
//!
//! // Propose (implies the proposer's approval)
//! let id = wallet.propose_transfer(keys[0].owner(), "recipient", 10)?;
//!
//! // Second owner signs the operation digest
//! let sig = keys[1].sign_digest(&wallet.operation_digest(id)?)?;
//! wallet.approve(id, keys[1].owner(), &sig)?;
//!
//! // Quorum reached
//! wallet.execute(id, keys[1].owner())?;
//! ```

pub mod engine;
pub mod error;
pub mod ledger;
pub mod operation;
pub mod owner;
pub mod state;
pub mod verifier;
pub mod wallet;

pub use error::MultisigError;
pub use ledger::TransactionLedger;
pub use operation::{
    Effect, ExecutionRecord, ExecutionResult, Operation, OperationId, OperationStatus,
};
pub use owner::{Owner, OwnerRegistry, MAX_OWNERS};
pub use state::{Dispatch, WalletEvent, WalletState};
pub use verifier::{Secp256k1Verifier, SignatureVerifier};
pub use wallet::MultisigWallet;
