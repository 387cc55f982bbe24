//! Multisig Wallet: an M-of-N authorization engine in Rust
//!
//! This crate provides a multi-signature wallet featuring:
//! - Owner registry with a guarded `1 <= threshold <= owners` invariant
//! - Transaction ledger with never-reused sequence ids and signed approvals
//! - Execution engine applying each operation's effect exactly once
//! - Self-governance: owner and threshold changes go through the same quorum
//! - Recoverable ECDSA signatures (secp256k1) behind a pluggable verifier
//! - JSON persistence with atomic writes and backups
//!
//! # Example
//!
//! ```rust
//! use multisig_wallet::crypto::KeyPair;
//! use multisig_wallet::multisig::MultisigWallet;
//!
//! let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
//! let owners = keys.iter().map(|k| k.owner()).collect();
//! let mut wallet = MultisigWallet::deploy(owners, 2).unwrap();
//! wallet.deposit("funder", 100).unwrap();
//!
//! let id = wallet.propose_transfer(keys[0].owner(), "recipient", 10).unwrap();
//! let digest = wallet.operation_digest(id).unwrap();
//! let signature = keys[1].sign_digest(&digest).unwrap();
//! wallet.approve(id, keys[1].owner(), &signature).unwrap();
//!
//! wallet.execute(id, keys[2].owner()).unwrap();
//! assert_eq!(wallet.balance(), 90);
//! ```

pub mod cli;
pub mod crypto;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use crypto::KeyPair;
pub use multisig::{
    Effect, ExecutionResult, MultisigError, MultisigWallet, OperationId, Owner, OwnerRegistry,
    Secp256k1Verifier, SignatureVerifier, TransactionLedger, WalletState,
};
pub use storage::{Storage, StorageConfig};
