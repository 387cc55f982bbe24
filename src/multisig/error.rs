//! Errors returned by wallet operations

use thiserror::Error;

use super::operation::OperationId;
use super::owner::Owner;

/// Errors related to multisig operations
///
/// Every failing call leaves the wallet state exactly as it was before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MultisigError {
    #[error("Not an owner: {0}")]
    NotAnOwner(Owner),
    #[error("Unknown operation: {0}")]
    UnknownOperation(OperationId),
    #[error("Duplicate owner: {0}")]
    DuplicateOwner(Owner),
    #[error("Unknown owner: {0}")]
    UnknownOwner(Owner),
    #[error("Threshold violation: {0}")]
    ThresholdViolation(String),
    #[error("Invalid owner: {0}")]
    InvalidOwner(String),
    #[error("Invalid signature from {0}")]
    InvalidSignature(Owner),
    #[error("Operation {0} already executed")]
    AlreadyExecuted(OperationId),
    #[error("Quorum not met: have {have}, need {need}")]
    QuorumNotMet { have: usize, need: usize },
    #[error("Insufficient funds: have {have}, need {need}")]
    InsufficientFunds { have: u64, need: u64 },
    #[error("Too many owners: at most {0} allowed")]
    TooManyOwners(usize),
    #[error("Invalid amount: amount must be greater than 0")]
    InvalidAmount,
    #[error("Corrupt wallet state: {0}")]
    CorruptState(String),
}
