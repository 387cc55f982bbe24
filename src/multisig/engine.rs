//! Execution engine
//!
//! Checks quorum against the live registry and applies an operation's effect
//! exactly once. Every effect validates before it mutates anything, and the
//! operation is marked executed in the same call, so a failed execution leaves
//! the state untouched and a successful one can never be repeated.

use chrono::Utc;

use super::error::MultisigError;
use super::operation::{Effect, ExecutionResult, OperationId};
use super::owner::Owner;
use super::state::{Dispatch, WalletEvent, WalletState};
use crate::crypto::sha256_hex;

/// Execute operation `id` on behalf of `caller`
///
/// # Errors
/// - `NotAnOwner` if `caller` is not a current owner
/// - `UnknownOperation` / `AlreadyExecuted` for missing or finished operations
/// - `QuorumNotMet` if fewer current owners approved than the threshold
/// - whatever the effect itself rejects (`ThresholdViolation`, `DuplicateOwner`,
///   `UnknownOwner`, `InvalidOwner`, `TooManyOwners`, `InsufficientFunds`)
pub fn try_execute(
    state: &mut WalletState,
    id: OperationId,
    caller: Owner,
) -> Result<ExecutionResult, MultisigError> {
    if !state.registry.is_owner(&caller) {
        return Err(MultisigError::NotAnOwner(caller));
    }

    let op = state.ledger.get(id)?;
    if op.is_executed() {
        return Err(MultisigError::AlreadyExecuted(id));
    }

    let have = state.ledger.approval_count(id, &state.registry)?;
    let need = state.registry.threshold();
    if have < need {
        return Err(MultisigError::QuorumNotMet { have, need });
    }

    let effect = op.effect.clone();
    let result = apply_effect(state, id, &effect)?;

    state.ledger.mark_executed(id, result.clone());
    state.record(WalletEvent::Executed {
        id,
        caller,
        at: Utc::now(),
    });

    log::info!(
        "Executed operation {} ({}) with {}/{} approvals",
        id,
        effect,
        have,
        need
    );

    Ok(result)
}

fn apply_effect(
    state: &mut WalletState,
    id: OperationId,
    effect: &Effect,
) -> Result<ExecutionResult, MultisigError> {
    let now = Utc::now();

    match effect {
        Effect::Transfer { to, amount } => {
            if *amount > state.balance {
                return Err(MultisigError::InsufficientFunds {
                    have: state.balance,
                    need: *amount,
                });
            }

            state.balance -= amount;
            state.outbox.push(Dispatch {
                operation_id: id,
                effect: effect.clone(),
                dispatched_at: now,
            });

            Ok(ExecutionResult::Transferred {
                to: to.clone(),
                amount: *amount,
                remaining_balance: state.balance,
            })
        }

        Effect::AddOwner { owner } => {
            state.registry.add_owner(*owner)?;
            state.record(WalletEvent::OwnerAdded {
                owner: *owner,
                at: now,
            });
            log::info!("Owner {} added ({})", owner, state.registry.description());

            Ok(ExecutionResult::OwnerAdded { owner: *owner })
        }

        Effect::RemoveOwner { owner } => {
            state.registry.remove_owner(owner)?;
            let purged = state.ledger.purge_owner(owner);
            state.record(WalletEvent::OwnerRemoved {
                owner: *owner,
                at: now,
            });
            log::info!(
                "Owner {} removed ({}), {} pending approvals dropped",
                owner,
                state.registry.description(),
                purged
            );

            Ok(ExecutionResult::OwnerRemoved { owner: *owner })
        }

        Effect::SetThreshold { threshold } => {
            let previous = state.registry.set_threshold(*threshold)?;
            state.record(WalletEvent::ThresholdChanged {
                previous,
                current: *threshold,
                at: now,
            });
            log::info!("Threshold changed from {} to {}", previous, threshold);

            Ok(ExecutionResult::ThresholdChanged {
                previous,
                current: *threshold,
            })
        }

        Effect::ExternalCall { target, payload } => {
            state.outbox.push(Dispatch {
                operation_id: id,
                effect: effect.clone(),
                dispatched_at: now,
            });

            Ok(ExecutionResult::CallDispatched {
                target: target.clone(),
                payload_digest: sha256_hex(payload),
            })
        }
    }
}
