//! CLI commands for the multisig wallet
//!
//! Implements all command handlers for the CLI interface.

use crate::crypto::KeyPair;
use crate::multisig::{
    Effect, ExecutionResult, MultisigWallet, Operation, OperationId, Owner, Secp256k1Verifier,
    WalletEvent,
};
use crate::storage::{Storage, StorageConfig};
use std::path::{Path, PathBuf};

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub wallet: MultisigWallet,
    pub storage: Storage,
}

impl AppState {
    /// Load the deployed wallet from the data directory
    pub fn new(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;

        if !storage.exists() {
            return Err(format!(
                "no wallet deployed in {:?}; run `multisig deploy` first",
                data_dir
            )
            .into());
        }

        let wallet = MultisigWallet::from_state(storage.load()?, Secp256k1Verifier)?;

        Ok(Self { wallet, storage })
    }

    /// Save the current state
    pub fn save(&self) -> CliResult<()> {
        self.storage.save(self.wallet.state())?;
        Ok(())
    }
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    let storage_config = StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    };
    Ok(Storage::new(storage_config)?)
}

/// Parse a comma-separated owner list
pub fn parse_owners(list: &str) -> CliResult<Vec<Owner>> {
    let owners = list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<Owner>)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(owners)
}

/// Generate a new owner key
pub fn cmd_keygen() -> CliResult<()> {
    let key_pair = KeyPair::generate();

    println!("🔐 New owner key generated!");
    println!("   📍 Owner address: {}", key_pair.owner());
    println!("   🔑 Public key: {}", key_pair.public_key_hex());
    println!("   🗝️  Private key: {}", key_pair.private_key_hex());
    println!("\n   ⚠️  IMPORTANT: The private key is not stored anywhere.");
    println!("   Keep it safe; it is needed to sign approvals.");

    Ok(())
}

/// Refuse to overwrite a deployed wallet unless forced
fn may_replace(storage: &Storage, data_dir: &Path, force: bool) -> bool {
    if storage.exists() && !force {
        println!("⚠️  A wallet is already deployed at {:?}", data_dir);
        println!("   Use --force to replace it (the current wallet is kept as backup 0)");
        return false;
    }
    true
}

/// Deploy a new wallet into the data directory
pub fn cmd_deploy(data_dir: &Path, owners: &str, threshold: usize, force: bool) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if !may_replace(&storage, data_dir, force) {
        return Ok(());
    }

    let wallet = MultisigWallet::deploy(parse_owners(owners)?, threshold)?;
    storage.save(wallet.state())?;

    println!("✅ Wallet deployed!");
    println!("   📁 Data directory: {:?}", data_dir);
    println!("   📍 Address: {}", wallet.address());
    println!("   🔏 Policy: {}", wallet.description());
    for owner in wallet.owners() {
        println!("   └─ Owner: {}", owner);
    }

    Ok(())
}

/// Credit value to the wallet
pub fn cmd_deposit(state: &mut AppState, from: &str, amount: u64) -> CliResult<()> {
    let balance = state.wallet.deposit(from, amount)?;
    state.save()?;

    println!("💰 Deposited {} from {}", amount, from);
    println!("   New balance: {}", balance);

    Ok(())
}

/// Propose an operation
pub fn cmd_propose(state: &mut AppState, proposer: &str, effect: Effect) -> CliResult<()> {
    let proposer: Owner = proposer.parse()?;
    let id = state.wallet.propose(effect, proposer)?;
    state.save()?;

    let op = state.wallet.operation(id)?;
    println!("📝 Operation {} proposed: {}", id, op.effect);
    println!("   Approvals: {}/{}", state.wallet.approval_count(id)?, state.wallet.threshold());
    println!("   Digest to sign: {}", op.digest_hex());

    Ok(())
}

/// Print the digest owners sign for an operation
pub fn cmd_digest(state: &AppState, id: OperationId) -> CliResult<()> {
    println!("{}", hex::encode(state.wallet.operation_digest(id)?));
    Ok(())
}

/// Sign an operation digest with a private key
pub fn cmd_sign(state: &AppState, id: OperationId, private_key: &str) -> CliResult<()> {
    let key_pair = KeyPair::from_private_key_hex(private_key)?;
    let signature = key_pair.sign_digest(&state.wallet.operation_digest(id)?)?;

    println!("✍️  Signature by {} on operation {}:", key_pair.owner(), id);
    println!("{}", hex::encode(signature));

    Ok(())
}

/// Approve an operation with a hex-encoded signature
pub fn cmd_approve(
    state: &mut AppState,
    id: OperationId,
    owner: &str,
    signature: &str,
) -> CliResult<()> {
    let owner: Owner = owner.parse()?;
    let signature = hex::decode(signature.trim())?;

    state.wallet.approve(id, owner, &signature)?;
    state.save()?;

    let have = state.wallet.approval_count(id)?;
    let need = state.wallet.threshold();
    println!("✅ Operation {} approved by {}", id, owner);
    println!("   Approvals: {}/{}", have, need);
    if have >= need {
        println!("   Quorum reached; ready to execute.");
    }

    Ok(())
}

/// Withdraw an approval
pub fn cmd_revoke(state: &mut AppState, id: OperationId, owner: &str) -> CliResult<()> {
    let owner: Owner = owner.parse()?;
    state.wallet.revoke(id, owner)?;
    state.save()?;

    println!("↩️  Approval of operation {} withdrawn by {}", id, owner);
    println!(
        "   Approvals: {}/{}",
        state.wallet.approval_count(id)?,
        state.wallet.threshold()
    );

    Ok(())
}

/// Execute an operation that reached quorum
pub fn cmd_execute(state: &mut AppState, id: OperationId, caller: &str) -> CliResult<()> {
    let caller: Owner = caller.parse()?;
    let result = state.wallet.execute(id, caller)?;
    state.save()?;

    println!("🚀 Operation {} executed", id);
    match result {
        ExecutionResult::Transferred {
            to,
            amount,
            remaining_balance,
        } => {
            println!("   Sent {} to {}", amount, to);
            println!("   Remaining balance: {}", remaining_balance);
        }
        ExecutionResult::OwnerAdded { owner } => println!("   Owner added: {}", owner),
        ExecutionResult::OwnerRemoved { owner } => println!("   Owner removed: {}", owner),
        ExecutionResult::ThresholdChanged { previous, current } => {
            println!("   Threshold: {} -> {}", previous, current)
        }
        ExecutionResult::CallDispatched {
            target,
            payload_digest,
        } => println!("   Call to {} dispatched (payload {})", target, payload_digest),
    }
    println!("   Policy now: {}", state.wallet.description());

    Ok(())
}

fn print_operation(wallet: &MultisigWallet, op: &Operation) -> CliResult<()> {
    let status = if op.is_executed() { "executed" } else { "pending" };
    println!(
        "   #{} | {} | {} | {}/{} approvals | {}",
        op.id,
        status,
        op.effect,
        wallet.approval_count(op.id)?,
        wallet.threshold(),
        op.created_at.format("%Y-%m-%d %H:%M:%S")
    );
    Ok(())
}

/// Show wallet overview
pub fn cmd_status(state: &AppState) -> CliResult<()> {
    let wallet = &state.wallet;

    println!("🏦 Multisig Wallet");
    println!("   ├─ Address: {}", wallet.address());
    println!("   ├─ Policy: {}", wallet.description());
    println!("   ├─ Balance: {}", wallet.balance());
    println!("   ├─ Operations: {}", wallet.operation_count());
    println!("   └─ Dispatched effects: {}", wallet.outbox().len());

    println!("\n👥 Owners:");
    for owner in wallet.owners() {
        println!("   └─ {}", owner);
    }

    let pending = wallet.pending_operations();
    if pending.is_empty() {
        println!("\n📭 No pending operations");
    } else {
        println!("\n⏳ Pending operations:");
        for op in pending {
            print_operation(wallet, op)?;
        }
    }

    Ok(())
}

/// Show a single operation in detail
pub fn cmd_show(state: &AppState, id: OperationId) -> CliResult<()> {
    let wallet = &state.wallet;
    let op = wallet.operation(id)?;

    println!("📄 Operation {}", id);
    print_operation(wallet, op)?;
    println!("   Proposer: {}", op.proposer);
    println!("   Digest: {}", op.digest_hex());
    for owner in wallet.approvals(id)? {
        println!("   └─ Approved by {}", owner);
    }
    if let Some(executed_at) = op.executed_at {
        println!("   Executed at {}", executed_at.format("%Y-%m-%d %H:%M:%S"));
    }

    Ok(())
}

/// List recent wallet events
pub fn cmd_events(state: &AppState, count: usize) -> CliResult<()> {
    let events = state.wallet.events();
    let start = events.len().saturating_sub(count);

    println!("📜 Recent events:");
    for event in &events[start..] {
        let line = match event {
            WalletEvent::Deposited { from, amount, at } => {
                format!("{} | deposit {} from {}", at.format("%H:%M:%S"), amount, from)
            }
            WalletEvent::Proposed { id, proposer, at } => {
                format!("{} | #{} proposed by {}", at.format("%H:%M:%S"), id, proposer)
            }
            WalletEvent::Approved { id, owner, at } => {
                format!("{} | #{} approved by {}", at.format("%H:%M:%S"), id, owner)
            }
            WalletEvent::Revoked { id, owner, at } => {
                format!("{} | #{} revoked by {}", at.format("%H:%M:%S"), id, owner)
            }
            WalletEvent::Executed { id, caller, at } => {
                format!("{} | #{} executed by {}", at.format("%H:%M:%S"), id, caller)
            }
            WalletEvent::OwnerAdded { owner, at } => {
                format!("{} | owner {} added", at.format("%H:%M:%S"), owner)
            }
            WalletEvent::OwnerRemoved { owner, at } => {
                format!("{} | owner {} removed", at.format("%H:%M:%S"), owner)
            }
            WalletEvent::ThresholdChanged {
                previous,
                current,
                at,
            } => format!(
                "{} | threshold {} -> {}",
                at.format("%H:%M:%S"),
                previous,
                current
            ),
        };
        println!("   └─ {}", line);
    }

    Ok(())
}

/// Export wallet state to file
pub fn cmd_export(state: &AppState, path: &Path) -> CliResult<()> {
    crate::storage::save_to_file(state.wallet.state(), path)?;
    println!("📦 Wallet exported to {:?}", path);
    Ok(())
}

/// Import wallet state from file
pub fn cmd_import(data_dir: &Path, path: &Path, force: bool) -> CliResult<()> {
    let imported = crate::storage::load_from_file(path)?;
    let storage = open_storage(data_dir)?;

    if !may_replace(&storage, data_dir, force) {
        return Ok(());
    }

    storage.save(&imported)?;

    println!("📥 Wallet imported from {:?}", path);
    println!("   Address: {}", imported.address());
    println!("   Policy: {}", imported.registry().description());

    Ok(())
}
