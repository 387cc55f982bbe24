//! Multisig Wallet CLI Application
//!
//! A command-line interface for deploying and operating a multisig wallet.

use clap::{Parser, Subcommand};
use multisig_wallet::cli::{self, AppState};
use multisig_wallet::multisig::{Effect, OperationId, Owner};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "multisig")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "An M-of-N multi-signature wallet", long_about = None)]
struct Cli {
    /// Data directory for wallet storage
    #[arg(short, long, default_value = ".multisig_data")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new owner key pair
    Keygen,

    /// Deploy a new wallet
    Deploy {
        /// Initial owner addresses (comma-separated)
        #[arg(short, long)]
        owners: String,

        /// Approvals required to execute an operation
        #[arg(short, long)]
        threshold: usize,

        /// Replace an existing wallet in the data directory
        #[arg(long)]
        force: bool,
    },

    /// Deposit value into the wallet
    Deposit {
        /// Sender's address
        #[arg(short, long)]
        from: String,

        /// Amount to deposit
        #[arg(short, long)]
        amount: u64,
    },

    /// Propose an operation
    Propose {
        /// Proposing owner's address
        #[arg(short, long)]
        from: String,

        #[command(subcommand)]
        effect: EffectCommands,
    },

    /// Print the digest to sign for an operation
    Digest {
        #[arg(short, long)]
        id: OperationId,
    },

    /// Sign an operation digest with a private key
    Sign {
        #[arg(short, long)]
        id: OperationId,

        /// Hex-encoded private key
        #[arg(short, long)]
        key: String,
    },

    /// Approve an operation
    Approve {
        #[arg(short, long)]
        id: OperationId,

        /// Approving owner's address
        #[arg(short, long)]
        owner: String,

        /// Hex-encoded signature over the operation digest
        #[arg(short, long)]
        signature: String,
    },

    /// Withdraw an approval
    Revoke {
        #[arg(short, long)]
        id: OperationId,

        /// Revoking owner's address
        #[arg(short, long)]
        owner: String,
    },

    /// Execute an operation that reached quorum
    Execute {
        #[arg(short, long)]
        id: OperationId,

        /// Calling owner's address
        #[arg(short, long)]
        caller: String,
    },

    /// Display wallet status, or one operation with --id
    Status {
        #[arg(short, long)]
        id: Option<OperationId>,
    },

    /// Show recent wallet events
    Events {
        /// Number of events to show
        #[arg(short, long, default_value = "20")]
        count: usize,
    },

    /// Export wallet state to file
    Export {
        /// Output file path
        #[arg(short, long)]
        output: PathBuf,
    },

    /// Import wallet state from file
    Import {
        /// Input file path
        #[arg(short, long)]
        input: PathBuf,

        /// Replace an existing wallet in the data directory
        #[arg(long)]
        force: bool,
    },
}

#[derive(Subcommand)]
enum EffectCommands {
    /// Send value held by the wallet
    Transfer {
        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        amount: u64,
    },

    /// Add an owner
    AddOwner {
        #[arg(short, long)]
        owner: String,
    },

    /// Remove an owner
    RemoveOwner {
        #[arg(short, long)]
        owner: String,
    },

    /// Change the approval threshold
    SetThreshold {
        #[arg(short, long)]
        threshold: usize,
    },

    /// Dispatch an external call
    Call {
        #[arg(short, long)]
        target: String,

        /// Hex-encoded call payload
        #[arg(short, long, default_value = "")]
        payload: String,
    },
}

impl EffectCommands {
    fn into_effect(self) -> Result<Effect, Box<dyn std::error::Error>> {
        let effect = match self {
            EffectCommands::Transfer { to, amount } => Effect::Transfer { to, amount },
            EffectCommands::AddOwner { owner } => Effect::AddOwner {
                owner: owner.parse::<Owner>()?,
            },
            EffectCommands::RemoveOwner { owner } => Effect::RemoveOwner {
                owner: owner.parse::<Owner>()?,
            },
            EffectCommands::SetThreshold { threshold } => Effect::SetThreshold { threshold },
            EffectCommands::Call { target, payload } => Effect::ExternalCall {
                target,
                payload: hex::decode(payload.trim())?,
            },
        };
        Ok(effect)
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that don't need a deployed wallet
    match &cli.command {
        Commands::Keygen => return cli::cmd_keygen(),
        Commands::Deploy {
            owners,
            threshold,
            force,
        } => return cli::cmd_deploy(&cli.data_dir, owners, *threshold, *force),
        Commands::Import { input, force } => {
            return cli::cmd_import(&cli.data_dir, input, *force)
        }
        _ => {}
    }

    // Initialize application state
    let mut state = AppState::new(cli.data_dir.clone())?;

    // Process commands
    match cli.command {
        Commands::Keygen | Commands::Deploy { .. } | Commands::Import { .. } => unreachable!(),

        Commands::Deposit { from, amount } => {
            cli::cmd_deposit(&mut state, &from, amount)?;
        }

        Commands::Propose { from, effect } => {
            cli::cmd_propose(&mut state, &from, effect.into_effect()?)?;
        }

        Commands::Digest { id } => {
            cli::cmd_digest(&state, id)?;
        }

        Commands::Sign { id, key } => {
            cli::cmd_sign(&state, id, &key)?;
        }

        Commands::Approve {
            id,
            owner,
            signature,
        } => {
            cli::cmd_approve(&mut state, id, &owner, &signature)?;
        }

        Commands::Revoke { id, owner } => {
            cli::cmd_revoke(&mut state, id, &owner)?;
        }

        Commands::Execute { id, caller } => {
            cli::cmd_execute(&mut state, id, &caller)?;
        }

        Commands::Status { id } => match id {
            None => cli::cmd_status(&state)?,
            Some(id) => cli::cmd_show(&state, id)?,
        },

        Commands::Events { count } => {
            cli::cmd_events(&state, count)?;
        }

        Commands::Export { output } => {
            cli::cmd_export(&state, &output)?;
        }
    }

    Ok(())
}
