//! Wallet persistence layer
//!
//! Provides save/load functionality for wallet state.

use crate::multisig::WalletState;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub wallet_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".multisig_data"),
            wallet_file: "wallet.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Wallet storage manager
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    /// Create a new storage manager
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn wallet_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.wallet_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.wallet_file, index))
    }

    /// Save the wallet state to disk
    pub fn save(&self, state: &WalletState) -> Result<(), StorageError> {
        let path = self.wallet_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        // Write to temporary file first
        let temp_path = self.config.data_dir.join("wallet.tmp");
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);

        serde_json::to_writer_pretty(writer, state)?;

        // Atomic rename
        fs::rename(&temp_path, &path)?;

        log::debug!("Saved wallet {} to {:?}", state.address(), path);
        Ok(())
    }

    /// Load the wallet state from disk
    pub fn load(&self) -> Result<WalletState, StorageError> {
        let path = self.wallet_path();

        if !path.exists() {
            return Err(StorageError::InvalidData(
                "Wallet file not found".to_string(),
            ));
        }

        read_state(&path)
    }

    /// Check if a saved wallet exists
    pub fn exists(&self) -> bool {
        self.wallet_path().exists()
    }

    /// Rotate backup files
    fn rotate_backups(&self) -> Result<(), StorageError> {
        // Delete oldest backup
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        // Shift existing backups
        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore from a backup
    pub fn restore_backup(&self, backup_index: usize) -> Result<WalletState, StorageError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        read_state(&backup_path)
    }

    /// List available backups
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

/// Read and validate a saved state
fn read_state(path: &Path) -> Result<WalletState, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let state: WalletState = serde_json::from_reader(reader)?;

    state
        .validate()
        .map_err(|e| StorageError::InvalidData(format!("{:?}: {}", path, e)))?;

    Ok(state)
}

/// Save wallet state to a specific file path
pub fn save_to_file(state: &WalletState, path: &Path) -> Result<(), StorageError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, state)?;
    Ok(())
}

/// Load wallet state from a specific file path
pub fn load_from_file(path: &Path) -> Result<WalletState, StorageError> {
    read_state(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::KeyPair;
    use crate::multisig::{MultisigWallet, Secp256k1Verifier};

    fn sample_wallet() -> (MultisigWallet, Vec<KeyPair>) {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let wallet = MultisigWallet::deploy(keys.iter().map(|k| k.owner()).collect(), 2).unwrap();
        (wallet, keys)
    }

    #[test]
    fn test_save_load_wallet() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        let (mut wallet, keys) = sample_wallet();
        wallet.deposit("funder", 40).unwrap();
        let id = wallet.propose_transfer(keys[0].owner(), "X", 15).unwrap();

        storage.save(wallet.state()).unwrap();
        assert!(storage.exists());

        let loaded =
            MultisigWallet::from_state(storage.load().unwrap(), Secp256k1Verifier).unwrap();
        assert_eq!(loaded.address(), wallet.address());
        assert_eq!(loaded.balance(), 40);
        assert_eq!(loaded.description(), "2-of-3");
        assert_eq!(loaded.approval_count(id).unwrap(), 1);
        assert_eq!(loaded.events().len(), wallet.events().len());
    }

    #[test]
    fn test_load_missing_wallet() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let storage = Storage::new(config).unwrap();

        assert!(!storage.exists());
        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
    }

    #[test]
    fn test_backup_rotation() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            max_backups: 3,
            ..Default::default()
        };

        let storage = Storage::new(config).unwrap();
        let (mut wallet, _) = sample_wallet();

        // Save multiple times
        for _ in 0..5 {
            storage.save(wallet.state()).unwrap();
            wallet.deposit("funder", 1).unwrap();
        }

        assert_eq!(storage.list_backups(), vec![0, 1, 2]);

        // Newest backup holds the state of the previous save
        let restored = storage.restore_backup(0).unwrap();
        assert_eq!(restored.balance(), 3);
        assert!(storage.restore_backup(7).is_err());
    }

    #[test]
    fn test_export_import() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("export.json");
        let (wallet, _) = sample_wallet();

        save_to_file(wallet.state(), &path).unwrap();
        let imported = load_from_file(&path).unwrap();
        assert_eq!(imported.address(), wallet.address());
    }

    /// Write `state` to `path` after applying `edit` to its JSON form
    fn save_tampered(
        state: &WalletState,
        path: &Path,
        edit: impl FnOnce(&mut serde_json::Value),
    ) {
        let mut json = serde_json::to_value(state).unwrap();
        edit(&mut json);
        fs::write(path, serde_json::to_string_pretty(&json).unwrap()).unwrap();
    }

    #[test]
    fn test_import_rejects_bad_threshold() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("export.json");
        let (mut wallet, keys) = sample_wallet();
        wallet.deposit("funder", 100).unwrap();
        let id = wallet.propose_transfer(keys[0].owner(), "X", 100).unwrap();
        wallet.revoke(id, keys[0].owner()).unwrap();

        // Threshold 0 would let the transfer run with no approvals at all
        save_tampered(wallet.state(), &path, |json| {
            json["registry"]["threshold"] = serde_json::json!(0)
        });
        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::InvalidData(_))
        ));

        save_tampered(wallet.state(), &path, |json| {
            json["registry"]["threshold"] = serde_json::json!(4)
        });
        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_import_rejects_reused_operation_id() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("export.json");
        let (mut wallet, keys) = sample_wallet();
        let id = wallet.propose_set_threshold(keys[0].owner(), 3).unwrap();
        let sig = keys[1]
            .sign_digest(&wallet.operation_digest(id).unwrap())
            .unwrap();
        wallet.approve(id, keys[1].owner(), &sig).unwrap();
        wallet.execute(id, keys[0].owner()).unwrap();

        save_tampered(wallet.state(), &path, |json| {
            json["ledger"]["next_id"] = serde_json::json!(id)
        });
        assert!(matches!(
            load_from_file(&path),
            Err(StorageError::InvalidData(_))
        ));
    }

    #[test]
    fn test_storage_load_validates() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig {
            data_dir: temp_dir.path().to_path_buf(),
            ..Default::default()
        };
        let storage = Storage::new(config).unwrap();
        let (wallet, _) = sample_wallet();

        storage.save(wallet.state()).unwrap();
        storage.save(wallet.state()).unwrap();

        let wallet_path = temp_dir.path().join("wallet.json");
        let backup_path = temp_dir.path().join("wallet.json.backup.0");
        for path in [&wallet_path, &backup_path] {
            save_tampered(wallet.state(), path, |json| {
                json["registry"]["threshold"] = serde_json::json!(0)
            });
        }

        assert!(matches!(storage.load(), Err(StorageError::InvalidData(_))));
        assert!(matches!(
            storage.restore_backup(0),
            Err(StorageError::InvalidData(_))
        ));
    }
}
