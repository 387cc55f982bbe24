//! Storage layer for wallet state
//!
//! This module provides:
//! - JSON persistence with atomic writes and rotating backups
//! - Export/import of wallet state to arbitrary files

pub mod persistence;

pub use persistence::{load_from_file, save_to_file, Storage, StorageConfig, StorageError};
