//! Store persistence layer
//!
//! Saves and loads account-store snapshots as JSON, with atomic writes and
//! rotating backups.

use crate::store::memory::{MemoryStore, StoreSnapshot};
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Persistence errors
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Persistence configuration
#[derive(Debug, Clone)]
pub struct VaultConfig {
    pub data_dir: PathBuf,
    pub store_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".vault_data"),
            store_file: "accounts.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Account store persistence manager
pub struct Vault {
    config: VaultConfig,
}

impl Vault {
    /// Create a persistence manager, ensuring the data directory exists
    pub fn new(config: VaultConfig) -> Result<Self, VaultError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    /// Create with default configuration
    pub fn with_defaults() -> Result<Self, VaultError> {
        Self::new(VaultConfig::default())
    }

    /// Path of the store file
    fn store_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.store_file)
    }

    /// Path of backup `index`
    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.store_file, index))
    }

    /// Save the store to disk
    ///
    /// Writes to a temporary file first and renames into place, so a crash
    /// mid-save never corrupts the previous snapshot.
    pub fn save(&self, store: &MemoryStore) -> Result<(), VaultError> {
        let path = self.store_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let temp_path = self.config.data_dir.join("accounts.tmp");
        let file = fs::File::create(&temp_path)?;
        let writer = BufWriter::new(file);
        serde_json::to_writer_pretty(writer, &store.snapshot())?;

        fs::rename(&temp_path, &path)?;
        log::debug!("saved account store to {:?}", path);

        Ok(())
    }

    /// Load the store from disk
    pub fn load(&self) -> Result<MemoryStore, VaultError> {
        let path = self.store_path();

        if !path.exists() {
            return Err(VaultError::InvalidData(
                "account store file not found".to_string(),
            ));
        }

        let file = fs::File::open(&path)?;
        let reader = BufReader::new(file);
        let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;

        Ok(MemoryStore::from_snapshot(snapshot))
    }

    /// Check whether a saved store exists
    pub fn exists(&self) -> bool {
        self.store_path().exists()
    }

    /// Delete the saved store
    pub fn delete(&self) -> Result<(), VaultError> {
        let path = self.store_path();
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    /// Rotate backup files, dropping the oldest
    fn rotate_backups(&self) -> Result<(), VaultError> {
        if self.config.max_backups == 0 {
            return Ok(());
        }

        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Restore the store from backup `backup_index`
    pub fn restore_backup(&self, backup_index: usize) -> Result<MemoryStore, VaultError> {
        let backup_path = self.backup_path(backup_index);

        if !backup_path.exists() {
            return Err(VaultError::InvalidData(format!(
                "backup {} not found",
                backup_index
            )));
        }

        let file = fs::File::open(&backup_path)?;
        let reader = BufReader::new(file);
        let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;

        Ok(MemoryStore::from_snapshot(snapshot))
    }

    /// List available backup indices
    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

/// Save a store snapshot to a specific file path
pub fn save_to_file(store: &MemoryStore, path: &Path) -> Result<(), VaultError> {
    let file = fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, &store.snapshot())?;
    Ok(())
}

/// Load a store snapshot from a specific file path
pub fn load_from_file(path: &Path) -> Result<MemoryStore, VaultError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    let snapshot: StoreSnapshot = serde_json::from_reader(reader)?;
    Ok(MemoryStore::from_snapshot(snapshot))
}
