//! Crowdsale Storage Layer - File-Based Snapshots
//!
//! One deployment lives in one data directory:
//! - Each snapshot is written as pretty JSON (human-readable) and bincode (fast)
//! - Loading prefers bincode and falls back to JSON, so bincode is renamed into
//!   place first and is never older than the JSON copy
//! - A crowdsale whose ledger fails the supply check is never written
//! - A loaded crowdsale must pass `Crowdsale::verify`

use ico_crowdsale::{Crowdsale, CrowdsaleError};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Snapshot name of the deployment's controller (and its ledger)
pub const CROWDSALE_SNAPSHOT: &str = "crowdsale";

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Snapshot not found: {0}")]
    SnapshotNotFound(String),

    #[error("Inconsistent ledger in snapshot {0}: supply does not match balances")]
    InconsistentLedger(String),

    #[error("Invalid snapshot {name}: {source}")]
    InvalidSnapshot {
        name: String,
        source: CrowdsaleError,
    },
}

pub type Result<T> = std::result::Result<T, StorageError>;

pub struct Storage {
    data_dir: PathBuf,
}

impl Storage {
    /// Open (and create if needed) a data directory
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let data_dir = path.as_ref().to_path_buf();
        if !data_dir.exists() {
            fs::create_dir_all(&data_dir)?;
        }
        Ok(Self { data_dir })
    }

    pub fn save_snapshot<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let json = serde_json::to_string_pretty(data)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;
        let bin = bincode::serialize(data)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        let bin_path = self.bin_path(name);
        let json_path = self.json_path(name);
        let bin_tmp = stage(&bin_path, &bin)?;
        let json_tmp = match stage(&json_path, json.as_bytes()) {
            Ok(tmp) => tmp,
            Err(e) => {
                discard(&bin_tmp);
                return Err(e);
            }
        };

        if let Err(e) = fs::rename(&bin_tmp, &bin_path) {
            discard(&bin_tmp);
            discard(&json_tmp);
            return Err(e.into());
        }
        if let Err(e) = fs::rename(&json_tmp, &json_path) {
            discard(&json_tmp);
            return Err(e.into());
        }
        debug!("saved snapshot {} ({} bytes)", name, bin.len());
        Ok(())
    }

    pub fn load_snapshot<T: for<'de> Deserialize<'de>>(&self, name: &str) -> Result<T> {
        let bin_path = self.bin_path(name);
        if bin_path.exists() {
            let data = fs::read(&bin_path)?;
            return bincode::deserialize(&data)
                .map_err(|e| StorageError::SerializationError(e.to_string()));
        }

        let json_path = self.json_path(name);
        if json_path.exists() {
            let data = fs::read_to_string(&json_path)?;
            return serde_json::from_str(&data)
                .map_err(|e| StorageError::SerializationError(e.to_string()));
        }

        Err(StorageError::SnapshotNotFound(name.to_string()))
    }

    pub fn has_snapshot(&self, name: &str) -> bool {
        self.bin_path(name).exists() || self.json_path(name).exists()
    }

    pub fn delete_snapshot(&self, name: &str) -> Result<()> {
        for path in [self.bin_path(name), self.json_path(name)] {
            if path.exists() {
                fs::remove_file(path)?;
            }
        }
        Ok(())
    }

    pub fn save_crowdsale(&self, sale: &Crowdsale) -> Result<()> {
        if !sale.ledger().is_conserved() {
            return Err(StorageError::InconsistentLedger(
                CROWDSALE_SNAPSHOT.to_string(),
            ));
        }
        self.save_snapshot(CROWDSALE_SNAPSHOT, sale)?;
        info!(
            "persisted crowdsale ({}, supply {})",
            sale.state(),
            sale.total_supply()
        );
        Ok(())
    }

    pub fn load_crowdsale(&self) -> Result<Crowdsale> {
        let sale: Crowdsale = self.load_snapshot(CROWDSALE_SNAPSHOT)?;
        if !sale.ledger().is_conserved() {
            return Err(StorageError::InconsistentLedger(
                CROWDSALE_SNAPSHOT.to_string(),
            ));
        }
        sale.verify().map_err(|source| StorageError::InvalidSnapshot {
            name: CROWDSALE_SNAPSHOT.to_string(),
            source,
        })?;
        Ok(sale)
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn json_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.json", name))
    }

    fn bin_path(&self, name: &str) -> PathBuf {
        self.data_dir.join(format!("{}.bin", name))
    }
}

/// Write `contents` to `<path>.tmp` and return the temp path
fn stage(path: &Path, contents: &[u8]) -> Result<PathBuf> {
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);
    if let Err(e) = fs::write(&tmp, contents) {
        discard(&tmp);
        return Err(e.into());
    }
    Ok(tmp)
}

fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp) {
        debug!("could not remove {}: {}", tmp.display(), e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ico_crowdsale::{Address, SaleConfig, TokenLedger, ETHER};
    use tempfile::tempdir;

    fn addr(n: u8) -> Address {
        Address::new([n; 20])
    }

    fn funded_sale() -> Crowdsale {
        let owner = addr(1);
        let mut ledger = TokenLedger::new(owner);
        ledger.set_emission_authority(&owner, addr(3)).unwrap();
        let mut sale = Crowdsale::new(SaleConfig::new(owner, addr(2), addr(3)), ledger).unwrap();
        sale.start_ico(&owner, 100).unwrap();
        sale.fund(&addr(10), 10 * ETHER, 100).unwrap();
        sale
    }

    #[test]
    fn test_save_and_load_crowdsale() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let sale = funded_sale();

        storage.save_crowdsale(&sale).unwrap();
        assert!(storage.has_snapshot(CROWDSALE_SNAPSHOT));

        let loaded = storage.load_crowdsale().unwrap();
        assert_eq!(loaded.status(100), sale.status(100));
        assert_eq!(loaded.balance_of(&addr(10)), 14_990);
    }

    #[test]
    fn test_json_fallback() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        let sale = funded_sale();

        storage.save_crowdsale(&sale).unwrap();
        fs::remove_file(dir.path().join("crowdsale.bin")).unwrap();

        let loaded = storage.load_crowdsale().unwrap();
        assert_eq!(loaded.ico_balance(), 10 * ETHER);
    }

    #[test]
    fn test_missing_snapshot() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path().join("nested")).unwrap();

        assert!(!storage.has_snapshot(CROWDSALE_SNAPSHOT));
        assert!(matches!(
            storage.load_crowdsale(),
            Err(StorageError::SnapshotNotFound(_))
        ));
    }

    #[test]
    fn test_tampered_snapshot_rejected() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        storage.save_crowdsale(&funded_sale()).unwrap();
        fs::remove_file(dir.path().join("crowdsale.bin")).unwrap();

        let json_path = dir.path().join("crowdsale.json");
        let json = fs::read_to_string(&json_path).unwrap();
        let tampered = json.replace("\"total_supply\": 14990", "\"total_supply\": 99999");
        assert_ne!(json, tampered);
        fs::write(&json_path, tampered).unwrap();

        assert!(matches!(
            storage.load_crowdsale(),
            Err(StorageError::InconsistentLedger(_))
        ));
    }

    #[test]
    fn test_tampered_schedule_rejected() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        storage.save_crowdsale(&funded_sale()).unwrap();
        fs::remove_file(dir.path().join("crowdsale.bin")).unwrap();

        let json_path = dir.path().join("crowdsale.json");
        let json = fs::read_to_string(&json_path).unwrap();
        let tampered = json.replace("\"bonus_bps\": 1499", "\"bonus_bps\": 500");
        assert_ne!(json, tampered);
        fs::write(&json_path, tampered).unwrap();

        assert!(matches!(
            storage.load_crowdsale(),
            Err(StorageError::InvalidSnapshot {
                source: CrowdsaleError::InvalidSchedule(_),
                ..
            })
        ));
    }

    #[test]
    fn test_accumulators_must_match_supply() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        storage.save_crowdsale(&funded_sale()).unwrap();
        fs::remove_file(dir.path().join("crowdsale.bin")).unwrap();

        // ledger still conserved, but the controller claims fewer coins
        let json_path = dir.path().join("crowdsale.json");
        let json = fs::read_to_string(&json_path).unwrap();
        let tampered = json.replace("\"coins_issued\": 14990", "\"coins_issued\": 10000");
        assert_ne!(json, tampered);
        fs::write(&json_path, tampered).unwrap();

        assert!(matches!(
            storage.load_crowdsale(),
            Err(StorageError::InvalidSnapshot {
                source: CrowdsaleError::InvalidState(_),
                ..
            })
        ));
    }

    #[test]
    fn test_failed_json_write_keeps_bincode_current() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        storage.save_crowdsale(&funded_sale()).unwrap();

        // a directory in place of the JSON copy makes its rename fail
        let json_path = dir.path().join("crowdsale.json");
        fs::remove_file(&json_path).unwrap();
        fs::create_dir(&json_path).unwrap();
        fs::write(json_path.join("blocker"), b"x").unwrap();

        let mut sale = funded_sale();
        sale.fund(&addr(10), ETHER, 100).unwrap();
        assert!(storage.save_crowdsale(&sale).is_err());

        let loaded = storage.load_crowdsale().unwrap();
        assert_eq!(loaded.ico_balance(), 11 * ETHER);
        assert!(!dir.path().join("crowdsale.json.tmp").exists());
    }

    #[test]
    fn test_delete_snapshot() {
        let dir = tempdir().unwrap();
        let storage = Storage::open(dir.path()).unwrap();
        storage.save_crowdsale(&funded_sale()).unwrap();

        storage.delete_snapshot(CROWDSALE_SNAPSHOT).unwrap();
        assert!(!storage.has_snapshot(CROWDSALE_SNAPSHOT));
    }
}
