//! Token-based handoff of datasets between applications.
//!
//! A token stands for a dataset plus its original filename. [`LocalTransfer`]
//! keeps each transfer in a directory as `<token>.parquet` with a
//! `<token>.json` manifest next to it.

use std::collections::hash_map::DefaultHasher;
use std::fs::{self, File};
use std::hash::{Hash, Hasher};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use fs2::FileExt;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::dataset::Dataset;

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("unknown transfer token '{token}'")]
    UnknownToken { token: String },

    #[error("transfer store: {0}")]
    Io(#[from] std::io::Error),

    #[error("transfer payload: {0}")]
    Polars(#[from] PolarsError),

    #[error("transfer manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

/// A dataset received through a token.
#[derive(Debug, Clone)]
pub struct Transferred {
    pub dataset: Dataset,
    pub filename: String,
}

pub trait TransferService {
    fn fetch(&self, token: &str) -> Result<Transferred, TransferError>;

    /// Store `dataset` and return the token that retrieves it.
    fn publish(
        &self,
        dataset: &Dataset,
        source_app: &str,
        filename: &str,
    ) -> Result<String, TransferError>;
}

mod time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).map_err(|e| {
            serde::ser::Error::custom(format!("Failed to serialize SystemTime: {}", e))
        })?;
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + std::time::Duration::from_secs(secs))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub token: String,
    pub filename: String,
    pub source_app: String,
    #[serde(with = "time_serde")]
    pub created: SystemTime,
}

/// Directory-backed transfer store.
#[derive(Debug, Clone)]
pub struct LocalTransfer {
    dir: PathBuf,
}

impl LocalTransfer {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn manifest(&self, token: &str) -> Result<Manifest, TransferError> {
        let path = self.manifest_path(token)?;
        if !path.exists() {
            return Err(TransferError::UnknownToken {
                token: token.to_string(),
            });
        }
        read_manifest(&path)
    }

    /// Manifests of every stored transfer, newest first.
    pub fn list(&self) -> Result<Vec<Manifest>, TransferError> {
        let mut manifests = Vec::new();
        if !self.dir.exists() {
            return Ok(manifests);
        }
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            manifests.push(read_manifest(&path)?);
        }
        manifests.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(manifests)
    }

    fn payload_path(&self, token: &str) -> Result<PathBuf, TransferError> {
        Ok(self.dir.join(format!("{}.parquet", checked(token)?)))
    }

    fn manifest_path(&self, token: &str) -> Result<PathBuf, TransferError> {
        Ok(self.dir.join(format!("{}.json", checked(token)?)))
    }

    /// Write the payload, then the manifest. A token is only visible once its
    /// manifest exists; a payload whose manifest could not be written is removed.
    fn store(&self, dataset: &Dataset, manifest: &Manifest) -> Result<(), TransferError> {
        let payload_path = self.payload_path(&manifest.token)?;
        let mut frame = dataset.frame().clone();
        let mut payload = File::create(&payload_path)?;
        ParquetWriter::new(&mut payload).finish(&mut frame)?;

        if let Err(e) = self.write_manifest(manifest) {
            if let Err(cleanup) = fs::remove_file(&payload_path) {
                warn!(token = %manifest.token, error = %cleanup, "could not remove orphaned payload");
            }
            return Err(e);
        }
        Ok(())
    }

    fn write_manifest(&self, manifest: &Manifest) -> Result<(), TransferError> {
        let json = serde_json::to_string_pretty(manifest)?;
        let mut file = fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(self.manifest_path(&manifest.token)?)?;
        file.lock_exclusive()?;
        let written = file
            .set_len(0)
            .and_then(|_| file.write_all(json.as_bytes()))
            .and_then(|_| file.flush());
        file.unlock()?;
        Ok(written?)
    }

    fn new_token(&self, source_app: &str, filename: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(SystemTime::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let mut attempt = 0u32;
        loop {
            let mut hasher = DefaultHasher::new();
            filename.hash(&mut hasher);
            source_app.hash(&mut hasher);
            nanos.hash(&mut hasher);
            attempt.hash(&mut hasher);
            let token = format!("{:016x}", hasher.finish());
            if !self.dir.join(format!("{}.json", token)).exists() {
                return token;
            }
            attempt += 1;
        }
    }
}

impl TransferService for LocalTransfer {
    fn fetch(&self, token: &str) -> Result<Transferred, TransferError> {
        let manifest = self.manifest(token)?;
        let file = File::open(self.payload_path(token)?)?;
        let frame = ParquetReader::new(file).finish()?;
        debug!(token, rows = frame.height(), "fetched transfer");
        Ok(Transferred {
            dataset: Dataset::new(manifest.filename.clone(), frame),
            filename: manifest.filename,
        })
    }

    fn publish(
        &self,
        dataset: &Dataset,
        source_app: &str,
        filename: &str,
    ) -> Result<String, TransferError> {
        fs::create_dir_all(&self.dir)?;
        let token = self.new_token(source_app, filename);
        let manifest = Manifest {
            token: token.clone(),
            filename: filename.to_string(),
            source_app: source_app.to_string(),
            created: SystemTime::now(),
        };
        self.store(dataset, &manifest)?;

        info!(token = %token, source_app, filename, rows = dataset.height(), "published transfer");
        Ok(token)
    }
}

/// Read a manifest under a shared lock; pairs with `write_manifest`.
fn read_manifest(path: &Path) -> Result<Manifest, TransferError> {
    let mut file = File::open(path)?;
    file.lock_shared()?;
    let mut content = String::new();
    let read = file.read_to_string(&mut content);
    file.unlock()?;
    read?;
    Ok(serde_json::from_str(&content)?)
}

/// Tokens are 16 lowercase hex digits; anything else cannot name a stored file.
fn checked(token: &str) -> Result<&str, TransferError> {
    if token.len() == 16 && token.chars().all(|c| c.is_ascii_hexdigit()) {
        Ok(token)
    } else {
        Err(TransferError::UnknownToken {
            token: token.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            "result",
            df!("id" => [1i64, 2], "y" => ["q", "r"]).unwrap(),
        )
    }

    #[test]
    fn test_publish_then_fetch() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTransfer::new(dir.path());
        let token = store.publish(&sample(), "reports", "joined.csv").unwrap();
        assert_eq!(token.len(), 16);

        let got = store.fetch(&token).unwrap();
        assert_eq!(got.filename, "joined.csv");
        assert_eq!(got.dataset.name(), "joined.csv");
        assert!(got.dataset.frame().equals(sample().frame()));

        let manifest = store.manifest(&token).unwrap();
        assert_eq!(manifest.source_app, "reports");
    }

    #[test]
    fn test_tokens_are_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTransfer::new(dir.path());
        let a = store.publish(&sample(), "app", "same.csv").unwrap();
        let b = store.publish(&sample(), "app", "same.csv").unwrap();
        assert_ne!(a, b);
        assert_eq!(store.list().unwrap().len(), 2);
    }

    #[test]
    fn test_unknown_and_malformed_tokens() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTransfer::new(dir.path());
        assert!(matches!(
            store.fetch("0123456789abcdef"),
            Err(TransferError::UnknownToken { .. })
        ));
        assert!(matches!(
            store.fetch("../../etc/passwd"),
            Err(TransferError::UnknownToken { .. })
        ));
    }

    #[test]
    fn test_failed_manifest_removes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTransfer::new(dir.path());
        let token = "00000000000000aa";
        // a directory where the manifest file should go
        fs::create_dir(dir.path().join(format!("{}.json", token))).unwrap();
        let manifest = Manifest {
            token: token.to_string(),
            filename: "joined.csv".to_string(),
            source_app: "reports".to_string(),
            created: SystemTime::now(),
        };

        assert!(store.store(&sample(), &manifest).is_err());
        assert!(!dir.path().join(format!("{}.parquet", token)).exists());
    }

    #[test]
    fn test_list_on_missing_dir_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTransfer::new(dir.path().join("absent"));
        assert!(store.list().unwrap().is_empty());
    }
}
