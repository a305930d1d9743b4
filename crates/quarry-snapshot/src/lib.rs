//! # Quarry Snapshot
//!
//! Point-in-time store images for Quarry.
//!
//! ## ⚠️ Internal Implementation Detail
//!
//! **This crate is an internal implementation detail of Quarry.**
//!
//! Users should depend on the main `quarry` crate instead, which provides
//! the stable public API. This crate's API may change without notice
//! between minor versions.
//!
//! ---
//!
//! A snapshot is a single checksummed file holding a whole [`Store`]:
//! schema definitions, every table and the key counter. Saving writes to a
//! temporary sibling file and renames it into place, so a crash mid-save
//! leaves the previous snapshot intact.
//!
//! ## Usage
//!
//! ```ignore
//! use quarry_snapshot::SnapshotManager;
//!
//! let manager = SnapshotManager::new();
//! let meta = manager.save(&store, "/path/to/store.qrys")?;
//! let restored = manager.load("/path/to/store.qrys", StoreConfig::default())?;
//! ```

use quarry_core::{Error, Result, Timestamp};
use quarry_storage::{Store, StoreConfig};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub mod format;

pub use format::{Header, StoreImage, TableImage, SNAPSHOT_FORMAT_VERSION};

/// Snapshot metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotMeta {
    /// Path the snapshot was written to or read from
    pub path: PathBuf,
    /// Format version
    pub version: u16,
    /// When the snapshot was written or read
    pub timestamp: Timestamp,
    /// Number of classes
    pub classes: usize,
    /// Number of objects across all classes
    pub objects: usize,
    /// Total file size in bytes
    pub total_size: u64,
    /// CRC32 of the payload
    pub checksum: u32,
}

/// Snapshot configuration
#[derive(Debug, Clone)]
pub struct SnapshotConfig {
    /// Verify the payload checksum on load
    pub verify_checksums: bool,
}

impl Default for SnapshotConfig {
    fn default() -> Self {
        Self {
            verify_checksums: true,
        }
    }
}

/// Snapshot manager
#[derive(Debug, Clone, Default)]
pub struct SnapshotManager {
    config: SnapshotConfig,
}

impl SnapshotManager {
    /// Create a snapshot manager with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a snapshot manager with custom configuration
    pub fn with_config(config: SnapshotConfig) -> Self {
        Self { config }
    }

    /// Write a snapshot of `store` to `path`
    pub fn save(&self, store: &Store, path: impl AsRef<Path>) -> Result<SnapshotMeta> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let image = StoreImage::capture(store);
        let bytes = format::encode(&image)?;
        let header = Header::parse(&bytes)?;

        let tmp = temp_path(&path);
        {
            let file = File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            writer.write_all(&bytes)?;
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|e| Error::Io(e.into_error()))?
                .sync_all()?;
        }
        fs::rename(&tmp, &path)?;

        let meta = SnapshotMeta {
            path,
            version: header.version,
            timestamp: Timestamp::now(),
            classes: image.tables.len(),
            objects: image.object_count(),
            total_size: bytes.len() as u64,
            checksum: header.checksum,
        };
        info!(
            path = %meta.path.display(),
            objects = meta.objects,
            bytes = meta.total_size,
            "Snapshot saved"
        );
        Ok(meta)
    }

    fn read(&self, path: &Path) -> Result<(Header, StoreImage, u64)> {
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents)?;

        let (header, image) = format::decode(&contents, self.config.verify_checksums)?;
        Ok((header, image, contents.len() as u64))
    }

    /// Load the store held in a snapshot file
    pub fn load(&self, path: impl AsRef<Path>, config: StoreConfig) -> Result<Store> {
        let path = path.as_ref();
        let (_, image, size) = self.read(path)?;
        let store = image.restore(config)?;
        debug!(path = %path.display(), bytes = size, "Snapshot loaded");
        Ok(store)
    }

    /// Read snapshot metadata without rebuilding the store
    pub fn read_meta(&self, path: impl AsRef<Path>) -> Result<SnapshotMeta> {
        let path = path.as_ref();
        let (header, image, size) = self.read(path)?;
        Ok(SnapshotMeta {
            path: path.to_path_buf(),
            version: header.version,
            timestamp: Timestamp::now(),
            classes: image.tables.len(),
            objects: image.object_count(),
            total_size: size,
            checksum: header.checksum,
        })
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
