//! On-disk snapshots of a graph.
//!
//! A graph directory holds:
//! - `MANIFEST`: magic + format version
//! - `LOCK`: held exclusively while the graph is open
//! - `graph.bin`: the latest committed snapshot
//!
//! Snapshots are written to `graph.bin.tmp` and renamed into place, so a
//! crash mid-write leaves the previous snapshot intact.

use super::memory::GraphData;
use crate::error::{Result, VersionerError};
use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Magic bytes for the graph manifest.
const MANIFEST_MAGIC: &[u8; 4] = b"VGR\0";

/// Magic bytes for snapshot files.
const SNAPSHOT_MAGIC: &[u8; 4] = b"VGS\0";

/// Current on-disk format version.
const FORMAT_VERSION: u8 = 1;

const MANIFEST_FILE: &str = "MANIFEST";
const LOCK_FILE: &str = "LOCK";
const SNAPSHOT_FILE: &str = "graph.bin";
const SNAPSHOT_TMP_FILE: &str = "graph.bin.tmp";

/// Bytes around the body: magic, version, length prefix, checksum.
const SNAPSHOT_OVERHEAD: u64 = 4 + 1 + 8 + 4;

pub(crate) struct SnapshotStorage {
    dir: PathBuf,

    /// Lock file for exclusive access.
    _lock_file: File,
}

impl SnapshotStorage {
    pub(crate) fn exists(dir: &Path) -> bool {
        dir.join(MANIFEST_FILE).exists()
    }

    /// Initialize a new graph directory.
    pub(crate) fn create(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir)?;
        Self::write_manifest(dir)?;
        let lock_file = Self::acquire_lock(dir)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            _lock_file: lock_file,
        })
    }

    /// Open an existing graph directory and load its latest snapshot.
    pub(crate) fn open(dir: &Path) -> Result<(Self, GraphData)> {
        Self::verify_manifest(dir)?;
        let lock_file = Self::acquire_lock(dir)?;

        let storage = Self {
            dir: dir.to_path_buf(),
            _lock_file: lock_file,
        };

        let snapshot = dir.join(SNAPSHOT_FILE);
        let data = if snapshot.exists() {
            Self::read_snapshot(&snapshot)?
        } else {
            GraphData::default()
        };

        Ok((storage, data))
    }

    /// Persist `data` as the latest snapshot.
    ///
    /// Layout: magic, version, body length (u64 LE), MessagePack body,
    /// CRC32 of the body (u32 LE).
    pub(crate) fn save(&self, data: &GraphData) -> Result<()> {
        let encoded = rmp_serde::to_vec(data)?;
        let checksum = crc32fast::hash(&encoded);

        let tmp_path = self.dir.join(SNAPSHOT_TMP_FILE);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&tmp_path)?;

        file.write_all(SNAPSHOT_MAGIC)?;
        file.write_all(&[FORMAT_VERSION])?;
        file.write_all(&(encoded.len() as u64).to_le_bytes())?;
        file.write_all(&encoded)?;
        file.write_all(&checksum.to_le_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, self.dir.join(SNAPSHOT_FILE))?;

        debug!(bytes = encoded.len(), "wrote graph snapshot");
        Ok(())
    }

    fn read_snapshot(path: &Path) -> Result<GraphData> {
        let mut file = File::open(path)?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != SNAPSHOT_MAGIC {
            return Err(VersionerError::InvalidFormat("Invalid snapshot magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != FORMAT_VERSION {
            return Err(VersionerError::InvalidFormat(format!(
                "Unsupported snapshot version: {}",
                version[0]
            )));
        }

        let mut len_bytes = [0u8; 8];
        file.read_exact(&mut len_bytes)?;
        let len = u64::from_le_bytes(len_bytes);

        let available = file.metadata()?.len().saturating_sub(SNAPSHOT_OVERHEAD);
        if len > available {
            return Err(VersionerError::InvalidFormat(format!(
                "Snapshot body length {} exceeds file contents ({} bytes)",
                len, available
            )));
        }

        let mut encoded = vec![0u8; len as usize];
        file.read_exact(&mut encoded)?;

        let mut crc_bytes = [0u8; 4];
        file.read_exact(&mut crc_bytes)?;
        let expected = u32::from_le_bytes(crc_bytes);
        let got = crc32fast::hash(&encoded);
        if expected != got {
            return Err(VersionerError::ChecksumMismatch { expected, got });
        }

        Ok(rmp_serde::from_slice(&encoded)?)
    }

    fn write_manifest(dir: &Path) -> Result<()> {
        let mut file = File::create(dir.join(MANIFEST_FILE))?;

        file.write_all(MANIFEST_MAGIC)?;
        file.write_all(&[FORMAT_VERSION])?;
        file.sync_all()?;

        Ok(())
    }

    fn verify_manifest(dir: &Path) -> Result<()> {
        let mut file = File::open(dir.join(MANIFEST_FILE))?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != MANIFEST_MAGIC {
            return Err(VersionerError::InvalidFormat("Invalid graph magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != FORMAT_VERSION {
            return Err(VersionerError::InvalidFormat(format!(
                "Unsupported graph version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(dir: &Path) -> Result<File> {
        let lock_file = File::create(dir.join(LOCK_FILE))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| VersionerError::Locked)?;

        Ok(lock_file)
    }
}
