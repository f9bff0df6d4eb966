use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::backend::TierBackend;
use crate::error::{StoreError, StoreResult};
use crate::key::BlobKey;
use crate::record::BlobRecord;
use crate::tier::CacheTier;

/// File magic for durable blob frames.
const MAGIC: &[u8; 4] = b"APB1";

/// Header size: 4 bytes magic + 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 12;

/// Durable tier backend: one file per blob under a root directory.
///
/// Files are named by the key's BLAKE3 digest and sharded by its first two
/// hex characters. Each file holds a single frame:
///
/// ```text
/// [4 bytes: magic "APB1"]
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (zstd-compressed bincode BlobRecord)]
/// ```
///
/// Writes go through a temp file in the same directory and are renamed
/// into place, so readers never observe a half-written frame. A frame
/// that fails its CRC or length check reads as [`StoreError::Corrupt`].
pub struct DiskTier {
    root: PathBuf,
}

impl DiskTier {
    /// Open (or create) a durable tier rooted at the given directory.
    pub fn open(root: &Path) -> StoreResult<Self> {
        fs::create_dir_all(root)?;
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of blob files currently on disk.
    pub fn len(&self) -> usize {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn blob_path(&self, key: &BlobKey) -> PathBuf {
        let digest = key.file_digest();
        self.root.join(&digest[..2]).join(&digest[2..])
    }

    fn encode_frame(record: &BlobRecord) -> StoreResult<Vec<u8>> {
        let payload =
            bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
        let compressed = zstd::encode_all(payload.as_slice(), 3)?;

        let mut frame = Vec::with_capacity(HEADER_SIZE + compressed.len());
        frame.extend_from_slice(MAGIC);
        frame.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
        frame.extend_from_slice(&crc32fast::hash(&compressed).to_le_bytes());
        frame.extend_from_slice(&compressed);
        Ok(frame)
    }

    fn decode_frame(key: &BlobKey, bytes: &[u8]) -> StoreResult<BlobRecord> {
        let corrupt = |reason: String| StoreError::Corrupt {
            key: key.to_string(),
            reason,
        };

        if bytes.len() < HEADER_SIZE {
            return Err(corrupt(format!("frame too short: {} bytes", bytes.len())));
        }
        if &bytes[..4] != MAGIC {
            return Err(corrupt("bad magic".to_string()));
        }
        let length = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]) as usize;
        let expected_crc = u32::from_le_bytes([bytes[8], bytes[9], bytes[10], bytes[11]]);
        if bytes.len() != HEADER_SIZE + length {
            return Err(corrupt(format!(
                "length mismatch: header says {length}, file has {}",
                bytes.len() - HEADER_SIZE
            )));
        }

        let compressed = &bytes[HEADER_SIZE..];
        let actual_crc = crc32fast::hash(compressed);
        if actual_crc != expected_crc {
            return Err(corrupt(format!(
                "CRC mismatch: expected {expected_crc:08x}, got {actual_crc:08x}"
            )));
        }

        let payload =
            zstd::decode_all(compressed).map_err(|e| corrupt(format!("zstd: {e}")))?;
        bincode::deserialize(&payload).map_err(|e| corrupt(format!("decode: {e}")))
    }
}

impl TierBackend for DiskTier {
    fn tier(&self) -> CacheTier {
        CacheTier::Durable
    }

    fn read(&self, key: &BlobKey) -> StoreResult<Option<BlobRecord>> {
        let path = self.blob_path(key);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Self::decode_frame(key, &bytes).map(Some)
    }

    fn write(&self, key: &BlobKey, record: &BlobRecord) -> StoreResult<()> {
        let path = self.blob_path(key);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let frame = Self::encode_frame(record)?;
        let mut tmp = tempfile::NamedTempFile::new_in(&self.root)?;
        tmp.write_all(&frame)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;

        debug!(key = %key, bytes = frame.len(), "durable blob write");
        Ok(())
    }

    fn evict(&self, key: &BlobKey) -> StoreResult<bool> {
        match fs::remove_file(self.blob_path(key)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn contains(&self, key: &BlobKey) -> StoreResult<bool> {
        match fs::metadata(self.blob_path(key)) {
            Ok(_) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

impl std::fmt::Debug for DiskTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskTier").field("root", &self.root).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use apiary_types::{Cell, CellAddress, CellAddressMapping, CodePrivileges, GridKind};

    fn key(x: i64) -> BlobKey {
        BlobKey::cell(CellAddressMapping::at(GridKind::Active, x, 0))
    }

    fn cell_record(x: i64) -> BlobRecord {
        let cell = Cell::new(
            CellAddressMapping::at(GridKind::Active, x, 0),
            vec![CellAddress::parse("Atlas/Page100").unwrap()],
            CodePrivileges::open(),
        );
        BlobRecord::from_cell(&cell).unwrap()
    }

    #[test]
    fn write_then_read_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path()).unwrap();
        let record = cell_record(1);
        tier.write(&key(1), &record).unwrap();
        assert_eq!(tier.read(&key(1)).unwrap().unwrap(), record);
    }

    #[test]
    fn read_of_missing_key_is_a_clean_miss() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path()).unwrap();
        assert!(tier.read(&key(1)).unwrap().is_none());
        assert!(!tier.contains(&key(1)).unwrap());
    }

    #[test]
    fn write_replaces_existing_record() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path()).unwrap();
        tier.write(&key(1), &cell_record(1)).unwrap();
        let replacement = cell_record(99);
        tier.write(&key(1), &replacement).unwrap();
        assert_eq!(tier.read(&key(1)).unwrap().unwrap(), replacement);
        assert_eq!(tier.len(), 1);
    }

    #[test]
    fn records_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let record = cell_record(3);
        {
            let tier = DiskTier::open(dir.path()).unwrap();
            tier.write(&key(3), &record).unwrap();
        }
        let reopened = DiskTier::open(dir.path()).unwrap();
        assert_eq!(reopened.read(&key(3)).unwrap().unwrap(), record);
    }

    #[test]
    fn evict_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path()).unwrap();
        tier.write(&key(2), &cell_record(2)).unwrap();
        assert!(tier.evict(&key(2)).unwrap());
        assert!(!tier.evict(&key(2)).unwrap());
        assert!(tier.read(&key(2)).unwrap().is_none());
        assert!(tier.is_empty());
    }

    #[test]
    fn files_are_sharded_by_digest_prefix() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path()).unwrap();
        tier.write(&key(1), &cell_record(1)).unwrap();

        let digest = key(1).file_digest();
        let expected = dir.path().join(&digest[..2]).join(&digest[2..]);
        assert!(expected.is_file());
    }

    #[test]
    fn flipped_payload_byte_reads_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path()).unwrap();
        tier.write(&key(1), &cell_record(1)).unwrap();

        let digest = key(1).file_digest();
        let path = dir.path().join(&digest[..2]).join(&digest[2..]);
        let mut bytes = fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        fs::write(&path, &bytes).unwrap();

        let err = tier.read(&key(1)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn truncated_frame_reads_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path()).unwrap();
        tier.write(&key(1), &cell_record(1)).unwrap();

        let digest = key(1).file_digest();
        let path = dir.path().join(&digest[..2]).join(&digest[2..]);
        let bytes = fs::read(&path).unwrap();
        fs::write(&path, &bytes[..HEADER_SIZE + 1]).unwrap();

        let err = tier.read(&key(1)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }

    #[test]
    fn bad_magic_reads_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let tier = DiskTier::open(dir.path()).unwrap();
        tier.write(&key(1), &cell_record(1)).unwrap();

        let digest = key(1).file_digest();
        let path = dir.path().join(&digest[..2]).join(&digest[2..]);
        let mut bytes = fs::read(&path).unwrap();
        bytes[0] = b'X';
        fs::write(&path, &bytes).unwrap();

        let err = tier.read(&key(1)).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
