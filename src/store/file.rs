//! File-backed block store.
//!
//! Blocks are fixed-size and laid out back to back: block `k` starts at byte
//! offset `k * block_size`. The final block may be short.

use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::{Bytes, BytesMut};
use parking_lot::Mutex;
use tracing::debug;

use crate::store::{BackingStore, BlockKey, StoreError};

/// Read statistics for a [`FileBlockStore`].
#[derive(Debug, Default, Clone, Copy)]
pub struct FileStoreStats {
    pub total_reads: u64,
    pub total_bytes_read: u64,
}

struct Inner {
    file: File,
    len: u64,
    stats: FileStoreStats,
}

/// Reads fixed-size blocks from a single file.
pub struct FileBlockStore {
    path: PathBuf,
    block_size: usize,
    inner: Mutex<Inner>,
}

impl FileBlockStore {
    /// Open an existing block file.
    pub fn open(path: impl AsRef<Path>, block_size: usize) -> std::io::Result<Self> {
        if block_size == 0 {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "block_size must be positive",
            ));
        }

        let path = path.as_ref().to_path_buf();
        let file = File::open(&path)?;
        let len = file.metadata()?.len();

        debug!(path = %path.display(), len, block_size, "Opened block file");

        Ok(Self {
            path,
            block_size,
            inner: Mutex::new(Inner {
                file,
                len,
                stats: FileStoreStats::default(),
            }),
        })
    }

    /// Block size in bytes.
    pub fn block_size(&self) -> usize {
        self.block_size
    }

    /// Number of blocks in the file, counting a short trailing block.
    pub fn block_count(&self) -> u64 {
        let len = self.inner.lock().len;
        len.div_ceil(self.block_size as u64)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn stats(&self) -> FileStoreStats {
        self.inner.lock().stats
    }

    fn offset(&self, key: BlockKey) -> Option<u64> {
        key.checked_mul(self.block_size as u64)
    }
}

impl BackingStore for FileBlockStore {
    fn read_block(&self, key: BlockKey) -> Result<Bytes, StoreError> {
        let offset = self.offset(key).ok_or(StoreError::NotFound(key))?;

        let mut inner = self.inner.lock();
        if offset >= inner.len {
            return Err(StoreError::NotFound(key));
        }

        let size = (inner.len - offset).min(self.block_size as u64) as usize;
        let mut buf = BytesMut::zeroed(size);

        read_at(&mut inner.file, offset, &mut buf).map_err(|source| StoreError::Io { key, source })?;

        inner.stats.total_reads += 1;
        inner.stats.total_bytes_read += size as u64;

        debug!(
            key,
            offset,
            size,
            path = %self.path.display(),
            "Read block from file"
        );

        Ok(buf.freeze())
    }
}

fn read_at(file: &mut File, offset: u64, buf: &mut [u8]) -> std::io::Result<()> {
    file.seek(SeekFrom::Start(offset))?;
    file.read_exact(buf)
}
