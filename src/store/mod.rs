//! Backing stores consulted by the cache on a miss.
//!
//! The cache only needs one capability from a store: a blocking read of a
//! single block by key. Anything that can produce a block (a file, a map, a
//! closure in a test) plugs in through [`BackingStore`].
//!
//! - [`file`]: fixed-size blocks laid out back to back in one file
//! - [`memory`]: in-memory and synthetic stores used by tests and the demo

pub mod file;
pub mod memory;

use std::sync::Arc;

use bytes::Bytes;
use thiserror::Error;

pub use file::FileBlockStore;
pub use memory::{MemoryBlockStore, SyntheticBlockStore};

/// Key identifying a block in the backing store.
pub type BlockKey = u64;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Block {0} not found")]
    NotFound(BlockKey),

    #[error("I/O error reading block {key}: {source}")]
    Io {
        key: BlockKey,
        #[source]
        source: std::io::Error,
    },
}

/// A source of blocks that may fail.
///
/// Called with the cache lock held, so implementations may block but must not
/// call back into the cache.
pub trait BackingStore: Send + Sync {
    fn read_block(&self, key: BlockKey) -> Result<Bytes, StoreError>;
}

impl<S: BackingStore + ?Sized> BackingStore for Arc<S> {
    fn read_block(&self, key: BlockKey) -> Result<Bytes, StoreError> {
        (**self).read_block(key)
    }
}

impl<S: BackingStore + ?Sized> BackingStore for Box<S> {
    fn read_block(&self, key: BlockKey) -> Result<Bytes, StoreError> {
        (**self).read_block(key)
    }
}

/// A [`BackingStore`] backed by a closure. See [`from_fn`].
#[derive(Clone)]
pub struct FnStore<F>(F);

impl<F> BackingStore for FnStore<F>
where
    F: Fn(BlockKey) -> Result<Bytes, StoreError> + Send + Sync,
{
    fn read_block(&self, key: BlockKey) -> Result<Bytes, StoreError> {
        (self.0)(key)
    }
}

/// Wrap a closure as a backing store.
pub fn from_fn<F>(f: F) -> FnStore<F>
where
    F: Fn(BlockKey) -> Result<Bytes, StoreError> + Send + Sync,
{
    FnStore(f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fn_store_delegates() {
        let store = from_fn(|key| {
            if key % 2 == 0 {
                Ok(Bytes::from(format!("even-{key}")))
            } else {
                Err(StoreError::NotFound(key))
            }
        });

        assert_eq!(store.read_block(4).unwrap(), Bytes::from("even-4"));
        assert!(matches!(store.read_block(3), Err(StoreError::NotFound(3))));
    }

    #[test]
    fn test_arc_store_delegates() {
        let store: Arc<dyn BackingStore> = Arc::new(from_fn(|_| Ok(Bytes::from_static(b"x"))));
        assert_eq!(store.read_block(9).unwrap(), Bytes::from_static(b"x"));
    }
}
