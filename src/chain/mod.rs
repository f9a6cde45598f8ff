//! Read-only access to the node's ledger store.
//!
//! The node keeps three kinds of records in one flat key space:
//!
//! | key                                           | value                 |
//! |-----------------------------------------------|-----------------------|
//! | `b"block_height_key"` + height (12 bytes, BE) | block hash            |
//! | block hash                                    | JSON block record     |
//! | transaction hash (UTF-8)                      | JSON result record    |
//!
//! [`NodeLedger`] resolves that layout on top of any [`KeyValueRead`] backend.
use crate::error::ScanError;

pub mod memory;
#[cfg(feature = "rocksdb")]
pub mod rocks;

pub use memory::MemoryKv;
#[cfg(feature = "rocksdb")]
pub use rocks::RocksKv;

/// Prefix of the height -> block hash index.
pub const BLOCK_HEIGHT_KEY: &[u8] = b"block_height_key";

/// Width of the big-endian height suffix.
pub const BLOCK_HEIGHT_BYTES_LEN: usize = 12;

/// Build the index key for `height`.
pub fn height_key(height: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(BLOCK_HEIGHT_KEY.len() + BLOCK_HEIGHT_BYTES_LEN);
    key.extend_from_slice(BLOCK_HEIGHT_KEY);
    // u64 fills the low 8 bytes; the top 4 are always zero.
    key.extend_from_slice(&[0u8; BLOCK_HEIGHT_BYTES_LEN - 8]);
    key.extend_from_slice(&height.to_be_bytes());
    key
}

/// Raw point reads against an embedded key-value engine.
pub trait KeyValueRead: Send + Sync {
    /// Value stored under `key`, if any.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ScanError>;
}

/// Block and transaction-result lookups the scanner needs.
pub trait ChainStore: Send + Sync {
    /// Raw JSON block record at `height`.
    ///
    /// Fails with [`ScanError::NotFound`] when no hash is indexed at that
    /// height or the hash has no record.
    fn block_by_height(&self, height: u64) -> Result<Vec<u8>, ScanError>;

    /// Raw JSON result record for `txhash`.
    fn transaction_result(&self, txhash: &str) -> Result<Vec<u8>, ScanError>;
}

impl<T: ChainStore + ?Sized> ChainStore for &T {
    fn block_by_height(&self, height: u64) -> Result<Vec<u8>, ScanError> {
        (**self).block_by_height(height)
    }

    fn transaction_result(&self, txhash: &str) -> Result<Vec<u8>, ScanError> {
        (**self).transaction_result(txhash)
    }
}

/// [`ChainStore`] over the node's key layout.
pub struct NodeLedger<K> {
    kv: K,
}

impl<K: KeyValueRead> NodeLedger<K> {
    /// Wrap an opened backend.
    pub fn new(kv: K) -> Self {
        Self { kv }
    }

    /// Block hash indexed at `height`.
    pub fn block_hash(&self, height: u64) -> Result<Vec<u8>, ScanError> {
        self.kv
            .get(&height_key(height))?
            .ok_or_else(|| ScanError::NotFound(format!("block hash at height {height}")))
    }
}

impl<K: KeyValueRead> ChainStore for NodeLedger<K> {
    fn block_by_height(&self, height: u64) -> Result<Vec<u8>, ScanError> {
        let hash = self.block_hash(height)?;
        self.kv.get(&hash)?.ok_or_else(|| {
            ScanError::NotFound(format!(
                "block record {} (height {height})",
                hex::encode(&hash)
            ))
        })
    }

    fn transaction_result(&self, txhash: &str) -> Result<Vec<u8>, ScanError> {
        self.kv
            .get(txhash.as_bytes())?
            .ok_or_else(|| ScanError::NotFound(format!("transaction result {txhash}")))
    }
}
