//! In-memory key-value backend (fixtures, embedding, tests).
use std::collections::BTreeMap;

use serde_json::Value;

use super::{height_key, KeyValueRead};
use crate::error::ScanError;

/// Ordered map standing in for the node's on-disk store.
#[derive(Debug, Default, Clone)]
pub struct MemoryKv {
    entries: BTreeMap<Vec<u8>, Vec<u8>>,
}

impl MemoryKv {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw insert.
    pub fn put(&mut self, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Index `record` at `height` under `block_hash`, the way the node does.
    pub fn put_block(&mut self, height: u64, block_hash: &[u8], record: &Value) {
        self.put(height_key(height), block_hash.to_vec());
        self.put(block_hash.to_vec(), record.to_string().into_bytes());
    }

    /// Store a transaction result record under its hash.
    pub fn put_tx_result(&mut self, txhash: &str, record: &Value) {
        self.put(txhash.as_bytes().to_vec(), record.to_string().into_bytes());
    }
}

impl KeyValueRead for MemoryKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ScanError> {
        Ok(self.entries.get(key).cloned())
    }
}
