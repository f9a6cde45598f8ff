//! On-disk backend: the node's store opened read-only.
//!
//! RocksDB reads LevelDB-format tables, so the node's database directory can
//! be opened directly without conversion.
use std::path::Path;

use rocksdb::{Options, DB};
use tracing::info;

use super::KeyValueRead;
use crate::error::ScanError;

/// Read-only handle on the node's store directory.
pub struct RocksKv {
    db: DB,
}

impl RocksKv {
    /// Open `path` read-only. Fails if the directory holds no database.
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, ScanError> {
        let path = path.as_ref();
        let mut opts = Options::default();
        opts.create_if_missing(false);

        let db = DB::open_for_read_only(&opts, path, false).map_err(|e| {
            ScanError::Backend(format!("open ledger at {}: {e}", path.display()))
        })?;
        info!(path = %path.display(), "opened ledger store read-only");
        Ok(Self { db })
    }
}

impl KeyValueRead for RocksKv {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, ScanError> {
        self.db
            .get(key)
            .map_err(|e| ScanError::Backend(format!("get {}: {e}", hex::encode(key))))
    }
}
