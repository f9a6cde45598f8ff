#![forbid(unsafe_code)]
#![deny(missing_docs)]
//! itx: rule-based transaction extraction from an ICON node's local ledger.
//!
//! ## What you implement
//! - [`TxSink`]: append matched rows to each target's output (CSV, database, ...).
//! - [`TargetStore`]: persist target filters and cursors, or use [`SqliteTargetStore`].
//! - [`ChainStore`]: optional; [`NodeLedger`] already reads the node's key
//!   layout from any [`KeyValueRead`] backend.
//!
//! ## What the engine does
//! - Decodes each block once per pass, whichever record format its height uses.
//! - Evaluates every target's [`Filter`] against each transaction and checks
//!   success unless the target includes failed transactions.
//! - Advances targets with different cursors in lock-step, persisting every
//!   cursor when the pass ends, is cancelled, or reaches the end of the chain.
//!
//! ## Minimal usage
//! ```rust,ignore
//! use itx::prelude::*;
//! use async_trait::async_trait;
//!
//! struct Stdout;
//! #[async_trait]
//! impl TxSink for Stdout {
//!     async fn append_transaction(&self, target: &str, row: Row) -> anyhow::Result<()> {
//!         println!("{target}: {:?}", row.fields);
//!         Ok(())
//!     }
//! }
//!
//! async fn run(config: &ScanConfig) -> anyhow::Result<()> {
//!     let ledger = NodeLedger::new(RocksKv::open_read_only(&config.ledger_path)?);
//!     let targets = SqliteTargetStore::new(&config.target_db)?;
//!     let engine = SyncManager::new(ledger, Stdout, targets).with_config(config);
//!     engine.cancel_signal().listen_for_ctrl_c();
//!     let report = engine.update(&["transfers.csv"], None).await?;
//!     println!("{} rows, {}", report.total_matches(), report.stop);
//!     Ok(())
//! }
//! ```

/// Version-aware block decoding.
pub mod block;

/// Cooperative cancellation.
pub mod cancel;

/// Read-only access to the node's key-value store.
pub mod chain;

/// Configuration loaded at startup.
pub mod config;

/// Multi-target scan orchestration.
pub mod engine;

/// Error taxonomy.
pub mod error;

/// Output sink for matched transactions.
pub mod hooks;

/// Tracing subscriber setup.
pub mod logging;

/// Filter evaluation and success checks.
pub mod matcher;

/// Progress reporting while a pass runs.
pub mod progress;

/// Persistence layer for targets (traits and SQLite implementation).
pub mod store;

/// Targets, output columns and projected rows.
pub mod target;

/// Chain tip discovery.
pub mod tip;

/// Transaction normalization.
pub mod transaction;

// Public re-exports
pub use block::{Block, BlockDecoder, BlockVersion, VersionThresholds};
pub use cancel::CancelSignal;
pub use chain::{ChainStore, KeyValueRead, MemoryKv, NodeLedger};
pub use config::ScanConfig;
pub use engine::{ScanReport, StopReason, SyncManager};
pub use error::ScanError;
pub use hooks::TxSink;
pub use matcher::Filter;
pub use progress::{LogProgress, NoProgress, ProgressReporter};
pub use store::TargetStore;
pub use target::{Column, Row, Target, TargetStatus};
pub use transaction::{Transaction, TxVersion};

#[cfg(feature = "rocksdb")]
pub use chain::RocksKv;
#[cfg(feature = "store-sqlite")]
pub use store::SqliteTargetStore;

/// Convenience prelude for end users.
pub mod prelude {
    pub use crate::{
        CancelSignal, ChainStore, Column, Filter, LogProgress, NodeLedger, Row, ScanConfig,
        ScanReport, StopReason, SyncManager, Target, TargetStore, TxSink,
    };

    #[cfg(feature = "rocksdb")]
    pub use crate::RocksKv;
    #[cfg(feature = "store-sqlite")]
    pub use crate::SqliteTargetStore;
}
