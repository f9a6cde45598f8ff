//! Output glue: where matched transactions go.
use async_trait::async_trait;

use crate::target::Row;

/// Durable output for matched transactions.
///
/// Rows arrive in scan order (height, then on-chain position). An
/// implementation must not reorder or drop them.
#[async_trait]
pub trait TxSink: Send + Sync {
    /// Append one projected transaction to `target`'s output.
    async fn append_transaction(&self, target: &str, row: Row) -> anyhow::Result<()>;

    /// Called once after a pass, before cursors are persisted.
    async fn flush(&self) -> anyhow::Result<()> {
        Ok(())
    }
}
