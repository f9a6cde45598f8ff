//! Persistence of target configuration and progress cursors.
use async_trait::async_trait;

use crate::target::Target;

/// Keyed by target name. A saved target must load back identical.
#[async_trait]
pub trait TargetStore: Send + Sync {
    /// Target stored under `name`, if any.
    async fn load_target(&self, name: &str) -> anyhow::Result<Option<Target>>;

    /// Insert or replace `target`.
    async fn save_target(&self, target: &Target) -> anyhow::Result<()>;

    /// Delete `name`. Returns whether it existed.
    async fn remove_target(&self, name: &str) -> anyhow::Result<bool>;

    /// Names of all stored targets, sorted.
    async fn target_names(&self) -> anyhow::Result<Vec<String>>;
}

#[cfg(feature = "store-sqlite")]
pub mod sqlite_store;
#[cfg(feature = "store-sqlite")]
pub use sqlite_store::SqliteTargetStore;
