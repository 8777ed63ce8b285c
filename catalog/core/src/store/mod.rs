//! Control Stores
//!
//! Persistence seams for the three kinds of control-plane records:
//!
//! | Trait | Records | Key |
//! |-------|---------|-----|
//! | [`PoolStore`] | [`Pool`] | pool id |
//! | [`FlavorStore`] | [`Flavor`] | `(project, name)` |
//! | [`CatalogueStore`] | [`CatalogueEntry`] | `(project, queue)` |
//!
//! Two implementations ship with the crate: [`MemoryStore`] keeps everything in
//! process memory, [`FileStore`] persists a JSON snapshot after each mutation.
//! Both implement all three traits, so one value can back a whole router via
//! [`ControlStores::shared`].

mod file;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::flavors::{Flavor, FlavorUpdate};
use crate::pools::{Pool, PoolUpdate, UpdatedPool};

pub use file::FileStore;
pub use memory::MemoryStore;

// ============================================================================
// Records
// ============================================================================

/// One `(project, queue) -> pool` mapping
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogueEntry {
    /// Owning project
    pub project: String,
    /// Queue name
    pub queue: String,
    /// Pool holding the queue's data
    pub pool_id: String,
}

// ============================================================================
// Store Traits
// ============================================================================

/// Storage for pool descriptors
#[async_trait]
pub trait PoolStore: Send + Sync {
    /// Insert a new pool; fails `PoolAlreadyExists` if the id is taken
    async fn create_pool(&self, pool: Pool) -> Result<()>;

    /// Fetch a pool by id
    async fn get_pool(&self, id: &str) -> Result<Option<Pool>>;

    /// Pools sorted by id, optionally restricted to a group
    async fn list_pools(&self, group: Option<&str>) -> Result<Vec<Pool>>;

    /// Merge an update atomically; fails `PoolDoesNotExist`
    async fn update_pool(&self, id: &str, update: &PoolUpdate) -> Result<UpdatedPool>;

    /// Remove a pool, returning whether it existed
    async fn delete_pool(&self, id: &str) -> Result<bool>;
}

/// Storage for flavors
#[async_trait]
pub trait FlavorStore: Send + Sync {
    /// Insert a new flavor; fails `FlavorAlreadyExists` within the project
    async fn create_flavor(&self, flavor: Flavor) -> Result<()>;

    /// Fetch a flavor
    async fn get_flavor(&self, name: &str, project: &str) -> Result<Option<Flavor>>;

    /// A project's flavors sorted by name
    async fn list_flavors(&self, project: &str) -> Result<Vec<Flavor>>;

    /// Merge an update atomically; fails `FlavorDoesNotExist`
    async fn update_flavor(&self, name: &str, project: &str, update: &FlavorUpdate)
        -> Result<Flavor>;

    /// Remove a flavor, returning whether it existed
    async fn delete_flavor(&self, name: &str, project: &str) -> Result<bool>;
}

/// The `(project, queue) -> pool` mapping
///
/// This is the source of truth for placement. Writes to one key are visible to
/// the next read of that key.
#[async_trait]
pub trait CatalogueStore: Send + Sync {
    /// Insert or replace the mapping for `(project, queue)`
    async fn insert(&self, project: &str, queue: &str, pool_id: &str) -> Result<()>;

    /// Map `(project, queue)` to `pool_id` only if it is unmapped
    ///
    /// Returns the pool id already stored, or `None` when this call created
    /// the mapping. The check and the write are one atomic step.
    async fn insert_if_absent(
        &self,
        project: &str,
        queue: &str,
        pool_id: &str,
    ) -> Result<Option<String>>;

    /// Fetch the mapping; fails `CatalogueEntryDoesNotExist`
    async fn get(&self, project: &str, queue: &str) -> Result<CatalogueEntry>;

    /// Remove the mapping if present
    async fn delete(&self, project: &str, queue: &str) -> Result<()>;

    /// Every entry pointing at `pool_id`, sorted by `(project, queue)`
    async fn list_by_pool(&self, pool_id: &str) -> Result<Vec<CatalogueEntry>>;

    /// A project's entries sorted by queue
    async fn list(&self, project: &str) -> Result<Vec<CatalogueEntry>>;

    /// Whether `(project, queue)` is mapped
    async fn exists(&self, project: &str, queue: &str) -> Result<bool>;
}

// ============================================================================
// Store Bundle
// ============================================================================

/// The three stores a router is assembled from
#[derive(Clone)]
pub struct ControlStores {
    /// Pool descriptors
    pub pools: Arc<dyn PoolStore>,
    /// Flavors
    pub flavors: Arc<dyn FlavorStore>,
    /// Queue mappings
    pub catalogue: Arc<dyn CatalogueStore>,
}

impl ControlStores {
    /// Back all three stores with one value
    pub fn shared<S>(store: Arc<S>) -> Self
    where
        S: PoolStore + FlavorStore + CatalogueStore + 'static,
    {
        Self {
            pools: store.clone(),
            flavors: store.clone(),
            catalogue: store,
        }
    }

    /// Fresh process-local stores
    #[must_use]
    pub fn in_memory() -> Self {
        Self::shared(Arc::new(MemoryStore::new()))
    }
}

impl std::fmt::Debug for ControlStores {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ControlStores").finish_non_exhaustive()
    }
}
