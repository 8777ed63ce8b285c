//! Pool Registry
//!
//! A pool is one independently administered storage backend. The registry
//! validates pool descriptors and keeps them in a [`PoolStore`]; it refuses to
//! delete a pool while catalogue entries still point at it.
//!
//! # Versions
//!
//! Each stored pool carries a `version` that starts at 1 and is bumped whenever
//! its `uri` or `options` change. Driver handles are cached against this
//! version, so a bumped version means any cached handle is stale.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::driver::DriverFactory;
use crate::error::{CatalogError, Result};
use crate::store::{CatalogueStore, PoolStore};
use crate::validation::split_uri;

/// Free-form backend options forwarded to the driver builder
pub type Options = BTreeMap<String, serde_json::Value>;

// ============================================================================
// Pool Descriptors
// ============================================================================

/// A registered storage backend
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pool {
    /// Unique pool id
    pub id: String,

    /// Backend address, including scheme
    pub uri: String,

    /// Relative placement weight; 0 retires the pool from new placements
    pub weight: u32,

    /// Queue capacity used for capacity-gated placement; 0 means unlimited
    #[serde(default)]
    pub max_capacity: u64,

    /// Optional pool group used by flavors
    #[serde(default)]
    pub group: Option<String>,

    /// Driver options
    #[serde(default)]
    pub options: Options,

    /// Configuration version, bumped on uri/options change
    #[serde(default = "initial_version")]
    pub version: u64,
}

const fn initial_version() -> u64 {
    1
}

impl Pool {
    /// Whether the pool may receive new placements
    #[must_use]
    pub fn is_placeable(&self) -> bool {
        self.weight > 0
    }

    /// Whether `usage` queues still fit under `max_capacity`
    #[must_use]
    pub fn has_room_for(&self, usage: u64) -> bool {
        self.max_capacity == 0 || usage < self.max_capacity
    }

    /// Whether the pool belongs to `group`
    #[must_use]
    pub fn in_group(&self, group: &str) -> bool {
        self.group.as_deref() == Some(group)
    }

    /// Merge a validated update into this descriptor
    ///
    /// Returns `true` when the driver configuration (`uri` or `options`)
    /// changed, in which case the version is bumped.
    pub fn apply(&mut self, update: &PoolUpdate) -> bool {
        let mut config_changed = false;

        if let Some(uri) = &update.uri {
            if *uri != self.uri {
                self.uri.clone_from(uri);
                config_changed = true;
            }
        }
        if let Some(options) = &update.options {
            if *options != self.options {
                self.options.clone_from(options);
                config_changed = true;
            }
        }
        if let Some(weight) = update.weight {
            self.weight = weight;
        }
        if let Some(max_capacity) = update.max_capacity {
            self.max_capacity = max_capacity;
        }
        if let Some(group) = &update.group {
            self.group.clone_from(group);
        }

        if config_changed {
            self.version += 1;
        }
        config_changed
    }
}

/// Caller input for [`PoolRegistry::create`]
///
/// Integer fields are signed so negative input can be reported as
/// [`CatalogError::InvalidPool`] instead of being unrepresentable.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPool {
    /// Pool id
    pub id: String,
    /// Placement weight
    pub weight: i64,
    /// Backend uri
    pub uri: String,
    /// Capacity, 0 for unlimited
    #[serde(default)]
    pub max_capacity: i64,
    /// Optional group
    #[serde(default)]
    pub group: Option<String>,
    /// Driver options
    #[serde(default)]
    pub options: Options,
}

impl NewPool {
    /// Describe a pool with no group and no options
    pub fn new(id: impl Into<String>, weight: i64, uri: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            weight,
            uri: uri.into(),
            ..Self::default()
        }
    }

    /// Set the pool group
    #[must_use]
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Set the capacity
    #[must_use]
    pub fn with_max_capacity(mut self, max_capacity: i64) -> Self {
        self.max_capacity = max_capacity;
        self
    }

    /// Add a driver option
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }
}

/// Partial update for [`PoolRegistry::update`]
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PoolPatch {
    /// New uri
    pub uri: Option<String>,
    /// New weight
    pub weight: Option<i64>,
    /// New capacity
    pub max_capacity: Option<i64>,
    /// `Some(None)` clears the group
    pub group: Option<Option<String>>,
    /// Replacement option map
    pub options: Option<Options>,
}

impl PoolPatch {
    /// Empty patch
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Change the uri
    #[must_use]
    pub fn uri(mut self, uri: impl Into<String>) -> Self {
        self.uri = Some(uri.into());
        self
    }

    /// Change the weight
    #[must_use]
    pub fn weight(mut self, weight: i64) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Change the capacity
    #[must_use]
    pub fn max_capacity(mut self, max_capacity: i64) -> Self {
        self.max_capacity = Some(max_capacity);
        self
    }

    /// Set or clear the group
    #[must_use]
    pub fn group(mut self, group: Option<String>) -> Self {
        self.group = Some(group);
        self
    }

    /// Replace the driver options
    #[must_use]
    pub fn options(mut self, options: Options) -> Self {
        self.options = Some(options);
        self
    }
}

/// A [`PoolPatch`] that passed validation, in stored types
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PoolUpdate {
    /// New uri
    pub uri: Option<String>,
    /// New weight
    pub weight: Option<u32>,
    /// New capacity
    pub max_capacity: Option<u64>,
    /// `Some(None)` clears the group
    pub group: Option<Option<String>>,
    /// Replacement option map
    pub options: Option<Options>,
}

/// Result of a pool update
#[derive(Clone, Debug, PartialEq)]
pub struct UpdatedPool {
    /// Descriptor after the update
    pub pool: Pool,
    /// Whether `uri` or `options` changed
    pub config_changed: bool,
}

// ============================================================================
// Pool Registry
// ============================================================================

/// Validating front end over a [`PoolStore`]
pub struct PoolRegistry {
    store: Arc<dyn PoolStore>,
    catalogue: Arc<dyn CatalogueStore>,
    drivers: Arc<DriverFactory>,
}

impl std::fmt::Debug for PoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolRegistry")
            .field("schemes", &self.drivers.schemes())
            .finish_non_exhaustive()
    }
}

impl PoolRegistry {
    /// Create a registry
    ///
    /// `catalogue` backs the in-use check on delete; `drivers` decides which
    /// uri schemes are accepted.
    pub fn new(
        store: Arc<dyn PoolStore>,
        catalogue: Arc<dyn CatalogueStore>,
        drivers: Arc<DriverFactory>,
    ) -> Self {
        Self {
            store,
            catalogue,
            drivers,
        }
    }

    /// Register a new pool
    ///
    /// # Errors
    ///
    /// [`CatalogError::InvalidPool`] on bad input and
    /// [`CatalogError::PoolAlreadyExists`] when the id is taken.
    pub async fn create(&self, new: NewPool) -> Result<Pool> {
        if new.id.is_empty() {
            return Err(CatalogError::InvalidPool("pool id is empty".to_string()));
        }
        self.check_uri(&new.uri)?;

        let pool = Pool {
            weight: to_weight(new.weight)?,
            max_capacity: to_capacity(new.max_capacity)?,
            id: new.id,
            uri: new.uri,
            group: new.group,
            options: new.options,
            version: initial_version(),
        };

        self.store.create_pool(pool.clone()).await?;
        info!(
            pool = %pool.id,
            weight = pool.weight,
            group = pool.group.as_deref().unwrap_or("-"),
            "Pool created"
        );
        Ok(pool)
    }

    /// Fetch a pool
    ///
    /// # Errors
    ///
    /// [`CatalogError::PoolDoesNotExist`] if unknown.
    pub async fn get(&self, id: &str) -> Result<Pool> {
        self.store
            .get_pool(id)
            .await?
            .ok_or_else(|| CatalogError::PoolDoesNotExist(id.to_string()))
    }

    /// All pools, optionally restricted to a group, sorted by id
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn list(&self, group: Option<&str>) -> Result<Vec<Pool>> {
        self.store.list_pools(group).await
    }

    /// Up to `limit` pools with id strictly after `marker`, sorted by id
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn list_page(&self, marker: Option<&str>, limit: usize) -> Result<Vec<Pool>> {
        let pools = self.store.list_pools(None).await?;
        Ok(pools
            .into_iter()
            .filter(|pool| marker.map_or(true, |m| pool.id.as_str() > m))
            .take(limit)
            .collect())
    }

    /// Whether any pool currently carries `group`
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn group_exists(&self, group: &str) -> Result<bool> {
        Ok(!self.store.list_pools(Some(group)).await?.is_empty())
    }

    /// Apply a partial update
    ///
    /// # Errors
    ///
    /// [`CatalogError::InvalidPool`] on bad input and
    /// [`CatalogError::PoolDoesNotExist`] if unknown.
    pub async fn update(&self, id: &str, patch: PoolPatch) -> Result<UpdatedPool> {
        if let Some(uri) = &patch.uri {
            self.check_uri(uri)?;
        }
        let update = PoolUpdate {
            weight: patch.weight.map(to_weight).transpose()?,
            max_capacity: patch.max_capacity.map(to_capacity).transpose()?,
            uri: patch.uri,
            group: patch.group,
            options: patch.options,
        };

        let updated = self.store.update_pool(id, &update).await?;
        info!(
            pool = %id,
            version = updated.pool.version,
            config_changed = updated.config_changed,
            "Pool updated"
        );
        Ok(updated)
    }

    /// Remove a pool that no queue is mapped to
    ///
    /// The in-use check and the delete are separate store calls; a queue
    /// registered in between is not detected.
    ///
    /// # Errors
    ///
    /// [`CatalogError::PoolInUse`] while catalogue entries reference it and
    /// [`CatalogError::PoolDoesNotExist`] if unknown.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let entries = self.catalogue.list_by_pool(id).await?;
        if !entries.is_empty() {
            return Err(CatalogError::PoolInUse {
                pool_id: id.to_string(),
                queues: entries.len(),
            });
        }

        if !self.store.delete_pool(id).await? {
            return Err(CatalogError::PoolDoesNotExist(id.to_string()));
        }
        info!(pool = %id, "Pool deleted");
        Ok(())
    }

    fn check_uri(&self, uri: &str) -> Result<()> {
        let Some((scheme, _)) = split_uri(uri) else {
            return Err(CatalogError::InvalidPool(format!(
                "uri {uri:?} is not of the form scheme://address"
            )));
        };
        if !self.drivers.supports(scheme) {
            return Err(CatalogError::InvalidPool(format!(
                "no driver registered for scheme {scheme:?}"
            )));
        }
        Ok(())
    }
}

fn to_weight(weight: i64) -> Result<u32> {
    u32::try_from(weight)
        .map_err(|_| CatalogError::InvalidPool(format!("weight {weight} is out of range")))
}

fn to_capacity(max_capacity: i64) -> Result<u64> {
    u64::try_from(max_capacity).map_err(|_| {
        CatalogError::InvalidPool(format!("max_capacity {max_capacity} is negative"))
    })
}

// ============================================================================
// Tests
// ============================================================================
