//! Driver Cache
//!
//! Constructed driver handles keyed by pool id.
//!
//! Each pool id owns a slot guarded by its own async mutex. A miss takes the
//! slot lock, re-checks, and builds while holding it, so concurrent misses for
//! one pool construct a single handle and everyone else reuses it. Slots for
//! different pools never contend.
//!
//! A cached handle is reused only while its `config_version` equals the
//! version of the current pool descriptor. Descriptors are memoized in an
//! injected [`Cache`] with a TTL, so another process's pool change is noticed
//! once the descriptor expires.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{DataDriver, DriverFactory};
use crate::cache::Cache;
use crate::error::Result;
use crate::metrics::CatalogMetrics;
use crate::pools::{Pool, PoolRegistry};

struct CachedDriver {
    config_version: u64,
    driver: Arc<dyn DataDriver>,
}

type Slot = Arc<Mutex<Option<CachedDriver>>>;

/// A driver handle together with the descriptor it was built from
#[derive(Clone, Debug)]
pub struct ResolvedDriver {
    /// Pool descriptor at resolution time
    pub pool: Pool,
    /// Shared handle
    pub driver: Arc<dyn DataDriver>,
}

/// Per-pool cache of driver handles
pub struct DriverCache {
    factory: Arc<DriverFactory>,
    pools: Arc<PoolRegistry>,
    descriptors: Arc<dyn Cache<Pool>>,
    /// Zero bypasses the descriptor cache
    descriptor_ttl: Duration,
    slots: DashMap<String, Slot>,
    metrics: Arc<CatalogMetrics>,
}

impl std::fmt::Debug for DriverCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCache")
            .field("slots", &self.slots.len())
            .field("descriptor_ttl", &self.descriptor_ttl)
            .finish_non_exhaustive()
    }
}

impl DriverCache {
    /// Create an empty cache
    pub fn new(
        factory: Arc<DriverFactory>,
        pools: Arc<PoolRegistry>,
        descriptors: Arc<dyn Cache<Pool>>,
        descriptor_ttl: Duration,
        metrics: Arc<CatalogMetrics>,
    ) -> Self {
        Self {
            factory,
            pools,
            descriptors,
            descriptor_ttl,
            slots: DashMap::new(),
            metrics,
        }
    }

    /// Return the handle for `pool_id`, building it on a miss or version change
    ///
    /// # Errors
    ///
    /// `PoolDoesNotExist` for an unknown pool and `Driver` when construction
    /// fails. A failed build leaves the slot empty.
    pub async fn get_or_create(&self, pool_id: &str) -> Result<ResolvedDriver> {
        let pool = self.descriptor(pool_id).await?;

        // Clone the slot out so no map shard lock is held across the await
        let slot: Slot = self
            .slots
            .entry(pool_id.to_string())
            .or_default()
            .value()
            .clone();
        let mut cached = slot.lock().await;

        if let Some(hit) = cached.as_ref() {
            if hit.config_version == pool.version {
                self.metrics.driver_cache_hits.inc();
                debug!(pool = %pool_id, version = pool.version, "Driver cache hit");
                return Ok(ResolvedDriver {
                    driver: Arc::clone(&hit.driver),
                    pool,
                });
            }
            debug!(
                pool = %pool_id,
                cached = hit.config_version,
                current = pool.version,
                "Cached driver is stale"
            );
        }

        let driver = self.factory.build(&pool.uri, &pool.options).await?;
        self.metrics.driver_builds.inc();
        info!(pool = %pool_id, version = pool.version, scheme = driver.scheme(), "Driver constructed");

        *cached = Some(CachedDriver {
            config_version: pool.version,
            driver: Arc::clone(&driver),
        });
        Ok(ResolvedDriver { pool, driver })
    }

    /// Evict the handle and the memoized descriptor for `pool_id`
    pub async fn invalidate(&self, pool_id: &str) {
        let evicted = self.slots.remove(pool_id).is_some();
        self.descriptors.invalidate(pool_id).await;
        if evicted {
            self.metrics.driver_invalidations.inc();
            debug!(pool = %pool_id, "Driver evicted");
        }
    }

    /// Forget the memoized descriptor but keep the handle
    pub async fn refresh(&self, pool_id: &str) {
        self.descriptors.invalidate(pool_id).await;
    }

    /// Evict every handle and descriptor
    pub async fn clear(&self) {
        self.slots.clear();
        self.descriptors.clear().await;
    }

    /// Number of pool slots, built or in construction
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot exists
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    async fn descriptor(&self, pool_id: &str) -> Result<Pool> {
        if self.descriptor_ttl.is_zero() {
            return self.pools.get(pool_id).await;
        }
        if let Some(pool) = self.descriptors.get(pool_id).await {
            return Ok(pool);
        }
        let pool = self.pools.get(pool_id).await?;
        self.descriptors
            .set(pool_id, pool.clone(), Some(self.descriptor_ttl))
            .await;
        Ok(pool)
    }
}
