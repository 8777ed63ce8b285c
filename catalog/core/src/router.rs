//! Catalogue Router
//!
//! The façade API-serving workers talk to. It answers "which pool owns this
//! queue" and keeps the `(project, queue) -> pool` mapping up to date.
//!
//! # Architecture
//!
//! ```text
//! lookup ──► route cache ──► CatalogueStore ──► DriverCache ──► StorageProxy
//!                                   ▲
//! register ──► FlavorRegistry ──► PoolSelector ──┘
//! ```
//!
//! The router owns no persistent state. Its caches (routes, descriptors,
//! driver handles) are process-local and rebuildable from the stores.
//!
//! A cached route is only kept if no write to its key landed while the
//! catalogue read that produced it was in flight. Writers bump a per-key
//! epoch before dropping the cached route; readers compare epochs around
//! the cache write.
//!
//! # Example
//!
//! ```no_run
//! use catalog_core::{CatalogConfig, CatalogRouter, NewPool};
//!
//! # async fn demo() -> catalog_core::Result<()> {
//! let router = CatalogRouter::builder(CatalogConfig::default())
//!     .build()
//!     .expect("valid config");
//!
//! router.create_pool(NewPool::new("pool-1", 100, "memory://a")).await?;
//! let proxy = router.register("orders", "tenant-a", None).await?;
//! assert_eq!(proxy.pool_id(), "pool-1");
//! # Ok(())
//! # }
//! ```

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use tracing::{debug, info, warn};

use crate::cache::{Cache, MemoryCache};
use crate::config::{
    AutoRoutePolicy, CatalogConfig, ConfigError, RouterConfig, ValidationConfig,
};
use crate::driver::{DriverCache, DriverFactory};
use crate::error::{CatalogError, Result};
use crate::flavors::{Flavor, FlavorRegistry, FlavorUpdate};
use crate::metrics::{CatalogMetrics, MetricsSnapshot};
use crate::pools::{NewPool, Pool, PoolPatch, PoolRegistry};
use crate::proxy::StorageProxy;
use crate::selector::{PlacementTarget, PoolSelector, UsageSource, UsageTracker};
use crate::store::{CatalogueEntry, CatalogueStore, ControlStores};
use crate::validation::{validate_project, validate_queue_name};

/// Number of epoch counters route keys are striped over
const ROUTE_EPOCH_STRIPES: u64 = 64;

/// Cached routes between sweeps of expired entries
const ROUTE_SWEEP_INTERVAL: u64 = 1024;

// ============================================================================
// Builder
// ============================================================================

/// Assembles a [`CatalogRouter`]; every collaborator has an in-process default
pub struct RouterBuilder {
    config: CatalogConfig,
    stores: Option<ControlStores>,
    factory: Option<Arc<DriverFactory>>,
    usage: Option<Arc<dyn UsageSource>>,
    route_cache: Option<Arc<dyn Cache<String>>>,
    descriptor_cache: Option<Arc<dyn Cache<Pool>>>,
    rng: Option<Box<dyn RngCore + Send>>,
}

impl RouterBuilder {
    /// Control stores (default: fresh in-memory stores)
    #[must_use]
    pub fn stores(mut self, stores: ControlStores) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Driver factory (default: `memory` and `faulty` schemes)
    #[must_use]
    pub fn driver_factory(mut self, factory: Arc<DriverFactory>) -> Self {
        self.factory = Some(factory);
        self
    }

    /// Usage source for capacity accounting (default: empty [`UsageTracker`])
    #[must_use]
    pub fn usage_source(mut self, usage: Arc<dyn UsageSource>) -> Self {
        self.usage = Some(usage);
        self
    }

    /// Backend for route memoization
    #[must_use]
    pub fn route_cache(mut self, cache: Arc<dyn Cache<String>>) -> Self {
        self.route_cache = Some(cache);
        self
    }

    /// Backend for pool descriptor memoization
    #[must_use]
    pub fn descriptor_cache(mut self, cache: Arc<dyn Cache<Pool>>) -> Self {
        self.descriptor_cache = Some(cache);
        self
    }

    /// Random source for placement (default: entropy-seeded `StdRng`)
    #[must_use]
    pub fn rng(mut self, rng: impl RngCore + Send + 'static) -> Self {
        self.rng = Some(Box::new(rng));
        self
    }

    /// Validate the configuration and wire everything together
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an inconsistent config.
    pub fn build(self) -> std::result::Result<CatalogRouter, ConfigError> {
        self.config.validate()?;

        let stores = self.stores.unwrap_or_else(ControlStores::in_memory);
        let factory = self
            .factory
            .unwrap_or_else(|| Arc::new(DriverFactory::builder().with_builtin().build()));
        let metrics = Arc::new(CatalogMetrics::new());

        let pools = Arc::new(PoolRegistry::new(
            stores.pools,
            Arc::clone(&stores.catalogue),
            Arc::clone(&factory),
        ));
        let flavors = FlavorRegistry::new(stores.flavors, Arc::clone(&pools));
        let drivers = DriverCache::new(
            factory,
            Arc::clone(&pools),
            self.descriptor_cache
                .unwrap_or_else(|| Arc::new(MemoryCache::<Pool>::new())),
            self.config.cache.descriptor_ttl,
            Arc::clone(&metrics),
        );

        info!(
            virtual_pool = self.config.router.enable_virtual_pool,
            capacity_accounting = self.config.selection.capacity_accounting,
            route_ttl_ms = u64::try_from(self.config.cache.route_ttl.as_millis()).unwrap_or(u64::MAX),
            "Catalogue router ready"
        );

        Ok(CatalogRouter {
            selector: PoolSelector::new(&self.config.selection),
            route_ttl: self.config.cache.route_ttl,
            router: self.config.router,
            validation: self.config.validation,
            pools,
            flavors,
            catalogue: stores.catalogue,
            drivers,
            routes: self
                .route_cache
                .unwrap_or_else(|| Arc::new(MemoryCache::<String>::new())),
            epochs: RouteEpochs::new(),
            routes_cached: AtomicU64::new(0),
            usage: self
                .usage
                .unwrap_or_else(|| Arc::new(UsageTracker::new())),
            rng: Mutex::new(
                self.rng
                    .unwrap_or_else(|| Box::new(StdRng::from_entropy())),
            ),
            metrics,
        })
    }
}

// ============================================================================
// Route Epochs
// ============================================================================

/// Write generations for route keys, striped by key hash
///
/// Two keys sharing a stripe only cost each other a cache fill.
#[derive(Debug)]
struct RouteEpochs {
    stripes: Box<[AtomicU64]>,
}

impl RouteEpochs {
    fn new() -> Self {
        Self {
            stripes: (0..ROUTE_EPOCH_STRIPES).map(|_| AtomicU64::new(0)).collect(),
        }
    }

    fn slot(&self, key: &str) -> &AtomicU64 {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let idx = usize::try_from(hasher.finish() % ROUTE_EPOCH_STRIPES).unwrap_or_default();
        &self.stripes[idx]
    }

    fn current(&self, key: &str) -> u64 {
        self.slot(key).load(Ordering::SeqCst)
    }

    fn bump(&self, key: &str) {
        self.slot(key).fetch_add(1, Ordering::SeqCst);
    }
}

/// How [`CatalogRouter::place`] writes the mapping
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Placement {
    /// Replace any existing mapping
    Upsert,
    /// Keep a mapping someone else wrote first
    IfAbsent,
}

// ============================================================================
// Router
// ============================================================================

/// Catalogue façade: lookup, register, deregister and pool/flavor admin
///
/// `Send + Sync`; share it as `Arc<CatalogRouter>`.
pub struct CatalogRouter {
    router: RouterConfig,
    validation: ValidationConfig,
    route_ttl: std::time::Duration,
    pools: Arc<PoolRegistry>,
    flavors: FlavorRegistry,
    catalogue: Arc<dyn CatalogueStore>,
    selector: PoolSelector,
    drivers: DriverCache,
    /// `(project, queue) -> pool id`
    routes: Arc<dyn Cache<String>>,
    epochs: RouteEpochs,
    routes_cached: AtomicU64,
    usage: Arc<dyn UsageSource>,
    rng: Mutex<Box<dyn RngCore + Send>>,
    metrics: Arc<CatalogMetrics>,
}

impl std::fmt::Debug for CatalogRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogRouter")
            .field("router", &self.router)
            .field("drivers", &self.drivers)
            .finish_non_exhaustive()
    }
}

impl CatalogRouter {
    /// Start building a router from `config`
    #[must_use]
    pub fn builder(config: CatalogConfig) -> RouterBuilder {
        RouterBuilder {
            config,
            stores: None,
            factory: None,
            usage: None,
            route_cache: None,
            descriptor_cache: None,
            rng: None,
        }
    }

    // ------------------------------------------------------------------------
    // Queue routing
    // ------------------------------------------------------------------------

    /// Find the pool that owns `(project, queue)`
    ///
    /// Returns `None` for an unmapped queue unless virtual pooling is enabled,
    /// in which case the queue is registered on the spot. Concurrent lookups
    /// of the same unmapped queue all end up bound to the pool that was
    /// stored first.
    ///
    /// # Errors
    ///
    /// Store and driver faults; under virtual pooling also the errors of
    /// [`CatalogRouter::register`].
    pub async fn lookup(&self, queue: &str, project: &str) -> Result<Option<StorageProxy>> {
        let started = Instant::now();
        self.metrics.lookups.inc();

        let Some(pool_id) = self.route(project, queue).await? else {
            self.metrics.lookup_misses.inc();
            if !self.router.enable_virtual_pool {
                debug!(queue = %queue, project = %project, "Queue not registered");
                return Ok(None);
            }

            let target = self.auto_route_target();
            warn!(queue = %queue, project = %project, target = %target, "Auto-routing unregistered queue");
            self.metrics.auto_routes.inc();
            let proxy = self.place(queue, project, target, Placement::IfAbsent).await?;
            self.metrics.lookup_latency.record_duration(started.elapsed());
            return Ok(Some(proxy));
        };

        let resolved = self.drivers.get_or_create(&pool_id).await?;
        self.metrics.lookup_latency.record_duration(started.elapsed());
        debug!(queue = %queue, project = %project, pool = %pool_id, "Lookup resolved");
        Ok(Some(StorageProxy::new(queue, project, resolved)))
    }

    /// Place `(project, queue)` on a pool and record the mapping
    ///
    /// With a flavor, the pool is drawn from the flavor's group. Without one,
    /// the configured default pool, else the default group, else any pool.
    /// Re-registering a mapped queue repoints it; no data moves.
    ///
    /// # Errors
    ///
    /// `InvalidQueueName`/`InvalidProject` on bad names, `FlavorDoesNotExist`
    /// for an unknown flavor, `NoPoolAvailable` when nothing is eligible, plus
    /// store and driver faults. On error the catalogue is left untouched.
    pub async fn register(
        &self,
        queue: &str,
        project: &str,
        flavor: Option<&str>,
    ) -> Result<StorageProxy> {
        let target = match flavor {
            Some(name) => PlacementTarget::Group(self.flavors.get(name, project).await?.pool_group),
            None => self.default_target(),
        };
        self.place(queue, project, target, Placement::Upsert).await
    }

    /// Remove the mapping for `(project, queue)`; unmapped queues are ignored
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn deregister(&self, queue: &str, project: &str) -> Result<()> {
        self.catalogue.delete(project, queue).await?;
        self.forget_route(project, queue).await;
        self.metrics.deregistrations.inc();
        info!(queue = %queue, project = %project, "Queue deregistered");
        Ok(())
    }

    /// A project's catalogue entries, sorted by queue
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn entries(&self, project: &str) -> Result<Vec<CatalogueEntry>> {
        self.catalogue.list(project).await
    }

    // ------------------------------------------------------------------------
    // Pool administration
    // ------------------------------------------------------------------------

    /// See [`PoolRegistry::create`]
    ///
    /// # Errors
    ///
    /// As [`PoolRegistry::create`].
    pub async fn create_pool(&self, pool: NewPool) -> Result<Pool> {
        self.pools.create(pool).await
    }

    /// See [`PoolRegistry::get`]
    ///
    /// # Errors
    ///
    /// As [`PoolRegistry::get`].
    pub async fn get_pool(&self, id: &str) -> Result<Pool> {
        self.pools.get(id).await
    }

    /// See [`PoolRegistry::list`]
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn list_pools(&self, group: Option<&str>) -> Result<Vec<Pool>> {
        self.pools.list(group).await
    }

    /// See [`PoolRegistry::list_page`]
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn list_pools_page(&self, marker: Option<&str>, limit: usize) -> Result<Vec<Pool>> {
        self.pools.list_page(marker, limit).await
    }

    /// Update a pool and drop whatever cached state it makes stale
    ///
    /// A uri/options change evicts the driver handle; any other change only
    /// drops the memoized descriptor.
    ///
    /// # Errors
    ///
    /// As [`PoolRegistry::update`].
    pub async fn update_pool(&self, id: &str, patch: PoolPatch) -> Result<Pool> {
        let updated = self.pools.update(id, patch).await?;
        if updated.config_changed {
            self.drivers.invalidate(id).await;
        } else {
            self.drivers.refresh(id).await;
        }
        Ok(updated.pool)
    }

    /// Delete an unused pool and evict its driver
    ///
    /// # Errors
    ///
    /// As [`PoolRegistry::delete`].
    pub async fn delete_pool(&self, id: &str) -> Result<()> {
        self.pools.delete(id).await?;
        self.drivers.invalidate(id).await;
        Ok(())
    }

    /// Drop the cached driver for a pool without changing the pool
    pub async fn evict_driver(&self, id: &str) {
        self.drivers.invalidate(id).await;
    }

    // ------------------------------------------------------------------------
    // Flavor administration
    // ------------------------------------------------------------------------

    /// See [`FlavorRegistry::create`]
    ///
    /// # Errors
    ///
    /// As [`FlavorRegistry::create`].
    pub async fn create_flavor(&self, flavor: Flavor) -> Result<Flavor> {
        self.flavors.create(flavor).await
    }

    /// See [`FlavorRegistry::get`]
    ///
    /// # Errors
    ///
    /// As [`FlavorRegistry::get`].
    pub async fn get_flavor(&self, name: &str, project: &str) -> Result<Flavor> {
        self.flavors.get(name, project).await
    }

    /// See [`FlavorRegistry::list`]
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn list_flavors(&self, project: &str) -> Result<Vec<Flavor>> {
        self.flavors.list(project).await
    }

    /// See [`FlavorRegistry::update`]
    ///
    /// # Errors
    ///
    /// As [`FlavorRegistry::update`].
    pub async fn update_flavor(
        &self,
        name: &str,
        project: &str,
        update: FlavorUpdate,
    ) -> Result<Flavor> {
        self.flavors.update(name, project, update).await
    }

    /// See [`FlavorRegistry::delete`]
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn delete_flavor(&self, name: &str, project: &str) -> Result<()> {
        self.flavors.delete(name, project).await
    }

    // ------------------------------------------------------------------------
    // Introspection
    // ------------------------------------------------------------------------

    /// Routing configuration in effect
    #[must_use]
    pub fn config(&self) -> &RouterConfig {
        &self.router
    }

    /// Current counter values
    #[must_use]
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    // ------------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------------

    fn check_names(&self, queue: &str, project: &str) -> Result<()> {
        validate_queue_name(queue, &self.validation)?;
        validate_project(project, &self.validation)
    }

    fn default_target(&self) -> PlacementTarget {
        if let Some(pool) = &self.router.default_pool {
            PlacementTarget::Pool(pool.clone())
        } else if let Some(group) = &self.router.default_pool_group {
            PlacementTarget::Group(group.clone())
        } else {
            PlacementTarget::Any
        }
    }

    fn auto_route_target(&self) -> PlacementTarget {
        match &self.router.auto_route {
            AutoRoutePolicy::DefaultPlacement => self.default_target(),
            AutoRoutePolicy::FixedPool(pool) => PlacementTarget::Pool(pool.clone()),
        }
    }

    /// Select, resolve the driver, then write the mapping
    ///
    /// With [`Placement::IfAbsent`] a mapping written concurrently by another
    /// caller wins, and the proxy is bound to that pool instead.
    async fn place(
        &self,
        queue: &str,
        project: &str,
        target: PlacementTarget,
        placement: Placement,
    ) -> Result<StorageProxy> {
        self.check_names(queue, project)?;

        let pool = self.select(&target).await?;
        let resolved = self.drivers.get_or_create(&pool.id).await?;

        match placement {
            Placement::Upsert => self.catalogue.insert(project, queue, &pool.id).await?,
            Placement::IfAbsent => {
                if let Some(stored) = self
                    .catalogue
                    .insert_if_absent(project, queue, &pool.id)
                    .await?
                {
                    debug!(queue = %queue, project = %project, pool = %stored, "Queue placed concurrently");
                    let resolved = self.drivers.get_or_create(&stored).await?;
                    return Ok(StorageProxy::new(queue, project, resolved));
                }
            }
        }
        self.forget_route(project, queue).await;
        self.metrics.registrations.inc();
        info!(queue = %queue, project = %project, pool = %pool.id, target = %target, "Queue registered");

        Ok(StorageProxy::new(queue, project, resolved))
    }

    async fn select(&self, target: &PlacementTarget) -> Result<Pool> {
        let pools = match target {
            PlacementTarget::Any => self.pools.list(None).await?,
            PlacementTarget::Group(group) => self.pools.list(Some(group)).await?,
            PlacementTarget::Pool(id) => match self.pools.get(id).await {
                Ok(pool) => vec![pool],
                Err(CatalogError::PoolDoesNotExist(_)) => Vec::new(),
                Err(e) => return Err(e),
            },
        };

        let chosen = {
            let mut rng = self.rng.lock();
            self.selector
                .select(target, &pools, self.usage.as_ref(), &mut **rng)
                .cloned()
        };

        chosen.ok_or_else(|| {
            warn!(target = %target, candidates = pools.len(), "No pool available");
            CatalogError::NoPoolAvailable(target.to_string())
        })
    }

    async fn route(&self, project: &str, queue: &str) -> Result<Option<String>> {
        let key = route_key(project, queue);
        let caching = !self.route_ttl.is_zero();
        if caching {
            if let Some(pool_id) = self.routes.get(&key).await {
                self.metrics.route_cache_hits.inc();
                return Ok(Some(pool_id));
            }
        }

        let epoch = self.epochs.current(&key);
        match self.catalogue.get(project, queue).await {
            Ok(entry) => {
                if caching {
                    self.remember_route(&key, epoch, &entry.pool_id).await;
                }
                Ok(Some(entry.pool_id))
            }
            Err(CatalogError::CatalogueEntryDoesNotExist { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Cache a route read at `epoch`, backing it out if a write overtook it
    async fn remember_route(&self, key: &str, epoch: u64, pool_id: &str) {
        if self.epochs.current(key) != epoch {
            return;
        }
        self.routes
            .set(key, pool_id.to_string(), Some(self.route_ttl))
            .await;
        if self.epochs.current(key) != epoch {
            self.routes.invalidate(key).await;
        }

        if (self.routes_cached.fetch_add(1, Ordering::Relaxed) + 1) % ROUTE_SWEEP_INTERVAL == 0 {
            let purged = self.routes.purge_expired().await;
            debug!(purged, "Swept expired routes");
        }
    }

    /// Bump the key's epoch, then drop its cached route
    async fn forget_route(&self, project: &str, queue: &str) {
        let key = route_key(project, queue);
        self.epochs.bump(&key);
        self.routes.invalidate(&key).await;
    }
}

/// Length-prefixed so arbitrary project ids cannot collide
fn route_key(project: &str, queue: &str) -> String {
    format!("{}:{project}:{queue}", project.len())
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::store::MemoryStore;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicUsize};
    use std::time::Duration;
    use tokio::sync::{Barrier, Notify};

    fn router(config: CatalogConfig) -> CatalogRouter {
        CatalogRouter::builder(config)
            .rng(StdRng::seed_from_u64(3))
            .build()
            .unwrap()
    }

    /// Catalogue whose reads can be parked after they have read
    #[derive(Default)]
    struct GatedCatalogue {
        inner: MemoryStore,
        /// Park the next `get` until `release` is notified
        hold_next_read: AtomicBool,
        read_parked: Notify,
        release: Notify,
        /// Every `get` waits here once it has read
        rendezvous: Option<Barrier>,
    }

    #[async_trait]
    impl CatalogueStore for GatedCatalogue {
        async fn insert(&self, project: &str, queue: &str, pool_id: &str) -> Result<()> {
            self.inner.insert(project, queue, pool_id).await
        }

        async fn insert_if_absent(
            &self,
            project: &str,
            queue: &str,
            pool_id: &str,
        ) -> Result<Option<String>> {
            self.inner.insert_if_absent(project, queue, pool_id).await
        }

        async fn get(&self, project: &str, queue: &str) -> Result<CatalogueEntry> {
            let entry = self.inner.get(project, queue).await;
            if self.hold_next_read.swap(false, Ordering::SeqCst) {
                self.read_parked.notify_one();
                self.release.notified().await;
            }
            if let Some(barrier) = &self.rendezvous {
                barrier.wait().await;
            }
            entry
        }

        async fn delete(&self, project: &str, queue: &str) -> Result<()> {
            self.inner.delete(project, queue).await
        }

        async fn list_by_pool(&self, pool_id: &str) -> Result<Vec<CatalogueEntry>> {
            self.inner.list_by_pool(pool_id).await
        }

        async fn list(&self, project: &str) -> Result<Vec<CatalogueEntry>> {
            self.inner.list(project).await
        }

        async fn exists(&self, project: &str, queue: &str) -> Result<bool> {
            self.inner.exists(project, queue).await
        }
    }

    fn gated_router(config: CatalogConfig, catalogue: Arc<GatedCatalogue>) -> CatalogRouter {
        let control = Arc::new(MemoryStore::new());
        let stores = ControlStores {
            pools: control.clone(),
            flavors: control,
            catalogue,
        };
        CatalogRouter::builder(config)
            .stores(stores)
            .rng(StdRng::seed_from_u64(5))
            .build()
            .unwrap()
    }

    /// Route cache that counts sweeps
    #[derive(Default)]
    struct SweepCounting {
        inner: MemoryCache<String>,
        sweeps: AtomicUsize,
    }

    #[async_trait]
    impl Cache<String> for SweepCounting {
        async fn get(&self, key: &str) -> Option<String> {
            self.inner.get(key).await
        }

        async fn set(&self, key: &str, value: String, ttl: Option<Duration>) {
            self.inner.set(key, value, ttl).await;
        }

        async fn invalidate(&self, key: &str) {
            self.inner.invalidate(key).await;
        }

        async fn clear(&self) {
            self.inner.clear().await;
        }

        async fn purge_expired(&self) -> usize {
            self.sweeps.fetch_add(1, Ordering::SeqCst);
            self.inner.purge_expired().await
        }
    }

    #[test]
    fn test_route_key_is_unambiguous() {
        assert_ne!(route_key("a:b", "c"), route_key("a", "b:c"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = CatalogConfig::default().with_auto_route(AutoRoutePolicy::FixedPool(String::new()));
        assert!(CatalogRouter::builder(config).build().is_err());
    }

    #[tokio::test]
    async fn test_register_validates_names() {
        let router = router(CatalogConfig::default());
        router
            .create_pool(NewPool::new("p1", 1, "memory://a"))
            .await
            .unwrap();

        let err = router.register("bad name", "proj", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQueueName);

        let err = router.register("q", "", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidProject);
        assert!(router.entries("proj").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_default_pool_takes_precedence() {
        let config = CatalogConfig::default()
            .with_default_pool("p2")
            .with_default_pool_group("g1");
        let router = router(config);
        router
            .create_pool(NewPool::new("p1", 100, "memory://a").with_group("g1"))
            .await
            .unwrap();
        router
            .create_pool(NewPool::new("p2", 1, "memory://b"))
            .await
            .unwrap();

        for i in 0..10 {
            let proxy = router.register(&format!("q{i}"), "proj", None).await.unwrap();
            assert_eq!(proxy.pool_id(), "p2");
        }
    }

    #[tokio::test]
    async fn test_fixed_pool_auto_route() {
        let config = CatalogConfig::default()
            .with_virtual_pool(true)
            .with_auto_route(AutoRoutePolicy::FixedPool("fallback".to_string()));
        let router = router(config);
        router
            .create_pool(NewPool::new("main", 100, "memory://a"))
            .await
            .unwrap();
        router
            .create_pool(NewPool::new("fallback", 1, "memory://b"))
            .await
            .unwrap();

        let proxy = router.lookup("q", "proj").await.unwrap().unwrap();
        assert_eq!(proxy.pool_id(), "fallback");

        let snapshot = router.metrics();
        assert_eq!(snapshot.auto_routes, 1);
        assert_eq!(snapshot.registrations, 1);
    }

    #[tokio::test]
    async fn test_route_cache_is_invalidated_on_reregister() {
        let router = router(CatalogConfig::default().with_default_pool("p1"));
        router
            .create_pool(NewPool::new("p1", 1, "memory://a"))
            .await
            .unwrap();
        router
            .create_pool(NewPool::new("p2", 1, "memory://b"))
            .await
            .unwrap();

        router.register("q", "proj", None).await.unwrap();
        // Warm the route cache
        router.lookup("q", "proj").await.unwrap();
        router.lookup("q", "proj").await.unwrap();
        assert_eq!(router.metrics().route_cache_hits, 1);

        router
            .update_pool("p1", PoolPatch::new().weight(0))
            .await
            .unwrap();
        let err = router.register("q", "proj", None).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NoPoolAvailable);

        router.deregister("q", "proj").await.unwrap();
        assert!(router.lookup("q", "proj").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_overtaken_by_deregister_does_not_cache_route() {
        let catalogue = Arc::new(GatedCatalogue::default());
        let router = Arc::new(gated_router(CatalogConfig::default(), Arc::clone(&catalogue)));
        router
            .create_pool(NewPool::new("p1", 1, "memory://a"))
            .await
            .unwrap();
        router.register("q", "proj", None).await.unwrap();

        catalogue.hold_next_read.store(true, Ordering::SeqCst);
        let in_flight = tokio::spawn({
            let router = Arc::clone(&router);
            async move { router.lookup("q", "proj").await }
        });
        catalogue.read_parked.notified().await;

        router.deregister("q", "proj").await.unwrap();
        catalogue.release.notify_one();

        // The overtaken lookup may still answer with what it read
        let earlier = in_flight.await.unwrap().unwrap();
        assert_eq!(earlier.map(|p| p.pool_id().to_string()), Some("p1".to_string()));

        assert!(router.lookup("q", "proj").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_overtaken_by_reregister_does_not_cache_old_pool() {
        let catalogue = Arc::new(GatedCatalogue::default());
        let router = Arc::new(gated_router(CatalogConfig::default(), Arc::clone(&catalogue)));
        router
            .create_pool(NewPool::new("p1", 1, "memory://a"))
            .await
            .unwrap();
        router.register("q", "proj", None).await.unwrap();

        catalogue.hold_next_read.store(true, Ordering::SeqCst);
        let in_flight = tokio::spawn({
            let router = Arc::clone(&router);
            async move { router.lookup("q", "proj").await }
        });
        catalogue.read_parked.notified().await;

        router
            .update_pool("p1", PoolPatch::new().weight(0))
            .await
            .unwrap();
        router
            .create_pool(NewPool::new("p2", 1, "memory://b"))
            .await
            .unwrap();
        router.register("q", "proj", None).await.unwrap();
        catalogue.release.notify_one();
        in_flight.await.unwrap().unwrap();

        let proxy = router.lookup("q", "proj").await.unwrap().unwrap();
        assert_eq!(proxy.pool_id(), "p2");
    }

    #[tokio::test]
    async fn test_concurrent_auto_routes_agree_on_one_pool() {
        let catalogue = Arc::new(GatedCatalogue {
            rendezvous: Some(Barrier::new(2)),
            ..GatedCatalogue::default()
        });
        let router = gated_router(
            CatalogConfig::default().with_virtual_pool(true),
            Arc::clone(&catalogue),
        );
        for id in ["p1", "p2"] {
            router
                .create_pool(NewPool::new(id, 1, format!("memory://{id}")))
                .await
                .unwrap();
        }

        for i in 0..20 {
            let queue = format!("q{i}");
            // Both lookups miss before either places the queue
            let (first, second) =
                tokio::join!(router.lookup(&queue, "proj"), router.lookup(&queue, "proj"));
            let first = first.unwrap().unwrap();
            let second = second.unwrap().unwrap();

            let stored = catalogue.inner.get("proj", &queue).await.unwrap();
            assert_eq!(first.pool_id(), stored.pool_id, "queue {queue}");
            assert_eq!(second.pool_id(), stored.pool_id, "queue {queue}");
        }

        let snapshot = router.metrics();
        assert_eq!(snapshot.auto_routes, 40);
        assert_eq!(snapshot.registrations, 20);
    }

    #[tokio::test]
    async fn test_route_cache_is_swept() {
        let routes = Arc::new(SweepCounting::default());
        let router = CatalogRouter::builder(CatalogConfig::default())
            .route_cache(routes.clone())
            .build()
            .unwrap();
        router
            .create_pool(NewPool::new("p1", 1, "memory://a"))
            .await
            .unwrap();

        let total = usize::try_from(ROUTE_SWEEP_INTERVAL).unwrap();
        for i in 0..total {
            router.register(&format!("q{i}"), "proj", None).await.unwrap();
        }
        assert_eq!(routes.sweeps.load(Ordering::SeqCst), 0);

        for i in 0..total {
            router.lookup(&format!("q{i}"), "proj").await.unwrap();
        }
        assert_eq!(routes.sweeps.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_register_with_flavor_rejects_bad_queue_name() {
        let router = router(CatalogConfig::default());
        router
            .create_pool(NewPool::new("p1", 1, "memory://a").with_group("g"))
            .await
            .unwrap();
        router
            .create_flavor(Flavor::new("fast", "proj", "g"))
            .await
            .unwrap();

        let err = router
            .register("bad name", "proj", Some("fast"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidQueueName);
        assert!(router.entries("proj").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_pool_invalidates_driver() {
        let router = router(CatalogConfig::default());
        router
            .create_pool(NewPool::new("p1", 1, "memory://a"))
            .await
            .unwrap();
        let first = router.register("q", "proj", None).await.unwrap();

        router
            .update_pool("p1", PoolPatch::new().uri("memory://b"))
            .await
            .unwrap();
        let second = router.lookup("q", "proj").await.unwrap().unwrap();
        assert!(!first.shares_driver_with(&second));
        assert_eq!(second.driver().address(), "b");
    }

    #[tokio::test]
    async fn test_faulty_pool_still_routes() {
        let router = router(CatalogConfig::default());
        router
            .create_pool(NewPool::new("broken", 1, "faulty://nowhere"))
            .await
            .unwrap();

        let proxy = router.register("q", "proj", None).await.unwrap();
        assert!(!proxy.is_alive().await);
    }
}
