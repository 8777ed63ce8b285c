//! Shared fixtures for the integration tests

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use catalog_core::{
    BackendAddress, CatalogConfig, CatalogRouter, Capability, ControlStores, DataDriver,
    DriverBuilder, DriverError, DriverFactory, Options,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::Barrier;

/// Driver produced by [`CountingBuilder`]
#[derive(Debug)]
pub struct TestDriver {
    pub scheme: String,
    pub address: String,
    /// Build sequence number, starting at 1
    pub serial: usize,
}

#[async_trait]
impl DataDriver for TestDriver {
    fn scheme(&self) -> &str {
        &self.scheme
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Durability]
    }

    async fn is_alive(&self) -> bool {
        true
    }
}

/// Builder that counts constructions and can simulate a slow connect
#[derive(Clone, Default)]
pub struct CountingBuilder {
    builds: Arc<AtomicUsize>,
    delay: Duration,
}

impl CountingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            builds: Arc::default(),
            delay,
        }
    }

    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DriverBuilder for CountingBuilder {
    async fn build(
        &self,
        address: &BackendAddress,
        _options: &Options,
    ) -> Result<Arc<dyn DataDriver>, DriverError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let serial = self.builds.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Arc::new(TestDriver {
            scheme: address.scheme.clone(),
            address: address.address.clone(),
            serial,
        }))
    }
}

/// Builder whose builds only finish once `parties` of them are in flight
///
/// Serialized construction never gathers enough builds and hangs.
#[derive(Clone)]
pub struct RendezvousBuilder {
    barrier: Arc<Barrier>,
    inner: CountingBuilder,
}

impl RendezvousBuilder {
    pub fn new(parties: usize) -> Self {
        Self {
            barrier: Arc::new(Barrier::new(parties)),
            inner: CountingBuilder::new(),
        }
    }

    pub fn builds(&self) -> usize {
        self.inner.builds()
    }
}

#[async_trait]
impl DriverBuilder for RendezvousBuilder {
    async fn build(
        &self,
        address: &BackendAddress,
        options: &Options,
    ) -> Result<Arc<dyn DataDriver>, DriverError> {
        self.barrier.wait().await;
        self.inner.build(address, options).await
    }
}

/// Factory with the built-in schemes plus `backendA` served by `builder`
pub fn factory(builder: impl DriverBuilder + 'static) -> Arc<DriverFactory> {
    Arc::new(
        DriverFactory::builder()
            .with_builtin()
            .register("backendA", builder)
            .build(),
    )
}

/// Router over `stores` with a seeded random source
pub fn router_with(
    config: CatalogConfig,
    stores: ControlStores,
    builder: impl DriverBuilder + 'static,
    seed: u64,
) -> CatalogRouter {
    CatalogRouter::builder(config)
        .stores(stores)
        .driver_factory(factory(builder))
        .rng(StdRng::seed_from_u64(seed))
        .build()
        .expect("test config is valid")
}

/// Router over fresh in-memory stores
pub fn router(config: CatalogConfig) -> CatalogRouter {
    router_with(config, ControlStores::in_memory(), CountingBuilder::new(), 42)
}
