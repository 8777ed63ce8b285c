//! Catalog Core - Pool Catalogue and Queue Routing
//!
//! This crate decides which storage backend ("pool") owns each queue of a
//! multi-tenant message-queuing service, and keeps that decision consistent
//! while pools are added, reweighted, retired and removed.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      API-serving workers                        │
//! │             lookup / register / deregister / admin              │
//! └───────────────────────────────┬────────────────────────────────┘
//!                                 │
//! ┌───────────────────────────────┴────────────────────────────────┐
//! │                         CatalogRouter                           │
//! │  ┌──────────────┐  ┌──────────────┐  ┌───────────────────────┐ │
//! │  │ PoolRegistry │  │FlavorRegistry│  │     PoolSelector      │ │
//! │  └──────┬───────┘  └──────┬───────┘  │ (weighted, capacity)  │ │
//! │         │                 │          └───────────────────────┘ │
//! │  ┌──────┴─────────────────┴──────┐   ┌───────────────────────┐ │
//! │  │  PoolStore · FlavorStore ·    │   │      DriverCache      │ │
//! │  │       CatalogueStore          │   │  (per-pool handles)   │ │
//! │  └───────────────────────────────┘   └───────────┬───────────┘ │
//! └──────────────────────────────────────────────────┼─────────────┘
//!                                                    │
//!                                           DriverFactory (by scheme)
//! ```
//!
//! # Key Types
//!
//! - [`CatalogRouter`]: lookup, register, deregister, pool and flavor admin
//! - [`Pool`], [`Flavor`], [`CatalogueEntry`]: the control-plane records
//! - [`StorageProxy`]: a queue bound to its pool's driver handle
//! - [`DriverFactory`]: scheme-dispatching driver construction
//! - [`CatalogConfig`]: layered configuration (file, env, overrides)
//!
//! # Module Overview
//!
//! - [`cache`]: pluggable memoization cache
//! - [`config`]: configuration loading
//! - [`driver`]: driver handles, factory and cache
//! - [`error`]: error taxonomy
//! - [`flavors`]: flavor registry
//! - [`metrics`]: atomic counters
//! - [`pools`]: pool descriptors and registry
//! - [`proxy`]: bound storage handle
//! - [`router`]: the catalogue façade
//! - [`selector`]: weighted placement
//! - [`store`]: control store traits and implementations
//! - [`validation`]: name and uri checks

#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod cache;
pub mod config;
pub mod driver;
pub mod error;
pub mod flavors;
pub mod metrics;
pub mod pools;
pub mod proxy;
pub mod router;
pub mod selector;
pub mod store;
pub mod validation;

pub use cache::{Cache, MemoryCache};
pub use driver::{
    BackendAddress, Capability, DataDriver, DriverBuilder, DriverCache, DriverFactory,
    DriverFactoryBuilder, ResolvedDriver,
};
pub use error::{CatalogError, DriverError, ErrorKind, Result, StoreError};
pub use flavors::{Flavor, FlavorRegistry, FlavorUpdate};
pub use metrics::{CatalogMetrics, MetricsSnapshot};
pub use pools::{NewPool, Options, Pool, PoolPatch, PoolRegistry, UpdatedPool};
pub use proxy::StorageProxy;
pub use router::{CatalogRouter, RouterBuilder};
pub use selector::{PlacementTarget, PoolSelector, UsageSource, UsageTracker};
pub use store::{
    CatalogueEntry, CatalogueStore, ControlStores, FileStore, FlavorStore, MemoryStore, PoolStore,
};

// Config exports
pub use config::{
    default_config_path, default_store_path, load_config, load_config_from_path, AutoRoutePolicy,
    CatalogConfig, ConfigError, ConfigOverrides, ConfigSource,
};
