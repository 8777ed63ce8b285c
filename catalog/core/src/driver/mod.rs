//! Backend Drivers
//!
//! A driver handle is the (possibly expensive) connection object used to talk
//! to one pool's backend. Handles are produced by a [`DriverFactory`], which
//! dispatches on the uri scheme to a registered [`DriverBuilder`]. The factory
//! table is assembled once at start-up and is immutable afterwards.
//!
//! Built-in schemes:
//!
//! | Scheme | Driver |
//! |--------|--------|
//! | `memory` | [`MemoryDriver`], process-local |
//! | `faulty` | [`FaultyDriver`], always reports itself dead |

mod builtin;
mod cache;

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::DriverError;
use crate::pools::Options;
use crate::validation::split_uri;

pub use builtin::{FaultyDriver, FaultyDriverBuilder, MemoryDriver, MemoryDriverBuilder};
pub use cache::{DriverCache, ResolvedDriver};

// ============================================================================
// Driver Handles
// ============================================================================

/// Features a backend may provide
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Messages are delivered in insertion order
    Fifo,
    /// Messages can be claimed by a consumer
    Claims,
    /// At-once delivery
    Aod,
    /// Tuned for high message rates
    HighThroughput,
    /// Messages survive a backend restart
    Durability,
}

/// A constructed connection to a backend
#[async_trait]
pub trait DataDriver: Send + Sync + fmt::Debug {
    /// Scheme this driver was built for
    fn scheme(&self) -> &str;

    /// Backend address without the scheme
    fn address(&self) -> &str;

    /// Features this backend provides
    fn capabilities(&self) -> &[Capability];

    /// Whether the backend answers
    async fn is_alive(&self) -> bool;
}

/// Parsed pieces of a pool uri handed to a builder
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendAddress {
    /// Lowercased scheme
    pub scheme: String,
    /// Everything after `://`
    pub address: String,
}

/// Constructs driver handles for one scheme
#[async_trait]
pub trait DriverBuilder: Send + Sync {
    /// Build a handle for `address` with the pool's options
    async fn build(
        &self,
        address: &BackendAddress,
        options: &Options,
    ) -> Result<Arc<dyn DataDriver>, DriverError>;
}

// ============================================================================
// Driver Factory
// ============================================================================

/// Scheme-dispatching driver constructor
#[derive(Clone, Default)]
pub struct DriverFactory {
    builders: HashMap<String, Arc<dyn DriverBuilder>>,
}

impl fmt::Debug for DriverFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DriverFactory")
            .field("schemes", &self.schemes())
            .finish()
    }
}

impl DriverFactory {
    /// Start assembling a factory
    #[must_use]
    pub fn builder() -> DriverFactoryBuilder {
        DriverFactoryBuilder::default()
    }

    /// Whether a builder is registered for `scheme` (case-insensitive)
    #[must_use]
    pub fn supports(&self, scheme: &str) -> bool {
        self.builders.contains_key(&scheme.to_ascii_lowercase())
    }

    /// Registered schemes, sorted
    #[must_use]
    pub fn schemes(&self) -> Vec<&str> {
        let mut schemes: Vec<&str> = self.builders.keys().map(String::as_str).collect();
        schemes.sort_unstable();
        schemes
    }

    /// Build a driver handle for `uri`
    ///
    /// # Errors
    ///
    /// [`DriverError::MalformedUri`] if the uri does not parse,
    /// [`DriverError::UnsupportedScheme`] if no builder is registered, and
    /// whatever the builder reports.
    pub async fn build(&self, uri: &str, options: &Options) -> Result<Arc<dyn DataDriver>, DriverError> {
        let (scheme, address) =
            split_uri(uri).ok_or_else(|| DriverError::MalformedUri(uri.to_string()))?;
        let scheme = scheme.to_ascii_lowercase();
        let builder = self
            .builders
            .get(&scheme)
            .ok_or_else(|| DriverError::UnsupportedScheme(scheme.clone()))?;

        debug!(scheme = %scheme, address = %address, "Building driver");
        builder
            .build(
                &BackendAddress {
                    scheme,
                    address: address.to_string(),
                },
                options,
            )
            .await
    }
}

/// Registration table for a [`DriverFactory`]
#[derive(Default)]
pub struct DriverFactoryBuilder {
    builders: HashMap<String, Arc<dyn DriverBuilder>>,
}

impl DriverFactoryBuilder {
    /// Register `builder` for `scheme`, replacing any earlier registration
    #[must_use]
    pub fn register(mut self, scheme: &str, builder: impl DriverBuilder + 'static) -> Self {
        self.builders
            .insert(scheme.to_ascii_lowercase(), Arc::new(builder));
        self
    }

    /// Register the `memory` and `faulty` schemes
    #[must_use]
    pub fn with_builtin(self) -> Self {
        self.register("memory", MemoryDriverBuilder)
            .register("faulty", FaultyDriverBuilder)
    }

    /// Freeze the table
    #[must_use]
    pub fn build(self) -> DriverFactory {
        DriverFactory {
            builders: self.builders,
        }
    }
}
