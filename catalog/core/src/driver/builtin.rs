//! Built-in drivers

use std::sync::Arc;

use async_trait::async_trait;

use super::{BackendAddress, Capability, DataDriver, DriverBuilder};
use crate::error::DriverError;
use crate::pools::Options;

// ============================================================================
// Memory
// ============================================================================

/// Process-local backend
#[derive(Debug)]
pub struct MemoryDriver {
    address: String,
    /// From the `max_messages` option
    max_messages: Option<u64>,
}

impl MemoryDriver {
    /// Per-queue message limit, if configured
    #[must_use]
    pub fn max_messages(&self) -> Option<u64> {
        self.max_messages
    }
}

#[async_trait]
impl DataDriver for MemoryDriver {
    fn scheme(&self) -> &str {
        "memory"
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Fifo, Capability::Claims, Capability::Aod, Capability::HighThroughput]
    }

    async fn is_alive(&self) -> bool {
        true
    }
}

/// Builds [`MemoryDriver`]s
///
/// Accepts one option, `max_messages`, which must be a non-negative integer.
#[derive(Clone, Copy, Debug, Default)]
pub struct MemoryDriverBuilder;

#[async_trait]
impl DriverBuilder for MemoryDriverBuilder {
    async fn build(
        &self,
        address: &BackendAddress,
        options: &Options,
    ) -> Result<Arc<dyn DataDriver>, DriverError> {
        let max_messages = match options.get("max_messages") {
            None => None,
            Some(value) => Some(value.as_u64().ok_or_else(|| DriverError::Construction {
                scheme: address.scheme.clone(),
                reason: format!("max_messages must be a non-negative integer, got {value}"),
            })?),
        };

        Ok(Arc::new(MemoryDriver {
            address: address.address.clone(),
            max_messages,
        }))
    }
}

// ============================================================================
// Faulty
// ============================================================================

/// Backend that never answers; exercises dead-backend paths
#[derive(Debug)]
pub struct FaultyDriver {
    address: String,
}

#[async_trait]
impl DataDriver for FaultyDriver {
    fn scheme(&self) -> &str {
        "faulty"
    }

    fn address(&self) -> &str {
        &self.address
    }

    fn capabilities(&self) -> &[Capability] {
        &[]
    }

    async fn is_alive(&self) -> bool {
        false
    }
}

/// Builds [`FaultyDriver`]s
#[derive(Clone, Copy, Debug, Default)]
pub struct FaultyDriverBuilder;

#[async_trait]
impl DriverBuilder for FaultyDriverBuilder {
    async fn build(
        &self,
        address: &BackendAddress,
        _options: &Options,
    ) -> Result<Arc<dyn DataDriver>, DriverError> {
        Ok(Arc::new(FaultyDriver {
            address: address.address.clone(),
        }))
    }
}
