//! Bound storage handle returned by the router

use std::sync::Arc;

use crate::driver::{DataDriver, ResolvedDriver};
use crate::pools::Pool;

/// A queue bound to the driver of the pool that owns it
///
/// Cloning is cheap; every clone shares the same driver handle.
#[derive(Clone, Debug)]
pub struct StorageProxy {
    queue: String,
    project: String,
    pool: Pool,
    driver: Arc<dyn DataDriver>,
}

impl StorageProxy {
    pub(crate) fn new(queue: &str, project: &str, resolved: ResolvedDriver) -> Self {
        Self {
            queue: queue.to_string(),
            project: project.to_string(),
            pool: resolved.pool,
            driver: resolved.driver,
        }
    }

    /// Queue name
    #[must_use]
    pub fn queue(&self) -> &str {
        &self.queue
    }

    /// Owning project
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Id of the pool holding the queue
    #[must_use]
    pub fn pool_id(&self) -> &str {
        &self.pool.id
    }

    /// Pool descriptor the driver was resolved from
    #[must_use]
    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Shared driver handle
    #[must_use]
    pub fn driver(&self) -> &Arc<dyn DataDriver> {
        &self.driver
    }

    /// Whether both proxies use the very same driver handle
    #[must_use]
    pub fn shares_driver_with(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.driver, &other.driver)
    }

    /// Whether the backend answers
    pub async fn is_alive(&self) -> bool {
        self.driver.is_alive().await
    }
}
