//! Flavor Registry
//!
//! A flavor is a per-project alias for a pool group, so tenants can ask for
//! "fast" or "durable" storage without naming pools. Groups are checked
//! against the pool registry when a flavor is created or updated; a group that
//! later empties out is not tracked, and registration through the flavor then
//! fails with `NoPoolAvailable`.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{CatalogError, Result};
use crate::pools::{Options, PoolRegistry};
use crate::store::FlavorStore;

/// Named capability alias resolving to a pool group
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Flavor {
    /// Flavor name, unique within the project
    pub name: String,

    /// Owning project
    pub project: String,

    /// Pool group that placements through this flavor draw from
    pub pool_group: String,

    /// Advertised capabilities
    #[serde(default)]
    pub capabilities: Options,
}

impl Flavor {
    /// Flavor with no capabilities
    pub fn new(
        name: impl Into<String>,
        project: impl Into<String>,
        pool_group: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            project: project.into(),
            pool_group: pool_group.into(),
            capabilities: Options::new(),
        }
    }

    /// Add a capability
    #[must_use]
    pub fn with_capability(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.capabilities.insert(key.into(), value.into());
        self
    }

    pub(crate) fn apply(&mut self, update: &FlavorUpdate) {
        if let Some(group) = &update.pool_group {
            self.pool_group.clone_from(group);
        }
        if let Some(capabilities) = &update.capabilities {
            self.capabilities.clone_from(capabilities);
        }
    }
}

/// Partial update for a flavor
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FlavorUpdate {
    /// New pool group
    pub pool_group: Option<String>,
    /// Replacement capabilities
    pub capabilities: Option<Options>,
}

/// Validating front end over a [`FlavorStore`]
pub struct FlavorRegistry {
    store: Arc<dyn FlavorStore>,
    pools: Arc<PoolRegistry>,
}

impl std::fmt::Debug for FlavorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlavorRegistry").finish_non_exhaustive()
    }
}

impl FlavorRegistry {
    /// Create a registry that validates groups against `pools`
    pub fn new(store: Arc<dyn FlavorStore>, pools: Arc<PoolRegistry>) -> Self {
        Self { store, pools }
    }

    /// Create a flavor
    ///
    /// # Errors
    ///
    /// [`CatalogError::PoolGroupDoesNotExist`] when no pool carries the group
    /// and [`CatalogError::FlavorAlreadyExists`] on a name clash.
    pub async fn create(&self, flavor: Flavor) -> Result<Flavor> {
        self.check_group(&flavor.pool_group).await?;
        self.store.create_flavor(flavor.clone()).await?;
        info!(
            flavor = %flavor.name,
            project = %flavor.project,
            pool_group = %flavor.pool_group,
            "Flavor created"
        );
        Ok(flavor)
    }

    /// Fetch a flavor
    ///
    /// # Errors
    ///
    /// [`CatalogError::FlavorDoesNotExist`] if unknown.
    pub async fn get(&self, name: &str, project: &str) -> Result<Flavor> {
        self.store
            .get_flavor(name, project)
            .await?
            .ok_or_else(|| CatalogError::flavor_missing(name, project))
    }

    /// A project's flavors, sorted by name
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn list(&self, project: &str) -> Result<Vec<Flavor>> {
        self.store.list_flavors(project).await
    }

    /// Change a flavor's group or capabilities
    ///
    /// # Errors
    ///
    /// [`CatalogError::PoolGroupDoesNotExist`] for an unknown new group and
    /// [`CatalogError::FlavorDoesNotExist`] if the flavor is unknown.
    pub async fn update(&self, name: &str, project: &str, update: FlavorUpdate) -> Result<Flavor> {
        if let Some(group) = &update.pool_group {
            self.check_group(group).await?;
        }
        let flavor = self.store.update_flavor(name, project, &update).await?;
        info!(flavor = %name, project = %project, pool_group = %flavor.pool_group, "Flavor updated");
        Ok(flavor)
    }

    /// Remove a flavor; removing an unknown flavor succeeds
    ///
    /// # Errors
    ///
    /// Store faults only.
    pub async fn delete(&self, name: &str, project: &str) -> Result<()> {
        if self.store.delete_flavor(name, project).await? {
            info!(flavor = %name, project = %project, "Flavor deleted");
        }
        Ok(())
    }

    async fn check_group(&self, group: &str) -> Result<()> {
        if self.pools.group_exists(group).await? {
            Ok(())
        } else {
            Err(CatalogError::PoolGroupDoesNotExist(group.to_string()))
        }
    }
}
