//! In-process control store

use std::collections::BTreeMap;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use super::{CatalogueEntry, CatalogueStore, FlavorStore, PoolStore};
use crate::error::{CatalogError, Result};
use crate::flavors::{Flavor, FlavorUpdate};
use crate::pools::{Pool, PoolUpdate, UpdatedPool};

/// Serializable copy of a whole store
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub(crate) struct Snapshot {
    #[serde(default)]
    pub pools: Vec<Pool>,
    #[serde(default)]
    pub flavors: Vec<Flavor>,
    #[serde(default)]
    pub entries: Vec<CatalogueEntry>,
}

/// Pools, flavors and catalogue entries held in memory
///
/// Pools and flavors sit behind `parking_lot` locks over ordered maps, since
/// they change rarely and are listed often. Catalogue entries live in a
/// `DashMap` so registrations of different queues do not contend.
#[derive(Debug, Default)]
pub struct MemoryStore {
    pools: RwLock<BTreeMap<String, Pool>>,
    /// Keyed by `(project, name)`
    flavors: RwLock<BTreeMap<(String, String), Flavor>>,
    /// `(project, queue) -> pool id`
    entries: DashMap<(String, String), String>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn from_snapshot(snapshot: Snapshot) -> Self {
        let store = Self::new();
        {
            let mut pools = store.pools.write();
            for pool in snapshot.pools {
                pools.insert(pool.id.clone(), pool);
            }
        }
        {
            let mut flavors = store.flavors.write();
            for flavor in snapshot.flavors {
                flavors.insert((flavor.project.clone(), flavor.name.clone()), flavor);
            }
        }
        for entry in snapshot.entries {
            store.entries.insert((entry.project, entry.queue), entry.pool_id);
        }
        store
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        let pools = self.pools.read().values().cloned().collect();
        let flavors = self.flavors.read().values().cloned().collect();
        let mut entries = self.collect_entries(|_, _| true);
        entries.sort_by(|a, b| (&a.project, &a.queue).cmp(&(&b.project, &b.queue)));
        Snapshot {
            pools,
            flavors,
            entries,
        }
    }

    fn collect_entries<F>(&self, keep: F) -> Vec<CatalogueEntry>
    where
        F: Fn(&(String, String), &str) -> bool,
    {
        self.entries
            .iter()
            .filter(|item| keep(item.key(), item.value().as_str()))
            .map(|item| CatalogueEntry {
                project: item.key().0.clone(),
                queue: item.key().1.clone(),
                pool_id: item.value().clone(),
            })
            .collect()
    }
}

fn key(a: &str, b: &str) -> (String, String) {
    (a.to_string(), b.to_string())
}

// ============================================================================
// Pools
// ============================================================================

#[async_trait]
impl PoolStore for MemoryStore {
    async fn create_pool(&self, pool: Pool) -> Result<()> {
        let mut pools = self.pools.write();
        if pools.contains_key(&pool.id) {
            return Err(CatalogError::PoolAlreadyExists(pool.id));
        }
        pools.insert(pool.id.clone(), pool);
        Ok(())
    }

    async fn get_pool(&self, id: &str) -> Result<Option<Pool>> {
        Ok(self.pools.read().get(id).cloned())
    }

    async fn list_pools(&self, group: Option<&str>) -> Result<Vec<Pool>> {
        Ok(self
            .pools
            .read()
            .values()
            .filter(|pool| group.map_or(true, |g| pool.in_group(g)))
            .cloned()
            .collect())
    }

    async fn update_pool(&self, id: &str, update: &PoolUpdate) -> Result<UpdatedPool> {
        let mut pools = self.pools.write();
        let pool = pools
            .get_mut(id)
            .ok_or_else(|| CatalogError::PoolDoesNotExist(id.to_string()))?;
        let config_changed = pool.apply(update);
        Ok(UpdatedPool {
            pool: pool.clone(),
            config_changed,
        })
    }

    async fn delete_pool(&self, id: &str) -> Result<bool> {
        Ok(self.pools.write().remove(id).is_some())
    }
}

// ============================================================================
// Flavors
// ============================================================================

#[async_trait]
impl FlavorStore for MemoryStore {
    async fn create_flavor(&self, flavor: Flavor) -> Result<()> {
        let mut flavors = self.flavors.write();
        let k = key(&flavor.project, &flavor.name);
        if flavors.contains_key(&k) {
            return Err(CatalogError::FlavorAlreadyExists {
                name: flavor.name,
                project: flavor.project,
            });
        }
        flavors.insert(k, flavor);
        Ok(())
    }

    async fn get_flavor(&self, name: &str, project: &str) -> Result<Option<Flavor>> {
        Ok(self.flavors.read().get(&key(project, name)).cloned())
    }

    async fn list_flavors(&self, project: &str) -> Result<Vec<Flavor>> {
        Ok(self
            .flavors
            .read()
            .values()
            .filter(|flavor| flavor.project == project)
            .cloned()
            .collect())
    }

    async fn update_flavor(
        &self,
        name: &str,
        project: &str,
        update: &FlavorUpdate,
    ) -> Result<Flavor> {
        let mut flavors = self.flavors.write();
        let flavor = flavors
            .get_mut(&key(project, name))
            .ok_or_else(|| CatalogError::flavor_missing(name, project))?;
        flavor.apply(update);
        Ok(flavor.clone())
    }

    async fn delete_flavor(&self, name: &str, project: &str) -> Result<bool> {
        Ok(self.flavors.write().remove(&key(project, name)).is_some())
    }
}

// ============================================================================
// Catalogue
// ============================================================================

#[async_trait]
impl CatalogueStore for MemoryStore {
    async fn insert(&self, project: &str, queue: &str, pool_id: &str) -> Result<()> {
        self.entries.insert(key(project, queue), pool_id.to_string());
        Ok(())
    }

    async fn insert_if_absent(
        &self,
        project: &str,
        queue: &str,
        pool_id: &str,
    ) -> Result<Option<String>> {
        match self.entries.entry(key(project, queue)) {
            Entry::Occupied(existing) => Ok(Some(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(pool_id.to_string());
                Ok(None)
            }
        }
    }

    async fn get(&self, project: &str, queue: &str) -> Result<CatalogueEntry> {
        self.entries
            .get(&key(project, queue))
            .map(|pool_id| CatalogueEntry {
                project: project.to_string(),
                queue: queue.to_string(),
                pool_id: pool_id.value().clone(),
            })
            .ok_or_else(|| CatalogError::entry_missing(project, queue))
    }

    async fn delete(&self, project: &str, queue: &str) -> Result<()> {
        self.entries.remove(&key(project, queue));
        Ok(())
    }

    async fn list_by_pool(&self, pool_id: &str) -> Result<Vec<CatalogueEntry>> {
        let mut entries = self.collect_entries(|_, pool| pool == pool_id);
        entries.sort_by(|a, b| (&a.project, &a.queue).cmp(&(&b.project, &b.queue)));
        Ok(entries)
    }

    async fn list(&self, project: &str) -> Result<Vec<CatalogueEntry>> {
        let mut entries = self.collect_entries(|(p, _), _| p == project);
        entries.sort_by(|a, b| a.queue.cmp(&b.queue));
        Ok(entries)
    }

    async fn exists(&self, project: &str, queue: &str) -> Result<bool> {
        Ok(self.entries.contains_key(&key(project, queue)))
    }
}
