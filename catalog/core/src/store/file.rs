//! File-backed control store
//!
//! Serves reads from an in-memory copy and rewrites a JSON snapshot after
//! every mutation. A mutation is applied to a staged copy of the state, the
//! staged snapshot is written, and only then is the copy published to
//! readers. A failed write leaves both the file and the served state as they
//! were.
//!
//! Writes go to a sibling temp file which is then renamed over the snapshot,
//! so a crash never leaves a half-written file behind.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::memory::{MemoryStore, Snapshot};
use super::{CatalogueEntry, CatalogueStore, FlavorStore, PoolStore};
use crate::error::{Result, StoreError};
use crate::flavors::{Flavor, FlavorUpdate};
use crate::pools::{Pool, PoolUpdate, UpdatedPool};

/// Control store persisted to a single JSON file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Last state that made it to disk
    current: RwLock<Arc<MemoryStore>>,
    /// Serializes mutations
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist
    ///
    /// # Errors
    ///
    /// [`StoreError::Io`] if the file exists but cannot be read and
    /// [`StoreError::Serialization`] if it is not a valid snapshot.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let snapshot = match tokio::fs::read(&path).await {
            Ok(bytes) => serde_json::from_slice::<Snapshot>(&bytes).map_err(StoreError::from)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "No store file yet, starting empty");
                Snapshot::default()
            }
            Err(e) => return Err(io_error(&path, e).into()),
        };

        info!(
            path = %path.display(),
            pools = snapshot.pools.len(),
            flavors = snapshot.flavors.len(),
            entries = snapshot.entries.len(),
            "Opened file store"
        );

        Ok(Self {
            path,
            current: RwLock::new(Arc::new(MemoryStore::from_snapshot(snapshot))),
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the snapshot file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> Arc<MemoryStore> {
        Arc::clone(&self.current.read())
    }

    /// Run `change` against a staged copy and publish it once it is on disk
    ///
    /// `change` reports whether it modified anything; an unchanged copy is
    /// neither written nor published.
    async fn commit<T, F, Fut>(&self, change: F) -> Result<T>
    where
        F: FnOnce(Arc<MemoryStore>) -> Fut,
        Fut: Future<Output = Result<(T, bool)>>,
    {
        let _guard = self.write_lock.lock().await;

        let staged = Arc::new(MemoryStore::from_snapshot(self.current().snapshot()));
        let (value, changed) = change(Arc::clone(&staged)).await?;
        if !changed {
            return Ok(value);
        }

        if let Err(e) = self.persist(&staged.snapshot()).await {
            warn!(path = %self.path.display(), error = %e, "Store write failed, change discarded");
            return Err(e);
        }
        *self.current.write() = staged;
        Ok(value)
    }

    /// Caller holds `write_lock`
    async fn persist(&self, snapshot: &Snapshot) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(snapshot).map_err(StoreError::from)?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| io_error(&tmp, e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| io_error(&self.path, e))?;

        debug!(path = %self.path.display(), bytes = bytes.len(), "Store snapshot written");
        Ok(())
    }
}

fn io_error(path: &Path, source: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl PoolStore for FileStore {
    async fn create_pool(&self, pool: Pool) -> Result<()> {
        self.commit(|staged| async move { staged.create_pool(pool).await.map(|()| ((), true)) })
            .await
    }

    async fn get_pool(&self, id: &str) -> Result<Option<Pool>> {
        self.current().get_pool(id).await
    }

    async fn list_pools(&self, group: Option<&str>) -> Result<Vec<Pool>> {
        self.current().list_pools(group).await
    }

    async fn update_pool(&self, id: &str, update: &PoolUpdate) -> Result<UpdatedPool> {
        self.commit(|staged| async move {
            staged.update_pool(id, update).await.map(|updated| (updated, true))
        })
        .await
    }

    async fn delete_pool(&self, id: &str) -> Result<bool> {
        self.commit(|staged| async move {
            staged.delete_pool(id).await.map(|existed| (existed, existed))
        })
        .await
    }
}

#[async_trait]
impl FlavorStore for FileStore {
    async fn create_flavor(&self, flavor: Flavor) -> Result<()> {
        self.commit(|staged| async move {
            staged.create_flavor(flavor).await.map(|()| ((), true))
        })
        .await
    }

    async fn get_flavor(&self, name: &str, project: &str) -> Result<Option<Flavor>> {
        self.current().get_flavor(name, project).await
    }

    async fn list_flavors(&self, project: &str) -> Result<Vec<Flavor>> {
        self.current().list_flavors(project).await
    }

    async fn update_flavor(
        &self,
        name: &str,
        project: &str,
        update: &FlavorUpdate,
    ) -> Result<Flavor> {
        self.commit(|staged| async move {
            staged
                .update_flavor(name, project, update)
                .await
                .map(|flavor| (flavor, true))
        })
        .await
    }

    async fn delete_flavor(&self, name: &str, project: &str) -> Result<bool> {
        self.commit(|staged| async move {
            staged
                .delete_flavor(name, project)
                .await
                .map(|existed| (existed, existed))
        })
        .await
    }
}

#[async_trait]
impl CatalogueStore for FileStore {
    async fn insert(&self, project: &str, queue: &str, pool_id: &str) -> Result<()> {
        self.commit(|staged| async move {
            staged.insert(project, queue, pool_id).await.map(|()| ((), true))
        })
        .await
    }

    async fn insert_if_absent(
        &self,
        project: &str,
        queue: &str,
        pool_id: &str,
    ) -> Result<Option<String>> {
        self.commit(|staged| async move {
            let existing = staged.insert_if_absent(project, queue, pool_id).await?;
            let inserted = existing.is_none();
            Ok((existing, inserted))
        })
        .await
    }

    async fn get(&self, project: &str, queue: &str) -> Result<CatalogueEntry> {
        self.current().get(project, queue).await
    }

    async fn delete(&self, project: &str, queue: &str) -> Result<()> {
        self.commit(|staged| async move {
            let existed = staged.exists(project, queue).await?;
            staged.delete(project, queue).await?;
            Ok(((), existed))
        })
        .await
    }

    async fn list_by_pool(&self, pool_id: &str) -> Result<Vec<CatalogueEntry>> {
        self.current().list_by_pool(pool_id).await
    }

    async fn list(&self, project: &str) -> Result<Vec<CatalogueEntry>> {
        self.current().list(project).await
    }

    async fn exists(&self, project: &str, queue: &str) -> Result<bool> {
        self.current().exists(project, queue).await
    }
}
