//! Catalogue Errors
//!
//! Every failure the catalogue surfaces is a [`CatalogError`]. Caller-correctable
//! conditions (bad input, referential conflicts, exhausted capacity) have their
//! own variants; faults from collaborators (stores, driver construction) are
//! wrapped unmodified in [`CatalogError::Store`] and [`CatalogError::Driver`].
//!
//! Use [`CatalogError::kind`] to branch on the failure class without matching on
//! variant payloads or message text.

use std::fmt;

use thiserror::Error;

/// Convenience alias used throughout the crate
pub type Result<T, E = CatalogError> = std::result::Result<T, E>;

// ============================================================================
// Catalogue Errors
// ============================================================================

/// Errors returned by the registries, the catalogue and the router
#[derive(Debug, Error)]
pub enum CatalogError {
    /// No pool with this id is registered
    #[error("pool {0} does not exist")]
    PoolDoesNotExist(String),

    /// A pool with this id is already registered
    #[error("pool {0} already exists")]
    PoolAlreadyExists(String),

    /// The pool still owns catalogue entries and cannot be removed
    #[error("pool {pool_id} is in use by {queues} queue(s)")]
    PoolInUse {
        /// Pool that was asked to be deleted
        pool_id: String,
        /// Number of catalogue entries still pointing at it
        queues: usize,
    },

    /// The pool descriptor failed validation
    #[error("invalid pool: {0}")]
    InvalidPool(String),

    /// No flavor with this name exists in the project
    #[error("flavor {name} does not exist in project {project:?}")]
    FlavorDoesNotExist {
        /// Flavor name
        name: String,
        /// Owning project
        project: String,
    },

    /// A flavor with this name already exists in the project
    #[error("flavor {name} already exists in project {project:?}")]
    FlavorAlreadyExists {
        /// Flavor name
        name: String,
        /// Owning project
        project: String,
    },

    /// No pool currently carries the requested group
    #[error("pool group {0} does not exist")]
    PoolGroupDoesNotExist(String),

    /// Selection found no eligible pool for the placement target
    #[error("no pool available for {0}")]
    NoPoolAvailable(String),

    /// The `(project, queue)` pair has no catalogue entry
    #[error("queue {queue} in project {project:?} is not registered")]
    CatalogueEntryDoesNotExist {
        /// Owning project
        project: String,
        /// Queue name
        queue: String,
    },

    /// Queue name failed validation
    #[error("invalid queue name {name:?}: {reason}")]
    InvalidQueueName {
        /// Rejected name
        name: String,
        /// Why it was rejected
        reason: String,
    },

    /// Project id failed validation
    #[error("invalid project id: {0}")]
    InvalidProject(String),

    /// A control store failed
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A backend driver could not be built
    #[error("driver error: {0}")]
    Driver(#[from] DriverError),
}

/// Failure class of a [`CatalogError`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// See [`CatalogError::PoolDoesNotExist`]
    PoolDoesNotExist,
    /// See [`CatalogError::PoolAlreadyExists`]
    PoolAlreadyExists,
    /// See [`CatalogError::PoolInUse`]
    PoolInUse,
    /// See [`CatalogError::InvalidPool`]
    InvalidPool,
    /// See [`CatalogError::FlavorDoesNotExist`]
    FlavorDoesNotExist,
    /// See [`CatalogError::FlavorAlreadyExists`]
    FlavorAlreadyExists,
    /// See [`CatalogError::PoolGroupDoesNotExist`]
    PoolGroupDoesNotExist,
    /// See [`CatalogError::NoPoolAvailable`]
    NoPoolAvailable,
    /// See [`CatalogError::CatalogueEntryDoesNotExist`]
    CatalogueEntryDoesNotExist,
    /// See [`CatalogError::InvalidQueueName`]
    InvalidQueueName,
    /// See [`CatalogError::InvalidProject`]
    InvalidProject,
    /// See [`CatalogError::Store`]
    Store,
    /// See [`CatalogError::Driver`]
    Driver,
}

impl CatalogError {
    /// Failure class of this error
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::PoolDoesNotExist(_) => ErrorKind::PoolDoesNotExist,
            Self::PoolAlreadyExists(_) => ErrorKind::PoolAlreadyExists,
            Self::PoolInUse { .. } => ErrorKind::PoolInUse,
            Self::InvalidPool(_) => ErrorKind::InvalidPool,
            Self::FlavorDoesNotExist { .. } => ErrorKind::FlavorDoesNotExist,
            Self::FlavorAlreadyExists { .. } => ErrorKind::FlavorAlreadyExists,
            Self::PoolGroupDoesNotExist(_) => ErrorKind::PoolGroupDoesNotExist,
            Self::NoPoolAvailable(_) => ErrorKind::NoPoolAvailable,
            Self::CatalogueEntryDoesNotExist { .. } => ErrorKind::CatalogueEntryDoesNotExist,
            Self::InvalidQueueName { .. } => ErrorKind::InvalidQueueName,
            Self::InvalidProject(_) => ErrorKind::InvalidProject,
            Self::Store(_) => ErrorKind::Store,
            Self::Driver(_) => ErrorKind::Driver,
        }
    }

    /// Whether the caller can fix the request and try again
    ///
    /// Collaborator faults are not caller-correctable; everything else is.
    #[must_use]
    pub fn is_caller_error(&self) -> bool {
        !matches!(self, Self::Store(_) | Self::Driver(_))
    }

    pub(crate) fn flavor_missing(name: &str, project: &str) -> Self {
        Self::FlavorDoesNotExist {
            name: name.to_string(),
            project: project.to_string(),
        }
    }

    pub(crate) fn entry_missing(project: &str, queue: &str) -> Self {
        Self::CatalogueEntryDoesNotExist {
            project: project.to_string(),
            queue: queue.to_string(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// ============================================================================
// Collaborator Faults
// ============================================================================

/// Faults raised by a control store backend
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing file could not be read or written
    #[error("I/O failure on {path}: {source}")]
    Io {
        /// File being accessed
        path: String,
        /// Underlying error
        source: std::io::Error,
    },

    /// The persisted snapshot could not be encoded or decoded
    #[error("snapshot serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Faults raised while building a backend driver
#[derive(Clone, Debug, Error)]
pub enum DriverError {
    /// No builder is registered for the uri scheme
    #[error("no driver registered for scheme {0:?}")]
    UnsupportedScheme(String),

    /// The uri could not be parsed into scheme and address
    #[error("malformed backend uri {0:?}")]
    MalformedUri(String),

    /// The builder rejected the options or failed to connect
    #[error("failed to build {scheme} driver: {reason}")]
    Construction {
        /// Scheme of the failing builder
        scheme: String,
        /// Reason reported by the builder
        reason: String,
    },
}

// ============================================================================
// Tests
// ============================================================================
