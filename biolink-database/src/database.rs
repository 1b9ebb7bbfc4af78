use std::time::Duration;

use biolink_utils::time::DEFAULT_WARNING_EXPIRY;
use sqlx::{PgPool, migrate::Migrator};

use crate::cache::CacheService;
use crate::memory::MemoryStore;

/// Compile-time discovered SQLx migrations for the `biolink-database` crate.
pub static MIGRATOR: Migrator = sqlx::migrate!();

#[derive(Clone, Debug)]
pub(crate) enum StorageBackend {
    Postgres(PgPool),
    Memory(MemoryStore),
}

/// Shared database handle passed across crates.
#[derive(Clone, Debug)]
pub struct Database {
    backend: StorageBackend,
    cache: CacheService,
    warning_expiry: Duration,
}

impl Database {
    /// Create a database handle from an existing pool and cache service.
    pub fn with_cache(pool: PgPool, cache: CacheService) -> Self {
        Self {
            backend: StorageBackend::Postgres(pool),
            cache,
            warning_expiry: DEFAULT_WARNING_EXPIRY,
        }
    }

    /// Create a process-local handle. Nothing survives a restart.
    pub fn in_memory() -> Self {
        Self {
            backend: StorageBackend::Memory(MemoryStore::default()),
            cache: CacheService::disabled("biolink:memory"),
            warning_expiry: DEFAULT_WARNING_EXPIRY,
        }
    }

    /// Override how long a warning survives without a new violation.
    pub fn with_warning_expiry(mut self, expiry: Duration) -> Self {
        self.warning_expiry = expiry;
        self
    }

    pub fn warning_expiry(&self) -> Duration {
        self.warning_expiry
    }

    pub(crate) fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Expose the cache service for query modules.
    pub fn cache(&self) -> &CacheService {
        &self.cache
    }
}
