//! Per-tenant policy store cache.
//!
//! Stores are loaded lazily on first use and shared as `Arc<PolicyStore>`
//! until the next flush. The [`CacheSweeper`] flushes the whole cache on a
//! fixed interval so edited ACL definitions are eventually picked up.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use gatehouse_types::TenantKey;
use tracing::{debug, info, warn};

use crate::error::{AuthzError, Result};
use crate::store::PolicyStore;

mod sweeper;

pub use sweeper::CacheSweeper;

/// Source of a tenant's ACL definitions.
pub trait PolicyStoreLoader: Send + Sync {
    fn load(&self, tenant: &TenantKey) -> Result<PolicyStore>;
}

impl<F> PolicyStoreLoader for F
where
    F: Fn(&TenantKey) -> Result<PolicyStore> + Send + Sync,
{
    fn load(&self, tenant: &TenantKey) -> Result<PolicyStore> {
        self(tenant)
    }
}

struct CacheEntry {
    store: Arc<PolicyStore>,
    loaded_at: DateTime<Utc>,
}

/// Lazily populated map from tenant to its policy store.
pub struct StoreCache {
    loader: Box<dyn PolicyStoreLoader>,
    entries: Mutex<HashMap<TenantKey, CacheEntry>>,
}

impl StoreCache {
    pub fn new(loader: impl PolicyStoreLoader + 'static) -> Self {
        Self {
            loader: Box::new(loader),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the tenant's store, loading it on a miss.
    ///
    /// The lock is not held while loading. If two callers miss at once both
    /// load, the first insert wins and both receive the winning store.
    pub fn get_store(&self, tenant: &TenantKey) -> Result<Arc<PolicyStore>> {
        if let Some(entry) = self.lock().get(tenant) {
            debug!(%tenant, "policy store cache hit");
            return Ok(Arc::clone(&entry.store));
        }

        debug!(%tenant, "loading policy store");
        let store = self.loader.load(tenant).map_err(|e| {
            warn!(%tenant, error = %e, "policy store load failed");
            match e {
                AuthzError::PolicyLoad { .. } => e,
                other => AuthzError::PolicyLoad {
                    tenant: tenant.to_string(),
                    reason: other.to_string(),
                },
            }
        })?;

        let mut entries = self.lock();
        let entry = entries.entry(tenant.clone()).or_insert_with(|| CacheEntry {
            store: Arc::new(store),
            loaded_at: Utc::now(),
        });
        Ok(Arc::clone(&entry.store))
    }

    /// Drops every cached store. Stores already handed out stay valid.
    pub fn flush(&self) {
        let mut entries = self.lock();
        let flushed = entries.len();
        entries.clear();
        info!(flushed, "policy store cache flushed");
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// When the tenant's cached store was loaded, if it is cached.
    pub fn loaded_at(&self, tenant: &TenantKey) -> Option<DateTime<Utc>> {
        self.lock().get(tenant).map(|entry| entry.loaded_at)
    }

    // Every critical section leaves the map consistent, so a poisoned lock
    // is safe to reuse.
    fn lock(&self) -> MutexGuard<'_, HashMap<TenantKey, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for StoreCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreCache")
            .field("tenants", &self.len())
            .finish_non_exhaustive()
    }
}
