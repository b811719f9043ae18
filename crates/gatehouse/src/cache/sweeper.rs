use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{error, info};

use super::StoreCache;
use crate::error::{AuthzError, Result};

/// Background thread that flushes a [`StoreCache`] on a fixed interval.
///
/// The thread sleeps on a channel, so [`shutdown`](Self::shutdown) wakes it
/// immediately instead of waiting out the interval. Dropping the sweeper
/// shuts it down.
#[derive(Debug)]
pub struct CacheSweeper {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
    interval: Duration,
}

impl CacheSweeper {
    /// Starts the sweeper thread.
    pub fn spawn(cache: Arc<StoreCache>, interval: Duration) -> Result<Self> {
        let (stop, stopped) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name("gatehouse-cache-sweeper".to_string())
            .spawn(move || {
                info!(interval_ms = interval.as_millis() as u64, "cache sweeper started");
                loop {
                    match stopped.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => {
                            // A panicking flush must not end the sweeper
                            if panic::catch_unwind(AssertUnwindSafe(|| cache.flush())).is_err() {
                                error!("cache sweep panicked, will retry next interval");
                            }
                        }
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                info!("cache sweeper stopped");
            })
            .map_err(AuthzError::Sweeper)?;

        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
            interval,
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the thread and waits for it to exit. Safe to call more than
    /// once.
    pub fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The receiver is gone only if the thread already exited
            let _ = stop.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for CacheSweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::acl::ResourceAclTree;
    use crate::store::PolicyStore;
    use gatehouse_types::TenantKey;
    use std::time::Instant;

    fn cache() -> Arc<StoreCache> {
        Arc::new(StoreCache::new(|_: &TenantKey| -> Result<PolicyStore> {
            Ok(PolicyStore::new().with_root(ResourceAclTree::new("Project")))
        }))
    }

    fn wait_until(deadline: Duration, mut done: impl FnMut() -> bool) -> bool {
        let start = Instant::now();
        while start.elapsed() < deadline {
            if done() {
                return true;
            }
            thread::sleep(Duration::from_millis(5));
        }
        done()
    }

    #[test]
    fn test_sweeper_flushes_periodically() {
        let cache = cache();
        let mut sweeper = CacheSweeper::spawn(Arc::clone(&cache), Duration::from_millis(20)).unwrap();

        cache.get_store(&TenantKey::from("acme")).unwrap();
        assert!(wait_until(Duration::from_secs(5), || cache.is_empty()));

        // Keeps running after a flush
        cache.get_store(&TenantKey::from("acme")).unwrap();
        assert!(wait_until(Duration::from_secs(5), || cache.is_empty()));

        assert!(sweeper.is_running());
        sweeper.shutdown();
        assert!(!sweeper.is_running());
    }

    #[test]
    fn test_shutdown_does_not_wait_for_interval() {
        let cache = cache();
        let mut sweeper = CacheSweeper::spawn(cache, Duration::from_secs(3600)).unwrap();
        assert_eq!(sweeper.interval(), Duration::from_secs(3600));

        let start = Instant::now();
        sweeper.shutdown();
        sweeper.shutdown();
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[test]
    fn test_drop_stops_thread() {
        let cache = cache();
        let sweeper = CacheSweeper::spawn(Arc::clone(&cache), Duration::from_secs(3600)).unwrap();
        drop(sweeper);

        // The sweeper's clone of the cache is released once the thread exits
        assert_eq!(Arc::strong_count(&cache), 1);
    }
}
