use async_trait::async_trait;
use dashmap::DashMap;
use gapscan_core::{DistributedLock, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Process-local advisory lock with TTL expiry. Suitable for single-node
/// deployments and tests; multi-node deployments plug in a shared backend
/// behind the same trait.
#[derive(Debug, Default, Clone)]
pub struct MemoryDistributedLock {
    held: Arc<DashMap<String, Instant>>,
}

impl MemoryDistributedLock {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DistributedLock for MemoryDistributedLock {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut acquired = false;
        // Entry API keeps check-and-set atomic under concurrent callers.
        self.held
            .entry(key.to_string())
            .and_modify(|expires_at| {
                if *expires_at <= now {
                    *expires_at = now + ttl;
                    acquired = true;
                }
            })
            .or_insert_with(|| {
                acquired = true;
                now + ttl
            });
        debug!(key, acquired, "lock acquisition attempt");
        Ok(acquired)
    }

    async fn release(&self, key: &str) -> Result<()> {
        self.held.remove(key);
        Ok(())
    }
}
