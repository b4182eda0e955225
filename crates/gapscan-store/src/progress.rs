use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use gapscan_core::{EnhancementProgress, FlowId, ProgressChannel, Result};
use std::sync::Arc;
use std::time::Duration;

/// In-memory progress channel with a freshness window: entries older than
/// the TTL read back as unknown rather than reporting stale state.
#[derive(Debug, Clone)]
pub struct MemoryProgressChannel {
    entries: Arc<DashMap<FlowId, EnhancementProgress>>,
    ttl: Duration,
}

impl MemoryProgressChannel {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }
}

impl Default for MemoryProgressChannel {
    fn default() -> Self {
        Self::new(Duration::from_secs(3600))
    }
}

#[async_trait]
impl ProgressChannel for MemoryProgressChannel {
    async fn publish(&self, flow_id: FlowId, progress: EnhancementProgress) -> Result<()> {
        self.entries.insert(flow_id, progress);
        Ok(())
    }

    async fn fetch(&self, flow_id: FlowId) -> Result<Option<EnhancementProgress>> {
        let Some(entry) = self.entries.get(&flow_id) else {
            return Ok(None);
        };
        let ttl = ChronoDuration::from_std(self.ttl).unwrap_or(ChronoDuration::MAX);
        if Utc::now() - entry.updated_at > ttl {
            return Ok(None);
        }
        Ok(Some(entry.value().clone()))
    }
}
