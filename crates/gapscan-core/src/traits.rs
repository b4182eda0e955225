use crate::{
    Asset, AssetId, EnhancementPattern, EnhancementProgress, FlowId, Gap, PersistedGap, Result,
    TenantId,
};
use async_trait::async_trait;
use std::time::Duration;

/// Translates an externally supplied flow reference (a lifecycle id or the
/// engine's own flow id) into the canonical flow id.
#[async_trait]
pub trait FlowResolver: Send + Sync {
    async fn resolve(&self, flow_ref: &str) -> Result<FlowId>;
}

/// Read-only access to discovered assets, scoped to a tenant.
#[async_trait]
pub trait AssetRepository: Send + Sync {
    async fn load(&self, ids: &[AssetId], tenant: &TenantId) -> Result<Vec<Asset>>;
}

/// Idempotent gap persistence. `upsert` must be a single atomic conditional
/// write keyed by `GapKey`: on conflict it updates flow linkage, priority,
/// description, impact, resolution suggestion, confidence and suggestions,
/// and never touches `resolution_status` or `created_at`.
#[async_trait]
pub trait GapStore: Send + Sync {
    async fn upsert(&self, gap: &Gap) -> Result<PersistedGap>;
}

/// Advisory mutual exclusion across worker processes.
///
/// `try_acquire` returns `Ok(false)` when the lock is already held, and
/// `Err` when the backend is unreachable. Callers degrade through backend
/// errors (proceed, log a warning) but must fail fast on a held lock.
#[async_trait]
pub trait DistributedLock: Send + Sync {
    async fn try_acquire(&self, key: &str, ttl: Duration) -> Result<bool>;
    async fn release(&self, key: &str) -> Result<()>;
}

/// Pollable progress channel for tier-2 runs. Entries past the freshness
/// window read back as `None`.
#[async_trait]
pub trait ProgressChannel: Send + Sync {
    async fn publish(&self, flow_id: FlowId, progress: EnhancementProgress) -> Result<()>;
    async fn fetch(&self, flow_id: FlowId) -> Result<Option<EnhancementProgress>>;
}

/// Optional learning store of prior enhancement outcomes. Both operations
/// are best-effort; failures never abort an asset.
#[async_trait]
pub trait PatternStore: Send + Sync {
    async fn similar_patterns(
        &self,
        asset_type: &str,
        field_names: &[String],
        limit: usize,
    ) -> Result<Vec<EnhancementPattern>>;

    async fn record(&self, pattern: EnhancementPattern) -> Result<()>;
}

/// Lock implementation for deployments without a lock backend. Always
/// grants acquisition, so single-worker setups are never blocked.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledLock;

#[async_trait]
impl DistributedLock for DisabledLock {
    async fn try_acquire(&self, _key: &str, _ttl: Duration) -> Result<bool> {
        Ok(true)
    }

    async fn release(&self, _key: &str) -> Result<()> {
        Ok(())
    }
}

/// Learning store stand-in that never returns patterns and drops records.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledPatternStore;

#[async_trait]
impl PatternStore for DisabledPatternStore {
    async fn similar_patterns(
        &self,
        _asset_type: &str,
        _field_names: &[String],
        _limit: usize,
    ) -> Result<Vec<EnhancementPattern>> {
        Ok(Vec::new())
    }

    async fn record(&self, _pattern: EnhancementPattern) -> Result<()> {
        Ok(())
    }
}

/// Progress sink for deployments without a pollable channel.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledProgressChannel;

#[async_trait]
impl ProgressChannel for DisabledProgressChannel {
    async fn publish(&self, _flow_id: FlowId, _progress: EnhancementProgress) -> Result<()> {
        Ok(())
    }

    async fn fetch(&self, _flow_id: FlowId) -> Result<Option<EnhancementProgress>> {
        Ok(None)
    }
}
