use crate::context::AssetContext;
use gapscan_core::{
    EnhancementPattern, FlowId, Gap, GapScanError, LlmConfig, Result, TenantId,
};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};

/// One unit of tier-2 work: every gap of a single asset, its filtered
/// context and up to a few prior patterns.
#[derive(Debug, Clone)]
pub struct EnhancementTask {
    pub flow_id: FlowId,
    pub asset: AssetContext,
    pub gaps: Vec<Gap>,
    pub prior_patterns: Vec<EnhancementPattern>,
}

/// Text-generation capability behind tier 2. A handle is a stateful
/// conversational resource and is NOT safe for concurrent use; callers
/// must serialize access.
#[async_trait]
pub trait Enhancer: Send + Sync {
    /// Submit one enhancement task and return the raw model text.
    async fn execute(&self, task: &EnhancementTask) -> Result<String>;

    fn capability(&self) -> &str {
        "gap_analysis"
    }
}

/// A pooled, tenant-scoped enhancer handle. The inner mutex makes the
/// handle single-flight: two flows of the same tenant may run concurrently
/// against the pool and are serialized here.
pub struct PooledEnhancer {
    tenant: TenantId,
    inner: Mutex<Arc<dyn Enhancer>>,
    last_used: parking_lot::Mutex<Instant>,
}

impl PooledEnhancer {
    fn new(tenant: TenantId, enhancer: Arc<dyn Enhancer>) -> Self {
        Self {
            tenant,
            inner: Mutex::new(enhancer),
            last_used: parking_lot::Mutex::new(Instant::now()),
        }
    }

    pub fn tenant(&self) -> &TenantId {
        &self.tenant
    }

    pub async fn execute(&self, task: &EnhancementTask) -> Result<String> {
        let guard = self.inner.lock().await;
        *self.last_used.lock() = Instant::now();
        let out = guard.execute(task).await;
        *self.last_used.lock() = Instant::now();
        out
    }

    fn idle_for(&self) -> Duration {
        self.last_used.lock().elapsed()
    }
}

type EnhancerFactory = dyn Fn(&TenantId) -> Result<Arc<dyn Enhancer>> + Send + Sync;

/// Tenant-keyed enhancer pool with an explicit lifecycle. One handle is
/// created per tenant and reused for entire runs; recreating the handle per
/// asset cost the predecessor system ~94% of its throughput, so callers
/// must hold the `Arc` they get for the whole batch.
pub struct EnhancerRegistry {
    handles: DashMap<TenantId, Arc<PooledEnhancer>>,
    factory: Box<EnhancerFactory>,
}

impl EnhancerRegistry {
    pub fn new(factory: Box<EnhancerFactory>) -> Self {
        Self {
            handles: DashMap::new(),
            factory,
        }
    }

    /// Registry whose handles talk to the configured LLM provider.
    pub fn from_config(config: LlmConfig) -> Self {
        Self::new(Box::new(move |tenant| {
            let enhancer = crate::provider::LlmEnhancer::new(config.clone(), tenant.clone())
                .map_err(|e| GapScanError::Configuration(e.to_string()))?;
            Ok(Arc::new(enhancer) as Arc<dyn Enhancer>)
        }))
    }

    pub fn get_or_create(&self, tenant: &TenantId) -> Result<Arc<PooledEnhancer>> {
        if let Some(handle) = self.handles.get(tenant) {
            debug!(tenant = %tenant, "reusing pooled enhancer");
            return Ok(handle.clone());
        }
        let enhancer = (self.factory)(tenant)
            .map_err(|e| GapScanError::Agent(format!("enhancer construction failed: {}", e)))?;
        let handle = Arc::new(PooledEnhancer::new(tenant.clone(), enhancer));
        info!(tenant = %tenant, "created pooled enhancer");
        self.handles.insert(tenant.clone(), handle.clone());
        Ok(handle)
    }

    /// Drop handles idle for longer than `max_idle`. In-flight handles stay
    /// alive through their `Arc` until the holder is done.
    pub fn evict_idle(&self, max_idle: Duration) -> usize {
        let before = self.handles.len();
        self.handles.retain(|_, handle| handle.idle_for() < max_idle);
        let evicted = before - self.handles.len();
        if evicted > 0 {
            info!(evicted, "evicted idle enhancer handles");
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }
}
