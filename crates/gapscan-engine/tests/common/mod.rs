#![allow(dead_code)]

use async_trait::async_trait;
use gapscan_ai::{Enhancer, EnhancementTask, EnhancerRegistry};
use gapscan_core::{
    Asset, AssetId, AssetRepository, FlowId, FlowResolver, Gap, GapScanConfig, GapScanError,
    GapStore, PersistedGap, Result, TenantId,
};
use gapscan_engine::{GapAnalysisService, CATALOG};
use gapscan_store::{
    MemoryDistributedLock, MemoryGapStore, MemoryPatternStore, MemoryProgressChannel,
};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use uuid::Uuid;

pub const FLOW_REF: &str = "lifecycle-42";

pub fn tenant() -> TenantId {
    TenantId::from("acme")
}

/// An asset with every catalog attribute populated; tests knock out the
/// fields they want gaps for.
pub fn fully_populated_asset(name: &str) -> Asset {
    let mut attributes = HashMap::new();
    for attr in CATALOG {
        attributes.insert(attr.name.to_string(), json!("known-value"));
    }
    Asset {
        id: Uuid::new_v4(),
        name: name.into(),
        asset_type: "vm".into(),
        attributes,
        custom_attributes: HashMap::new(),
    }
}

pub fn asset_missing(name: &str, fields: &[&str]) -> Asset {
    let mut asset = fully_populated_asset(name);
    for field in fields {
        asset.attributes.remove(*field);
    }
    asset
}

pub struct StaticFlowResolver {
    flows: HashMap<String, FlowId>,
}

impl StaticFlowResolver {
    /// Maps both the lifecycle reference and the canonical id to `flow_id`.
    pub fn with_flow(flow_ref: &str, flow_id: FlowId) -> Self {
        let mut flows = HashMap::new();
        flows.insert(flow_ref.to_string(), flow_id);
        flows.insert(flow_id.to_string(), flow_id);
        Self { flows }
    }
}

#[async_trait]
impl FlowResolver for StaticFlowResolver {
    async fn resolve(&self, flow_ref: &str) -> Result<FlowId> {
        self.flows
            .get(flow_ref)
            .copied()
            .ok_or_else(|| GapScanError::FlowNotFound(flow_ref.to_string()))
    }
}

pub struct InMemoryAssets {
    assets: Vec<Asset>,
}

impl InMemoryAssets {
    pub fn new(assets: Vec<Asset>) -> Self {
        Self { assets }
    }
}

#[async_trait]
impl AssetRepository for InMemoryAssets {
    async fn load(&self, ids: &[AssetId], _tenant: &TenantId) -> Result<Vec<Asset>> {
        Ok(self
            .assets
            .iter()
            .filter(|a| ids.contains(&a.id))
            .cloned()
            .collect())
    }
}

/// Builds the enhancer payload a well-behaved model would return for the
/// task's gaps, wrapped in prose to exercise tolerant extraction.
pub fn enhanced_payload_for(gaps: &[Gap]) -> String {
    let mut buckets: HashMap<&str, Vec<Value>> = HashMap::from([
        ("critical", Vec::new()),
        ("high", Vec::new()),
        ("medium", Vec::new()),
        ("low", Vec::new()),
    ]);
    for gap in gaps {
        let item = json!({
            "asset_id": gap.asset_id,
            "field_name": gap.field_name,
            "gap_type": gap.gap_type,
            "priority": gap.priority,
            "gap_category": gap.gap_category,
            "description": format!("{} needs attention", gap.field_name),
            "impact_on_strategy": "Strategy selection is blocked without this",
            "suggested_resolution": "Ask the infrastructure owner",
            "confidence_score": 0.9,
            "ai_suggestions": ["Check the CMDB", "Interview the application team"],
        });
        buckets
            .get_mut(gap.priority.as_str())
            .expect("known priority")
            .push(item);
    }
    let payload = json!({
        "gaps": {
            "critical": buckets["critical"],
            "high": buckets["high"],
            "medium": buckets["medium"],
            "low": buckets["low"],
        }
    });
    format!("Here is my analysis.\n```json\n{}\n```\nDone.", payload)
}

/// Sequence-scripted enhancer: the first `fail_first` calls fail, every
/// later call echoes the task's gaps back enhanced. Optional per-call
/// delay for timeout tests.
pub struct ScriptedEnhancer {
    pub calls: Arc<AtomicUsize>,
    pub fail_first: usize,
    pub delay: Option<Duration>,
}

impl ScriptedEnhancer {
    pub fn well_behaved() -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_first: 0,
            delay: None,
        }
    }

    pub fn failing_first(n: usize) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_first: n,
            delay: None,
        }
    }

    pub fn hanging(delay: Duration) -> Self {
        Self {
            calls: Arc::new(AtomicUsize::new(0)),
            fail_first: 0,
            delay: Some(delay),
        }
    }
}

#[async_trait]
impl Enhancer for ScriptedEnhancer {
    async fn execute(&self, task: &EnhancementTask) -> Result<String> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if call < self.fail_first {
            return Err(GapScanError::Agent("scripted failure".into()));
        }
        Ok(enhanced_payload_for(&task.gaps))
    }
}

/// Store whose writes always fail, for persistence accounting tests.
pub struct FailingGapStore;

#[async_trait]
impl GapStore for FailingGapStore {
    async fn upsert(&self, _gap: &Gap) -> Result<PersistedGap> {
        Err(GapScanError::Persistence("write refused".into()))
    }
}

/// Enhancer that returns non-JSON prose.
pub struct GarbageEnhancer;

#[async_trait]
impl Enhancer for GarbageEnhancer {
    async fn execute(&self, _task: &EnhancementTask) -> Result<String> {
        Ok("I could not produce structured output, sorry.".into())
    }
}

/// Enhancer that signals when a call starts and blocks until released,
/// for lock-exclusion tests.
pub struct BlockingEnhancer {
    pub started: Arc<Notify>,
    pub release: Arc<Notify>,
}

#[async_trait]
impl Enhancer for BlockingEnhancer {
    async fn execute(&self, task: &EnhancementTask) -> Result<String> {
        self.started.notify_one();
        self.release.notified().await;
        Ok(enhanced_payload_for(&task.gaps))
    }
}

pub fn registry_for(enhancer: Arc<dyn Enhancer>) -> Arc<EnhancerRegistry> {
    Arc::new(EnhancerRegistry::new(Box::new(move |_| {
        Ok(enhancer.clone())
    })))
}

/// Registry whose factory must never run; proves the enhancer is not
/// contacted on short-circuit paths.
pub fn untouchable_registry() -> Arc<EnhancerRegistry> {
    Arc::new(EnhancerRegistry::new(Box::new(|_| {
        panic!("enhancer must not be contacted")
    })))
}

pub struct Harness {
    pub service: Arc<GapAnalysisService>,
    pub store: MemoryGapStore,
    pub progress: MemoryProgressChannel,
    pub patterns: MemoryPatternStore,
    pub flow_id: FlowId,
}

pub fn harness(
    assets: Vec<Asset>,
    registry: Arc<EnhancerRegistry>,
    config: GapScanConfig,
) -> Harness {
    let flow_id = Uuid::new_v4();
    let store = MemoryGapStore::new();
    let progress = MemoryProgressChannel::default();
    let patterns = MemoryPatternStore::new();

    let service = GapAnalysisService::new(
        Arc::new(StaticFlowResolver::with_flow(FLOW_REF, flow_id)),
        Arc::new(InMemoryAssets::new(assets)),
        Arc::new(store.clone()),
        Arc::new(MemoryDistributedLock::new()),
        Arc::new(progress.clone()),
        Arc::new(patterns.clone()),
        registry,
        config,
    );

    Harness {
        service: Arc::new(service),
        store,
        progress,
        patterns,
        flow_id,
    }
}
