use crate::orchestrator::EnhancementOrchestrator;
use crate::scanner::ProgrammaticScanner;
use gapscan_core::{
    AnalysisSummary, Asset, AssetId, AssetRepository, AutomationTier, DistributedLock,
    EnhancementProgress, FlowId, FlowResolver, GapReport, GapScanConfig, GapScanError, GapStore,
    PatternStore, ProgressChannel, Result, TenantId,
};
use gapscan_ai::{ContextFilter, EnhancerRegistry};
use std::sync::Arc;
use tracing::{info, warn};

/// Public facade over the gap analysis engine. Resolves the flow, loads
/// the tenant's assets, runs the requested tier and returns a unified
/// report. Collaborators are held by reference; there is no shared mutable
/// state beyond what they encapsulate.
pub struct GapAnalysisService {
    resolver: Arc<dyn FlowResolver>,
    assets: Arc<dyn AssetRepository>,
    store: Arc<dyn GapStore>,
    progress: Arc<dyn ProgressChannel>,
    scanner: ProgrammaticScanner,
    orchestrator: EnhancementOrchestrator,
    config: GapScanConfig,
}

impl GapAnalysisService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        resolver: Arc<dyn FlowResolver>,
        assets: Arc<dyn AssetRepository>,
        store: Arc<dyn GapStore>,
        lock: Arc<dyn DistributedLock>,
        progress: Arc<dyn ProgressChannel>,
        patterns: Arc<dyn PatternStore>,
        registry: Arc<EnhancerRegistry>,
        config: GapScanConfig,
    ) -> Self {
        let orchestrator = EnhancementOrchestrator::new(
            registry,
            lock,
            store.clone(),
            progress.clone(),
            patterns,
            ContextFilter::new(config.context.clone()),
            config.enhancement.clone(),
        );
        Self {
            resolver,
            assets,
            store,
            progress,
            scanner: ProgrammaticScanner::new(),
            orchestrator,
            config,
        }
    }

    /// Analyze the selected assets for one flow.
    ///
    /// Only `FlowNotFound` and `ConcurrentEnhancement` surface as errors;
    /// every other condition resolves into the returned report.
    pub async fn analyze(
        &self,
        flow_ref: &str,
        selected_asset_ids: &[AssetId],
        tier: AutomationTier,
        tenant: &TenantId,
    ) -> Result<GapReport> {
        let flow_id = self.resolver.resolve(flow_ref).await?;

        let assets = match self.assets.load(selected_asset_ids, tenant).await {
            Ok(assets) => assets,
            Err(e) => {
                warn!(flow_id = %flow_id, error = %e, "asset loading failed");
                return Ok(GapReport::failure(e.to_string()));
            }
        };

        // Zero assets is an explicit empty result, not an error; the
        // enhancer is never contacted.
        if assets.is_empty() {
            info!(flow_id = %flow_id, "no assets in scope, returning empty result");
            return Ok(GapReport::empty());
        }

        match tier {
            AutomationTier::Tier1 => Ok(self.run_tier1(flow_id, &assets).await),
            AutomationTier::Tier2 => {
                let gaps = self.scanner.scan(&assets, flow_id);
                if gaps.is_empty() {
                    return Ok(GapReport::from_gaps(
                        Vec::new(),
                        AnalysisSummary {
                            assets_analyzed: assets.len(),
                            ..AnalysisSummary::default()
                        },
                    ));
                }
                match self
                    .orchestrator
                    .enhance(flow_id, tenant, &assets, gaps)
                    .await
                {
                    Ok(report) => Ok(report),
                    Err(e @ GapScanError::ConcurrentEnhancement(_)) => Err(e),
                    Err(e) => {
                        // Tier 2 unavailable before any asset was attempted:
                        // fall back to the deterministic scan.
                        warn!(flow_id = %flow_id, error = %e, "tier 2 unavailable, falling back to tier 1");
                        Ok(self.run_tier1(flow_id, &assets).await)
                    }
                }
            }
        }
    }

    /// Current enhancement progress for a flow, if fresh.
    pub async fn progress(&self, flow_id: FlowId) -> Result<Option<EnhancementProgress>> {
        self.progress.fetch(flow_id).await
    }

    async fn run_tier1(&self, flow_id: FlowId, assets: &[Asset]) -> GapReport {
        let gaps = self.scanner.scan(assets, flow_id);
        let mut persisted = 0;
        if self.config.enhancement.persist {
            for gap in &gaps {
                match self.store.upsert(gap).await {
                    Ok(_) => persisted += 1,
                    Err(e) => {
                        warn!(field = %gap.field_name, error = %e, "tier-1 gap persistence failed")
                    }
                }
            }
        }
        let summary = AnalysisSummary {
            total_gaps: gaps.len(),
            assets_analyzed: assets.len(),
            assets_failed: 0,
            gaps_persisted: persisted,
            failed_assets: None,
        };
        GapReport::from_gaps(gaps, summary)
    }
}
