use crate::breaker::BatchCircuitBreaker;
use crate::progress::ProgressReporter;
use chrono::Utc;
use gapscan_core::{
    AnalysisSummary, Asset, AssetId, DistributedLock, EnhancementConfig, EnhancementPattern,
    FailedAsset, FailureCode, FlowId, Gap, GapReport, GapScanError, GapStore, PatternStore,
    ProgressChannel, Result, TenantId,
};
use gapscan_ai::{
    extract_gaps_json, parse_enhanced_gaps, ContextFilter, EnhancementTask, EnhancerRegistry,
    OutputValidator, PooledEnhancer,
};
use metrics::counter;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Lock key guarding one flow's enhancement run against other workers.
pub fn enhancement_lock_key(flow_id: FlowId) -> String {
    format!("gap_enhancement_lock:{}", flow_id)
}

/// Per-invocation state. Lives for one `enhance` call and is never
/// persisted; only its gap outputs are.
#[derive(Default)]
struct EnhancementRun {
    enhanced: Vec<Gap>,
    failed_assets: Vec<FailedAsset>,
    gaps_persisted: usize,
}

struct AssetOutcome {
    enhanced: Vec<Gap>,
    persisted: usize,
    persist_failed: bool,
}

/// Tier 2: drives one asset at a time through context filtering, the
/// pooled enhancer, output validation and persistence. Strictly
/// sequential: the enhancer handle is a shared conversational resource and
/// is not safe for concurrent use; correctness wins over throughput here.
pub struct EnhancementOrchestrator {
    registry: Arc<EnhancerRegistry>,
    lock: Arc<dyn DistributedLock>,
    store: Arc<dyn GapStore>,
    progress: Arc<dyn ProgressChannel>,
    patterns: Arc<dyn PatternStore>,
    filter: ContextFilter,
    config: EnhancementConfig,
}

impl EnhancementOrchestrator {
    pub fn new(
        registry: Arc<EnhancerRegistry>,
        lock: Arc<dyn DistributedLock>,
        store: Arc<dyn GapStore>,
        progress: Arc<dyn ProgressChannel>,
        patterns: Arc<dyn PatternStore>,
        filter: ContextFilter,
        config: EnhancementConfig,
    ) -> Self {
        Self {
            registry,
            lock,
            store,
            progress,
            patterns,
            filter,
            config,
        }
    }

    /// Run the enhancement batch for one flow. Fails fast with
    /// `ConcurrentEnhancement` when another worker holds the flow's lock;
    /// an unreachable lock backend degrades to an unlocked run.
    pub async fn enhance(
        &self,
        flow_id: FlowId,
        tenant: &TenantId,
        assets: &[Asset],
        gaps: Vec<Gap>,
    ) -> Result<GapReport> {
        let lock_key = enhancement_lock_key(flow_id);
        let ttl = Duration::from_secs(self.config.lock_ttl_secs);

        let locked = match self.lock.try_acquire(&lock_key, ttl).await {
            Ok(true) => true,
            Ok(false) => return Err(GapScanError::ConcurrentEnhancement(flow_id)),
            Err(e) => {
                warn!(flow_id = %flow_id, error = %e, "lock backend unavailable, proceeding without lock");
                false
            }
        };

        let result = self.run(flow_id, tenant, assets, gaps).await;

        // Release must happen on every exit path, success or failure.
        if locked {
            if let Err(e) = self.lock.release(&lock_key).await {
                warn!(flow_id = %flow_id, error = %e, "failed to release enhancement lock");
            }
        }

        result
    }

    async fn run(
        &self,
        flow_id: FlowId,
        tenant: &TenantId,
        assets: &[Asset],
        gaps: Vec<Gap>,
    ) -> Result<GapReport> {
        // One pooled handle for the entire run. Recreating it per asset
        // cost the predecessor system ~94% of its throughput.
        let handle = self.registry.get_or_create(tenant)?;

        let mut gaps_by_asset: HashMap<AssetId, Vec<Gap>> = HashMap::new();
        for gap in gaps {
            gaps_by_asset.entry(gap.asset_id).or_default().push(gap);
        }
        let asset_index: HashMap<AssetId, &Asset> = assets.iter().map(|a| (a.id, a)).collect();

        let total = gaps_by_asset.len();
        let reporter = ProgressReporter::new(self.progress.clone(), flow_id, total);
        let mut breaker = BatchCircuitBreaker::new(
            self.config.breaker_min_attempts,
            self.config.breaker_failure_threshold,
        );
        let mut run = EnhancementRun::default();

        info!(flow_id = %flow_id, assets = total, "starting tier-2 enhancement");

        for (asset_id, asset_gaps) in gaps_by_asset {
            // Tripped breaker stops the loop; unprocessed assets are left
            // untouched, not marked failed.
            if breaker.is_tripped() {
                break;
            }

            let Some(asset) = asset_index.get(&asset_id).copied() else {
                warn!(asset_id = %asset_id, "gaps reference an asset outside the loaded set, skipping");
                continue;
            };

            match self.process_asset(&handle, flow_id, asset, &asset_gaps).await {
                Ok(outcome) => {
                    breaker.record_success();
                    counter!("gapscan_assets_enhanced").increment(1);
                    if outcome.persist_failed {
                        run.failed_assets.push(FailedAsset {
                            asset_id,
                            asset_name: asset.name.clone(),
                            error_code: FailureCode::PersistenceError,
                            detail: Some("gap persistence failed for this asset".into()),
                        });
                    } else {
                        run.gaps_persisted += outcome.persisted;
                    }
                    run.enhanced.extend(outcome.enhanced);
                }
                Err((error_code, detail)) => {
                    breaker.record_failure();
                    counter!("gapscan_assets_failed").increment(1);
                    warn!(asset = %asset.name, code = %error_code, detail = %detail, "asset enhancement failed");
                    run.failed_assets.push(FailedAsset {
                        asset_id,
                        asset_name: asset.name.clone(),
                        error_code,
                        detail: Some(detail),
                    });
                }
            }

            reporter
                .report(breaker.attempts(), Some(asset.name.as_str()))
                .await;
        }

        let summary = AnalysisSummary {
            total_gaps: run.enhanced.len(),
            assets_analyzed: breaker.processed(),
            assets_failed: run.failed_assets.len(),
            gaps_persisted: run.gaps_persisted,
            failed_assets: if run.failed_assets.is_empty() {
                None
            } else {
                Some(run.failed_assets)
            },
        };
        info!(
            flow_id = %flow_id,
            analyzed = summary.assets_analyzed,
            failed = summary.assets_failed,
            gaps = summary.total_gaps,
            "tier-2 enhancement finished"
        );
        Ok(GapReport::from_gaps(run.enhanced, summary))
    }

    async fn process_asset(
        &self,
        handle: &PooledEnhancer,
        flow_id: FlowId,
        asset: &Asset,
        asset_gaps: &[Gap],
    ) -> std::result::Result<AssetOutcome, (FailureCode, String)> {
        let context = self.filter.build(asset);

        // Prior patterns are a best-effort enrichment; a failing learning
        // store never aborts the asset.
        let field_names: Vec<String> =
            asset_gaps.iter().map(|g| g.field_name.clone()).collect();
        let prior_patterns = match self
            .patterns
            .similar_patterns(&asset.asset_type, &field_names, self.config.max_patterns)
            .await
        {
            Ok(patterns) => patterns,
            Err(e) => {
                warn!(asset = %asset.name, error = %e, "learning store unavailable, continuing without patterns");
                Vec::new()
            }
        };

        let task = EnhancementTask {
            flow_id,
            asset: context,
            gaps: asset_gaps.to_vec(),
            prior_patterns,
        };

        let timeout = Duration::from_secs(self.config.per_asset_timeout_secs);
        let raw = match tokio::time::timeout(timeout, handle.execute(&task)).await {
            Err(_) => {
                return Err((
                    FailureCode::AgentTimeout,
                    format!("no response within {}s", self.config.per_asset_timeout_secs),
                ))
            }
            Ok(Err(e)) => return Err((FailureCode::AgentError, e.to_string())),
            Ok(Ok(raw)) => raw,
        };

        let Some(payload) = extract_gaps_json(&raw) else {
            return Err((
                FailureCode::InvalidOutput,
                "no usable JSON structure in enhancer output".into(),
            ));
        };

        // Validation errors are logged, not fatal; proceed with whatever
        // gaps were returned.
        let validation = OutputValidator::validate(&payload, asset_gaps);
        for error in &validation.errors {
            warn!(asset = %asset.name, "enhancer output validation error: {}", error);
        }
        for warning in &validation.warnings {
            debug!(asset = %asset.name, "enhancer output reconciliation: {}", warning);
        }

        let enhanced = parse_enhanced_gaps(&payload, flow_id);

        let mut persisted = 0;
        let mut persist_failed = false;
        if self.config.persist {
            for gap in &enhanced {
                match self.store.upsert(gap).await {
                    Ok(_) => persisted += 1,
                    Err(e) => {
                        warn!(asset = %asset.name, error = %e, "gap persistence failed");
                        persist_failed = true;
                        break;
                    }
                }
            }
        }
        if !persist_failed {
            counter!("gapscan_gaps_persisted").increment(persisted as u64);
        }

        self.record_patterns(asset, &enhanced).await;

        Ok(AssetOutcome {
            enhanced,
            persisted,
            persist_failed,
        })
    }

    async fn record_patterns(&self, asset: &Asset, enhanced: &[Gap]) {
        for gap in enhanced {
            let Some(resolution) = &gap.suggested_resolution else {
                continue;
            };
            let pattern = EnhancementPattern {
                asset_type: asset.asset_type.clone(),
                field_name: gap.field_name.clone(),
                suggested_resolution: resolution.clone(),
                confidence_score: gap.confidence_score,
                recorded_at: Utc::now(),
            };
            if let Err(e) = self.patterns.record(pattern).await {
                debug!(asset = %asset.name, error = %e, "pattern recording failed");
            }
        }
    }
}
