mod common;

use common::*;
use gapscan_core::{AutomationTier, FailureCode, GapScanConfig, GapScanError};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

#[tokio::test]
async fn well_behaved_enhancer_enriches_and_persists_every_gap() {
    let assets = vec![
        asset_missing("web-01", &["os"]),
        asset_missing("db-01", &["rpo_minutes"]),
    ];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let enhancer = ScriptedEnhancer::well_behaved();
    let calls = enhancer.calls.clone();
    let h = harness(
        assets,
        registry_for(Arc::new(enhancer)),
        GapScanConfig::default(),
    );

    let report = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(report.summary.total_gaps, 2);
    assert_eq!(report.summary.assets_analyzed, 2);
    assert_eq!(report.summary.assets_failed, 0);
    assert_eq!(report.summary.gaps_persisted, 2);

    for gaps in report.gaps.values() {
        for gap in gaps {
            assert_eq!(gap.confidence_score, Some(0.9));
            assert!(gap.suggested_resolution.is_some());
            assert!(gap
                .ai_suggestions
                .as_ref()
                .is_some_and(|s| !s.is_empty()));
        }
    }

    assert_eq!(h.store.len(), 2);
    for row in h.store.all() {
        assert_eq!(row.gap.confidence_score, Some(0.9));
    }
}

#[tokio::test]
async fn progress_and_patterns_are_published_during_a_run() {
    let assets = vec![
        asset_missing("web-01", &["os"]),
        asset_missing("db-01", &["database_engine"]),
    ];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let h = harness(
        assets,
        registry_for(Arc::new(ScriptedEnhancer::well_behaved())),
        GapScanConfig::default(),
    );

    h.service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    let progress = h
        .service
        .progress(h.flow_id)
        .await
        .unwrap()
        .expect("progress published");
    assert_eq!(progress.total, 2);
    assert_eq!(progress.processed, 2);
    assert!(progress.current_asset.is_some());

    // Every enhanced gap carried a suggested resolution, so each feeds
    // the learning store.
    assert_eq!(h.patterns.len(), 2);
}

#[tokio::test]
async fn two_leading_failures_trip_the_breaker_and_spare_the_rest() {
    let assets = vec![
        asset_missing("web-01", &["os"]),
        asset_missing("web-02", &["os"]),
        asset_missing("db-01", &["os"]),
        asset_missing("db-02", &["os"]),
    ];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let enhancer = ScriptedEnhancer::failing_first(2);
    let calls = enhancer.calls.clone();
    let h = harness(
        assets,
        registry_for(Arc::new(enhancer)),
        GapScanConfig::default(),
    );

    let report = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    // Two failures out of two attempts exceeds the threshold; the
    // remaining two assets are never attempted.
    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 2);
    assert_eq!(report.summary.assets_failed, 2);
    assert_eq!(report.summary.assets_analyzed, 0);
    assert_eq!(report.summary.total_gaps, 0);
    let failed = report.summary.failed_assets.as_ref().unwrap();
    assert!(failed
        .iter()
        .all(|f| f.error_code == FailureCode::AgentError));
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn single_failure_in_a_batch_does_not_trip_the_breaker() {
    let assets = vec![
        asset_missing("web-01", &["os"]),
        asset_missing("web-02", &["os"]),
        asset_missing("db-01", &["os"]),
    ];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let enhancer = ScriptedEnhancer::failing_first(1);
    let calls = enhancer.calls.clone();
    let h = harness(
        assets,
        registry_for(Arc::new(enhancer)),
        GapScanConfig::default(),
    );

    let report = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    assert_eq!(calls.load(std::sync::atomic::Ordering::SeqCst), 3);
    assert_eq!(report.summary.assets_analyzed, 2);
    assert_eq!(report.summary.assets_failed, 1);
    assert_eq!(report.summary.total_gaps, 2);
    assert_eq!(h.store.len(), 2);
}

#[tokio::test]
async fn slow_enhancer_is_cut_off_at_the_per_asset_deadline() {
    let assets = vec![asset_missing("web-01", &["os"])];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let mut config = GapScanConfig::default();
    config.enhancement.per_asset_timeout_secs = 1;
    let h = harness(
        assets,
        registry_for(Arc::new(ScriptedEnhancer::hanging(Duration::from_secs(
            30,
        )))),
        config,
    );

    let report = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    assert_eq!(report.summary.assets_failed, 1);
    let failed = report.summary.failed_assets.as_ref().unwrap();
    assert_eq!(failed[0].error_code, FailureCode::AgentTimeout);
    assert_eq!(report.summary.total_gaps, 0);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn unparseable_output_fails_the_asset_without_persisting() {
    let assets = vec![asset_missing("web-01", &["os"])];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let h = harness(
        assets,
        registry_for(Arc::new(GarbageEnhancer)),
        GapScanConfig::default(),
    );

    let report = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    assert_eq!(report.summary.assets_failed, 1);
    let failed = report.summary.failed_assets.as_ref().unwrap();
    assert_eq!(failed[0].error_code, FailureCode::InvalidOutput);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn concurrent_enhancement_of_the_same_flow_is_rejected() {
    let assets = vec![asset_missing("web-01", &["os"])];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let started = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let h = harness(
        assets,
        registry_for(Arc::new(BlockingEnhancer {
            started: started.clone(),
            release: release.clone(),
        })),
        GapScanConfig::default(),
    );

    let service = h.service.clone();
    let first_ids = ids.clone();
    let t = tenant();
    let first = tokio::spawn(async move {
        service
            .analyze(FLOW_REF, &first_ids, AutomationTier::Tier2, &t)
            .await
    });

    // Wait until the first run holds the lock inside the enhancer call.
    started.notified().await;

    let err = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap_err();
    assert!(matches!(err, GapScanError::ConcurrentEnhancement(id) if id == h.flow_id));

    release.notify_one();
    let report = first.await.unwrap().unwrap();
    assert_eq!(report.summary.total_gaps, 1);

    // Lock released on completion: a later run goes through.
    release.notify_one();
    let rerun = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();
    assert_eq!(rerun.summary.total_gaps, 1);
}

#[tokio::test]
async fn persistence_failure_is_accounted_without_tripping_the_breaker() {
    let assets = vec![
        asset_missing("web-01", &["os"]),
        asset_missing("db-01", &["os"]),
    ];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let flow_id = uuid::Uuid::new_v4();
    let service = gapscan_engine::GapAnalysisService::new(
        Arc::new(StaticFlowResolver::with_flow(FLOW_REF, flow_id)),
        Arc::new(InMemoryAssets::new(assets)),
        Arc::new(FailingGapStore),
        Arc::new(gapscan_store::MemoryDistributedLock::new()),
        Arc::new(gapscan_store::MemoryProgressChannel::default()),
        Arc::new(gapscan_store::MemoryPatternStore::new()),
        registry_for(Arc::new(ScriptedEnhancer::well_behaved())),
        GapScanConfig::default(),
    );

    let report = service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    // Enhancement itself succeeded, so the breaker sees two successes;
    // the assets are still surfaced as failed with a persistence code.
    assert_eq!(report.summary.assets_analyzed, 2);
    assert_eq!(report.summary.assets_failed, 2);
    assert_eq!(report.summary.gaps_persisted, 0);
    assert_eq!(report.summary.total_gaps, 2);
    let failed = report.summary.failed_assets.as_ref().unwrap();
    assert!(failed
        .iter()
        .all(|f| f.error_code == FailureCode::PersistenceError));
}

#[tokio::test]
async fn tier2_with_no_gaps_skips_the_enhancer() {
    let assets = vec![fully_populated_asset("web-01")];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let h = harness(assets, untouchable_registry(), GapScanConfig::default());

    let report = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    assert_eq!(report.summary.total_gaps, 0);
    assert_eq!(report.summary.assets_analyzed, 1);
    assert!(h.store.is_empty());
}

#[tokio::test]
async fn enhancer_setup_failure_falls_back_to_tier1() {
    let assets = vec![asset_missing("web-01", &["os"])];
    let ids: Vec<_> = assets.iter().map(|a| a.id).collect();
    let h = harness(
        assets,
        Arc::new(gapscan_ai::EnhancerRegistry::new(Box::new(|_| {
            Err(GapScanError::Agent("provider unreachable".into()))
        }))),
        GapScanConfig::default(),
    );

    let report = h
        .service
        .analyze(FLOW_REF, &ids, AutomationTier::Tier2, &tenant())
        .await
        .unwrap();

    // Deterministic results still come back, just without enrichment.
    assert_eq!(report.summary.total_gaps, 1);
    for gaps in report.gaps.values() {
        for gap in gaps {
            assert!(gap.confidence_score.is_none());
        }
    }
    assert_eq!(h.store.len(), 1);
}
