use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use gapscan_core::{FlowId, Gap, GapKey, GapStore, PersistedGap, Result};
use std::sync::Arc;
use uuid::Uuid;

/// In-memory gap store with the upsert semantics the engine relies on:
/// a single conditional write per gap, keyed by `GapKey`, so two concurrent
/// scans of the same asset never produce duplicate rows.
#[derive(Debug, Default, Clone)]
pub struct MemoryGapStore {
    rows: Arc<DashMap<GapKey, PersistedGap>>,
}

impl MemoryGapStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn all(&self) -> Vec<PersistedGap> {
        self.rows.iter().map(|r| r.value().clone()).collect()
    }

    pub fn for_flow(&self, flow_id: FlowId) -> Vec<PersistedGap> {
        self.rows
            .iter()
            .filter(|r| r.value().gap.flow_id == flow_id)
            .map(|r| r.value().clone())
            .collect()
    }

    pub fn get(&self, key: &GapKey) -> Option<PersistedGap> {
        self.rows.get(key).map(|r| r.value().clone())
    }
}

#[async_trait]
impl GapStore for MemoryGapStore {
    async fn upsert(&self, gap: &Gap) -> Result<PersistedGap> {
        let now = Utc::now();
        let row = self
            .rows
            .entry(gap.key())
            .and_modify(|row| {
                // Gaps may move between flows; identity stays put.
                row.gap.flow_id = gap.flow_id;
                row.gap.priority = gap.priority;
                row.gap.gap_category = gap.gap_category.clone();
                row.gap.description = gap.description.clone();
                row.gap.impact_on_strategy = gap.impact_on_strategy.clone();
                row.gap.suggested_resolution = gap.suggested_resolution.clone();
                row.gap.confidence_score = gap.confidence_score;
                row.gap.ai_suggestions = gap.ai_suggestions.clone();
                row.updated_at = now;
                // resolution_status and created_at are never touched here.
            })
            .or_insert_with(|| PersistedGap {
                id: Uuid::new_v4(),
                gap: gap.clone(),
                created_at: now,
                updated_at: now,
            });
        Ok(row.value().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gapscan_core::{GapPriority, GapType, ResolutionStatus};

    fn gap(flow_id: FlowId, field: &str) -> Gap {
        Gap {
            asset_id: Uuid::nil(),
            flow_id,
            field_name: field.into(),
            gap_type: GapType::MissingField,
            gap_category: "infrastructure".into(),
            priority: GapPriority::Critical,
            description: "missing".into(),
            impact_on_strategy: None,
            suggested_resolution: None,
            confidence_score: None,
            ai_suggestions: None,
            resolution_status: ResolutionStatus::Pending,
        }
    }

    #[tokio::test]
    async fn redetection_updates_instead_of_duplicating() {
        let store = MemoryGapStore::new();
        let flow_a = Uuid::new_v4();
        let flow_b = Uuid::new_v4();

        let first = store.upsert(&gap(flow_a, "os")).await.unwrap();

        let mut redetected = gap(flow_b, "os");
        redetected.priority = GapPriority::High;
        redetected.confidence_score = Some(0.9);
        let second = store.upsert(&redetected).await.unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(first.id, second.id);
        assert_eq!(second.gap.flow_id, flow_b);
        assert_eq!(second.gap.priority, GapPriority::High);
        assert_eq!(second.gap.confidence_score, Some(0.9));
        assert_eq!(second.created_at, first.created_at);
    }

    #[tokio::test]
    async fn resolution_status_survives_redetection() {
        let store = MemoryGapStore::new();
        let flow_id = Uuid::new_v4();
        let first = store.upsert(&gap(flow_id, "os")).await.unwrap();

        // An external workflow resolves the gap between two scans.
        store
            .rows
            .get_mut(&first.gap.key())
            .unwrap()
            .gap
            .resolution_status = ResolutionStatus::Resolved;

        let second = store.upsert(&gap(flow_id, "os")).await.unwrap();
        assert_eq!(second.gap.resolution_status, ResolutionStatus::Resolved);
    }

    #[tokio::test]
    async fn distinct_gap_types_are_distinct_rows() {
        let store = MemoryGapStore::new();
        let flow_id = Uuid::new_v4();
        store.upsert(&gap(flow_id, "os")).await.unwrap();

        let mut partial = gap(flow_id, "os");
        partial.gap_type = GapType::PartialField;
        store.upsert(&partial).await.unwrap();

        assert_eq!(store.len(), 2);
    }
}
