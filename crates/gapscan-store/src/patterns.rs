use async_trait::async_trait;
use gapscan_core::{EnhancementPattern, PatternStore, Result};
use parking_lot::RwLock;
use std::sync::Arc;

/// In-memory learning store. Lookup matches on asset type and field name;
/// newest patterns win when more exist than the limit.
#[derive(Debug, Default, Clone)]
pub struct MemoryPatternStore {
    patterns: Arc<RwLock<Vec<EnhancementPattern>>>,
}

impl MemoryPatternStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.patterns.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.read().is_empty()
    }
}

#[async_trait]
impl PatternStore for MemoryPatternStore {
    async fn similar_patterns(
        &self,
        asset_type: &str,
        field_names: &[String],
        limit: usize,
    ) -> Result<Vec<EnhancementPattern>> {
        let patterns = self.patterns.read();
        let mut matches: Vec<EnhancementPattern> = patterns
            .iter()
            .filter(|p| p.asset_type == asset_type && field_names.contains(&p.field_name))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.recorded_at.cmp(&a.recorded_at));
        matches.truncate(limit);
        Ok(matches)
    }

    async fn record(&self, pattern: EnhancementPattern) -> Result<()> {
        self.patterns.write().push(pattern);
        Ok(())
    }
}
