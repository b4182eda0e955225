use chrono::Utc;
use gapscan_core::{EnhancementProgress, FlowId, ProgressChannel};
use std::sync::Arc;
use tracing::warn;

/// Poll key under which backends expose tier-2 progress.
pub fn progress_key(flow_id: FlowId) -> String {
    format!("gap_enhancement_progress:{}", flow_id)
}

/// Publishes `(processed, total, current_asset)` after each asset.
/// Publishing is best-effort: a failing channel is logged, never fatal.
pub struct ProgressReporter {
    channel: Arc<dyn ProgressChannel>,
    flow_id: FlowId,
    total: usize,
}

impl ProgressReporter {
    pub fn new(channel: Arc<dyn ProgressChannel>, flow_id: FlowId, total: usize) -> Self {
        Self {
            channel,
            flow_id,
            total,
        }
    }

    pub async fn report(&self, processed: usize, current_asset: Option<&str>) {
        let progress = EnhancementProgress {
            flow_id: self.flow_id,
            processed,
            total: self.total,
            current_asset: current_asset.map(str::to_string),
            updated_at: Utc::now(),
        };
        if let Err(e) = self.channel.publish(self.flow_id, progress).await {
            warn!(flow_id = %self.flow_id, error = %e, "failed to publish enhancement progress");
        }
    }
}
