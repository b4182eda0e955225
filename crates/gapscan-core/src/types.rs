use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use uuid::Uuid;

pub type AssetId = Uuid;
pub type FlowId = Uuid;
pub type GapId = Uuid;

/// Tenant scope for every engine operation. Assets, enhancer handles and
/// persisted gaps are all partitioned by tenant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TenantId(pub String);

impl TenantId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TenantId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Discovered asset, read-only to the engine. Owned by the asset catalog
/// service; the engine never mutates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Asset {
    pub id: AssetId,
    pub name: String,
    pub asset_type: String,
    #[serde(default)]
    pub attributes: HashMap<String, Value>,
    #[serde(default)]
    pub custom_attributes: HashMap<String, Value>,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "snake_case")]
pub enum GapPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl GapPriority {
    pub const ALL: [GapPriority; 4] = [
        GapPriority::Critical,
        GapPriority::High,
        GapPriority::Medium,
        GapPriority::Low,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            GapPriority::Critical => "critical",
            GapPriority::High => "high",
            GapPriority::Medium => "medium",
            GapPriority::Low => "low",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "critical" => Some(GapPriority::Critical),
            "high" => Some(GapPriority::High),
            "medium" => Some(GapPriority::Medium),
            "low" => Some(GapPriority::Low),
            _ => None,
        }
    }
}

impl fmt::Display for GapPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum GapType {
    MissingField,
    PartialField,
}

impl fmt::Display for GapType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GapType::MissingField => write!(f, "missing_field"),
            GapType::PartialField => write!(f, "partial_field"),
        }
    }
}

/// Lifecycle of a gap. The engine only ever creates `Pending`; the
/// transition to `Resolved` belongs to an external workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Pending,
    Resolved,
}

impl Default for ResolutionStatus {
    fn default() -> Self {
        ResolutionStatus::Pending
    }
}

/// A detected missing or weak data point for an asset relative to the
/// critical-attribute catalog.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Gap {
    pub asset_id: AssetId,
    pub flow_id: FlowId,
    pub field_name: String,
    pub gap_type: GapType,
    pub gap_category: String,
    pub priority: GapPriority,
    pub description: String,
    #[serde(default)]
    pub impact_on_strategy: Option<String>,
    #[serde(default)]
    pub suggested_resolution: Option<String>,
    /// Invariant: `None` or within `[0.0, 1.0]`, never NaN/Infinity.
    #[serde(default)]
    pub confidence_score: Option<f64>,
    /// Non-empty when present.
    #[serde(default)]
    pub ai_suggestions: Option<Vec<String>>,
    #[serde(default)]
    pub resolution_status: ResolutionStatus,
}

impl Gap {
    /// Conflict identity for upserts. `flow_id` is deliberately excluded:
    /// re-detection moves the row between flows instead of duplicating it.
    pub fn key(&self) -> GapKey {
        GapKey {
            asset_id: self.asset_id,
            field_name: self.field_name.clone(),
            gap_type: self.gap_type,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GapKey {
    pub asset_id: AssetId,
    pub field_name: String,
    pub gap_type: GapType,
}

/// A gap as stored, with persistence metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedGap {
    pub id: GapId,
    #[serde(flatten)]
    pub gap: Gap,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AutomationTier {
    #[serde(rename = "tier_1")]
    Tier1,
    #[serde(rename = "tier_2")]
    Tier2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureCode {
    AgentTimeout,
    AgentError,
    InvalidOutput,
    PersistenceError,
}

impl fmt::Display for FailureCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FailureCode::AgentTimeout => "agent_timeout",
            FailureCode::AgentError => "agent_error",
            FailureCode::InvalidOutput => "invalid_output",
            FailureCode::PersistenceError => "persistence_error",
        };
        write!(f, "{}", s)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailedAsset {
    pub asset_id: AssetId,
    pub asset_name: String,
    pub error_code: FailureCode,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisSummary {
    pub total_gaps: usize,
    pub assets_analyzed: usize,
    pub assets_failed: usize,
    pub gaps_persisted: usize,
    #[serde(default)]
    pub failed_assets: Option<Vec<FailedAsset>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    Completed,
    Error,
}

/// Questionnaire generation is a separate collaborator; the engine always
/// returns empty sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Questionnaire {
    pub sections: Vec<Value>,
}

/// Unified result of a gap analysis call, for either tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GapReport {
    pub status: ReportStatus,
    #[serde(default)]
    pub error: Option<String>,
    pub gaps: BTreeMap<GapPriority, Vec<Gap>>,
    pub questionnaire: Questionnaire,
    pub summary: AnalysisSummary,
}

impl GapReport {
    /// Result for a run that loaded zero assets: explicitly empty, not an
    /// error.
    pub fn empty() -> Self {
        Self {
            status: ReportStatus::Completed,
            error: None,
            gaps: BTreeMap::new(),
            questionnaire: Questionnaire::default(),
            summary: AnalysisSummary::default(),
        }
    }

    /// Structured failure result. Callers treat this as a recoverable,
    /// loggable condition, never a crash.
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            status: ReportStatus::Error,
            error: Some(error.into()),
            gaps: BTreeMap::new(),
            questionnaire: Questionnaire::default(),
            summary: AnalysisSummary::default(),
        }
    }

    pub fn from_gaps(gaps: Vec<Gap>, summary: AnalysisSummary) -> Self {
        let mut by_priority: BTreeMap<GapPriority, Vec<Gap>> = BTreeMap::new();
        for gap in gaps {
            by_priority.entry(gap.priority).or_default().push(gap);
        }
        Self {
            status: ReportStatus::Completed,
            error: None,
            gaps: by_priority,
            questionnaire: Questionnaire::default(),
            summary,
        }
    }

    pub fn total_gaps(&self) -> usize {
        self.gaps.values().map(Vec::len).sum()
    }
}

/// Point-in-time progress of a tier-2 run, published for external polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementProgress {
    pub flow_id: FlowId,
    pub processed: usize,
    pub total: usize,
    #[serde(default)]
    pub current_asset: Option<String>,
    pub updated_at: DateTime<Utc>,
}

/// Historical enhancement outcome kept by the learning store and replayed
/// into later prompts for the same asset type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnhancementPattern {
    pub asset_type: String,
    pub field_name: String,
    pub suggested_resolution: String,
    #[serde(default)]
    pub confidence_score: Option<f64>,
    pub recorded_at: DateTime<Utc>,
}
