use crate::catalog::{CriticalAttribute, CATALOG};
use gapscan_core::{Asset, FlowId, Gap, GapType, ResolutionStatus};
use serde_json::Value;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldPresence {
    Missing,
    Blank,
    Populated,
}

/// Tier 1: deterministic comparison of an asset's populated fields against
/// the critical-attribute catalog. No AI, no confidence scores; runs in
/// time proportional to assets x attributes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProgrammaticScanner;

impl ProgrammaticScanner {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, assets: &[Asset], flow_id: FlowId) -> Vec<Gap> {
        let mut gaps = Vec::new();
        for asset in assets {
            for attr in CATALOG {
                match self.presence(asset, attr) {
                    FieldPresence::Populated => {}
                    FieldPresence::Blank => gaps.push(make_gap(
                        asset,
                        attr,
                        flow_id,
                        GapType::PartialField,
                    )),
                    FieldPresence::Missing => gaps.push(make_gap(
                        asset,
                        attr,
                        flow_id,
                        GapType::MissingField,
                    )),
                }
            }
            debug!(asset = %asset.name, "programmatic scan complete");
        }
        gaps
    }

    fn presence(&self, asset: &Asset, attr: &CriticalAttribute) -> FieldPresence {
        let mut best = FieldPresence::Missing;
        for path in attr.field_paths {
            let Some(value) = resolve_path(asset, path) else {
                continue;
            };
            match classify(value) {
                FieldPresence::Populated => return FieldPresence::Populated,
                FieldPresence::Blank => best = FieldPresence::Blank,
                FieldPresence::Missing => {}
            }
        }
        best
    }
}

/// Resolve a field path against the asset's attribute bags. Dotted paths
/// descend exactly one level (e.g. `custom_attributes.os`).
fn resolve_path<'a>(asset: &'a Asset, path: &str) -> Option<&'a Value> {
    match path.split_once('.') {
        None => asset
            .attributes
            .get(path)
            .or_else(|| asset.custom_attributes.get(path)),
        Some(("custom_attributes", rest)) => asset.custom_attributes.get(rest),
        Some((root, rest)) => asset
            .attributes
            .get(root)
            .and_then(Value::as_object)
            .and_then(|o| o.get(rest)),
    }
}

fn classify(value: &Value) -> FieldPresence {
    match value {
        Value::Null => FieldPresence::Missing,
        Value::String(s) if s.trim().is_empty() => FieldPresence::Blank,
        Value::Array(a) if a.is_empty() => FieldPresence::Blank,
        Value::Object(o) if o.is_empty() => FieldPresence::Blank,
        _ => FieldPresence::Populated,
    }
}

fn make_gap(asset: &Asset, attr: &CriticalAttribute, flow_id: FlowId, gap_type: GapType) -> Gap {
    let description = match gap_type {
        GapType::MissingField => format!(
            "{} attribute '{}' is not populated for asset '{}'",
            if attr.required { "Required" } else { "Optional" },
            attr.name,
            asset.name
        ),
        GapType::PartialField => format!(
            "Attribute '{}' is present but blank for asset '{}'",
            attr.name, asset.name
        ),
    };
    let impact = if attr.required {
        "Blocks a reliable migration-strategy recommendation for this asset"
    } else {
        "Reduces confidence in wave and cost planning for this asset"
    };

    Gap {
        asset_id: asset.id,
        flow_id,
        field_name: attr.name.to_string(),
        gap_type,
        gap_category: attr.category.to_string(),
        priority: attr.priority,
        description,
        impact_on_strategy: Some(impact.to_string()),
        suggested_resolution: None,
        confidence_score: None,
        ai_suggestions: None,
        resolution_status: ResolutionStatus::Pending,
    }
}
