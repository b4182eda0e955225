// ABOUTME: JSON schema for structured enhancer output plus tolerant extraction,
// ABOUTME: strict validation and numeric sanitization of untrusted model text

use gapscan_core::{
    FlowId, Gap, GapPriority, GapType, ResolutionStatus,
};
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use uuid::Uuid;

/// One enhanced gap as the model is asked to emit it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EnhancedGap {
    /// Asset the gap belongs to
    pub asset_id: Uuid,
    /// Attribute name the gap was detected for
    pub field_name: String,
    /// missing_field or partial_field
    pub gap_type: GapType,
    /// critical, high, medium or low
    pub priority: GapPriority,
    /// Category of the missing attribute
    pub gap_category: Option<String>,
    /// Why this data point matters
    pub description: Option<String>,
    /// Effect of the gap on the migration strategy decision
    pub impact_on_strategy: Option<String>,
    /// Concrete step to close the gap
    pub suggested_resolution: Option<String>,
    /// Certainty estimate, 0.0 to 1.0
    pub confidence_score: Option<f64>,
    /// Short remediation suggestions, non-empty when present
    pub ai_suggestions: Option<Vec<String>>,
}

/// Gaps bucketed by priority, the shape the enhancer must return.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct PriorityBuckets {
    pub critical: Vec<EnhancedGap>,
    pub high: Vec<EnhancedGap>,
    pub medium: Vec<EnhancedGap>,
    pub low: Vec<EnhancedGap>,
}

/// Top-level enhancer output payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct EnhancedGapsPayload {
    pub gaps: PriorityBuckets,
}

/// Strict response format for providers that support JSON schema output.
pub fn enhanced_gaps_response_format() -> Value {
    let schema = schema_for!(EnhancedGapsPayload);
    serde_json::json!({
        "type": "json_schema",
        "json_schema": {
            "name": "enhanced_gaps_payload",
            "schema": serde_json::to_value(schema).expect("Failed to serialize schema"),
            "strict": true,
        }
    })
}

/// Clamp an untrusted confidence value into the documented invariant:
/// NaN/Infinity become `None`, out-of-range values are clamped, in-range
/// values pass through.
pub fn sanitize_confidence(value: f64) -> Option<f64> {
    if !value.is_finite() {
        return None;
    }
    Some(value.clamp(0.0, 1.0))
}

/// Locate the largest balanced brace-delimited JSON object in `raw` that
/// contains a `gaps` key. Tolerates surrounding prose and markdown fences.
/// `None` means no usable structure was recovered.
pub fn extract_gaps_json(raw: &str) -> Option<Value> {
    let bytes = raw.as_bytes();
    let mut stack: Vec<usize> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;
    let mut best: Option<(usize, Value)> = None;

    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => stack.push(i),
            b'}' => {
                let Some(start) = stack.pop() else { continue };
                let candidate = &raw[start..=i];
                let len = candidate.len();
                if best.as_ref().is_some_and(|(l, _)| *l >= len) {
                    continue;
                }
                if !candidate.contains("\"gaps\"") {
                    continue;
                }
                if let Ok(value) = serde_json::from_str::<Value>(candidate) {
                    if value.get("gaps").is_some() {
                        best = Some((len, value));
                    }
                }
            }
            _ => {}
        }
    }

    best.map(|(_, v)| v)
}

/// Outcome of validating one enhancer payload. Violations are collected,
/// never short-circuited; warnings never block persistence.
#[derive(Debug, Clone, Default)]
pub struct ValidationReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

pub struct OutputValidator;

impl OutputValidator {
    /// Schema checks plus set reconciliation of `(asset_id, field_name)`
    /// pairs against the input gaps for the asset. Extra gaps in the output
    /// are accepted and only flagged as warnings; stripping them is a
    /// product policy decision that has deliberately not been taken here.
    pub fn validate(payload: &Value, expected: &[Gap]) -> ValidationReport {
        let mut report = ValidationReport::default();

        let Some(gaps) = payload.get("gaps").and_then(Value::as_object) else {
            report
                .errors
                .push("top-level object is missing a 'gaps' map".into());
            return report;
        };

        for key in ["critical", "high", "medium", "low"] {
            match gaps.get(key) {
                Some(Value::Array(items)) => {
                    for (idx, item) in items.iter().enumerate() {
                        Self::validate_item(key, idx, item, &mut report);
                    }
                }
                Some(_) => report
                    .errors
                    .push(format!("priority key '{}' is not a list", key)),
                None => report
                    .errors
                    .push(format!("priority key '{}' is missing", key)),
            }
        }
        for key in gaps.keys() {
            if !matches!(key.as_str(), "critical" | "high" | "medium" | "low") {
                report
                    .errors
                    .push(format!("unexpected priority key '{}'", key));
            }
        }

        Self::reconcile(gaps, expected, &mut report);
        report
    }

    fn validate_item(bucket: &str, idx: usize, item: &Value, report: &mut ValidationReport) {
        let at = |field: &str| format!("gaps.{}[{}].{}", bucket, idx, field);

        for required in ["asset_id", "field_name", "gap_type", "priority"] {
            if item.get(required).is_none() {
                report.errors.push(format!("{} is missing", at(required)));
            }
        }

        if let Some(score) = item.get("confidence_score") {
            if score.is_null() {
                // Absent and null are equivalent.
            } else if let Some(v) = score.as_f64() {
                if !v.is_finite() {
                    report
                        .errors
                        .push(format!("{} is not a finite number", at("confidence_score")));
                } else if !(0.0..=1.0).contains(&v) {
                    // Reported here, clamped (not dropped) during sanitization.
                    report.errors.push(format!(
                        "{} out of range: {}",
                        at("confidence_score"),
                        v
                    ));
                }
            } else {
                report
                    .errors
                    .push(format!("{} is not numeric", at("confidence_score")));
            }
        }

        if let Some(suggestions) = item.get("ai_suggestions") {
            match suggestions {
                Value::Null => {}
                Value::Array(list) if list.is_empty() => report
                    .errors
                    .push(format!("{} must be non-empty when present", at("ai_suggestions"))),
                Value::Array(list) => {
                    if list.iter().any(|v| !v.is_string()) {
                        report.errors.push(format!(
                            "{} must contain only strings",
                            at("ai_suggestions")
                        ));
                    }
                }
                _ => report
                    .errors
                    .push(format!("{} is not a list", at("ai_suggestions"))),
            }
        }
    }

    fn reconcile(
        gaps: &serde_json::Map<String, Value>,
        expected: &[Gap],
        report: &mut ValidationReport,
    ) {
        let expected_pairs: HashSet<(Uuid, String)> = expected
            .iter()
            .map(|g| (g.asset_id, g.field_name.clone()))
            .collect();

        let mut returned_pairs: HashSet<(Uuid, String)> = HashSet::new();
        for items in gaps.values().filter_map(Value::as_array) {
            for item in items {
                let asset_id = item
                    .get("asset_id")
                    .and_then(Value::as_str)
                    .and_then(|s| Uuid::parse_str(s).ok());
                let field = item.get("field_name").and_then(Value::as_str);
                if let (Some(asset_id), Some(field)) = (asset_id, field) {
                    returned_pairs.insert((asset_id, field.to_string()));
                }
            }
        }

        for missing in expected_pairs.difference(&returned_pairs) {
            report.warnings.push(format!(
                "input gap ({}, {}) is absent from the output",
                missing.0, missing.1
            ));
        }
        for extra in returned_pairs.difference(&expected_pairs) {
            report.warnings.push(format!(
                "output contains a gap not present in the input: ({}, {})",
                extra.0, extra.1
            ));
        }
    }
}

/// Convert a validated (best-effort) payload into engine gaps. Items that
/// lack the identity fields are skipped; everything else is kept, with
/// confidence clamped and empty suggestion lists dropped.
pub fn parse_enhanced_gaps(payload: &Value, flow_id: FlowId) -> Vec<Gap> {
    let mut out = Vec::new();
    let Some(gaps) = payload.get("gaps").and_then(Value::as_object) else {
        return out;
    };

    for (bucket, items) in gaps {
        let bucket_priority = GapPriority::from_str(bucket);
        let Some(items) = items.as_array() else {
            continue;
        };
        for item in items {
            let Some(gap) = parse_item(item, flow_id, bucket_priority) else {
                continue;
            };
            out.push(gap);
        }
    }
    out
}

fn parse_item(item: &Value, flow_id: FlowId, bucket: Option<GapPriority>) -> Option<Gap> {
    let asset_id = item
        .get("asset_id")
        .and_then(Value::as_str)
        .and_then(|s| Uuid::parse_str(s).ok())?;
    let field_name = item.get("field_name").and_then(Value::as_str)?.to_string();
    let gap_type: GapType = serde_json::from_value(item.get("gap_type")?.clone()).ok()?;
    let priority = item
        .get("priority")
        .and_then(Value::as_str)
        .and_then(GapPriority::from_str)
        .or(bucket)?;

    let text = |key: &str| {
        item.get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
            .filter(|s| !s.is_empty())
    };

    let confidence_score = item
        .get("confidence_score")
        .and_then(Value::as_f64)
        .and_then(sanitize_confidence);

    let ai_suggestions = item
        .get("ai_suggestions")
        .and_then(Value::as_array)
        .map(|list| {
            list.iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect::<Vec<_>>()
        })
        .filter(|list| !list.is_empty());

    Some(Gap {
        asset_id,
        flow_id,
        field_name,
        gap_type,
        gap_category: text("gap_category").unwrap_or_else(|| "general".to_string()),
        priority,
        description: text("description").unwrap_or_default(),
        impact_on_strategy: text("impact_on_strategy"),
        suggested_resolution: text("suggested_resolution"),
        confidence_score,
        ai_suggestions,
        resolution_status: ResolutionStatus::Pending,
    })
}
