use gapscan_core::{Asset, AssetId, ContextFilterConfig};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Key-name patterns that must never reach a prompt, regardless of the
/// tenant allow-list.
static SENSITIVE_KEY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)(password|passwd|secret|token|api[_-]?key|access[_-]?key|private[_-]?key|credential|ssn|social[_-]?security)",
    )
    .expect("invalid sensitive-key pattern")
});

/// Bounded, privacy-filtered view of one asset, shipped to the enhancer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetContext {
    pub asset_id: AssetId,
    pub name: String,
    pub asset_type: String,
    pub fields: Map<String, Value>,
}

impl AssetContext {
    pub fn to_json(&self) -> Value {
        serde_json::json!({
            "asset_id": self.asset_id,
            "name": self.name,
            "asset_type": self.asset_type,
            "fields": Value::Object(self.fields.clone()),
        })
    }
}

/// Builds per-asset prompt context: allow-listed keys, secret/PII key
/// denylist, string truncation, total payload cap.
#[derive(Debug, Clone)]
pub struct ContextFilter {
    config: ContextFilterConfig,
}

impl ContextFilter {
    pub fn new(config: ContextFilterConfig) -> Self {
        Self { config }
    }

    /// Assembles the context in allow-list order and stops adding fields
    /// once the serialized payload would exceed the cap, so higher-priority
    /// fields always survive.
    pub fn build(&self, asset: &Asset) -> AssetContext {
        let mut fields = Map::new();
        let mut budget = self
            .config
            .max_payload_bytes
            .saturating_sub(asset.name.len() + asset.asset_type.len() + 96);

        for key in &self.config.allowed_fields {
            if SENSITIVE_KEY.is_match(key) {
                continue;
            }
            let raw = asset
                .attributes
                .get(key)
                .or_else(|| asset.custom_attributes.get(key));
            let Some(raw) = raw else { continue };
            let Some(value) = self.sanitize_value(raw, 0) else {
                continue;
            };
            let entry_cost = key.len() + value.to_string().len() + 4;
            if entry_cost > budget {
                tracing::debug!(field = %key, "context payload cap reached, dropping field");
                continue;
            }
            budget -= entry_cost;
            fields.insert(key.clone(), value);
        }

        AssetContext {
            asset_id: asset.id,
            name: truncate(&asset.name, self.config.max_string_len),
            asset_type: truncate(&asset.asset_type, self.config.max_string_len),
            fields,
        }
    }

    /// One level of nesting is preserved; deeper containers are dropped.
    fn sanitize_value(&self, value: &Value, depth: usize) -> Option<Value> {
        match value {
            Value::String(s) => Some(Value::String(truncate(s, self.config.max_string_len))),
            Value::Number(_) | Value::Bool(_) => Some(value.clone()),
            Value::Null => None,
            Value::Object(map) if depth == 0 => {
                let mut out = Map::new();
                for (k, v) in map {
                    if SENSITIVE_KEY.is_match(k) {
                        continue;
                    }
                    if let Some(v) = self.sanitize_value(v, depth + 1) {
                        out.insert(k.clone(), v);
                    }
                }
                if out.is_empty() {
                    None
                } else {
                    Some(Value::Object(out))
                }
            }
            Value::Array(items) if depth == 0 => {
                let out: Vec<Value> = items
                    .iter()
                    .filter_map(|v| self.sanitize_value(v, depth + 1))
                    .collect();
                if out.is_empty() {
                    None
                } else {
                    Some(Value::Array(out))
                }
            }
            _ => None,
        }
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        s.chars().take(max_chars).collect()
    }
}
