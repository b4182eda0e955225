use crate::error::{GapScanError, Result};
use schemars::JsonSchema;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Tier-2 enhancement tuning.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct EnhancementConfig {
    /// Hard deadline for a single asset's enhancement call.
    #[serde(default = "EnhancementConfig::default_per_asset_timeout_secs")]
    pub per_asset_timeout_secs: u64,
    /// Attempts required before the circuit breaker may trip.
    #[serde(default = "EnhancementConfig::default_breaker_min_attempts")]
    pub breaker_min_attempts: usize,
    /// Failure rate above which the breaker trips.
    #[serde(default = "EnhancementConfig::default_breaker_failure_threshold")]
    pub breaker_failure_threshold: f64,
    /// Lock TTL. Must exceed the maximum plausible batch duration
    /// (assets x per-asset timeout) to avoid a false release mid-run.
    #[serde(default = "EnhancementConfig::default_lock_ttl_secs")]
    pub lock_ttl_secs: u64,
    /// Maximum prior patterns replayed into a prompt.
    #[serde(default = "EnhancementConfig::default_max_patterns")]
    pub max_patterns: usize,
    /// Persist gaps as each asset completes.
    #[serde(default = "EnhancementConfig::default_persist")]
    pub persist: bool,
}

impl EnhancementConfig {
    fn default_per_asset_timeout_secs() -> u64 {
        600
    }

    fn default_breaker_min_attempts() -> usize {
        2
    }

    fn default_breaker_failure_threshold() -> f64 {
        0.5
    }

    fn default_lock_ttl_secs() -> u64 {
        7200
    }

    fn default_max_patterns() -> usize {
        3
    }

    fn default_persist() -> bool {
        true
    }
}

impl Default for EnhancementConfig {
    fn default() -> Self {
        Self {
            per_asset_timeout_secs: Self::default_per_asset_timeout_secs(),
            breaker_min_attempts: Self::default_breaker_min_attempts(),
            breaker_failure_threshold: Self::default_breaker_failure_threshold(),
            lock_ttl_secs: Self::default_lock_ttl_secs(),
            max_patterns: Self::default_max_patterns(),
            persist: Self::default_persist(),
        }
    }
}

/// Bounds on the per-asset context shipped to the enhancer. The secret/PII
/// key denylist is a static pattern set, not configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContextFilterConfig {
    /// Tenant-configurable attribute allow-list.
    #[serde(default = "ContextFilterConfig::default_allowed_fields")]
    pub allowed_fields: Vec<String>,
    /// Strings longer than this are truncated.
    #[serde(default = "ContextFilterConfig::default_max_string_len")]
    pub max_string_len: usize,
    /// Cap on the serialized context payload.
    #[serde(default = "ContextFilterConfig::default_max_payload_bytes")]
    pub max_payload_bytes: usize,
}

impl ContextFilterConfig {
    fn default_allowed_fields() -> Vec<String> {
        [
            "os",
            "os_version",
            "cpu_cores",
            "memory_gb",
            "storage_gb",
            "technology_stack",
            "application_type",
            "database_engine",
            "middleware",
            "network_zone",
            "environment",
            "business_criticality",
            "compliance_scope",
            "dependencies",
            "hosting_model",
            "license_model",
            "utilization_profile",
            "eol_status",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect()
    }

    fn default_max_string_len() -> usize {
        500
    }

    fn default_max_payload_bytes() -> usize {
        8192
    }
}

impl Default for ContextFilterConfig {
    fn default() -> Self {
        Self {
            allowed_fields: Self::default_allowed_fields(),
            max_string_len: Self::default_max_string_len(),
            max_payload_bytes: Self::default_max_payload_bytes(),
        }
    }
}

/// LLM provider connection settings for the enhancer client.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct LlmConfig {
    #[serde(default = "LlmConfig::default_base_url")]
    pub base_url: String,
    #[serde(default = "LlmConfig::default_model")]
    pub model: String,
    #[serde(default, skip_serializing)]
    #[schemars(skip)]
    pub api_key: Option<SecretString>,
    #[serde(default = "LlmConfig::default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "LlmConfig::default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "LlmConfig::default_temperature")]
    pub temperature: f32,
    #[serde(default = "LlmConfig::default_max_tokens")]
    pub max_tokens: usize,
}

impl LlmConfig {
    fn default_base_url() -> String {
        "http://localhost:11434/v1".to_string()
    }

    fn default_model() -> String {
        "qwen2.5:14b".to_string()
    }

    fn default_timeout_secs() -> u64 {
        120
    }

    fn default_max_retries() -> u32 {
        3
    }

    fn default_temperature() -> f32 {
        0.1
    }

    fn default_max_tokens() -> usize {
        4096
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            model: Self::default_model(),
            api_key: None,
            timeout_secs: Self::default_timeout_secs(),
            max_retries: Self::default_max_retries(),
            temperature: Self::default_temperature(),
            max_tokens: Self::default_max_tokens(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GapScanConfig {
    #[serde(default)]
    pub enhancement: EnhancementConfig,
    #[serde(default)]
    pub context: ContextFilterConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    /// Progress entries older than this read back as unknown.
    #[serde(default = "GapScanConfig::default_progress_ttl_secs")]
    pub progress_ttl_secs: u64,
}

impl Default for GapScanConfig {
    fn default() -> Self {
        Self {
            enhancement: EnhancementConfig::default(),
            context: ContextFilterConfig::default(),
            llm: LlmConfig::default(),
            progress_ttl_secs: Self::default_progress_ttl_secs(),
        }
    }
}

impl GapScanConfig {
    fn default_progress_ttl_secs() -> u64 {
        3600
    }

    /// Layered load: optional config file, then `GAPSCAN__`-prefixed
    /// environment overrides (e.g. `GAPSCAN__LLM__MODEL`).
    pub fn load(path: Option<&str>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        builder = builder.add_source(config::Environment::with_prefix("GAPSCAN").separator("__"));
        let settings = builder
            .build()
            .map_err(|e| GapScanError::Configuration(e.to_string()))?;
        settings
            .try_deserialize()
            .map_err(|e| GapScanError::Configuration(e.to_string()))
    }
}
