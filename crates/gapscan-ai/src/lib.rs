pub mod context;
pub mod enhancer;
pub mod output;
pub mod prompt;
pub mod provider;

pub use context::{AssetContext, ContextFilter};
pub use enhancer::{Enhancer, EnhancementTask, EnhancerRegistry, PooledEnhancer};
pub use output::{
    extract_gaps_json, parse_enhanced_gaps, sanitize_confidence, EnhancedGap,
    EnhancedGapsPayload, OutputValidator, PriorityBuckets, ValidationReport,
};
pub use provider::LlmEnhancer;
