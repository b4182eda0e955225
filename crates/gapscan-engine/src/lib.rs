pub mod breaker;
pub mod catalog;
pub mod orchestrator;
pub mod progress;
pub mod scanner;
pub mod service;

pub use breaker::BatchCircuitBreaker;
pub use catalog::{CriticalAttribute, CATALOG};
pub use orchestrator::{enhancement_lock_key, EnhancementOrchestrator};
pub use progress::{progress_key, ProgressReporter};
pub use scanner::ProgrammaticScanner;
pub use service::GapAnalysisService;
