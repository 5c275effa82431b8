pub mod types;
pub mod config;

// Re-export commonly used types for convenience
pub use types::{ExecutionOutcome, ExecutionRequest, FailureStage, Language};
pub use config::{Config, ToolchainPrograms};
