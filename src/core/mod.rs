// Public modules
pub mod build;
pub mod cleanup;
pub mod config;
pub mod error;
pub mod locate;
pub mod pipeline;
pub mod process;
pub mod sequence;

// Re-export common types for convenience
pub use config::{CommandStep, PipelineConfig, Profile, UtilityProject};
pub use error::{Error, ErrorCode, Result};
pub use locate::BinaryIndex;
pub use pipeline::{RunOutcome, RunReport};
pub use process::{ExecutionResult, Invocation, ProcessRunner, SystemRunner};
