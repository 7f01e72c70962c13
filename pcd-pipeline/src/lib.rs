pub mod builder;
pub mod config;
pub mod discover;
pub mod error;
pub mod incremental;
pub mod job;
pub mod runner;
pub mod stage;

pub use builder::{assemble, copc_job, PipelineBuilder};
pub use config::PipelineConfig;
pub use discover::discover;
pub use error::PipelineError;
pub use job::{Job, JobBuilder};
pub use runner::{run_job, Executor, PdalCli};
