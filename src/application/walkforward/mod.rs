pub mod orchestrator;
pub mod parallel_runner;

pub use orchestrator::{WalkForwardOrchestrator, WalkForwardReport};
pub use parallel_runner::{BatchReport, ParallelWalkForwardRunner};
