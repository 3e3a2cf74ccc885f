//! # Orchestration Engine
//!
//! Fan-out/fan-in execution of a brand analysis.
//!
//! ## Core Components
//!
//! - **AnalysisOrchestrator**: runs the collecting and enriching batches for a
//!   request and assembles the [`AnalysisResult`]
//! - **TaskBatchExecutor**: concurrent execution of named tasks behind a
//!   shared permit count, with per-task failure and panic capture
//! - **BlockingWorkerPool**: bounded `spawn_blocking` pool for synchronous
//!   providers
//! - **ProgressTracker**: monotonic progress checkpoints delivered to an
//!   optional [`ProgressCallback`]

pub mod analysis_orchestrator;
pub mod batch_executor;
pub mod progress;
pub mod types;
pub mod worker_pool;

pub use analysis_orchestrator::{build_llm_context, AnalysisOrchestrator, AnalysisProviders};
pub use batch_executor::{BatchResults, BatchTask, TaskBatchExecutor, TaskFailure};
pub use progress::{FnProgressCallback, ProgressCallback, ProgressTracker};
pub use types::{
    AnalysisOptions, AnalysisRequest, AnalysisResult, PerformanceMetrics, Stage, StageOutcome,
    StagePayload,
};
pub use worker_pool::BlockingWorkerPool;
