// src/processing/mod.rs
pub mod indices;
pub mod parallel;

// Re-export main components
pub use parallel::{
    run, validate_request, BlockProcessor, DispatchStrategy, RunSummary, StrategyKind,
    CONCURRENT_THREADS_PER_CORE,
};
