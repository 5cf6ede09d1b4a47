//! Execution Engine Module

pub mod parallel_engine;

pub use parallel_engine::{ParallelExecutionEngine, ParallelizationPolicy};
