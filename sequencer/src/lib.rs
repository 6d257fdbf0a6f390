//! Capacity-aware block building.
//!
//! Candidates from an externally ordered pool are checked against the
//! transaction policy, then executed under a [`zk_tracer::Hub`]. A candidate
//! is only included when the trace of the block still fits every module's row
//! limit after its execution.

pub mod admission;
pub mod cli;
pub mod config;
pub mod engine;
pub mod pre_checks;
pub mod tracing;

pub use admission::{
    AdmissionController, BlockBuildingError, BlockReport, BlockSummary, Exclusion, TxVerdict,
    Verdict,
};
pub use config::{BlockBudget, ConfigError, PolicyConfig, PolicyHandle, TransactionLimits};
pub use engine::{ExecutionEngine, ExecutionError, ExecutionRecord, PoolEntry, ReplayEngine};
pub use pre_checks::PolicyRejection;
