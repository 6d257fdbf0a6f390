//! The per-step interface between an execution engine and the tracer.

use ethereum_types::{Address, U256};
use serde::{Deserialize, Serialize};

use crate::error::StepError;

/// One executed instruction, as reported by the execution engine. Field names
/// follow geth's struct logs.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Step {
    pub pc: u64,
    pub op: u8,
    /// Gas available before the step.
    pub gas: u64,
    pub gas_cost: u64,
    /// Call depth, 1 in the outermost frame.
    pub depth: usize,
    /// Refund counter before the step.
    #[serde(default)]
    pub refund: u64,
    /// Stack items consumed, top first.
    #[serde(default)]
    pub popped: Vec<U256>,
    /// Stack items produced, top first.
    #[serde(default)]
    pub pushed: Vec<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub call: Option<CallMarker>,
    /// Set when the step halts exceptionally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Frame boundaries reported alongside a step.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum CallMarker {
    /// The step opens a nested frame executing at `target`.
    Enter {
        target: Address,
        #[serde(default)]
        value: U256,
    },
    /// The step is the last one of a nested frame.
    Exit { success: bool },
}

/// What the engine reports once a transaction has finished executing.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxOutcome {
    pub success: bool,
    pub refund_counter: u64,
    pub leftover_gas: u64,
}

/// Receives the steps of a transaction, in execution order.
pub trait StepTracer {
    fn on_step(&mut self, step: &Step) -> Result<(), StepError>;
}
