use ethereum_types::{Address, U256};

use crate::hub::HubPhase;
use crate::module::ModuleId;

/// Conditions under which the recorded execution cannot be turned into a
/// well-formed trace. Any of these is fatal for the block being built.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum TraceError {
    #[error("unknown opcode {0:#04x}")]
    UnknownOpcode(u8),

    #[error("{mnemonic} at pc {pc} popped {actual} stack items, expected {expected}")]
    PoppedArity {
        mnemonic: &'static str,
        pc: u64,
        expected: usize,
        actual: usize,
    },

    #[error("{mnemonic} at pc {pc} pushed {actual} stack items, expected {expected}")]
    PushedArity {
        mnemonic: &'static str,
        pc: u64,
        expected: usize,
        actual: usize,
    },

    #[error("{mnemonic} at pc {pc} reported {reported:#x}, expected {expected:#x}")]
    ResultMismatch {
        mnemonic: &'static str,
        pc: u64,
        reported: U256,
        expected: U256,
    },

    #[error("{mnemonic} at pc {pc} accesses memory beyond 2^32 (offset {offset:#x}, size {size:#x})")]
    MemoryOutOfRange {
        mnemonic: &'static str,
        pc: u64,
        offset: U256,
        size: U256,
    },

    #[error("{mnemonic} at pc {pc} carries a call marker it cannot produce")]
    UnexpectedCallMarker { mnemonic: &'static str, pc: u64 },

    #[error("frame exit at pc {pc} with no open nested frame")]
    UnbalancedExit { pc: u64 },

    #[error("transaction ended with {0} nested frames still open")]
    UnterminatedFrames(usize),

    #[error("step at pc {pc} reports depth {reported}, but {open} frames are open")]
    DepthMismatch {
        pc: u64,
        reported: usize,
        open: usize,
    },

    #[error("step at pc {pc} pops {popped} items from a stack of height {height}")]
    StackUnderflow { pc: u64, popped: usize, height: usize },

    #[error("row for {module} is missing column {column}")]
    MissingColumn {
        module: ModuleId,
        column: &'static str,
    },

    #[error("row for {module} writes column {column} out of order")]
    ColumnOrder {
        module: ModuleId,
        column: &'static str,
    },

    #[error("cannot {operation} while the hub is {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: HubPhase,
    },
}

/// Failure reported back to the execution engine from a single step.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum StepError {
    /// The step enters a frame whose target is denylisted. The transaction
    /// must be dropped, but the block pass may continue.
    #[error("call target {0:#x} is denylisted")]
    CallTargetDenied(Address),

    #[error(transparent)]
    Malformed(#[from] TraceError),
}
