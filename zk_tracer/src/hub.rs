//! The hub drives every module while a block is being traced.
//!
//! Each transaction goes through `begin_transaction`, a sequence of steps,
//! `end_transaction` and finally either `commit_transaction` or
//! `abort_transaction`. Fragments are appended to a single log in execution
//! order; aborting a transaction truncates the log back to the checkpoint
//! taken when it began, and resets every module to its last commit point.

use std::ops::Range;
use std::sync::Arc;

use ethereum_types::{Address, H256, U256};
use zk_tracer_common::Denylist;

use crate::arithmetic::Operation;
use crate::error::{StepError, TraceError};
use crate::fragment::{
    memory_accesses, ArithmeticFragment, CallFragment, DraftTransactionFragment, MemoryFragment,
    OpcodeFragment, StackFragment, StorageFragment, TraceFragment,
};
use crate::module::{ModuleCounts, ModuleId, ModuleLimits, ModuleSet};
use crate::opcode::{decode, Family};
use crate::step::{CallMarker, Step, StepTracer, TxOutcome};
use crate::trace::TraceSink;
use crate::transaction::{BlockContext, Transaction};

/// Context number of a transaction's outermost frame.
const ROOT_CONTEXT: usize = 1;

#[derive(Clone, Copy, Debug, Eq, PartialEq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum HubPhase {
    /// Between transactions.
    Idle,
    /// Receiving the steps of a transaction.
    TracingTx,
    /// The transaction has ended and awaits a commit or abort decision.
    Finalized,
}

#[derive(Clone, Copy, Debug)]
struct HubCheckpoint {
    log_len: usize,
}

#[derive(Clone, Copy, Debug)]
struct Frame {
    context_number: usize,
    /// Account whose storage the frame operates on.
    address: Address,
    stack_height: usize,
    steps: usize,
}

#[derive(Debug)]
struct TxState {
    hash: H256,
    calldata_size: usize,
    checkpoint: HubCheckpoint,
    draft: DraftTransactionFragment,
    frames: Vec<Frame>,
    hub_stamp: usize,
    last_context: usize,
}

#[derive(Debug)]
struct PendingTx {
    hash: H256,
    calldata_size: usize,
    checkpoint: HubCheckpoint,
}

#[derive(Debug)]
enum Slot {
    Idle,
    Tracing(Box<TxState>),
    Finalized(PendingTx),
}

#[derive(Clone, Debug)]
struct TxSpan {
    hash: H256,
    calldata_size: usize,
    fragments: Range<usize>,
}

/// The fragments of one committed transaction, in execution order.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionTrace {
    pub hash: H256,
    pub calldata_size: usize,
    pub fragments: Vec<TraceFragment>,
}

/// Everything committed to a block, ready to be emitted.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockTrace {
    pub transactions: Vec<TransactionTrace>,
    pub module_counts: ModuleCounts,
}

impl BlockTrace {
    /// Writes every row of the block into `sink`, transaction by transaction.
    pub fn emit(&self, sink: &mut dyn TraceSink) -> Result<(), TraceError> {
        for (ix, tx) in self.transactions.iter().enumerate() {
            for fragment in &tx.fragments {
                fragment.emit(ix + 1, sink)?;
            }
        }
        Ok(())
    }
}

/// Traces the transactions of one block. A hub is never shared: concurrent
/// trials each use their own.
#[derive(Debug)]
pub struct Hub {
    denylist: Arc<Denylist>,
    modules: ModuleSet,
    log: Vec<TraceFragment>,
    transactions: Vec<TxSpan>,
    slot: Slot,
}

impl Hub {
    pub fn new(limits: &ModuleLimits, denylist: Arc<Denylist>) -> Self {
        Self {
            denylist,
            modules: ModuleSet::new(limits),
            log: Vec::new(),
            transactions: Vec::new(),
            slot: Slot::Idle,
        }
    }

    pub const fn phase(&self) -> HubPhase {
        match self.slot {
            Slot::Idle => HubPhase::Idle,
            Slot::Tracing(_) => HubPhase::TracingTx,
            Slot::Finalized(_) => HubPhase::Finalized,
        }
    }

    pub const fn modules(&self) -> &ModuleSet {
        &self.modules
    }

    /// Number of committed transactions.
    pub fn transaction_count(&self) -> usize {
        self.transactions.len()
    }

    fn checkpoint(&self) -> HubCheckpoint {
        HubCheckpoint {
            log_len: self.log.len(),
        }
    }

    fn rollback(&mut self, checkpoint: HubCheckpoint) {
        self.log.truncate(checkpoint.log_len);
        self.modules.reset();
    }

    fn record(&mut self, fragment: TraceFragment) {
        self.modules.record(&fragment);
        self.log.push(fragment);
    }

    fn invalid(&self, operation: &'static str) -> TraceError {
        TraceError::InvalidTransition {
            operation,
            phase: self.phase(),
        }
    }

    /// Starts tracing `tx`, whose sender holds `initial_balance`. Nothing is
    /// recorded until its first step.
    pub fn begin_transaction(
        &mut self,
        tx: &Transaction,
        block: &BlockContext,
        requires_evm_execution: bool,
        initial_balance: U256,
    ) -> Result<(), TraceError> {
        if !matches!(self.slot, Slot::Idle) {
            return Err(self.invalid("begin a transaction"));
        }
        let hash = tx.hash();
        log::debug!("tracing transaction {:?}", hash);
        self.slot = Slot::Tracing(Box::new(TxState {
            hash,
            calldata_size: tx.calldata_size(),
            checkpoint: self.checkpoint(),
            draft: DraftTransactionFragment::prepare(
                tx,
                block,
                requires_evm_execution,
                initial_balance,
            ),
            frames: vec![Frame {
                context_number: ROOT_CONTEXT,
                address: tx.effective_recipient(),
                stack_height: 0,
                steps: 0,
            }],
            hub_stamp: 0,
            last_context: ROOT_CONTEXT,
        }));
        Ok(())
    }

    /// Closes the transaction's trace with its TXN_DATA row. Fails if a nested
    /// frame is still open, in which case the transaction stays in progress
    /// and must be aborted.
    pub fn end_transaction(&mut self, outcome: &TxOutcome) -> Result<(), TraceError> {
        let mut state = match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Tracing(state) => state,
            other => {
                self.slot = other;
                return Err(self.invalid("end a transaction"));
            }
        };
        close_codeless_frame(&mut state.frames, 0);
        let open = state.frames.len() - 1;
        if open > 0 {
            self.slot = Slot::Tracing(state);
            return Err(TraceError::UnterminatedFrames(open));
        }

        let TxState {
            hash,
            calldata_size,
            checkpoint,
            draft,
            ..
        } = *state;
        self.record(TraceFragment::Transaction(draft.finalize(outcome)));
        self.slot = Slot::Finalized(PendingTx {
            hash,
            calldata_size,
            checkpoint,
        });
        Ok(())
    }

    /// Advances every module's commit point past the finalized transaction.
    pub fn commit_transaction(&mut self) -> Result<(), TraceError> {
        let pending = match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Finalized(pending) => pending,
            other => {
                self.slot = other;
                return Err(self.invalid("commit a transaction"));
            }
        };
        self.modules.commit();
        log::debug!(
            "committed transaction {:?} ({} fragments)",
            pending.hash,
            self.log.len() - pending.checkpoint.log_len
        );
        self.transactions.push(TxSpan {
            hash: pending.hash,
            calldata_size: pending.calldata_size,
            fragments: pending.checkpoint.log_len..self.log.len(),
        });
        Ok(())
    }

    /// Discards everything recorded since the transaction began.
    pub fn abort_transaction(&mut self) -> Result<(), TraceError> {
        let (hash, checkpoint) = match std::mem::replace(&mut self.slot, Slot::Idle) {
            Slot::Tracing(state) => (state.hash, state.checkpoint),
            Slot::Finalized(pending) => (pending.hash, pending.checkpoint),
            Slot::Idle => return Err(self.invalid("abort a transaction")),
        };
        log::debug!(
            "rolling back transaction {:?} ({} fragments)",
            hash,
            self.log.len() - checkpoint.log_len
        );
        self.rollback(checkpoint);
        Ok(())
    }

    /// Row counts of every module, including the transaction in progress.
    pub fn snapshot_module_counts(&self) -> ModuleCounts {
        self.modules.counts()
    }

    /// Modules over their limit, including the transaction in progress.
    pub fn capacity_overflow(&self) -> Vec<ModuleId> {
        self.modules.overflowing()
    }

    /// Closes the block. Every transaction must have been committed or
    /// aborted.
    pub fn seal(self) -> Result<BlockTrace, TraceError> {
        if !matches!(self.slot, Slot::Idle) {
            return Err(self.invalid("seal the block"));
        }
        let module_counts = self.modules.counts();
        let mut log = self.log.into_iter();
        let transactions = self
            .transactions
            .into_iter()
            .map(|span| TransactionTrace {
                hash: span.hash,
                calldata_size: span.calldata_size,
                fragments: log.by_ref().take(span.fragments.len()).collect(),
            })
            .collect();
        Ok(BlockTrace {
            transactions,
            module_counts,
        })
    }
}

impl StepTracer for Hub {
    fn on_step(&mut self, step: &Step) -> Result<(), StepError> {
        let phase = self.phase();
        let Slot::Tracing(state) = &mut self.slot else {
            return Err(TraceError::InvalidTransition {
                operation: "trace a step",
                phase,
            }
            .into());
        };
        let fragments = trace_step(state, &self.denylist, step)?;
        for fragment in fragments {
            self.record(fragment);
        }
        Ok(())
    }
}

/// A call into an account without code runs no steps and reports no exit.
/// Such a frame is closed as soon as execution is seen at a shallower
/// `depth`, or when the transaction ends.
fn close_codeless_frame(frames: &mut Vec<Frame>, depth: usize) {
    if frames.len() > 1 && depth < frames.len() && frames.last().is_some_and(|f| f.steps == 0) {
        frames.pop();
    }
}

fn trace_step(
    state: &mut TxState,
    denylist: &Denylist,
    step: &Step,
) -> Result<Vec<TraceFragment>, StepError> {
    let instruction = decode(step.op)?;
    close_codeless_frame(&mut state.frames, step.depth);
    if step.depth != state.frames.len() {
        return Err(TraceError::DepthMismatch {
            pc: step.pc,
            reported: step.depth,
            open: state.frames.len(),
        }
        .into());
    }
    if let Some(CallMarker::Enter { target, .. }) = step.call {
        if denylist.contains(&target) {
            log::debug!(
                "{} at pc {} targets denylisted {:?}",
                instruction.mnemonic,
                step.pc,
                target
            );
            return Err(StepError::CallTargetDenied(target));
        }
    }

    state.hub_stamp += 1;
    let hub_stamp = state.hub_stamp;
    let Some(frame) = state.frames.last_mut() else {
        return Err(TraceError::UnterminatedFrames(0).into());
    };
    frame.steps += 1;
    let (context_number, address, height) =
        (frame.context_number, frame.address, frame.stack_height);
    let exceptional = step.error.is_some();
    log::trace!(
        "stamp {} ctx {} pc {} {}{}",
        hub_stamp,
        context_number,
        step.pc,
        instruction.mnemonic,
        if exceptional { " (exceptional)" } else { "" }
    );

    let height_new = if exceptional {
        height
    } else {
        if step.popped.len() != instruction.pops {
            return Err(TraceError::PoppedArity {
                mnemonic: instruction.mnemonic,
                pc: step.pc,
                expected: instruction.pops,
                actual: step.popped.len(),
            }
            .into());
        }
        if step.pushed.len() != instruction.pushes {
            return Err(TraceError::PushedArity {
                mnemonic: instruction.mnemonic,
                pc: step.pc,
                expected: instruction.pushes,
                actual: step.pushed.len(),
            }
            .into());
        }
        if instruction.pops > height {
            return Err(TraceError::StackUnderflow {
                pc: step.pc,
                popped: instruction.pops,
                height,
            }
            .into());
        }
        height - instruction.pops + instruction.pushes
    };

    let mut fragments = vec![TraceFragment::Opcode(OpcodeFragment {
        hub_stamp,
        context_number,
        pc: step.pc,
        opcode: step.op,
        gas: step.gas,
        gas_cost: step.gas_cost,
        depth: step.depth,
        stack_height: height,
        stack_height_new: height_new,
        refund: step.refund,
        exception: exceptional,
    })];

    if !exceptional {
        if let Some(stack) = StackFragment::new(hub_stamp, height, &step.popped, &step.pushed) {
            fragments.push(TraceFragment::Stack(stack));
        }
        match instruction.family {
            Family::Arithmetic(operator) => {
                let operation = Operation::new(operator, &step.popped);
                if operation.result != step.pushed[0] {
                    return Err(TraceError::ResultMismatch {
                        mnemonic: instruction.mnemonic,
                        pc: step.pc,
                        reported: step.pushed[0],
                        expected: operation.result,
                    }
                    .into());
                }
                fragments.push(TraceFragment::Arithmetic(ArithmeticFragment {
                    hub_stamp,
                    operation,
                }));
            }
            Family::Storage { write, transient } => {
                fragments.push(TraceFragment::Storage(StorageFragment {
                    hub_stamp,
                    address,
                    key: step.popped[0],
                    value: if write { step.popped[1] } else { step.pushed[0] },
                    is_write: write,
                    is_transient: transient,
                }));
            }
            _ => {}
        }
        for access in memory_accesses(&instruction, &step.popped) {
            fragments.push(TraceFragment::Memory(MemoryFragment::new(
                hub_stamp,
                context_number,
                &instruction,
                step.pc,
                access,
            )?));
        }
        frame.stack_height = height_new;
    }

    match step.call {
        None => {}
        Some(CallMarker::Enter { target, value }) => {
            if exceptional || !instruction.enters_frame() {
                return Err(TraceError::UnexpectedCallMarker {
                    mnemonic: instruction.mnemonic,
                    pc: step.pc,
                }
                .into());
            }
            state.last_context += 1;
            let callee_context = state.last_context;
            // CALLCODE and DELEGATECALL run foreign code on the caller's storage.
            let storage_address = match step.op {
                0xf2 | 0xf4 => address,
                _ => target,
            };
            fragments.push(TraceFragment::Call(CallFragment {
                hub_stamp,
                opcode: step.op,
                caller_context: context_number,
                callee_context,
                caller: address,
                callee: target,
                value,
                exit: None,
            }));
            state.frames.push(Frame {
                context_number: callee_context,
                address: storage_address,
                stack_height: 0,
                steps: 0,
            });
        }
        Some(CallMarker::Exit { success }) => {
            if !exceptional && !instruction.is_halt() {
                return Err(TraceError::UnexpectedCallMarker {
                    mnemonic: instruction.mnemonic,
                    pc: step.pc,
                }
                .into());
            }
            if state.frames.len() < 2 {
                return Err(TraceError::UnbalancedExit { pc: step.pc }.into());
            }
            let exited = state.frames.pop();
            let parent = state.frames.last();
            if let (Some(exited), Some(parent)) = (exited, parent) {
                fragments.push(TraceFragment::Call(CallFragment {
                    hub_stamp,
                    opcode: step.op,
                    caller_context: parent.context_number,
                    callee_context: exited.context_number,
                    caller: parent.address,
                    callee: exited.address,
                    value: U256::zero(),
                    exit: Some(success),
                }));
            }
        }
    }

    Ok(fragments)
}
