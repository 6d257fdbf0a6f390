//! Trace fragments: one record per semantic event of an execution, each
//! owned by exactly one module and expanded into that module's rows on
//! emission.
//!
//! Fragments only carry transaction-local numbering (hub stamps, context
//! numbers), so tracing a transaction on its own yields the same fragments as
//! tracing it inside a block. The position of the transaction in the block is
//! supplied when the fragment is emitted.

mod arithmetic;
mod call;
mod memory;
mod opcode;
mod stack;
mod storage;
mod transaction;

pub use arithmetic::ArithmeticFragment;
pub use call::CallFragment;
use enum_as_inner::EnumAsInner;
pub use memory::{memory_accesses, MemoryAccess, MemoryFragment};
pub use opcode::OpcodeFragment;
pub use stack::{StackFragment, StackItem};
pub use storage::StorageFragment;
pub use transaction::{DraftTransactionFragment, TransactionFragment};

use crate::columns::ABS_TX_NUM;
use crate::error::TraceError;
use crate::module::ModuleId;
use crate::trace::{RowBuilder, TraceSink};

#[derive(Clone, Debug, Eq, PartialEq, EnumAsInner)]
pub enum TraceFragment {
    Transaction(TransactionFragment),
    Opcode(OpcodeFragment),
    Stack(StackFragment),
    Memory(MemoryFragment),
    Storage(StorageFragment),
    Call(CallFragment),
    Arithmetic(ArithmeticFragment),
}

impl TraceFragment {
    /// The module whose rows this fragment fills.
    pub fn module(&self) -> ModuleId {
        match self {
            Self::Transaction(_) => ModuleId::TxnData,
            Self::Opcode(_) => ModuleId::Hub,
            Self::Stack(_) => ModuleId::Stack,
            Self::Memory(_) => ModuleId::Mmu,
            Self::Storage(_) => ModuleId::Storage,
            Self::Call(_) => ModuleId::Context,
            Self::Arithmetic(f) => f.operation.operator.module(),
        }
    }

    /// Number of rows the fragment expands to.
    pub fn line_count(&self) -> usize {
        match self {
            Self::Transaction(_) | Self::Opcode(_) | Self::Storage(_) | Self::Call(_) => 1,
            Self::Stack(f) => f.items.len(),
            Self::Memory(f) => f.line_count(),
            Self::Arithmetic(f) => f.operation.line_count(),
        }
    }

    /// Writes the fragment's rows for the transaction at position
    /// `abs_tx_num` of its block.
    pub fn emit(&self, abs_tx_num: usize, sink: &mut dyn TraceSink) -> Result<(), TraceError> {
        let module = self.module();
        let rows = match self {
            Self::Transaction(f) => vec![f.row(row(module, abs_tx_num))?],
            Self::Opcode(f) => vec![f.row(row(module, abs_tx_num))?],
            Self::Storage(f) => vec![f.row(row(module, abs_tx_num))?],
            Self::Call(f) => vec![f.row(row(module, abs_tx_num))?],
            Self::Stack(f) => f.rows(|| row(module, abs_tx_num))?,
            Self::Memory(f) => f.rows(|| row(module, abs_tx_num))?,
            Self::Arithmetic(f) => f.rows(|| row(module, abs_tx_num))?,
        };
        debug_assert_eq!(rows.len(), self.line_count());
        for r in rows {
            sink.append(module, r);
        }
        Ok(())
    }
}

/// A row of `module` with its leading column filled in.
fn row(module: ModuleId, abs_tx_num: usize) -> RowBuilder {
    RowBuilder::new(module).set(ABS_TX_NUM, abs_tx_num)
}
