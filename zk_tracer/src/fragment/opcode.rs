use crate::error::TraceError;
use crate::trace::{Row, RowBuilder};

/// The HUB row every executed step produces.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct OpcodeFragment {
    pub hub_stamp: usize,
    pub context_number: usize,
    pub pc: u64,
    pub opcode: u8,
    pub gas: u64,
    pub gas_cost: u64,
    pub depth: usize,
    pub stack_height: usize,
    pub stack_height_new: usize,
    pub refund: u64,
    /// The step halted exceptionally.
    pub exception: bool,
}

impl OpcodeFragment {
    pub(super) fn row(&self, row: RowBuilder) -> Result<Row, TraceError> {
        row.set("HUB_STAMP", self.hub_stamp)
            .set("CONTEXT_NUMBER", self.context_number)
            .set("PC", self.pc)
            .set("OPCODE", self.opcode)
            .set("GAS_ACTUAL", self.gas)
            .set("GAS_COST", self.gas_cost)
            .set("CALL_DEPTH", self.depth)
            .set("STACK_HEIGHT", self.stack_height)
            .set("STACK_HEIGHT_NEW", self.stack_height_new)
            .set("REFUND_COUNTER", self.refund)
            .flag("EXCEPTION", self.exception)
            .finish()
    }
}
