use ethereum_types::{Address, U256};

use crate::error::TraceError;
use crate::trace::{Row, RowBuilder};

/// Entry into, or exit from, a nested frame.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CallFragment {
    pub hub_stamp: usize,
    /// The opcode of the step carrying the frame boundary.
    pub opcode: u8,
    pub caller_context: usize,
    pub callee_context: usize,
    pub caller: Address,
    pub callee: Address,
    pub value: U256,
    /// `Some(success)` for exits.
    pub exit: Option<bool>,
}

impl CallFragment {
    pub(super) fn row(&self, row: RowBuilder) -> Result<Row, TraceError> {
        row.set("HUB_STAMP", self.hub_stamp)
            .set("INST", self.opcode)
            .set("CALLER_CONTEXT", self.caller_context)
            .set("CALLEE_CONTEXT", self.callee_context)
            .word("CALLER_HI", "CALLER_LO", self.caller.into())
            .word("CALLEE_HI", "CALLEE_LO", self.callee.into())
            .word("VALUE_HI", "VALUE_LO", self.value.into())
            .flag("IS_EXIT", self.exit.is_some())
            .flag("SUCCESS", self.exit.unwrap_or_default())
            .finish()
    }
}
