use ethereum_types::U256;

use crate::error::TraceError;
use crate::opcode::Instruction;
use crate::trace::{Row, RowBuilder};

/// Memory addresses must stay below this bound.
const MAX_MEMORY: u64 = 1 << 32;
const WORD_BYTES: u64 = 32;

/// A byte range of the current frame's memory touched by one opcode.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct MemoryAccess {
    pub offset: U256,
    pub size: U256,
    pub is_write: bool,
}

/// The memory ranges an opcode accesses, given its popped operands top first.
/// Empty ranges are left out.
pub fn memory_accesses(instruction: &Instruction, popped: &[U256]) -> Vec<MemoryAccess> {
    let arg = |i: usize| popped.get(i).copied().unwrap_or_default();
    let read = |offset, size| MemoryAccess {
        offset,
        size,
        is_write: false,
    };
    let write = |offset, size| MemoryAccess {
        offset,
        size,
        is_write: true,
    };

    let accesses = match instruction.opcode {
        // MLOAD
        0x51 => vec![read(arg(0), WORD_BYTES.into())],
        // MSTORE
        0x52 => vec![write(arg(0), WORD_BYTES.into())],
        // MSTORE8
        0x53 => vec![write(arg(0), U256::one())],
        // KECCAK256, LOG0..LOG4, RETURN, REVERT
        0x20 | 0xa0..=0xa4 | 0xf3 | 0xfd => vec![read(arg(0), arg(1))],
        // CALLDATACOPY, CODECOPY, RETURNDATACOPY
        0x37 | 0x39 | 0x3e => vec![write(arg(0), arg(2))],
        // EXTCODECOPY
        0x3c => vec![write(arg(1), arg(3))],
        // MCOPY
        0x5e => vec![read(arg(1), arg(2)), write(arg(0), arg(2))],
        // CREATE, CREATE2
        0xf0 | 0xf5 => vec![read(arg(1), arg(2))],
        // CALL, CALLCODE
        0xf1 | 0xf2 => vec![read(arg(3), arg(4))],
        // DELEGATECALL, STATICCALL
        0xf4 | 0xfa => vec![read(arg(2), arg(3))],
        _ => vec![],
    };
    accesses
        .into_iter()
        .filter(|access| !access.size.is_zero())
        .collect()
}

/// One memory access, spread over the 32-byte words it spans.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MemoryFragment {
    pub hub_stamp: usize,
    pub context_number: usize,
    pub opcode: u8,
    pub is_write: bool,
    pub offset: u64,
    pub size: u64,
}

impl MemoryFragment {
    /// Fails if the access reaches past the addressable memory range.
    pub fn new(
        hub_stamp: usize,
        context_number: usize,
        instruction: &Instruction,
        pc: u64,
        access: MemoryAccess,
    ) -> Result<Self, TraceError> {
        let out_of_range = || TraceError::MemoryOutOfRange {
            mnemonic: instruction.mnemonic,
            pc,
            offset: access.offset,
            size: access.size,
        };
        let bound = U256::from(MAX_MEMORY);
        if access.offset >= bound || access.size > bound {
            return Err(out_of_range());
        }
        let (offset, size) = (access.offset.as_u64(), access.size.as_u64());
        if offset + size > MAX_MEMORY {
            return Err(out_of_range());
        }
        Ok(Self {
            hub_stamp,
            context_number,
            opcode: instruction.opcode,
            is_write: access.is_write,
            offset,
            size,
        })
    }

    fn first_word(&self) -> u64 {
        self.offset / WORD_BYTES
    }

    /// Number of words spanned by the access.
    pub fn line_count(&self) -> usize {
        let last_word = (self.offset + self.size - 1) / WORD_BYTES;
        (last_word - self.first_word() + 1) as usize
    }

    pub(super) fn rows(&self, row: impl Fn() -> RowBuilder) -> Result<Vec<Row>, TraceError> {
        let ct_max = self.line_count() - 1;
        (0..=ct_max)
            .map(|ct| {
                row()
                    .set("HUB_STAMP", self.hub_stamp)
                    .set("CONTEXT_NUMBER", self.context_number)
                    .set("INST", self.opcode)
                    .flag("IS_WRITE", self.is_write)
                    .set("OFFSET", self.offset)
                    .set("SIZE", self.size)
                    .set("CT", ct)
                    .set("CT_MAX", ct_max)
                    .set("WORD_ADDRESS", (self.first_word() + ct as u64) * WORD_BYTES)
                    .finish()
            })
            .collect()
    }
}
