//! Static description of every opcode the tracer understands: its stack
//! arity and the family of modules its execution touches.

use crate::arithmetic::Operator;
use crate::error::TraceError;

/// What kind of work an opcode performs, beyond the HUB row every step gets.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Family {
    /// Ends the current frame.
    Halt,
    Arithmetic(Operator),
    Keccak,
    /// Reads execution context without touching memory or storage.
    Environment,
    Memory,
    Storage {
        write: bool,
        transient: bool,
    },
    Jump,
    /// PUSH, POP, DUP and SWAP.
    Stack,
    Log,
    Create,
    Call,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Instruction {
    pub opcode: u8,
    pub mnemonic: &'static str,
    /// Number of stack items the engine reports as popped.
    pub pops: usize,
    /// Number of stack items the engine reports as pushed.
    pub pushes: usize,
    pub family: Family,
}

impl Instruction {
    /// Whether a step with this opcode may open a nested frame.
    pub const fn enters_frame(&self) -> bool {
        matches!(self.family, Family::Create | Family::Call)
    }

    pub const fn is_halt(&self) -> bool {
        matches!(self.family, Family::Halt)
    }
}

const PUSH: [&str; 33] = [
    "PUSH0", "PUSH1", "PUSH2", "PUSH3", "PUSH4", "PUSH5", "PUSH6", "PUSH7", "PUSH8", "PUSH9",
    "PUSH10", "PUSH11", "PUSH12", "PUSH13", "PUSH14", "PUSH15", "PUSH16", "PUSH17", "PUSH18",
    "PUSH19", "PUSH20", "PUSH21", "PUSH22", "PUSH23", "PUSH24", "PUSH25", "PUSH26", "PUSH27",
    "PUSH28", "PUSH29", "PUSH30", "PUSH31", "PUSH32",
];

const DUP: [&str; 16] = [
    "DUP1", "DUP2", "DUP3", "DUP4", "DUP5", "DUP6", "DUP7", "DUP8", "DUP9", "DUP10", "DUP11",
    "DUP12", "DUP13", "DUP14", "DUP15", "DUP16",
];

const SWAP: [&str; 16] = [
    "SWAP1", "SWAP2", "SWAP3", "SWAP4", "SWAP5", "SWAP6", "SWAP7", "SWAP8", "SWAP9", "SWAP10",
    "SWAP11", "SWAP12", "SWAP13", "SWAP14", "SWAP15", "SWAP16",
];

const LOG: [&str; 5] = ["LOG0", "LOG1", "LOG2", "LOG3", "LOG4"];

/// Decodes an opcode byte.
///
/// `DUPn` is modelled as popping the `n` items it reads and pushing them back
/// along with the copy, and `SWAPn` as popping and pushing `n + 1` items, so
/// that every stack item an opcode reads shows up in the STACK module.
pub fn decode(opcode: u8) -> Result<Instruction, TraceError> {
    use Family::*;

    if let Some(operator) = Operator::from_opcode(opcode) {
        return Ok(Instruction {
            opcode,
            mnemonic: operator.mnemonic(),
            pops: operator.arity(),
            pushes: 1,
            family: Arithmetic(operator),
        });
    }

    let (mnemonic, pops, pushes, family) = match opcode {
        0x00 => ("STOP", 0, 0, Halt),
        0x20 => ("KECCAK256", 2, 1, Keccak),
        0x30 => ("ADDRESS", 0, 1, Environment),
        0x31 => ("BALANCE", 1, 1, Environment),
        0x32 => ("ORIGIN", 0, 1, Environment),
        0x33 => ("CALLER", 0, 1, Environment),
        0x34 => ("CALLVALUE", 0, 1, Environment),
        0x35 => ("CALLDATALOAD", 1, 1, Environment),
        0x36 => ("CALLDATASIZE", 0, 1, Environment),
        0x37 => ("CALLDATACOPY", 3, 0, Memory),
        0x38 => ("CODESIZE", 0, 1, Environment),
        0x39 => ("CODECOPY", 3, 0, Memory),
        0x3a => ("GASPRICE", 0, 1, Environment),
        0x3b => ("EXTCODESIZE", 1, 1, Environment),
        0x3c => ("EXTCODECOPY", 4, 0, Memory),
        0x3d => ("RETURNDATASIZE", 0, 1, Environment),
        0x3e => ("RETURNDATACOPY", 3, 0, Memory),
        0x3f => ("EXTCODEHASH", 1, 1, Environment),
        0x40 => ("BLOCKHASH", 1, 1, Environment),
        0x41 => ("COINBASE", 0, 1, Environment),
        0x42 => ("TIMESTAMP", 0, 1, Environment),
        0x43 => ("NUMBER", 0, 1, Environment),
        0x44 => ("PREVRANDAO", 0, 1, Environment),
        0x45 => ("GASLIMIT", 0, 1, Environment),
        0x46 => ("CHAINID", 0, 1, Environment),
        0x47 => ("SELFBALANCE", 0, 1, Environment),
        0x48 => ("BASEFEE", 0, 1, Environment),
        0x49 => ("BLOBHASH", 1, 1, Environment),
        0x4a => ("BLOBBASEFEE", 0, 1, Environment),
        0x50 => ("POP", 1, 0, Stack),
        0x51 => ("MLOAD", 1, 1, Memory),
        0x52 => ("MSTORE", 2, 0, Memory),
        0x53 => ("MSTORE8", 2, 0, Memory),
        0x54 => (
            "SLOAD",
            1,
            1,
            Storage {
                write: false,
                transient: false,
            },
        ),
        0x55 => (
            "SSTORE",
            2,
            0,
            Storage {
                write: true,
                transient: false,
            },
        ),
        0x56 => ("JUMP", 1, 0, Jump),
        0x57 => ("JUMPI", 2, 0, Jump),
        0x58 => ("PC", 0, 1, Environment),
        0x59 => ("MSIZE", 0, 1, Environment),
        0x5a => ("GAS", 0, 1, Environment),
        0x5b => ("JUMPDEST", 0, 0, Jump),
        0x5c => (
            "TLOAD",
            1,
            1,
            Storage {
                write: false,
                transient: true,
            },
        ),
        0x5d => (
            "TSTORE",
            2,
            0,
            Storage {
                write: true,
                transient: true,
            },
        ),
        0x5e => ("MCOPY", 3, 0, Memory),
        0x5f..=0x7f => (PUSH[(opcode - 0x5f) as usize], 0, 1, Stack),
        0x80..=0x8f => {
            let n = (opcode - 0x7f) as usize;
            (DUP[n - 1], n, n + 1, Stack)
        }
        0x90..=0x9f => {
            let n = (opcode - 0x8f) as usize;
            (SWAP[n - 1], n + 1, n + 1, Stack)
        }
        0xa0..=0xa4 => {
            let n = (opcode - 0xa0) as usize;
            (LOG[n], 2 + n, 0, Log)
        }
        0xf0 => ("CREATE", 3, 1, Create),
        0xf1 => ("CALL", 7, 1, Call),
        0xf2 => ("CALLCODE", 7, 1, Call),
        0xf3 => ("RETURN", 2, 0, Halt),
        0xf4 => ("DELEGATECALL", 6, 1, Call),
        0xf5 => ("CREATE2", 4, 1, Create),
        0xfa => ("STATICCALL", 6, 1, Call),
        0xfd => ("REVERT", 2, 0, Halt),
        0xfe => ("INVALID", 0, 0, Halt),
        0xff => ("SELFDESTRUCT", 1, 0, Halt),
        _ => {
            log::debug!("rejecting unassigned opcode {:#04x}", opcode);
            return Err(TraceError::UnknownOpcode(opcode));
        }
    };

    Ok(Instruction {
        opcode,
        mnemonic,
        pops,
        pushes,
        family,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arithmetic_opcodes() {
        let add = decode(0x01).unwrap();
        assert_eq!(add.mnemonic, "ADD");
        assert_eq!((add.pops, add.pushes), (2, 1));
        assert_eq!(add.family, Family::Arithmetic(Operator::Add));

        let addmod = decode(0x08).unwrap();
        assert_eq!((addmod.pops, addmod.pushes), (3, 1));

        let iszero = decode(0x15).unwrap();
        assert_eq!((iszero.pops, iszero.pushes), (1, 1));
    }

    #[test]
    fn stack_opcodes() {
        assert_eq!(decode(0x5f).unwrap().mnemonic, "PUSH0");
        assert_eq!(decode(0x7f).unwrap().mnemonic, "PUSH32");

        let dup3 = decode(0x82).unwrap();
        assert_eq!(dup3.mnemonic, "DUP3");
        assert_eq!((dup3.pops, dup3.pushes), (3, 4));

        let swap16 = decode(0x9f).unwrap();
        assert_eq!(swap16.mnemonic, "SWAP16");
        assert_eq!((swap16.pops, swap16.pushes), (17, 17));

        let log4 = decode(0xa4).unwrap();
        assert_eq!((log4.pops, log4.pushes), (6, 0));
    }

    #[test]
    fn calls_open_frames() {
        for opcode in [0xf0, 0xf1, 0xf2, 0xf4, 0xf5, 0xfa] {
            assert!(decode(opcode).unwrap().enters_frame());
        }
        assert_eq!(decode(0xf1).unwrap().pops, 7);
        assert_eq!(decode(0xfa).unwrap().pops, 6);
        assert!(decode(0xf3).unwrap().is_halt());
        assert!(!decode(0x56).unwrap().enters_frame());
    }

    #[test]
    fn unassigned_opcodes() {
        for opcode in [0x0c, 0x0f, 0x1e, 0x21, 0x4b, 0xa5, 0xef, 0xfb] {
            assert_eq!(decode(opcode), Err(TraceError::UnknownOpcode(opcode)));
        }
        let known = (0..=u8::MAX).filter(|&op| decode(op).is_ok()).count();
        assert_eq!(known, 149);
    }
}
