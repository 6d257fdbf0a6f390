//! Column layouts of every module, in emission order.
//!
//! Every row starts with `ABS_TX_NUM`, the 1-based position of the
//! transaction within its block. It is filled in when a sealed block is
//! emitted, so fragments themselves stay transaction-local.

pub const ABS_TX_NUM: &str = "ABS_TX_NUM";

pub const HUB: &[&str] = &[
    ABS_TX_NUM,
    "HUB_STAMP",
    "CONTEXT_NUMBER",
    "PC",
    "OPCODE",
    "GAS_ACTUAL",
    "GAS_COST",
    "CALL_DEPTH",
    "STACK_HEIGHT",
    "STACK_HEIGHT_NEW",
    "REFUND_COUNTER",
    "EXCEPTION",
];

pub const TXN_DATA: &[&str] = &[
    ABS_TX_NUM,
    "BLOCK_NUMBER",
    "NONCE",
    "IS_DEPLOYMENT",
    "FROM_HI",
    "FROM_LO",
    "TO_HI",
    "TO_LO",
    "COINBASE_HI",
    "COINBASE_LO",
    "GAS_PRICE",
    "BASEFEE",
    "GAS_LIMIT",
    "INIT_GAS",
    "VALUE_HI",
    "VALUE_LO",
    "INITIAL_BALANCE",
    "CALL_DATA_SIZE",
    "REQUIRES_EVM_EXECUTION",
    "LEFTOVER_GAS",
    "REFUND_COUNTER_FINAL",
    "REFUND_AMOUNT",
    "STATUS_CODE",
];

pub const STACK: &[&str] = &[
    ABS_TX_NUM,
    "HUB_STAMP",
    "HEIGHT",
    "IS_POP",
    "VALUE_HI",
    "VALUE_LO",
];

pub const MMU: &[&str] = &[
    ABS_TX_NUM,
    "HUB_STAMP",
    "CONTEXT_NUMBER",
    "INST",
    "IS_WRITE",
    "OFFSET",
    "SIZE",
    "CT",
    "CT_MAX",
    "WORD_ADDRESS",
];

pub const STORAGE: &[&str] = &[
    ABS_TX_NUM,
    "HUB_STAMP",
    "ADDRESS_HI",
    "ADDRESS_LO",
    "KEY_HI",
    "KEY_LO",
    "VALUE_HI",
    "VALUE_LO",
    "IS_WRITE",
    "IS_TRANSIENT",
];

pub const CONTEXT: &[&str] = &[
    ABS_TX_NUM,
    "HUB_STAMP",
    "INST",
    "CALLER_CONTEXT",
    "CALLEE_CONTEXT",
    "CALLER_HI",
    "CALLER_LO",
    "CALLEE_HI",
    "CALLEE_LO",
    "VALUE_HI",
    "VALUE_LO",
    "IS_EXIT",
    "SUCCESS",
];

/// Shared by ADD, MUL, MOD, EXT, WCP, BIN and SHF.
pub const ARITHMETIC: &[&str] = &[
    ABS_TX_NUM,
    "STAMP",
    "CT",
    "CT_MAX",
    "INST",
    "ARG_1_HI",
    "ARG_1_LO",
    "ARG_2_HI",
    "ARG_2_LO",
    "ARG_3_HI",
    "ARG_3_LO",
    "RES_HI",
    "RES_LO",
    "BYTE_1",
    "BYTE_2",
    "ACC_1",
    "ACC_2",
];
