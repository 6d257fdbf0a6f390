//! A set of utility functions to be used by `zk_tracer` unit and integration
//! tests, and by the tests of crates driving the tracer.

use env_logger::{try_init_from_env, Env, DEFAULT_FILTER_ENV};
use ethereum_types::{Address, U256};

use crate::arithmetic::Operation;
use crate::opcode::{decode, Family};
use crate::step::{CallMarker, Step, TxOutcome};
use crate::transaction::{BlockContext, Transaction};

pub const GAS_PER_STEP: u64 = 3;

pub fn init_logger() {
    let _ = try_init_from_env(Env::default().filter_or(DEFAULT_FILTER_ENV, "info"));
}

/// A short, recognisable address.
pub fn address(n: u64) -> Address {
    Address::from_low_u64_be(n)
}

/// An ordinary account address, above the precompile range.
pub fn contract(n: u64) -> Address {
    address(0x100 + n)
}

pub fn block(number: u64) -> BlockContext {
    BlockContext {
        number,
        coinbase: address(0xc0ffee),
        base_fee: 7.into(),
    }
}

/// A plain message call with empty calldata.
pub fn call_tx(sender: Address, recipient: Address, nonce: u64) -> Transaction {
    Transaction {
        sender,
        recipient: Some(recipient),
        data: vec![],
        gas_limit: 100_000,
        gas_price: 10.into(),
        nonce,
        value: U256::zero(),
    }
}

/// ABI-encoded call to `selector` with a single `string` argument: selector,
/// offset, length, then the bytes padded to a multiple of 32.
pub fn abi_string_call(selector: [u8; 4], text: &str) -> Vec<u8> {
    let mut data = selector.to_vec();
    let mut word = [0u8; 32];
    U256::from(32).to_big_endian(&mut word);
    data.extend_from_slice(&word);
    U256::from(text.len()).to_big_endian(&mut word);
    data.extend_from_slice(&word);
    data.extend_from_slice(text.as_bytes());
    data.resize(4 + 64 + text.len().div_ceil(32) * 32, 0);
    data
}

/// The outcome of a successful transaction that used `gas_used` gas.
pub fn success(tx: &Transaction, gas_used: u64) -> TxOutcome {
    TxOutcome {
        success: true,
        refund_counter: 0,
        leftover_gas: tx.gas_limit.saturating_sub(gas_used),
    }
}

/// `PUSH b, PUSH a, ADD, STOP` in the outermost frame.
pub fn single_add(a: u64, b: u64) -> Vec<Step> {
    StepsBuilder::new().push(b).push(a).op(0x01).op(0x00).build()
}

/// Builds a consistent sequence of steps by modelling the stack of every
/// frame. Operands and results are filled in the way an engine would report
/// them. Panics on stack underflow.
#[derive(Clone, Debug)]
pub struct StepsBuilder {
    steps: Vec<Step>,
    /// One stack per open frame, top at the end.
    stacks: Vec<Vec<U256>>,
    pcs: Vec<u64>,
    gas: u64,
}

impl Default for StepsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl StepsBuilder {
    pub fn new() -> Self {
        Self {
            steps: vec![],
            stacks: vec![vec![]],
            pcs: vec![0],
            gas: 1_000_000,
        }
    }

    /// Pushes `value` with the narrowest PUSH opcode.
    pub fn push(self, value: impl Into<U256>) -> Self {
        let value = value.into();
        let width = value.bits().div_ceil(8) as u8;
        self.step(0x5f + width, None, Some(vec![value]), None)
    }

    /// Executes `opcode`, computing the pushed values for arithmetic, DUP and
    /// SWAP. Other opcodes push zeros.
    pub fn op(self, opcode: u8) -> Self {
        self.step(opcode, None, None, None)
    }

    /// Executes `opcode`, reporting `pushed` (top first) as its output.
    pub fn op_with(self, opcode: u8, pushed: &[U256]) -> Self {
        self.step(opcode, None, Some(pushed.to_vec()), None)
    }

    /// Pushes seven call operands for a `CALL` to `target` with no memory
    /// ranges, in the order CALL pops them.
    pub fn push_call_args(self, target: Address) -> Self {
        self.push(0u64)
            .push(0u64)
            .push(0u64)
            .push(0u64)
            .push(0u64)
            .push(U256::from_big_endian(target.as_bytes()))
            .push(50_000u64)
    }

    /// Executes a CALL-like or CREATE-like opcode that enters a frame at
    /// `target`. The call reports success to the caller.
    pub fn enter(self, opcode: u8, target: Address, value: U256) -> Self {
        let pushed = Some(vec![U256::one()]);
        self.step(opcode, Some(CallMarker::Enter { target, value }), pushed, None)
    }

    /// Executes a call into an account without code: the entry is reported,
    /// but no step runs in the callee.
    pub fn call_codeless(self, opcode: u8, target: Address, value: U256) -> Self {
        let mut builder = self.enter(opcode, target, value);
        builder.stacks.pop();
        builder.pcs.pop();
        builder
    }

    /// Executes the halting `opcode` of a nested frame.
    pub fn exit(self, opcode: u8, success: bool) -> Self {
        self.step(opcode, Some(CallMarker::Exit { success }), None, None)
    }

    /// Executes `opcode` and halts exceptionally, leaving a nested frame if
    /// one is open.
    pub fn fail(self, opcode: u8, error: &str) -> Self {
        let call = (self.stacks.len() > 1).then_some(CallMarker::Exit { success: false });
        self.step(opcode, call, Some(vec![]), Some(error.to_string()))
    }

    pub fn build(self) -> Vec<Step> {
        self.steps
    }

    fn step(
        mut self,
        opcode: u8,
        call: Option<CallMarker>,
        pushed: Option<Vec<U256>>,
        error: Option<String>,
    ) -> Self {
        let instruction = decode(opcode).expect("known opcode");
        let depth = self.stacks.len();
        let stack = self.stacks.last_mut().expect("open frame");
        let pc = self.pcs.last_mut().expect("open frame");

        let (popped, pushed) = if error.is_some() {
            (vec![], vec![])
        } else {
            let popped: Vec<U256> = (0..instruction.pops)
                .map(|_| stack.pop().expect("stack underflow"))
                .collect();
            let pushed = pushed.unwrap_or_else(|| default_pushes(opcode, &popped));
            stack.extend(pushed.iter().rev());
            (popped, pushed)
        };

        self.steps.push(Step {
            pc: *pc,
            op: opcode,
            gas: self.gas,
            gas_cost: GAS_PER_STEP,
            depth,
            refund: 0,
            popped,
            pushed,
            call,
            error,
        });
        let immediate = match opcode {
            0x60..=0x7f => u64::from(opcode - 0x5f),
            _ => 0,
        };
        *pc += 1 + immediate;
        self.gas -= GAS_PER_STEP;

        match call {
            Some(CallMarker::Enter { .. }) => {
                self.stacks.push(vec![]);
                self.pcs.push(0);
            }
            Some(CallMarker::Exit { .. }) => {
                self.stacks.pop();
                self.pcs.pop();
            }
            None => {}
        }
        self
    }
}

fn default_pushes(opcode: u8, popped: &[U256]) -> Vec<U256> {
    let instruction = decode(opcode).expect("known opcode");
    match instruction.family {
        Family::Arithmetic(operator) => vec![Operation::new(operator, popped).result],
        Family::Stack if (0x80..=0x8f).contains(&opcode) => {
            let n = popped.len();
            std::iter::once(popped[n - 1])
                .chain(popped.iter().copied())
                .collect()
        }
        Family::Stack if (0x90..=0x9f).contains(&opcode) => {
            let n = popped.len() - 1;
            let mut pushed = popped.to_vec();
            pushed.swap(0, n);
            pushed
        }
        _ => vec![U256::zero(); instruction.pushes],
    }
}
