use std::sync::Arc;

use ethereum_types::{H256, U256};
use sequencer::{
    AdmissionController, ExecutionRecord, PolicyConfig, PolicyHandle, ReplayEngine,
    TransactionLimits,
};
use zk_tracer::testing_utils::{success, GAS_PER_STEP};
use zk_tracer::{Denylist, ModuleLimits, Step, Transaction};

pub const MAX_CALLDATA_SIZE: usize = 1188;
pub const MAX_TX_GAS_LIMIT: u64 = 9_000_000;
/// One ether, held by every sender before its transaction.
pub const SENDER_BALANCE: U256 = U256([1_000_000_000_000_000_000, 0, 0, 0]);

pub const LIMITS: TransactionLimits = TransactionLimits {
    max_tx_calldata_size: MAX_CALLDATA_SIZE,
    max_block_calldata_size: MAX_CALLDATA_SIZE,
    max_tx_gas_limit: MAX_TX_GAS_LIMIT,
};

pub fn policy(module_limits: ModuleLimits, denylist: Denylist) -> PolicyConfig {
    PolicyConfig::new(module_limits, denylist, LIMITS)
}

pub fn controller(module_limits: ModuleLimits, denylist: Denylist) -> AdmissionController {
    AdmissionController::new(Arc::new(PolicyHandle::new(policy(module_limits, denylist))))
}

/// Candidates in priority order, with an engine replaying their executions.
#[derive(Clone, Debug, Default)]
pub struct Pool {
    pub transactions: Vec<Transaction>,
    pub engine: ReplayEngine,
}

impl Pool {
    /// Adds a candidate that runs `steps` and succeeds.
    pub fn add(&mut self, tx: Transaction, steps: Vec<Step>) -> H256 {
        let gas_used = tx.intrinsic_gas() + steps.len() as u64 * GAS_PER_STEP;
        let outcome = success(&tx, gas_used);
        self.add_execution(
            tx,
            ExecutionRecord {
                steps,
                outcome,
                initial_balance: SENDER_BALANCE,
                failure: None,
            },
        )
    }

    pub fn add_execution(&mut self, tx: Transaction, execution: ExecutionRecord) -> H256 {
        let hash = tx.hash();
        self.engine.insert(&tx, execution);
        self.transactions.push(tx);
        hash
    }
}
