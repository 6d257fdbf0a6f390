//! The seam between block building and EVM execution.

use ethereum_types::{H256, U256};
use hashbrown::HashMap;
use serde::{Deserialize, Serialize};
use zk_tracer::{BlockContext, Step, StepError, StepTracer, Transaction, TxOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ExecutionError {
    /// The tracer refused a step.
    #[error(transparent)]
    Step(#[from] StepError),
    /// The engine itself failed.
    #[error(transparent)]
    Engine(#[from] anyhow::Error),
}

/// Runs candidates against provisional state, reporting every step to a
/// tracer in execution order.
pub trait ExecutionEngine {
    /// Whether `tx` runs any EVM code.
    fn requires_evm_execution(&self, tx: &Transaction) -> bool;

    /// Balance of the sender of `tx` in the provisional state, before `tx`
    /// runs.
    fn sender_balance(&self, tx: &Transaction) -> U256;

    fn execute(
        &mut self,
        tx: &Transaction,
        block: &BlockContext,
        tracer: &mut dyn StepTracer,
    ) -> Result<TxOutcome, ExecutionError>;

    /// Keeps the state changes of the last execution of `tx`.
    fn commit(&mut self, tx: &Transaction);

    /// Drops the state changes of the last execution of `tx`.
    fn discard(&mut self, tx: &Transaction);
}

/// A previously recorded execution.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    #[serde(default)]
    pub steps: Vec<Step>,
    #[serde(default)]
    pub outcome: TxOutcome,
    #[serde(default)]
    pub initial_balance: U256,
    /// Makes the engine fail with this message instead of replaying.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// A candidate together with its recorded execution.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolEntry {
    pub transaction: Transaction,
    #[serde(flatten)]
    pub execution: ExecutionRecord,
}

/// A candidate pool as read by the `block_builder` binary.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplayPool {
    /// Context of the first block; later blocks increment its number.
    #[serde(default)]
    pub block: BlockContext,
    pub entries: Vec<PoolEntry>,
}

impl ReplayPool {
    /// Splits the pool into its candidates, in priority order, and an engine
    /// replaying their executions.
    pub fn into_parts(self) -> (BlockContext, Vec<Transaction>, ReplayEngine) {
        let engine = self.entries.iter().cloned().collect();
        let transactions = self.entries.into_iter().map(|e| e.transaction).collect();
        (self.block, transactions, engine)
    }
}

/// An engine replaying recorded executions, keyed by transaction hash.
#[derive(Clone, Debug, Default)]
pub struct ReplayEngine {
    records: HashMap<H256, ExecutionRecord>,
    committed: Vec<H256>,
    discarded: usize,
}

impl ReplayEngine {
    pub fn insert(&mut self, tx: &Transaction, execution: ExecutionRecord) {
        self.records.insert(tx.hash(), execution);
    }

    /// Hashes of committed transactions, in commit order.
    pub fn committed(&self) -> &[H256] {
        &self.committed
    }

    /// Number of executions whose effects were dropped.
    pub const fn discarded(&self) -> usize {
        self.discarded
    }
}

impl FromIterator<PoolEntry> for ReplayEngine {
    fn from_iter<T: IntoIterator<Item = PoolEntry>>(iter: T) -> Self {
        let mut engine = Self::default();
        for entry in iter {
            engine.insert(&entry.transaction, entry.execution);
        }
        engine
    }
}

impl ExecutionEngine for ReplayEngine {
    fn requires_evm_execution(&self, tx: &Transaction) -> bool {
        self.records
            .get(&tx.hash())
            .is_some_and(|record| !record.steps.is_empty())
    }

    fn sender_balance(&self, tx: &Transaction) -> U256 {
        self.records
            .get(&tx.hash())
            .map_or_else(U256::zero, |record| record.initial_balance)
    }

    fn execute(
        &mut self,
        tx: &Transaction,
        _block: &BlockContext,
        tracer: &mut dyn StepTracer,
    ) -> Result<TxOutcome, ExecutionError> {
        let hash = tx.hash();
        let record = self
            .records
            .get(&hash)
            .ok_or_else(|| anyhow::anyhow!("no recorded execution for transaction {hash:?}"))?;
        if let Some(failure) = &record.failure {
            return Err(anyhow::anyhow!("{failure}").into());
        }
        tracing::trace!("replaying {} steps of {:?}", record.steps.len(), hash);
        for step in &record.steps {
            tracer.on_step(step)?;
        }
        Ok(record.outcome)
    }

    fn commit(&mut self, tx: &Transaction) {
        self.committed.push(tx.hash());
    }

    fn discard(&mut self, _tx: &Transaction) {
        self.discarded += 1;
    }
}

#[cfg(test)]
mod tests {
    use zk_tracer::testing_utils::{address, block, call_tx, contract, single_add};

    use super::*;

    #[derive(Default)]
    struct Recorder(Vec<u8>);

    impl StepTracer for Recorder {
        fn on_step(&mut self, step: &Step) -> Result<(), StepError> {
            self.0.push(step.op);
            Ok(())
        }
    }

    #[test]
    fn replays_steps_in_order() {
        let tx = call_tx(address(1), contract(2), 0);
        let mut engine = ReplayEngine::default();
        engine.insert(
            &tx,
            ExecutionRecord {
                steps: single_add(1, 2),
                ..Default::default()
            },
        );
        assert!(engine.requires_evm_execution(&tx));

        let mut recorder = Recorder::default();
        engine.execute(&tx, &block(1), &mut recorder).unwrap();
        assert_eq!(recorder.0, vec![0x60, 0x60, 0x01, 0x00]);
    }

    #[test]
    fn unknown_and_failing_executions() {
        let tx = call_tx(address(1), contract(2), 0);
        let mut engine = ReplayEngine::default();
        assert!(!engine.requires_evm_execution(&tx));
        assert!(matches!(
            engine.execute(&tx, &block(1), &mut Recorder::default()),
            Err(ExecutionError::Engine(_))
        ));

        engine.insert(
            &tx,
            ExecutionRecord {
                failure: Some("state root mismatch".to_string()),
                ..Default::default()
            },
        );
        let err = engine
            .execute(&tx, &block(1), &mut Recorder::default())
            .unwrap_err();
        assert_eq!(err.to_string(), "state root mismatch");
    }

    #[test]
    fn pool_from_json() {
        let pool: ReplayPool = serde_json::from_str(
            r#"{
                "block": {"number": 5, "coinbase": "0x00000000000000000000000000000000000000c0", "baseFee": "0x7"},
                "entries": [{
                    "transaction": {
                        "sender": "0x0000000000000000000000000000000000000001",
                        "recipient": "0x0000000000000000000000000000000000000002",
                        "data": "0xa9059cbb",
                        "gasLimit": 100000,
                        "gasPrice": "0xa",
                        "nonce": 0
                    },
                    "steps": [{"pc": 0, "op": 0, "gas": 79000, "gasCost": 0, "depth": 1}],
                    "outcome": {"success": true, "refundCounter": 0, "leftoverGas": 79000},
                    "initialBalance": "0xde0b6b3a7640000"
                }]
            }"#,
        )
        .unwrap();
        let (block, transactions, engine) = pool.into_parts();
        assert_eq!(block.number, 5);
        assert_eq!(transactions[0].data, vec![0xa9, 0x05, 0x9c, 0xbb]);
        assert!(engine.requires_evm_execution(&transactions[0]));
        assert_eq!(engine.sender_balance(&transactions[0]), U256::exp10(18));
    }
}
