//! Greedy, order-preserving block building under module row limits.
//!
//! Every candidate that passes the pre-checks is executed under the block's
//! [`Hub`]. Once it ends, the hub's row counts are compared with the module
//! limits: a candidate that makes any module overflow is rolled back and left
//! for a later block. Capacity is only ever measured by tracing.

use std::sync::Arc;
use std::time::Instant;

use ethereum_types::H256;
use serde::Serialize;
use zk_tracer::{
    BlockContext, BlockTrace, Hub, ModuleCounts, ModuleId, StepError, TraceError, Transaction,
};

use crate::config::{PolicyConfig, PolicyHandle};
use crate::engine::{ExecutionEngine, ExecutionError};
use crate::pre_checks::{check_transaction, PolicyRejection};

/// Failures that end a block pass. The trace of the block can no longer be
/// trusted.
#[derive(Debug, thiserror::Error)]
pub enum BlockBuildingError {
    #[error("malformed trace for transaction {hash:?}: {source}")]
    MalformedTrace {
        hash: H256,
        #[source]
        source: TraceError,
    },
    #[error("failed to seal block {number}: {source}")]
    Seal {
        number: u64,
        #[source]
        source: TraceError,
    },
}

/// Why a candidate was left out of this block. It may fit a later one.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum Exclusion {
    #[error("trace modules over capacity: {}", module_names(.0))]
    CapacityOverflow(Vec<ModuleId>),
    #[error("block calldata would reach {total} bytes, the maximum is {max}")]
    BlockCalldataFull { total: usize, max: usize },
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("block budget exhausted")]
    BudgetExhausted,
}

fn module_names(modules: &[ModuleId]) -> String {
    modules
        .iter()
        .map(ModuleId::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Clone, Debug, Eq, PartialEq, strum::IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum Verdict {
    Included,
    Rejected(PolicyRejection),
    Excluded(Exclusion),
}

impl Verdict {
    pub const fn is_included(&self) -> bool {
        matches!(self, Self::Included)
    }

    /// Whether the candidate should leave the pool: it is either in the block
    /// or can never be.
    pub const fn is_final(&self) -> bool {
        matches!(self, Self::Included | Self::Rejected(_))
    }

    pub fn reason(&self) -> Option<String> {
        match self {
            Self::Included => None,
            Self::Rejected(rejection) => Some(rejection.to_string()),
            Self::Excluded(exclusion) => Some(exclusion.to_string()),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TxVerdict {
    pub hash: H256,
    pub verdict: Verdict,
}

/// The outcome of one block pass.
#[derive(Clone, Debug)]
pub struct BlockReport {
    pub block_number: u64,
    /// One verdict per candidate, in pool order.
    pub verdicts: Vec<TxVerdict>,
    pub included: Vec<H256>,
    /// Calldata bytes of the included transactions.
    pub calldata_size: usize,
    pub module_counts: ModuleCounts,
    pub trace: BlockTrace,
}

impl BlockReport {
    pub fn verdict(&self, hash: &H256) -> Option<&Verdict> {
        self.verdicts
            .iter()
            .find(|v| v.hash == *hash)
            .map(|v| &v.verdict)
    }

    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            block_number: self.block_number,
            included: self.included.clone(),
            calldata_size: self.calldata_size,
            module_counts: self.module_counts.clone(),
            verdicts: self
                .verdicts
                .iter()
                .map(|v| VerdictSummary {
                    hash: v.hash,
                    verdict: (&v.verdict).into(),
                    reason: v.verdict.reason(),
                })
                .collect(),
        }
    }
}

/// The serializable part of a [`BlockReport`].
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub block_number: u64,
    pub included: Vec<H256>,
    pub calldata_size: usize,
    pub module_counts: ModuleCounts,
    pub verdicts: Vec<VerdictSummary>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct VerdictSummary {
    pub hash: H256,
    pub verdict: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Decides which candidates enter each block.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    policy: Arc<PolicyHandle>,
}

impl AdmissionController {
    pub const fn new(policy: Arc<PolicyHandle>) -> Self {
        Self { policy }
    }

    pub fn from_config(config: PolicyConfig) -> Self {
        Self::new(Arc::new(PolicyHandle::new(config)))
    }

    pub fn policy(&self) -> &PolicyHandle {
        &self.policy
    }

    /// Runs one block pass over `pool`, in order. The policy in force when
    /// the pass starts applies to the whole block.
    pub fn build_block<E: ExecutionEngine + ?Sized>(
        &self,
        pool: &[Transaction],
        engine: &mut E,
        block: &BlockContext,
    ) -> Result<BlockReport, BlockBuildingError> {
        let policy = self.policy.current();
        let started = Instant::now();
        let mut hub = Hub::new(&policy.module_limits, policy.denylist.clone());
        let mut verdicts = Vec::with_capacity(pool.len());
        let mut included = vec![];
        let mut calldata_size = 0;

        for tx in pool {
            let hash = tx.hash();
            let exhausted = policy
                .budget
                .max_transactions
                .is_some_and(|max| included.len() >= max)
                || policy
                    .budget
                    .max_duration
                    .is_some_and(|max| started.elapsed() >= max);
            let verdict = if exhausted {
                Verdict::Excluded(Exclusion::BudgetExhausted)
            } else {
                admit(&policy, &mut hub, engine, tx, hash, block, calldata_size)?
            };

            match &verdict {
                Verdict::Included => {
                    tracing::debug!("block {}: included {:?}", block.number, hash);
                    calldata_size += tx.calldata_size();
                    included.push(hash);
                }
                Verdict::Rejected(rejection) => {
                    tracing::info!("block {}: rejected {:?}: {}", block.number, hash, rejection)
                }
                Verdict::Excluded(exclusion) => {
                    tracing::debug!("block {}: excluded {:?}: {}", block.number, hash, exclusion)
                }
            }
            verdicts.push(TxVerdict { hash, verdict });
        }

        let trace = hub.seal().map_err(|source| BlockBuildingError::Seal {
            number: block.number,
            source,
        })?;
        tracing::info!(
            "block {}: {} of {} candidates included, {} calldata bytes",
            block.number,
            included.len(),
            pool.len(),
            calldata_size
        );
        Ok(BlockReport {
            block_number: block.number,
            verdicts,
            included,
            calldata_size,
            module_counts: trace.module_counts.clone(),
            trace,
        })
    }

    /// Builds blocks from `pool` until every candidate is included or
    /// rejected. Stops early when a block includes nothing, since no later
    /// block could either.
    pub fn drain_pool<E: ExecutionEngine + ?Sized>(
        &self,
        mut pool: Vec<Transaction>,
        engine: &mut E,
        first_block: BlockContext,
    ) -> Result<Vec<BlockReport>, BlockBuildingError> {
        let mut reports = vec![];
        let mut block = first_block;
        while !pool.is_empty() {
            let report = self.build_block(&pool, engine, &block)?;
            let mut verdicts = report.verdicts.iter();
            pool.retain(|_| verdicts.next().is_some_and(|v| !v.verdict.is_final()));

            let stalled = report.included.is_empty();
            reports.push(report);
            if stalled {
                if !pool.is_empty() {
                    tracing::warn!(
                        "{} candidates fit no block, leaving them in the pool",
                        pool.len()
                    );
                }
                break;
            }
            block.number += 1;
        }
        Ok(reports)
    }
}

/// Decides on one candidate, leaving the hub idle again.
fn admit<E: ExecutionEngine + ?Sized>(
    policy: &PolicyConfig,
    hub: &mut Hub,
    engine: &mut E,
    tx: &Transaction,
    hash: H256,
    block: &BlockContext,
    block_calldata_size: usize,
) -> Result<Verdict, BlockBuildingError> {
    let malformed = |source| BlockBuildingError::MalformedTrace { hash, source };

    if let Err(rejection) = check_transaction(tx, &policy.denylist, &policy.tx_limits) {
        return Ok(Verdict::Rejected(rejection));
    }
    let total = block_calldata_size + tx.calldata_size();
    if total > policy.tx_limits.max_block_calldata_size {
        return Ok(Verdict::Excluded(Exclusion::BlockCalldataFull {
            total,
            max: policy.tx_limits.max_block_calldata_size,
        }));
    }

    hub.begin_transaction(
        tx,
        block,
        engine.requires_evm_execution(tx),
        engine.sender_balance(tx),
    )
    .map_err(malformed)?;
    let outcome = match engine.execute(tx, block, &mut *hub) {
        Ok(outcome) => outcome,
        Err(ExecutionError::Step(StepError::Malformed(source))) => return Err(malformed(source)),
        Err(ExecutionError::Step(StepError::CallTargetDenied(target))) => {
            hub.abort_transaction().map_err(malformed)?;
            engine.discard(tx);
            return Ok(Verdict::Rejected(PolicyRejection::DeniedCallTarget(target)));
        }
        Err(ExecutionError::Engine(err)) => {
            hub.abort_transaction().map_err(malformed)?;
            engine.discard(tx);
            return Ok(Verdict::Excluded(Exclusion::ExecutionFailed(format!(
                "{err:#}"
            ))));
        }
    };
    hub.end_transaction(&outcome).map_err(malformed)?;

    let overflow = hub.capacity_overflow();
    if !overflow.is_empty() {
        hub.abort_transaction().map_err(malformed)?;
        engine.discard(tx);
        return Ok(Verdict::Excluded(Exclusion::CapacityOverflow(overflow)));
    }
    hub.commit_transaction().map_err(malformed)?;
    engine.commit(tx);
    Ok(Verdict::Included)
}

#[cfg(test)]
mod tests {
    use zk_tracer::testing_utils::{address, block, call_tx, contract, single_add, success};
    use zk_tracer::ModuleLimits;
    use zk_tracer_common::Denylist;

    use super::*;
    use crate::config::TransactionLimits;
    use crate::engine::{ExecutionRecord, ReplayEngine};

    const LIMITS: TransactionLimits = TransactionLimits {
        max_tx_calldata_size: 100,
        max_block_calldata_size: 100,
        max_tx_gas_limit: 1_000_000,
    };

    fn add_pool(n: u64) -> (Vec<Transaction>, ReplayEngine) {
        let mut engine = ReplayEngine::default();
        let pool = (0..n)
            .map(|nonce| {
                let tx = call_tx(address(1), contract(2), nonce);
                engine.insert(
                    &tx,
                    ExecutionRecord {
                        steps: single_add(nonce, 1),
                        outcome: success(&tx, 21_012),
                        ..Default::default()
                    },
                );
                tx
            })
            .collect();
        (pool, engine)
    }

    #[test]
    fn stalled_pool_stops_draining() {
        let controller = AdmissionController::from_config(PolicyConfig::new(
            ModuleLimits::unbounded().with_limit(ModuleId::Add, 8),
            Denylist::default(),
            LIMITS,
        ));
        let (pool, mut engine) = add_pool(2);
        let reports = controller.drain_pool(pool, &mut engine, block(1)).unwrap();
        assert_eq!(reports.len(), 1);
        assert!(reports[0].included.is_empty());
        assert_eq!(engine.discarded(), 2);
        assert!(engine.committed().is_empty());
    }

    #[test]
    fn transaction_budget() {
        let controller = AdmissionController::from_config(
            PolicyConfig::new(ModuleLimits::unbounded(), Denylist::default(), LIMITS).with_budget(
                crate::config::BlockBudget {
                    max_transactions: Some(2),
                    max_duration: None,
                },
            ),
        );
        let (pool, mut engine) = add_pool(3);
        let report = controller.build_block(&pool, &mut engine, &block(1)).unwrap();
        assert_eq!(report.included.len(), 2);
        assert_eq!(
            report.verdicts[2].verdict,
            Verdict::Excluded(Exclusion::BudgetExhausted)
        );

        let summary = serde_json::to_value(report.summary()).unwrap();
        assert_eq!(summary["verdicts"][0]["verdict"], "included");
        assert_eq!(summary["verdicts"][2]["reason"], "block budget exhausted");
        assert_eq!(summary["moduleCounts"]["ADD"], 32);
    }

    #[test]
    fn elapsed_time_budget() {
        let controller = AdmissionController::from_config(
            PolicyConfig::new(ModuleLimits::unbounded(), Denylist::default(), LIMITS).with_budget(
                crate::config::BlockBudget {
                    max_transactions: None,
                    max_duration: Some(std::time::Duration::ZERO),
                },
            ),
        );
        let (pool, mut engine) = add_pool(3);
        let report = controller.build_block(&pool, &mut engine, &block(1)).unwrap();
        assert!(report.included.is_empty());
        assert!(report
            .verdicts
            .iter()
            .all(|v| v.verdict == Verdict::Excluded(Exclusion::BudgetExhausted)));
        assert!(report.trace.transactions.is_empty());
        assert!(report.module_counts.values().all(|&rows| rows == 0));
        assert_eq!(engine.discarded(), 0);
        assert!(engine.committed().is_empty());
    }

    #[test]
    fn malformed_trace_ends_the_pass() {
        let controller = AdmissionController::from_config(PolicyConfig::new(
            ModuleLimits::unbounded(),
            Denylist::default(),
            LIMITS,
        ));
        let (pool, mut engine) = add_pool(1);
        let mut steps = single_add(0, 1);
        steps[2].pushed = vec![7.into()];
        engine.insert(
            &pool[0],
            ExecutionRecord {
                steps,
                ..Default::default()
            },
        );
        assert!(matches!(
            controller.build_block(&pool, &mut engine, &block(1)),
            Err(BlockBuildingError::MalformedTrace {
                source: TraceError::ResultMismatch { .. },
                ..
            })
        ));
    }
}
