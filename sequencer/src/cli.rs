use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueHint};
use zk_tracer::{Denylist, ModuleLimits};

use crate::config::{
    load_denylist, load_module_limits, BlockBudget, PolicyConfig, TransactionLimits,
};

const HELP_HEADING: &str = "Policy options";

/// Block-building policy, from the command line or the environment.
#[derive(Args, Clone, PartialEq, Eq, Debug)]
pub struct CliPolicyConfig {
    /// Newline-delimited addresses that may not send, receive or be called
    /// by a transaction. Nothing is denied when absent.
    #[arg(long, env = "ZK_TRACER_DENY_LIST_PATH", help_heading = HELP_HEADING, value_hint = ValueHint::FilePath)]
    pub deny_list_path: Option<PathBuf>,
    /// JSON object mapping every trace module to its row limit per block.
    /// Modules are unbounded when absent.
    #[arg(long, env = "ZK_TRACER_MODULE_LIMIT_FILE_PATH", help_heading = HELP_HEADING, value_hint = ValueHint::FilePath)]
    pub module_limit_file_path: Option<PathBuf>,
    /// Largest calldata, in bytes, a single transaction may carry.
    #[arg(long, env = "ZK_TRACER_MAX_TX_CALLDATA_SIZE", help_heading = HELP_HEADING, default_value_t = 60_000)]
    pub max_tx_calldata_size: usize,
    /// Largest total calldata, in bytes, of the transactions of a block.
    #[arg(long, env = "ZK_TRACER_MAX_BLOCK_CALLDATA_SIZE", help_heading = HELP_HEADING, default_value_t = 70_000)]
    pub max_block_calldata_size: usize,
    /// Largest gas limit a single transaction may declare.
    #[arg(long, env = "ZK_TRACER_MAX_TX_GAS_LIMIT", help_heading = HELP_HEADING, default_value_t = 30_000_000)]
    pub max_tx_gas_limit: u64,
    /// Stop considering candidates once a block holds this many.
    #[arg(long, env = "ZK_TRACER_MAX_BLOCK_TRANSACTIONS", help_heading = HELP_HEADING)]
    pub max_block_transactions: Option<usize>,
    /// Stop considering candidates once a block pass has run this long.
    #[arg(long, env = "ZK_TRACER_MAX_BLOCK_BUILD_TIME_MS", help_heading = HELP_HEADING)]
    pub max_block_build_time_ms: Option<u64>,
}

impl CliPolicyConfig {
    pub fn load(&self) -> anyhow::Result<PolicyConfig> {
        let module_limits = match &self.module_limit_file_path {
            Some(path) => load_module_limits(path)?,
            None => {
                tracing::warn!("no module limit file given, trace modules are unbounded");
                ModuleLimits::unbounded()
            }
        };
        let denylist = match &self.deny_list_path {
            Some(path) => load_denylist(path)?,
            None => Denylist::default(),
        };
        Ok(PolicyConfig::new(module_limits, denylist, self.tx_limits()).with_budget(self.budget()))
    }

    pub fn tx_limits(&self) -> TransactionLimits {
        TransactionLimits {
            max_tx_calldata_size: self.max_tx_calldata_size,
            max_block_calldata_size: self.max_block_calldata_size,
            max_tx_gas_limit: self.max_tx_gas_limit,
        }
    }

    pub fn budget(&self) -> BlockBudget {
        BlockBudget {
            max_transactions: self.max_block_transactions,
            max_duration: self.max_block_build_time_ms.map(Duration::from_millis),
        }
    }
}
