//! Block-building policy: module row limits, the denylist and the
//! per-transaction and per-block limits.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use zk_tracer::{Denylist, LimitsError, ModuleLimits};
use zk_tracer_common::DenylistError;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid module limits: {0}")]
    Json(#[from] serde_path_to_error::Error<serde_json::Error>),
    #[error(transparent)]
    Limits(#[from] LimitsError),
    #[error("invalid denylist: {0}")]
    Denylist(#[from] DenylistError),
}

/// Limits every single transaction and the block as a whole must respect.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct TransactionLimits {
    pub max_tx_calldata_size: usize,
    pub max_block_calldata_size: usize,
    pub max_tx_gas_limit: u64,
}

/// When a block pass stops considering candidates. `None` is unlimited.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct BlockBudget {
    pub max_transactions: Option<usize>,
    pub max_duration: Option<Duration>,
}

/// Everything a block pass needs to decide on candidates. Immutable once
/// built; see [`PolicyHandle`] to change it between blocks.
#[derive(Clone, Debug)]
pub struct PolicyConfig {
    pub module_limits: Arc<ModuleLimits>,
    pub denylist: Arc<Denylist>,
    pub tx_limits: TransactionLimits,
    pub budget: BlockBudget,
}

impl PolicyConfig {
    pub fn new(
        module_limits: ModuleLimits,
        denylist: Denylist,
        tx_limits: TransactionLimits,
    ) -> Self {
        Self {
            module_limits: Arc::new(module_limits),
            denylist: Arc::new(denylist),
            tx_limits,
            budget: BlockBudget::default(),
        }
    }

    pub fn with_budget(mut self, budget: BlockBudget) -> Self {
        self.budget = budget;
        self
    }
}

/// Shares the current policy between the block builder and whoever updates
/// it. Readers take a snapshot at the start of a block and keep it until the
/// block is sealed.
#[derive(Debug)]
pub struct PolicyHandle(RwLock<Arc<PolicyConfig>>);

impl PolicyHandle {
    pub fn new(config: PolicyConfig) -> Self {
        Self(RwLock::new(Arc::new(config)))
    }

    pub fn current(&self) -> Arc<PolicyConfig> {
        self.0.read().clone()
    }

    /// Installs `config` for the next block and returns the previous policy.
    pub fn replace(&self, config: PolicyConfig) -> Arc<PolicyConfig> {
        std::mem::replace(&mut *self.0.write(), Arc::new(config))
    }
}

/// Parses a JSON object mapping every module name to its row limit.
pub fn parse_module_limits(json: &str) -> Result<ModuleLimits, ConfigError> {
    let de = &mut serde_json::Deserializer::from_str(json);
    let entries: BTreeMap<String, usize> = serde_path_to_error::deserialize(de)?;
    Ok(ModuleLimits::from_entries(entries)?)
}

pub fn load_module_limits(path: &Path) -> anyhow::Result<ModuleLimits> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read module limits from {}", path.display()))?;
    let limits = parse_module_limits(&json)
        .with_context(|| format!("Failed to load module limits from {}", path.display()))?;
    tracing::info!("loaded module limits from {}", path.display());
    Ok(limits)
}

pub fn load_denylist(path: &Path) -> anyhow::Result<Denylist> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read denylist from {}", path.display()))?;
    let denylist = Denylist::parse(&text)
        .map_err(ConfigError::from)
        .with_context(|| format!("Failed to load denylist from {}", path.display()))?;
    tracing::info!(
        "loaded {} denylisted addresses from {}",
        denylist.len(),
        path.display()
    );
    Ok(denylist)
}

/// Reads a JSON file, naming the path of the offending field on failure.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let de = &mut serde_json::Deserializer::from_reader(BufReader::new(file));
    serde_path_to_error::deserialize(de)
        .with_context(|| format!("Failed to parse {}", path.display()))
}
