use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::columns;
use crate::fragment::TraceFragment;

/// Associates trace modules with a unique index.
#[derive(
    Clone,
    Copy,
    Debug,
    Eq,
    PartialEq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
    strum::IntoStaticStr,
)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ModuleId {
    Hub = 0,
    TxnData = 1,
    Stack = 2,
    Mmu = 3,
    Storage = 4,
    Context = 5,
    Add = 6,
    Mul = 7,
    Mod = 8,
    Ext = 9,
    Wcp = 10,
    Bin = 11,
    Shf = 12,
}

/// Number of trace modules.
pub const NUM_MODULES: usize = ModuleId::Shf as usize + 1;

impl ModuleId {
    /// Returns all module identifiers.
    pub const fn all() -> [Self; NUM_MODULES] {
        [
            Self::Hub,
            Self::TxnData,
            Self::Stack,
            Self::Mmu,
            Self::Storage,
            Self::Context,
            Self::Add,
            Self::Mul,
            Self::Mod,
            Self::Ext,
            Self::Wcp,
            Self::Bin,
            Self::Shf,
        ]
    }

    /// The module's columns, in the order every row writes them.
    pub const fn columns(&self) -> &'static [&'static str] {
        match self {
            Self::Hub => columns::HUB,
            Self::TxnData => columns::TXN_DATA,
            Self::Stack => columns::STACK,
            Self::Mmu => columns::MMU,
            Self::Storage => columns::STORAGE,
            Self::Context => columns::CONTEXT,
            Self::Add | Self::Mul | Self::Mod | Self::Ext | Self::Wcp | Self::Bin | Self::Shf => {
                columns::ARITHMETIC
            }
        }
    }
}

/// Row counts per module.
pub type ModuleCounts = BTreeMap<ModuleId, usize>;

#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum LimitsError {
    #[error("unknown module `{0}` in row limits")]
    UnknownModule(String),
    #[error("no row limit configured for module {0}")]
    MissingModuleLimit(ModuleId),
}

/// Maximum number of rows each module may hold within one block.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ModuleLimits([usize; NUM_MODULES]);

impl ModuleLimits {
    /// Limits that never overflow.
    pub const fn unbounded() -> Self {
        Self([usize::MAX; NUM_MODULES])
    }

    /// Builds limits from `(module name, row limit)` entries. Every module
    /// must appear, and every name must be a known module.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, LimitsError>
    where
        I: IntoIterator<Item = (S, usize)>,
        S: AsRef<str>,
    {
        let mut limits = [None; NUM_MODULES];
        for (name, limit) in entries {
            let name = name.as_ref();
            let id: ModuleId = name
                .parse()
                .map_err(|_| LimitsError::UnknownModule(name.to_string()))?;
            limits[id as usize] = Some(limit);
        }

        let mut resolved = [0; NUM_MODULES];
        for id in ModuleId::all() {
            resolved[id as usize] =
                limits[id as usize].ok_or(LimitsError::MissingModuleLimit(id))?;
        }
        Ok(Self(resolved))
    }

    pub fn with_limit(mut self, id: ModuleId, limit: usize) -> Self {
        self.0[id as usize] = limit;
        self
    }

    pub const fn get(&self, id: ModuleId) -> usize {
        self.0[id as usize]
    }
}

impl Default for ModuleLimits {
    fn default() -> Self {
        Self::unbounded()
    }
}

/// A capacity-bounded trace table. A module only counts rows: the fragments
/// themselves live in the hub's log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Module {
    id: ModuleId,
    limit: usize,
    rows: usize,
    /// Row count at the last commit point.
    committed: usize,
}

impl Module {
    pub const fn new(id: ModuleId, limit: usize) -> Self {
        Self {
            id,
            limit,
            rows: 0,
            committed: 0,
        }
    }

    pub const fn id(&self) -> ModuleId {
        self.id
    }

    pub const fn limit(&self) -> usize {
        self.limit
    }

    pub const fn line_count(&self) -> usize {
        self.rows
    }

    /// Appends the fragment's rows and returns the index of the first one.
    /// Never fails: going over the limit is for the caller to police.
    pub fn record(&mut self, fragment: &TraceFragment) -> usize {
        debug_assert_eq!(fragment.module(), self.id);
        let first = self.rows;
        self.rows += fragment.line_count();
        first
    }

    /// Rows left before the limit, or `None` once the module is over budget.
    pub const fn remaining_capacity(&self) -> Option<usize> {
        self.limit.checked_sub(self.rows)
    }

    pub const fn is_overflowing(&self) -> bool {
        self.rows > self.limit
    }

    /// Discards the rows recorded since the last commit point.
    pub fn reset(&mut self) {
        self.rows = self.committed;
    }

    pub fn commit(&mut self) {
        self.committed = self.rows;
    }
}

/// The full set of modules of one hub, indexed by [`ModuleId`].
#[derive(Clone, Debug)]
pub struct ModuleSet {
    modules: [Module; NUM_MODULES],
}

impl ModuleSet {
    pub fn new(limits: &ModuleLimits) -> Self {
        Self {
            modules: ModuleId::all().map(|id| Module::new(id, limits.get(id))),
        }
    }

    pub const fn get(&self, id: ModuleId) -> &Module {
        &self.modules[id as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = &Module> {
        self.modules.iter()
    }

    pub fn record(&mut self, fragment: &TraceFragment) -> usize {
        self.modules[fragment.module() as usize].record(fragment)
    }

    pub fn commit(&mut self) {
        self.modules.iter_mut().for_each(Module::commit);
    }

    pub fn reset(&mut self) {
        self.modules.iter_mut().for_each(Module::reset);
    }

    pub fn counts(&self) -> ModuleCounts {
        self.modules
            .iter()
            .map(|module| (module.id, module.rows))
            .collect()
    }

    /// Modules whose row count is above their limit.
    pub fn overflowing(&self) -> Vec<ModuleId> {
        self.modules
            .iter()
            .filter(|module| module.is_overflowing())
            .map(Module::id)
            .collect()
    }
}
