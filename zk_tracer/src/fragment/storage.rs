use ethereum_types::{Address, U256};

use crate::error::TraceError;
use crate::trace::{Row, RowBuilder};

/// A persistent or transient storage access of the executing account.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct StorageFragment {
    pub hub_stamp: usize,
    pub address: Address,
    pub key: U256,
    /// The value read, or the value written.
    pub value: U256,
    pub is_write: bool,
    pub is_transient: bool,
}

impl StorageFragment {
    pub(super) fn row(&self, row: RowBuilder) -> Result<Row, TraceError> {
        row.set("HUB_STAMP", self.hub_stamp)
            .word("ADDRESS_HI", "ADDRESS_LO", self.address.into())
            .word("KEY_HI", "KEY_LO", self.key.into())
            .word("VALUE_HI", "VALUE_LO", self.value.into())
            .flag("IS_WRITE", self.is_write)
            .flag("IS_TRANSIENT", self.is_transient)
            .finish()
    }
}
