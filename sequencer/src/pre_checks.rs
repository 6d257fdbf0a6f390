//! Checks a candidate must pass before it is executed at all.

use ethereum_types::Address;
use zk_tracer::{Denylist, Transaction};

use crate::config::TransactionLimits;

/// Highest address of the precompiled contracts.
const LAST_PRECOMPILE: u64 = 0x0a;

/// Why a candidate can never be included, in any block.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum PolicyRejection {
    #[error("sender {0:#x} is blocked as appearing on the SDN or other legally prohibited list")]
    DeniedSender(Address),
    #[error("recipient {0:#x} is blocked as appearing on the SDN or other legally prohibited list")]
    DeniedRecipient(Address),
    #[error("call target {0:#x} is blocked as appearing on the SDN or other legally prohibited list")]
    DeniedCallTarget(Address),
    #[error("destination address is a precompile address and cannot receive transactions")]
    PrecompileRecipient(Address),
    #[error("calldata of {size} bytes exceeds the maximum of {max} bytes")]
    CalldataTooLarge { size: usize, max: usize },
    #[error("gas limit {gas_limit} exceeds the maximum of {max}")]
    GasLimitTooLarge { gas_limit: u64, max: u64 },
}

pub fn is_precompile(address: &Address) -> bool {
    let (high, low) = address.as_bytes().split_at(Address::len_bytes() - 1);
    high.iter().all(|&b| b == 0) && (1..=LAST_PRECOMPILE).contains(&u64::from(low[0]))
}

/// Rejects `tx` on its sender, recipient, calldata size or gas limit. Call
/// targets are only known once the transaction runs.
pub fn check_transaction(
    tx: &Transaction,
    denylist: &Denylist,
    limits: &TransactionLimits,
) -> Result<(), PolicyRejection> {
    if denylist.contains(&tx.sender) {
        return Err(PolicyRejection::DeniedSender(tx.sender));
    }
    if let Some(recipient) = tx.recipient {
        if denylist.contains(&recipient) {
            return Err(PolicyRejection::DeniedRecipient(recipient));
        }
        if is_precompile(&recipient) {
            return Err(PolicyRejection::PrecompileRecipient(recipient));
        }
    }

    let size = tx.calldata_size();
    if size > limits.max_tx_calldata_size {
        return Err(PolicyRejection::CalldataTooLarge {
            size,
            max: limits.max_tx_calldata_size,
        });
    }
    if tx.gas_limit > limits.max_tx_gas_limit {
        return Err(PolicyRejection::GasLimitTooLarge {
            gas_limit: tx.gas_limit,
            max: limits.max_tx_gas_limit,
        });
    }
    Ok(())
}
