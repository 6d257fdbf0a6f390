use ethereum_types::{Address, U256};

use crate::error::TraceError;
use crate::step::TxOutcome;
use crate::trace::{Row, RowBuilder};
use crate::transaction::{BlockContext, Transaction};

/// Divisor bounding the refund to a fraction of the gas used (EIP-3529).
const MAX_REFUND_QUOTIENT: u64 = 5;

/// The part of the TXN_DATA row known before execution. It cannot be
/// emitted until [`DraftTransactionFragment::finalize`] adds the outcome.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DraftTransactionFragment {
    pub block_number: u64,
    pub nonce: u64,
    pub is_deployment: bool,
    pub from: Address,
    /// The recipient, or the deployed contract's address.
    pub to: Address,
    pub coinbase: Address,
    pub gas_price: U256,
    pub base_fee: U256,
    pub gas_limit: u64,
    /// Gas left for execution once the intrinsic cost is paid.
    pub init_gas: u64,
    pub value: U256,
    /// Balance of the sender before the transaction.
    pub initial_balance: U256,
    pub call_data_size: usize,
    pub requires_evm_execution: bool,
}

impl DraftTransactionFragment {
    pub fn prepare(
        tx: &Transaction,
        block: &BlockContext,
        requires_evm_execution: bool,
        initial_balance: U256,
    ) -> Self {
        Self {
            block_number: block.number,
            nonce: tx.nonce,
            is_deployment: tx.is_deployment(),
            from: tx.sender,
            to: tx.effective_recipient(),
            coinbase: block.coinbase,
            gas_price: tx.gas_price,
            base_fee: block.base_fee,
            gas_limit: tx.gas_limit,
            init_gas: tx.gas_limit.saturating_sub(tx.intrinsic_gas()),
            value: tx.value,
            initial_balance,
            call_data_size: tx.calldata_size(),
            requires_evm_execution,
        }
    }

    pub fn finalize(self, outcome: &TxOutcome) -> TransactionFragment {
        let gas_used = self.gas_limit.saturating_sub(outcome.leftover_gas);
        let refund_amount = outcome
            .refund_counter
            .min(gas_used / MAX_REFUND_QUOTIENT);
        TransactionFragment {
            draft: self,
            leftover_gas: outcome.leftover_gas,
            refund_counter_final: outcome.refund_counter,
            refund_amount,
            success: outcome.success,
        }
    }
}

/// The TXN_DATA row of an executed transaction.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransactionFragment {
    pub draft: DraftTransactionFragment,
    pub leftover_gas: u64,
    pub refund_counter_final: u64,
    pub refund_amount: u64,
    pub success: bool,
}

impl TransactionFragment {
    pub(super) fn row(&self, row: RowBuilder) -> Result<Row, TraceError> {
        let draft = &self.draft;
        row.set("BLOCK_NUMBER", draft.block_number)
            .set("NONCE", draft.nonce)
            .flag("IS_DEPLOYMENT", draft.is_deployment)
            .word("FROM_HI", "FROM_LO", draft.from.into())
            .word("TO_HI", "TO_LO", draft.to.into())
            .word("COINBASE_HI", "COINBASE_LO", draft.coinbase.into())
            .set("GAS_PRICE", draft.gas_price)
            .set("BASEFEE", draft.base_fee)
            .set("GAS_LIMIT", draft.gas_limit)
            .set("INIT_GAS", draft.init_gas)
            .word("VALUE_HI", "VALUE_LO", draft.value.into())
            .set("INITIAL_BALANCE", draft.initial_balance)
            .set("CALL_DATA_SIZE", draft.call_data_size)
            .flag("REQUIRES_EVM_EXECUTION", draft.requires_evm_execution)
            .set("LEFTOVER_GAS", self.leftover_gas)
            .set("REFUND_COUNTER_FINAL", self.refund_counter_final)
            .set("REFUND_AMOUNT", self.refund_amount)
            .flag("STATUS_CODE", self.success)
            .finish()
    }
}
