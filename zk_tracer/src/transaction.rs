use ethereum_types::{Address, H256, U256};
use keccak_hash::keccak;
use rlp::RlpStream;
use serde::{Deserialize, Serialize};

/// Base cost of any transaction.
pub const TX_BASE_GAS: u64 = 21_000;
/// Extra cost of a contract deployment.
pub const TX_CREATE_GAS: u64 = 32_000;
pub const TX_DATA_ZERO_GAS: u64 = 4;
pub const TX_DATA_NON_ZERO_GAS: u64 = 16;

/// A candidate transaction.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub sender: Address,
    /// `None` for contract deployments.
    #[serde(default)]
    pub recipient: Option<Address>,
    #[serde(default, with = "crate::hex")]
    pub data: Vec<u8>,
    pub gas_limit: u64,
    pub gas_price: U256,
    pub nonce: u64,
    #[serde(default)]
    pub value: U256,
}

impl Transaction {
    /// Identifies the candidate: keccak of the RLP list of its fields,
    /// sender first since the transaction carries no signature.
    pub fn hash(&self) -> H256 {
        let mut stream = RlpStream::new_list(7);
        stream.append(&self.sender);
        stream.append(&self.nonce);
        stream.append(&self.gas_price);
        stream.append(&self.gas_limit);
        match &self.recipient {
            Some(to) => stream.append(to),
            None => stream.append_empty_data(),
        };
        stream.append(&self.value);
        stream.append(&self.data.as_slice());
        keccak(stream.out())
    }

    pub const fn is_deployment(&self) -> bool {
        self.recipient.is_none()
    }

    /// The recipient, or the address of the deployed contract.
    pub fn effective_recipient(&self) -> Address {
        self.recipient
            .unwrap_or_else(|| contract_address(self.sender, self.nonce))
    }

    pub fn calldata_size(&self) -> usize {
        self.data.len()
    }

    /// Gas charged before the first instruction executes.
    pub fn intrinsic_gas(&self) -> u64 {
        let data_gas: u64 = self
            .data
            .iter()
            .map(|&b| match b {
                0 => TX_DATA_ZERO_GAS,
                _ => TX_DATA_NON_ZERO_GAS,
            })
            .sum();
        let create_gas = if self.is_deployment() {
            TX_CREATE_GAS
        } else {
            0
        };
        TX_BASE_GAS + data_gas + create_gas
    }
}

/// Address of a contract deployed by `sender` with `nonce`.
pub fn contract_address(sender: Address, nonce: u64) -> Address {
    let mut stream = RlpStream::new_list(2);
    stream.append(&sender);
    stream.append(&nonce);
    Address::from_slice(&keccak(stream.out()).as_bytes()[12..])
}

/// Block-level values every transaction of the block shares.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockContext {
    pub number: u64,
    pub coinbase: Address,
    pub base_fee: U256,
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use hex_literal::hex;

    use super::*;

    #[test]
    fn deployment_address() {
        // First contract deployed by this account.
        let sender = Address::from_str("6ac7ea33f8831ea9dcc53393aaa88b25a785dbf0").unwrap();
        assert_eq!(
            contract_address(sender, 0),
            Address::from(hex!("cd234a471b72ba2f1ccf0a70fcaba648a5eecd8d"))
        );
        assert_eq!(
            contract_address(sender, 1),
            Address::from(hex!("343c43a37d37dff08ae8c4a11544c718abb4fcf8"))
        );
    }

    #[test]
    fn intrinsic_gas() {
        let mut tx = Transaction {
            recipient: Some(Address::repeat_byte(1)),
            data: vec![0, 0, 1],
            ..Default::default()
        };
        assert_eq!(tx.intrinsic_gas(), 21_000 + 4 + 4 + 16);
        tx.recipient = None;
        assert_eq!(tx.intrinsic_gas(), 21_000 + 4 + 4 + 16 + 32_000);
    }

    #[test]
    fn hash_covers_every_field() {
        let tx = Transaction {
            sender: Address::repeat_byte(1),
            recipient: Some(Address::repeat_byte(2)),
            gas_limit: 21_000,
            ..Default::default()
        };
        let other = Transaction {
            nonce: 1,
            ..tx.clone()
        };
        assert_ne!(tx.hash(), other.hash());
        let other = Transaction {
            sender: Address::repeat_byte(3),
            ..tx.clone()
        };
        assert_ne!(tx.hash(), other.hash());
        assert_eq!(tx.hash(), tx.clone().hash());
    }

    #[test]
    fn json_data_accepts_prefix() {
        let tx: Transaction = serde_json::from_str(
            r#"{"sender":"0x0000000000000000000000000000000000000001","data":"0xdead",
               "gasLimit":21000,"gasPrice":"0x1","nonce":0}"#,
        )
        .unwrap();
        assert_eq!(tx.data, vec![0xde, 0xad]);
        assert!(tx.is_deployment());
        assert_eq!(tx.value, U256::zero());
    }
}
