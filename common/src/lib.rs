//! Value types shared by the tracer and the sequencer.
//!
//! The proving system works over a field much narrower than an EVM word, so
//! every 256-bit quantity that reaches a trace column is split into a high
//! and a low 128-bit limb. [`EncodedWord`] owns that split.

use ethereum_types::{Address, BigEndianHash, H256, U256};
use num_bigint::BigUint;

mod denylist;

pub use denylist::{Denylist, DenylistError};

/// Bit width of an EVM word.
pub const WORD_BITS: usize = 256;
/// Bit width of a single trace limb.
pub const LIMB_BITS: usize = 128;
/// Byte width of a single trace limb.
pub const LIMB_BYTES: usize = LIMB_BITS / 8;

/// Returned when a value does not fit in the expected number of bits.
#[derive(Clone, Copy, Debug, Eq, PartialEq, thiserror::Error)]
#[error("value of {bits} bits does not fit in a {width}-bit word")]
pub struct InvalidWidth {
    pub bits: usize,
    pub width: usize,
}

/// An immutable 256-bit unsigned value, traced as two 128-bit limbs.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct EncodedWord(U256);

impl EncodedWord {
    pub const ZERO: Self = Self(U256::zero());
    pub const MAX: Self = Self(U256::MAX);

    /// Builds a word from big-endian bytes. Leading zero bytes are ignored, so
    /// inputs longer than 32 bytes are accepted as long as the value fits.
    pub fn of_bytes(bytes: &[u8]) -> Result<Self, InvalidWidth> {
        let significant = match bytes.iter().position(|&b| b != 0) {
            Some(first) => &bytes[first..],
            None => return Ok(Self::ZERO),
        };
        if significant.len() > WORD_BITS / 8 {
            return Err(InvalidWidth {
                bits: significant.len() * 8 - significant[0].leading_zeros() as usize,
                width: WORD_BITS,
            });
        }
        Ok(Self(U256::from_big_endian(significant)))
    }

    /// Rebuilds a word from its two limbs. Each limb must fit in 128 bits.
    pub fn from_hi_lo(hi: U256, lo: U256) -> Result<Self, InvalidWidth> {
        for limb in [hi, lo] {
            if limb.bits() > LIMB_BITS {
                return Err(InvalidWidth {
                    bits: limb.bits(),
                    width: LIMB_BITS,
                });
            }
        }
        Ok(Self((hi << LIMB_BITS) | lo))
    }

    /// The most significant 128 bits.
    pub fn hi(&self) -> U256 {
        self.0 >> LIMB_BITS
    }

    /// The least significant 128 bits.
    pub fn lo(&self) -> U256 {
        U256::from(self.0.low_u128())
    }

    pub const fn value(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Number of significant bytes in the longer of the two limbs.
    pub fn limb_byte_len(&self) -> usize {
        self.hi().bits().max(self.lo().bits()).div_ceil(8)
    }
}

impl From<U256> for EncodedWord {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<u64> for EncodedWord {
    fn from(value: u64) -> Self {
        Self(value.into())
    }
}

impl From<Address> for EncodedWord {
    fn from(address: Address) -> Self {
        Self(U256::from_big_endian(address.as_bytes()))
    }
}

impl From<H256> for EncodedWord {
    fn from(hash: H256) -> Self {
        Self(hash.into_uint())
    }
}

impl From<EncodedWord> for U256 {
    fn from(word: EncodedWord) -> Self {
        word.0
    }
}

impl TryFrom<&BigUint> for EncodedWord {
    type Error = InvalidWidth;

    fn try_from(value: &BigUint) -> Result<Self, Self::Error> {
        let bits = value.bits() as usize;
        if bits > WORD_BITS {
            return Err(InvalidWidth {
                bits,
                width: WORD_BITS,
            });
        }
        Self::of_bytes(&value.to_bytes_be())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn roundtrip(value: U256) {
        let word = EncodedWord::from(value);
        let back = EncodedWord::from_hi_lo(word.hi(), word.lo()).unwrap();
        assert_eq!(back.value(), value);
    }

    #[test]
    fn hi_lo_roundtrip() {
        roundtrip(U256::zero());
        roundtrip(U256::one());
        roundtrip(U256::MAX);
        roundtrip(U256::from(u128::MAX));
        roundtrip(U256::from(u128::MAX) + 1);
        roundtrip(U256::from_dec_str("1461501637330902918203684832716283019655932542975").unwrap());
    }

    #[test]
    fn limbs_of_max() {
        let word = EncodedWord::MAX;
        assert_eq!(word.hi(), U256::from(u128::MAX));
        assert_eq!(word.lo(), U256::from(u128::MAX));
        assert_eq!(word.limb_byte_len(), 16);
        assert_eq!(EncodedWord::ZERO.limb_byte_len(), 0);
    }

    #[test]
    fn address_fits_in_low_limb_and_a_bit() {
        let address = Address::from_str("627306090abab3a6e1400e9345bc60c78a8bef57").unwrap();
        let word = EncodedWord::from(address);
        assert_eq!(word.hi(), U256::from(0x6273_0609u32));
        assert_eq!(
            word.lo(),
            U256::from(0x0aba_b3a6_e140_0e93_45bc_60c7_8a8b_ef57u128)
        );
    }

    #[test]
    fn bytes_wider_than_a_word() {
        let mut bytes = [0u8; 40];
        bytes[39] = 7;
        assert_eq!(EncodedWord::of_bytes(&bytes).unwrap().value(), U256::from(7));

        bytes[7] = 1;
        assert_eq!(
            EncodedWord::of_bytes(&bytes),
            Err(InvalidWidth {
                bits: 257,
                width: 256
            })
        );
        assert_eq!(EncodedWord::of_bytes(&[]).unwrap(), EncodedWord::ZERO);
    }

    #[test]
    fn big_integers() {
        let max = BigUint::from_bytes_be(&[0xff; 32]);
        assert_eq!(EncodedWord::try_from(&max).unwrap(), EncodedWord::MAX);

        let too_big = max + 1u8;
        assert_eq!(
            EncodedWord::try_from(&too_big),
            Err(InvalidWidth {
                bits: 257,
                width: 256
            })
        );
    }

    #[test]
    fn limbs_must_be_narrow() {
        assert!(EncodedWord::from_hi_lo(U256::one() << 128, U256::zero()).is_err());
        assert!(EncodedWord::from_hi_lo(U256::zero(), U256::one() << 128).is_err());
    }
}
