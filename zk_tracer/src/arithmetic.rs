//! EVM semantics of the stack-arithmetic opcodes, and the number of rows each
//! operation costs in the module that proves it.

use ethereum_types::{U256, U512};
use zk_tracer_common::{EncodedWord, LIMB_BYTES, WORD_BITS};

use crate::module::ModuleId;

/// Every opcode whose result is recomputed and proven by one of the
/// arithmetic modules.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, strum::EnumIter, strum::IntoStaticStr)]
#[strum(serialize_all = "UPPERCASE")]
pub enum Operator {
    Add,
    Mul,
    Sub,
    Div,
    Sdiv,
    Mod,
    Smod,
    AddMod,
    MulMod,
    Exp,
    SignExtend,
    Lt,
    Gt,
    Slt,
    Sgt,
    Eq,
    IsZero,
    And,
    Or,
    Xor,
    Not,
    Byte,
    Shl,
    Shr,
    Sar,
}

impl Operator {
    pub(crate) const fn from_opcode(opcode: u8) -> Option<Self> {
        Some(match opcode {
            0x01 => Self::Add,
            0x02 => Self::Mul,
            0x03 => Self::Sub,
            0x04 => Self::Div,
            0x05 => Self::Sdiv,
            0x06 => Self::Mod,
            0x07 => Self::Smod,
            0x08 => Self::AddMod,
            0x09 => Self::MulMod,
            0x0a => Self::Exp,
            0x0b => Self::SignExtend,
            0x10 => Self::Lt,
            0x11 => Self::Gt,
            0x12 => Self::Slt,
            0x13 => Self::Sgt,
            0x14 => Self::Eq,
            0x15 => Self::IsZero,
            0x16 => Self::And,
            0x17 => Self::Or,
            0x18 => Self::Xor,
            0x19 => Self::Not,
            0x1a => Self::Byte,
            0x1b => Self::Shl,
            0x1c => Self::Shr,
            0x1d => Self::Sar,
            _ => return None,
        })
    }

    pub const fn opcode(&self) -> u8 {
        match self {
            Self::Add => 0x01,
            Self::Mul => 0x02,
            Self::Sub => 0x03,
            Self::Div => 0x04,
            Self::Sdiv => 0x05,
            Self::Mod => 0x06,
            Self::Smod => 0x07,
            Self::AddMod => 0x08,
            Self::MulMod => 0x09,
            Self::Exp => 0x0a,
            Self::SignExtend => 0x0b,
            Self::Lt => 0x10,
            Self::Gt => 0x11,
            Self::Slt => 0x12,
            Self::Sgt => 0x13,
            Self::Eq => 0x14,
            Self::IsZero => 0x15,
            Self::And => 0x16,
            Self::Or => 0x17,
            Self::Xor => 0x18,
            Self::Not => 0x19,
            Self::Byte => 0x1a,
            Self::Shl => 0x1b,
            Self::Shr => 0x1c,
            Self::Sar => 0x1d,
        }
    }

    /// Number of stack operands.
    pub const fn arity(&self) -> usize {
        match self {
            Self::IsZero | Self::Not => 1,
            Self::AddMod | Self::MulMod => 3,
            _ => 2,
        }
    }

    /// The module in charge of proving this operator.
    pub const fn module(&self) -> ModuleId {
        match self {
            Self::Add | Self::Sub => ModuleId::Add,
            Self::Mul | Self::Exp => ModuleId::Mul,
            Self::Div | Self::Sdiv | Self::Mod | Self::Smod => ModuleId::Mod,
            Self::AddMod | Self::MulMod => ModuleId::Ext,
            Self::Lt | Self::Gt | Self::Slt | Self::Sgt | Self::Eq | Self::IsZero => ModuleId::Wcp,
            Self::And | Self::Or | Self::Xor | Self::Not | Self::Byte | Self::SignExtend => {
                ModuleId::Bin
            }
            Self::Shl | Self::Shr | Self::Sar => ModuleId::Shf,
        }
    }

    pub fn mnemonic(&self) -> &'static str {
        self.into()
    }

    /// Computes the result of the operator on stack operands given top first.
    /// `args` must hold at least [`Self::arity`] values.
    pub(crate) fn result(&self, args: &[U256]) -> U256 {
        let a = args[0];
        let b = args.get(1).copied().unwrap_or_default();
        match self {
            Self::Add => a.overflowing_add(b).0,
            Self::Mul => a.overflowing_mul(b).0,
            Self::Sub => a.overflowing_sub(b).0,
            Self::Div => a.checked_div(b).unwrap_or_default(),
            Self::Sdiv => sdiv(a, b),
            Self::Mod => a.checked_rem(b).unwrap_or_default(),
            Self::Smod => smod(a, b),
            Self::AddMod => {
                let sum = U512::from(a) + U512::from(b);
                modulo(sum, args[2])
            }
            Self::MulMod => modulo(a.full_mul(b), args[2]),
            Self::Exp => a.overflowing_pow(b).0,
            Self::SignExtend => sign_extend(a, b),
            Self::Lt => bool_word(a < b),
            Self::Gt => bool_word(a > b),
            Self::Slt => bool_word(signed_lt(a, b)),
            Self::Sgt => bool_word(signed_lt(b, a)),
            Self::Eq => bool_word(a == b),
            Self::IsZero => bool_word(a.is_zero()),
            Self::And => a & b,
            Self::Or => a | b,
            Self::Xor => a ^ b,
            Self::Not => !a,
            Self::Byte => {
                if a < U256::from(32) {
                    U256::from(b.byte(31 - a.as_usize()))
                } else {
                    U256::zero()
                }
            }
            Self::Shl => match shift_amount(a) {
                Some(shift) => b << shift,
                None => U256::zero(),
            },
            Self::Shr => match shift_amount(a) {
                Some(shift) => b >> shift,
                None => U256::zero(),
            },
            Self::Sar => {
                let negative = is_negative(b);
                match (shift_amount(a), negative) {
                    (Some(shift), false) => b >> shift,
                    (Some(shift), true) => !(!b >> shift),
                    (None, false) => U256::zero(),
                    (None, true) => U256::MAX,
                }
            }
        }
    }

    /// Number of rows an operation with these operands takes in
    /// [`Self::module`].
    pub(crate) fn line_count(&self, args: &[U256]) -> usize {
        let arg = |i: usize| args.get(i).copied().unwrap_or_default();
        let one = U256::one();
        match self {
            Self::Add | Self::Sub => 16,
            Self::Mul => {
                if arg(0) <= one || arg(1) <= one {
                    1
                } else {
                    8
                }
            }
            Self::Exp => {
                let (base, exponent) = (arg(0), arg(1));
                if base <= one || exponent <= one {
                    1
                } else {
                    exponent.bits() + popcount(exponent)
                }
            }
            Self::Div | Self::Sdiv | Self::Mod | Self::Smod => {
                if arg(1).is_zero() {
                    1
                } else {
                    8
                }
            }
            Self::AddMod | Self::MulMod => {
                if arg(2) <= one {
                    1
                } else {
                    8
                }
            }
            Self::Lt
            | Self::Gt
            | Self::Slt
            | Self::Sgt
            | Self::Eq
            | Self::IsZero
            | Self::And
            | Self::Or
            | Self::Xor
            | Self::Not
            | Self::Byte
            | Self::SignExtend => args
                .iter()
                .take(self.arity())
                .map(|&v| EncodedWord::from(v).limb_byte_len())
                .max()
                .unwrap_or_default()
                .max(1),
            Self::Shl | Self::Shr | Self::Sar => {
                if shift_amount(arg(0)).is_some() {
                    16
                } else {
                    1
                }
            }
        }
    }
}

/// An arithmetic operation with its operands and its checked result.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Operation {
    pub operator: Operator,
    /// Operands top first, padded with zeros to three.
    pub args: [U256; 3],
    pub result: U256,
}

impl Operation {
    /// Builds the operation from the operands, computing the result.
    pub fn new(operator: Operator, operands: &[U256]) -> Self {
        let mut args = [U256::zero(); 3];
        for (slot, &value) in args.iter_mut().zip(operands.iter().take(operator.arity())) {
            *slot = value;
        }
        let result = operator.result(&args);
        Self {
            operator,
            args,
            result,
        }
    }

    pub fn line_count(&self) -> usize {
        self.operator.line_count(&self.args)
    }
}

/// Byte `index` of a 128-bit limb, counted from the least significant end.
/// Positions past the limb width read as zero.
pub(crate) fn limb_byte(limb: U256, index: usize) -> u8 {
    if index < LIMB_BYTES {
        limb.byte(index)
    } else {
        0
    }
}

fn bool_word(b: bool) -> U256 {
    if b {
        U256::one()
    } else {
        U256::zero()
    }
}

fn is_negative(x: U256) -> bool {
    x.bit(WORD_BITS - 1)
}

fn negate(x: U256) -> U256 {
    (!x).overflowing_add(U256::one()).0
}

fn abs(x: U256) -> U256 {
    if is_negative(x) {
        negate(x)
    } else {
        x
    }
}

fn signed_lt(a: U256, b: U256) -> bool {
    match (is_negative(a), is_negative(b)) {
        (true, false) => true,
        (false, true) => false,
        _ => a < b,
    }
}

fn sdiv(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let quotient = abs(a) / abs(b);
    if is_negative(a) != is_negative(b) {
        negate(quotient)
    } else {
        quotient
    }
}

fn smod(a: U256, b: U256) -> U256 {
    if b.is_zero() {
        return U256::zero();
    }
    let remainder = abs(a) % abs(b);
    if is_negative(a) {
        negate(remainder)
    } else {
        remainder
    }
}

fn modulo(value: U512, modulus: U256) -> U256 {
    if modulus.is_zero() {
        return U256::zero();
    }
    // The remainder is below the modulus, so the upper limbs are empty.
    let rem = value % U512::from(modulus);
    U256([rem.0[0], rem.0[1], rem.0[2], rem.0[3]])
}

fn sign_extend(byte_index: U256, value: U256) -> U256 {
    if byte_index >= U256::from(31) {
        return value;
    }
    let sign_bit = byte_index.as_usize() * 8 + 7;
    let low_mask = (U256::one() << (sign_bit + 1)) - U256::one();
    if value.bit(sign_bit) {
        value | !low_mask
    } else {
        value & low_mask
    }
}

fn shift_amount(shift: U256) -> Option<usize> {
    (shift < U256::from(WORD_BITS)).then(|| shift.as_usize())
}

fn popcount(value: U256) -> usize {
    value.0.iter().map(|limb| limb.count_ones() as usize).sum()
}

#[cfg(test)]
mod tests {
    use strum::IntoEnumIterator;

    use super::*;

    fn minus(n: u64) -> U256 {
        negate(U256::from(n))
    }

    fn run(operator: Operator, args: &[U256]) -> U256 {
        Operation::new(operator, args).result
    }

    #[test]
    fn opcodes_roundtrip() {
        for operator in Operator::iter() {
            assert_eq!(Operator::from_opcode(operator.opcode()), Some(operator));
        }
        assert_eq!(Operator::iter().count(), 25);
        assert_eq!(Operator::AddMod.mnemonic(), "ADDMOD");
        assert_eq!(Operator::SignExtend.mnemonic(), "SIGNEXTEND");
    }

    #[test]
    fn wrapping_add_sub_mul() {
        assert_eq!(run(Operator::Add, &[U256::MAX, U256::one()]), U256::zero());
        assert_eq!(run(Operator::Sub, &[U256::zero(), U256::one()]), U256::MAX);
        assert_eq!(run(Operator::Mul, &[U256::MAX, 2.into()]), minus(2));
    }

    #[test]
    fn division_by_zero_is_zero() {
        for operator in [Operator::Div, Operator::Sdiv, Operator::Mod, Operator::Smod] {
            assert_eq!(run(operator, &[7.into(), U256::zero()]), U256::zero());
        }
        assert_eq!(
            run(Operator::AddMod, &[7.into(), 8.into(), U256::zero()]),
            U256::zero()
        );
    }

    #[test]
    fn signed_division() {
        assert_eq!(run(Operator::Sdiv, &[minus(10), 3.into()]), minus(3));
        assert_eq!(run(Operator::Sdiv, &[minus(10), minus(3)]), 3.into());
        assert_eq!(run(Operator::Smod, &[minus(10), 3.into()]), minus(1));
        assert_eq!(run(Operator::Smod, &[10.into(), minus(3)]), 1.into());

        let min = U256::one() << 255;
        assert_eq!(run(Operator::Sdiv, &[min, U256::MAX]), min);
    }

    #[test]
    fn modular_arithmetic_uses_wide_intermediates() {
        assert_eq!(
            run(Operator::AddMod, &[U256::MAX, U256::MAX, 10.into()]),
            U256::from(0)
        );
        assert_eq!(
            run(Operator::AddMod, &[U256::MAX, 2.into(), U256::MAX]),
            2.into()
        );
        assert_eq!(
            run(Operator::MulMod, &[U256::MAX, U256::MAX, 12.into()]),
            9.into()
        );
    }

    #[test]
    fn comparisons() {
        assert_eq!(run(Operator::Lt, &[1.into(), 2.into()]), U256::one());
        assert_eq!(run(Operator::Gt, &[1.into(), 2.into()]), U256::zero());
        assert_eq!(run(Operator::Slt, &[minus(1), 0.into()]), U256::one());
        assert_eq!(run(Operator::Sgt, &[minus(1), 0.into()]), U256::zero());
        assert_eq!(run(Operator::Eq, &[5.into(), 5.into()]), U256::one());
        assert_eq!(run(Operator::IsZero, &[U256::zero()]), U256::one());
    }

    #[test]
    fn bitwise_and_bytes() {
        assert_eq!(run(Operator::Not, &[U256::zero()]), U256::MAX);
        assert_eq!(run(Operator::Byte, &[31.into(), 0xabcd.into()]), 0xcd.into());
        assert_eq!(run(Operator::Byte, &[30.into(), 0xabcd.into()]), 0xab.into());
        assert_eq!(run(Operator::Byte, &[32.into(), U256::MAX]), U256::zero());
        assert_eq!(run(Operator::SignExtend, &[0.into(), 0xff.into()]), U256::MAX);
        assert_eq!(run(Operator::SignExtend, &[0.into(), 0x17f.into()]), 0x7f.into());
        assert_eq!(run(Operator::SignExtend, &[31.into(), 0x80.into()]), 0x80.into());
    }

    #[test]
    fn shifts() {
        assert_eq!(run(Operator::Shl, &[4.into(), 1.into()]), 16.into());
        assert_eq!(run(Operator::Shl, &[256.into(), 1.into()]), U256::zero());
        assert_eq!(run(Operator::Shr, &[4.into(), 16.into()]), 1.into());
        assert_eq!(run(Operator::Sar, &[4.into(), minus(16)]), minus(1));
        assert_eq!(run(Operator::Sar, &[300.into(), minus(16)]), U256::MAX);
        assert_eq!(run(Operator::Sar, &[300.into(), 16.into()]), U256::zero());
    }

    #[test]
    fn exponentiation() {
        assert_eq!(run(Operator::Exp, &[2.into(), 10.into()]), 1024.into());
        assert_eq!(run(Operator::Exp, &[2.into(), 256.into()]), U256::zero());
    }

    #[test]
    fn row_costs() {
        let cost = |operator: Operator, args: &[U256]| Operation::new(operator, args).line_count();

        assert_eq!(cost(Operator::Add, &[1.into(), 2.into()]), 16);
        assert_eq!(cost(Operator::Mul, &[1.into(), 9.into()]), 1);
        assert_eq!(cost(Operator::Mul, &[3.into(), 9.into()]), 8);
        assert_eq!(cost(Operator::Exp, &[3.into(), 1.into()]), 1);
        // 0b1011: four bits, three set.
        assert_eq!(cost(Operator::Exp, &[3.into(), 11.into()]), 7);
        assert_eq!(cost(Operator::Div, &[3.into(), 0.into()]), 1);
        assert_eq!(cost(Operator::Smod, &[3.into(), 2.into()]), 8);
        assert_eq!(cost(Operator::MulMod, &[3.into(), 2.into(), 1.into()]), 1);
        assert_eq!(cost(Operator::AddMod, &[3.into(), 2.into(), 5.into()]), 8);
        assert_eq!(cost(Operator::Lt, &[0.into(), 0.into()]), 1);
        assert_eq!(cost(Operator::Lt, &[0x1234.into(), 0.into()]), 2);
        assert_eq!(cost(Operator::And, &[U256::MAX, 0.into()]), 16);
        assert_eq!(cost(Operator::Shl, &[255.into(), 1.into()]), 16);
        assert_eq!(cost(Operator::Shl, &[256.into(), 1.into()]), 1);
    }

    #[test]
    fn module_assignment() {
        assert_eq!(Operator::Sub.module(), ModuleId::Add);
        assert_eq!(Operator::Exp.module(), ModuleId::Mul);
        assert_eq!(Operator::Smod.module(), ModuleId::Mod);
        assert_eq!(Operator::MulMod.module(), ModuleId::Ext);
        assert_eq!(Operator::IsZero.module(), ModuleId::Wcp);
        assert_eq!(Operator::SignExtend.module(), ModuleId::Bin);
        assert_eq!(Operator::Sar.module(), ModuleId::Shf);
    }
}
