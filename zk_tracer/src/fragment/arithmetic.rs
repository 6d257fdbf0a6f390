use ethereum_types::U256;
use zk_tracer_common::EncodedWord;

use crate::arithmetic::{limb_byte, Operation};
use crate::error::TraceError;
use crate::trace::{Row, RowBuilder};

/// An operation handed to one of the arithmetic modules.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ArithmeticFragment {
    /// Stamp of the step that issued the operation.
    pub hub_stamp: usize,
    pub operation: Operation,
}

impl ArithmeticFragment {
    /// One row per counter value. The byte columns walk the last `CT_MAX + 1`
    /// bytes of the first argument's limbs, most significant first, and the
    /// accumulators hold the big-endian value read so far.
    pub(super) fn rows(&self, row: impl Fn() -> RowBuilder) -> Result<Vec<Row>, TraceError> {
        let Operation {
            operator,
            args,
            result,
        } = &self.operation;
        let [arg_1, arg_2, arg_3] = args.map(EncodedWord::from);
        let result = EncodedWord::from(*result);
        let (hi, lo) = (arg_1.hi(), arg_1.lo());

        let len = self.operation.line_count();
        let (mut acc_1, mut acc_2) = (U256::zero(), U256::zero());
        (0..len)
            .map(|ct| {
                let position = len - 1 - ct;
                let (byte_1, byte_2) = (limb_byte(hi, position), limb_byte(lo, position));
                acc_1 = (acc_1 << 8) | U256::from(byte_1);
                acc_2 = (acc_2 << 8) | U256::from(byte_2);
                row()
                    .set("STAMP", self.hub_stamp)
                    .set("CT", ct)
                    .set("CT_MAX", len - 1)
                    .set("INST", operator.opcode())
                    .word("ARG_1_HI", "ARG_1_LO", arg_1)
                    .word("ARG_2_HI", "ARG_2_LO", arg_2)
                    .word("ARG_3_HI", "ARG_3_LO", arg_3)
                    .word("RES_HI", "RES_LO", result)
                    .set("BYTE_1", byte_1)
                    .set("BYTE_2", byte_2)
                    .set("ACC_1", acc_1)
                    .set("ACC_2", acc_2)
                    .finish()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arithmetic::Operator;
    use crate::columns::ABS_TX_NUM;
    use crate::fragment::TraceFragment;
    use crate::module::ModuleId;
    use crate::trace::ColumnarTrace;

    fn emit(operator: Operator, args: &[U256]) -> ColumnarTrace {
        let fragment = TraceFragment::Arithmetic(ArithmeticFragment {
            hub_stamp: 3,
            operation: Operation::new(operator, args),
        });
        let mut trace = ColumnarTrace::new();
        fragment.emit(2, &mut trace).unwrap();
        trace
    }

    #[test]
    fn add_spans_sixteen_rows() {
        let a = (U256::from(0xabu64) << 128) | U256::from(0x0102u64);
        let trace = emit(Operator::Add, &[a, U256::one()]);
        let column = |name: &str| trace.column(ModuleId::Add, name).unwrap().to_vec();

        assert_eq!(trace.height(ModuleId::Add), 16);
        assert_eq!(column(ABS_TX_NUM), vec![U256::from(2); 16]);
        assert_eq!(column("STAMP"), vec![U256::from(3); 16]);
        assert_eq!(column("CT")[15], U256::from(15));
        assert_eq!(column("RES_LO")[0], U256::from(0x0103));
        assert_eq!(column("RES_HI")[0], U256::from(0xab));

        let byte_2 = column("BYTE_2");
        assert_eq!((byte_2[14], byte_2[15]), (U256::from(1), U256::from(2)));
        assert_eq!(column("ACC_1")[15], U256::from(0xab));
        assert_eq!(column("ACC_2")[15], U256::from(0x0102));
    }

    #[test]
    fn comparisons_cover_the_widest_argument() {
        let trace = emit(Operator::Lt, &[U256::from(0x1234), U256::from(0x12)]);
        assert_eq!(trace.height(ModuleId::Wcp), 2);
        let acc = trace.column(ModuleId::Wcp, "ACC_2").unwrap();
        assert_eq!(acc, &[U256::from(0x12), U256::from(0x1234)]);
    }

    #[test]
    fn long_exponents_pad_with_zero_bytes() {
        let exponent = U256::MAX;
        let trace = emit(Operator::Exp, &[U256::from(3), exponent]);
        assert_eq!(trace.height(ModuleId::Mul), 512);
        let byte_1 = trace.column(ModuleId::Mul, "BYTE_1").unwrap();
        assert!(byte_1.iter().all(|b| b.is_zero()));
        let acc_2 = trace.column(ModuleId::Mul, "ACC_2").unwrap();
        assert_eq!(acc_2[511], U256::from(3));
    }
}
