//! ALU results and condition flags.

use crate::encoding::AluOp;
use crate::state::Flags;

/// Result byte and flags of one ALU operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluOutput {
    /// Low eight bits of the result.
    pub value: u8,
    /// Flags derived from the wide result.
    pub flags: Flags,
}

/// Evaluates `op` on `a` and the second operand `b`.
///
/// The result is computed wider than a byte: carry is bit 8 and zero looks
/// at the low byte only. Subtraction adds `256 - b`, so carry means "no
/// borrow". Shifts move by one position whenever `b` is non-zero. Logic and
/// shift operations clear the overflow flag.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_lossless)]
pub const fn alu(op: AluOp, a: u8, b: u16) -> AluOutput {
    let a = a as u16;
    let shift = (b > 0) as u16;
    let (result, overflow) = match op {
        AluOp::Add => {
            let result = a.wrapping_add(b);
            (result, (a ^ result) & (b ^ result) & 0x80 != 0)
        }
        AluOp::Sub => {
            let result = a.wrapping_add(256_u16.wrapping_sub(b));
            (result, (a ^ b) & (a ^ result) & 0x80 != 0)
        }
        AluOp::Shl => (a << shift, false),
        AluOp::Shr => (a >> shift, false),
        AluOp::And => (a & b, false),
        AluOp::Orr => (a | b, false),
        AluOp::Eor => (a ^ b, false),
    };

    AluOutput {
        value: result as u8,
        flags: Flags {
            zero: result & 0xFF == 0,
            carry: result & 0x100 != 0,
            negative: result & 0x80 != 0,
            overflow,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(AluOp::Add, 0x7F, 1, 0x80, false, false, true, true)]
    #[case(AluOp::Add, 0xFF, 1, 0x00, true, true, false, false)]
    #[case(AluOp::Sub, 5, 5, 0, true, true, false, false)]
    #[case(AluOp::Sub, 3, 5, 0xFE, false, false, true, false)]
    #[case(AluOp::Sub, 0x80, 1, 0x7F, false, true, false, true)]
    #[case(AluOp::Shl, 0x81, 1, 0x02, false, true, false, false)]
    #[case(AluOp::Shl, 0x81, 0, 0x81, false, false, true, false)]
    #[case(AluOp::Shr, 0x81, 3, 0x40, false, false, false, false)]
    #[case(AluOp::And, 0xF0, 0x0F, 0x00, true, false, false, false)]
    #[case(AluOp::Orr, 0x01, 0x80, 0x81, false, false, true, false)]
    #[case(AluOp::Eor, 0xFF, 0xFF, 0x00, true, false, false, false)]
    #[allow(clippy::too_many_arguments, clippy::fn_params_excessive_bools)]
    fn computes_value_and_flags(
        #[case] op: AluOp,
        #[case] a: u8,
        #[case] b: u16,
        #[case] value: u8,
        #[case] zero: bool,
        #[case] carry: bool,
        #[case] negative: bool,
        #[case] overflow: bool,
    ) {
        let output = alu(op, a, b);
        assert_eq!(output.value, value);
        assert_eq!(
            output.flags,
            Flags {
                zero,
                carry,
                negative,
                overflow
            }
        );
    }

    #[test]
    fn logic_bit_above_the_byte_sets_carry() {
        let output = alu(AluOp::Orr, 0, 1 << 8);
        assert_eq!(output.value, 0);
        assert!(output.flags.zero);
        assert!(output.flags.carry);
    }
}
