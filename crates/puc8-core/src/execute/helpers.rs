//! Operand helpers shared by the execution families.

use crate::encoding::Condition;
use crate::state::Flags;

/// Adds a sign-extended 4-bit displacement to `base`, wrapping at 256.
#[must_use]
#[allow(clippy::cast_sign_loss)]
pub const fn effective_address(base: u8, displacement: i8) -> u8 {
    base.wrapping_add(displacement as u8)
}

/// Returns `true` when a branch with `condition` is taken under `flags`.
#[must_use]
pub const fn condition_holds(condition: Condition, flags: Flags) -> bool {
    match condition {
        Condition::Always => true,
        Condition::Zero => flags.zero,
        Condition::NotZero => !flags.zero,
        Condition::CarrySet => flags.carry,
        Condition::CarryClear => !flags.carry,
        Condition::Less => flags.overflow != flags.negative,
        Condition::GreaterEqual => flags.overflow == flags.negative,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn displacement_wraps() {
        assert_eq!(effective_address(10, -1), 9);
        assert_eq!(effective_address(0, -8), 248);
        assert_eq!(effective_address(250, 7), 1);
    }

    #[test]
    fn signed_conditions_compare_overflow_and_negative() {
        let mut flags = Flags::default();
        assert!(!condition_holds(Condition::Less, flags));
        assert!(condition_holds(Condition::GreaterEqual, flags));

        flags.negative = true;
        assert!(condition_holds(Condition::Less, flags));

        flags.overflow = true;
        assert!(condition_holds(Condition::GreaterEqual, flags));
        assert!(condition_holds(Condition::Always, flags));
    }
}
