use std::fmt;

use super::{MachineState, Register};

/// One of the four condition flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    /// `zf`
    Zero,
    /// `cf`
    Carry,
    /// `nf`
    Negative,
    /// `vf`
    Overflow,
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Zero => "zf",
            Self::Carry => "cf",
            Self::Negative => "nf",
            Self::Overflow => "vf",
        })
    }
}

/// A single location that differs between two states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Change {
    /// Register now holds `value`.
    Register {
        /// Changed register.
        register: Register,
        /// New contents.
        value: u8,
    },
    /// Memory byte now holds `value`.
    Memory {
        /// Changed address.
        address: u8,
        /// New contents.
        value: u8,
    },
    /// Flag now has `value`.
    Flag {
        /// Changed flag.
        flag: Flag,
        /// New value.
        value: bool,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Register { register, value } => write!(f, "{register} <- {value}"),
            Self::Memory { address, value } => write!(f, "[{address}] <- {value}"),
            Self::Flag { flag, value } => write!(f, "{flag} <- {}", u8::from(*value)),
        }
    }
}

/// Lists what changed from `old` to `new`.
///
/// Order: `r0..r13`, memory by address, `sp`, then `zf cf nf vf`. The
/// program counter is left out since it changes on every step.
#[must_use]
pub fn diff(old: &MachineState, new: &MachineState) -> Vec<Change> {
    let mut changes = Vec::new();

    for index in 0..=Register::FP.index() {
        if old.regs[index] != new.regs[index] {
            #[allow(clippy::cast_possible_truncation)]
            let register = Register::new(index as u8);
            if let Some(register) = register {
                changes.push(Change::Register {
                    register,
                    value: new.regs[index],
                });
            }
        }
    }

    changes.extend(
        old.memory
            .iter()
            .zip(new.memory.iter())
            .zip(0..=u8::MAX)
            .filter(|((before, after), _)| before != after)
            .map(|((_, after), address)| Change::Memory {
                address,
                value: *after,
            }),
    );

    if old.sp() != new.sp() {
        changes.push(Change::Register {
            register: Register::SP,
            value: new.sp(),
        });
    }

    let flags = [
        (Flag::Zero, old.flags.zero, new.flags.zero),
        (Flag::Carry, old.flags.carry, new.flags.carry),
        (Flag::Negative, old.flags.negative, new.flags.negative),
        (Flag::Overflow, old.flags.overflow, new.flags.overflow),
    ];
    changes.extend(
        flags
            .into_iter()
            .filter(|(_, before, after)| before != after)
            .map(|(flag, _, value)| Change::Flag { flag, value }),
    );

    changes
}

/// Joins changes as `a <- 1, b <- 2`.
#[must_use]
pub fn format_changes(changes: &[Change]) -> String {
    changes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}
