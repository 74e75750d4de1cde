use thiserror::Error;

use crate::api::ConsoleError;
use crate::decoder::DecodeError;

/// Runtime faults raised while executing one instruction.
///
/// A faulting step produces no successor state; the caller keeps the state
/// the instruction started from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum Fault {
    /// `push` or `call` with the stack pointer already at address 0.
    #[error("stack overflow")]
    StackOverflow,
    /// `pop` or `ret` with the stack pointer already at address 255.
    #[error("stack underflow")]
    StackUnderflow,
    /// Fetched word matches no instruction variant.
    #[error(transparent)]
    IllegalInstruction(#[from] DecodeError),
    /// A memory-mapped device could not complete the access.
    #[error("device error: {0}")]
    Device(#[from] ConsoleError),
}

impl Fault {
    /// Short class name used in diagnostics.
    #[must_use]
    pub const fn class(&self) -> &'static str {
        match self {
            Self::StackOverflow | Self::StackUnderflow => "stack",
            Self::IllegalInstruction(_) => "decode",
            Self::Device(_) => "device",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages() {
        assert_eq!(Fault::StackOverflow.to_string(), "stack overflow");
        assert_eq!(
            Fault::from(DecodeError { word: 0b1_1110_0000_0000_0000 }).to_string(),
            "illegal instruction 11110000000000000"
        );
        assert_eq!(
            Fault::from(ConsoleError::InputExhausted).to_string(),
            "device error: input exhausted"
        );
    }

    #[test]
    fn classes() {
        assert_eq!(Fault::StackUnderflow.class(), "stack");
        assert_eq!(Fault::from(ConsoleError::InputExhausted).class(), "device");
    }
}
