//! Host-facing contracts for embedding the simulator.
//!
//! The simulator never touches the process terminal directly. Device
//! accesses go through a [`Console`] supplied by the host, so the same step
//! function drives the interactive terminal, the headless test runner and
//! scripted unit tests.

use thiserror::Error;

/// Failures reported by a [`Console`] implementation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum ConsoleError {
    /// The input device was read after the host ran out of characters.
    #[error("input exhausted")]
    InputExhausted,
    /// The host stream failed.
    #[error("{0}")]
    Io(String),
}

impl From<std::io::Error> for ConsoleError {
    fn from(error: std::io::Error) -> Self {
        Self::Io(error.to_string())
    }
}

/// Character terminal behind the memory-mapped device addresses.
pub trait Console {
    /// Blocks until one character is available and returns its code.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::InputExhausted`] at end of input.
    fn read_char(&mut self) -> Result<u8, ConsoleError>;

    /// Prints one character.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Io`] when the host stream fails.
    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError>;

    /// Emits a line break.
    ///
    /// # Errors
    ///
    /// Returns [`ConsoleError::Io`] when the host stream fails.
    fn write_newline(&mut self) -> Result<(), ConsoleError>;
}

impl<C: Console + ?Sized> Console for &mut C {
    fn read_char(&mut self) -> Result<u8, ConsoleError> {
        (**self).read_char()
    }

    fn write_char(&mut self, byte: u8) -> Result<(), ConsoleError> {
        (**self).write_char(byte)
    }

    fn write_newline(&mut self) -> Result<(), ConsoleError> {
        (**self).write_newline()
    }
}
