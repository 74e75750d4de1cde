//! Architectural machine state.
//!
//! A [`MachineState`] is treated as a value: the simulator derives each new
//! state from the previous one and [`diff`] reports what changed.

/// Structural comparison of two states.
pub mod diff;
/// Register indices and alias names.
pub mod registers;

use std::fmt;

pub use diff::{diff, format_changes, Change, Flag};
pub use registers::{ParseRegisterError, Register, REGISTER_COUNT};

use crate::image::MemoryImage;
use crate::memory::new_memory;

/// Initial stack pointer: the stack grows down from the top of memory.
pub const STACK_TOP: u8 = 255;

/// Condition flags written by ALU instructions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Flags {
    /// Low eight bits of the result are zero.
    pub zero: bool,
    /// Bit 8 of the nine-bit result.
    pub carry: bool,
    /// Bit 7 of the result.
    pub negative: bool,
    /// Two's-complement signed overflow.
    pub overflow: bool,
}

/// Registers, data memory and flags of one PUC8 core.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct MachineState {
    /// Register file; `r14` is the stack pointer and `r15` the program counter.
    pub regs: [u8; REGISTER_COUNT],
    /// 256-byte data memory.
    pub memory: Box<[u8]>,
    /// Condition flags.
    pub flags: Flags,
}

impl Default for MachineState {
    fn default() -> Self {
        let mut regs = [0; REGISTER_COUNT];
        regs[Register::SP.index()] = STACK_TOP;
        Self {
            regs,
            memory: new_memory(),
            flags: Flags::default(),
        }
    }
}

impl MachineState {
    /// Reset state with the image's data section copied to address 0.
    #[must_use]
    pub fn with_image(image: &MemoryImage) -> Self {
        let mut state = Self::default();
        for (cell, entry) in state.memory.iter_mut().zip(&image.data) {
            *cell = entry.value;
        }
        state
    }

    /// Reads a register.
    #[must_use]
    pub const fn reg(&self, register: Register) -> u8 {
        self.regs[register.index()]
    }

    /// Writes a register.
    #[allow(clippy::missing_const_for_fn)]
    pub fn set_reg(&mut self, register: Register, value: u8) {
        self.regs[register.index()] = value;
    }

    /// Program counter.
    #[must_use]
    pub const fn pc(&self) -> u8 {
        self.reg(Register::PC)
    }

    /// Stack pointer.
    #[must_use]
    pub const fn sp(&self) -> u8 {
        self.reg(Register::SP)
    }
}

impl fmt::Display for MachineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, value) in self.regs.iter().enumerate().take(Register::FP.index() + 1) {
            write!(f, "r{index} = {value}, ")?;
        }
        write!(
            f,
            "pc = {}, sp = {}, zf = {}, cf = {}, nf = {}, vf = {}",
            self.pc(),
            self.sp(),
            u8::from(self.flags.zero),
            u8::from(self.flags.carry),
            u8::from(self.flags.negative),
            u8::from(self.flags.overflow)
        )
    }
}
