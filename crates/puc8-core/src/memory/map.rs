//! Fixed device addresses in the 256-byte data space.
//!
//! Device addresses pre-empt ordinary memory: a store to one of them never
//! reaches the backing array, and a load never reads it.

/// Size of the data address space in bytes.
pub const MEMORY_BYTES: usize = 256;

/// Display control register. Writing `1` emits a line break.
pub const CONTROL_PORT: u8 = 6;
/// Display data register. Writing prints the byte as a character.
pub const OUTPUT_PORT: u8 = 7;
/// Keyboard data register. Reading blocks for one character.
pub const INPUT_PORT: u8 = 8;

/// Memory-mapped devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    /// Display control register.
    Control,
    /// Display data register.
    Output,
    /// Keyboard data register.
    Input,
}

impl Device {
    /// Returns the address this device is mapped at.
    #[must_use]
    pub const fn address(self) -> u8 {
        match self {
            Self::Control => CONTROL_PORT,
            Self::Output => OUTPUT_PORT,
            Self::Input => INPUT_PORT,
        }
    }
}

/// Returns the device mapped at `addr`, if any.
#[must_use]
pub const fn decode_device(addr: u8) -> Option<Device> {
    match addr {
        CONTROL_PORT => Some(Device::Control),
        OUTPUT_PORT => Some(Device::Output),
        INPUT_PORT => Some(Device::Input),
        _ => None,
    }
}
