//! Data loads and stores routed through the device map.

use crate::api::{Console, ConsoleError};
use crate::memory::map::{decode_device, Device};

/// Reads one byte from data memory or from the device mapped at `addr`.
///
/// The display registers always read as `0`, which programs poll as
/// "ready". Reading the keyboard register blocks on the console.
///
/// # Errors
///
/// Propagates console failures from the keyboard register.
pub fn load<C: Console + ?Sized>(
    memory: &[u8],
    addr: u8,
    console: &mut C,
) -> Result<u8, ConsoleError> {
    match decode_device(addr) {
        Some(Device::Input) => console.read_char(),
        Some(Device::Output | Device::Control) => Ok(0),
        None => Ok(memory[usize::from(addr)]),
    }
}

/// Writes one byte to data memory or to the device mapped at `addr`.
///
/// Device writes leave `memory` untouched. Writes to the keyboard register
/// are ignored.
///
/// # Errors
///
/// Propagates console failures from the display registers.
pub fn store<C: Console + ?Sized>(
    memory: &mut [u8],
    addr: u8,
    value: u8,
    console: &mut C,
) -> Result<(), ConsoleError> {
    match decode_device(addr) {
        Some(Device::Output) => console.write_char(value),
        Some(Device::Control) if value == 1 => console.write_newline(),
        Some(Device::Control | Device::Input) => Ok(()),
        None => {
            memory[usize::from(addr)] = value;
            Ok(())
        }
    }
}
