//! Data memory model and memory-mapped devices.

/// Loads and stores that honour device addresses.
pub mod access;
/// Fixed device address map.
pub mod map;

pub use access::{load, store};
pub use map::{decode_device, Device, CONTROL_PORT, INPUT_PORT, MEMORY_BYTES, OUTPUT_PORT};

/// Allocates a zeroed data memory.
#[must_use]
pub fn new_memory() -> Box<[u8]> {
    vec![0; MEMORY_BYTES].into_boxed_slice()
}
