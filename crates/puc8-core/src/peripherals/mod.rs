//! Host-side [`Console`](crate::api::Console) implementations.

/// Terminal consoles over host streams and scripted buffers.
pub mod terminal;

pub use terminal::{LineConsole, ScriptedConsole, StdConsole};
