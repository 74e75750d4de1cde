//! PUC8 assembler library: preprocessor, two-pass assembler and emitters.

use anyhow as _;
use clap as _;
use tracing_subscriber as _;

#[cfg(test)]
use proptest as _;

/// Top-level preprocess / pass 1 / pass 2 pipeline.
pub mod assembler;
/// Variant selection and operand encoding (pass 2).
pub mod encoder;
/// Image writers.
pub mod emitter;
/// Assembly error taxonomy.
pub mod errors;
/// Preprocessor directive names and mnemonic lookup.
pub mod mnemonic;
/// Line normalization and tokenizing.
pub mod parser;
/// Include, macro and `.db` expansion.
pub mod preprocess;
/// Preprocessed line representation.
pub mod source;
/// Symbol table and pass-1 address assignment.
pub mod symbols;

pub use assembler::{assemble, assemble_lines, assemble_source, Assembly};
pub use errors::{AsmError, ErrorClass, ErrorKind, Origin};
pub use preprocess::Preprocessor;
