//! Top-level assembler pipeline.
//!
//! This module wires the phases together:
//!
//! 1. **Preprocess**: include splicing, macro expansion, `.db` splitting
//!    ([`Preprocessor`])
//! 2. **Pass 1**: address assignment and symbol table ([`assign_addresses`])
//! 3. **Pass 2**: operand resolution and image construction ([`encode`])
//!
//! Each pass completes before the next starts; the first error aborts the
//! whole pipeline and no partial image is produced.

use std::path::Path;

use puc8_core::{MemoryImage, SymbolMap};
use tracing::debug;

use crate::encoder::encode;
use crate::errors::AsmError;
use crate::preprocess::Preprocessor;
use crate::source::SourceLine;
use crate::symbols::{assign_addresses, SymbolTable};

/// Everything produced by a successful assembly.
#[derive(Debug, Clone)]
pub struct Assembly {
    /// Preprocessed source.
    pub lines: Vec<SourceLine>,
    /// Labels and constants.
    pub symbols: SymbolTable,
    /// Code and data image.
    pub image: MemoryImage,
}

impl Assembly {
    /// Address-to-label maps for symbolic disassembly.
    #[must_use]
    pub fn symbol_map(&self) -> SymbolMap {
        self.symbols.symbol_map()
    }
}

/// Assembles a source file.
///
/// # Errors
///
/// Returns the first [`AsmError`] raised by any phase.
pub fn assemble(path: &Path) -> Result<Assembly, AsmError> {
    let lines = Preprocessor::new().process(path)?;
    assemble_lines(lines)
}

/// Assembles in-memory source named `path`; includes resolve relative to it.
///
/// # Errors
///
/// See [`assemble`].
pub fn assemble_source(path: &Path, text: &str) -> Result<Assembly, AsmError> {
    let lines = Preprocessor::new().process_source(path, text)?;
    assemble_lines(lines)
}

/// Runs both passes over already preprocessed lines.
///
/// # Errors
///
/// See [`assemble`].
pub fn assemble_lines(lines: Vec<SourceLine>) -> Result<Assembly, AsmError> {
    let symbols = assign_addresses(&lines)?;
    debug!(symbols = symbols.len(), "pass 1 complete");

    let image = encode(&lines, &symbols)?;
    debug!(
        code = image.code.len(),
        data = image.data.len(),
        "pass 2 complete"
    );

    Ok(Assembly {
        lines,
        symbols,
        image,
    })
}
