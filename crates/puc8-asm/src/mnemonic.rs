//! Mnemonic resolution against the core instruction table.

use puc8_core::{lookup, InstructionSpec};

/// `.include "file"`
pub const INCLUDE: &str = ".include";
/// `.macro name`
pub const MACRO: &str = ".macro";
/// `.endmacro`
pub const END_MACRO: &str = ".endmacro";

/// Directives consumed by the preprocessor, never seen by the passes.
pub const PREPROCESSOR_DIRECTIVES: &[&str] = &[INCLUDE, MACRO, END_MACRO];

/// Resolves an instruction or pass-level directive.
#[must_use]
pub fn resolve(mnemonic: &str) -> Option<&'static InstructionSpec> {
    lookup(mnemonic)
}

/// Returns `true` when a macro may not use `name`.
#[must_use]
pub fn is_reserved(name: &str) -> bool {
    resolve(name).is_some() || PREPROCESSOR_DIRECTIVES.contains(&name)
}
