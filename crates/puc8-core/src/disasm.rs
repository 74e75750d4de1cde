//! Instruction disassembly for the PUC8 ISA.
//!
//! Converts 17-bit words back into assembler syntax. The output is accepted
//! by the assembler and encodes to the same word again.

use std::fmt;

use crate::decoder::{decode, DecodeError, DecodedInstruction};
use crate::encoding::{OperandKind, Operation};
use crate::image::{MemoryImage, Section, SymbolMap};
use crate::state::Register;

/// Mnemonic and operand text of one word.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Disassembly {
    /// Lowercase mnemonic.
    pub mnemonic: String,
    /// Comma-separated operands.
    pub operands: String,
}

impl fmt::Display for Disassembly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.operands.is_empty() {
            f.write_str(&self.mnemonic)
        } else {
            write!(f, "{:<4} {}", self.mnemonic, self.operands)
        }
    }
}

/// A disassembled code-image entry.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct DisassemblyRow {
    /// Code address.
    pub address: u8,
    /// Raw word.
    pub word: u32,
    /// Decoded text, or `None` for an illegal word.
    pub text: Option<Disassembly>,
    /// Source annotation carried by the image.
    pub annotation: String,
}

/// Disassembles one word.
///
/// With a symbol map, direct data addresses print as `[@name]` and the
/// targets of `call` and branches print as `@name`.
///
/// # Errors
///
/// Returns [`DecodeError`] when the word matches no instruction.
pub fn disassemble(word: u32, symbols: Option<&SymbolMap>) -> Result<Disassembly, DecodeError> {
    let decoded = decode(word)?;
    let operands = format_operands(&decoded, symbols);
    Ok(Disassembly {
        mnemonic: decoded.spec.mnemonic.to_string(),
        operands,
    })
}

/// Disassembles every non-padding entry of the code section.
#[must_use]
pub fn disassemble_image(image: &MemoryImage, symbols: Option<&SymbolMap>) -> Vec<DisassemblyRow> {
    image
        .code
        .iter()
        .zip(0..=u8::MAX)
        .filter(|(entry, _)| !entry.is_padding())
        .map(|(entry, address)| DisassemblyRow {
            address,
            word: entry.value,
            text: disassemble(entry.value, symbols).ok(),
            annotation: entry.annotation.clone(),
        })
        .collect()
}

/// Splits a word into its `opcode imm r1 r2 r3` bit groups.
#[must_use]
pub fn format_word_fields(word: u32) -> String {
    let bits = format!("{word:017b}");
    format!(
        "{} {} {} {} {}",
        &bits[0..4],
        &bits[4..5],
        &bits[5..9],
        &bits[9..13],
        &bits[13..17]
    )
}

fn format_operands(decoded: &DecodedInstruction, symbols: Option<&SymbolMap>) -> String {
    let kinds = decoded.variant.operands;
    let is_control_flow = matches!(
        decoded.spec.operation,
        Operation::Call | Operation::Branch(_)
    );

    let mut parts = Vec::with_capacity(kinds.len());
    let mut index = 0;
    while index < kinds.len() {
        let field = decoded.operand(index);
        let text = match kinds[index] {
            OperandKind::Register => register_name(field),
            OperandKind::IndirectRegister
                if kinds.get(index + 1) == Some(&OperandKind::Imm4) =>
            {
                index += 1;
                let offset = decoded.fields.c4_signed();
                format!("[{}, {offset}]", register_name(field))
            }
            OperandKind::IndirectRegister => format!("[{}]", register_name(field)),
            OperandKind::Imm4 | OperandKind::Opaque => field.to_string(),
            OperandKind::IndirectAddress => {
                match lookup(symbols, Section::Data, field) {
                    Some(name) => format!("[@{name}]"),
                    None => format!("[{field}]"),
                }
            }
            OperandKind::Imm8 => match lookup(symbols, Section::Code, field) {
                Some(name) if is_control_flow => format!("@{name}"),
                _ => field.to_string(),
            },
        };
        parts.push(text);
        index += 1;
    }
    parts.join(", ")
}

fn lookup(symbols: Option<&SymbolMap>, section: Section, field: u32) -> Option<&str> {
    let address = u8::try_from(field).ok()?;
    symbols?.lookup(section, address)
}

#[allow(clippy::cast_possible_truncation)]
fn register_name(field: u32) -> String {
    Register::new(field as u8).map_or_else(|| format!("r{field}"), |r| r.to_string())
}
