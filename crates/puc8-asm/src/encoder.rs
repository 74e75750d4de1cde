//! Instruction and directive encoding (pass 2).
//!
//! Every mnemonic has an ordered list of variants in the instruction table.
//! Encoding an instruction makes one attempt per variant, in order; the
//! first attempt whose operands all resolve wins, and when none does the
//! failure of the last attempt is reported.

use puc8_core::{
    parse_integer, Directive, ImageEntry, InstructionSpec, MemoryImage, OperandKind, Operation,
    Section, UnknownSection, Variant, SECTION_CAPACITY,
};
use thiserror::Error;
use tracing::trace;

use crate::errors::{AsmError, ErrorClass, ErrorKind};
use crate::mnemonic::resolve;
use crate::parser::{unquote, Instruction};
use crate::source::{OriginWidths, SourceLine};
use crate::symbols::SymbolTable;

/// Why an operand list does not fit a variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperandError {
    /// Wrong number of operands.
    #[error("requires {expected} operand(s), found {found}")]
    Count {
        /// Operands the variant takes.
        expected: usize,
        /// Operands given.
        found: usize,
    },
    /// Expected `rN` with `N` in `0..16`.
    #[error("operand '{0}' is not a valid register")]
    NotRegister(String),
    /// Expected `[rN]`.
    #[error("operand '{0}' is not a valid indirect memory request")]
    NotIndirectRegister(String),
    /// Expected `[constant]`.
    #[error("operand '{0}' is not a valid direct memory request")]
    NotDirectAddress(String),
    /// Not a literal, character or label.
    #[error("operand '{0}' is not a valid constant")]
    NotConstant(String),
    /// `@name` with no binding.
    #[error("label '{0}' not defined")]
    UndefinedLabel(String),
    /// Constant outside the signed and unsigned range of its field.
    #[error("operand '{operand}' is not a valid {bits}-bit signed or unsigned constant")]
    OutOfRange {
        /// Operand text.
        operand: String,
        /// Field width.
        bits: u32,
    },
}

impl OperandError {
    /// Category used in the error prefix.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::UndefinedLabel(_) | Self::OutOfRange { .. } => ErrorClass::Value,
            _ => ErrorClass::Syntax,
        }
    }
}

/// A variant together with its resolved operand fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    /// Variant whose pattern matched.
    pub variant: &'static Variant,
    /// One field per operand; opaque operands are zero.
    pub fields: Vec<u32>,
}

impl Encoded {
    /// Machine word. Zero for directives.
    #[must_use]
    pub fn word(&self) -> u32 {
        if self.variant.is_encodable() {
            self.variant.encode(&self.fields)
        } else {
            0
        }
    }
}

/// Outcome of trying one variant.
pub type Attempt = Result<Encoded, OperandError>;

/// Returns the first successful attempt, or the last failure.
///
/// `None` when there were no attempts at all.
#[must_use]
pub fn select(attempts: impl IntoIterator<Item = Attempt>) -> Option<Attempt> {
    let mut last = None;
    for attempt in attempts {
        match attempt {
            Ok(encoded) => return Some(Ok(encoded)),
            Err(error) => last = Some(Err(error)),
        }
    }
    last
}

/// Resolves operands against every variant of `spec`, in table order.
///
/// # Errors
///
/// Returns the [`OperandError`] of the last variant when none fits.
pub fn resolve_operands(
    spec: &'static InstructionSpec,
    operands: &[String],
    symbols: &SymbolTable,
) -> Attempt {
    let attempts = spec
        .variants
        .iter()
        .map(|variant| attempt(variant, operands, symbols));
    select(attempts).unwrap_or(Err(OperandError::Count {
        expected: 0,
        found: operands.len(),
    }))
}

/// Encodes one tokenized instruction or directive.
///
/// # Errors
///
/// Returns [`ErrorKind::UnknownMnemonic`] or [`ErrorKind::Operand`].
pub fn encode_instruction(
    instruction: &Instruction,
    symbols: &SymbolTable,
) -> Result<(&'static InstructionSpec, Encoded), ErrorKind> {
    let spec = resolve(&instruction.mnemonic)
        .ok_or_else(|| ErrorKind::UnknownMnemonic(instruction.mnemonic.clone()))?;
    let encoded =
        resolve_operands(spec, &instruction.operands, symbols).map_err(|error| ErrorKind::Operand {
            mnemonic: instruction.mnemonic.clone(),
            error,
        })?;
    Ok((spec, encoded))
}

fn attempt(variant: &'static Variant, operands: &[String], symbols: &SymbolTable) -> Attempt {
    if operands.len() != variant.operands.len() {
        return Err(OperandError::Count {
            expected: variant.operands.len(),
            found: operands.len(),
        });
    }
    let fields = variant
        .operands
        .iter()
        .zip(operands)
        .map(|(kind, text)| operand_field(*kind, text, symbols))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Encoded { variant, fields })
}

fn operand_field(kind: OperandKind, text: &str, symbols: &SymbolTable) -> Result<u32, OperandError> {
    match kind {
        OperandKind::Register => register(text),
        OperandKind::IndirectRegister => {
            let inner = bracketed(text)
                .filter(|_| text.len() >= 4)
                .ok_or_else(|| OperandError::NotIndirectRegister(text.to_string()))?;
            register(inner)
        }
        OperandKind::Imm4 => constant(text, 4, symbols),
        OperandKind::Imm8 => constant(text, 8, symbols),
        OperandKind::IndirectAddress => {
            let inner =
                bracketed(text).ok_or_else(|| OperandError::NotDirectAddress(text.to_string()))?;
            constant(inner, 8, symbols)
        }
        OperandKind::Opaque => Ok(0),
    }
}

fn bracketed(text: &str) -> Option<&str> {
    text.strip_prefix('[')?.strip_suffix(']')
}

fn register(text: &str) -> Result<u32, OperandError> {
    text.strip_prefix('r')
        .and_then(|digits| digits.parse::<u32>().ok())
        .filter(|index| *index < 16)
        .ok_or_else(|| OperandError::NotRegister(text.to_string()))
}

/// Resolves a constant operand into a `bits`-wide field.
///
/// Accepts `@label`, a one-character literal (8-bit fields only), an
/// integer literal, or a bare label name. Negative values are stored in
/// two's complement.
fn constant(text: &str, bits: u32, symbols: &SymbolTable) -> Result<u32, OperandError> {
    let value = if let Some(name) = text.strip_prefix('@').filter(|name| !name.is_empty()) {
        symbols
            .value(name)
            .ok_or_else(|| OperandError::UndefinedLabel(text.to_string()))?
    } else if let Some(c) = char_literal(text).filter(|_| bits > 4) {
        i64::from(u32::from(c))
    } else if let Some(value) = parse_integer(text) {
        value
    } else if is_label_name(text) {
        symbols
            .value(text)
            .ok_or_else(|| OperandError::NotConstant(text.to_string()))?
    } else {
        return Err(OperandError::NotConstant(text.to_string()));
    };
    fold(value, bits).ok_or_else(|| OperandError::OutOfRange {
        operand: text.to_string(),
        bits,
    })
}

fn char_literal(text: &str) -> Option<char> {
    let mut chars = unquote(text)?.chars();
    let c = chars.next()?;
    chars.next().is_none().then_some(c)
}

fn is_label_name(text: &str) -> bool {
    let mut chars = text.chars();
    chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        && register(text).is_err()
}

/// Range-checks `value` against `-2^(bits-1) ..= 2^bits - 1` and folds
/// negatives to two's complement.
fn fold(value: i64, bits: u32) -> Option<u32> {
    let min = -(1_i64 << (bits - 1));
    let max = (1_i64 << bits) - 1;
    if value < min || value > max {
        return None;
    }
    u32::try_from(value.rem_euclid(1 << bits)).ok()
}

#[allow(clippy::cast_possible_truncation)]
const fn byte(field: u32) -> u8 {
    (field & 0xFF) as u8
}

fn push<T>(
    entries: &mut Vec<ImageEntry<T>>,
    entry: ImageEntry<T>,
    section: Section,
) -> Result<(), ErrorKind> {
    if entries.len() >= SECTION_CAPACITY {
        return Err(ErrorKind::SectionOverflow(section));
    }
    entries.push(entry);
    Ok(())
}

fn pad<T: Clone + Default>(entries: &mut Vec<ImageEntry<T>>, target: usize) {
    if entries.len() < target {
        entries.resize(target, ImageEntry::padding());
    }
}

/// Annotation stored with an image entry: `origin: label: text`, with the
/// origin right-aligned and the label column padded to the longest symbol
/// name.
#[must_use]
pub fn annotate(line: &SourceLine, origins: &OriginWidths, label_width: usize) -> String {
    let label = line
        .label
        .as_ref()
        .map_or_else(String::new, |label| format!("{label}: "));
    format!(
        "{}: {label:<width$}{}",
        origins.format(&line.origin),
        line.text(),
        width = label_width + 2
    )
}

/// Encodes preprocessed lines into a memory image (pass 2).
///
/// # Errors
///
/// Returns an [`AsmError`] for unknown mnemonics, operands that fit no
/// variant, instructions in the data section, or a section that outgrows
/// 256 entries.
pub fn encode(lines: &[SourceLine], symbols: &SymbolTable) -> Result<MemoryImage, AsmError> {
    let layout = Layout {
        origins: OriginWidths::of(lines),
        label: symbols.longest_name(),
    };
    let mut image = MemoryImage::default();
    let mut section = Section::Code;

    for line in lines {
        encode_line(line, symbols, &layout, &mut section, &mut image)
            .map_err(|kind| kind.at(line.origin.clone()))?;
    }

    Ok(image)
}

/// Annotation column widths for one image.
struct Layout {
    origins: OriginWidths,
    label: usize,
}

fn encode_line(
    line: &SourceLine,
    symbols: &SymbolTable,
    layout: &Layout,
    section: &mut Section,
    image: &mut MemoryImage,
) -> Result<(), ErrorKind> {
    let Some(instruction) = line.parse() else {
        return Ok(());
    };
    let (spec, encoded) = encode_instruction(&instruction, symbols)?;

    match spec.operation {
        Operation::Directive(Directive::Section) => {
            *section = instruction
                .operands
                .first()
                .map_or(Ok(Section::Code), |name| name.parse())
                .map_err(|UnknownSection(name)| ErrorKind::UnknownSection(name))?;
        }
        Operation::Directive(Directive::Equ) => {}
        Operation::Directive(Directive::Org) => {
            let target = usize::from(byte(encoded.fields[0]));
            match section {
                Section::Code => pad(&mut image.code, target),
                Section::Data => pad(&mut image.data, target),
            }
        }
        Operation::Directive(Directive::Db) => {
            if *section == Section::Code {
                return Err(ErrorKind::DbInCodeSection);
            }
            let entry = ImageEntry::new(byte(encoded.fields[0]), annotate(line, &layout.origins, layout.label));
            push(&mut image.data, entry, Section::Data)?;
        }
        _ if *section != Section::Code => return Err(ErrorKind::InstructionInDataSection),
        _ => {
            let word = encoded.word();
            trace!(origin = %line.origin, word, "encoded");
            push(&mut image.code, ImageEntry::new(word, annotate(line, &layout.origins, layout.label)), Section::Code)?;
        }
    }
    Ok(())
}
