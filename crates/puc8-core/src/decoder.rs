//! Instruction decode: table matching and raw field extraction.

use thiserror::Error;

use crate::encoding::{InstructionSpec, Variant, INSTRUCTION_TABLE, WORD_BITS};

/// A word that matches no disassemblable variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[error("illegal instruction {word:017b}")]
pub struct DecodeError {
    /// The offending word.
    pub word: u32,
}

/// Fixed-position fields of a 17-bit word.
///
/// Not every field is meaningful for every instruction; the matched
/// [`Variant`] decides which ones are read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fields(u32);

#[allow(clippy::cast_possible_truncation)]
impl Fields {
    /// Wraps a raw word.
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Raw word.
    #[must_use]
    pub const fn word(self) -> u32 {
        self.0
    }

    /// Four-bit opcode, bits 16..13.
    #[must_use]
    pub const fn opcode(self) -> u8 {
        ((self.0 >> (WORD_BITS - 4)) & 0xF) as u8
    }

    /// Immediate-select bit, bit 12.
    #[must_use]
    pub const fn immediate(self) -> bool {
        (self.0 >> 12) & 1 == 1
    }

    /// First register field, bits 11..8.
    #[must_use]
    pub const fn r1(self) -> usize {
        ((self.0 >> 8) & 0xF) as usize
    }

    /// Second register field, bits 7..4.
    #[must_use]
    pub const fn r2(self) -> usize {
        ((self.0 >> 4) & 0xF) as usize
    }

    /// Third register field, bits 3..0.
    #[must_use]
    pub const fn r3(self) -> usize {
        (self.0 & 0xF) as usize
    }

    /// Unsigned 4-bit constant, bits 3..0.
    #[must_use]
    pub const fn c4(self) -> u8 {
        (self.0 & 0xF) as u8
    }

    /// 4-bit constant sign-extended to 8 bits.
    #[must_use]
    pub const fn c4_signed(self) -> i8 {
        (((self.0 & 0xF) as u8) << 4) as i8 >> 4
    }

    /// 8-bit constant, bits 7..0.
    #[must_use]
    pub const fn c8(self) -> u8 {
        (self.0 & 0xFF) as u8
    }
}

/// A word together with the table entry it decodes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInstruction {
    /// Matched mnemonic entry.
    pub spec: &'static InstructionSpec,
    /// Matched variant.
    pub variant: &'static Variant,
    /// Field view of the word.
    pub fields: Fields,
}

impl DecodedInstruction {
    /// Raw bits of operand `index` as laid out by the matched variant.
    #[must_use]
    pub fn operand(&self, index: usize) -> u32 {
        self.variant.operand_field(self.fields.word(), index)
    }
}

/// Decodes one word against the instruction table.
///
/// Alias variants are never produced; the first matching variant in table
/// order wins.
///
/// # Errors
///
/// Returns [`DecodeError`] when no variant matches.
pub fn decode(word: u32) -> Result<DecodedInstruction, DecodeError> {
    INSTRUCTION_TABLE
        .iter()
        .find_map(|spec| {
            spec.variants
                .iter()
                .find(|variant| !variant.alias && variant.matches(word))
                .map(|variant| DecodedInstruction {
                    spec,
                    variant,
                    fields: Fields::new(word),
                })
        })
        .ok_or(DecodeError { word })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0b0000_0_0001_0010_0000, "ldr", 0)]
    #[case(0b0000_0_0001_0010_0011, "ldr", 1)]
    #[case(0b0000_1_0001_1111_1111, "ldr", 3)]
    #[case(0b0001_0_0001_0010_0000, "str", 0)]
    #[case(0b0001_1_0001_0000_0111, "str", 2)]
    #[case(0b0010_1_0000_0000_0101, "mov", 0)]
    #[case(0b0010_0_0000_0001_0000, "mov", 1)]
    #[case(0b0011_1_0000_0000_1000, "b", 1)]
    #[case(0b0011_0_0110_0011_1111, "bge", 0)]
    #[case(0b0100_0_0011_0000_0000, "push", 0)]
    #[case(0b0101_0_0011_0000_0000, "call", 0)]
    #[case(0b0101_1_0000_0010_0000, "call", 1)]
    #[case(0b0110_0_1111_0000_0000, "pop", 0)]
    #[case(0b1000_0_0001_0010_0011, "add", 0)]
    #[case(0b1110_1_0001_0010_0011, "eor", 1)]
    fn decodes_to_expected_variant(
        #[case] word: u32,
        #[case] mnemonic: &str,
        #[case] variant: usize,
    ) {
        let decoded = decode(word).unwrap();
        assert_eq!(decoded.spec.mnemonic, mnemonic);
        assert_eq!(*decoded.variant, decoded.spec.variants[variant]);
    }

    #[rstest]
    #[case(0b0010_0_0000_0001_0001)]
    #[case(0b0011_0_0111_0000_0000)]
    #[case(0b0011_1_1111_0000_0000)]
    #[case(0b0100_1_0000_0000_0000)]
    #[case(0b0100_0_0000_0000_0001)]
    #[case(0b0101_1_0001_0000_0000)]
    #[case(0b0110_1_0000_0000_0000)]
    #[case(0b0111_0_0000_0000_0000)]
    #[case(0b1111_0_0000_0000_0000)]
    #[case(0b1111_1_0000_0000_0000)]
    #[case(1 << 17)]
    fn rejects_unassigned_words(#[case] word: u32) {
        assert_eq!(decode(word), Err(DecodeError { word }));
    }

    #[test]
    fn sign_extends_c4() {
        assert_eq!(Fields::new(0b0111).c4_signed(), 7);
        assert_eq!(Fields::new(0b1000).c4_signed(), -8);
        assert_eq!(Fields::new(0b1111).c4_signed(), -1);
        assert_eq!(Fields::new(0b1111).c4(), 15);
    }

    #[test]
    fn field_positions() {
        let fields = Fields::new(0b1010_1_0011_0101_1100);
        assert_eq!(fields.opcode(), 0b1010);
        assert!(fields.immediate());
        assert_eq!(fields.r1(), 3);
        assert_eq!(fields.r2(), 5);
        assert_eq!(fields.r3(), 12);
        assert_eq!(fields.c8(), 0b0101_1100);
    }
}
