//! PUC8 instruction table and machine-word layout.
//!
//! Every mnemonic maps to an ordered list of [`Variant`]s. A variant fixes
//! the leading opcode bits and the trailing minor bits of a 17-bit word and
//! names the operand pattern that fills the bits in between. Operand `i`
//! starts `opcode.width + 4 * i` bits below the most significant bit.
//!
//! The table is the single source of truth for both directions: the
//! assembler tries variants in declaration order, and the disassembler picks
//! the first non-alias variant whose fixed fields match a word.

/// Width of one instruction word in bits.
pub const WORD_BITS: u32 = 17;

/// Mask selecting the valid bits of an instruction word.
pub const WORD_MASK: u32 = (1 << WORD_BITS) - 1;

/// Operand pattern symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    /// General-purpose register, `rN`.
    Register,
    /// Register holding a memory address, `[rN]`.
    IndirectRegister,
    /// 4-bit constant.
    Imm4,
    /// 8-bit constant.
    Imm8,
    /// Constant memory address, `[c8]`.
    IndirectAddress,
    /// Free text consumed by a directive.
    Opaque,
}

impl OperandKind {
    /// Returns the number of word bits occupied by this operand.
    #[must_use]
    pub const fn width(self) -> u32 {
        match self {
            Self::Register | Self::IndirectRegister | Self::Imm4 => 4,
            Self::Imm8 | Self::IndirectAddress => 8,
            Self::Opaque => 0,
        }
    }
}

/// A fixed bit field of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Bits {
    /// Field value, right aligned.
    pub value: u32,
    /// Field width in bits.
    pub width: u32,
}

impl Bits {
    /// Creates a field from a value and a width.
    #[must_use]
    pub const fn new(value: u32, width: u32) -> Self {
        Self { value, width }
    }

    const fn mask(self) -> u32 {
        (1 << self.width) - 1
    }
}

/// Branch condition selected by the `r1` field of branch words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Condition {
    /// Always taken.
    Always,
    /// Zero flag set.
    Zero,
    /// Zero flag clear.
    NotZero,
    /// Carry flag set.
    CarrySet,
    /// Carry flag clear.
    CarryClear,
    /// Signed less than (`V != N`).
    Less,
    /// Signed greater or equal (`V == N`).
    GreaterEqual,
}

/// ALU operations, in opcode order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AluOp {
    /// `a + b`
    Add,
    /// `a - b`
    Sub,
    /// `a << b`
    Shl,
    /// `a >> b`
    Shr,
    /// `a & b`
    And,
    /// `a | b`
    Orr,
    /// `a ^ b`
    Eor,
}

/// Assembler directives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Directive {
    /// `.org addr`
    Org,
    /// `.db byte`
    Db,
    /// `.section name`
    Section,
    /// `.equ name value`
    Equ,
}

/// What a mnemonic does when executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Memory to register.
    Load,
    /// Register to memory.
    Store,
    /// Register or constant to register.
    Move,
    /// Conditional or unconditional jump.
    Branch(Condition),
    /// Push a register.
    Push,
    /// Pop into a register.
    Pop,
    /// Push the return address and jump.
    Call,
    /// Flag-setting arithmetic or logic.
    Alu(AluOp),
    /// Pseudo-instruction with no encoding.
    Directive(Directive),
}

/// One operand-syntax/encoding form of a mnemonic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Variant {
    /// Leading fixed bits.
    pub opcode: Bits,
    /// Trailing fixed bits.
    pub minor: Bits,
    /// Operand pattern in source order.
    pub operands: &'static [OperandKind],
    /// Assemble-only form borrowing another mnemonic's encoding.
    pub alias: bool,
}

impl Variant {
    const fn new(
        opcode: u32,
        opcode_width: u32,
        minor: u32,
        minor_width: u32,
        operands: &'static [OperandKind],
    ) -> Self {
        Self {
            opcode: Bits::new(opcode, opcode_width),
            minor: Bits::new(minor, minor_width),
            operands,
            alias: false,
        }
    }

    const fn alias(
        opcode: u32,
        opcode_width: u32,
        minor: u32,
        minor_width: u32,
        operands: &'static [OperandKind],
    ) -> Self {
        let mut variant = Self::new(opcode, opcode_width, minor, minor_width, operands);
        variant.alias = true;
        variant
    }

    const fn directive(operands: &'static [OperandKind]) -> Self {
        Self::new(0, 0, 0, 0, operands)
    }

    /// Returns `true` when this variant produces a machine word.
    #[must_use]
    pub const fn is_encodable(&self) -> bool {
        self.opcode.width > 0
    }

    /// Returns `true` when the word's opcode and minor bits equal this variant's.
    #[must_use]
    pub const fn matches(&self, word: u32) -> bool {
        if !self.is_encodable() || word & !WORD_MASK != 0 {
            return false;
        }
        let opcode = word >> (WORD_BITS - self.opcode.width);
        opcode == self.opcode.value && word & self.minor.mask() == self.minor.value
    }

    /// Returns the shift that aligns operand `index` with bit zero.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn operand_shift(&self, index: usize) -> u32 {
        let kind = self.operands[index];
        let start = self.opcode.width + 4 * index as u32;
        WORD_BITS - start - kind.width()
    }

    /// Extracts the raw bits of operand `index` from a word.
    #[must_use]
    pub fn operand_field(&self, word: u32, index: usize) -> u32 {
        let width = self.operands[index].width();
        (word >> self.operand_shift(index)) & ((1 << width) - 1)
    }

    /// Builds a word from already range-checked operand fields.
    ///
    /// `fields[i]` belongs to operand `i`; opaque operands are skipped.
    #[must_use]
    pub fn encode(&self, fields: &[u32]) -> u32 {
        let mut word = self.opcode.value << (WORD_BITS - self.opcode.width);
        for (index, (kind, field)) in self.operands.iter().zip(fields).enumerate() {
            if *kind == OperandKind::Opaque {
                continue;
            }
            let mask = (1 << kind.width()) - 1;
            word |= (field & mask) << self.operand_shift(index);
        }
        (word | self.minor.value) & WORD_MASK
    }
}

/// A mnemonic and its variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionSpec {
    /// Lowercase mnemonic or directive name.
    pub mnemonic: &'static str,
    /// Execution semantics shared by all variants.
    pub operation: Operation,
    /// Variants in preference order.
    pub variants: &'static [Variant],
}

use OperandKind::{Imm4, Imm8, IndirectAddress, IndirectRegister, Opaque, Register};

const R: &[OperandKind] = &[Register];
const RR: &[OperandKind] = &[Register, Register];
const RRR: &[OperandKind] = &[Register, Register, Register];
const RR4: &[OperandKind] = &[Register, Register, Imm4];
const R8: &[OperandKind] = &[Register, Imm8];
const RA: &[OperandKind] = &[Register, IndirectRegister];
const RA4: &[OperandKind] = &[Register, IndirectRegister, Imm4];
const RB: &[OperandKind] = &[Register, IndirectAddress];
const A4: &[OperandKind] = &[IndirectRegister, Imm4];
const C8: &[OperandKind] = &[Imm8];
const X: &[OperandKind] = &[Opaque];
const X8: &[OperandKind] = &[Opaque, Imm8];
const NONE: &[OperandKind] = &[];

const fn branch_pair(condition: u32) -> [Variant; 2] {
    [
        Variant::new((0b00110 << 4) | condition, 9, 0, 0, A4),
        Variant::new((0b00111 << 4) | condition, 9, 0, 0, C8),
    ]
}

const fn alu_pair(opcode: u32) -> [Variant; 2] {
    [
        Variant::new(opcode << 1, 5, 0, 0, RRR),
        Variant::new((opcode << 1) | 1, 5, 0, 0, RR4),
    ]
}

/// The complete PUC8 instruction table, in disassembly preference order.
pub const INSTRUCTION_TABLE: &[InstructionSpec] = &[
    InstructionSpec {
        mnemonic: "ldr",
        operation: Operation::Load,
        variants: &[
            Variant::new(0b00000, 5, 0b0000, 4, RA),
            Variant::new(0b00000, 5, 0, 0, RA4),
            Variant::alias(0b00101, 5, 0, 0, R8),
            Variant::new(0b00001, 5, 0, 0, RB),
        ],
    },
    InstructionSpec {
        mnemonic: "str",
        operation: Operation::Store,
        variants: &[
            Variant::new(0b00010, 5, 0b0000, 4, RA),
            Variant::new(0b00010, 5, 0, 0, RA4),
            Variant::new(0b00011, 5, 0, 0, RB),
        ],
    },
    InstructionSpec {
        mnemonic: "mov",
        operation: Operation::Move,
        variants: &[
            Variant::new(0b00101, 5, 0, 0, R8),
            Variant::new(0b00100, 5, 0b0000, 4, RR),
        ],
    },
    InstructionSpec {
        mnemonic: "b",
        operation: Operation::Branch(Condition::Always),
        variants: &branch_pair(0),
    },
    InstructionSpec {
        mnemonic: "bz",
        operation: Operation::Branch(Condition::Zero),
        variants: &branch_pair(1),
    },
    InstructionSpec {
        mnemonic: "bnz",
        operation: Operation::Branch(Condition::NotZero),
        variants: &branch_pair(2),
    },
    InstructionSpec {
        mnemonic: "bcs",
        operation: Operation::Branch(Condition::CarrySet),
        variants: &branch_pair(3),
    },
    InstructionSpec {
        mnemonic: "bcc",
        operation: Operation::Branch(Condition::CarryClear),
        variants: &branch_pair(4),
    },
    InstructionSpec {
        mnemonic: "blt",
        operation: Operation::Branch(Condition::Less),
        variants: &branch_pair(5),
    },
    InstructionSpec {
        mnemonic: "bge",
        operation: Operation::Branch(Condition::GreaterEqual),
        variants: &branch_pair(6),
    },
    InstructionSpec {
        mnemonic: "push",
        operation: Operation::Push,
        variants: &[Variant::new(0b01000, 5, 0, 8, R)],
    },
    InstructionSpec {
        mnemonic: "call",
        operation: Operation::Call,
        variants: &[
            Variant::new(0b01010, 5, 0, 8, R),
            Variant::new(0b0_1011_0000, 9, 0, 0, C8),
        ],
    },
    InstructionSpec {
        mnemonic: "pop",
        operation: Operation::Pop,
        variants: &[Variant::new(0b01100, 5, 0, 8, R)],
    },
    InstructionSpec {
        mnemonic: "ret",
        operation: Operation::Pop,
        variants: &[Variant::alias(0b0_1100_1111, 9, 0, 8, NONE)],
    },
    InstructionSpec {
        mnemonic: "add",
        operation: Operation::Alu(AluOp::Add),
        variants: &alu_pair(0b1000),
    },
    InstructionSpec {
        mnemonic: "sub",
        operation: Operation::Alu(AluOp::Sub),
        variants: &alu_pair(0b1001),
    },
    InstructionSpec {
        mnemonic: "shl",
        operation: Operation::Alu(AluOp::Shl),
        variants: &alu_pair(0b1010),
    },
    InstructionSpec {
        mnemonic: "shr",
        operation: Operation::Alu(AluOp::Shr),
        variants: &alu_pair(0b1011),
    },
    InstructionSpec {
        mnemonic: "and",
        operation: Operation::Alu(AluOp::And),
        variants: &alu_pair(0b1100),
    },
    InstructionSpec {
        mnemonic: "orr",
        operation: Operation::Alu(AluOp::Orr),
        variants: &alu_pair(0b1101),
    },
    InstructionSpec {
        mnemonic: "eor",
        operation: Operation::Alu(AluOp::Eor),
        variants: &alu_pair(0b1110),
    },
    InstructionSpec {
        mnemonic: ".org",
        operation: Operation::Directive(Directive::Org),
        variants: &[Variant::directive(C8)],
    },
    InstructionSpec {
        mnemonic: ".db",
        operation: Operation::Directive(Directive::Db),
        variants: &[Variant::directive(C8)],
    },
    InstructionSpec {
        mnemonic: ".section",
        operation: Operation::Directive(Directive::Section),
        variants: &[Variant::directive(X)],
    },
    InstructionSpec {
        mnemonic: ".equ",
        operation: Operation::Directive(Directive::Equ),
        variants: &[Variant::directive(X8)],
    },
];

/// Looks up a mnemonic or directive name.
#[must_use]
pub fn lookup(mnemonic: &str) -> Option<&'static InstructionSpec> {
    INSTRUCTION_TABLE
        .iter()
        .find(|spec| spec.mnemonic == mnemonic)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn encodable_variants_fill_the_word_exactly() {
        for spec in INSTRUCTION_TABLE {
            for variant in spec.variants.iter().filter(|v| v.is_encodable()) {
                let operand_bits: u32 = variant.operands.iter().map(|k| k.width()).sum();
                assert_eq!(
                    variant.opcode.width + operand_bits + variant.minor.width,
                    WORD_BITS,
                    "{} {:?}",
                    spec.mnemonic,
                    variant.operands
                );
            }
        }
    }

    #[test]
    fn fixed_fields_fit_their_widths() {
        for spec in INSTRUCTION_TABLE {
            for variant in spec.variants {
                assert!(variant.opcode.value <= variant.opcode.mask(), "{}", spec.mnemonic);
                assert!(variant.minor.value <= variant.minor.mask(), "{}", spec.mnemonic);
            }
        }
    }

    #[test]
    fn mnemonics_are_unique() {
        let mut seen = HashSet::new();
        for spec in INSTRUCTION_TABLE {
            assert!(seen.insert(spec.mnemonic), "duplicate {}", spec.mnemonic);
        }
    }

    #[test]
    fn directives_have_no_encoding() {
        for spec in INSTRUCTION_TABLE {
            let is_directive = matches!(spec.operation, Operation::Directive(_));
            assert_eq!(is_directive, spec.mnemonic.starts_with('.'));
            for variant in spec.variants {
                assert_eq!(variant.is_encodable(), !is_directive);
            }
        }
    }

    #[test]
    fn encode_places_operands_from_the_top() {
        let add = lookup("add").unwrap();
        assert_eq!(add.variants[0].encode(&[1, 2, 3]), 0b1000_0_0001_0010_0011);
        assert_eq!(add.variants[1].encode(&[1, 2, 15]), 0b1000_1_0001_0010_1111);

        let ldr = lookup("ldr").unwrap();
        assert_eq!(ldr.variants[3].encode(&[4, 200]), 0b0000_1_0100_1100_1000);

        let bnz = lookup("bnz").unwrap();
        assert_eq!(bnz.variants[1].encode(&[9]), 0b0011_1_0010_0000_1001);
        assert_eq!(bnz.variants[0].encode(&[3, 0xE]), 0b0011_0_0010_0011_1110);
    }

    #[test]
    fn minor_bits_constrain_matching() {
        let ldr = lookup("ldr").unwrap();
        assert!(ldr.variants[0].matches(0b0000_0_0001_0010_0000));
        assert!(!ldr.variants[0].matches(0b0000_0_0001_0010_0001));
        assert!(ldr.variants[1].matches(0b0000_0_0001_0010_0001));
    }

    #[test]
    fn ret_is_pop_of_pc() {
        let ret = lookup("ret").unwrap().variants[0].encode(&[]);
        let pop = lookup("pop").unwrap().variants[0].encode(&[15]);
        assert_eq!(ret, pop);
    }

    #[test]
    fn operand_fields_round_trip() {
        let str_ = lookup("str").unwrap();
        let word = str_.variants[1].encode(&[7, 14, 0xB]);
        assert_eq!(str_.variants[1].operand_field(word, 0), 7);
        assert_eq!(str_.variants[1].operand_field(word, 1), 14);
        assert_eq!(str_.variants[1].operand_field(word, 2), 0xB);
    }

    #[test]
    fn words_wider_than_seventeen_bits_never_match() {
        for spec in INSTRUCTION_TABLE {
            for variant in spec.variants {
                assert!(!variant.matches(1 << WORD_BITS));
            }
        }
    }
}
